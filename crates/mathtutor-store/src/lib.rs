//! mathtutor-store: Mastery store backends.
//!
//! Implements the `MasteryStore` trait for an in-memory map, a JSON file,
//! and a PostgREST (Supabase) table, plus the config file that selects one.

pub mod config;
pub mod file;
pub mod memory;
pub mod postgrest;

pub use config::{create_store, load_config, load_config_from, StoreConfig, TutorConfig};
pub use mathtutor_core::error::StoreError;
