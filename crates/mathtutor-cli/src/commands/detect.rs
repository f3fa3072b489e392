//! The `mathtutor detect` command.

use std::path::PathBuf;

use anyhow::Result;

use mathtutor_core::math::{normalize_to_latex, MathDetector};
use mathtutor_store::config::load_config_from;

pub fn execute(text: &str, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let detector = MathDetector::new(config.detection);

    match detector.classify(text) {
        Some(signal) => {
            println!("math: yes ({signal})");
            println!("latex: {}", normalize_to_latex(text).latex);
        }
        None => println!("math: no"),
    }

    Ok(())
}
