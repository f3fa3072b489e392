//! The `mathtutor mastery` commands.

use std::path::PathBuf;

use anyhow::Result;

use mathtutor_core::mastery::{update_mastery, MasteryUpdate};
use mathtutor_store::config::load_config_from;
use mathtutor_store::create_store;

pub struct UpdateArgs {
    pub student: String,
    pub topic: String,
    pub objective: String,
    pub score: f64,
    pub country: Option<String>,
    pub level: Option<String>,
}

pub async fn update(args: UpdateArgs, config_path: Option<PathBuf>) -> Result<()> {
    anyhow::ensure!(!args.score.is_nan(), "score must be a number");

    let config = load_config_from(config_path.as_deref())?;
    let store = create_store(&config.store)?;

    let update = MasteryUpdate::new(args.student, args.topic, args.objective, args.score)
        .with_curriculum(args.country, args.level);
    let record = update_mastery(store.as_ref(), &update).await?;

    println!(
        "{}: score {:.1}, status {}, attempts {}",
        record.key(),
        record.score,
        record.status,
        record.attempts
    );
    Ok(())
}

pub async fn show(student: &str, config_path: Option<PathBuf>) -> Result<()> {
    use comfy_table::{Cell, Table};

    let config = load_config_from(config_path.as_deref())?;
    let store = create_store(&config.store)?;
    let records = store.list_for_student(student).await?;

    if records.is_empty() {
        println!("No mastery records for {student}.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Topic",
        "Objective",
        "Score",
        "Status",
        "Attempts",
        "Updated",
    ]);
    for record in &records {
        table.add_row(vec![
            Cell::new(&record.topic_id),
            Cell::new(&record.objective_id),
            Cell::new(format!("{:.1}", record.score)),
            Cell::new(record.status),
            Cell::new(record.attempts),
            Cell::new(record.updated_at.format("%Y-%m-%d %H:%M")),
        ]);
    }

    println!("{table}");
    Ok(())
}
