//! The `mathtutor grade` command.

use std::path::PathBuf;

use anyhow::Result;

use mathtutor_core::mastery::apply_batch;
use mathtutor_core::parser;
use mathtutor_core::report::{grade_submissions, GradeReport};
use mathtutor_store::config::load_config_from;
use mathtutor_store::create_store;

pub struct GradeArgs {
    pub quiz_bank: PathBuf,
    pub submissions: PathBuf,
    pub output: Option<PathBuf>,
    pub format: String,
    pub record_mastery: bool,
    pub parallelism: Option<usize>,
    pub config: Option<PathBuf>,
}

pub async fn execute(args: GradeArgs) -> Result<()> {
    if let Some(parallelism) = args.parallelism {
        anyhow::ensure!(parallelism >= 1, "parallelism must be at least 1");
    }
    anyhow::ensure!(
        !args.quiz_bank.is_dir(),
        "--quiz-bank must be a single file, got directory {}",
        args.quiz_bank.display()
    );

    let config = load_config_from(args.config.as_deref())?;
    tracing::debug!(store = ?config.store, parallelism = config.parallelism, "loaded config");
    let bank = parser::parse_quiz_bank(&args.quiz_bank)?;
    let submissions = parser::parse_submissions(&args.submissions)?;

    eprintln!(
        "mathtutor v{}: grading {} submission(s) against {} ({} questions)",
        env!("CARGO_PKG_VERSION"),
        submissions.len(),
        bank.name,
        bank.questions.len()
    );

    let report = grade_submissions(&bank, &submissions);
    print_summary(&report);

    let output = args.output.unwrap_or_else(|| config.output_dir.clone());
    std::fs::create_dir_all(&output)?;
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");

    let formats: Vec<&str> = if args.format == "all" {
        vec!["json", "markdown"]
    } else {
        args.format.split(',').map(str::trim).collect()
    };

    for fmt in &formats {
        match *fmt {
            "json" => {
                let path = output.join(format!("grades-{}-{timestamp}.json", bank.id));
                report.save_json(&path)?;
                eprintln!("Results saved to: {}", path.display());
            }
            "markdown" | "md" => {
                let path = output.join(format!("grades-{}-{timestamp}.md", bank.id));
                std::fs::write(&path, report.to_markdown())?;
                eprintln!("Markdown report: {}", path.display());
            }
            _ => {
                eprintln!("Unknown format: {fmt}");
            }
        }
    }

    if !args.record_mastery {
        return Ok(());
    }

    let updates = report.mastery_updates(&bank);
    if updates.is_empty() {
        eprintln!(
            "Warning: quiz bank '{}' has no topic_id/objective_id, skipping mastery updates.",
            bank.id
        );
        return Ok(());
    }

    let store = create_store(&config.store)?;
    let parallelism = args.parallelism.unwrap_or(config.parallelism);
    eprintln!(
        "\nRecording {} mastery update(s) in {} store",
        updates.len(),
        store.name()
    );

    let outcomes = apply_batch(store, updates, parallelism).await;
    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(record) => eprintln!(
                "  {}: {:.1} ({}, {} attempt(s))",
                outcome.key, record.score, record.status, record.attempts
            ),
            Err(e) => {
                failed += 1;
                eprintln!("  ERROR: {}: {e}", outcome.key);
            }
        }
    }

    anyhow::ensure!(failed == 0, "{failed} mastery update(s) failed");
    Ok(())
}

fn print_summary(report: &GradeReport) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["Student", "Score", "Percent", "Correct"]);

    for result in &report.results {
        table.add_row(vec![
            Cell::new(&result.student_id),
            Cell::new(format!("{}/{}", result.score.score, result.score.max_score)),
            Cell::new(format!("{:.1}%", result.percent)),
            Cell::new(format!(
                "{}/{}",
                result.score.correct_count(),
                result.score.details.len()
            )),
        ]);
    }

    eprintln!("\n{table}");
    eprintln!(
        "Mean {:.1}%, median {:.1}%, {}/{} at mastery level",
        report.stats.mean_percent,
        report.stats.median_percent,
        report.stats.mastered_attempts,
        report.stats.attempts
    );
}
