//! The `mathtutor validate` command.

use std::path::PathBuf;

use anyhow::Result;

use mathtutor_core::parser::{load_quiz_banks, validate_quiz_bank};

pub fn execute(quiz_bank_path: PathBuf) -> Result<()> {
    let banks = load_quiz_banks(&quiz_bank_path)?;

    let mut total_warnings = 0;

    for bank in &banks {
        println!(
            "Quiz bank: {} ({} questions, {} points)",
            bank.name,
            bank.questions.len(),
            bank.max_score()
        );

        let warnings = validate_quiz_bank(bank);
        for w in &warnings {
            let prefix = w
                .question_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All quiz banks valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
