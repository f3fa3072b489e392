//! The `mathtutor normalize` command.

use anyhow::Result;

use mathtutor_core::math::normalize_to_latex;

pub fn execute(text: &str) -> Result<()> {
    let normalized = normalize_to_latex(text);
    println!("{}", normalized.latex);
    for note in &normalized.notes {
        eprintln!("  note: {note}");
    }
    Ok(())
}
