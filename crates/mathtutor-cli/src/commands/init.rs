//! The `mathtutor init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("mathtutor.toml").exists() {
        println!("mathtutor.toml already exists, skipping.");
    } else {
        std::fs::write("mathtutor.toml", SAMPLE_CONFIG)?;
        println!("Created mathtutor.toml");
    }

    std::fs::create_dir_all("quiz-banks")?;
    let example_path = std::path::Path::new("quiz-banks/example.toml");
    if example_path.exists() {
        println!("quiz-banks/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_QUIZ_BANK)?;
        println!("Created quiz-banks/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Pick a mastery store in mathtutor.toml");
    println!("  2. Run: mathtutor validate --quiz-bank quiz-banks/example.toml");
    println!(
        "  3. Run: mathtutor grade --quiz-bank quiz-banks/example.toml --submissions answers.json"
    );

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# mathtutor configuration

parallelism = 4
output_dir = "./mathtutor-results"

[store]
type = "file"
path = "./mathtutor-mastery.json"

# [store]
# type = "postgrest"
# base_url = "${SUPABASE_URL}"
# api_key = "${SUPABASE_SERVICE_KEY}"
# table = "student_mastery"
# upsert_function = "upsert_mastery_max"

[detection]
keyword_threshold = 0.35
strong_threshold = 0.2
extra_keywords = []
"#;

const EXAMPLE_QUIZ_BANK: &str = r#"[quiz_bank]
id = "example"
name = "Example Quiz"
description = "A few questions to get started"
topic_id = "fractions"
objective_id = "fractions-basics"

[[questions]]
id = "half"
prompt = "Which fraction equals one half?"
kind = "single"
choices = [
    { id = "a", label = "2/4", correct = true },
    { id = "b", label = "2/3" },
    { id = "c", label = "3/4" },
]

[[questions]]
id = "sum"
prompt = "What is 1/4 + 1/4 as a decimal?"
kind = "numeric"
answer = 0.5

[[questions]]
id = "shade"
prompt = "Shade three quarters of the grid."
kind = "visual"
points = 2

[questions.visual]
subtype = "grid"
rows = 2
cols = 2
required_count = 3
"#;
