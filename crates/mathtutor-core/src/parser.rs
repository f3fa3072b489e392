//! Quiz bank and submission loading.
//!
//! Quiz banks are authored as TOML (`[quiz_bank]` header plus
//! `[[questions]]`) or exported from the backend as JSON. Both load into a
//! [`QuizBank`] and can be checked with [`validate_quiz_bank`].

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{AngleSpec, Question, QuestionKind, QuizBank, Submission, VisualUnion};

/// Intermediate TOML structure for quiz bank files.
#[derive(Debug, Deserialize)]
struct TomlQuizFile {
    quiz_bank: TomlQuizHeader,
    #[serde(default)]
    questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct TomlQuizHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    topic_id: Option<String>,
    #[serde(default)]
    objective_id: Option<String>,
    #[serde(default)]
    curriculum_country: Option<String>,
    #[serde(default)]
    curriculum_level: Option<String>,
}

/// Parse a single quiz bank file. `.json` files are read as JSON, anything
/// else as TOML.
pub fn parse_quiz_bank(path: &Path) -> Result<QuizBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read quiz bank file: {}", path.display()))?;

    parse_quiz_bank_str(&content, path)
}

/// Parse quiz bank content; `source_path` picks the format and labels errors.
pub fn parse_quiz_bank_str(content: &str, source_path: &Path) -> Result<QuizBank> {
    if is_json(source_path) {
        return serde_json::from_str(content)
            .with_context(|| format!("failed to parse JSON: {}", source_path.display()));
    }

    let parsed: TomlQuizFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let header = parsed.quiz_bank;
    Ok(QuizBank {
        id: header.id,
        name: header.name,
        description: header.description,
        topic_id: header.topic_id,
        objective_id: header.objective_id,
        curriculum_country: header.curriculum_country,
        curriculum_level: header.curriculum_level,
        questions: parsed.questions,
    })
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

/// Recursively load all `.toml` and `.json` quiz banks from a directory.
pub fn load_quiz_directory(dir: &Path) -> Result<Vec<QuizBank>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            banks.extend(load_quiz_directory(&path)?);
        } else if path
            .extension()
            .is_some_and(|ext| ext == "toml" || ext == "json")
        {
            match parse_quiz_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(banks)
}

/// Load a bank from a file, or every bank under a directory.
pub fn load_quiz_banks(path: &Path) -> Result<Vec<QuizBank>> {
    if path.is_dir() {
        load_quiz_directory(path)
    } else {
        Ok(vec![parse_quiz_bank(path)?])
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SubmissionFile {
    Many(Vec<Submission>),
    One(Submission),
}

/// Load learner submissions: a JSON object or an array of them.
pub fn parse_submissions(path: &Path) -> Result<Vec<Submission>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read submissions: {}", path.display()))?;
    parse_submissions_str(&content)
        .with_context(|| format!("failed to parse submissions: {}", path.display()))
}

pub fn parse_submissions_str(content: &str) -> Result<Vec<Submission>> {
    let parsed: SubmissionFile = serde_json::from_str(content)?;
    Ok(match parsed {
        SubmissionFile::Many(list) => list,
        SubmissionFile::One(one) => vec![one],
    })
}

/// A warning from quiz bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn question(id: &str, message: impl Into<String>) -> Self {
        Self {
            question_id: Some(id.to_string()),
            message: message.into(),
        }
    }
}

/// Validate a quiz bank for questions that can never be answered correctly,
/// and other authoring mistakes.
pub fn validate_quiz_bank(bank: &QuizBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if bank.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "quiz bank has no questions".into(),
        });
    }
    if bank.topic_id.is_some() != bank.objective_id.is_some() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "topic_id and objective_id should be set together for mastery tracking"
                .into(),
        });
    }

    let mut seen_ids = HashSet::new();
    for question in &bank.questions {
        if !seen_ids.insert(&question.id) {
            warnings.push(ValidationWarning::question(
                &question.id,
                format!("duplicate question ID: {}", question.id),
            ));
        }
        if question.prompt.trim().is_empty() {
            warnings.push(ValidationWarning::question(&question.id, "prompt is empty"));
        }
        if question.points == 0 {
            warnings.push(ValidationWarning::question(
                &question.id,
                "question is worth 0 points",
            ));
        }
        validate_kind(&question.id, &question.kind, &mut warnings);
    }

    warnings
}

fn validate_kind(id: &str, kind: &QuestionKind, warnings: &mut Vec<ValidationWarning>) {
    match kind {
        QuestionKind::Single { choices } => {
            let correct = choices.iter().filter(|c| c.correct).count();
            if correct == 0 {
                warnings.push(ValidationWarning::question(id, "no choice is marked correct"));
            } else if correct > 1 {
                warnings.push(ValidationWarning::question(
                    id,
                    "single-choice question has more than one correct choice",
                ));
            }
            check_unique_ids(id, choices.iter().map(|c| c.id.as_str()), warnings);
        }
        QuestionKind::Multi { choices } => {
            if !choices.iter().any(|c| c.correct) {
                warnings.push(ValidationWarning::question(id, "no choice is marked correct"));
            }
            check_unique_ids(id, choices.iter().map(|c| c.id.as_str()), warnings);
        }
        QuestionKind::Numeric { answer } => {
            if !answer.is_finite() {
                warnings.push(ValidationWarning::question(id, "numeric answer is not finite"));
            }
        }
        QuestionKind::Ordering {
            items,
            correct_order,
        } => {
            if correct_order.is_empty() {
                warnings.push(ValidationWarning::question(id, "correct_order is empty"));
            }
            if !items.is_empty() {
                let mut a: Vec<&String> = items.iter().collect();
                let mut b: Vec<&String> = correct_order.iter().collect();
                a.sort();
                b.sort();
                if a != b {
                    warnings.push(ValidationWarning::question(
                        id,
                        "correct_order is not a permutation of items",
                    ));
                }
            }
        }
        QuestionKind::Visual { visual } => validate_visual(id, visual, warnings),
    }
}

fn validate_visual(id: &str, visual: &VisualUnion, warnings: &mut Vec<ValidationWarning>) {
    match visual {
        VisualUnion::Pie { segments: items }
        | VisualUnion::ShapeSelect { shapes: items }
        | VisualUnion::LineRelation { pairs: items } => {
            if !items.iter().any(|s| s.correct) {
                warnings.push(ValidationWarning::question(
                    id,
                    format!("{} question has nothing marked correct", visual.label()),
                ));
            }
            check_unique_ids(id, items.iter().map(|s| s.id.as_str()), warnings);
        }
        VisualUnion::Grid {
            rows,
            cols,
            correct_cells,
            required_count,
        } => {
            let has_cells = correct_cells.as_ref().is_some_and(|c| !c.is_empty());
            let capacity = (*rows as usize) * (*cols as usize);
            match (has_cells, required_count) {
                (false, None) => warnings.push(ValidationWarning::question(
                    id,
                    "grid needs correct_cells or required_count",
                )),
                (true, Some(_)) => warnings.push(ValidationWarning::question(
                    id,
                    "grid has both correct_cells and required_count; required_count is ignored",
                )),
                (false, Some(n)) if *n > capacity => {
                    warnings.push(ValidationWarning::question(
                        id,
                        format!("required_count {n} exceeds grid size {capacity}"),
                    ))
                }
                _ => {}
            }
        }
        VisualUnion::Angle(spec) => validate_angle(id, spec, warnings),
    }
}

fn validate_angle(id: &str, spec: &AngleSpec, warnings: &mut Vec<ValidationWarning>) {
    if spec.tolerance_deg < 0.0 {
        warnings.push(ValidationWarning::question(id, "tolerance_deg is negative"));
    }
    if !spec.variants.is_empty() && !spec.multi {
        warnings.push(ValidationWarning::question(
            id,
            "angle variants are ignored unless multi = true",
        ));
    }
    if spec.multi && !spec.base_correct && !spec.variants.iter().any(|v| v.correct) {
        warnings.push(ValidationWarning::question(
            id,
            "multi angle question accepts no angle",
        ));
    }
    check_unique_ids(id, spec.variants.iter().map(|v| v.id.as_str()), warnings);
}

fn check_unique_ids<'a>(
    id: &str,
    ids: impl Iterator<Item = &'a str>,
    warnings: &mut Vec<ValidationWarning>,
) {
    let mut seen = HashSet::new();
    for option in ids {
        if !seen.insert(option) {
            warnings.push(ValidationWarning::question(
                id,
                format!("duplicate option ID: {option}"),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Answer;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[quiz_bank]
id = "fractions-basics"
name = "Fractions basics"
description = "Comparing and shading fractions"
topic_id = "fractions"
objective_id = "compare-fractions"
curriculum_country = "fr"
curriculum_level = "cm1"

[[questions]]
id = "half"
kind = "single"
prompt = "Which fraction is one half?"
choices = [
    { id = "a", label = "1/2", correct = true },
    { id = "b", label = "1/3" },
]

[[questions]]
id = "sum"
kind = "numeric"
prompt = "1/4 + 1/4 = ?/4"
answer = 2
points = 2

[[questions]]
id = "shade"
kind = "visual"
prompt = "Shade three quarters of the grid"

[questions.visual]
subtype = "grid"
rows = 2
cols = 2
required_count = 3

[[questions]]
id = "angle"
kind = "visual"
prompt = "Measure the angle"
visual = { subtype = "angle", target_deg = 60, tolerance_deg = 2 }
"#;

    #[test]
    fn parse_valid_toml() {
        let bank = parse_quiz_bank_str(VALID_TOML, &PathBuf::from("bank.toml")).unwrap();
        assert_eq!(bank.id, "fractions-basics");
        assert_eq!(bank.topic_id.as_deref(), Some("fractions"));
        assert_eq!(bank.questions.len(), 4);
        assert_eq!(bank.questions[1].points, 2);
        assert_eq!(bank.max_score(), 5);
        assert!(matches!(
            bank.questions[1].kind,
            QuestionKind::Numeric { answer } if answer == 2.0
        ));
        assert!(matches!(
            &bank.questions[2].kind,
            QuestionKind::Visual { visual: VisualUnion::Grid { required_count: Some(3), .. } }
        ));
        assert!(validate_quiz_bank(&bank).is_empty());
    }

    #[test]
    fn parse_json_bank() {
        let json = r#"{
            "id": "angles",
            "name": "Angles",
            "questions": [
                {"id": "q1", "prompt": "Order", "kind": "ordering", "correct_order": ["a", "b"]}
            ]
        }"#;
        let bank = parse_quiz_bank_str(json, &PathBuf::from("bank.json")).unwrap();
        assert_eq!(bank.name, "Angles");
        assert_eq!(bank.questions[0].kind.label(), "ordering");
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        assert!(parse_quiz_bank_str(bad, &PathBuf::from("bad.toml")).is_err());
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let toml = r#"
[quiz_bank]
id = "x"
name = "X"

[[questions]]
id = "q"
kind = "essay"
"#;
        assert!(parse_quiz_bank_str(toml, &PathBuf::from("x.toml")).is_err());
    }

    #[test]
    fn validate_reports_authoring_mistakes() {
        let toml = r#"
[quiz_bank]
id = "broken"
name = "Broken"
topic_id = "t"

[[questions]]
id = "q1"
kind = "single"
prompt = "Pick"
choices = [{ id = "a" }, { id = "a" }]

[[questions]]
id = "q1"
kind = "visual"
prompt = "Grid"
visual = { subtype = "grid", rows = 1, cols = 2, required_count = 5 }

[[questions]]
id = "q3"
kind = "ordering"
prompt = ""
items = ["x", "y"]
correct_order = ["x", "z"]
"#;
        let bank = parse_quiz_bank_str(toml, &PathBuf::from("broken.toml")).unwrap();
        let warnings = validate_quiz_bank(&bank);
        let has = |needle: &str| warnings.iter().any(|w| w.message.contains(needle));
        assert!(has("objective_id"));
        assert!(has("no choice is marked correct"));
        assert!(has("duplicate option ID: a"));
        assert!(has("duplicate question ID: q1"));
        assert!(has("exceeds grid size 2"));
        assert!(has("prompt is empty"));
        assert!(has("not a permutation"));
    }

    #[test]
    fn load_directory_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("bad.toml"), "not toml {").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let banks = load_quiz_directory(dir.path()).unwrap();
        assert_eq!(banks.len(), 1);
        assert_eq!(banks[0].id, "fractions-basics");
    }

    #[test]
    fn submissions_single_or_many() {
        let one = parse_submissions_str(r#"{"student_id": "s1", "answers": {"q": 4}}"#).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].answers.get("q"), Some(&Answer::Number(4.0)));

        let many = parse_submissions_str(
            r#"[{"student_id": "s1", "answers": {}}, {"student_id": "s2", "answers": {"q": ["a"]}}]"#,
        )
        .unwrap();
        assert_eq!(many.len(), 2);
        assert_eq!(many[1].student_id, "s2");
    }
}
