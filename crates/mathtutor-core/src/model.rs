//! Core data model types for mathtutor quizzes.
//!
//! A quiz bank is a named list of questions. Each question is a tagged union
//! on `kind`, and visual questions carry a second tagged union on `subtype`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single question served to a learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier within the quiz bank.
    pub id: String,
    /// Text shown to the learner.
    #[serde(default)]
    pub prompt: String,
    /// Points awarded for a correct answer.
    #[serde(default = "default_points")]
    pub points: u32,
    /// Kind-specific payload.
    #[serde(flatten)]
    pub kind: QuestionKind,
}

fn default_points() -> u32 {
    1
}

/// The kind-specific part of a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionKind {
    /// Pick exactly one choice.
    Single { choices: Vec<Choice> },
    /// Pick every correct choice and nothing else.
    Multi { choices: Vec<Choice> },
    /// Type a number.
    Numeric { answer: f64 },
    /// Put the items in the right order.
    Ordering {
        #[serde(default)]
        items: Vec<String>,
        correct_order: Vec<String>,
    },
    /// Interact with a drawing.
    Visual { visual: VisualUnion },
}

impl QuestionKind {
    /// Short name used in tables and statistics.
    pub fn label(&self) -> &'static str {
        match self {
            QuestionKind::Single { .. } => "single",
            QuestionKind::Multi { .. } => "multi",
            QuestionKind::Numeric { .. } => "numeric",
            QuestionKind::Ordering { .. } => "ordering",
            QuestionKind::Visual { visual } => visual.label(),
        }
    }
}

/// One option of a single- or multi-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub correct: bool,
}

/// A selectable region of a visual question (pie segment, shape, line pair).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selectable {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub correct: bool,
}

/// Interactive visual question subtypes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum VisualUnion {
    /// Shade the right pie segments.
    Pie { segments: Vec<Selectable> },
    /// Shade grid cells, either specific ones or any `required_count` of them.
    Grid {
        rows: u32,
        cols: u32,
        #[serde(default)]
        correct_cells: Option<Vec<String>>,
        #[serde(default)]
        required_count: Option<usize>,
    },
    /// Select the shapes matching a property.
    ShapeSelect { shapes: Vec<Selectable> },
    /// Select the line pairs in a given relation (parallel, perpendicular...).
    LineRelation { pairs: Vec<Selectable> },
    /// Measure or compare angles.
    Angle(AngleSpec),
}

impl VisualUnion {
    pub fn label(&self) -> &'static str {
        match self {
            VisualUnion::Pie { .. } => "pie",
            VisualUnion::Grid { .. } => "grid",
            VisualUnion::ShapeSelect { .. } => "shape_select",
            VisualUnion::LineRelation { .. } => "line_relation",
            VisualUnion::Angle(_) => "angle",
        }
    }
}

/// Angle question definition.
///
/// In single mode the learner submits a degree value. In `multi` mode the
/// learner may also submit the ids of every angle that matches; the base
/// angle is addressed as [`BASE_ANGLE_ID`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleSpec {
    pub target_deg: f64,
    #[serde(default)]
    pub tolerance_deg: f64,
    #[serde(default)]
    pub multi: bool,
    /// Whether the base angle belongs to the accepted set in `multi` mode.
    #[serde(default = "default_true")]
    pub base_correct: bool,
    #[serde(default)]
    pub variants: Vec<AngleVariant>,
}

/// Id of the base angle in `multi` mode answers.
pub const BASE_ANGLE_ID: &str = "base";

/// An additional angle shown next to the base angle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleVariant {
    pub id: String,
    pub target_deg: f64,
    /// Falls back to the question's tolerance when absent.
    #[serde(default)]
    pub tolerance_deg: Option<f64>,
    #[serde(default)]
    pub correct: bool,
}

fn default_true() -> bool {
    true
}

/// A learner's submitted answer. The shape depends on the question kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Number(f64),
    Choice(String),
    Choices(Vec<String>),
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Number(n) => write!(f, "{n}"),
            Answer::Choice(id) => write!(f, "{id}"),
            Answer::Choices(ids) => write!(f, "[{}]", ids.join(", ")),
        }
    }
}

/// One learner's answers to a quiz, keyed by question id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub student_id: String,
    #[serde(default)]
    pub answers: HashMap<String, Answer>,
}

/// A named collection of questions for a topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizBank {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Curriculum topic this bank exercises, used for mastery updates.
    #[serde(default)]
    pub topic_id: Option<String>,
    /// Objective (success criterion) the bank scores against.
    #[serde(default)]
    pub objective_id: Option<String>,
    #[serde(default)]
    pub curriculum_country: Option<String>,
    #[serde(default)]
    pub curriculum_level: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl QuizBank {
    /// Sum of all question points, saturating at `u32::MAX`.
    pub fn max_score(&self) -> u32 {
        self.questions
            .iter()
            .fold(0u32, |total, q| total.saturating_add(q.points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_json_uses_kind_tag() {
        let json = r#"{
            "id": "q1",
            "prompt": "Pick one",
            "kind": "single",
            "choices": [{"id": "a", "correct": true}, {"id": "b"}]
        }"#;
        let q: Question = serde_json::from_str(json).unwrap();
        assert_eq!(q.points, 1);
        match &q.kind {
            QuestionKind::Single { choices } => {
                assert_eq!(choices.len(), 2);
                assert!(choices[0].correct);
                assert!(!choices[1].correct);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn visual_angle_defaults() {
        let json = r#"{
            "id": "q2",
            "kind": "visual",
            "visual": {"subtype": "angle", "target_deg": 60}
        }"#;
        let q: Question = serde_json::from_str(json).unwrap();
        let QuestionKind::Visual {
            visual: VisualUnion::Angle(spec),
        } = q.kind
        else {
            panic!("expected angle question");
        };
        assert_eq!(spec.tolerance_deg, 0.0);
        assert!(!spec.multi);
        assert!(spec.base_correct);
        assert!(spec.variants.is_empty());
    }

    #[test]
    fn answer_shapes() {
        let n: Answer = serde_json::from_str("42").unwrap();
        assert_eq!(n, Answer::Number(42.0));
        let c: Answer = serde_json::from_str(r#""a""#).unwrap();
        assert_eq!(c, Answer::Choice("a".into()));
        let l: Answer = serde_json::from_str(r#"["a","c"]"#).unwrap();
        assert_eq!(l, Answer::Choices(vec!["a".into(), "c".into()]));
        assert_eq!(l.to_string(), "[a, c]");
    }

    #[test]
    fn max_score_saturates() {
        let bank: QuizBank = serde_json::from_str(&format!(
            r#"{{"id": "big", "name": "Big", "questions": [
                {{"id": "q1", "kind": "numeric", "answer": 1.0, "points": {max}}},
                {{"id": "q2", "kind": "numeric", "answer": 2.0, "points": {max}}}
            ]}}"#,
            max = u32::MAX
        ))
        .unwrap();
        assert_eq!(bank.max_score(), u32::MAX);
    }

    #[test]
    fn kind_labels() {
        let grid = QuestionKind::Visual {
            visual: VisualUnion::Grid {
                rows: 2,
                cols: 2,
                correct_cells: None,
                required_count: Some(2),
            },
        };
        assert_eq!(grid.label(), "grid");
        assert_eq!(QuestionKind::Numeric { answer: 1.0 }.label(), "numeric");
    }
}
