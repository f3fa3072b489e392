//! Quiz answer evaluation and score aggregation.
//!
//! Every rule here is total: an answer of the wrong shape, or a question
//! whose correct set is empty, evaluates to `false` rather than failing.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{
    AngleSpec, Answer, Choice, Question, QuestionKind, Selectable, VisualUnion, BASE_ANGLE_ID,
};

/// Slack for float noise when comparing angles against a tolerance.
const ANGLE_EPSILON: f64 = 1e-9;

/// Decide whether `answer` is a correct response to `question`.
pub fn evaluate_answer(question: &Question, answer: &Answer) -> bool {
    let correct = match &question.kind {
        QuestionKind::Single { choices } => match answer {
            Answer::Choice(id) => correct_choice_ids(choices).contains(id.as_str()),
            _ => false,
        },
        QuestionKind::Multi { choices } => exact_set_match(correct_choice_ids(choices), answer),
        QuestionKind::Numeric { answer: expected } => {
            numeric_value(answer).is_some_and(|n| n == *expected)
        }
        QuestionKind::Ordering { correct_order, .. } => match answer {
            Answer::Choices(order) => !correct_order.is_empty() && order == correct_order,
            _ => false,
        },
        QuestionKind::Visual { visual } => evaluate_visual(visual, answer),
    };

    tracing::debug!(
        question = %question.id,
        kind = question.kind.label(),
        correct,
        "evaluated answer"
    );
    correct
}

/// Evaluate an answer against a visual question.
pub fn evaluate_visual(visual: &VisualUnion, answer: &Answer) -> bool {
    match visual {
        VisualUnion::Pie { segments } => exact_set_match(correct_selectable_ids(segments), answer),
        VisualUnion::ShapeSelect { shapes } => {
            exact_set_match(correct_selectable_ids(shapes), answer)
        }
        VisualUnion::LineRelation { pairs } => {
            exact_set_match(correct_selectable_ids(pairs), answer)
        }
        VisualUnion::Grid {
            correct_cells,
            required_count,
            ..
        } => evaluate_grid(correct_cells.as_deref(), *required_count, answer),
        VisualUnion::Angle(spec) => evaluate_angle(spec, answer),
    }
}

/// Grid questions either name the exact cells to shade, or only how many.
///
/// In count mode the identity of the shaded cells is not checked: at least
/// `required_count` distinct cells are accepted.
fn evaluate_grid(
    correct_cells: Option<&[String]>,
    required_count: Option<usize>,
    answer: &Answer,
) -> bool {
    if let Some(cells) = correct_cells.filter(|c| !c.is_empty()) {
        let expected: HashSet<&str> = cells.iter().map(String::as_str).collect();
        return exact_set_match(expected, answer);
    }

    match (required_count, answer) {
        (Some(required), Answer::Choices(selected)) => {
            let distinct: HashSet<&str> = selected.iter().map(String::as_str).collect();
            distinct.len() >= required
        }
        _ => false,
    }
}

fn evaluate_angle(spec: &AngleSpec, answer: &Answer) -> bool {
    match answer {
        Answer::Choices(_) if spec.multi => {
            let mut expected: HashSet<&str> = spec
                .variants
                .iter()
                .filter(|v| v.correct)
                .map(|v| v.id.as_str())
                .collect();
            if spec.base_correct {
                expected.insert(BASE_ANGLE_ID);
            }
            exact_set_match(expected, answer)
        }
        Answer::Choices(_) => false,
        _ => {
            let Some(deg) = numeric_value(answer) else {
                return false;
            };
            let base_hit = within(deg, spec.target_deg, spec.tolerance_deg);
            if !spec.multi {
                return base_hit;
            }
            (spec.base_correct && base_hit)
                || spec.variants.iter().filter(|v| v.correct).any(|v| {
                    within(
                        deg,
                        v.target_deg,
                        v.tolerance_deg.unwrap_or(spec.tolerance_deg),
                    )
                })
        }
    }
}

fn within(value: f64, target: f64, tolerance: f64) -> bool {
    value.is_finite() && (value - target).abs() <= tolerance.abs() + ANGLE_EPSILON
}

fn correct_choice_ids(choices: &[Choice]) -> HashSet<&str> {
    choices
        .iter()
        .filter(|c| c.correct)
        .map(|c| c.id.as_str())
        .collect()
}

fn correct_selectable_ids(items: &[Selectable]) -> HashSet<&str> {
    items
        .iter()
        .filter(|s| s.correct)
        .map(|s| s.id.as_str())
        .collect()
}

/// Order-independent exact match of a list answer against a non-empty id set.
fn exact_set_match(expected: HashSet<&str>, answer: &Answer) -> bool {
    let Answer::Choices(selected) = answer else {
        return false;
    };
    if expected.is_empty() {
        return false;
    }
    let submitted: HashSet<&str> = selected.iter().map(String::as_str).collect();
    submitted == expected
}

fn numeric_value(answer: &Answer) -> Option<f64> {
    match answer {
        Answer::Number(n) => Some(*n),
        Answer::Choice(s) => s.trim().parse::<f64>().ok(),
        Answer::Choices(_) => None,
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Outcome for a single question within a graded quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: String,
    pub correct: bool,
    /// Points the question is worth.
    pub points: u32,
    /// What the learner submitted, if anything.
    pub answer: Option<Answer>,
}

/// Aggregate score for one learner's attempt at a quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizScore {
    pub score: u32,
    pub max_score: u32,
    pub details: Vec<QuestionResult>,
}

impl QuizScore {
    /// Score as a percentage of the maximum, 0 for an empty quiz.
    pub fn percent(&self) -> f64 {
        if self.max_score == 0 {
            0.0
        } else {
            self.score as f64 / self.max_score as f64 * 100.0
        }
    }

    /// Number of questions answered correctly.
    pub fn correct_count(&self) -> usize {
        self.details.iter().filter(|d| d.correct).count()
    }
}

/// Grade every question of a quiz. Unanswered questions score zero.
pub fn score_quiz(questions: &[Question], answers: &HashMap<String, Answer>) -> QuizScore {
    let mut score = 0u32;
    let mut max_score = 0u32;
    let mut details = Vec::with_capacity(questions.len());

    for question in questions {
        let answer = answers.get(&question.id);
        let correct = answer.is_some_and(|a| evaluate_answer(question, a));

        max_score = max_score.saturating_add(question.points);
        if correct {
            score = score.saturating_add(question.points);
        }

        details.push(QuestionResult {
            question_id: question.id.clone(),
            correct,
            points: question.points,
            answer: answer.cloned(),
        });
    }

    QuizScore {
        score,
        max_score,
        details,
    }
}
