//! Aggregate statistics over many graded attempts at one quiz bank.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::evaluate::QuizScore;
use crate::mastery::MASTERED_THRESHOLD;
use crate::model::QuizBank;

/// Statistics across all graded attempts at a quiz bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizStats {
    /// Number of graded attempts.
    pub attempts: usize,
    /// Mean score percentage.
    pub mean_percent: f64,
    /// Median score percentage.
    pub median_percent: f64,
    /// Attempts at or above the mastery threshold.
    pub mastered_attempts: usize,
    /// Per-question statistics, in bank order.
    pub per_question: Vec<QuestionStats>,
    /// Correct rate per question kind label.
    pub per_kind: BTreeMap<String, f64>,
}

/// Statistics for a single question across attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionStats {
    pub question_id: String,
    pub kind: String,
    /// Fraction of attempts that answered correctly.
    pub correct_rate: f64,
    /// Fraction of attempts that submitted any answer.
    pub answered_rate: f64,
}

/// Compute statistics for a set of scores produced from `bank`.
pub fn compute_quiz_stats(bank: &QuizBank, scores: &[QuizScore]) -> QuizStats {
    let attempts = scores.len();
    let mut percents: Vec<f64> = scores.iter().map(QuizScore::percent).collect();
    percents.sort_by(|a, b| a.total_cmp(b));

    let mean_percent = if attempts == 0 {
        0.0
    } else {
        percents.iter().sum::<f64>() / attempts as f64
    };
    let mastered_attempts = percents
        .iter()
        .filter(|p| **p >= MASTERED_THRESHOLD)
        .count();

    let mut per_question = Vec::with_capacity(bank.questions.len());
    let mut kind_totals: BTreeMap<String, (usize, usize)> = BTreeMap::new();

    for question in &bank.questions {
        let mut correct = 0usize;
        let mut answered = 0usize;
        for score in scores {
            if let Some(detail) = score
                .details
                .iter()
                .find(|d| d.question_id == question.id)
            {
                if detail.correct {
                    correct += 1;
                }
                if detail.answer.is_some() {
                    answered += 1;
                }
            }
        }

        let kind = question.kind.label().to_string();
        let entry = kind_totals.entry(kind.clone()).or_insert((0, 0));
        entry.0 += correct;
        entry.1 += attempts;

        per_question.push(QuestionStats {
            question_id: question.id.clone(),
            kind,
            correct_rate: rate(correct, attempts),
            answered_rate: rate(answered, attempts),
        });
    }

    let per_kind = kind_totals
        .into_iter()
        .map(|(kind, (correct, total))| (kind, rate(correct, total)))
        .collect();

    QuizStats {
        attempts,
        mean_percent,
        median_percent: median(&percents),
        mastered_attempts,
        per_question,
        per_kind,
    }
}

fn rate(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// Median of an already sorted slice.
fn median(sorted: &[f64]) -> f64 {
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2],
        n => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}
