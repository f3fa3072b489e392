//! Grade report types with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::evaluate::{score_quiz, QuizScore};
use crate::mastery::MasteryUpdate;
use crate::model::{QuizBank, Submission};
use crate::statistics::{compute_quiz_stats, QuizStats};

/// A complete grading run of one quiz bank over many submissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// Summary of the quiz bank.
    pub quiz_bank: QuizBankSummary,
    /// One entry per submission, in input order.
    pub results: Vec<StudentResult>,
    /// Aggregate statistics.
    pub stats: QuizStats,
}

/// Summary of a quiz bank (without the question definitions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizBankSummary {
    pub id: String,
    pub name: String,
    pub question_count: usize,
    pub max_score: u32,
    #[serde(default)]
    pub topic_id: Option<String>,
    #[serde(default)]
    pub objective_id: Option<String>,
}

/// One learner's graded submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentResult {
    pub student_id: String,
    pub percent: f64,
    pub score: QuizScore,
}

/// Grade every submission against a bank.
pub fn grade_submissions(bank: &QuizBank, submissions: &[Submission]) -> GradeReport {
    let results: Vec<StudentResult> = submissions
        .iter()
        .map(|submission| {
            let score = score_quiz(&bank.questions, &submission.answers);
            tracing::debug!(
                student = %submission.student_id,
                score = score.score,
                max = score.max_score,
                "graded submission"
            );
            StudentResult {
                student_id: submission.student_id.clone(),
                percent: score.percent(),
                score,
            }
        })
        .collect();

    let scores: Vec<QuizScore> = results.iter().map(|r| r.score.clone()).collect();
    let stats = compute_quiz_stats(bank, &scores);

    GradeReport {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        quiz_bank: QuizBankSummary {
            id: bank.id.clone(),
            name: bank.name.clone(),
            question_count: bank.questions.len(),
            max_score: bank.max_score(),
            topic_id: bank.topic_id.clone(),
            objective_id: bank.objective_id.clone(),
        },
        results,
        stats,
    }
}

impl GradeReport {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: GradeReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Mastery updates for every result, when the bank names a topic and an
    /// objective. Empty otherwise.
    pub fn mastery_updates(&self, bank: &QuizBank) -> Vec<MasteryUpdate> {
        let (Some(topic), Some(objective)) = (&bank.topic_id, &bank.objective_id) else {
            return Vec::new();
        };
        self.results
            .iter()
            .map(|r| {
                MasteryUpdate::new(
                    r.student_id.as_str(),
                    topic.as_str(),
                    objective.as_str(),
                    r.percent,
                )
                .with_curriculum(
                    bank.curriculum_country.clone(),
                    bank.curriculum_level.clone(),
                )
            })
            .collect()
    }

    /// Format the report as a markdown table.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "## {} ({} questions, {} points)\n\n",
            self.quiz_bank.name, self.quiz_bank.question_count, self.quiz_bank.max_score
        ));
        md.push_str("| Student | Score | Percent |\n");
        md.push_str("|---------|-------|---------|\n");
        for r in &self.results {
            md.push_str(&format!(
                "| {} | {}/{} | {:.1}% |\n",
                r.student_id, r.score.score, r.score.max_score, r.percent
            ));
        }
        md.push_str(&format!(
            "\n**Mean:** {:.1}%  **Median:** {:.1}%  **Mastered:** {}/{}\n",
            self.stats.mean_percent,
            self.stats.median_percent,
            self.stats.mastered_attempts,
            self.stats.attempts
        ));

        md
    }
}
