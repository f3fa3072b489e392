use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mathtutor_core::evaluate::{evaluate_answer, score_quiz};
use mathtutor_core::model::*;

fn selectable(id: &str, correct: bool) -> Selectable {
    Selectable {
        id: id.into(),
        label: String::new(),
        correct,
    }
}

fn make_questions(n: usize) -> Vec<Question> {
    (0..n)
        .map(|i| {
            let kind = match i % 4 {
                0 => QuestionKind::Numeric { answer: i as f64 },
                1 => QuestionKind::Multi {
                    choices: (0..6)
                        .map(|c| Choice {
                            id: format!("c{c}"),
                            label: String::new(),
                            correct: c % 2 == 0,
                        })
                        .collect(),
                },
                2 => QuestionKind::Visual {
                    visual: VisualUnion::Pie {
                        segments: (0..8).map(|s| selectable(&format!("s{s}"), s < 3)).collect(),
                    },
                },
                _ => QuestionKind::Visual {
                    visual: VisualUnion::Angle(AngleSpec {
                        target_deg: 60.0,
                        tolerance_deg: 2.0,
                        multi: true,
                        base_correct: true,
                        variants: vec![AngleVariant {
                            id: "v1".into(),
                            target_deg: 120.0,
                            tolerance_deg: None,
                            correct: true,
                        }],
                    }),
                },
            };
            Question {
                id: format!("q{i}"),
                prompt: String::new(),
                points: 1,
                kind,
            }
        })
        .collect()
}

fn answer_for(i: usize) -> Answer {
    match i % 4 {
        0 => Answer::Number(i as f64),
        1 => Answer::Choices(vec!["c0".into(), "c2".into(), "c4".into()]),
        2 => Answer::Choices(vec!["s0".into(), "s1".into(), "s2".into()]),
        _ => Answer::Choices(vec!["base".into(), "v1".into()]),
    }
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_answer");
    let questions = make_questions(4);

    for (i, question) in questions.iter().enumerate() {
        let answer = answer_for(i);
        group.bench_function(question.kind.label(), |b| {
            b.iter(|| evaluate_answer(black_box(question), black_box(&answer)))
        });
    }

    group.finish();
}

fn bench_score_quiz(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_quiz");

    for n in [10usize, 100] {
        let questions = make_questions(n);
        let answers: HashMap<String, Answer> =
            (0..n).map(|i| (format!("q{i}"), answer_for(i))).collect();
        group.bench_function(format!("questions={n}"), |b| {
            b.iter(|| score_quiz(black_box(&questions), black_box(&answers)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_score_quiz);
criterion_main!(benches);
