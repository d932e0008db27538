//! Grading orchestrator.
//!
//! Matches every submitted contour against the best reference annotation of
//! a question, folds the per-contour scores into a question score, and
//! averages question scores (graphic and open-text alike) into a test score.
//!
//! Per-contour and per-question problems never abort a call: they score
//! 0.0 and are reported alongside the result.

use serde::{Deserialize, Serialize};

use crate::config::GradingConfig;
use crate::error::SubmissionError;
use crate::metrics::{calculate_metrics, MetricBundle};
use crate::model::{Annotation, Contour, MIN_POLYGON_POINTS};
use crate::scoring::{comprehensive_score, ScoreBreakdown};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// A contour drawn by the learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedContour {
    /// Outline points.
    pub points: Contour,
    /// Label chosen in the drawing UI, if any.
    #[serde(default)]
    pub label: Option<String>,
}

/// One entry of a graphic answer as received from the collaborator.
#[derive(Debug, Clone)]
pub enum Submission {
    /// Entry decoded into point data.
    Contour(SubmittedContour),
    /// Entry that could not be read as point data.
    Malformed { reason: String },
}

impl From<SubmittedContour> for Submission {
    fn from(contour: SubmittedContour) -> Self {
        Submission::Contour(contour)
    }
}

// ---------------------------------------------------------------------------
// Graphic evaluation
// ---------------------------------------------------------------------------

/// Why a submitted contour scored zero without being compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContourFailure {
    /// The question has no reference annotations.
    ReferenceNotFound,
    /// Fewer points than a polygon needs.
    TooFewPoints { count: usize },
    /// The entry did not parse as point data.
    MalformedPayload { reason: String },
}

impl std::fmt::Display for ContourFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContourFailure::ReferenceNotFound => write!(f, "reference annotation not found"),
            ContourFailure::TooFewPoints { count } => {
                write!(f, "contour has {count} point(s), at least {MIN_POLYGON_POINTS} required")
            }
            ContourFailure::MalformedPayload { reason } => write!(f, "malformed contour: {reason}"),
        }
    }
}

/// A tagged failure for one submitted contour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContourIssue {
    /// Position of the contour in the submission.
    pub index: usize,
    pub failure: ContourFailure,
}

/// The winning comparison for one submitted contour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDetail {
    /// Index of the matched reference annotation.
    pub reference_index: usize,
    /// Label of the matched reference annotation.
    pub reference_label: String,
    /// Label used for the submission (the sentinel if none was given).
    pub user_label: String,
    /// Comprehensive score of this match.
    pub score: f64,
    pub metrics: MetricBundle,
}

/// Result of grading one graphic question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphicEvaluation {
    /// Best score per submitted contour, in submission order.
    pub per_contour_scores: Vec<f64>,
    /// Mean of the per-contour scores; the question score.
    pub comprehensive_score: f64,
    /// Winning match per submitted contour, `None` where it failed.
    pub detail: Vec<Option<MatchDetail>>,
    /// Contours whose score reached the correct threshold.
    pub correct_count: usize,
    /// Number of submitted contours.
    pub total_contours: usize,
    /// Question score split by metric weight.
    pub breakdown: ScoreBreakdown,
    /// Contours that were not compared, with the reason.
    pub failures: Vec<ContourIssue>,
    /// The question had no reference annotations.
    pub reference_missing: bool,
    /// Why the answer payload as a whole was rejected, if it was.
    #[serde(default)]
    pub invalid_payload: Option<String>,
}

/// Grade a graphic answer against a question's reference annotations.
///
/// Each submitted contour is compared with every reference annotation and
/// keeps the best-scoring one. A reference may be matched by several
/// submissions.
pub fn evaluate_graphic_answer(
    reference: &[Annotation],
    submissions: &[Submission],
    config: &GradingConfig,
) -> GraphicEvaluation {
    let reference_missing = reference.is_empty();
    if reference_missing {
        tracing::warn!("question has no reference annotations, scoring all contours as 0");
    }

    let mut per_contour_scores = Vec::with_capacity(submissions.len());
    let mut detail = Vec::with_capacity(submissions.len());
    let mut failures = Vec::new();

    for (index, submission) in submissions.iter().enumerate() {
        match match_contour(reference, submission, config) {
            Ok(best) => {
                tracing::debug!(
                    index,
                    reference = best.reference_index,
                    score = best.score,
                    "matched contour"
                );
                per_contour_scores.push(best.score);
                detail.push(Some(best));
            }
            Err(failure) => {
                tracing::warn!(index, "contour not graded: {failure}");
                per_contour_scores.push(0.0);
                detail.push(None);
                failures.push(ContourIssue { index, failure });
            }
        }
    }

    let comprehensive_score = if per_contour_scores.is_empty() {
        0.0
    } else {
        per_contour_scores.iter().sum::<f64>() / per_contour_scores.len() as f64
    };
    let correct_count = per_contour_scores
        .iter()
        .filter(|&&s| s >= config.correct_threshold)
        .count();

    GraphicEvaluation {
        total_contours: per_contour_scores.len(),
        breakdown: ScoreBreakdown::from_score(comprehensive_score, &config.weights),
        per_contour_scores,
        comprehensive_score,
        detail,
        correct_count,
        failures,
        reference_missing,
        invalid_payload: None,
    }
}

/// Grade a decoded answer payload, flagging it when it was rejected.
///
/// A rejected payload scores 0 with no contours and carries the decoding
/// error in [`GraphicEvaluation::invalid_payload`].
pub fn evaluate_graphic_payload(
    reference: &[Annotation],
    submission: &Result<Vec<Submission>, SubmissionError>,
    config: &GradingConfig,
) -> GraphicEvaluation {
    match submission {
        Ok(submissions) => evaluate_graphic_answer(reference, submissions, config),
        Err(err) => {
            tracing::warn!("invalid graphic payload: {err}");
            GraphicEvaluation {
                invalid_payload: Some(err.to_string()),
                ..evaluate_graphic_answer(reference, &[], config)
            }
        }
    }
}

/// Find the best reference annotation for one submission.
pub fn match_contour(
    reference: &[Annotation],
    submission: &Submission,
    config: &GradingConfig,
) -> Result<MatchDetail, ContourFailure> {
    let contour = match submission {
        Submission::Contour(c) => c,
        Submission::Malformed { reason } => {
            return Err(ContourFailure::MalformedPayload {
                reason: reason.clone(),
            })
        }
    };
    if contour.points.len() < MIN_POLYGON_POINTS {
        return Err(ContourFailure::TooFewPoints {
            count: contour.points.len(),
        });
    }

    let user_label = contour
        .label
        .clone()
        .unwrap_or_else(|| config.unknown_label.clone());

    let mut best: Option<MatchDetail> = None;
    for (reference_index, annotation) in reference.iter().enumerate() {
        let metrics = calculate_metrics(
            &contour.points,
            &annotation.contour,
            Some(&annotation.label),
            Some(&user_label),
            &config.label,
            &config.raster,
        );
        let score = comprehensive_score(&metrics, &config.weights);
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(MatchDetail {
                reference_index,
                reference_label: annotation.label.clone(),
                user_label: user_label.clone(),
                score,
                metrics,
            });
        }
    }

    best.ok_or(ContourFailure::ReferenceNotFound)
}

// ---------------------------------------------------------------------------
// Open-text answers
// ---------------------------------------------------------------------------

/// How an open answer was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMatch {
    Exact,
    Partial,
    EmptyResponse,
}

/// Result of grading one open-text answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenEvaluation {
    pub score: f64,
    pub match_type: OpenMatch,
    /// Character-overlap similarity, set for partial matches.
    pub similarity: Option<f64>,
}

/// Partial credit never exceeds this.
const OPEN_PARTIAL_CAP: f64 = 0.5;

/// Grade an open-text answer.
///
/// Both sides are compared lowercase and trimmed. An exact match earns
/// 1.0; otherwise the share of answer characters found anywhere in the
/// expected answer (relative to the expected length) earns up to 0.5.
pub fn score_open_answer(expected: Option<&str>, answer: Option<&str>) -> OpenEvaluation {
    let expected = expected.map(|s| s.trim().to_lowercase()).unwrap_or_default();
    let answer = answer.map(|s| s.trim().to_lowercase()).unwrap_or_default();

    if expected.is_empty() || answer.is_empty() {
        return OpenEvaluation {
            score: 0.0,
            match_type: OpenMatch::EmptyResponse,
            similarity: None,
        };
    }

    if expected == answer {
        return OpenEvaluation {
            score: 1.0,
            match_type: OpenMatch::Exact,
            similarity: None,
        };
    }

    let common = answer.chars().filter(|c| expected.contains(*c)).count();
    let similarity = common as f64 / expected.chars().count() as f64;
    OpenEvaluation {
        score: similarity.min(OPEN_PARTIAL_CAP),
        match_type: OpenMatch::Partial,
        similarity: Some(similarity),
    }
}

// ---------------------------------------------------------------------------
// Test-level aggregation
// ---------------------------------------------------------------------------

/// A learner's response to one question, with what is needed to grade it.
#[derive(Debug, Clone)]
pub struct QuestionResponse {
    pub question_id: u64,
    pub kind: ResponseKind,
}

/// Per-type grading inputs.
#[derive(Debug, Clone)]
pub enum ResponseKind {
    Open {
        expected: Option<String>,
        answer: Option<String>,
    },
    Graphic {
        reference: Vec<Annotation>,
        /// Decoded submission, or the error from decoding its payload.
        submission: Result<Vec<Submission>, SubmissionError>,
    },
}

/// Per-question grading detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionOutcome {
    Open(OpenEvaluation),
    Graphic(GraphicEvaluation),
    /// The graphic payload as a whole could not be decoded.
    InvalidPayload { reason: String },
}

/// Score and detail for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionGrade {
    pub question_id: u64,
    pub score: f64,
    pub outcome: QuestionOutcome,
}

/// Result of grading a whole test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestGrade {
    /// Mean of question scores, in `[0, 1]`.
    pub score: f64,
    /// Sum of question scores.
    pub raw_score: f64,
    pub questions: Vec<QuestionGrade>,
}

/// Grade every question of a test and average the scores.
pub fn grade_test(responses: &[QuestionResponse], config: &GradingConfig) -> TestGrade {
    let questions: Vec<QuestionGrade> = responses
        .iter()
        .map(|response| grade_question(response, config))
        .collect();

    let raw_score: f64 = questions.iter().map(|q| q.score).sum();
    let score = if questions.is_empty() {
        0.0
    } else {
        raw_score / questions.len() as f64
    };

    tracing::info!(
        questions = questions.len(),
        score,
        "graded test"
    );

    TestGrade {
        score,
        raw_score,
        questions,
    }
}

fn grade_question(response: &QuestionResponse, config: &GradingConfig) -> QuestionGrade {
    let (score, outcome) = match &response.kind {
        ResponseKind::Open { expected, answer } => {
            let eval = score_open_answer(expected.as_deref(), answer.as_deref());
            (eval.score, QuestionOutcome::Open(eval))
        }
        ResponseKind::Graphic {
            reference,
            submission: Ok(submissions),
        } => {
            let eval = evaluate_graphic_answer(reference, submissions, config);
            (eval.comprehensive_score, QuestionOutcome::Graphic(eval))
        }
        ResponseKind::Graphic {
            submission: Err(err),
            ..
        } => {
            tracing::warn!(question = response.question_id, "invalid graphic payload: {err}");
            (
                0.0,
                QuestionOutcome::InvalidPayload {
                    reason: err.to_string(),
                },
            )
        }
    };

    QuestionGrade {
        question_id: response.question_id,
        score,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Point;

    fn square(x: f64, y: f64, side: f64) -> Vec<Point> {
        vec![
            Point::new(x, y),
            Point::new(x + side, y),
            Point::new(x + side, y + side),
            Point::new(x, y + side),
        ]
    }

    fn annotation(label: &str, contour: Vec<Point>) -> Annotation {
        Annotation {
            label: label.into(),
            contour,
        }
    }

    fn drawn(points: Vec<Point>, label: Option<&str>) -> Submission {
        SubmittedContour {
            points,
            label: label.map(String::from),
        }
        .into()
    }

    #[test]
    fn identical_square_scores_one() {
        let reference = vec![annotation("lesion", square(0.0, 0.0, 10.0))];
        let submissions = vec![drawn(square(0.0, 0.0, 10.0), Some("lesion"))];
        let eval = evaluate_graphic_answer(&reference, &submissions, &GradingConfig::default());

        assert!((eval.comprehensive_score - 1.0).abs() < 1e-9);
        assert_eq!(eval.correct_count, 1);
        assert_eq!(eval.total_contours, 1);
        assert!(eval.failures.is_empty());
        let detail = eval.detail[0].as_ref().unwrap();
        assert_eq!(detail.metrics.iou, 1.0);
        assert_eq!(detail.metrics.chamfer_distance, 0.0);
        assert!((eval.breakdown.iou - 0.4).abs() < 1e-9);
    }

    #[test]
    fn distant_square_scores_only_label_term() {
        let reference = vec![annotation("lesion", square(0.0, 0.0, 10.0))];
        let submissions = vec![drawn(square(100.0, 100.0, 10.0), Some("lesion"))];
        let eval = evaluate_graphic_answer(&reference, &submissions, &GradingConfig::default());

        let m = &eval.detail[0].as_ref().unwrap().metrics;
        assert_eq!(m.iou, 0.0);
        assert_eq!(m.presence_score, 0.0);
        // Only the 0.3 label tier survives: 0.3 * 0.1.
        assert!((eval.comprehensive_score - 0.03).abs() < 1e-9);
        assert_eq!(eval.correct_count, 0);
    }

    #[test]
    fn best_reference_wins() {
        let reference = vec![
            annotation("kidney", square(50.0, 50.0, 10.0)),
            annotation("liver", square(0.0, 0.0, 10.0)),
        ];
        let submissions = vec![drawn(square(0.0, 0.0, 10.0), Some("liver"))];
        let eval = evaluate_graphic_answer(&reference, &submissions, &GradingConfig::default());
        let detail = eval.detail[0].as_ref().unwrap();
        assert_eq!(detail.reference_index, 1);
        assert_eq!(detail.reference_label, "liver");
    }

    #[test]
    fn reference_may_be_matched_twice() {
        let reference = vec![annotation("liver", square(0.0, 0.0, 10.0))];
        let submissions = vec![
            drawn(square(0.0, 0.0, 10.0), Some("liver")),
            drawn(square(1.0, 0.0, 10.0), Some("liver")),
        ];
        let eval = evaluate_graphic_answer(&reference, &submissions, &GradingConfig::default());
        assert!(eval
            .detail
            .iter()
            .all(|d| d.as_ref().unwrap().reference_index == 0));
        assert_eq!(eval.correct_count, 2);
    }

    #[test]
    fn missing_label_uses_sentinel() {
        let reference = vec![annotation("liver", square(0.0, 0.0, 10.0))];
        let submissions = vec![drawn(square(0.0, 0.0, 10.0), None)];
        let eval = evaluate_graphic_answer(&reference, &submissions, &GradingConfig::default());
        let detail = eval.detail[0].as_ref().unwrap();
        assert_eq!(detail.user_label, "unknown");
        assert_eq!(detail.metrics.label_match, 0.0);
        assert!((eval.comprehensive_score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn failures_are_isolated_and_tagged() {
        let reference = vec![annotation("liver", square(0.0, 0.0, 10.0))];
        let submissions = vec![
            drawn(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)], Some("liver")),
            Submission::Malformed {
                reason: "points is not a list".into(),
            },
            drawn(square(0.0, 0.0, 10.0), Some("liver")),
        ];
        let eval = evaluate_graphic_answer(&reference, &submissions, &GradingConfig::default());

        assert_eq!(eval.per_contour_scores.len(), 3);
        assert_eq!(eval.per_contour_scores[0], 0.0);
        assert_eq!(eval.per_contour_scores[1], 0.0);
        assert!((eval.per_contour_scores[2] - 1.0).abs() < 1e-9);
        assert!((eval.comprehensive_score - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(
            eval.failures,
            vec![
                ContourIssue {
                    index: 0,
                    failure: ContourFailure::TooFewPoints { count: 2 },
                },
                ContourIssue {
                    index: 1,
                    failure: ContourFailure::MalformedPayload {
                        reason: "points is not a list".into(),
                    },
                },
            ]
        );
        assert!(eval.detail[0].is_none());
    }

    #[test]
    fn no_reference_is_tagged() {
        let submissions = vec![drawn(square(0.0, 0.0, 10.0), Some("liver"))];
        let eval = evaluate_graphic_answer(&[], &submissions, &GradingConfig::default());
        assert!(eval.reference_missing);
        assert_eq!(eval.comprehensive_score, 0.0);
        assert_eq!(eval.failures[0].failure, ContourFailure::ReferenceNotFound);
    }

    #[test]
    fn no_submissions_scores_zero() {
        let reference = vec![annotation("liver", square(0.0, 0.0, 10.0))];
        let eval = evaluate_graphic_answer(&reference, &[], &GradingConfig::default());
        assert_eq!(eval.comprehensive_score, 0.0);
        assert_eq!(eval.total_contours, 0);
        assert_eq!(eval.breakdown, ScoreBreakdown::default());
    }

    #[test]
    fn adversarial_contours_stay_in_range() {
        let reference = vec![
            annotation("a", square(0.0, 0.0, 10.0)),
            annotation("a", vec![Point::new(1.0, 1.0); 3]),
        ];
        let submissions = vec![
            drawn(vec![Point::new(5.0, 5.0); 3], Some("a")),
            drawn(
                vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(20.0, 0.0)],
                Some("A"),
            ),
            drawn(square(-1.0e7, -1.0e7, 2.0e7), Some("a")),
        ];
        let eval = evaluate_graphic_answer(&reference, &submissions, &GradingConfig::default());
        for score in &eval.per_contour_scores {
            assert!((0.0..=1.0).contains(score), "score out of range: {score}");
        }
    }

    #[test]
    fn open_answer_exact_and_partial() {
        let exact = score_open_answer(Some("Aorta"), Some("  aorta "));
        assert_eq!(exact.match_type, OpenMatch::Exact);
        assert_eq!(exact.score, 1.0);

        let partial = score_open_answer(Some("aorta"), Some("aorat"));
        assert_eq!(partial.match_type, OpenMatch::Partial);
        assert_eq!(partial.similarity, Some(1.0));
        assert_eq!(partial.score, 0.5);

        let weak = score_open_answer(Some("abcd"), Some("axyz"));
        assert_eq!(weak.similarity, Some(0.25));
        assert_eq!(weak.score, 0.25);

        let empty = score_open_answer(Some("aorta"), Some("   "));
        assert_eq!(empty.match_type, OpenMatch::EmptyResponse);
        assert_eq!(score_open_answer(None, Some("x")).score, 0.0);
    }

    #[test]
    fn test_score_is_mean_of_questions() {
        let responses = vec![
            QuestionResponse {
                question_id: 1,
                kind: ResponseKind::Open {
                    expected: Some("aorta".into()),
                    answer: Some("Aorta".into()),
                },
            },
            QuestionResponse {
                question_id: 2,
                kind: ResponseKind::Graphic {
                    reference: vec![annotation("liver", square(0.0, 0.0, 10.0))],
                    submission: Ok(vec![drawn(square(0.0, 0.0, 10.0), Some("liver"))]),
                },
            },
            QuestionResponse {
                question_id: 3,
                kind: ResponseKind::Graphic {
                    reference: vec![annotation("liver", square(0.0, 0.0, 10.0))],
                    submission: Err(SubmissionError::NotAList),
                },
            },
        ];
        let grade = grade_test(&responses, &GradingConfig::default());
        assert_eq!(grade.questions.len(), 3);
        assert!((grade.raw_score - 2.0).abs() < 1e-9);
        assert!((grade.score - 2.0 / 3.0).abs() < 1e-9);
        assert!(matches!(
            grade.questions[2].outcome,
            QuestionOutcome::InvalidPayload { .. }
        ));
    }

    #[test]
    fn empty_test_scores_zero() {
        let grade = grade_test(&[], &GradingConfig::default());
        assert_eq!(grade.score, 0.0);
    }

    #[test]
    fn rejected_payload_is_flagged() {
        let reference = vec![annotation("liver", square(0.0, 0.0, 10.0))];
        let eval = evaluate_graphic_payload(
            &reference,
            &Err(SubmissionError::NotAList),
            &GradingConfig::default(),
        );
        assert_eq!(eval.comprehensive_score, 0.0);
        assert_eq!(eval.total_contours, 0);
        assert_eq!(
            eval.invalid_payload.as_deref(),
            Some(SubmissionError::NotAList.to_string().as_str())
        );

        let ok = evaluate_graphic_payload(
            &reference,
            &Ok(vec![drawn(square(0.0, 0.0, 10.0), Some("liver"))]),
            &GradingConfig::default(),
        );
        assert!(ok.invalid_payload.is_none());
        assert!(ok.comprehensive_score > 0.99);
    }

    #[test]
    fn results_are_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GraphicEvaluation>();
        assert_send_sync::<QuestionResponse>();
        assert_send_sync::<TestGrade>();
        assert_send_sync::<GradingConfig>();
    }
}
