//! Core data model types for quizforge.
//!
//! These are the types shared by the grading engine and the variant
//! generator: points and contours, reference annotations, bank questions
//! and the slot constraints that make up a test structure.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 2D point in image coordinates.
///
/// Serialized as a two-element array `[x, y]`, which is how annotation
/// tools and the drawing canvas exchange point data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// An ordered sequence of points describing a polygon boundary.
///
/// The last point is not required to repeat the first one; the polygon is
/// always treated as closed.
pub type Contour = Vec<Point>;

/// Minimum number of points for a contour to describe a polygon.
pub const MIN_POLYGON_POINTS: usize = 3;

/// A labelled reference region for a graphic question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    /// Region label (e.g. "liver").
    pub label: String,
    /// Region outline.
    pub contour: Contour,
}

/// Kind of question stored in the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    /// Free-text answer compared against an expected string.
    Open,
    /// Contour drawing graded against reference annotations.
    Graphic,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::Open => write!(f, "open"),
            QuestionType::Graphic => write!(f, "graphic"),
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(QuestionType::Open),
            "graphic" => Ok(QuestionType::Graphic),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// A question in the bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Unique question identifier.
    pub id: u64,
    /// Topic the question belongs to.
    pub topic_id: String,
    /// Kind of question.
    pub question_type: QuestionType,
    /// User who authored the question.
    pub creator_id: u64,
    /// Question text shown to the learner.
    #[serde(default)]
    pub text: String,
    /// Expected answer for open questions.
    #[serde(default)]
    pub correct_answer: Option<String>,
}

/// Lightweight reference to a bank question, as returned by lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionRef {
    pub id: u64,
}

impl From<&Question> for QuestionRef {
    fn from(q: &Question) -> Self {
        Self { id: q.id }
    }
}

/// One slot of a test structure.
///
/// Topic identifiers are kept as strings since the bank is keyed by
/// whatever the collaborator stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotConstraint {
    pub topic_id: String,
    pub question_type: String,
}

impl SlotConstraint {
    pub fn new(topic_id: impl Into<String>, question_type: QuestionType) -> Self {
        Self {
            topic_id: topic_id.into(),
            question_type: question_type.to_string(),
        }
    }

    /// The slot's question type, if it names a known one.
    pub fn parsed_type(&self) -> Option<QuestionType> {
        self.question_type.parse().ok()
    }
}

/// A test definition: metadata plus the ordered slot structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDefinition {
    /// Unique identifier for this test.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Description of the test.
    #[serde(default)]
    pub description: String,
    /// Ordered slot constraints; repeats are allowed.
    #[serde(default)]
    pub structure: Vec<SlotConstraint>,
}
