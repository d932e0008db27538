//! Constrained exam-variant generation.
//!
//! A variant picks one bank question per structure slot. Each variant is
//! built in a local buffer and only kept if every slot was filled, so a
//! batch can partially succeed without ever producing a short variant.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::VariantConfig;
use crate::error::GenerationError;
use crate::model::{Question, QuestionRef, SlotConstraint};

// ---------------------------------------------------------------------------
// Question bank access
// ---------------------------------------------------------------------------

/// Read-only lookup of candidate questions for a slot.
///
/// Implementations are expected to apply any ownership scoping already;
/// the generator only asks for matches.
pub trait QuestionBank {
    /// All questions matching the slot's topic and type.
    fn candidates(&self, slot: &SlotConstraint) -> Vec<QuestionRef>;
}

impl<F> QuestionBank for F
where
    F: Fn(&SlotConstraint) -> Vec<QuestionRef>,
{
    fn candidates(&self, slot: &SlotConstraint) -> Vec<QuestionRef> {
        self(slot)
    }
}

/// Which part of the bank a caller may draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum BankScope {
    /// Only questions authored by this user.
    Owner { user_id: u64 },
    /// The whole bank.
    Elevated,
}

impl BankScope {
    pub fn allows(&self, question: &Question) -> bool {
        match self {
            BankScope::Owner { user_id } => question.creator_id == *user_id,
            BankScope::Elevated => true,
        }
    }
}

/// A question bank held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBank {
    questions: Vec<Question>,
}

impl InMemoryBank {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// A view of the bank restricted to `scope`.
    pub fn scoped(&self, scope: BankScope) -> ScopedBank<'_> {
        ScopedBank { bank: self, scope }
    }

    fn matching<'a>(
        &'a self,
        slot: &'a SlotConstraint,
    ) -> impl Iterator<Item = &'a Question> + 'a {
        let wanted = slot.parsed_type();
        self.questions
            .iter()
            .filter(move |q| q.topic_id == slot.topic_id && Some(q.question_type) == wanted)
    }
}

impl QuestionBank for InMemoryBank {
    fn candidates(&self, slot: &SlotConstraint) -> Vec<QuestionRef> {
        self.matching(slot).map(QuestionRef::from).collect()
    }
}

/// An [`InMemoryBank`] seen through a [`BankScope`].
#[derive(Debug, Clone, Copy)]
pub struct ScopedBank<'a> {
    bank: &'a InMemoryBank,
    scope: BankScope,
}

impl QuestionBank for ScopedBank<'_> {
    fn candidates(&self, slot: &SlotConstraint) -> Vec<QuestionRef> {
        self.bank
            .matching(slot)
            .filter(|q| self.scope.allows(q))
            .map(QuestionRef::from)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// One fully resolved variant: a question id per slot, in slot order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub questions: Vec<u64>,
}

/// A slot for which the bank had no candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotExhausted {
    /// 1-based index of the aborted variant within the batch.
    pub variant: usize,
    /// 1-based index of the slot that could not be filled.
    pub slot: usize,
    pub topic_id: String,
    pub question_type: String,
}

impl std::fmt::Display for SlotExhausted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "no questions for topic {}, type {} (variant {}, slot {})",
            self.topic_id, self.question_type, self.variant, self.slot
        )
    }
}

/// Outcome of a batch: the variants that completed and every abort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantBatch {
    pub variants: Vec<Variant>,
    pub errors: Vec<SlotExhausted>,
}

impl VariantBatch {
    /// Human-readable error lines.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check a structure and count before sampling.
pub fn validate_request(
    structure: &[SlotConstraint],
    count: usize,
    config: &VariantConfig,
) -> Result<(), GenerationError> {
    if count < 1 || count > config.max_batch {
        return Err(GenerationError::CountOutOfRange {
            requested: count,
            max: config.max_batch,
        });
    }
    if structure.is_empty() {
        return Err(GenerationError::EmptyStructure);
    }
    for (i, slot) in structure.iter().enumerate() {
        if slot.topic_id.trim().is_empty() {
            return Err(GenerationError::EmptySlot {
                slot: i + 1,
                field: "topic_id",
            });
        }
        if slot.question_type.trim().is_empty() {
            return Err(GenerationError::EmptySlot {
                slot: i + 1,
                field: "question_type",
            });
        }
        if slot.parsed_type().is_none() {
            return Err(GenerationError::UnknownSlotType {
                slot: i + 1,
                value: slot.question_type.clone(),
            });
        }
    }
    Ok(())
}

/// Generate `count` independent variants of `structure`.
///
/// The count and structure are validated up front and the whole call is
/// rejected on violation. After that, each variant either fills every
/// slot or contributes one [`SlotExhausted`] error and nothing else.
pub fn generate_variants<B, R>(
    structure: &[SlotConstraint],
    count: usize,
    bank: &B,
    rng: &mut R,
    config: &VariantConfig,
) -> Result<VariantBatch, GenerationError>
where
    B: QuestionBank + ?Sized,
    R: Rng + ?Sized,
{
    validate_request(structure, count, config)?;

    let mut batch = VariantBatch::default();
    for variant in 1..=count {
        match generate_one(structure, variant, bank, rng) {
            Ok(v) => batch.variants.push(v),
            Err(e) => {
                tracing::warn!("{e}");
                batch.errors.push(e);
            }
        }
    }

    tracing::info!(
        requested = count,
        generated = batch.variants.len(),
        failed = batch.errors.len(),
        "variant batch complete"
    );
    Ok(batch)
}

/// Build a single variant, discarding partial selections on failure.
fn generate_one<B, R>(
    structure: &[SlotConstraint],
    variant: usize,
    bank: &B,
    rng: &mut R,
) -> Result<Variant, SlotExhausted>
where
    B: QuestionBank + ?Sized,
    R: Rng + ?Sized,
{
    let mut picked = Vec::with_capacity(structure.len());
    for (i, slot) in structure.iter().enumerate() {
        let candidates = bank.candidates(slot);
        let Some(choice) = candidates.choose(rng) else {
            return Err(SlotExhausted {
                variant,
                slot: i + 1,
                topic_id: slot.topic_id.clone(),
                question_type: slot.question_type.clone(),
            });
        };
        picked.push(choice.id);
    }
    tracing::debug!(variant, questions = ?picked, "variant generated");
    Ok(Variant { questions: picked })
}

/// Decode a structure stored as JSON text.
pub fn parse_structure_json(raw: &str) -> Result<Vec<SlotConstraint>, GenerationError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw).map_err(|e| GenerationError::InvalidStructure(e.to_string()))
}
