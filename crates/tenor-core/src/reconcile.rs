//! Reconciliation of the deterministic score with the generator's score.
//!
//! The two scores are blended unless they point in opposite, significant
//! directions. In that case the knowledge-grounded score wins outright: a
//! blend of +0.6 and −0.6 would read as a neutral 0.0 and hide the
//! disagreement.

use crate::{
  KnowledgeIndex,
  scoring::{clamp_unit, deterministic_score},
  subject::{EnrichedSubject, IdentifiedSubject},
};

/// Scores with a magnitude at or below this are neutral for clash detection.
pub const SIGN_DEAD_ZONE: f64 = 0.2;

/// Default weight of the deterministic score in the blend.
pub const DEFAULT_BLEND: f64 = 0.5;

/// Sign of a score once the dead zone is taken into account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignClass {
  Positive,
  Negative,
  Neutral,
}

impl SignClass {
  pub fn of(score: f64) -> Self {
    if score > SIGN_DEAD_ZONE {
      Self::Positive
    } else if score < -SIGN_DEAD_ZONE {
      Self::Negative
    } else {
      Self::Neutral
    }
  }

  /// Whether two classifications point in opposite directions. Neutral never
  /// clashes with anything.
  pub fn clashes_with(self, other: Self) -> bool {
    matches!(
      (self, other),
      (Self::Positive, Self::Negative) | (Self::Negative, Self::Positive)
    )
  }
}

/// The outcome of reconciling one item's scores.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
  pub final_alignment:         f64,
  pub deterministic_alignment: f64,
  /// `|deterministic − external|`, in [0, 2].
  pub alignment_conflict:      f64,
  /// True when the deterministic score overrode the blend.
  pub sign_clash:              bool,
  /// The input subjects, in order, annotated from the knowledge base.
  pub subjects:                Vec<EnrichedSubject>,
}

/// Combine the deterministic score for `subjects` with `external`.
///
/// `blend` is the weight given to the deterministic score: 0 trusts the
/// external score entirely, 1 trusts the deterministic score entirely. Values
/// outside [0, 1] are clamped into it, and a NaN blend falls back to
/// [`DEFAULT_BLEND`]. A non-finite `external` is read as neutral (`0.0`).
pub fn reconcile(
  index: &KnowledgeIndex,
  subjects: &[IdentifiedSubject],
  external: f64,
  blend: f64,
) -> Reconciliation {
  let alpha = if blend.is_nan() {
    DEFAULT_BLEND
  } else {
    blend.clamp(0.0, 1.0)
  };
  let external = if external.is_finite() { external } else { 0.0 };
  let det = deterministic_score(index, subjects);
  let conflict = (det - external).abs();

  let sign_clash = SignClass::of(external).clashes_with(SignClass::of(det));
  let final_alignment = if sign_clash {
    det
  } else {
    (1.0 - alpha) * external + alpha * det
  };

  Reconciliation {
    final_alignment: clamp_unit(final_alignment),
    deterministic_alignment: det,
    alignment_conflict: conflict,
    sign_clash,
    subjects: subjects.iter().map(|s| enrich(index, s)).collect(),
  }
}

fn enrich(
  index: &KnowledgeIndex,
  subject: &IdentifiedSubject,
) -> EnrichedSubject {
  let entry = index.lookup(&subject.subject);
  let expected = entry.map_or(0.0, |e| e.alignment_tendency);

  EnrichedSubject {
    subject:            subject.subject.clone(),
    stance:             subject.stance,
    is_in_knowledge:    entry.is_some(),
    expected_alignment: expected,
    alignment_score:    subject.stance * expected,
    alignment_gap:      (subject.stance - expected).abs(),
  }
}
