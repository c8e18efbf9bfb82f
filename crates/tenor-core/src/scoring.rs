//! Deterministic, knowledge-grounded alignment scoring.

use crate::{KnowledgeIndex, subject::IdentifiedSubject};

/// Clamp to [-1, 1].
pub fn clamp_unit(value: f64) -> f64 { value.clamp(-1.0, 1.0) }

/// Weighted mean of `stance × tendency` over the subjects the knowledge base
/// knows, normalised by `Σ |tendency × weight|` and clamped to [-1, 1].
///
/// Unknown subjects and subjects with a zero tendency are left out of both
/// the numerator and the denominator, so they cannot dilute the score. So are
/// subjects whose contribution is not finite (a NaN or infinite stance). An
/// empty input, or one with no scoring subjects, yields `0.0`, and the result
/// is always finite.
pub fn deterministic_score(
  index: &KnowledgeIndex,
  subjects: &[IdentifiedSubject],
) -> f64 {
  let mut total_contrib = 0.0;
  let mut total_weight = 0.0;

  for item in subjects {
    let (tendency, weight) = index
      .lookup(&item.subject)
      .map(|e| (e.alignment_tendency, e.weight))
      .unwrap_or((0.0, 1.0));

    let contribution = item.stance * tendency * weight;
    if tendency == 0.0 || !contribution.is_finite() {
      continue;
    }
    total_contrib += contribution;
    total_weight += (tendency * weight).abs();
  }

  let score = total_contrib / total_weight;
  if total_weight > 0.0 && score.is_finite() {
    clamp_unit(score)
  } else {
    0.0
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::knowledge::{KnowledgeBase, KnowledgeEntry};

  fn index(entries: Vec<(&str, KnowledgeEntry)>) -> KnowledgeIndex {
    let kb = KnowledgeBase::new(
      entries.into_iter().map(|(k, v)| (k.to_string(), v)),
    )
    .unwrap();
    KnowledgeIndex::new(kb).unwrap()
  }

  fn s(name: &str, stance: f64) -> IdentifiedSubject {
    IdentifiedSubject::new(name, stance)
  }

  #[test]
  fn empty_input_scores_zero() {
    let idx = index(vec![]);
    assert_eq!(deterministic_score(&idx, &[]), 0.0);
  }

  #[test]
  fn praising_a_weighted_negative_subject_scores_minus_one() {
    let idx = index(vec![(
      "russia",
      KnowledgeEntry::new("Country", -1.0).with_weight(2.0),
    )]);
    assert_eq!(deterministic_score(&idx, &[s("russia", 1.0)]), -1.0);
  }

  #[test]
  fn unknown_subject_scores_zero_regardless_of_stance() {
    let idx = index(vec![]);
    assert_eq!(deterministic_score(&idx, &[s("someone", 1.0)]), 0.0);
    assert_eq!(deterministic_score(&idx, &[s("someone", -1.0)]), 0.0);
  }

  #[test]
  fn unknown_and_zero_tendency_subjects_do_not_dilute() {
    let idx = index(vec![
      ("nato", KnowledgeEntry::new("Alliance", 1.0)),
      ("war", KnowledgeEntry::new("Concept", 0.0)),
    ]);
    let alone = deterministic_score(&idx, &[s("nato", 0.5)]);
    let mixed = deterministic_score(
      &idx,
      &[s("nato", 0.5), s("war", 1.0), s("the weather", -1.0)],
    );
    assert_eq!(alone, 0.5);
    assert_eq!(mixed, alone);
  }

  #[test]
  fn aliases_are_resolved_before_lookup() {
    let idx = index(vec![(
      "vladimir putin",
      KnowledgeEntry::new("Political Leader", -1.0).with_alias("putin"),
    )]);
    assert_eq!(deterministic_score(&idx, &[s("  PUTIN ", -1.0)]), 1.0);
  }

  #[test]
  fn weights_shift_the_mean() {
    let idx = index(vec![
      ("ukraine", KnowledgeEntry::new("Country", 1.0).with_weight(3.0)),
      ("russia", KnowledgeEntry::new("Country", -1.0)),
    ]);
    // (1·1·3 + 1·(−1)·1) / (3 + 1) = 0.5
    let score =
      deterministic_score(&idx, &[s("ukraine", 1.0), s("russia", 1.0)]);
    assert!((score - 0.5).abs() < 1e-12);
  }

  #[test]
  fn out_of_range_stances_are_clamped_in_the_result() {
    let idx = index(vec![("nato", KnowledgeEntry::new("Alliance", 1.0))]);
    assert_eq!(deterministic_score(&idx, &[s("nato", 5.0)]), 1.0);
    assert_eq!(deterministic_score(&idx, &[s("nato", -5.0)]), -1.0);
  }

  #[test]
  fn non_finite_stances_are_skipped() {
    let idx = index(vec![
      ("nato", KnowledgeEntry::new("Alliance", 1.0)),
      ("eu", KnowledgeEntry::new("Organization", 1.0)),
    ]);
    assert_eq!(deterministic_score(&idx, &[s("nato", f64::NAN)]), 0.0);
    assert_eq!(
      deterministic_score(
        &idx,
        &[s("nato", f64::INFINITY), s("eu", f64::NEG_INFINITY)]
      ),
      0.0
    );
    assert_eq!(
      deterministic_score(&idx, &[s("nato", f64::NAN), s("eu", 0.5)]),
      0.5
    );
  }

  #[test]
  fn huge_opposing_stances_still_score_in_bounds() {
    let idx = index(vec![
      ("nato", KnowledgeEntry::new("Alliance", 1.0).with_weight(4.0)),
      ("eu", KnowledgeEntry::new("Organization", 1.0).with_weight(4.0)),
    ]);
    let score =
      deterministic_score(&idx, &[s("nato", f64::MAX), s("eu", -f64::MAX)]);
    assert!((-1.0..=1.0).contains(&score), "{score}");
  }

  #[test]
  fn score_stays_within_bounds() {
    let tendencies = [-1.0, -0.6, -0.2, 0.0, 0.3, 1.0];
    let weights = [0.0, 0.5, 1.0, 4.0];
    let stances = [-3.0, -1.0, -0.4, 0.0, 0.7, 1.0, 2.5];

    for &t in &tendencies {
      for &w in &weights {
        let idx = index(vec![
          ("a", KnowledgeEntry::new("Concept", t).with_weight(w)),
          ("b", KnowledgeEntry::new("Concept", -t).with_weight(1.0)),
        ]);
        for &x in &stances {
          for &y in &stances {
            let score = deterministic_score(&idx, &[s("a", x), s("b", y)]);
            assert!(
              (-1.0..=1.0).contains(&score),
              "t={t} w={w} x={x} y={y} → {score}"
            );
          }
        }
      }
    }
  }
}
