//! The knowledge base: canonical subjects and their geopolitical attributes.
//!
//! A [`KnowledgeBase`] is validated once at load time and never changes
//! afterwards. Canonical names and aliases are normalised to trimmed lowercase
//! on the way in, and no alias may shadow another subject.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The document compiled into the binary, used when no knowledge file is
/// configured.
const BUILTIN_KNOWLEDGE: &str = include_str!("../data/knowledge.json");

fn default_weight() -> f64 { 1.0 }

/// Trim and lowercase a subject name or alias.
pub fn normalize(name: &str) -> String { name.trim().to_lowercase() }

// ─── Entry ───────────────────────────────────────────────────────────────────

/// Attributes of one canonical subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
  /// Free-text grouping, e.g. "Political Leader", "Country", "Concept".
  pub category:           String,
  #[serde(default)]
  pub country_code:       Option<String>,
  /// Inherent lean in [-1, 1]: negative is pro-Russian/anti-Western,
  /// positive is pro-Western/anti-Russian.
  pub alignment_tendency: f64,
  #[serde(default = "default_weight")]
  pub weight:             f64,
  #[serde(default)]
  pub aliases:            BTreeSet<String>,
}

impl KnowledgeEntry {
  pub fn new(category: impl Into<String>, alignment_tendency: f64) -> Self {
    Self {
      category: category.into(),
      country_code: None,
      alignment_tendency,
      weight: default_weight(),
      aliases: BTreeSet::new(),
    }
  }

  pub fn with_weight(mut self, weight: f64) -> Self {
    self.weight = weight;
    self
  }

  pub fn with_country(mut self, code: impl Into<String>) -> Self {
    self.country_code = Some(code.into());
    self
  }

  pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
    self.aliases.insert(alias.into());
    self
  }
}

// ─── Knowledge base ──────────────────────────────────────────────────────────

/// An immutable, validated table of canonical subjects.
///
/// Serialises back to the same JSON shape it is loaded from, which is what
/// the content analyser receives as context.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct KnowledgeBase {
  entries: BTreeMap<String, KnowledgeEntry>,
}

impl KnowledgeBase {
  /// Validate and normalise a set of entries keyed by canonical name.
  pub fn new(
    entries: impl IntoIterator<Item = (String, KnowledgeEntry)>,
  ) -> Result<Self> {
    let mut normalized: BTreeMap<String, KnowledgeEntry> = BTreeMap::new();

    for (name, mut entry) in entries {
      let canonical = normalize(&name);
      if canonical.is_empty() {
        return Err(Error::EmptyCanonicalName(name));
      }
      if !entry.alignment_tendency.is_finite()
        || !(-1.0..=1.0).contains(&entry.alignment_tendency)
      {
        return Err(Error::InvalidTendency {
          subject: canonical,
          value:   entry.alignment_tendency,
        });
      }
      if !entry.weight.is_finite() || entry.weight < 0.0 {
        return Err(Error::InvalidWeight {
          subject: canonical,
          value:   entry.weight,
        });
      }

      entry.aliases = entry
        .aliases
        .iter()
        .map(|a| normalize(a))
        .filter(|a| !a.is_empty() && *a != canonical)
        .collect();

      if normalized.insert(canonical.clone(), entry).is_some() {
        return Err(Error::DuplicateCanonicalName(canonical));
      }
    }

    // Every name that resolves to a subject, mapped to its owner.
    let mut owners: HashMap<&str, &str> = normalized
      .keys()
      .map(|k| (k.as_str(), k.as_str()))
      .collect();

    for (canonical, entry) in &normalized {
      for alias in &entry.aliases {
        let previous = owners.insert(alias.as_str(), canonical.as_str());
        if let Some(existing) = previous {
          return Err(Error::AliasCollision {
            alias:    alias.clone(),
            subject:  canonical.clone(),
            existing: existing.to_owned(),
          });
        }
      }
    }

    Ok(Self { entries: normalized })
  }

  /// Parse the external JSON form: an object mapping canonical name to entry.
  pub fn from_json(json: &str) -> Result<Self> {
    let raw: BTreeMap<String, KnowledgeEntry> = serde_json::from_str(json)?;
    Self::new(raw)
  }

  /// The knowledge base shipped with the crate.
  pub fn builtin() -> Result<Self> { Self::from_json(BUILTIN_KNOWLEDGE) }

  /// Look up an entry by its canonical (already normalised) name.
  pub fn get(&self, canonical: &str) -> Option<&KnowledgeEntry> {
    self.entries.get(canonical)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &KnowledgeEntry)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  /// Pretty JSON for inclusion in a content-analysis request.
  pub fn to_context_json(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }
}
