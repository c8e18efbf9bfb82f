//! Alias resolution over an immutable knowledge base.
//!
//! [`KnowledgeIndex`] is built once at startup and shared by reference (or
//! `Arc`) with everything that scores. There is no global cache: tests can
//! build as many indexes over alternate knowledge bases as they like.

use std::collections::HashMap;

use crate::{
  Result,
  knowledge::{KnowledgeBase, KnowledgeEntry, normalize},
};

/// A knowledge base plus its alias → canonical lookup table.
#[derive(Debug, Clone)]
pub struct KnowledgeIndex {
  knowledge: KnowledgeBase,
  aliases:   HashMap<String, String>,
  /// Serialised knowledge base, rendered once for analysis requests.
  context:   String,
}

impl KnowledgeIndex {
  pub fn new(knowledge: KnowledgeBase) -> Result<Self> {
    let mut aliases = HashMap::new();
    for (canonical, entry) in knowledge.iter() {
      aliases.insert(canonical.to_owned(), canonical.to_owned());
      for alias in &entry.aliases {
        aliases.insert(alias.clone(), canonical.to_owned());
      }
    }
    let context = knowledge.to_context_json()?;
    Ok(Self { knowledge, aliases, context })
  }

  /// Map a free-text subject name to its canonical name.
  ///
  /// Unknown names resolve to their own trimmed, lowercased form.
  pub fn resolve(&self, name: &str) -> String {
    let key = normalize(name);
    match self.aliases.get(&key) {
      Some(canonical) => canonical.clone(),
      None => key,
    }
  }

  /// Resolve `name` and fetch its entry, if the subject is known.
  pub fn lookup(&self, name: &str) -> Option<&KnowledgeEntry> {
    self.knowledge.get(&self.resolve(name))
  }

  pub fn knowledge(&self) -> &KnowledgeBase { &self.knowledge }

  /// The knowledge base as pretty JSON.
  pub fn context_json(&self) -> &str { &self.context }
}
