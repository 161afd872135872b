//! Storage for one named secondary index
//!
//! Entries are `(key, term) -> entity ids`, where the term is the textual
//! form of the indexed value. Exact indices match whole terms; full-text
//! indices tokenize terms into lowercase words at query time.

use super::query::QueryExpr;
use super::IndexConfig;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

static WORD: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\w+").expect("word pattern compiles"));

/// Split text into lowercase word tokens
pub fn tokenize(text: &str) -> Vec<String> {
    WORD.find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Scored hits keyed by raw entity id
pub type Hits = FxHashMap<u64, f32>;

/// One named index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStore {
    config: IndexConfig,
    /// key -> term -> entity ids
    entries: BTreeMap<String, BTreeMap<String, BTreeSet<u64>>>,
}

impl IndexStore {
    pub fn new(config: IndexConfig) -> Self {
        IndexStore {
            config,
            entries: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn is_fulltext(&self) -> bool {
        self.config.fulltext
    }

    /// Add an entry; adding an existing entry is a no-op
    pub fn insert(&mut self, entity: u64, key: &str, term: String) {
        self.entries
            .entry(key.to_string())
            .or_default()
            .entry(term)
            .or_default()
            .insert(entity);
    }

    /// Remove entries of `entity`, narrowed by `key` and `term` when given.
    ///
    /// Returns the number of entries removed; missing entries are ignored.
    pub fn remove(&mut self, entity: u64, key: Option<&str>, term: Option<&str>) -> usize {
        let mut removed = 0;
        for (entry_key, terms) in self.entries.iter_mut() {
            if key.is_some_and(|k| k != entry_key) {
                continue;
            }
            for (entry_term, ids) in terms.iter_mut() {
                if term.is_some_and(|t| t != entry_term) {
                    continue;
                }
                if ids.remove(&entity) {
                    removed += 1;
                }
            }
            terms.retain(|_, ids| !ids.is_empty());
        }
        self.entries.retain(|_, terms| !terms.is_empty());
        removed
    }

    /// Number of (key, term, entity) entries
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .flat_map(|terms| terms.values())
            .map(BTreeSet::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entity with at least one entry
    pub fn entities(&self) -> BTreeSet<u64> {
        self.entries
            .values()
            .flat_map(|terms| terms.values())
            .flatten()
            .copied()
            .collect()
    }

    /// Entities indexed under `key` whose term matches `term`
    ///
    /// Exact indices compare whole terms; full-text indices require every
    /// token of `term` to occur in the indexed value.
    pub fn get(&self, key: &str, term: &str) -> Hits {
        if self.config.fulltext {
            self.match_tokens(key, &tokenize(term), false)
        } else {
            self.match_terms(key, |candidate| candidate == term)
        }
    }

    /// Single-field query: a trailing `*` asks for a prefix match
    pub fn query_field(&self, key: &str, text: &str) -> Hits {
        match text.strip_suffix('*') {
            Some(prefix) => self.eval(&QueryExpr::Prefix {
                key: key.to_string(),
                text: prefix.to_string(),
            }),
            None => self.get(key, text),
        }
    }

    /// Evaluate a parsed query
    pub fn eval(&self, expr: &QueryExpr) -> Hits {
        match expr {
            QueryExpr::Term { key, text } => self.get(key, text),
            QueryExpr::Phrase { key, text } => {
                if self.config.fulltext {
                    self.match_tokens(key, &tokenize(text), true)
                } else {
                    self.match_terms(key, |candidate| candidate == text)
                }
            }
            QueryExpr::Prefix { key, text } => {
                if self.config.fulltext {
                    let prefix = text.to_lowercase();
                    self.score_entries(key, |tokens| {
                        let hit = tokens.iter().filter(|t| t.starts_with(&prefix)).count();
                        fraction(hit, tokens.len())
                    })
                } else {
                    self.match_terms(key, |candidate| candidate.starts_with(text.as_str()))
                }
            }
            QueryExpr::Not(inner) => {
                let excluded = self.eval(inner);
                self.entities()
                    .into_iter()
                    .filter(|id| !excluded.contains_key(id))
                    .map(|id| (id, 0.0))
                    .collect()
            }
            QueryExpr::And(items) => {
                let mut iter = items.iter();
                let mut acc = match iter.next() {
                    Some(first) => self.eval(first),
                    None => return Hits::default(),
                };
                for item in iter {
                    let next = self.eval(item);
                    acc.retain(|id, _| next.contains_key(id));
                    for (id, score) in acc.iter_mut() {
                        *score += next.get(id).copied().unwrap_or(0.0);
                    }
                }
                acc
            }
            QueryExpr::Or(items) => {
                let mut acc = Hits::default();
                for item in items {
                    for (id, score) in self.eval(item) {
                        let slot = acc.entry(id).or_insert(score);
                        *slot = slot.max(score);
                    }
                }
                acc
            }
        }
    }

    fn match_terms(&self, key: &str, matches: impl Fn(&str) -> bool) -> Hits {
        let mut hits = Hits::default();
        if let Some(terms) = self.entries.get(key) {
            for (term, ids) in terms {
                if matches(term) {
                    hits.extend(ids.iter().map(|&id| (id, 1.0)));
                }
            }
        }
        hits
    }

    fn match_tokens(&self, key: &str, wanted: &[String], contiguous: bool) -> Hits {
        if wanted.is_empty() {
            return Hits::default();
        }
        self.score_entries(key, |tokens| {
            let found = if contiguous {
                tokens.windows(wanted.len()).any(|window| window == wanted)
            } else {
                wanted.iter().all(|w| tokens.contains(w))
            };
            if !found {
                return 0.0;
            }
            let hit = tokens.iter().filter(|t| wanted.contains(t)).count();
            fraction(hit, tokens.len())
        })
    }

    /// Score every entry under `key`, keeping the best positive score per entity
    fn score_entries(&self, key: &str, score: impl Fn(&[String]) -> f32) -> Hits {
        let mut hits = Hits::default();
        let Some(terms) = self.entries.get(key) else {
            return hits;
        };
        for (term, ids) in terms {
            let s = score(&tokenize(term));
            if s <= 0.0 {
                continue;
            }
            for &id in ids {
                let slot = hits.entry(id).or_insert(s);
                *slot = slot.max(s);
            }
        }
        hits
    }
}

fn fraction(hit: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        hit as f32 / total as f32
    }
}

/// Order hits by descending score, then ascending id
pub fn ranked(hits: Hits) -> Vec<(u64, f32)> {
    let mut ranked: Vec<(u64, f32)> = hits.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
}
