use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::loose;
use crate::records::{EvidenceRow, LexiconLinkRecord, MorphologyRecord};

/// One lexical alternative grouped under a synonym topic.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SynonymWord {
    pub topic_id: Option<String>,
    pub word_norm: Option<String>,
    pub word_ar: Option<String>,
    pub word_en: Option<String>,
    pub root_norm: Option<String>,
    pub root_ar: Option<String>,
    pub order_index: Option<i64>,
}

impl SynonymWord {
    /// Accept either a plain string or a structured row.
    ///
    /// A plain string fills both `word_norm` and `word_en` and takes its array
    /// position as `order_index`. Rows without any word form are rejected.
    pub fn from_value(value: &Value, index: usize) -> Option<Self> {
        match value {
            Value::String(_) => {
                let text = loose::text_value(value)?;
                Some(Self {
                    word_norm: Some(text.clone()),
                    word_en: Some(text),
                    order_index: i64::try_from(index).ok(),
                    ..Self::default()
                })
            }
            Value::Object(row) => {
                let field = |key: &str| row.get(key).and_then(loose::text_value);
                let word = Self {
                    topic_id: field("topic_id"),
                    word_norm: field("word_norm"),
                    word_ar: field("word_ar"),
                    word_en: field("word_en"),
                    root_norm: field("root_norm"),
                    root_ar: field("root_ar"),
                    order_index: row.get("order_index").and_then(loose::number_value),
                };
                word.has_word().then_some(word)
            }
            _ => None,
        }
    }

    pub fn has_word(&self) -> bool {
        self.word_norm.is_some() || self.word_ar.is_some() || self.word_en.is_some()
    }

    /// Composite identity `topic_id|word_norm|word_ar|word_en`.
    pub fn dedup_key(&self) -> String {
        [&self.topic_id, &self.word_norm, &self.word_ar, &self.word_en]
            .iter()
            .map(|f| f.as_deref().unwrap_or_default())
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// Parse a synonym array, silently skipping entries of unknown shape.
pub fn parse_synonym_words(value: Option<&Value>) -> Vec<SynonymWord> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| SynonymWord::from_value(item, index))
            .collect(),
        _ => Vec::new(),
    }
}

/// Concatenate two synonym lists, keeping the first occurrence of each composite key.
pub fn merge_synonym_words(first: Vec<SynonymWord>, second: Vec<SynonymWord>) -> Vec<SynonymWord> {
    let mut seen = HashSet::new();
    first
        .into_iter()
        .chain(second)
        .filter(|word| seen.insert(word.dedup_key()))
        .collect()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SynonymTopic {
    pub topic_id: String,
    pub topic_en: String,
    pub topic_ur: Option<String>,
    pub meta: Option<Value>,
}

impl SynonymTopic {
    /// Topics need both an id and an English label.
    pub fn from_value(value: &Value) -> Option<Self> {
        let row = value.as_object()?;
        Some(Self {
            topic_id: row.get("topic_id").and_then(loose::text_value)?,
            topic_en: row.get("topic_en").and_then(loose::text_value)?,
            topic_ur: row.get("topic_ur").and_then(loose::text_value),
            meta: row.get("meta").filter(|v| !v.is_null()).cloned(),
        })
    }
}

/// Lexicon-level morphology summary returned alongside synonyms.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LexiconMorphology {
    pub ar_u_lexicon: String,
    pub lemma_ar: Option<String>,
    pub lemma_norm: Option<String>,
    pub root_norm: Option<String>,
    pub pos: Option<String>,
    pub morph_pattern: Option<String>,
    pub morph_features: Option<Value>,
    pub morph_derivations: Option<Value>,
}

impl LexiconMorphology {
    /// Requires a non-empty `ar_u_lexicon`; JSON columns may arrive stringified.
    pub fn from_value(value: &Value) -> Option<Self> {
        let row = value.as_object()?;
        let text = |key: &str| row.get(key).and_then(loose::text_value);
        let json = |key: &str| row.get(key).and_then(loose::parse_if_string::<Value>);
        Some(Self {
            ar_u_lexicon: text("ar_u_lexicon")?,
            lemma_ar: text("lemma_ar"),
            lemma_norm: text("lemma_norm"),
            root_norm: text("root_norm"),
            pos: text("pos"),
            morph_pattern: text("morph_pattern"),
            morph_features: json("morph_features"),
            morph_derivations: json("morph_derivations"),
        })
    }

    pub fn lemma(&self) -> Option<&str> {
        self.lemma_ar.as_deref().or(self.lemma_norm.as_deref())
    }

    /// Flat `key → value` view of `morph_features` when it is an object.
    pub fn features(&self) -> Map<String, Value> {
        match &self.morph_features {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        }
    }
}

/// Everything the backend knows about one lexicon id, fetched as a unit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LexiconBundle {
    pub lexicon_id: String,
    pub morphology_links: Vec<LexiconLinkRecord>,
    pub evidence_rows: Vec<EvidenceRow>,
    pub morphology_by_id: BTreeMap<String, MorphologyRecord>,
    pub synonym_topic_ids: Vec<String>,
    pub synonym_topics: Vec<SynonymTopic>,
    pub synonym_words: Vec<SynonymWord>,
    pub lexicon_morphology: Option<LexiconMorphology>,
}

impl LexiconBundle {
    /// The "no remote data" bundle used for blank lexicon ids.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.morphology_links.is_empty()
            && self.evidence_rows.is_empty()
            && self.morphology_by_id.is_empty()
            && self.synonym_words.is_empty()
            && self.synonym_topics.is_empty()
            && self.synonym_topic_ids.is_empty()
            && self.lexicon_morphology.is_none()
    }

    /// First link pointing at `morphology_id`.
    pub fn link_for(&self, morphology_id: &str) -> Option<&LexiconLinkRecord> {
        self.morphology_links
            .iter()
            .find(|link| link.morphology_id() == Some(morphology_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_strings_become_words() {
        let words = parse_synonym_words(Some(&json!(["write", "  ", {"word_ar": "سطر"}, 5])));
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].word_norm.as_deref(), Some("write"));
        assert_eq!(words[0].word_en.as_deref(), Some("write"));
        assert_eq!(words[0].order_index, Some(0));
        assert_eq!(words[1].word_ar.as_deref(), Some("سطر"));
        assert_eq!(words[1].order_index, None);
    }

    #[test]
    fn rows_without_words_are_dropped() {
        let words = parse_synonym_words(Some(&json!([{ "topic_id": "t1", "root_norm": "كتب" }])));
        assert!(words.is_empty());
        assert!(parse_synonym_words(Some(&json!("oops"))).is_empty());
    }

    #[test]
    fn merge_dedups_on_composite_key() {
        let entries = parse_synonym_words(Some(&json!([
            { "topic_id": "t1", "word_norm": "سطر", "word_en": "line" },
            { "topic_id": "t1", "word_norm": "رقم" }
        ])));
        let from_json = parse_synonym_words(Some(&json!([
            { "topic_id": "t1", "word_norm": "سطر", "word_en": "line", "order_index": 4 },
            { "topic_id": "t2", "word_norm": "سطر", "word_en": "line" }
        ])));
        let merged = merge_synonym_words(entries, from_json);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].order_index, None);
        assert_eq!(merged[2].topic_id.as_deref(), Some("t2"));
    }

    #[test]
    fn topics_and_payload_require_ids() {
        assert!(SynonymTopic::from_value(&json!({ "topic_id": "t1" })).is_none());
        let topic = SynonymTopic::from_value(&json!({ "topic_id": "t1", "topic_en": "Writing" })).unwrap();
        assert_eq!(topic.topic_en, "Writing");

        assert!(LexiconMorphology::from_value(&json!({ "lemma_ar": "كتب" })).is_none());
        let payload = LexiconMorphology::from_value(&json!({
            "ar_u_lexicon": "L1",
            "morph_features": "{\"voice\": \"active\"}"
        }))
        .unwrap();
        assert_eq!(payload.features().get("voice"), Some(&json!("active")));
    }
}
