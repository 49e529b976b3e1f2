//! Synonym chips and related meaning terms.

use std::collections::HashSet;

use quran_lexicon_types::loose;
use quran_lexicon_types::{SynonymWord, parse_synonym_words};
use serde_json::Value;

use crate::normalize::normalize_arabic;

pub const MAX_SYNONYM_CHIPS: usize = 14;
pub const MAX_RELATED_TERMS: usize = 12;

/// Decode a record-embedded synonym column.
///
/// Accepts a JSON array (parsed or stringified) of strings or rows, or a plain
/// delimited list such as `"write; record | inscribe"`.
pub fn embedded_synonyms(value: &Value) -> Vec<SynonymWord> {
    if let Some(items) = loose::parse_if_string::<Vec<Value>>(value) {
        return parse_synonym_words(Some(&Value::Array(items)));
    }
    match value {
        Value::String(raw) => loose::split_list(raw)
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| SynonymWord::from_value(&Value::String(item), index))
            .collect(),
        _ => Vec::new(),
    }
}

/// Display label: `"arabic · english"` when both differ, else whichever exists.
pub fn synonym_label(word: &SynonymWord) -> Option<String> {
    let arabic = word.word_ar.as_deref().or(word.word_norm.as_deref());
    let english = word.word_en.as_deref();
    match (arabic, english) {
        (Some(ar), Some(en)) if ar != en => Some(format!("{ar} · {en}")),
        (Some(ar), _) => Some(ar.to_string()),
        (None, Some(en)) => Some(en.to_string()),
        (None, None) => None,
    }
}

/// Merge local then remote synonyms into at most [`MAX_SYNONYM_CHIPS`] labels.
///
/// A synonym whose normalized `word_norm` or `word_ar` equals any of
/// `self_forms` (the active word, lemma and root) is dropped. Labels are
/// de-duplicated case-insensitively, keeping the first.
pub fn synonym_chips<'a>(
    local: impl IntoIterator<Item = &'a SynonymWord>,
    remote: impl IntoIterator<Item = &'a SynonymWord>,
    self_forms: &[&str],
) -> Vec<String> {
    let excluded: HashSet<String> = self_forms
        .iter()
        .map(|form| normalize_arabic(form))
        .filter(|form| !form.is_empty())
        .collect();

    let is_self = |word: &SynonymWord| {
        [&word.word_norm, &word.word_ar]
            .into_iter()
            .flatten()
            .any(|form| excluded.contains(&normalize_arabic(form)))
    };

    let mut seen = HashSet::new();
    local
        .into_iter()
        .chain(remote)
        .filter(|word| !is_self(word))
        .filter_map(synonym_label)
        .filter(|label| seen.insert(label.to_lowercase()))
        .take(MAX_SYNONYM_CHIPS)
        .collect()
}

/// Meaning alternatives followed by tag tokens, de-duplicated, capped at [`MAX_RELATED_TERMS`].
pub fn related_terms<'a>(
    alternatives: &'a [String],
    tags: impl IntoIterator<Item = &'a Value>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    alternatives
        .iter()
        .cloned()
        .chain(tags.into_iter().flat_map(loose::list_value))
        .filter(|term| !term.is_empty() && seen.insert(term.clone()))
        .take(MAX_RELATED_TERMS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn word(norm: Option<&str>, ar: Option<&str>, en: Option<&str>) -> SynonymWord {
        SynonymWord {
            word_norm: norm.map(str::to_string),
            word_ar: ar.map(str::to_string),
            word_en: en.map(str::to_string),
            ..SynonymWord::default()
        }
    }

    #[test]
    fn embedded_column_shapes() {
        assert_eq!(embedded_synonyms(&json!("[\"سطر\", {\"word_ar\": \"رقم\"}]")).len(), 2);
        assert_eq!(embedded_synonyms(&json!(["سطر"])).len(), 1);
        let split = embedded_synonyms(&json!("write; record | inscribe, pen"));
        let labels: Vec<_> = split.iter().filter_map(synonym_label).collect();
        assert_eq!(labels, vec!["write", "record", "inscribe", "pen"]);
        assert!(embedded_synonyms(&json!({ "unexpected": true })).is_empty());
    }

    #[test]
    fn labels_prefer_combined_form() {
        assert_eq!(
            synonym_label(&word(None, Some("سطر"), Some("line"))).as_deref(),
            Some("سطر · line")
        );
        assert_eq!(synonym_label(&word(Some("سطر"), None, None)).as_deref(), Some("سطر"));
        assert_eq!(synonym_label(&word(None, None, Some("line"))).as_deref(), Some("line"));
        assert_eq!(synonym_label(&SynonymWord::default()), None);
    }

    #[test]
    fn self_references_are_excluded_from_every_source() {
        let local = vec![word(Some("كتب"), None, None), word(None, Some("سَطَرَ"), None)];
        let remote = vec![word(Some("كَتَبَ"), None, Some("wrote")), word(Some("رقم"), None, None)];
        let chips = synonym_chips(&local, &remote, &["كَتَبَ", "", "ك ت ب"]);
        assert_eq!(chips, vec!["سَطَرَ", "رقم"]);
    }

    #[test]
    fn dedup_is_case_insensitive_and_capped() {
        let local = vec![word(None, None, Some("Write")), word(None, None, Some("write"))];
        let remote: Vec<SynonymWord> = (0..20)
            .map(|i| word(None, None, Some(&format!("term{i}"))))
            .collect();
        let chips = synonym_chips(&local, &remote, &[]);
        assert_eq!(chips.len(), MAX_SYNONYM_CHIPS);
        assert_eq!(chips[0], "Write");
        assert_eq!(chips[1], "term0");
    }

    #[test]
    fn related_terms_merge_alternatives_and_tags() {
        let alternatives = vec!["record".to_string(), "inscribe".to_string()];
        let tags = [json!("record|prescribe"), json!(["decree"])];
        assert_eq!(
            related_terms(&alternatives, tags.iter()),
            vec!["record", "inscribe", "prescribe", "decree"]
        );
    }
}
