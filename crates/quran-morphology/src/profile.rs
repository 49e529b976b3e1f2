//! The merged, display-ready view of one resolved selection.
//!
//! A profile is derived, never cached: it is rebuilt from a [`LocalResolution`]
//! and the current [`RemoteView`] whenever either changes.

use std::collections::HashSet;

use quran_lexicon_types::loose;
use quran_lexicon_types::{
    EvidenceRecord, LexiconBundle, LexiconLinkRecord, LexiconMorphology, MorphologyRecord,
    SynonymWord,
};
use serde::Serialize;
use serde_json::Value;

use crate::normalize::{looks_arabic, parse_location};
use crate::resolve::LocalResolution;
use crate::synonyms::{embedded_synonyms, related_terms, synonym_chips};

/// Placeholder rendered for missing values.
pub const PLACEHOLDER: &str = "—";

/// What is currently known about the remote bundle for a selection.
#[derive(Clone, Copy, Debug, Default)]
pub struct RemoteView<'a> {
    pub bundle: Option<&'a LexiconBundle>,
    pub loading: bool,
    pub error: Option<&'a str>,
}

impl<'a> RemoteView<'a> {
    pub fn ready(bundle: &'a LexiconBundle) -> Self {
        Self {
            bundle: Some(bundle),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InspectorField {
    pub id: &'static str,
    pub label: &'static str,
    pub value: String,
    pub arabic: bool,
}

impl InspectorField {
    fn new(id: &'static str, label: &'static str, value: Option<&str>) -> Self {
        Self {
            id,
            label,
            value: value.filter(|v| !v.is_empty()).unwrap_or(PLACEHOLDER).to_string(),
            arabic: false,
        }
    }

    fn arabic(mut self, arabic: bool) -> Self {
        self.arabic = arabic;
        self
    }

    pub fn is_placeholder(&self) -> bool {
        self.value == PLACEHOLDER
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MorphologyFeature {
    pub key: String,
    pub value: String,
}

/// An evidence record with its rendered display strings.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvidenceEntry {
    pub heading: String,
    pub source: String,
    pub role: String,
    pub note: Option<String>,
    pub record: EvidenceRecord,
}

impl From<EvidenceRecord> for EvidenceEntry {
    fn from(record: EvidenceRecord) -> Self {
        Self {
            heading: record.heading(),
            source: record.source_label(),
            role: record.role(),
            note: record.note().map(str::to_string),
            record,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ResolvedProfile {
    pub word: String,
    pub location: String,
    pub reference: String,
    pub lexicon_id: Option<String>,
    pub root: Option<String>,
    pub lemma: Option<String>,
    pub pattern: Option<String>,
    pub pos: Option<String>,
    pub meaning: Option<String>,
    pub meaning_alternatives: Vec<String>,
    pub morphology_id: Option<String>,
    pub verb_form: Option<String>,
    pub derivation: Option<String>,
    pub transitivity: Option<String>,
    pub obj_count: Option<i64>,
    pub noun_number: Option<String>,
    pub features: Vec<MorphologyFeature>,
    pub related_terms: Vec<String>,
    pub synonym_chips: Vec<String>,
    pub evidence: Vec<EvidenceEntry>,
    pub evidence_display_count: usize,
    pub morphology: Option<MorphologyRecord>,
    pub link: Option<LexiconLinkRecord>,
    pub remote_loading: bool,
    pub remote_error: Option<String>,
}

/// Local fields override remote ones; either side alone is used as is.
fn merge_morphology(
    local: Option<&MorphologyRecord>,
    remote: Option<&MorphologyRecord>,
) -> Option<MorphologyRecord> {
    match (local, remote) {
        (Some(local), Some(remote)) => Some(local.merged_over(remote)),
        (local, remote) => local.or(remote).cloned(),
    }
}

fn merge_link(
    local: Option<&LexiconLinkRecord>,
    remote: Option<&LexiconLinkRecord>,
) -> Option<LexiconLinkRecord> {
    match (local, remote) {
        (Some(local), Some(remote)) => Some(local.merged_over(remote)),
        (local, remote) => local.or(remote).cloned(),
    }
}

/// Flatten a feature value for display. Objects are rendered as compact JSON.
pub fn value_to_display_text(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(value_to_display_text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
        other => loose::text_value(other).unwrap_or_default(),
    }
}

fn collect_features(
    morphology: Option<&MorphologyRecord>,
    payload: Option<&LexiconMorphology>,
) -> Vec<MorphologyFeature> {
    let mut features = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |key: &str, value: String| {
        if !value.is_empty() && seen.insert(key.to_string()) {
            features.push(MorphologyFeature {
                key: key.to_string(),
                value,
            });
        }
    };

    if let Some(record) = morphology {
        if let Some(block) = record.features().and_then(|f| f.morph_features) {
            for (key, value) in &block {
                push(key, value_to_display_text(value));
            }
        }
        for (key, value) in [("tags_ar", &record.tags_ar), ("tags_en", &record.tags_en)] {
            if let Some(value) = value {
                push(key, loose::list_value(value).join(", "));
            }
        }
    }
    if let Some(payload) = payload {
        for (key, value) in &payload.features() {
            push(key, value_to_display_text(value));
        }
    }
    features
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

impl ResolvedProfile {
    /// Merge a local resolution with the remote bundle view.
    pub fn build(local: &LocalResolution, remote: RemoteView<'_>) -> Self {
        let bundle = remote.bundle;
        let focus_id = bundle.and_then(|b| local.focused_morphology_id(b));
        let remote_morphology =
            bundle.zip(focus_id).and_then(|(b, id)| b.morphology_by_id.get(id));
        let remote_link = bundle.zip(focus_id).and_then(|(b, id)| b.link_for(id));
        let payload = bundle.and_then(|b| b.lexicon_morphology.as_ref());

        let morphology = merge_morphology(local.morphology.as_ref(), remote_morphology);
        let link = merge_link(local.link.as_ref(), remote_link);
        let m = morphology.as_ref();
        let l = link.as_ref();

        let translation = m.and_then(MorphologyRecord::translation).unwrap_or_default();
        let root = m
            .and_then(MorphologyRecord::root)
            .or_else(|| l.and_then(LexiconLinkRecord::root))
            .or_else(|| payload.and_then(|p| p.root_norm.as_deref()));
        let lemma = m
            .and_then(MorphologyRecord::lemma)
            .or_else(|| l.and_then(LexiconLinkRecord::surface))
            .or_else(|| payload.and_then(LexiconMorphology::lemma));
        let pattern = m
            .and_then(MorphologyRecord::pattern)
            .or_else(|| l.and_then(LexiconLinkRecord::pattern))
            .or_else(|| payload.and_then(|p| p.morph_pattern.clone()));
        let pos = m
            .and_then(MorphologyRecord::pos)
            .or_else(|| l.and_then(LexiconLinkRecord::pos))
            .or_else(|| payload.and_then(|p| p.pos.as_deref()));
        let meaning = translation
            .primary
            .clone()
            .or_else(|| l.and_then(|l| l.notes.clone()));

        let related = related_terms(
            &translation.alternatives,
            l.into_iter()
                .flat_map(|l| [&l.tags_en, &l.tags_ar])
                .flatten(),
        );

        let local_synonyms: Vec<SynonymWord> = [
            m.and_then(|m| m.synonyms_json.as_ref()),
            l.and_then(|l| l.synonyms_json.as_ref()),
        ]
        .into_iter()
        .flatten()
        .flat_map(embedded_synonyms)
        .collect();
        let remote_synonyms = bundle.map(|b| b.synonym_words.as_slice()).unwrap_or_default();
        let self_forms: Vec<&str> = [Some(local.selection.text.trim()), lemma, root]
            .into_iter()
            .flatten()
            .collect();
        let chips = synonym_chips(&local_synonyms, remote_synonyms, &self_forms);

        let evidence = merge_evidence(&local.evidence, bundle, local.lexicon_id());
        let evidence_display_count = evidence.iter().filter(|e| e.has_extract()).count();

        Self {
            word: local.selection.text.trim().to_string(),
            location: local.location.clone(),
            reference: reference_label(local),
            lexicon_id: local.lexicon_id.clone(),
            root: owned(root),
            lemma: owned(lemma),
            pattern,
            pos: owned(pos),
            meaning,
            meaning_alternatives: translation.alternatives.clone(),
            morphology_id: owned(
                l.and_then(LexiconLinkRecord::morphology_id)
                    .or_else(|| m.and_then(MorphologyRecord::morphology_id)),
            ),
            verb_form: l
                .and_then(|l| l.verb_form.clone())
                .or_else(|| m.and_then(|m| m.verb_form.clone())),
            derivation: l
                .and_then(|l| l.derivation_type.clone())
                .or_else(|| m.and_then(|m| m.derivation_type.clone())),
            transitivity: l
                .and_then(|l| l.transitivity.clone())
                .or_else(|| m.and_then(|m| m.transitivity.clone())),
            obj_count: l.and_then(|l| l.obj_count).or_else(|| m.and_then(|m| m.obj_count)),
            noun_number: l
                .and_then(|l| l.noun_number.clone())
                .or_else(|| m.and_then(|m| m.noun_number.clone())),
            features: collect_features(m, payload),
            related_terms: related,
            synonym_chips: chips,
            evidence: evidence.into_iter().map(EvidenceEntry::from).collect(),
            evidence_display_count,
            morphology,
            link,
            remote_loading: remote.loading,
            remote_error: owned(remote.error),
        }
    }

    pub fn has_selection(&self) -> bool {
        !self.word.is_empty()
    }

    pub fn lexicon_fields(&self) -> Vec<InspectorField> {
        let root = self.root.as_deref();
        let lemma = self.lemma.as_deref();
        vec![
            InspectorField::new("lex-word", "Word", Some(self.word.as_str())).arabic(true),
            InspectorField::new("lex-id", "ar_u_lexicon", self.lexicon_id.as_deref()),
            InspectorField::new("lex-root", "Root", root)
                .arabic(root.is_some_and(looks_arabic)),
            InspectorField::new("lex-lemma", "Lemma", lemma)
                .arabic(lemma.is_some_and(looks_arabic)),
            InspectorField::new("lex-pattern", "Pattern", self.pattern.as_deref()),
            InspectorField::new("lex-pos", "POS", self.pos.as_deref()),
            InspectorField::new("lex-meaning", "Meaning", self.meaning.as_deref()),
        ]
    }

    pub fn morphology_fields(&self) -> Vec<InspectorField> {
        let obj_count = self.obj_count.map(|n| n.to_string());
        vec![
            InspectorField::new("m-location", "Location", Some(self.location.as_str())),
            InspectorField::new("m-pos", "Part of Speech", self.pos.as_deref()),
            InspectorField::new("m-pattern", "Pattern", self.pattern.as_deref()),
            InspectorField::new("m-morph-id", "ar_u_morphology", self.morphology_id.as_deref()),
            InspectorField::new("m-verb-form", "Verb Form", self.verb_form.as_deref()),
            InspectorField::new("m-derivation", "Derivation", self.derivation.as_deref()),
            InspectorField::new("m-transitivity", "Transitivity", self.transitivity.as_deref()),
            InspectorField::new("m-obj-count", "Object Count", obj_count.as_deref()),
            InspectorField::new("m-number", "Noun Number", self.noun_number.as_deref()),
        ]
    }

    pub fn has_morphology_data(&self) -> bool {
        self.morphology.is_some() || self.link.is_some() || !self.features.is_empty()
    }

    pub fn has_lexicon_data(&self) -> bool {
        self.lexicon_fields().iter().any(|f| !f.is_placeholder()) || !self.related_terms.is_empty()
    }
}

/// `S:A[:T]` from the selection's own triple, then the parsed location, then the raw text.
fn reference_label(local: &LocalResolution) -> String {
    if let Some(key) = local.selection.fallback_location().key() {
        return key;
    }
    parse_location(&local.location, local.selection.fallback_location())
        .key()
        .unwrap_or_else(|| local.location.clone())
}

/// Locally matched evidence followed by the bundle's rows, de-duplicated.
fn merge_evidence(
    local: &[EvidenceRecord],
    bundle: Option<&LexiconBundle>,
    lexicon_id: Option<&str>,
) -> Vec<EvidenceRecord> {
    let remote = bundle
        .into_iter()
        .flat_map(|b| {
            b.evidence_rows
                .iter()
                .map(|row| EvidenceRecord::from_row(row, &b.lexicon_id))
        });
    let fallback = lexicon_id.unwrap_or_default();
    let mut seen = HashSet::new();
    local
        .iter()
        .cloned()
        .chain(remote)
        .filter(|record| seen.insert(record.dedup_key(fallback)))
        .collect()
}
