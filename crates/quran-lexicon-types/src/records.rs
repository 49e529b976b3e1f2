use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::location::WordLocation;
use crate::loose;

fn first_text<'a>(fields: &[&'a Option<String>]) -> Option<&'a str> {
    fields.iter().find_map(|f| f.as_deref())
}

fn location_parts(
    word_location: &Option<String>,
    surah: Option<i64>,
    ayah: Option<i64>,
    token_index: Option<i64>,
) -> WordLocation {
    if surah.is_some() && ayah.is_some() {
        return WordLocation {
            surah,
            ayah,
            token_index,
        };
    }
    word_location
        .as_deref()
        .and_then(WordLocation::from_key)
        .unwrap_or_default()
}

fn location_key(
    word_location: &Option<String>,
    surah: Option<i64>,
    ayah: Option<i64>,
    token_index: Option<i64>,
) -> Option<String> {
    if let Some(direct) = word_location.as_deref() {
        return Some(direct.trim().to_string());
    }
    WordLocation {
        surah,
        ayah,
        token_index,
    }
    .key()
}

fn merged_extra(defaults: &Map<String, Value>, overrides: &Map<String, Value>) -> Map<String, Value> {
    let mut out = defaults.clone();
    for (key, value) in overrides {
        if !value.is_null() {
            out.insert(key.clone(), value.clone());
        }
    }
    out
}

/// `morphology.singular` / `morphology.plural` feature block.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FormFeatures {
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Nested `morphology` object embedded in lesson payload records.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MorphologyFeatures {
    #[serde(default, deserialize_with = "loose::lenient", skip_serializing_if = "Option::is_none")]
    pub singular: Option<FormFeatures>,
    #[serde(default, deserialize_with = "loose::lenient", skip_serializing_if = "Option::is_none")]
    pub plural: Option<FormFeatures>,
    #[serde(default, deserialize_with = "loose::raw", skip_serializing_if = "Option::is_none")]
    pub derivation: Option<Value>,
    #[serde(default, deserialize_with = "loose::lenient", skip_serializing_if = "Option::is_none")]
    pub morph_features: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Gloss attached to a morphology record, either plain text or `{primary, alternatives}`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Translation {
    pub primary: Option<String>,
    pub alternatives: Vec<String>,
}

impl Translation {
    fn from_value(value: &Value) -> Option<Self> {
        if let Some(object) = loose::parse_if_string::<Map<String, Value>>(value) {
            return Some(Self {
                primary: object.get("primary").and_then(loose::text_value),
                alternatives: match object.get("alternatives") {
                    Some(Value::Array(items)) => items.iter().filter_map(loose::text_value).collect(),
                    _ => Vec::new(),
                },
            });
        }
        match value {
            Value::String(_) => Some(Self {
                primary: loose::text_value(value),
                alternatives: Vec::new(),
            }),
            _ => None,
        }
    }
}

/// Word-level morphology analysis, from the lesson payload or `/ar/morphology`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MorphologyRecord {
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub ar_u_lexicon: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub lexicon_id: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub ar_u_morphology: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub canonical_input: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub surface_ar: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub surface_norm: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub lemma_ar: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub lemma_norm: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub root_norm: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub pos2: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub morph_pattern: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub derived_pattern: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub verb_form: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub derived_from_verb_form: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub derivation_type: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub noun_number: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub transitivity: Option<String>,
    #[serde(default, deserialize_with = "loose::number", skip_serializing_if = "Option::is_none")]
    pub obj_count: Option<i64>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub word_location: Option<String>,
    #[serde(default, deserialize_with = "loose::number", skip_serializing_if = "Option::is_none")]
    pub surah: Option<i64>,
    #[serde(default, deserialize_with = "loose::number", skip_serializing_if = "Option::is_none")]
    pub ayah: Option<i64>,
    #[serde(default, deserialize_with = "loose::number", skip_serializing_if = "Option::is_none")]
    pub token_index: Option<i64>,
    #[serde(default, deserialize_with = "loose::raw", skip_serializing_if = "Option::is_none")]
    pub translation: Option<Value>,
    #[serde(default, deserialize_with = "loose::raw", skip_serializing_if = "Option::is_none")]
    pub morphology: Option<Value>,
    #[serde(default, deserialize_with = "loose::raw", skip_serializing_if = "Option::is_none")]
    pub tags_ar: Option<Value>,
    #[serde(default, deserialize_with = "loose::raw", skip_serializing_if = "Option::is_none")]
    pub tags_en: Option<Value>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "loose::raw", skip_serializing_if = "Option::is_none")]
    pub synonyms_json: Option<Value>,
    #[serde(default, deserialize_with = "loose::raw", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MorphologyRecord {
    pub fn lexicon_id(&self) -> Option<&str> {
        first_text(&[&self.ar_u_lexicon, &self.lexicon_id])
    }

    pub fn morphology_id(&self) -> Option<&str> {
        self.ar_u_morphology.as_deref()
    }

    pub fn root(&self) -> Option<&str> {
        first_text(&[&self.root_norm, &self.root])
    }

    pub fn lemma(&self) -> Option<&str> {
        first_text(&[&self.lemma_ar, &self.lemma_norm])
    }

    pub fn pos(&self) -> Option<&str> {
        first_text(&[&self.pos, &self.pos2])
    }

    /// Pattern from the flat columns, falling back to `morphology.singular.pattern`.
    pub fn pattern(&self) -> Option<String> {
        if let Some(direct) = first_text(&[
            &self.morph_pattern,
            &self.derived_pattern,
            &self.verb_form,
            &self.pattern,
        ]) {
            return Some(direct.to_string());
        }
        self.features()?.singular?.pattern
    }

    pub fn features(&self) -> Option<MorphologyFeatures> {
        self.morphology.as_ref().and_then(loose::parse_if_string)
    }

    pub fn translation(&self) -> Option<Translation> {
        self.translation.as_ref().and_then(Translation::from_value)
    }

    pub fn location_key(&self) -> Option<String> {
        location_key(&self.word_location, self.surah, self.ayah, self.token_index)
    }

    pub fn location_parts(&self) -> WordLocation {
        location_parts(&self.word_location, self.surah, self.ayah, self.token_index)
    }

    /// Shallow merge: fields present on `self` win, `defaults` fills the gaps.
    pub fn merged_over(&self, defaults: &MorphologyRecord) -> MorphologyRecord {
        let d = defaults;
        MorphologyRecord {
            ar_u_lexicon: self.ar_u_lexicon.clone().or_else(|| d.ar_u_lexicon.clone()),
            lexicon_id: self.lexicon_id.clone().or_else(|| d.lexicon_id.clone()),
            ar_u_morphology: self.ar_u_morphology.clone().or_else(|| d.ar_u_morphology.clone()),
            canonical_input: self.canonical_input.clone().or_else(|| d.canonical_input.clone()),
            surface_ar: self.surface_ar.clone().or_else(|| d.surface_ar.clone()),
            surface_norm: self.surface_norm.clone().or_else(|| d.surface_norm.clone()),
            lemma_ar: self.lemma_ar.clone().or_else(|| d.lemma_ar.clone()),
            lemma_norm: self.lemma_norm.clone().or_else(|| d.lemma_norm.clone()),
            word: self.word.clone().or_else(|| d.word.clone()),
            text: self.text.clone().or_else(|| d.text.clone()),
            root: self.root.clone().or_else(|| d.root.clone()),
            root_norm: self.root_norm.clone().or_else(|| d.root_norm.clone()),
            pos: self.pos.clone().or_else(|| d.pos.clone()),
            pos2: self.pos2.clone().or_else(|| d.pos2.clone()),
            morph_pattern: self.morph_pattern.clone().or_else(|| d.morph_pattern.clone()),
            derived_pattern: self.derived_pattern.clone().or_else(|| d.derived_pattern.clone()),
            verb_form: self.verb_form.clone().or_else(|| d.verb_form.clone()),
            derived_from_verb_form: self
                .derived_from_verb_form
                .clone()
                .or_else(|| d.derived_from_verb_form.clone()),
            pattern: self.pattern.clone().or_else(|| d.pattern.clone()),
            derivation_type: self.derivation_type.clone().or_else(|| d.derivation_type.clone()),
            noun_number: self.noun_number.clone().or_else(|| d.noun_number.clone()),
            transitivity: self.transitivity.clone().or_else(|| d.transitivity.clone()),
            obj_count: self.obj_count.or(d.obj_count),
            word_location: self.word_location.clone().or_else(|| d.word_location.clone()),
            surah: self.surah.or(d.surah),
            ayah: self.ayah.or(d.ayah),
            token_index: self.token_index.or(d.token_index),
            translation: self.translation.clone().or_else(|| d.translation.clone()),
            morphology: self.morphology.clone().or_else(|| d.morphology.clone()),
            tags_ar: self.tags_ar.clone().or_else(|| d.tags_ar.clone()),
            tags_en: self.tags_en.clone().or_else(|| d.tags_en.clone()),
            notes: self.notes.clone().or_else(|| d.notes.clone()),
            synonyms_json: self.synonyms_json.clone().or_else(|| d.synonyms_json.clone()),
            meta: self.meta.clone().or_else(|| d.meta.clone()),
            extra: merged_extra(&d.extra, &self.extra),
        }
    }
}

/// Join row between a lexicon entry and one morphology analysis.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LexiconLinkRecord {
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub ar_u_lexicon: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub lexicon_id: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub ar_u_morphology: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub link_role: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub surface_ar: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub surface_norm: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub root_norm: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub pos2: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub morph_pattern: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub derived_pattern: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub verb_form: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub derivation_type: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub transitivity: Option<String>,
    #[serde(default, deserialize_with = "loose::number", skip_serializing_if = "Option::is_none")]
    pub obj_count: Option<i64>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub noun_number: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "loose::raw", skip_serializing_if = "Option::is_none")]
    pub tags_ar: Option<Value>,
    #[serde(default, deserialize_with = "loose::raw", skip_serializing_if = "Option::is_none")]
    pub tags_en: Option<Value>,
    #[serde(default, deserialize_with = "loose::raw", skip_serializing_if = "Option::is_none")]
    pub synonyms_json: Option<Value>,
    #[serde(default, deserialize_with = "loose::raw", skip_serializing_if = "Option::is_none")]
    pub morphology: Option<Value>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub word_location: Option<String>,
    #[serde(default, deserialize_with = "loose::number", skip_serializing_if = "Option::is_none")]
    pub surah: Option<i64>,
    #[serde(default, deserialize_with = "loose::number", skip_serializing_if = "Option::is_none")]
    pub ayah: Option<i64>,
    #[serde(default, deserialize_with = "loose::number", skip_serializing_if = "Option::is_none")]
    pub token_index: Option<i64>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LexiconLinkRecord {
    pub fn lexicon_id(&self) -> Option<&str> {
        first_text(&[&self.ar_u_lexicon, &self.lexicon_id])
    }

    pub fn morphology_id(&self) -> Option<&str> {
        self.ar_u_morphology.as_deref()
    }

    pub fn surface(&self) -> Option<&str> {
        first_text(&[&self.surface_ar, &self.surface_norm])
    }

    pub fn root(&self) -> Option<&str> {
        first_text(&[&self.root_norm, &self.root])
    }

    pub fn pos(&self) -> Option<&str> {
        first_text(&[&self.pos2, &self.pos])
    }

    pub fn pattern(&self) -> Option<String> {
        if let Some(direct) = first_text(&[
            &self.morph_pattern,
            &self.derived_pattern,
            &self.verb_form,
            &self.pattern,
        ]) {
            return Some(direct.to_string());
        }
        self.morphology
            .as_ref()
            .and_then(loose::parse_if_string::<MorphologyFeatures>)?
            .singular?
            .pattern
    }

    pub fn location_key(&self) -> Option<String> {
        location_key(&self.word_location, self.surah, self.ayah, self.token_index)
    }

    pub fn location_parts(&self) -> WordLocation {
        location_parts(&self.word_location, self.surah, self.ayah, self.token_index)
    }

    /// Shallow merge: fields present on `self` win, `defaults` fills the gaps.
    pub fn merged_over(&self, defaults: &LexiconLinkRecord) -> LexiconLinkRecord {
        let d = defaults;
        LexiconLinkRecord {
            ar_u_lexicon: self.ar_u_lexicon.clone().or_else(|| d.ar_u_lexicon.clone()),
            lexicon_id: self.lexicon_id.clone().or_else(|| d.lexicon_id.clone()),
            ar_u_morphology: self.ar_u_morphology.clone().or_else(|| d.ar_u_morphology.clone()),
            link_role: self.link_role.clone().or_else(|| d.link_role.clone()),
            surface_ar: self.surface_ar.clone().or_else(|| d.surface_ar.clone()),
            surface_norm: self.surface_norm.clone().or_else(|| d.surface_norm.clone()),
            root: self.root.clone().or_else(|| d.root.clone()),
            root_norm: self.root_norm.clone().or_else(|| d.root_norm.clone()),
            pos: self.pos.clone().or_else(|| d.pos.clone()),
            pos2: self.pos2.clone().or_else(|| d.pos2.clone()),
            morph_pattern: self.morph_pattern.clone().or_else(|| d.morph_pattern.clone()),
            derived_pattern: self.derived_pattern.clone().or_else(|| d.derived_pattern.clone()),
            verb_form: self.verb_form.clone().or_else(|| d.verb_form.clone()),
            pattern: self.pattern.clone().or_else(|| d.pattern.clone()),
            derivation_type: self.derivation_type.clone().or_else(|| d.derivation_type.clone()),
            transitivity: self.transitivity.clone().or_else(|| d.transitivity.clone()),
            obj_count: self.obj_count.or(d.obj_count),
            noun_number: self.noun_number.clone().or_else(|| d.noun_number.clone()),
            notes: self.notes.clone().or_else(|| d.notes.clone()),
            tags_ar: self.tags_ar.clone().or_else(|| d.tags_ar.clone()),
            tags_en: self.tags_en.clone().or_else(|| d.tags_en.clone()),
            synonyms_json: self.synonyms_json.clone().or_else(|| d.synonyms_json.clone()),
            morphology: self.morphology.clone().or_else(|| d.morphology.clone()),
            word_location: self.word_location.clone().or_else(|| d.word_location.clone()),
            surah: self.surah.or(d.surah),
            ayah: self.ayah.or(d.ayah),
            token_index: self.token_index.or(d.token_index),
            created_at: self.created_at.clone().or_else(|| d.created_at.clone()),
            extra: merged_extra(&d.extra, &self.extra),
        }
    }
}

/// Citation or extract supporting a lexicon entry or a word occurrence.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub evidence_id: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub ar_u_lexicon: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub lexicon_id: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
    #[serde(default, deserialize_with = "loose::number", skip_serializing_if = "Option::is_none")]
    pub page_no: Option<i64>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub heading_raw: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub extract_text: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub note_md: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub link_role: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub word_location: Option<String>,
    #[serde(default, deserialize_with = "loose::number", skip_serializing_if = "Option::is_none")]
    pub surah: Option<i64>,
    #[serde(default, deserialize_with = "loose::number", skip_serializing_if = "Option::is_none")]
    pub ayah: Option<i64>,
    #[serde(default, deserialize_with = "loose::number", skip_serializing_if = "Option::is_none")]
    pub token_index: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EvidenceRecord {
    /// Convert a remote `book-search` row into the local evidence shape.
    pub fn from_row(row: &EvidenceRow, lexicon_id: &str) -> Self {
        Self {
            ar_u_lexicon: (!lexicon_id.is_empty()).then(|| lexicon_id.to_string()),
            source_type: Some(row.source_code.clone().unwrap_or_else(|| "source".to_string())),
            source_id: row.source_code.clone(),
            heading_raw: row.title.clone(),
            page_no: row.page_no,
            chunk_id: row.chunk_id.clone(),
            extract_text: row.extract_text.clone(),
            note_md: row.notes.clone(),
            link_role: Some("supports".to_string()),
            ..Self::default()
        }
    }

    pub fn lexicon_id(&self) -> Option<&str> {
        first_text(&[&self.ar_u_lexicon, &self.lexicon_id])
    }

    pub fn location_key(&self) -> Option<String> {
        location_key(&self.word_location, self.surah, self.ayah, self.token_index)
    }

    pub fn location_parts(&self) -> WordLocation {
        location_parts(&self.word_location, self.surah, self.ayah, self.token_index)
    }

    pub fn has_extract(&self) -> bool {
        self.extract_text.is_some()
    }

    pub fn heading(&self) -> String {
        if let Some(text) = first_text(&[&self.extract_text, &self.heading_raw]) {
            return text.to_string();
        }
        match self.location_key() {
            Some(location) => format!("Word {location}"),
            None => "Evidence".to_string(),
        }
    }

    pub fn source_label(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        for part in [&self.heading_raw, &self.source_type, &self.source_id]
            .into_iter()
            .flatten()
        {
            parts.push(part.clone());
        }
        if let Some(chunk) = &self.chunk_id {
            parts.push(format!("chunk:{chunk}"));
        }
        if let Some(page) = self.page_no {
            parts.push(format!("p.{page}"));
        }
        if !parts.is_empty() {
            return parts.join(" | ");
        }
        match self.location_key() {
            Some(location) => format!("Word {location}"),
            None => "Source not set".to_string(),
        }
    }

    pub fn role(&self) -> String {
        match self.link_role.as_deref().map(str::to_lowercase) {
            None => "supports".to_string(),
            Some(role) if role == "contradicts" => "conflicts".to_string(),
            Some(role) => role,
        }
    }

    pub fn note(&self) -> Option<&str> {
        first_text(&[&self.note_md, &self.extract_text])
    }

    /// Key used to drop duplicates when local and remote evidence are combined.
    pub fn dedup_key(&self, fallback_lexicon_id: &str) -> String {
        [
            self.lexicon_id().unwrap_or(fallback_lexicon_id),
            first_text(&[&self.source_id, &self.source_type]).unwrap_or_default(),
            self.chunk_id.as_deref().unwrap_or_default(),
            self.extract_text.as_deref().unwrap_or_default(),
            self.note_md.as_deref().unwrap_or_default(),
        ]
        .join("|")
    }
}

/// Evidence row as returned by `GET /ar/book-search?mode=lexicon`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRow {
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub source_code: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
    #[serde(default, deserialize_with = "loose::number", skip_serializing_if = "Option::is_none")]
    pub page_no: Option<i64>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub extract_text: Option<String>,
    #[serde(default, deserialize_with = "loose::text", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
