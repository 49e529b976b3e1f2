//! Weighted best-match scoring of loosely-keyed records against a selection.
//!
//! Scores are additive and pure: the same candidate and target always produce
//! the same number. Zero means "no match". Among positive scores the highest
//! wins and ties keep the first-seen record, because the scan only replaces
//! the current best on a strictly greater score.

use std::fs;
use std::io;
use std::path::Path;

use quran_lexicon_types::{EvidenceRecord, LexiconLinkRecord, MorphologyRecord, WordLocation};
use serde::{Deserialize, Serialize};

use crate::normalize::normalize_arabic;

/// Tunable scoring constants. Defaults reproduce the production weights.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub exact_location: u32,
    pub partial_location: u32,
    pub text_match: u32,
    pub link_lexicon: u32,
    pub evidence_lexicon: u32,
    pub evidence_extract: u32,
    pub evidence_heading: u32,
    pub pattern_bonus: u32,
    pub pos_bonus: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            exact_location: 14,
            partial_location: 9,
            text_match: 6,
            link_lexicon: 5,
            evidence_lexicon: 8,
            evidence_extract: 5,
            evidence_heading: 2,
            pattern_bonus: 1,
            pos_bonus: 1,
        }
    }
}

impl ScoreWeights {
    /// Load overrides from a JSON file; keys that are absent keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Text columns compared against the selected word, in priority order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TextField {
    SurfaceAr,
    SurfaceNorm,
    LemmaAr,
    LemmaNorm,
    Word,
    Text,
}

pub const MORPHOLOGY_TEXT_FIELDS: &[TextField] = &[
    TextField::SurfaceAr,
    TextField::SurfaceNorm,
    TextField::LemmaAr,
    TextField::LemmaNorm,
    TextField::Word,
    TextField::Text,
];

pub const LINK_TEXT_FIELDS: &[TextField] = &[TextField::SurfaceAr, TextField::SurfaceNorm];

/// Normalized view of the selection that candidates are scored against.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ScoreTarget {
    pub location: String,
    pub parts: WordLocation,
    pub word: String,
    pub preferred_lexicon_id: Option<String>,
}

impl ScoreTarget {
    pub fn with_lexicon(&self, lexicon_id: Option<&str>) -> Self {
        Self {
            preferred_lexicon_id: lexicon_id.filter(|id| !id.is_empty()).map(str::to_string),
            ..self.clone()
        }
    }
}

/// Typed accessors the scorer needs from a record.
pub trait Candidate {
    fn location_key(&self) -> Option<String>;
    fn location_parts(&self) -> WordLocation;
    fn lexicon_id(&self) -> Option<&str>;
    fn text_field(&self, field: TextField) -> Option<&str>;
    fn pattern(&self) -> Option<String>;
    fn pos(&self) -> Option<&str>;
}

impl Candidate for MorphologyRecord {
    fn location_key(&self) -> Option<String> {
        MorphologyRecord::location_key(self)
    }

    fn location_parts(&self) -> WordLocation {
        MorphologyRecord::location_parts(self)
    }

    fn lexicon_id(&self) -> Option<&str> {
        MorphologyRecord::lexicon_id(self)
    }

    fn text_field(&self, field: TextField) -> Option<&str> {
        match field {
            TextField::SurfaceAr => self.surface_ar.as_deref(),
            TextField::SurfaceNorm => self.surface_norm.as_deref(),
            TextField::LemmaAr => self.lemma_ar.as_deref(),
            TextField::LemmaNorm => self.lemma_norm.as_deref(),
            TextField::Word => self.word.as_deref(),
            TextField::Text => self.text.as_deref(),
        }
    }

    fn pattern(&self) -> Option<String> {
        MorphologyRecord::pattern(self)
    }

    fn pos(&self) -> Option<&str> {
        MorphologyRecord::pos(self)
    }
}

impl Candidate for LexiconLinkRecord {
    fn location_key(&self) -> Option<String> {
        LexiconLinkRecord::location_key(self)
    }

    fn location_parts(&self) -> WordLocation {
        LexiconLinkRecord::location_parts(self)
    }

    fn lexicon_id(&self) -> Option<&str> {
        LexiconLinkRecord::lexicon_id(self)
    }

    fn text_field(&self, field: TextField) -> Option<&str> {
        match field {
            TextField::SurfaceAr => self.surface_ar.as_deref(),
            TextField::SurfaceNorm => self.surface_norm.as_deref(),
            _ => None,
        }
    }

    fn pattern(&self) -> Option<String> {
        LexiconLinkRecord::pattern(self)
    }

    fn pos(&self) -> Option<&str> {
        LexiconLinkRecord::pos(self)
    }
}

fn location_score(
    key: Option<String>,
    parts: &WordLocation,
    target: &ScoreTarget,
    weights: &ScoreWeights,
) -> u32 {
    let exact = !target.location.is_empty()
        && key.is_some_and(|k| !k.is_empty() && k == target.location);
    if exact {
        weights.exact_location
    } else if target.parts.partially_matches(parts) {
        weights.partial_location
    } else {
        0
    }
}

/// Score a morphology or link record. `fields` is searched in order and only
/// the first equal field counts.
pub fn score_candidate<C: Candidate>(
    candidate: &C,
    target: &ScoreTarget,
    fields: &[TextField],
    weights: &ScoreWeights,
) -> u32 {
    let mut score = location_score(
        candidate.location_key(),
        &candidate.location_parts(),
        target,
        weights,
    );

    if !target.word.is_empty() {
        let matched = fields
            .iter()
            .filter_map(|field| candidate.text_field(*field))
            .map(normalize_arabic)
            .any(|value| value == target.word);
        if matched {
            score += weights.text_match;
        }
    }

    if let Some(preferred) = target.preferred_lexicon_id.as_deref()
        && candidate.lexicon_id() == Some(preferred)
    {
        score += weights.link_lexicon;
    }

    if candidate.pattern().is_some() {
        score += weights.pattern_bonus;
    }
    if candidate.pos().is_some() {
        score += weights.pos_bonus;
    }
    score
}

/// Score an evidence row. Evidence has no surface column, so the lexicon id
/// weighs more and the word is checked against the extract and heading.
pub fn score_evidence(evidence: &EvidenceRecord, target: &ScoreTarget, weights: &ScoreWeights) -> u32 {
    let mut score = location_score(
        evidence.location_key(),
        &evidence.location_parts(),
        target,
        weights,
    );

    if let Some(preferred) = target.preferred_lexicon_id.as_deref()
        && evidence.lexicon_id() == Some(preferred)
    {
        score += weights.evidence_lexicon;
    }

    if !target.word.is_empty() {
        if let Some(extract) = evidence.extract_text.as_deref()
            && normalize_arabic(extract) == target.word
        {
            score += weights.evidence_extract;
        }
        if let Some(heading) = evidence.heading_raw.as_deref()
            && normalize_arabic(heading).contains(target.word.as_str())
        {
            score += weights.evidence_heading;
        }
    }
    score
}

/// A record paired with the score that selected it.
#[derive(Debug)]
pub struct Scored<'a, T> {
    pub item: &'a T,
    pub score: u32,
}

/// Highest-scoring candidate, first-seen on ties, `None` if nothing scores above zero.
pub fn best_match<'a, C: Candidate>(
    items: &'a [C],
    target: &ScoreTarget,
    fields: &[TextField],
    weights: &ScoreWeights,
) -> Option<Scored<'a, C>> {
    let mut best: Option<Scored<'a, C>> = None;
    for item in items {
        let score = score_candidate(item, target, fields, weights);
        if score > best.as_ref().map_or(0, |b| b.score) {
            best = Some(Scored { item, score });
        }
    }
    best
}

/// Every evidence row with a positive score, highest first, stable on ties.
pub fn rank_evidence<'a>(
    items: &'a [EvidenceRecord],
    target: &ScoreTarget,
    weights: &ScoreWeights,
) -> Vec<Scored<'a, EvidenceRecord>> {
    let mut ranked: Vec<_> = items
        .iter()
        .map(|item| Scored {
            item,
            score: score_evidence(item, target, weights),
        })
        .filter(|scored| scored.score > 0)
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(location: &str, word: &str) -> ScoreTarget {
        ScoreTarget {
            location: location.to_string(),
            parts: WordLocation::from_key(location).unwrap_or_default(),
            word: normalize_arabic(word),
            preferred_lexicon_id: None,
        }
    }

    fn morph(surface: &str, location: &str) -> MorphologyRecord {
        MorphologyRecord {
            surface_ar: Some(surface.to_string()),
            word_location: Some(location.to_string()),
            ..MorphologyRecord::default()
        }
    }

    #[test]
    fn exact_location_and_text_add_up() {
        let weights = ScoreWeights::default();
        let t = target("2:5:3", "كتب");
        assert_eq!(score_candidate(&morph("كَتَبَ", "2:5:3"), &t, MORPHOLOGY_TEXT_FIELDS, &weights), 20);
    }

    #[test]
    fn exact_beats_partial() {
        let weights = ScoreWeights::default();
        let t = target("2:5:3", "");
        let exact = morph("x", "2:5:3");
        let partial = MorphologyRecord {
            surah: Some(2),
            ayah: Some(5),
            token_index: Some(3),
            word_location: Some("2:5:03".into()),
            ..MorphologyRecord::default()
        };
        let exact_score = score_candidate(&exact, &t, MORPHOLOGY_TEXT_FIELDS, &weights);
        let partial_score = score_candidate(&partial, &t, MORPHOLOGY_TEXT_FIELDS, &weights);
        assert_eq!(exact_score, 14);
        assert_eq!(partial_score, 9);
        assert!(exact_score > partial_score);
    }

    #[test]
    fn partial_match_requires_matching_token_when_target_has_one() {
        let weights = ScoreWeights::default();
        let other_token = morph("x", "2:5:9");
        assert_eq!(
            score_candidate(&other_token, &target("2:5:3", ""), MORPHOLOGY_TEXT_FIELDS, &weights),
            0
        );
        assert_eq!(
            score_candidate(&other_token, &target("2:5", ""), MORPHOLOGY_TEXT_FIELDS, &weights),
            9
        );
    }

    #[test]
    fn verse_selection_partially_matches_keyed_only_records() {
        let weights = ScoreWeights::default();
        let keyed = morph("قال", "2:5:7");
        assert_eq!(
            score_candidate(&keyed, &target("2:5", ""), MORPHOLOGY_TEXT_FIELDS, &weights),
            9
        );

        // Explicit columns take precedence over the key.
        let columns = MorphologyRecord {
            surah: Some(3),
            ayah: Some(1),
            ..morph("قال", "2:5:7")
        };
        assert_eq!(
            score_candidate(&columns, &target("2:5", ""), MORPHOLOGY_TEXT_FIELDS, &weights),
            0
        );
        assert_eq!(
            score_candidate(&columns, &target("3:1", ""), MORPHOLOGY_TEXT_FIELDS, &weights),
            9
        );
    }

    #[test]
    fn text_fields_count_once() {
        let weights = ScoreWeights::default();
        let record = MorphologyRecord {
            surface_ar: Some("كَتَبَ".into()),
            surface_norm: Some("كتب".into()),
            lemma_ar: Some("كتب".into()),
            ..MorphologyRecord::default()
        };
        assert_eq!(
            score_candidate(&record, &target("", "كتب"), MORPHOLOGY_TEXT_FIELDS, &weights),
            6
        );
    }

    #[test]
    fn link_scoring_ignores_lemma_columns() {
        let weights = ScoreWeights::default();
        let link = LexiconLinkRecord {
            surface_norm: Some("كتب".into()),
            ..LexiconLinkRecord::default()
        };
        assert_eq!(score_candidate(&link, &target("", "كتب"), LINK_TEXT_FIELDS, &weights), 6);
    }

    #[test]
    fn secondary_signals_and_lexicon_bonus() {
        let weights = ScoreWeights::default();
        let link = LexiconLinkRecord {
            ar_u_lexicon: Some("L1".into()),
            derived_pattern: Some("فاعل".into()),
            pos2: Some("N".into()),
            ..LexiconLinkRecord::default()
        };
        let t = target("", "");
        assert_eq!(score_candidate(&link, &t, LINK_TEXT_FIELDS, &weights), 2);
        assert_eq!(
            score_candidate(&link, &t.with_lexicon(Some("L1")), LINK_TEXT_FIELDS, &weights),
            7
        );
        assert_eq!(
            score_candidate(&link, &t.with_lexicon(Some("L2")), LINK_TEXT_FIELDS, &weights),
            2
        );
    }

    #[test]
    fn scoring_is_deterministic() {
        let weights = ScoreWeights::default();
        let t = target("2:5:3", "كتب").with_lexicon(Some("L1"));
        let record = morph("كتب", "2:5:3");
        let first = score_candidate(&record, &t, MORPHOLOGY_TEXT_FIELDS, &weights);
        let second = score_candidate(&record, &t, MORPHOLOGY_TEXT_FIELDS, &weights);
        assert_eq!(first, second);
    }

    #[test]
    fn ties_keep_first_seen_and_zero_never_wins() {
        let weights = ScoreWeights::default();
        let items = vec![morph("كتب", "1:1"), morph("كتب", "1:2")];
        let best = best_match(&items, &target("", "كتب"), MORPHOLOGY_TEXT_FIELDS, &weights).unwrap();
        assert_eq!(best.score, 6);
        assert!(std::ptr::eq(best.item, &items[0]));

        let unrelated = vec![morph("قال", "3:3")];
        assert!(best_match(&unrelated, &target("", "كتب"), MORPHOLOGY_TEXT_FIELDS, &weights).is_none());
    }

    #[test]
    fn evidence_scoring_and_ranking() {
        let weights = ScoreWeights::default();
        let t = target("2:5:3", "كتب").with_lexicon(Some("L1"));
        let items = vec![
            EvidenceRecord {
                heading_raw: Some("باب كَتَبَ".into()),
                ..EvidenceRecord::default()
            },
            EvidenceRecord {
                ar_u_lexicon: Some("L1".into()),
                extract_text: Some("كتب".into()),
                ..EvidenceRecord::default()
            },
            EvidenceRecord {
                source_id: Some("unrelated".into()),
                ..EvidenceRecord::default()
            },
            EvidenceRecord {
                word_location: Some("2:5:3".into()),
                ..EvidenceRecord::default()
            },
        ];
        let ranked = rank_evidence(&items, &t, &weights);
        let scores: Vec<u32> = ranked.iter().map(|s| s.score).collect();
        assert_eq!(scores, vec![14, 13, 2]);
        assert!(std::ptr::eq(ranked[0].item, &items[3]));
        assert!(std::ptr::eq(ranked[2].item, &items[0]));
    }

    #[test]
    fn weights_load_partial_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.json");
        std::fs::write(&path, r#"{ "exact_location": 20, "pos_bonus": 0 }"#).unwrap();
        let weights = ScoreWeights::from_file(&path).unwrap();
        assert_eq!(weights.exact_location, 20);
        assert_eq!(weights.pos_bonus, 0);
        assert_eq!(weights.partial_location, 9);

        std::fs::write(&path, "not json").unwrap();
        assert!(ScoreWeights::from_file(&path).is_err());
    }
}
