//! Local resolution pipeline: selection → best morphology, link and evidence.

use quran_lexicon_types::loose;
use quran_lexicon_types::{
    EvidenceRecord, LexiconBundle, LexiconLinkRecord, MorphologyRecord, MorphologySelection,
    WordLocation,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::normalize::{normalize_arabic, normalize_location, parse_location};
use crate::profile::{RemoteView, ResolvedProfile};
use crate::score::{
    LINK_TEXT_FIELDS, MORPHOLOGY_TEXT_FIELDS, ScoreTarget, ScoreWeights, best_match, rank_evidence,
};

/// The three record collections a lesson payload carries for its words.
///
/// Rows that are not objects are skipped; a missing collection is empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalCollections {
    #[serde(default, alias = "morphologyItems", deserialize_with = "loose::lenient_vec")]
    pub morphology_items: Vec<MorphologyRecord>,
    #[serde(
        default,
        alias = "lexiconMorphologyItems",
        deserialize_with = "loose::lenient_vec"
    )]
    pub lexicon_morphology_items: Vec<LexiconLinkRecord>,
    #[serde(default, alias = "evidenceItems", deserialize_with = "loose::lenient_vec")]
    pub evidence_items: Vec<EvidenceRecord>,
}

impl LocalCollections {
    pub fn is_empty(&self) -> bool {
        self.morphology_items.is_empty()
            && self.lexicon_morphology_items.is_empty()
            && self.evidence_items.is_empty()
    }
}

/// Outcome of scoring the local collections for one selection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocalResolution {
    pub selection: MorphologySelection,
    /// Normalized selection text.
    pub word: String,
    /// Trimmed raw location.
    pub location: String,
    pub parts: WordLocation,
    pub morphology: Option<MorphologyRecord>,
    pub morphology_score: u32,
    pub link: Option<LexiconLinkRecord>,
    pub link_score: u32,
    /// Effective lexicon id: from the morphology record, the pre-pass link, or the chosen link.
    pub lexicon_id: Option<String>,
    /// Matching evidence, highest score first.
    pub evidence: Vec<EvidenceRecord>,
}

impl LocalResolution {
    pub fn lexicon_id(&self) -> Option<&str> {
        self.lexicon_id.as_deref()
    }

    /// Morphology id of the remote record to merge under the local ones.
    ///
    /// Prefers ids the local link or morphology record already point at, then
    /// the first bundle link whose surface form equals the selected word, then
    /// the first bundle link at all. Only ids with a detail entry qualify.
    pub fn focused_morphology_id<'b>(&self, bundle: &'b LexiconBundle) -> Option<&'b str> {
        let details = &bundle.morphology_by_id;
        let direct = [
            self.link.as_ref().and_then(LexiconLinkRecord::morphology_id),
            self.morphology.as_ref().and_then(MorphologyRecord::morphology_id),
        ];
        if let Some((id, _)) = direct
            .into_iter()
            .flatten()
            .find_map(|id| details.get_key_value(id))
        {
            return Some(id.as_str());
        }

        let has_detail = |link: &&LexiconLinkRecord| {
            link.morphology_id().is_some_and(|id| details.contains_key(id))
        };

        if !self.word.is_empty()
            && let Some(link) = bundle
                .morphology_links
                .iter()
                .filter(has_detail)
                .find(|link| {
                    [&link.surface_ar, &link.surface_norm]
                        .into_iter()
                        .flatten()
                        .any(|surface| normalize_arabic(surface) == self.word)
                })
        {
            return link.morphology_id().and_then(|id| details.get_key_value(id)).map(|(k, _)| k.as_str());
        }

        bundle
            .morphology_links
            .iter()
            .find(has_detail)
            .and_then(LexiconLinkRecord::morphology_id)
            .and_then(|id| details.get_key_value(id))
            .map(|(k, _)| k.as_str())
    }
}

/// Runs the scoring passes with a fixed set of weights.
#[derive(Clone, Debug, Default)]
pub struct Resolver {
    weights: ScoreWeights,
}

impl Resolver {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Normalize the selection into the form every scoring pass compares against.
    pub fn target(&self, selection: &MorphologySelection) -> ScoreTarget {
        ScoreTarget {
            location: normalize_location(&selection.location),
            parts: parse_location(&selection.location, selection.fallback_location()),
            word: normalize_arabic(&selection.text),
            preferred_lexicon_id: None,
        }
    }

    /// Score the local collections for a selection.
    ///
    /// Returns `None` when the selection carries no text. Never fails: a slot
    /// with no positive-scoring candidate is simply empty.
    pub fn resolve_local(
        &self,
        selection: &MorphologySelection,
        collections: &LocalCollections,
    ) -> Option<LocalResolution> {
        if !selection.has_text() {
            return None;
        }
        let target = self.target(selection);

        let morphology = best_match(
            &collections.morphology_items,
            &target,
            MORPHOLOGY_TEXT_FIELDS,
            &self.weights,
        );

        let lexicon_id = morphology
            .as_ref()
            .and_then(|m| m.item.lexicon_id())
            .or_else(|| {
                best_match(
                    &collections.lexicon_morphology_items,
                    &target,
                    LINK_TEXT_FIELDS,
                    &self.weights,
                )
                .and_then(|link| link.item.lexicon_id())
            })
            .map(str::to_string);

        let link_target = target.with_lexicon(lexicon_id.as_deref());
        let link = best_match(
            &collections.lexicon_morphology_items,
            &link_target,
            LINK_TEXT_FIELDS,
            &self.weights,
        );

        let lexicon_id = lexicon_id.or_else(|| {
            link.as_ref()
                .and_then(|l| l.item.lexicon_id())
                .map(str::to_string)
        });

        let evidence_target = target.with_lexicon(lexicon_id.as_deref());
        let evidence: Vec<EvidenceRecord> =
            rank_evidence(&collections.evidence_items, &evidence_target, &self.weights)
                .into_iter()
                .map(|scored| scored.item.clone())
                .collect();

        debug!(
            location = %target.location,
            morphology_score = morphology.as_ref().map_or(0, |m| m.score),
            link_score = link.as_ref().map_or(0, |l| l.score),
            lexicon_id = lexicon_id.as_deref().unwrap_or_default(),
            evidence = evidence.len(),
            "resolved selection locally"
        );

        Some(LocalResolution {
            selection: selection.clone(),
            word: target.word,
            location: target.location,
            parts: target.parts,
            morphology_score: morphology.as_ref().map_or(0, |m| m.score),
            morphology: morphology.map(|m| m.item.clone()),
            link_score: link.as_ref().map_or(0, |l| l.score),
            link: link.map(|l| l.item.clone()),
            lexicon_id,
            evidence,
        })
    }

    /// Local resolution followed by the merge with whatever remote state is known.
    pub fn resolve(
        &self,
        selection: &MorphologySelection,
        collections: &LocalCollections,
        remote: RemoteView<'_>,
    ) -> ResolvedProfile {
        match self.resolve_local(selection, collections) {
            Some(local) => ResolvedProfile::build(&local, remote),
            None => ResolvedProfile::default(),
        }
    }
}
