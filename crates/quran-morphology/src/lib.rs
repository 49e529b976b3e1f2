//! Cross-reference resolution for a selected Quranic word.
//!
//! Given one word occurrence, find the matching records across the loosely
//! keyed local collections (morphology items, lexicon links, evidence) and
//! merge them with a remote per-lexicon bundle into one display profile.
//! Everything here is pure and synchronous: fetching the bundle is the
//! caller's job (see `quran-lexicon-client`).
//!
//! # How it works
//! 1. Normalize the selection text (NFKC, strip marks, fold alif) and parse its location.
//! 2. Score every morphology record; the best positive score wins, first-seen on ties.
//! 3. Take the lexicon id from that record, or from a pre-pass over the link records.
//! 4. Score the links again with a bonus for that lexicon id.
//! 5. Rank evidence by location, lexicon id and text.
//! 6. Merge with the bundle's focused records (local fields win) and build synonym chips.
//!
//! # Example
//! ```rust
//! use quran_lexicon_types::MorphologySelection;
//! use quran_morphology::{LocalCollections, RemoteView, Resolver};
//!
//! let collections: LocalCollections = serde_json::from_value(serde_json::json!({
//!     "morphology_items": [
//!         { "surface_ar": "كَتَبَ", "word_location": "2:5:3", "root_norm": "كتب" }
//!     ]
//! }))
//! .unwrap();
//!
//! let resolver = Resolver::default();
//! let selection = MorphologySelection::new("كتب", "2:5:3");
//! let profile = resolver.resolve(&selection, &collections, RemoteView::default());
//! assert_eq!(profile.root.as_deref(), Some("كتب"));
//! ```

pub mod normalize;
pub mod profile;
pub mod resolve;
pub mod score;
pub mod synonyms;

pub use normalize::{looks_arabic, normalize_arabic, normalize_location, parse_location};
pub use profile::{
    EvidenceEntry, InspectorField, MorphologyFeature, PLACEHOLDER, RemoteView, ResolvedProfile,
    value_to_display_text,
};
pub use resolve::{LocalCollections, LocalResolution, Resolver};
pub use score::{
    Candidate, LINK_TEXT_FIELDS, MORPHOLOGY_TEXT_FIELDS, ScoreTarget, ScoreWeights, Scored,
    TextField, best_match, rank_evidence, score_candidate, score_evidence,
};
pub use synonyms::{
    MAX_RELATED_TERMS, MAX_SYNONYM_CHIPS, embedded_synonyms, related_terms, synonym_chips,
    synonym_label,
};
