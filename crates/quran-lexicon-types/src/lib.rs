//! Shared types for Quranic word analysis data.
//!
//! Backend rows are loosely typed: the same column can hold a string, a
//! number, a nested object or stringified JSON. The record structs here decode
//! every field leniently (see [`loose`]) so a malformed value degrades to
//! `None` instead of failing the row, and keep unknown columns in an `extra`
//! side map.
//!
//! - [`WordLocation`] / [`MorphologySelection`] describe what the reader focused on.
//! - [`MorphologyRecord`], [`LexiconLinkRecord`] and [`EvidenceRecord`] are the
//!   local collections a lesson payload carries.
//! - [`LexiconBundle`] is the remote per-lexicon dataset.
//!
//! ```rust
//! use quran_lexicon_types::{MorphologyRecord, WordLocation};
//!
//! let record: MorphologyRecord =
//!     serde_json::from_value(serde_json::json!({ "word_location": "2:5:3", "pos": "V" })).unwrap();
//! assert_eq!(record.location_parts(), WordLocation::new(2, 5, Some(3)));
//! assert_eq!(record.pos(), Some("V"));
//! ```

pub mod bundle;
pub mod location;
pub mod loose;
pub mod records;

pub use bundle::{
    LexiconBundle, LexiconMorphology, SynonymTopic, SynonymWord, merge_synonym_words,
    parse_synonym_words,
};
pub use location::{MorphologySelection, WordLocation};
pub use records::{
    EvidenceRecord, EvidenceRow, FormFeatures, LexiconLinkRecord, MorphologyFeatures,
    MorphologyRecord, Translation,
};
