use std::fmt;

use serde::{Deserialize, Serialize};

use crate::loose;

/// `surah:ayah[:token]` position of a word in the Quranic text.
///
/// Fields are optional because positions are parsed from untrusted strings; a
/// location missing `surah` or `ayah` is unusable for matching.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct WordLocation {
    pub surah: Option<i64>,
    pub ayah: Option<i64>,
    pub token_index: Option<i64>,
}

impl WordLocation {
    pub fn new(surah: i64, ayah: i64, token_index: Option<i64>) -> Self {
        Self {
            surah: Some(surah),
            ayah: Some(ayah),
            token_index,
        }
    }

    /// Parse an `S:A` or `S:A:T` key. Returns `None` unless the first two
    /// segments are numeric; a non-numeric token segment becomes `None`.
    pub fn from_key(raw: &str) -> Option<Self> {
        let mut segments = raw.trim().split(':').filter(|s| !s.is_empty());
        let surah = loose::parse_number(segments.next()?)?;
        let ayah = loose::parse_number(segments.next()?)?;
        let token_index = segments.next().and_then(loose::parse_number);
        Some(Self::new(surah, ayah, token_index))
    }

    pub fn is_usable(&self) -> bool {
        self.surah.is_some() && self.ayah.is_some()
    }

    /// Same surah and ayah, and the same token unless `self` leaves it unset.
    ///
    /// This is the weaker "partial" relation; exact matching compares
    /// normalized location keys instead.
    pub fn partially_matches(&self, candidate: &WordLocation) -> bool {
        if !self.is_usable() || !candidate.is_usable() {
            return false;
        }
        if self.surah != candidate.surah || self.ayah != candidate.ayah {
            return false;
        }
        match self.token_index {
            None => true,
            Some(token) => candidate.token_index == Some(token),
        }
    }

    /// Canonical `S:A[:T]` key, or `None` when unusable.
    pub fn key(&self) -> Option<String> {
        self.is_usable().then(|| self.to_string())
    }
}

impl fmt::Display for WordLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.surah, self.ayah) {
            (Some(surah), Some(ayah)) => match self.token_index {
                Some(token) => write!(f, "{surah}:{ayah}:{token}"),
                None => write!(f, "{surah}:{ayah}"),
            },
            _ => Ok(()),
        }
    }
}

/// The word occurrence a reader focused on.
///
/// Replaced wholesale on every new selection. The numeric triple is an
/// optional fallback used when `location` does not parse.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct MorphologySelection {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, deserialize_with = "loose::number")]
    pub surah: Option<i64>,
    #[serde(default, deserialize_with = "loose::number")]
    pub ayah: Option<i64>,
    #[serde(default, alias = "tokenIndex", deserialize_with = "loose::number")]
    pub token_index: Option<i64>,
}

impl MorphologySelection {
    pub fn new(text: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            location: location.into(),
            ..Self::default()
        }
    }

    pub fn with_position(mut self, surah: i64, ayah: i64, token_index: Option<i64>) -> Self {
        self.surah = Some(surah);
        self.ayah = Some(ayah);
        self.token_index = token_index;
        self
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// The position carried on the selection itself, ignoring `location`.
    pub fn fallback_location(&self) -> WordLocation {
        WordLocation {
            surah: self.surah,
            ayah: self.ayah,
            token_index: self.token_index,
        }
    }
}
