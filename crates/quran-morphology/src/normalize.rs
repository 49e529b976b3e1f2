//! Arabic text canonicalization and location-key parsing.

use quran_lexicon_types::WordLocation;
use unicode_normalization::UnicodeNormalization;

const ALIF: char = '\u{0627}';
const TATWEEL: char = '\u{0640}';

fn is_diacritic(ch: char) -> bool {
    matches!(ch, '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{06D6}'..='\u{06ED}')
}

fn is_alif_variant(ch: char) -> bool {
    matches!(ch, '\u{0625}' | '\u{0623}' | '\u{0622}' | '\u{0671}')
}

/// Canonical comparison form of an Arabic word.
///
/// NFKC first (so presentation forms decompose into base letters), then drop
/// harakat, Quranic annotation marks and tatweel, fold `إأآٱ` to `ا`,
/// recompose, and trim. Idempotent.
pub fn normalize_arabic(text: &str) -> String {
    let stripped: String = text
        .nfkc()
        .filter(|&ch| !is_diacritic(ch) && ch != TATWEEL)
        .map(|ch| if is_alif_variant(ch) { ALIF } else { ch })
        .collect();
    // A dropped mark may have blocked composition of its neighbours.
    let recomposed: String = stripped.nfc().collect();
    recomposed.trim().to_string()
}

/// Trim a raw location without touching its segments.
pub fn normalize_location(raw: &str) -> String {
    raw.trim().to_string()
}

/// Parse `S:A[:T]`, or fall back to a position carried elsewhere.
pub fn parse_location(raw: &str, fallback: WordLocation) -> WordLocation {
    WordLocation::from_key(&normalize_location(raw)).unwrap_or(fallback)
}

pub fn looks_arabic(text: &str) -> bool {
    text.chars().any(|ch| matches!(ch, '\u{0600}'..='\u{06FF}'))
}
