//! Name normalization utilities.
//!
//! Attendee names arrive from two directions: the ticketing provider (typed
//! by the buyer at checkout) and the validation request (typed by the
//! attendee at the door). Both are reduced to the same comparison form
//! before any similarity scoring happens:
//!
//! 1. Collapse every run of Unicode whitespace to a single ASCII space and
//!    trim the edges ([`collapse_whitespace`]).
//! 2. Fold letters to their closest ASCII form ([`fold_to_ascii`]):
//!    compatibility decomposition, combining marks dropped, and a short
//!    table for letters that have no decomposition (`ß`, `ø`, `ł`, ...).
//! 3. Upper-case.
//!
//! # Examples
//!
//! ```rust
//! use matching::normalize_name;
//!
//! assert_eq!(normalize_name("  José   Müller "), "JOSE MULLER");
//! assert_eq!(normalize_name("Łukasz\tStraße"), "LUKASZ STRASSE");
//! ```

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Collapses repeated whitespace, trims edges, and normalizes newlines to
/// single spaces.
///
/// All Unicode whitespace characters (tabs, newlines, non-breaking spaces)
/// are treated as delimiters. The result has no leading or trailing
/// whitespace; whitespace-only input yields an empty string.
///
/// ```rust
/// use matching::collapse_whitespace;
///
/// assert_eq!(collapse_whitespace("Sam \t  Smith\n"), "Sam Smith");
/// assert_eq!(collapse_whitespace("Sam\u{00A0}Smith"), "Sam Smith");
/// assert_eq!(collapse_whitespace("   "), "");
/// ```
pub fn collapse_whitespace(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    for segment in text.split_whitespace() {
        if !normalized.is_empty() {
            normalized.push(' ');
        }
        normalized.push_str(segment);
    }
    normalized
}

/// Strips diacritics and maps the remaining non-decomposable Latin letters
/// to ASCII.
///
/// Characters outside the Latin script pass through unchanged (after
/// decomposition), so names in other scripts still compare against
/// themselves.
pub fn fold_to_ascii(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for ch in text.nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        match ch {
            'ß' => folded.push_str("ss"),
            'ẞ' => folded.push_str("SS"),
            'æ' => folded.push_str("ae"),
            'Æ' => folded.push_str("AE"),
            'œ' => folded.push_str("oe"),
            'Œ' => folded.push_str("OE"),
            'þ' => folded.push_str("th"),
            'Þ' => folded.push_str("TH"),
            'ø' => folded.push('o'),
            'Ø' => folded.push('O'),
            'ł' => folded.push('l'),
            'Ł' => folded.push('L'),
            'đ' | 'ð' => folded.push('d'),
            'Đ' | 'Ð' => folded.push('D'),
            'ı' => folded.push('i'),
            _ => folded.push(ch),
        }
    }
    folded
}

/// Full comparison form of a name: collapsed whitespace, ASCII-folded,
/// upper-cased.
pub fn normalize_name(name: &str) -> String {
    fold_to_ascii(&collapse_whitespace(name)).to_uppercase()
}
