//! Text canonicalization for consistent indexing and embedding input.
//!
//! The pipeline runs in a fixed order:
//!
//! 1. Encoding repair: UTF-8 that was mis-decoded as Latin-1/Windows-1252
//!    (`Ð\u{90}Ð±Ð°Ð¹` → `Абай`) and common named HTML entities.
//! 2. Case folding and NFC normalization.
//! 3. Noise stripping: URLs, e-mail addresses, emoji and pictographs.
//! 4. Quote normalization and whitespace collapsing (line breaks become spaces).
//!
//! Digits outside URL and e-mail spans are never touched: prices, room counts,
//! floors and years are load-bearing for listing search. The output is a fixed
//! point: canonicalizing canonical text returns it unchanged.
//!
//! # Example
//!
//! ```ignore
//! use crate::search::canonicalize::canonicalize;
//!
//! let raw = "Уютная 2-комн. квартира 🔥\nhttps://example.kz/a/1";
//! assert_eq!(canonicalize(raw), "уютная 2-комн. квартира");
//! ```

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:https?://|ftp://|www\.)[^\s<>]+").expect("url regex compiles")
});

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\w.%+\-]+@[\w\-]+(?:\.[\w\-]+)+").expect("email regex compiles")
});

// Pictographs plus the joiners/selectors/modifiers that glue emoji sequences.
// Keycap sequences (`1️⃣`) keep their digit.
static EMOJI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[\p{Extended_Pictographic}\x{1F1E6}-\x{1F1FF}\x{1F3FB}-\x{1F3FF}\x{FE0E}\x{FE0F}\x{200D}\x{20E3}]",
    )
    .expect("emoji regex compiles")
});

const HTML_ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&laquo;", "\""),
    ("&raquo;", "\""),
    ("&mdash;", "-"),
    ("&ndash;", "-"),
    ("&amp;", "&"),
];

// Windows-1252 code points 0x80..=0x9F that differ from Latin-1.
const CP1252_HIGH: &[(char, u8)] = &[
    ('€', 0x80),
    ('‚', 0x82),
    ('ƒ', 0x83),
    ('„', 0x84),
    ('…', 0x85),
    ('†', 0x86),
    ('‡', 0x87),
    ('ˆ', 0x88),
    ('‰', 0x89),
    ('Š', 0x8A),
    ('‹', 0x8B),
    ('Œ', 0x8C),
    ('Ž', 0x8E),
    ('\u{2018}', 0x91),
    ('\u{2019}', 0x92),
    ('\u{201C}', 0x93),
    ('\u{201D}', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('˜', 0x98),
    ('™', 0x99),
    ('š', 0x9A),
    ('›', 0x9B),
    ('œ', 0x9C),
    ('ž', 0x9E),
    ('Ÿ', 0x9F),
];

/// Canonicalize listing or query text for tokenization and embedding.
///
/// Folding and stripping can expose new mojibake (lowercased Latin-1 capitals
/// become UTF-8 lead bytes, a stripped emoji can leave a valid byte run), so
/// the pipeline is reapplied until the output stops changing. A pass only
/// changes stable-looking text by repairing mojibake, which shrinks it.
pub fn canonicalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut current = canonicalize_pass(text);
    loop {
        let next = canonicalize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn canonicalize_pass(text: &str) -> String {
    let repaired = repair_encoding(text);
    let folded: String = repaired.to_lowercase().nfc().collect();

    let without_urls = URL_RE.replace_all(&folded, " ");
    let without_emails = EMAIL_RE.replace_all(&without_urls, " ");
    let without_emoji = EMOJI_RE.replace_all(&without_emails, " ");

    let quoted = normalize_quotes(&without_emoji);
    collapse_whitespace(&quoted)
}

/// Whitespace tokenization of already-canonical text.
pub fn tokenize(canonical: &str) -> Vec<String> {
    canonical.split_whitespace().map(str::to_owned).collect()
}

/// Repeatedly undo mojibake and named HTML entities until the text is stable.
///
/// Every successful step strictly shortens the UTF-8 byte length, so the loop
/// terminates.
pub fn repair_encoding(text: &str) -> Cow<'_, str> {
    let mut current = Cow::Borrowed(text);
    loop {
        let mut changed = false;
        if let Some(fixed) = undo_mojibake(&current) {
            current = Cow::Owned(fixed);
            changed = true;
        }
        if let Some(decoded) = decode_entities(&current) {
            current = Cow::Owned(decoded);
            changed = true;
        }
        if !changed {
            return current;
        }
    }
}

/// Re-encode each char as its Latin-1/CP1252 byte and decode as UTF-8.
///
/// Returns `None` unless every char maps to a single byte, at least one byte
/// is non-ASCII, and the bytes form valid UTF-8 that differs from the input.
fn undo_mojibake(text: &str) -> Option<String> {
    if text.is_ascii() {
        return None;
    }
    let mut bytes = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let code = ch as u32;
        if code <= 0xFF {
            bytes.push(code as u8);
        } else if let Some(&(_, byte)) = CP1252_HIGH.iter().find(|(c, _)| *c == ch) {
            bytes.push(byte);
        } else {
            return None;
        }
    }
    match String::from_utf8(bytes) {
        Ok(decoded) if decoded != text => Some(decoded),
        _ => None,
    }
}

fn decode_entities(text: &str) -> Option<String> {
    if !text.contains('&') {
        return None;
    }
    let mut out = text.to_string();
    for (entity, replacement) in HTML_ENTITIES {
        if out.contains(entity) {
            out = out.replace(entity, replacement);
        }
    }
    (out != text).then_some(out)
}

fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|ch| match ch {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '«' | '»' | '″' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '′' | '`' => '\'',
            other => other,
        })
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}
