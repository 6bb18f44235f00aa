//! Canonicalization must be total and idempotent on arbitrary text,
//! including broken mojibake and half-written HTML entities.

#![no_main]

use libfuzzer_sys::fuzz_target;
use listing_search::search::canonicalize::{canonicalize, tokenize};

fuzz_target!(|text: &str| {
    let once = canonicalize(text);
    let twice = canonicalize(&once);
    assert_eq!(once, twice, "canonicalize is not idempotent for {text:?}");
    assert_eq!(once.trim(), once);
    assert!(tokenize(&once).iter().all(|t| !t.is_empty()));
});
