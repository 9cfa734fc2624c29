//! URL-friendly slug generation for blog posts.
//!
//! `slugify` is deterministic: lowercase the title, strip characters that are
//! neither word characters, whitespace, nor hyphens, collapse whitespace and
//! hyphen runs into a single hyphen, and trim hyphens from both ends.
//! Uniqueness is not this module's concern; callers disambiguate colliding
//! slugs with `candidate` suffixes.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[^\w\s-]").unwrap();
    static ref SEPARATOR_RUN: Regex = Regex::new(r"[-\s]+").unwrap();
}

/// Derive a URL-safe slug from a post title.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    let hyphenated = SEPARATOR_RUN.replace_all(&stripped, "-");
    hyphenated.trim_matches('-').to_string()
}

/// The nth candidate for a base slug: the base itself for n = 0, then
/// `base-1`, `base-2`, ... for subsequent collision-retry attempts.
pub fn candidate(base: &str, n: u32) -> String {
    if n == 0 {
        base.to_string()
    } else {
        format!("{}-{}", base, n)
    }
}
