//! Title normalization and similarity scoring for noisy release names.
//!
//! Release titles carry edition qualifiers, years, bundle markers and
//! abbreviations that provider catalogs do not. [`prepare_title`] strips those
//! deterministically; [`similarity`] scores a candidate title against a query.

use std::sync::LazyLock;

use regex::Regex;

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]").expect("static pattern"));

static GOTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bGOTY\b").expect("static pattern"));

// "Deluxe Edition", "Game of the Year Edition", "Collector's Edition".
static EDITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:game of the year|[\w']+)\s+edition\b").expect("static pattern")
});

// "Collection", "Complete Bundle", "Director's Cut".
static BUNDLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:complete|ultimate|deluxe|definitive|premium|anniversary|legacy|classic)\s+)?(?:bundle|collection)\b|\bdirector'?s cut\b",
    )
    .expect("static pattern")
});

static PLATFORM_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bnsw for pc\b").expect("static pattern"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static pattern"));

/// Collapse runs of whitespace to single spaces and trim the ends.
pub fn clean_title(title: &str) -> String {
    WHITESPACE.replace_all(title.trim(), " ").into_owned()
}

/// Case- and whitespace-insensitive title equality.
pub fn titles_equal(a: &str, b: &str) -> bool {
    clean_title(a).to_lowercase() == clean_title(b).to_lowercase()
}

/// Deterministically normalize a release title for a second lookup pass.
///
/// Drops parenthesized and bracketed tags, expands `GOTY`, strips edition,
/// bundle and collection qualifiers, collapses whitespace and trims dangling
/// separators.
///
/// ```
/// use gamedb_catalog::prepare_title;
///
/// assert_eq!(prepare_title("Great Game: Deluxe Edition (2020)"), "Great Game");
/// assert_eq!(prepare_title("Hades [FitGirl Repack]"), "Hades");
/// ```
pub fn prepare_title(raw: &str) -> String {
    let name = BRACKETED.replace_all(raw, " ");
    let name = GOTY.replace_all(&name, "Game of the Year");
    let name = EDITION.replace_all(&name, " ");
    let name = BUNDLE.replace_all(&name, " ");
    let name = PLATFORM_NOISE.replace_all(&name, " ");
    let name = clean_title(&name);
    name.trim_end_matches(|c: char| matches!(c, ':' | '-' | '–' | ',' | '+' | '&') || c.is_whitespace())
        .to_string()
}

/// Normalized Levenshtein similarity between two titles, in `0.0..=1.0`.
///
/// Both sides are whitespace-collapsed and lowercased first, so titles that
/// differ only in case or spacing score 1.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = clean_title(a).to_lowercase();
    let b = clean_title(b).to_lowercase();
    strsim::normalized_levenshtein(&a, &b)
}
