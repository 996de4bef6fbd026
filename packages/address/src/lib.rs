#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Address normalization and unit extraction for rental listings.
//!
//! Per-unit listings arrive with the unit baked into the address in
//! many formats:
//! - `"100 Main St Unit 4, Austin, TX"`
//! - `"100 Main St #7, Austin, TX"`
//! - `"100 Main St, Austin, TX"` + secondary line `"Apt 12B"`
//!
//! [`normalize_address`] strips unit/suite/apartment designators so
//! every unit at the same street address produces the identical
//! grouping key. This is lossy by design — the unit number is
//! recovered separately by [`extract_unit`].

use regex::Regex;
use rental_sync_models::RawListingRecord;
use sha2::{Digest as _, Sha256};
use std::sync::LazyLock;

/// Unit designator keywords recognized (case-insensitively) in
/// addresses. `#` is handled separately since it has no word boundary.
pub static UNIT_DESIGNATORS: &[&str] = &["APARTMENT", "APT", "UNIT", "SUITE", "STE"];

/// Regex that removes a designator and its (optional) trailing token:
/// `"Unit 4"`, `"Apt. B"`, `"Suite 210"`, `"#12-B"`.
static DESIGNATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:APARTMENT|APT|UNIT|SUITE|STE)\b\.?\s*#?\s*[A-Za-z0-9-]*|#\s*[A-Za-z0-9-]+")
        .expect("valid regex")
});

/// Regex that captures the unit token following a designator.
static EXTRACT_UNIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:APARTMENT|APT|UNIT|SUITE|STE)\b\.?\s*#?\s*([A-Za-z0-9-]+)|#\s*([A-Za-z0-9-]+)")
        .expect("valid regex")
});

/// Regex for a designator prefix on a secondary address line
/// (`"Unit 4B"`, `"# 12"`).
static LINE2_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:APARTMENT|APT|UNIT|SUITE|STE)\b\.?\s*#?\s*|^\s*#\s*")
        .expect("valid regex")
});

/// Repeated whitespace.
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Comma runs left behind by designator removal (`", ,"` / `",,"`).
static DUP_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",(?: *,)+").expect("valid regex"));

/// Comma spacing: any `" , "` variant becomes `", "`.
static COMMA_SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" *, *").expect("valid regex"));

/// Strips unit designators from a free-text address and collapses the
/// resulting whitespace/comma debris.
///
/// Two raw addresses that differ only by a unit designator normalize to
/// the identical string, so their records group together:
///
/// ```
/// use rental_sync_address::normalize_address;
///
/// assert_eq!(
///     normalize_address("100 Main St Unit 4, Austin, TX"),
///     normalize_address("100 Main St #7, Austin, TX"),
/// );
/// ```
#[must_use]
pub fn normalize_address(address: &str) -> String {
    let stripped = DESIGNATOR_RE.replace_all(address, "");
    let collapsed = WS_RE.replace_all(&stripped, " ");
    let deduped = DUP_COMMA_RE.replace_all(&collapsed, ",");
    let spaced = COMMA_SPACE_RE.replace_all(&deduped, ", ");
    spaced.trim().trim_matches([',', ' ']).to_string()
}

/// Extracts the unit number from a raw listing record.
///
/// Prefers an explicit secondary address line (with any designator
/// prefix stripped) and falls back to a regex search over the full
/// address. Returns `None` when neither yields a token — the
/// orchestrator then synthesizes a 1-based positional unit number.
#[must_use]
pub fn extract_unit(record: &RawListingRecord) -> Option<String> {
    if let Some(line2) = &record.address_line2 {
        let stripped = LINE2_PREFIX_RE.replace(line2, "");
        let token = stripped.trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    EXTRACT_UNIT_RE.captures(&record.address).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    })
}

/// Returns the street portion of a normalized address (everything
/// before the first comma). Used as the property's display address.
#[must_use]
pub fn display_street(address: &str) -> String {
    let normalized = normalize_address(address);
    normalized
        .split(',')
        .next()
        .unwrap_or(&normalized)
        .trim()
        .to_string()
}

/// Derives a deterministic property ID from the normalized address.
///
/// The ID is a URL-safe slug of the normalized address plus the first
/// 8 hex characters of `sha256(address|city|state)`, all lowercased, so
/// re-importing the same address always yields the same ID regardless
/// of which adapter produced the record.
#[must_use]
pub fn property_id(normalized_address: &str, city: &str, state: &str) -> String {
    let key = format!(
        "{}|{}|{}",
        normalized_address.trim().to_lowercase(),
        city.trim().to_lowercase(),
        state.trim().to_lowercase()
    );
    let digest = Sha256::digest(key.as_bytes());
    let suffix = &hex::encode(digest)[..8];

    let slug = slugify(normalized_address);
    if slug.is_empty() {
        format!("property-{suffix}")
    } else {
        format!("{slug}-{suffix}")
    }
}

/// Lowercases and replaces non-alphanumeric runs with single hyphens.
/// Truncated to keep IDs readable; uniqueness comes from the hash
/// suffix.
fn slugify(text: &str) -> String {
    const MAX_SLUG_LEN: usize = 48;

    let mut slug = String::with_capacity(text.len());
    let mut last_was_hyphen = true;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }
    slug.trim_matches('-').to_string()
}
