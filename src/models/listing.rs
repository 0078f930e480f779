//! Listing references and listing-code inference.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// Minimum digits for a path segment to count as a listing number.
const MIN_CODE_DIGITS: usize = 6;

/// Length of the hash-derived fallback code.
const HASH_CODE_LEN: usize = 12;

/// A listing URL together with its stable short key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingReference {
    pub listing_url: String,
    pub listing_code: String,
}

impl ListingReference {
    /// Derive a reference from a listing URL.
    pub fn from_url(listing_url: &str) -> Self {
        Self {
            listing_url: listing_url.trim().to_string(),
            listing_code: infer_listing_code(listing_url),
        }
    }
}

/// Infer a short, stable key for a listing URL.
///
/// Prefers the `finnkode` query parameter, then the last all-digit path
/// segment, then a hash of the normalised URL.
pub fn infer_listing_code(listing_url: &str) -> String {
    let trimmed = listing_url.trim();

    if let Ok(parsed) = Url::parse(trimmed) {
        if let Some((_, code)) = parsed
            .query_pairs()
            .find(|(k, v)| k.eq_ignore_ascii_case("finnkode") && is_code(v))
        {
            return code.into_owned();
        }

        if let Some(segment) = parsed
            .path_segments()
            .and_then(|segments| segments.rev().find(|s| is_code(s)))
        {
            return segment.to_string();
        }

        return hash_code(&normalise(&parsed));
    }

    hash_code(trimmed)
}

fn is_code(s: &str) -> bool {
    s.len() >= MIN_CODE_DIGITS && s.chars().all(|c| c.is_ascii_digit())
}

fn normalise(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.as_str().trim_end_matches('/').to_lowercase()
}

fn hash_code(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(digest)[..HASH_CODE_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finnkode_query() {
        let code = infer_listing_code(
            "https://www.finn.no/realestate/homes/ad.html?finnkode=312345678&ref=fp",
        );
        assert_eq!(code, "312345678");
    }

    #[test]
    fn test_numeric_path_segment() {
        let code = infer_listing_code("https://www.finn.no/realestate/homes/ad/298765432");
        assert_eq!(code, "298765432");
    }

    #[test]
    fn test_short_numbers_are_not_codes() {
        let code = infer_listing_code("https://megler.example/bolig/12/vis");
        assert_eq!(code.len(), HASH_CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_is_stable_across_fragment_and_slash() {
        let a = infer_listing_code("https://megler.example/bolig/storgata-1/");
        let b = infer_listing_code("https://megler.example/bolig/storgata-1#bilder");
        assert_eq!(a, b);
    }

    #[test]
    fn test_reference_from_url() {
        let reference = ListingReference::from_url(" https://www.finn.no/ad.html?finnkode=123456 ");
        assert_eq!(reference.listing_code, "123456");
        assert_eq!(reference.listing_url, "https://www.finn.no/ad.html?finnkode=123456");
    }
}
