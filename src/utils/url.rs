//! URL resolution and document-URL heuristics.

use url::Url;

/// Resolve an href found on `base_url` to an absolute http(s) URL.
///
/// Returns `None` for fragment-only, `javascript:`, `mailto:`, `tel:` and
/// `data:` references, and for anything that does not resolve to http(s).
pub fn resolve_url(base_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:", "blob:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let resolved = if lower.starts_with("http://") || lower.starts_with("https://") {
        Url::parse(href).ok()?
    } else if let Some(rest) = href.strip_prefix("//") {
        Url::parse(&format!("https://{}", rest)).ok()?
    } else {
        Url::parse(base_url).ok()?.join(href).ok()?
    };

    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

/// Whether the URL path ends in `.pdf`, ignoring query and fragment.
pub fn has_document_extension(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_ascii_lowercase().ends_with(".pdf"),
        Err(_) => {
            let path = url.split(['?', '#']).next().unwrap_or(url);
            path.to_ascii_lowercase().ends_with(".pdf")
        }
    }
}

/// Lowercased host without a leading `www.`.
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

/// Percent-decoded, lowercased form used for lexicon matching.
pub fn decoded_lowercase(s: &str) -> String {
    urlencoding::decode(s)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| s.to_string())
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative() {
        assert_eq!(
            resolve_url("https://megler.no/bolig/123/", "dokumenter/salgsoppgave.pdf").as_deref(),
            Some("https://megler.no/bolig/123/dokumenter/salgsoppgave.pdf")
        );
        assert_eq!(
            resolve_url("https://megler.no/bolig/123", "/files/a.pdf").as_deref(),
            Some("https://megler.no/files/a.pdf")
        );
    }

    #[test]
    fn test_resolve_protocol_relative_and_absolute() {
        assert_eq!(
            resolve_url("https://megler.no/", "//cdn.megler.no/a.pdf").as_deref(),
            Some("https://cdn.megler.no/a.pdf")
        );
        assert_eq!(
            resolve_url("https://megler.no/", "https://other.no/x").as_deref(),
            Some("https://other.no/x")
        );
    }

    #[test]
    fn test_resolve_rejects_non_http() {
        assert!(resolve_url("https://megler.no/", "#top").is_none());
        assert!(resolve_url("https://megler.no/", "javascript:void(0)").is_none());
        assert!(resolve_url("https://megler.no/", "mailto:post@megler.no").is_none());
        assert!(resolve_url("https://megler.no/", "").is_none());
    }

    #[test]
    fn test_document_extension() {
        assert!(has_document_extension("https://megler.no/a/Salgsoppgave.PDF?v=2"));
        assert!(!has_document_extension("https://megler.no/a/pdf-viewer"));
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("https://www.Krogsveen.no/x").as_deref(), Some("krogsveen.no"));
        assert_eq!(host_of("not a url"), None);
    }

    #[test]
    fn test_decoded_lowercase() {
        assert_eq!(decoded_lowercase("Komplett%20Salgsoppgave"), "komplett salgsoppgave");
    }
}
