//! Domain and cache-key canonicalization. Applied once at write time and
//! never re-derived (values persisted downstream are already canonical).

use url::Url;

/// Canonicalize a domain string: lowercase, strip scheme, strip `www.`,
/// strip any path or trailing slash.
///
/// Tolerant of LLM output that hands back a full URL where a bare domain
/// was requested.
pub fn canonical_domain(input: &str) -> String {
    let mut s = input.trim().to_lowercase();

    if let Some(idx) = s.find("://") {
        s = s[idx + 3..].to_string();
    }
    if let Some(rest) = s.strip_prefix("www.") {
        s = rest.to_string();
    }
    if let Some(idx) = s.find('/') {
        s.truncate(idx);
    }

    s
}

/// Extract the canonical domain from a full URL. Returns `None` when the
/// input does not parse as an absolute URL with a host.
pub fn domain_of_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    Some(host.to_lowercase())
}

/// Normalize a resolver cache key: lowercase, strip non-alphanumerics except
/// spaces, collapse whitespace.
///
/// Distinct inputs can collide ("Acme, Inc." and "acme inc" both normalize
/// to "acme inc"); collisions are accepted rather than disambiguated.
pub fn normalize_key(input: &str) -> String {
    let filtered: String = input
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_domain_strips_scheme_www_and_slash() {
        assert_eq!(canonical_domain("https://www.Acme.com/"), "acme.com");
        assert_eq!(canonical_domain("http://acme.com"), "acme.com");
        assert_eq!(canonical_domain("WWW.ACME.COM"), "acme.com");
        assert_eq!(canonical_domain("acme.com"), "acme.com");
    }

    #[test]
    fn canonical_domain_drops_paths() {
        assert_eq!(
            canonical_domain("https://www.acme.com/products/widget"),
            "acme.com"
        );
    }

    #[test]
    fn domain_of_url_handles_hosts() {
        assert_eq!(
            domain_of_url("https://www.example.org/a/b?q=1"),
            Some("example.org".to_string())
        );
        assert_eq!(
            domain_of_url("https://sub.example.org/"),
            Some("sub.example.org".to_string())
        );
        assert_eq!(domain_of_url("not a url"), None);
    }

    #[test]
    fn normalize_key_collapses_and_strips() {
        assert_eq!(normalize_key("  Acme,  Inc. "), "acme inc");
        assert_eq!(normalize_key("ACME-INC"), "acmeinc");
        assert_eq!(normalize_key("a  b\tc"), "a b c");
    }

    #[test]
    fn normalize_key_collisions_are_possible() {
        assert_eq!(normalize_key("Acme, Inc."), normalize_key("acme inc"));
    }
}
