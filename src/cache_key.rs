use reqwest::Url;

use crate::error::{ChallongeError, Result};

/// Host that tournaments live on when they are not under an organization subdomain.
pub const ROOT_DOMAIN: &str = "challonge.com";

/// Host segment used for tournaments on [`ROOT_DOMAIN`].
pub const ROOT_SENTINEL: &str = "(root)";

const DOCUMENT_EXTENSION: &str = "html";

/// Derive the storage key for a tournament URL.
///
/// Keys look like `t/{host}{path}.html`, where `host` is [`ROOT_SENTINEL`] for
/// `challonge.com` or the lowercased subdomain for `sub.challonge.com`, and
/// `path` is a single lowercased segment:
///
/// ```
/// # use reqwest::Url;
/// let url = Url::parse("https://Org.challonge.com/Weekly42").unwrap();
/// assert_eq!(
///     challonge_scraper::derive_cache_key(&url).unwrap(),
///     "t/org/weekly42.html"
/// );
/// ```
pub fn derive_cache_key(url: &Url) -> Result<String> {
    let invalid = || ChallongeError::InvalidCacheKey {
        url: url.to_string(),
    };
    let host = url.host_str().ok_or_else(invalid)?;

    let host = if host.eq_ignore_ascii_case(ROOT_DOMAIN) {
        ROOT_SENTINEL.to_string()
    } else {
        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() != 3 {
            return Err(invalid());
        }
        labels[0].to_lowercase()
    };

    let path = change_extension(&url.path().to_lowercase(), DOCUMENT_EXTENSION);
    // Only the leading separator is allowed; nested event paths are not supported.
    if path.rfind('/').is_some_and(|i| i >= 1) {
        return Err(invalid());
    }

    Ok(format!("t/{host}{path}"))
}

/// Replace the extension of the last path segment, appending one if absent.
fn change_extension(path: &str, extension: &str) -> String {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    let stem = match path[name_start..].rfind('.') {
        Some(dot) => &path[..name_start + dot],
        None => path,
    };
    format!("{stem}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(url: &str) -> Result<String> {
        derive_cache_key(&Url::parse(url).unwrap())
    }

    #[test]
    fn root_domain_uses_sentinel() {
        assert_eq!(key("https://challonge.com/abc123").unwrap(), "t/(root)/abc123.html");
        assert_eq!(key("https://CHALLONGE.com/Other").unwrap(), "t/(root)/other.html");
    }

    #[test]
    fn subdomain_uses_first_label() {
        assert_eq!(
            key("https://MyOrg.challonge.com/Spring_Cup").unwrap(),
            "t/myorg/spring_cup.html"
        );
    }

    #[test]
    fn existing_extension_is_replaced() {
        assert_eq!(key("https://challonge.com/cup.json").unwrap(), "t/(root)/cup.html");
    }

    #[test]
    fn query_and_fragment_do_not_affect_key() {
        assert_eq!(
            key("https://org.challonge.com/cup?tab=bracket#top").unwrap(),
            "t/org/cup.html"
        );
    }

    #[test]
    fn derivation_is_deterministic() {
        let url = Url::parse("https://org.challonge.com/cup").unwrap();
        assert_eq!(derive_cache_key(&url).unwrap(), derive_cache_key(&url).unwrap());
    }

    #[test]
    fn rejects_other_label_counts() {
        for url in [
            "https://example.com/cup",
            "https://a.b.challonge.com/cup",
            "https://localhost/cup",
        ] {
            assert!(
                matches!(key(url), Err(ChallongeError::InvalidCacheKey { .. })),
                "{url}"
            );
        }
    }

    #[test]
    fn rejects_nested_paths() {
        assert!(matches!(
            key("https://challonge.com/events/cup"),
            Err(ChallongeError::InvalidCacheKey { .. })
        ));
        assert!(matches!(
            key("https://org.challonge.com/cup/"),
            Err(ChallongeError::InvalidCacheKey { .. })
        ));
    }

    #[test]
    fn change_extension_handles_dotless_names() {
        assert_eq!(change_extension("/cup", "html"), "/cup.html");
        assert_eq!(change_extension("/a.b.c", "html"), "/a.b.html");
    }
}
