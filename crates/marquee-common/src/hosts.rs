//! Known upstream host families.
//!
//! Two tables drive how external video URLs are handled:
//!
//! - **Proxied hosts** block hotlinking and CORS, so their media is routed
//!   through the range-passthrough proxy. This table is also the proxy's
//!   allow-list and must stay a closed list of domains.
//! - **Embed hosts** only allow playback inside their own iframe player.
//!
//! Matching is exact-or-subdomain on the lowercased hostname, so
//! `www.terabox.com` matches `terabox.com` but `evilterabox.com` does not.

use url::Url;

/// Restrictive CDN family whose media is served through the proxy.
const PROXIED_HOSTS: &[&str] = &["terabox.com", "1024terabox.com", "terabox.app"];

/// Hosts that only permit iframe embedding.
const EMBED_HOSTS: &[&str] = &["streamable.com", "jumpshare.com"];

/// Check whether `host` equals `domain` or is a subdomain of it.
///
/// # Examples
///
/// ```
/// use marquee_common::hosts::host_matches;
///
/// assert!(host_matches("terabox.com", "terabox.com"));
/// assert!(host_matches("data.terabox.com", "terabox.com"));
/// assert!(!host_matches("evilterabox.com", "terabox.com"));
/// ```
pub fn host_matches(host: &str, domain: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Check whether a hostname belongs to the proxied CDN family.
pub fn is_proxied_host(host: &str) -> bool {
    PROXIED_HOSTS.iter().any(|domain| host_matches(host, domain))
}

/// Check whether a hostname belongs to an iframe-only embed host.
pub fn is_embed_host(host: &str) -> bool {
    EMBED_HOSTS.iter().any(|domain| host_matches(host, domain))
}

/// Extract the hostname of an absolute URL, if it parses.
pub fn url_host(raw: &str) -> Option<String> {
    Url::parse(raw)
        .ok()
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
}

/// Get the proxied host table.
#[must_use]
pub fn proxied_hosts() -> &'static [&'static str] {
    PROXIED_HOSTS
}

/// Get the embed host table.
#[must_use]
pub fn embed_hosts() -> &'static [&'static str] {
    EMBED_HOSTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxied_family() {
        assert!(is_proxied_host("terabox.com"));
        assert!(is_proxied_host("www.1024terabox.com"));
        assert!(is_proxied_host("d.terabox.app"));
        assert!(is_proxied_host("WWW.TERABOX.COM"));
        assert!(!is_proxied_host("evil.com"));
        assert!(!is_proxied_host("terabox.com.evil.com"));
        assert!(!is_proxied_host("notterabox.com"));
    }

    #[test]
    fn test_embed_family() {
        assert!(is_embed_host("streamable.com"));
        assert!(is_embed_host("cdn.streamable.com"));
        assert!(is_embed_host("jumpshare.com"));
        assert!(!is_embed_host("streamable.co"));
        assert!(!is_embed_host("terabox.com"));
    }

    #[test]
    fn test_trailing_dot_is_ignored() {
        assert!(host_matches("terabox.com.", "terabox.com"));
    }

    #[test]
    fn test_url_host() {
        assert_eq!(
            url_host("https://WWW.Terabox.com/s/abc?x=1").as_deref(),
            Some("www.terabox.com")
        );
        assert_eq!(url_host("not a url"), None);
        assert_eq!(url_host("/relative/path.mp4"), None);
    }
}
