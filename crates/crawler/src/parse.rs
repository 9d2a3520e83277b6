//! URL parsing, validation and `<a href="...">` link extraction.
//!
//! The crawler only ever speaks to one host (spec: cross-host crawling is
//! a non-goal), so parsing stays intentionally narrow: scheme must be
//! `http://`, and the host is validated by hand rather than pulled in
//! through a general-purpose URL crate.

use crate::error::CrawlerError;

/// A parsed `http://host[:port]/path` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUrl {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl PageUrl {
    pub fn parse(url: &str) -> Result<PageUrl, CrawlerError> {
        let rest = url
            .strip_prefix("http://")
            .ok_or_else(|| CrawlerError::InvalidUrl(url.to_owned()))?;

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };

        if authority.is_empty() {
            return Err(CrawlerError::InvalidUrl(url.to_owned()));
        }

        let (host, port) = match authority.find(':') {
            Some(idx) => {
                let port = authority[idx + 1..]
                    .parse()
                    .map_err(|_| CrawlerError::InvalidUrl(url.to_owned()))?;
                (&authority[..idx], port)
            }
            None => (authority, 80),
        };

        validate_host(host)?;

        Ok(PageUrl { host: host.to_owned(), port, path: path.to_owned() })
    }

    pub fn authority(&self) -> String {
        if self.port == 80 {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// The first path segment, used as the relative base directory for
    /// links that aren't `/`-rooted.
    pub fn first_dir(&self) -> &str {
        self.path.trim_start_matches('/').split('/').next().unwrap_or("")
    }

    pub fn to_string(&self) -> String {
        format!("http://{}{}", self.authority(), self.path)
    }
}

/// Every character of the host must be alphanumeric, `.`, `/`, or `-`.
fn validate_host(host: &str) -> Result<(), CrawlerError> {
    if host.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '/' || c == '-') {
        Ok(())
    } else {
        Err(CrawlerError::InvalidHost(host.to_owned()))
    }
}

/// Extracts every link from a page's HTML body. If any `<a` opening tag
/// has no matching `</a>` anywhere after it, the whole page is treated as
/// malformed and no links are returned at all.
pub fn extract_links(html: &str, base: &PageUrl) -> Vec<String> {
    let lower = html.to_ascii_lowercase();
    let mut links = Vec::new();
    let mut pos = 0;

    while let Some(start) = lower[pos..].find("<a") {
        let tag_start = pos + start;
        let tag_end = match lower[tag_start..].find('>') {
            Some(end) => end,
            None => break,
        };
        let tag = &html[tag_start..tag_start + tag_end + 1];

        if lower[tag_start..].find("</a>").is_none() {
            return Vec::new();
        }

        if let Some(href) = extract_href(tag) {
            links.push(normalize_link(&href, base));
        }

        pos = tag_start + tag_end + 1;
    }

    links
}

fn extract_href(tag: &str) -> Option<String> {
    let lower = tag.to_ascii_lowercase();
    let attr_pos = lower.find("href=")?;
    let rest = &tag[attr_pos + 5..];
    let quote = rest.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let value_end = rest[1..].find(quote)?;
    Some(rest[1..1 + value_end].to_owned())
}

fn normalize_link(href: &str, base: &PageUrl) -> String {
    if href.starts_with('/') {
        format!("http://{}{}", base.authority(), href)
    } else {
        let dir = base.first_dir();
        if dir.is_empty() {
            format!("http://{}/{}", base.authority(), href)
        } else {
            format!("http://{}/{}/{}", base.authority(), dir, href)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_port_and_path() {
        let url = PageUrl::parse("http://example.com:8080/docs/page.html").unwrap();
        assert_eq!(url.host, "example.com");
        assert_eq!(url.port, 8080);
        assert_eq!(url.path, "/docs/page.html");
        assert_eq!(url.first_dir(), "docs");
    }

    #[test]
    fn default_port_and_root_path() {
        let url = PageUrl::parse("http://example.com").unwrap();
        assert_eq!(url.port, 80);
        assert_eq!(url.path, "/");
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert!(PageUrl::parse("https://example.com").is_err());
        assert!(PageUrl::parse("ftp://example.com").is_err());
    }

    #[test]
    fn rejects_host_with_invalid_characters() {
        assert!(PageUrl::parse("http://exa$mple.com/").is_err());
    }

    #[test]
    fn extracts_absolute_and_relative_links() {
        let base = PageUrl::parse("http://host/docs/index.html").unwrap();
        let html = r#"<html><a href="/other.html">x</a><a href='page2.html'>y</a></html>"#;
        let links = extract_links(html, &base);
        assert_eq!(links, vec!["http://host/other.html", "http://host/docs/page2.html"]);
    }

    #[test]
    fn malformed_html_without_closing_tag_yields_no_links() {
        let base = PageUrl::parse("http://host/").unwrap();
        let html = r#"<a href="/other.html">no closing tag here"#;
        assert!(extract_links(html, &base).is_empty());
    }
}
