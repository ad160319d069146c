//! Archive link extraction from listing-page HTML.
//!
//! The listing page exposes downloads as buttons whose `onclick` handler calls
//! `window.open('<url>', ...)`. The first single-quoted argument is the archive
//! URL.

use scraper::{Html, Selector};
use std::collections::HashSet;

use crate::config::FetchConfig;
use crate::url_model::Link;

const WINDOW_OPEN: &str = "window.open(";
const BUTTON_SELECTOR: &str = r#"input[onclick*="window.open("], button[onclick*="window.open("]"#;

/// Which `window.open` targets count as archive links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRules {
    /// Required URL suffix (e.g. `.zip`).
    pub extension: String,
    /// URLs containing any of these fragments are alternate deliveries.
    pub excluded_segments: Vec<String>,
}

impl Default for LinkRules {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

impl LinkRules {
    pub fn from_config(cfg: &FetchConfig) -> Self {
        Self {
            extension: cfg.archive_extension.clone(),
            excluded_segments: cfg.excluded_path_segments.clone(),
        }
    }

    /// The archive URL carried by an `onclick` handler, if it qualifies.
    pub fn accept(&self, onclick: &str) -> Option<String> {
        if !onclick.contains(WINDOW_OPEN) {
            return None;
        }
        let url = onclick.split('\'').nth(1)?.trim();
        if !url.starts_with("http") || !url.ends_with(self.extension.as_str()) {
            return None;
        }
        if self.excluded_segments.iter().any(|s| url.contains(s.as_str())) {
            return None;
        }
        Some(url.to_string())
    }
}

/// Extract archive links from `html`, oldest-first.
///
/// URLs are deduplicated keeping the first occurrence, then the order is
/// reversed (the page lists newest first). Falls back to a raw attribute scan
/// when the DOM parse finds no handlers although the markup mentions
/// `window.open(`.
pub fn extract_links(html: &str, rules: &LinkRules) -> Vec<Link> {
    let handlers = match dom_onclick_handlers(html) {
        Some(h) if !h.is_empty() || !html.contains(WINDOW_OPEN) => h,
        _ => {
            tracing::debug!("DOM parse found no window.open handlers; scanning raw markup");
            scan_onclick_attributes(html)
        }
    };

    let mut seen = HashSet::new();
    let mut links: Vec<Link> = handlers
        .iter()
        .filter_map(|h| rules.accept(h))
        .filter(|url| seen.insert(url.clone()))
        .filter_map(|url| Link::parse(&url))
        .collect();
    links.reverse();
    links
}

/// `onclick` values of buttons calling `window.open(`, in document order.
/// `None` if the selector cannot be built.
fn dom_onclick_handlers(html: &str) -> Option<Vec<String>> {
    let sel = Selector::parse(BUTTON_SELECTOR).ok()?;
    let document = Html::parse_document(html);
    Some(
        document
            .select(&sel)
            .filter_map(|n| n.value().attr("onclick"))
            .map(str::to_string)
            .collect(),
    )
}

/// Lenient tokenizer: every `onclick=` attribute value in the raw markup,
/// quoted or not, with the common character references decoded.
fn scan_onclick_attributes(html: &str) -> Vec<String> {
    let lower = html.to_ascii_lowercase();
    let mut out = Vec::new();
    let mut pos = 0;
    while let Some(found) = lower[pos..].find("onclick") {
        let mut i = pos + found + "onclick".len();
        pos = i;
        let bytes = html.as_bytes();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        let (start, end) = match bytes[i] {
            q @ (b'"' | b'\'') => {
                let start = i + 1;
                let end = html[start..]
                    .find(q as char)
                    .map_or(html.len(), |n| start + n);
                (start, end)
            }
            _ => {
                let end = html[i..]
                    .find(|c: char| c.is_ascii_whitespace() || c == '>')
                    .map_or(html.len(), |n| i + n);
                (i, end)
            }
        };
        out.push(decode_entities(&html[start..end]));
        pos = end;
    }
    out
}

fn decode_entities(s: &str) -> String {
    s.replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button(url: &str) -> String {
        format!(
            r#"<input type="button" value="下載" onclick="window.open('{}','_blank')">"#,
            url
        )
    }

    fn page(buttons: &[String]) -> String {
        format!(
            "<html><body><table>{}</table></body></html>",
            buttons
                .iter()
                .map(|b| format!("<tr><td>{}</td></tr>", b))
                .collect::<String>()
        )
    }

    fn urls(links: &[Link]) -> Vec<&str> {
        links.iter().map(|l| l.url.as_str()).collect()
    }

    const RPT: &str = "https://www.taifex.com.tw/file/taifex/Dailydownload/Dailydownload";
    const CSV: &str = "https://www.taifex.com.tw/file/taifex/Dailydownload/DailydownloadCSV";

    #[test]
    fn no_buttons_yields_empty() {
        let html = "<html><body><p>nothing here</p></body></html>";
        assert!(extract_links(html, &LinkRules::default()).is_empty());
        assert!(extract_links("", &LinkRules::default()).is_empty());
    }

    #[test]
    fn reverses_page_order() {
        let html = page(&[
            button(&format!("{}/Daily_20240103.zip", RPT)),
            button(&format!("{}/Daily_20240102.zip", RPT)),
            button(&format!("{}/Daily_20240101.zip", RPT)),
        ]);
        let links = extract_links(&html, &LinkRules::default());
        let names: Vec<_> = links.iter().map(|l| l.filename.as_str()).collect();
        assert_eq!(
            names,
            vec!["Daily_20240101.zip", "Daily_20240102.zip", "Daily_20240103.zip"]
        );
    }

    #[test]
    fn excludes_csv_delivery() {
        let html = page(&[
            button(&format!("{}/Daily_20240103.zip", RPT)),
            button(&format!("{}/Daily_20240103.zip", CSV)),
        ]);
        let links = extract_links(&html, &LinkRules::default());
        assert_eq!(urls(&links), vec![format!("{}/Daily_20240103.zip", RPT)]);
    }

    #[test]
    fn rejects_relative_and_non_archive_targets() {
        let html = page(&[
            button("/file/Daily_20240103.zip"),
            button(&format!("{}/Daily_20240103.pdf", RPT)),
            r#"<input type="button" onclick="doSomething()">"#.to_string(),
            r#"<input type="button" onclick="window.open(noquotes)">"#.to_string(),
        ]);
        assert!(extract_links(&html, &LinkRules::default()).is_empty());
    }

    #[test]
    fn dedups_first_seen_then_reverses() {
        let a = format!("{}/Daily_20240103.zip", RPT);
        let b = format!("{}/Daily_20240102.zip", RPT);
        let c = format!("{}/Daily_20240101.zip", RPT);
        let html = page(&[button(&a), button(&b), button(&a), button(&c), button(&b)]);
        let links = extract_links(&html, &LinkRules::default());
        assert_eq!(urls(&links), vec![c.as_str(), b.as_str(), a.as_str()]);
    }

    #[test]
    fn anchors_are_not_interactive_buttons() {
        let html = format!(
            r#"<a href="{0}/Daily_20240101.zip">link</a>{1}"#,
            RPT,
            button(&format!("{}/Daily_20240102.zip", RPT))
        );
        let links = extract_links(&html, &LinkRules::default());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].filename, "Daily_20240102.zip");
    }

    #[test]
    fn rules_accept() {
        let rules = LinkRules::default();
        assert_eq!(
            rules.accept("window.open('http://x/a/Daily_20240101.zip','_blank')"),
            Some("http://x/a/Daily_20240101.zip".to_string())
        );
        assert_eq!(rules.accept("window.open('http://x/DailydownloadCSV/a.zip')"), None);
        assert_eq!(rules.accept("location.href='http://x/a.zip'"), None);
    }

    #[test]
    fn raw_scan_reads_quoted_and_unquoted_values() {
        let html = r#"<input onclick = "window.open('http://x/a.zip')"><b onclick='go(&#39;y&#39;)'><i onclick=plain>"#;
        assert_eq!(
            scan_onclick_attributes(html),
            vec![
                "window.open('http://x/a.zip')".to_string(),
                "go('y')".to_string(),
                "plain".to_string()
            ]
        );
    }

    #[test]
    fn raw_scan_tolerates_truncated_markup() {
        let html = r#"<input onclick="window.open('http://x/Daily_20240101.zip','_blank')"#;
        let handlers = scan_onclick_attributes(html);
        assert_eq!(handlers.len(), 1);
        assert_eq!(
            LinkRules::default().accept(&handlers[0]).as_deref(),
            Some("http://x/Daily_20240101.zip")
        );
    }
}
