//! Blotter pages and the listing that links to them.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());
static TIME: LazyLock<Selector> = LazyLock::new(|| Selector::parse("time").unwrap());
static HEADING: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

const BLOTTER: &str = "blotter";

/// What one blotter page yields before extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPage {
    pub fragments: Vec<String>,
    /// Natural-language date from the first `<time>`.
    pub posted_date: Option<String>,
    /// First word of the page heading, e.g. "Waterbury" from "Waterbury police blotter".
    pub source_city: Option<String>,
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect()
}

pub fn parse_blotter(html: &str) -> RawPage {
    let doc = Html::parse_document(html);

    let fragments = doc.select(&PARAGRAPH).map(text_of).collect();
    let posted_date = doc
        .select(&TIME)
        .next()
        .map(|t| text_of(t).trim().to_string())
        .filter(|t| !t.is_empty());
    let source_city = doc
        .select(&HEADING)
        .next()
        .and_then(|h| text_of(h).split_whitespace().next().map(str::to_string));

    RawPage {
        fragments,
        posted_date,
        source_city,
    }
}

/// Links on the listing whose href and text both mention "blotter".
/// Resolved against `base`, first occurrence wins.
pub fn discover_links(html: &str, base: &Url) -> Vec<String> {
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for a in doc.select(&ANCHOR) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        if !href.contains(BLOTTER) || !text_of(a).contains(BLOTTER) {
            continue;
        }
        let resolved = match base.join(href) {
            Ok(u) => u.to_string(),
            Err(_) => continue,
        };
        if seen.insert(resolved.clone()) {
            links.push(resolved);
        }
    }
    links
}

// ── Tests ──
