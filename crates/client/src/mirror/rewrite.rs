//! HTML link rewriting for mirrored attachments.
//!
//! A narrow pure function over a parsed DOM: only `a[href]` and
//! `img[src]` attributes are considered. Recognized repository links are
//! substituted with their local URIs, everything else with the absolute
//! remote URL, so served responses never carry server-relative links.

use std::collections::HashMap;

use scraper::{Html, Selector};

/// Rewrites `href`/`src` attribute values through `resolve`.
///
/// `resolve` maps each distinct attribute value to its replacement, or
/// `None` to leave it untouched. Returns the rewritten HTML.
pub fn rewrite_links<F>(html: &str, mut resolve: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let doc = Html::parse_fragment(html);
    let href = Selector::parse("a[href]").expect("invalid selector");
    let src = Selector::parse("img[src]").expect("invalid selector");
    let values: Vec<&str> = doc
        .select(&href)
        .filter_map(|e| e.value().attr("href"))
        .chain(doc.select(&src).filter_map(|e| e.value().attr("src")))
        .collect();

    let mut substitutions: HashMap<&str, String> = HashMap::new();
    for value in values {
        if substitutions.contains_key(value) {
            continue;
        }
        if let Some(replacement) = resolve(value)
            && replacement != value
        {
            substitutions.insert(value, replacement);
        }
    }

    let mut out = html.to_string();
    for (old, new) in &substitutions {
        out = out.replace(&format!("\"{old}\""), &format!("\"{new}\""));
        out = out.replace(&format!("'{old}'"), &format!("'{new}'"));
    }
    out
}
