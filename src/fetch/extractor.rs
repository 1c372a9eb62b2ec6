use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

const IGNORED_TAGS: [&str; 9] = [
    "script", "style", "nav", "footer", "aside", "header", "form", "button", "noscript",
];
const MAIN_SELECTORS: [&str; 3] = ["article", "main", r#"[role="main"]"#];
const CONTENT_SELECTOR: &str = "p, h1, h2, h3, h4, li, td, th";
const MIN_FRAGMENT_CHARS: usize = 25;
const BOILERPLATE_PREFIXES: [&str; 3] = ["copyright", "related posts", "leave a reply"];

/// Pulls readable body text out of an HTML document.
///
/// Returns `None` when no fragment survives the length filter.
pub(super) fn extract_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let fragments = match main_region(&document) {
        Some(region) => region_fragments(region),
        None => paragraph_fragments(&document),
    };
    if fragments.is_empty() {
        return None;
    }

    let joined = fragments.join(" ");
    Some(joined.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn main_region(document: &Html) -> Option<ElementRef<'_>> {
    MAIN_SELECTORS.iter().find_map(|sel| {
        let selector = Selector::parse(sel).ok()?;
        document.select(&selector).find(|el| !is_ignored(*el))
    })
}

fn region_fragments(region: ElementRef<'_>) -> Vec<String> {
    let Ok(selector) = Selector::parse(CONTENT_SELECTOR) else {
        return Vec::new();
    };
    region
        .select(&selector)
        .filter(|el| !is_ignored(*el))
        .map(visible_text)
        .filter(|text| is_substantial(text) && !is_boilerplate(text))
        .collect()
}

fn paragraph_fragments(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("p") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter(|el| !is_ignored(*el))
        .map(visible_text)
        .filter(|text| is_substantial(text))
        .collect()
}

/// Stripped text nodes joined by single spaces, skipping ignored subtrees.
fn visible_text(element: ElementRef<'_>) -> String {
    element
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let inside_ignored = node.ancestors().any(|a| {
                    a.value()
                        .as_element()
                        .is_some_and(|e| IGNORED_TAGS.contains(&e.name()))
                });
                (!inside_ignored).then(|| text.trim())
            }
            _ => None,
        })
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_ignored(element: ElementRef<'_>) -> bool {
    IGNORED_TAGS.contains(&element.value().name())
        || element.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| IGNORED_TAGS.contains(&e.name()))
        })
}

fn is_substantial(text: &str) -> bool {
    text.chars().count() > MIN_FRAGMENT_CHARS
}

fn is_boilerplate(text: &str) -> bool {
    let lower = text.to_lowercase();
    BOILERPLATE_PREFIXES.iter().any(|p| lower.starts_with(p))
}
