use scraper::{ElementRef, Selector};
use url::Url;

/// Compiles a selector known at build time
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e:?}"))
}

/// Text of an element with every text node trimmed and concatenated
pub fn stripped_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Text of an element exactly as it appears in the document
pub fn raw_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// First descendant of `scope` matching `selector`
pub fn first<'a>(scope: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    scope.select(selector).next()
}

/// Stripped text of the first descendant matching `selector`
pub fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    first(scope, selector).map(stripped_text)
}

/// First element matching `selector` whose stripped text equals `text`
pub fn find_by_text<'a>(
    scope: ElementRef<'a>,
    selector: &Selector,
    text: &str,
) -> Option<ElementRef<'a>> {
    scope.select(selector).find(|e| stripped_text(*e) == text)
}

/// First element matching `selector` that has no child elements and whose
/// text contains `needle`
pub fn find_leaf_containing<'a>(
    scope: ElementRef<'a>,
    selector: &Selector,
    needle: &str,
) -> Option<ElementRef<'a>> {
    scope
        .select(selector)
        .filter(|e| e.children().all(|c| !c.value().is_element()))
        .find(|e| raw_text(*e).contains(needle))
}

/// First element matching `selector` that follows `anchor` in document
/// order within `scope`, including `anchor`'s own descendants
pub fn find_next<'a>(
    scope: ElementRef<'a>,
    anchor: ElementRef<'a>,
    selector: &Selector,
) -> Option<ElementRef<'a>> {
    scope
        .descendants()
        .skip_while(|node| node.id() != anchor.id())
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|e| selector.matches(e))
}

/// Resolves an `href` against the site origin
pub fn absolute_url(origin: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    origin.join(href).ok().map(|url| url.to_string())
}
