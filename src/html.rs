//! HTML extraction engine backed by the `scraper` crate.
//!
//! Pattern selectors are CSS with two pseudo-element suffixes:
//! `::text` (direct child text nodes) and `::attr(name)`. Path selectors are
//! parsed as a small XPath subset and translated to CSS.

use scraper::{ElementRef, Html, Selector};

use crate::extraction::{Dialect, Extractor, PathExpr, PathTarget};

/// What to read from each selected element
#[derive(Debug, Clone, PartialEq, Eq)]
enum Accessor {
    Html,
    Text,
    DescendantText,
    Attr(String),
}

/// Extraction engine over parsed HTML documents
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Parse a full HTML document
    pub fn parse(html: &str) -> Html {
        Html::parse_document(html)
    }
}

impl Extractor for HtmlExtractor {
    type Document = Html;

    fn select(
        &self,
        document: &Html,
        selector: &str,
        dialect: Dialect,
    ) -> Result<Vec<String>, String> {
        let (css, accessor) = match dialect {
            Dialect::Pattern => split_pseudo_element(selector)?,
            Dialect::Path => {
                let path = PathExpr::parse(selector)?;
                let accessor = match &path.target {
                    PathTarget::Element => Accessor::Html,
                    PathTarget::Text => Accessor::Text,
                    PathTarget::DescendantText => Accessor::DescendantText,
                    PathTarget::Attr(name) => Accessor::Attr(name.clone()),
                };
                (path_to_css(&path), accessor)
            }
        };

        let parsed = Selector::parse(&css)
            .map_err(|e| format!("invalid selector '{}': {}", selector, e))?;

        let mut values = Vec::new();
        for element in document.select(&parsed) {
            read_element(element, &accessor, &mut values);
        }
        Ok(values)
    }
}

fn read_element(element: ElementRef<'_>, accessor: &Accessor, out: &mut Vec<String>) {
    match accessor {
        Accessor::Html => out.push(element.html()),
        Accessor::Text => out.extend(
            element
                .children()
                .filter_map(|node| node.value().as_text())
                .map(|text| String::from(&**text)),
        ),
        Accessor::DescendantText => out.extend(element.text().map(str::to_string)),
        Accessor::Attr(name) => {
            if let Some(value) = element.value().attr(name) {
                out.push(value.to_string());
            }
        }
    }
}

/// Split `h1::text` / `a::attr(href)` into the CSS part and an accessor
fn split_pseudo_element(selector: &str) -> Result<(String, Accessor), String> {
    let trimmed = selector.trim();

    if let Some(css) = trimmed.strip_suffix("::text") {
        return Ok((css_or_universal(css), Accessor::Text));
    }

    if let Some(idx) = trimmed.rfind("::attr(") {
        let attr = trimmed[idx + "::attr(".len()..]
            .strip_suffix(')')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| format!("malformed ::attr() in '{}'", selector))?;
        return Ok((css_or_universal(&trimmed[..idx]), Accessor::Attr(attr.to_string())));
    }

    Ok((trimmed.to_string(), Accessor::Html))
}

fn css_or_universal(css: &str) -> String {
    let css = css.trim();
    if css.is_empty() {
        "*".to_string()
    } else {
        css.to_string()
    }
}

/// Translate a parsed path into an equivalent CSS selector
fn path_to_css(path: &PathExpr) -> String {
    let mut css = String::new();
    for (i, step) in path.steps.iter().enumerate() {
        if i > 0 {
            css.push_str(if step.descendant { " " } else { " > " });
        }

        css.push_str(&step.name);
        if i == 0 && !step.descendant {
            css.push_str(":root");
        }

        for predicate in &step.predicates {
            match &predicate.value {
                Some(value) => css.push_str(&format!(
                    "[{}=\"{}\"]",
                    predicate.attr,
                    value.replace('\\', "\\\\").replace('"', "\\\"")
                )),
                None => css.push_str(&format!("[{}]", predicate.attr)),
            }
        }
    }
    css
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
        <body>
            <h1>  Sunny flat  </h1>
            <div class="price">1.250,50 EUR</div>
            <div class="price">980 EUR</div>
            <p class="desc">Nice flat with <b>cable</b> tv, microwave, shower</p>
            <a href="/contact" class="link">Contact</a>
        </body>
        </html>
    "#;

    fn select(selector: &str) -> Vec<String> {
        let document = HtmlExtractor::parse(PAGE);
        HtmlExtractor::new()
            .select(&document, selector, Dialect::classify(selector))
            .unwrap()
    }

    #[test]
    fn test_css_text() {
        assert_eq!(select(".price::text"), vec!["1.250,50 EUR", "980 EUR"]);
        assert_eq!(select("h1::text"), vec!["  Sunny flat  "]);
    }

    #[test]
    fn test_css_text_direct_children_only() {
        assert_eq!(
            select("p.desc::text"),
            vec!["Nice flat with ", " tv, microwave, shower"]
        );
    }

    #[test]
    fn test_css_attr() {
        assert_eq!(select("a.link::attr(href)"), vec!["/contact"]);
        assert!(select("h1::attr(href)").is_empty());
    }

    #[test]
    fn test_css_outer_html() {
        let links = select("a.link");
        assert_eq!(links.len(), 1);
        assert!(links[0].starts_with("<a "));
        assert!(links[0].ends_with(">Contact</a>"));
    }

    #[test]
    fn test_path_selectors() {
        assert_eq!(select("//h1/text()"), vec!["  Sunny flat  "]);
        assert_eq!(select("//div[@class='price']/text()"), vec!["1.250,50 EUR", "980 EUR"]);
        assert_eq!(select("/html/body/a/@href"), vec!["/contact"]);
        assert!(select("/body/a/@href").is_empty());
    }

    #[test]
    fn test_path_descendant_text() {
        assert_eq!(
            select("//p[@class='desc']//text()"),
            vec!["Nice flat with ", "cable", " tv, microwave, shower"]
        );
        assert_eq!(
            select("//p[@class='desc']/text()"),
            vec!["Nice flat with ", " tv, microwave, shower"]
        );
    }

    #[test]
    fn test_invalid_selectors() {
        let document = HtmlExtractor::parse(PAGE);
        let extractor = HtmlExtractor::new();

        assert!(extractor.select(&document, "div[", Dialect::Pattern).is_err());
        assert!(extractor.select(&document, "a::attr()", Dialect::Pattern).is_err());
        assert!(extractor.select(&document, "//li[1]", Dialect::Path).is_err());
    }

    #[test]
    fn test_path_to_css() {
        let path = PathExpr::parse("/html/body//div[@class='price']/span").unwrap();
        assert_eq!(path_to_css(&path), r#"html:root > body div[class="price"] > span"#);
    }
}
