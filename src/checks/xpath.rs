//! XPath subset translated to CSS selectors.
//!
//! `scraper` only speaks CSS, so location paths are rewritten step by step:
//! `/` becomes the child combinator, `//` the descendant combinator, and the
//! predicates CSS can express become pseudo-classes or attribute selectors.
//!
//! Positions count siblings of the same name (`li[2]` is `li:nth-of-type(2)`)
//! or, under `*`, every element sibling (`*[2]` is `*:nth-child(2)`). XPath
//! positions after a filter (`li[@class='x'][1]`) count within the filtered
//! set, which CSS cannot express, so that form is rejected.

use std::sync::LazyLock;

use regex::Regex;

use crate::error_handling::XPathError;

static STEP_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*|[A-Za-z_][A-Za-z0-9_-]*)$").expect("step name pattern is a valid regex")
});
static ATTR_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@([A-Za-z_][A-Za-z0-9_-]*)$").expect("attribute pattern is a valid regex")
});
static ATTR_EQUALS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^@([A-Za-z_][A-Za-z0-9_-]*)\s*=\s*(?:'([^']*)'|"([^"]*)")$"#)
        .expect("attribute equality pattern is a valid regex")
});
static ATTR_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(contains|starts-with)\(\s*@([A-Za-z_][A-Za-z0-9_-]*)\s*,\s*(?:'([^']*)'|"([^"]*)")\s*\)$"#,
    )
    .expect("attribute function pattern is a valid regex")
});

/// What to read from the first matched element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XPathTarget {
    /// Text content (a trailing `text()` step or none at all)
    Text,
    /// Value of the attribute named by a trailing `@attr` step
    Attribute(String),
}

/// A CSS selector equivalent to an XPath location path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedXPath {
    pub selector: String,
    pub target: XPathTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

/// Whether a check target is written as XPath rather than CSS.
pub fn is_xpath(target: &str) -> bool {
    target.trim_start().starts_with('/')
}

/// Translates `xpath` into a CSS selector plus what to extract.
///
/// # Errors
///
/// Returns `XPathError` for empty input, unbalanced brackets or quotes, and
/// steps or predicates outside the supported subset.
pub fn translate(xpath: &str) -> Result<TranslatedXPath, XPathError> {
    let steps = split_steps(xpath)?;
    if steps.is_empty() {
        return Err(XPathError::Empty);
    }

    let mut target = XPathTarget::Text;
    let mut element_steps = steps.as_slice();
    if let Some((_, last)) = steps.last() {
        if *last == "text()" {
            element_steps = &steps[..steps.len() - 1];
        } else if let Some(caps) = ATTR_NAME.captures(last) {
            target = XPathTarget::Attribute(caps[1].to_string());
            element_steps = &steps[..steps.len() - 1];
        }
    }
    if element_steps.is_empty() {
        return Err(XPathError::UnsupportedStep(xpath.trim().to_string()));
    }

    let mut selector = String::new();
    for (index, (axis, step)) in element_steps.iter().enumerate() {
        let compound = translate_step(step)?;
        if index == 0 {
            selector.push_str(&compound);
            // A single leading slash anchors the path at the document root
            if *axis == Axis::Child {
                selector.push_str(":root");
            }
        } else {
            selector.push_str(match axis {
                Axis::Child => " > ",
                Axis::Descendant => " ",
            });
            selector.push_str(&compound);
        }
    }
    if let XPathTarget::Attribute(name) = &target {
        selector.push_str(&format!("[{name}]"));
    }

    Ok(TranslatedXPath { selector, target })
}

/// Splits a path into (axis, step) pairs, honouring brackets and quotes.
fn split_steps(xpath: &str) -> Result<Vec<(Axis, &str)>, XPathError> {
    let unbalanced = || XPathError::Unbalanced(xpath.to_string());
    let path = xpath.trim();
    let bytes = path.as_bytes();
    let mut steps = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let axis = if path[i..].starts_with("//") {
            i += 2;
            Axis::Descendant
        } else if bytes[i] == b'/' {
            i += 1;
            Axis::Child
        } else if i == 0 {
            // Relative paths match anywhere
            Axis::Descendant
        } else {
            return Err(unbalanced());
        };

        let start = i;
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        while i < bytes.len() {
            let b = bytes[i];
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None => match b {
                    b'\'' | b'"' => quote = Some(b),
                    b'[' | b'(' => depth += 1,
                    b']' | b')' => depth = depth.checked_sub(1).ok_or_else(unbalanced)?,
                    b'/' if depth == 0 => break,
                    _ => {}
                },
            }
            i += 1;
        }
        if depth != 0 || quote.is_some() {
            return Err(unbalanced());
        }

        let step = path[start..i].trim();
        if step.is_empty() {
            return Err(XPathError::UnsupportedStep(path.to_string()));
        }
        steps.push((axis, step));
    }
    Ok(steps)
}

/// `name[pred][pred]` → CSS compound selector.
fn translate_step(step: &str) -> Result<String, XPathError> {
    let (name, mut rest) = match step.find('[') {
        Some(pos) => (step[..pos].trim(), &step[pos..]),
        None => (step, ""),
    };
    if !STEP_NAME.is_match(name) {
        return Err(XPathError::UnsupportedStep(step.to_string()));
    }

    let wildcard = name == "*";
    let mut compound = name.to_string();
    let mut filtered = false;
    while !rest.is_empty() {
        let close = matching_bracket(rest)
            .ok_or_else(|| XPathError::Unbalanced(step.to_string()))?;
        let predicate = rest[1..close].trim();
        if is_positional(predicate) {
            if filtered {
                return Err(XPathError::UnsupportedPredicate(predicate.to_string()));
            }
        } else {
            filtered = true;
        }
        compound.push_str(&translate_predicate(predicate, wildcard)?);
        rest = rest[close + 1..].trim_start();
        if !rest.is_empty() && !rest.starts_with('[') {
            return Err(XPathError::UnsupportedStep(step.to_string()));
        }
    }
    Ok(compound)
}

/// Index of the `]` closing the `[` at the start of `s`.
fn matching_bracket(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

fn is_positional(predicate: &str) -> bool {
    predicate == "last()" || predicate.parse::<usize>().is_ok()
}

/// `wildcard` steps count every element sibling rather than same-name ones.
fn translate_predicate(predicate: &str, wildcard: bool) -> Result<String, XPathError> {
    let kind = if wildcard { "child" } else { "of-type" };
    if let Ok(position) = predicate.parse::<usize>() {
        if position == 0 {
            return Err(XPathError::UnsupportedPredicate(predicate.to_string()));
        }
        return Ok(format!(":nth-{kind}({position})"));
    }
    if predicate == "last()" {
        return Ok(format!(":last-{kind}"));
    }
    if let Some(caps) = ATTR_NAME.captures(predicate) {
        return Ok(format!("[{}]", &caps[1]));
    }
    if let Some(caps) = ATTR_EQUALS.captures(predicate) {
        let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
        return Ok(format!("[{}=\"{}\"]", &caps[1], escape_css_string(value)));
    }
    if let Some(caps) = ATTR_FUNCTION.captures(predicate) {
        let operator = if &caps[1] == "contains" { "*=" } else { "^=" };
        let value = caps.get(3).or_else(|| caps.get(4)).map_or("", |m| m.as_str());
        return Ok(format!(
            "[{}{operator}\"{}\"]",
            &caps[2],
            escape_css_string(value)
        ));
    }
    Err(XPathError::UnsupportedPredicate(predicate.to_string()))
}

fn escape_css_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn css(xpath: &str) -> String {
        translate(xpath).unwrap().selector
    }

    #[test]
    fn test_is_xpath() {
        assert!(is_xpath("//h1"));
        assert!(is_xpath("/html/body"));
        assert!(!is_xpath("div.content > p"));
    }

    #[test]
    fn test_axes() {
        assert_eq!(css("//h1"), "h1");
        assert_eq!(css("/html/body/h1"), "html:root > body > h1");
        assert_eq!(css("//div//span"), "div span");
        assert_eq!(css("//ul/li"), "ul > li");
    }

    #[test]
    fn test_predicates() {
        assert_eq!(css("//ul/li[2]"), "ul > li:nth-of-type(2)");
        assert_eq!(css("//li[last()]"), "li:last-of-type");
        assert_eq!(css("//div[@id='main']"), "div[id=\"main\"]");
        assert_eq!(css("//a[@href]"), "a[href]");
        assert_eq!(
            css("//div[contains(@class, 'price')]/span"),
            "div[class*=\"price\"] > span"
        );
        assert_eq!(css("//a[starts-with(@href,\"https\")]"), "a[href^=\"https\"]");
        assert_eq!(css("//li[2][@class='x']"), "li:nth-of-type(2)[class=\"x\"]");
    }

    #[test]
    fn test_wildcard_positions_count_all_siblings() {
        assert_eq!(css("//ul/*[2]"), "ul > *:nth-child(2)");
        assert_eq!(css("//ul/*[last()]"), "ul > *:last-child");

        let html = scraper::Html::parse_fragment("<ul><li>a</li><p>b</p><li>c</li></ul>");
        let selector = scraper::Selector::parse(&css("//ul/*[2]")).unwrap();
        let texts: Vec<String> = html
            .select(&selector)
            .map(|e| e.text().collect())
            .collect();
        assert_eq!(texts, vec!["b"]);
    }

    #[test]
    fn test_position_after_filter_is_rejected() {
        assert_eq!(
            translate("//li[@class='x'][1]"),
            Err(XPathError::UnsupportedPredicate("1".to_string()))
        );
        assert!(matches!(
            translate("//*[@data-x='1'][last()]"),
            Err(XPathError::UnsupportedPredicate(_))
        ));
    }

    #[test]
    fn test_trailing_text_and_attribute() {
        let t = translate("//h1/text()").unwrap();
        assert_eq!(t.selector, "h1");
        assert_eq!(t.target, XPathTarget::Text);

        let t = translate("//a[@class='next']/@href").unwrap();
        assert_eq!(t.selector, "a[class=\"next\"][href]");
        assert_eq!(t.target, XPathTarget::Attribute("href".to_string()));
    }

    #[test]
    fn test_slash_inside_predicate_value() {
        assert_eq!(css("//a[@href='/docs/intro']"), "a[href=\"/docs/intro\"]");
    }

    #[test]
    fn test_unsupported_expressions() {
        assert_eq!(translate(""), Err(XPathError::Empty));
        assert!(matches!(
            translate("//div[contains(text(),'x')]"),
            Err(XPathError::UnsupportedPredicate(_))
        ));
        assert!(matches!(
            translate("//div/.."),
            Err(XPathError::UnsupportedStep(_))
        ));
        assert!(matches!(
            translate("//div[@id='x'"),
            Err(XPathError::Unbalanced(_))
        ));
        assert!(matches!(translate("//li[0]"), Err(XPathError::UnsupportedPredicate(_))));
        assert!(matches!(translate("//text()"), Err(XPathError::UnsupportedStep(_))));
    }

    #[test]
    fn test_translations_parse_as_css() {
        for xpath in [
            "/html/body/h1",
            "//ul/li[2]",
            "//div[contains(@class,'a b')]//span[last()]",
            "//a[@class='next']/@href",
        ] {
            let t = translate(xpath).unwrap();
            assert!(
                scraper::Selector::parse(&t.selector).is_ok(),
                "{} -> {}",
                xpath,
                t.selector
            );
        }
    }
}
