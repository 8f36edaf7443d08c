//! Content checks: CSS selector or XPath extraction against the page body.

use scraper::{Html, Selector};

use crate::checks::validation::validate;
use crate::checks::xpath::{self, XPathTarget};
use crate::config::MAX_MESSAGE_PREVIEW_CHARS;
use crate::error_handling::PatrolError;
use crate::models::{CheckResult, CheckType, CheckValue, PatrolCheck};
use crate::utils::preview;

/// First match of a selector: how many elements matched and the extracted value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Extraction {
    pub count: usize,
    pub value: String,
}

/// Resolves `target` (CSS, or XPath when it starts with `/`) against `body`.
///
/// # Errors
///
/// Returns `PatrolError::ValidationError` for unsupported XPath or a selector
/// that does not parse.
pub(crate) fn extract(target: &str, body: &str) -> Result<Option<Extraction>, PatrolError> {
    let (css, attribute) = if xpath::is_xpath(target) {
        let translated = xpath::translate(target)?;
        let attribute = match translated.target {
            XPathTarget::Attribute(name) => Some(name),
            XPathTarget::Text => None,
        };
        (translated.selector, attribute)
    } else {
        (target.to_string(), None)
    };

    let selector = Selector::parse(&css).map_err(|e| {
        PatrolError::ValidationError(format!("invalid selector '{target}': {e}"))
    })?;

    let document = Html::parse_document(body);
    let mut matches = document.select(&selector);
    let Some(first) = matches.next() else {
        return Ok(None);
    };
    let count = 1 + matches.count();
    let value = match attribute {
        Some(name) => first.value().attr(&name).unwrap_or_default().trim().to_string(),
        None => collapse_whitespace(first.text()),
    };
    Ok(Some(Extraction { count, value }))
}

fn collapse_whitespace<'a>(fragments: impl Iterator<Item = &'a str>) -> String {
    fragments
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn run(check: &PatrolCheck, body: &str) -> CheckResult {
    let mut result = CheckResult::new(CheckType::ContentCheck);
    let target = check.target.trim();

    let (extraction, selector_error) = if target.is_empty() {
        (None, None)
    } else {
        match extract(target, body) {
            Ok(found) => (found, None),
            Err(e) => (None, Some(e)),
        }
    };

    match (extraction, check.expected()) {
        (Some(found), expected) => {
            result.value = CheckValue::Count(found.count);
            result.message = format!(
                "'{target}' matched {} element(s), extracted: {}",
                found.count,
                preview(&found.value, MAX_MESSAGE_PREVIEW_CHARS)
            );
            match expected {
                None => result.success = true,
                Some(expected) => match validate(&found.value, expected, check.tolerance) {
                    Ok(ok) => {
                        result.success = ok;
                        result.validation_success = Some(ok);
                        result.message.push_str(&format!(
                            "; expected {} '{}': {}",
                            String::from(check.tolerance),
                            preview(expected, MAX_MESSAGE_PREVIEW_CHARS),
                            if ok { "passed" } else { "failed" }
                        ));
                    }
                    Err(e) => result.message.push_str(&format!("; {e}")),
                },
            }
            result.extracted_value = Some(found.value);
        }
        (None, Some(expected)) => {
            // Nothing extracted: search the raw body instead
            let found = body.contains(expected);
            result.success = found;
            result.value = CheckValue::Found(found);
            result.validation_success = Some(found);
            let lead = match &selector_error {
                Some(e) => format!("{e}; "),
                None if target.is_empty() => String::new(),
                None => format!("'{target}' matched nothing; "),
            };
            result.message = format!(
                "{lead}body {} '{}'",
                if found { "contains" } else { "does not contain" },
                preview(expected, MAX_MESSAGE_PREVIEW_CHARS)
            );
        }
        (None, None) => {
            result.message = match selector_error {
                Some(e) => e.to_string(),
                None if target.is_empty() => "content check has neither target nor expected value".to_string(),
                None => format!("'{target}' matched no elements"),
            };
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tolerance;

    const PAGE: &str = r#"<html><head><title>Example Domain</title></head>
        <body>
          <h1>  Welcome
              home </h1>
          <ul><li>one</li><li class="x">two</li><li>three</li></ul>
          <a class="next" href="/page/2">Next</a>
        </body></html>"#;

    fn check(target: &str) -> PatrolCheck {
        PatrolCheck::new("c", CheckType::ContentCheck, target)
    }

    #[test]
    fn test_title_contains() {
        let r = run(&check("title").with_expected("Example", Tolerance::Contains), PAGE);
        assert!(r.success);
        assert_eq!(r.validation_success, Some(true));
        assert!(r.extracted_value.unwrap().contains("Example Domain"));
    }

    #[test]
    fn test_exact_mismatch_fails() {
        let r = run(&check("title").with_expected("Example", Tolerance::Exact), PAGE);
        assert!(!r.success);
        assert_eq!(r.validation_success, Some(false));
        assert_eq!(r.extracted_value.as_deref(), Some("Example Domain"));
    }

    #[test]
    fn test_regex_tolerance() {
        let r = run(&check("li.x").with_expected("^t.o$", Tolerance::Regex), PAGE);
        assert!(r.success);
    }

    #[test]
    fn test_bad_regex_fails_with_message() {
        let r = run(&check("title").with_expected("(", Tolerance::Regex), PAGE);
        assert!(!r.success);
        assert!(r.message.contains("invalid regex"));
    }

    #[test]
    fn test_extraction_without_expected() {
        let r = run(&check("ul li"), PAGE);
        assert!(r.success);
        assert_eq!(r.value, CheckValue::Count(3));
        assert_eq!(r.extracted_value.as_deref(), Some("one"));
        assert_eq!(r.validation_success, None);
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        let r = run(&check("h1"), PAGE);
        assert_eq!(r.extracted_value.as_deref(), Some("Welcome home"));
    }

    #[test]
    fn test_xpath_text_and_attribute() {
        let r = run(&check("//ul/li[2]"), PAGE);
        assert_eq!(r.extracted_value.as_deref(), Some("two"));

        let r = run(&check("//a[@class='next']/@href"), PAGE);
        assert!(r.success);
        assert_eq!(r.extracted_value.as_deref(), Some("/page/2"));

        let r = run(&check("/html/head/title/text()"), PAGE);
        assert_eq!(r.extracted_value.as_deref(), Some("Example Domain"));
    }

    #[test]
    fn test_no_match_falls_back_to_body_search() {
        let r = run(&check("#missing").with_expected("Welcome", Tolerance::Exact), PAGE);
        assert!(r.success);
        assert_eq!(r.value, CheckValue::Found(true));
        assert_eq!(r.extracted_value, None);

        let r = run(&check("#missing").with_expected("Goodbye", Tolerance::Contains), PAGE);
        assert!(!r.success);
    }

    #[test]
    fn test_no_match_without_expected_fails() {
        let r = run(&check("#missing"), PAGE);
        assert!(!r.success);
        assert!(r.message.contains("matched no elements"));
    }

    #[test]
    fn test_unsupported_xpath_reports_validation_error() {
        let r = run(&check("//div/.."), PAGE);
        assert!(!r.success);
        assert!(r.message.starts_with("Validation error"));
    }
}
