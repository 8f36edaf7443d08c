//! Dotted paths into JSON documents (`data.user.name`, `items.0.id`, `items[0].id`).

use serde_json::Value;

use crate::error_handling::JsonPathError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

fn parse(path: &str) -> Result<Vec<Segment<'_>>, JsonPathError> {
    let malformed = || JsonPathError::Malformed(path.to_string());
    let mut segments = Vec::new();
    for part in path.split('.') {
        let (key, mut indexes) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };
        if key.is_empty() && indexes.is_empty() {
            return Err(malformed());
        }
        if !key.is_empty() {
            segments.push(Segment::Key(key));
        }
        while !indexes.is_empty() {
            let close = indexes.find(']').ok_or_else(malformed)?;
            let index = indexes[1..close].trim().parse().map_err(|_| malformed())?;
            segments.push(Segment::Index(index));
            indexes = &indexes[close + 1..];
            if !indexes.is_empty() && !indexes.starts_with('[') {
                return Err(malformed());
            }
        }
    }
    Ok(segments)
}

/// Looks `path` up in `doc`. `Ok(None)` when a key or index is absent.
///
/// A purely numeric key indexes arrays and is looked up as a key in objects.
///
/// # Errors
///
/// Returns `JsonPathError::Malformed` for empty segments or bad brackets.
pub fn resolve<'v>(doc: &'v Value, path: &str) -> Result<Option<&'v Value>, JsonPathError> {
    let mut current = doc;
    for segment in parse(path.trim())? {
        let next = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key),
            (Segment::Key(key), Value::Array(items)) => {
                key.parse::<usize>().ok().and_then(|i| items.get(i))
            }
            (Segment::Index(i), Value::Array(items)) => items.get(i),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// Parses `body` and resolves `path`, rendering the value as text.
///
/// Strings are returned without quotes; everything else as compact JSON.
///
/// # Errors
///
/// Returns `JsonPathError` if the body is not JSON or the path is malformed.
pub fn extract(body: &str, path: &str) -> Result<Option<String>, JsonPathError> {
    let doc: Value =
        serde_json::from_str(body).map_err(|e| JsonPathError::InvalidJson(e.to_string()))?;
    Ok(resolve(&doc, path)?.map(|value| match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_top_level_and_nested_keys() {
        let doc = json!({"status": "ok", "data": {"user": {"name": "ada", "id": 7}}});
        assert_eq!(resolve(&doc, "status").unwrap(), Some(&json!("ok")));
        assert_eq!(resolve(&doc, "data.user.name").unwrap(), Some(&json!("ada")));
        assert_eq!(resolve(&doc, "data.user.email").unwrap(), None);
        assert_eq!(resolve(&doc, "status.inner").unwrap(), None);
    }

    #[test]
    fn test_array_indexes() {
        let doc = json!({"items": [{"id": 1}, {"id": 2}]});
        assert_eq!(resolve(&doc, "items.1.id").unwrap(), Some(&json!(2)));
        assert_eq!(resolve(&doc, "items[0].id").unwrap(), Some(&json!(1)));
        assert_eq!(resolve(&doc, "items[5]").unwrap(), None);
        assert_eq!(resolve(&json!([[1, 2]]), "[0][1]").unwrap(), Some(&json!(2)));
    }

    #[test]
    fn test_malformed_paths() {
        let doc = json!({});
        for bad in ["a..b", "", "a[", "a[x]", "a[0]b"] {
            assert!(
                matches!(resolve(&doc, bad), Err(JsonPathError::Malformed(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_extract_renders_text() {
        let body = r#"{"name": "ada", "count": 3, "tags": ["a"]}"#;
        assert_eq!(extract(body, "name").unwrap().as_deref(), Some("ada"));
        assert_eq!(extract(body, "count").unwrap().as_deref(), Some("3"));
        assert_eq!(extract(body, "tags").unwrap().as_deref(), Some("[\"a\"]"));
        assert!(matches!(
            extract("<html>", "name"),
            Err(JsonPathError::InvalidJson(_))
        ));
    }
}
