//! Variable values and their types.

use std::fmt;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::config::IMAGE_EXTENSIONS;

/// A variable's value.
///
/// Untagged so exported files read naturally (`"42"` vs `42` vs `true`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableValue::Bool(b) => write!(f, "{b}"),
            VariableValue::Integer(i) => write!(f, "{i}"),
            VariableValue::Float(x) => write!(f, "{x}"),
            VariableValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for VariableValue {
    fn from(s: &str) -> Self {
        VariableValue::Text(s.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(s: String) -> Self {
        VariableValue::Text(s)
    }
}

impl From<bool> for VariableValue {
    fn from(b: bool) -> Self {
        VariableValue::Bool(b)
    }
}

impl From<i64> for VariableValue {
    fn from(i: i64) -> Self {
        VariableValue::Integer(i)
    }
}

impl From<i32> for VariableValue {
    fn from(i: i32) -> Self {
        VariableValue::Integer(i64::from(i))
    }
}

impl From<u16> for VariableValue {
    fn from(i: u16) -> Self {
        VariableValue::Integer(i64::from(i))
    }
}

impl From<u64> for VariableValue {
    fn from(i: u64) -> Self {
        VariableValue::Integer(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<usize> for VariableValue {
    fn from(i: usize) -> Self {
        VariableValue::Integer(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<f64> for VariableValue {
    fn from(x: f64) -> Self {
        VariableValue::Float(x)
    }
}

/// Semantic type of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    Text,
    Number,
    Boolean,
    Image,
    File,
}

impl VariableType {
    /// Infers the type of `value` ("auto" typing).
    ///
    /// In priority order: text ending in an image extension is `Image`, text
    /// naming an existing path is `File`, numbers are `Number`, booleans are
    /// `Boolean`, anything else is `Text`.
    pub fn infer(value: &VariableValue) -> Self {
        match value {
            VariableValue::Text(s) => {
                let lower = s.to_ascii_lowercase();
                if IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
                    VariableType::Image
                } else if !s.is_empty() && Path::new(s).exists() {
                    VariableType::File
                } else {
                    VariableType::Text
                }
            }
            VariableValue::Integer(_) | VariableValue::Float(_) => VariableType::Number,
            VariableValue::Bool(_) => VariableType::Boolean,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VariableType::Text => "text",
            VariableType::Number => "number",
            VariableType::Boolean => "boolean",
            VariableType::Image => "image",
            VariableType::File => "file",
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed value with metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: VariableValue,
    #[serde(rename = "type")]
    pub var_type: VariableType,
    #[serde(default)]
    pub description: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_image_by_extension() {
        assert_eq!(
            VariableType::infer(&"shots/home.PNG".into()),
            VariableType::Image
        );
        assert_eq!(
            VariableType::infer(&"/nope/a.jpeg".into()),
            VariableType::Image
        );
    }

    #[test]
    fn test_infer_existing_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().to_string();
        assert_eq!(VariableType::infer(&path.into()), VariableType::File);
        assert_eq!(
            VariableType::infer(&"/definitely/not/here.txt".into()),
            VariableType::Text
        );
    }

    #[test]
    fn test_infer_scalars() {
        assert_eq!(VariableType::infer(&42i64.into()), VariableType::Number);
        assert_eq!(VariableType::infer(&0.25f64.into()), VariableType::Number);
        assert_eq!(VariableType::infer(&true.into()), VariableType::Boolean);
        assert_eq!(VariableType::infer(&"hello".into()), VariableType::Text);
        assert_eq!(VariableType::infer(&"".into()), VariableType::Text);
    }

    #[test]
    fn test_display() {
        assert_eq!(VariableValue::from(42i64).to_string(), "42");
        assert_eq!(VariableValue::from(1.5f64).to_string(), "1.5");
        assert_eq!(VariableValue::from(false).to_string(), "false");
        assert_eq!(VariableValue::from("x").to_string(), "x");
    }

    #[test]
    fn test_untagged_deserialization_order() {
        let v: VariableValue = serde_json::from_str("7").unwrap();
        assert_eq!(v, VariableValue::Integer(7));
        let v: VariableValue = serde_json::from_str("7.5").unwrap();
        assert_eq!(v, VariableValue::Float(7.5));
        let v: VariableValue = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(v, VariableValue::Text("7".into()));
    }
}
