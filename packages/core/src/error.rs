//! Validation errors produced by `Schema::parse`.
//!
//! A `ValidationError` carries one `Issue` per violated field. It serialises to
//! the `errors` list of the 422 envelope and deserialises back from it, so the
//! client can rebuild the exact error the server produced.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One step into a nested value: a map key or an array index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "{}", i),
            PathSegment::Key(k) => write!(f, "{}", k),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Location of an issue inside the validated value.
pub type IssuePath = Vec<PathSegment>;

/// Machine-readable issue category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    InvalidType,
    InvalidLiteral,
    InvalidEnumValue,
    NotInteger,
    TooSmall,
    TooBig,
    Custom,
}

/// A single violated constraint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub code: IssueCode,
    pub path: IssuePath,
    pub message: String,
}

impl Issue {
    pub fn new(code: IssueCode, path: IssuePath, message: impl Into<String>) -> Self {
        Self {
            code,
            path,
            message: message.into(),
        }
    }

    /// Dotted rendering of the issue path (`items.0.name`).
    pub fn dotted_path(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Input rejected by a schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub issues: Vec<Issue>,
}

impl ValidationError {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    /// A single custom issue at the given path.
    pub fn custom(path: IssuePath, message: impl Into<String>) -> Self {
        Self {
            issues: vec![Issue::new(IssueCode::Custom, path, message)],
        }
    }

    /// Issues reported for a dotted field path.
    pub fn issues_at(&self, dotted: &str) -> Vec<&Issue> {
        self.issues
            .iter()
            .filter(|issue| issue.dotted_path() == dotted)
            .collect()
    }

    /// Summary used as the envelope `message`.
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .issues
            .iter()
            .map(|issue| {
                let path = issue.dotted_path();
                if path.is_empty() {
                    issue.message.clone()
                } else {
                    format!("{}: {}", path, issue.message)
                }
            })
            .collect();
        if parts.is_empty() {
            "invalid input".to_string()
        } else {
            parts.join("; ")
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: {}", self.summary())
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_fields() {
        let error = ValidationError::new(vec![
            Issue::new(IssueCode::InvalidType, vec!["name".into()], "Required"),
            Issue::new(
                IssueCode::TooSmall,
                vec!["items".into(), 0.into(), "qty".into()],
                "Number must be greater than or equal to 1",
            ),
        ]);
        assert_eq!(
            error.summary(),
            "name: Required; items.0.qty: Number must be greater than or equal to 1"
        );
        assert_eq!(error.issues_at("items.0.qty").len(), 1);
    }

    #[test]
    fn issue_wire_format() {
        let issue = Issue::new(
            IssueCode::InvalidType,
            vec!["tags".into(), 2.into()],
            "Expected string, received number",
        );
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "code": "invalid_type",
                "path": ["tags", 2],
                "message": "Expected string, received number"
            })
        );
        let back: Issue = serde_json::from_value(json).unwrap();
        assert_eq!(back, issue);
    }

    #[test]
    fn display_mentions_validation() {
        let error = ValidationError::custom(vec![], "bad");
        assert_eq!(error.to_string(), "validation failed: bad");
    }
}
