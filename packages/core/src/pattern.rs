//! Route path patterns with `$name` placeholders.
//!
//! Resource actions declare paths like `/tasks/$id/edit`. The server matches
//! incoming paths against them and converts them to whatever placeholder
//! syntax the host HTTP framework expects; the client fills them from the
//! call's input to build request URLs.

use std::collections::BTreeMap;
use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::value::Value;

/// Characters escaped when a value is substituted into a path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Errors related to path pattern parsing and filling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("invalid placeholder '{segment}' at position {position}: {message}")]
    InvalidPlaceholder {
        segment: String,
        position: usize,
        message: String,
    },

    #[error("missing value for path parameter '{name}'")]
    MissingParam { name: String },

    #[error("path parameter '{name}' must be a scalar, got {found}")]
    NonScalarParam { name: String, found: &'static str },
}

/// One `/`-separated piece of a pattern.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum PatternSegment {
    Literal(String),
    Param(String),
}

/// Placeholder syntax of the host framework.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamStyle {
    /// `/tasks/:id`
    Colon,
    /// `/tasks/{id}`
    Braces,
}

/// A parsed route pattern.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<PatternSegment>,
}

impl PathPattern {
    /// Parse a pattern string.
    ///
    /// - Segments are separated by `/`
    /// - Empty segments are ignored (normalizes `//` and trailing `/`)
    /// - `$name` declares a parameter; `name` must be `[A-Za-z_][A-Za-z0-9_]*`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use isoresource_core::PathPattern;
    ///
    /// let pattern = PathPattern::parse("/tasks/$id").unwrap();
    /// assert_eq!(pattern.params(), vec!["id"]);
    /// assert_eq!(PathPattern::parse("tasks/").unwrap().to_string(), "/tasks");
    /// ```
    pub fn parse(s: &str) -> Result<Self, PatternError> {
        let mut segments = Vec::new();
        for (position, raw) in s.split('/').filter(|c| !c.is_empty()).enumerate() {
            match raw.strip_prefix('$') {
                Some(name) => {
                    Self::validate_param(raw, name, position)?;
                    segments.push(PatternSegment::Param(name.to_string()));
                }
                None => segments.push(PatternSegment::Literal(raw.to_string())),
            }
        }
        Ok(Self { segments })
    }

    fn validate_param(segment: &str, name: &str, position: usize) -> Result<(), PatternError> {
        let mut chars = name.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !valid_start {
            return Err(PatternError::InvalidPlaceholder {
                segment: segment.to_string(),
                position,
                message: "name must start with a letter or underscore".to_string(),
            });
        }
        if let Some(c) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
            return Err(PatternError::InvalidPlaceholder {
                segment: segment.to_string(),
                position,
                message: format!("invalid character '{}' in name", c),
            });
        }
        Ok(())
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    /// Names of the declared parameters, in order.
    pub fn params(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                PatternSegment::Param(name) => Some(name.as_str()),
                PatternSegment::Literal(_) => None,
            })
            .collect()
    }

    /// Append another pattern to this one.
    #[must_use]
    pub fn join(&self, other: &PathPattern) -> PathPattern {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        PathPattern { segments }
    }

    /// Match a concrete request path, returning decoded parameter values.
    pub fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let parts: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = BTreeMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                PatternSegment::Literal(literal) => {
                    if literal != part {
                        return None;
                    }
                }
                PatternSegment::Param(name) => {
                    let decoded = percent_decode_str(part).decode_utf8().ok()?;
                    params.insert(name.clone(), decoded.into_owned());
                }
            }
        }
        Some(params)
    }

    /// Substitute parameters with top-level scalar entries of `input`.
    ///
    /// Returns the concrete path and the input keys consumed as parameters,
    /// so callers can leave them out of the request body.
    pub fn fill(&self, input: &Value) -> Result<(String, Vec<String>), PatternError> {
        let mut path = String::new();
        let mut consumed = Vec::new();
        for segment in &self.segments {
            path.push('/');
            match segment {
                PatternSegment::Literal(literal) => path.push_str(literal),
                PatternSegment::Param(name) => {
                    let value = input
                        .get(name)
                        .filter(|v| !v.is_nullish())
                        .ok_or_else(|| PatternError::MissingParam { name: name.clone() })?;
                    let text = value
                        .to_scalar_string()
                        .ok_or_else(|| PatternError::NonScalarParam {
                            name: name.clone(),
                            found: value.type_name(),
                        })?;
                    path.extend(utf8_percent_encode(&text, SEGMENT));
                    consumed.push(name.clone());
                }
            }
        }
        if path.is_empty() {
            path.push('/');
        }
        Ok((path, consumed))
    }

    /// Render in the host framework's placeholder syntax.
    pub fn to_framework(&self, style: ParamStyle) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        self.segments
            .iter()
            .map(|segment| match (segment, style) {
                (PatternSegment::Literal(literal), _) => format!("/{}", literal),
                (PatternSegment::Param(name), ParamStyle::Colon) => format!("/:{}", name),
                (PatternSegment::Param(name), ParamStyle::Braces) => format!("/{{{}}}", name),
            })
            .collect()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            match segment {
                PatternSegment::Literal(literal) => write!(f, "/{}", literal)?,
                PatternSegment::Param(name) => write!(f, "/${}", name)?,
            }
        }
        Ok(())
    }
}
