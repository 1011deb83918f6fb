//! Form key syntax: `a.b`, `tags[]`, `items[3].name`.

use std::fmt;

use crate::error::FormError;

/// One dot-separated piece of a form key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// `name`: object property.
    Property(String),
    /// `name[idx]`: assigns position `idx` of an array.
    Indexed(String, usize),
    /// `name[]`: the whole array at once. Only valid as the last segment.
    Unindexed(String),
}

impl Segment {
    pub fn name(&self) -> &str {
        match self {
            Segment::Property(name) | Segment::Indexed(name, _) | Segment::Unindexed(name) => name,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Property(name) => write!(f, "{}", name),
            Segment::Indexed(name, index) => write!(f, "{}[{}]", name, index),
            Segment::Unindexed(name) => write!(f, "{}[]", name),
        }
    }
}

/// A parsed form key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormKey {
    segments: Vec<Segment>,
}

impl FormKey {
    /// Parse a flat form key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use isoresource_form::{FormKey, Segment};
    ///
    /// let key = FormKey::parse("items[2].tags[]").unwrap();
    /// assert_eq!(key.segments(), &[
    ///     Segment::Indexed("items".to_string(), 2),
    ///     Segment::Unindexed("tags".to_string()),
    /// ]);
    ///
    /// // arrays of arrays are rejected rather than misparsed
    /// assert!(FormKey::parse("tags[].name").is_err());
    /// ```
    pub fn parse(key: &str) -> Result<Self, FormError> {
        if key.is_empty() {
            return Err(FormError::MalformedKey {
                key: key.to_string(),
                message: "empty key".to_string(),
            });
        }

        let parts: Vec<&str> = key.split('.').collect();
        let mut segments = Vec::with_capacity(parts.len());
        for (position, part) in parts.iter().enumerate() {
            let segment = Self::parse_segment(key, part)?;
            if matches!(segment, Segment::Unindexed(_)) && position + 1 != parts.len() {
                return Err(FormError::NestedUnindexedArray {
                    key: key.to_string(),
                });
            }
            segments.push(segment);
        }
        Ok(Self { segments })
    }

    fn parse_segment(key: &str, part: &str) -> Result<Segment, FormError> {
        let malformed = |message: &str| FormError::MalformedKey {
            key: key.to_string(),
            message: message.to_string(),
        };

        let (name, marker) = match part.find('[') {
            Some(open) => {
                let close = part
                    .strip_suffix(']')
                    .ok_or_else(|| malformed("'[' without closing ']'"))?;
                (&part[..open], Some(&close[open + 1..]))
            }
            None => (part, None),
        };

        if name.is_empty() {
            return Err(malformed("empty segment name"));
        }
        if name.contains(']') {
            return Err(malformed("unexpected ']'"));
        }

        match marker {
            None => Ok(Segment::Property(name.to_string())),
            Some("") => Ok(Segment::Unindexed(name.to_string())),
            Some(index) => index
                .parse::<usize>()
                .map(|index| Segment::Indexed(name.to_string(), index))
                .map_err(|_| malformed("array index must be a non-negative integer")),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl fmt::Display for FormKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}
