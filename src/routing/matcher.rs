//! Path pattern compilation and matching.
//!
//! # Responsibilities
//! - Compile `/segment/:param/segment` patterns into segment matchers
//! - Match a request path and capture named parameters
//! - Rank patterns by specificity for deterministic lookup
//!
//! # Design Decisions
//! - Segment count must match exactly (no wildcards, no prefixes)
//! - Literal segments are case-sensitive
//! - Captured values are percent-decoded; invalid UTF-8 is no match
//! - Trailing and repeated slashes are normalized away before splitting
//! - No regex to guarantee O(n) matching

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use percent_encoding::percent_decode_str;
use thiserror::Error;

/// Parameters captured from a matched path, keyed by parameter name.
pub type PathParams = HashMap<String, String>;

/// Errors raised while compiling a path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern `{0}` has an unnamed parameter")]
    EmptyParamName(String),

    #[error("pattern `{pattern}` has an invalid parameter name `{name}`")]
    InvalidParamName { pattern: String, name: String },

    #[error("pattern `{pattern}` declares parameter `{name}` more than once")]
    DuplicateParam { pattern: String, name: String },
}

/// A single compiled segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a pattern string.
    ///
    /// The leading slash is optional, so `scheduling/:id` and `/scheduling/:id`
    /// compile to the same pattern.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let mut segments = Vec::new();

        for part in split_path(pattern) {
            match part.strip_prefix(':') {
                Some("") => return Err(PatternError::EmptyParamName(pattern.to_string())),
                Some(name) => {
                    if !is_identifier(name) {
                        return Err(PatternError::InvalidParamName {
                            pattern: pattern.to_string(),
                            name: name.to_string(),
                        });
                    }
                    if segments
                        .iter()
                        .any(|s| matches!(s, Segment::Param(existing) if existing == name))
                    {
                        return Err(PatternError::DuplicateParam {
                            pattern: pattern.to_string(),
                            name: name.to_string(),
                        });
                    }
                    segments.push(Segment::Param(name.to_string()));
                }
                None => segments.push(Segment::Literal(part.to_string())),
            }
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// Prepend literal segments (e.g. `/api`) to this pattern.
    pub fn prefixed(mut self, prefix: &str) -> Self {
        let mut segments: Vec<Segment> = split_path(prefix)
            .map(|s| Segment::Literal(s.to_string()))
            .collect();
        if segments.is_empty() {
            return self;
        }
        segments.append(&mut self.segments);
        self.segments = segments;
        self.raw = self.to_string();
        self
    }

    /// The compiled segments in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of the parameters captured by this pattern, in path order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// The pattern with parameter names erased.
    ///
    /// Two patterns with the same shape match exactly the same paths with
    /// the same specificity.
    pub fn shape(&self) -> String {
        let mut shape = String::new();
        for segment in &self.segments {
            shape.push('/');
            match segment {
                Segment::Literal(lit) => shape.push_str(lit),
                Segment::Param(_) => shape.push(':'),
            }
        }
        if shape.is_empty() {
            shape.push('/');
        }
        shape
    }

    /// Match a request path, returning captured parameters on success.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let mut parts = split_path(path);
        let mut params = PathParams::new();

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = percent_decode_str(part).decode_utf8().ok()?;
                    params.insert(name.clone(), value.into_owned());
                }
            }
        }

        // Extra segments in the path mean the counts differ.
        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }

    /// Compare specificity: segment by segment, a literal beats a parameter.
    ///
    /// `Ordering::Greater` means `self` is more specific than `other`.
    pub fn specificity_cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.segments.iter().zip(&other.segments) {
            match (a, b) {
                (Segment::Literal(_), Segment::Param(_)) => return Ordering::Greater,
                (Segment::Param(_), Segment::Literal(_)) => return Ordering::Less,
                _ => {}
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => write!(f, "/{lit}")?,
                Segment::Param(name) => write!(f, "/:{name}")?,
            }
        }
        Ok(())
    }
}

/// Split a path into its non-empty segments.
///
/// Empty segments come from leading, trailing or repeated slashes and are
/// dropped, which normalizes `/posts/` to `/posts`.
fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        let pattern = PathPattern::parse("/api/posts").unwrap();
        assert_eq!(pattern.matches("/api/posts"), Some(PathParams::new()));
        assert_eq!(pattern.matches("/api/posts/"), Some(PathParams::new()));
        assert_eq!(pattern.matches("/api/Posts"), None);
        assert_eq!(pattern.matches("/api"), None);
        assert_eq!(pattern.matches("/api/posts/extra"), None);
    }

    #[test]
    fn test_param_capture() {
        let pattern = PathPattern::parse("/api/groups/:id/join").unwrap();
        let params = pattern.matches("/api/groups/abc123/join").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("abc123"));
        assert_eq!(pattern.matches("/api/groups//join"), None);
        assert_eq!(pattern.matches("/api/groups/abc123/leave"), None);
    }

    #[test]
    fn test_param_percent_decoded() {
        let pattern = PathPattern::parse("/api/users/:username").unwrap();
        let params = pattern.matches("/api/users/j%C3%BCrgen%20x").unwrap();
        assert_eq!(params["username"], "jürgen x");

        // Invalid UTF-8 after decoding never matches.
        assert_eq!(pattern.matches("/api/users/%FF"), None);
    }

    #[test]
    fn test_leading_slash_optional() {
        let a = PathPattern::parse("scheduling/:id").unwrap();
        let b = PathPattern::parse("/scheduling/:id").unwrap();
        assert_eq!(a.segments(), b.segments());
        assert_eq!(a.to_string(), "/scheduling/:id");
    }

    #[test]
    fn test_prefix_and_shape() {
        let pattern = PathPattern::parse("/posts/:id").unwrap().prefixed("/api");
        assert_eq!(pattern.to_string(), "/api/posts/:id");
        assert_eq!(pattern.shape(), "/api/posts/:");
        assert_eq!(
            pattern.shape(),
            PathPattern::parse("/api/posts/:postId").unwrap().shape()
        );
        assert_eq!(PathPattern::parse("/").unwrap().shape(), "/");
    }

    #[test]
    fn test_specificity() {
        let literal = PathPattern::parse("/users/username").unwrap();
        let param = PathPattern::parse("/users/:username").unwrap();
        assert_eq!(literal.specificity_cmp(&param), Ordering::Greater);
        assert_eq!(param.specificity_cmp(&literal), Ordering::Less);

        let left = PathPattern::parse("/a/:x").unwrap();
        let right = PathPattern::parse("/:y/b").unwrap();
        assert_eq!(left.specificity_cmp(&right), Ordering::Greater);
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(matches!(
            PathPattern::parse("/posts/:"),
            Err(PatternError::EmptyParamName(_))
        ));
        assert!(matches!(
            PathPattern::parse("/posts/:bad-name"),
            Err(PatternError::InvalidParamName { .. })
        ));
        assert!(matches!(
            PathPattern::parse("/a/:id/b/:id"),
            Err(PatternError::DuplicateParam { .. })
        ));
    }
}
