//! Path templates.
//!
//! A template is a `/`-separated list of segments:
//!
//! | Syntax | Meaning |
//! |--------|---------|
//! | `users` | literal segment, compared after percent-decoding |
//! | `{id}` | captures exactly one segment |
//! | `{id: [0-9]+}` | captures one segment that matches the regex |
//! | `*rest` | captures the remaining segments, must be last |
//!
//! Templates order themselves by specificity so that `/users/me` is tried
//! before `/users/{id}`, which is tried before `/users/*rest`.

use std::cmp::Ordering;
use std::fmt;

use regex::Regex;

use crate::error::RouteError;
use crate::params::Params;

/// One segment of a [`PathTemplate`].
#[derive(Debug, Clone)]
pub enum Segment {
    /// Literal text that must match exactly.
    Literal(String),
    /// A named capture of a single segment, optionally constrained.
    Param {
        /// Capture name.
        name: String,
        /// Anchored constraint compiled from `{name: regex}`.
        pattern: Option<Regex>,
    },
    /// A trailing capture of zero or more segments.
    Wildcard(String),
}

impl Segment {
    /// Rank used for position-wise specificity. Lower is more specific.
    const fn rank(&self) -> u8 {
        match self {
            Self::Literal(_) => 0,
            Self::Param {
                pattern: Some(_), ..
            } => 1,
            Self::Param { pattern: None, .. } => 2,
            Self::Wildcard(_) => 3,
        }
    }
}

/// A parsed path template.
///
/// # Example
///
/// ```rust
/// use pylon_router::PathTemplate;
///
/// let template = PathTemplate::parse("/widgets/{id: [0-9]+}").unwrap();
/// let params = template.matches(&["widgets", "42"]).unwrap();
/// assert_eq!(params.get("id"), Some("42"));
/// assert!(template.matches(&["widgets", "abc"]).is_none());
/// ```
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parses a template string.
    ///
    /// Leading, trailing and repeated slashes are ignored, so `/a/b/`,
    /// `a/b` and `/a//b` describe the same template.
    pub fn parse(template: &str) -> Result<Self, RouteError> {
        let mut segments = Vec::new();
        let parts: Vec<&str> = template.split('/').filter(|s| !s.is_empty()).collect();

        for (index, part) in parts.iter().enumerate() {
            let segment = if let Some(inner) =
                part.strip_prefix('{').and_then(|p| p.strip_suffix('}'))
            {
                parse_param(template, inner)?
            } else if let Some(name) = part.strip_prefix('*') {
                if index + 1 != parts.len() {
                    return Err(RouteError::invalid(
                        template,
                        "wildcard segment must be the last segment",
                    ));
                }
                if name.is_empty() {
                    return Err(RouteError::invalid(template, "wildcard segment needs a name"));
                }
                Segment::Wildcard(name.to_string())
            } else if part.contains('{') || part.contains('}') {
                return Err(RouteError::invalid(
                    template,
                    "parameters must span a whole segment",
                ));
            } else {
                Segment::Literal((*part).to_string())
            };
            segments.push(segment);
        }

        let raw = format!("/{}", parts.join("/"));
        Ok(Self { raw, segments })
    }

    /// Joins a base path and a sub-path with exactly one separator.
    #[must_use]
    pub fn join(base: &str, path: &str) -> String {
        let base = base.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        match (base.is_empty(), path.is_empty()) {
            (true, true) => "/".to_string(),
            (true, false) => format!("/{path}"),
            (false, true) => base.to_string(),
            (false, false) => format!("{base}/{path}"),
        }
    }

    /// The normalized template text, always starting with `/`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of every capture in declaration order.
    #[must_use]
    pub fn param_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param { name, .. } | Segment::Wildcard(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Total number of characters in literal segments.
    #[must_use]
    pub fn literal_chars(&self) -> usize {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(text) => text.chars().count(),
                _ => 0,
            })
            .sum()
    }

    /// Matches already-split, percent-decoded path segments.
    ///
    /// Returns the captured parameters on success.
    #[must_use]
    pub fn matches<S: AsRef<str>>(&self, path: &[S]) -> Option<Params> {
        let mut params = Params::new();
        let mut index = 0;

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => {
                    if path.get(index)?.as_ref() != text {
                        return None;
                    }
                    index += 1;
                }
                Segment::Param { name, pattern } => {
                    let value = path.get(index)?.as_ref();
                    if let Some(re) = pattern {
                        if !re.is_match(value) {
                            return None;
                        }
                    }
                    params.push(name.as_str(), value);
                    index += 1;
                }
                Segment::Wildcard(name) => {
                    let rest: Vec<&str> = path[index.min(path.len())..]
                        .iter()
                        .map(AsRef::as_ref)
                        .collect();
                    params.push(name.as_str(), rest.join("/"));
                    return Some(params);
                }
            }
        }

        (index == path.len()).then_some(params)
    }

    /// Compares specificity. `Ordering::Less` means `self` is more specific.
    ///
    /// Segment ranks (literal, constrained parameter, parameter, wildcard)
    /// are compared position by position, a shorter template winning over
    /// one it prefixes. Ties fall back to the number of literal characters
    /// (more wins), then to the template text, which makes this a total order.
    #[must_use]
    pub fn specificity_cmp(&self, other: &Self) -> Ordering {
        self.ranks()
            .cmp(other.ranks())
            .then_with(|| other.literal_chars().cmp(&self.literal_chars()))
            .then_with(|| self.raw.cmp(&other.raw))
    }

    fn ranks(&self) -> impl Iterator<Item = u8> + '_ {
        self.segments.iter().map(Segment::rank)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_param(template: &str, inner: &str) -> Result<Segment, RouteError> {
    let (name, pattern) = match inner.split_once(':') {
        Some((name, pattern)) => (name.trim(), Some(pattern.trim())),
        None => (inner.trim(), None),
    };

    if name.is_empty() {
        return Err(RouteError::invalid(template, "parameter needs a name"));
    }

    let pattern = match pattern {
        Some(p) if !p.is_empty() => Some(Regex::new(&format!("^(?:{p})$")).map_err(|source| {
            RouteError::Pattern {
                template: template.to_string(),
                source,
            }
        })?),
        _ => None,
    };

    Ok(Segment::Param {
        name: name.to_string(),
        pattern,
    })
}

/// A request path split into decoded segments plus the matrix parameters
/// of its last segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitPath {
    /// Percent-decoded segments with matrix parameters removed.
    pub segments: Vec<String>,
    /// Matrix parameters of the final segment.
    pub matrix: Params,
}

/// Splits a raw request path into matchable segments.
///
/// Every segment loses its `;k=v` suffix. Only the final segment's
/// matrix parameters are kept. A parameter without `=` gets an empty value.
///
/// ```rust
/// use pylon_router::split_path;
///
/// let split = split_path("/cars;year=2020/red%20ones;color=red;color=blue");
/// assert_eq!(split.segments, vec!["cars", "red ones"]);
/// assert_eq!(split.matrix.get_all("color"), vec!["red", "blue"]);
/// assert!(split.matrix.get("year").is_none());
/// ```
#[must_use]
pub fn split_path(path: &str) -> SplitPath {
    let raw: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut split = SplitPath::default();

    for (index, part) in raw.iter().enumerate() {
        let mut pieces = part.split(';');
        let head = pieces.next().unwrap_or_default();
        split.segments.push(decode(head));

        if index + 1 == raw.len() {
            for piece in pieces.filter(|p| !p.is_empty()) {
                let (name, value) = piece.split_once('=').unwrap_or((piece, ""));
                split.matrix.push(decode(name), decode(value));
            }
        }
    }

    split
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |s| s.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(raw: &str) -> PathTemplate {
        PathTemplate::parse(raw).unwrap()
    }

    #[test]
    fn test_parse_normalizes_slashes() {
        assert_eq!(t("users/{id}/").as_str(), "/users/{id}");
        assert_eq!(t("/").as_str(), "/");
        assert_eq!(t("//a//b").as_str(), "/a/b");
    }

    #[test]
    fn test_parse_rejects_bad_templates() {
        assert!(PathTemplate::parse("/files/*rest/more").is_err());
        assert!(PathTemplate::parse("/users/{}").is_err());
        assert!(PathTemplate::parse("/users/id{x}").is_err());
        assert!(matches!(
            PathTemplate::parse("/users/{id: [0-9+}"),
            Err(RouteError::Pattern { .. })
        ));
    }

    #[test]
    fn test_literal_and_param_match() {
        let template = t("/widgets/{id}");
        let params = template.matches(&["widgets", "42"]).unwrap();
        assert_eq!(params.get("id"), Some("42"));
        assert!(template.matches(&["widgets"]).is_none());
        assert!(template.matches(&["widgets", "42", "x"]).is_none());
        assert!(template.matches(&["gadgets", "42"]).is_none());
    }

    #[test]
    fn test_wildcard_captures_rest() {
        let template = t("/files/*path");
        let params = template.matches(&["files", "a", "b.txt"]).unwrap();
        assert_eq!(params.get("path"), Some("a/b.txt"));
        let params = template.matches(&["files"]).unwrap();
        assert_eq!(params.get("path"), Some(""));
    }

    #[test]
    fn test_root_template() {
        let empty: [&str; 0] = [];
        assert!(t("/").matches(&empty).is_some());
        assert!(t("/").matches(&["x"]).is_none());
    }

    #[test]
    fn test_specificity_literal_beats_param() {
        assert_eq!(t("/users/me").specificity_cmp(&t("/users/{id}")), Ordering::Less);
        assert_eq!(
            t("/users/{id: \\d+}").specificity_cmp(&t("/users/{id}")),
            Ordering::Less
        );
        assert_eq!(t("/users/{id}").specificity_cmp(&t("/users/*rest")), Ordering::Less);
    }

    #[test]
    fn test_specificity_longer_literal_wins() {
        assert_eq!(
            t("/{a}/reports").specificity_cmp(&t("/{a}/r")),
            Ordering::Less
        );
    }

    #[test]
    fn test_specificity_is_total_and_deterministic() {
        let a = t("/{x}/b");
        let b = t("/{y}/b");
        assert_eq!(a.specificity_cmp(&b), Ordering::Less);
        assert_eq!(b.specificity_cmp(&a), Ordering::Greater);
        assert_eq!(a.specificity_cmp(&a), Ordering::Equal);
    }

    #[test]
    fn test_join() {
        assert_eq!(PathTemplate::join("/widgets/", "/{id}"), "/widgets/{id}");
        assert_eq!(PathTemplate::join("/widgets", ""), "/widgets");
        assert_eq!(PathTemplate::join("", ""), "/");
        assert_eq!(PathTemplate::join("", "x"), "/x");
    }

    #[test]
    fn test_split_path_decodes_and_strips_matrix() {
        let split = split_path("/a%2Fb;x=1/c;y=2;flag");
        assert_eq!(split.segments, vec!["a/b", "c"]);
        assert_eq!(split.matrix.get("y"), Some("2"));
        assert_eq!(split.matrix.get("flag"), Some(""));
        assert!(!split.matrix.contains("x"));
    }

    #[test]
    fn test_param_names() {
        assert_eq!(t("/a/{b}/c/*d").param_names(), vec!["b", "d"]);
    }
}
