//! Media types and content negotiation.
//!
//! Negotiation is structural: wildcard types and subtypes match, quality
//! factors are parsed away and ignored, and the first acceptable type in
//! header order that the operation produces wins.

use std::fmt;
use std::str::FromStr;

use mime::Mime;

/// A parsed media type such as `application/json` or `text/*`.
///
/// # Example
///
/// ```
/// use pylon_core::MediaType;
///
/// let any_text = MediaType::parse("text/*").unwrap();
/// let plain = MediaType::parse("text/plain; charset=utf-8").unwrap();
/// assert!(any_text.is_compatible(&plain));
/// assert_eq!(plain.essence(), "text/plain");
/// assert_eq!(plain.charset(), Some("utf-8"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType(Mime);

impl MediaType {
    /// Parses a media type, returning `None` when it is malformed.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Mime::from_str(value.trim()).ok().map(Self)
    }

    /// `application/json`.
    #[must_use]
    pub fn json() -> Self {
        Self(mime::APPLICATION_JSON)
    }

    /// `text/plain`.
    #[must_use]
    pub fn text_plain() -> Self {
        Self(mime::TEXT_PLAIN)
    }

    /// `application/octet-stream`.
    #[must_use]
    pub fn octet_stream() -> Self {
        Self(mime::APPLICATION_OCTET_STREAM)
    }

    /// `application/x-www-form-urlencoded`.
    #[must_use]
    pub fn form_urlencoded() -> Self {
        Self(mime::APPLICATION_WWW_FORM_URLENCODED)
    }

    /// `*/*`.
    #[must_use]
    pub fn wildcard() -> Self {
        Self(mime::STAR_STAR)
    }

    /// The top-level type, e.g. `text`.
    #[must_use]
    pub fn type_(&self) -> &str {
        self.0.type_().as_str()
    }

    /// The subtype, e.g. `plain`.
    #[must_use]
    pub fn subtype(&self) -> &str {
        self.0.subtype().as_str()
    }

    /// The structured-syntax suffix, e.g. `json` for `application/problem+json`.
    #[must_use]
    pub fn suffix(&self) -> Option<&str> {
        self.0.suffix().map(|s| s.as_str())
    }

    /// `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> &str {
        self.0.essence_str()
    }

    /// The same type without parameters such as `q` or `charset`.
    #[must_use]
    pub fn without_params(&self) -> Self {
        if self.0.params().next().is_none() {
            return self.clone();
        }
        Mime::from_str(self.essence()).map_or_else(|_| self.clone(), Self)
    }

    /// The `charset` parameter.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.0.get_param(mime::CHARSET).map(|c| c.as_str())
    }

    /// Returns `true` if the type or subtype is `*`.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.type_() == "*" || self.subtype() == "*"
    }

    /// Structural match honoring `*` on either side.
    #[must_use]
    pub fn is_compatible(&self, other: &MediaType) -> bool {
        let type_ok = self.type_() == "*" || other.type_() == "*" || self.type_() == other.type_();
        let subtype_ok = self.subtype() == "*"
            || other.subtype() == "*"
            || self.subtype() == other.subtype();
        type_ok && subtype_ok
    }

    /// Returns `true` for `application/json` and `+json` suffixed types.
    #[must_use]
    pub fn is_json(&self) -> bool {
        (self.type_() == "application" && self.subtype() == "json") || self.suffix() == Some("json")
    }

    /// Returns `true` for `text/*`.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.type_() == "text"
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MediaType {
    type Err = mime::FromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mime::from_str(s.trim()).map(Self)
    }
}

/// Parses an `Accept` header.
///
/// Entries are kept in header order. Malformed entries are skipped and
/// q-values are ignored. A missing or empty header accepts `*/*`.
///
/// ```
/// use pylon_core::media::parse_accept;
///
/// let accept = parse_accept(Some("text/html;q=0.9, bogus, application/json"));
/// let essences: Vec<_> = accept.iter().map(|m| m.essence()).collect();
/// assert_eq!(essences, vec!["text/html", "application/json"]);
/// ```
#[must_use]
pub fn parse_accept(header: Option<&str>) -> Vec<MediaType> {
    let accepted: Vec<MediaType> = header
        .unwrap_or_default()
        .split(',')
        .filter_map(MediaType::parse)
        .collect();

    if accepted.is_empty() {
        vec![MediaType::wildcard()]
    } else {
        accepted
    }
}

/// Checks a request `Content-Type` against an operation's consumed types.
///
/// An empty `consumes` list accepts anything, as does a request without a
/// content type.
#[must_use]
pub fn accepts_content_type(content_type: Option<&MediaType>, consumes: &[MediaType]) -> bool {
    match content_type {
        None => true,
        Some(_) if consumes.is_empty() => true,
        Some(ct) => consumes.iter().any(|c| c.is_compatible(ct)),
    }
}

/// Picks the response media type.
///
/// Walks `accept` in order and returns the first produced type compatible
/// with it. An empty `produces` list behaves like `[*/*]`. The result is
/// always concrete and never carries Accept parameters:
///
/// - a concrete produced type is used as declared
/// - a wildcard produced type takes the acceptable type's essence
/// - a wildcard on both sides resolves to `default` when it fits, otherwise
///   to the conventional type of the family (`text/*` is `text/plain`,
///   `application/*` is `application/octet-stream`)
///
/// Returns `None` when nothing is acceptable (406).
#[must_use]
pub fn negotiate(
    accept: &[MediaType],
    produces: &[MediaType],
    default: &MediaType,
) -> Option<MediaType> {
    let wildcard = [MediaType::wildcard()];
    let produces = if produces.is_empty() {
        &wildcard[..]
    } else {
        produces
    };

    for acceptable in accept {
        let chosen = produces
            .iter()
            .filter(|produced| acceptable.is_compatible(produced))
            .find_map(|produced| concrete(acceptable, produced, default));
        if chosen.is_some() {
            return chosen;
        }
    }
    None
}

fn concrete(acceptable: &MediaType, produced: &MediaType, default: &MediaType) -> Option<MediaType> {
    if !produced.is_wildcard() {
        return Some(produced.clone());
    }
    if !acceptable.is_wildcard() {
        return Some(acceptable.without_params());
    }
    if default.is_compatible(produced) && default.is_compatible(acceptable) {
        return Some(default.clone());
    }
    let family = if produced.type_() == "*" {
        acceptable.type_()
    } else {
        produced.type_()
    };
    match family {
        "text" => Some(MediaType::text_plain()),
        "application" => Some(MediaType::octet_stream()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mt(s: &str) -> MediaType {
        MediaType::parse(s).unwrap()
    }

    #[test]
    fn test_wildcard_matching() {
        assert!(mt("text/*").is_compatible(&mt("text/plain")));
        assert!(mt("text/plain").is_compatible(&mt("text/*")));
        assert!(mt("*/*").is_compatible(&mt("application/json")));
        assert!(!mt("text/*").is_compatible(&mt("application/json")));
        assert!(!mt("text/html").is_compatible(&mt("text/plain")));
    }

    #[test]
    fn test_json_detection() {
        assert!(mt("application/json").is_json());
        assert!(mt("application/problem+json").is_json());
        assert!(!mt("text/plain").is_json());
    }

    #[test]
    fn test_accept_defaults_to_wildcard() {
        assert_eq!(parse_accept(None), vec![MediaType::wildcard()]);
        assert_eq!(parse_accept(Some("")), vec![MediaType::wildcard()]);
        assert_eq!(parse_accept(Some("garbage")), vec![MediaType::wildcard()]);
    }

    #[test]
    fn test_negotiate_not_acceptable() {
        let accept = parse_accept(Some("text/html"));
        let produces = [MediaType::json()];
        assert_eq!(negotiate(&accept, &produces, &MediaType::json()), None);
    }

    #[test]
    fn test_negotiate_first_acceptable_wins() {
        let accept = parse_accept(Some("text/plain, application/json"));
        let produces = [MediaType::json(), MediaType::text_plain()];
        assert_eq!(
            negotiate(&accept, &produces, &MediaType::json()),
            Some(MediaType::text_plain())
        );
    }

    #[test]
    fn test_negotiate_resolves_wildcards() {
        let json = MediaType::json();
        assert_eq!(negotiate(&parse_accept(None), &[], &json), Some(json.clone()));
        assert_eq!(
            negotiate(&parse_accept(Some("text/*")), &[mt("text/plain")], &json),
            Some(mt("text/plain"))
        );
        assert_eq!(
            negotiate(&parse_accept(Some("text/csv")), &[], &json),
            Some(mt("text/csv"))
        );
    }

    #[test]
    fn test_negotiate_wildcard_produces() {
        let json = MediaType::json();
        let any_text = [mt("text/*")];
        assert_eq!(negotiate(&parse_accept(None), &any_text, &json), Some(mt("text/plain")));
        assert_eq!(
            negotiate(&parse_accept(Some("*/*")), &any_text, &json),
            Some(mt("text/plain"))
        );
        assert_eq!(
            negotiate(&parse_accept(Some("text/csv")), &any_text, &json),
            Some(mt("text/csv"))
        );
        assert_eq!(negotiate(&parse_accept(Some("application/json")), &any_text, &json), None);
        assert_eq!(
            negotiate(&parse_accept(None), &[mt("application/*")], &mt("text/plain")),
            Some(MediaType::octet_stream())
        );
        assert_eq!(negotiate(&parse_accept(None), &[mt("image/*")], &json), None);
        assert_eq!(
            negotiate(&parse_accept(None), &[mt("image/*"), mt("image/png")], &json),
            Some(mt("image/png"))
        );
    }

    #[test]
    fn test_negotiate_drops_accept_params() {
        let json = MediaType::json();
        let chosen = negotiate(&parse_accept(Some("text/plain;q=0.5")), &[], &json).unwrap();
        assert_eq!(chosen.to_string(), "text/plain");

        let declared = [mt("text/plain; charset=utf-8")];
        let chosen = negotiate(&parse_accept(Some("text/*;q=0.1")), &declared, &json).unwrap();
        assert_eq!(chosen.charset(), Some("utf-8"));
    }

    #[test]
    fn test_without_params() {
        assert_eq!(mt("text/html; q=0.3; level=1").without_params(), mt("text/html"));
        assert_eq!(MediaType::json().without_params(), MediaType::json());
    }

    #[test]
    fn test_consumes() {
        let consumes = [MediaType::json()];
        assert!(accepts_content_type(None, &consumes));
        assert!(accepts_content_type(Some(&mt("application/json; charset=utf-8")), &consumes));
        assert!(!accepts_content_type(Some(&mt("text/plain")), &consumes));
        assert!(accepts_content_type(Some(&mt("text/plain")), &[]));
    }
}
