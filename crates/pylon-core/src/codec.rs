//! Entity codecs.
//!
//! A [`Codec`] turns bytes into a dynamic [`serde_json::Value`] and back for
//! a given media type. Typed conversion happens on the value, so the same
//! codec serves every operation.

use bytes::Bytes;
use serde_json::Value;

use crate::error::{PylonError, PylonResult};
use crate::media::MediaType;

/// Marshals entities for the wire.
pub trait Codec: Send + Sync + 'static {
    /// Returns `true` if this codec can handle `media_type`.
    fn supports(&self, media_type: &MediaType) -> bool;

    /// Decodes a request entity.
    fn decode(&self, bytes: &[u8], media_type: &MediaType) -> PylonResult<Value>;

    /// Encodes a response entity.
    fn encode(&self, value: &Value, media_type: &MediaType) -> PylonResult<Bytes>;
}

/// The built-in codec.
///
/// | Media type | Decode | Encode |
/// |---|---|---|
/// | `application/json`, `*+json` | `serde_json` | `serde_json` |
/// | `text/*` | UTF-8 string | strings verbatim, other values as JSON text |
/// | `application/octet-stream` | array of byte values | string bytes or a byte array |
///
/// # Example
///
/// ```
/// use pylon_core::{Codec, DefaultCodec, MediaType};
/// use serde_json::json;
///
/// let codec = DefaultCodec;
/// let value = codec.decode(br#"{"id":1}"#, &MediaType::json()).unwrap();
/// assert_eq!(value, json!({"id": 1}));
///
/// let text = codec.encode(&json!("hello"), &MediaType::text_plain()).unwrap();
/// assert_eq!(&text[..], b"hello");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCodec;

impl DefaultCodec {
    fn kind(media_type: &MediaType) -> Option<BodyKind> {
        if media_type.is_json() {
            Some(BodyKind::Structured)
        } else if media_type.is_text() {
            Some(BodyKind::Text)
        } else if media_type.essence() == "application/octet-stream" {
            Some(BodyKind::Binary)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Structured,
    Text,
    Binary,
}

impl Codec for DefaultCodec {
    fn supports(&self, media_type: &MediaType) -> bool {
        Self::kind(media_type).is_some()
    }

    fn decode(&self, bytes: &[u8], media_type: &MediaType) -> PylonResult<Value> {
        match Self::kind(media_type) {
            Some(BodyKind::Structured) => {
                if bytes.is_empty() {
                    return Ok(Value::Null);
                }
                serde_json::from_slice(bytes).map_err(|e| {
                    PylonError::bad_request(format!("malformed JSON body: {e}")).with_source(e)
                })
            }
            Some(BodyKind::Text) => std::str::from_utf8(bytes)
                .map(|s| Value::String(s.to_string()))
                .map_err(|e| PylonError::bad_request("body is not valid UTF-8").with_source(e)),
            Some(BodyKind::Binary) => Ok(Value::Array(
                bytes.iter().map(|b| Value::from(*b)).collect(),
            )),
            None => Err(PylonError::not_supported(format!(
                "no codec reads {media_type}"
            ))),
        }
    }

    fn encode(&self, value: &Value, media_type: &MediaType) -> PylonResult<Bytes> {
        match (Self::kind(media_type), value) {
            (_, Value::Null) => Ok(Bytes::new()),
            (Some(BodyKind::Structured), v) => serde_json::to_vec(v)
                .map(Bytes::from)
                .map_err(|e| PylonError::internal_with_source("failed to encode entity", e)),
            (Some(BodyKind::Text | BodyKind::Binary), Value::String(s)) => {
                Ok(Bytes::from(s.clone()))
            }
            (Some(BodyKind::Text), v) => Ok(Bytes::from(v.to_string())),
            (Some(BodyKind::Binary), Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|n| u8::try_from(n).ok())
                        .ok_or_else(|| PylonError::internal("binary entity must hold bytes"))
                })
                .collect::<PylonResult<Vec<u8>>>()
                .map(Bytes::from),
            (Some(BodyKind::Binary), _) => {
                Err(PylonError::internal("binary entity must be a string or byte array"))
            }
            (None, _) => Err(PylonError::internal(format!("no codec writes {media_type}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use serde_json::json;

    #[test]
    fn test_json_roundtrip_shapes() {
        let codec = DefaultCodec;
        let json = MediaType::json();
        let bytes = codec.encode(&json!({"a": [1, 2]}), &json).unwrap();
        assert_eq!(&bytes[..], br#"{"a":[1,2]}"#);
        assert_eq!(codec.decode(b"", &json).unwrap(), Value::Null);
    }

    #[test]
    fn test_malformed_json_is_bad_request() {
        let err = DefaultCodec.decode(b"{nope", &MediaType::json()).unwrap_err();
        assert!(err.is(&ErrorType::BAD_REQUEST));
    }

    #[test]
    fn test_unknown_media_type_is_unsupported() {
        let xml = MediaType::parse("application/xml").unwrap();
        assert!(!DefaultCodec.supports(&xml));
        let err = DefaultCodec.decode(b"<a/>", &xml).unwrap_err();
        assert!(err.is(&ErrorType::NOT_SUPPORTED));
    }

    #[test]
    fn test_text_encodes_non_strings_as_json() {
        let bytes = DefaultCodec.encode(&json!(42), &MediaType::text_plain()).unwrap();
        assert_eq!(&bytes[..], b"42");
    }

    #[test]
    fn test_binary() {
        let octets = MediaType::octet_stream();
        let value = DefaultCodec.decode(&[1, 2, 255], &octets).unwrap();
        assert_eq!(value, json!([1, 2, 255]));
        let bytes = DefaultCodec.encode(&value, &octets).unwrap();
        assert_eq!(&bytes[..], &[1, 2, 255]);
        assert!(DefaultCodec.encode(&json!([300]), &octets).is_err());
    }

    #[test]
    fn test_null_encodes_empty() {
        let bytes = DefaultCodec.encode(&Value::Null, &MediaType::json()).unwrap();
        assert!(bytes.is_empty());
    }
}
