//! Reader and writer interceptors.
//!
//! Interceptors wrap entity marshalling as a chain of responsibility. Each
//! one receives a `next` handle and decides whether, and when, to call
//! [`ReadNext::proceed`] or [`WriteNext::proceed`]. The innermost step is
//! the codec: decode for readers, encode for writers.
//!
//! A reader can rewrite the raw entity before proceeding, transform the
//! decoded value afterwards, or return a value without proceeding at all.

use std::sync::Arc;

use pylon_core::{Codec, MediaType, PylonError, PylonResult, RequestContext, ResponseContext};
use serde_json::Value;

use crate::filter::BoxFuture;

/// Wraps request entity decoding.
pub trait ReaderInterceptor: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Produces the decoded entity, usually by calling `next.proceed(ctx)`.
    fn around_read<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        next: ReadNext<'a>,
    ) -> BoxFuture<'a, PylonResult<Value>>;
}

/// Wraps response entity encoding.
pub trait WriterInterceptor: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Encodes the entity, usually by calling `next.proceed(req, res)`.
    fn around_write<'a>(
        &'a self,
        req: &'a RequestContext,
        res: &'a mut ResponseContext,
        next: WriteNext<'a>,
    ) -> BoxFuture<'a, PylonResult<()>>;
}

/// The rest of a reader chain.
pub struct ReadNext<'a> {
    chain: &'a [Arc<dyn ReaderInterceptor>],
    codecs: &'a [Arc<dyn Codec>],
}

impl<'a> ReadNext<'a> {
    /// Starts a chain over `interceptors`, ending in `codecs`.
    pub fn new(interceptors: &'a [Arc<dyn ReaderInterceptor>], codecs: &'a [Arc<dyn Codec>]) -> Self {
        Self {
            chain: interceptors,
            codecs,
        }
    }

    /// Runs the next interceptor, or decodes when none is left.
    pub fn proceed<'b>(self, ctx: &'b mut RequestContext) -> BoxFuture<'b, PylonResult<Value>>
    where
        'a: 'b,
    {
        match self.chain.split_first() {
            Some((first, rest)) => first.around_read(
                ctx,
                ReadNext {
                    chain: rest,
                    codecs: self.codecs,
                },
            ),
            None => {
                let codecs = self.codecs;
                Box::pin(async move { decode_entity(ctx, codecs) })
            }
        }
    }
}

/// The rest of a writer chain.
pub struct WriteNext<'a> {
    chain: &'a [Arc<dyn WriterInterceptor>],
    codecs: &'a [Arc<dyn Codec>],
    default_media_type: &'a MediaType,
}

impl<'a> WriteNext<'a> {
    /// Starts a chain over `interceptors`, ending in `codecs`.
    ///
    /// An entity without a media type is written as `default_media_type`.
    pub fn new(
        interceptors: &'a [Arc<dyn WriterInterceptor>],
        codecs: &'a [Arc<dyn Codec>],
        default_media_type: &'a MediaType,
    ) -> Self {
        Self {
            chain: interceptors,
            codecs,
            default_media_type,
        }
    }

    /// Runs the next interceptor, or encodes when none is left.
    pub fn proceed<'b>(
        self,
        req: &'b RequestContext,
        res: &'b mut ResponseContext,
    ) -> BoxFuture<'b, PylonResult<()>>
    where
        'a: 'b,
    {
        match self.chain.split_first() {
            Some((first, rest)) => first.around_write(
                req,
                res,
                WriteNext {
                    chain: rest,
                    codecs: self.codecs,
                    default_media_type: self.default_media_type,
                },
            ),
            None => {
                let (codecs, default) = (self.codecs, self.default_media_type);
                Box::pin(async move { encode_entity(res, codecs, default) })
            }
        }
    }
}

fn find_codec<'c>(codecs: &'c [Arc<dyn Codec>], media_type: &MediaType) -> Option<&'c dyn Codec> {
    codecs
        .iter()
        .find(|c| c.supports(media_type))
        .map(Arc::as_ref)
}

/// Decodes the request entity with the first codec that supports its
/// content type. A request without a content type is read as JSON.
fn decode_entity(ctx: &RequestContext, codecs: &[Arc<dyn Codec>]) -> PylonResult<Value> {
    let media_type = ctx.content_type().unwrap_or_else(MediaType::json);
    let codec = find_codec(codecs, &media_type)
        .ok_or_else(|| PylonError::not_supported(format!("no reader for {media_type}")))?;
    codec.decode(ctx.entity(), &media_type)
}

/// Encodes the response entity into `res`, filling in the media type when
/// the response has none. A response without an entity is left alone.
pub(crate) fn encode_entity(
    res: &mut ResponseContext,
    codecs: &[Arc<dyn Codec>],
    default_media_type: &MediaType,
) -> PylonResult<()> {
    let Some(entity) = res.entity() else {
        return Ok(());
    };
    let media_type = res
        .media_type()
        .cloned()
        .unwrap_or_else(|| default_media_type.clone());
    let codec = find_codec(codecs, &media_type)
        .ok_or_else(|| PylonError::internal(format!("no writer for {media_type}")))?;
    let bytes = codec.encode(entity, &media_type)?;

    if res.media_type().is_none() {
        res.set_media_type(Some(media_type));
    }
    res.set_encoded(bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use pylon_core::{DefaultCodec, ErrorType};
    use serde_json::json;
    use std::sync::Mutex;

    fn codecs() -> Vec<Arc<dyn Codec>> {
        vec![Arc::new(DefaultCodec)]
    }

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl ReaderInterceptor for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn around_read<'a>(
            &'a self,
            ctx: &'a mut RequestContext,
            next: ReadNext<'a>,
        ) -> BoxFuture<'a, PylonResult<Value>> {
            Box::pin(async move {
                self.log.lock().unwrap().push(self.name);
                let value = next.proceed(&mut *ctx).await?;
                self.log.lock().unwrap().push(self.name);
                Ok(value)
            })
        }
    }

    /// Strips a `data:` prefix before decoding and wraps the result.
    struct Unwrap;

    impl ReaderInterceptor for Unwrap {
        fn name(&self) -> &'static str {
            "unwrap"
        }

        fn around_read<'a>(
            &'a self,
            ctx: &'a mut RequestContext,
            next: ReadNext<'a>,
        ) -> BoxFuture<'a, PylonResult<Value>> {
            Box::pin(async move {
                if let Some(rest) = ctx.entity().strip_prefix(b"data:") {
                    let rest = Bytes::copy_from_slice(rest);
                    ctx.set_entity(rest);
                }
                let value = next.proceed(&mut *ctx).await?;
                Ok(json!({ "wrapped": value }))
            })
        }
    }

    struct Stamp;

    impl WriterInterceptor for Stamp {
        fn name(&self) -> &'static str {
            "stamp"
        }

        fn around_write<'a>(
            &'a self,
            req: &'a RequestContext,
            res: &'a mut ResponseContext,
            next: WriteNext<'a>,
        ) -> BoxFuture<'a, PylonResult<()>> {
            Box::pin(async move {
                res.append_header("x-stamp", "1");
                next.proceed(req, &mut *res).await?;
                let len = res.encoded().map_or(0, Bytes::len);
                res.append_header("x-encoded-len", &len.to_string());
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn test_reader_chain_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain: Vec<Arc<dyn ReaderInterceptor>> = vec![
            Arc::new(Recording {
                name: "outer",
                log: Arc::clone(&log),
            }),
            Arc::new(Recording {
                name: "inner",
                log: Arc::clone(&log),
            }),
        ];
        let codecs = codecs();
        let mut ctx = RequestContext::builder(Method::POST, "/")
            .header("content-type", "application/json")
            .entity(r#"{"n":1}"#)
            .build()
            .unwrap();

        let value = ReadNext::new(&chain, &codecs).proceed(&mut ctx).await.unwrap();
        assert_eq!(value, json!({"n": 1}));
        assert_eq!(*log.lock().unwrap(), vec!["outer", "inner", "inner", "outer"]);
    }

    #[tokio::test]
    async fn test_reader_rewrites_entity() {
        let chain: Vec<Arc<dyn ReaderInterceptor>> = vec![Arc::new(Unwrap)];
        let codecs = codecs();
        let mut ctx = RequestContext::builder(Method::POST, "/")
            .entity("data:[1,2]")
            .build()
            .unwrap();

        let value = ReadNext::new(&chain, &codecs).proceed(&mut ctx).await.unwrap();
        assert_eq!(value, json!({"wrapped": [1, 2]}));
    }

    #[tokio::test]
    async fn test_unknown_content_type_is_not_supported() {
        let codecs = codecs();
        let mut ctx = RequestContext::builder(Method::POST, "/")
            .header("content-type", "application/xml")
            .entity("<a/>")
            .build()
            .unwrap();

        let err = ReadNext::new(&[], &codecs).proceed(&mut ctx).await.unwrap_err();
        assert!(err.is(&ErrorType::NOT_SUPPORTED));
    }

    #[tokio::test]
    async fn test_writer_wraps_encode() {
        let chain: Vec<Arc<dyn WriterInterceptor>> = vec![Arc::new(Stamp)];
        let codecs = codecs();
        let default = MediaType::json();
        let req = RequestContext::builder(Method::GET, "/").build().unwrap();
        let mut res = ResponseContext::new(StatusCode::OK);
        res.set_entity(Some(json!({"id": 7})));

        WriteNext::new(&chain, &codecs, &default)
            .proceed(&req, &mut res)
            .await
            .unwrap();

        assert_eq!(res.encoded().unwrap().as_ref(), br#"{"id":7}"#);
        assert_eq!(res.media_type(), Some(&MediaType::json()));
        assert_eq!(res.headers()["x-stamp"], "1");
        assert_eq!(res.headers()["x-encoded-len"], "8");
    }

    #[test]
    fn test_encode_without_entity_is_noop() {
        let codecs = codecs();
        let mut res = ResponseContext::new(StatusCode::NO_CONTENT);
        encode_entity(&mut res, &codecs, &MediaType::json()).unwrap();
        assert!(res.encoded().is_none());
        assert!(res.media_type().is_none());
    }
}
