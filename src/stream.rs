use crate::error::BoxError;
use crate::{MultipartParser, PartHandler};
use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};
#[cfg(feature = "tokio-io")]
use tokio::io::AsyncRead;
#[cfg(feature = "tokio-io")]
use tokio_util::io::ReaderStream;

/// Feeds a [`Stream`] of body chunks into `parser` until the closing boundary
/// has been parsed.
///
/// Returns [`Error::IncompleteStream`](crate::Error::IncompleteStream) when the
/// stream ends before that. Chunks after the closing boundary are not polled.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use futures_util::stream;
/// use multipart_push::{parse_stream, MultipartParser, PartCollector};
/// use std::convert::Infallible;
///
/// # async fn run() {
/// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
/// let chunks = data.as_bytes().chunks(5).map(|c| Result::<Bytes, Infallible>::Ok(Bytes::copy_from_slice(c)));
///
/// let mut parser = MultipartParser::new("X-BOUNDARY", PartCollector::new()).unwrap();
/// parse_stream(&mut parser, stream::iter(chunks)).await.unwrap();
///
/// let parts = parser.into_handler().into_parts();
/// assert_eq!(parts[0].text(), "abcd");
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(run());
/// ```
pub async fn parse_stream<H, S, O, E>(parser: &mut MultipartParser<H>, stream: S) -> crate::Result<()>
where
    H: PartHandler,
    S: Stream<Item = Result<O, E>>,
    O: Into<Bytes>,
    E: Into<BoxError>,
{
    let mut stream = Box::pin(stream);

    while !parser.is_complete() {
        match stream.next().await {
            Some(Ok(chunk)) => {
                let chunk: Bytes = chunk.into();
                parser.parse(&chunk)?;
            }
            Some(Err(err)) => return Err(crate::Error::StreamReadFailed(err.into())),
            None => return Err(crate::Error::IncompleteStream),
        }
    }

    Ok(())
}

/// Feeds an [`AsyncRead`] body into `parser`, see [`parse_stream`].
///
/// # Optional
///
/// This requires the optional `tokio-io` feature to be enabled.
#[cfg(feature = "tokio-io")]
pub async fn parse_reader<H, R>(parser: &mut MultipartParser<H>, reader: R) -> crate::Result<()>
where
    H: PartHandler,
    R: AsyncRead,
{
    parse_stream(parser, ReaderStream::new(reader)).await
}
