use http::header::HeaderMap;

/// Receives the parts discovered by a [`MultipartParser`](crate::MultipartParser).
///
/// For every part the parser calls [`begin_part`](PartHandler::begin_part)
/// once, [`data`](PartHandler::data) zero or more times and then
/// [`end_part`](PartHandler::end_part) once, all from within
/// [`parse`](crate::MultipartParser::parse). An error returned from any of
/// them aborts the current `parse` call and is returned from it unchanged.
///
/// # Examples
///
/// ```
/// use multipart_push::{HeaderMap, MultipartParser, PartHandler};
///
/// #[derive(Default)]
/// struct ByteCounter {
///     parts: usize,
///     bytes: usize,
/// }
///
/// impl PartHandler for ByteCounter {
///     fn begin_part(&mut self, _headers: HeaderMap) -> multipart_push::Result<()> {
///         self.parts += 1;
///         Ok(())
///     }
///
///     fn data(&mut self, chunk: &[u8]) -> multipart_push::Result<()> {
///         self.bytes += chunk.len();
///         Ok(())
///     }
///
///     fn end_part(&mut self) -> multipart_push::Result<()> {
///         Ok(())
///     }
/// }
///
/// # fn run() -> multipart_push::Result<()> {
/// let mut parser = MultipartParser::new("X-BOUNDARY", ByteCounter::default())?;
/// parser.parse(b"--X-BOUNDARY\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n")?;
///
/// assert!(parser.is_complete());
/// assert_eq!(parser.handler().parts, 1);
/// assert_eq!(parser.handler().bytes, 4);
/// # Ok(())
/// # }
/// # run().unwrap();
/// ```
pub trait PartHandler {
    /// A new part starts; `headers` holds its complete header block.
    fn begin_part(&mut self, headers: HeaderMap) -> crate::Result<()>;

    /// Decoded entity bytes of the current part. The slice is only valid for
    /// the duration of the call.
    fn data(&mut self, chunk: &[u8]) -> crate::Result<()>;

    /// The current part has no more data.
    fn end_part(&mut self) -> crate::Result<()>;
}

impl<H: PartHandler + ?Sized> PartHandler for &mut H {
    fn begin_part(&mut self, headers: HeaderMap) -> crate::Result<()> {
        (**self).begin_part(headers)
    }

    fn data(&mut self, chunk: &[u8]) -> crate::Result<()> {
        (**self).data(chunk)
    }

    fn end_part(&mut self) -> crate::Result<()> {
        (**self).end_part()
    }
}
