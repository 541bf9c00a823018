use crate::boundary::{AfterBoundary, Boundary, Delimiter};
use crate::constants::{COLON, CR, HTAB, LF, SP};
use crate::helpers;
use crate::pool::BufferPool;
use crate::state::{HeaderNameStage, HeaderValueStage, MultipartState, Stage};
use crate::transform::ContentTransform;
use crate::{Config, PartHandler};
use encoding_rs::Encoding;
use std::sync::Arc;

/// A push parser for `multipart/form-data` and other MIME multipart bodies.
///
/// The body is fed in chunks of any size through [`parse`](MultipartParser::parse),
/// as they arrive from the network. Parts are reported to a [`PartHandler`]
/// while parsing, so the complete body is never held in memory: besides the
/// current chunk the parser only keeps the header block being read and, at the
/// end of a chunk, a possible delimiter prefix shorter than the delimiter.
///
/// Splitting the body differently never changes the parts, headers or data the
/// handler sees.
///
/// # Examples
///
/// ```
/// use multipart_push::{MultipartParser, PartCollector};
///
/// # fn run() -> multipart_push::Result<()> {
/// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
/// let mut parser = MultipartParser::new("X-BOUNDARY", PartCollector::new())?;
///
/// for chunk in data.as_bytes().chunks(7) {
///     parser.parse(chunk)?;
/// }
/// assert!(parser.is_complete());
///
/// let parts = parser.into_handler().into_parts();
/// assert_eq!(parts[0].name(), Some("my_text_field"));
/// assert_eq!(parts[0].text(), "abcd");
/// # Ok(())
/// # }
/// # run().unwrap();
/// ```
pub struct MultipartParser<H> {
    handler: H,
    boundary: Boundary,
    charset: &'static Encoding,
    pool: Arc<dyn BufferPool + Send + Sync>,
    state: MultipartState,
}

impl<H: PartHandler> MultipartParser<H> {
    /// Constructs a parser for the given boundary, as found in the `boundary`
    /// parameter of the `Content-Type` header, without the leading `--`.
    pub fn new<B: AsRef<[u8]>>(boundary: B, handler: H) -> crate::Result<MultipartParser<H>> {
        MultipartParser::with_config(boundary, handler, Config::default())
    }

    /// Constructs a parser with a custom [`Config`]. Fails if the configured
    /// charset is unknown.
    pub fn with_config<B: AsRef<[u8]>>(boundary: B, handler: H, config: Config) -> crate::Result<MultipartParser<H>> {
        let boundary = Boundary::new(boundary.as_ref())?;
        let charset = helpers::resolve_charset(&config.charset)?;

        Ok(MultipartParser {
            handler,
            boundary,
            charset,
            pool: config.pool,
            state: MultipartState::new(),
        })
    }

    /// Changes the charset used to decode the headers read from now on.
    pub fn set_charset(&mut self, label: &str) -> crate::Result<()> {
        self.charset = helpers::resolve_charset(label)?;
        Ok(())
    }

    /// The canonical name of the active header charset.
    pub fn charset(&self) -> &'static str {
        self.charset.name()
    }

    /// Returns `true` once the closing delimiter has been seen. Any further
    /// input is epilogue and ignored.
    pub fn is_complete(&self) -> bool {
        self.state.stage == Stage::Done
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Consumes the next chunk of the body.
    ///
    /// The handler is called for everything the chunk completes. Bytes that
    /// may be the start of a delimiter are held back until the next call
    /// decides them.
    ///
    /// On error the parser is unusable and every later call returns
    /// [`Error::ParserAborted`](crate::Error::ParserAborted).
    pub fn parse(&mut self, buf: &[u8]) -> crate::Result<()> {
        let mut buf = buf;

        loop {
            let result = match self.state.stage {
                Stage::Failed => return Err(crate::Error::ParserAborted),
                Stage::Done => return Ok(()),
                _ if buf.is_empty() => return Ok(()),
                Stage::Preamble(delimiter) => self.read_preamble(delimiter, buf),
                Stage::HeaderName(stage) => self.read_header_name(stage, buf),
                Stage::HeaderValue(stage) => self.read_header_value(stage, buf),
                Stage::Body(delimiter) => self.read_body(delimiter, buf),
            };

            match result {
                Ok(consumed) => buf = &buf[consumed..],
                Err(err) => {
                    debug!("multipart parse aborted: {}", err);
                    self.state.fail();
                    return Err(err);
                }
            }
        }
    }

    fn read_preamble(&mut self, start: Delimiter, buf: &[u8]) -> crate::Result<usize> {
        let token = self.boundary.token();
        let mut delimiter = start;
        let mut idx = 0;

        while idx < buf.len() {
            match delimiter {
                Delimiter::NoMatch => match memchr::memchr(CR, &buf[idx..]) {
                    Some(offset) => {
                        idx += offset + 1;
                        delimiter = Delimiter::Partial(1);
                    }
                    None => idx = buf.len(),
                },
                Delimiter::Partial(matched) => {
                    delimiter = Delimiter::advance(matched, buf[idx], token);
                    idx += 1;
                }
                after => {
                    let b = buf[idx];
                    idx += 1;

                    match after.after_boundary(b) {
                        AfterBoundary::Pending(next) => delimiter = next,
                        AfterBoundary::NextPart => {
                            trace!("first boundary found after {} preamble bytes in this chunk", idx);
                            self.state.begin_headers();
                            return Ok(idx);
                        }
                        AfterBoundary::Close => {
                            trace!("multipart body has no parts");
                            self.state.close();
                            return Ok(idx);
                        }
                    }
                }
            }
        }

        self.state.stage = Stage::Preamble(delimiter);
        Ok(idx)
    }

    fn read_header_name(&mut self, start: HeaderNameStage, buf: &[u8]) -> crate::Result<usize> {
        let mut stage = start;

        for (idx, &b) in buf.iter().enumerate() {
            stage = match (stage, b) {
                (HeaderNameStage::Start, COLON) => return Err(malformed("header value without a header name")),
                (HeaderNameStage::Name, COLON) => {
                    let name = helpers::decode_header_text(self.charset, &self.state.token);
                    self.state.token.clear();
                    self.state.header_name = Some(name);
                    self.state.stage = Stage::HeaderValue(HeaderValueStage::Value);
                    return Ok(idx + 1);
                }
                (HeaderNameStage::Start, CR) => HeaderNameStage::BlankLineCr,
                (HeaderNameStage::Name, CR) => return Err(malformed("header line without a colon")),
                (HeaderNameStage::BlankLineCr, LF) => {
                    self.begin_part()?;
                    return Ok(idx + 1);
                }
                (HeaderNameStage::BlankLineCr, _) => return Err(malformed("CR not followed by LF in header block")),
                (_, LF) => return Err(malformed("bare LF in header name")),
                (HeaderNameStage::Start, _) | (HeaderNameStage::Name, _) => {
                    self.state.token.extend_from_slice(&[b]);
                    HeaderNameStage::Name
                }
            };
        }

        self.state.stage = Stage::HeaderName(stage);
        Ok(buf.len())
    }

    fn read_header_value(&mut self, start: HeaderValueStage, buf: &[u8]) -> crate::Result<usize> {
        let mut stage = start;

        for (idx, &b) in buf.iter().enumerate() {
            stage = match (stage, b) {
                (HeaderValueStage::Value, CR) => HeaderValueStage::Cr,
                (HeaderValueStage::Value, LF) => return Err(malformed("bare LF in header value")),
                (HeaderValueStage::Value, _) => {
                    self.state.token.extend_from_slice(&[b]);
                    HeaderValueStage::Value
                }
                (HeaderValueStage::Cr, LF) => HeaderValueStage::LineEnd,
                (HeaderValueStage::Cr, _) => return Err(malformed("CR not followed by LF in header value")),
                // folded header, the value continues on this line
                (HeaderValueStage::LineEnd, SP) | (HeaderValueStage::LineEnd, HTAB) => {
                    self.state.token.extend_from_slice(&[b]);
                    HeaderValueStage::Value
                }
                (HeaderValueStage::LineEnd, CR) => {
                    self.store_header()?;
                    self.state.stage = Stage::HeaderName(HeaderNameStage::BlankLineCr);
                    return Ok(idx + 1);
                }
                (HeaderValueStage::LineEnd, COLON) => return Err(malformed("header value without a header name")),
                (HeaderValueStage::LineEnd, LF) => return Err(malformed("bare LF in header block")),
                (HeaderValueStage::LineEnd, _) => {
                    self.store_header()?;
                    self.state.token.extend_from_slice(&[b]);
                    self.state.stage = Stage::HeaderName(HeaderNameStage::Name);
                    return Ok(idx + 1);
                }
            };
        }

        self.state.stage = Stage::HeaderValue(stage);
        Ok(buf.len())
    }

    fn store_header(&mut self) -> crate::Result<()> {
        let name = self
            .state
            .header_name
            .take()
            .ok_or_else(|| malformed("header value without a header name"))?;
        let value = helpers::decode_header_text(self.charset, &self.state.token);
        self.state.token.clear();

        let headers = self
            .state
            .headers
            .as_mut()
            .ok_or_else(|| malformed("header outside of a header block"))?;

        helpers::append_header(headers, &name, value)
    }

    fn begin_part(&mut self) -> crate::Result<()> {
        let headers = self
            .state
            .headers
            .take()
            .ok_or_else(|| malformed("header block outside of a part"))?;
        let transform = ContentTransform::for_headers(&headers);

        trace!("part begins with {} headers, decoding as {:?}", headers.len(), transform);

        self.state.token.clear();
        self.state.transform = Some(transform);
        self.state.stage = Stage::Body(Delimiter::NoMatch);

        self.handler.begin_part(headers)
    }

    fn read_body(&mut self, start: Delimiter, buf: &[u8]) -> crate::Result<usize> {
        let token = self.boundary.token();
        let pool: &dyn BufferPool = &*self.pool;

        // delimiter prefix held back at the end of the previous chunk
        let mut withheld = match start {
            Delimiter::Partial(matched) => matched,
            _ => 0,
        };
        let mut delimiter = start;
        let mut idx = 0;

        while idx < buf.len() {
            match delimiter {
                Delimiter::NoMatch => match memchr::memchr(CR, &buf[idx..]) {
                    Some(offset) => {
                        idx += offset + 1;
                        delimiter = Delimiter::Partial(1);
                    }
                    None => idx = buf.len(),
                },
                Delimiter::Partial(matched) => {
                    delimiter = Delimiter::advance(matched, buf[idx], token);
                    idx += 1;

                    match delimiter {
                        Delimiter::Boundary => {
                            let end = idx.saturating_sub(token.len());
                            let mut transform = self
                                .state
                                .transform
                                .take()
                                .ok_or_else(|| malformed("part data outside of a part"))?;

                            transform.handle(&mut self.handler, pool, &buf[..end])?;
                            transform.finish(&mut self.handler, pool)?;
                            self.handler.end_part()?;
                            trace!("part ends");

                            withheld = 0;
                        }
                        Delimiter::Partial(n) if n == matched + 1 => {}
                        _ => {
                            // not a delimiter after all, the held back prefix is part data
                            if withheld > 0 {
                                emit(&mut self.state.transform, &mut self.handler, pool, &token[..withheld])?;
                                withheld = 0;
                            }
                        }
                    }
                }
                after => {
                    let b = buf[idx];
                    idx += 1;

                    match after.after_boundary(b) {
                        AfterBoundary::Pending(next) => delimiter = next,
                        AfterBoundary::NextPart => {
                            self.state.begin_headers();
                            return Ok(idx);
                        }
                        AfterBoundary::Close => {
                            trace!("closing boundary found");
                            self.state.close();
                            return Ok(idx);
                        }
                    }
                }
            }
        }

        // hand over everything that cannot belong to a delimiter
        match delimiter {
            Delimiter::NoMatch => emit(&mut self.state.transform, &mut self.handler, pool, buf)?,
            Delimiter::Partial(matched) if buf.len() > matched => {
                emit(
                    &mut self.state.transform,
                    &mut self.handler,
                    pool,
                    &buf[..buf.len() - matched],
                )?;
            }
            _ => {}
        }

        self.state.stage = Stage::Body(delimiter);
        Ok(buf.len())
    }
}

fn emit<H: PartHandler>(
    transform: &mut Option<ContentTransform>,
    handler: &mut H,
    pool: &dyn BufferPool,
    data: &[u8],
) -> crate::Result<()> {
    match transform {
        Some(transform) => transform.handle(handler, pool, data),
        None => Err(malformed("part data outside of a part")),
    }
}

fn malformed(reason: &'static str) -> crate::Error {
    crate::Error::MalformedMessage { reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PartCollector;

    fn parse_all(boundary: &str, chunks: &[&[u8]]) -> crate::Result<MultipartParser<PartCollector>> {
        let mut parser = MultipartParser::new(boundary, PartCollector::new())?;
        for chunk in chunks {
            parser.parse(chunk)?;
        }
        Ok(parser)
    }

    #[test]
    fn test_stages() {
        let mut parser = MultipartParser::new("AB", PartCollector::new()).unwrap();
        assert_eq!(parser.state.stage, Stage::Preamble(Delimiter::Partial(2)));

        parser.parse(b"--AB\r\nX: y\r").unwrap();
        assert_eq!(parser.state.stage, Stage::HeaderValue(HeaderValueStage::Cr));
        assert_eq!(parser.state.header_name.as_deref(), Some("X"));

        parser.parse(b"\n\r\nbody\r\n-").unwrap();
        assert_eq!(parser.state.stage, Stage::Body(Delimiter::Partial(3)));
        assert!(parser.state.headers.is_none());
        assert!(parser.state.token.is_empty());

        parser.parse(b"-AB--").unwrap();
        assert_eq!(parser.state.stage, Stage::Done);
        assert!(parser.state.transform.is_none());
    }

    #[test]
    fn test_held_back_prefix_is_replayed() {
        let parser = parse_all("AB", &[b"--AB\r\n\r\nx\r\n-", b"-A", b"C\r\n--AB--"]).unwrap();
        let parts = parser.into_handler().into_parts();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].bytes().as_ref(), b"x\r\n--AC");
    }

    #[test]
    fn test_preamble_with_partial_delimiters() {
        let parser = parse_all("AB", &[b"pre\r\n-", b"-A\r\n-", b"-AB\r\n\r\nv\r\n--AB--"]).unwrap();
        let parts = parser.into_handler().into_parts();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].bytes().as_ref(), b"v");
    }

    #[test]
    fn test_failed_parser_is_poisoned() {
        let mut parser = MultipartParser::new("AB", PartCollector::new()).unwrap();
        let err = parser.parse(b"--AB\r\n: v\r\n\r\n").unwrap_err();
        assert!(matches!(err, crate::Error::MalformedMessage { .. }));
        assert_eq!(parser.parse(b"anything"), Err(crate::Error::ParserAborted));
        assert_eq!(parser.parse(b""), Err(crate::Error::ParserAborted));
        assert!(!parser.is_complete());
    }

    #[test]
    fn test_header_grammar_errors() {
        let cases: &[&[u8]] = &[
            b"--AB\r\nName\r\n\r\n",
            b"--AB\r\nName: v\nX: y\r\n\r\n",
            b"--AB\r\nName: v\r\n:y\r\n\r\n",
            b"--AB\r\n\rx",
            b"--AB\r\n\n",
            b"--AB\r\nName: v\rx",
        ];

        for case in cases {
            let err = parse_all("AB", &[*case]).err().unwrap();
            assert!(
                matches!(err, crate::Error::MalformedMessage { .. }),
                "{:?} gave {}",
                String::from_utf8_lossy(case),
                err
            );
        }
    }
}
