use crate::constants::{self, CR, EQUALS, HTAB, LF, SP};
use crate::pool::{BufferPool, PooledBuffer};
use crate::PartHandler;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use http::header::HeaderMap;

/// Base64 as found in MIME bodies: padding is optional so that a truncated
/// final group can still be decoded when the part ends.
const MIME_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Turns the raw entity bytes of one part into the bytes handed to
/// [`PartHandler::data`]. One instance is bound to each part and dropped at
/// the end of it, together with any state it carries between input chunks.
#[derive(Debug)]
pub(crate) enum ContentTransform {
    Identity,
    Base64(Base64Decoder),
    QuotedPrintable(QuotedPrintableDecoder),
}

impl ContentTransform {
    /// Selects the transform named by the part's `Content-Transfer-Encoding` header.
    pub fn for_headers(headers: &HeaderMap) -> ContentTransform {
        let encoding = headers
            .get(constants::CONTENT_TRANSFER_ENCODING)
            .and_then(|val| val.to_str().ok())
            .map(str::trim);

        match encoding {
            Some(enc) if enc.eq_ignore_ascii_case(constants::BASE64) => {
                ContentTransform::Base64(Base64Decoder::default())
            }
            Some(enc) if enc.eq_ignore_ascii_case(constants::QUOTED_PRINTABLE) => {
                ContentTransform::QuotedPrintable(QuotedPrintableDecoder::default())
            }
            _ => ContentTransform::Identity,
        }
    }

    pub fn handle<H: PartHandler>(&mut self, handler: &mut H, pool: &dyn BufferPool, raw: &[u8]) -> crate::Result<()> {
        match self {
            ContentTransform::Identity => {
                if raw.is_empty() {
                    return Ok(());
                }
                handler.data(raw)
            }
            ContentTransform::Base64(decoder) => decoder.handle(handler, pool, raw),
            ContentTransform::QuotedPrintable(decoder) => decoder.handle(handler, pool, raw),
        }
    }

    /// Flushes whatever the transform still holds once the part's entity is over.
    pub fn finish<H: PartHandler>(&mut self, handler: &mut H, pool: &dyn BufferPool) -> crate::Result<()> {
        match self {
            ContentTransform::Identity => Ok(()),
            ContentTransform::Base64(decoder) => decoder.finish(handler, pool),
            ContentTransform::QuotedPrintable(decoder) => decoder.finish(handler, pool),
        }
    }
}

fn flush<H: PartHandler>(handler: &mut H, buf: &mut PooledBuffer<'_>) -> crate::Result<()> {
    if buf.is_empty() {
        return Ok(());
    }
    handler.data(&buf[..])?;
    buf.clear();
    Ok(())
}

#[derive(Debug, Default)]
pub(crate) struct Base64Decoder {
    group: [u8; 4],
    group_len: usize,
    padded: bool,
}

impl Base64Decoder {
    fn handle<H: PartHandler>(&mut self, handler: &mut H, pool: &dyn BufferPool, raw: &[u8]) -> crate::Result<()> {
        let mut buf = PooledBuffer::acquire(pool);

        for &b in raw {
            if self.padded {
                // anything after the final group is ignored
                break;
            }
            if matches!(b, CR | LF | SP | HTAB) {
                continue;
            }

            self.group[self.group_len] = b;
            self.group_len += 1;

            if self.group_len == self.group.len() {
                self.padded = self.group.contains(&EQUALS);
                self.decode_group(&mut buf)?;
                if buf.is_full() {
                    flush(handler, &mut buf)?;
                }
            }
        }

        flush(handler, &mut buf)
    }

    fn finish<H: PartHandler>(&mut self, handler: &mut H, pool: &dyn BufferPool) -> crate::Result<()> {
        if self.group_len == 0 {
            return Ok(());
        }

        let mut buf = PooledBuffer::acquire(pool);
        self.decode_group(&mut buf)?;
        flush(handler, &mut buf)
    }

    fn decode_group(&mut self, buf: &mut PooledBuffer<'_>) -> crate::Result<()> {
        let mut decoded = [0u8; 3];
        let len = MIME_BASE64
            .decode_slice(&self.group[..self.group_len], &mut decoded)
            .map_err(crate::Error::DecodeBase64)?;

        self.group_len = 0;
        buf.extend_from_slice(&decoded[..len]);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escape {
    None,
    /// `=` seen.
    Equals,
    /// `=` and one more byte seen.
    FirstDigit(u8),
    /// `=\r` seen, a following `\n` belongs to the soft line break.
    SoftBreak,
}

impl Default for Escape {
    fn default() -> Self {
        Escape::None
    }
}

#[derive(Debug, Default)]
pub(crate) struct QuotedPrintableDecoder {
    escape: Escape,
}

impl QuotedPrintableDecoder {
    fn handle<H: PartHandler>(&mut self, handler: &mut H, pool: &dyn BufferPool, raw: &[u8]) -> crate::Result<()> {
        let mut buf = PooledBuffer::acquire(pool);

        for &b in raw {
            self.escape = match (self.escape, b) {
                (Escape::None, EQUALS) => Escape::Equals,
                (Escape::None, _) => {
                    buf.extend_from_slice(&[b]);
                    Escape::None
                }
                (Escape::SoftBreak, LF) => Escape::None,
                (Escape::SoftBreak, EQUALS) => Escape::Equals,
                (Escape::SoftBreak, _) => {
                    buf.extend_from_slice(&[b]);
                    Escape::None
                }
                (Escape::Equals, CR) => Escape::SoftBreak,
                (Escape::Equals, LF) => Escape::None,
                (Escape::Equals, EQUALS) => {
                    buf.extend_from_slice(&[EQUALS]);
                    Escape::Equals
                }
                (Escape::Equals, _) => Escape::FirstDigit(b),
                (Escape::FirstDigit(first), _) => match (hex_value(first), hex_value(b)) {
                    (Some(high), Some(low)) => {
                        buf.extend_from_slice(&[(high << 4) | low]);
                        Escape::None
                    }
                    _ if b == EQUALS => {
                        buf.extend_from_slice(&[EQUALS, first]);
                        Escape::Equals
                    }
                    _ => {
                        buf.extend_from_slice(&[EQUALS, first, b]);
                        Escape::None
                    }
                },
            };

            if buf.is_full() {
                flush(handler, &mut buf)?;
            }
        }

        flush(handler, &mut buf)
    }

    fn finish<H: PartHandler>(&mut self, handler: &mut H, pool: &dyn BufferPool) -> crate::Result<()> {
        let mut buf = PooledBuffer::acquire(pool);

        match std::mem::take(&mut self.escape) {
            Escape::Equals => buf.extend_from_slice(&[EQUALS]),
            Escape::FirstDigit(first) => buf.extend_from_slice(&[EQUALS, first]),
            Escape::None | Escape::SoftBreak => {}
        }

        flush(handler, &mut buf)
    }
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::SharedPool;
    use http::header::HeaderValue;

    #[derive(Default)]
    struct Sink {
        data: Vec<u8>,
        calls: usize,
    }

    impl PartHandler for Sink {
        fn begin_part(&mut self, _headers: HeaderMap) -> crate::Result<()> {
            Ok(())
        }

        fn data(&mut self, chunk: &[u8]) -> crate::Result<()> {
            assert!(!chunk.is_empty());
            self.data.extend_from_slice(chunk);
            self.calls += 1;
            Ok(())
        }

        fn end_part(&mut self) -> crate::Result<()> {
            Ok(())
        }
    }

    fn decode(mut transform: ContentTransform, chunks: &[&[u8]]) -> Vec<u8> {
        let pool = SharedPool::new(4, 2);
        let mut sink = Sink::default();
        for chunk in chunks {
            transform.handle(&mut sink, &pool, chunk).unwrap();
        }
        transform.finish(&mut sink, &pool).unwrap();
        sink.data
    }

    fn qp() -> ContentTransform {
        ContentTransform::QuotedPrintable(QuotedPrintableDecoder::default())
    }

    fn b64() -> ContentTransform {
        ContentTransform::Base64(Base64Decoder::default())
    }

    #[test]
    fn test_for_headers() {
        let mut headers = HeaderMap::new();
        assert!(matches!(ContentTransform::for_headers(&headers), ContentTransform::Identity));

        headers.insert(constants::CONTENT_TRANSFER_ENCODING, HeaderValue::from_static("BASE64"));
        assert!(matches!(ContentTransform::for_headers(&headers), ContentTransform::Base64(_)));

        headers.insert(constants::CONTENT_TRANSFER_ENCODING, HeaderValue::from_static("Quoted-Printable"));
        assert!(matches!(
            ContentTransform::for_headers(&headers),
            ContentTransform::QuotedPrintable(_)
        ));

        headers.insert(constants::CONTENT_TRANSFER_ENCODING, HeaderValue::from_static("8bit"));
        assert!(matches!(ContentTransform::for_headers(&headers), ContentTransform::Identity));
    }

    #[test]
    fn test_identity() {
        assert_eq!(decode(ContentTransform::Identity, &[b"abc", b"", b"=41"]), b"abc=41");
    }

    #[test]
    fn test_base64() {
        assert_eq!(decode(b64(), &[b"SGVsbG8="]), b"Hello");
        assert_eq!(decode(b64(), &[b"SGVs", b"bG8sIHdvcmxkIQ=="]), b"Hello, world!");
    }

    #[test]
    fn test_base64_split_groups() {
        assert_eq!(decode(b64(), &[b"S", b"GV", b"sbG", b"8="]), b"Hello");
        assert_eq!(decode(b64(), &[b"SGVsbG8", b"="]), b"Hello");
    }

    #[test]
    fn test_base64_line_breaks_and_trailer() {
        assert_eq!(decode(b64(), &[b"SGVs\r\n", b"bG8=\r\n", b"garbage"]), b"Hello");
    }

    #[test]
    fn test_base64_unpadded_tail() {
        assert_eq!(decode(b64(), &[b"SGVsbG8"]), b"Hello");
    }

    #[test]
    fn test_base64_invalid() {
        let pool = SharedPool::default();
        let mut sink = Sink::default();
        let err = b64().handle(&mut sink, &pool, b"SG*s").unwrap_err();
        assert!(matches!(err, crate::Error::DecodeBase64(_)));
        assert_eq!(pool.retained(), 1);
    }

    #[test]
    fn test_quoted_printable() {
        assert_eq!(decode(qp(), &[b"Caf=E9"]), b"Caf\xe9");
        assert_eq!(decode(qp(), &[b"a=3Db=3db"]), b"a=b=b");
    }

    #[test]
    fn test_quoted_printable_split_escape() {
        assert_eq!(decode(qp(), &[b"Caf=", b"E9!"]), b"Caf\xe9!");
        assert_eq!(decode(qp(), &[b"Caf=E", b"9!"]), b"Caf\xe9!");
    }

    #[test]
    fn test_quoted_printable_soft_break() {
        assert_eq!(decode(qp(), &[b"long=\r\nline"]), b"longline");
        assert_eq!(decode(qp(), &[b"long=\nline"]), b"longline");
        assert_eq!(decode(qp(), &[b"long=\r", b"\nline"]), b"longline");
        assert_eq!(decode(qp(), &[b"long=", b"\r", b"\n", b"line"]), b"longline");
        assert_eq!(decode(qp(), &[b"long=\r=41"]), b"longA");
        assert_eq!(decode(qp(), &[b"hard\r\nbreak"]), b"hard\r\nbreak");
    }

    #[test]
    fn test_quoted_printable_invalid_escapes() {
        assert_eq!(decode(qp(), &[b"a=zzb"]), b"a=zzb");
        assert_eq!(decode(qp(), &[b"a==41"]), b"a=A");
        assert_eq!(decode(qp(), &[b"a=4=41"]), b"a=4A");
        assert_eq!(decode(qp(), &[b"end="]), b"end=");
        assert_eq!(decode(qp(), &[b"end=4"]), b"end=4");
    }

    #[test]
    fn test_flushes_when_buffer_fills() {
        let pool = SharedPool::new(4, 2);
        let mut sink = Sink::default();
        qp().handle(&mut sink, &pool, b"0123456789").unwrap();
        assert_eq!(sink.data, b"0123456789");
        assert_eq!(sink.calls, 3);
    }
}
