use crate::content_disposition::ContentDisposition;
use crate::PartHandler;
use bytes::{Bytes, BytesMut};
use encoding_rs::{Encoding, UTF_8};
use http::header::{self, HeaderMap};
#[cfg(feature = "json")]
use serde::de::DeserializeOwned;

/// A part collected in memory by [`PartCollector`].
#[derive(Debug, Clone)]
pub struct Part {
    headers: HeaderMap,
    data: Bytes,
    meta: PartMeta,
}

#[derive(Debug, Clone)]
struct PartMeta {
    name: Option<String>,
    file_name: Option<String>,
    content_type: Option<mime::Mime>,
    idx: usize,
}

impl Part {
    fn new(headers: HeaderMap, data: Bytes, idx: usize) -> Part {
        let content_disposition = ContentDisposition::parse(&headers);
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<mime::Mime>().ok());

        Part {
            headers,
            data,
            meta: PartMeta {
                name: content_disposition.field_name,
                file_name: content_disposition.file_name,
                content_type,
                idx,
            },
        }
    }

    /// The field name found in the
    /// [`Content-Disposition`](https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Content-Disposition)
    /// header.
    pub fn name(&self) -> Option<&str> {
        self.meta.name.as_deref()
    }

    /// The file name found in the `Content-Disposition` header.
    pub fn file_name(&self) -> Option<&str> {
        self.meta.file_name.as_deref()
    }

    /// Get the content type of the part.
    pub fn content_type(&self) -> Option<&mime::Mime> {
        self.meta.content_type.as_ref()
    }

    /// Get a map of headers as [`HeaderMap`].
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Position of the part in the body, starting at zero.
    pub fn index(&self) -> usize {
        self.meta.idx
    }

    /// The decoded content of the part.
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    /// Consumes the part and returns its decoded content.
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// The content as text, decoded with the `charset` parameter of the
    /// part's `Content-Type`, or `utf-8`.
    pub fn text(&self) -> String {
        self.text_with_charset("utf-8")
    }

    /// Like [`text`](Part::text) but falls back to `default_encoding` when
    /// the part does not name a charset.
    pub fn text_with_charset(&self, default_encoding: &str) -> String {
        let encoding_name = self
            .content_type()
            .and_then(|mime| mime.get_param(mime::CHARSET))
            .map(|charset| charset.as_str())
            .unwrap_or(default_encoding);

        let encoding = Encoding::for_label(encoding_name.as_bytes()).unwrap_or(UTF_8);
        let (text, _, _) = encoding.decode(&self.data);

        text.into_owned()
    }

    /// Deserializes the content as `JSON`.
    ///
    /// # Optional
    ///
    /// This requires the optional `json` feature to be enabled.
    #[cfg(feature = "json")]
    pub fn json<T: DeserializeOwned>(&self) -> crate::Result<T> {
        serde_json::from_slice(&self.data).map_err(crate::Error::DecodeJson)
    }
}

/// A [`PartHandler`] keeping every part, headers and decoded content, in memory.
///
/// Meant for small bodies such as plain form submissions; large uploads should
/// be streamed to their destination by a dedicated handler instead.
#[derive(Debug, Default)]
pub struct PartCollector {
    parts: Vec<Part>,
    current: Option<(HeaderMap, BytesMut)>,
}

impl PartCollector {
    pub fn new() -> PartCollector {
        PartCollector::default()
    }

    /// Parts completed so far.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<Part> {
        self.parts
    }
}

impl PartHandler for PartCollector {
    fn begin_part(&mut self, headers: HeaderMap) -> crate::Result<()> {
        self.current = Some((headers, BytesMut::new()));
        Ok(())
    }

    fn data(&mut self, chunk: &[u8]) -> crate::Result<()> {
        if let Some((_, data)) = self.current.as_mut() {
            data.extend_from_slice(chunk);
        }
        Ok(())
    }

    fn end_part(&mut self) -> crate::Result<()> {
        if let Some((headers, data)) = self.current.take() {
            let idx = self.parts.len();
            self.parts.push(Part::new(headers, data.freeze(), idx));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::HeaderValue;

    fn make_part(content_type: Option<&'static str>, data: &'static [u8]) -> Part {
        let mut collector = PartCollector::new();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_static(r#"form-data; name="upload"; filename="a.txt""#),
        );
        if let Some(content_type) = content_type {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        }

        collector.begin_part(headers).unwrap();
        collector.data(data).unwrap();
        collector.end_part().unwrap();
        collector.into_parts().remove(0)
    }

    #[test]
    fn test_meta() {
        let part = make_part(Some("text/plain"), b"hi");
        assert_eq!(part.name(), Some("upload"));
        assert_eq!(part.file_name(), Some("a.txt"));
        assert_eq!(part.content_type(), Some(&mime::TEXT_PLAIN));
        assert_eq!(part.index(), 0);
        assert_eq!(part.bytes().as_ref(), b"hi");
    }

    #[test]
    fn test_text_with_charset() {
        let part = make_part(Some("text/plain; charset=iso-8859-1"), b"caf\xe9");
        assert_eq!(part.text(), "caf\u{e9}");

        let part = make_part(None, b"caf\xe9");
        assert_eq!(part.text_with_charset("windows-1252"), "caf\u{e9}");
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json() {
        #[derive(serde::Deserialize)]
        struct Payload {
            id: u32,
        }

        let part = make_part(Some("application/json"), br#"{"id": 7}"#);
        let payload: Payload = part.json().unwrap();
        assert_eq!(payload.id, 7);
    }
}
