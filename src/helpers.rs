use encoding_rs::Encoding;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use std::convert::TryFrom;

pub(crate) fn resolve_charset(label: &str) -> crate::Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| crate::Error::UnsupportedCharset(label.to_owned()))
}

pub(crate) fn decode_header_text(charset: &'static Encoding, raw: &[u8]) -> String {
    let (text, _) = charset.decode_without_bom_handling(raw);
    text.trim().to_owned()
}

pub(crate) fn append_header(headers: &mut HeaderMap, name: &str, value: String) -> crate::Result<()> {
    let name = HeaderName::try_from(name).map_err(|err| crate::Error::DecodeHeaderName {
        name: name.to_owned(),
        cause: err.into(),
    })?;

    let value = HeaderValue::from_str(&value).map_err(|err| crate::Error::DecodeHeaderValue {
        value: value.into_bytes(),
        cause: err.into(),
    })?;

    headers.append(name, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_charset() {
        assert_eq!(resolve_charset("utf-8").unwrap(), encoding_rs::UTF_8);
        assert_eq!(resolve_charset(" ISO-8859-1 ").unwrap(), encoding_rs::WINDOWS_1252);
        assert_eq!(
            resolve_charset("x-klingon"),
            Err(crate::Error::UnsupportedCharset("x-klingon".to_owned()))
        );
    }

    #[test]
    fn test_decode_header_text() {
        assert_eq!(decode_header_text(encoding_rs::UTF_8, b"  text/plain \t"), "text/plain");
        assert_eq!(decode_header_text(encoding_rs::WINDOWS_1252, b"caf\xe9"), "caf\u{e9}");
    }

    #[test]
    fn test_append_header() {
        let mut headers = HeaderMap::new();
        append_header(&mut headers, "X-Tag", "one".to_owned()).unwrap();
        append_header(&mut headers, "x-tag", "two".to_owned()).unwrap();

        let values: Vec<_> = headers.get_all("x-tag").iter().collect();
        assert_eq!(values, vec!["one", "two"]);
        assert_eq!(headers.get("X-TAG").unwrap(), "one");

        let err = append_header(&mut headers, "bad name", "v".to_owned()).unwrap_err();
        assert!(matches!(err, crate::Error::DecodeHeaderName { .. }));

        let err = append_header(&mut headers, "x-ok", "a\u{7f}b".to_owned()).unwrap_err();
        assert!(matches!(err, crate::Error::DecodeHeaderValue { .. }));
    }
}
