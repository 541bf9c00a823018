use std::fmt::{self, Debug, Display, Formatter};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A set of errors that can occur while parsing a multipart body and in other
/// operations.
#[non_exhaustive]
pub enum Error {
    /// The byte stream violates the multipart grammar. The parser that
    /// produced it is poisoned and must be discarded.
    MalformedMessage { reason: &'static str },

    /// The boundary is empty or contains a line break.
    InvalidBoundary,

    /// The header decoding charset is not known to `encoding_rs`.
    UnsupportedCharset(String),

    /// Failed to decode the part's raw header name to
    /// [`HeaderName`](http::header::HeaderName) type.
    DecodeHeaderName { name: String, cause: BoxError },

    /// Failed to decode the part's raw header value to
    /// [`HeaderValue`](http::header::HeaderValue) type.
    DecodeHeaderValue { value: Vec<u8>, cause: BoxError },

    /// The content of a `base64` encoded part is not valid base64.
    DecodeBase64(base64::DecodeSliceError),

    /// A [`PartHandler`](crate::PartHandler) failed to consume a callback,
    /// e.g. while persisting data to disk.
    PartHandlerFailed(BoxError),

    /// `parse` was called again after an earlier call failed.
    ParserAborted,

    /// Multipart stream ended before the closing boundary.
    IncompleteStream,

    /// Stream read failed.
    StreamReadFailed(BoxError),

    /// The `Content-Type` header is not a `multipart/*` type.
    NoMultipart,

    /// Failed to convert the `Content-Type` to [`mime::Mime`] type.
    DecodeContentType(mime::FromStrError),

    /// No boundary found in `Content-Type` header.
    NoBoundary,

    /// Failed to decode the part data as `JSON` in
    /// [`part.json()`](crate::Part::json) method.
    #[cfg(feature = "json")]
    DecodeJson(serde_json::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedMessage { reason } => write!(f, "malformed multipart message: {}", reason),
            Error::InvalidBoundary => write!(f, "multipart boundary is empty or contains a line break"),
            Error::UnsupportedCharset(label) => write!(f, "unsupported header charset: {}", label),
            Error::DecodeHeaderName { name, cause } => {
                write!(f, "failed to decode part's raw header name: {:?} {}", name, cause)
            }
            Error::DecodeHeaderValue { cause, .. } => write!(f, "failed to decode part's raw header value: {}", cause),
            Error::DecodeBase64(err) => write!(f, "failed to decode base64 part data: {}", err),
            Error::PartHandlerFailed(err) => write!(f, "part handler failed: {}", err),
            Error::ParserAborted => write!(f, "parser was aborted by an earlier error"),
            Error::IncompleteStream => write!(f, "incomplete multipart stream"),
            Error::StreamReadFailed(err) => write!(f, "stream read failed: {}", err),
            Error::NoMultipart => write!(f, "Content-Type is not multipart"),
            Error::DecodeContentType(err) => {
                write!(f, "Failed to convert Content-Type to `mime::Mime` type: {}", err)
            }
            Error::NoBoundary => write!(f, "multipart boundary not found in Content-Type"),
            #[cfg(feature = "json")]
            Error::DecodeJson(err) => write!(f, "failed to decode part data as JSON: {}", err),
        }
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::DecodeHeaderName { cause, .. } | Error::DecodeHeaderValue { cause, .. } => Some(cause.as_ref()),
            Error::PartHandlerFailed(err) | Error::StreamReadFailed(err) => Some(err.as_ref()),
            Error::DecodeBase64(err) => Some(err),
            Error::DecodeContentType(err) => Some(err),
            #[cfg(feature = "json")]
            Error::DecodeJson(err) => Some(err),
            _ => None,
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string().eq(&other.to_string())
    }
}

impl Eq for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::PartHandlerFailed(err.into())
    }
}
