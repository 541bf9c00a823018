//! A push parser for `multipart/form-data` and other MIME multipart bodies.
//!
//! The body is handed to a [`MultipartParser`] chunk by chunk, in whatever
//! pieces the network delivers it, and the parts are reported to a
//! [`PartHandler`] as soon as they are recognised. The parser never buffers
//! the body: part data is passed on as it arrives, decoded according to the
//! part's `Content-Transfer-Encoding` (`base64`, `quoted-printable` or none).
//!
//! # Examples
//!
//! ```
//! use multipart_push::{MultipartParser, PartCollector};
//!
//! # fn run() -> multipart_push::Result<()> {
//! let data = "--X-BOUNDARY\r\n\
//!     Content-Disposition: form-data; name=\"greeting\"\r\n\
//!     Content-Transfer-Encoding: base64\r\n\
//!     \r\n\
//!     SGVsbG8=\r\n\
//!     --X-BOUNDARY--\r\n";
//!
//! let boundary = multipart_push::parse_boundary("multipart/form-data; boundary=X-BOUNDARY")?;
//! let mut parser = MultipartParser::new(boundary, PartCollector::new())?;
//!
//! // the chunks may be split anywhere
//! let (a, b) = data.as_bytes().split_at(40);
//! parser.parse(a)?;
//! parser.parse(b)?;
//! assert!(parser.is_complete());
//!
//! let parts = parser.into_handler().into_parts();
//! assert_eq!(parts[0].name(), Some("greeting"));
//! assert_eq!(parts[0].text(), "Hello");
//! # Ok(())
//! # }
//! # run().unwrap();
//! ```
//!
//! ## Optional features
//!
//! * `log`: trace parser progress through the [`log`](https://docs.rs/log) crate.
//! * `json`: adds [`Part::json`].
//! * `tokio-io`: adds [`parse_reader`] for tokio's `AsyncRead`.

pub use bytes;
pub use http::header::HeaderMap;

pub use config::Config;
pub use error::Error;
pub use handler::PartHandler;
pub use multipart::MultipartParser;
pub use part::{Part, PartCollector};
pub use pool::{BufferPool, PooledBuffer, SharedPool};
#[cfg(feature = "tokio-io")]
pub use stream::parse_reader;
pub use stream::parse_stream;

macro_rules! trace {
    ($($arg:tt)+) => {{
        #[cfg(feature = "log")]
        log::trace!($($arg)+);
    }};
}

macro_rules! debug {
    ($($arg:tt)+) => {{
        #[cfg(feature = "log")]
        log::debug!($($arg)+);
    }};
}

mod boundary;
mod config;
mod constants;
mod content_disposition;
mod error;
mod handler;
mod helpers;
mod multipart;
mod part;
mod pool;
mod state;
mod stream;
mod transform;

/// A Result type often returned from methods that can have `multipart-push` errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Parses the `Content-Type` header to extract the boundary value.
///
/// Any `multipart/*` type is accepted.
pub fn parse_boundary<T: AsRef<str>>(content_type: T) -> Result<String> {
    let m = content_type
        .as_ref()
        .parse::<mime::Mime>()
        .map_err(Error::DecodeContentType)?;

    if m.type_() != mime::MULTIPART {
        return Err(Error::NoMultipart);
    }

    m.get_param(mime::BOUNDARY)
        .map(|name| name.as_str().to_owned())
        .ok_or(Error::NoBoundary)
}
