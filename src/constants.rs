use http::header::HeaderName;

pub(crate) const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;
pub(crate) const DEFAULT_RETAINED_BUFFERS: usize = 16;
pub(crate) const DEFAULT_CHARSET: &str = "utf-8";

pub(crate) const HTAB: u8 = b'\t';
pub(crate) const CR: u8 = b'\r';
pub(crate) const LF: u8 = b'\n';
pub(crate) const SP: u8 = b' ';
pub(crate) const DASH: u8 = b'-';
pub(crate) const COLON: u8 = b':';
pub(crate) const EQUALS: u8 = b'=';

/// Precedes the caller supplied boundary in every delimiter.
pub(crate) const BOUNDARY_PREFIX: &[u8] = b"\r\n--";

pub(crate) const CONTENT_TRANSFER_ENCODING: HeaderName = HeaderName::from_static("content-transfer-encoding");

pub(crate) const BASE64: &str = "base64";
pub(crate) const QUOTED_PRINTABLE: &str = "quoted-printable";
