use crate::constants;
use crate::pool::{BufferPool, SharedPool};
use std::sync::Arc;

/// Settings of a [`MultipartParser`](crate::MultipartParser).
///
/// # Examples
///
/// ```
/// use multipart_push::{Config, MultipartParser, PartCollector, SharedPool};
/// use std::sync::Arc;
///
/// let pool = Arc::new(SharedPool::new(4096, 8));
/// let config = Config::new().charset("iso-8859-1").buffer_pool(pool);
///
/// let parser = MultipartParser::with_config("X-BOUNDARY", PartCollector::new(), config).unwrap();
/// assert_eq!(parser.charset(), "windows-1252");
/// ```
pub struct Config {
    pub(crate) charset: String,
    pub(crate) pool: Arc<dyn BufferPool + Send + Sync>,
}

impl Config {
    /// Creates the default config: `utf-8` header charset and a private
    /// [`SharedPool`].
    pub fn new() -> Config {
        Config::default()
    }

    /// Sets the charset used to decode header names and values. The label is
    /// resolved when the parser is constructed.
    pub fn charset<C: Into<String>>(mut self, label: C) -> Config {
        self.charset = label.into();
        self
    }

    /// Sets the pool the `base64` and `quoted-printable` decoders borrow their
    /// working buffers from.
    pub fn buffer_pool(mut self, pool: Arc<dyn BufferPool + Send + Sync>) -> Config {
        self.pool = pool;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            charset: constants::DEFAULT_CHARSET.to_owned(),
            pool: Arc::new(SharedPool::default()),
        }
    }
}
