use crate::boundary::Delimiter;
use crate::transform::ContentTransform;
use bytes::BytesMut;
use http::header::HeaderMap;

#[derive(Debug)]
pub(crate) struct MultipartState {
    pub(crate) stage: Stage,
    /// Raw bytes of the header name or value currently being read.
    pub(crate) token: BytesMut,
    pub(crate) header_name: Option<String>,
    /// Headers of the part whose header block is being read.
    pub(crate) headers: Option<HeaderMap>,
    /// Decoder bound to the part whose entity is being read.
    pub(crate) transform: Option<ContentTransform>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Preamble(Delimiter),
    HeaderName(HeaderNameStage),
    HeaderValue(HeaderValueStage),
    Body(Delimiter),
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeaderNameStage {
    /// Nothing read yet on this line.
    Start,
    /// Reading name bytes up to the colon.
    Name,
    /// `CR` opening the blank line that ends the header block.
    BlankLineCr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeaderValueStage {
    Value,
    Cr,
    /// `CRLF` seen: the next byte decides between folding, another header and
    /// the end of the block.
    LineEnd,
}

impl MultipartState {
    pub fn new() -> MultipartState {
        MultipartState {
            stage: Stage::Preamble(Delimiter::initial()),
            token: BytesMut::new(),
            header_name: None,
            headers: None,
            transform: None,
        }
    }

    pub fn begin_headers(&mut self) {
        self.stage = Stage::HeaderName(HeaderNameStage::Start);
        self.token.clear();
        self.header_name = None;
        self.headers = Some(HeaderMap::new());
    }

    pub fn close(&mut self) {
        self.stage = Stage::Done;
        self.token = BytesMut::new();
        self.header_name = None;
        self.headers = None;
        self.transform = None;
    }

    pub fn fail(&mut self) {
        self.close();
        self.stage = Stage::Failed;
    }
}
