use crate::constants::{BOUNDARY_PREFIX, CR, DASH, LF};

/// The full delimiter searched for in a multipart body: `CRLF--` followed by
/// the boundary supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Boundary {
    token: Vec<u8>,
}

impl Boundary {
    pub fn new(boundary: &[u8]) -> crate::Result<Boundary> {
        // CR may only appear at the very start of the token, which is what lets
        // a failed match restart at index 1 without backtracking.
        if boundary.is_empty() || boundary.iter().any(|b| *b == CR || *b == LF) {
            return Err(crate::Error::InvalidBoundary);
        }

        let mut token = Vec::with_capacity(BOUNDARY_PREFIX.len() + boundary.len());
        token.extend_from_slice(BOUNDARY_PREFIX);
        token.extend_from_slice(boundary);

        Ok(Boundary { token })
    }

    pub fn token(&self) -> &[u8] {
        &self.token
    }
}

/// Progress of the delimiter search, shared by the preamble and the part body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delimiter {
    /// No candidate delimiter in progress.
    NoMatch,
    /// The last `n` bytes seen equal the first `n` bytes of the token.
    Partial(usize),
    /// A full delimiter was seen; skipping transport padding up to `CR` or `-`.
    Boundary,
    /// `CR` seen after the delimiter.
    AwaitingLf,
    /// One `-` seen after the delimiter.
    AwaitingDash,
}

/// What the bytes following a delimiter resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AfterBoundary {
    Pending(Delimiter),
    NextPart,
    Close,
}

impl Delimiter {
    /// The search state at the very start of a body. The body may open with
    /// `--boundary` directly, so it is read as if a `CRLF` had just been seen.
    pub fn initial() -> Delimiter {
        Delimiter::Partial(2)
    }

    /// Advances a partial match by one byte. Returns the new state, with
    /// `Boundary` meaning the whole token has now been seen.
    pub fn advance(matched: usize, b: u8, token: &[u8]) -> Delimiter {
        if b == token[matched] {
            if matched + 1 == token.len() {
                Delimiter::Boundary
            } else {
                Delimiter::Partial(matched + 1)
            }
        } else if b == token[0] {
            Delimiter::Partial(1)
        } else {
            Delimiter::NoMatch
        }
    }

    /// Steps through the bytes after a confirmed delimiter: `CRLF` opens the
    /// next part and `--` closes the body.
    pub fn after_boundary(self, b: u8) -> AfterBoundary {
        match (self, b) {
            (Delimiter::Boundary, CR) => AfterBoundary::Pending(Delimiter::AwaitingLf),
            (Delimiter::Boundary, DASH) => AfterBoundary::Pending(Delimiter::AwaitingDash),
            (Delimiter::AwaitingLf, LF) => AfterBoundary::NextPart,
            (Delimiter::AwaitingLf, DASH) => AfterBoundary::Pending(Delimiter::AwaitingDash),
            (Delimiter::AwaitingDash, DASH) => AfterBoundary::Close,
            _ => AfterBoundary::Pending(Delimiter::Boundary),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_token() {
        let boundary = Boundary::new(b"X-BOUNDARY").unwrap();
        assert_eq!(boundary.token(), b"\r\n--X-BOUNDARY");
        assert_eq!(boundary.token().len(), 14);
    }

    #[test]
    fn test_invalid_boundary() {
        assert_eq!(Boundary::new(b""), Err(crate::Error::InvalidBoundary));
        assert_eq!(Boundary::new(b"abc\r\n"), Err(crate::Error::InvalidBoundary));
        assert_eq!(Boundary::new(b"a\nb"), Err(crate::Error::InvalidBoundary));
    }

    #[test]
    fn test_advance() {
        let boundary = Boundary::new(b"AB").unwrap();
        let token = boundary.token();

        assert_eq!(Delimiter::advance(0, b'\r', token), Delimiter::Partial(1));
        assert_eq!(Delimiter::advance(0, b'x', token), Delimiter::NoMatch);
        assert_eq!(Delimiter::advance(3, b'-', token), Delimiter::Partial(4));
        assert_eq!(Delimiter::advance(5, b'B', token), Delimiter::Boundary);

        // a CR breaking a match starts a new candidate
        assert_eq!(Delimiter::advance(4, b'\r', token), Delimiter::Partial(1));
        assert_eq!(Delimiter::advance(4, b'x', token), Delimiter::NoMatch);
    }

    #[test]
    fn test_initial_matches_leading_dashes() {
        let boundary = Boundary::new(b"AB").unwrap();
        let token = boundary.token();

        let mut state = Delimiter::initial();
        for b in b"--AB" {
            state = match state {
                Delimiter::Partial(n) => Delimiter::advance(n, *b, token),
                other => panic!("unexpected state {:?}", other),
            };
        }
        assert_eq!(state, Delimiter::Boundary);
    }

    #[test]
    fn test_after_boundary() {
        let s = Delimiter::Boundary;
        assert_eq!(s.after_boundary(b' '), AfterBoundary::Pending(Delimiter::Boundary));
        assert_eq!(s.after_boundary(b'\r'), AfterBoundary::Pending(Delimiter::AwaitingLf));
        assert_eq!(Delimiter::AwaitingLf.after_boundary(b'\n'), AfterBoundary::NextPart);
        assert_eq!(Delimiter::AwaitingLf.after_boundary(b'x'), AfterBoundary::Pending(Delimiter::Boundary));
        assert_eq!(s.after_boundary(b'-'), AfterBoundary::Pending(Delimiter::AwaitingDash));
        assert_eq!(Delimiter::AwaitingDash.after_boundary(b'-'), AfterBoundary::Close);
        assert_eq!(Delimiter::AwaitingDash.after_boundary(b'x'), AfterBoundary::Pending(Delimiter::Boundary));
    }
}
