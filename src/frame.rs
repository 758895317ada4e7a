//! Request and response frames exchanged with the privileged helper over its stdin/stdout.
//!
//! Request, parent to helper:
//!
//! ```text
//! ┌──────────┬────────┬──────────┬───────────┬──────────┬──────────┐
//! │ len      │ seuser │ len      │ mls_range │ len      │ username │
//! │ u32 BE   │ bytes  │ u32 BE   │ bytes     │ u32 BE   │ bytes    │
//! └──────────┴────────┴──────────┴───────────┴──────────┴──────────┘
//! ```
//!
//! Response, helper to parent: a single `u32 BE` status word.

use std::fmt;

use crate::{packet::cursor::Cursor, Error};

/// Size of the response frame.
pub const RESPONSE_SIZE: usize = 4;

/// Decoded helper request.
///
/// All fields are non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    /// The SELinux user to map the login to, e.g. `unconfined_u`.
    pub seuser: String,
    /// The MLS/MCS range, e.g. `s0-s0:c0.c1023`.
    pub mls_range: String,
    /// The login name.
    pub username: String,
}

impl RequestFrame {
    pub fn new(
        seuser: impl Into<String>,
        mls_range: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            seuser: seuser.into(),
            mls_range: mls_range.into(),
            username: username.into(),
        }
    }

    /// Decodes a request from the bytes received from the parent.
    ///
    /// Fails with [`Error::InvalidArgument`] if a field is empty, extends past the end of `buf`,
    /// or isn't a NUL-free UTF-8 string. Bytes following the last field are ignored.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        let mut c = Cursor::new(buf);
        let seuser = read_field(&mut c, "seuser")?;
        let mls_range = read_field(&mut c, "mls_range")?;
        let username = read_field(&mut c, "username")?;
        if !c.is_empty() {
            log::debug!("ignoring {} trailing request bytes", c.remaining());
        }
        Ok(Self {
            seuser,
            mls_range,
            username,
        })
    }

    /// Returns the encoded size of this request.
    pub fn encoded_len(&self) -> usize {
        self.fields().iter().map(|f| 4 + f.len()).sum()
    }

    /// Encodes the request the way the parent sends it.
    ///
    /// Fails with [`Error::InvalidArgument`] if a field is empty or longer than `u32::MAX` bytes,
    /// since the helper would reject (or misread) such a frame.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        for field in self.fields() {
            if field.is_empty() {
                return Err(Error::InvalidArgument);
            }
            let len = u32::try_from(field.len()).map_err(|_| Error::InvalidArgument)?;
            buf.extend_from_slice(&len.to_be_bytes());
            buf.extend_from_slice(field.as_bytes());
        }
        Ok(buf)
    }

    fn fields(&self) -> [&str; 3] {
        [&self.seuser, &self.mls_range, &self.username]
    }
}

impl fmt::Display for RequestFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}:{}",
            self.username, self.seuser, self.mls_range
        )
    }
}

fn read_field(c: &mut Cursor<'_>, what: &str) -> Result<String, Error> {
    let len = c.read_u32_be().map_err(|_| {
        log::debug!("request ends before {} length", what);
        Error::InvalidArgument
    })?;
    log::trace!("{} length: {}", what, len);
    if len == 0 {
        log::debug!("empty {}", what);
        return Err(Error::InvalidArgument);
    }
    let len = usize::try_from(len).map_err(|_| Error::InvalidArgument)?;
    let bytes = c.read_slice(len).map_err(|_| {
        log::debug!(
            "{} length {} exceeds the {} remaining bytes",
            what,
            len,
            c.remaining()
        );
        Error::InvalidArgument
    })?;

    let s = std::str::from_utf8(bytes).map_err(|_| {
        log::debug!("{} is not valid UTF-8", what);
        Error::InvalidArgument
    })?;
    if s.contains('\0') {
        log::debug!("{} contains a NUL byte", what);
        return Err(Error::InvalidArgument);
    }

    let mut field = String::new();
    field
        .try_reserve_exact(s.len())
        .map_err(|_| Error::OutOfMemory)?;
    field.push_str(s);
    log::trace!("{}: {}", what, field);
    Ok(field)
}

/// The helper's reply: the status of the privileged action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFrame {
    pub status: u32,
}

impl ResponseFrame {
    #[inline]
    pub fn new(status: u32) -> Self {
        Self { status }
    }

    #[inline]
    pub fn encode(&self) -> [u8; RESPONSE_SIZE] {
        self.status.to_be_bytes()
    }

    /// Decodes the helper's reply, as read by the parent.
    ///
    /// Fails with [`Error::Truncated`] if fewer than 4 bytes were received and
    /// [`Error::InvalidArgument`] if more were.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        let mut c = Cursor::new(buf);
        let status = c.read_u32_be()?;
        if !c.is_empty() {
            return Err(Error::InvalidArgument);
        }
        Ok(Self { status })
    }
}
