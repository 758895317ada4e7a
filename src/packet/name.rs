//! Domain names, labels, and expansion of (possibly compressed) names from DNS messages.

use std::{
    fmt::{self, Write},
    str::FromStr,
};

use super::cursor::Cursor;
use crate::Error;

/// A `.`-separated component of a [`DomainName`].
///
/// Labels consist of arbitrary bytes and have a maximum length of 63 bytes. This type can only
/// represent non-empty labels, so the minimum length is 1 byte.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label {
    // Guaranteed to contain >0 and at most `Label::MAX_LEN` bytes.
    bytes: Box<[u8]>,
}

impl Label {
    /// The maximum length of a domain label.
    pub const MAX_LEN: usize = 0b0011_1111;

    /// Creates a [`Label`] from raw bytes or a string slice, returning an error if the bytes are
    /// empty or too long.
    pub fn try_new(label: impl AsRef<[u8]>) -> Result<Self, Error> {
        let label = label.as_ref();
        if label.is_empty() {
            return Err(Error::InvalidEmptyLabel);
        }

        if label.len() > Self::MAX_LEN {
            return Err(Error::LabelTooLong);
        }

        Ok(Self {
            bytes: label.into(),
        })
    }

    /// Returns the raw bytes of this label.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, r#""{}""#, self.as_bytes().escape_ascii())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.as_bytes().escape_ascii(), f)
    }
}

impl FromStr for Label {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_new(s)
    }
}

/// A domain name, represented as a list of [`Label`]s.
///
/// The terminating empty label of the wire format is implied and not stored.
#[derive(PartialEq, Eq, Clone, Default)]
pub struct DomainName {
    labels: Vec<Label>,
}

impl DomainName {
    /// The empty root domain `.`.
    pub const ROOT: Self = Self { labels: Vec::new() };

    /// Parses a domain name as a string of `.`-separated labels.
    ///
    /// A trailing `.` is allowed but not required.
    pub fn from_str(s: &str) -> Result<Self, Error> {
        s.parse()
    }

    /// Returns the `.`-separated labels making up this domain name.
    #[inline]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Appends a [`Label`] to the end this domain name.
    #[inline]
    pub fn push_label(&mut self, label: Label) {
        self.labels.push(label);
    }

    /// Returns the host name in the form resolvers hand to applications: labels joined by `.`,
    /// without the trailing dot. The root domain yields an empty string.
    pub fn to_host_string(&self) -> String {
        let mut host = String::new();
        for (i, label) in self.labels.iter().enumerate() {
            if i != 0 {
                host.push('.');
            }
            // Writing to a `String` can't fail.
            let _ = write!(host, "{}", label);
        }
        host
    }
}

impl fmt::Debug for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            return f.write_char('.');
        }
        for label in &self.labels {
            fmt::Display::fmt(label, f)?;
            f.write_char('.')?;
        }
        Ok(())
    }
}

impl FromStr for DomainName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "." {
            // `split_terminator` returns an empty label for this, so special-case it
            return Ok(Self::ROOT);
        }

        let mut name = DomainName::ROOT;
        for label in s.split_terminator('.') {
            name.labels.push(label.parse()?);
        }
        Ok(name)
    }
}

/// Decodes domain names embedded in DNS messages.
///
/// Implementations get the *whole* message, since compressed names refer back to earlier
/// positions in it.
pub trait NameExpander {
    /// Decodes the name starting at `offset` in `msg`.
    ///
    /// Returns the name and the number of bytes it occupies at `offset` (for a compressed name,
    /// that is up to and including the first pointer).
    fn expand_name(&self, msg: &[u8], offset: usize) -> Result<(DomainName, usize), Error>;
}

impl<E: NameExpander + ?Sized> NameExpander for &E {
    fn expand_name(&self, msg: &[u8], offset: usize) -> Result<(DomainName, usize), Error> {
        (**self).expand_name(msg, offset)
    }
}

/// [`NameExpander`] for RFC 1035 names with message compression.
///
/// Compression pointers must point to an earlier part of the message than anything visited while
/// decoding the name so far. That rules out loops and bounds the work per name by the message
/// size.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompressedNames;

impl NameExpander for CompressedNames {
    fn expand_name(&self, msg: &[u8], offset: usize) -> Result<(DomainName, usize), Error> {
        let mut c = Cursor::at(msg, offset)?;
        let mut name = DomainName::ROOT;
        let mut min_pos = offset;
        let mut consumed = None;
        loop {
            let length = c.peek_u8()?;
            match length & 0b1100_0000 {
                0b1100_0000 => {
                    // 16-bit pointer to somewhere else in the message.
                    let ptr = usize::from(c.read_u16_be()? & 0b0011_1111_1111_1111);
                    if ptr >= min_pos {
                        return Err(Error::PointerLoop);
                    }
                    if consumed.is_none() {
                        consumed = Some(c.position() - offset);
                    }
                    min_pos = ptr;
                    c.set_position(ptr)?;
                }
                0b0000_0000 => {
                    c.skip(1)?;
                    if length == 0 {
                        break;
                    }
                    let label = c.read_slice(usize::from(length))?;
                    name.push_label(Label::try_new(label)?);
                }
                _ => return Err(Error::InvalidValue), // 01 and 10 are reserved
            }
        }

        let consumed = consumed.unwrap_or(c.position() - offset);
        Ok((name, consumed))
    }
}
