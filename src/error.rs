use std::{fmt, io};

/// Errors produced while decoding DNS replies, handling helper frames, or running the helper.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum Error {
    /// The end of the buffer was reached while more data was expected.
    Truncated,
    /// A domain name pointer pointed into itself or further into the message.
    PointerLoop,
    /// A field was set to an invalid (reserved for future use or illegal) value.
    InvalidValue,
    /// An empty label was encountered where it is not allowed.
    InvalidEmptyLabel,
    /// A label exceeded the maximum allowable length of a label.
    LabelTooLong,
    /// The DNS reply is structurally invalid or too short.
    BadResponse,
    /// The DNS reply is well-formed, but contains no answers.
    ///
    /// This is distinct from [`Error::BadResponse`]: the server legitimately had nothing to say.
    NoData,
    /// A request frame is malformed (empty field, or a field exceeding the received data).
    InvalidArgument,
    /// Memory for the decoded result could not be reserved.
    OutOfMemory,
    /// The privileged action reported failure, carrying its exit code (or `-1` if it was killed
    /// by a signal).
    PrivilegedActionFailed(i32),
    /// Fewer bytes than the encoded response were written to the parent.
    ShortWrite { expected: usize, written: usize },
    /// An I/O operation on the helper's channels failed.
    Io(io::ErrorKind),
}

impl Error {
    fn description(&self) -> &str {
        match self {
            Error::Truncated => "unexpected end of data",
            Error::PointerLoop => "encountered domain name pointer loop",
            Error::InvalidValue => "invalid value",
            Error::InvalidEmptyLabel => "invalid empty label",
            Error::LabelTooLong => "label too long",
            Error::BadResponse => "malformed DNS response",
            Error::NoData => "DNS response contains no answers",
            Error::InvalidArgument => "malformed request frame",
            Error::OutOfMemory => "out of memory",
            Error::PrivilegedActionFailed(_) => "privileged action failed",
            Error::ShortWrite { .. } => "short write",
            Error::Io(_) => "I/O error",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())?;
        match self {
            Error::PrivilegedActionFailed(code) => write!(f, " with status {}", code),
            Error::ShortWrite { expected, written } => {
                write!(f, ": expected {} bytes, wrote {}", expected, written)
            }
            Error::Io(kind) => write!(f, ": {}", kind),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e.kind())
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        match e {
            Error::Truncated => io::ErrorKind::UnexpectedEof.into(),
            Error::PointerLoop => io::Error::new(
                io::ErrorKind::InvalidData,
                "a domain name pointer loop was encountered; this may indicate a malicious reply",
            ),
            Error::InvalidValue | Error::BadResponse => io::Error::new(io::ErrorKind::InvalidData, e),
            Error::InvalidEmptyLabel => io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid empty label in domain name",
            ),
            Error::LabelTooLong => io::Error::new(
                io::ErrorKind::InvalidInput,
                "domain name label exceeds maximum label length",
            ),
            Error::NoData => io::Error::new(io::ErrorKind::NotFound, e),
            Error::InvalidArgument => io::Error::new(io::ErrorKind::InvalidInput, e),
            Error::OutOfMemory => io::ErrorKind::OutOfMemory.into(),
            Error::PrivilegedActionFailed(_) => io::Error::new(io::ErrorKind::Other, e),
            Error::ShortWrite { .. } => io::Error::new(io::ErrorKind::WriteZero, e),
            Error::Io(kind) => kind.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Error::NoData.to_string(), "DNS response contains no answers");
        assert_eq!(
            Error::PrivilegedActionFailed(3).to_string(),
            "privileged action failed with status 3"
        );
        assert_eq!(
            Error::ShortWrite {
                expected: 4,
                written: 2
            }
            .to_string(),
            "short write: expected 4 bytes, wrote 2"
        );
    }

    #[test]
    fn io_conversion() {
        let e = io::Error::from(Error::Truncated);
        assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof);
        let e = io::Error::from(Error::BadResponse);
        assert_eq!(e.kind(), io::ErrorKind::InvalidData);
        assert_eq!(
            Error::from(io::Error::from(io::ErrorKind::BrokenPipe)),
            Error::Io(io::ErrorKind::BrokenPipe)
        );
    }
}
