//! The single-shot privileged helper.
//!
//! A helper process is spawned by the unprivileged parent for exactly one request. [`Child`]
//! drives it through a fixed sequence of [`State`]s:
//!
//! ```text
//! Start → ReadRequest → DecodeRequest → Invoke → EncodeResponse → WriteResponse → Exit(Ok)
//! ```
//!
//! Any failure jumps straight to `Exit(Err)`. Nothing is written to the parent in that case; it
//! learns about the failure through the exit code (see [`exit_code`]).

use std::{
    fmt,
    io::{self, Read, Write},
    mem,
};

use crate::{
    frame::{RequestFrame, ResponseFrame, RESPONSE_SIZE},
    hex::Hex,
    Error, IN_BUF_SIZE,
};

/// Process exit code after serving the request.
pub const EXIT_SUCCESS: u8 = 0;
/// Process exit code after any failure.
pub const EXIT_FAILURE: u8 = 1;

/// The privileged operation the helper exists for.
pub trait PrivilegedAction {
    /// Performs the operation for `username`.
    ///
    /// The returned status is sent back to the parent. An `Err` makes the helper exit with a
    /// failure code instead, without sending a response.
    fn invoke(&mut self, username: &str, seuser: &str, mls_range: &str) -> Result<u32, Error>;
}

impl<A: PrivilegedAction + ?Sized> PrivilegedAction for &mut A {
    fn invoke(&mut self, username: &str, seuser: &str, mls_range: &str) -> Result<u32, Error> {
        (**self).invoke(username, seuser, mls_range)
    }
}

/// Settings of a helper run, fixed at startup.
#[derive(Debug, Clone)]
pub struct ChildConfig {
    /// Upper bound on the size of the request read from the parent.
    pub max_request_size: usize,
}

impl Default for ChildConfig {
    fn default() -> Self {
        Self {
            max_request_size: IN_BUF_SIZE,
        }
    }
}

/// A step of the helper's lifecycle, carrying the data produced by the previous step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Start,
    ReadRequest,
    DecodeRequest(Vec<u8>),
    Invoke(RequestFrame),
    EncodeResponse(u32),
    WriteResponse([u8; RESPONSE_SIZE]),
    Exit(Result<(), Error>),
}

impl State {
    pub fn name(&self) -> &'static str {
        match self {
            State::Start => "Start",
            State::ReadRequest => "ReadRequest",
            State::DecodeRequest(_) => "DecodeRequest",
            State::Invoke(_) => "Invoke",
            State::EncodeResponse(_) => "EncodeResponse",
            State::WriteResponse(_) => "WriteResponse",
            State::Exit(_) => "Exit",
        }
    }

    #[inline]
    pub fn is_exit(&self) -> bool {
        matches!(self, State::Exit(_))
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Serves one request read from `input`, writing the response to `output`.
pub struct Child<R, W, A> {
    config: ChildConfig,
    input: R,
    output: W,
    action: A,
    state: State,
}

impl<R: Read, W: Write, A: PrivilegedAction> Child<R, W, A> {
    pub fn new(config: ChildConfig, input: R, output: W, action: A) -> Self {
        Self {
            config,
            input,
            output,
            action,
            state: State::Start,
        }
    }

    #[inline]
    pub fn state(&self) -> &State {
        &self.state
    }

    #[inline]
    pub fn output(&self) -> &W {
        &self.output
    }

    #[inline]
    pub fn action(&self) -> &A {
        &self.action
    }

    /// Performs a single state transition. Does nothing once `Exit` is reached.
    pub fn step(&mut self) {
        let state = mem::replace(&mut self.state, State::Start);
        let from = state.name();
        self.state = match self.transition(state) {
            Ok(next) => next,
            Err(e) => {
                log::error!("{} failed: {}", from, e);
                State::Exit(Err(e))
            }
        };
        log::trace!("{} -> {}", from, self.state);
    }

    /// Steps until `Exit` is reached, and returns the outcome.
    pub fn run(&mut self) -> Result<(), Error> {
        loop {
            if let State::Exit(result) = self.state {
                return result;
            }
            self.step();
        }
    }

    fn transition(&mut self, state: State) -> Result<State, Error> {
        Ok(match state {
            State::Start => State::ReadRequest,
            State::ReadRequest => {
                let buf = read_request(&mut self.input, self.config.max_request_size)?;
                log::trace!("request: {} bytes {}", buf.len(), Hex(&buf));
                State::DecodeRequest(buf)
            }
            State::DecodeRequest(buf) => State::Invoke(RequestFrame::decode(&buf)?),
            State::Invoke(req) => {
                log::debug!("performing privileged action: {}", req);
                let status = self
                    .action
                    .invoke(&req.username, &req.seuser, &req.mls_range)?;
                State::EncodeResponse(status)
            }
            State::EncodeResponse(status) => {
                log::debug!("result [{}]", status);
                State::WriteResponse(ResponseFrame::new(status).encode())
            }
            State::WriteResponse(bytes) => {
                write_response(&mut self.output, &bytes)?;
                State::Exit(Ok(()))
            }
            exit @ State::Exit(_) => exit,
        })
    }
}

/// Reads the request until end-of-stream.
///
/// A single `read` isn't guaranteed to return everything the parent wrote, so this keeps reading
/// (retrying on `Interrupted`) until the parent closes its end. Requests larger than
/// `max_request_size` are rejected with [`Error::InvalidArgument`].
pub fn read_request<R: Read>(input: &mut R, max_request_size: usize) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    let limit = u64::try_from(max_request_size)
        .unwrap_or(u64::MAX)
        .saturating_add(1);
    input.by_ref().take(limit).read_to_end(&mut buf)?;
    if buf.len() > max_request_size {
        log::error!(
            "request exceeds the maximum size of {} bytes",
            max_request_size
        );
        return Err(Error::InvalidArgument);
    }
    Ok(buf)
}

/// Writes the encoded response, failing with [`Error::ShortWrite`] unless every byte was
/// accepted.
pub fn write_response<W: Write>(output: &mut W, bytes: &[u8]) -> Result<(), Error> {
    let mut written = 0;
    while written < bytes.len() {
        match output.write(&bytes[written..]) {
            Ok(0) => break,
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    if written != bytes.len() {
        return Err(Error::ShortWrite {
            expected: bytes.len(),
            written,
        });
    }
    output.flush()?;
    Ok(())
}

/// Maps the outcome of [`Child::run`] to the process exit code.
pub fn exit_code(result: &Result<(), Error>) -> u8 {
    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(_) => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    struct Recorder {
        calls: Vec<(String, String, String)>,
        result: Result<u32, Error>,
    }

    impl Recorder {
        fn returning(result: Result<u32, Error>) -> Self {
            Self {
                calls: Vec::new(),
                result,
            }
        }
    }

    impl PrivilegedAction for Recorder {
        fn invoke(&mut self, username: &str, seuser: &str, mls_range: &str) -> Result<u32, Error> {
            self.calls
                .push((username.into(), seuser.into(), mls_range.into()));
            self.result
        }
    }

    /// Accepts `budget` bytes, then reports that nothing more can be written.
    struct Stingy {
        budget: usize,
        data: Vec<u8>,
    }

    impl Write for Stingy {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.budget).min(1);
            self.budget -= n;
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Hands out data one byte per call, failing with `Interrupted` in between.
    struct Flaky {
        data: Vec<u8>,
        pos: usize,
        interrupt: bool,
    }

    impl Read for Flaky {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::ErrorKind::Interrupted.into());
            }
            if self.pos == self.data.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.data[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    fn request() -> Vec<u8> {
        RequestFrame::new("unconfined_u", "s0-s0:c0.c1023", "alice")
            .encode()
            .unwrap()
    }

    fn new_child(
        input: Vec<u8>,
        action: Recorder,
    ) -> Child<Cursor<Vec<u8>>, Vec<u8>, Recorder> {
        Child::new(ChildConfig::default(), Cursor::new(input), Vec::new(), action)
    }

    #[test]
    fn serves_one_request() {
        let mut child = new_child(request(), Recorder::returning(Ok(0)));
        assert_eq!(child.run(), Ok(()));
        assert_eq!(child.output(), &[0, 0, 0, 0]);
        assert_eq!(
            child.action().calls,
            [(
                "alice".to_string(),
                "unconfined_u".to_string(),
                "s0-s0:c0.c1023".to_string()
            )]
        );
        assert_eq!(exit_code(&Ok(())), EXIT_SUCCESS);
    }

    #[test]
    fn walks_through_every_state() {
        let mut child = new_child(request(), Recorder::returning(Ok(7)));
        let mut seen = vec![child.state().name()];
        while !child.state().is_exit() {
            child.step();
            seen.push(child.state().name());
        }
        assert_eq!(
            seen,
            [
                "Start",
                "ReadRequest",
                "DecodeRequest",
                "Invoke",
                "EncodeResponse",
                "WriteResponse",
                "Exit"
            ]
        );
        assert_eq!(child.state(), &State::Exit(Ok(())));
        assert_eq!(child.output(), &[0, 0, 0, 7]);

        // `Exit` is terminal.
        child.step();
        assert_eq!(child.state(), &State::Exit(Ok(())));
        assert_eq!(child.action().calls.len(), 1);
    }

    #[test]
    fn malformed_request_skips_action() {
        let mut input = request();
        input.truncate(input.len() - 1);
        let mut child = new_child(input, Recorder::returning(Ok(0)));
        let result = child.run();
        assert_eq!(result, Err(Error::InvalidArgument));
        assert!(child.action().calls.is_empty());
        assert!(child.output().is_empty());
        assert_eq!(exit_code(&result), EXIT_FAILURE);
    }

    #[test]
    fn failed_action_writes_nothing() {
        let mut child = new_child(
            request(),
            Recorder::returning(Err(Error::PrivilegedActionFailed(1))),
        );
        assert_eq!(child.run(), Err(Error::PrivilegedActionFailed(1)));
        assert_eq!(child.action().calls.len(), 1);
        assert!(child.output().is_empty());
    }

    #[test]
    fn oversized_request() {
        let mut input = request();
        input.resize(IN_BUF_SIZE + 1, 0);
        let mut child = new_child(input, Recorder::returning(Ok(0)));
        assert_eq!(child.run(), Err(Error::InvalidArgument));
        assert!(child.action().calls.is_empty());

        // Trailing padding up to the limit is fine.
        let mut input = request();
        input.resize(IN_BUF_SIZE, 0);
        let mut child = new_child(input, Recorder::returning(Ok(0)));
        assert_eq!(child.run(), Ok(()));
    }

    #[test]
    fn reads_past_short_and_interrupted_reads() {
        let mut input = Flaky {
            data: request(),
            pos: 0,
            interrupt: false,
        };
        assert_eq!(read_request(&mut input, IN_BUF_SIZE), Ok(request()));
    }

    #[test]
    fn short_write_is_fatal() {
        let mut out = Stingy {
            budget: 2,
            data: Vec::new(),
        };
        assert_eq!(
            write_response(&mut out, &[0, 0, 0, 0]),
            Err(Error::ShortWrite {
                expected: 4,
                written: 2
            })
        );

        let mut child = Child::new(
            ChildConfig::default(),
            Cursor::new(request()),
            Stingy {
                budget: 3,
                data: Vec::new(),
            },
            Recorder::returning(Ok(0)),
        );
        assert_eq!(
            child.run(),
            Err(Error::ShortWrite {
                expected: 4,
                written: 3
            })
        );
    }

    #[test]
    fn write_errors_propagate() {
        struct Broken;

        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::ErrorKind::BrokenPipe.into())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        assert_eq!(
            write_response(&mut Broken, &[0; 4]),
            Err(Error::Io(io::ErrorKind::BrokenPipe))
        );
    }
}
