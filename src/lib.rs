//! Wire formats at the trust boundaries of an identity-management daemon.
//!
//! - [`srv`] decodes untrusted DNS replies into SRV records, and [`resolver`] performs the
//!   lookups that produce them.
//! - [`frame`] and [`child`] implement the request/response protocol spoken between the daemon
//!   and its short-lived privileged helper.

#![forbid(unsafe_code)]

mod error;
mod hex;
mod num;

pub mod child;
pub mod frame;
pub mod packet;
pub mod resolver;
pub mod srv;

pub use error::Error;

/// Size of unicast DNS message buffers.
///
/// Unicast DNS messages over UDP are limited to 512 Bytes.
pub const DNS_BUFFER_SIZE: usize = 512;

/// Maximum size of a request sent to the privileged helper.
pub const IN_BUF_SIZE: usize = 512;
