//! SRV lookups over UDP.

use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
    time::Duration,
};

use crate::{
    hex::Hex,
    packet::{cursor::Cursor, encoder::encode_srv_query, name::DomainName, Header, RCode},
    srv::{parse_srv_reply, SrvReply},
    Error, DNS_BUFFER_SIZE,
};

/// A simple, synchronous, non-recursive DNS stub resolver for SRV records.
pub struct SyncResolver {
    servers: Vec<SocketAddr>,
    sock: UdpSocket,
}

impl SyncResolver {
    const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

    /// Creates a new resolver that will query the given server.
    pub fn new(server: SocketAddr) -> io::Result<Self> {
        let bind_addr: SocketAddr = if server.is_ipv6() {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        };
        let mut this = Self {
            servers: vec![server],
            sock: UdpSocket::bind(bind_addr)?,
        };
        this.set_timeout(Self::DEFAULT_TIMEOUT)?;
        Ok(this)
    }

    /// Adds another server to be queried.
    ///
    /// [`SyncResolver::resolve_srv`] sends the query to every server, and returns the first usable
    /// reply. Servers answering with an error other than `NXDOMAIN` are ignored, so a failing
    /// server doesn't hide the answer of another one.
    ///
    /// # Panics
    ///
    /// All servers must match the address family of the first server passed to
    /// [`SyncResolver::new`], otherwise this method will panic.
    pub fn add_server(&mut self, server: SocketAddr) {
        assert_eq!(
            self.servers[0].is_ipv4(),
            server.is_ipv4(),
            "server families must match",
        );
        self.servers.push(server);
    }

    /// Sets the timeout for individual receive operations.
    ///
    /// Replies that don't match the outstanding query are ignored, but still reset the timeout.
    pub fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.sock.set_read_timeout(Some(timeout))
    }

    /// Looks up the SRV records of `service`, a name like `_ldap._tcp.example.com`.
    ///
    /// A reply without answers results in an empty [`SrvReply`]. If no usable reply arrives in
    /// time, an error of kind [`io::ErrorKind::WouldBlock`] or [`io::ErrorKind::TimedOut`] is
    /// returned.
    pub fn resolve_srv(&mut self, service: &str) -> io::Result<SrvReply> {
        let name = DomainName::from_str(service)?;
        self.resolve_srv_domain(&name)
    }

    /// Looks up the SRV records of `name`.
    pub fn resolve_srv_domain(&mut self, name: &DomainName) -> io::Result<SrvReply> {
        let id = fastrand::u16(..);

        let mut send_buf = [0; DNS_BUFFER_SIZE];
        let query = encode_srv_query(&mut send_buf, name, id)?;
        log::trace!("resolving SRV '{}', raw query: {}", name, Hex(query));

        // FIXME: retransmit
        for addr in &self.servers {
            self.sock.send_to(query, addr)?;
        }

        loop {
            let mut recv_buf = [0; DNS_BUFFER_SIZE];
            let (len, addr) = self.sock.recv_from(&mut recv_buf)?;
            let recv = &recv_buf[..len];
            log::trace!("recv from {}: {}", addr, Hex(recv));

            if !self.servers.contains(&addr) {
                log::debug!("ignoring message from unknown peer {}", addr);
                continue;
            }
            let header = match reply_header(recv) {
                Some(header) if header.id() == id => header,
                _ => {
                    log::debug!("ignoring message from {} not answering query {}", addr, id);
                    continue;
                }
            };
            let rcode = header.rcode();
            if rcode != RCode::NO_ERROR && rcode != RCode::NX_DOMAIN {
                log::debug!("{} failed to answer query {}: {}", addr, id, rcode);
                continue;
            }

            match parse_srv_reply(recv) {
                Ok(reply) => return Ok(reply),
                Err(Error::NoData) => {
                    log::debug!("{} has no SRV records for '{}'", addr, name);
                    return Ok(SrvReply::default());
                }
                Err(e) => {
                    log::warn!("failed to decode response from {}: {}", addr, e);
                }
            }
        }
    }
}

/// Returns the header of a response message, or `None` if `msg` isn't a response.
fn reply_header(msg: &[u8]) -> Option<Header> {
    let header: Header = Cursor::new(msg).read_obj().ok()?;
    header.is_response().then_some(header)
}
