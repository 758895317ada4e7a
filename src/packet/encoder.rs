//! DNS query encoder.

use super::{name::DomainName, Class, Header, Type};
use crate::Error;

/// Writes into a fixed buffer, remembering (instead of panicking) when it ran out of space.
pub(crate) struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
    trunc: bool,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            trunc: false,
        }
    }

    pub(crate) fn write_slice(&mut self, data: &[u8]) {
        let buf = &mut self.buf[self.pos..];
        if data.len() > buf.len() {
            self.trunc = true;
            let n = buf.len();
            buf.copy_from_slice(&data[..n]);
            self.pos += n;
        } else {
            buf[..data.len()].copy_from_slice(data);
            self.pos += data.len();
        }
    }

    pub(crate) fn write_obj<T: bytemuck::NoUninit>(&mut self, obj: T) {
        self.write_slice(bytemuck::bytes_of(&obj))
    }

    pub(crate) fn write_u8(&mut self, b: u8) {
        self.write_slice(&[b]);
    }

    pub(crate) fn write_u16(&mut self, v: u16) {
        self.write_slice(&v.to_be_bytes());
    }

    pub(crate) fn write_domain_name(&mut self, name: &DomainName) {
        for label in name.labels() {
            self.write_u8(label.as_bytes().len() as u8);
            self.write_slice(label.as_bytes());
        }
        // Implicit root label at the end.
        self.write_u8(0);
    }

    /// Returns the number of bytes written, or [`Error::Truncated`] if the buffer was too small.
    pub(crate) fn finish(self) -> Result<usize, Error> {
        if self.trunc {
            Err(Error::Truncated)
        } else {
            Ok(self.pos)
        }
    }
}

/// Writes a recursive query for the SRV records of `name` into `buf`, returning the encoded
/// message.
///
/// `name` is the full service name, e.g. `_ldap._tcp.example.com`.
pub fn encode_srv_query<'a>(
    buf: &'a mut [u8],
    name: &DomainName,
    id: u16,
) -> Result<&'a [u8], Error> {
    let mut header = Header::default();
    header.set_id(id);
    header.set_recursion_desired(true);
    header.set_qdcount(1);

    let mut w = Writer::new(buf);
    w.write_obj(header);
    w.write_domain_name(name);
    w.write_u16(Type::SRV.get());
    w.write_u16(Class::IN.get());
    let len = w.finish()?;
    Ok(&buf[..len])
}
