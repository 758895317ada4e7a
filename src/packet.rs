//! DNS message building blocks: the bounds-checked [`cursor::Cursor`], the fixed header, record
//! types and classes, domain [`name`] expansion, and the SRV query [`encoder`].

#[macro_use]
mod macros;
pub mod cursor;
pub mod encoder;
pub mod name;

use core::fmt;

use bitflags::bitflags;

use crate::num::U16;

/// Size of the fixed DNS message header.
pub const HEADER_SIZE: usize = 12;

/// Size of the fixed part of a question entry following the name (`QTYPE` and `QCLASS`).
pub const QUESTION_FIXED_SIZE: usize = 4;

/// Size of the fixed part of a resource record following the owner name (`TYPE`, `CLASS`, `TTL`
/// and `RDLENGTH`).
pub const RR_FIXED_SIZE: usize = 10;

ffi_enum! {
    /// Resource Record types.
    ///
    /// Only the types this crate deals with, or is likely to log, are named. Everything else is
    /// still representable.
    pub enum Type: u16 {
        A = 1,
        NS = 2,
        CNAME = 5,
        SOA = 6,
        PTR = 12,
        MX = 15,
        TXT = 16,
        AAAA = 28,
        SRV = 33,
        NAPTR = 35,
        OPT = 41,
        RRSIG = 46,
    }
}

ffi_enum! {
    /// Resource Record classes.
    pub enum Class: u16 {
        /// The Internet.
        IN = 1,
        /// CSNET.
        CS = 2,
        /// Chaosnet.
        CH = 3,
        /// Hesiod (basically, an LDAP precursor).
        HS = 4,
        /// Only valid in questions.
        ANY = 255,
    }
}

impl Class {
    /// Top bit of the class field, used by mDNS as the cache-flush (in records) or
    /// unicast-response (in questions) bit.
    pub const MDNS_FLAG: u16 = 0x8000;

    /// Returns the class with the mDNS flag bit cleared.
    #[inline]
    pub fn without_mdns_flag(self) -> Self {
        Self(self.0 & !Self::MDNS_FLAG)
    }
}

ffi_enum! {
    /// Server response codes.
    pub enum RCode: u8 {
        NO_ERROR = 0,
        FORM_ERR = 1,
        SERV_FAIL = 2,
        NX_DOMAIN = 3,
        NOT_IMP = 4,
        REFUSED = 5,
    }
}

// Bit positions in the header flags are inverted, because RFC 1035 starts counting at the MSb.
const fn be_pos(pos: u16) -> u16 {
    15 - pos
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(transparent)]
    struct HeaderFlags: u16 {
        /// If set, the message is a response to a query. If unset, it is a query.
        const QR = 1 << be_pos(0);
        const OPCODE = 0b1111 << be_pos(4);
        /// Authoritative answer.
        const AA = 1 << be_pos(5);
        /// Set if the message was truncated to fit the transmission channel.
        const TC = 1 << be_pos(6);
        /// Recursion Desired.
        const RD = 1 << be_pos(7);
        /// Recursion Available.
        const RA = 1 << be_pos(8);
        const Z = 0b111 << be_pos(11);
        const RCODE = 0b1111;
    }
}

/// Packet header.
#[derive(Clone, Copy, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Header {
    id: U16,
    flags: U16,
    qdcount: U16,
    ancount: U16,
    nscount: U16,
    arcount: U16,
}

impl Header {
    fn flags(&self) -> HeaderFlags {
        HeaderFlags::from_bits_retain(self.flags.get())
    }

    fn modify_flags(&mut self, with: impl FnOnce(&mut HeaderFlags)) {
        let mut flags = self.flags();
        with(&mut flags);
        self.flags = flags.bits().into();
    }

    /// Returns the 16-bit message ID, copied by servers from the query to the response.
    #[inline]
    pub fn id(&self) -> u16 {
        self.id.get()
    }

    #[inline]
    pub fn set_id(&mut self, id: u16) {
        self.id = id.into();
    }

    #[inline]
    pub fn is_response(&self) -> bool {
        self.flags().contains(HeaderFlags::QR)
    }

    /// Returns whether the truncation flag is set.
    ///
    /// A truncated reply still decodes as far as its declared content fits, but the answer list
    /// is likely incomplete.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.flags().contains(HeaderFlags::TC)
    }

    pub fn set_recursion_desired(&mut self, rd: bool) {
        self.modify_flags(|f| f.set(HeaderFlags::RD, rd));
    }

    #[inline]
    pub fn is_recursion_desired(&self) -> bool {
        self.flags().contains(HeaderFlags::RD)
    }

    pub fn rcode(&self) -> RCode {
        RCode((self.flags().intersection(HeaderFlags::RCODE).bits()) as u8)
    }

    pub fn question_count(&self) -> u16 {
        self.qdcount.get()
    }

    pub fn answer_count(&self) -> u16 {
        self.ancount.get()
    }

    pub(crate) fn set_qdcount(&mut self, qdcount: u16) {
        self.qdcount = qdcount.into();
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("id", &self.id())
            .field("flags", &self.flags())
            .field("qdcount", &self.qdcount.get())
            .field("ancount", &self.ancount.get())
            .field("nscount", &self.nscount.get())
            .field("arcount", &self.arcount.get())
            .finish()
    }
}
