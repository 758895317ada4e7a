//! Decoding of SRV query replies.
//!
//! [`parse_srv_reply`] turns a raw DNS response into the list of SRV records in its *Answer*
//! section. The reply comes straight off the network, so every read goes through a bounds-checked
//! [`Cursor`] and any inconsistency rejects the whole message.

use std::fmt;

use crate::{
    packet::{
        cursor::Cursor,
        name::{CompressedNames, NameExpander},
        Class, Header, Type, HEADER_SIZE, QUESTION_FIXED_SIZE, RR_FIXED_SIZE,
    },
    Error,
};

/// Size of the fixed SRV RDATA fields preceding the target name (priority, weight, port).
const SRV_FIXED_SIZE: usize = 6;

/// A service location from an SRV record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SrvRecord {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    /// Target host, without the trailing dot. `""` if the record was the root domain, which
    /// means the service is decidedly not available.
    pub host: String,
}

impl fmt::Display for SrvRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.priority, self.weight, self.port, self.host
        )
    }
}

/// The SRV records of a successfully decoded reply, in message order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SrvReply {
    records: Vec<SrvRecord>,
    answer_count: u16,
}

impl SrvReply {
    /// Returns the decoded SRV records.
    #[inline]
    pub fn records(&self) -> &[SrvRecord] {
        &self.records
    }

    /// Returns the number of decoded SRV records.
    ///
    /// This can be less than [`SrvReply::answer_count`] when the reply carried other record types
    /// (like the `CNAME` chain leading to the SRV RRset).
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the raw *Answer* section count from the message header.
    #[inline]
    pub fn answer_count(&self) -> u16 {
        self.answer_count
    }

    pub fn into_records(self) -> Vec<SrvRecord> {
        self.records
    }
}

impl IntoIterator for SrvReply {
    type Item = SrvRecord;
    type IntoIter = std::vec::IntoIter<SrvRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a SrvReply {
    type Item = &'a SrvRecord;
    type IntoIter = std::slice::Iter<'a, SrvRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Decodes the SRV records from the *Answer* section of `msg`.
///
/// Equivalent to [`parse_srv_reply_with`] using [`CompressedNames`].
pub fn parse_srv_reply(msg: &[u8]) -> Result<SrvReply, Error> {
    parse_srv_reply_with(msg, &CompressedNames)
}

/// Decodes the SRV records from a multicast DNS reply.
///
/// Like [`parse_srv_reply`], except that the cache-flush bit in the class field of each answer is
/// ignored.
pub fn parse_mdns_srv_reply(msg: &[u8]) -> Result<SrvReply, Error> {
    decode(msg, &CompressedNames, ClassMatch::IgnoreMdnsFlag)
}

/// Decodes the SRV records from the *Answer* section of `msg`, expanding names with `names`.
///
/// The message must contain exactly one question. Answers that aren't `IN SRV` are skipped,
/// and the class has to be exactly `IN`.
///
/// # Errors
///
/// - [`Error::NoData`] if the message is well-formed but has no answers.
/// - [`Error::BadResponse`] if the message is malformed in any way, including names that fail to
///   expand.
/// - [`Error::OutOfMemory`] if the result list could not be allocated.
///
/// Nothing decoded before an error is returned.
pub fn parse_srv_reply_with<N: NameExpander>(msg: &[u8], names: &N) -> Result<SrvReply, Error> {
    decode(msg, names, ClassMatch::Exact)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassMatch {
    Exact,
    IgnoreMdnsFlag,
}

fn decode<N: NameExpander>(
    msg: &[u8],
    names: &N,
    classes: ClassMatch,
) -> Result<SrvReply, Error> {
    if msg.len() < HEADER_SIZE {
        return Err(Error::BadResponse);
    }

    let mut c = Cursor::new(msg);
    let header: Header = c.read_obj().map_err(bad_response)?;
    log::trace!("header: {:?}", header);

    if header.question_count() != 1 {
        log::debug!(
            "reply has {} questions, expected exactly 1",
            header.question_count()
        );
        return Err(Error::BadResponse);
    }
    let answer_count = header.answer_count();
    if answer_count == 0 {
        return Err(Error::NoData);
    }
    if header.is_truncated() {
        log::debug!("reply is truncated, answer list may be incomplete");
    }

    let (qname, len) = names
        .expand_name(msg, c.position())
        .map_err(bad_response)?;
    c.skip(len).map_err(bad_response)?;
    c.skip(QUESTION_FIXED_SIZE).map_err(bad_response)?;
    log::trace!("question: {}", qname);

    // The answer count is only an upper bound on the number of SRV records.
    let mut records = Vec::new();
    records
        .try_reserve_exact(usize::from(answer_count))
        .map_err(|_| Error::OutOfMemory)?;

    for _ in 0..answer_count {
        if let Some(record) = read_answer(&mut c, names, classes)? {
            log::trace!("SRV {}", record);
            records.push(record);
        }
    }

    log::debug!(
        "decoded {} SRV records from {} answers",
        records.len(),
        answer_count
    );

    Ok(SrvReply {
        records,
        answer_count,
    })
}

/// Reads one resource record, leaving `c` at the start of the next one.
///
/// Returns `None` for records that aren't `IN SRV`.
fn read_answer<N: NameExpander>(
    c: &mut Cursor<'_>,
    names: &N,
    classes: ClassMatch,
) -> Result<Option<SrvRecord>, Error> {
    let msg = c.buf();
    let (_owner, len) = names.expand_name(msg, c.position()).map_err(bad_response)?;
    c.skip(len).map_err(bad_response)?;

    if c.remaining() < RR_FIXED_SIZE {
        return Err(Error::BadResponse);
    }
    let type_ = Type(c.read_u16_be()?);
    let mut class = Class(c.read_u16_be()?);
    if classes == ClassMatch::IgnoreMdnsFlag {
        class = class.without_mdns_flag();
    }
    let _ttl = c.read_u32_be()?;
    let rdlength = usize::from(c.read_u16_be()?);

    // Step over the whole RDATA before looking at it, so a record we don't care about can never
    // throw off the position of the next one.
    let mut rdata = c.split_off(rdlength).map_err(bad_response)?;

    if type_ != Type::SRV || class != Class::IN {
        log::trace!("skipping {} {} record ({} bytes)", class, type_, rdlength);
        return Ok(None);
    }

    if rdlength < SRV_FIXED_SIZE {
        return Err(Error::BadResponse);
    }
    let priority = rdata.read_u16_be()?;
    let weight = rdata.read_u16_be()?;
    let port = rdata.read_u16_be()?;

    // Expand against the full message (the target may be compressed), but it has to end within
    // the RDATA.
    let (target, len) = names
        .expand_name(msg, rdata.position())
        .map_err(bad_response)?;
    rdata.skip(len).map_err(bad_response)?;

    Ok(Some(SrvRecord {
        priority,
        weight,
        port,
        host: target.to_host_string(),
    }))
}

fn bad_response(e: Error) -> Error {
    log::debug!("malformed reply: {}", e);
    Error::BadResponse
}
