use std::fmt;

/// Hex dump of a byte slice for trace logs.
///
/// Payloads longer than [`Hex::MAX_DUMP`] bytes are cut off and suffixed with `...`, so that a
/// hostile peer can't make us write arbitrarily long log lines.
pub(crate) struct Hex<'a>(pub &'a [u8]);

impl Hex<'_> {
    pub(crate) const MAX_DUMP: usize = 512;
}

impl<'a> fmt::Display for Hex<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = &self.0[..self.0.len().min(Self::MAX_DUMP)];
        for byte in shown {
            write!(f, "{:02x}", byte)?;
        }
        if shown.len() < self.0.len() {
            f.write_str("...")?;
        }
        Ok(())
    }
}

/// Parses a hex string into bytes. ASCII whitespace is ignored, so fixtures can be laid out one
/// field per line.
#[cfg(test)]
pub(crate) fn parse(s: &str) -> Vec<u8> {
    let digits: Vec<u8> = s.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    assert!(digits.len() % 2 == 0, "odd number of hex digits");

    digits
        .chunks(2)
        .map(|pair| u8::from_str_radix(std::str::from_utf8(pair).unwrap(), 16).unwrap())
        .collect()
}
