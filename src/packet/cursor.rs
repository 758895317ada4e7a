//! Bounds-checked reading over a borrowed byte buffer.
//!
//! Every read made by the SRV decoder and the frame codec goes through [`Cursor`], which checks
//! the requested width against the remaining bytes before touching the buffer. The position is
//! never advanced past the end of the buffer, and oversized requests fail with
//! [`Error::Truncated`] instead of panicking.

use std::mem::size_of;

use bytemuck::AnyBitPattern;

use crate::{
    num::{U16, U32},
    Error,
};

#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    /// The whole buffer. Kept around (instead of just the unread tail) because DNS compression
    /// pointers refer back to absolute offsets.
    full_buf: &'a [u8],
    /// The current read position. Invariant: `pos <= full_buf.len()`.
    pos: usize,
}

impl<'a> Cursor<'a> {
    #[inline]
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            full_buf: buf,
            pos: 0,
        }
    }

    /// Creates a cursor over `buf` positioned at `pos`.
    pub fn at(buf: &'a [u8], pos: usize) -> Result<Self, Error> {
        let mut this = Self::new(buf);
        this.set_position(pos)?;
        Ok(this)
    }

    /// Returns the whole underlying buffer, including already consumed bytes.
    #[inline]
    pub fn buf(&self) -> &'a [u8] {
        self.full_buf
    }

    /// Returns the bytes that have not been consumed yet.
    #[inline]
    pub fn rest(&self) -> &'a [u8] {
        &self.full_buf[self.pos..]
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Moves the cursor to an absolute position, which may be at most the buffer length.
    pub fn set_position(&mut self, pos: usize) -> Result<(), Error> {
        if pos > self.full_buf.len() {
            return Err(Error::Truncated);
        }
        self.pos = pos;
        Ok(())
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.full_buf.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Reads `len` bytes and advances past them.
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], Error> {
        let end = self.pos.checked_add(len).ok_or(Error::Truncated)?;
        match self.full_buf.get(self.pos..end) {
            Some(slice) => {
                self.pos = end;
                Ok(slice)
            }
            None => Err(Error::Truncated),
        }
    }

    /// Advances past `len` bytes without looking at them.
    pub fn skip(&mut self, len: usize) -> Result<(), Error> {
        self.read_slice(len).map(drop)
    }

    pub fn read_array<const LEN: usize>(&mut self) -> Result<[u8; LEN], Error> {
        let mut array = [0; LEN];
        array.copy_from_slice(self.read_slice(LEN)?);
        Ok(array)
    }

    /// Reads a plain-old-data object, such as the message [`Header`].
    ///
    /// [`Header`]: super::Header
    pub fn read_obj<T: AnyBitPattern>(&mut self) -> Result<T, Error> {
        let bytes = self.read_slice(size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    pub fn peek_u8(&self) -> Result<u8, Error> {
        self.full_buf.get(self.pos).copied().ok_or(Error::Truncated)
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        self.read_obj::<u8>()
    }

    pub fn read_u16_be(&mut self) -> Result<u16, Error> {
        Ok(self.read_obj::<U16>()?.get())
    }

    pub fn read_u32_be(&mut self) -> Result<u32, Error> {
        Ok(self.read_obj::<U32>()?.get())
    }

    /// Splits off another `Cursor` covering the next `len` bytes, and advances `self` past them.
    ///
    /// The returned cursor still sees everything before its start (so compression pointers keep
    /// working), but nothing after its end.
    pub fn split_off(&mut self, len: usize) -> Result<Cursor<'a>, Error> {
        let end = self.pos.checked_add(len).ok_or(Error::Truncated)?;
        if end > self.full_buf.len() {
            return Err(Error::Truncated);
        }
        let sub = Cursor {
            full_buf: &self.full_buf[..end],
            pos: self.pos,
        };
        self.pos = end;
        Ok(sub)
    }
}
