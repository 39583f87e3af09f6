//! Forward-only DER byte cursor.
//!
//! This is not a general ASN.1 reader: it offers exactly the primitive reads
//! the fixed key grammars in [`crate::decoder`] need, each one bounds-checked
//! against the remaining buffer before anything is copied.

use zeroize::Zeroizing;

/// DER tag bytes used by the key grammars.
pub mod tag {
    /// `INTEGER`
    pub const INTEGER: u8 = 0x02;
    /// `BIT STRING`
    pub const BIT_STRING: u8 = 0x03;
    /// `NULL`
    pub const NULL: u8 = 0x05;
    /// `OBJECT IDENTIFIER`
    pub const OBJECT_IDENTIFIER: u8 = 0x06;
    /// Constructed `SEQUENCE`
    pub const SEQUENCE: u8 = 0x30;
}

/// Long-form length with one length byte following.
pub const LONG_FORM_1: u8 = 0x81;

/// Long-form length with two length bytes following.
pub const LONG_FORM_2: u8 = 0x82;

/// Cursor errors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// Fewer bytes remain than the read asked for.
    UnexpectedEndOfData,

    /// Length lead byte is indefinite (`0x80`) or needs three or more bytes.
    UnsupportedLength {
        /// The offending lead byte.
        lead: u8,
    },

    /// Relative seek would leave the buffer.
    SeekOutOfBounds,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::UnexpectedEndOfData => write!(f, "unexpected end of DER data"),
            Error::UnsupportedLength { lead } => {
                write!(f, "unsupported DER length lead byte 0x{lead:02x}")
            }
            Error::SeekOutOfBounds => write!(f, "seek out of bounds"),
        }
    }
}

impl std::error::Error for Error {}

/// Result type for cursor reads.
pub type Result<T> = core::result::Result<T, Error>;

/// Bounds-checked reader over an owned DER buffer.
///
/// The buffer is zeroized when the cursor is dropped.
pub struct DerCursor {
    buf: Zeroizing<Vec<u8>>,
    pos: usize,
}

impl DerCursor {
    /// Create a cursor positioned at the start of `buf`.
    pub fn new(buf: impl Into<Vec<u8>>) -> Self {
        Self {
            buf: Zeroizing::new(buf.into()),
            pos: 0,
        }
    }

    /// Current offset into the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether every byte has been read.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = *self.buf.get(self.pos).ok_or(Error::UnexpectedEndOfData)?;
        self.pos += 1;
        Ok(byte)
    }

    /// Read two bytes as a big-endian `u16`.
    pub fn read_u16_be(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read exactly `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&[u8]> {
        if n > self.remaining() {
            return Err(Error::UnexpectedEndOfData);
        }

        let start = self.pos;
        self.pos += n;
        Ok(&self.buf[start..self.pos])
    }

    /// Move the position by `delta` bytes.
    ///
    /// Only used to step back over a single lookahead byte.
    pub fn seek_relative(&mut self, delta: isize) -> Result<()> {
        let pos = self
            .pos
            .checked_add_signed(delta)
            .filter(|&pos| pos <= self.buf.len())
            .ok_or(Error::SeekOutOfBounds)?;
        self.pos = pos;
        Ok(())
    }

    /// Decode a DER length field.
    ///
    /// Short form (`0x00..=0x7F`) is the length itself, `0x81` takes one
    /// following byte and `0x82` two, high byte first. Anything longer does
    /// not occur in keys of up to 16-bit field sizes and is rejected.
    pub fn read_der_length(&mut self) -> Result<usize> {
        match self.read_u8()? {
            lead @ 0x00..=0x7F => Ok(usize::from(lead)),
            LONG_FORM_1 => Ok(usize::from(self.read_u8()?)),
            LONG_FORM_2 => Ok(usize::from(self.read_u16_be()?)),
            lead => Err(Error::UnsupportedLength { lead }),
        }
    }

    /// Skip `0x00` bytes, leaving the cursor on the first non-zero byte.
    ///
    /// Returns how many bytes were skipped. Running off the end of the
    /// buffer while still reading zeros is an error.
    pub fn skip_leading_zero_padding(&mut self) -> Result<usize> {
        let mut skipped = 0;
        while self.read_u8()? == 0x00 {
            skipped += 1;
        }
        self.seek_relative(-1)?;
        Ok(skipped)
    }
}

impl core::fmt::Debug for DerCursor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DerCursor")
            .field("len", &self.buf.len())
            .field("pos", &self.pos)
            .finish_non_exhaustive()
    }
}
