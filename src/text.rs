//! Text encoding applied to content before signing and encryption, and to
//! decrypted plaintext.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

use crate::errors::{Error, Result};

/// A character encoding from the WHATWG Encoding Standard.
///
/// Unlike the WHATWG encoders, which fall back to UTF-8 for the UTF-16
/// encodings and substitute numeric character references for unmappable
/// characters, encoding here is exact: UTF-16 produces UTF-16 code units and
/// unmappable characters are an error. Decoding never substitutes
/// replacement characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextEncoding(&'static Encoding);

impl TextEncoding {
    /// UTF-8.
    pub const UTF_8: Self = Self(UTF_8);

    /// Wrap an `encoding_rs` encoding.
    pub const fn new(encoding: &'static Encoding) -> Self {
        Self(encoding)
    }

    /// Look up an encoding by WHATWG label, e.g. `"utf-8"`, `"gbk"` or
    /// `"latin1"`. Labels are matched case-insensitively.
    pub fn for_label(label: &str) -> Result<Self> {
        Encoding::for_label(label.trim().as_bytes())
            .map(Self)
            .ok_or_else(|| Error::UnknownEncoding(label.into()))
    }

    /// Canonical name of the encoding.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// The wrapped `encoding_rs` encoding.
    pub fn as_encoding(&self) -> &'static Encoding {
        self.0
    }

    /// Encode `text` into bytes.
    pub fn encode<'a>(&self, text: &'a str) -> Result<Cow<'a, [u8]>> {
        if self.0 == UTF_16LE {
            return Ok(Cow::Owned(
                text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            ));
        }
        if self.0 == UTF_16BE {
            return Ok(Cow::Owned(
                text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            ));
        }

        let (bytes, used, had_errors) = self.0.encode(text);
        if had_errors || used != self.0 {
            return Err(Error::UnmappableText {
                encoding: self.name(),
            });
        }

        Ok(bytes)
    }

    /// Decode `bytes` into a string.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        self.0
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(Cow::into_owned)
            .ok_or(Error::MalformedText {
                encoding: self.name(),
            })
    }
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self::UTF_8
    }
}

impl From<&'static Encoding> for TextEncoding {
    fn from(encoding: &'static Encoding) -> Self {
        Self(encoding)
    }
}

impl core::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
