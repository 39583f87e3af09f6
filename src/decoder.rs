//! Table-driven decoding of RSA key blobs.
//!
//! Two fixed grammars are supported:
//!
//! - PKCS#1 `RSAPrivateKey` ([RFC8017 Appendix A.1.2]), via
//!   [`decode_private_key`], which fails hard.
//! - `SubjectPublicKeyInfo` wrapping a PKCS#1 `RSAPublicKey`
//!   ([RFC5280 § 4.1.2.7]), via [`probe_public_key`], which reports a
//!   missing key as [`PublicKeyProbe::Absent`] instead of an error.
//!
//! Each grammar is an ordered list of [`Step`]s run by a single
//! interpreter over a [`DerCursor`]. There is no backtracking: the first
//! step that does not match ends the decode and nothing decoded so far is
//! returned.
//!
//! [RFC8017 Appendix A.1.2]: https://datatracker.ietf.org/doc/html/rfc8017#appendix-A.1.2
//! [RFC5280 § 4.1.2.7]: https://datatracker.ietf.org/doc/html/rfc5280#section-4.1.2.7

mod private_key;
mod public_key;

pub use self::{
    private_key::{decode_private_key, RSA_PRIVATE_KEY},
    public_key::{
        probe_public_key, PublicKeyProbe, RSA_ENCRYPTION_ALGORITHM_ID, SUBJECT_PUBLIC_KEY_INFO,
    },
};

use zeroize::Zeroizing;

use crate::{
    der::{self, tag, DerCursor, LONG_FORM_1, LONG_FORM_2},
    key::KeyField,
};

/// How an `INTEGER` step reads its length and padding.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IntegerEncoding {
    /// Tag `02`, any supported length form, every leading zero byte
    /// stripped.
    Unsigned,

    /// `02 81 LL` or `02 82 HH LL` only; a single leading zero sign byte is
    /// stripped.
    LongFormSignPadded,

    /// Tag `02` and one short-form length byte; content kept as is.
    ShortForm,
}

/// One element of a fixed key grammar.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Step {
    /// `SEQUENCE` with a long-form length: `30 81 LL` or `30 82 HH LL`.
    Sequence,

    /// `INTEGER` version `0`: `02 01 00`.
    Version,

    /// The encoded `rsaEncryption` `AlgorithmIdentifier`.
    AlgorithmIdentifier,

    /// `BIT STRING` with a long-form length followed by a zero unused-bits
    /// byte.
    BitString,

    /// An `INTEGER` key component.
    Integer {
        /// Component this integer holds.
        field: KeyField,
        /// How the integer is laid out.
        encoding: IntegerEncoding,
    },
}

impl core::fmt::Display for Step {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Step::Sequence => f.write_str("SEQUENCE header"),
            Step::Version => f.write_str("version"),
            Step::AlgorithmIdentifier => f.write_str("algorithm identifier"),
            Step::BitString => f.write_str("BIT STRING header"),
            Step::Integer { field, .. } => write!(f, "{field}"),
        }
    }
}

/// Why a step did not match.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MismatchReason {
    /// The blob ended, or a declared length exceeds what is left.
    Truncated,

    /// Length encoding is indefinite or longer than two bytes.
    UnsupportedLength,

    /// The two-byte tag and length marker is not one the step accepts.
    UnexpectedHeader(u16),

    /// Single tag byte is not the one the step accepts.
    UnexpectedTag(u8),

    /// Fixed content differs from what the step expects.
    UnexpectedBytes,

    /// Integer has no content once its zero padding is removed.
    EmptyInteger,
}

/// Diagnostic for a grammar step that did not match.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Mismatch {
    /// Step being decoded.
    pub step: Step,

    /// Byte offset of the cursor when the mismatch was detected.
    pub offset: usize,

    /// What went wrong.
    pub reason: MismatchReason,
}

impl core::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} at offset {}: ", self.step, self.offset)?;
        match self.reason {
            MismatchReason::Truncated => f.write_str("truncated"),
            MismatchReason::UnsupportedLength => f.write_str("unsupported length"),
            MismatchReason::UnexpectedHeader(header) => {
                write!(f, "unexpected header 0x{header:04x}")
            }
            MismatchReason::UnexpectedTag(tag) => write!(f, "unexpected tag 0x{tag:02x}"),
            MismatchReason::UnexpectedBytes => f.write_str("unexpected content"),
            MismatchReason::EmptyInteger => f.write_str("empty integer"),
        }
    }
}

impl From<der::Error> for MismatchReason {
    fn from(err: der::Error) -> Self {
        match err {
            der::Error::UnexpectedEndOfData | der::Error::SeekOutOfBounds => {
                MismatchReason::Truncated
            }
            der::Error::UnsupportedLength { .. } => MismatchReason::UnsupportedLength,
        }
    }
}

/// Integer values collected while running a grammar, indexed by
/// [`KeyField`].
#[derive(Default)]
pub(crate) struct Extracted([Option<Zeroizing<Vec<u8>>>; KeyField::COUNT]);

impl Extracted {
    /// Take a field out. Only called for fields the grammar is known to
    /// contain, after the grammar ran to completion.
    pub(crate) fn take(&mut self, field: KeyField) -> Vec<u8> {
        self.0[field.index()]
            .take()
            .map(|mut value| core::mem::take(&mut *value))
            .unwrap_or_default()
    }
}

type StepResult<T> = core::result::Result<T, MismatchReason>;

/// Run `grammar` over `cursor`, collecting every integer it names.
pub(crate) fn run(
    grammar: &[Step],
    cursor: &mut DerCursor,
) -> core::result::Result<Extracted, Mismatch> {
    let mut extracted = Extracted::default();

    for &step in grammar {
        let offset = cursor.position();
        let result = match step {
            Step::Sequence => long_form_header(cursor, tag::SEQUENCE),
            Step::Version => version(cursor),
            Step::AlgorithmIdentifier => algorithm_identifier(cursor),
            Step::BitString => bit_string(cursor),
            Step::Integer { field, encoding } => integer(cursor, encoding).map(|value| {
                extracted.0[field.index()] = Some(value);
            }),
        };

        result.map_err(|reason| Mismatch {
            step,
            offset,
            reason,
        })?;
    }

    if !cursor.is_empty() {
        tracing::trace!(trailing = cursor.remaining(), "ignoring bytes after key grammar");
    }

    Ok(extracted)
}

/// `tag 81 LL` or `tag 82 HH LL`. The declared length must fit in what is
/// left of the blob.
fn long_form_header(cursor: &mut DerCursor, tag: u8) -> StepResult<()> {
    let header = cursor.read_u16_be()?;
    let len = match header {
        _ if header == u16::from_be_bytes([tag, LONG_FORM_1]) => usize::from(cursor.read_u8()?),
        _ if header == u16::from_be_bytes([tag, LONG_FORM_2]) => usize::from(cursor.read_u16_be()?),
        _ => return Err(MismatchReason::UnexpectedHeader(header)),
    };

    if len > cursor.remaining() {
        return Err(MismatchReason::Truncated);
    }

    Ok(())
}

fn version(cursor: &mut DerCursor) -> StepResult<()> {
    let header = cursor.read_u16_be()?;
    if header != u16::from_be_bytes([tag::INTEGER, 0x01]) {
        return Err(MismatchReason::UnexpectedHeader(header));
    }

    if cursor.read_u8()? != 0x00 {
        return Err(MismatchReason::UnexpectedBytes);
    }

    Ok(())
}

fn algorithm_identifier(cursor: &mut DerCursor) -> StepResult<()> {
    let bytes = cursor.read_bytes(RSA_ENCRYPTION_ALGORITHM_ID.len())?;
    if bytes != RSA_ENCRYPTION_ALGORITHM_ID {
        return Err(MismatchReason::UnexpectedBytes);
    }

    Ok(())
}

fn bit_string(cursor: &mut DerCursor) -> StepResult<()> {
    long_form_header(cursor, tag::BIT_STRING)?;

    // unused bits
    if cursor.read_u8()? != 0x00 {
        return Err(MismatchReason::UnexpectedBytes);
    }

    Ok(())
}

fn integer(cursor: &mut DerCursor, encoding: IntegerEncoding) -> StepResult<Zeroizing<Vec<u8>>> {
    let len = match encoding {
        IntegerEncoding::Unsigned => {
            let tag = cursor.read_u8()?;
            if tag != tag::INTEGER {
                return Err(MismatchReason::UnexpectedTag(tag));
            }

            let len = cursor.read_der_length()?;
            if len > cursor.remaining() {
                return Err(MismatchReason::Truncated);
            }

            let skipped = cursor.skip_leading_zero_padding()?;
            if skipped >= len {
                return Err(MismatchReason::EmptyInteger);
            }

            len - skipped
        }
        IntegerEncoding::LongFormSignPadded => {
            let header = cursor.read_u16_be()?;
            let mut len = match header {
                _ if header == u16::from_be_bytes([tag::INTEGER, LONG_FORM_1]) => {
                    usize::from(cursor.read_u8()?)
                }
                _ if header == u16::from_be_bytes([tag::INTEGER, LONG_FORM_2]) => {
                    usize::from(cursor.read_u16_be()?)
                }
                _ => return Err(MismatchReason::UnexpectedHeader(header)),
            };

            if len > cursor.remaining() {
                return Err(MismatchReason::Truncated);
            }

            if len > 0 {
                if cursor.read_u8()? == 0x00 {
                    len -= 1;
                } else {
                    cursor.seek_relative(-1)?;
                }
            }

            len
        }
        IntegerEncoding::ShortForm => {
            let tag = cursor.read_u8()?;
            if tag != tag::INTEGER {
                return Err(MismatchReason::UnexpectedTag(tag));
            }

            let len = usize::from(cursor.read_u8()?);
            if len >= 0x80 {
                return Err(MismatchReason::UnsupportedLength);
            }

            len
        }
    };

    if len == 0 {
        return Err(MismatchReason::EmptyInteger);
    }

    Ok(Zeroizing::new(cursor.read_bytes(len)?.to_vec()))
}
