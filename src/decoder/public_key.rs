use super::{run, IntegerEncoding, Mismatch, Step};
use crate::{
    der::{tag, DerCursor},
    errors::{Error, Result},
    key::{KeyField, RsaPublicKeyFields},
};

/// Encoded `AlgorithmIdentifier` for `rsaEncryption` (1.2.840.113549.1.1.1)
/// with `NULL` parameters.
pub const RSA_ENCRYPTION_ALGORITHM_ID: [u8; 15] = [
    tag::SEQUENCE,
    0x0d,
    tag::OBJECT_IDENTIFIER,
    0x09,
    0x2a,
    0x86,
    0x48,
    0x86,
    0xf7,
    0x0d,
    0x01,
    0x01,
    0x01,
    tag::NULL,
    0x00,
];

/// Grammar for an RSA `SubjectPublicKeyInfo`:
///
/// ```text
/// SubjectPublicKeyInfo ::= SEQUENCE {
///     algorithm         AlgorithmIdentifier,  -- rsaEncryption, NULL
///     subjectPublicKey  BIT STRING {
///         RSAPublicKey ::= SEQUENCE {
///             modulus           INTEGER,  -- n
///             publicExponent    INTEGER,  -- e
///         }
///     }
/// }
/// ```
pub const SUBJECT_PUBLIC_KEY_INFO: &[Step] = &[
    Step::Sequence,
    Step::AlgorithmIdentifier,
    Step::BitString,
    Step::Sequence,
    Step::Integer {
        field: KeyField::Modulus,
        encoding: IntegerEncoding::LongFormSignPadded,
    },
    Step::Integer {
        field: KeyField::PublicExponent,
        encoding: IntegerEncoding::ShortForm,
    },
];

/// Outcome of probing a blob for an RSA public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKeyProbe {
    /// The blob is an RSA `SubjectPublicKeyInfo`.
    Found(RsaPublicKeyFields),

    /// The blob is not an RSA `SubjectPublicKeyInfo`; the first step that
    /// did not match is kept as a diagnostic.
    Absent(Mismatch),
}

impl PublicKeyProbe {
    /// Whether a key was found.
    pub fn is_found(&self) -> bool {
        matches!(self, PublicKeyProbe::Found(_))
    }

    /// The decoded key, if any.
    pub fn found(self) -> Option<RsaPublicKeyFields> {
        match self {
            PublicKeyProbe::Found(fields) => Some(fields),
            PublicKeyProbe::Absent(_) => None,
        }
    }

    /// The decoded key, or [`Error::NotAPublicKey`] carrying the diagnostic.
    pub fn into_result(self) -> Result<RsaPublicKeyFields> {
        match self {
            PublicKeyProbe::Found(fields) => Ok(fields),
            PublicKeyProbe::Absent(mismatch) => Err(Error::NotAPublicKey(mismatch)),
        }
    }
}

/// Probe a DER blob for an RSA `SubjectPublicKeyInfo`.
///
/// Input that does not follow the grammar is not an error: it yields
/// [`PublicKeyProbe::Absent`], so callers can try a blob that may hold some
/// other kind of key.
pub fn probe_public_key(der: impl Into<Vec<u8>>) -> PublicKeyProbe {
    let mut cursor = DerCursor::new(der);
    match run(SUBJECT_PUBLIC_KEY_INFO, &mut cursor) {
        Ok(mut extracted) => PublicKeyProbe::Found(RsaPublicKeyFields {
            modulus: extracted.take(KeyField::Modulus),
            public_exponent: extracted.take(KeyField::PublicExponent),
        }),
        Err(mismatch) => {
            tracing::debug!(
                step = %mismatch.step,
                offset = mismatch.offset,
                reason = ?mismatch.reason,
                "no RSA public key in blob"
            );
            PublicKeyProbe::Absent(mismatch)
        }
    }
}
