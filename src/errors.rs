//! Error types.

use crate::{decoder::Mismatch, der, key::KeyField};

/// Alias for [`core::result::Result`] with the `rsa-keyblob` crate's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// Outer SEQUENCE header is not a long-form `30 81`/`30 82` header.
    MalformedKeyHeader,

    /// Version field is not the two-prime version `0`.
    UnsupportedKeyVersion,

    /// Key blob ended in the middle of a field.
    TruncatedKey,

    /// DER length needs more than two length bytes, or is indefinite.
    UnsupportedLength,

    /// Integer field carried a tag other than `INTEGER`.
    UnexpectedTag {
        /// Field being decoded.
        field: KeyField,
        /// Tag byte found in its place.
        tag: u8,
    },

    /// Integer field has no content once its zero padding is removed.
    EmptyInteger {
        /// Field being decoded.
        field: KeyField,
    },

    /// Public key text was supplied but is not an RSA SubjectPublicKeyInfo.
    NotAPublicKey(Mismatch),

    /// The operation needs a key that was not supplied.
    MissingKeyMaterial,

    /// Plaintext does not fit into a single RSA block.
    PlaintextTooLarge,

    /// Ciphertext length is not a multiple of the RSA block size.
    CiphertextLengthInvalid,

    /// Decoded key components were rejected by the RSA primitive.
    InvalidKey(rsa::Error),

    /// RSA operation failed.
    Crypto(rsa::Error),

    /// Signing failed.
    Signature(signature::Error),

    /// Invalid Base64 input.
    Base64,

    /// Text contains characters the configured encoding cannot represent.
    UnmappableText {
        /// Name of the encoding.
        encoding: &'static str,
    },

    /// Bytes are not valid in the configured encoding.
    MalformedText {
        /// Name of the encoding.
        encoding: &'static str,
    },

    /// Encoding label is not known.
    UnknownEncoding(String),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::MalformedKeyHeader => write!(f, "malformed key header"),
            Error::UnsupportedKeyVersion => write!(f, "unsupported key version"),
            Error::TruncatedKey => write!(f, "truncated key"),
            Error::UnsupportedLength => write!(f, "unsupported DER length encoding"),
            Error::UnexpectedTag { field, tag } => {
                write!(f, "unexpected tag 0x{tag:02x} for {field}")
            }
            Error::EmptyInteger { field } => write!(f, "empty integer for {field}"),
            Error::NotAPublicKey(mismatch) => write!(f, "not an RSA public key: {mismatch}"),
            Error::MissingKeyMaterial => write!(f, "missing key material"),
            Error::PlaintextTooLarge => write!(f, "plaintext too large for one RSA block"),
            Error::CiphertextLengthInvalid => {
                write!(f, "ciphertext length is not a multiple of the block size")
            }
            Error::InvalidKey(err) => write!(f, "invalid key: {err}"),
            Error::Crypto(err) => write!(f, "RSA operation failed: {err}"),
            Error::Signature(err) => write!(f, "signing failed: {err}"),
            Error::Base64 => write!(f, "invalid Base64 input"),
            Error::UnmappableText { encoding } => {
                write!(f, "text cannot be represented in {encoding}")
            }
            Error::MalformedText { encoding } => write!(f, "malformed {encoding} text"),
            Error::UnknownEncoding(label) => write!(f, "unknown encoding label {label:?}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidKey(err) | Error::Crypto(err) => Some(err),
            Error::Signature(err) => Some(err),
            _ => None,
        }
    }
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        match err {
            der::Error::UnexpectedEndOfData | der::Error::SeekOutOfBounds => Error::TruncatedKey,
            der::Error::UnsupportedLength { .. } => Error::UnsupportedLength,
        }
    }
}

impl From<base64ct::Error> for Error {
    fn from(_: base64ct::Error) -> Error {
        Error::Base64
    }
}

impl From<rsa::Error> for Error {
    fn from(err: rsa::Error) -> Error {
        match err {
            rsa::Error::MessageTooLong => Error::PlaintextTooLarge,
            err => Error::Crypto(err),
        }
    }
}

impl From<signature::Error> for Error {
    fn from(err: signature::Error) -> Error {
        Error::Signature(err)
    }
}
