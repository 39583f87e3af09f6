use super::{run, IntegerEncoding, Mismatch, MismatchReason, Step};
use crate::{
    der::DerCursor,
    errors::{Error, Result},
    key::{KeyField, RsaPrivateKeyFields},
};

const fn unsigned(field: KeyField) -> Step {
    Step::Integer {
        field,
        encoding: IntegerEncoding::Unsigned,
    }
}

/// Grammar for a two-prime PKCS#1 `RSAPrivateKey`:
///
/// ```text
/// RSAPrivateKey ::= SEQUENCE {
///     version           Version,
///     modulus           INTEGER,  -- n
///     publicExponent    INTEGER,  -- e
///     privateExponent   INTEGER,  -- d
///     prime1            INTEGER,  -- p
///     prime2            INTEGER,  -- q
///     exponent1         INTEGER,  -- d mod (p-1)
///     exponent2         INTEGER,  -- d mod (q-1)
///     coefficient       INTEGER,  -- (inverse of q) mod p
/// }
/// ```
pub const RSA_PRIVATE_KEY: &[Step] = &[
    Step::Sequence,
    Step::Version,
    unsigned(KeyField::Modulus),
    unsigned(KeyField::PublicExponent),
    unsigned(KeyField::PrivateExponent),
    unsigned(KeyField::Prime1),
    unsigned(KeyField::Prime2),
    unsigned(KeyField::Exponent1),
    unsigned(KeyField::Exponent2),
    unsigned(KeyField::Coefficient),
];

/// Decode a DER-encoded PKCS#1 RSA private key.
///
/// All eight integer components are returned with their leading zero
/// bytes removed. Any deviation from the grammar is an error; no partially
/// decoded key is ever returned.
pub fn decode_private_key(der: impl Into<Vec<u8>>) -> Result<RsaPrivateKeyFields> {
    let mut cursor = DerCursor::new(der);
    let mut extracted = run(RSA_PRIVATE_KEY, &mut cursor).map_err(|mismatch| {
        tracing::debug!(
            step = %mismatch.step,
            offset = mismatch.offset,
            reason = ?mismatch.reason,
            "rejecting RSA private key"
        );
        private_key_error(mismatch)
    })?;

    Ok(RsaPrivateKeyFields {
        modulus: extracted.take(KeyField::Modulus),
        public_exponent: extracted.take(KeyField::PublicExponent),
        private_exponent: extracted.take(KeyField::PrivateExponent),
        prime1: extracted.take(KeyField::Prime1),
        prime2: extracted.take(KeyField::Prime2),
        exponent1: extracted.take(KeyField::Exponent1),
        exponent2: extracted.take(KeyField::Exponent2),
        coefficient: extracted.take(KeyField::Coefficient),
    })
}

fn private_key_error(mismatch: Mismatch) -> Error {
    match (mismatch.step, mismatch.reason) {
        (_, MismatchReason::Truncated) => Error::TruncatedKey,
        (_, MismatchReason::UnsupportedLength) => Error::UnsupportedLength,
        (Step::Version, _) => Error::UnsupportedKeyVersion,
        (Step::Integer { field, .. }, MismatchReason::UnexpectedTag(tag)) => {
            Error::UnexpectedTag { field, tag }
        }
        (Step::Integer { field, .. }, MismatchReason::EmptyInteger) => {
            Error::EmptyInteger { field }
        }
        _ => Error::MalformedKeyHeader,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    // p = 2^32 + 15, q = 2^32 + 61, e = 65537
    const TOY_KEY: [u8; 64] = hex!(
        "30 3e 02 01 00"
        "02 09 01 00 00 00 4c 00 00 03 93"
        "02 03 01 00 01"
        "02 08 02 3c fd c3 a7 de 58 29"
        "02 05 01 00 00 00 0f"
        "02 05 01 00 00 00 3d"
        "02 05 00 88 88 77 7f"
        "02 04 21 92 de 75"
        "02 04 5e 9b d3 80"
    );

    fn long_form(short: &[u8]) -> Vec<u8> {
        let mut der = vec![0x30, 0x81];
        der.extend_from_slice(&short[1..]);
        der
    }

    #[test]
    fn test_decode_toy_key() {
        let fields = decode_private_key(long_form(&TOY_KEY)).unwrap();

        assert_eq!(fields.modulus, hex!("01 00 00 00 4c 00 00 03 93"));
        assert_eq!(fields.public_exponent, hex!("01 00 01"));
        assert_eq!(fields.private_exponent, hex!("02 3c fd c3 a7 de 58 29"));
        assert_eq!(fields.prime1, hex!("01 00 00 00 0f"));
        assert_eq!(fields.prime2, hex!("01 00 00 00 3d"));
        assert_eq!(fields.exponent1, hex!("88 88 77 7f"));
        assert_eq!(fields.exponent2, hex!("21 92 de 75"));
        assert_eq!(fields.coefficient, hex!("5e 9b d3 80"));
        assert_eq!(fields.modulus_byte_length(), 9);
    }

    #[test]
    fn test_decode_two_byte_sequence_length() {
        let mut der = vec![0x30, 0x82, 0x00];
        der.extend_from_slice(&TOY_KEY[1..]);

        let fields = decode_private_key(der).unwrap();
        assert_eq!(fields.coefficient, hex!("5e 9b d3 80"));
    }

    #[test]
    fn test_short_form_sequence_is_malformed() {
        assert!(matches!(
            decode_private_key(TOY_KEY.to_vec()),
            Err(Error::MalformedKeyHeader)
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let mut der = long_form(&TOY_KEY);
        der[5] = 0x01;
        assert!(matches!(
            decode_private_key(der),
            Err(Error::UnsupportedKeyVersion)
        ));

        let mut der = long_form(&TOY_KEY);
        der[4] = 0x02;
        assert!(matches!(
            decode_private_key(der),
            Err(Error::UnsupportedKeyVersion)
        ));
    }

    #[test]
    fn test_unexpected_tag() {
        let mut der = long_form(&TOY_KEY);
        // publicExponent tag
        der[17] = 0x04;
        assert!(matches!(
            decode_private_key(der),
            Err(Error::UnexpectedTag {
                field: KeyField::PublicExponent,
                tag: 0x04
            })
        ));
    }

    #[test]
    fn test_unsupported_length() {
        let mut der = long_form(&TOY_KEY);
        // modulus length
        der[7] = 0x83;
        assert!(matches!(
            decode_private_key(der),
            Err(Error::UnsupportedLength)
        ));
    }

    #[test]
    fn test_truncated_everywhere() {
        let der = long_form(&TOY_KEY);
        for len in 0..der.len() {
            assert!(
                matches!(decode_private_key(&der[..len]), Err(Error::TruncatedKey)),
                "length {len}"
            );
        }
    }

    #[test]
    fn test_empty_blob() {
        assert!(matches!(
            decode_private_key(Vec::new()),
            Err(Error::TruncatedKey)
        ));
    }
}
