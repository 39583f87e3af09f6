use base64ct::{Base64, Encoding};
use rsa::{traits::PrivateKeyParts, BigUint, RsaPrivateKey, RsaPublicKey};
use zeroize::{Zeroize, Zeroizing};

use crate::{
    decoder::{self, PublicKeyProbe},
    errors::{Error, Result},
};

/// Largest modulus, in bits, accepted on import.
pub const MAX_MODULUS_BITS: usize = 16384;

fn check_modulus_size(n: &BigUint) -> Result<()> {
    if n.bits() > MAX_MODULUS_BITS {
        return Err(Error::InvalidKey(rsa::Error::ModulusTooLarge));
    }
    Ok(())
}

/// The integer fields of a PKCS#1 `RSAPrivateKey`, in encoding order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum KeyField {
    /// `n`
    Modulus,
    /// `e`
    PublicExponent,
    /// `d`
    PrivateExponent,
    /// `p`
    Prime1,
    /// `q`
    Prime2,
    /// `d mod (p-1)`
    Exponent1,
    /// `d mod (q-1)`
    Exponent2,
    /// `(inverse of q) mod p`
    Coefficient,
}

impl KeyField {
    /// Number of fields.
    pub const COUNT: usize = 8;

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// ASN.1 field name as written in RFC 8017.
    pub fn name(self) -> &'static str {
        match self {
            KeyField::Modulus => "modulus",
            KeyField::PublicExponent => "publicExponent",
            KeyField::PrivateExponent => "privateExponent",
            KeyField::Prime1 => "prime1",
            KeyField::Prime2 => "prime2",
            KeyField::Exponent1 => "exponent1",
            KeyField::Exponent2 => "exponent2",
            KeyField::Coefficient => "coefficient",
        }
    }
}

impl core::fmt::Display for KeyField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw DER bytes of exactly one key.
///
/// A blob is consumed by the decode that reads it, and its bytes are
/// zeroized on drop.
pub struct KeyBlob(Zeroizing<Vec<u8>>);

impl KeyBlob {
    /// Decode Base64 key text.
    ///
    /// PEM armor lines must already be removed. ASCII whitespace, including
    /// the line breaks of a wrapped PEM body, is ignored.
    pub fn from_base64(text: &str) -> Result<Self> {
        let compact: Zeroizing<Vec<u8>> = Zeroizing::new(
            text.bytes()
                .filter(|b| !b.is_ascii_whitespace())
                .collect(),
        );
        Ok(Self(Zeroizing::new(Base64::decode_vec(
            core::str::from_utf8(&compact).map_err(|_| Error::Base64)?,
        )?)))
    }

    /// DER bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the blob holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode a PKCS#1 `RSAPrivateKey`.
    pub fn decode_private_key(self) -> Result<RsaPrivateKeyFields> {
        decoder::decode_private_key(self.into_inner())
    }

    /// Probe for an RSA `SubjectPublicKeyInfo`.
    pub fn probe_public_key(self) -> PublicKeyProbe {
        decoder::probe_public_key(self.into_inner())
    }

    fn into_inner(mut self) -> Vec<u8> {
        core::mem::take(&mut *self.0)
    }
}

impl From<Vec<u8>> for KeyBlob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }
}

impl From<&[u8]> for KeyBlob {
    fn from(bytes: &[u8]) -> Self {
        Self(Zeroizing::new(bytes.to_vec()))
    }
}

impl core::fmt::Debug for KeyBlob {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyBlob")
            .field("len", &self.0.len())
            .finish_non_exhaustive()
    }
}

/// Components of a PKCS#1 RSA private key.
///
/// Every component is an unsigned big-endian integer without leading zero
/// bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaPrivateKeyFields {
    /// `n`: RSA modulus.
    pub modulus: Vec<u8>,

    /// `e`: RSA public exponent.
    pub public_exponent: Vec<u8>,

    /// `d`: RSA private exponent.
    pub private_exponent: Vec<u8>,

    /// `p`: first prime factor of `n`.
    pub prime1: Vec<u8>,

    /// `q`: second prime factor of `n`.
    pub prime2: Vec<u8>,

    /// First exponent: `d mod (p-1)`.
    pub exponent1: Vec<u8>,

    /// Second exponent: `d mod (q-1)`.
    pub exponent2: Vec<u8>,

    /// CRT coefficient: `(inverse of q) mod p`.
    pub coefficient: Vec<u8>,
}

impl RsaPrivateKeyFields {
    /// Modulus size in bytes. Raw signatures and ciphertext blocks for this
    /// key have the same size.
    pub fn modulus_byte_length(&self) -> usize {
        self.modulus.len()
    }

    /// Get the public components of this key.
    pub fn public_key_fields(&self) -> RsaPublicKeyFields {
        RsaPublicKeyFields {
            modulus: self.modulus.clone(),
            public_exponent: self.public_exponent.clone(),
        }
    }

    /// Import the components into an RSA private key.
    ///
    /// The key is rebuilt from `n`, `e`, `d`, `p` and `q` and validated by the
    /// primitive. The decoded CRT values must then equal the ones the
    /// primitive derives.
    pub fn to_rsa_key(&self) -> Result<RsaPrivateKey> {
        let modulus = BigUint::from_bytes_be(&self.modulus);
        check_modulus_size(&modulus)?;

        let primes = vec![
            BigUint::from_bytes_be(&self.prime1),
            BigUint::from_bytes_be(&self.prime2),
        ];
        let key = RsaPrivateKey::from_components(
            modulus,
            BigUint::from_bytes_be(&self.public_exponent),
            BigUint::from_bytes_be(&self.private_exponent),
            primes,
        )
        .map_err(Error::InvalidKey)?;

        let exponent1 = BigUint::from_bytes_be(&self.exponent1);
        let exponent2 = BigUint::from_bytes_be(&self.exponent2);
        if key.dp() != Some(&exponent1) || key.dq() != Some(&exponent2) {
            tracing::debug!("decoded CRT exponents do not match the key");
            return Err(Error::InvalidKey(rsa::Error::InvalidExponent));
        }
        if key.crt_coefficient() != Some(BigUint::from_bytes_be(&self.coefficient)) {
            tracing::debug!("decoded CRT coefficient does not match the key");
            return Err(Error::InvalidKey(rsa::Error::InvalidCoefficient));
        }

        tracing::debug!(bits = self.modulus_byte_length() * 8, "imported RSA private key");
        Ok(key)
    }
}

impl Zeroize for RsaPrivateKeyFields {
    fn zeroize(&mut self) {
        self.modulus.zeroize();
        self.public_exponent.zeroize();
        self.private_exponent.zeroize();
        self.prime1.zeroize();
        self.prime2.zeroize();
        self.exponent1.zeroize();
        self.exponent2.zeroize();
        self.coefficient.zeroize();
    }
}

impl Drop for RsaPrivateKeyFields {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl core::fmt::Debug for RsaPrivateKeyFields {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RsaPrivateKeyFields")
            .field("modulus_byte_length", &self.modulus_byte_length())
            .finish_non_exhaustive()
    }
}

/// Components of an RSA public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RsaPublicKeyFields {
    /// `n`: RSA modulus.
    pub modulus: Vec<u8>,

    /// `e`: RSA public exponent.
    pub public_exponent: Vec<u8>,
}

impl RsaPublicKeyFields {
    /// Modulus size in bytes.
    pub fn modulus_byte_length(&self) -> usize {
        self.modulus.len()
    }

    /// Import the components into an RSA public key of at most
    /// [`MAX_MODULUS_BITS`].
    pub fn to_rsa_key(&self) -> Result<RsaPublicKey> {
        let key = RsaPublicKey::new_with_max_size(
            BigUint::from_bytes_be(&self.modulus),
            BigUint::from_bytes_be(&self.public_exponent),
            MAX_MODULUS_BITS,
        )
        .map_err(Error::InvalidKey)?;

        tracing::debug!(bits = self.modulus_byte_length() * 8, "imported RSA public key");
        Ok(key)
    }
}
