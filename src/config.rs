//! Helper configuration.

use crate::{errors::Result, helper::SignatureAlgorithm, text::TextEncoding};

/// Settings for building an [`RsaHelper`](crate::RsaHelper).
///
/// With the `serde` feature the algorithm is written as `"RSA"` for
/// SHA-1 and `"RSA2"` for SHA-256. The private key text is left out of
/// `Debug` output.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Signature algorithm.
    pub algorithm: SignatureAlgorithm,

    /// WHATWG label of the text encoding.
    pub encoding: String,

    /// Base64 PKCS#1 DER private key.
    pub private_key: Option<String>,

    /// Base64 `SubjectPublicKeyInfo` DER public key.
    pub public_key: Option<String>,
}

impl Config {
    /// Resolve [`Config::encoding`].
    pub fn text_encoding(&self) -> Result<TextEncoding> {
        TextEncoding::for_label(&self.encoding)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithm: SignatureAlgorithm::default(),
            encoding: "utf-8".into(),
            private_key: None,
            public_key: None,
        }
    }
}

impl core::fmt::Debug for Config {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Config")
            .field("algorithm", &self.algorithm)
            .field("encoding", &self.encoding)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("public_key", &self.public_key)
            .finish()
    }
}
