//! Sign, verify, encrypt and decrypt text with keys given as Base64 DER.

use base64ct::{Base64, Encoding};
use rand_core::{CryptoRngCore, OsRng};
use rsa::{
    pkcs1v15::{Signature, SigningKey, VerifyingKey},
    traits::PublicKeyParts,
    RsaPrivateKey, RsaPublicKey,
};
use sha1::Sha1;
use sha2::Sha256;
use signature::{RandomizedSigner, SignatureEncoding, Verifier};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use zeroize::Zeroizing;

use crate::{
    block,
    config::Config,
    errors::{Error, Result},
    key::KeyBlob,
    text::TextEncoding,
};

/// PKCS#1 v1.5 signature variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SignatureAlgorithm {
    /// PKCS#1 v1.5 with SHA-1. Kept for interoperating with legacy peers.
    #[cfg_attr(feature = "serde", serde(rename = "RSA"))]
    RsaSha1,

    /// PKCS#1 v1.5 with SHA-256.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "RSA2"))]
    RsaSha256,
}

impl SignatureAlgorithm {
    /// Name of the digest.
    pub fn digest_name(self) -> &'static str {
        match self {
            SignatureAlgorithm::RsaSha1 => "SHA-1",
            SignatureAlgorithm::RsaSha256 => "SHA-256",
        }
    }
}

enum Signer {
    Sha1(SigningKey<Sha1>),
    Sha256(SigningKey<Sha256>),
}

enum Checker {
    Sha1(VerifyingKey<Sha1>),
    Sha256(VerifyingKey<Sha256>),
}

struct PrivateKeyMaterial {
    signer: Signer,
    lock: Mutex<()>,
}

impl PrivateKeyMaterial {
    fn new(algorithm: SignatureAlgorithm, key: RsaPrivateKey) -> Self {
        let signer = match algorithm {
            SignatureAlgorithm::RsaSha1 => Signer::Sha1(SigningKey::new(key)),
            SignatureAlgorithm::RsaSha256 => Signer::Sha256(SigningKey::new(key)),
        };
        Self {
            signer,
            lock: Mutex::new(()),
        }
    }

    fn key(&self) -> &RsaPrivateKey {
        match &self.signer {
            Signer::Sha1(key) => key.as_ref(),
            Signer::Sha256(key) => key.as_ref(),
        }
    }

    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        let _guard = acquire(&self.lock);
        let signature = match &self.signer {
            Signer::Sha1(key) => key.try_sign_with_rng(&mut OsRng, msg)?,
            Signer::Sha256(key) => key.try_sign_with_rng(&mut OsRng, msg)?,
        };
        Ok(signature.to_vec())
    }

    fn decrypt<R: CryptoRngCore>(
        &self,
        rng: &mut R,
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        let _guard = acquire(&self.lock);
        block::decrypt_blocks(rng, self.key(), ciphertext)
    }
}

struct PublicKeyMaterial {
    checker: Checker,
    lock: Mutex<()>,
}

impl PublicKeyMaterial {
    fn new(algorithm: SignatureAlgorithm, key: RsaPublicKey) -> Self {
        let checker = match algorithm {
            SignatureAlgorithm::RsaSha1 => Checker::Sha1(VerifyingKey::new(key)),
            SignatureAlgorithm::RsaSha256 => Checker::Sha256(VerifyingKey::new(key)),
        };
        Self {
            checker,
            lock: Mutex::new(()),
        }
    }

    fn key(&self) -> &RsaPublicKey {
        match &self.checker {
            Checker::Sha1(key) => key.as_ref(),
            Checker::Sha256(key) => key.as_ref(),
        }
    }

    fn verify(&self, msg: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::try_from(signature) else {
            return false;
        };

        let _guard = acquire(&self.lock);
        let result = match &self.checker {
            Checker::Sha1(key) => key.verify(msg, &signature),
            Checker::Sha256(key) => key.verify(msg, &signature),
        };
        result.is_ok()
    }

    fn encrypt<R: CryptoRngCore>(
        &self,
        rng: &mut R,
        plaintext: &[u8],
        chunked: bool,
    ) -> Result<Vec<u8>> {
        let _guard = acquire(&self.lock);
        if chunked {
            block::encrypt_blocks(rng, self.key(), plaintext)
        } else {
            block::encrypt_block(rng, self.key(), plaintext)
        }
    }
}

/// The lock guards no data, so a poisoned lock is still usable.
fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Text signing and encryption facility.
///
/// Holds an optional private key and an optional public key, each decoded
/// once at construction. Content strings are converted to bytes with the
/// configured [`TextEncoding`]; signatures and ciphertexts are Base64.
///
/// Every operation on a key holds that key's lock for the duration of the
/// RSA primitive call. Clones share keys, and therefore locks; helpers built
/// from separate key material never block each other.
#[derive(Clone)]
pub struct RsaHelper {
    algorithm: SignatureAlgorithm,
    encoding: TextEncoding,
    private_key: Option<Arc<PrivateKeyMaterial>>,
    public_key: Option<Arc<PublicKeyMaterial>>,
}

impl RsaHelper {
    /// Build a helper from Base64 DER key text.
    ///
    /// `private_key` is a PKCS#1 `RSAPrivateKey`, `public_key` an RSA
    /// `SubjectPublicKeyInfo`. `None` and empty strings mean the key is not
    /// supplied. A supplied key that cannot be decoded is an error.
    pub fn new(
        algorithm: SignatureAlgorithm,
        encoding: TextEncoding,
        private_key: Option<&str>,
        public_key: Option<&str>,
    ) -> Result<Self> {
        let private_key = match private_key.filter(|text| !text.trim().is_empty()) {
            Some(text) => {
                let key = KeyBlob::from_base64(text)?.decode_private_key()?.to_rsa_key()?;
                Some(Arc::new(PrivateKeyMaterial::new(algorithm, key)))
            }
            None => None,
        };

        let public_key = match public_key.filter(|text| !text.trim().is_empty()) {
            Some(text) => {
                let key = KeyBlob::from_base64(text)?
                    .probe_public_key()
                    .into_result()?
                    .to_rsa_key()?;
                Some(Arc::new(PublicKeyMaterial::new(algorithm, key)))
            }
            None => None,
        };

        tracing::debug!(
            ?algorithm,
            digest = algorithm.digest_name(),
            encoding = encoding.name(),
            private_key = private_key.is_some(),
            public_key = public_key.is_some(),
            "created RSA helper"
        );

        Ok(Self {
            algorithm,
            encoding,
            private_key,
            public_key,
        })
    }

    /// Start building a helper.
    pub fn builder<'a>() -> RsaHelperBuilder<'a> {
        RsaHelperBuilder::default()
    }

    /// Build a helper from a [`Config`].
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.algorithm,
            config.text_encoding()?,
            config.private_key.as_deref(),
            config.public_key.as_deref(),
        )
    }

    /// Signature algorithm.
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Text encoding.
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Whether a private key was supplied.
    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    /// Whether a public key was supplied.
    pub fn has_public_key(&self) -> bool {
        self.public_key.is_some()
    }

    /// Size in bytes of a signature or ciphertext block: the modulus size of
    /// the private key, or of the public key if there is no private key.
    pub fn block_size(&self) -> Option<usize> {
        match (&self.private_key, &self.public_key) {
            (Some(private_key), _) => Some(private_key.key().size()),
            (None, Some(public_key)) => Some(public_key.key().size()),
            (None, None) => None,
        }
    }

    /// Sign `content` and return the Base64 signature.
    pub fn sign(&self, content: &str) -> Result<String> {
        let private_key = self.private_key.as_ref().ok_or(Error::MissingKeyMaterial)?;
        let msg = self.encoding.encode(content)?;
        let signature = private_key.sign(&msg)?;
        Ok(Base64::encode_string(&signature))
    }

    /// Check a Base64 `signature` over `content`.
    ///
    /// A signature that does not verify, whatever its length, is `Ok(false)`.
    /// Text that is not Base64 at all is an error.
    pub fn verify(&self, content: &str, signature: &str) -> Result<bool> {
        let public_key = self.public_key.as_ref().ok_or(Error::MissingKeyMaterial)?;
        let msg = self.encoding.encode(content)?;
        let signature = Base64::decode_vec(signature.trim())?;
        Ok(public_key.verify(&msg, &signature))
    }

    /// Encrypt `plaintext` into a single RSA block and return it as Base64.
    ///
    /// Fails with [`Error::PlaintextTooLarge`] if the encoded plaintext does
    /// not fit; see [`RsaHelper::encrypt_chunked`] for longer input.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        self.encrypt_with_rng(&mut OsRng, plaintext)
    }

    /// [`RsaHelper::encrypt`] with a caller-supplied RNG.
    pub fn encrypt_with_rng<R: CryptoRngCore>(
        &self,
        rng: &mut R,
        plaintext: &str,
    ) -> Result<String> {
        self.encrypt_inner(rng, plaintext, false)
    }

    /// Encrypt `plaintext` of any length as consecutive RSA blocks and
    /// return them as Base64.
    pub fn encrypt_chunked(&self, plaintext: &str) -> Result<String> {
        self.encrypt_chunked_with_rng(&mut OsRng, plaintext)
    }

    /// [`RsaHelper::encrypt_chunked`] with a caller-supplied RNG.
    pub fn encrypt_chunked_with_rng<R: CryptoRngCore>(
        &self,
        rng: &mut R,
        plaintext: &str,
    ) -> Result<String> {
        self.encrypt_inner(rng, plaintext, true)
    }

    fn encrypt_inner<R: CryptoRngCore>(
        &self,
        rng: &mut R,
        plaintext: &str,
        chunked: bool,
    ) -> Result<String> {
        let public_key = self.public_key.as_ref().ok_or(Error::MissingKeyMaterial)?;
        let msg = Zeroizing::new(self.encoding.encode(plaintext)?.into_owned());
        let ciphertext = public_key.encrypt(rng, &msg, chunked)?;
        Ok(Base64::encode_string(&ciphertext))
    }

    /// Decrypt Base64 ciphertext made of one or more RSA blocks.
    ///
    /// Empty ciphertext decrypts to the empty string.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let private_key = self.private_key.as_ref().ok_or(Error::MissingKeyMaterial)?;
        let ciphertext = Base64::decode_vec(ciphertext.trim())?;
        let plaintext = private_key.decrypt(&mut OsRng, &ciphertext)?;
        self.encoding.decode(&plaintext)
    }
}

impl core::fmt::Debug for RsaHelper {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RsaHelper")
            .field("algorithm", &self.algorithm)
            .field("encoding", &self.encoding)
            .field("has_private_key", &self.has_private_key())
            .field("has_public_key", &self.has_public_key())
            .finish()
    }
}

/// Builder for [`RsaHelper`].
#[derive(Clone, Default)]
pub struct RsaHelperBuilder<'a> {
    algorithm: SignatureAlgorithm,
    encoding: TextEncoding,
    private_key: Option<&'a str>,
    public_key: Option<&'a str>,
}

impl<'a> RsaHelperBuilder<'a> {
    /// Signature algorithm. Defaults to [`SignatureAlgorithm::RsaSha256`].
    pub fn algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Text encoding. Defaults to UTF-8.
    pub fn encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Base64 PKCS#1 DER private key.
    pub fn private_key(mut self, key: &'a str) -> Self {
        self.private_key = Some(key);
        self
    }

    /// Base64 `SubjectPublicKeyInfo` DER public key.
    pub fn public_key(mut self, key: &'a str) -> Self {
        self.public_key = Some(key);
        self
    }

    /// Decode the keys and build the helper.
    pub fn build(self) -> Result<RsaHelper> {
        RsaHelper::new(
            self.algorithm,
            self.encoding,
            self.private_key,
            self.public_key,
        )
    }
}

impl core::fmt::Debug for RsaHelperBuilder<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RsaHelperBuilder")
            .field("algorithm", &self.algorithm)
            .field("encoding", &self.encoding)
            .field("private_key", &self.private_key.map(|_| "<redacted>"))
            .field("public_key", &self.public_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
    use rsa::pkcs1::EncodeRsaPrivateKey;
    use rsa::pkcs8::EncodePublicKey;

    fn key_text(bits: usize) -> (String, String) {
        key_text_from_seed([42; 32], bits)
    }

    fn key_text_from_seed(seed: [u8; 32], bits: usize) -> (String, String) {
        let mut rng = ChaCha8Rng::from_seed(seed);
        let key = RsaPrivateKey::new(&mut rng, bits).unwrap();
        let private_der = key.to_pkcs1_der().unwrap();
        let public_der = RsaPublicKey::from(&key).to_public_key_der().unwrap();
        (
            Base64::encode_string(private_der.as_bytes()),
            Base64::encode_string(public_der.as_bytes()),
        )
    }

    #[test]
    fn test_sign_verify() {
        let (private_key, public_key) = key_text(1024);
        for algorithm in [SignatureAlgorithm::RsaSha1, SignatureAlgorithm::RsaSha256] {
            let helper = RsaHelper::builder()
                .algorithm(algorithm)
                .private_key(&private_key)
                .public_key(&public_key)
                .build()
                .unwrap();

            let signature = helper.sign("hello world").unwrap();
            assert!(helper.verify("hello world", &signature).unwrap());
            assert!(!helper.verify("hello world!", &signature).unwrap());
            assert!(!helper.verify("hello world", "AAAA").unwrap());
        }
    }

    #[test]
    fn test_algorithms_do_not_cross_verify() {
        let (private_key, public_key) = key_text(1024);
        let sha1 = RsaHelper::new(
            SignatureAlgorithm::RsaSha1,
            TextEncoding::UTF_8,
            Some(&private_key),
            None,
        )
        .unwrap();
        let sha256 = RsaHelper::new(
            SignatureAlgorithm::RsaSha256,
            TextEncoding::UTF_8,
            None,
            Some(&public_key),
        )
        .unwrap();

        let signature = sha1.sign("content").unwrap();
        assert!(!sha256.verify("content", &signature).unwrap());
    }

    #[test]
    fn test_encrypt_decrypt() {
        let (private_key, public_key) = key_text(1024);
        let helper = RsaHelper::builder()
            .private_key(&private_key)
            .public_key(&public_key)
            .build()
            .unwrap();
        let mut rng = ChaCha8Rng::from_seed([7; 32]);

        let ciphertext = helper.encrypt_with_rng(&mut rng, "签名测试").unwrap();
        assert_eq!(Base64::decode_vec(&ciphertext).unwrap().len(), 128);
        assert_eq!(helper.decrypt(&ciphertext).unwrap(), "签名测试");

        let long = "签".repeat(100);
        assert!(matches!(
            helper.encrypt(&long),
            Err(Error::PlaintextTooLarge)
        ));
        let ciphertext = helper.encrypt_chunked_with_rng(&mut rng, &long).unwrap();
        assert_eq!(Base64::decode_vec(&ciphertext).unwrap().len(), 3 * 128);
        assert_eq!(helper.decrypt(&ciphertext).unwrap(), long);

        assert_eq!(helper.decrypt("").unwrap(), "");
    }

    #[test]
    fn test_missing_key_material() {
        let (private_key, public_key) = key_text(1024);

        let public_only = RsaHelper::builder().public_key(&public_key).build().unwrap();
        assert!(!public_only.has_private_key());
        assert!(matches!(public_only.sign("x"), Err(Error::MissingKeyMaterial)));
        assert!(matches!(public_only.decrypt(""), Err(Error::MissingKeyMaterial)));

        let private_only = RsaHelper::builder()
            .private_key(&private_key)
            .public_key("")
            .build()
            .unwrap();
        assert!(!private_only.has_public_key());
        assert!(matches!(
            private_only.verify("x", "AAAA"),
            Err(Error::MissingKeyMaterial)
        ));
        assert!(matches!(private_only.encrypt("x"), Err(Error::MissingKeyMaterial)));

        let neither = RsaHelper::builder().build().unwrap();
        assert_eq!(neither.block_size(), None);
    }

    #[test]
    fn test_construction_errors() {
        let (private_key, public_key) = key_text(1024);

        // keys swapped
        assert!(matches!(
            RsaHelper::builder().private_key(&public_key).build(),
            Err(Error::UnsupportedKeyVersion)
        ));
        assert!(matches!(
            RsaHelper::builder().public_key(&private_key).build(),
            Err(Error::NotAPublicKey(_))
        ));
        assert!(matches!(
            RsaHelper::builder().private_key("not base64!").build(),
            Err(Error::Base64)
        ));
    }

    #[test]
    fn test_malformed_signature_text() {
        let (_, public_key) = key_text(1024);
        let helper = RsaHelper::builder().public_key(&public_key).build().unwrap();
        assert!(matches!(helper.verify("x", "@@@@"), Err(Error::Base64)));
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let (private_key, public_key) = key_text(1024);
        let helper = RsaHelper::builder()
            .private_key(&private_key)
            .public_key(&public_key)
            .build()
            .unwrap();

        let material = helper.private_key.clone().unwrap();
        let _ = std::thread::spawn(move || {
            let _guard = material.lock.lock().unwrap();
            panic!("poison");
        })
        .join();

        let signature = helper.sign("after panic").unwrap();
        assert!(helper.verify("after panic", &signature).unwrap());
    }

    #[test]
    fn test_debug_redacts_keys() {
        let (private_key, _) = key_text(1024);
        let helper = RsaHelper::builder().private_key(&private_key).build().unwrap();
        let debug = format!("{helper:?}");
        assert!(debug.contains("algorithm: RsaSha256"));
        assert!(debug.contains("has_private_key: true, has_public_key: false"));
        assert!(!debug.contains(&private_key[..16]));
    }

    #[test]
    fn test_separate_keys_do_not_share_locks() {
        use std::sync::mpsc;
        use std::time::Duration;

        let (private_a, _) = key_text_from_seed([1; 32], 1024);
        let (private_b, _) = key_text_from_seed([2; 32], 1024);
        assert_ne!(private_a, private_b);
        let a = RsaHelper::builder().private_key(&private_a).build().unwrap();
        let b = RsaHelper::builder().private_key(&private_b).build().unwrap();

        let material = a.private_key.clone().unwrap();
        let guard = acquire(&material.lock);

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || tx.send(b.sign("unrelated key")).unwrap());
        let signature = rx
            .recv_timeout(Duration::from_secs(30))
            .expect("sign on an unrelated key blocked")
            .unwrap();
        assert!(!signature.is_empty());

        // a clone shares the key, and therefore its lock
        let (tx, rx) = mpsc::channel();
        let clone = a.clone();
        std::thread::spawn(move || tx.send(clone.sign("same key")).unwrap());
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(200)).unwrap_err(),
            mpsc::RecvTimeoutError::Timeout
        );

        drop(guard);
        assert!(rx.recv_timeout(Duration::from_secs(30)).unwrap().is_ok());
    }

    #[test]
    fn test_digest_name() {
        assert_eq!(SignatureAlgorithm::RsaSha1.digest_name(), "SHA-1");
        assert_eq!(SignatureAlgorithm::default().digest_name(), "SHA-256");
    }
}
