//! PKCS#1 v1.5 encryption over byte strings of any length.
//!
//! The RSA primitive handles exactly one block per call. Ciphertext blocks
//! are always [`PublicKeyParts::size`] bytes; a plaintext block carries at
//! most `size - 11` bytes.

use rand_core::CryptoRngCore;
use rsa::{traits::PublicKeyParts, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

use crate::errors::{Error, Result};

/// Bytes of every PKCS#1 v1.5 encryption block taken by padding.
pub const PKCS1V15_OVERHEAD: usize = 11;

/// Largest plaintext one block can carry for `key`.
pub fn max_plaintext_len(key: &impl PublicKeyParts) -> usize {
    key.size().saturating_sub(PKCS1V15_OVERHEAD)
}

/// Encrypt `plaintext` as a single block.
pub fn encrypt_block<R: CryptoRngCore>(
    rng: &mut R,
    key: &RsaPublicKey,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    if plaintext.len() > max_plaintext_len(key) {
        return Err(Error::PlaintextTooLarge);
    }

    Ok(key.encrypt(rng, Pkcs1v15Encrypt, plaintext)?)
}

/// Encrypt `plaintext` block by block and concatenate the ciphertext.
///
/// Empty plaintext yields empty ciphertext.
pub fn encrypt_blocks<R: CryptoRngCore>(
    rng: &mut R,
    key: &RsaPublicKey,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let chunk_len = max_plaintext_len(key);
    if chunk_len == 0 {
        return Err(Error::PlaintextTooLarge);
    }

    let mut ciphertext = Vec::with_capacity(plaintext.len().div_ceil(chunk_len) * key.size());
    for (i, chunk) in plaintext.chunks(chunk_len).enumerate() {
        tracing::trace!(block = i, len = chunk.len(), "encrypting block");
        ciphertext.extend_from_slice(&key.encrypt(rng, Pkcs1v15Encrypt, chunk)?);
    }

    Ok(ciphertext)
}

/// Decrypt concatenated ciphertext blocks and concatenate the plaintext.
///
/// The block size is the size of `key`'s modulus. Ciphertext whose length is
/// not a multiple of it is rejected as a whole, before any block is
/// decrypted.
pub fn decrypt_blocks<R: CryptoRngCore>(
    rng: &mut R,
    key: &RsaPrivateKey,
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let block_size = key.size();
    if block_size == 0 || ciphertext.len() % block_size != 0 {
        return Err(Error::CiphertextLengthInvalid);
    }

    let mut plaintext = Zeroizing::new(Vec::with_capacity(ciphertext.len()));
    for (i, block) in ciphertext.chunks_exact(block_size).enumerate() {
        tracing::trace!(block = i, "decrypting block");
        let decrypted = Zeroizing::new(key.decrypt_blinded(rng, Pkcs1v15Encrypt, block)?);
        plaintext.extend_from_slice(&decrypted);
    }

    Ok(plaintext)
}
