//! RSA key material for the encryption handshake.
//!
//! Payloads are encrypted directly with the peer's RSA key using PKCS#1 v1.5
//! padding. Plaintext longer than one block is split into chunks of
//! `modulus - 11` bytes, each producing one modulus-sized ciphertext block.
//! Upgrading to a symmetric session cipher is left to the caller.

use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

use crate::error::CryptoError;

/// PKCS#1 v1.5 padding overhead in bytes.
const PKCS1_PADDING: usize = 11;

/// An RSA public/private key pair.
#[derive(Debug, Clone)]
pub struct KeyPair {
    public_key: RsaPublicKey,
    private_key: RsaPrivateKey,
}

impl KeyPair {
    /// Generate a new key pair with a modulus of `bits` bits.
    ///
    /// # Errors
    ///
    /// Returns an error if RSA key generation fails.
    pub fn generate(bits: usize) -> Result<Self, CryptoError> {
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), bits)?;
        let public_key = RsaPublicKey::from(&private_key);

        Ok(Self {
            public_key,
            private_key,
        })
    }

    /// Pair up existing keys.
    #[must_use]
    pub const fn from_parts(public_key: RsaPublicKey, private_key: RsaPrivateKey) -> Self {
        Self {
            public_key,
            private_key,
        }
    }

    /// The public half, used for encryption.
    #[must_use]
    pub const fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// The private half, used for decryption.
    #[must_use]
    pub const fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// Ciphertext block size in bytes (the modulus size).
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.public_key.size()
    }

    /// Encrypt `data` with the public key.
    ///
    /// # Errors
    ///
    /// Returns an error if the cipher rejects a chunk.
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let block = self.block_size();
        let chunk_len = block.saturating_sub(PKCS1_PADDING).max(1);
        let mut rng = rand::thread_rng();

        let mut out = Vec::with_capacity(data.len().div_ceil(chunk_len) * block);
        for chunk in data.chunks(chunk_len) {
            let encrypted = self.public_key.encrypt(&mut rng, Pkcs1v15Encrypt, chunk)?;
            out.extend_from_slice(&encrypted);
        }

        Ok(out)
    }

    /// Decrypt `data` with the private key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidBlockLength`] if `data` is not a whole
    /// number of blocks, or an RSA error if a block fails to decrypt.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let block = self.block_size();
        if data.len() % block != 0 {
            return Err(CryptoError::InvalidBlockLength {
                len: data.len(),
                block,
            });
        }

        let mut out = Vec::with_capacity(data.len());
        for chunk in data.chunks(block) {
            let decrypted = self.private_key.decrypt(Pkcs1v15Encrypt, chunk)?;
            out.extend_from_slice(&decrypted);
        }

        Ok(out)
    }
}
