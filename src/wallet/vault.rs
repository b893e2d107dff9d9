//! Private keys encrypted at rest.
//!
//! Sealed keys are base64 strings of the envelope:
//!
//! ```text
//!  0..4   magic   b"GKEY"
//!  4..5   version 0x01
//!  5..37  salt    32 bytes
//! 37..49  nonce   12 bytes
//! 49..    ciphertext + 16-byte GCM tag
//! ```

use aes_gcm::{
    Aes256Gcm, KeyInit, Nonce,
    aead::{Aead, OsRng, rand_core::RngCore},
};
use alloy::signers::local::PrivateKeySigner;
use base64::prelude::*;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;

use crate::errors::{GridError, GridResult};

const MAGIC: &[u8; 4] = b"GKEY";
const VERSION: u8 = 0x01;
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 600_000;
const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = 4 + 1 + SALT_LEN + NONCE_LEN;

pub struct KeyVault {
    passphrase: Vec<u8>,
    iterations: u32,
}

impl fmt::Debug for KeyVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyVault")
            .field("passphrase", &"<redacted>")
            .field("iterations", &self.iterations)
            .finish()
    }
}

impl KeyVault {
    pub fn new(passphrase: impl AsRef<[u8]>) -> Self {
        Self::with_iterations(passphrase, DEFAULT_PBKDF2_ITERATIONS)
    }

    pub fn with_iterations(passphrase: impl AsRef<[u8]>, iterations: u32) -> Self {
        Self {
            passphrase: passphrase.as_ref().to_vec(),
            iterations: iterations.max(1),
        }
    }

    fn cipher(&self, salt: &[u8]) -> GridResult<Aes256Gcm> {
        let mut key = [0u8; 32];
        pbkdf2_hmac::<Sha256>(&self.passphrase, salt, self.iterations, &mut key);
        Aes256Gcm::new_from_slice(&key).map_err(|e| GridError::Encryption(e.to_string()))
    }

    pub fn seal(&self, plaintext: &str) -> GridResult<String> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher(&salt)?
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| GridError::Encryption("encryption failed".to_string()))?;

        let mut envelope = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        envelope.extend_from_slice(MAGIC);
        envelope.push(VERSION);
        envelope.extend_from_slice(&salt);
        envelope.extend_from_slice(&nonce);
        envelope.extend_from_slice(&ciphertext);
        Ok(BASE64_STANDARD.encode(envelope))
    }

    pub fn open(&self, sealed: &str) -> GridResult<String> {
        let envelope = BASE64_STANDARD
            .decode(sealed.trim())
            .map_err(|e| GridError::Encryption(format!("sealed key is not base64: {e}")))?;

        if envelope.len() < HEADER_LEN {
            return Err(GridError::Encryption("sealed key is truncated".to_string()));
        }
        if &envelope[..4] != MAGIC {
            return Err(GridError::Encryption("not a sealed key".to_string()));
        }
        if envelope[4] != VERSION {
            return Err(GridError::Encryption(format!("unsupported envelope version {}", envelope[4])));
        }

        let salt = &envelope[5..5 + SALT_LEN];
        let nonce = &envelope[5 + SALT_LEN..HEADER_LEN];
        let plaintext = self
            .cipher(salt)?
            .decrypt(Nonce::from_slice(nonce), &envelope[HEADER_LEN..])
            .map_err(|_| GridError::Encryption("decryption failed (wrong passphrase or corrupted key)".to_string()))?;

        String::from_utf8(plaintext).map_err(|e| GridError::Encryption(e.to_string()))
    }

    /// Decrypts a sealed hex private key into a signer.
    pub fn open_signer(&self, sealed: &str) -> GridResult<PrivateKeySigner> {
        let key = self.open(sealed)?;
        key.trim()
            .parse::<PrivateKeySigner>()
            .map_err(|e| GridError::Signing {
                message: format!("invalid private key: {e}"),
            })
    }

    /// `seal` on the blocking pool, keeping key derivation off the async workers.
    pub async fn seal_async(self: Arc<Self>, plaintext: String) -> GridResult<String> {
        tokio::task::spawn_blocking(move || self.seal(&plaintext))
            .await
            .map_err(|e| GridError::Encryption(format!("seal task failed: {e}")))?
    }

    /// `open_signer` on the blocking pool.
    pub async fn open_signer_async(self: Arc<Self>, sealed: String) -> GridResult<PrivateKeySigner> {
        tokio::task::spawn_blocking(move || self.open_signer(&sealed))
            .await
            .map_err(|e| GridError::Encryption(format!("unseal task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::signers::Signer;

    const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn vault(passphrase: &str) -> KeyVault {
        KeyVault::with_iterations(passphrase, 1_000)
    }

    #[test]
    fn sealed_key_opens_to_signer() {
        let v = vault("salt");
        let sealed = v.seal(KEY).unwrap();
        assert_ne!(sealed, KEY);

        let signer = v.open_signer(&sealed).unwrap();
        assert_eq!(
            signer.address(),
            alloy::primitives::address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
    }

    #[test]
    fn wrong_passphrase_is_rejected() {
        let sealed = vault("right").seal(KEY).unwrap();
        assert!(matches!(vault("wrong").open(&sealed), Err(GridError::Encryption(_))));
    }

    #[test]
    fn each_seal_is_unique() {
        let v = vault("salt");
        assert_ne!(v.seal(KEY).unwrap(), v.seal(KEY).unwrap());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn unsealing_leaves_the_runtime_free() {
        let v = Arc::new(KeyVault::with_iterations("salt", 200_000));
        let sealed = v.seal(KEY).unwrap();

        let ticks = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let ticker = {
            let ticks = ticks.clone();
            tokio::spawn(async move {
                loop {
                    ticks.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                }
            })
        };

        let signer = v.clone().open_signer_async(sealed).await.unwrap();
        ticker.abort();

        assert_eq!(
            signer.address(),
            alloy::primitives::address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
        // The ticker shares the only runtime thread, so it only ran while derivation was elsewhere.
        assert!(ticks.load(std::sync::atomic::Ordering::Relaxed) > 1);
    }

    #[tokio::test]
    async fn async_seal_round_trips() {
        let v = Arc::new(vault("salt"));
        let sealed = v.clone().seal_async(KEY.to_string()).await.unwrap();
        assert_eq!(v.open(&sealed).unwrap(), KEY);
    }

    #[test]
    fn garbage_is_rejected() {
        let v = vault("salt");
        assert!(v.open("not base64!").is_err());
        assert!(v.open(&BASE64_STANDARD.encode([0u8; 8])).is_err());
        assert!(v.open(&BASE64_STANDARD.encode([0u8; HEADER_LEN + 16])).is_err());
    }
}
