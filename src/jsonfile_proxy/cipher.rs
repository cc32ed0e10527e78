//! # At-Rest Obfuscation
//!
//! **This is obfuscation, not confidentiality.** The codec makes a data file
//! unreadable to someone casually opening it, nothing more. There is no salt,
//! the IV is derived from the key (so equal payloads produce equal output), and
//! there is no authentication tag: a tampered file is only detected when the
//! padding or the JSON inside stops making sense.
//!
//! The on-disk format matches what OpenSSL-style `EVP_BytesToKey` tooling
//! produces for `aes-256-cbc` with a passphrase:
//!
//! - key and IV: `EVP_BytesToKey(MD5, no salt, 1 iteration)` over the passphrase
//! - cipher: AES-256 in CBC mode with PKCS#7 padding
//! - encoding: lowercase hex
//!
//! Keeping these parameters fixed is what lets files written by earlier
//! adapters be read back; changing any of them breaks existing files.

use crate::error::{ProxyError, Result};
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use md5::{Digest, Md5};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

#[derive(Clone)]
pub struct Cipher {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher").finish_non_exhaustive()
    }
}

impl Cipher {
    /// Derive key material from a passphrase. Empty passphrases are rejected.
    pub fn new(passphrase: &str) -> Result<Self> {
        if passphrase.is_empty() {
            return Err(ProxyError::Configuration(
                "Encryption key must not be empty".to_string(),
            ));
        }
        let (key, iv) = bytes_to_key(passphrase.as_bytes());
        Ok(Self { key, iv })
    }

    pub fn encrypt(&self, plaintext: &str) -> String {
        let sealed = Aes256CbcEnc::new(&self.key.into(), &self.iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        hex::encode(sealed)
    }

    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let raw = hex::decode(ciphertext.trim())
            .map_err(|e| ProxyError::Decryption(format!("content is not hex encoded: {e}")))?;
        let opened = Aes256CbcDec::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&raw)
            .map_err(|_| {
                ProxyError::Decryption("wrong key or truncated content".to_string())
            })?;
        String::from_utf8(opened)
            .map_err(|_| ProxyError::Decryption("decrypted content is not UTF-8".to_string()))
    }
}

/// `EVP_BytesToKey` with MD5, no salt and a single round:
/// `D_i = MD5(D_{i-1} || passphrase)`, concatenated until key and IV are filled.
fn bytes_to_key(passphrase: &[u8]) -> ([u8; KEY_LEN], [u8; IV_LEN]) {
    let mut material = Vec::with_capacity(KEY_LEN + IV_LEN + 16);
    let mut previous: Vec<u8> = Vec::new();

    while material.len() < KEY_LEN + IV_LEN {
        let mut hasher = Md5::new();
        hasher.update(&previous);
        hasher.update(passphrase);
        previous = hasher.finalize().to_vec();
        material.extend_from_slice(&previous);
    }

    let mut key = [0u8; KEY_LEN];
    let mut iv = [0u8; IV_LEN];
    key.copy_from_slice(&material[..KEY_LEN]);
    iv.copy_from_slice(&material[KEY_LEN..KEY_LEN + IV_LEN]);
    (key, iv)
}

/// Plain envelopes start with `{` once leading whitespace is skipped;
/// anything else is assumed to be ciphertext.
pub fn looks_encrypted(content: &str) -> bool {
    !content.trim_start().starts_with('{')
}
