use crate::error::{CookieError, Result};
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Default maximum age of a cookie envelope, in seconds (30 days).
pub const DEFAULT_MAX_AGE: i64 = 86400 * 30;

/// Default maximum length of an encoded cookie value, in bytes.
pub const DEFAULT_MAX_LENGTH: usize = 4096;

const NONCE_LEN: usize = 12;

/// A signing key with an optional encryption key.
///
/// Encryption keys must be 16 bytes (AES-128-GCM) or 32 bytes (AES-256-GCM).
#[derive(Clone)]
pub struct KeyPair {
    pub signing: Vec<u8>,
    pub encryption: Option<Vec<u8>>,
}

impl KeyPair {
    /// Signing-only key pair; cookie contents are authenticated but readable.
    pub fn signing(key: impl Into<Vec<u8>>) -> Self {
        Self {
            signing: key.into(),
            encryption: None,
        }
    }

    /// Signing and encryption key pair.
    pub fn new(signing: impl Into<Vec<u8>>, encryption: impl Into<Vec<u8>>) -> Self {
        Self {
            signing: signing.into(),
            encryption: Some(encryption.into()),
        }
    }

    /// Generate a fresh pair with a 64 byte signing key and a 32 byte encryption key.
    pub fn generate() -> Self {
        Self::new(generate_random_key(64), generate_random_key(32))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("signing", &"<redacted>")
            .field("encrypted", &self.encryption.is_some())
            .finish()
    }
}

#[derive(Clone)]
enum Cipher {
    Aes128(Aes128Gcm),
    Aes256(Aes256Gcm),
}

impl Cipher {
    fn new(key: &[u8]) -> Result<Self> {
        let invalid = |_| CookieError::InvalidKey("unusable encryption key".to_string());
        match key.len() {
            16 => Aes128Gcm::new_from_slice(key).map(Cipher::Aes128).map_err(invalid),
            32 => Aes256Gcm::new_from_slice(key).map(Cipher::Aes256).map_err(invalid),
            n => Err(CookieError::InvalidKey(format!(
                "encryption key must be 16 or 32 bytes, got {}",
                n
            ))),
        }
    }

    /// Encrypt with a random nonce; output is `nonce || ciphertext`.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = match self {
            Cipher::Aes128(c) => c.encrypt(&nonce, plaintext),
            Cipher::Aes256(c) => c.encrypt(&nonce, plaintext),
        }
        .map_err(|_| CookieError::Encryption)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < NONCE_LEN {
            return Err(CookieError::Decryption);
        }
        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        let nonce = GenericArray::from_slice(nonce);
        match self {
            Cipher::Aes128(c) => c.decrypt(nonce, ciphertext),
            Cipher::Aes256(c) => c.decrypt(nonce, ciphertext),
        }
        .map_err(|_| CookieError::Decryption)
    }
}

/// Encodes and decodes authenticated (and optionally encrypted) cookie values.
///
/// The transmitted form is `base64url("timestamp|payload|tag")`, where the tag
/// is HMAC-SHA256 over `name|timestamp|payload`. The cookie name is not
/// transmitted but is bound by the tag, so a value minted for one cookie is
/// rejected under another name.
#[derive(Clone)]
pub struct SecureCookie {
    hash_key: Vec<u8>,
    cipher: Option<Cipher>,
    max_age: i64,
    max_length: usize,
}

impl SecureCookie {
    /// Create a codec from a signing key and an optional encryption key.
    pub fn new(hash_key: impl Into<Vec<u8>>, block_key: Option<&[u8]>) -> Result<Self> {
        let hash_key = hash_key.into();
        if hash_key.is_empty() {
            return Err(CookieError::InvalidKey(
                "signing key must not be empty".to_string(),
            ));
        }

        let cipher = block_key.map(Cipher::new).transpose()?;

        Ok(Self {
            hash_key,
            cipher,
            max_age: DEFAULT_MAX_AGE,
            max_length: DEFAULT_MAX_LENGTH,
        })
    }

    /// Create a codec from a key pair.
    pub fn from_pair(pair: &KeyPair) -> Result<Self> {
        Self::new(pair.signing.clone(), pair.encryption.as_deref())
    }

    /// Set the maximum accepted age in seconds. `0` disables the age check.
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = seconds.max(0);
        self
    }

    /// Set the maximum encoded length in bytes. `0` disables the check.
    pub fn with_max_length(mut self, length: usize) -> Self {
        self.max_length = length;
        self
    }

    pub fn max_age(&self) -> i64 {
        self.max_age
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    /// Encode `value` for the cookie called `name`.
    pub fn encode(&self, name: &str, value: impl AsRef<[u8]>) -> Result<String> {
        self.encode_at(name, value.as_ref(), Utc::now().timestamp())
    }

    /// Verify and decode a cookie value produced by [`SecureCookie::encode`].
    pub fn decode(&self, name: &str, value: &str) -> Result<Vec<u8>> {
        self.decode_at(name, value, Utc::now().timestamp())
    }

    fn encode_at(&self, name: &str, value: &[u8], timestamp: i64) -> Result<String> {
        let payload = match &self.cipher {
            Some(cipher) => cipher.encrypt(value)?,
            None => value.to_vec(),
        };
        let body = URL_SAFE_NO_PAD.encode(payload);

        let signed = format!("{}|{}|{}", name, timestamp, body);
        let tag = URL_SAFE_NO_PAD.encode(self.sign(signed.as_bytes())?);

        let encoded = URL_SAFE_NO_PAD.encode(format!("{}|{}|{}", timestamp, body, tag));
        if self.max_length != 0 && encoded.len() > self.max_length {
            return Err(CookieError::ValueTooLong {
                len: encoded.len(),
                max: self.max_length,
            });
        }

        Ok(encoded)
    }

    fn decode_at(&self, name: &str, value: &str, now: i64) -> Result<Vec<u8>> {
        if self.max_length != 0 && value.len() > self.max_length {
            return Err(CookieError::ValueTooLong {
                len: value.len(),
                max: self.max_length,
            });
        }

        let decoded = URL_SAFE_NO_PAD.decode(value)?;
        let framed = String::from_utf8(decoded).map_err(|_| CookieError::Malformed)?;

        let parts: Vec<&str> = framed.split('|').collect();
        if parts.len() != 3 {
            return Err(CookieError::Malformed);
        }
        let (timestamp, body, tag) = (parts[0], parts[1], parts[2]);

        // Tag first: nothing else in the envelope is trusted until it verifies.
        let tag = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|_| CookieError::MacInvalid)?;
        let mut mac = self.mac()?;
        mac.update(format!("{}|{}|{}", name, timestamp, body).as_bytes());
        mac.verify_slice(&tag).map_err(|_| CookieError::MacInvalid)?;

        let timestamp: i64 = timestamp
            .parse()
            .map_err(|_| CookieError::InvalidTimestamp)?;
        if self.max_age != 0 && timestamp < now - self.max_age {
            return Err(CookieError::Expired);
        }

        let payload = URL_SAFE_NO_PAD.decode(body)?;
        match &self.cipher {
            Some(cipher) => cipher.decrypt(&payload),
            None => Ok(payload),
        }
    }

    fn mac(&self) -> Result<HmacSha256> {
        <HmacSha256 as Mac>::new_from_slice(&self.hash_key)
            .map_err(|e| CookieError::InvalidKey(e.to_string()))
    }

    /// Sign data with HMAC-SHA256
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut mac = self.mac()?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl fmt::Debug for SecureCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureCookie")
            .field("encrypted", &self.cipher.is_some())
            .field("max_age", &self.max_age)
            .field("max_length", &self.max_length)
            .finish_non_exhaustive()
    }
}

/// Build one codec per key pair, preserving order.
pub fn codecs_from_pairs<I>(pairs: I) -> Result<Vec<SecureCookie>>
where
    I: IntoIterator<Item = KeyPair>,
{
    pairs
        .into_iter()
        .map(|pair| SecureCookie::from_pair(&pair))
        .collect()
}

/// Encode with the first codec in the list.
pub fn encode_multi(name: &str, value: impl AsRef<[u8]>, codecs: &[SecureCookie]) -> Result<String> {
    codecs
        .first()
        .ok_or(CookieError::NoCodecs)?
        .encode(name, value)
}

/// Decode with each codec in order, returning the first success.
pub fn decode_multi(name: &str, value: &str, codecs: &[SecureCookie]) -> Result<Vec<u8>> {
    if codecs.is_empty() {
        return Err(CookieError::NoCodecs);
    }

    let mut errors = Vec::with_capacity(codecs.len());
    for codec in codecs {
        match codec.decode(name, value) {
            Ok(decoded) => return Ok(decoded),
            Err(e) => errors.push(e),
        }
    }

    Err(CookieError::AllCodecsFailed(errors))
}

/// Generate `length` bytes of key material from the OS-seeded RNG.
pub fn generate_random_key(length: usize) -> Vec<u8> {
    let mut key = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut key);
    key
}
