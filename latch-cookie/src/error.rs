use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CookieError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Cookie value too long: {len} bytes (max {max})")]
    ValueTooLong { len: usize, max: usize },

    #[error("Base64 decode error: {0}")]
    Decode(String),

    #[error("Malformed cookie value")]
    Malformed,

    #[error("Cookie signature mismatch")]
    MacInvalid,

    #[error("Invalid cookie timestamp")]
    InvalidTimestamp,

    #[error("Cookie expired")]
    Expired,

    #[error("Encryption failed")]
    Encryption,

    #[error("Decryption failed")]
    Decryption,

    #[error("Invalid Set-Cookie header: {0}")]
    InvalidHeader(String),

    #[error("No codecs configured")]
    NoCodecs,

    #[error("Cookie rejected by all {} codecs", .0.len())]
    AllCodecsFailed(Vec<CookieError>),
}

impl CookieError {
    /// Whether this error came from a cookie that was well formed but too old.
    pub fn is_expired(&self) -> bool {
        match self {
            CookieError::Expired => true,
            CookieError::AllCodecsFailed(errors) => errors.iter().any(|e| e.is_expired()),
            _ => false,
        }
    }
}

impl From<base64::DecodeError> for CookieError {
    fn from(err: base64::DecodeError) -> Self {
        CookieError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CookieError>;
