//! Core types for TOTP code derivation.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// Smallest supported digit count for numeric codes.
pub const MIN_DIGITS: u8 = 5;
/// Largest supported digit count for numeric codes.
pub const MAX_DIGITS: u8 = 10;
/// Default digit count per the key-URI spec.
pub const DEFAULT_DIGITS: u8 = 6;
/// Default time-step period in seconds.
pub const DEFAULT_PERIOD: u32 = 30;
/// Steam Guard codes are always 5 characters, regardless of `digits`.
pub const STEAM_CODE_LEN: usize = 5;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Algorithm
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Hash algorithm used for HMAC-based code derivation.
///
/// `Steam` is HMAC-SHA1 under the hood but truncates into a 5-character
/// alphanumeric code instead of decimal digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    Sha1,
    Sha256,
    Sha512,
    Steam,
}

impl Default for Algorithm {
    fn default() -> Self {
        Self::Sha1
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1 => write!(f, "SHA1"),
            Self::Sha256 => write!(f, "SHA256"),
            Self::Sha512 => write!(f, "SHA512"),
            Self::Steam => write!(f, "STEAM"),
        }
    }
}

impl Algorithm {
    /// Parse from a case-insensitive string.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SHA1" | "SHA-1" | "HMACSHA1" | "HMAC-SHA1" => Some(Self::Sha1),
            "SHA256" | "SHA-256" | "HMACSHA256" | "HMAC-SHA256" => Some(Self::Sha256),
            "SHA512" | "SHA-512" | "HMACSHA512" | "HMAC-SHA512" => Some(Self::Sha512),
            "STEAM" => Some(Self::Steam),
            _ => None,
        }
    }

    /// URI-safe name for `otpauth://` parameters.
    pub fn uri_name(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
            Self::Steam => "STEAM",
        }
    }

    /// Whether codes are plain decimal digits.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Steam)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Secret key material
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Raw HMAC key bytes, already decoded from base-32.
///
/// The buffer is zeroed on drop and the `Debug` output never contains the
/// bytes. This type is intentionally not `Serialize` — the engine never
/// persists secret material.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Decode from a base-32 string (tolerant of spaces, dashes, case).
    pub fn from_base32(secret_b32: &str) -> Result<Self, OtpError> {
        crate::totp::core::decode_secret(secret_b32).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for SecretBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for SecretBytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes({} bytes)", self.0.len())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  OTP configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Everything needed to derive codes for one account.
///
/// Invariants: non-empty secret, `period > 0`, `digits` within
/// [`MIN_DIGITS`]..=[`MAX_DIGITS`] for numeric algorithms. `validate`
/// enforces them; the checked constructors call it for you.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpConfig {
    pub secret: SecretBytes,
    /// Time-step period in seconds (typically 30).
    pub period: u32,
    /// Number of digits in the generated code (numeric algorithms only).
    pub digits: u8,
    pub algorithm: Algorithm,
}

impl OtpConfig {
    /// Checked constructor.
    pub fn new(
        secret: SecretBytes,
        period: u32,
        digits: u8,
        algorithm: Algorithm,
    ) -> Result<Self, OtpError> {
        let config = Self {
            secret,
            period,
            digits,
            algorithm,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checked constructor from a base-32 secret.
    pub fn from_base32(
        secret_b32: &str,
        period: u32,
        digits: u8,
        algorithm: Algorithm,
    ) -> Result<Self, OtpError> {
        Self::new(SecretBytes::from_base32(secret_b32)?, period, digits, algorithm)
    }

    /// Steam Guard configuration: fixed 30-second period, 5-character codes.
    pub fn steam(secret: SecretBytes) -> Result<Self, OtpError> {
        Self::new(secret, DEFAULT_PERIOD, STEAM_CODE_LEN as u8, Algorithm::Steam)
    }

    /// Check the config invariants.
    pub fn validate(&self) -> Result<(), OtpError> {
        if self.secret.is_empty() {
            return Err(OtpError::new(OtpErrorKind::InvalidSecret, "secret key is empty"));
        }
        if self.period == 0 {
            return Err(OtpError::new(
                OtpErrorKind::UnsupportedConfig,
                "period must be greater than zero",
            ));
        }
        if self.algorithm.is_numeric() && !(MIN_DIGITS..=MAX_DIGITS).contains(&self.digits) {
            return Err(OtpError::new(
                OtpErrorKind::UnsupportedConfig,
                format!("unsupported digit count: {}", self.digits),
            ));
        }
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Generated code
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A derived one-time code with the timing info needed to expire it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    /// The code string, left-zero-padded to `digits` for numeric
    /// algorithms or the 5-character Steam form.
    pub value: String,
    /// Unix timestamp (seconds) the code was derived at.
    pub generated_at: u64,
    /// Period copied from the config that produced the code.
    pub period: u32,
}

impl Code {
    /// Split the code for display (e.g. "123 456").
    pub fn display_grouped(&self) -> String {
        if self.value.len() <= 4 {
            return self.value.clone();
        }
        let mid = self.value.len() / 2;
        format!("{} {}", &self.value[..mid], &self.value[mid..])
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Error type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Error kind for this crate. All kinds are permanent — retrying the same
/// input cannot succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OtpErrorKind {
    /// Secret is empty or not decodable base-32.
    InvalidSecret,
    /// Unsupported `(algorithm, digits)` combination or zero period.
    UnsupportedConfig,
    /// Malformed `otpauth://` / `steam://` URI.
    InvalidUri,
    /// Item id unknown to a secret provider.
    NotFound,
}

/// Crate-level error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpError {
    pub kind: OtpErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl fmt::Display for OtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)?;
        if let Some(d) = &self.detail {
            write!(f, " ({})", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for OtpError {}

impl OtpError {
    pub fn new(kind: OtpErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl From<OtpError> for String {
    fn from(e: OtpError) -> String {
        e.to_string()
    }
}
