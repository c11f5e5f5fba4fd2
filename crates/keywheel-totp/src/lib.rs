//! # KeyWheel – TOTP code derivation
//!
//! Pure, stateless one-time-password derivation:
//!
//! - **RFC 4226 / 6238** – TOTP generation with SHA-1, SHA-256, SHA-512
//! - **Steam Guard** – the 5-character alphanumeric variant
//! - **Expiration arithmetic** – boundary, remaining time, elapsed fraction
//! - **otpauth:// URIs** – Parsing & generation per the Google Authenticator spec
//! - **Secret codec** – tolerant base-32 decode with best-effort zeroize-on-drop

pub mod totp;
