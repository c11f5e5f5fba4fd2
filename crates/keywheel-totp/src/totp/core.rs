//! Code derivation — RFC 6238 time steps over RFC 4226 dynamic truncation,
//! plus the Steam Guard variant.
//!
//! Everything here is a pure function of `(config, timestamp)`: no state,
//! no I/O, safe to call concurrently from any thread.

use crate::totp::types::*;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

/// Fixed alphabet Steam Guard maps truncated values into.
const STEAM_ALPHABET: &[u8; 26] = b"23456789BCDFGHJKMNPQRTVWXY";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Raw HMAC-OTP (RFC 4226 §5.3)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compute a numeric HOTP code for the given raw key bytes and counter.
pub fn hotp_raw(key: &[u8], counter: u64, digits: u8, algo: Algorithm) -> String {
    let digest = compute_hmac(key, &counter.to_be_bytes(), algo);
    truncate_decimal(&digest, digits)
}

/// Compute a Steam Guard code for the given raw key bytes and counter.
pub fn steam_raw(key: &[u8], counter: u64) -> String {
    let digest = compute_hmac(key, &counter.to_be_bytes(), Algorithm::Steam);
    truncate_steam(&digest)
}

/// Compute HMAC(key, message) using the specified algorithm.
fn compute_hmac(key: &[u8], data: &[u8], algo: Algorithm) -> Vec<u8> {
    match algo {
        // Steam Guard is HMAC-SHA1 with a different truncation step.
        Algorithm::Sha1 | Algorithm::Steam => {
            let mut mac =
                Hmac::<Sha1>::new_from_slice(key).expect("HMAC accepts any key length");
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
        Algorithm::Sha256 => {
            let mut mac =
                Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key length");
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
        Algorithm::Sha512 => {
            let mut mac =
                Hmac::<Sha512>::new_from_slice(key).expect("HMAC accepts any key length");
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
    }
}

/// Dynamic truncation per RFC 4226 §5.3: 31-bit integer reduced mod 10^digits.
fn truncate_decimal(digest: &[u8], digits: u8) -> String {
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((digest[offset] as u64 & 0x7f) << 24)
        | ((digest[offset + 1] as u64) << 16)
        | ((digest[offset + 2] as u64) << 8)
        | (digest[offset + 3] as u64);
    let modulus = 10u64.pow(digits as u32);
    let code = binary % modulus;
    format!("{:0>width$}", code, width = digits as usize)
}

/// Steam truncation: the same data-dependent 4-byte window, then five walks
/// mapping the running value into the fixed 26-character alphabet.
fn truncate_steam(digest: &[u8]) -> String {
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let mut binary = ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | (digest[offset + 3] as u32);
    let mut code = String::with_capacity(STEAM_CODE_LEN);
    for _ in 0..STEAM_CODE_LEN {
        code.push(STEAM_ALPHABET[(binary % 26) as usize] as char);
        binary /= 26;
    }
    code
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Time steps (RFC 6238)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compute the time-step counter for a given unix timestamp.
pub fn time_step_at(unix_seconds: u64, period: u32) -> u64 {
    unix_seconds / period as u64
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Code derivation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Derive the code for `config` at `unix_seconds`.
///
/// Deterministic within a time step: any two timestamps in the same step
/// produce the same code value.
pub fn compute(config: &OtpConfig, unix_seconds: u64) -> Result<Code, OtpError> {
    config.validate()?;
    let step = time_step_at(unix_seconds, config.period);
    let value = match config.algorithm {
        Algorithm::Steam => steam_raw(config.secret.as_bytes(), step),
        algo => hotp_raw(config.secret.as_bytes(), step, config.digits, algo),
    };
    Ok(Code {
        value,
        generated_at: unix_seconds,
        period: config.period,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Secret codec
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Decode a base-32 secret (with or without spaces/dashes, case-insensitive).
pub fn decode_secret(b32: &str) -> Result<Vec<u8>, OtpError> {
    let cleaned = b32.replace(' ', "").replace('-', "").to_uppercase();
    if cleaned.is_empty() {
        return Err(OtpError::new(OtpErrorKind::InvalidSecret, "Empty base-32 secret"));
    }
    // Pad to multiple of 8 if needed
    let padded = pad_base32(&cleaned);
    base32::decode(base32::Alphabet::Rfc4648 { padding: true }, &padded)
        .or_else(|| base32::decode(base32::Alphabet::Rfc4648 { padding: false }, &cleaned))
        .ok_or_else(|| OtpError::new(OtpErrorKind::InvalidSecret, "Invalid base-32 secret"))
}

/// Encode raw bytes to base-32 (no padding, uppercase).
pub fn encode_secret(bytes: &[u8]) -> String {
    base32::encode(base32::Alphabet::Rfc4648 { padding: false }, bytes)
}

/// Pad a base-32 string to a multiple of 8 with '='.
fn pad_base32(s: &str) -> String {
    let remainder = s.len() % 8;
    if remainder == 0 {
        s.to_string()
    } else {
        let pad_count = 8 - remainder;
        format!("{}{}", s, "=".repeat(pad_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── RFC 4226 test vectors (Appendix D) ───────────────────────
    // Secret: "12345678901234567890" (ASCII) → base32: GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ

    const RFC_SECRET_B32: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    fn rfc_key() -> Vec<u8> {
        decode_secret(RFC_SECRET_B32).unwrap()
    }

    fn config(digits: u8, period: u32, algo: Algorithm) -> OtpConfig {
        OtpConfig::from_base32(RFC_SECRET_B32, period, digits, algo).unwrap()
    }

    #[test]
    fn rfc4226_hotp_vectors() {
        let expected = [
            "755224", "287082", "359152", "969429", "338314",
            "254676", "287922", "162583", "399871", "520489",
        ];
        for (counter, exp) in expected.iter().enumerate() {
            let code = hotp_raw(&rfc_key(), counter as u64, 6, Algorithm::Sha1);
            assert_eq!(&code, exp, "HOTP mismatch at counter {}", counter);
        }
    }

    // ── RFC 6238 test vectors ────────────────────────────────────

    #[test]
    fn rfc6238_sha1_vectors() {
        let cfg = config(8, 30, Algorithm::Sha1);
        for (t, expected) in [
            (59u64, "94287082"),
            (1111111109, "07081804"),
            (1111111111, "14050471"),
            (1234567890, "89005924"),
            (2000000000, "69279037"),
            (20000000000, "65353130"),
        ] {
            let code = compute(&cfg, t).unwrap();
            assert_eq!(code.value, expected, "mismatch at T={}", t);
            assert_eq!(code.generated_at, t);
            assert_eq!(code.period, 30);
        }
    }

    #[test]
    fn rfc6238_sha256_vector() {
        let secret_b32 = encode_secret(b"12345678901234567890123456789012");
        let cfg = OtpConfig::from_base32(&secret_b32, 30, 8, Algorithm::Sha256).unwrap();
        assert_eq!(compute(&cfg, 59).unwrap().value, "46119246");
    }

    #[test]
    fn rfc6238_sha512_vector() {
        let secret_b32 = encode_secret(
            b"1234567890123456789012345678901234567890123456789012345678901234",
        );
        let cfg = OtpConfig::from_base32(&secret_b32, 30, 8, Algorithm::Sha512).unwrap();
        assert_eq!(compute(&cfg, 59).unwrap().value, "90693936");
    }

    // ── Determinism within a time step ───────────────────────────

    #[test]
    fn same_step_same_code() {
        let cfg = config(6, 30, Algorithm::Sha1);
        // 30..=59 all map to step 1
        let first = compute(&cfg, 30).unwrap();
        let last = compute(&cfg, 59).unwrap();
        assert_eq!(first.value, last.value);
        let next = compute(&cfg, 60).unwrap();
        assert_ne!(first.value, next.value);
    }

    #[test]
    fn numeric_value_length_matches_digits() {
        for digits in MIN_DIGITS..=MAX_DIGITS {
            let cfg = config(digits, 30, Algorithm::Sha1);
            let code = compute(&cfg, 1111111109).unwrap();
            assert_eq!(code.value.len(), digits as usize);
            assert!(code.value.chars().all(|c| c.is_ascii_digit()));
        }
    }

    // ── Steam variant ────────────────────────────────────────────
    // Expected values pinned against an independent implementation.

    #[test]
    fn steam_vectors_rfc_key() {
        for (t, expected) in [(59u64, "PV9M4"), (1111111109, "PY4YB"), (1234567890, "VHHQY")] {
            assert_eq!(steam_raw(&rfc_key(), t / 30), expected, "mismatch at T={}", t);
        }
    }

    #[test]
    fn steam_vectors_short_key() {
        let key = decode_secret("JBSWY3DPEHPK3PXP").unwrap();
        assert_eq!(steam_raw(&key, 0), "VH8YJ");
        assert_eq!(steam_raw(&key, 1), "2YXGV");
        assert_eq!(steam_raw(&key, 1111111109 / 30), "CWDGV");
    }

    #[test]
    fn steam_compute_shape() {
        let secret = SecretBytes::from_base32("JBSWY3DPEHPK3PXP").unwrap();
        let cfg = OtpConfig::steam(secret).unwrap();
        let code = compute(&cfg, 59).unwrap();
        assert_eq!(code.value, "2YXGV");
        assert_eq!(code.value.len(), STEAM_CODE_LEN);
        assert!(code.value.bytes().all(|b| STEAM_ALPHABET.contains(&b)));
    }

    // ── Config errors ────────────────────────────────────────────

    #[test]
    fn compute_rejects_empty_secret() {
        let cfg = OtpConfig {
            secret: SecretBytes::new(vec![]),
            period: 30,
            digits: 6,
            algorithm: Algorithm::Sha1,
        };
        assert_eq!(compute(&cfg, 59).unwrap_err().kind, OtpErrorKind::InvalidSecret);
    }

    #[test]
    fn compute_rejects_bad_digits() {
        let cfg = OtpConfig {
            secret: SecretBytes::from_base32("JBSWY3DPEHPK3PXP").unwrap(),
            period: 30,
            digits: 4,
            algorithm: Algorithm::Sha1,
        };
        assert_eq!(
            compute(&cfg, 59).unwrap_err().kind,
            OtpErrorKind::UnsupportedConfig
        );
    }

    #[test]
    fn compute_rejects_zero_period() {
        let cfg = OtpConfig {
            secret: SecretBytes::from_base32("JBSWY3DPEHPK3PXP").unwrap(),
            period: 0,
            digits: 6,
            algorithm: Algorithm::Sha1,
        };
        assert_eq!(
            compute(&cfg, 59).unwrap_err().kind,
            OtpErrorKind::UnsupportedConfig
        );
    }

    // ── Time-step helpers ────────────────────────────────────────

    #[test]
    fn time_step_calculation() {
        assert_eq!(time_step_at(0, 30), 0);
        assert_eq!(time_step_at(29, 30), 0);
        assert_eq!(time_step_at(30, 30), 1);
        assert_eq!(time_step_at(59, 30), 1);
        assert_eq!(time_step_at(60, 30), 2);
        assert_eq!(time_step_at(119, 60), 1);
    }

    // ── Secret codec ─────────────────────────────────────────────

    #[test]
    fn decode_encode_roundtrip() {
        let original = b"hello world secret";
        let b32 = encode_secret(original);
        let decoded = decode_secret(&b32).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn decode_with_spaces_dashes() {
        let clean = decode_secret("JBSWY3DPEHPK3PXP").unwrap();
        let spaced = decode_secret("JBSW Y3DP EHPK 3PXP").unwrap();
        let dashed = decode_secret("JBSW-Y3DP-EHPK-3PXP").unwrap();
        assert_eq!(clean, spaced);
        assert_eq!(spaced, dashed);
    }

    #[test]
    fn decode_case_insensitive() {
        let upper = decode_secret("JBSWY3DPEHPK3PXP").unwrap();
        let lower = decode_secret("jbswy3dpehpk3pxp").unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn decode_invalid() {
        assert!(decode_secret("!!!").is_err());
        assert!(decode_secret("").is_err());
        assert!(decode_secret("  - ").is_err());
    }
}
