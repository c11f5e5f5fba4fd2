//! Key-URI parsing and generation per the Google Authenticator format:
//! <https://github.com/google/google-authenticator/wiki/Key-Uri-Format>
//!
//! Format: `otpauth://totp/ISSUER:LABEL?secret=BASE32&issuer=ISSUER&algorithm=SHA1&digits=6&period=30`
//!
//! The non-standard `steam://SECRET` scheme (and `algorithm=STEAM` inside an
//! `otpauth://` URI) selects the Steam Guard variant.

use crate::totp::core::encode_secret;
use crate::totp::types::*;

/// An account parsed from a key URI: display identity plus derivation config.
#[derive(Debug, Clone)]
pub struct OtpAuthAccount {
    /// Account label (e.g. "user@example.com").
    pub label: String,
    /// Issuer (e.g. "GitHub", "Steam").
    pub issuer: Option<String>,
    pub config: OtpConfig,
}

impl OtpAuthAccount {
    /// Display name: "Issuer (label)" or just "label".
    pub fn display_name(&self) -> String {
        match &self.issuer {
            Some(iss) if !iss.is_empty() => format!("{} ({})", iss, self.label),
            _ => self.label.clone(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Parse
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse an `otpauth://` or `steam://` URI into an `OtpAuthAccount`.
pub fn parse_key_uri(uri: &str) -> Result<OtpAuthAccount, OtpError> {
    if let Some(rest) = uri.strip_prefix("steam://") {
        return parse_steam_uri(rest);
    }

    let url = url::Url::parse(uri)
        .map_err(|e| OtpError::new(OtpErrorKind::InvalidUri, format!("Invalid URI: {}", e)))?;

    if url.scheme() != "otpauth" {
        return Err(OtpError::new(
            OtpErrorKind::InvalidUri,
            format!("Expected scheme 'otpauth' or 'steam', got '{}'", url.scheme()),
        ));
    }

    match url.host_str() {
        Some("totp") => {}
        Some("hotp") => {
            return Err(OtpError::new(
                OtpErrorKind::UnsupportedConfig,
                "Counter-based (HOTP) accounts are not supported",
            ))
        }
        other => {
            return Err(OtpError::new(
                OtpErrorKind::InvalidUri,
                format!("Unknown OTP type: {:?}", other),
            ))
        }
    }

    // Path is "/LABEL" or "/ISSUER:LABEL"
    let path = url.path();
    let path = path.strip_prefix('/').unwrap_or(path);
    let path_decoded = url_decode(path);

    let (path_issuer, label) = if let Some(colon_pos) = path_decoded.find(':') {
        let issuer = path_decoded[..colon_pos].trim().to_string();
        let label = path_decoded[colon_pos + 1..].trim().to_string();
        (Some(issuer), label)
    } else {
        (None, path_decoded.to_string())
    };

    // Query parameters
    let mut secret = None;
    let mut param_issuer = None;
    let mut algorithm = Algorithm::Sha1;
    let mut digits = DEFAULT_DIGITS;
    let mut period = DEFAULT_PERIOD;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "secret" => secret = Some(value.to_string()),
            "issuer" => param_issuer = Some(value.to_string()),
            "algorithm" => {
                if let Some(algo) = Algorithm::from_str_loose(&value) {
                    algorithm = algo;
                }
            }
            "digits" => {
                if let Ok(d) = value.parse::<u8>() {
                    if (MIN_DIGITS..=MAX_DIGITS).contains(&d) {
                        digits = d;
                    }
                }
            }
            "period" => {
                if let Ok(p) = value.parse::<u32>() {
                    if p > 0 {
                        period = p;
                    }
                }
            }
            _ => {} // ignore unknown params
        }
    }

    let secret = secret
        .ok_or_else(|| OtpError::new(OtpErrorKind::InvalidUri, "Missing 'secret' parameter"))?;
    let secret = SecretBytes::from_base32(&secret)?;

    let config = if algorithm == Algorithm::Steam {
        OtpConfig::steam(secret)?
    } else {
        OtpConfig::new(secret, period, digits, algorithm)?
    };

    // Prefer issuer from query param, then from path prefix
    let issuer = param_issuer.or(path_issuer);

    Ok(OtpAuthAccount {
        label,
        issuer,
        config,
    })
}

/// `steam://SECRET` carries nothing but the base-32 shared secret.
fn parse_steam_uri(rest: &str) -> Result<OtpAuthAccount, OtpError> {
    let secret = rest.trim().trim_end_matches('/');
    if secret.is_empty() {
        return Err(OtpError::new(OtpErrorKind::InvalidUri, "Missing Steam secret"));
    }
    let config = OtpConfig::steam(SecretBytes::from_base32(secret)?)?;
    Ok(OtpAuthAccount {
        label: "Steam".to_string(),
        issuer: Some("Steam".to_string()),
        config,
    })
}

/// Parse multiple URIs (one per line), skipping blanks and comments.
pub fn parse_key_uris(text: &str) -> Vec<Result<OtpAuthAccount, OtpError>> {
    text.lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(parse_key_uri)
        .collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Generate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Generate the key URI for an account.
///
/// Steam accounts round-trip through the `steam://` scheme; everything else
/// becomes an `otpauth://totp/` URI with default parameters omitted.
pub fn build_key_uri(account: &OtpAuthAccount) -> String {
    let config = &account.config;

    if config.algorithm == Algorithm::Steam {
        return format!("steam://{}", encode_secret(config.secret.as_bytes()));
    }

    let label = url_encode(&account.label);
    let path = match &account.issuer {
        Some(iss) if !iss.is_empty() => format!("{}:{}", url_encode(iss), label),
        _ => label,
    };

    let mut params = vec![format!("secret={}", encode_secret(config.secret.as_bytes()))];

    if let Some(ref iss) = account.issuer {
        params.push(format!("issuer={}", url_encode(iss)));
    }
    if config.algorithm != Algorithm::Sha1 {
        params.push(format!("algorithm={}", config.algorithm.uri_name()));
    }
    if config.digits != DEFAULT_DIGITS {
        params.push(format!("digits={}", config.digits));
    }
    if config.period != DEFAULT_PERIOD {
        params.push(format!("period={}", config.period));
    }

    format!("otpauth://totp/{}?{}", path, params.join("&"))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  URL encoding helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn url_encode(s: &str) -> String {
    let mut output = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                output.push(byte as char);
            }
            b' ' => output.push_str("%20"),
            b'@' => output.push_str("%40"),
            _ => output.push_str(&format!("%{:02X}", byte)),
        }
    }
    output
}

fn url_decode(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            let hex: String = chars.by_ref().take(2).collect();
            if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                result.push(byte as char);
            } else {
                result.push('%');
                result.push_str(&hex);
            }
        } else if c == '+' {
            result.push(' ');
        } else {
            result.push(c);
        }
    }
    result
}
