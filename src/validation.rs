use crate::error::{Error, Result};
use crate::types::{DigParams, KeyId};

/// Parses a textual key ID.
///
/// Accepted formats:
/// - 16 hex characters (long key ID)
/// - 40 hex characters (v4 fingerprint; the key ID is its last 16 digits)
/// - Either of the above with "0x" prefix
///
/// Short 8-digit IDs are rejected: they do not identify a keyring member.
pub fn validate_keyid(keyid: &str) -> Result<KeyId> {
    if keyid.is_empty() {
        return Err(Error::InvalidKeyId {
            keyid: keyid.to_string(),
            reason: "key ID cannot be empty".to_string(),
        });
    }

    let normalized = keyid
        .strip_prefix("0x")
        .or_else(|| keyid.strip_prefix("0X"))
        .unwrap_or(keyid);

    if !normalized.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidKeyId {
            keyid: keyid.to_string(),
            reason: "key ID must contain only hexadecimal characters".to_string(),
        });
    }

    let digits = match normalized.len() {
        16 => normalized,
        40 => &normalized[24..],
        len => {
            return Err(Error::InvalidKeyId {
                keyid: keyid.to_string(),
                reason: format!("key ID must be 16 or 40 hex characters (got {})", len),
            });
        }
    };

    let mut bytes = [0u8; 8];
    hex::decode_to_slice(digits, &mut bytes).map_err(|e| Error::InvalidKeyId {
        keyid: keyid.to_string(),
        reason: e.to_string(),
    })?;
    Ok(KeyId::new(bytes))
}

/// Rejects public-key parameters that look like a placeholder or a
/// half-parsed key: zero signer ID, zero creation time, or no user ID.
pub fn check_key_params(params: &DigParams) -> Result<()> {
    let reason = if params.signid.is_zero() {
        "key ID is all zero"
    } else if params.time == [0; 4] {
        "creation time is zero"
    } else if params.userid.is_none() {
        "no user ID"
    } else {
        return Ok(());
    };

    Err(Error::UnusableKey {
        keyid: params.signid.to_string(),
        reason: reason.to_string(),
    })
}
