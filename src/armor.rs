//! ASCII armor (RFC 4880 §6) for key and signature blocks.

use std::fs;
use std::path::Path;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use tracing::debug;

use crate::error::{Error, Result};

const CRC24_INIT: u32 = 0x00B7_04CE;
const CRC24_POLY: u32 = 0x0186_4CFB;
const LINE_WIDTH: usize = 64;

/// The block types this crate reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmorKind {
    PublicKey,
    Signature,
}

impl ArmorKind {
    fn label(self) -> &'static str {
        match self {
            Self::PublicKey => "PGP PUBLIC KEY BLOCK",
            Self::Signature => "PGP SIGNATURE",
        }
    }
}

pub(crate) fn crc24(data: &[u8]) -> u32 {
    let mut crc = CRC24_INIT;
    for byte in data {
        crc ^= u32::from(*byte) << 16;
        for _ in 0..8 {
            crc <<= 1;
            if crc & 0x0100_0000 != 0 {
                crc ^= CRC24_POLY;
            }
        }
    }
    crc & 0x00FF_FFFF
}

/// Returns true if `data` looks like an armored block rather than binary packets.
pub fn is_armored(data: &[u8]) -> bool {
    data.trim_ascii_start().starts_with(b"-----BEGIN PGP ")
}

/// Decodes the first armored block in `text` into raw packet bytes.
///
/// Armor headers are skipped; a CRC-24 checksum line, when present, must match.
pub fn decode_armor(text: &str) -> Result<Vec<u8>> {
    let mut lines = text.lines().map(str::trim_end);

    lines
        .by_ref()
        .find(|line| line.starts_with("-----BEGIN PGP ") && line.ends_with("-----"))
        .ok_or_else(|| invalid("missing BEGIN line"))?;

    let mut body = String::new();
    let mut checksum = None;
    let mut in_headers = true;
    let mut terminated = false;

    for line in lines {
        if line.starts_with("-----END PGP ") {
            terminated = true;
            break;
        }
        if in_headers {
            if line.is_empty() {
                in_headers = false;
                continue;
            }
            if line.contains(": ") {
                continue;
            }
            in_headers = false;
        }
        if let Some(crc) = line.strip_prefix('=')
            && crc.len() == 4
        {
            checksum = Some(crc.to_string());
            continue;
        }
        body.push_str(line.trim());
    }

    if !terminated {
        return Err(invalid("missing END line"));
    }

    let data = BASE64
        .decode(body.as_bytes())
        .map_err(|e| invalid(format!("bad base64 body: {}", e)))?;

    if let Some(crc) = checksum {
        let expected = BASE64
            .decode(crc.as_bytes())
            .map_err(|e| invalid(format!("bad checksum encoding: {}", e)))?;
        let actual = crc24(&data).to_be_bytes();
        if expected.as_slice() != &actual[1..] {
            return Err(invalid("CRC-24 checksum mismatch"));
        }
    } else {
        debug!("armored block has no checksum line");
    }

    Ok(data)
}

/// Wraps raw packet bytes in an armored block with a CRC-24 checksum line.
pub fn encode_armor(kind: ArmorKind, data: &[u8]) -> String {
    let encoded = BASE64.encode(data);
    let crc = crc24(data).to_be_bytes();

    let mut out = format!("-----BEGIN {}-----\n\n", kind.label());
    for chunk in encoded.as_bytes().chunks(LINE_WIDTH) {
        // base64 output is ASCII
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push('\n');
    }
    out.push('=');
    out.push_str(&BASE64.encode(&crc[1..]));
    out.push('\n');
    out.push_str(&format!("-----END {}-----\n", kind.label()));
    out
}

/// Reads all OpenPGP packets stored at `path`, binary or armored.
pub fn read_packets(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let raw = fs::read(path)?;

    let pkts = if is_armored(&raw) {
        let text = std::str::from_utf8(&raw).map_err(|e| invalid(e.to_string()))?;
        decode_armor(text)?
    } else {
        raw
    };

    if pkts.is_empty() {
        return Err(Error::NoPackets {
            path: path.to_path_buf(),
        });
    }

    debug!(path = %path.display(), len = pkts.len(), "read packets");
    Ok(pkts)
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::InvalidArmor {
        reason: reason.into(),
    }
}
