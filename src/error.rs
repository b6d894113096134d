use std::io;
use std::path::PathBuf;

use crate::types::PacketTag;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("failed to read key material: {0}")]
    Io(#[from] io::Error),

    #[error("packet buffer is empty")]
    EmptyPacket,

    #[error("no OpenPGP packets found in {}", .path.display())]
    NoPackets { path: PathBuf },

    #[error("malformed packet: {reason}")]
    MalformedPacket { reason: String },

    #[error("unsupported {tag} packet version {version}")]
    UnsupportedPacket { tag: PacketTag, version: u8 },

    #[error("no {tag} parameters in packet data")]
    MissingParams { tag: PacketTag },

    #[error("invalid ASCII armor: {reason}")]
    InvalidArmor { reason: String },

    #[error("invalid key ID '{keyid}': {reason}")]
    InvalidKeyId { keyid: String, reason: String },

    #[error("key {keyid} is not usable: {reason}")]
    UnusableKey { keyid: String, reason: String },
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPacket {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
