//! In-memory OpenPGP public key trust store for package verification.
//!
//! This crate holds the keys a package manager trusts and answers whether a
//! signature claims to come from one of them, with parameters consistent with
//! the stored key. Checking the signature bytes themselves is left to the
//! caller once a match is reported.
//!
//! # Example
//!
//! ```no_run
//! use pkg_keyring::{Dig, Keyring, LookupResult, OpenPgpParser, PacketParser, PublicKey};
//!
//! fn main() -> pkg_keyring::Result<()> {
//!     let keyring = Keyring::new();
//!     let key = PublicKey::read("RPM-GPG-KEY-packager")?;
//!     keyring.add_key(&key);
//!
//!     let sig = std::fs::read("package.sig")?;
//!     let mut dig = Dig::new();
//!     OpenPgpParser::new().merge(&sig, &mut dig)?;
//!
//!     match keyring.lookup(&mut dig) {
//!         LookupResult::Match => println!("signer {} is trusted", key.key_id()),
//!         other => println!("lookup: {}", other),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Packet parsing
//!
//! Keys and keyrings reach OpenPGP data only through [`PacketParser`].
//! [`OpenPgpParser`] handles v3/v4 keys and signatures; keys built with
//! [`PublicKey::with_parser`] use any other implementation for their whole
//! lifetime, including keyring lookups.

pub mod armor;
mod error;
mod keyring;
mod parse;
mod pubkey;
mod types;
mod validation;

#[cfg(test)]
mod test_util;

pub use error::{Error, Result};
pub use keyring::Keyring;
pub use parse::{OpenPgpParser, PacketParser};
pub use pubkey::PublicKey;
pub use types::{AddOutcome, Dig, DigParams, KeyId, LookupResult, PacketTag, PubkeyAlgo};
pub use validation::{check_key_params, validate_keyid};
