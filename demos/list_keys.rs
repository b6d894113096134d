//! Example: load key files into a keyring and list its members
//!
//! Run with: cargo run --example list_keys -- RPM-GPG-KEY-one RPM-GPG-KEY-two

use pkg_keyring::{AddOutcome, Keyring, PublicKey};

fn main() -> pkg_keyring::Result<()> {
    let keyring = Keyring::new();

    for path in std::env::args().skip(1) {
        let key = PublicKey::read(&path)?;
        if keyring.add_key(&key) == AddOutcome::Duplicate {
            println!("{}: key {} already loaded", path, key.key_id());
        }
    }

    println!("Found {} keys in keyring\n", keyring.len());

    for key in keyring.keys() {
        println!("{}", format_key_output(&key));
    }

    Ok(())
}

fn format_key_output(key: &PublicKey) -> String {
    let usable_marker = match key.dig() {
        Ok(_) => "[+]",
        Err(_) => "[!]",
    };

    let created = key
        .created()
        .map(|d| format!(" created {}", d.date_naive()))
        .unwrap_or_default();

    format!(
        "{} {} {}{}\n    {}",
        usable_marker,
        key.key_id(),
        key.algorithm(),
        created,
        key.user_id().unwrap_or("<no user ID>")
    )
}
