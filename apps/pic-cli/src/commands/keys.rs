// keys.rs — `pic keys`: show the trusted keyring and each key's status.

use chrono::Utc;
use pic_keyring::example_keyring;

use super::Bootstrap;

pub fn execute(boot: &Bootstrap, write_example: bool) -> anyhow::Result<()> {
    if write_example {
        println!("{}", serde_json::to_string_pretty(&example_keyring())?);
        return Ok(());
    }

    let source = boot.keyring_source();
    let keyring = boot.load_keyring()?;
    println!("Keyring source: {}", source);

    if keyring.is_empty() {
        println!("No trusted keys. Signature evidence will not verify.");
    }

    let now = Utc::now();
    for key in keyring.keys() {
        let expires = key
            .expires_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "  {:<28} {:<8} expires: {}",
            key.key_id,
            keyring.status(&key.key_id, now).as_str(),
            expires
        );
    }

    let revoked: Vec<&str> = keyring.revoked_ids().collect();
    if !revoked.is_empty() {
        println!("Revoked: {}", revoked.join(", "));
    }
    Ok(())
}
