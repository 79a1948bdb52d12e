// signing.rs — `pic keygen` and `pic sign`: Ed25519 helpers for producing
// signature evidence.
//
// Private keys are PKCS#8 documents, base64 encoded. Public keys are printed
// as a keyring entry ready to paste into pic_keys.json.

use std::path::Path;

use anyhow::{anyhow, Context};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ring::rand::SystemRandom;
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde_json::{json, Value};

use super::read_file;

pub struct GeneratedKey {
    pub private_pkcs8_b64: String,
    pub public_key_b64: String,
}

pub fn generate() -> anyhow::Result<GeneratedKey> {
    let rng = SystemRandom::new();
    let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng)
        .map_err(|_| anyhow!("failed to generate Ed25519 key pair"))?;
    let pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref())
        .map_err(|e| anyhow!("generated key pair is unusable: {}", e))?;
    Ok(GeneratedKey {
        private_pkcs8_b64: STANDARD.encode(pkcs8.as_ref()),
        public_key_b64: STANDARD.encode(pair.public_key().as_ref()),
    })
}

/// Sign `payload` with a base64 PKCS#8 private key; returns the base64
/// signature.
pub fn sign_payload(private_pkcs8_b64: &str, payload: &[u8]) -> anyhow::Result<String> {
    let pkcs8 = STANDARD
        .decode(private_pkcs8_b64.trim())
        .context("private key is not valid base64")?;
    let pair = Ed25519KeyPair::from_pkcs8(&pkcs8)
        .map_err(|e| anyhow!("private key is not an Ed25519 PKCS#8 document: {}", e))?;
    Ok(STANDARD.encode(pair.sign(payload).as_ref()))
}

pub fn keyring_entry(key_id: &str, public_key_b64: &str) -> Value {
    json!({ "trusted_keys": { key_id: public_key_b64 }, "revoked_keys": [] })
}

pub fn execute_keygen(key_id: &str) -> anyhow::Result<()> {
    let key = generate()?;
    println!("Private key (PKCS#8, base64; keep secret):");
    println!("  {}", key.private_pkcs8_b64);
    println!("Keyring entry:");
    println!(
        "{}",
        serde_json::to_string_pretty(&keyring_entry(key_id, &key.public_key_b64))?
    );
    Ok(())
}

/// Print the signature of `file`'s exact bytes.
pub fn execute_sign(private_key: &str, file: &Path) -> anyhow::Result<()> {
    let payload = read_file(file)?;
    println!("{}", sign_payload(private_key, &payload)?);
    Ok(())
}
