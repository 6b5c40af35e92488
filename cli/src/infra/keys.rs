//! RSA key generation: implements `KeyGenerator` with the `rsa` crate.

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs1::EncodeRsaPrivateKey,
    pkcs8::LineEnding,
    traits::PublicKeyParts,
};

use crate::application::ports::KeyGenerator;
use crate::domain::credentials::EphemeralKeyPair;

const KEY_TYPE: &str = "ssh-rsa";
const KEY_COMMENT: &str = "hcutils";

/// Generates RSA key pairs in memory.
pub struct RsaKeyGenerator {
    pub bits: usize,
}

impl Default for RsaKeyGenerator {
    fn default() -> Self {
        Self { bits: 2048 }
    }
}

impl KeyGenerator for RsaKeyGenerator {
    fn generate(&self) -> Result<EphemeralKeyPair> {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, self.bits).context("failed to generate private key")?;
        let public = RsaPublicKey::from(&private);

        let private_pem = private
            .to_pkcs1_pem(LineEnding::LF)
            .context("failed to encode private key")?
            .as_str()
            .to_owned();
        Ok(EphemeralKeyPair::new(private_pem, authorized_key(&public)))
    }
}

/// `ssh-rsa <base64 blob> hcutils`, as found in `authorized_keys`.
#[must_use]
pub fn authorized_key(public: &RsaPublicKey) -> String {
    let mut blob = Vec::new();
    put_string(&mut blob, KEY_TYPE.as_bytes());
    put_mpint(&mut blob, &public.e().to_bytes_be());
    put_mpint(&mut blob, &public.n().to_bytes_be());
    format!("{KEY_TYPE} {} {KEY_COMMENT}", BASE64.encode(blob))
}

#[allow(clippy::cast_possible_truncation)] // Key material is far below 4 GiB
fn put_string(buf: &mut Vec<u8>, data: &[u8]) {
    buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
    buf.extend_from_slice(data);
}

/// Unsigned big-endian integer in SSH `mpint` form.
fn put_mpint(buf: &mut Vec<u8>, magnitude: &[u8]) {
    let start = magnitude.iter().position(|b| *b != 0).unwrap_or(magnitude.len());
    let trimmed = &magnitude[start..];
    if trimmed.first().is_some_and(|b| b & 0x80 != 0) {
        let mut padded = Vec::with_capacity(trimmed.len() + 1);
        padded.push(0);
        padded.extend_from_slice(trimmed);
        put_string(buf, &padded);
    } else {
        put_string(buf, trimmed);
    }
}
