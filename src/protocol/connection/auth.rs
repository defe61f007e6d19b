use std::path::PathBuf;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Oaep, RsaPublicKey};
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::response::{ErrPayload, ErrPayloadBytes};

/// mysql_native_password authentication
///
/// Formula: SHA1(password) XOR SHA1(challenge + SHA1(SHA1(password)))
///
/// # Arguments
/// * `password` - Plain text password
/// * `challenge` - 20-byte challenge from server (auth_plugin_data)
pub fn auth_mysql_native_password(password: &str, challenge: &[u8]) -> [u8; 20] {
    use sha1::{Digest, Sha1};

    if password.is_empty() {
        return [0u8; 20];
    }

    let stage1_hash = Sha1::digest(password.as_bytes());
    let stage2_hash = Sha1::digest(stage1_hash);

    let mut hasher = Sha1::new();
    hasher.update(challenge);
    hasher.update(stage2_hash);
    let token_hash = hasher.finalize();

    let mut result = [0u8; 20];
    for (out, (a, b)) in result.iter_mut().zip(stage1_hash.iter().zip(token_hash.iter())) {
        *out = a ^ b;
    }
    result
}

/// caching_sha2_password authentication - initial response
///
/// Formula: XOR(SHA256(password), SHA256(SHA256(SHA256(password)), challenge))
pub fn auth_caching_sha2_password(password: &str, challenge: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};

    if password.is_empty() {
        return [0u8; 32];
    }

    let stage1 = Sha256::digest(password.as_bytes());
    let stage2 = Sha256::digest(stage1);

    let mut hasher = Sha256::new();
    hasher.update(stage2);
    hasher.update(challenge);
    let scramble = hasher.finalize();

    let mut result = [0u8; 32];
    for (out, (a, b)) in result.iter_mut().zip(stage1.iter().zip(scramble.iter())) {
        *out = a ^ b;
    }
    result
}

/// Byte asking the server for its RSA key under `sha256_password`
pub const SHA256_PASSWORD_KEY_REQUEST: u8 = 0x01;
/// Byte asking the server for its RSA key during `caching_sha2_password` full auth
pub const CACHING_SHA2_KEY_REQUEST: u8 = 0x02;

/// What the client sends next during a sha256 password exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStep {
    /// Write this frame; the server answers with the auth result
    Send(Vec<u8>),
    /// Write this frame; the server answers with its public key, which goes
    /// to [`Sha256PasswordAuth::resume`]
    SendAndRead(Vec<u8>),
}

/// Password exchange of `sha256_password` and of `caching_sha2_password`
/// full authentication.
///
/// Over a secure channel the password goes in clear. Otherwise it is XORed
/// with the seed and RSA-encrypted (OAEP, SHA-1) with the server key, read
/// from `key_file` or requested from the server.
#[derive(Debug, Clone)]
pub struct Sha256PasswordAuth {
    password: String,
    seed: Vec<u8>,
    tls: bool,
    key_file: Option<PathBuf>,
    key_request: u8,
}

impl Sha256PasswordAuth {
    /// `seed` is the scramble of the handshake or auth switch request. A
    /// trailing NUL is not part of it.
    pub fn new(
        password: impl Into<String>,
        seed: &[u8],
        tls: bool,
        key_file: Option<PathBuf>,
        key_request: u8,
    ) -> Self {
        let seed = seed.strip_suffix(&[0]).unwrap_or(seed);
        Self {
            password: password.into(),
            seed: seed.to_vec(),
            tls,
            key_file,
            key_request,
        }
    }

    /// First frame of the exchange
    pub fn start(&self) -> Result<AuthStep> {
        if self.password.is_empty() {
            return Ok(AuthStep::Send(Vec::new()));
        }
        if self.tls {
            let mut out = Vec::with_capacity(self.password.len() + 1);
            out.extend_from_slice(self.password.as_bytes());
            out.push(0);
            return Ok(AuthStep::Send(out));
        }
        match &self.key_file {
            Some(path) => {
                let pem = std::fs::read(path).map_err(|e| {
                    sha256_failure(format!(
                        "Could not read server RSA public key from file : serverRsaPublicKeyFile={} ({e})",
                        path.display()
                    ))
                })?;
                let key = parse_public_key(&pem)?;
                Ok(AuthStep::Send(self.encrypt(&key)?))
            }
            None => {
                debug!(request = self.key_request, "requesting server public key");
                Ok(AuthStep::SendAndRead(vec![self.key_request]))
            }
        }
    }

    /// Encrypt the password with the key carried by `frame`, the server's
    /// answer to the key request.
    pub fn resume(&self, frame: &[u8]) -> Result<Vec<u8>> {
        match frame.first() {
            None => Err(sha256_failure("empty public key frame")),
            Some(0xFF) => {
                let message = match ErrPayload::try_from(ErrPayloadBytes(frame)) {
                    Ok(err) => err.message,
                    Err(err) => err.to_string(),
                };
                Err(Error::AuthError(format!("Could not connect: {message}")))
            }
            Some(0xFE) => Err(Error::AuthError(
                "Could not connect: receive AuthSwitchRequest in place of RSA public key. \
                 Did user has the rights to connect to database ?"
                    .to_string(),
            )),
            Some(_) => {
                let body = &frame[1..];
                let pem = match body.iter().position(|&b| b == 0) {
                    Some(end) => &body[..end],
                    None => body,
                };
                let key = parse_public_key(pem)?;
                self.encrypt(&key)
            }
        }
    }

    fn encrypt(&self, key: &RsaPublicKey) -> Result<Vec<u8>> {
        let xored = xor_password(self.password.as_bytes(), &self.seed)?;
        key.encrypt(&mut rand::thread_rng(), Oaep::new::<sha1::Sha1>(), &xored)
            .map_err(sha256_failure)
    }
}

/// A local failure of the key exchange; server answers keep their own wording
fn sha256_failure(detail: impl std::fmt::Display) -> Error {
    Error::AuthError(format!("Could not connect using SHA256 plugin : {detail}"))
}

/// XOR the NUL-terminated password with the repeating seed
pub fn xor_password(password: &[u8], seed: &[u8]) -> Result<Vec<u8>> {
    if seed.is_empty() {
        return Err(sha256_failure("empty authentication seed"));
    }
    Ok(password
        .iter()
        .chain(std::iter::once(&0u8))
        .zip(seed.iter().cycle())
        .map(|(p, s)| p ^ s)
        .collect())
}

/// Parse a PEM `PUBLIC KEY` (X.509 SubjectPublicKeyInfo)
pub fn parse_public_key(pem: &[u8]) -> Result<RsaPublicKey> {
    let text = simdutf8::basic::from_utf8(pem)
        .map_err(|e| sha256_failure(format!("Could read server RSA public key: {e}")))?;
    let body: String = text
        .lines()
        .filter(|line| !line.trim_start().starts_with("-----"))
        .flat_map(str::chars)
        .filter(|c| !c.is_whitespace())
        .collect();
    let der = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| sha256_failure(format!("Could read server RSA public key: {e}")))?;
    RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| sha256_failure(format!("Could read server RSA public key: {e}")))
}
