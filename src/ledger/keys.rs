//! Key material for the ledger client
//!
//! Covers the three encodings the chain understands: WIF private keys
//! (base58check, version byte 0x80), legacy `EOS…` public keys (base58
//! with a RIPEMD-160 checksum) and canonical recoverable signatures in the
//! `SIG_K1_…` format.

use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use ripemd::Ripemd160;
use secp256k1::{
    constants::{PUBLIC_KEY_SIZE, SECRET_KEY_SIZE},
    ecdsa::RecoveryId,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};

use crate::error::{RelayError, Result};

/// A thread-safe, lazily initialized Secp256k1 context.
/// This prevents repeated, unnecessary context creation.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

const WIF_VERSION: u8 = 0x80;
const PUBLIC_KEY_PREFIX: &str = "EOS";
const SIGNATURE_PREFIX: &str = "SIG_K1_";

/// Attempts at producing a canonical signature before giving up. In
/// practice one or two nonce retries suffice.
const MAX_SIGNING_ATTEMPTS: u32 = 100;

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Result<Self> {
        let secret_key = SecretKey::new(&mut OsRng);
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);

        Ok(KeyPair {
            secret_key,
            public_key,
        })
    }

    /// Decodes a WIF-encoded private key and derives its public half.
    pub fn from_wif(wif: &str) -> Result<Self> {
        let raw = bs58::decode(wif)
            .into_vec()
            .map_err(|e| RelayError::CryptoError(format!("Invalid WIF encoding: {}", e)))?;
        // version byte + key + 4-byte checksum
        if raw.len() != 1 + SECRET_KEY_SIZE + 4 {
            return Err(RelayError::CryptoError(format!(
                "WIF payload must be {} bytes, got {}",
                1 + SECRET_KEY_SIZE + 4,
                raw.len()
            )));
        }
        let (payload, checksum) = raw.split_at(1 + SECRET_KEY_SIZE);
        if payload[0] != WIF_VERSION {
            return Err(RelayError::CryptoError(format!(
                "Unexpected WIF version byte 0x{:02x}",
                payload[0]
            )));
        }
        let expected = double_sha256(payload);
        if checksum != &expected[..4] {
            return Err(RelayError::CryptoError(
                "WIF checksum mismatch".to_string(),
            ));
        }

        let secret_key = SecretKey::from_slice(&payload[1..])
            .map_err(|e| RelayError::CryptoError(format!("Invalid secret key bytes: {}", e)))?;
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        Ok(KeyPair {
            secret_key,
            public_key,
        })
    }

    /// Encodes the private key in WIF.
    pub fn to_wif(&self) -> String {
        let mut payload = Vec::with_capacity(1 + SECRET_KEY_SIZE + 4);
        payload.push(WIF_VERSION);
        payload.extend_from_slice(self.secret_key.as_ref());
        let checksum = double_sha256(&payload);
        payload.extend_from_slice(&checksum[..4]);
        bs58::encode(payload).into_string()
    }

    /// Returns the public key in the legacy `EOS…` string format.
    pub fn public_key_string(&self) -> String {
        let compressed: [u8; PUBLIC_KEY_SIZE] = self.public_key.serialize();
        let checksum = Ripemd160::digest(compressed);
        let mut payload = Vec::with_capacity(PUBLIC_KEY_SIZE + 4);
        payload.extend_from_slice(&compressed);
        payload.extend_from_slice(&checksum[..4]);
        format!("{}{}", PUBLIC_KEY_PREFIX, bs58::encode(payload).into_string())
    }

    /// Signs a 32-byte digest, producing a canonical `SIG_K1_…` signature.
    ///
    /// The chain only accepts canonical signatures, so non-canonical ones
    /// are re-signed with extra nonce data until a canonical one appears.
    pub fn sign_canonical(&self, digest: &[u8; 32]) -> Result<String> {
        let message = Message::from_digest_slice(digest)
            .map_err(|e| RelayError::CryptoError(format!("Failed to create message: {}", e)))?;

        for attempt in 0..MAX_SIGNING_ATTEMPTS {
            let signature = if attempt == 0 {
                SECP256K1_CONTEXT.sign_ecdsa_recoverable(&message, &self.secret_key)
            } else {
                let mut noncedata = [0u8; 32];
                noncedata[..4].copy_from_slice(&attempt.to_le_bytes());
                SECP256K1_CONTEXT.sign_ecdsa_recoverable_with_noncedata(
                    &message,
                    &self.secret_key,
                    &noncedata,
                )
            };
            let (recovery_id, compact) = signature.serialize_compact();
            if !is_canonical(&compact) {
                continue;
            }
            return Ok(encode_signature(recovery_id, &compact));
        }

        Err(RelayError::CryptoError(
            "Failed to produce a canonical signature".to_string(),
        ))
    }
}

/// Decodes a legacy `EOS…` public key string into compressed bytes.
pub fn decode_public_key(s: &str) -> Result<[u8; PUBLIC_KEY_SIZE]> {
    let body = s.strip_prefix(PUBLIC_KEY_PREFIX).ok_or_else(|| {
        RelayError::CryptoError(format!("Public key must start with '{}'", PUBLIC_KEY_PREFIX))
    })?;
    let raw = bs58::decode(body)
        .into_vec()
        .map_err(|e| RelayError::CryptoError(format!("Invalid public key encoding: {}", e)))?;
    if raw.len() != PUBLIC_KEY_SIZE + 4 {
        return Err(RelayError::CryptoError(format!(
            "Public key payload must be {} bytes, got {}",
            PUBLIC_KEY_SIZE + 4,
            raw.len()
        )));
    }
    let (payload, checksum) = raw.split_at(PUBLIC_KEY_SIZE);
    let expected = Ripemd160::digest(payload);
    if checksum != &expected[..4] {
        return Err(RelayError::CryptoError(
            "Public key checksum mismatch".to_string(),
        ));
    }
    PublicKey::from_slice(payload)
        .map_err(|e| RelayError::CryptoError(format!("Invalid public key: {}", e)))?;
    let mut bytes = [0u8; PUBLIC_KEY_SIZE];
    bytes.copy_from_slice(payload);
    Ok(bytes)
}

fn double_sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}

/// The chain rejects signatures whose r or s component could be read as
/// negative or as having a shorter encoding.
fn is_canonical(compact: &[u8; 64]) -> bool {
    compact[0] & 0x80 == 0
        && !(compact[0] == 0 && compact[1] & 0x80 == 0)
        && compact[32] & 0x80 == 0
        && !(compact[32] == 0 && compact[33] & 0x80 == 0)
}

fn encode_signature(recovery_id: RecoveryId, compact: &[u8; 64]) -> String {
    let mut data = Vec::with_capacity(1 + 64 + 4);
    data.push(27 + 4 + recovery_id.to_i32() as u8);
    data.extend_from_slice(compact);
    let mut to_hash = data.clone();
    to_hash.extend_from_slice(b"K1");
    let checksum = Ripemd160::digest(&to_hash);
    data.extend_from_slice(&checksum[..4]);
    format!("{}{}", SIGNATURE_PREFIX, bs58::encode(data).into_string())
}
