//! RSA test keypairs.
//!
//! Each keypair can sign tokens and publish its public half as a JWK, so
//! tests can stand up a complete issuer with a couple of lines. RSA key
//! generation is expensive, so key material is generated once per seed
//! and cached for the test process; the same seed always yields the same
//! key, different seeds yield different keys.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

/// Cached key material shared between keypairs with the same seed.
#[derive(Clone)]
struct KeyMaterial {
    encoding_key: EncodingKey,
    modulus_b64: String,
    exponent_b64: String,
}

static KEY_CACHE: OnceLock<Mutex<HashMap<u8, KeyMaterial>>> = OnceLock::new();

fn key_material(seed: u8) -> KeyMaterial {
    let cache = KEY_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut cache = cache.lock().expect("key cache poisoned");

    cache
        .entry(seed)
        .or_insert_with(|| {
            let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048)
                .expect("Failed to generate RSA key");
            let public_key = private_key.to_public_key();

            let private_pem = private_key
                .to_pkcs8_pem(LineEnding::LF)
                .expect("Failed to encode private key");
            let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
                .expect("Failed to build encoding key");

            KeyMaterial {
                encoding_key,
                modulus_b64: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
                exponent_b64: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
            }
        })
        .clone()
}

/// RSA keypair for signing test tokens.
pub struct TestKeypair {
    /// Key ID placed in token headers and the published JWK.
    pub kid: String,

    material: KeyMaterial,
}

impl TestKeypair {
    /// Keypair for the given seed and key ID.
    ///
    /// Use distinct seeds when a test needs two keys that must not
    /// verify each other's signatures.
    pub fn new(seed: u8, kid: &str) -> Self {
        Self {
            kid: kid.to_string(),
            material: key_material(seed),
        }
    }

    /// Sign claims as an RS256 token carrying this keypair's `kid`.
    pub fn sign(&self, claims: &serde_json::Value) -> String {
        self.sign_with_algorithm(claims, Algorithm::RS256)
    }

    /// Sign claims with an explicit RSA algorithm.
    pub fn sign_with_algorithm(&self, claims: &serde_json::Value, algorithm: Algorithm) -> String {
        let mut header = Header::new(algorithm);
        header.typ = Some("JWT".to_string());
        header.kid = Some(self.kid.clone());

        encode(&header, claims, &self.material.encoding_key).expect("Failed to sign test token")
    }

    /// Sign claims without a `kid` header.
    pub fn sign_without_kid(&self, claims: &serde_json::Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.typ = Some("JWT".to_string());

        encode(&header, claims, &self.material.encoding_key).expect("Failed to sign test token")
    }

    /// Public half of the keypair as a JWK.
    pub fn jwk_json(&self) -> serde_json::Value {
        serde_json::json!({
            "kty": "RSA",
            "kid": self.kid,
            "n": self.material.modulus_b64,
            "e": self.material.exponent_b64,
            "alg": "RS256",
            "use": "sig"
        })
    }
}
