//! PKCE (Proof Key for Code Exchange) material generation
//!
//! Implements RFC 7636 `S256`. State and verifier strings are drawn from the
//! unreserved alphabet with rejection sampling, so every symbol is equally
//! likely.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// RFC 7636 unreserved characters: `A-Z a-z 0-9 - . _ ~`
pub const UNRESERVED_ALPHABET: &[u8; 66] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Length of generated `state` values
pub const STATE_LENGTH: usize = 32;

/// Length of generated code verifiers (RFC 7636 allows 43-128)
pub const VERIFIER_LENGTH: usize = 64;

/// Challenge method sent with every authorization request
pub const CHALLENGE_METHOD: &str = "S256";

// Largest multiple of 66 that fits in a byte; bytes at or above it are
// rejected.
const REJECTION_THRESHOLD: u8 = 198;

fn random_string(len: usize) -> String {
    let mut out = String::with_capacity(len);
    let mut buf = [0_u8; 64];
    while out.len() < len {
        OsRng.fill_bytes(&mut buf);
        for &byte in buf.iter().filter(|&&b| b < REJECTION_THRESHOLD) {
            if out.len() == len {
                break;
            }
            let index = usize::from(byte) % UNRESERVED_ALPHABET.len();
            out.push(char::from(UNRESERVED_ALPHABET[index]));
        }
    }
    out
}

/// Generate a random CSRF `state` token
///
/// Also the lookup key for the stored [`super::PkceEntry`].
#[must_use]
pub fn generate_state() -> String {
    random_string(STATE_LENGTH)
}

/// Generate a cryptographically secure code verifier
#[must_use]
pub fn generate_verifier() -> String {
    random_string(VERIFIER_LENGTH)
}

/// Derive the `S256` code challenge: `BASE64URL(SHA256(ASCII(verifier)))`
///
/// # Examples
/// ```
/// use webgate_common::auth::pkce::derive_challenge;
///
/// assert_eq!(
///     derive_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
///     "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
/// );
/// ```
#[must_use]
pub fn derive_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Compare a returned `state` against the expected one in constant time
#[must_use]
pub fn validate_state(expected: &str, actual: &str) -> bool {
    if expected.len() != actual.len() {
        return false;
    }
    expected.bytes().zip(actual.bytes()).fold(0_u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

/// Fresh material for one authorization attempt
#[derive(Clone)]
pub struct PkceMaterial {
    pub state: String,
    pub verifier: String,
    pub challenge: String,
}

impl PkceMaterial {
    /// Generate an independent state/verifier pair and its challenge
    #[must_use]
    pub fn generate() -> Self {
        let verifier = generate_verifier();
        let challenge = derive_challenge(&verifier);
        Self { state: generate_state(), verifier, challenge }
    }

    /// Get the challenge method (always "S256")
    #[must_use]
    pub const fn challenge_method(&self) -> &'static str {
        CHALLENGE_METHOD
    }

    /// First characters of the state, safe for logs
    #[must_use]
    pub fn state_prefix(&self) -> &str {
        state_prefix(&self.state)
    }
}

impl fmt::Debug for PkceMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkceMaterial")
            .field("state", &self.state_prefix())
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .finish()
    }
}

/// Log-safe prefix of a `state` value
#[must_use]
pub fn state_prefix(state: &str) -> &str {
    let end = state.char_indices().nth(8).map_or(state.len(), |(i, _)| i);
    &state[..end]
}
