//! CSRF token generation and verification.
//!
//! Tokens are random, session-bound, single-use, and time-limited. Every
//! management form carries one; the JSON reorder endpoints are exempt and
//! rely on the authenticated session alone.

use anyhow::{Result, bail};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tower_sessions::Session;

/// Session key for storing issued CSRF tokens.
const CSRF_SESSION_KEY: &str = "csrf_tokens";

/// Maximum number of outstanding tokens per session.
const MAX_TOKENS: usize = 10;

/// Token validity period in seconds (1 hour).
const TOKEN_VALIDITY_SECS: i64 = 3600;

/// An issued token and when it was issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IssuedToken {
    token: String,
    issued: i64,
}

impl IssuedToken {
    fn is_current(&self, now: i64) -> bool {
        now - self.issued <= TOKEN_VALIDITY_SECS
    }
}

async fn load_tokens(session: &Session) -> Vec<IssuedToken> {
    session
        .get(CSRF_SESSION_KEY)
        .await
        .unwrap_or(None)
        .unwrap_or_default()
}

async fn store_tokens(session: &Session, tokens: Vec<IssuedToken>) -> Result<()> {
    session
        .insert(CSRF_SESSION_KEY, tokens)
        .await
        .map_err(|e| anyhow::anyhow!("failed to store CSRF tokens: {e}"))?;
    Ok(())
}

/// Generate a CSRF token and store it in the session.
pub async fn generate_csrf_token(session: &Session) -> Result<String> {
    let mut random_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut random_bytes);

    let issued = chrono::Utc::now().timestamp();

    let mut hasher = Sha256::new();
    hasher.update(random_bytes);
    hasher.update(issued.to_le_bytes());
    let token = hex::encode(hasher.finalize());

    let mut tokens = load_tokens(session).await;
    tokens.push(IssuedToken {
        token: token.clone(),
        issued,
    });

    // Keep only the most recent tokens
    if tokens.len() > MAX_TOKENS {
        let skip = tokens.len() - MAX_TOKENS;
        tokens.drain(..skip);
    }

    store_tokens(session, tokens).await?;

    Ok(token)
}

/// Verify a CSRF token against the session.
///
/// Tokens are single-use and time-limited.
pub async fn verify_csrf_token(session: &Session, submitted: &str) -> Result<bool> {
    if submitted.is_empty() {
        bail!("empty CSRF token");
    }

    let mut tokens = load_tokens(session).await;
    if tokens.is_empty() {
        return Ok(false);
    }

    let now = chrono::Utc::now().timestamp();

    let Some(index) = tokens
        .iter()
        .position(|t| t.token == submitted && t.is_current(now))
    else {
        return Ok(false);
    };

    // Consume the matched token and drop anything expired
    tokens.remove(index);
    tokens.retain(|t| t.is_current(now));
    store_tokens(session, tokens).await?;

    Ok(true)
}
