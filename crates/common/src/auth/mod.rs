//! Authentication boundary helpers
//!
//! User authentication itself is an external collaborator; the core only
//! needs the caller identity handed over by the front door, and an
//! exact-match check for the worker callback shared secret.

use crate::errors::{AppError, Result};
use axum::{extract::FromRequestParts, http::request::Parts};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Extracted request context available to handlers
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Request ID for tracing
    pub request_id: String,
}

/// Hash a shared secret for comparison
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare a presented shared secret against the configured one.
///
/// Both sides are hashed first so the comparison runs over fixed-length
/// digests rather than the raw secret bytes.
pub fn verify_shared_secret(presented: &str, expected: &str) -> bool {
    hash_secret(presented) == hash_secret(expected)
}

/// Axum extractor for AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        // Extract request ID
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        // Extract user ID (set by the authenticating front door)
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing or invalid X-User-ID header".to_string(),
            })?;

        Ok(AuthContext {
            user_id,
            request_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_shared_secret() {
        assert!(verify_shared_secret("hunter2", "hunter2"));
        assert!(!verify_shared_secret("hunter2", "hunter3"));
        assert!(!verify_shared_secret("", "hunter2"));
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(hash_secret("abc"), hash_secret("abc"));
        assert_ne!(hash_secret("abc"), hash_secret("abd"));
        assert_eq!(hash_secret("abc").len(), 64);
    }
}
