//! Access-token verification and claim extraction.

use jsonwebtoken::{Algorithm, Validation};
use serde::Deserialize;

use crate::error::ApiError;
use crate::hub::session::HubPrincipal;

use super::jwks::JwksClient;

/// Claims the notification subsystem reads from an access token. Everything
/// else in the token is the identity framework's business.
#[derive(Debug, Deserialize)]
pub struct AccessClaims {
    /// Stable external user id.
    pub sub: String,
    /// Optional multi-tenancy partition.
    #[serde(default)]
    pub tenant: Option<String>,
    pub iss: String,
    pub exp: i64,
}

impl AccessClaims {
    pub fn into_principal(self) -> HubPrincipal {
        HubPrincipal {
            subject: self.sub,
            tenant: self.tenant,
        }
    }
}

/// Verify a bearer token against the issuer's JWKS and extract claims.
pub async fn verify_bearer(
    jwks: &JwksClient,
    expected_issuer: &str,
    token: &str,
) -> Result<AccessClaims, ApiError> {
    // Decode the header to find `kid`.
    let header = jsonwebtoken::decode_header(token).map_err(|e| {
        tracing::debug!(?e, "token header decode failed");
        ApiError::unauthorized("Invalid access token")
    })?;

    let kid = header
        .kid
        .ok_or_else(|| ApiError::unauthorized("Access token missing kid"))?;

    let key = jwks.get_key(&kid).await?;

    // Require EdDSA, validate exp and issuer. No audience claim on hub tokens.
    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.set_issuer(&[expected_issuer]);
    validation.validate_aud = false;

    let token_data =
        jsonwebtoken::decode::<AccessClaims>(token, &key, &validation).map_err(|e| {
            tracing::debug!(?e, "access token validation failed");
            ApiError::unauthorized("Invalid or expired access token")
        })?;

    Ok(token_data.claims)
}
