//! Token verification against the issuer's JWKS, claim extraction, and the
//! bearer-auth extractor for HTTP routes.

pub mod claims;
pub mod jwks;
pub mod middleware;
