/// Notify API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Issuer origin (e.g. `https://login.example.com`). Used for JWKS
    /// discovery and `iss` validation.
    pub issuer_url: String,
    /// Redis connection string. When unset, an in-memory store backs the
    /// registry — fine for a single process, useless across several.
    pub redis_url: Option<String>,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Sentinel tenant used when neither the tenant claim nor the connection
    /// host resolves one.
    pub default_tenant: String,
    /// Snowflake worker id for durable record ids.
    pub worker_id: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        Self {
            issuer_url: required_var("ISSUER_URL"),
            redis_url: std::env::var("REDIS_URL").ok().filter(|s| !s.is_empty()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4005),
            default_tenant: std::env::var("DEFAULT_TENANT")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "default".to_string()),
            worker_id: std::env::var("WORKER_ID")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
        }
    }
}

fn required_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} env var is required"))
}
