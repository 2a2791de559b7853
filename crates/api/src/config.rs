//! Environment-driven configuration for the API binary.

use std::env;

/// Settings for the identity provider's management API.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    /// `None` means no provider configured; the server still runs, with
    /// every uncached subject failing closed.
    pub provider: Option<ProviderSettings>,
    pub cache_ttl_secs: i64,
    pub sweep_enabled: bool,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            "dev-secret".to_string()
        });

        let provider = match (
            env::var("IDP_BASE_URL"),
            env::var("IDP_CLIENT_ID"),
            env::var("IDP_CLIENT_SECRET"),
        ) {
            (Ok(base_url), Ok(client_id), Ok(client_secret)) => Some(ProviderSettings {
                base_url,
                client_id,
                client_secret,
            }),
            _ => {
                tracing::warn!(
                    "IDP_BASE_URL/IDP_CLIENT_ID/IDP_CLIENT_SECRET not set; \
                     uncached subjects will fail closed"
                );
                None
            }
        };

        Self {
            bind_addr: env::var("AISLE_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            jwt_secret,
            issuer: env::var("AISLE_ISSUER")
                .unwrap_or_else(|_| "https://aisle.app/".to_string()),
            audience: env::var("AISLE_AUDIENCE")
                .unwrap_or_else(|_| "https://api.aisle.app".to_string()),
            provider,
            cache_ttl_secs: env::var("AISLE_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            sweep_enabled: env::var("AISLE_SWEEP_ENABLED")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}
