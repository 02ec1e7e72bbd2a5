use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Auth
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variable holding the HMAC secret shared with the
    /// authentication collaborator. If the env var is unset, every caller
    /// is treated as anonymous (tokens cannot be verified).
    #[serde(default = "d_secret_env")]
    pub secret_env: String,
    /// Maximum accepted token validity window. Verification rejects tokens
    /// whose expiry claim lies further than this in the future.
    #[serde(default = "d_30")]
    pub token_ttl_days: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_env: d_secret_env(),
            token_ttl_days: 30,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_secret_env() -> String {
    "CR_TOKEN_SECRET".into()
}
fn d_30() -> u32 {
    30
}
