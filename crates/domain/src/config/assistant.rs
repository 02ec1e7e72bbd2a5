use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Remote reasoning service connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Environment variable holding the assistant API key. When the env var
    /// is unset, requests are sent without an Authorization header.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_8000")]
    pub timeout_ms: u64,
    #[serde(default = "d_3")]
    pub max_retries: u32,
    /// Fixed interval between job status polls.
    #[serde(default = "d_1000")]
    pub poll_interval_ms: u64,
    /// Hard ceiling on job status polls before the request fails locally
    /// with a timeout. The remote job is not cancelled.
    #[serde(default = "d_60")]
    pub poll_max_attempts: u32,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            api_key_env: d_api_key_env(),
            timeout_ms: 8000,
            max_retries: 3,
            poll_interval_ms: 1000,
            poll_max_attempts: 60,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_base_url() -> String {
    "http://localhost:8700".into()
}
fn d_api_key_env() -> String {
    "CR_ASSISTANT_API_KEY".into()
}
fn d_8000() -> u64 {
    8000
}
fn d_3() -> u32 {
    3
}
fn d_1000() -> u64 {
    1000
}
fn d_60() -> u32 {
    60
}
