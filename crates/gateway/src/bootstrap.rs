//! Process wiring: build the shared [`AppState`] from a loaded config.

use std::sync::Arc;

use cr_assistant::{AssistantApi, RestAssistantClient};
use cr_domain::config::Config;
use cr_domain::error::Result;
use cr_sessions::{FingerprintResolver, MemoryStore, SessionRegistry, TokenCodec};

use crate::profile::ProfileWriter;
use crate::state::AppState;

/// Construct every long-lived collaborator and negotiate assistant
/// capabilities once. Capability negotiation failure is not fatal: the
/// client keeps its conservative defaults and the server still starts.
pub async fn build_app_state(config: Config) -> Result<AppState> {
    let client = RestAssistantClient::new(&config.assistant)?;
    if let Err(e) = client.negotiate_capabilities().await {
        tracing::warn!(error = %e, "capability negotiation failed, keeping defaults");
    }
    let assistant: Arc<dyn AssistantApi> = Arc::new(client);

    let codec = match std::env::var(&config.auth.secret_env) {
        Ok(secret) if !secret.is_empty() => {
            Some(TokenCodec::new(&secret).with_ttl_days(config.auth.token_ttl_days))
        }
        _ => {
            tracing::warn!(
                env = %config.auth.secret_env,
                "token secret env var unset — all callers treated as anonymous"
            );
            None
        }
    };

    let registry = Arc::new(SessionRegistry::new(
        assistant.clone(),
        Arc::new(MemoryStore::new()),
    ));
    let profiles = Arc::new(ProfileWriter::new(
        assistant.clone(),
        Arc::new(MemoryStore::new()),
    ));

    Ok(AppState {
        config: Arc::new(config),
        assistant,
        fingerprints: Arc::new(FingerprintResolver::new(codec)),
        registry,
        profiles,
    })
}
