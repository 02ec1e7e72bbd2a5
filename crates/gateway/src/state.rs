//! Shared application state handed to every request handler.

use std::sync::Arc;

use cr_assistant::AssistantApi;
use cr_domain::config::Config;
use cr_sessions::{FingerprintResolver, SessionRegistry};

use crate::profile::ProfileWriter;
use crate::runtime::poll::PollPolicy;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub assistant: Arc<dyn AssistantApi>,
    pub fingerprints: Arc<FingerprintResolver>,
    pub registry: Arc<SessionRegistry>,
    pub profiles: Arc<ProfileWriter>,
}

impl AppState {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::from(&self.config.assistant)
    }
}
