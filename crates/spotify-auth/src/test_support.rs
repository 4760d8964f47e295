//! Shared fixtures for unit tests

use std::sync::Arc;

use url::Url;

use crate::config::AuthConfig;
use crate::host::{Host, ManualClock};
use crate::navigator::MemoryNavigator;
use crate::store::MemoryStore;

pub(crate) const NOW: u64 = 1_700_000_000_000;

pub(crate) struct Fixture {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub navigator: Arc<MemoryNavigator>,
    pub host: Host,
}

/// Host with an in-memory store, a clock frozen at [`NOW`], and the page at `url`.
pub(crate) fn fixture(url: &str) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let navigator = Arc::new(MemoryNavigator::at(Url::parse(url).unwrap()));
    let host = Host::new(store.clone(), navigator.clone()).with_clock(clock.clone());
    Fixture {
        store,
        clock,
        navigator,
        host,
    }
}

/// Config whose endpoints all point at `server_uri`.
pub(crate) fn config_for(server_uri: &str) -> Arc<AuthConfig> {
    let mut config = AuthConfig::new("client-abc", "http://app.local/callback");
    config.authorize_endpoint = format!("{server_uri}/authorize");
    config.token_endpoint = format!("{server_uri}/api/token");
    config.api_base_url = format!("{server_uri}/v1");
    Arc::new(config)
}
