//! Process-wide provider configuration.
//!
//! One active backend at a time, plus the last-used model and API key per
//! backend. The admin-configuration path and the generation path touch this
//! concurrently across requests, so all state sits behind a single mutex and
//! is shared via `Arc` — no ambient globals. Persistence of this state is an
//! external concern; in-process semantics are last-write-wins.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::providers::{canonical_model, ProviderId};

#[derive(Debug, Default)]
struct SettingsInner {
    current_provider: String,
    models: HashMap<String, String>,
    api_keys: HashMap<String, String>,
}

#[derive(Debug)]
pub struct ProviderSettings {
    inner: Mutex<SettingsInner>,
}

impl ProviderSettings {
    pub fn new(default_provider: &str) -> Self {
        Self {
            inner: Mutex::new(SettingsInner {
                current_provider: default_provider.trim().to_lowercase(),
                ..Default::default()
            }),
        }
    }

    /// The raw configured backend name. May be an unknown identifier; the
    /// gateway is the one place that resolves it.
    pub fn current_provider(&self) -> String {
        self.inner.lock().unwrap().current_provider.clone()
    }

    pub fn set_provider(&self, provider: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.current_provider = provider.trim().to_lowercase();
    }

    /// Last-used model for a backend, if any was ever set.
    pub fn model(&self, provider: ProviderId) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .models
            .get(provider.as_key())
            .cloned()
    }

    /// Stores the last-used model for a backend. Deprecated aliases are
    /// canonicalized before storage so they never round-trip back out.
    pub fn set_model(&self, provider: ProviderId, model: &str) {
        if model.trim().is_empty() {
            return;
        }
        let model = canonical_model(provider, model);
        let mut inner = self.inner.lock().unwrap();
        inner.models.insert(provider.as_key().to_string(), model);
    }

    pub fn api_key(&self, provider: ProviderId) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .api_keys
            .get(provider.as_key())
            .cloned()
    }

    pub fn set_api_key(&self, provider: ProviderId, key: &str) {
        if key.trim().is_empty() {
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        inner
            .api_keys
            .insert(provider.as_key().to_string(), key.trim().to_string());
    }

    /// Whether the backend can be called at all: hosted backends need a key,
    /// the local backend is always considered configured.
    pub fn api_key_configured(&self, provider: ProviderId) -> bool {
        !provider.requires_api_key() || self.api_key(provider).is_some()
    }
}
