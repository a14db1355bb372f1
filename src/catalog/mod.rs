//! The AWS action catalog and the per-service action/resource validity tables.

mod service_map;
mod tags;

pub use {
    service_map::{is_service_pseudo_resource, is_valid_action_for_resource, resource_patterns_for_action},
    tags::{ActionClassifier, ActionTagData, ActionTagsProvider},
};

use {
    crate::EngineError,
    log::debug,
    parking_lot::Mutex,
    std::{collections::HashMap, sync::Arc},
};

/// Supplies the full list of valid `service:Action` identifiers.
///
/// The reference source is the policy-generator configuration blob AWS serves for its console; fetching and
/// caching it is the host's concern. The engine only sees the materialized list.
pub trait ActionCatalogProvider: Send + Sync {
    fn fetch_all_actions(&self) -> Result<Vec<String>, EngineError>;
}

/// A provider over an already materialized action list. Useful for tests and offline snapshots.
#[derive(Clone, Debug, Default)]
pub struct StaticActionCatalog {
    actions: Vec<String>,
}

impl StaticActionCatalog {
    pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(actions: I) -> Self {
        Self {
            actions: actions.into_iter().map(|s| s.into()).collect(),
        }
    }
}

impl ActionCatalogProvider for StaticActionCatalog {
    fn fetch_all_actions(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.actions.clone())
    }
}

/// Parse the AWS policy-generator configuration into the flat action list.
///
/// The blob is JavaScript of the form `app.PolicyEditorConfig={...}`; stripping the assignment leaves JSON whose
/// `serviceMap` values each contribute `StringPrefix + ":" + Actions[i]`.
pub fn parse_policy_editor_config(body: &str) -> Result<Vec<String>, EngineError> {
    let json = body.trim_start().trim_start_matches("app.PolicyEditorConfig=");
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| EngineError::CatalogUnavailable(e.to_string()))?;

    let service_map = value
        .get("serviceMap")
        .and_then(|v| v.as_object())
        .ok_or_else(|| EngineError::CatalogUnavailable("serviceMap missing".to_string()))?;

    let mut actions = Vec::new();
    for service in service_map.values() {
        let prefix = match service.get("StringPrefix").and_then(|v| v.as_str()) {
            Some(prefix) => prefix,
            None => continue,
        };

        if let Some(service_actions) = service.get("Actions").and_then(|v| v.as_array()) {
            for action in service_actions {
                if let Some(action) = action.as_str() {
                    actions.push(format!("{}:{}", prefix, action));
                }
            }
        }
    }

    Ok(actions)
}

/// The materialized action catalog with a per-process wildcard expansion cache.
///
/// Expanding `*` walks tens of thousands of entries; the same handful of patterns recurs for every principal, so
/// expansions are memoized until the catalog is refreshed (which builds a new catalog).
#[derive(Debug)]
pub struct ActionCatalog {
    actions: Vec<String>,
    expansion_cache: Mutex<HashMap<String, Arc<Vec<String>>>>,
}

impl ActionCatalog {
    pub fn from_provider(provider: &dyn ActionCatalogProvider) -> Result<Self, EngineError> {
        let actions = provider.fetch_all_actions()?;
        debug!("Loaded action catalog with {} entries", actions.len());

        Ok(Self {
            actions,
            expansion_cache: Mutex::new(HashMap::new()),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    #[inline]
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Indicates whether the exact action identifier is in the catalog.
    pub fn contains(&self, action: &str) -> bool {
        self.actions.iter().any(|known| known.eq_ignore_ascii_case(action))
    }

    /// Expand an action pattern against the catalog. `*` yields the full catalog; a pattern without wildcards
    /// yields itself (case-corrected to the catalog entry) when known.
    pub fn expand(&self, pattern: &str) -> Arc<Vec<String>> {
        if let Some(cached) = self.expansion_cache.lock().get(pattern) {
            return cached.clone();
        }

        let expanded: Vec<String> = if pattern == "*" {
            self.actions.clone()
        } else {
            let regex = crate::glob::regex_from_glob(pattern);
            self.actions.iter().filter(|action| regex.is_match(action)).cloned().collect()
        };

        let expanded = Arc::new(expanded);
        self.expansion_cache.lock().insert(pattern.to_string(), expanded.clone());
        expanded
    }
}
