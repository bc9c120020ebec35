//! Source connector wiring.
//!
//! A run's `source_config` names the source store a deployment reads
//! from; the factory turns it into a populated [`EntityRegistry`].
//! Concrete readers and transformers are deployment-specific and plug
//! in here. A factory that recognizes nothing yields an empty registry,
//! which the pipeline turns into a failed run with a clear audit entry.

use serde::Deserialize;
use storebridge_engine::{EngineError, EntityRegistry};

/// Builds the per-run entity registry from the run's source settings.
pub trait ConnectorFactory: Send + Sync {
    fn build(&self, source_config: &serde_json::Value) -> Result<EntityRegistry, EngineError>;
}

/// Connection settings for the destination Admin API, read from a
/// run's `destination_config`.
#[derive(Debug, Deserialize)]
pub struct DestinationConfig {
    pub base_url: String,
    pub access_token: String,
}

impl DestinationConfig {
    pub fn from_value(value: &serde_json::Value) -> Result<Self, EngineError> {
        serde_json::from_value(value.clone())
            .map_err(|e| EngineError::Invalid(format!("invalid destination_config: {e}")))
    }
}

/// Factory with no connectors compiled in. Deployments replace this
/// with one that registers readers for their source store.
pub struct NoConnectors;

impl ConnectorFactory for NoConnectors {
    fn build(&self, _source_config: &serde_json::Value) -> Result<EntityRegistry, EngineError> {
        Ok(EntityRegistry::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn destination_config_parses() {
        let cfg = DestinationConfig::from_value(&json!({
            "base_url": "https://shop.example/api",
            "access_token": "token-123",
        }))
        .unwrap();
        assert_eq!(cfg.base_url, "https://shop.example/api");
        assert_eq!(cfg.access_token, "token-123");
    }

    #[test]
    fn destination_config_rejects_missing_fields() {
        let err = DestinationConfig::from_value(&json!({ "base_url": "x" })).unwrap_err();
        assert!(err.to_string().contains("destination_config"));
    }

    #[test]
    fn no_connectors_builds_an_empty_registry() {
        let registry = NoConnectors.build(&json!({})).unwrap();
        assert!(registry.is_empty());
    }
}
