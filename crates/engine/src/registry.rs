//! Entity handler registry (MIG-13).
//!
//! Maps each entity type to its reader, transformer, and destination
//! endpoint. Stage drivers and batch units look handlers up here
//! instead of dispatching on entity-type strings, so an unregistered
//! type is a typed error at the lookup site rather than a silent
//! no-op deep in a match arm.

use std::collections::HashMap;
use std::sync::Arc;

use storebridge_core::entity::EntityType;

use crate::collaborators::{SourceReader, Transformer};
use crate::error::EngineError;

/// Destination routing for one entity type.
#[derive(Debug, Clone, Copy)]
pub struct EntityEndpoint {
    /// Admin API resource path segment.
    pub resource: &'static str,
    /// Payload field used for the create-or-find conflict fallback.
    pub lookup_key: &'static str,
}

impl EntityEndpoint {
    /// Default destination routing per entity type.
    pub fn of(entity_type: EntityType) -> Self {
        let (resource, lookup_key) = match entity_type {
            EntityType::Manufacturer => ("product-manufacturer", "name"),
            EntityType::Tax => ("tax", "name"),
            EntityType::Category => ("category", "name"),
            EntityType::Product => ("product", "productNumber"),
            EntityType::Customer => ("customer", "email"),
            EntityType::Order => ("order", "orderNumber"),
            EntityType::Coupon => ("promotion", "name"),
            EntityType::Review => ("product-review", "title"),
            EntityType::ShippingMethod => ("shipping-method", "name"),
            EntityType::PaymentMethod => ("payment-method", "name"),
            EntityType::SeoUrl => ("seo-url", "seoPathInfo"),
            EntityType::CmsPage => ("cms-page", "name"),
        };
        Self {
            resource,
            lookup_key,
        }
    }
}

/// Reader, transformer, and endpoint for one entity type.
#[derive(Clone)]
pub struct EntityHandler {
    pub reader: Arc<dyn SourceReader>,
    pub transformer: Arc<dyn Transformer>,
    pub endpoint: EntityEndpoint,
}

/// Registry of entity handlers for one run.
#[derive(Default)]
pub struct EntityRegistry {
    handlers: HashMap<EntityType, EntityHandler>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler with the default endpoint for its type.
    pub fn register(
        &mut self,
        entity_type: EntityType,
        reader: Arc<dyn SourceReader>,
        transformer: Arc<dyn Transformer>,
    ) -> &mut Self {
        self.register_with_endpoint(
            entity_type,
            reader,
            transformer,
            EntityEndpoint::of(entity_type),
        )
    }

    /// Register a handler with a custom endpoint.
    pub fn register_with_endpoint(
        &mut self,
        entity_type: EntityType,
        reader: Arc<dyn SourceReader>,
        transformer: Arc<dyn Transformer>,
        endpoint: EntityEndpoint,
    ) -> &mut Self {
        self.handlers.insert(
            entity_type,
            EntityHandler {
                reader,
                transformer,
                endpoint,
            },
        );
        self
    }

    /// Look up the handler for an entity type.
    pub fn handler(&self, entity_type: EntityType) -> Result<&EntityHandler, EngineError> {
        self.handlers
            .get(&entity_type)
            .ok_or(EngineError::UnregisteredEntity(entity_type))
    }

    pub fn is_registered(&self, entity_type: EntityType) -> bool {
        self.handlers.contains_key(&entity_type)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ResolvedRefs, SourceRecord};
    use async_trait::async_trait;
    use storebridge_core::types::Timestamp;

    struct NullReader;

    #[async_trait]
    impl SourceReader for NullReader {
        async fn fetch_all(&self, _: EntityType) -> Result<Vec<SourceRecord>, EngineError> {
            Ok(Vec::new())
        }
        async fn fetch_updated_since(
            &self,
            _: EntityType,
            _: Timestamp,
        ) -> Result<Vec<SourceRecord>, EngineError> {
            Ok(Vec::new())
        }
        async fn fetch_by_id(
            &self,
            _: EntityType,
            _: &str,
        ) -> Result<Option<SourceRecord>, EngineError> {
            Ok(None)
        }
    }

    struct NullTransformer;

    impl Transformer for NullTransformer {
        fn transform(
            &self,
            record: &SourceRecord,
            _: &ResolvedRefs,
        ) -> Result<serde_json::Value, EngineError> {
            Ok(record.data.clone())
        }
    }

    #[test]
    fn unregistered_type_is_a_typed_error() {
        let registry = EntityRegistry::new();
        assert!(matches!(
            registry.handler(EntityType::Product),
            Err(EngineError::UnregisteredEntity(EntityType::Product))
        ));
    }

    #[test]
    fn registered_handler_is_found_with_default_endpoint() {
        let mut registry = EntityRegistry::new();
        registry.register(
            EntityType::Product,
            Arc::new(NullReader),
            Arc::new(NullTransformer),
        );
        let handler = registry.handler(EntityType::Product).unwrap();
        assert_eq!(handler.endpoint.resource, "product");
        assert_eq!(handler.endpoint.lookup_key, "productNumber");
        assert!(registry.is_registered(EntityType::Product));
        assert!(!registry.is_registered(EntityType::Tax));
    }

    #[test]
    fn every_entity_type_has_an_endpoint() {
        for s in EntityType::ALL {
            let et = EntityType::from_str(s).unwrap();
            let endpoint = EntityEndpoint::of(et);
            assert!(!endpoint.resource.is_empty());
            assert!(!endpoint.lookup_key.is_empty());
        }
    }
}
