//! Entity-type catalog, canonical stage ordering, and per-entity
//! batching constants (MIG-12).
//!
//! The migration pipeline processes one entity type per stage, in a
//! fixed order chosen so that every cross-entity reference points at a
//! stage that has already settled (products after categories and
//! taxes, orders after customers, reviews after products).

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Entity Type
// ---------------------------------------------------------------------------

/// A migratable entity type from the source store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Manufacturer,
    Tax,
    Category,
    Product,
    Customer,
    Order,
    Coupon,
    Review,
    ShippingMethod,
    PaymentMethod,
    SeoUrl,
    CmsPage,
}

impl EntityType {
    /// Return the entity type name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manufacturer => "manufacturer",
            Self::Tax => "tax",
            Self::Category => "category",
            Self::Product => "product",
            Self::Customer => "customer",
            Self::Order => "order",
            Self::Coupon => "coupon",
            Self::Review => "review",
            Self::ShippingMethod => "shipping_method",
            Self::PaymentMethod => "payment_method",
            Self::SeoUrl => "seo_url",
            Self::CmsPage => "cms_page",
        }
    }

    /// Parse an entity type string. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "manufacturer" => Some(Self::Manufacturer),
            "tax" => Some(Self::Tax),
            "category" => Some(Self::Category),
            "product" => Some(Self::Product),
            "customer" => Some(Self::Customer),
            "order" => Some(Self::Order),
            "coupon" => Some(Self::Coupon),
            "review" => Some(Self::Review),
            "shipping_method" => Some(Self::ShippingMethod),
            "payment_method" => Some(Self::PaymentMethod),
            "seo_url" => Some(Self::SeoUrl),
            "cms_page" => Some(Self::CmsPage),
            _ => None,
        }
    }

    /// All valid entity type values.
    pub const ALL: &'static [&'static str] = &[
        "manufacturer",
        "tax",
        "category",
        "product",
        "customer",
        "order",
        "coupon",
        "review",
        "shipping_method",
        "payment_method",
        "seo_url",
        "cms_page",
    ];

    /// Number of source ids processed per batch for this entity type.
    ///
    /// Lightweight records (taxes, manufacturers, methods) get large
    /// chunks; heavy records with relationship fan-out (products,
    /// orders) get small ones.
    pub fn chunk_size(&self) -> usize {
        match self {
            Self::Tax | Self::Manufacturer | Self::ShippingMethod | Self::PaymentMethod => 100,
            Self::Category | Self::SeoUrl | Self::CmsPage => 50,
            Self::Customer | Self::Coupon | Self::Review => 25,
            Self::Product | Self::Order => 10,
        }
    }

    /// Batch-level timeout in seconds, proportional to expected item
    /// cost.
    pub fn batch_timeout_secs(&self) -> u64 {
        match self {
            Self::Product | Self::Order => 600,
            Self::Customer | Self::Coupon | Self::Review => 300,
            _ => 120,
        }
    }

    /// Whether this entity is stored in the destination only as
    /// metadata, keyed by a synthetic hash of its name rather than a
    /// real remote-resource id.
    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::ShippingMethod | Self::PaymentMethod)
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Stage ordering
// ---------------------------------------------------------------------------

/// Canonical stage order for a migration run.
///
/// A later stage may resolve references only against earlier stages'
/// ledger rows. CMS pages run last and are optional (see
/// [`crate::run::RunOptions`]-level flags in the engine).
pub const STAGE_ORDER: &[EntityType] = &[
    EntityType::Manufacturer,
    EntityType::Tax,
    EntityType::Category,
    EntityType::Product,
    EntityType::Customer,
    EntityType::Order,
    EntityType::Coupon,
    EntityType::Review,
    EntityType::ShippingMethod,
    EntityType::PaymentMethod,
    EntityType::SeoUrl,
    EntityType::CmsPage,
];

/// Split a working set of source ids into per-batch chunks for the
/// given entity type. Preserves input order; the final chunk may be
/// short.
pub fn chunk_ids(entity_type: EntityType, ids: &[String]) -> Vec<Vec<String>> {
    ids.chunks(entity_type.chunk_size())
        .map(|c| c.to_vec())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
