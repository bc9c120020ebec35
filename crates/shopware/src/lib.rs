//! REST client for the Shopware Admin API.
//!
//! Wraps the destination store's HTTP endpoints using [`reqwest`]:
//! resource CRUD, batch delete, and the create-or-find fallback the
//! migration engine relies on for idempotent creates. Transient
//! transport errors get a short bounded retry, orthogonal to the
//! engine's batch-level retry.

pub mod api;
pub mod retry;

pub use api::{ApiError, CreatedResource, ShopwareApi};
pub use retry::{with_retry, RetryConfig};
