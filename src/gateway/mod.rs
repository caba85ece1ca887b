//! Remote data gateway: the four backend calls the editor depends on.

pub mod http;

use std::future::Future;
use std::pin::Pin;

use crate::domain::{ApiFilterOption, CollectionsPage, ProductPage, ProductQuery, SaveConstantsRequest};
use crate::error::GatewayError;

pub use http::{GatewayConfig, HttpGateway};

pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, GatewayError>> + Send + 'a>>;

/// Abstract backend for collection editing.
///
/// Implementations resolve to `Err` for both transport failures and
/// application-level rejections; callers do not distinguish the two.
pub trait Gateway: Send + Sync {
    /// One page of the collections overview.
    fn list_collections(&self, page: u32, page_size: u32) -> GatewayFuture<'_, CollectionsPage>;

    /// The filterable attributes of a collection.
    fn filter_options(&self, collection_id: &str) -> GatewayFuture<'_, Vec<ApiFilterOption>>;

    /// Products matching `query` that can be pinned to the collection.
    fn available_products(
        &self,
        collection_id: &str,
        query: ProductQuery,
    ) -> GatewayFuture<'_, ProductPage>;

    /// Persists the pinned order.
    fn save_pinned_products(
        &self,
        collection_id: &str,
        request: SaveConstantsRequest,
    ) -> GatewayFuture<'_, ()>;
}
