//! # Edit sessions
//!
//! [`EditSession`] is the entry point the presentation layer talks to. It
//! owns the [`EditRegistry`] behind a lock and a [`Gateway`], applies user
//! edits to the addressed collection, and drives the three remote calls.
//!
//! Remote calls never hold the lock while waiting on the backend: the
//! request is registered (status `loading`, fresh ticket), the lock is
//! released, and the outcome is applied afterwards. A completion whose
//! ticket is no longer the latest for that collection is discarded, so
//! rapid filter or page changes always end on the newest request's result.

use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

use crate::collections::{CollectionEditState, Completion, EditRegistry};
use crate::domain::{
    ApiFilterOption, AppliedFilter, CollectionsPage, FetchStatus, ProductQuery, ProductRef, ProductsMeta,
    SaveConstantsRequest,
};
use crate::error::GatewayError;
use crate::gateway::Gateway;

/// Page size of the available-products grid.
pub const DEFAULT_PAGE_SIZE: u32 = 36;

pub struct EditSession<G> {
    gateway: G,
    registry: RwLock<EditRegistry>,
    page_size: u32,
}

impl<G: Gateway> EditSession<G> {
    pub fn new(gateway: G) -> Self {
        Self::with_registry(gateway, EditRegistry::new())
    }

    /// Resumes a session from previously stored drafts.
    pub fn with_registry(gateway: G, mut registry: EditRegistry) -> Self {
        registry.settle();
        Self {
            gateway,
            registry: RwLock::new(registry),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub async fn registry(&self) -> RwLockReadGuard<'_, EditRegistry> {
        self.registry.read().await
    }

    pub async fn snapshot(&self) -> EditRegistry {
        self.registry.read().await.clone()
    }

    pub fn into_registry(self) -> EditRegistry {
        self.registry.into_inner()
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Focuses `id` and loads its filter catalog.
    pub async fn initialize(&self, id: &str) -> Completion {
        self.registry.write().await.set_focus(id);
        debug!(collection_id = id, "editing collection");
        self.fetch_filter_options(id).await
    }

    pub async fn set_focus(&self, id: &str) {
        self.registry.write().await.set_focus(id);
    }

    pub async fn remove(&self, id: &str) -> Option<CollectionEditState> {
        let removed = self.registry.write().await.remove(id);
        if removed.as_ref().is_some_and(|state| state.has_unsaved_changes) {
            warn!(collection_id = id, "removed collection with unsaved changes");
        }
        removed
    }

    pub async fn reset(&self) {
        self.registry.write().await.reset();
        debug!("edit registry reset");
    }

    // ─── Pinned products ─────────────────────────────────────────────────────

    pub async fn add_pinned(&self, id: &str, product: ProductRef) -> bool {
        let label = product.label();
        let added = self.registry.write().await.entry(id).add_pinned(product);
        debug!(collection_id = id, product = %label, added, "add pinned product");
        added
    }

    pub async fn remove_pinned(&self, id: &str, product_code: &str, color_code: Option<&str>) -> bool {
        let removed = self
            .registry
            .write()
            .await
            .entry(id)
            .remove_pinned(product_code, color_code);
        debug!(collection_id = id, product_code, ?color_code, removed, "remove pinned product");
        removed
    }

    pub async fn reorder_pinned(&self, id: &str, products: Vec<ProductRef>) {
        let count = products.len();
        self.registry.write().await.entry(id).reorder_pinned(products);
        debug!(collection_id = id, count, "reorder pinned products");
    }

    /// Drag-and-drop move of one pinned product from `from` to `to`.
    pub async fn move_pinned(&self, id: &str, from: usize, to: usize) -> bool {
        let moved = self.registry.write().await.entry(id).move_pinned(from, to);
        debug!(collection_id = id, from, to, moved, "move pinned product");
        moved
    }

    // ─── Filters ─────────────────────────────────────────────────────────────

    pub async fn set_applied_filters(&self, id: &str, filters: Vec<AppliedFilter>) {
        let count = filters.len();
        self.registry.write().await.entry(id).set_applied_filters(filters);
        debug!(collection_id = id, count, "applied filters replaced");
    }

    pub async fn clear_applied_filters(&self, id: &str) {
        self.registry.write().await.entry(id).clear_applied_filters();
        debug!(collection_id = id, "applied filters cleared");
    }

    pub async fn add_applied_filter(&self, id: &str, filter: AppliedFilter) -> bool {
        self.registry.write().await.entry(id).add_applied_filter(filter)
    }

    pub async fn remove_applied_filter(&self, id: &str, filter_id: &str, value: &str) -> bool {
        self.registry
            .write()
            .await
            .entry(id)
            .remove_applied_filter(filter_id, value)
    }

    // ─── Baselines ───────────────────────────────────────────────────────────

    pub async fn mark_saved(&self, id: &str) {
        self.registry.write().await.entry(id).mark_saved();
        debug!(collection_id = id, "changes marked saved");
    }

    pub async fn discard(&self, id: &str) {
        self.registry.write().await.entry(id).discard();
        debug!(collection_id = id, "changes discarded");
    }

    pub async fn set_initial_state(&self, id: &str, pinned: Vec<ProductRef>, filters: Vec<AppliedFilter>) {
        self.registry
            .write()
            .await
            .entry(id)
            .set_initial_state(pinned, filters);
    }

    // ─── Remote calls ────────────────────────────────────────────────────────

    pub async fn fetch_filter_options(&self, id: &str) -> Completion {
        let ticket = self.registry.write().await.begin_filter_options_fetch(id);
        let result = self.gateway.filter_options(id).await;
        if let Err(err) = &result {
            warn!(collection_id = id, error = %err, "failed to fetch filter options");
        }
        let completion = self
            .registry
            .write()
            .await
            .complete_filter_options_fetch(&ticket, result);
        debug!(collection_id = id, seq = ticket.seq, ?completion, "filter options fetch finished");
        completion
    }

    /// Queries products for `id` using its current applied filters.
    pub async fn fetch_available_products(&self, id: &str, page: u32, page_size: u32) -> Completion {
        let (ticket, query) = {
            let mut registry = self.registry.write().await;
            let query = ProductQuery::new(&registry.entry(id).applied_filters, page.max(1), page_size.max(1));
            (registry.begin_available_products_fetch(id), query)
        };
        debug!(
            collection_id = id,
            seq = ticket.seq,
            page = query.page,
            filters = query.filters.len(),
            "fetching available products"
        );

        let result = self.gateway.available_products(id, query).await;
        match &result {
            Ok(page) => info!(
                collection_id = id,
                count = page.data.len(),
                total = page.meta.total_product,
                "available products loaded"
            ),
            Err(err) => warn!(collection_id = id, error = %err, "failed to fetch available products"),
        }

        self.registry
            .write()
            .await
            .complete_available_products_fetch(&ticket, result)
    }

    /// Same as [`Self::fetch_available_products`] with the session's page size.
    pub async fn fetch_page(&self, id: &str, page: u32) -> Completion {
        self.fetch_available_products(id, page, self.page_size).await
    }

    /// Persists the pinned order. The baseline only moves once the backend
    /// confirms; a failure is recorded on the entity and returned. When saves
    /// overlap, only the most recent one settles the entity.
    pub async fn save(&self, id: &str) -> Result<(), GatewayError> {
        let save = self.registry.write().await.begin_save(id);
        let request = SaveConstantsRequest::from_sequence(&save.sent);
        let count = request.constants.len();
        let seq = save.ticket.seq;

        let result = self.gateway.save_pinned_products(id, request).await;
        match &result {
            Ok(()) => info!(collection_id = id, count, "pinned products saved"),
            Err(err) => warn!(collection_id = id, error = %err, "failed to save pinned products"),
        }

        let completion = self.registry.write().await.complete_save(save, result.clone());
        debug!(collection_id = id, seq, ?completion, "save finished");
        result
    }

    pub async fn list_collections(&self, page: u32, page_size: u32) -> Result<CollectionsPage, GatewayError> {
        self.gateway.list_collections(page.max(1), page_size.max(1)).await
    }

    // ─── Reads ───────────────────────────────────────────────────────────────

    /// Runs `read` against the entity for `id`, or against a default entity
    /// when `id` has never been referenced. Reads never create entities.
    pub async fn read<T>(&self, id: &str, read: impl FnOnce(&CollectionEditState) -> T) -> T {
        let registry = self.registry.read().await;
        match registry.peek(id) {
            Some(state) => read(state),
            None => read(&CollectionEditState::default()),
        }
    }

    pub async fn collection(&self, id: &str) -> CollectionEditState {
        self.read(id, CollectionEditState::clone).await
    }

    pub async fn current_collection_id(&self) -> Option<String> {
        self.registry
            .read()
            .await
            .current_collection_id()
            .map(str::to_string)
    }

    pub async fn pinned_products(&self, id: &str) -> Vec<ProductRef> {
        self.read(id, |state| state.pinned_products.clone()).await
    }

    pub async fn initial_pinned_products(&self, id: &str) -> Vec<ProductRef> {
        self.read(id, |state| state.initial_pinned_products.clone()).await
    }

    pub async fn applied_filters(&self, id: &str) -> Vec<AppliedFilter> {
        self.read(id, |state| state.applied_filters.clone()).await
    }

    pub async fn initial_applied_filters(&self, id: &str) -> Vec<AppliedFilter> {
        self.read(id, |state| state.initial_applied_filters.clone()).await
    }

    pub async fn has_unsaved_changes(&self, id: &str) -> bool {
        self.read(id, |state| state.has_unsaved_changes).await
    }

    pub async fn is_pinned(&self, id: &str, product_code: &str, color_code: Option<&str>) -> bool {
        self.read(id, |state| state.is_pinned(product_code, color_code)).await
    }

    pub async fn save_status(&self, id: &str) -> FetchStatus {
        self.read(id, |state| state.save_status).await
    }

    pub async fn save_error(&self, id: &str) -> Option<String> {
        self.read(id, |state| state.save_error.clone()).await
    }

    pub async fn filter_options(&self, id: &str) -> Vec<ApiFilterOption> {
        self.read(id, |state| state.filter_options.clone()).await
    }

    pub async fn filter_options_status(&self, id: &str) -> FetchStatus {
        self.read(id, |state| state.filter_options_status).await
    }

    pub async fn filter_options_error(&self, id: &str) -> Option<String> {
        self.read(id, |state| state.filter_options_error.clone()).await
    }

    pub async fn available_products(&self, id: &str) -> Vec<ProductRef> {
        self.read(id, |state| state.available_products.clone()).await
    }

    pub async fn available_products_meta(&self, id: &str) -> Option<ProductsMeta> {
        self.read(id, |state| state.available_products_meta.clone()).await
    }

    pub async fn available_products_status(&self, id: &str) -> FetchStatus {
        self.read(id, |state| state.available_products_status).await
    }

    pub async fn available_products_error(&self, id: &str) -> Option<String> {
        self.read(id, |state| state.available_products_error.clone()).await
    }

    /// Whether any collection has unsaved work; used to gate navigation.
    pub async fn any_unsaved_changes(&self) -> bool {
        self.registry.read().await.any_unsaved_changes()
    }
}
