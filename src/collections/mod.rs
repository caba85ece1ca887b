//! # Collection edit state
//!
//! One [`CollectionEditState`] per collection being edited, kept in an
//! [`EditRegistry`] keyed by collection id. Entries are created on first
//! reference and live until they are removed or the registry is reset, so
//! leaving a collection mid-edit and coming back finds the work intact.
//!
//! Pinned products carry a baseline snapshot (the last persisted order).
//! Mutations never touch the baselines; `mark_saved` moves the baseline up
//! to the current values and `discard` moves the current values back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{
    ApiFilterOption, AppliedFilter, CollectionId, FetchStatus, ProductPage, ProductRef, ProductsMeta,
};
use crate::error::GatewayError;

/// Edit state of a single collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEditState {
    pub pinned_products: Vec<ProductRef>,
    pub initial_pinned_products: Vec<ProductRef>,
    pub applied_filters: Vec<AppliedFilter>,
    pub initial_applied_filters: Vec<AppliedFilter>,
    pub has_unsaved_changes: bool,
    pub save_status: FetchStatus,
    pub save_error: Option<String>,
    pub filter_options: Vec<ApiFilterOption>,
    pub filter_options_status: FetchStatus,
    pub filter_options_error: Option<String>,
    pub available_products: Vec<ProductRef>,
    pub available_products_meta: Option<ProductsMeta>,
    pub available_products_status: FetchStatus,
    pub available_products_error: Option<String>,
    #[serde(skip)]
    filter_options_seq: u64,
    #[serde(skip)]
    available_products_seq: u64,
    #[serde(skip)]
    save_seq: u64,
}

impl CollectionEditState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pinned(&self, product_code: &str, color_code: Option<&str>) -> bool {
        self.pinned_products
            .iter()
            .any(|product| product.matches(product_code, color_code))
    }

    /// Appends `product` unless a product with the same code/color pair is
    /// already pinned. Returns whether anything changed.
    pub fn add_pinned(&mut self, product: ProductRef) -> bool {
        if self.pinned_products.iter().any(|pinned| pinned.same_product(&product)) {
            return false;
        }
        self.pinned_products.push(product);
        self.has_unsaved_changes = true;
        true
    }

    /// Removes the matching product. The entity is flagged dirty even when
    /// nothing matched.
    pub fn remove_pinned(&mut self, product_code: &str, color_code: Option<&str>) -> bool {
        let before = self.pinned_products.len();
        self.pinned_products
            .retain(|product| !product.matches(product_code, color_code));
        self.has_unsaved_changes = true;
        self.pinned_products.len() != before
    }

    /// Replaces the pinned sequence wholesale with a caller-ordered one.
    ///
    /// Repeated code/color pairs in `products` are collapsed to their first
    /// occurrence so the pinned list stays duplicate-free.
    pub fn reorder_pinned(&mut self, products: Vec<ProductRef>) {
        let mut ordered: Vec<ProductRef> = Vec::with_capacity(products.len());
        for product in products {
            if !ordered.iter().any(|kept| kept.same_product(&product)) {
                ordered.push(product);
            }
        }
        self.pinned_products = ordered;
        self.has_unsaved_changes = true;
    }

    /// Moves the product at `from` to `to`, shifting the ones in between.
    /// Out-of-range indices leave the state untouched and return `false`.
    pub fn move_pinned(&mut self, from: usize, to: usize) -> bool {
        let len = self.pinned_products.len();
        if from >= len || to >= len {
            return false;
        }
        let mut reordered = self.pinned_products.clone();
        let product = reordered.remove(from);
        reordered.insert(to, product);
        self.reorder_pinned(reordered);
        true
    }

    /// Replaces the applied filters and forces the next product fetch.
    /// Filters are query state: the dirty flag is left alone.
    pub fn set_applied_filters(&mut self, filters: Vec<AppliedFilter>) {
        let mut unique: Vec<AppliedFilter> = Vec::with_capacity(filters.len());
        for filter in filters {
            if !unique.iter().any(|kept| kept.same_selection(&filter)) {
                unique.push(filter);
            }
        }
        self.applied_filters = unique;
        self.available_products_status = FetchStatus::Idle;
        self.available_products_error = None;
    }

    pub fn clear_applied_filters(&mut self) {
        self.set_applied_filters(Vec::new());
    }

    /// Adds one filter; a repeated `(id, value)` selection is ignored.
    pub fn add_applied_filter(&mut self, filter: AppliedFilter) -> bool {
        if self.applied_filters.iter().any(|applied| applied.same_selection(&filter)) {
            return false;
        }
        let mut filters = self.applied_filters.clone();
        filters.push(filter);
        self.set_applied_filters(filters);
        true
    }

    pub fn remove_applied_filter(&mut self, filter_id: &str, value: &str) -> bool {
        let filters: Vec<AppliedFilter> = self
            .applied_filters
            .iter()
            .filter(|applied| !(applied.id == filter_id && applied.value == value))
            .cloned()
            .collect();
        if filters.len() == self.applied_filters.len() {
            return false;
        }
        self.set_applied_filters(filters);
        true
    }

    pub fn mark_saved(&mut self) {
        self.initial_pinned_products = self.pinned_products.clone();
        self.initial_applied_filters = self.applied_filters.clone();
        self.has_unsaved_changes = false;
    }

    pub fn discard(&mut self) {
        self.pinned_products = self.initial_pinned_products.clone();
        self.applied_filters = self.initial_applied_filters.clone();
        self.has_unsaved_changes = false;
    }

    /// Seeds current values and baselines together, leaving a clean entity.
    pub fn set_initial_state(&mut self, pinned: Vec<ProductRef>, filters: Vec<AppliedFilter>) {
        self.pinned_products = pinned.clone();
        self.initial_pinned_products = pinned;
        self.applied_filters = filters.clone();
        self.initial_applied_filters = filters;
        self.has_unsaved_changes = false;
    }

    /// Whether the pinned list differs from its baseline. Unlike
    /// `has_unsaved_changes` this is recomputed, so a no-op removal or a
    /// reorder back to the original order does not count.
    pub fn pinned_diverged(&self) -> bool {
        self.pinned_products != self.initial_pinned_products
    }

    fn begin_filter_options_fetch(&mut self) -> u64 {
        self.filter_options_seq += 1;
        self.filter_options_status = FetchStatus::Loading;
        self.filter_options_error = None;
        self.filter_options_seq
    }

    fn begin_available_products_fetch(&mut self) -> u64 {
        self.available_products_seq += 1;
        self.available_products_status = FetchStatus::Loading;
        self.available_products_error = None;
        self.available_products_seq
    }

    fn begin_save(&mut self) -> (u64, Vec<ProductRef>) {
        self.save_seq += 1;
        self.save_status = FetchStatus::Loading;
        self.save_error = None;
        (self.save_seq, self.pinned_products.clone())
    }

    /// Statuses left in `loading` by a previous process have no request
    /// behind them any more.
    fn settle(&mut self) {
        for status in [
            &mut self.save_status,
            &mut self.filter_options_status,
            &mut self.available_products_status,
        ] {
            if status.is_loading() {
                *status = FetchStatus::Idle;
            }
        }
    }
}

/// Identifies one issued fetch so its completion can be matched against the
/// latest request for the same collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub collection_id: CollectionId,
    pub seq: u64,
}

/// An issued save: its ticket plus the exact pinned sequence sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    pub ticket: FetchTicket,
    pub sent: Vec<ProductRef>,
}

/// What happened to the completion of a fetch or save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// A newer request of the same kind for the collection was issued meanwhile.
    Superseded,
    /// The collection was removed while the request was in flight.
    Orphaned,
}

/// All collections currently being edited, plus the focused one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRegistry {
    current_collection_id: Option<CollectionId>,
    collections: BTreeMap<CollectionId, CollectionEditState>,
}

impl EditRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entity for `id`, creating a default one if needed.
    pub fn get(&mut self, id: &str) -> &CollectionEditState {
        self.entry(id)
    }

    /// Mutable access to the entity for `id`, creating it if needed.
    pub fn entry(&mut self, id: &str) -> &mut CollectionEditState {
        self.collections.entry(id.to_string()).or_default()
    }

    /// Read-only lookup that never creates an entity.
    pub fn peek(&self, id: &str) -> Option<&CollectionEditState> {
        self.collections.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.collections.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<CollectionEditState> {
        if self.current_collection_id.as_deref() == Some(id) {
            self.current_collection_id = None;
        }
        self.collections.remove(id)
    }

    pub fn set_focus(&mut self, id: &str) {
        self.current_collection_id = Some(id.to_string());
        self.entry(id);
    }

    pub fn current_collection_id(&self) -> Option<&str> {
        self.current_collection_id.as_deref()
    }

    pub fn reset(&mut self) {
        self.current_collection_id = None;
        self.collections.clear();
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CollectionEditState)> {
        self.collections
            .iter()
            .map(|(id, state)| (id.as_str(), state))
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// True when at least one collection has unsaved work.
    pub fn any_unsaved_changes(&self) -> bool {
        self.collections.values().any(|state| state.has_unsaved_changes)
    }

    pub fn unsaved_collection_ids(&self) -> Vec<&str> {
        self.collections
            .iter()
            .filter(|(_, state)| state.has_unsaved_changes)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn begin_filter_options_fetch(&mut self, id: &str) -> FetchTicket {
        let seq = self.entry(id).begin_filter_options_fetch();
        FetchTicket {
            collection_id: id.to_string(),
            seq,
        }
    }

    pub fn complete_filter_options_fetch(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<ApiFilterOption>, GatewayError>,
    ) -> Completion {
        let Some(state) = self.live_entity(ticket, |state| state.filter_options_seq) else {
            return self.dropped(ticket, "filter options");
        };
        match result {
            Ok(options) => {
                state.filter_options = options;
                state.filter_options_status = FetchStatus::Succeeded;
            }
            Err(err) => {
                state.filter_options_status = FetchStatus::Failed;
                state.filter_options_error = Some(err.to_string());
            }
        }
        Completion::Applied
    }

    pub fn begin_available_products_fetch(&mut self, id: &str) -> FetchTicket {
        let seq = self.entry(id).begin_available_products_fetch();
        FetchTicket {
            collection_id: id.to_string(),
            seq,
        }
    }

    pub fn complete_available_products_fetch(
        &mut self,
        ticket: &FetchTicket,
        result: Result<ProductPage, GatewayError>,
    ) -> Completion {
        let Some(state) = self.live_entity(ticket, |state| state.available_products_seq) else {
            return self.dropped(ticket, "available products");
        };
        match result {
            Ok(page) => {
                state.available_products = page.data;
                state.available_products_meta = Some(page.meta);
                state.available_products_status = FetchStatus::Succeeded;
            }
            Err(err) => {
                state.available_products_status = FetchStatus::Failed;
                state.available_products_error = Some(err.to_string());
            }
        }
        Completion::Applied
    }

    /// Marks a save as in flight and returns the ticket carrying the
    /// sequence to send.
    pub fn begin_save(&mut self, id: &str) -> SaveTicket {
        let (seq, sent) = self.entry(id).begin_save();
        SaveTicket {
            ticket: FetchTicket {
                collection_id: id.to_string(),
                seq,
            },
            sent,
        }
    }

    /// Applies the outcome of the latest save. On success the baseline
    /// becomes the sent sequence, and the entity is clean only if the pinned
    /// list still equals it. On failure every local edit stays in place.
    /// Outcomes of older saves are dropped: a newer save owns the baseline.
    pub fn complete_save(&mut self, save: SaveTicket, result: Result<(), GatewayError>) -> Completion {
        let SaveTicket { ticket, sent } = save;
        let Some(state) = self.live_entity(&ticket, |state| state.save_seq) else {
            return self.dropped(&ticket, "save");
        };
        match result {
            Ok(()) => {
                state.save_status = FetchStatus::Succeeded;
                if state.pinned_products == sent {
                    state.mark_saved();
                } else {
                    state.initial_pinned_products = sent;
                    state.has_unsaved_changes = true;
                }
            }
            Err(err) => {
                state.save_status = FetchStatus::Failed;
                state.save_error = Some(err.to_string());
            }
        }
        Completion::Applied
    }

    /// Normalizes state restored from storage.
    pub fn settle(&mut self) {
        for state in self.collections.values_mut() {
            state.settle();
        }
    }

    fn live_entity(
        &mut self,
        ticket: &FetchTicket,
        latest: impl Fn(&CollectionEditState) -> u64,
    ) -> Option<&mut CollectionEditState> {
        self.collections
            .get_mut(&ticket.collection_id)
            .filter(|state| latest(state) == ticket.seq)
    }

    fn dropped(&self, ticket: &FetchTicket, what: &str) -> Completion {
        if self.contains(&ticket.collection_id) {
            warn!(
                collection_id = %ticket.collection_id,
                seq = ticket.seq,
                "dropping stale {what} response"
            );
            Completion::Superseded
        } else {
            debug!(collection_id = %ticket.collection_id, "{what} response for a removed collection");
            Completion::Orphaned
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProductsMeta;

    fn product(code: &str, color: Option<&str>) -> ProductRef {
        ProductRef::new(code, color)
    }

    fn filter(id: &str, value: &str) -> AppliedFilter {
        AppliedFilter {
            id: id.into(),
            value: value.into(),
            title: id.to_uppercase(),
            value_name: None,
            comparison_type: 0,
        }
    }

    fn page(codes: &[&str], page: u32) -> ProductPage {
        ProductPage {
            meta: ProductsMeta {
                page,
                page_size: 36,
                total_product: codes.len() as u64,
            },
            data: codes.iter().map(|code| product(code, None)).collect(),
        }
    }

    #[test]
    fn get_creates_default_entity() {
        let mut registry = EditRegistry::new();
        let state = registry.get("c1").clone();

        assert_eq!(state, CollectionEditState::default());
        assert!(registry.contains("c1"));
        assert!(registry.peek("c2").is_none());
    }

    #[test]
    fn repeated_add_keeps_one_copy() {
        let mut registry = EditRegistry::new();
        assert!(registry.entry("c1").add_pinned(product("P1", None)));
        assert!(!registry.entry("c1").add_pinned(product("P1", None)));
        registry.entry("c1").add_pinned(product("P1", Some("02")));
        registry.entry("c1").add_pinned(product("P1", None));

        let pinned = &registry.get("c1").pinned_products;
        assert_eq!(pinned.len(), 2);
        assert_eq!(pinned[0].label(), "P1");
        assert_eq!(pinned[1].label(), "P1/02");
    }

    #[test]
    fn every_edit_sets_dirty_and_save_or_discard_clears_it() {
        let mut state = CollectionEditState::new();

        state.add_pinned(product("A", None));
        assert!(state.has_unsaved_changes);
        state.mark_saved();
        assert!(!state.has_unsaved_changes);

        state.reorder_pinned(vec![product("A", None)]);
        assert!(state.has_unsaved_changes);
        state.discard();
        assert!(!state.has_unsaved_changes);

        state.remove_pinned("A", None);
        assert!(state.has_unsaved_changes);
        state.discard();
        assert!(!state.has_unsaved_changes);
    }

    #[test]
    fn removing_an_absent_product_still_marks_dirty() {
        let mut state = CollectionEditState::new();
        state.add_pinned(product("P1", None));
        state.mark_saved();

        assert!(!state.remove_pinned("PX", None));
        assert_eq!(state.pinned_products, vec![product("P1", None)]);
        assert!(state.has_unsaved_changes);
        assert!(!state.pinned_diverged());
    }

    #[test]
    fn discard_restores_last_saved_values() {
        let mut state = CollectionEditState::new();
        state.add_pinned(product("A", None));
        state.add_pinned(product("B", None));
        state.set_applied_filters(vec![filter("color", "red")]);
        state.mark_saved();

        state.remove_pinned("A", None);
        state.add_pinned(product("C", None));
        state.move_pinned(1, 0);
        state.set_applied_filters(vec![filter("size", "m")]);
        state.discard();

        assert_eq!(state.pinned_products, vec![product("A", None), product("B", None)]);
        assert_eq!(state.applied_filters, vec![filter("color", "red")]);

        let once = state.clone();
        state.discard();
        assert_eq!(state, once);
    }

    #[test]
    fn discard_without_save_returns_to_empty_baseline() {
        let mut state = CollectionEditState::new();
        for code in ["A", "B", "C"] {
            state.add_pinned(product(code, None));
        }
        state.reorder_pinned(vec![product("B", None), product("A", None), product("C", None)]);
        state.discard();

        assert!(state.pinned_products.is_empty());
        assert_eq!(state.pinned_products, state.initial_pinned_products);
    }

    #[test]
    fn mutations_leave_baselines_alone() {
        let mut state = CollectionEditState::new();
        state.set_initial_state(vec![product("A", None)], vec![filter("color", "red")]);

        state.add_pinned(product("B", None));
        state.remove_pinned("A", None);
        state.reorder_pinned(vec![product("B", None)]);
        state.clear_applied_filters();

        assert_eq!(state.initial_pinned_products, vec![product("A", None)]);
        assert_eq!(state.initial_applied_filters, vec![filter("color", "red")]);
    }

    #[test]
    fn setting_filters_resets_product_fetch_without_dirtying() {
        let mut registry = EditRegistry::new();
        let ticket = registry.begin_available_products_fetch("c1");
        registry.complete_available_products_fetch(
            &ticket,
            Err(GatewayError::Rejected {
                message: "boom".into(),
            }),
        );
        assert_eq!(registry.get("c1").available_products_status, FetchStatus::Failed);

        let mut red = filter("color", "red");
        red.title = "Renk".into();
        red.value_name = Some("Kırmızı".into());
        registry.entry("c1").set_applied_filters(vec![red]);

        let state = registry.get("c1");
        assert_eq!(state.available_products_status, FetchStatus::Idle);
        assert_eq!(state.available_products_error, None);
        assert!(!state.has_unsaved_changes);
    }

    #[test]
    fn duplicate_filter_selections_are_ignored() {
        let mut state = CollectionEditState::new();
        state.set_applied_filters(vec![filter("color", "red"), filter("color", "red"), filter("color", "blue")]);
        assert_eq!(state.applied_filters.len(), 2);

        assert!(!state.add_applied_filter(filter("color", "blue")));
        assert!(state.add_applied_filter(filter("size", "m")));
        assert!(state.remove_applied_filter("color", "red"));
        assert!(!state.remove_applied_filter("color", "red"));
        assert_eq!(state.applied_filters, vec![filter("color", "blue"), filter("size", "m")]);
    }

    #[test]
    fn move_pinned_shifts_like_drag_and_drop() {
        let mut state = CollectionEditState::new();
        for code in ["A", "B", "C", "D"] {
            state.add_pinned(product(code, None));
        }
        state.mark_saved();

        assert!(state.move_pinned(0, 2));
        let codes: Vec<_> = state.pinned_products.iter().map(|p| p.product_code.as_str()).collect();
        assert_eq!(codes, ["B", "C", "A", "D"]);
        assert!(state.has_unsaved_changes);

        state.mark_saved();
        assert!(!state.move_pinned(1, 9));
        assert!(!state.has_unsaved_changes);
    }

    #[test]
    fn reorder_collapses_duplicate_keys() {
        let mut state = CollectionEditState::new();
        state.reorder_pinned(vec![product("A", None), product("B", None), product("A", None)]);
        assert_eq!(state.pinned_products, vec![product("A", None), product("B", None)]);
    }

    #[test]
    fn edits_to_one_collection_leave_others_untouched() {
        let mut registry = EditRegistry::new();
        registry.entry("b").set_initial_state(vec![product("X", None)], vec![filter("size", "s")]);
        let before = registry.get("b").clone();

        registry.entry("a").add_pinned(product("A", None));
        registry.entry("a").set_applied_filters(vec![filter("color", "red")]);
        registry.entry("a").mark_saved();
        registry.entry("a").move_pinned(0, 0);
        registry.entry("a").discard();
        let ticket = registry.begin_available_products_fetch("a");
        registry.complete_available_products_fetch(&ticket, Ok(page(&["Q"], 1)));

        assert_eq!(registry.get("b"), &before);
    }

    #[test]
    fn any_unsaved_changes_tracks_every_entity() {
        let mut registry = EditRegistry::new();
        registry.get("a");
        registry.get("b");
        assert!(!registry.any_unsaved_changes());

        registry.entry("b").add_pinned(product("P", None));
        assert!(registry.any_unsaved_changes());
        assert_eq!(registry.unsaved_collection_ids(), vec!["b"]);

        registry.entry("b").discard();
        assert!(!registry.any_unsaved_changes());
    }

    #[test]
    fn remove_clears_focus() {
        let mut registry = EditRegistry::new();
        registry.set_focus("c1");
        registry.set_focus("c2");
        assert_eq!(registry.current_collection_id(), Some("c2"));

        registry.remove("c1");
        assert_eq!(registry.current_collection_id(), Some("c2"));
        registry.remove("c2");
        assert_eq!(registry.current_collection_id(), None);
        assert!(!registry.contains("c1"));
        assert!(registry.is_empty());
    }

    #[test]
    fn stale_product_response_is_dropped() {
        let mut registry = EditRegistry::new();
        let first = registry.begin_available_products_fetch("c1");
        let second = registry.begin_available_products_fetch("c1");

        assert_eq!(
            registry.complete_available_products_fetch(&second, Ok(page(&["NEW"], 1))),
            Completion::Applied
        );
        assert_eq!(
            registry.complete_available_products_fetch(&first, Ok(page(&["OLD"], 1))),
            Completion::Superseded
        );

        let state = registry.get("c1");
        assert_eq!(state.available_products, vec![product("NEW", None)]);
        assert_eq!(state.available_products_status, FetchStatus::Succeeded);
    }

    #[test]
    fn stale_failure_does_not_clobber_newer_success() {
        let mut registry = EditRegistry::new();
        let first = registry.begin_filter_options_fetch("c1");
        let second = registry.begin_filter_options_fetch("c1");

        registry.complete_filter_options_fetch(&second, Ok(Vec::new()));
        registry.complete_filter_options_fetch(
            &first,
            Err(GatewayError::Transport {
                message: "timeout".into(),
            }),
        );

        let state = registry.get("c1");
        assert_eq!(state.filter_options_status, FetchStatus::Succeeded);
        assert_eq!(state.filter_options_error, None);
    }

    #[test]
    fn response_for_removed_collection_is_orphaned() {
        let mut registry = EditRegistry::new();
        let ticket = registry.begin_available_products_fetch("c1");
        registry.remove("c1");

        assert_eq!(
            registry.complete_available_products_fetch(&ticket, Ok(page(&["A"], 1))),
            Completion::Orphaned
        );
        assert!(!registry.contains("c1"));
    }

    #[test]
    fn failed_save_keeps_edits() {
        let mut registry = EditRegistry::new();
        registry.entry("c1").add_pinned(product("A", None));
        let save = registry.begin_save("c1");
        assert_eq!(registry.get("c1").save_status, FetchStatus::Loading);

        registry.complete_save(
            save,
            Err(GatewayError::Rejected {
                message: "Failed to save constants: 500".into(),
            }),
        );

        let state = registry.get("c1");
        assert_eq!(state.save_status, FetchStatus::Failed);
        assert_eq!(state.save_error.as_deref(), Some("Failed to save constants: 500"));
        assert!(state.has_unsaved_changes);
        assert_eq!(state.pinned_products, vec![product("A", None)]);
        assert!(state.initial_pinned_products.is_empty());
    }

    #[test]
    fn edit_during_save_stays_dirty() {
        let mut registry = EditRegistry::new();
        registry.entry("c1").add_pinned(product("A", None));
        let save = registry.begin_save("c1");
        registry.entry("c1").add_pinned(product("B", None));

        assert_eq!(registry.complete_save(save, Ok(())), Completion::Applied);

        let state = registry.get("c1");
        assert_eq!(state.save_status, FetchStatus::Succeeded);
        assert_eq!(state.initial_pinned_products, vec![product("A", None)]);
        assert!(state.has_unsaved_changes);
    }

    #[test]
    fn discard_during_save_stays_dirty_against_new_baseline() {
        let mut registry = EditRegistry::new();
        registry.entry("c1").add_pinned(product("A", None));
        let save = registry.begin_save("c1");
        registry.entry("c1").discard();

        registry.complete_save(save, Ok(()));

        let state = registry.get("c1");
        assert!(state.pinned_products.is_empty());
        assert_eq!(state.initial_pinned_products, vec![product("A", None)]);
        assert!(state.has_unsaved_changes);
        assert!(state.pinned_diverged());
    }

    #[test]
    fn older_save_cannot_move_baseline_back() {
        let mut registry = EditRegistry::new();
        registry.entry("c1").add_pinned(product("A", None));
        let first = registry.begin_save("c1");
        registry.entry("c1").add_pinned(product("B", None));
        let second = registry.begin_save("c1");

        assert_eq!(registry.complete_save(second, Ok(())), Completion::Applied);
        assert_eq!(registry.complete_save(first, Ok(())), Completion::Superseded);

        let state = registry.get("c1");
        assert_eq!(state.initial_pinned_products, state.pinned_products);
        assert_eq!(state.pinned_products.len(), 2);
        assert!(!state.has_unsaved_changes);
        assert_eq!(state.save_status, FetchStatus::Succeeded);
    }

    #[test]
    fn save_for_removed_collection_is_orphaned() {
        let mut registry = EditRegistry::new();
        registry.entry("c1").add_pinned(product("A", None));
        let save = registry.begin_save("c1");
        registry.remove("c1");

        assert_eq!(registry.complete_save(save, Ok(())), Completion::Orphaned);
        assert!(!registry.contains("c1"));
    }

    #[test]
    fn settle_resets_in_flight_statuses() {
        let mut registry = EditRegistry::new();
        registry.begin_filter_options_fetch("c1");
        registry.begin_save("c1");
        registry.settle();

        let state = registry.get("c1");
        assert_eq!(state.filter_options_status, FetchStatus::Idle);
        assert_eq!(state.save_status, FetchStatus::Idle);
    }
}
