use std::fmt::Write as _;

use serde_json::json;
use tracing::info;

use super::{Command, Config, OutputFormat};
use crate::collections::CollectionEditState;
use crate::domain::{CollectionsPage, FetchStatus, ProductRef};
use crate::error::{Error, GatewayError, Result};
use crate::gateway::{Gateway, HttpGateway};
use crate::session::EditSession;
use crate::storage::DraftStore;

/// Runs `command` against the stored drafts and returns the rendered output.
///
/// Drafts are written back even when the command fails, so a failed save
/// or fetch is still visible in `show` afterwards.
pub async fn execute(command: Command, config: &Config) -> Result<String> {
    let store = DraftStore::open(&config.data_dir)?;
    let gateway = HttpGateway::new(&config.gateway_config()).map_err(|err| match err {
        GatewayError::InvalidRequest { message } => Error::Config(message),
        other => Error::Gateway(other),
    })?;
    let session = EditSession::with_registry(gateway, store.load()?).page_size(config.page_size);

    let outcome = run(&session, command, config.format).await;
    store.save(&*session.registry().await)?;
    outcome
}

pub async fn run<G: Gateway>(session: &EditSession<G>, command: Command, format: OutputFormat) -> Result<String> {
    match command {
        Command::Collections { page, page_size } => {
            let listing = session.list_collections(page, page_size).await?;
            Ok(render_collections(&listing, format))
        }
        Command::Show { collection_id } => {
            let state = session.collection(&collection_id).await;
            Ok(render_state(&collection_id, &state, format))
        }
        Command::Status => {
            let registry = session.snapshot().await;
            Ok(match format {
                OutputFormat::Json => pretty(&json!({
                    "currentCollectionId": registry.current_collection_id(),
                    "anyUnsavedChanges": registry.any_unsaved_changes(),
                    "unsaved": registry.unsaved_collection_ids(),
                    "collections": registry.ids().collect::<Vec<_>>(),
                })),
                OutputFormat::Text => {
                    let mut out = String::new();
                    if registry.is_empty() {
                        out.push_str("No drafts\n");
                    }
                    for (id, state) in registry.iter() {
                        let marker = if state.has_unsaved_changes { "*" } else { " " };
                        let _ = writeln!(
                            out,
                            "{marker} {id}: {} pinned, {} filters",
                            state.pinned_products.len(),
                            state.applied_filters.len()
                        );
                    }
                    if registry.any_unsaved_changes() {
                        let _ = writeln!(
                            out,
                            "Unsaved changes in: {}",
                            registry.unsaved_collection_ids().join(", ")
                        );
                    }
                    out
                }
            })
        }
        Command::Filters { collection_id } => {
            session.initialize(&collection_id).await;
            let state = session.collection(&collection_id).await;
            if state.filter_options_status == FetchStatus::Failed {
                return Err(fetch_failure(state.filter_options_error));
            }
            Ok(match format {
                OutputFormat::Json => pretty(&state.filter_options),
                OutputFormat::Text => {
                    let mut out = String::new();
                    for option in &state.filter_options {
                        let _ = writeln!(out, "{} ({})", option.title, option.id);
                        for value in &option.values {
                            let label = value.value_name.as_deref().unwrap_or(&value.value);
                            let _ = writeln!(out, "  {} = {label}", value.value);
                        }
                    }
                    out
                }
            })
        }
        Command::Products { collection_id, page } => {
            session.set_focus(&collection_id).await;
            session.fetch_page(&collection_id, page).await;
            let state = session.collection(&collection_id).await;
            if state.available_products_status == FetchStatus::Failed {
                return Err(fetch_failure(state.available_products_error));
            }
            Ok(render_products(&state, format))
        }
        Command::FilterAdd {
            collection_id,
            filter_id,
            value,
        } => {
            if session.filter_options_status(&collection_id).await != FetchStatus::Succeeded {
                session.initialize(&collection_id).await;
            }
            let options = session.filter_options(&collection_id).await;
            let option = options
                .iter()
                .find(|option| option.id == filter_id)
                .ok_or_else(|| Error::NotFound(format!("filter `{filter_id}` on collection {collection_id}")))?;
            let selected = option
                .value(&value)
                .ok_or_else(|| Error::NotFound(format!("value `{value}` of filter `{filter_id}`")))?;
            session
                .add_applied_filter(&collection_id, option.select(selected))
                .await;
            let state = session.collection(&collection_id).await;
            Ok(render_state(&collection_id, &state, format))
        }
        Command::FilterRemove {
            collection_id,
            filter_id,
            value,
        } => {
            if !session
                .remove_applied_filter(&collection_id, &filter_id, &value)
                .await
            {
                return Err(Error::NotFound(format!("applied filter `{filter_id}={value}`")));
            }
            let state = session.collection(&collection_id).await;
            Ok(render_state(&collection_id, &state, format))
        }
        Command::FilterClear { collection_id } => {
            session.clear_applied_filters(&collection_id).await;
            let state = session.collection(&collection_id).await;
            Ok(render_state(&collection_id, &state, format))
        }
        Command::Pin {
            collection_id,
            product_code,
            color,
        } => {
            // Reuse display data from the last query when the product was in it.
            let product = session
                .read(&collection_id, |state| {
                    state
                        .available_products
                        .iter()
                        .find(|candidate| candidate.matches(&product_code, color.as_deref()))
                        .cloned()
                })
                .await
                .unwrap_or_else(|| ProductRef::new(product_code.as_str(), color.as_deref()));
            if !session.add_pinned(&collection_id, product.clone()).await {
                info!(collection_id = %collection_id, product = %product.label(), "already pinned");
            }
            let state = session.collection(&collection_id).await;
            Ok(render_state(&collection_id, &state, format))
        }
        Command::Unpin {
            collection_id,
            product_code,
            color,
        } => {
            session
                .remove_pinned(&collection_id, &product_code, color.as_deref())
                .await;
            let state = session.collection(&collection_id).await;
            Ok(render_state(&collection_id, &state, format))
        }
        Command::Move {
            collection_id,
            from,
            to,
        } => {
            let moved = match (from.checked_sub(1), to.checked_sub(1)) {
                (Some(from), Some(to)) => session.move_pinned(&collection_id, from, to).await,
                _ => false,
            };
            if !moved {
                return Err(Error::NotFound(format!(
                    "pinned positions {from} -> {to} on collection {collection_id}"
                )));
            }
            let state = session.collection(&collection_id).await;
            Ok(render_state(&collection_id, &state, format))
        }
        Command::Save { collection_id } => {
            session.save(&collection_id).await?;
            let state = session.collection(&collection_id).await;
            Ok(render_state(&collection_id, &state, format))
        }
        Command::Discard { collection_id } => {
            session.discard(&collection_id).await;
            let state = session.collection(&collection_id).await;
            Ok(render_state(&collection_id, &state, format))
        }
        Command::Forget { collection_id } => {
            let removed = session.remove(&collection_id).await.is_some();
            Ok(match format {
                OutputFormat::Json => pretty(&json!({ "collectionId": collection_id, "removed": removed })),
                OutputFormat::Text if removed => format!("Forgot drafts of {collection_id}\n"),
                OutputFormat::Text => format!("No drafts for {collection_id}\n"),
            })
        }
    }
}

fn fetch_failure(message: Option<String>) -> Error {
    Error::Gateway(GatewayError::Rejected {
        message: message.unwrap_or_else(|| "request failed".to_string()),
    })
}

fn pretty<T: serde::Serialize>(value: &T) -> String {
    let mut out = serde_json::to_string_pretty(value).unwrap_or_else(|err| format!("\"{err}\""));
    out.push('\n');
    out
}

fn render_state(id: &str, state: &CollectionEditState, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return pretty(&json!({ "collectionId": id, "state": state }));
    }

    let mut out = String::new();
    let dirty = match (state.has_unsaved_changes, state.pinned_diverged()) {
        (true, true) => " (unsaved changes)",
        (true, false) => " (unsaved changes, pinned order matches last save)",
        (false, _) => "",
    };
    let _ = writeln!(out, "Collection {id}{dirty}");
    let _ = writeln!(out, "Pinned products:");
    if state.pinned_products.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for (position, product) in state.pinned_products.iter().enumerate() {
        let name = product.name.as_deref().unwrap_or("");
        let _ = writeln!(out, "  {:>3}. {} {name}", position + 1, product.label());
    }
    if !state.applied_filters.is_empty() {
        let _ = writeln!(out, "Applied filters:");
        for filter in &state.applied_filters {
            let value = filter.value_name.as_deref().unwrap_or(&filter.value);
            let _ = writeln!(out, "  {}: {value}", filter.title);
        }
    }
    let _ = writeln!(out, "Save: {}", state.save_status);
    if let Some(error) = &state.save_error {
        let _ = writeln!(out, "  error: {error}");
    }
    out
}

fn render_products(state: &CollectionEditState, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return pretty(&json!({
            "meta": state.available_products_meta,
            "data": state.available_products,
        }));
    }

    let mut out = String::new();
    for product in &state.available_products {
        let pinned = if state.is_pinned(&product.product_code, product.color_code.as_deref()) {
            "[pinned] "
        } else {
            ""
        };
        let name = product.name.as_deref().unwrap_or("");
        let _ = writeln!(out, "{pinned}{} {name}", product.label());
    }
    if let Some(meta) = &state.available_products_meta {
        let _ = writeln!(
            out,
            "Page {} of {} ({} products)",
            meta.page,
            meta.total_pages(),
            meta.total_product
        );
    }
    out
}

fn render_collections(listing: &CollectionsPage, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return pretty(listing);
    }

    let mut out = String::new();
    for collection in &listing.data {
        let kind = if collection.kind == 0 { "manual" } else { "dynamic" };
        let _ = writeln!(out, "{:>6}  {}  [{kind}]", collection.id, collection.info.name);
    }
    let _ = writeln!(
        out,
        "Page {} of {} ({} collections)",
        listing.meta.page, listing.meta.total_pages, listing.meta.total_count
    );
    out
}
