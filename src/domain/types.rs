use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Backend identifier of a collection, as it appears in route paths.
pub type CollectionId = String;

/// Envelope status the backend uses for a successful call.
pub const SUCCESS_STATUS: i64 = 200;

// ─── Products ────────────────────────────────────────────────────────────────

/// A product as shown in the pinned list and in query results.
///
/// Identity is the `(product_code, color_code)` pair; `name` and
/// `image_url` are display data only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    pub product_code: String,
    #[serde(default)]
    pub color_code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image_url: String,
}

impl ProductRef {
    pub fn new(product_code: impl Into<String>, color_code: Option<&str>) -> Self {
        Self {
            product_code: product_code.into(),
            color_code: color_code.map(str::to_string),
            name: None,
            image_url: String::new(),
        }
    }

    pub fn matches(&self, product_code: &str, color_code: Option<&str>) -> bool {
        self.product_code == product_code && self.color_code.as_deref() == color_code
    }

    pub fn same_product(&self, other: &ProductRef) -> bool {
        self.matches(&other.product_code, other.color_code.as_deref())
    }

    /// `CODE` or `CODE/COLOR`, used in logs and CLI output.
    pub fn label(&self) -> String {
        match &self.color_code {
            Some(color) => format!("{}/{color}", self.product_code),
            None => self.product_code.clone(),
        }
    }
}

/// Pagination summary returned with a page of available products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductsMeta {
    pub page: u32,
    pub page_size: u32,
    #[serde(alias = "totalCount")]
    pub total_product: u64,
}

impl ProductsMeta {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_product.div_ceil(u64::from(self.page_size))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPage {
    pub meta: ProductsMeta,
    pub data: Vec<ProductRef>,
}

// ─── Filters ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterValue {
    pub value: String,
    #[serde(default)]
    pub value_name: Option<String>,
}

/// One filterable attribute of a collection and its permitted values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFilterOption {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub values: Vec<FilterValue>,
    #[serde(default)]
    pub currency: Option<String>,
    /// Opaque discriminator, passed through to product queries untouched.
    pub comparison_type: i32,
}

impl ApiFilterOption {
    pub fn value(&self, value: &str) -> Option<&FilterValue> {
        self.values.iter().find(|candidate| candidate.value == value)
    }

    /// Builds the applied filter for one of this option's values.
    pub fn select(&self, value: &FilterValue) -> AppliedFilter {
        AppliedFilter {
            id: self.id.clone(),
            value: value.value.clone(),
            title: self.title.clone(),
            value_name: value.value_name.clone(),
            comparison_type: self.comparison_type,
        }
    }
}

/// A filter the user selected for the product query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFilter {
    pub id: String,
    pub value: String,
    pub title: String,
    #[serde(default)]
    pub value_name: Option<String>,
    pub comparison_type: i32,
}

impl AppliedFilter {
    pub fn same_selection(&self, other: &AppliedFilter) -> bool {
        self.id == other.id && self.value == other.value
    }
}

// ─── Fetch status ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

impl FetchStatus {
    pub fn is_loading(self) -> bool {
        matches!(self, FetchStatus::Loading)
    }
}

impl std::fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FetchStatus::Idle => "idle",
            FetchStatus::Loading => "loading",
            FetchStatus::Succeeded => "succeeded",
            FetchStatus::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

// ─── Wire envelopes and requests ─────────────────────────────────────────────

/// `{status, message, data}` wrapper used by every backend endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: i64,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// A non-success status or an absent payload is a rejection; the server
    /// message wins over `fallback` when present.
    pub fn into_result(self, fallback: &str) -> Result<T, GatewayError> {
        match self.data {
            Some(data) if self.status == SUCCESS_STATUS => Ok(data),
            _ => Err(GatewayError::Rejected {
                message: self
                    .message
                    .filter(|message| !message.trim().is_empty())
                    .unwrap_or_else(|| fallback.to_string()),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilter {
    pub id: String,
    pub value: String,
    pub comparison_type: i32,
}

impl From<&AppliedFilter> for QueryFilter {
    fn from(filter: &AppliedFilter) -> Self {
        Self {
            id: filter.id.clone(),
            value: filter.value.clone(),
            comparison_type: filter.comparison_type,
        }
    }
}

/// Body of the available-products query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    #[serde(rename = "additionalFilters")]
    pub filters: Vec<QueryFilter>,
    pub page: u32,
    pub page_size: u32,
}

impl ProductQuery {
    pub fn new(filters: &[AppliedFilter], page: u32, page_size: u32) -> Self {
        Self {
            filters: filters.iter().map(QueryFilter::from).collect(),
            page,
            page_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinnedPosition {
    pub product_code: String,
    pub color_code: Option<String>,
    pub position: u32,
}

/// Body of the persist-order call. Positions are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveConstantsRequest {
    pub constants: Vec<PinnedPosition>,
}

impl SaveConstantsRequest {
    pub fn from_sequence(products: &[ProductRef]) -> Self {
        let constants = products
            .iter()
            .zip(1..)
            .map(|(product, position)| PinnedPosition {
                product_code: product.product_code.clone(),
                color_code: product.color_code.clone(),
                position,
            })
            .collect();
        Self { constants }
    }
}

// ─── Collection listing ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub lang_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRuleFilter {
    pub id: String,
    pub title: String,
    pub value: String,
    #[serde(default)]
    pub value_name: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    pub comparison_type: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRules {
    #[serde(default)]
    pub use_or_logic: bool,
    #[serde(default)]
    pub filters: Option<Vec<CollectionRuleFilter>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    pub id: i64,
    #[serde(default)]
    pub filters: Option<CollectionRules>,
    /// 0 for manual collections, 1 for filter-driven ones.
    #[serde(rename = "type", default)]
    pub kind: i32,
    pub info: CollectionInfo,
    #[serde(default)]
    pub sales_channel_id: i64,
    #[serde(default)]
    pub products: Option<Vec<ProductRef>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionsMeta {
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
    #[serde(default)]
    pub total_pages: u64,
    #[serde(default)]
    pub has_previous_page: bool,
    #[serde(default)]
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionsPage {
    pub meta: CollectionsMeta,
    pub data: Vec<CollectionSummary>,
}
