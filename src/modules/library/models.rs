use serde::Deserialize;
use serde_json::Value;

/// Body of the add-to-library operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AddBookRequest {
    /// Catalog identifier of the book; must be a UUID
    pub book_id: String,
}

/// Body of the update-progress operation. Both fields are optional but at
/// least one must be present.
///
/// Fields stay raw JSON; type and range checks belong to
/// [`compute_update`](super::progress::compute_update).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProgressRequest {
    /// One of `to_read`, `reading`, `finished`, `abandoned`
    #[serde(default)]
    pub status: Option<Value>,
    /// Percentage read, 0 to 100
    #[serde(default)]
    pub progress: Option<Value>,
}
