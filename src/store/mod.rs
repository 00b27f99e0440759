use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod supabase;

pub use supabase::SupabaseStore;

use crate::features::Feature;
use crate::Result;

/// Row persisted for one completed transcription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionRecord {
    /// Original source URL
    pub url: String,

    /// Vendor-issued request identifier, the storage key
    pub request_id: String,

    /// Original request fields merged with the full vendor payload
    pub data: serde_json::Value,

    /// Feature list exactly as requested
    pub features: Vec<Feature>,
}

/// Trait for persisting transcription results
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptionStore: Send + Sync {
    /// Insert a single record; the pipeline never retries.
    async fn insert(&self, record: &TranscriptionRecord) -> Result<()>;
}
