//! Collaborator seams for remote assets and markup transformation.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::model::RawNode;

/// Remote design document access.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Children of the given group or frame node, in document order.
    async fn fetch_group_children(&self, group_id: &str) -> Result<Vec<RawNode>>;

    /// Rendered asset URLs for a batch of nodes. A node the remote could not render maps to `None`.
    async fn fetch_asset_urls(&self, node_ids: &[String])
    -> Result<HashMap<String, Option<String>>>;

    /// Raw markup behind an asset URL.
    async fn fetch_asset_content(&self, url: &str) -> Result<String>;
}

/// Turns raw asset markup into an embeddable fragment.
pub trait MarkupTransformer: Send + Sync {
    fn transform(&self, raw: &str) -> Result<String>;
}
