//! Figma REST API client.
//!
//! Only the three calls the generator needs: frame children, SVG render URLs, and the rendered
//! SVG bodies themselves. Pacing is applied by the caller's dispatch limiter, not here.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::app::source::AssetSource;
use crate::domain::model::RawNode;
use crate::infra::config::FigmaSettings;

const TOKEN_HEADER: &str = "X-FIGMA-TOKEN";
const ERROR_BODY_LIMIT: usize = 200;

/// Client bound to a single Figma file.
pub struct FigmaClient {
    http: Client,
    api_base: String,
    file_id: String,
}

impl FigmaClient {
    pub fn new(settings: &FigmaSettings, token: &str, file_id: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut value =
            HeaderValue::from_str(token).context("access token is not a valid header value")?;
        value.set_sensitive(true);
        headers.insert(TOKEN_HEADER, value);

        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs()))
            .default_headers(headers)
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            http,
            api_base: settings.api_base().trim_end_matches('/').to_owned(),
            file_id: file_id.into(),
        })
    }

    fn files_url(&self) -> String {
        format!("{}/files/{}/nodes", self.api_base, self.file_id)
    }

    fn images_url(&self) -> String {
        format!("{}/images/{}", self.api_base, self.file_id)
    }
}

#[async_trait]
impl AssetSource for FigmaClient {
    async fn fetch_group_children(&self, group_id: &str) -> Result<Vec<RawNode>> {
        let node_id = normalize_node_id(group_id);
        let response = self
            .http
            .get(self.files_url())
            .query(&[("ids", node_id.as_str())])
            .send()
            .await
            .with_context(|| format!("failed to fetch node {node_id}"))?;
        let nodes = checked_json(response, "nodes").await?;
        children_of(nodes, &node_id)
    }

    async fn fetch_asset_urls(&self, node_ids: &[String]) -> Result<HashMap<String, Option<String>>> {
        let ids = node_ids.join(",");
        let response = self
            .http
            .get(self.images_url())
            .query(&[("ids", ids.as_str()), ("format", "svg")])
            .send()
            .await
            .context("failed to request svg renders")?;
        let images = checked_json(response, "images").await?;
        image_urls(images)
    }

    async fn fetch_asset_content(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to download {url}"))?;
        checked_body(response).await
    }
}

async fn checked_body(response: Response) -> Result<String> {
    let url = response.url().clone();
    ensure_success(response)
        .await?
        .text()
        .await
        .with_context(|| format!("failed to read response body from {}", url.path()))
}

async fn checked_json<T: DeserializeOwned>(response: Response, endpoint: &str) -> Result<T> {
    ensure_success(response)
        .await?
        .json::<T>()
        .await
        .with_context(|| format!("unexpected response shape from {endpoint} endpoint"))
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let path = response.url().path().to_owned();
    let body = response.text().await.unwrap_or_default();
    Err(anyhow!(
        "Figma API error {} for {}: {}",
        status,
        path,
        body.chars().take(ERROR_BODY_LIMIT).collect::<String>()
    ))
}

/// Accept ids as written in share links (`1-2`, `1%3A2`) as well as API ids (`1:2`).
pub fn normalize_node_id(raw: &str) -> String {
    raw.trim()
        .replace("%3A", ":")
        .replace("%3a", ":")
        .replace('-', ":")
}

#[derive(Deserialize)]
struct NodesResponse {
    nodes: HashMap<String, Option<NodeEntry>>,
}

#[derive(Deserialize)]
struct NodeEntry {
    document: RawNode,
}

#[derive(Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    err: Option<String>,
    #[serde(default)]
    images: HashMap<String, Option<String>>,
}

fn children_of(response: NodesResponse, node_id: &str) -> Result<Vec<RawNode>> {
    response
        .nodes
        .get(node_id)
        .and_then(Option::as_ref)
        .map(|entry| entry.document.children.clone())
        .ok_or_else(|| anyhow!("node {node_id} not found in file"))
}

fn image_urls(response: ImagesResponse) -> Result<HashMap<String, Option<String>>> {
    if let Some(err) = response.err {
        return Err(anyhow!("Figma could not render images: {err}"));
    }
    Ok(response.images)
}
