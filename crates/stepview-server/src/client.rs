//! HTTP client for pushing scene content to a running server

use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;
use stepview_core::{AxisEntry, FrustumEntry, MeshData, MeshEntry, PointCloudEntry, SceneSnapshot};
use tracing::debug;

use crate::api::{LoadSceneRequest, StepAck, UpdateMeshRequest, UpdatePointCloudRequest};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

pub struct ViewerClient {
    base_url: String,
    client: reqwest::Client,
}

impl ViewerClient {
    /// `host` is either `host:port` or a full URL
    pub fn new(host: &str) -> Result<Self> {
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", host.trim_end_matches('/'))
        };
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(url = %url, "POST");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()?;
        Ok(response)
    }

    pub async fn health(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?.error_for_status()?;
        let body: serde_json::Value = response.json().await?;
        Ok(body["status"] == "healthy")
    }

    pub async fn scene(&self, step: Option<u32>) -> Result<SceneSnapshot> {
        let url = stepview_core::scene_url(&self.base_url, step);
        let response = self.client.get(&url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    pub async fn load_scene(
        &self,
        points: Option<Vec<[f32; 3]>>,
        mesh: Option<MeshData>,
    ) -> Result<()> {
        self.post("load_scene", &LoadSceneRequest { points, mesh })
            .await?;
        Ok(())
    }

    pub async fn update_mesh(&self, mesh: MeshData, label: Option<String>) -> Result<StepAck> {
        let response = self
            .post("update_mesh", &UpdateMeshRequest { mesh, label })
            .await?;
        Ok(response.json().await?)
    }

    pub async fn update_point_cloud(
        &self,
        points: Vec<[f32; 3]>,
        label: Option<String>,
    ) -> Result<StepAck> {
        let response = self
            .post("update_point_cloud", &UpdatePointCloudRequest { points, label })
            .await?;
        Ok(response.json().await?)
    }

    pub async fn add_mesh(&self, entry: &MeshEntry) -> Result<StepAck> {
        Ok(self.post("add_mesh", entry).await?.json().await?)
    }

    pub async fn add_point_cloud(&self, entry: &PointCloudEntry) -> Result<StepAck> {
        Ok(self.post("add_point_cloud", entry).await?.json().await?)
    }

    pub async fn add_frustum(&self, entry: &FrustumEntry) -> Result<()> {
        self.post("add_frustum", entry).await?;
        Ok(())
    }

    pub async fn add_object_axis(&self, entry: &AxisEntry) -> Result<()> {
        self.post("add_object_axis", entry).await?;
        Ok(())
    }

    pub async fn add_global_axes(&self) -> Result<()> {
        self.post("add_global_axes", &serde_json::json!({})).await?;
        Ok(())
    }

    pub async fn clear_scene(&self) -> Result<()> {
        self.post("clear_scene", &serde_json::json!({})).await?;
        Ok(())
    }
}
