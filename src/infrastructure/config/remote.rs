//! Remote configuration documents served over HTTP.

use std::time::Duration;

use reqwest::Client as ReqwestClient;
use tracing::debug;

use super::error::{ConfigError, Result};
use crate::domain::models::ConfigNode;

/// Client for a configuration server exposing `GET {base}/{app}{-profiles}.yaml`.
pub struct RemoteConfigClient {
    http_client: ReqwestClient,
    base_url: String,
}

impl RemoteConfigClient {
    /// Create a client for `base_url`; every request is bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http_client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ConfigError::RemoteFetch {
                url: base_url.clone(),
                source,
            })?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// URL of the document for `app_name` and the active profiles.
    ///
    /// Profiles are joined with `,` and appended after a dash, so
    /// `("orders", ["dev", "eu"])` maps to `{base}/orders-dev,eu.yaml`.
    pub fn document_url(&self, app_name: &str, profiles: &[String]) -> String {
        if profiles.is_empty() {
            format!("{}/{app_name}.yaml", self.base_url)
        } else {
            format!("{}/{app_name}-{}.yaml", self.base_url, profiles.join(","))
        }
    }

    /// Fetch and parse the document for `app_name` and `profiles`.
    pub async fn fetch(&self, app_name: &str, profiles: &[String]) -> Result<ConfigNode> {
        let url = self.document_url(app_name, profiles);
        debug!(url = %url, "Fetching remote configuration");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|source| ConfigError::RemoteFetch {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConfigError::RemoteStatus {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| ConfigError::RemoteFetch {
                url: url.clone(),
                source,
            })?;

        ConfigNode::from_yaml_str(&body).map_err(|source| ConfigError::Parse {
            origin: url,
            source,
        })
    }
}
