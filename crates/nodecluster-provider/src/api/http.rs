//! HTTP client for the provisioning service

use super::{ApiError, NodeClusterApi, classify_status};
use crate::config::ApiConfig;
use nodecluster_common::{NodeCluster, NodeClusterRequest, NodeClusterUpdate};
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

const NODE_CLUSTER_PATH: &str = "api/infra/v1/nodecluster/";

/// Provisioning API client using basic auth.
pub struct HttpNodeClusterApi {
    client: Client,
    collection_url: String,
    user: String,
    apikey: String,
}

impl HttpNodeClusterApi {
    /// Build a client for the service described by `config`.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("nodecluster/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            collection_url: format!(
                "{}/{}",
                config.base_url.trim_end_matches('/'),
                NODE_CLUSTER_PATH
            ),
            user: config.user.clone(),
            apikey: config.apikey.clone(),
        })
    }

    fn cluster_url(&self, id: &str) -> String {
        format!("{}{}/", self.collection_url, id)
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: RequestBuilder, id: &str) -> Result<String, ApiError> {
        let response = request
            .basic_auth(&self.user, Some(&self.apikey))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(id = %id, status = status.as_u16(), "Provisioning API response");

        if status.is_success() {
            Ok(body)
        } else {
            Err(classify_status(status.as_u16(), id, &body))
        }
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(ApiError::Decode)
}

impl NodeClusterApi for HttpNodeClusterApi {
    async fn create_node_cluster(
        &self,
        request: &NodeClusterRequest,
    ) -> Result<NodeCluster, ApiError> {
        let body = self
            .send(self.client.post(&self.collection_url).json(request), "")
            .await?;
        decode(&body)
    }

    async fn deploy_node_cluster(&self, id: &str) -> Result<(), ApiError> {
        let url = format!("{}deploy/", self.cluster_url(id));
        self.send(self.client.post(url), id).await?;
        Ok(())
    }

    async fn get_node_cluster(&self, id: &str) -> Result<NodeCluster, ApiError> {
        let body = self.send(self.client.get(self.cluster_url(id)), id).await?;
        decode(&body)
    }

    async fn update_node_cluster(
        &self,
        id: &str,
        update: &NodeClusterUpdate,
    ) -> Result<(), ApiError> {
        self.send(self.client.patch(self.cluster_url(id)).json(update), id)
            .await?;
        Ok(())
    }

    async fn terminate_node_cluster(&self, id: &str) -> Result<(), ApiError> {
        self.send(self.client.delete(self.cluster_url(id)), id)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls() {
        let config = ApiConfig::new("alice", "key").with_base_url("https://cloud.example.com/");
        let api = HttpNodeClusterApi::new(&config).unwrap();

        assert_eq!(
            api.collection_url,
            "https://cloud.example.com/api/infra/v1/nodecluster/"
        );
        assert_eq!(
            api.cluster_url("6b2a"),
            "https://cloud.example.com/api/infra/v1/nodecluster/6b2a/"
        );
    }

    #[test]
    fn decode_errors_are_typed() {
        let err = decode::<NodeCluster>("not json").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
