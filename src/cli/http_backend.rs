use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::models::{
    DeindexRequest, ImportRequest, IndexRequest, IndexSummary, KeywordList, KeywordsRequest,
    ReindexRequest, SearchRequest, SearchResult, StoreConfig, StoreSummary,
};

/// HTTP client that delegates every operation to a running `zksearch`
/// daemon.
pub struct HttpSearchBackend {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpSearchBackend {
    /// Create a new HTTP backend targeting the given base URL
    /// (e.g. "http://127.0.0.1:7878").
    pub fn new<S: Into<String>>(base_url: S) -> Result<Self> {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client, base_url })
    }

    pub fn index(&self, request: IndexRequest) -> Result<IndexSummary> {
        self.post_json("/v1/index", &request)
    }

    pub fn reindex(&self, request: ReindexRequest) -> Result<IndexSummary> {
        self.post_json("/v1/reindex", &request)
    }

    pub fn deindex(&self, request: DeindexRequest) -> Result<IndexSummary> {
        self.post_json("/v1/deindex", &request)
    }

    pub fn import(&self, request: ImportRequest) -> Result<IndexSummary> {
        self.post_json("/v1/import", &request)
    }

    pub fn search(&self, request: SearchRequest) -> Result<SearchResult> {
        self.post_json("/v1/search", &request)
    }

    pub fn keywords(&self, request: KeywordsRequest) -> Result<KeywordList> {
        self.post_json("/v1/keywords", &request)
    }

    pub fn store_info(&self, config: StoreConfig) -> Result<StoreSummary> {
        self.post_json("/v1/store/info", &config)
    }

    fn post_json<T, R>(&self, path: &str, body: &T) -> Result<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let url = self.url_for(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .with_context(|| format!("failed to send request to {}", url))?;

        let status = response.status();
        if !status.is_success() {
            match response.json::<ErrorBody>() {
                Ok(body) => bail!("server returned {status} for {url}: {}", body.error),
                Err(_) => bail!("server returned {status} for {url}"),
            }
        }

        let value = response
            .json::<R>()
            .context("failed to decode JSON response from server")?;

        Ok(value)
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
