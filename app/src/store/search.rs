use super::SearchIndex;
use crate::error::StoreError;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use senser_core::search::{SearchDocument, SearchRequest, SEARCH_INDEX};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;

#[derive(Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Deserialize)]
struct Hits {
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: SearchDocument,
}

/// Elasticsearch over its REST API
pub struct ElasticSearchIndex {
    client: Client,
    index_url: String,
    index: OnceCell<()>,
}

impl ElasticSearchIndex {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(ElasticSearchIndex {
            client,
            index_url: format!("{}/{}", base_url.trim_end_matches('/'), SEARCH_INDEX),
            index: OnceCell::new(),
        })
    }

    async fn create_index(&self) -> Result<(), StoreError> {
        let exists = self.client.head(&self.index_url).send().await?;
        if exists.status().is_success() {
            return Ok(());
        }

        let body = json!({ "mappings": SearchDocument::mapping() });
        let resp = self.client.put(&self.index_url).json(&body).send().await?;
        let status = resp.status();
        if status.is_success() {
            info!(store = super::SEARCH, index = SEARCH_INDEX, "Created index");
            return Ok(());
        }
        // lost a creation race against another gateway
        let text = resp.text().await?;
        if status == StatusCode::BAD_REQUEST && text.contains("resource_already_exists_exception")
        {
            return Ok(());
        }
        Err(StoreError::SearchStatus(status.as_u16()))
    }
}

#[async_trait]
impl SearchIndex for ElasticSearchIndex {
    async fn ensure_index(&self) -> Result<(), StoreError> {
        self.index.get_or_try_init(|| self.create_index()).await?;
        Ok(())
    }

    async fn index_document(&self, doc: &SearchDocument) -> Result<(), StoreError> {
        let url = format!("{}/_doc/{}", self.index_url, doc.id);
        let resp = self
            .client
            .put(url)
            .query(&[("refresh", "wait_for")])
            .json(doc)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(StoreError::SearchStatus(resp.status().as_u16()));
        }
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<i32>, StoreError> {
        let url = format!("{}/_search", self.index_url);
        let resp = self
            .client
            .post(url)
            .json(&request.to_dsl())
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(StoreError::SearchStatus(resp.status().as_u16()));
        }
        let found: SearchResponse = resp.json().await?;
        Ok(found.hits.hits.into_iter().map(|hit| hit.source.id).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_hits() {
        let raw = r#"{
            "took": 1,
            "hits": {
                "total": {"value": 2, "relation": "eq"},
                "hits": [
                    {"_id": "4", "_score": 1.2, "_source": {"id": 4, "name": "sn-4", "type": "temp_sensor", "description": "roof"}},
                    {"_id": "1", "_score": 0.3, "_source": {"id": 1, "name": "sn-1", "type": "temp_sensor", "description": "cellar"}}
                ]
            }
        }"#;
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        let ids: Vec<i32> = parsed.hits.hits.into_iter().map(|h| h.source.id).collect();
        assert_eq!(vec![4, 1], ids);
    }

    #[test]
    fn test_index_url() {
        let index = ElasticSearchIndex::new("http://localhost:9200/", Duration::from_secs(1)).unwrap();
        assert_eq!("http://localhost:9200/sensors", index.index_url);
    }
}
