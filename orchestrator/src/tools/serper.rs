// Web search through the Serper Google search API

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{SearchHit, ToolError};

pub const SERPER_ENDPOINT: &str = "https://google.serper.dev/search";

pub struct SerperSearch {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

impl SerperSearch {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            endpoint: SERPER_ENDPOINT.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ToolError> {
        debug!(query, "Serper search");
        let res = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&SearchRequest { q: query })
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(ToolError::Status(res.status().as_u16()));
        }

        let body: SearchResponse = res.json().await?;
        Ok(body
            .organic
            .into_iter()
            .filter(|hit| !hit.link.is_empty())
            .map(|hit| SearchHit {
                title: hit.title,
                url: hit.link,
                snippet: hit.snippet,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn maps_organic_results_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("X-API-KEY", "serper-key"))
            .and(body_json(serde_json::json!({ "q": "Porto travel tips" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "searchParameters": { "q": "Porto travel tips" },
                "organic": [
                    { "title": "Porto guide", "link": "https://a.example/porto", "snippet": "Ride tram 1" },
                    { "title": "No link" },
                    { "title": "Food", "link": "https://b.example/food", "snippet": "Try francesinha" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let search = SerperSearch::new(reqwest::Client::new(), "serper-key".into()).with_endpoint(server.uri());
        let hits = search.search("Porto travel tips").await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://a.example/porto");
        assert_eq!(hits[1].snippet, "Try francesinha");
    }

    #[tokio::test]
    async fn non_success_is_a_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let search = SerperSearch::new(reqwest::Client::new(), "bad".into()).with_endpoint(server.uri());
        let err = search.search("x").await.unwrap_err();
        assert!(matches!(err, ToolError::Status(403)));
    }
}
