// Scripted GitHub for facade tests: exact URL in, canned response out
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use repofolio_api::{RawResponse, Transport};
use serde_json::{json, Value};

pub(crate) const SEARCH_URL: &str =
    "https://api.github.com/search/repositories?q=user%3AFlotss%20fork%3Atrue";
const GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Unscripted URLs answer like GitHub does for unknown resources
#[derive(Default)]
pub(crate) struct FakeGitHub {
    routes: Mutex<HashMap<String, RawResponse>>,
    requests: Mutex<Vec<String>>,
}

impl FakeGitHub {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on_get(&self, url: &str, status: u16, body: Value) {
        self.on_get_text(url, status, &body.to_string());
    }

    pub(crate) fn on_get_text(&self, url: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), RawResponse::new(status, body));
    }

    /// The whole owner listing as a single search page
    pub(crate) fn on_search(&self, items: Vec<Value>) {
        let total = items.len();
        self.on_get(
            &format!("{}&page=1&per_page=100", SEARCH_URL),
            200,
            json!({"total_count": total, "incomplete_results": false, "items": items}),
        );
    }

    pub(crate) fn on_pinned(&self, names: &[&str]) {
        let nodes: Vec<Value> = names.iter().map(|n| json!({"name": n})).collect();
        self.on_post_status(
            200,
            json!({"data": {"user": {"pinnedItems": {"nodes": nodes}}}}),
        );
    }

    pub(crate) fn on_post_status(&self, status: u16, body: Value) {
        self.routes
            .lock()
            .unwrap()
            .insert(format!("POST {}", GRAPHQL_URL), RawResponse::new(status, body.to_string()));
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn respond(&self, key: String) -> RawResponse {
        self.requests.lock().unwrap().push(key.clone());
        self.routes
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| RawResponse::new(404, r#"{"message": "Not Found"}"#))
    }
}

#[async_trait]
impl Transport for FakeGitHub {
    async fn get(&self, url: &str) -> repofolio_api::github::Result<RawResponse> {
        Ok(self.respond(url.to_string()))
    }

    async fn post_json(&self, url: &str, _body: Value) -> repofolio_api::github::Result<RawResponse> {
        Ok(self.respond(format!("POST {}", url)))
    }
}

/// Minimal repository record as the search and repos endpoints return it
pub(crate) fn repo_json(id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "full_name": format!("Flotss/{}", name),
        "description": null,
        "html_url": format!("https://github.com/Flotss/{}", name),
        "url": format!("https://api.github.com/repos/Flotss/{}", name),
        "created_at": "2023-01-02T10:00:00Z",
        "updated_at": "2024-03-04T12:30:00Z",
        "language": "Rust",
        "owner": {"login": "Flotss"}
    })
}
