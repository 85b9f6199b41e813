//! [`Loader`] over [`HttpFetcher`] with a canned HTTP client.


use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use resource_loader::{FetchError, HttpClient, HttpFetcher, LoadView, Loader, Query};
use serde_json::{json, Value};
use url::Url;

struct CannedClient {
    responses: Mutex<Vec<Result<String, FetchError>>>,
    requested: Mutex<Vec<String>>,
}

impl CannedClient {
    fn new(responses: Vec<Result<String, FetchError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses),
            requested: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl HttpClient for CannedClient {
    async fn get(&self, url: &Url) -> Result<String, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(FetchError::new("no response queued"));
        }
        responses.remove(0)
    }
}

fn collections() -> String {
    json!([
        {"id": 1, "name": "Our analytics"},
        {"id": 2, "name": "Marketing"},
        {"id": 3, "name": "Finance"}
    ])
    .to_string()
}

#[tokio::test]
async fn loads_collection_list_and_limits_it() {
    let client = CannedClient::new(vec![Ok(collections())]);
    let fetcher: HttpFetcher<Vec<Value>> =
        HttpFetcher::with_client("http://localhost:3000/api", client.clone()).unwrap();
    let loader: Loader<Query, Vec<Value>> = Loader::new(fetcher);

    loader.initialize(Query::new("collection").param("archived", false));
    let snap = loader.settled().await.unwrap();

    let view: LoadView<Vec<Value>> = snap.view().limit(2);
    assert_eq!(
        serde_json::to_value(&view).unwrap(),
        json!({
            "loading": false,
            "error": null,
            "data": [{"id": 1, "name": "Our analytics"}, {"id": 2, "name": "Marketing"}]
        })
    );
    assert_eq!(
        client.requested.lock().unwrap().as_slice(),
        ["http://localhost:3000/api/collection?archived=false".to_string()]
    );
}

#[tokio::test]
async fn transport_error_becomes_failed_view() {
    let client = CannedClient::new(vec![Err(FetchError::new("network error"))]);
    let fetcher: HttpFetcher<Vec<Value>> =
        HttpFetcher::with_client("http://localhost:3000/api/", client).unwrap();
    let loader: Loader<Query, Vec<Value>> = Loader::new(fetcher);

    loader.initialize(Query::new("dashboard"));
    loader.settled().await.unwrap();

    let view = loader.view();
    assert!(!view.loading);
    assert_eq!(view.data, None);
    assert_eq!(view.error.map(|e| e.to_string()), Some("network error".to_string()));
}

#[tokio::test]
async fn undecodable_body_is_a_decode_failure() {
    let client = CannedClient::new(vec![Ok("<html>".to_string())]);
    let fetcher: HttpFetcher<Vec<Value>> =
        HttpFetcher::with_client("http://localhost:3000/api/", client).unwrap();
    let loader: Loader<Query, Vec<Value>> = Loader::new(fetcher);

    loader.initialize(Query::new("dashboard"));
    let snap = loader.settled().await.unwrap();
    let error = snap.state.error().unwrap();
    assert!(error.message().starts_with("decode: "), "{}", error);
}

#[tokio::test]
async fn changing_query_requests_new_url() {
    let client = CannedClient::new(vec![Ok("[]".to_string()), Ok(collections())]);
    let fetcher: HttpFetcher<Vec<Value>> =
        HttpFetcher::with_client("http://h/api/", client.clone()).unwrap();
    let loader: Loader<Query, Vec<Value>> = Loader::new(fetcher);

    loader.initialize(Query::new("collection"));
    loader.settled().await.unwrap();
    assert!(loader.set_query(Query::new("collection").param("archived", true)));
    let snap = loader.settled().await.unwrap();

    assert_eq!(snap.generation, 2);
    assert_eq!(snap.state.data().map(Vec::len), Some(3));
    assert_eq!(
        client.requested.lock().unwrap().as_slice(),
        [
            "http://h/api/collection".to_string(),
            "http://h/api/collection?archived=true".to_string()
        ]
    );
}
