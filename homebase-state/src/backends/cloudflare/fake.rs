//! In-memory stand-in for the R2 API, used by unit tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::json;

use super::client::{Account, BackendClient, Body, ClientResult, classify_error};

fn error_body(code: i64, message: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "success": false,
        "errors": [{ "code": code, "message": message }],
        "messages": [],
        "result": null,
    }))
    .unwrap()
}

fn ok_body(result: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "success": true,
        "errors": [],
        "messages": [],
        "result": result,
    }))
    .unwrap()
}

#[derive(Default)]
struct FakeState {
    accounts: Vec<Account>,
    /// Buckets returned by listing
    buckets: Vec<String>,
    /// Buckets that exist but are not (yet) visible to listing
    unlisted: Vec<String>,
    objects: HashMap<(String, String), Vec<u8>>,
    requests: Vec<String>,
    create_requests: usize,
    failing: Vec<(Method, String)>,
}

impl FakeState {
    fn bucket_exists(&self, name: &str) -> bool {
        self.buckets.iter().chain(&self.unlisted).any(|b| b == name)
    }
}

/// Shared handle: clones observe the same remote state
#[derive(Clone, Default)]
pub(crate) struct FakeR2 {
    state: Arc<Mutex<FakeState>>,
}

impl FakeR2 {
    pub fn with_accounts(ids: &[&str]) -> Self {
        let fake = Self::default();
        fake.lock().accounts = ids
            .iter()
            .map(|id| Account {
                id: id.to_string(),
                name: format!("{} account", id),
            })
            .collect();
        fake
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn add_bucket(&self, name: &str) {
        self.lock().buckets.push(name.to_string());
    }

    pub fn add_unlisted_bucket(&self, name: &str) {
        self.lock().unlisted.push(name.to_string());
    }

    pub fn has_bucket(&self, name: &str) -> bool {
        self.lock().bucket_exists(name)
    }

    /// Make `method` requests to exactly `path` fail with a server error
    pub fn fail_requests_to(&self, method: Method, path: &str) {
        self.lock().failing.push((method, path.to_string()));
    }

    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    pub fn create_requests(&self) -> usize {
        self.lock().create_requests
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }
}

#[async_trait]
impl BackendClient for FakeR2 {
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Body>,
    ) -> ClientResult<Vec<u8>> {
        let mut state = self.lock();
        state.requests.push(format!("{} {}", method, path));

        let segments: Vec<&str> = path.split('/').collect();
        let on_buckets = matches!(segments.as_slice(), ["accounts", _, "r2", "buckets"]);
        if method == Method::POST && on_buckets {
            state.create_requests += 1;
        }

        if state.failing.iter().any(|(m, p)| *m == method && p == path) {
            return Err(classify_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                &error_body(10001, "Internal error"),
                path,
            ));
        }

        match (method.as_str(), segments.as_slice()) {
            ("GET", ["accounts"]) => Ok(ok_body(json!(state.accounts))),
            ("GET", ["accounts", _, "r2", "buckets"]) => {
                let filter = query
                    .iter()
                    .find(|(k, _)| *k == "name_contains")
                    .map(|(_, v)| *v)
                    .unwrap_or("");
                let buckets: Vec<_> = state
                    .buckets
                    .iter()
                    .filter(|b| b.contains(filter))
                    .map(|b| json!({ "name": b, "creation_date": "2024-01-01T00:00:00Z" }))
                    .collect();
                Ok(ok_body(json!({ "buckets": buckets })))
            }
            ("POST", ["accounts", _, "r2", "buckets"]) => {
                let name = match body {
                    Some(Body::Json(value)) => {
                        value["name"].as_str().unwrap_or_default().to_string()
                    }
                    _ => String::new(),
                };
                if state.bucket_exists(&name) {
                    return Err(classify_error(
                        StatusCode::CONFLICT,
                        &error_body(10004, "The bucket you tried to create already exists"),
                        path,
                    ));
                }
                state.buckets.push(name.clone());
                Ok(ok_body(json!({ "name": name })))
            }
            (method, ["accounts", _, "r2", "buckets", bucket, "objects", key @ ..]) => {
                if !state.bucket_exists(bucket) {
                    return Err(classify_error(
                        StatusCode::NOT_FOUND,
                        &error_body(10006, "The specified bucket does not exist."),
                        path,
                    ));
                }
                let id = (bucket.to_string(), key.join("/"));
                match method {
                    "PUT" => {
                        let bytes = match body {
                            Some(Body::Raw(bytes)) => bytes,
                            _ => Vec::new(),
                        };
                        state.objects.insert(id, bytes);
                        Ok(Vec::new())
                    }
                    "GET" => state.objects.get(&id).cloned().ok_or_else(|| {
                        classify_error(
                            StatusCode::NOT_FOUND,
                            &error_body(10007, "The specified key does not exist."),
                            path,
                        )
                    }),
                    "DELETE" => {
                        state.objects.remove(&id);
                        Ok(Vec::new())
                    }
                    _ => Err(classify_error(StatusCode::METHOD_NOT_ALLOWED, b"", path)),
                }
            }
            _ => Err(classify_error(
                StatusCode::BAD_REQUEST,
                &error_body(7000, "No route for that URI"),
                path,
            )),
        }
    }
}
