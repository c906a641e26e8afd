//! In-process analysis service used by the tests.
//!
//! Every request is recorded and answered by the handler the test provides.

use crate::config::Config;
use bytes::Bytes;
use serde_json::Value;
use std::{
    collections::HashMap,
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};
use warp::{
    http::{HeaderMap, Method, Response},
    path::FullPath,
    Filter,
};

/// API key configured by [`MockServer::config`].
pub const API_KEY: &str = "3f6c0f1e9b1a4b5d8e2f7a6c5d4e3b2a1f0e9d8c7b6a5f4e3d2c1b0a9f8e7d6c";

/// Request received by the mock server.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Recorded {
    /// Decodes the URL-encoded form body.
    pub fn form(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(&self.body)
            .into_owned()
            .collect()
    }

    /// Gets a field of the URL-encoded form body.
    pub fn form_value(&self, key: &str) -> Option<String> {
        self.form()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Gets a query parameter.
    pub fn query_value(&self, key: &str) -> Option<String> {
        url::form_urlencoded::parse(self.query.as_bytes())
            .into_owned()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Decodes the JSON body.
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    /// Gets a header, by lowercase name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Path without the `api/v1` prefix.
    pub fn endpoint(&self) -> &str {
        self.path.trim_start_matches("/api/v1/")
    }
}

/// Answer of the mock server.
#[derive(Debug, Clone)]
pub struct MockReply {
    status: u16,
    body: Vec<u8>,
    content_type: &'static str,
    delay: Option<Duration>,
}

impl MockReply {
    pub fn json(status: u16, body: Value) -> Self {
        Self::bytes(status, body.to_string().into_bytes(), "application/json")
    }

    pub fn bytes(status: u16, body: Vec<u8>, content_type: &'static str) -> Self {
        Self {
            status,
            body,
            content_type,
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Mock analysis service bound to an ephemeral local port.
pub struct MockServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockServer {
    /// Starts the server on the current tokio runtime.
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&Recorded) -> MockReply + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);

        let route = warp::method()
            .and(warp::path::full())
            .and(
                warp::query::raw()
                    .or(warp::any().map(String::new))
                    .unify(),
            )
            .and(warp::header::headers_cloned())
            .and(warp::body::bytes())
            .and_then(
                move |method: Method,
                      path: FullPath,
                      query: String,
                      headers: HeaderMap,
                      body: Bytes| {
                    let handler = Arc::clone(&handler);
                    let log = Arc::clone(&log);
                    async move {
                        let recorded = Recorded {
                            method: method.as_str().to_owned(),
                            path: path.as_str().to_owned(),
                            query,
                            headers: headers
                                .iter()
                                .map(|(k, v)| {
                                    (
                                        k.as_str().to_owned(),
                                        v.to_str().unwrap_or_default().to_owned(),
                                    )
                                })
                                .collect(),
                            body: body.to_vec(),
                        };
                        let reply = (*handler)(&recorded);
                        log.lock().unwrap().push(recorded);

                        if let Some(delay) = reply.delay {
                            tokio::time::sleep(delay).await;
                        }
                        Ok::<_, Infallible>(
                            Response::builder()
                                .status(reply.status)
                                .header("content-type", reply.content_type)
                                .body(reply.body)
                                .unwrap(),
                        )
                    }
                },
            );

        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        let _ = tokio::spawn(server);

        Self { addr, requests }
    }

    /// Base address of the server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing to this server.
    pub fn config(&self) -> Config {
        Config::new(self.url(), API_KEY)
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Last request received.
    pub fn last(&self) -> Recorded {
        self.requests()
            .pop()
            .expect("the mock server did not receive any request")
    }
}
