//! HTTP transport.
//!
//! The transport is built once from the configuration and shared by every analyzer. It owns
//! the base address and the credential, so callers never pass them per call.

use crate::{
    config::Config,
    error::{Kind, Result},
    response::{decode, from_reqwest, normalize},
};
use bytes::Bytes;
use log::{debug, warn};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    multipart::{Form, Part},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// Content type of the `file` part of uploads.
const UPLOAD_MIME: &str = "application/octet-stream";

/// Body or parameters of a request.
#[derive(Debug, Clone)]
pub enum Payload {
    /// No body nor parameters.
    Empty,
    /// URL query parameters.
    Query(Vec<(&'static str, String)>),
    /// URL-encoded form body.
    Form(Vec<(&'static str, String)>),
    /// JSON body.
    Json(Value),
    /// Multipart body with a single `file` field.
    File {
        /// Original name of the file.
        file_name: String,
        /// Raw contents.
        bytes: Vec<u8>,
    },
}

impl Payload {
    fn describe(&self) -> &'static str {
        match self {
            Payload::Empty => "empty",
            Payload::Query(_) => "query",
            Payload::Form(_) => "form",
            Payload::Json(_) => "json",
            Payload::File { .. } => "multipart",
        }
    }
}

/// Configured HTTP client of the analysis service.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    base_url: Url,
}

impl Transport {
    /// Creates the transport for the given configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let mut base_url = config.server_url()?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let header = HeaderName::from_bytes(config.auth_header().as_bytes()).map_err(|e| {
            Kind::config(format!(
                "invalid authentication header `{}`: {}",
                config.auth_header(),
                e
            ))
        })?;
        let mut key = HeaderValue::from_str(config.api_key())
            .map_err(|e| Kind::config(format!("the API key is not a valid header value: {}", e)))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        let _ = headers.insert(header, key);

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("mobsf-client/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Kind::config(format!("could not create the HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// Gets the base address every path is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a relative endpoint path.
    pub fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Kind::config(format!("invalid endpoint path `{}`: {}", path, e)))
    }

    /// Sends a request and returns the raw body of a successful response.
    pub async fn send(&self, method: Method, path: &str, payload: Payload) -> Result<Bytes> {
        let url = self.url(path)?;
        debug!("{} {} ({} payload)", method, url, payload.describe());

        let builder = self.client.request(method.clone(), url.clone());
        let builder = match payload {
            Payload::Empty => builder,
            Payload::Query(params) => builder.query(&params),
            Payload::Form(params) => builder.form(&params),
            Payload::Json(body) => builder.json(&body),
            Payload::File { file_name, bytes } => {
                let part = Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(UPLOAD_MIME)
                    .map_err(|e| Kind::config(format!("invalid upload content type: {}", e)))?;
                builder.multipart(Form::new().part("file", part))
            }
        };

        let response = builder.send().await.map_err(|e| {
            let error = from_reqwest(&e);
            warn!("{} {} failed: {}", method, url, error);
            error
        })?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| from_reqwest(&e))?;

        if let Err(e) = normalize(status, &body) {
            debug!("{} {} answered {}: {}", method, url, status, e);
            return Err(e);
        }
        debug!("{} {} answered {} ({} bytes)", method, url, status, body.len());
        Ok(body)
    }

    /// Sends a request and decodes the JSON body of a successful response.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
    ) -> Result<T> {
        let body = self.send(method, path, payload).await?;
        decode(path, &body)
    }
}
