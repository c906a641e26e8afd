//! Entry point of the library.

use crate::{
    config::Config,
    dynamic_analysis::DynamicAnalyzer,
    error::Result,
    static_analysis::StaticAnalyzer,
    transport::Transport,
};
use std::sync::Arc;

/// Client of an analysis service.
///
/// It is built from an explicit [`Config`] and hands out analyzers that share one transport,
/// so any number of clients with different services or credentials can live side by side.
#[derive(Debug, Clone)]
pub struct Client {
    transport: Arc<Transport>,
}

impl Client {
    /// Creates a client for the given configuration.
    ///
    /// Fails with a configuration error if the server address, the API key or the
    /// authentication header cannot be used.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_transport(Arc::new(Transport::new(config)?)))
    }

    /// Creates a client on top of an existing transport.
    pub fn with_transport(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Gets the static analysis client.
    pub fn static_analyzer(&self) -> StaticAnalyzer {
        StaticAnalyzer::new(Arc::clone(&self.transport))
    }

    /// Gets the dynamic analysis client.
    pub fn dynamic_analyzer(&self) -> DynamicAnalyzer {
        DynamicAnalyzer::new(Arc::clone(&self.transport))
    }

    /// Gets the shared transport.
    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::Client;
    use crate::{
        mock::{MockReply, MockServer, API_KEY},
        Config, Hash,
    };
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn it_rejects_bad_config() {
        let error = Client::new(&Config::new("ftp://example.com", "key")).unwrap_err();
        assert!(!error.is_transport_failure());

        let mut config = Config::new("http://127.0.0.1:8000", "key");
        config.set_auth_header("bad header");
        assert!(Client::new(&config).is_err());
    }

    #[tokio::test]
    async fn it_analyzers_share_the_transport() {
        let server = MockServer::start(|_| MockReply::json(200, json!({"status": "ok"})));
        let client = Client::new(&server.config()).unwrap();

        let _ = client.static_analyzer().scan_logs(&Hash::new("H1")).await;
        let _ = client
            .dynamic_analyzer()
            .stop_analysis(&Hash::new("H1"))
            .await
            .unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        for request in &requests {
            assert_eq!(request.header("x-mobsf-api-key"), Some(API_KEY));
        }
        assert!(Arc::ptr_eq(client.transport(), client.clone().transport()));
    }

    #[tokio::test]
    async fn it_independent_clients() {
        let first = MockServer::start(|_| MockReply::json(200, json!({"status": "ok"})));
        let second = MockServer::start(|_| MockReply::json(200, json!({"status": "ok"})));

        let mut config = second.config();
        config.set_auth_header("Authorization");
        let one = Client::new(&first.config()).unwrap().dynamic_analyzer();
        let two = Client::new(&config).unwrap().dynamic_analyzer();

        let _ = one.stop_analysis(&Hash::new("H1")).await.unwrap();
        let _ = two.stop_analysis(&Hash::new("H2")).await.unwrap();

        assert_eq!(first.requests().len(), 1);
        assert!(first.last().header("authorization").is_none());
        assert_eq!(second.last().header("authorization"), Some(API_KEY));
        assert_eq!(second.last().json()["hash"], "H2");
    }
}
