// src/backends/http.rs
use super::{HeartbeatFailure, StorageBackend};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

/// Storage whose self-test is an HTTP endpoint answering 2xx when healthy.
pub struct HttpStorage {
    url: Url,
    client: Client,
    timeout: Duration,
}

impl HttpStorage {
    pub fn new(url: Url, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            url,
            client,
            timeout: request_timeout,
        })
    }
}

#[async_trait]
impl StorageBackend for HttpStorage {
    async fn heartbeat(&self) -> Result<(), HeartbeatFailure> {
        let result = timeout(self.timeout, self.client.get(self.url.as_str()).send()).await;

        match result {
            Ok(Ok(response)) => {
                let status = response.status();
                if status.is_success() {
                    Ok(())
                } else {
                    let body = response.text().await.unwrap_or_default();
                    let detail = body.trim();
                    if detail.is_empty() {
                        Err(HeartbeatFailure(format!("HTTP {}", status)))
                    } else {
                        Err(HeartbeatFailure(format!("HTTP {}: {}", status, detail)))
                    }
                }
            }
            Ok(Err(e)) => Err(HeartbeatFailure(e.to_string())),
            Err(_) => Err(HeartbeatFailure("Request timeout".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn test_heartbeat_ok_on_success_status() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/heartbeat")
            .with_status(200)
            .with_body("OK")
            .expect(1)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/heartbeat", server.url())).unwrap();
        let storage = HttpStorage::new(url, Duration::from_secs(2)).unwrap();

        assert!(storage.heartbeat().await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_heartbeat_reports_status_and_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/heartbeat")
            .with_status(503)
            .with_body("split modulestore: connection lost")
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/heartbeat", server.url())).unwrap();
        let storage = HttpStorage::new(url, Duration::from_secs(2)).unwrap();

        let err = storage.heartbeat().await.unwrap_err();
        assert!(err.0.contains("503"));
        assert!(err.0.contains("connection lost"));
    }

    #[tokio::test]
    async fn test_heartbeat_connection_refused() {
        // Nothing listens on port 9 locally.
        let url = Url::parse("http://127.0.0.1:9/heartbeat").unwrap();
        let storage = HttpStorage::new(url, Duration::from_secs(2)).unwrap();

        assert!(storage.heartbeat().await.is_err());
    }
}
