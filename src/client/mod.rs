//! History API client
//!
//! Fetches the remote history page over HTTP and hands it to the ingester.
//! Retries and pacing belong to the caller (`FeedLoop`).

use crate::error::{Result, SicboError};
use crate::ingester::{parse_history, HistoryPage};
use crate::types::OutcomeRecord;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the round history endpoint
#[derive(Clone)]
pub struct HistoryClient {
    http: Client,
    url: String,
}

impl HistoryClient {
    pub fn new(url: &str) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the latest page as ordered, well-formed records
    pub async fn fetch(&self) -> Result<Vec<OutcomeRecord>> {
        let resp = self.http.get(&self.url).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(SicboError::Api { status, body });
        }

        let page: HistoryPage = resp.json().await?;
        let records = parse_history(&page);
        debug!("[Client] Fetched {} records from {}", records.len(), self.url);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{}/history", addr)
    }

    #[tokio::test]
    async fn test_fetch_parses_page() {
        let url = serve_once(
            "200 OK",
            r##"{"data":{"resultList":[{"gameNum":"#2","score":15,"facesList":[4,5,6]},{"gameNum":"#1","score":7,"keyR":"1-2-4"}]}}"##,
        )
        .await;

        let client = HistoryClient::new(&url).unwrap();
        let records = client.fetch().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sequence_id, 1);
        assert_eq!(records[1].total, 15);
    }

    #[tokio::test]
    async fn test_fetch_reports_status() {
        let url = serve_once("503 Service Unavailable", "down").await;

        let client = HistoryClient::new(&url).unwrap();
        let err = client.fetch().await.unwrap_err();
        assert!(matches!(err, SicboError::Api { status: 503, .. }));
    }
}
