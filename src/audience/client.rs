//! HTTP client for the segmentation backend

use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, PRAGMA};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::ClientConfig;
use crate::error::{Result, SegmentError};
use crate::rule::ExpressionNode;

use super::types::{
    ApiEnvelope, AudienceData, AudiencePreview, CountRequest, SaveReceipt, SavedSegment,
    SavedSegmentData, SegmentList, SegmentSavePayload,
};

/// Audience count, segment save and segment listing calls
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct AudienceClient {
    client: Client,
    config: ClientConfig,
}

impl AudienceClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        let version = HeaderValue::from_str(&config.client_version).map_err(|_| {
            SegmentError::Config(format!("Invalid client version: {}", config.client_version))
        })?;
        headers.insert("X-Client-Version", version);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Count and sample the customers matching `rules`
    pub async fn count(&self, rules: &ExpressionNode) -> Result<AudiencePreview> {
        let url = self.config.endpoint(&self.config.count_path);
        let envelope: ApiEnvelope<AudienceData> = self.post(&url, &CountRequest::new(rules)).await?;

        let data = envelope.data.ok_or_else(|| {
            log::warn!("Count response from {} carried no data", url);
            SegmentError::InvalidResponse("Invalid server response".to_string())
        })?;
        let preview = AudiencePreview::from(data);
        log::debug!("Found {} matching customers", preview.total_count);
        Ok(preview)
    }

    /// Persist a segment; succeeds only on `status == "success"`
    pub async fn save(&self, payload: &SegmentSavePayload) -> Result<SaveReceipt> {
        let url = self.config.endpoint(&self.config.save_path);
        let envelope: ApiEnvelope<SavedSegmentData> = self.post(&url, payload).await?;

        if envelope.status.as_deref() != Some("success") {
            let message = envelope
                .message
                .unwrap_or_else(|| "Failed to save segment".to_string());
            log::warn!("Saving segment '{}' failed: {}", payload.name, message);
            return Err(SegmentError::Api { status: 200, message });
        }

        Ok(SaveReceipt {
            id: envelope.data.and_then(|data| data.id),
            message: envelope.message,
        })
    }

    /// Segments saved by `created_by`
    ///
    /// A response without `status == "success"` or without a segment list
    /// reads as no segments.
    pub async fn list_segments(&self, created_by: &str) -> Result<Vec<SavedSegment>> {
        let owner = created_by.trim();
        if owner.is_empty() {
            return Err(SegmentError::InvalidEdit("Segment owner is required".to_string()));
        }

        let base = self.config.endpoint(&self.config.segments_path);
        let mut url = Url::parse(&base)
            .map_err(|e| SegmentError::Config(format!("Invalid segments URL '{}': {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| SegmentError::Config(format!("Invalid segments URL '{}'", base)))?
            .pop_if_empty()
            .push(owner);

        log::debug!("GET {}", url);
        let envelope: ApiEnvelope<SegmentList> = self.send(url.as_str(), self.client.get(url.clone())).await?;

        match envelope.data {
            Some(list) if envelope.status.as_deref() == Some("success") => {
                log::debug!("Loaded {} segments for {}", list.segments.len(), owner);
                Ok(list.segments)
            }
            _ => {
                log::warn!("No segments data in response from {}", url);
                Ok(Vec::new())
            }
        }
    }

    async fn post<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        log::debug!(
            "POST {} body: {}",
            url,
            serde_json::to_string(body).unwrap_or_default()
        );
        self.send(url, self.client.post(url).json(body)).await
    }

    /// Stamp, send and decode one request
    async fn send<T: DeserializeOwned>(&self, url: &str, request: RequestBuilder) -> Result<T> {
        let resp = request
            .query(&[("_t", timestamp_millis())])
            .send()
            .await
            .map_err(|e| {
                log::warn!("Request to {} failed: {}", url, e);
                SegmentError::from(e)
            })?;

        let resp = check_status(url, resp).await?;
        let text = resp.text().await?;
        log::debug!("Response from {}: {}", url, text);

        serde_json::from_str(&text).map_err(|e| {
            log::warn!("Unreadable response from {}: {}", url, e);
            SegmentError::InvalidResponse(e.to_string())
        })
    }
}

async fn check_status(url: &str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&text)
        .ok()
        .and_then(|envelope| envelope.message)
        .unwrap_or_else(|| {
            if text.is_empty() {
                status.canonical_reason().unwrap_or("Request failed").to_string()
            } else {
                text
            }
        });
    log::warn!("{} returned {}: {}", url, status.as_u16(), message);
    Err(SegmentError::Api {
        status: status.as_u16(),
        message,
    })
}

fn timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Comparator, LeafCondition, RuleDraft};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accept one connection, answer with `status` and `body`, return the raw request
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&buf).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    fn client_for(api_url: String) -> AudienceClient {
        AudienceClient::new(ClientConfig {
            api_url,
            timeout_secs: 5,
            client_version: "2.1.0".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    fn tree() -> ExpressionNode {
        let mut draft = RuleDraft::new();
        draft.push(LeafCondition::new("total_spend", Comparator::Gt, "10000"));
        draft.push(LeafCondition::new("visits", Comparator::Lt, "3"));
        draft.assemble().unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ClientConfig {
            api_url: "ftp://example.com".to_string(),
            ..Default::default()
        };
        assert!(matches!(AudienceClient::new(config), Err(SegmentError::Config(_))));
    }

    #[tokio::test]
    async fn test_count_sends_rules_and_headers() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"status":"success","data":{"totalCount":1,"audience":[{"_id":"c1"}],"details":{"averageSpend":12000,"averageOrders":4}}}"#,
        )
        .await;

        let preview = client_for(url).count(&tree()).await.unwrap();
        assert_eq!(preview.total_count, 1);
        assert_eq!(preview.customer_ids(), vec!["c1"]);
        assert_eq!(preview.details.average_spend, 12000.0);
        assert_eq!(preview.details.total_spend, 0.0);

        let request = server.await.unwrap();
        let lower = request.to_ascii_lowercase();
        assert!(request.starts_with("POST /api/segmentation/count?_t="));
        assert!(lower.contains("cache-control: no-cache"));
        assert!(lower.contains("pragma: no-cache"));
        assert!(lower.contains("x-client-version: 2.1.0"));
        assert!(request.contains(r#""options":{}"#));
        assert!(request.contains(r#""field":"total_spend""#));
    }

    #[tokio::test]
    async fn test_count_without_data_is_invalid() {
        let (url, server) = serve_once("200 OK", r#"{"status":"success"}"#).await;
        let err = client_for(url).count(&tree()).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid response: Invalid server response");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_count_error_status_uses_server_message() {
        let (url, server) =
            serve_once("500 Internal Server Error", r#"{"status":"error","message":"db down"}"#).await;
        let err = client_for(url).count(&tree()).await.unwrap_err();
        assert!(matches!(
            err,
            SegmentError::Api { status: 500, ref message } if message == "db down"
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_save_returns_segment_id() {
        let (url, server) = serve_once(
            "201 Created",
            r#"{"status":"success","data":{"_id":"seg-42"},"message":"Segment saved"}"#,
        )
        .await;

        let payload = SegmentSavePayload {
            name: "High value".to_string(),
            rules: tree(),
            condition_string: "Total Spend > 10000 INR AND Number of Visits < 3".to_string(),
            customer_ids: vec!["c1".to_string()],
            audience_size: 1,
            created_by: "ops@example.com".to_string(),
        };
        let saved = client_for(url).save(&payload).await.unwrap();
        assert_eq!(saved.id.as_deref(), Some("seg-42"));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/segments/save?_t="));
        assert!(request.contains(r#""conditionString":"Total Spend > 10000 INR AND Number of Visits < 3""#));
        assert!(request.contains(r#""customerIds":["c1"]"#));
    }

    #[tokio::test]
    async fn test_save_failure_status_field() {
        let (url, server) = serve_once("200 OK", r#"{"status":"error"}"#).await;
        let payload = SegmentSavePayload {
            name: "x".to_string(),
            rules: tree(),
            condition_string: String::new(),
            customer_ids: vec![],
            audience_size: 0,
            created_by: String::new(),
        };
        let err = client_for(url).save(&payload).await.unwrap_err();
        assert!(matches!(
            err,
            SegmentError::Api { ref message, .. } if message == "Failed to save segment"
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_list_segments_reads_owner_segments() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"status":"success","data":{"segments":[
                {"_id":"seg-1","name":"High value","rules":{"type":"simple","field":"total_spend","comparator":"gt","value":10000},"conditionString":"Total Spend > 10000 INR","customerIds":["c1","c2"],"createdAt":"2024-03-01T10:00:00.000Z"},
                {"_id":"seg-2","name":"Lapsed","rules":{"type":"and","conditions":[{"type":"simple","field":"last_order_date","comparator":"gte","value":90},{"type":"simple","field":"visits","comparator":"lt","value":2}]}}
            ]}}"#,
        )
        .await;

        let segments = client_for(url).list_segments("ops@example.com").await.unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].display_summary(), "Total Spend > 10000 INR");
        assert_eq!(segments[0].size(), 2);
        assert_eq!(
            segments[1].display_summary(),
            "Days Since Last Active ≥ 90 days AND Number of Visits < 2"
        );

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/segments/ops@example.com?_t="));
        assert!(request.to_ascii_lowercase().contains("x-client-version: 2.1.0"));
    }

    #[tokio::test]
    async fn test_list_segments_without_data_is_empty() {
        let (url, server) = serve_once("200 OK", r#"{"status":"error","message":"nothing"}"#).await;
        let segments = client_for(url).list_segments("ops@example.com").await.unwrap();
        assert!(segments.is_empty());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_list_segments_requires_owner() {
        let client = client_for("http://127.0.0.1:9".to_string());
        assert!(matches!(
            client.list_segments("  ").await,
            Err(SegmentError::InvalidEdit(_))
        ));
    }

    #[tokio::test]
    async fn test_list_segments_error_status() {
        let (url, server) = serve_once("404 Not Found", "").await;
        let err = client_for(url).list_segments("ops@example.com").await.unwrap_err();
        assert!(matches!(
            err,
            SegmentError::Api { status: 404, ref message } if message == "Not Found"
        ));
        server.await.unwrap();
    }
}
