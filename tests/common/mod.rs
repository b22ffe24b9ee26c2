//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use resilience_gateway::config::{GatewayConfig, ProviderConfigPatch, ProviderKind};

/// One request as seen by the mock provider.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

/// Programmable JSON backend standing in for an external provider.
pub struct MockProvider {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockProvider {
    /// Start a backend on an ephemeral port. `respond` maps each request
    /// (and its zero-based index) to a status code and JSON body.
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(&RecordedRequest, usize) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let respond = Arc::new(respond);

        let recorded = requests.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let recorded = recorded.clone();
                let respond = respond.clone();
                tokio::spawn(async move {
                    let _ = handle(socket, recorded, respond).await;
                });
            }
        });

        Self { addr, requests }
    }

    /// Backend that always answers 200 with `body`.
    pub async fn fixed(body: String) -> Self {
        Self::start(move |_, _| (200, body.clone())).await
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

async fn handle<F>(
    mut socket: TcpStream,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
    respond: Arc<F>,
) -> std::io::Result<()>
where
    F: Fn(&RecordedRequest, usize) -> (u16, String),
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();

    let mut content_length = 0;
    let mut authorization = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                "authorization" => authorization = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    let request = RecordedRequest {
        method,
        path,
        authorization,
        body,
    };
    let index = {
        let mut all = recorded.lock().unwrap();
        all.push(request.clone());
        all.len() - 1
    };

    let (status, body) = respond(&request, index);
    let reason = match status {
        200 => "OK",
        401 => "Unauthorized",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

/// Config with `kind` enabled against `base_url` using credential `test-key`.
pub fn live_config(kind: ProviderKind, base_url: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    let patch = ProviderConfigPatch {
        enabled: Some(true),
        credential: Some("test-key".into()),
        base_url: Some(base_url.to_string()),
        timeout_ms: Some(2_000),
        retry_attempts: Some(1),
        ..Default::default()
    };
    let provider = config.providers.get_mut(kind);
    *provider = provider.merged(&patch);
    config
}

pub fn search_console_body() -> String {
    serde_json::json!({
        "totalImpressions": 1000,
        "totalClicks": 50,
        "averageCTR": 0.05,
        "averagePosition": 4.2,
        "topQueries": [
            { "query": "bi consulting", "impressions": 400, "clicks": 20, "ctr": 0.05, "position": 3.1 }
        ],
        "performanceChanges": []
    })
    .to_string()
}

pub fn lead_scores_body() -> String {
    serde_json::json!([{
        "leadId": "lead-1",
        "score": 91,
        "factors": [{ "factor": "company_size", "weight": 0.4, "value": 0.9, "impact": "positive" }],
        "predictedValue": 42000,
        "conversionProbability": 0.61,
        "recommendedActions": ["Book a discovery call"]
    }])
    .to_string()
}
