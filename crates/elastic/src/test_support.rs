//! Loopback HTTP capture for asserting on the requests the client sends.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::client::ElasticClient;
use crate::config::ElasticConfiguration;

/// One request as received on the wire.
#[derive(Debug, Clone)]
pub(crate) struct CapturedRequest {
    pub head: String,
    pub body: String,
}

impl CapturedRequest {
    /// The request line, e.g. `POST /logs/_bulk HTTP/1.1`.
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }
}

/// A server answering `count` requests with a fixed JSON body.
pub(crate) struct CaptureServer {
    pub url: String,
    task: JoinHandle<Vec<CapturedRequest>>,
}

impl CaptureServer {
    pub async fn start(count: usize, response_body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let task = tokio::spawn(async move {
            let mut requests = Vec::with_capacity(count);
            while requests.len() < count {
                let (mut stream, _) = listener.accept().await.unwrap();
                requests.push(serve_one(&mut stream, response_body).await);
            }
            requests
        });

        Self { url, task }
    }

    /// A client for this server.
    pub fn client(&self, api_versioning: bool) -> ElasticClient {
        let config = ElasticConfiguration::new(self.url.clone())
            .with_request_timeout(Duration::from_secs(5))
            .with_api_versioning(api_versioning);
        ElasticClient::new(&config).unwrap()
    }

    /// Waits for all expected requests.
    pub async fn requests(self) -> Vec<CapturedRequest> {
        tokio::time::timeout(Duration::from_secs(10), self.task)
            .await
            .expect("timed out waiting for requests")
            .unwrap()
    }
}

async fn serve_one(stream: &mut TcpStream, response_body: &str) -> CapturedRequest {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let read = stream.read(&mut chunk).await.unwrap();
        assert!(read > 0, "connection closed before request head");
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..head_end]).into_owned();
    let mut request = CapturedRequest {
        head,
        body: String::new(),
    };
    let length: usize = request
        .header("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    while buffer.len() < head_end + length {
        let read = stream.read(&mut chunk).await.unwrap();
        assert!(read > 0, "connection closed before request body");
        buffer.extend_from_slice(&chunk[..read]);
    }
    request.body = String::from_utf8_lossy(&buffer[head_end..head_end + length]).into_owned();

    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        response_body.len(),
        response_body
    );
    stream.write_all(response.as_bytes()).await.unwrap();
    stream.shutdown().await.ok();
    request
}
