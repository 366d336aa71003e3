//! Shared test utilities

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use emote::speech::{GenerateRequest, GenerateResponse, SpeechService};
use secrecy::SecretString;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Encode `i16` samples as the service would: little-endian, base64
#[must_use]
pub fn encode_pcm(samples: &[i16]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    general_purpose::STANDARD.encode(bytes)
}

/// Mock speech service returning a canned response and recording requests
pub struct MockService {
    response: Box<dyn Fn() -> emote::Result<GenerateResponse> + Send + Sync>,
    requests: Mutex<Vec<GenerateRequest>>,
    calls: AtomicUsize,
}

impl MockService {
    pub fn new(
        response: impl Fn() -> emote::Result<GenerateResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            response: Box::new(response),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Service that always returns `payload` as inline audio
    pub fn with_audio(payload: String) -> Self {
        Self::new(move || Ok(GenerateResponse::with_audio(payload.clone())))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechService for MockService {
    async fn generate(
        &self,
        _api_key: &SecretString,
        request: &GenerateRequest,
    ) -> emote::Result<GenerateResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        (self.response)()
    }
}

/// Accept one HTTP request on a local port and answer with `status` and `body`
///
/// Returns the base URL and a handle resolving to the raw request text.
pub async fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
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

            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let len = headers
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + len {
                    break;
                }
            }
        }

        let response = format!(
            "HTTP/1.1 {status} Test\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        String::from_utf8_lossy(&buf).to_string()
    });

    (format!("http://{addr}"), handle)
}
