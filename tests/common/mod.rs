//! Shared fakes for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use citerag::generation::{Completion, Generator};
use citerag::rag::Retriever;
use citerag::{ChatMessage, GenerationError, RetrievalError, ScoredPassage};

/// Passages with the given scores, `doc{i}` ids and chunk index `i`
pub fn scored_passages(scores: &[f64]) -> Vec<ScoredPassage> {
    scores
        .iter()
        .enumerate()
        .map(|(i, &score)| {
            ScoredPassage::new(format!("Passage number {} text.", i), format!("doc{}", i), i, score)
        })
        .collect()
}

/// Retriever returning a fixed list
pub struct FixedRetriever {
    pub passages: Vec<ScoredPassage>,
    pub calls: AtomicUsize,
}

impl FixedRetriever {
    pub fn new(passages: Vec<ScoredPassage>) -> Self {
        Self {
            passages,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Retriever for FixedRetriever {
    async fn search(&self, _query: &str, top_k: usize) -> Result<Vec<ScoredPassage>, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.passages.iter().take(top_k).cloned().collect())
    }
}

/// Retriever that always fails
pub struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    async fn search(&self, _query: &str, _top_k: usize) -> Result<Vec<ScoredPassage>, RetrievalError> {
        Err(RetrievalError::Unavailable("connection refused".to_string()))
    }
}

/// Generator that records prompts and fails when the last message contains `fail_marker`
pub struct RecordingGenerator {
    pub prompts: Mutex<Vec<Vec<ChatMessage>>>,
    fail_when: Box<dyn Fn(&[ChatMessage]) -> bool + Send + Sync>,
}

impl RecordingGenerator {
    pub fn succeeding() -> Self {
        Self::failing_when(|_| false)
    }

    pub fn failing_when(predicate: impl Fn(&[ChatMessage]) -> bool + Send + Sync + 'static) -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            fail_when: Box::new(predicate),
        }
    }

    pub fn prompts(&self) -> Vec<Vec<ChatMessage>> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<Completion, GenerationError> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        if (self.fail_when)(messages) {
            return Err(GenerationError::Upstream {
                status: 503,
                message: "model overloaded".to_string(),
            });
        }

        let last = messages.last().map(|m| m.content.len()).unwrap_or(0);
        Ok(Completion {
            content: format!("answer from {} prompt chars", last),
            token_usage: None,
            model: "fake-model".to_string(),
            latency_ms: 1,
        })
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}

/// Serve exactly one HTTP request with a canned response; returns the base URL
/// and a handle resolving to the raw request text.
pub async fn serve_once(status_line: &str, body: &str) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
    );

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });

    (format!("http://{}", addr), handle)
}

/// Read headers plus a content-length body
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .filter_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.trim().eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .next()
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}
