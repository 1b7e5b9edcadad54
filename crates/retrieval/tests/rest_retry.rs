//! `RestDocumentRetriever` against a canned HTTP server on a local port.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pl_domain::config::RetrievalConfig;
use pl_domain::error::Error;
use pl_retrieval::{DocumentRetriever, RestDocumentRetriever};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Serves `responses` in order (the last one repeats), one per
/// connection, and counts requests. Returns the base URL.
async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let (status, body) = responses[n.min(responses.len() - 1)];
            read_request(&mut socket).await;
            let reply = format!(
                "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(reply.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{addr}"), hits)
}

/// Read headers and a `content-length` body.
async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let Ok(n) = socket.read(&mut chunk).await else { return };
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|l| {
                    let (k, v) = l.split_once(':')?;
                    k.eq_ignore_ascii_case("content-length")
                        .then(|| v.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return;
            }
        }
    }
}

fn retriever(base_url: String, max_retries: u32) -> RestDocumentRetriever {
    RestDocumentRetriever::new(&RetrievalConfig {
        base_url,
        max_retries,
        timeout_ms: 2000,
        ..Default::default()
    })
    .unwrap()
    .with_initial_backoff(Duration::from_millis(5))
}

const ONE_DOC: &str =
    r#"{"items":[{"content":"Deadline is March 1.","metadata":{"source":"doc1"}}]}"#;

#[tokio::test]
async fn returns_documents() {
    let (url, hits) = serve(vec![(200, ONE_DOC)]).await;
    let docs = retriever(url, 3).query("w1", "deadline").await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].content, "Deadline is March 1.");
    assert_eq!(docs[0].metadata["source"], "doc1");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retries_server_errors() {
    let (url, hits) = serve(vec![(503, "{}"), (502, "{}"), (200, ONE_DOC)]).await;
    let docs = retriever(url, 3).query("w1", "deadline").await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let (url, hits) = serve(vec![(404, r#"{"error":"no such workspace"}"#)]).await;
    let err = retriever(url, 3).query("w404", "q").await.unwrap_err();
    assert!(matches!(err, Error::Retrieval(ref m) if m.contains("404")));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unauthorized_is_auth_error() {
    let (url, _) = serve(vec![(401, "{}")]).await;
    let err = retriever(url, 3).query("w1", "q").await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
}

#[tokio::test]
async fn gives_up_after_max_retries() {
    let (url, hits) = serve(vec![(500, "{}")]).await;
    let err = retriever(url, 2).query("w1", "q").await.unwrap_err();
    assert!(matches!(err, Error::Retrieval(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}
