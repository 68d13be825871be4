// Test doubles for the pipeline's two I/O seams.
//
// - ScriptedSource (PageSource): queued attempt results, counts calls
// - RecordingSender (MessageSender): records deliveries, can reject HTML or
//   fail every send
//
// Plus `board_html` for building listing pages in the board's markup, and
// `canned_http_server` for exercising the real HTTP sources on loopback.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::Instant;

use crate::error::{AttemptFailure, NotifyError};
use crate::fetcher::PageSource;
use crate::notifier::{MessageFormat, MessageSender};
use crate::types::BoardTarget;

// ---------------------------------------------------------------------------
// ScriptedSource
// ---------------------------------------------------------------------------

/// Returns queued results in order, then `fallback` forever.
pub struct ScriptedSource {
    queue: Mutex<VecDeque<Result<String, AttemptFailure>>>,
    fallback: Result<String, AttemptFailure>,
    calls: AtomicU32,
}

impl ScriptedSource {
    pub fn new(responses: Vec<Result<String, AttemptFailure>>) -> Self {
        Self {
            queue: Mutex::new(responses.into()),
            fallback: Err(AttemptFailure::Other("script exhausted".to_string())),
            calls: AtomicU32::new(0),
        }
    }

    /// Serves the same page on every attempt.
    pub fn serving(html: impl Into<String>) -> Self {
        Self {
            fallback: Ok(html.into()),
            ..Self::new(Vec::new())
        }
    }

    pub fn always_failing(failure: AttemptFailure) -> Self {
        Self {
            fallback: Err(failure),
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch_once(&self, _target: &BoardTarget) -> Result<String, AttemptFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.queue.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// RecordingSender
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, MessageFormat)>>,
    sent_at: Mutex<Vec<Instant>>,
    attempts: AtomicUsize,
    reject_html: bool,
    fail_transport: bool,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every HTML send fails as a formatting error; plain sends succeed.
    pub fn rejecting_html(mut self) -> Self {
        self.reject_html = true;
        self
    }

    /// Every send fails as a transport error.
    pub fn failing_transport(mut self) -> Self {
        self.fail_transport = true;
        self
    }

    /// Successfully delivered messages, in order.
    pub fn sent(&self) -> Vec<(String, MessageFormat)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|(text, _)| text).collect()
    }

    /// Clock reading at each successful delivery, in order.
    pub fn sent_at(&self) -> Vec<Instant> {
        self.sent_at.lock().unwrap().clone()
    }

    /// All send calls, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, text: &str, format: MessageFormat) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_transport {
            return Err(NotifyError::Transport("connection refused".to_string()));
        }
        if self.reject_html && format == MessageFormat::Html {
            return Err(NotifyError::Formatting(
                "Bad Request: can't parse entities".to_string(),
            ));
        }
        self.sent.lock().unwrap().push((text.to_string(), format));
        self.sent_at.lock().unwrap().push(Instant::now());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A well-formed board row.
pub fn board_row(title: &str, href: &str, date: &str) -> String {
    format!(
        "<tr><td>1</td><td>공지</td>\
         <td class=\"subject\"><a href=\"{href}\"><span>{title}</span></a></td>\
         <td>관리자</td><td>{date}</td><td>7</td></tr>"
    )
}

/// A row whose title cell has no anchor.
pub fn board_row_without_anchor(title: &str, date: &str) -> String {
    format!(
        "<tr><td>1</td><td>공지</td><td class=\"subject\">{title}</td>\
         <td>관리자</td><td>{date}</td><td>7</td></tr>"
    )
}

/// Full listing page wrapping raw `<tr>` markup.
pub fn board_page(rows: &[String]) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>공지사항</title></head><body>\
         <table class=\"bbsList bbs01\"><caption>공지사항 목록</caption>\
         <thead><tr><th>번호</th><th>구분</th><th>제목</th><th>작성자</th><th>등록일</th><th>조회</th></tr></thead>\
         <tbody>{}</tbody></table></body></html>",
        rows.concat()
    )
}

/// Listing page of well-formed rows; hrefs are `view.9is?id=<n>`.
pub fn board_html(titles: &[&str]) -> String {
    let rows: Vec<String> = titles
        .iter()
        .enumerate()
        .map(|(i, title)| board_row(title, &format!("view.9is?id={i}"), "2025-03-02"))
        .collect();
    board_page(&rows)
}

// ---------------------------------------------------------------------------
// Loopback HTTP
// ---------------------------------------------------------------------------

/// Serve the same raw HTTP response to every connection on 127.0.0.1.
/// `status_line` is e.g. "503 Service Unavailable".
pub async fn canned_http_server(status_line: &str, body: &str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: text/html; charset=utf-8\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let response = response.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// A loopback address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Board target served from `addr`, with the pre-flight root at `site_root`.
pub fn loopback_target(addr: SocketAddr, site_root: SocketAddr) -> BoardTarget {
    BoardTarget {
        url: format!("http://{addr}/reserv/planweb/board/list.9is"),
        params: vec![("categoryUid2".to_string(), "C1".to_string())],
        link_base: format!("http://{addr}/reserv/planweb/board/"),
        site_root: format!("http://{site_root}/"),
        label: "테스트 수영장".to_string(),
    }
}
