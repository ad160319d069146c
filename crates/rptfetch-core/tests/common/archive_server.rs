//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves fixed bodies per path, can answer the first N requests for a path
//! with 500 or cut a body short, and counts requests per path. One request per connection
//! (`Connection: close`).

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Default)]
struct Route {
    status: u16,
    body: Vec<u8>,
    content_type: &'static str,
    /// Remaining requests to answer with 500 before serving the route.
    failures_left: usize,
    /// Content-Length to announce instead of the body length.
    declared_len: Option<usize>,
}

#[derive(Default)]
struct State {
    routes: HashMap<String, Route>,
    hits: HashMap<String, usize>,
}

#[derive(Clone)]
pub struct ArchiveServer {
    base: String,
    state: Arc<Mutex<State>>,
}

impl ArchiveServer {
    /// Starts the server on an ephemeral port. It runs until the process exits.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(State::default()));
        let accept_state = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = Arc::clone(&accept_state);
                thread::spawn(move || handle(stream, &state));
            }
        });
        Self {
            base: format!("http://127.0.0.1:{}", port),
            state,
        }
    }

    /// Absolute URL for `path` (which starts with `/`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn serve(&self, path: &str, body: Vec<u8>) {
        self.insert(path, 200, body, "application/zip");
    }

    pub fn serve_html(&self, path: &str, html: &str) {
        self.insert(path, 200, html.as_bytes().to_vec(), "text/html; charset=utf-8");
    }

    pub fn serve_status(&self, path: &str, status: u16) {
        self.insert(path, status, b"error".to_vec(), "text/plain");
    }

    /// Announce `declared_len` bytes but send only `body`, then close.
    pub fn serve_truncated(&self, path: &str, declared_len: usize, body: Vec<u8>) {
        self.insert(path, 200, body, "application/zip");
        let mut st = self.state.lock().unwrap();
        st.routes.entry(path.to_string()).or_default().declared_len = Some(declared_len);
    }

    /// Answer the next `n` requests for `path` with 500.
    pub fn fail_first(&self, path: &str, n: usize) {
        let mut st = self.state.lock().unwrap();
        st.routes.entry(path.to_string()).or_default().failures_left = n;
    }

    pub fn requests(&self, path: &str) -> usize {
        let st = self.state.lock().unwrap();
        st.hits.get(path).copied().unwrap_or(0)
    }

    fn insert(&self, path: &str, status: u16, body: Vec<u8>, content_type: &'static str) {
        let mut st = self.state.lock().unwrap();
        let route = st.routes.entry(path.to_string()).or_default();
        route.status = status;
        route.body = body;
        route.content_type = content_type;
    }
}

fn handle(mut stream: TcpStream, state: &Mutex<State>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let request = String::from_utf8_lossy(&buf);
    let path = request
        .lines()
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();

    let (status, content_type, body, declared_len) = {
        let mut st = state.lock().unwrap();
        *st.hits.entry(path.clone()).or_insert(0) += 1;
        match st.routes.get_mut(&path) {
            Some(route) if route.failures_left > 0 => {
                route.failures_left -= 1;
                (500, "text/plain", b"temporary failure".to_vec(), None)
            }
            Some(route) if route.status != 0 => (
                route.status,
                route.content_type,
                route.body.clone(),
                route.declared_len,
            ),
            _ => (404, "text/plain", b"not found".to_vec(), None),
        }
    };

    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason(status),
        content_type,
        declared_len.unwrap_or(body.len())
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(&body);
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Listing page with one download button per URL, in the given order.
pub fn listing_page(urls: &[String]) -> String {
    let rows: String = urls
        .iter()
        .map(|u| {
            format!(
                "<tr><td><input type=\"button\" value=\"下載\" onclick=\"window.open('{}','_blank')\"></td></tr>\n",
                u
            )
        })
        .collect();
    format!("<html><body><table>\n{}</table></body></html>", rows)
}
