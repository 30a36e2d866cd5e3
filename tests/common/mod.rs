#![allow(dead_code)]

use fmxml::{ConnectionConfig, Connector, HttpTransport, Layout, LayoutInfo, LayoutSource, RequestIntent, Result};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::JoinHandle;

pub const XML: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?><fmresultset/>";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builds a raw HTTP/1.1 response with the given status, extra headers and body.
pub fn response(status: &str, headers: &[&str], body: &[u8]) -> Vec<u8> {
    let mut raw = format!("HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n", status, body.len());
    for header in headers {
        raw.push_str(header);
        raw.push_str("\r\n");
    }
    raw.push_str("\r\n");

    let mut raw = raw.into_bytes();
    raw.extend_from_slice(body);
    raw
}

/// Serves the given responses to consecutive connections on a local port, one each, and records the requests.
#[derive(Debug)]
pub struct Server {
    url: String,
    handle: JoinHandle<Vec<String>>,
}

impl Server {
    pub fn start(responses: Vec<Vec<u8>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = std::thread::spawn(move || {
            let mut requests = vec![];
            for response in responses {
                let (mut stream, _) = listener.accept().unwrap();
                requests.push(read_request(&mut stream));
                stream.write_all(&response).unwrap();
                stream.flush().unwrap();
            }
            requests
        });

        Self { url, handle }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Waits until every response was served and returns the raw requests.
    pub fn requests(self) -> Vec<String> {
        self.handle.join().unwrap()
    }
}

fn read_request(stream: &mut TcpStream) -> String {
    let mut raw = vec![];
    let mut buf = [0u8; 1024];
    let header_end = loop {
        let read = stream.read(&mut buf).unwrap();
        assert!(read > 0, "client closed the connection early");
        raw.extend_from_slice(&buf[..read]);
        if let Some(position) = raw.windows(4).position(|window| window == b"\r\n\r\n") {
            break position + 4;
        }
    };

    let head = String::from_utf8_lossy(&raw[..header_end]).to_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .map(|value| value.trim().parse::<usize>().unwrap())
        .unwrap_or(0);

    while raw.len() < header_end + content_length {
        let read = stream.read(&mut buf).unwrap();
        assert!(read > 0, "client closed the connection early");
        raw.extend_from_slice(&buf[..read]);
    }

    String::from_utf8_lossy(&raw).into_owned()
}

/// Returns a local URL nothing listens on.
pub fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    url
}

pub fn config(url: &str) -> ConnectionConfig {
    ConnectionConfig::new(url).with_transport_option("timeout", "10")
}

/// Minimal facade: sends through a real connector and caches layouts by name.
#[derive(Debug)]
pub struct Facade {
    pub connector: Connector<HttpTransport>,
    pub layouts: HashMap<String, Layout>,
    pub info: LayoutInfo,
}

impl Facade {
    pub fn new(config: ConnectionConfig, info: LayoutInfo) -> Self {
        Self {
            connector: Connector::connect(config),
            layouts: HashMap::new(),
            info,
        }
    }
}

impl LayoutSource for Facade {
    fn execute(&mut self, intent: RequestIntent) -> Result<Vec<u8>> {
        self.connector.execute(intent)
    }

    fn parse_layout_info(&self, payload: &[u8]) -> Result<LayoutInfo> {
        match payload.starts_with(b"<?xml") {
            true => Ok(self.info.clone()),
            false => Err(fmxml::ClientError::MetadataParse("missing XML declaration".to_owned())),
        }
    }

    fn cache_layout(&mut self, layout: Layout) {
        self.layouts.insert(layout.name().to_owned(), layout);
    }
}
