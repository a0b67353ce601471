use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

use keyschema::engine::Engine;
use keyschema::interface::RequestInterface;
use keyschema::server::router;
use keyschema::store::MemoryStore;

async fn setup() -> SocketAddr {
    let interface = Arc::new(RequestInterface::new(Engine::with_defaults(MemoryStore::new())));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router(interface)).await.expect("serve");
    });
    addr
}

/// Sends one request and returns the whole response, status line first.
async fn send(addr: SocketAddr, method: &str, path: &str, body: Option<&str>) -> String {
    let request = match body {
        Some(body) => format!(
            "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        ),
        None => format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"),
    };
    tokio::task::spawn_blocking(move || {
        let mut stream = TcpStream::connect(addr).expect("connect");
        stream.write_all(request.as_bytes()).expect("write");
        let mut response = String::new();
        stream.read_to_string(&mut response).expect("read");
        response
    })
    .await
    .expect("join")
}

#[tokio::test]
async fn schema_command_reaches_the_command_handler() {
    let addr = setup().await;
    let response = send(addr, "POST", "/v1/schema", Some("{}")).await;
    assert!(response.starts_with("HTTP/1.1 400"), "{response}");
    assert!(response.contains("unknown"), "{response}");
}

#[tokio::test]
async fn schema_listing_follows_a_load() {
    let addr = setup().await;
    let load = send(addr, "POST", "/v1/SchemaLoad", Some(r#"{"document": {"env": ["prod", "dev"]}}"#)).await;
    assert!(load.starts_with("HTTP/1.1 200"), "{load}");
    let listing = send(addr, "GET", "/v1/_schema", None).await;
    assert!(listing.starts_with("HTTP/1.1 200"), "{listing}");
    assert!(listing.contains(r#""name":"env""#), "{listing}");
    assert!(listing.contains(r#"["prod","dev"]"#), "{listing}");
}
