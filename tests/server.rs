use std::net::SocketAddr;
use std::time::Duration;

use http::StatusCode;
use routekit::{BoxError, Request, Router, Server, Writer, middleware, respond};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;

async fn explode(_: Writer, _: Request) -> Result<(), BoxError> {
    panic!("test panic")
}

async fn echo(w: Writer, req: Request) -> Result<(), BoxError> {
    respond(&*w, StatusCode::OK, req.body())?;
    Ok(())
}

async fn start(app: Router) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        Server::serve_on(listener, app).await.unwrap();
    });
    (addr, server)
}

fn app() -> Router {
    Router::new()
        .middleware(middleware::recover)
        .get("/boom", explode)
        .post("/echo", echo)
}

/// Writes `raw` and reads until the server closes the connection.
async fn exchange(addr: SocketAddr, raw: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw).await.unwrap();

    let mut reply = Vec::new();
    timeout(Duration::from_secs(5), stream.read_to_end(&mut reply))
        .await
        .expect("server kept the connection open")
        .unwrap();
    String::from_utf8_lossy(&reply).into_owned()
}

#[tokio::test]
async fn recovered_panic_closes_the_connection() {
    let (addr, server) = start(app()).await;

    let reply = exchange(addr, b"GET /boom HTTP/1.1\r\nhost: localhost\r\n\r\n").await;

    assert!(reply.starts_with("HTTP/1.1 500"), "{reply}");
    assert!(reply.to_ascii_lowercase().contains("connection: close"), "{reply}");
    assert!(reply.ends_with(r#"{"error":"internal server error"}"#), "{reply}");
    server.abort();
}

#[tokio::test]
async fn unreadable_body_is_400() {
    let (addr, server) = start(app()).await;

    let reply = exchange(
        addr,
        b"POST /echo HTTP/1.1\r\nhost: localhost\r\ntransfer-encoding: chunked\r\n\r\nzz\r\n",
    )
    .await;

    assert!(reply.starts_with("HTTP/1.1 400"), "{reply}");
    server.abort();
}

#[tokio::test]
async fn healthy_connection_stays_open() {
    let (addr, server) = start(app()).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    for payload in ["one", "two"] {
        let raw = format!(
            "POST /echo HTTP/1.1\r\nhost: localhost\r\ncontent-length: {}\r\n\r\n{payload}",
            payload.len(),
        );
        stream.write_all(raw.as_bytes()).await.unwrap();

        let mut buf = [0_u8; 1024];
        let n = timeout(Duration::from_secs(5), stream.read(&mut buf)).await.unwrap().unwrap();
        let reply = String::from_utf8_lossy(&buf[..n]);

        assert!(reply.starts_with("HTTP/1.1 200"), "{reply}");
        assert!(reply.ends_with(payload), "{reply}");
    }
    server.abort();
}
