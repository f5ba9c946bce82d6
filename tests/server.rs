//! End-to-end behaviour of a running server.

use std::io::Write as _;
use std::time::Duration;

use embed_httpd::handlers::{EchoHandler, StaticFileHandler};
use embed_httpd::lifecycle::default_registry;
use embed_httpd::net::ConnectionPhase;
use embed_httpd::{BindError, HandlerRegistry, Server};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::task::LocalSet;

mod common;

use common::{client, exchange, exchange_in_pieces, start_server, test_config, WireResponse};

fn echo_registry() -> HandlerRegistry {
    HandlerRegistry::new().with(EchoHandler::new("/echo"))
}

#[tokio::test]
async fn echo_round_trip() {
    LocalSet::new()
        .run_until(async {
            let (mut server, addr) = start_server(test_config(), echo_registry()).await;

            let res = client()
                .get(format!("http://{addr}/echo/test"))
                .send()
                .await
                .expect("server unreachable");

            assert_eq!(res.status(), 200);
            assert_eq!(res.headers()["content-type"], "text/plain");
            assert_eq!(res.headers()["content-length"], "10");
            assert_eq!(res.headers()["cache-control"], "no-cache");
            assert_eq!(res.text().await.unwrap(), "/echo/test");

            server.stop().await;
        })
        .await;
}

#[tokio::test]
async fn cors_header_follows_config() {
    LocalSet::new()
        .run_until(async {
            let (mut with_cors, cors_addr) = start_server(test_config(), echo_registry()).await;

            let mut config = test_config();
            config.enable_cors = false;
            let (mut without_cors, plain_addr) = start_server(config, echo_registry()).await;
            assert!(with_cors.router().cors_enabled());
            assert!(!without_cors.router().cors_enabled());

            for path in ["/echo/x", "/missing"] {
                let reply = WireResponse::parse(
                    &exchange(cors_addr, format!("GET {path} HTTP/1.1\r\n\r\n").as_bytes()).await,
                );
                assert_eq!(reply.header("Access-Control-Allow-Origin"), Some("*"), "{path}");

                let reply = WireResponse::parse(
                    &exchange(plain_addr, format!("GET {path} HTTP/1.1\r\n\r\n").as_bytes()).await,
                );
                assert_eq!(reply.header("Access-Control-Allow-Origin"), None, "{path}");
            }

            with_cors.stop().await;
            without_cors.stop().await;
        })
        .await;
}

#[tokio::test]
async fn unmatched_request_is_404_with_empty_body() {
    LocalSet::new()
        .run_until(async {
            let (mut server, addr) = start_server(test_config(), echo_registry()).await;

            let reply = WireResponse::parse(&exchange(addr, b"GET /nothing HTTP/1.1\r\n\r\n").await);
            assert_eq!(reply.status_line, "HTTP/1.1 404 Not Found");
            assert_eq!(reply.header("Content-Length"), Some("0"));
            assert_eq!(reply.header("Connection"), Some("close"));
            assert!(reply.body.is_empty());

            server.stop().await;
        })
        .await;
}

#[tokio::test]
async fn handler_failure_is_isolated() {
    LocalSet::new()
        .run_until(async {
            let registry = echo_registry().with(common::FailingHandler { path: "/fail" });
            let (mut server, addr) = start_server(test_config(), registry).await;
            let client = client();

            let res = client.get(format!("http://{addr}/fail")).send().await.unwrap();
            assert_eq!(res.status(), 500);
            assert_eq!(res.headers()["content-type"], "application/json");
            let body: serde_json::Value = res.json().await.unwrap();
            assert_eq!(body["success"], false);
            assert_eq!(body["message"], "Server error: database unavailable");

            let res = client.get(format!("http://{addr}/echo/after")).send().await.unwrap();
            assert_eq!(res.status(), 200);
            assert_eq!(res.text().await.unwrap(), "/echo/after");

            server.stop().await;
        })
        .await;
}

#[tokio::test]
async fn highest_confidence_wins() {
    LocalSet::new()
        .run_until(async {
            let registry = HandlerRegistry::new()
                .with(common::FixedHandler { name: "low", confidence: 0.3, body: "low" })
                .with(common::FixedHandler { name: "high", confidence: 0.8, body: "high" })
                .with(common::FixedHandler { name: "tied", confidence: 0.8, body: "tied" });
            let (mut server, addr) = start_server(test_config(), registry).await;

            let res = client().get(format!("http://{addr}/anything")).send().await.unwrap();
            assert_eq!(res.text().await.unwrap(), "high");

            server.stop().await;
        })
        .await;
}

#[tokio::test]
async fn fragmented_post_is_reassembled() {
    LocalSet::new()
        .run_until(async {
            let registry = HandlerRegistry::new().with(common::BodyEchoHandler);
            let (mut server, addr) = start_server(test_config(), registry).await;

            let request = b"POST /body HTTP/1.1\r\nHost: test\r\nContent-Length: 11\r\n\r\nhello world";
            let pieces: Vec<&[u8]> = request.chunks(1).collect();
            let bytes = exchange_in_pieces(addr, &pieces, Duration::from_millis(2)).await;

            let reply = WireResponse::parse(&bytes);
            assert_eq!(reply.status_line, "HTTP/1.1 200 OK");
            assert_eq!(reply.header("Content-Length"), Some("11"));
            assert_eq!(reply.body, b"hello world");

            server.stop().await;
        })
        .await;
}

#[tokio::test]
async fn binary_body_length_is_in_bytes() {
    LocalSet::new()
        .run_until(async {
            let registry = HandlerRegistry::new().with(common::BodyEchoHandler);
            let (mut server, addr) = start_server(test_config(), registry).await;

            let body: Vec<u8> = (0..=255u8).chain("héllo".bytes()).collect();
            let res = client()
                .post(format!("http://{addr}/body"))
                .body(body.clone())
                .send()
                .await
                .unwrap();
            assert_eq!(res.headers()["content-length"], body.len().to_string().as_str());
            assert_eq!(res.bytes().await.unwrap().to_vec(), body);

            server.stop().await;
        })
        .await;
}

#[tokio::test]
async fn unsupported_requests_are_dropped_without_response() {
    LocalSet::new()
        .run_until(async {
            let (mut server, addr) = start_server(test_config(), echo_registry()).await;

            for request in [
                &b"GET /echo/x HTTP/1.0\r\n\r\n"[..],
                b"PATCH /echo/x HTTP/1.1\r\n\r\n",
                b"GARBAGE\r\n\r\n",
                b"POST /echo/x HTTP/1.1\r\nContent-Length: lots\r\n\r\n",
            ] {
                let reply = exchange(addr, request).await;
                assert!(reply.is_empty(), "{:?} got a response", String::from_utf8_lossy(request));
            }

            // The server is still healthy afterwards.
            let reply = WireResponse::parse(&exchange(addr, b"GET /echo/ok HTTP/1.1\r\n\r\n").await);
            assert_eq!(reply.body, b"/echo/ok");

            server.stop().await;
        })
        .await;
}

#[tokio::test]
async fn skips_past_a_taken_port() {
    LocalSet::new()
        .run_until(async {
            let (_taken, taken_port) = common::taken_port_with_free_successor();

            let mut config = test_config();
            config.port = taken_port;
            let (mut server, addr) = start_server(config, echo_registry()).await;

            assert_eq!(addr.port(), taken_port + 1);
            assert_eq!(server.local_addr(), Some(addr));

            let res = client().get(format!("http://{addr}/echo/next")).send().await.unwrap();
            assert_eq!(res.status(), 200);

            server.stop().await;
        })
        .await;
}

#[tokio::test]
async fn stop_closes_the_listener() {
    LocalSet::new()
        .run_until(async {
            let (mut server, addr) = start_server(test_config(), echo_registry()).await;
            assert!(server.is_running());

            server.stop().await;
            assert!(!server.is_running());
            assert_eq!(server.local_addr(), None);
            assert!(TcpStream::connect(addr).await.is_err());
        })
        .await;
}

#[tokio::test]
async fn in_flight_connection_survives_stop() {
    LocalSet::new()
        .run_until(async {
            let (mut server, addr) = start_server(test_config(), echo_registry()).await;

            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(b"GET /echo/late HTTP/1.1\r\n").await.unwrap();
            for _ in 0..200 {
                if server.active_connections() == 1 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            assert_eq!(server.active_connections(), 1);
            let open = server.connections().snapshot();
            assert_eq!(open.len(), 1);
            assert_eq!(open[0].1.phase, ConnectionPhase::Reading);
            assert_eq!(open[0].1.peer, stream.local_addr().unwrap());

            server.stop().await;
            assert_eq!(server.active_connections(), 1);

            stream.write_all(b"\r\n").await.unwrap();
            let reply = WireResponse::parse(&common::read_until_closed(&mut stream).await);
            assert_eq!(reply.body, b"/echo/late");

            for _ in 0..200 {
                if server.active_connections() == 0 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            assert_eq!(server.active_connections(), 0);
        })
        .await;
}

#[tokio::test]
async fn restart_serves_again() {
    LocalSet::new()
        .run_until(async {
            let (mut server, _) = start_server(test_config(), echo_registry()).await;
            let addr = server.restart().await.unwrap();

            let res = client().get(format!("http://{addr}/echo/again")).send().await.unwrap();
            assert_eq!(res.text().await.unwrap(), "/echo/again");

            server.stop().await;
        })
        .await;
}

#[tokio::test]
async fn idle_connection_is_closed_after_timeout() {
    LocalSet::new()
        .run_until(async {
            let mut config = test_config();
            config.idle_timeout_secs = Some(1);
            let (mut server, addr) = start_server(config, echo_registry()).await;

            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(b"GET /echo/slow HTTP/1.1\r\n").await.unwrap();
            let reply = common::read_until_closed(&mut stream).await;
            assert!(reply.is_empty());

            server.stop().await;
        })
        .await;
}

#[tokio::test]
async fn serves_static_files_behind_specific_handlers() {
    LocalSet::new()
        .run_until(async {
            let docroot = tempfile::tempdir().unwrap();
            std::fs::write(docroot.path().join("data.json"), r#"{"ok":true}"#).unwrap();

            let mut config = test_config();
            config.doc_root = docroot.path().to_path_buf();
            let (mut server, addr) = start_server(config.clone(), default_registry(&config)).await;
            let client = client();

            let res = client.get(format!("http://{addr}/data.json")).send().await.unwrap();
            assert_eq!(res.status(), 200);
            assert_eq!(res.headers()["content-type"], "application/json");
            assert_eq!(res.text().await.unwrap(), r#"{"ok":true}"#);

            let res = client.get(format!("http://{addr}/status")).send().await.unwrap();
            let status: serde_json::Value = res.json().await.unwrap();
            assert_eq!(status["status"], "operational");

            let res = client.get(format!("http://{addr}/missing.txt")).send().await.unwrap();
            assert_eq!(res.status(), 404);

            server.stop().await;
        })
        .await;
}

#[tokio::test]
async fn missing_certificate_fails_start() {
    LocalSet::new()
        .run_until(async {
            let mut config = test_config();
            config.tls_cert_path = Some("/nonexistent/cert.pem".into());
            let mut server = Server::new(config, echo_registry());

            let err = server.start().await.unwrap_err();
            assert!(matches!(err, BindError::Tls(_)));
            assert!(!server.is_running());
        })
        .await;
}

#[tokio::test]
async fn tls_round_trip() {
    LocalSet::new()
        .run_until(async {
            let rcgen::CertifiedKey { cert, signing_key } =
                rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
            let mut pem = tempfile::NamedTempFile::new().unwrap();
            write!(pem, "{}{}", cert.pem(), signing_key.serialize_pem()).unwrap();

            let mut config = test_config();
            config.tls_cert_path = Some(pem.path().to_path_buf());
            let (mut server, addr) = start_server(config, echo_registry()).await;

            let client = reqwest::Client::builder()
                .danger_accept_invalid_certs(true)
                .resolve("localhost", addr)
                .pool_max_idle_per_host(0)
                .no_proxy()
                .build()
                .unwrap();
            let res = client
                .get(format!("https://localhost:{}/echo/secure", addr.port()))
                .send()
                .await
                .unwrap();
            assert_eq!(res.status(), 200);
            assert_eq!(res.text().await.unwrap(), "/echo/secure");

            server.stop().await;
        })
        .await;
}

#[tokio::test]
async fn static_handler_is_outranked() {
    LocalSet::new()
        .run_until(async {
            let docroot = tempfile::tempdir().unwrap();
            std::fs::create_dir(docroot.path().join("echo")).unwrap();
            std::fs::write(docroot.path().join("echo").join("file"), "from disk").unwrap();

            let registry = HandlerRegistry::new()
                .with(StaticFileHandler::new(docroot.path()))
                .with(EchoHandler::new("/echo"));
            let (mut server, addr) = start_server(test_config(), registry).await;

            let res = client().get(format!("http://{addr}/echo/file")).send().await.unwrap();
            assert_eq!(res.text().await.unwrap(), "/echo/file");

            server.stop().await;
        })
        .await;
}
