use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use subscout::discover::{Circl, CrtSh};
use subscout::{CirclAuth, FinderConfig, SubdomainFinder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve one canned HTTP response per connection, in order; the last
/// response repeats for any further connections. Returns the bound
/// address and a counter of handled connections.
async fn serve_script(responses: Vec<String>) -> (SocketAddr, Arc<AtomicUsize>) {
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
            let response = responses
                .get(n)
                .unwrap_or_else(|| responses.last().unwrap())
                .clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    (addr, hits)
}

fn http_response(status_line: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Fast backoff so retry tests finish in milliseconds.
fn test_config(retries: u32) -> FinderConfig {
    FinderConfig {
        retries,
        timeout_secs: 5,
        backoff_factor: 0.001,
        max_backoff_secs: 1,
        ..FinderConfig::default()
    }
}

fn circl_auth() -> CirclAuth {
    CirclAuth {
        user: "pdns".to_string(),
        password: "secret".to_string(),
    }
}

#[tokio::test]
async fn recovers_from_transient_server_errors() {
    let ok_body =
        r#"[{"name_value":"*.EXAMPLE.com\nfoo.example.com\nbar.example.com\nbar.example.com"}]"#;
    let (addr, hits) = serve_script(vec![
        http_response("503 Service Unavailable", "slow down"),
        http_response("503 Service Unavailable", "slow down"),
        http_response("200 OK", ok_body),
    ])
    .await;

    let finder = SubdomainFinder::new(test_config(5))
        .unwrap()
        .with_crtsh(CrtSh::with_base_url(format!("http://{addr}")));
    let subdomains = finder.crtsh_subdomains("example.com").await.unwrap();

    assert_eq!(subdomains, ["bar.example.com", "example.com", "foo.example.com"]);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn gives_up_after_exhausting_retries() {
    let (addr, hits) =
        serve_script(vec![http_response("503 Service Unavailable", "slow down")]).await;

    let finder = SubdomainFinder::new(test_config(2))
        .unwrap()
        .with_crtsh(CrtSh::with_base_url(format!("http://{addr}")));
    let result = finder.crtsh_subdomains("example.com").await;

    assert!(result.is_err());
    // one initial attempt plus two retries
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn non_retryable_status_fails_immediately() {
    let (addr, hits) = serve_script(vec![http_response("404 Not Found", "not found")]).await;

    let finder = SubdomainFinder::new(test_config(5))
        .unwrap()
        .with_crtsh(CrtSh::with_base_url(format!("http://{addr}")));
    let result = finder.crtsh_subdomains("example.com").await;

    assert!(result.is_err());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_result_is_not_an_error() {
    let (addr, _hits) = serve_script(vec![http_response("200 OK", "[]")]).await;

    let finder = SubdomainFinder::new(test_config(0))
        .unwrap()
        .with_crtsh(CrtSh::with_base_url(format!("http://{addr}")));
    let subdomains = finder.crtsh_subdomains("nomatch.example").await.unwrap();

    assert!(subdomains.is_empty());
}

#[tokio::test]
async fn merges_sources_and_dedupes() {
    let crtsh_body = r#"[{"name_value":"b.example.com\na.example.com"}]"#;
    let circl_body = "{\"rrname\":\"c.example.com\"}\n{\"rrname\":\"b.example.com\"}";
    let (crtsh_addr, _) = serve_script(vec![http_response("200 OK", crtsh_body)]).await;
    let (circl_addr, _) = serve_script(vec![http_response("200 OK", circl_body)]).await;

    let finder = SubdomainFinder::new(test_config(0))
        .unwrap()
        .with_crtsh(CrtSh::with_base_url(format!("http://{crtsh_addr}")))
        .with_circl(Circl::with_base_url(circl_auth(), format!("http://{circl_addr}")));
    let subdomains = finder.get_subdomains("example.com").await.unwrap();

    assert_eq!(subdomains, ["a.example.com", "b.example.com", "c.example.com"]);
}

#[tokio::test]
async fn source_failure_propagates_with_its_name() {
    let (crtsh_addr, _) = serve_script(vec![http_response("200 OK", "[]")]).await;
    let (circl_addr, circl_hits) =
        serve_script(vec![http_response("401 Unauthorized", "bad credentials")]).await;

    let finder = SubdomainFinder::new(test_config(5))
        .unwrap()
        .with_crtsh(CrtSh::with_base_url(format!("http://{crtsh_addr}")))
        .with_circl(Circl::with_base_url(circl_auth(), format!("http://{circl_addr}")));
    let err = finder.get_subdomains("example.com").await.unwrap_err();

    assert!(err.to_string().contains("circl-pdns"));
    // 401 is not retried
    assert_eq!(circl_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn circl_requires_credentials() {
    let finder = SubdomainFinder::new(test_config(0)).unwrap();
    let err = finder.circl_subdomains("example.com").await.unwrap_err();
    assert!(err.to_string().contains("not configured"));
}

#[tokio::test]
async fn malformed_body_is_an_error() {
    let (addr, _) =
        serve_script(vec![http_response("200 OK", "<html>challenge page</html>")]).await;

    let finder = SubdomainFinder::new(test_config(0))
        .unwrap()
        .with_crtsh(CrtSh::with_base_url(format!("http://{addr}")));
    assert!(finder.crtsh_subdomains("example.com").await.is_err());
}
