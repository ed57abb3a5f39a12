use super::*;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> GrobidClient {
    GrobidClient::new(&GrobidConfig {
        url: server.uri(),
        timeout_seconds: 5,
    })
    .expect("client should build")
}

fn sample_pdf(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("paper.pdf");
    fs::write(&path, b"%PDF-1.5 fake body").expect("should write");
    path
}

#[test]
fn multipart_body_layout() {
    let body = multipart_body("paper.pdf", b"PDFDATA", &[("consolidateHeader", "1")]);
    let text = String::from_utf8_lossy(&body);

    assert!(text.starts_with(&format!("--{}\r\n", BOUNDARY)));
    assert!(text.contains("name=\"input\"; filename=\"paper.pdf\""));
    assert!(text.contains("PDFDATA\r\n"));
    assert!(text.contains("name=\"consolidateHeader\"\r\n\r\n1\r\n"));
    assert!(text.ends_with(&format!("--{}--\r\n", BOUNDARY)));
}

#[test]
fn invalid_url_is_config_error() {
    let result = GrobidClient::new(&GrobidConfig {
        url: "not a url".to_string(),
        timeout_seconds: 5,
    });
    assert!(matches!(result, Err(ReviewError::Config(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn fulltext_sends_consolidation_flags() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/processFulltextDocument"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains("consolidateCitations"))
        .and(body_string_contains("fake body"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<TEI/>"))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let pdf = sample_pdf(&temp_dir);
    let client = client_for(&server);

    let tei = tokio::task::spawn_blocking(move || client.process_fulltext(&pdf))
        .await
        .expect("task should join")
        .expect("request should succeed");
    assert_eq!(tei, "<TEI/>");
}

#[tokio::test(flavor = "multi_thread")]
async fn non_200_is_external_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/processFulltextDocument"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let pdf = sample_pdf(&temp_dir);
    let client = client_for(&server);

    let result = tokio::task::spawn_blocking(move || client.process_fulltext(&pdf))
        .await
        .expect("task should join");

    match result {
        Err(ReviewError::ExternalService { service, message }) => {
            assert_eq!(service, "GROBID");
            assert!(message.contains("503"));
            assert!(message.contains("overloaded"));
        }
        other => panic!("expected external service error, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn liveness_probe() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/isalive"))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let alive = tokio::task::spawn_blocking(move || client.is_alive())
        .await
        .expect("task should join");
    assert!(alive);
}
