use super::*;
use std::time::Duration;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query</title>
  <entry>
    <id>http://arxiv.org/abs/2101.00001v2</id>
    <published>2021-01-01T00:00:00Z</published>
    <title>Graph Networks
      for Molecules</title>
    <summary>  We propose a message passing scheme.  </summary>
    <link href="http://arxiv.org/abs/2101.00001v2" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2101.00001v2" rel="related" type="application/pdf"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2102.00002v1</id>
    <title>Second Paper</title>
    <summary>Abstract two.</summary>
  </entry>
</feed>"#;

#[test]
fn parses_entries() {
    let papers = parse_atom_feed(FEED).expect("should parse");

    assert_eq!(papers.len(), 2);
    assert_eq!(papers[0].title.as_deref(), Some("Graph Networks for Molecules"));
    assert_eq!(papers[0].abstract_text.as_deref(), Some("We propose a message passing scheme."));
    assert_eq!(papers[0].link.as_deref(), Some("http://arxiv.org/abs/2101.00001v2"));
    assert_eq!(papers[0].published.as_deref(), Some("2021-01-01T00:00:00Z"));
    assert_eq!(
        papers[0].pdf_url.as_deref(),
        Some("http://arxiv.org/pdf/2101.00001v2.pdf")
    );

    // Without links the entry id is the link
    assert_eq!(papers[1].link.as_deref(), Some("http://arxiv.org/abs/2102.00002v1"));
    assert_eq!(papers[1].published, None);
}

#[test]
fn rejects_malformed_feed() {
    assert!(matches!(
        parse_atom_feed("<feed><entry>"),
        Err(ReviewError::Extraction(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn search_queries_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("search_query", "all:graph networks"))
        .and(query_param("start", "0"))
        .and(query_param("max_results", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .expect(1)
        .mount(&server)
        .await;

    let client = SourceClient::new(&server.uri())
        .expect("should build")
        .with_page_delay(Duration::ZERO);
    let source = ArxivSource::new(client);

    let papers = tokio::task::spawn_blocking(move || source.search("graph networks", 2))
        .await
        .expect("task should join")
        .expect("search should succeed");
    assert_eq!(papers.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = SourceClient::new(&server.uri()).expect("should build");
    let source = ArxivSource::new(client);

    let result = tokio::task::spawn_blocking(move || source.search("graphs", 5))
        .await
        .expect("task should join");
    assert!(matches!(result, Err(ReviewError::ExternalService { .. })));
}
