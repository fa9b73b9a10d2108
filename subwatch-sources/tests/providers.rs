use subwatch_sources::{
    AlienVault, Anubis, CrtSh, HackerTarget, RapidDns, SourceError, SourceProvider, UrlScan,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

#[tokio::test]
async fn crtsh_queries_wildcard_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("q", "%.example.com"))
        .and(query_param("output", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[{"name_value":"www.example.com\n*.dev.example.com"},{"name_value":"api.example.com"}]"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let provider = CrtSh::with_base_url(client(), server.uri());
    let names = provider.fetch("example.com").await.unwrap();

    assert_eq!(names, vec!["www.example.com", "*.dev.example.com", "api.example.com"]);
}

#[tokio::test]
async fn crtsh_empty_body_means_no_certificates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let provider = CrtSh::with_base_url(client(), server.uri());
    assert!(provider.fetch("example.com").await.unwrap().is_empty());
}

#[tokio::test]
async fn server_errors_surface_as_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let provider = CrtSh::with_base_url(client(), server.uri());
    let err = provider.fetch("example.com").await.unwrap_err();
    assert!(matches!(err, SourceError::Status { status: 503, .. }));
}

#[tokio::test]
async fn alienvault_reads_passive_dns_hostnames() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/indicators/domain/example.com/passive_dns"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"passive_dns":[{"hostname":"mail.example.com","address":"1.1.1.1"},{"address":"2.2.2.2"}],"count":2}"#,
        ))
        .mount(&server)
        .await;

    let provider = AlienVault::with_base_url(client(), server.uri());
    assert_eq!(provider.fetch("example.com").await.unwrap(), vec!["mail.example.com"]);
}

#[tokio::test]
async fn alienvault_without_records_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"count":0}"#))
        .mount(&server)
        .await;

    let provider = AlienVault::with_base_url(client(), server.uri());
    assert!(provider.fetch("example.com").await.unwrap().is_empty());
}

#[tokio::test]
async fn urlscan_collects_task_and_page_domains() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/search/"))
        .and(query_param("q", "domain:example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"results":[
                {"task":{"domain":"shop.example.com"},"page":{"domain":"cdn.example.com"}},
                {"task":{"domain":"blog.example.com"}}
            ],"total":2}"#,
        ))
        .mount(&server)
        .await;

    let provider = UrlScan::with_base_url(client(), server.uri());
    assert_eq!(
        provider.fetch("example.com").await.unwrap(),
        vec!["shop.example.com", "cdn.example.com", "blog.example.com"]
    );
}

#[tokio::test]
async fn anubis_returns_name_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/anubis/subdomains/example.com"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"["a.example.com","b.example.com"]"#),
        )
        .mount(&server)
        .await;

    let provider = Anubis::with_base_url(client(), server.uri());
    assert_eq!(
        provider.fetch("example.com").await.unwrap(),
        vec!["a.example.com", "b.example.com"]
    );
}

#[tokio::test]
async fn hackertarget_reports_quota_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hostsearch/"))
        .and(query_param("q", "example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_string("API count exceeded"))
        .mount(&server)
        .await;

    let provider = HackerTarget::with_base_url(client(), server.uri());
    let err = provider.fetch("example.com").await.unwrap_err();
    assert!(matches!(err, SourceError::UnexpectedFormat { .. }));
}

#[tokio::test]
async fn rapiddns_scrapes_result_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subdomain/example.com"))
        .and(query_param("full", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><table class="table table-striped table-bordered">
               <tbody><tr><td>vpn.example.com</td><td>10.0.0.1</td></tr></tbody>
               </table></body></html>"#,
        ))
        .mount(&server)
        .await;

    let provider = RapidDns::with_base_url(client(), server.uri());
    assert_eq!(provider.fetch("example.com").await.unwrap(), vec!["vpn.example.com"]);
}

#[tokio::test]
async fn slow_source_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("[]")
                .set_delay(std::time::Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_millis(100))
        .build()
        .unwrap();
    let provider = Anubis::with_base_url(client, server.uri());
    let err = provider.fetch("example.com").await.unwrap_err();
    assert!(matches!(err, SourceError::Http(_)));
}
