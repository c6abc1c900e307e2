mod common;

use common::{TestHarness, png_bytes, provider_prefix, strategy_path, test_config};
use logo_resolver::errors::AppError;
use logo_resolver::models::{LogoIdentity, LogoRequest};
use logo_resolver::providers::ProviderKind;
use logo_resolver::resolver::StrategyKind;
use logo_resolver::storage::{BlobStore, KeyValueStore};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn png_response(bytes: &[u8]) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "image/png")
        .set_body_bytes(bytes.to_vec())
}

#[tokio::test]
async fn test_second_provider_wins_and_second_request_is_cached() {
    let server = MockServer::start().await;
    let logo = png_bytes(56);
    assert!(logo.len() > 12_000);

    Mock::given(method("GET"))
        .and(path("/logodev/example.com"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/clearbit/example.com"))
        .respond_with(png_response(&logo))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), &[ProviderKind::LogoDev, ProviderKind::Clearbit]);
    let harness = TestHarness::new(&config);

    let first = harness
        .service
        .resolve(LogoRequest::for_domain("https://www.Example.com/about"), None)
        .await
        .unwrap();
    assert!(first.success);
    assert!(!first.from_cache);
    assert_eq!(first.logo_bytes.as_deref(), Some(&logo[..]));
    let metadata = first.metadata.unwrap();
    assert_eq!(metadata.provider, "clearbit");
    assert_eq!(metadata.identity, LogoIdentity::Domain("example.com".to_string()));
    assert_eq!(metadata.byte_size, logo.len() as u64);
    assert_eq!((metadata.width, metadata.height), (Some(56), Some(56)));

    assert_eq!(
        harness.durable.get("domain/example.com/png").await.unwrap().as_deref(),
        Some(&logo[..])
    );

    let second = harness
        .service
        .resolve(LogoRequest::for_domain("example.com"), None)
        .await
        .unwrap();
    assert!(second.success);
    assert!(second.from_cache);
    assert_eq!(second.logo_bytes.as_deref(), Some(&logo[..]));
    assert_eq!(second.metadata.unwrap().retrieved_at, metadata.retrieved_at);

    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_name_only_request_falls_back_to_resolved_domain() {
    let server = MockServer::start().await;
    let logo = png_bytes(32);

    Mock::given(method("GET"))
        .and(path(strategy_path(StrategyKind::ClearbitAutocomplete)))
        .and(query_param("query", "Acme Widgets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "Acme Widgets (Wikipedia)", "domain": "en.wikipedia.org"},
            {"name": "Acme Widgets", "domain": "acmewidgets.io"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/logodev/acmewidgets.io"))
        .respond_with(png_response(&logo))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), &[ProviderKind::LogoDev, ProviderKind::Clearbit]);
    let harness = TestHarness::new(&config);

    let response = harness
        .service
        .resolve(LogoRequest::for_company("Acme Widgets"), None)
        .await
        .unwrap();
    assert!(response.success, "{:?}", response.error);
    let metadata = response.metadata.unwrap();
    assert_eq!(metadata.identity, LogoIdentity::Domain("acmewidgets.io".to_string()));
    assert_eq!(metadata.provider, "logo.dev");
    assert!(harness.durable.head("domain/acmewidgets.io/png").await.unwrap());

    // memoized resolution leads straight to the domain's cache entry
    let again = harness
        .service
        .resolve(LogoRequest::for_company("acme widgets"), None)
        .await
        .unwrap();
    assert!(again.from_cache);
    assert_eq!(again.logo_bytes.as_deref(), Some(&logo[..]));
}

#[tokio::test]
async fn test_all_providers_failing_reports_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clearbit/nologo.example"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html></html>"),
        )
        .mount(&server)
        .await;

    let config = test_config(
        &server.uri(),
        &[ProviderKind::Clearbit, ProviderKind::DirectFavicon],
    );
    let harness = TestHarness::new(&config);

    let response = harness
        .service
        .resolve(LogoRequest::for_domain("nologo.example"), None)
        .await
        .unwrap();
    assert!(!response.success);
    assert!(response.metadata.is_none());
    assert_eq!(
        response.error.as_deref(),
        Some("clearbit: not an image (content-type: text/html); favicon: HTTP 404")
    );
    assert!(harness.durable.keys().await.is_empty());
}

#[tokio::test]
async fn test_nocache_skips_lookup_and_store() {
    let server = MockServer::start().await;
    let logo = png_bytes(16);
    Mock::given(method("GET"))
        .and(path(format!("{}/example.com", provider_prefix(ProviderKind::Clearbit))))
        .respond_with(png_response(&logo))
        .expect(2)
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), &[ProviderKind::Clearbit]);
    let harness = TestHarness::new(&config);

    for _ in 0..2 {
        let response = harness
            .service
            .resolve(LogoRequest::for_domain("example.com").without_cache(), None)
            .await
            .unwrap();
        assert!(response.success);
        assert!(!response.from_cache);
    }
    assert!(harness.durable.keys().await.is_empty());
}

#[tokio::test]
async fn test_variants_are_cached_separately() {
    let server = MockServer::start().await;
    let logo = png_bytes(16);
    Mock::given(method("GET"))
        .and(path("/clearbit/example.com"))
        .respond_with(png_response(&logo))
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), &[ProviderKind::Clearbit]);
    let harness = TestHarness::new(&config);

    for request in [
        LogoRequest::for_domain("example.com"),
        LogoRequest::for_domain("example.com").with_size(64),
        LogoRequest::for_domain("example.com").with_size(64).with_greyscale(true),
    ] {
        harness.service.resolve(request, None).await.unwrap();
    }

    assert_eq!(
        harness.durable.keys().await,
        vec![
            "domain/example.com/png",
            "domain/example.com/png-64",
            "domain/example.com/png-64-grey",
            "domain/example.com/png-64-grey.meta.json",
            "domain/example.com/png-64.meta.json",
            "domain/example.com/png.meta.json",
        ]
    );
}

#[tokio::test]
async fn test_rate_limit_applies_per_client() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(png_response(&png_bytes(16)))
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri(), &[ProviderKind::Clearbit]);
    config.rate_limit.quota = 2;
    let harness = TestHarness::new(&config);

    for _ in 0..2 {
        let (_, decision) = harness
            .service
            .resolve_with_limit(LogoRequest::for_domain("example.com"), Some("client-a"))
            .await
            .unwrap();
        assert!(decision.unwrap().allowed);
    }

    let limited = harness
        .service
        .resolve(LogoRequest::for_domain("example.com"), Some("client-a"))
        .await;
    assert!(matches!(limited, Err(AppError::RateLimited { .. })));

    let other = harness
        .service
        .resolve(LogoRequest::for_domain("example.com"), Some("client-b"))
        .await;
    assert!(other.is_ok());

    // no client key, no limit
    assert!(harness.service.resolve(LogoRequest::for_domain("example.com"), None).await.is_ok());
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let config = test_config("http://127.0.0.1:9", &[ProviderKind::Clearbit]);
    let harness = TestHarness::new(&config);

    let no_identity = LogoRequest::for_company("   ");
    assert!(matches!(
        harness.service.resolve(no_identity, None).await,
        Err(AppError::Validation { .. })
    ));

    let bad_domain = LogoRequest::for_domain("not a domain");
    assert!(matches!(
        harness.service.resolve(bad_domain, None).await,
        Err(AppError::Validation { .. })
    ));

    let bad_size = LogoRequest::for_domain("example.com").with_size(4096);
    assert!(matches!(
        harness.service.resolve(bad_size, None).await,
        Err(AppError::Validation { .. })
    ));
}

#[tokio::test]
async fn test_invalidate_forces_refetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clearbit/example.com"))
        .respond_with(png_response(&png_bytes(16)))
        .expect(2)
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), &[ProviderKind::Clearbit]);
    let harness = TestHarness::new(&config);

    harness.service.resolve(LogoRequest::for_domain("example.com"), None).await.unwrap();
    harness.service.invalidate(LogoRequest::for_domain("example.com")).await.unwrap();
    assert!(harness.durable.keys().await.is_empty());

    let refetched = harness
        .service
        .resolve(LogoRequest::for_domain("example.com"), None)
        .await
        .unwrap();
    assert!(!refetched.from_cache);
}

#[tokio::test]
async fn test_provider_token_never_reaches_stored_metadata_or_logo_url() {
    let server = MockServer::start().await;
    let logo = png_bytes(16);

    Mock::given(method("GET"))
        .and(path("/logodev/example.com"))
        .and(query_param("token", "pk_secret"))
        .respond_with(png_response(&logo))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri(), &[ProviderKind::LogoDev]);
    config.providers[0].token = Some("pk_secret".to_string());
    let harness = TestHarness::new(&config);

    let response = harness
        .service
        .resolve(LogoRequest::for_domain("example.com"), None)
        .await
        .unwrap();
    assert!(response.success);
    let logo_url = response.logo_url.unwrap();
    assert!(!logo_url.contains("token="), "{logo_url}");
    assert!(!response.metadata.unwrap().source_url.contains("pk_secret"));

    let fast_meta = harness.fast.get("meta:domain/example.com/png").await.unwrap().unwrap();
    assert!(!fast_meta.contains("pk_secret"), "{fast_meta}");
    let sidecar = harness
        .durable
        .get("domain/example.com/png.meta.json")
        .await
        .unwrap()
        .unwrap();
    assert!(!String::from_utf8_lossy(&sidecar).contains("pk_secret"));
}
