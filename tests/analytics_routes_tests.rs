mod common;

use axum::http::{StatusCode, header};
use common::*;
use httpmock::prelude::*;
use serde_json::json;

#[tokio::test]
async fn every_api_route_requires_a_credential_and_skips_upstream() {
    let server = MockServer::start_async().await;
    let sites = server
        .mock_async(|when, then| {
            when.method(GET).path("/webmasters/v3/sites");
            then.status(200).json_body(json!({}));
        })
        .await;
    let query = server
        .mock_async(|when, then| {
            when.method(POST).path(QUERY_PATH);
            then.status(200).json_body(json!({}));
        })
        .await;
    let (app, _) = build_app(&test_config(&server));

    for route in [
        uri("/api/sites", &[]),
        uri("/api/data", &[("site_url", SITE)]),
        uri("/api/urls", &[("site_url", SITE), ("page_filter", "/blog")]),
        uri("/api/url-timeseries", &[("site_url", SITE), ("page_url", "https://example.com/a")]),
        // Missing query parameters still answer 401 first.
        uri("/api/data", &[]),
    ] {
        let (status, _, body) = get(&app, &route, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{route}");
        assert_eq!(body["error"]["code"], "UNAUTHENTICATED");
    }

    sites.assert_calls_async(0).await;
    query.assert_calls_async(0).await;
}

#[tokio::test]
async fn sites_are_passed_through_with_bearer_token() {
    let server = MockServer::start_async().await;
    let entries = json!([
        {"siteUrl": "sc-domain:example.com", "permissionLevel": "siteOwner"},
        {"siteUrl": "https://blog.example.com/", "permissionLevel": "siteFullUser"}
    ]);
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/webmasters/v3/sites")
                .header("authorization", "Bearer tok-sites");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "siteEntry": entries.clone() }));
        })
        .await;
    let (app, state) = build_app(&test_config(&server));
    let cookie = credential_cookie(&state, "tok-sites");

    let (status, _, body) = get(&app, "/api/sites", Some(&cookie)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, entries);
    mock.assert_async().await;
}

#[tokio::test]
async fn sites_default_to_empty_list() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/webmasters/v3/sites");
            then.status(200).json_body(json!({}));
        })
        .await;
    let (app, state) = build_app(&test_config(&server));
    let cookie = credential_cookie(&state, "tok");

    let (status, _, body) = get(&app, "/api/sites", Some(&cookie)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn data_by_date_filters_with_contains_and_sorts_ascending() {
    let server = MockServer::start_async().await;
    let (start, end) = window();
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(QUERY_PATH)
                .header("authorization", "Bearer tok-data")
                .json_body(json!({
                    "startDate": start,
                    "endDate": end,
                    "dimensions": ["date"],
                    "dimensionFilterGroups": [{
                        "filters": [{"dimension": "page", "operator": "contains", "expression": "/blog"}]
                    }],
                    "rowLimit": 25000,
                    "dataState": "all"
                }));
            then.status(200).json_body(json!({
                "rows": [
                    {"keys": ["2024-01-02"], "clicks": 5, "impressions": 50, "ctr": 0.1, "position": 2.5},
                    {"keys": ["2024-01-01"], "clicks": 3, "impressions": 60, "ctr": 0.05, "position": 7.0}
                ],
                "responseAggregationType": "byProperty"
            }));
        })
        .await;
    let (app, state) = build_app(&test_config(&server));
    let cookie = credential_cookie(&state, "tok-data");

    let route = uri("/api/data", &[("site_url", SITE), ("page_filter", "/blog")]);
    let (status, _, body) = get(&app, &route, Some(&cookie)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            {"date": "2024-01-01", "clicks": 3, "impressions": 60, "ctr": 0.05, "position": 7.0},
            {"date": "2024-01-02", "clicks": 5, "impressions": 50, "ctr": 0.1, "position": 2.5}
        ])
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn data_by_date_without_filter_sends_no_filter_group() {
    let server = MockServer::start_async().await;
    let (start, end) = window();
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path(QUERY_PATH).json_body(json!({
                "startDate": start,
                "endDate": end,
                "dimensions": ["date"],
                "rowLimit": 25000,
                "dataState": "all"
            }));
            then.status(200).json_body(json!({}));
        })
        .await;
    let (app, state) = build_app(&test_config(&server));
    let cookie = credential_cookie(&state, "tok");

    let route = uri("/api/data", &[("site_url", SITE), ("page_filter", "")]);
    let (status, _, body) = get(&app, &route, Some(&cookie)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
    mock.assert_async().await;
}

#[tokio::test]
async fn urls_are_sorted_by_clicks_descending() {
    let server = MockServer::start_async().await;
    let (start, end) = window();
    server
        .mock_async(|when, then| {
            when.method(POST).path(QUERY_PATH).json_body(json!({
                "startDate": start,
                "endDate": end,
                "dimensions": ["page"],
                "rowLimit": 25000,
                "dataState": "all"
            }));
            then.status(200).json_body(json!({
                "rows": [
                    {"keys": ["/a"], "clicks": 2, "impressions": 20, "ctr": 0.1, "position": 1.0},
                    {"keys": ["/b"], "clicks": 9, "impressions": 30, "ctr": 0.3, "position": 1.5},
                    {"keys": ["/c"], "clicks": 2, "impressions": 40, "ctr": 0.05, "position": 9.0}
                ]
            }));
        })
        .await;
    let (app, state) = build_app(&test_config(&server));
    let cookie = credential_cookie(&state, "tok");

    let (status, _, body) = get(&app, &uri("/api/urls", &[("site_url", SITE)]), Some(&cookie)).await;

    assert_eq!(status, StatusCode::OK);
    let urls: Vec<&str> = body
        .as_array()
        .expect("array body")
        .iter()
        .map(|r| r["url"].as_str().expect("url key"))
        .collect();
    assert_eq!(urls, vec!["/b", "/a", "/c"]);
}

#[tokio::test]
async fn url_time_series_uses_exact_page_match() {
    let server = MockServer::start_async().await;
    let (start, end) = window();
    let page = "https://example.com/blog/post";
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path(QUERY_PATH).json_body(json!({
                "startDate": start,
                "endDate": end,
                "dimensions": ["date"],
                "dimensionFilterGroups": [{
                    "filters": [{"dimension": "page", "operator": "equals", "expression": page}]
                }],
                "rowLimit": 25000,
                "dataState": "all"
            }));
            then.status(200).json_body(json!({
                "rows": [
                    {"keys": ["2024-01-03"], "clicks": 1, "impressions": 4, "ctr": 0.25, "position": 3.0},
                    {"keys": ["2024-01-01"], "clicks": 0, "impressions": 2, "ctr": 0.0, "position": 5.0}
                ]
            }));
        })
        .await;
    let (app, state) = build_app(&test_config(&server));
    let cookie = credential_cookie(&state, "tok");

    let route = uri("/api/url-timeseries", &[("site_url", SITE), ("page_url", page)]);
    let (status, _, body) = get(&app, &route, Some(&cookie)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["date"], "2024-01-01");
    assert_eq!(body[1]["date"], "2024-01-03");
    mock.assert_async().await;
}

#[tokio::test]
async fn upstream_rejection_becomes_500_with_provider_message() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(QUERY_PATH);
            then.status(403).json_body(json!({
                "error": {
                    "code": 403,
                    "message": "User does not have sufficient permission for site 'sc-domain:example.com'.",
                    "status": "PERMISSION_DENIED"
                }
            }));
        })
        .await;
    let (app, state) = build_app(&test_config(&server));
    let cookie = credential_cookie(&state, "tok");

    let (status, _, body) = get(&app, &uri("/api/urls", &[("site_url", SITE)]), Some(&cookie)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "UPSTREAM_QUERY_FAILED");
    let message = body["error"]["message"].as_str().expect("message");
    assert!(message.contains("PERMISSION_DENIED"), "{message}");
    assert!(message.contains("sufficient permission"), "{message}");
}

#[tokio::test]
async fn undecodable_upstream_body_is_an_upstream_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/webmasters/v3/sites");
            then.status(200).body("<html>oops</html>");
        })
        .await;
    let (app, state) = build_app(&test_config(&server));
    let cookie = credential_cookie(&state, "tok");

    let (status, _, body) = get(&app, "/api/sites", Some(&cookie)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "UPSTREAM_QUERY_FAILED");
}

#[tokio::test]
async fn missing_site_url_is_a_bad_request_once_authenticated() {
    let server = MockServer::start_async().await;
    let (app, state) = build_app(&test_config(&server));
    let cookie = credential_cookie(&state, "tok");

    let (status, _, _) = get(&app, "/api/data", Some(&cookie)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cors_allows_credentialed_calls_from_the_frontend() {
    let server = MockServer::start_async().await;
    let (app, _) = build_app(&test_config(&server));

    let resp = tower::ServiceExt::oneshot(
        app,
        axum::http::Request::builder()
            .uri("/")
            .header(header::ORIGIN, "https://app.example.com")
            .body(axum::body::Body::empty())
            .expect("failed to build request"),
    )
    .await
    .expect("request failed");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://app.example.com"
    );
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}
