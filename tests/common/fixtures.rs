//! Article fixtures and mock REST endpoints

use saved_articles::ArticleId;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Rendered HTML returned by the mock REST endpoint
pub const SAMPLE_HTML: &str = r#"<!DOCTYPE html>
<html><head><title>Tardigrade</title></head>
<body><section><p>Tardigrades are eight-legged micro-animals.</p></section></body></html>"#;

/// ETag header carrying revision 1187345612
pub const SAMPLE_ETAG: &str = r#"W/"1187345612/7c7b8d40-5f1c-11ef-9a2f-1b3c5d7e9f00""#;

/// Identifier for an English Wikipedia article
pub fn article_id(title: &str) -> ArticleId {
    ArticleId::parse(&format!("https://en.wikipedia.org/wiki/{}", title))
        .expect("valid article URL")
}

/// REST path the fetcher requests for `title`
pub fn html_path(title: &str) -> String {
    format!("/api/rest_v1/page/html/{}", title)
}

/// Serve `SAMPLE_HTML` for `title`
pub async fn mount_article(server: &MockServer, title: &str) {
    Mock::given(method("GET"))
        .and(path(html_path(title)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .insert_header("etag", SAMPLE_ETAG)
                .set_body_string(SAMPLE_HTML),
        )
        .mount(server)
        .await;
}

/// Answer requests for `title` with a bare status code
pub async fn mount_status(server: &MockServer, title: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(html_path(title)))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Serve `title` only after `delay`
pub async fn mount_slow_article(server: &MockServer, title: &str, delay: std::time::Duration) {
    Mock::given(method("GET"))
        .and(path(html_path(title)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(SAMPLE_HTML)
                .set_delay(delay),
        )
        .mount(server)
        .await;
}
