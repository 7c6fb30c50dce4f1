//! Dashboard Page

use axum::response::Html;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Serve the static dashboard. It polls `GET /data` from the browser.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dashboard_polls_data_endpoint() {
        let Html(html) = index().await;
        assert!(html.contains("fetch('/data')"));
    }
}
