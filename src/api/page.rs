//! The upload page

use axum::response::Html;

/// Single-page front end: upload control, image panes, results and help
pub const INDEX_HTML: &str = include_str!("../../assets/index.html");

pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_accepts_only_supported_images() {
        assert!(INDEX_HTML.contains(r#"accept=".jpg,.jpeg,.png""#));
        assert!(INDEX_HTML.contains("/api/v1/estimate"));
        assert!(INDEX_HTML.contains("How to use"));
    }
}
