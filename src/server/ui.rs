//! Chat page handlers. Assets are compiled into the binary.

use axum::{
    http::header,
    response::{Html, IntoResponse},
};

const INDEX_HTML: &str = include_str!("../../static/index.html");
const SCRIPT_JS: &str = include_str!("../../static/script.js");

/// GET / — chat page.
pub(super) async fn root() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /static/script.js
pub(super) async fn script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        SCRIPT_JS,
    )
}
