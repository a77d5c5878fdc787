use super::*;
use std::collections::HashMap;

use axum::{
    extract::RawQuery,
    response::Html,
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

async fn fragment() -> Html<&'static str> {
    Html("<h2>Way 123</h2>")
}

async fn payload() -> Json<Value> {
    Json(json!({
        "html": "<h2>Node 7</h2>",
        "render": { "points": [{ "lon": 21.0, "lat": 52.2 }] }
    }))
}

async fn echo_query(RawQuery(query): RawQuery) -> String {
    query.unwrap_or_default()
}

async fn echo_form(Form(fields): Form<HashMap<String, String>>) -> Json<HashMap<String, String>> {
    Json(fields)
}

async fn spawn_partial_server() -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new()
        .route("/api/partial/way/123", get(fragment))
        .route("/api/partial/node/7", get(payload))
        .route("/echo", get(echo_query))
        .route("/settings", post(echo_form));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn fetches_and_decodes_html_fragment() {
    let server_url = spawn_partial_server().await;
    let transport = HttpTransport::new(&server_url).expect("transport");

    let raw = transport
        .fetch(Request::get("/api/partial/way/123"))
        .await
        .expect("fetch");
    let content = decode_partial(raw).expect("decode");

    assert!(matches!(&content, PartialContent::Html(html) if html == "<h2>Way 123</h2>"));
}

#[tokio::test]
async fn fetches_and_decodes_structured_payload() {
    let server_url = spawn_partial_server().await;
    let transport = HttpTransport::new(&server_url).expect("transport");

    let raw = transport
        .fetch(Request::get("/api/partial/node/7"))
        .await
        .expect("fetch");
    let content = decode_partial(raw).expect("decode");

    assert_eq!(content.html(), "<h2>Node 7</h2>");
    let payload = content.payload().expect("structured payload");
    assert_eq!(payload.render.points.len(), 1);
}

#[tokio::test]
async fn get_fields_are_sent_as_query_string() {
    let server_url = spawn_partial_server().await;
    let transport = HttpTransport::new(&server_url).expect("transport");

    let raw = transport
        .fetch(Request::new(
            Method::Get,
            "/echo",
            vec![("q".into(), "main st".into()), ("page".into(), "2".into())],
        ))
        .await
        .expect("fetch");

    assert_eq!(raw.text().expect("text"), "q=main+st&page=2");
}

#[tokio::test]
async fn post_fields_are_sent_as_urlencoded_body() {
    let server_url = spawn_partial_server().await;
    let transport = HttpTransport::new(&server_url).expect("transport");

    let raw = transport
        .fetch(Request::new(
            Method::Post,
            "/settings",
            vec![("display_name".into(), "mapper".into())],
        ))
        .await
        .expect("fetch");
    let echoed: HashMap<String, String> = raw.decode_json().expect("json");

    assert_eq!(echoed.get("display_name").map(String::as_str), Some("mapper"));
}

#[tokio::test]
async fn missing_route_surfaces_as_http_error() {
    let server_url = spawn_partial_server().await;
    let transport = HttpTransport::new(&server_url).expect("transport");

    let raw = transport
        .fetch(Request::get("/api/partial/way/999"))
        .await
        .expect("fetch");
    let err = decode_partial(raw).expect_err("404 should fail");

    assert!(matches!(err, FetchError::Http { status: 404, .. }));
}

#[test]
fn malformed_json_is_a_decode_error() {
    let raw = RawResponse {
        status: 200,
        content_type: Some("application/json; charset=utf-8".into()),
        body: b"{not json".to_vec(),
    };
    assert!(matches!(decode_partial(raw), Err(FetchError::Decode(_))));
}

#[test]
fn invalid_utf8_fragment_is_a_decode_error() {
    let raw = RawResponse {
        status: 200,
        content_type: Some("text/html".into()),
        body: vec![0xff, 0xfe, 0xfd],
    };
    assert!(matches!(decode_partial(raw), Err(FetchError::Decode(_))));
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let transport = HttpTransport::new(&format!("http://{addr}")).expect("transport");

    let err = transport
        .fetch(Request::get("/api/partial/way/1"))
        .await
        .expect_err("connection refused");

    assert!(matches!(err, FetchError::Network(_)));
}
