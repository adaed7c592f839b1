use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{body_string_contains, method, path, query_param};

use recommendation_cell::recommendation_routes;
use shared_utils::test_utils::{MockCompletionResponses, MockSupabaseResponses, TestConfig};

const GENERIC_ERROR: &str = "An error occurred while processing the request.";

fn rule_app(server: &MockServer) -> Router {
    recommendation_routes(TestConfig::with_supabase(&server.uri()).to_arc())
}

fn agent_app(server: &MockServer) -> Router {
    recommendation_routes(TestConfig::with_agent(&server.uri()).to_arc())
}

fn chat_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn mount_specialty(server: &MockServer, specialty: &str, rows: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("specialty", format!("ilike.{}", specialty)))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_headache_returns_neurologist_then_general_physician() {
    let server = MockServer::start().await;
    mount_specialty(&server, "Neurologist", json!([
        MockSupabaseResponses::doctor_row("A", "Dr. Ada", "Neurologist"),
    ])).await;
    mount_specialty(&server, "General Physician", json!([
        MockSupabaseResponses::doctor_row("B", "Dr. Bea", "General Physician"),
    ])).await;

    let response = rule_app(&server)
        .oneshot(chat_request(json!({ "message": "I have a headache" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = body_json(response).await;
    assert_eq!(json_response["data"][0]["id"], "A");
    assert_eq!(json_response["data"][1]["id"], "B");
    assert_eq!(json_response["data"][0]["practice"], "Neurologist");
    assert_eq!(json_response["data"][0]["location"], "Main Street Clinic");
    assert!(json_response["response"].as_str().unwrap().contains("Neurologist"));
}

#[tokio::test]
async fn test_ocr_text_is_classified_like_a_message() {
    let server = MockServer::start().await;
    mount_specialty(&server, "Cardiologist", json!([
        MockSupabaseResponses::doctor_row("C", "Dr. Cole", "Cardiologist"),
    ])).await;

    let response = rule_app(&server)
        .oneshot(chat_request(json!({ "ocrText": "Findings: irregular heartbeat" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = body_json(response).await;
    assert_eq!(json_response["data"][0]["id"], "C");
}

#[tokio::test]
async fn test_limit_caps_the_union() {
    let server = MockServer::start().await;
    mount_specialty(&server, "Neurologist", json!([
        MockSupabaseResponses::doctor_row("A1", "Dr. A1", "Neurologist"),
        MockSupabaseResponses::doctor_row("A2", "Dr. A2", "Neurologist"),
    ])).await;
    mount_specialty(&server, "General Physician", json!([
        MockSupabaseResponses::doctor_row("B1", "Dr. B1", "General Physician"),
    ])).await;

    let response = rule_app(&server)
        .oneshot(chat_request(json!({ "message": "headache", "limit": 2 })))
        .await
        .unwrap();

    let json_response = body_json(response).await;
    assert_eq!(json_response["data"].as_array().unwrap().len(), 2);
    assert_eq!(json_response["data"][1]["id"], "A2");
}

#[tokio::test]
async fn test_empty_message_gets_help_without_data() {
    let server = MockServer::start().await;

    let response = rule_app(&server)
        .oneshot(chat_request(json!({ "message": "   " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = body_json(response).await;
    assert!(json_response.get("data").is_none());
    assert!(!json_response["response"].as_str().unwrap().is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_generic_500() {
    let server = MockServer::start().await;

    let request = Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = rule_app(&server).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json_response = body_json(response).await;
    assert_eq!(json_response["error"], GENERIC_ERROR);
}

#[tokio::test]
async fn test_directory_outage_is_fallback_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let response = rule_app(&server)
        .oneshot(chat_request(json!({ "message": "chest pain" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = body_json(response).await;
    assert_eq!(json_response["response"], GENERIC_ERROR);
    assert!(json_response.get("data").is_none());
}

#[tokio::test]
async fn test_agent_round_trip_keeps_only_known_ids() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("tool_call_id"))
        .respond_with(ResponseTemplate::new(200)
            .set_body_json(MockCompletionResponses::final_answer(r#"["Z", "X"]"#)))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200)
            .set_body_json(MockCompletionResponses::tool_call("call_1", "fetch_all_doctors")))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_row("X", "Dr. Xu", "Dermatologist"),
        ])))
        .mount(&server)
        .await;

    let response = agent_app(&server)
        .oneshot(chat_request(json!({ "message": "my skin keeps peeling" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = body_json(response).await;
    let data = json_response["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], "X");
}

#[tokio::test]
async fn test_agent_service_failure_is_fallback_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let response = agent_app(&server)
        .oneshot(chat_request(json!({ "message": "rash on my arm" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = body_json(response).await;
    assert_eq!(json_response["response"], GENERIC_ERROR);
}
