use std::sync::Arc;

use mini_rag::{Document, HashingEmbedder, MockLlm, RagPipeline};
use mini_rag_cli::{AppState, app_router};
use serde_json::Value;

async fn spawn_server(llm: MockLlm, documents: Vec<Document>) -> (String, tokio::task::JoinHandle<()>) {
    let pipeline = RagPipeline::builder()
        .embedding_provider(Arc::new(HashingEmbedder::new(64)))
        .llm(Arc::new(llm))
        .build(documents)
        .await
        .expect("pipeline build");
    let app = app_router(AppState { pipeline: Arc::new(pipeline), app_name: "RAG Project".into() });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}", addr), handle)
}

fn corpus() -> Vec<Document> {
    vec![
        Document::new("rag", "RAG is retrieval augmented generation."),
        Document::new("paris", "Paris is the capital of France."),
    ]
}

#[tokio::test]
async fn query_returns_answer_and_sources() {
    let completion = r#"{"answer": "Retrieval augmented generation.", "sources": ["[0]"]}"#;
    let (base, handle) = spawn_server(MockLlm::new(completion), corpus()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/query", base))
        .json(&serde_json::json!({ "question": "What is RAG?" }))
        .send()
        .await
        .expect("query response");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("query json");
    assert_eq!(body["answer"], "Retrieval augmented generation.");
    assert_eq!(body["sources"], serde_json::json!(["[0]"]));

    handle.abort();
}

#[tokio::test]
async fn raw_completion_is_wrapped_with_empty_sources() {
    let (base, handle) = spawn_server(MockLlm::new("I don't know."), corpus()).await;

    let body: Value = reqwest::Client::new()
        .post(format!("{}/query", base))
        .json(&serde_json::json!({ "question": "What is the meaning of life?" }))
        .send()
        .await
        .expect("query response")
        .json()
        .await
        .expect("query json");
    assert_eq!(body["answer"], "I don't know.");
    assert_eq!(body["sources"], serde_json::json!([]));

    handle.abort();
}

#[tokio::test]
async fn llm_failure_is_a_bad_gateway() {
    let (base, handle) = spawn_server(MockLlm::failing_auth(), corpus()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/query", base))
        .json(&serde_json::json!({ "question": "What is RAG?" }))
        .send()
        .await
        .expect("query response");
    assert_eq!(response.status().as_u16(), 502);
    let body: Value = response.json().await.expect("error json");
    assert!(body["error"].as_str().unwrap_or_default().contains("LLM call failed"));

    handle.abort();
}

#[tokio::test]
async fn empty_index_is_an_internal_error() {
    let (base, handle) = spawn_server(MockLlm::default(), Vec::new()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/query", base))
        .json(&serde_json::json!({ "question": "anything" }))
        .send()
        .await
        .expect("query response");
    assert_eq!(response.status().as_u16(), 500);

    handle.abort();
}

#[tokio::test]
async fn health_reports_service_and_chunk_count() {
    let (base, handle) = spawn_server(MockLlm::default(), corpus()).await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .expect("health response")
        .json()
        .await
        .expect("health json");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "RAG Project");
    assert_eq!(body["chunks"], 2);

    handle.abort();
}
