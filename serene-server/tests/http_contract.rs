use std::sync::Arc;

use axum::http::HeaderValue;
use serde_json::{Value, json};
use serene_rag::mock::{
    EchoGenerationProvider, FailingGenerationProvider, HashEmbeddingProvider,
    ScriptedGenerationProvider,
};
use serene_rag::{
    AnswerPipeline, CRISIS_RESPONSE, DISCLAIMER, Document, GENERIC_FAILURE, GenerationProvider,
    RagConfig, SurveyRecommender, TopicTitler, initialize,
};
use serene_server::{AppState, app_router};

const ORIGIN: &str = "http://www.serenespaceai.com";

async fn state_with(generator: Arc<dyn GenerationProvider>, aux_reply: &str) -> AppState {
    let documents = vec![Document::new("breathing", "Deep breathing reduces anxiety.")];
    let embedder = Arc::new(HashEmbeddingProvider::default());
    let index =
        initialize(&documents, &RagConfig::default(), embedder).await.expect("index builds");
    let pipeline = AnswerPipeline::builder()
        .index(Arc::new(index))
        .generator(generator)
        .build()
        .expect("pipeline builds");
    let aux: Arc<dyn GenerationProvider> = Arc::new(ScriptedGenerationProvider::new(aux_reply));

    AppState {
        pipeline: Arc::new(pipeline),
        survey: Arc::new(SurveyRecommender::new(aux.clone())),
        titler: Arc::new(TopicTitler::new(aux)),
    }
}

async fn spawn_server(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let app = app_router(state, HeaderValue::from_static(ORIGIN));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}", addr), handle)
}

async fn echo_server() -> (String, tokio::task::JoinHandle<()>) {
    let state = state_with(Arc::new(EchoGenerationProvider::new()), "workplace anxiety").await;
    spawn_server(state).await
}

async fn post(base: &str, path: &str, body: Value) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("{base}{path}"))
        .json(&body)
        .send()
        .await
        .expect("post response");
    let status = response.status().as_u16();
    (status, response.json().await.expect("json body"))
}

#[tokio::test]
async fn query_returns_answer_with_disclaimer() {
    let (base, handle) = echo_server().await;

    let (status, body) = post(&base, "/query", json!({"query": "  How can I calm down?  "})).await;

    assert_eq!(status, 200);
    assert_eq!(body["response"]["query"], "How can I calm down?");
    let result = body["response"]["result"].as_str().expect("result string");
    assert!(result.contains("Deep breathing reduces anxiety."));
    assert!(result.ends_with(DISCLAIMER));

    handle.abort();
}

#[tokio::test]
async fn crisis_query_returns_resources() {
    let (base, handle) = echo_server().await;

    let (status, body) = post(&base, "/query", json!({"query": "I want to die"})).await;

    assert_eq!(status, 200);
    assert_eq!(body["response"]["result"], CRISIS_RESPONSE);
    assert_eq!(body["response"]["query"], "I want to die");

    handle.abort();
}

#[tokio::test]
async fn missing_and_oversize_queries_are_bad_requests() {
    let (base, handle) = echo_server().await;

    let (status, body) = post(&base, "/query", json!({})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Query parameter is required");

    let (status, body) = post(&base, "/query", json!({"query": "a".repeat(1001)})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Message too long.");

    handle.abort();
}

#[tokio::test]
async fn upstream_failure_is_generic_503() {
    let state = state_with(Arc::new(FailingGenerationProvider::always()), "unused").await;
    let (base, handle) = spawn_server(state).await;

    let (status, body) = post(&base, "/query", json!({"query": "How can I calm down?"})).await;

    assert_eq!(status, 503);
    assert_eq!(body, json!({"error": GENERIC_FAILURE}));

    handle.abort();
}

#[tokio::test]
async fn health_reports_chunk_count() {
    let (base, handle) = echo_server().await;

    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .expect("health response")
        .json()
        .await
        .expect("health json");

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["chunks"], 1);
    let timestamp = body["timestamp"].as_str().expect("timestamp");
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());

    handle.abort();
}

#[tokio::test]
async fn health_test_validates_answers() {
    let (base, handle) = echo_server().await;

    let (status, body) = post(&base, "/health-test", json!({"answers": ["not", "a", "map"]})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Missing or invalid 'answers' field");

    let (status, _) = post(&base, "/health-test", json!({})).await;
    assert_eq!(status, 400);

    handle.abort();
}

#[tokio::test]
async fn health_test_crisis_and_default_recommendation() {
    let (base, handle) = echo_server().await;

    let crisis = json!({"answers": {"q1": "I feel hopeless"}});
    let (status, body) = post(&base, "/health-test", crisis).await;
    assert_eq!(status, 200);
    assert_eq!(body["response"]["result"], CRISIS_RESPONSE);
    assert_eq!(body["response"]["recommendations"], json!([]));

    let calm = json!({"answers": {"q1": "sleeping fine"}});
    let (status, body) = post(&base, "/health-test", calm).await;
    assert_eq!(status, 200);
    assert_eq!(body["response"]["result"], "Recommendations generated");
    assert_eq!(body["response"]["recommendations"][0]["title"], "General Mental Health Support");

    handle.abort();
}

#[tokio::test]
async fn health_test_failure_is_500() {
    let documents: Vec<Document> = Vec::new();
    let embedder = Arc::new(HashEmbeddingProvider::default());
    let index =
        initialize(&documents, &RagConfig::default(), embedder).await.expect("index builds");
    let failing: Arc<dyn GenerationProvider> = Arc::new(FailingGenerationProvider::always());
    let state = AppState {
        pipeline: Arc::new(
            AnswerPipeline::builder()
                .index(Arc::new(index))
                .generator(failing.clone())
                .build()
                .expect("pipeline builds"),
        ),
        survey: Arc::new(SurveyRecommender::new(failing.clone())),
        titler: Arc::new(TopicTitler::new(failing)),
    };
    let (base, handle) = spawn_server(state).await;

    let (status, body) = post(&base, "/health-test", json!({"answers": {"q1": "ok"}})).await;
    assert_eq!(status, 500);
    assert_eq!(body["response"]["result"], "Error generating recommendations.");
    assert_eq!(body["response"]["recommendations"], json!([]));

    let (status, body) = post(&base, "/get-topic", json!({"text": "I feel anxious"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["topic"], "Untitled Chat");

    handle.abort();
}

#[tokio::test]
async fn get_topic_titles_conversations() {
    let (base, handle) = echo_server().await;

    let (status, body) =
        post(&base, "/get-topic", json!({"text": "I keep having panic attacks"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["topic"], "Workplace Anxiety");

    let (_, body) = post(&base, "/get-topic", json!({"text": "   "})).await;
    assert_eq!(body["topic"], "Untitled Chat");

    handle.abort();
}

#[tokio::test]
async fn cors_admits_only_the_configured_origin() {
    let (base, handle) = echo_server().await;
    let client = reqwest::Client::new();

    let preflight = client
        .request(reqwest::Method::OPTIONS, format!("{base}/query"))
        .header("Origin", ORIGIN)
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .expect("preflight response");
    assert!(preflight.status().is_success());
    assert_eq!(
        preflight.headers().get("access-control-allow-origin").and_then(|v| v.to_str().ok()),
        Some(ORIGIN)
    );

    let foreign = client
        .post(format!("{base}/query"))
        .header("Origin", "http://evil.example")
        .json(&json!({"query": "How can I calm down?"}))
        .send()
        .await
        .expect("foreign response");
    assert!(foreign.headers().get("access-control-allow-origin").is_none());

    handle.abort();
}
