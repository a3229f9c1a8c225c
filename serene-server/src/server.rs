use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use serene_rag::{
    AnswerPipeline, EmbeddingProvider, GeminiGenerationProvider, GenerationProvider,
    OpenAIChatProvider, OpenAIEmbeddingProvider, Outcome, RetryingEmbedder, RetryingGenerator,
    SurveyOutcome, SurveyRecommender, TopicTitler, initialize, load_documents,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;

/// Error body for a `/health-test` request without an answers object.
pub const INVALID_ANSWERS: &str = "Missing or invalid 'answers' field";

/// Shared handles for every request.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AnswerPipeline>,
    pub survey: Arc<SurveyRecommender>,
    pub titler: Arc<TopicTitler>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryRequest {
    #[serde(default)]
    query: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TopicRequest {
    #[serde(default)]
    text: Option<String>,
}

/// CORS policy admitting only `allowed_origin`.
pub fn cors_layer(allowed_origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn app_router(state: AppState, allowed_origin: HeaderValue) -> Router {
    Router::new()
        .route("/query", post(query))
        .route("/health", get(health))
        .route("/health-test", post(health_test))
        .route("/get-topic", post(get_topic))
        .with_state(state)
        .layer(cors_layer(allowed_origin))
        .layer(TraceLayer::new_for_http())
}

/// Load and ingest the corpus, then wire the providers into the handlers.
///
/// Every provider call is wrapped in the configured retry policy.
pub async fn build_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let policy = config.rag.retry_policy();

    let embedder = OpenAIEmbeddingProvider::new(config.openai_api_key.as_str())
        .context("OpenAI embeddings")?
        .with_model(config.embedding_model.as_str());
    let embedder: Arc<dyn EmbeddingProvider> =
        Arc::new(RetryingEmbedder::new(Arc::new(embedder), policy));

    let chat = OpenAIChatProvider::new(config.openai_api_key.as_str())
        .context("OpenAI chat")?
        .with_model(config.chat_model.as_str());
    let chat: Arc<dyn GenerationProvider> =
        Arc::new(RetryingGenerator::new(Arc::new(chat), policy));

    let gemini = |model: &str| -> anyhow::Result<Arc<dyn GenerationProvider>> {
        let provider = GeminiGenerationProvider::new(config.gemini_api_key.as_str())
            .context("Gemini")?
            .with_model(model);
        Ok(Arc::new(RetryingGenerator::new(Arc::new(provider), policy)))
    };

    let documents = load_documents(&config.documents)
        .with_context(|| format!("loading documents from {}", config.documents))?;
    let index = initialize(&documents, &config.rag, embedder).await.context("building the index")?;

    let pipeline = AnswerPipeline::builder()
        .config(config.rag.clone())
        .index(Arc::new(index))
        .generator(chat)
        .build()?;

    Ok(AppState {
        pipeline: Arc::new(pipeline),
        survey: Arc::new(SurveyRecommender::new(gemini(&config.survey_model)?)),
        titler: Arc::new(TopicTitler::new(gemini(&config.gemini_model)?)),
    })
}

/// Ingest the corpus, then listen. The socket is bound only once the index
/// is ready.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr = config.addr()?;
    let origin = HeaderValue::from_str(&config.allowed_origin)
        .with_context(|| format!("invalid allowed origin {}", config.allowed_origin))?;

    let state = build_state(&config).await?;
    let app = app_router(state, origin);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "serene listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}

async fn query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    let raw = match payload {
        Ok(Json(request)) => request.query.unwrap_or_default(),
        Err(rejection) => {
            warn!(error = %rejection, "unreadable query body");
            String::new()
        }
    };

    match state.pipeline.answer(&raw).await {
        Outcome::Answered { query, answer } => {
            Json(json!({"response": {"query": query, "result": answer}})).into_response()
        }
        Outcome::Crisis { query, response } => {
            Json(json!({"response": {"query": query, "result": response}})).into_response()
        }
        Outcome::Rejected { reason } => error_body(StatusCode::BAD_REQUEST, &reason),
        Outcome::Unavailable { message, .. } => {
            error_body(StatusCode::SERVICE_UNAVAILABLE, &message)
        }
    }
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "chunks": state.pipeline.index().len().await,
    }))
}

async fn health_test(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let answers = match payload {
        Ok(Json(Value::Object(mut body))) => match body.remove("answers") {
            Some(Value::Object(answers)) => answers,
            _ => return error_body(StatusCode::BAD_REQUEST, INVALID_ANSWERS),
        },
        _ => return error_body(StatusCode::BAD_REQUEST, INVALID_ANSWERS),
    };

    let outcome = state.survey.recommend(&answers).await;
    let status = match outcome {
        SurveyOutcome::Unavailable => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    };
    let body = json!({
        "response": {
            "result": outcome.result_text(),
            "recommendations": outcome.recommendations(),
        }
    });
    (status, Json(body)).into_response()
}

async fn get_topic(
    State(state): State<AppState>,
    payload: Result<Json<TopicRequest>, JsonRejection>,
) -> impl IntoResponse {
    let text = payload.ok().and_then(|Json(request)| request.text).unwrap_or_default();
    let topic = state.titler.title(&text).await;
    Json(json!({"topic": topic}))
}
