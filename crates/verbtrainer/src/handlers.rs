use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::PoisonError;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use latin_paradigm::{Category, Form, SharedStore};
use latin_quiz::{Answer, QuizOptions, SampleError, WeightSpec, draw_question, lookup, parse_query};
use latin_scrape::{BatchOptions, BatchReport, Harvester, PoolError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub harvester: Harvester,
    pub store_path: PathBuf,
    /// Default for batches that do not say otherwise.
    pub exclude_supina: bool,
}

#[derive(Serialize)]
struct WordsResponse {
    count: usize,
    words: Vec<String>,
}

#[derive(Deserialize)]
pub struct FetchRequest {
    pub words: Vec<String>,
    /// Skip words that are already stored.
    #[serde(default)]
    pub only_missing: bool,
    #[serde(default)]
    pub save: bool,
    pub exclude_supina: Option<bool>,
}

#[derive(Serialize)]
struct FailureBody {
    query: String,
    kind: &'static str,
    reason: String,
}

#[derive(Serialize)]
struct BatchResponse {
    succeeded: Vec<String>,
    failed: Vec<FailureBody>,
}

impl From<BatchReport> for BatchResponse {
    fn from(report: BatchReport) -> Self {
        Self {
            succeeded: report.succeeded,
            failed: report
                .failed
                .into_iter()
                .map(|failure| FailureBody {
                    query: failure.query,
                    kind: failure.kind.as_str(),
                    reason: failure.reason,
                })
                .collect(),
        }
    }
}

#[derive(Deserialize)]
pub struct QuestionQuery {
    /// Preset name; defaults to `relevant`.
    pub preset: Option<String>,
    /// Comma separated weights, used instead of a preset.
    pub weights: Option<String>,
    /// Comma separated headwords to leave out.
    pub exclude: Option<String>,
    #[serde(default)]
    pub include_supina: bool,
    #[serde(default)]
    pub include_imperativ_2: bool,
    #[serde(default)]
    pub include_missing: bool,
    #[serde(default)]
    pub ignore_gender_parti: bool,
    #[serde(default)]
    pub ignore_gender_gerundivum: bool,
}

#[derive(Deserialize)]
pub struct CheckRequest {
    pub expected: Vec<String>,
    pub guess: String,
}

#[derive(Deserialize)]
pub struct LookupQuery {
    pub q: String,
}

#[derive(Serialize)]
struct LookupResponse {
    headword: String,
    tense: String,
    voice: String,
    person: String,
    form: Form,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/words", get(list_words).post(fetch_words))
        .route("/v1/words/{headword}", delete(delete_word))
        .route("/v1/save", post(save))
        .route("/v1/question", get(question))
        .route("/v1/check", post(check))
        .route("/v1/lookup", get(lookup_form))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn list_words(State(state): State<AppState>) -> Json<WordsResponse> {
    let store = state.store.read().unwrap_or_else(PoisonError::into_inner);
    let words: Vec<String> = store.headwords().map(str::to_string).collect();
    Json(WordsResponse {
        count: words.len(),
        words,
    })
}

async fn fetch_words(
    State(state): State<AppState>,
    Json(request): Json<FetchRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    let words: Vec<String> = request
        .words
        .iter()
        .map(|word| word.trim().to_string())
        .filter(|word| !word.is_empty())
        .collect();
    if words.is_empty() {
        return Err(ApiError::bad_request("words must not be empty"));
    }
    let options = BatchOptions {
        exclude_supina: request.exclude_supina.unwrap_or(state.exclude_supina),
        save: request.save,
    };

    let harvester = state.harvester.clone();
    let report = tokio::task::spawn_blocking(move || {
        let batch = if request.only_missing {
            harvester.ensure_contains(&words, options, |_| {})
        } else {
            harvester.update(&words, options, |_| {})
        }?;
        Ok::<_, PoolError>(batch.join())
    })
    .await
    .map_err(|err| {
        error!("batch task failed: {err}");
        ApiError::Internal
    })?
    .map_err(|err| ApiError::bad_request(err.to_string()))?;

    info!(
        "fetched {} words, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );
    Ok(Json(report.into()))
}

async fn delete_word(
    State(state): State<AppState>,
    Path(headword): Path<String>,
) -> Result<StatusCode, ApiError> {
    let removed = state
        .store
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&headword);
    match removed {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(ApiError::not_found(format!("{headword} is not stored"))),
    }
}

async fn save(State(state): State<AppState>) -> Result<Response, ApiError> {
    let store = state.store.read().unwrap_or_else(PoisonError::into_inner);
    store.save(&state.store_path).map_err(|err| {
        error!("failed to save store: {err}");
        ApiError::Internal
    })?;
    Ok(Json(json!({ "saved": store.len() })).into_response())
}

async fn question(
    State(state): State<AppState>,
    Query(params): Query<QuestionQuery>,
) -> Result<Response, ApiError> {
    let options = quiz_options(params)?;
    let store = state.store.read().unwrap_or_else(PoisonError::into_inner);
    let question = draw_question(&store, &options, &mut rand::thread_rng()).map_err(|err| match err {
        SampleError::Config(err) => ApiError::bad_request(err.to_string()),
        other => ApiError::not_found(other.to_string()),
    })?;
    Ok(Json(question).into_response())
}

fn quiz_options(params: QuestionQuery) -> Result<QuizOptions, ApiError> {
    let weights = match (params.weights, params.preset) {
        (Some(raw), _) => WeightSpec::Custom(parse_weights(&raw)?),
        (None, Some(preset)) => WeightSpec::Preset(preset),
        (None, None) => WeightSpec::default(),
    };
    let excluded_categories = if params.include_supina {
        BTreeSet::new()
    } else {
        BTreeSet::from([Category::Supine])
    };
    let excluded_headwords = params
        .exclude
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect();
    Ok(QuizOptions {
        weights,
        excluded_headwords,
        excluded_categories,
        ignore_gender_participles: params.ignore_gender_parti,
        ignore_gender_gerundive: params.ignore_gender_gerundivum,
        exclude_imperativ_2: !params.include_imperativ_2,
        exclude_missing: !params.include_missing,
        ..QuizOptions::default()
    })
}

fn parse_weights(raw: &str) -> Result<Vec<f64>, ApiError> {
    raw.split(',')
        .map(|value| {
            value
                .trim()
                .parse::<f64>()
                .map_err(|_| ApiError::bad_request(format!("invalid weight `{}`", value.trim())))
        })
        .collect()
}

async fn check(Json(request): Json<CheckRequest>) -> Result<Response, ApiError> {
    if request.expected.is_empty() {
        return Err(ApiError::bad_request("expected must not be empty"));
    }
    let answer = Answer::Any(request.expected.iter().map(|form| Form::from_cell(form)).collect());
    Ok(Json(json!({
        "correct": answer.accepts(&request.guess),
        "expected": answer.forms(),
    }))
    .into_response())
}

async fn lookup_form(
    State(state): State<AppState>,
    Query(params): Query<LookupQuery>,
) -> Result<Json<LookupResponse>, ApiError> {
    let path = parse_query(&params.q).ok_or_else(|| {
        ApiError::bad_request("query needs a headword, tense, voice and person")
    })?;
    let store = state.store.read().unwrap_or_else(PoisonError::into_inner);
    let form = lookup(&store, &path)
        .cloned()
        .ok_or_else(|| ApiError::not_found(format!("nothing stored for `{}`", params.q.trim())))?;
    Ok(Json(LookupResponse {
        headword: path.headword,
        tense: path.tense,
        voice: path.voice,
        person: path.person,
        form,
    }))
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        ApiError::BadRequest(msg.into())
    }

    fn not_found<T: Into<String>>(msg: T) -> Self {
        ApiError::NotFound(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: msg })).into_response()
            }
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { error: msg })).into_response()
            }
            ApiError::Internal => {
                let body = Json(json!({ "error": "internal server error" }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}
