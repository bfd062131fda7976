use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use catalogue_common::chat::{ChatClient, ChatMessage};

use crate::cache::CourseCache;
use crate::config::Config;
use crate::error::AppError;
use crate::filter::{self, CourseFilter, CourseLevel, DeliveryMethod};
use crate::prompt;
use crate::rank::{self, RankedCourse, DEFAULT_WEIGHTS};
use crate::store::{self, LoadOutcome};

pub struct AppState {
    pub config: Config,
    pub chat: ChatClient,
    pub cache: CourseCache,
}

/// Deduplicated course snapshot for one request: cached when Redis is
/// configured, otherwise a fresh read of the tree.
async fn load_snapshot(state: &AppState) -> LoadOutcome {
    if let Some(cached) = state.cache.get_snapshot().await {
        return cached;
    }
    let mut outcome = store::load_courses(&state.config.data_dir);
    outcome.courses = store::dedup_courses(std::mem::take(&mut outcome.courses));
    state.cache.set_snapshot(&outcome).await;
    outcome
}

async fn run_chat(
    state: &AppState,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
) -> Result<String, AppError> {
    Ok(state.chat.complete(messages, temperature, max_tokens).await?)
}

// --- Query structs ---

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursesQuery {
    school: Option<String>,
    schools: Option<String>,
    search: Option<String>,
    subjects: Option<String>,
    credit_levels: Option<String>,
    min_credits: Option<String>,
    max_credits: Option<String>,
    years: Option<String>,
    course_level: Option<String>,
    visiting_students: Option<String>,
    delivery_method: Option<String>,
    show_unavailable_courses: Option<String>,
}

/// Build the canonical filter from loosely-typed query params. An invalid
/// value is logged and its filter skipped; it never fails the request.
fn filter_from_query(query: &CoursesQuery) -> CourseFilter {
    let mut schools = split_list(query.school.as_deref());
    schools.extend(split_list(query.schools.as_deref()));

    CourseFilter {
        schools,
        search: query.search.clone().filter(|s| !s.trim().is_empty()),
        subjects: split_list(query.subjects.as_deref()),
        credit_levels: parse_number_list(query.credit_levels.as_deref(), "creditLevels"),
        min_credits: parse_number(query.min_credits.as_deref(), "minCredits"),
        max_credits: parse_number(query.max_credits.as_deref(), "maxCredits"),
        years: parse_number_list(query.years.as_deref(), "years"),
        course_level: query.course_level.as_deref().and_then(|value| {
            let parsed = CourseLevel::parse(value);
            if parsed.is_none() {
                warn!(value, "unrecognised courseLevel, skipping filter");
            }
            parsed
        }),
        visiting_students: parse_flag(query.visiting_students.as_deref(), "visitingStudents"),
        delivery: query.delivery_method.as_deref().and_then(|value| {
            let parsed = DeliveryMethod::parse(value);
            if parsed.is_none() {
                warn!(value, "unrecognised deliveryMethod, skipping filter");
            }
            parsed
        }),
        show_unavailable: parse_flag(
            query.show_unavailable_courses.as_deref(),
            "showUnavailableCourses",
        ),
    }
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_number<T: std::str::FromStr>(value: Option<&str>, param: &str) -> Option<T> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(param, value, "non-numeric parameter, skipping filter");
            None
        }
    }
}

fn parse_number_list<T: std::str::FromStr>(value: Option<&str>, param: &str) -> Vec<T> {
    split_list(value)
        .iter()
        .filter_map(|item| parse_number(Some(item.as_str()), param))
        .collect()
}

fn parse_flag(value: Option<&str>, param: &str) -> bool {
    match value.map(|v| v.trim().to_lowercase()) {
        None => false,
        Some(v) if ["true", "1", "yes"].contains(&v.as_str()) => true,
        Some(v) if ["false", "0", "no", ""].contains(&v.as_str()) => false,
        Some(v) => {
            warn!(param, value = %v, "unrecognised boolean parameter, treating as false");
            false
        }
    }
}

// --- Handlers ---

pub async fn api_courses(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CoursesQuery>,
) -> impl IntoResponse {
    let filter = filter_from_query(&query);
    let snapshot = load_snapshot(&state).await;
    let courses = filter::apply(&snapshot.courses, &filter);

    Json(json!({
        "courses": courses,
        "total": courses.len(),
        "diagnostics": {
            "files_read": snapshot.files_read,
            "files_skipped": snapshot.files_skipped,
        },
    }))
}

pub async fn api_course_detail(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    let snapshot = load_snapshot(&state).await;
    match snapshot
        .courses
        .iter()
        .find(|course| course.code.eq_ignore_ascii_case(code.trim()))
    {
        Some(course) => Json(json!({ "course": course })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("course not found: {code}") })),
        )
            .into_response(),
    }
}

pub async fn api_colleges(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let reference = store::load_reference(&state.config.data_dir);
    Json(json!({ "colleges": reference.colleges }))
}

pub async fn api_schools(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let reference = store::load_reference(&state.config.data_dir);
    Json(json!({ "schools": reference.schools }))
}

pub async fn api_subjects(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let reference = store::load_reference(&state.config.data_dir);
    Json(json!({ "subjects": reference.subjects }))
}

#[derive(Debug, Deserialize)]
pub struct ChatbotRequest {
    #[serde(default)]
    messages: Vec<ChatMessage>,
    /// Accepts a number or a string; anything unparseable is ignored.
    #[serde(default)]
    year: Option<serde_json::Value>,
}

pub async fn api_chatbot(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatbotRequest>,
) -> impl IntoResponse {
    let interests = body
        .messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.trim().to_string())
        .filter(|content| !content.is_empty());
    let Some(interests) = interests else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "messages must contain a non-empty user message" })),
        )
            .into_response();
    };

    let year = parse_year_param(body.year.as_ref());
    let ranked = ranked_for(&state, &interests, year).await;
    let context = prompt::format_course_context(&ranked);

    let mut messages = vec![ChatMessage::system(format!(
        "{}\n\n{context}",
        prompt::ADVISOR_SYSTEM_PROMPT
    ))];
    messages.extend(
        body.messages
            .iter()
            .filter(|m| m.role == "user" || m.role == "assistant")
            .cloned(),
    );

    match run_chat(&state, messages, 0.7, 500).await {
        Ok(reply) => Json(json!({ "message": reply })).into_response(),
        Err(e) => {
            warn!(error = %e, "chatbot completion failed");
            Json(json!({ "message": prompt::CHAT_FALLBACK })).into_response()
        }
    }
}

async fn ranked_for(state: &AppState, interests: &str, year: Option<u8>) -> Vec<RankedCourse> {
    if let Some(cached) = state.cache.get_ranked(interests, year).await {
        return cached;
    }
    let snapshot = load_snapshot(state).await;
    let available = filter::apply(&snapshot.courses, &CourseFilter::default());
    let ranked = rank::rank_courses(&available, interests, year, &DEFAULT_WEIGHTS);
    state.cache.set_ranked(interests, year, &ranked).await;
    ranked
}

fn parse_year_param(value: Option<&serde_json::Value>) -> Option<u8> {
    match value? {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u8::try_from(n).ok()),
        serde_json::Value::String(s) => match s.trim().parse::<u8>() {
            Ok(year) => Some(year),
            Err(_) => {
                warn!(value = %s, "non-numeric year, ignoring");
                None
            }
        },
        other => {
            warn!(value = %other, "unexpected year value, ignoring");
            None
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateBulletsRequest {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

pub async fn api_generate_bullets(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GenerateBulletsRequest>,
) -> impl IntoResponse {
    // Description wins when usable; "Not entered" is the scraper's empty marker.
    let description = body
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty() && !d.eq_ignore_ascii_case("Not entered"));
    let text = description
        .or(body.summary.as_deref().map(str::trim).filter(|s| !s.is_empty()))
        .map(String::from);

    let Some(text) = text else {
        return Json(json!({ "bulletPoints": prompt::placeholder_bullets() }));
    };

    let messages = vec![
        ChatMessage::system(prompt::BULLET_SYSTEM_PROMPT),
        ChatMessage::user(prompt::bullet_prompt(&text)),
    ];

    match run_chat(&state, messages, 0.7, 300).await {
        Ok(reply) => Json(json!({ "bulletPoints": prompt::format_bullets(&reply) })),
        Err(e) => {
            warn!(error = %e, "bullet generation failed");
            Json(json!({ "bulletPoints": prompt::error_bullets() }))
        }
    }
}
