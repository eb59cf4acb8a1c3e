//! OpenAPI document served at `/api/openapi.json`.

use axum::Json;
use utoipa::OpenApi;

use crate::handlers::{analyze, health, history, sessions};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "whatref API",
        description = "Wristwatch identification from photos"
    ),
    paths(
        analyze::analyze_image,
        health::health_check,
        sessions::create_session,
        sessions::get_session,
        sessions::guess_again,
        sessions::replace_image,
        sessions::delete_session,
        history::list_history,
        history::clear_history,
    ),
    components(schemas(
        crate::ErrorBody,
        analyze::AnalyzeForm,
        analyze::AnalyzeResponse,
        health::HealthResponse,
        sessions::GuessAgainRequest,
        sessions::SessionImageForm,
        whatref_core::AnalysisResult,
        whatref_core::HistoryEntry,
        whatref_core::SessionSnapshot,
        whatref_core::SessionState,
    )),
    tags(
        (name = "Analysis", description = "Stateless single-shot identification"),
        (name = "Sessions", description = "Identification with server-side guess history"),
        (name = "History", description = "Recent successful identifications"),
        (name = "System", description = "Health checks")
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
