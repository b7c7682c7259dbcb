use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub recommended: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCatalog {
    pub text_to_video: Vec<ModelInfo>,
    pub image_to_video: Vec<ModelInfo>,
}

/// GET /api/models -- models offered by this server.
async fn list_models() -> Json<ModelCatalog> {
    Json(ModelCatalog {
        text_to_video: vec![ModelInfo {
            id: genesis_fal::api::DEFAULT_MODEL_ID,
            name: "LTX Video (via Fal AI)",
            description: "High-quality text-to-video generation.",
            recommended: true,
        }],
        image_to_video: Vec::new(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/models", get(list_models))
}
