use axum::Json;

// GET /api
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "servigo API is running" }))
}
