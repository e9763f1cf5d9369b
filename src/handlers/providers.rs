use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Provider, Role};
use crate::services::access::Identity;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResponse {
    pub id: String,
    pub user: OwnerSummary,
    pub services: Vec<String>,
    pub experience: i64,
    pub location: String,
    pub availability: String,
    pub rating: f64,
    pub total_reviews: i64,
    pub verified: bool,
    pub created_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: String,
    pub full_name: String,
    pub email: String,
}

impl ProviderResponse {
    fn new(provider: &Provider, owner_name: &str, owner_email: &str) -> Self {
        Self {
            id: provider.id.clone(),
            user: OwnerSummary {
                id: provider.user_id.clone(),
                full_name: owner_name.to_string(),
                email: owner_email.to_string(),
            },
            services: provider.services.clone(),
            experience: provider.experience,
            location: provider.location.clone(),
            availability: provider.availability.clone(),
            rating: provider.rating,
            total_reviews: provider.total_reviews,
            verified: provider.verified,
            created_at: provider.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

// POST /api/providers/register
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub services: Option<Vec<String>>,
    pub experience: Option<i64>,
    pub location: Option<String>,
    pub availability: Option<String>,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let services: Vec<String> = req
        .services
        .unwrap_or_default()
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if services.is_empty() {
        return Err(AppError::Validation(
            "at least one service is required".to_string(),
        ));
    }
    let location = req
        .location
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation("location is required".to_string()))?;
    let availability = req
        .availability
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation("availability is required".to_string()))?;

    let (provider, owner) = {
        let db = state.db.lock().unwrap();

        let owner = queries::get_user_by_id(&db, &identity.user_id)?
            .ok_or_else(|| AppError::NotFound("user".to_string()))?;

        if queries::get_provider_by_user(&db, &identity.user_id)?.is_some() {
            return Err(AppError::Duplicate(
                "already registered as a provider".to_string(),
            ));
        }

        let provider = Provider {
            id: Uuid::new_v4().to_string(),
            user_id: identity.user_id.clone(),
            services,
            experience: req.experience.unwrap_or(0),
            location: location.to_string(),
            availability: availability.to_string(),
            rating: 0.0,
            total_reviews: 0,
            verified: false,
            created_at: Utc::now().naive_utc(),
        };
        queries::create_provider(&db, &provider)?;

        // registering as a provider flips the account's role
        queries::set_user_role(&db, &identity.user_id, Role::Provider)?;

        (provider, owner)
    };

    tracing::info!("provider {} registered by user {}", provider.id, owner.id);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "provider registered",
            "provider": ProviderResponse::new(&provider, &owner.full_name, &owner.email),
        })),
    ))
}

// GET /api/providers
#[derive(Deserialize)]
pub struct ListQuery {
    pub service: Option<String>,
    pub location: Option<String>,
}

#[derive(Serialize)]
pub struct ProviderListResponse {
    pub message: String,
    pub providers: Vec<ProviderResponse>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ProviderListResponse>, AppError> {
    let listings = {
        let db = state.db.lock().unwrap();
        queries::list_verified_providers(&db, query.service.as_deref(), query.location.as_deref())?
    };

    Ok(Json(ProviderListResponse {
        message: "ok".to_string(),
        providers: listings
            .iter()
            .map(|l| ProviderResponse::new(&l.provider, &l.owner_name, &l.owner_email))
            .collect(),
    }))
}

// GET /api/providers/:id
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (provider, owner) = {
        let db = state.db.lock().unwrap();

        let provider = queries::get_provider_by_id(&db, &id)?
            .ok_or_else(|| AppError::NotFound(format!("provider {id}")))?;
        let owner = queries::get_user_by_id(&db, &provider.user_id)?
            .ok_or_else(|| AppError::NotFound("provider owner".to_string()))?;

        (provider, owner)
    };

    Ok(Json(serde_json::json!({
        "message": "ok",
        "provider": ProviderResponse::new(&provider, &owner.full_name, &owner.email),
    })))
}
