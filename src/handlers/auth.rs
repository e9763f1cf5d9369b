use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Gender, Role, User};
use crate::services::access::Identity;
use crate::services::{passwords, tokens};
use crate::state::AppState;

/// Public projection of a user record; never carries the password hash.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub gender: String,
    pub role: String,
    pub created_at: String,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            gender: user.gender.as_str().to_string(),
            role: user.role.as_str().to_string(),
            created_at: user.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: UserResponse,
}

// POST /api/auth/signup
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub password: Option<String>,
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let full_name = required_field(req.full_name.as_deref(), "fullName")?;
    let email = required_field(req.email.as_deref(), "email")?.to_lowercase();
    let phone = required_field(req.phone.as_deref(), "phone")?;
    let gender_raw = required_field(req.gender.as_deref(), "gender")?;
    let password = req
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Validation("password is required".to_string()))?;

    let gender = Gender::parse(&gender_raw.to_lowercase())
        .ok_or_else(|| AppError::Validation("gender must be male, female or other".to_string()))?;

    if password.len() < 8 {
        return Err(AppError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }

    // bcrypt is deliberately slow; keep it outside the store lock
    let password_hash = passwords::hash_password(password)?;

    let user = {
        let db = state.db.lock().unwrap();

        if queries::get_user_by_email(&db, &email)?.is_some() {
            return Err(AppError::Duplicate("email is already registered".to_string()));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            full_name: full_name.to_string(),
            email,
            phone: phone.to_string(),
            gender,
            password_hash,
            role: Role::Customer,
            created_at: Utc::now().naive_utc(),
        };
        queries::create_user(&db, &user)?;
        user
    };

    let token = tokens::issue(&state.config.jwt_secret, &user.id, user.role)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "account created".to_string(),
            token,
            user: UserResponse::from_user(&user),
        }),
    ))
}

// POST /api/auth/login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = required_field(req.email.as_deref(), "email")?;
    let password = req
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Validation("password is required".to_string()))?;

    let user = {
        let db = state.db.lock().unwrap();
        queries::get_user_by_email(&db, email)?
    };

    // unknown email and wrong password must be indistinguishable
    let user = user.ok_or(AppError::InvalidCredentials)?;
    if !passwords::verify_password(password, &user.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    let token = tokens::issue(&state.config.jwt_secret, &user.id, user.role)?;

    Ok(Json(AuthResponse {
        message: "login successful".to_string(),
        token,
        user: UserResponse::from_user(&user),
    }))
}

// GET /api/auth/me
#[derive(Serialize)]
pub struct MeResponse {
    pub message: String,
    pub user: UserResponse,
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<MeResponse>, AppError> {
    let user = {
        let db = state.db.lock().unwrap();
        queries::get_user_by_id(&db, &identity.user_id)?
    }
    .ok_or_else(|| AppError::NotFound("user".to_string()))?;

    Ok(Json(MeResponse {
        message: "ok".to_string(),
        user: UserResponse::from_user(&user),
    }))
}

fn required_field<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, AppError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{name} is required")))
}
