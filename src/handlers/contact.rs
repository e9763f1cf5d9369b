use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Contact, ContactStatus};
use crate::services::access::Identity;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub created_at: String,
}

impl ContactResponse {
    fn from_contact(contact: &Contact) -> Self {
        Self {
            id: contact.id.clone(),
            name: contact.name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            subject: contact.subject.clone(),
            message: contact.message.clone(),
            status: contact.status.as_str().to_string(),
            created_at: contact.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

// POST /api/contact
#[derive(Deserialize)]
pub struct SubmitRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let name = required(req.name.as_deref(), "name")?;
    let email = required(req.email.as_deref(), "email")?;
    let subject = required(req.subject.as_deref(), "subject")?;
    let message = required(req.message.as_deref(), "message")?;

    let contact = Contact {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: email.to_string(),
        phone: req
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string),
        subject: subject.to_string(),
        message: message.to_string(),
        status: ContactStatus::New,
        created_at: Utc::now().naive_utc(),
    };

    {
        let db = state.db.lock().unwrap();
        queries::create_contact(&db, &contact)?;
    }

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "inquiry received",
            "contact": ContactResponse::from_contact(&contact),
        })),
    ))
}

// GET /api/contact
#[derive(Serialize)]
pub struct ContactListResponse {
    pub message: String,
    pub contacts: Vec<ContactResponse>,
}

// any authenticated user may read the inquiry list (source behavior)
pub async fn list_all(
    State(state): State<Arc<AppState>>,
    _identity: Identity,
) -> Result<Json<ContactListResponse>, AppError> {
    let contacts = {
        let db = state.db.lock().unwrap();
        queries::get_all_contacts(&db)?
    };

    Ok(Json(ContactListResponse {
        message: "ok".to_string(),
        contacts: contacts.iter().map(ContactResponse::from_contact).collect(),
    }))
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, AppError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{name} is required")))
}
