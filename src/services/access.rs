use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, Role};
use crate::services::tokens;
use crate::state::AppState;

/// Authenticated caller, resolved from the bearer token by the guard.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthenticated)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthenticated)?;

        let claims = tokens::verify(&state.config.jwt_secret, token)?;

        Ok(Identity {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}

/// Visibility scope for the booking list route.
pub enum BookingScope {
    Mine(String),
    All,
}

/// Provider callers see their own provider's ledger; every other caller
/// sees the full set. The unfiltered customer view is documented source
/// behavior, kept as-is.
pub fn booking_list_scope(
    conn: &Connection,
    identity: &Identity,
) -> Result<BookingScope, AppError> {
    match identity.role {
        Role::Provider => {
            let provider = queries::get_provider_by_user(conn, &identity.user_id)?
                .ok_or_else(|| AppError::NotFound("provider profile".to_string()))?;
            Ok(BookingScope::Mine(provider.id))
        }
        Role::Customer => Ok(BookingScope::All),
    }
}

/// Only the booking's customer, or the owning user of its provider, may
/// change its status.
pub fn may_update_booking(identity: &Identity, booking: &Booking, provider_owner_id: &str) -> bool {
    identity.user_id == booking.customer_id || identity.user_id == provider_owner_id
}
