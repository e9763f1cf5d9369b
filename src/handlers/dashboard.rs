use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Role;
use crate::services::access::Identity;
use crate::state::AppState;

// GET /api/dashboard/stats
pub async fn stats(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<serde_json::Value>, AppError> {
    let stats = {
        let db = state.db.lock().unwrap();

        match identity.role {
            Role::Provider => {
                let provider = queries::get_provider_by_user(&db, &identity.user_id)?
                    .ok_or_else(|| AppError::NotFound("provider profile".to_string()))?;
                let stats = queries::get_provider_stats(&db, &provider.id)?;

                serde_json::json!({
                    "totalBookings": stats.total_bookings,
                    "pendingBookings": stats.pending_bookings,
                    "completedBookings": stats.completed_bookings,
                    "totalRevenue": stats.total_revenue,
                    "averageRating": provider.rating,
                })
            }
            Role::Customer => {
                let stats = queries::get_customer_stats(&db, &identity.user_id)?;

                serde_json::json!({
                    "totalBookings": stats.total_bookings,
                    "pendingBookings": stats.pending_bookings,
                })
            }
        }
    };

    Ok(Json(serde_json::json!({ "message": "ok", "stats": stats })))
}
