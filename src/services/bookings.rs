use chrono::Utc;
use rusqlite::Connection;

use crate::db::queries;

/// Allocates the public booking reference: `BK` + epoch millis, probed
/// against the ledger until unused. Callers hold the store lock across
/// allocate-and-insert, so two in-flight creates cannot race to the same
/// reference; the UNIQUE constraint on the column backs this up.
pub fn allocate_booking_id(conn: &Connection) -> anyhow::Result<String> {
    let mut candidate = Utc::now().timestamp_millis();
    loop {
        let booking_id = format!("BK{candidate}");
        if !queries::booking_id_exists(conn, &booking_id)? {
            return Ok(booking_id);
        }
        candidate += 1;
    }
}
