use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{
    Booking, BookingStatus, Contact, ContactStatus, Gender, Provider, Role, User,
};

// ── Users ──

pub fn create_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    let created_at = user.created_at.format("%Y-%m-%d %H:%M:%S").to_string();

    conn.execute(
        "INSERT INTO users (id, full_name, email, phone, gender, password_hash, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user.id,
            user.full_name,
            user.email,
            user.phone,
            user.gender.as_str(),
            user.password_hash,
            user.role.as_str(),
            created_at,
        ],
    )?;
    Ok(())
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<User>> {
    let result = conn.query_row(
        "SELECT id, full_name, email, phone, gender, password_hash, role, created_at
         FROM users WHERE email = ?1 COLLATE NOCASE",
        params![email],
        |row| Ok(parse_user_row(row)),
    );

    match result {
        Ok(user) => Ok(Some(user?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    let result = conn.query_row(
        "SELECT id, full_name, email, phone, gender, password_hash, role, created_at
         FROM users WHERE id = ?1",
        params![id],
        |row| Ok(parse_user_row(row)),
    );

    match result {
        Ok(user) => Ok(Some(user?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn set_user_role(conn: &Connection, user_id: &str, role: Role) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE users SET role = ?1 WHERE id = ?2",
        params![role.as_str(), user_id],
    )?;
    Ok(count > 0)
}

fn parse_user_row(row: &rusqlite::Row) -> anyhow::Result<User> {
    let gender_str: String = row.get(4)?;
    let role_str: String = row.get(6)?;
    let created_at_str: String = row.get(7)?;

    Ok(User {
        id: row.get(0)?,
        full_name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        gender: Gender::parse(&gender_str).unwrap_or(Gender::Other),
        password_hash: row.get(5)?,
        role: Role::parse(&role_str),
        created_at: parse_timestamp(&created_at_str),
    })
}

// ── Providers ──

pub fn create_provider(conn: &Connection, provider: &Provider) -> anyhow::Result<()> {
    let services_json = serde_json::to_string(&provider.services)?;
    let created_at = provider.created_at.format("%Y-%m-%d %H:%M:%S").to_string();

    conn.execute(
        "INSERT INTO providers (id, user_id, services, experience, location, availability, rating, total_reviews, verified, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            provider.id,
            provider.user_id,
            services_json,
            provider.experience,
            provider.location,
            provider.availability,
            provider.rating,
            provider.total_reviews,
            provider.verified as i32,
            created_at,
        ],
    )?;
    Ok(())
}

pub fn get_provider_by_user(conn: &Connection, user_id: &str) -> anyhow::Result<Option<Provider>> {
    let result = conn.query_row(
        "SELECT id, user_id, services, experience, location, availability, rating, total_reviews, verified, created_at
         FROM providers WHERE user_id = ?1",
        params![user_id],
        |row| Ok(parse_provider_row(row)),
    );

    match result {
        Ok(provider) => Ok(Some(provider?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_provider_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Provider>> {
    let result = conn.query_row(
        "SELECT id, user_id, services, experience, location, availability, rating, total_reviews, verified, created_at
         FROM providers WHERE id = ?1",
        params![id],
        |row| Ok(parse_provider_row(row)),
    );

    match result {
        Ok(provider) => Ok(Some(provider?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// A directory entry: the provider plus its owning user's public identity.
pub struct ProviderListing {
    pub provider: Provider,
    pub owner_name: String,
    pub owner_email: String,
}

/// Verified providers only. `location` is a case-insensitive substring
/// match done in SQL; `service` is an exact match against the services
/// set, checked after the JSON column is parsed.
pub fn list_verified_providers(
    conn: &Connection,
    service: Option<&str>,
    location: Option<&str>,
) -> anyhow::Result<Vec<ProviderListing>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.user_id, p.services, p.experience, p.location, p.availability, p.rating, p.total_reviews, p.verified, p.created_at,
                u.full_name, u.email
         FROM providers p JOIN users u ON u.id = p.user_id
         WHERE p.verified = 1
           AND (?1 IS NULL OR instr(lower(p.location), lower(?1)) > 0)
         ORDER BY p.created_at DESC, p.rowid DESC",
    )?;

    let rows = stmt.query_map(params![location], |row| {
        let owner_name: String = row.get(10)?;
        let owner_email: String = row.get(11)?;
        Ok((parse_provider_row(row), owner_name, owner_email))
    })?;

    let mut listings = vec![];
    for row in rows {
        let (provider, owner_name, owner_email) = row?;
        let provider = provider?;
        if let Some(wanted) = service {
            if !provider.services.iter().any(|s| s == wanted) {
                continue;
            }
        }
        listings.push(ProviderListing {
            provider,
            owner_name,
            owner_email,
        });
    }
    Ok(listings)
}

fn parse_provider_row(row: &rusqlite::Row) -> anyhow::Result<Provider> {
    let services_json: String = row.get(2)?;
    let verified: i32 = row.get(8)?;
    let created_at_str: String = row.get(9)?;

    Ok(Provider {
        id: row.get(0)?,
        user_id: row.get(1)?,
        services: serde_json::from_str(&services_json).unwrap_or_default(),
        experience: row.get(3)?,
        location: row.get(4)?,
        availability: row.get(5)?,
        rating: row.get(6)?,
        total_reviews: row.get(7)?,
        verified: verified != 0,
        created_at: parse_timestamp(&created_at_str),
    })
}

// ── Bookings ──

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    let created_at = booking.created_at.format("%Y-%m-%d %H:%M:%S").to_string();

    conn.execute(
        "INSERT INTO bookings (id, booking_id, customer_id, provider_id, service, date, time, location, amount, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            booking.id,
            booking.booking_id,
            booking.customer_id,
            booking.provider_id,
            booking.service,
            booking.date,
            booking.time,
            booking.location,
            booking.amount,
            booking.status.as_str(),
            created_at,
        ],
    )?;
    Ok(())
}

pub fn booking_id_exists(conn: &Connection, booking_id: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE booking_id = ?1",
        params![booking_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn get_booking_by_public_id(
    conn: &Connection,
    booking_id: &str,
) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        "SELECT id, booking_id, customer_id, provider_id, service, date, time, location, amount, status, created_at
         FROM bookings WHERE booking_id = ?1",
        params![booking_id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// A booking joined with a summary of its provider for list views.
pub struct BookingRecord {
    pub booking: Booking,
    pub provider_name: String,
    pub provider_location: String,
    pub provider_rating: f64,
}

const BOOKING_RECORD_SELECT: &str =
    "SELECT b.id, b.booking_id, b.customer_id, b.provider_id, b.service, b.date, b.time, b.location, b.amount, b.status, b.created_at,
            u.full_name, p.location, p.rating
     FROM bookings b
     JOIN providers p ON p.id = b.provider_id
     JOIN users u ON u.id = p.user_id";

pub fn get_bookings_for_customer(
    conn: &Connection,
    customer_id: &str,
) -> anyhow::Result<Vec<BookingRecord>> {
    let sql = format!(
        "{BOOKING_RECORD_SELECT} WHERE b.customer_id = ?1 ORDER BY b.created_at DESC, b.rowid DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![customer_id], |row| Ok(parse_booking_record(row)))?;
    collect_booking_records(rows)
}

pub fn get_bookings_for_provider(
    conn: &Connection,
    provider_id: &str,
) -> anyhow::Result<Vec<BookingRecord>> {
    let sql = format!(
        "{BOOKING_RECORD_SELECT} WHERE b.provider_id = ?1 ORDER BY b.created_at DESC, b.rowid DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![provider_id], |row| Ok(parse_booking_record(row)))?;
    collect_booking_records(rows)
}

pub fn get_all_bookings(conn: &Connection) -> anyhow::Result<Vec<BookingRecord>> {
    let sql = format!("{BOOKING_RECORD_SELECT} ORDER BY b.created_at DESC, b.rowid DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| Ok(parse_booking_record(row)))?;
    collect_booking_records(rows)
}

pub fn update_booking_status(
    conn: &Connection,
    booking_id: &str,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1 WHERE booking_id = ?2",
        params![status.as_str(), booking_id],
    )?;
    Ok(count > 0)
}

fn collect_booking_records(
    rows: impl Iterator<Item = rusqlite::Result<anyhow::Result<BookingRecord>>>,
) -> anyhow::Result<Vec<BookingRecord>> {
    let mut records = vec![];
    for row in rows {
        records.push(row??);
    }
    Ok(records)
}

fn parse_booking_record(row: &rusqlite::Row) -> anyhow::Result<BookingRecord> {
    Ok(BookingRecord {
        booking: parse_booking_row(row)?,
        provider_name: row.get(11)?,
        provider_location: row.get(12)?,
        provider_rating: row.get(13)?,
    })
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let status_str: String = row.get(9)?;
    let created_at_str: String = row.get(10)?;

    Ok(Booking {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        customer_id: row.get(2)?,
        provider_id: row.get(3)?,
        service: row.get(4)?,
        date: row.get(5)?,
        time: row.get(6)?,
        location: row.get(7)?,
        amount: row.get(8)?,
        status: BookingStatus::parse(&status_str).unwrap_or(BookingStatus::Pending),
        created_at: parse_timestamp(&created_at_str),
    })
}

// ── Stats ──

pub struct CustomerStats {
    pub total_bookings: i64,
    pub pending_bookings: i64,
}

pub fn get_customer_stats(conn: &Connection, customer_id: &str) -> anyhow::Result<CustomerStats> {
    let total_bookings: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE customer_id = ?1",
        params![customer_id],
        |row| row.get(0),
    )?;

    let pending_bookings: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE customer_id = ?1 AND status = 'pending'",
        params![customer_id],
        |row| row.get(0),
    )?;

    Ok(CustomerStats {
        total_bookings,
        pending_bookings,
    })
}

pub struct ProviderStats {
    pub total_bookings: i64,
    pub pending_bookings: i64,
    pub completed_bookings: i64,
    pub total_revenue: f64,
}

pub fn get_provider_stats(conn: &Connection, provider_id: &str) -> anyhow::Result<ProviderStats> {
    let total_bookings: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE provider_id = ?1",
        params![provider_id],
        |row| row.get(0),
    )?;

    let pending_bookings: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE provider_id = ?1 AND status = 'pending'",
        params![provider_id],
        |row| row.get(0),
    )?;

    let completed_bookings: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE provider_id = ?1 AND status = 'completed'",
        params![provider_id],
        |row| row.get(0),
    )?;

    let total_revenue: f64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM bookings WHERE provider_id = ?1 AND status = 'completed'",
        params![provider_id],
        |row| row.get(0),
    )?;

    Ok(ProviderStats {
        total_bookings,
        pending_bookings,
        completed_bookings,
        total_revenue,
    })
}

// ── Contacts ──

pub fn create_contact(conn: &Connection, contact: &Contact) -> anyhow::Result<()> {
    let created_at = contact.created_at.format("%Y-%m-%d %H:%M:%S").to_string();

    conn.execute(
        "INSERT INTO contacts (id, name, email, phone, subject, message, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            contact.id,
            contact.name,
            contact.email,
            contact.phone,
            contact.subject,
            contact.message,
            contact.status.as_str(),
            created_at,
        ],
    )?;
    Ok(())
}

pub fn get_all_contacts(conn: &Connection) -> anyhow::Result<Vec<Contact>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, phone, subject, message, status, created_at
         FROM contacts ORDER BY created_at DESC, rowid DESC",
    )?;

    let rows = stmt.query_map([], |row| Ok(parse_contact_row(row)))?;

    let mut contacts = vec![];
    for row in rows {
        contacts.push(row??);
    }
    Ok(contacts)
}

fn parse_contact_row(row: &rusqlite::Row) -> anyhow::Result<Contact> {
    let status_str: String = row.get(6)?;
    let created_at_str: String = row.get(7)?;

    Ok(Contact {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        subject: row.get(4)?,
        message: row.get(5)?,
        status: ContactStatus::parse(&status_str),
        created_at: parse_timestamp(&created_at_str),
    })
}

fn parse_timestamp(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc())
}
