use chrono::NaiveDateTime;

#[derive(Debug, Clone)]
pub struct Provider {
    pub id: String,
    pub user_id: String,
    pub services: Vec<String>,
    pub experience: i64,
    pub location: String,
    pub availability: String,
    pub rating: f64,
    pub total_reviews: i64,
    pub verified: bool,
    pub created_at: NaiveDateTime,
}
