use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub message: Option<String>,
    pub source: String,
    pub created_at: i64,
}
