use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Registration record - one submission of the verification form
///
/// The triple (discord_id, student_code, gmail) is the identity key. The
/// store's unique index guarantees no two rows agree on all three.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub discord_id: String,
    pub student_code: String,
    pub gmail: String,
    pub full_name: String,
    /// Cohort year
    pub base: i32,
    /// Set by the store on insertion
    pub created_at: Option<DateTime<Utc>>,
}

impl RegistrationRecord {
    pub fn new(
        discord_id: impl Into<String>,
        student_code: impl Into<String>,
        gmail: impl Into<String>,
        full_name: impl Into<String>,
        base: i32,
    ) -> Self {
        Self {
            discord_id: discord_id.into(),
            student_code: student_code.into(),
            gmail: gmail.into(),
            full_name: full_name.into(),
            base,
            created_at: None,
        }
    }

    /// True when both records carry the same identity key
    pub fn same_identity(&self, other: &RegistrationRecord) -> bool {
        self.discord_id == other.discord_id
            && self.student_code == other.student_code
            && self.gmail == other.gmail
    }

    /// Find records sharing at least one identifying field, oldest first
    pub async fn find_candidates(
        gmail: &str,
        discord_id: &str,
        student_code: &str,
        pool: &PgPool,
    ) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT discord_id, student_code, gmail, full_name, base, created_at
             FROM registrations
             WHERE gmail = $1 OR discord_id = $2 OR student_code = $3
             ORDER BY created_at ASC, id ASC",
        )
        .bind(gmail)
        .bind(discord_id)
        .bind(student_code)
        .fetch_all(pool)
        .await
    }

    /// Insert the record; the returned copy carries `created_at`
    pub async fn insert(&self, pool: &PgPool) -> sqlx::Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO registrations (discord_id, student_code, gmail, full_name, base)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING discord_id, student_code, gmail, full_name, base, created_at",
        )
        .bind(&self.discord_id)
        .bind(&self.student_code)
        .bind(&self.gmail)
        .bind(&self.full_name)
        .bind(self.base)
        .fetch_one(pool)
        .await
    }
}
