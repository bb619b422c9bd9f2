use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

use taskdash_core::{BusinessArea, Phase, Task};

/// Raw task row as stored. Categorical columns live as their slugs and are
/// parsed into the domain enums on the way out.
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: i64,
    pub title: String,
    pub client: Option<String>,
    pub description: Option<String>,
    pub business_area: String,
    pub phase: String,
    pub responsible: Option<String>,
    pub deadline: Option<String>,
    pub purchase_price: f64,
    pub sale_price: f64,
    pub markup_margin: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = crate::Error;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: row.id,
            title: row.title,
            client: row.client,
            description: row.description,
            business_area: BusinessArea::from_str(&row.business_area)?,
            phase: Phase::from_str(&row.phase)?,
            responsible: row.responsible,
            deadline: row.deadline,
            purchase_price: row.purchase_price,
            sale_price: row.sale_price,
            markup_margin: row.markup_margin,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of a user account; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            role: row.role,
            created_at: row.created_at,
        }
    }
}
