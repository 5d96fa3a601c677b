use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DebtStatus {
    Unpaid,
    Paid,
}

impl DebtStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DebtStatus::Unpaid => "unpaid",
            DebtStatus::Paid => "paid",
        }
    }
}

impl FromStr for DebtStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(DebtStatus::Unpaid),
            "paid" => Ok(DebtStatus::Paid),
            other => anyhow::bail!("unknown debt status {other:?}"),
        }
    }
}

/// A debt as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct Debt {
    pub id: Uuid,
    pub borrower_id: Uuid,
    pub lender_id: Uuid,
    pub amount: f64,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub note: String,
    pub status: DebtStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Debt {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.borrower_id == user_id || self.lender_id == user_id
    }
}

#[derive(Debug, FromRow)]
pub struct DebtRow {
    pub id: Uuid,
    pub borrower_id: Uuid,
    pub lender_id: Uuid,
    pub amount: f64,
    pub date: Date,
    pub note: String,
    pub status: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<DebtRow> for Debt {
    type Error = anyhow::Error;

    fn try_from(r: DebtRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            borrower_id: r.borrower_id,
            lender_id: r.lender_id,
            amount: r.amount,
            date: r.date,
            note: r.note,
            status: r.status.parse()?,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewDebt {
    pub borrower_id: Uuid,
    pub lender_id: Uuid,
    pub amount: f64,
    pub date: Date,
    pub note: String,
}

/// Fields to overwrite on an existing debt. Also echoed back as `updatedFields`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DebtPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", with = "iso_date::option")]
    pub date: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DebtStatus>,
}

impl DebtPatch {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none() && self.date.is_none() && self.note.is_none() && self.status.is_none()
    }
}

/// Which side of a debt the caller wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebtRole {
    Borrower,
    Lender,
    Either,
}
