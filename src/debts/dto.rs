use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::{DebtPatch, DebtStatus};

#[derive(Debug, Deserialize)]
pub struct CreateDebtRequest {
    #[serde(default)]
    pub borrower_id: String,
    pub amount: Option<f64>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDebtRequest {
    pub amount: Option<f64>,
    pub date: Option<String>,
    pub note: Option<String>,
    pub status: Option<DebtStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListDebtsQuery {
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedDebtResponse {
    pub success: bool,
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct UpdatedDebtResponse {
    pub success: bool,
    #[serde(rename = "updatedFields")]
    pub updated_fields: DebtPatch,
}
