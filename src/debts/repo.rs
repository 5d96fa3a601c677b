use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Debt, DebtPatch, DebtRole, DebtRow, DebtStatus, NewDebt};

#[async_trait]
pub trait DebtRepo: Send + Sync {
    async fn create(&self, debt: NewDebt) -> anyhow::Result<Debt>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Debt>>;
    async fn list_for_user(&self, user_id: Uuid, role: DebtRole) -> anyhow::Result<Vec<Debt>>;
    async fn update(&self, id: Uuid, patch: &DebtPatch) -> anyhow::Result<Option<Debt>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

const DEBT_COLUMNS: &str =
    "id, borrower_id, lender_id, amount, date, note, status, created_at, updated_at";

#[derive(Clone)]
pub struct PgDebtRepo {
    db: PgPool,
}

impl PgDebtRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DebtRepo for PgDebtRepo {
    async fn create(&self, debt: NewDebt) -> anyhow::Result<Debt> {
        let now = OffsetDateTime::now_utc();
        let row = sqlx::query_as::<_, DebtRow>(&format!(
            r#"
            INSERT INTO debt
                (id, borrower_id, lender_id, amount, date, note, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {DEBT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(debt.borrower_id)
        .bind(debt.lender_id)
        .bind(debt.amount)
        .bind(debt.date)
        .bind(&debt.note)
        .bind(DebtStatus::Unpaid.as_str())
        .bind(now)
        .fetch_one(&self.db)
        .await
        .context("insert debt")?;
        row.try_into()
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Debt>> {
        let row = sqlx::query_as::<_, DebtRow>(&format!(
            "SELECT {DEBT_COLUMNS} FROM debt WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find debt")?;
        row.map(Debt::try_from).transpose()
    }

    async fn list_for_user(&self, user_id: Uuid, role: DebtRole) -> anyhow::Result<Vec<Debt>> {
        let filter = match role {
            DebtRole::Borrower => "borrower_id = $1",
            DebtRole::Lender => "lender_id = $1",
            DebtRole::Either => "(borrower_id = $1 OR lender_id = $1)",
        };
        let rows = sqlx::query_as::<_, DebtRow>(&format!(
            r#"
            SELECT {DEBT_COLUMNS}
            FROM debt
            WHERE {filter}
            ORDER BY date DESC, created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list debts")?;
        rows.into_iter().map(Debt::try_from).collect()
    }

    async fn update(&self, id: Uuid, patch: &DebtPatch) -> anyhow::Result<Option<Debt>> {
        let row = sqlx::query_as::<_, DebtRow>(&format!(
            r#"
            UPDATE debt
               SET amount = COALESCE($2, amount),
                   date = COALESCE($3, date),
                   note = COALESCE($4, note),
                   status = COALESCE($5, status),
                   updated_at = $6
             WHERE id = $1
            RETURNING {DEBT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.amount)
        .bind(patch.date)
        .bind(patch.note.as_deref())
        .bind(patch.status.map(DebtStatus::as_str))
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(&self.db)
        .await
        .context("update debt")?;
        row.map(Debt::try_from).transpose()
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM debt WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete debt")?;
        Ok(res.rows_affected() > 0)
    }
}
