use std::sync::Arc;

use time::{macros::format_description, Date};
use tracing::info;
use uuid::Uuid;

use super::{
    dto::{CreateDebtRequest, UpdateDebtRequest},
    repo::DebtRepo,
    repo_types::{Debt, DebtPatch, DebtRole, DebtStatus, NewDebt},
};
use crate::{error::AppError, validation::Violations};

const DEBT_NOT_FOUND: &str = "Debt not found";

pub fn parse_date(s: &str) -> Option<Date> {
    Date::parse(s.trim(), format_description!("[year]-[month]-[day]")).ok()
}

pub fn parse_role(role: Option<&str>) -> Result<DebtRole, AppError> {
    match role.unwrap_or("") {
        "" => Ok(DebtRole::Either),
        "borrower" => Ok(DebtRole::Borrower),
        "lender" => Ok(DebtRole::Lender),
        _ => Err(AppError::bad_request("Invalid role")),
    }
}

pub fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::bad_request("Invalid ID"))
}

/// Debt CRUD on behalf of an authenticated user.
#[derive(Clone)]
pub struct DebtLedger {
    debts: Arc<dyn DebtRepo>,
}

impl DebtLedger {
    pub fn new(debts: Arc<dyn DebtRepo>) -> Self {
        Self { debts }
    }

    /// Records a debt lent by `lender_id`. New debts start unpaid.
    pub async fn create(&self, lender_id: Uuid, req: CreateDebtRequest) -> Result<Debt, AppError> {
        let date = parse_date(&req.date);
        let mut v = Violations::new();
        v.check_present("borrower_id", &req.borrower_id, None)
            .check("amount", req.amount.is_some(), "required")
            .check("amount", req.amount.map_or(true, |a| a >= 0.0), "gte=0")
            .check_present("date", &req.date, Some(("date", date.is_some())));
        v.finish().map_err(AppError::Validation)?;

        let borrower_id = Uuid::parse_str(req.borrower_id.trim())
            .map_err(|_| AppError::bad_request("Invalid borrower ID"))?;
        let (Some(amount), Some(date)) = (req.amount, date) else {
            return Err(AppError::bad_request("Invalid input"));
        };

        let debt = self
            .debts
            .create(NewDebt {
                borrower_id,
                lender_id,
                amount,
                date,
                note: req.note,
            })
            .await?;
        info!(debt_id = %debt.id, %lender_id, %borrower_id, "debt created");
        Ok(debt)
    }

    pub async fn list(&self, user_id: Uuid, role: DebtRole) -> Result<Vec<Debt>, AppError> {
        Ok(self.debts.list_for_user(user_id, role).await?)
    }

    /// Loads a debt the caller is party to. Other users' debts read as missing.
    async fn find_own(&self, user_id: Uuid, id: Uuid) -> Result<Debt, AppError> {
        match self.debts.find(id).await? {
            Some(debt) if debt.involves(user_id) => Ok(debt),
            _ => Err(AppError::not_found(DEBT_NOT_FOUND)),
        }
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        req: UpdateDebtRequest,
    ) -> Result<DebtPatch, AppError> {
        let existing = self.find_own(user_id, id).await?;
        let patch = build_patch(&existing, req)?;

        self.debts
            .update(id, &patch)
            .await?
            .ok_or_else(|| AppError::not_found(DEBT_NOT_FOUND))?;
        info!(debt_id = %id, %user_id, "debt updated");
        Ok(patch)
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.find_own(user_id, id).await?;
        if !self.debts.delete(id).await? {
            return Err(AppError::not_found(DEBT_NOT_FOUND));
        }
        info!(debt_id = %id, %user_id, "debt deleted");
        Ok(())
    }
}

/// Turns an update request into the set of fields to write.
///
/// Zero amounts and empty strings leave the field unchanged. Status only
/// moves from unpaid to paid.
fn build_patch(existing: &Debt, req: UpdateDebtRequest) -> Result<DebtPatch, AppError> {
    let mut patch = DebtPatch::default();
    let mut v = Violations::new();

    if let Some(amount) = req.amount {
        v.check("amount", amount >= 0.0, "gte=0");
        if amount > 0.0 {
            patch.amount = Some(amount);
        }
    }
    if let Some(raw) = req.date.as_deref().filter(|d| !d.trim().is_empty()) {
        let date = parse_date(raw);
        v.check("date", date.is_some(), "date");
        patch.date = date;
    }
    patch.note = req.note.filter(|n| !n.is_empty());
    v.finish().map_err(AppError::Validation)?;

    if let Some(status) = req.status {
        if existing.status == DebtStatus::Paid && status == DebtStatus::Unpaid {
            return Err(AppError::bad_request("Paid debts cannot be reopened"));
        }
        patch.status = Some(status);
    }

    if patch.is_empty() {
        return Err(AppError::bad_request("No fields to update"));
    }
    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn ledger() -> DebtLedger {
        DebtLedger::new(Arc::new(MemoryStore::default()))
    }

    fn lend(borrower: Uuid, amount: f64) -> CreateDebtRequest {
        CreateDebtRequest {
            borrower_id: borrower.to_string(),
            amount: Some(amount),
            date: "2024-03-01".into(),
            note: "lunch".into(),
        }
    }

    #[test]
    fn parses_iso_dates_only() {
        assert_eq!(
            parse_date("2024-03-01"),
            Some(Date::from_calendar_date(2024, time::Month::March, 1).unwrap())
        );
        assert_eq!(parse_date("01/03/2024"), None);
        assert_eq!(parse_date("2024-02-30"), None);
    }

    #[test]
    fn parses_roles() {
        assert_eq!(parse_role(None).unwrap(), DebtRole::Either);
        assert_eq!(parse_role(Some("borrower")).unwrap(), DebtRole::Borrower);
        assert_eq!(parse_role(Some("lender")).unwrap(), DebtRole::Lender);
        assert!(parse_role(Some("admin")).is_err());
    }

    #[tokio::test]
    async fn create_starts_unpaid_with_caller_as_lender() {
        let ledger = ledger();
        let (lender, borrower) = (Uuid::new_v4(), Uuid::new_v4());
        let debt = ledger.create(lender, lend(borrower, 12.5)).await.unwrap();
        assert_eq!(debt.lender_id, lender);
        assert_eq!(debt.borrower_id, borrower);
        assert_eq!(debt.status, DebtStatus::Unpaid);
    }

    #[tokio::test]
    async fn create_validates_input() {
        let ledger = ledger();
        let err = ledger
            .create(
                Uuid::new_v4(),
                CreateDebtRequest {
                    borrower_id: String::new(),
                    amount: Some(-1.0),
                    date: "yesterday".into(),
                    note: String::new(),
                },
            )
            .await
            .unwrap_err();
        match err {
            AppError::Validation(errors) => assert_eq!(errors.len(), 3),
            other => panic!("unexpected {other:?}"),
        }

        let err = ledger
            .create(
                Uuid::new_v4(),
                CreateDebtRequest {
                    borrower_id: "not-a-uuid".into(),
                    ..lend(Uuid::nil(), 1.0)
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Invalid borrower ID"));
    }

    #[tokio::test]
    async fn list_filters_by_role() {
        let ledger = ledger();
        let (me, friend) = (Uuid::new_v4(), Uuid::new_v4());
        ledger.create(me, lend(friend, 10.0)).await.unwrap();
        ledger.create(friend, lend(me, 20.0)).await.unwrap();
        ledger.create(friend, lend(Uuid::new_v4(), 30.0)).await.unwrap();

        assert_eq!(ledger.list(me, DebtRole::Either).await.unwrap().len(), 2);
        let lent = ledger.list(me, DebtRole::Lender).await.unwrap();
        assert_eq!(lent.len(), 1);
        assert_eq!(lent[0].amount, 10.0);
        let borrowed = ledger.list(me, DebtRole::Borrower).await.unwrap();
        assert_eq!(borrowed.len(), 1);
        assert_eq!(borrowed[0].amount, 20.0);
    }

    #[tokio::test]
    async fn update_applies_only_meaningful_fields() {
        let ledger = ledger();
        let lender = Uuid::new_v4();
        let debt = ledger.create(lender, lend(Uuid::new_v4(), 10.0)).await.unwrap();

        let patch = ledger
            .update(
                lender,
                debt.id,
                UpdateDebtRequest {
                    amount: Some(0.0),
                    note: Some("dinner".into()),
                    date: Some(String::new()),
                    status: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(patch.amount, None);
        assert_eq!(patch.date, None);
        assert_eq!(patch.note.as_deref(), Some("dinner"));

        let err = ledger
            .update(lender, debt.id, UpdateDebtRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "No fields to update"));
    }

    #[tokio::test]
    async fn paid_is_final() {
        let ledger = ledger();
        let lender = Uuid::new_v4();
        let debt = ledger.create(lender, lend(Uuid::new_v4(), 10.0)).await.unwrap();
        let paid = UpdateDebtRequest {
            status: Some(DebtStatus::Paid),
            ..Default::default()
        };
        ledger.update(lender, debt.id, paid).await.unwrap();

        let reopen = UpdateDebtRequest {
            status: Some(DebtStatus::Unpaid),
            ..Default::default()
        };
        let err = ledger.update(lender, debt.id, reopen).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn strangers_cannot_touch_a_debt() {
        let ledger = ledger();
        let (lender, borrower, stranger) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let debt = ledger.create(lender, lend(borrower, 10.0)).await.unwrap();

        let err = ledger.delete(stranger, debt.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = ledger
            .update(
                stranger,
                debt.id,
                UpdateDebtRequest {
                    note: Some("mine now".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // The borrower is a party and may settle it.
        ledger.delete(borrower, debt.id).await.unwrap();
        assert!(ledger.list(lender, DebtRole::Either).await.unwrap().is_empty());
    }
}
