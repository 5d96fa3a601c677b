//! In-memory repositories backing unit and router tests.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::{
    repo::{CreateUserError, UserRepo},
    repo_types::{NewUser, User, UserFilter},
};
use crate::debts::{
    repo::DebtRepo,
    repo_types::{Debt, DebtPatch, DebtRole, DebtStatus, NewDebt},
};

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    debts: Mutex<Vec<Debt>>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn filter_matches(filter: &UserFilter, user: &User) -> bool {
    match (&filter.name, &filter.email) {
        (None, None) => true,
        (name, email) => {
            name.as_deref().is_some_and(|n| contains_ci(&user.name, n))
                || email.as_deref().is_some_and(|e| contains_ci(&user.email, e))
        }
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, CreateUserError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(CreateUserError::EmailTaken);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            gender: user.gender,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn list(&self, filter: &UserFilter) -> anyhow::Result<Vec<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().filter(|u| filter_matches(filter, u)).cloned().collect())
    }
}

#[async_trait]
impl DebtRepo for MemoryStore {
    async fn create(&self, debt: NewDebt) -> anyhow::Result<Debt> {
        let now = OffsetDateTime::now_utc();
        let debt = Debt {
            id: Uuid::new_v4(),
            borrower_id: debt.borrower_id,
            lender_id: debt.lender_id,
            amount: debt.amount,
            date: debt.date,
            note: debt.note,
            status: DebtStatus::Unpaid,
            created_at: now,
            updated_at: now,
        };
        self.debts.lock().unwrap().push(debt.clone());
        Ok(debt)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Debt>> {
        let debts = self.debts.lock().unwrap();
        Ok(debts.iter().find(|d| d.id == id).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid, role: DebtRole) -> anyhow::Result<Vec<Debt>> {
        let debts = self.debts.lock().unwrap();
        Ok(debts
            .iter()
            .filter(|d| match role {
                DebtRole::Borrower => d.borrower_id == user_id,
                DebtRole::Lender => d.lender_id == user_id,
                DebtRole::Either => d.involves(user_id),
            })
            .cloned()
            .collect())
    }

    async fn update(&self, id: Uuid, patch: &DebtPatch) -> anyhow::Result<Option<Debt>> {
        let mut debts = self.debts.lock().unwrap();
        let Some(debt) = debts.iter_mut().find(|d| d.id == id) else {
            return Ok(None);
        };
        if let Some(amount) = patch.amount {
            debt.amount = amount;
        }
        if let Some(date) = patch.date {
            debt.date = date;
        }
        if let Some(note) = &patch.note {
            debt.note = note.clone();
        }
        if let Some(status) = patch.status {
            debt.status = status;
        }
        debt.updated_at = OffsetDateTime::now_utc();
        Ok(Some(debt.clone()))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut debts = self.debts.lock().unwrap();
        let before = debts.len();
        debts.retain(|d| d.id != id);
        Ok(debts.len() < before)
    }
}
