// 💳 Account Service - create, read, update and remove accounts
//
// Accounts are normally created by an external process (CSV import or the
// create endpoint); predictions never modify them.

use tracing::info;

use crate::db::{
    delete_account, get_account, get_all_accounts, get_predictions_for_account, insert_account,
    update_account, Database,
};
use crate::entities::{Account, NewAccount, PaymentPrediction, UpdateAccount};
use crate::error::{ServiceError, ServiceResult};

const ACCOUNT_NOT_FOUND: &str = "Account not found.";

#[derive(Clone)]
pub struct AccountService {
    db: Database,
}

impl AccountService {
    pub fn new(db: Database) -> Self {
        AccountService { db }
    }

    pub fn create_account(&self, payload: NewAccount) -> ServiceResult<Account> {
        let account = payload.into_account()?;
        self.db.write(|conn| Ok(insert_account(conn, &account)?))?;

        info!(account_id = %account.id, name = %account.name, "account created");
        Ok(account)
    }

    pub fn get_account(&self, account_id: &str) -> ServiceResult<Account> {
        self.db
            .with_conn(|conn| Ok(get_account(conn, account_id)?))?
            .ok_or_else(|| ServiceError::not_found(ACCOUNT_NOT_FOUND))
    }

    /// All accounts, oldest first
    pub fn list_accounts(&self) -> ServiceResult<Vec<Account>> {
        self.db.with_conn(|conn| Ok(get_all_accounts(conn)?))
    }

    /// Prediction log for an account, newest first
    pub fn predictions(&self, account_id: &str) -> ServiceResult<Vec<PaymentPrediction>> {
        self.db.with_conn(|conn| {
            if get_account(conn, account_id)?.is_none() {
                return Err(ServiceError::not_found(ACCOUNT_NOT_FOUND));
            }
            Ok(get_predictions_for_account(conn, account_id)?)
        })
    }

    /// Apply a partial update; read, validation and write share one transaction
    pub fn update(&self, account_id: &str, changes: &UpdateAccount) -> ServiceResult<Account> {
        if changes.is_empty() {
            return Err(ServiceError::validation("No fields to update."));
        }

        let updated = self.db.write(|conn| {
            let tx = conn.unchecked_transaction()?;
            let current = get_account(&tx, account_id)?
                .ok_or_else(|| ServiceError::not_found(ACCOUNT_NOT_FOUND))?;

            let updated = changes.apply_to(&current)?;
            update_account(&tx, &updated)?;
            tx.commit()?;
            Ok(updated)
        })?;

        info!(account_id, paid = updated.paid, "account updated");
        Ok(updated)
    }

    /// Remove an account together with its predictions
    pub fn delete(&self, account_id: &str) -> ServiceResult<()> {
        let deleted = self.db.write(|conn| Ok(delete_account(conn, account_id)?))?;
        if !deleted {
            return Err(ServiceError::not_found(ACCOUNT_NOT_FOUND));
        }

        info!(account_id, "account deleted");
        Ok(())
    }
}
