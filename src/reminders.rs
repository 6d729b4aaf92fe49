// 🔔 Reminder Query Service - read-only views over the Account Store

use crate::db::{get_account, get_all_accounts, Database};
use crate::entities::AccountSummary;
use crate::error::{ServiceError, ServiceResult};

#[derive(Clone)]
pub struct ReminderService {
    db: Database,
}

impl ReminderService {
    pub fn new(db: Database) -> Self {
        ReminderService { db }
    }

    /// Every account as a reminder. Empty store gives an empty list.
    pub fn list_reminders(&self) -> ServiceResult<Vec<AccountSummary>> {
        let accounts = self.db.with_conn(|conn| Ok(get_all_accounts(conn)?))?;
        Ok(accounts.into_iter().map(AccountSummary::from).collect())
    }

    pub fn get_reminder(&self, account_id: &str) -> ServiceResult<AccountSummary> {
        self.db
            .with_conn(|conn| Ok(get_account(conn, account_id)?))?
            .map(AccountSummary::from)
            .ok_or_else(|| ServiceError::not_found("Reminder not found."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{insert_account, setup_database};
    use crate::entities::{parse_date, Account};
    use rusqlite::Connection;

    fn service() -> (Database, ReminderService) {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let db = Database::new(conn);
        (db.clone(), ReminderService::new(db))
    }

    fn add(db: &Database, name: &str, value: f64, due: &str) -> Account {
        let account = Account::new(name, value, parse_date(due).unwrap()).unwrap();
        db.with_conn(|conn| Ok(insert_account(conn, &account)?)).unwrap();
        account
    }

    #[test]
    fn test_list_reminders_empty() {
        let (_, reminders) = service();
        assert!(reminders.list_reminders().unwrap().is_empty());
    }

    #[test]
    fn test_list_reminders_projects_every_account() {
        let (db, reminders) = service();
        let first = add(&db, "Rent", 900.0, "2024-12-01");
        let second = add(&db, "Water", 35.5, "2024-12-15");

        let list = reminders.list_reminders().unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.contains(&first.summary()));
        assert!(list.contains(&second.summary()));

        // Stable across calls
        assert_eq!(reminders.list_reminders().unwrap(), list);
    }

    #[test]
    fn test_get_reminder_round_trips_due_date() {
        let (db, reminders) = service();
        let account = add(&db, "Internet", 99.9, "2024-12-15");

        let summary = reminders.get_reminder(&account.id).unwrap();
        assert_eq!(summary.due_date, "2024-12-15");
        assert_eq!(summary.name, "Internet");
        assert!(!summary.paid);
    }

    #[test]
    fn test_get_reminder_not_found() {
        let (_, reminders) = service();
        let err = reminders.get_reminder("does-not-exist").unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }
}
