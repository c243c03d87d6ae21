use anyhow::{anyhow, bail, Result};
use log::error;
use rusqlite::types::Value;

use crate::currency::RateSource;
use crate::database::models::{
    Account, AccountSeed, AccountType, AccountStatus, Bank, BankSeed, Transaction, User, UserSeed,
};
use crate::database::Database;
use crate::validation;

pub mod loader;
mod reports;
mod transfer;

pub use reports::AVAILABLE_DISCOUNTS;
pub use transfer::{TransferOutcome, TransferRejection};

/// The ledger service: owns the store handle and the rate collaborator and
/// orchestrates validation, bulk loads, transfers and reports.
pub struct Ledger {
    db: Database,
    rates: Box<dyn RateSource>,
}

impl Ledger {
    pub fn new(db: Database, rates: Box<dyn RateSource>) -> Self {
        Self { db, rates }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Shape raw user rows (full name split into first/last) and insert
    /// them. Rows whose full name cannot be split are dropped with a log
    /// line; returns the number of rows inserted.
    pub fn add_users(&self, seeds: Vec<UserSeed>) -> Result<usize> {
        let users: Vec<User> = seeds
            .into_iter()
            .filter_map(|seed| {
                let (name, surname) = rearrange_full_name(&seed.full_name)?;
                let accounts = seed
                    .accounts
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
                Some(User::new(name, surname, seed.birth_day, accounts))
            })
            .collect();
        self.db.add_records(&users)?;
        Ok(users.len())
    }

    pub fn add_banks(&self, seeds: Vec<BankSeed>) -> Result<usize> {
        let banks: Vec<Bank> = seeds.into_iter().map(|seed| Bank::new(seed.name)).collect();
        self.db.add_records(&banks)?;
        Ok(banks.len())
    }

    /// Validate a batch of account rows and insert them. A single invalid
    /// row aborts the whole batch before anything hits the store.
    pub fn add_accounts(&self, seeds: Vec<AccountSeed>) -> Result<usize> {
        validation::validate_accounts_data(&seeds)?;
        let accounts = seeds
            .into_iter()
            .map(account_from_seed)
            .collect::<Result<Vec<_>>>()?;
        self.db.add_records(&accounts)?;
        Ok(accounts.len())
    }

    pub fn update_user(&self, patch: &[(&str, Value)], user_id: i64) -> Result<()> {
        self.db.update_record::<User>(patch, user_id)
    }

    pub fn delete_user(&self, user_id: i64) -> Result<()> {
        self.db.delete_record::<User>(user_id)
    }

    pub fn update_bank(&self, patch: &[(&str, Value)], bank_id: i64) -> Result<()> {
        self.db.update_record::<Bank>(patch, bank_id)
    }

    pub fn delete_bank(&self, bank_id: i64) -> Result<()> {
        self.db.delete_record::<Bank>(bank_id)
    }

    /// Update account fields after validating any provided number, type or
    /// status value. Other patch contents are passed through unchecked.
    pub fn update_account(&self, patch: &[(&str, Value)], account_id: i64) -> Result<()> {
        for (column, value) in patch {
            if let Value::Text(text) = value {
                match *column {
                    "number" => validation::validate_account_number(text)?,
                    "type" => validation::validate_account_type(text)?,
                    "status" => validation::validate_account_status(text)?,
                    _ => {}
                }
            }
        }
        self.db.update_record::<Account>(patch, account_id)
    }

    pub fn delete_account(&self, account_id: i64) -> Result<()> {
        self.db.delete_record::<Account>(account_id)
    }

    /// Remove every row of the named table.
    pub fn clear_table(&self, table: &str) -> Result<()> {
        match table {
            "users" => self.db.clear_table::<User>(),
            "banks" => self.db.clear_table::<Bank>(),
            "accounts" => self.db.clear_table::<Account>(),
            "transactions" => self.db.clear_table::<Transaction>(),
            other => bail!("unknown table {}", other),
        }
    }
}

/// Clean a full name of everything except letters and whitespace, then
/// split it into first and last name. Returns `None` (logged) when the
/// cleaned name does not contain two parts.
pub fn rearrange_full_name(full_name: &str) -> Option<(String, String)> {
    if full_name.is_empty() {
        error!("no full name provided");
        return None;
    }

    let cleaned: String = full_name
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .collect();

    let mut parts = cleaned.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(first), Some(last)) => Some((first.to_string(), last.to_string())),
        _ => {
            error!("full name {:?} does not split into first and last name", full_name);
            None
        }
    }
}

fn account_from_seed(seed: AccountSeed) -> Result<Account> {
    let account_type = AccountType::from_str(&seed.account_type).map_err(|e| anyhow!(e))?;
    let status = AccountStatus::from_str(&seed.status).map_err(|e| anyhow!(e))?;
    Ok(Account::new(
        seed.user_id,
        account_type,
        seed.number,
        seed.bank_id,
        seed.currency,
        seed.amount,
        status,
    ))
}
