use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use log::info;
use rand::seq::SliceRandom;
use rusqlite::params;
use rusqlite::types::Value;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use super::Ledger;
use crate::database::models::{Bank, Transaction, User, DATETIME_FORMAT};
use crate::database::Record;

/// Discount percentages handed out to randomly picked users.
pub const AVAILABLE_DISCOUNTS: &[u32] = &[25, 30, 50];

fn text_value(value: Value) -> Option<String> {
    match value {
        Value::Text(text) => Some(text),
        _ => None,
    }
}

impl Ledger {
    /// Names of users owning at least one account with a negative balance.
    pub fn users_with_debts(&self) -> Result<HashSet<(String, String)>> {
        let debtor_ids: HashSet<i64> = self.db.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT user_id, amount FROM accounts")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?;
            let mut ids = HashSet::new();
            for row in rows {
                let (user_id, amount) = row?;
                let balance = Decimal::from_str(amount.trim())
                    .with_context(|| format!("malformed balance {:?} for user {}", amount, user_id))?;
                if balance < Decimal::ZERO {
                    ids.insert(user_id);
                }
            }
            Ok(ids)
        })?;

        let mut names = HashSet::new();
        for user_id in debtor_ids {
            if let Some(fields) =
                self.db
                    .get_record_fields::<User>("id", &user_id, &["name", "surname"])?
            {
                let mut fields = fields.into_iter();
                if let (Some(name), Some(surname)) = (
                    fields.next().and_then(text_value),
                    fields.next().and_then(text_value),
                ) {
                    names.insert((name, surname));
                }
            }
        }
        Ok(names)
    }

    /// Name of the bank holding the largest summed balance across its
    /// accounts. Ties resolve to the lower bank id.
    pub fn biggest_capital_bank(&self) -> Result<Option<String>> {
        let mut totals: HashMap<i64, Decimal> = HashMap::new();
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT bank_id, amount FROM accounts")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (bank_id, amount) = row?;
                let balance = Decimal::from_str(amount.trim())
                    .with_context(|| format!("malformed balance {:?} in bank {}", amount, bank_id))?;
                *totals.entry(bank_id).or_insert(Decimal::ZERO) += balance;
            }
            Ok(())
        })?;

        let mut ranked: Vec<(i64, Decimal)> = totals.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let Some((bank_id, _)) = ranked.first() else {
            return Ok(None);
        };
        let bank = self.db.get_record::<Bank>("id", bank_id)?;
        Ok(bank.map(|b| b.name))
    }

    /// Names of the banks serving the oldest client (every bank, when the
    /// oldest client holds accounts in several), sorted.
    pub fn banks_with_oldest_client(&self) -> Result<Vec<String>> {
        let users: Vec<User> = self.db.with_connection(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, name, surname, birth_day, accounts FROM users WHERE birth_day IS NOT NULL")?;
            let rows = stmt.query_map([], User::from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .context("failed to read users")
        })?;

        let Some(oldest) = users.iter().filter_map(|u| u.birth_day).min() else {
            return Ok(Vec::new());
        };

        let mut bank_ids = HashSet::new();
        for user in users.iter().filter(|u| u.birth_day == Some(oldest)) {
            for number in &user.accounts {
                if let Some(fields) = self.db.get_record_fields::<crate::database::models::Account>(
                    "number",
                    number,
                    &["bank_id"],
                )? {
                    if let Some(Value::Integer(bank_id)) = fields.into_iter().next() {
                        bank_ids.insert(bank_id);
                    }
                }
            }
        }

        let mut names = Vec::new();
        for bank_id in bank_ids {
            if let Some(bank) = self.db.get_record::<Bank>("id", &bank_id)? {
                names.push(bank.name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Name of the bank whose clients sent transfers from the most distinct
    /// accounts. Ties resolve alphabetically.
    pub fn most_active_sender_bank(&self) -> Result<Option<String>> {
        let mut senders: HashMap<String, HashSet<i64>> = HashMap::new();
        self.db.with_connection(|conn| {
            let mut stmt =
                conn.prepare("SELECT bank_sender_name, account_sender_id FROM transactions")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (bank_name, account_id) = row?;
                senders.entry(bank_name).or_default().insert(account_id);
            }
            Ok(())
        })?;

        let mut ranked: Vec<(String, usize)> = senders
            .into_iter()
            .map(|(name, accounts)| (name, accounts.len()))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        Ok(ranked.into_iter().next().map(|(name, _)| name))
    }

    /// Transfers sent from any of the user's accounts, oldest first. With
    /// `days` set, only transfers from the trailing window are returned.
    pub fn user_transactions(&self, user_id: i64, days: Option<i64>) -> Result<Vec<Transaction>> {
        let cutoff = days.map(|days| {
            (Utc::now().naive_utc() - Duration::days(days))
                .format(DATETIME_FORMAT)
                .to_string()
        });
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id, t.bank_sender_name, t.bank_receiver_name, \
                        t.account_sender_id, t.account_receiver_id, \
                        t.sent_currency, t.sent_amount, t.datetime \
                 FROM transactions t \
                 JOIN accounts a ON a.id = t.account_sender_id \
                 WHERE a.user_id = ?1 AND (?2 IS NULL OR t.datetime >= ?2) \
                 ORDER BY t.datetime",
            )?;
            let rows = stmt.query_map(params![user_id, cutoff], Transaction::from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .context("failed to read user transactions")
        })
    }

    /// Delete users left with no name, surname or accounts. Returns the
    /// number of rows removed.
    pub fn delete_empty_users(&self) -> Result<usize> {
        let deleted = self.db.with_connection(|conn| {
            conn.execute(
                "DELETE FROM users WHERE name = '' OR surname = '' OR accounts = ''",
                [],
            )
            .context("failed to delete users with missing fields")
        })?;
        info!("deleted {} users with missing fields", deleted);
        Ok(deleted)
    }

    /// Pick up to `count` random users and assign each a random discount
    /// from [`AVAILABLE_DISCOUNTS`].
    pub fn generate_discounts(&self, count: usize) -> Result<HashMap<i64, u32>> {
        let user_ids = self.db.user_ids()?;
        let mut rng = rand::thread_rng();
        let discounts = user_ids
            .choose_multiple(&mut rng, count)
            .map(|user_id| {
                let discount = AVAILABLE_DISCOUNTS.choose(&mut rng).copied().unwrap_or(25);
                (*user_id, discount)
            })
            .collect();
        Ok(discounts)
    }
}
