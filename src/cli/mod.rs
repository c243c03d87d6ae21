//! Command handlers: thin wrappers that call into the ledger service and
//! print human-readable results.

use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value;
use rust_decimal::Decimal;

use crate::database::models::{AccountSeed, BankSeed, UserSeed, DATETIME_FORMAT, DATE_FORMAT};
use crate::ledger::{loader, Ledger, TransferOutcome};

/// Load user rows from a CSV file
pub fn load_users(ledger: &Ledger, file: &str) -> Result<()> {
    let seeds: Vec<UserSeed> = loader::read_csv(file)?;
    let total = seeds.len();
    let inserted = ledger.add_users(seeds)?;
    println!("Loaded {} of {} users from {}", inserted, total, file);
    Ok(())
}

/// Load bank rows from a CSV file
pub fn load_banks(ledger: &Ledger, file: &str) -> Result<()> {
    let seeds: Vec<BankSeed> = loader::read_csv(file)?;
    let inserted = ledger.add_banks(seeds)?;
    println!("Loaded {} banks from {}", inserted, file);
    Ok(())
}

/// Load account rows from a CSV file
pub fn load_accounts(ledger: &Ledger, file: &str) -> Result<()> {
    let seeds: Vec<AccountSeed> = loader::read_csv(file)?;
    let inserted = ledger.add_accounts(seeds)?;
    println!("Loaded {} accounts from {}", inserted, file);
    Ok(())
}

/// Perform a transfer between two accounts and print the outcome
pub fn transfer(
    ledger: &Ledger,
    sender: &str,
    receiver: &str,
    amount: Decimal,
    time: Option<&str>,
) -> Result<()> {
    let time = time
        .map(|t| {
            NaiveDateTime::parse_from_str(t, DATETIME_FORMAT)
                .map_err(|e| anyhow!("invalid time {:?}: {} (expected {})", t, e, DATETIME_FORMAT))
        })
        .transpose()?;

    match ledger.perform_transaction(sender, receiver, amount, time)? {
        TransferOutcome::Recorded(tx) => {
            println!("Transfer recorded (transaction {})", tx.id);
            println!("From: {} ({})", sender, tx.bank_sender_name);
            println!("To:   {} ({})", receiver, tx.bank_receiver_name);
            println!("Sent: {} {} at {}", tx.sent_amount, tx.sent_currency, tx.datetime);
        }
        TransferOutcome::Rejected(rejection) => {
            println!("Transfer rejected: {}", rejection);
        }
    }
    Ok(())
}

/// Update user fields; only the provided options end up in the patch
pub fn update_user(
    ledger: &Ledger,
    id: i64,
    name: Option<&str>,
    surname: Option<&str>,
    birth_day: Option<&str>,
    accounts: Option<&str>,
) -> Result<()> {
    let mut patch: Vec<(&str, Value)> = Vec::new();
    if let Some(name) = name {
        patch.push(("name", Value::from(name.to_string())));
    }
    if let Some(surname) = surname {
        patch.push(("surname", Value::from(surname.to_string())));
    }
    if let Some(birth_day) = birth_day {
        // Stored as text, so malformed input would poison every later read
        NaiveDate::parse_from_str(birth_day, DATE_FORMAT).map_err(|e| {
            anyhow!(
                "invalid birth date {:?}: {} (expected {})",
                birth_day,
                e,
                DATE_FORMAT
            )
        })?;
        patch.push(("birth_day", Value::from(birth_day.to_string())));
    }
    if let Some(accounts) = accounts {
        patch.push(("accounts", Value::from(accounts.to_string())));
    }
    ledger.update_user(&patch, id)?;
    println!("User {} updated", id);
    Ok(())
}

/// Update a bank's name
pub fn update_bank(ledger: &Ledger, id: i64, name: &str) -> Result<()> {
    ledger.update_bank(&[("name", Value::from(name.to_string()))], id)?;
    println!("Bank {} updated", id);
    Ok(())
}

/// Update account fields; only the provided options end up in the patch
#[allow(clippy::too_many_arguments)]
pub fn update_account(
    ledger: &Ledger,
    id: i64,
    number: Option<&str>,
    account_type: Option<&str>,
    status: Option<&str>,
    currency: Option<&str>,
    amount: Option<Decimal>,
) -> Result<()> {
    let mut patch: Vec<(&str, Value)> = Vec::new();
    if let Some(number) = number {
        patch.push(("number", Value::from(number.to_string())));
    }
    if let Some(account_type) = account_type {
        patch.push(("type", Value::from(account_type.to_string())));
    }
    if let Some(status) = status {
        patch.push(("status", Value::from(status.to_string())));
    }
    if let Some(currency) = currency {
        patch.push(("currency", Value::from(currency.to_string())));
    }
    if let Some(amount) = amount {
        patch.push(("amount", Value::from(amount.to_string())));
    }
    ledger.update_account(&patch, id)?;
    println!("Account {} updated", id);
    Ok(())
}

/// Print users owning an account with a negative balance
pub fn show_debts(ledger: &Ledger) -> Result<()> {
    let debtors = ledger.users_with_debts()?;
    if debtors.is_empty() {
        println!("No users with debts.");
        return Ok(());
    }
    let mut debtors: Vec<_> = debtors.into_iter().collect();
    debtors.sort();
    for (name, surname) in debtors {
        println!("{} {}", name, surname);
    }
    Ok(())
}

/// Print the bank with the largest total balance
pub fn show_biggest_bank(ledger: &Ledger) -> Result<()> {
    match ledger.biggest_capital_bank()? {
        Some(name) => println!("Bank with the biggest capital: {}", name),
        None => println!("No accounts in the ledger."),
    }
    Ok(())
}

/// Print the banks serving the oldest client
pub fn show_oldest_client_banks(ledger: &Ledger) -> Result<()> {
    let banks = ledger.banks_with_oldest_client()?;
    if banks.is_empty() {
        println!("No users with a birth date in the ledger.");
        return Ok(());
    }
    for name in banks {
        println!("{}", name);
    }
    Ok(())
}

/// Print the bank whose clients sent from the most distinct accounts
pub fn show_most_active_bank(ledger: &Ledger) -> Result<()> {
    match ledger.most_active_sender_bank()? {
        Some(name) => println!("Most active sender bank: {}", name),
        None => println!("No transactions in the ledger."),
    }
    Ok(())
}

/// Print transfers sent by a user, optionally limited to the trailing window
pub fn show_user_transactions(ledger: &Ledger, user_id: i64, days: Option<i64>) -> Result<()> {
    let transactions = ledger.user_transactions(user_id, days)?;
    if transactions.is_empty() {
        println!("No transactions for user {}.", user_id);
        return Ok(());
    }
    println!(
        "{:<6} {:<20} {:<12} {:<10} {:<12} {:<12}",
        "ID", "DATETIME", "AMOUNT", "CURRENCY", "FROM BANK", "TO BANK"
    );
    for tx in transactions {
        println!(
            "{:<6} {:<20} {:<12} {:<10} {:<12} {:<12}",
            tx.id,
            tx.datetime.format(DATETIME_FORMAT),
            tx.sent_amount.to_string(),
            tx.sent_currency,
            tx.bank_sender_name,
            tx.bank_receiver_name
        );
    }
    Ok(())
}

/// Pick random users for a credit discount and print the assignment
pub fn show_discounts(ledger: &Ledger, count: usize) -> Result<()> {
    let discounts = ledger.generate_discounts(count)?;
    if discounts.is_empty() {
        println!("No users in the ledger.");
        return Ok(());
    }
    let mut discounts: Vec<_> = discounts.into_iter().collect();
    discounts.sort();
    for (user_id, discount) in discounts {
        println!("User {}: {}% discount", user_id, discount);
    }
    Ok(())
}

/// Delete users with missing fields and print how many were removed
pub fn prune_empty_users(ledger: &Ledger) -> Result<()> {
    let deleted = ledger.delete_empty_users()?;
    println!("Deleted {} users with missing fields", deleted);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::MockRateSource;
    use crate::database::models::User;
    use crate::database::Database;
    use tempfile::{tempdir, TempDir};

    fn setup_ledger() -> (TempDir, Ledger) {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("ledger.db"));
        db.initialize().unwrap();
        let ledger = Ledger::new(db, Box::new(MockRateSource::new()));
        ledger
            .database()
            .add_records(&[User::new(
                "Andrey".to_string(),
                "Andreev".to_string(),
                None,
                vec!["ID--k4-bfe-12363-v".to_string()],
            )])
            .unwrap();
        (dir, ledger)
    }

    #[test]
    fn test_update_user_rejects_malformed_birth_day() {
        let (_dir, ledger) = setup_ledger();

        let result = update_user(&ledger, 1, None, None, Some("not-a-date"), None);
        assert!(result.is_err());

        // The row stays readable and untouched
        let user = ledger
            .database()
            .get_record::<User>("id", &1i64)
            .unwrap()
            .unwrap();
        assert!(user.birth_day.is_none());
    }

    #[test]
    fn test_update_user_accepts_valid_birth_day() {
        let (_dir, ledger) = setup_ledger();

        update_user(&ledger, 1, None, None, Some("1977-03-12"), None).unwrap();

        let user = ledger
            .database()
            .get_record::<User>("id", &1i64)
            .unwrap()
            .unwrap();
        assert_eq!(
            user.birth_day,
            Some(NaiveDate::parse_from_str("1977-03-12", DATE_FORMAT).unwrap())
        );
    }
}
