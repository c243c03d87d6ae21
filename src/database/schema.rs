use anyhow::{Context, Result};
use log::debug;
use rusqlite::Connection;

/// Create the ledger schema
pub fn create_schema(conn: &mut Connection) -> Result<()> {
    debug!("Creating database schema");

    // Use a transaction to ensure all tables are created or none
    let tx = conn
        .transaction()
        .context("Failed to start transaction for schema creation")?;

    tx.execute(
        "CREATE TABLE IF NOT EXISTS banks (
            id INTEGER PRIMARY KEY,
            name TEXT UNIQUE NOT NULL
        )",
        [],
    )
    .context("Failed to create banks table")?;

    tx.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            surname TEXT NOT NULL,
            birth_day TEXT,
            accounts TEXT NOT NULL
        )",
        [],
    )
    .context("Failed to create users table")?;

    tx.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            type TEXT NOT NULL,
            number TEXT UNIQUE NOT NULL,
            bank_id INTEGER NOT NULL,
            currency TEXT NOT NULL,
            amount TEXT NOT NULL,
            status TEXT,
            FOREIGN KEY (user_id) REFERENCES users(id),
            FOREIGN KEY (bank_id) REFERENCES banks(id)
        )",
        [],
    )
    .context("Failed to create accounts table")?;

    // Append-only audit records
    tx.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY,
            bank_sender_name TEXT NOT NULL,
            bank_receiver_name TEXT NOT NULL,
            account_sender_id INTEGER NOT NULL,
            account_receiver_id INTEGER NOT NULL,
            sent_currency TEXT NOT NULL,
            sent_amount TEXT NOT NULL,
            datetime TEXT,
            FOREIGN KEY (account_sender_id) REFERENCES accounts(id),
            FOREIGN KEY (account_receiver_id) REFERENCES accounts(id)
        )",
        [],
    )
    .context("Failed to create transactions table")?;

    // Indices for the lookups the processor and reports lean on
    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_accounts_user_id ON accounts(user_id)",
        [],
    )
    .context("Failed to create index on accounts.user_id")?;

    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_sender ON transactions(account_sender_id)",
        [],
    )
    .context("Failed to create index on transactions.account_sender_id")?;

    tx.commit()
        .context("Failed to commit schema creation transaction")?;

    debug!("Database schema created successfully");
    Ok(())
}
