use rusqlite::types::Value;
use rust_decimal::Decimal;
use tempfile::{tempdir, TempDir};

use crate::database::models::*;
use crate::database::Database;

/// Test fixture: a fresh database in a scratch directory.
fn setup_test_db() -> (TempDir, Database) {
    let dir = tempdir().unwrap();
    let db = Database::new(dir.path().join("test_ledger.db"));
    db.initialize().unwrap();
    (dir, db)
}

fn sample_bank(name: &str) -> Bank {
    Bank::new(name.to_string())
}

fn sample_user(name: &str, surname: &str) -> User {
    User::new(
        name.to_string(),
        surname.to_string(),
        None,
        vec!["ID--k4-bfe-12363-v".to_string()],
    )
}

/// Seed one bank (id 1) and one user (id 1) so account rows satisfy
/// the schema's foreign keys.
fn seed_parents(db: &Database) {
    db.add_records(&[sample_bank("Privat")]).unwrap();
    db.add_records(&[sample_user("Andrey", "Andreev")]).unwrap();
}

fn sample_account(number: &str, balance: i64) -> Account {
    Account::new(
        1,
        AccountType::Debit,
        number.to_string(),
        1,
        "USD".to_string(),
        Decimal::from(balance),
        AccountStatus::Silver,
    )
}

#[test]
fn test_schema_creation() {
    let (_dir, db) = setup_test_db();

    let tables = vec!["users", "banks", "accounts", "transactions"];
    for table in tables {
        let exists: bool = db
            .with_connection(|conn| {
                conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?)",
                    [table],
                    |row| row.get(0),
                )
                .map_err(Into::into)
            })
            .unwrap();
        assert!(exists, "Table '{}' should exist", table);
    }
}

#[test]
fn test_add_records_assigns_unique_ids() {
    let (_dir, db) = setup_test_db();

    let users = vec![
        sample_user("Andrey", "Andreev"),
        sample_user("Danil", "Danilov"),
        sample_user("Olha", "Petrenko"),
    ];
    db.add_records(&users).unwrap();

    assert_eq!(db.count_rows::<User>().unwrap(), 3);

    let ids: Vec<i64> = db
        .with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM users ORDER BY id")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(ids)
        })
        .unwrap();
    assert_eq!(ids.len(), 3);
    let mut deduped = ids.clone();
    deduped.dedup();
    assert_eq!(deduped, ids, "ids should be unique");
}

#[test]
fn test_clear_table_then_reload() {
    let (_dir, db) = setup_test_db();

    db.add_records(&[sample_bank("Privat"), sample_bank("Mono")])
        .unwrap();
    assert_eq!(db.count_rows::<Bank>().unwrap(), 2);

    db.clear_table::<Bank>().unwrap();
    assert_eq!(db.count_rows::<Bank>().unwrap(), 0);

    let banks = vec![
        sample_bank("Privat"),
        sample_bank("Mono"),
        sample_bank("Oschad"),
    ];
    db.add_records(&banks).unwrap();
    assert_eq!(db.count_rows::<Bank>().unwrap(), banks.len() as u64);
}

#[test]
fn test_get_record_by_column() {
    let (_dir, db) = setup_test_db();
    seed_parents(&db);

    db.add_records(&[sample_account("ID--k4-bfe-12363-v", 7773)])
        .unwrap();

    let account = db
        .get_record::<Account>("number", &"ID--k4-bfe-12363-v")
        .unwrap()
        .expect("account should be found");
    assert_eq!(account.balance, Decimal::from(7773));
    assert_eq!(account.account_type, AccountType::Debit);
    assert_eq!(account.status, AccountStatus::Silver);

    let missing = db
        .get_record::<Account>("number", &"ID--zz-zz-00000-zz")
        .unwrap();
    assert!(missing.is_none());
}

#[test]
fn test_get_record_fields_positional() {
    let (_dir, db) = setup_test_db();

    db.add_records(&[sample_user("Andrey", "Andreev")]).unwrap();

    let fields = db
        .get_record_fields::<User>("id", &1i64, &["name", "surname"])
        .unwrap()
        .expect("user should be found");
    assert_eq!(
        fields,
        vec![
            Value::Text("Andrey".to_string()),
            Value::Text("Andreev".to_string())
        ]
    );
}

#[test]
fn test_unknown_column_is_rejected() {
    let (_dir, db) = setup_test_db();

    let result = db.get_record::<User>("password; DROP TABLE users", &1i64);
    assert!(result.is_err());

    let result = db.update_record::<User>(&[("role", Value::Text("admin".into()))], 1);
    assert!(result.is_err());
}

#[test]
fn test_update_record_patch() {
    let (_dir, db) = setup_test_db();
    seed_parents(&db);

    db.add_records(&[sample_account("ID--k4-bfe-12363-v", 7773)])
        .unwrap();

    db.update_record::<Account>(&[("amount", Value::Text("2773".to_string()))], 1)
        .unwrap();

    let account = db.get_record::<Account>("id", &1i64).unwrap().unwrap();
    assert_eq!(account.balance, Decimal::from(2773));
}

#[test]
fn test_update_record_empty_patch_is_noop() {
    let (_dir, db) = setup_test_db();
    seed_parents(&db);

    db.add_records(&[sample_account("ID--k4-bfe-12363-v", 7773)])
        .unwrap();

    db.update_record::<Account>(&[], 1).unwrap();

    let account = db.get_record::<Account>("id", &1i64).unwrap().unwrap();
    assert_eq!(account.balance, Decimal::from(7773));
}

#[test]
fn test_delete_record_is_idempotent() {
    let (_dir, db) = setup_test_db();

    db.add_records(&[sample_bank("Privat")]).unwrap();
    assert_eq!(db.count_rows::<Bank>().unwrap(), 1);

    db.delete_record::<Bank>(1).unwrap();
    assert_eq!(db.count_rows::<Bank>().unwrap(), 0);

    // Second delete of the same id must not be an error
    db.delete_record::<Bank>(1).unwrap();
    assert_eq!(db.count_rows::<Bank>().unwrap(), 0);
}

#[test]
fn test_failed_bulk_insert_rolls_back() {
    let (_dir, db) = setup_test_db();
    seed_parents(&db);

    // Second row violates the unique constraint on accounts.number
    let rows = vec![
        sample_account("ID--k4-bfe-12363-v", 100),
        sample_account("ID--k4-bfe-12363-v", 200),
    ];
    assert!(db.add_records(&rows).is_err());
    assert_eq!(db.count_rows::<Account>().unwrap(), 0);
}

#[test]
fn test_user_ids() {
    let (_dir, db) = setup_test_db();
    assert!(db.user_ids().unwrap().is_empty());

    db.add_records(&[
        sample_user("Andrey", "Andreev"),
        sample_user("Danil", "Danilov"),
    ])
    .unwrap();
    assert_eq!(db.user_ids().unwrap(), vec![1, 2]);
}

#[test]
fn test_transaction_round_trip() {
    let (_dir, db) = setup_test_db();
    seed_parents(&db);
    db.add_records(&[
        sample_account("ID--k4-bfe-12363-v", 100),
        sample_account("ID--zz-zz-00000-zz", 200),
    ])
    .unwrap();

    let datetime = chrono::NaiveDateTime::parse_from_str("2024-01-02 03:04:05", DATETIME_FORMAT)
        .unwrap();
    let row = Transaction::new(
        "Privat".to_string(),
        "Mono".to_string(),
        1,
        2,
        "USD".to_string(),
        Decimal::from(5000),
        datetime,
    );
    db.add_records(&[row]).unwrap();

    let stored = db.get_record::<Transaction>("id", &1i64).unwrap().unwrap();
    assert_eq!(stored.bank_sender_name, "Privat");
    assert_eq!(stored.sent_amount, Decimal::from(5000));
    assert_eq!(stored.datetime, datetime);
}
