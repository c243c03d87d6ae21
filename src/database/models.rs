use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{Type, Value};
use rusqlite::Row;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::database::store::Record;

/// Storage format for transaction timestamps.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Storage format for birth dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Valid values for the account `type` column.
pub const VALID_TYPES: &[&str] = &["credit", "debit"];

/// Valid values for the account `status` column.
pub const VALID_STATUSES: &[&str] = &["gold", "silver", "platinum"];

fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(text.trim())
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(text) => NaiveDate::parse_from_str(&text, DATE_FORMAT)
            .map(Some)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        None => Ok(None),
    }
}

/// Account type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum AccountType {
    Credit,
    Debit,
}

impl AccountType {
    pub fn as_str(&self) -> &str {
        match self {
            AccountType::Credit => "credit",
            AccountType::Debit => "debit",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "credit" => Ok(AccountType::Credit),
            "debit" => Ok(AccountType::Debit),
            _ => Err(format!("Invalid account type: {}", s)),
        }
    }
}

/// Account status
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Gold,
    Silver,
    Platinum,
}

impl AccountStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AccountStatus::Gold => "gold",
            AccountStatus::Silver => "silver",
            AccountStatus::Platinum => "platinum",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "gold" => Ok(AccountStatus::Gold),
            "silver" => Ok(AccountStatus::Silver),
            "platinum" => Ok(AccountStatus::Platinum),
            _ => Err(format!("Invalid account status: {}", s)),
        }
    }
}

/// User model. The id is assigned by the store on insert.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub birth_day: Option<NaiveDate>,
    /// Account numbers owned by the user, persisted comma-joined.
    pub accounts: Vec<String>,
}

impl User {
    pub fn new(
        name: String,
        surname: String,
        birth_day: Option<NaiveDate>,
        accounts: Vec<String>,
    ) -> Self {
        Self {
            id: 0,
            name,
            surname,
            birth_day,
            accounts,
        }
    }
}

impl Record for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["name", "surname", "birth_day", "accounts"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let accounts: String = row.get(4)?;
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            surname: row.get(2)?,
            birth_day: date_column(row, 3)?,
            accounts: accounts
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        })
    }

    fn insert_values(&self) -> Vec<Value> {
        vec![
            Value::from(self.name.clone()),
            Value::from(self.surname.clone()),
            Value::from(self.birth_day.map(|d| d.format(DATE_FORMAT).to_string())),
            Value::from(self.accounts.join(",")),
        ]
    }
}

/// Bank model
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Bank {
    pub id: i64,
    pub name: String,
}

impl Bank {
    pub fn new(name: String) -> Self {
        Self { id: 0, name }
    }
}

impl Record for Bank {
    const TABLE: &'static str = "banks";
    const COLUMNS: &'static [&'static str] = &["name"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Bank {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }

    fn insert_values(&self) -> Vec<Value> {
        vec![Value::from(self.name.clone())]
    }
}

/// Account model. Balances are signed decimals; overdraft is representable.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub account_type: AccountType,
    pub number: String,
    pub bank_id: i64,
    pub currency: String,
    pub balance: Decimal,
    pub status: AccountStatus,
}

impl Account {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: i64,
        account_type: AccountType,
        number: String,
        bank_id: i64,
        currency: String,
        balance: Decimal,
        status: AccountStatus,
    ) -> Self {
        Self {
            id: 0,
            user_id,
            account_type,
            number,
            bank_id,
            currency,
            balance,
            status,
        }
    }
}

impl Record for Account {
    const TABLE: &'static str = "accounts";
    const COLUMNS: &'static [&'static str] = &[
        "user_id", "type", "number", "bank_id", "currency", "amount", "status",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let account_type = AccountType::from_str(&row.get::<_, String>(2)?)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into()))?;
        let status = AccountStatus::from_str(&row.get::<_, String>(7)?)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, e.into()))?;
        Ok(Account {
            id: row.get(0)?,
            user_id: row.get(1)?,
            account_type,
            number: row.get(3)?,
            bank_id: row.get(4)?,
            currency: row.get(5)?,
            balance: decimal_column(row, 6)?,
            status,
        })
    }

    fn insert_values(&self) -> Vec<Value> {
        vec![
            Value::from(self.user_id),
            Value::from(self.account_type.as_str().to_string()),
            Value::from(self.number.clone()),
            Value::from(self.bank_id),
            Value::from(self.currency.clone()),
            Value::from(self.balance.to_string()),
            Value::from(self.status.as_str().to_string()),
        ]
    }
}

/// Transaction model. Append-only audit record of a performed transfer;
/// `sent_amount` is the pre-conversion amount in the sender's currency.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub bank_sender_name: String,
    pub bank_receiver_name: String,
    pub account_sender_id: i64,
    pub account_receiver_id: i64,
    pub sent_currency: String,
    pub sent_amount: Decimal,
    pub datetime: NaiveDateTime,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bank_sender_name: String,
        bank_receiver_name: String,
        account_sender_id: i64,
        account_receiver_id: i64,
        sent_currency: String,
        sent_amount: Decimal,
        datetime: NaiveDateTime,
    ) -> Self {
        Self {
            id: 0,
            bank_sender_name,
            bank_receiver_name,
            account_sender_id,
            account_receiver_id,
            sent_currency,
            sent_amount,
            datetime,
        }
    }
}

impl Record for Transaction {
    const TABLE: &'static str = "transactions";
    const COLUMNS: &'static [&'static str] = &[
        "bank_sender_name",
        "bank_receiver_name",
        "account_sender_id",
        "account_receiver_id",
        "sent_currency",
        "sent_amount",
        "datetime",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let datetime_text: String = row.get(7)?;
        let datetime = NaiveDateTime::parse_from_str(&datetime_text, DATETIME_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;
        Ok(Transaction {
            id: row.get(0)?,
            bank_sender_name: row.get(1)?,
            bank_receiver_name: row.get(2)?,
            account_sender_id: row.get(3)?,
            account_receiver_id: row.get(4)?,
            sent_currency: row.get(5)?,
            sent_amount: decimal_column(row, 6)?,
            datetime,
        })
    }

    fn insert_values(&self) -> Vec<Value> {
        vec![
            Value::from(self.bank_sender_name.clone()),
            Value::from(self.bank_receiver_name.clone()),
            Value::from(self.account_sender_id),
            Value::from(self.account_receiver_id),
            Value::from(self.sent_currency.clone()),
            Value::from(self.sent_amount.to_string()),
            Value::from(self.datetime.format(DATETIME_FORMAT).to_string()),
        ]
    }
}

/// Pre-insert user row as it arrives from seed data: a raw full name plus
/// comma-joined account numbers. Shaped into a [`User`] before insert.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UserSeed {
    pub full_name: String,
    #[serde(default)]
    pub birth_day: Option<NaiveDate>,
    #[serde(default)]
    pub accounts: String,
}

/// Pre-insert bank row.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BankSeed {
    pub name: String,
}

/// Pre-insert account row with the enumerated fields still unparsed, so the
/// validation layer can report bad values before anything hits the store.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AccountSeed {
    pub user_id: i64,
    #[serde(rename = "type")]
    pub account_type: String,
    pub number: String,
    pub bank_id: i64,
    pub currency: String,
    pub amount: Decimal,
    pub status: String,
}
