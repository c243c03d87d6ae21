use log::{error, info};
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::database::models::{Account, AccountSeed, VALID_STATUSES, VALID_TYPES};

/// Exact length an account number must have after normalization.
pub const ACCOUNT_NUMBER_LENGTH: usize = 18;

/// Literal prefix every account number starts with.
pub const ACCOUNT_NUMBER_PREFIX: &str = "ID--";

/// Special characters normalized to the separator before validation.
const SPECIAL_CHARACTERS_PATTERN: &str = "[#%_?&]";

/// Short alphabetic code followed by a hyphen and digits, required somewhere
/// inside the account number.
const ID_PATTERN: &str = r"[a-zA-Z]{1,3}-\d+";

/// Account data validation error
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("account number {0} has too many characters")]
    NumberTooLong(String),

    #[error("account number {0} has too few characters")]
    NumberTooShort(String),

    #[error("account number {0} should start with ID--")]
    WrongNumberPrefix(String),

    #[error("account number {0} is missing a letter-code/digit id")]
    MissingNumberId(String),

    #[error("invalid value {value:?} for field {field}")]
    InvalidValue { field: String, value: String },

    #[error("internal validation error: {0}")]
    Internal(String),
}

fn pattern(re: &str) -> Result<Regex, ValidationError> {
    Regex::new(re).map_err(|e| ValidationError::Internal(e.to_string()))
}

/// Validate the format of an account number.
///
/// Special characters are first normalized to the separator; the normalized
/// number must then be exactly 18 characters, start with `ID--` and contain
/// a 1-3 letter code followed by a hyphen and digits. Checks run in that
/// order, so a number violating several rules reports the first one.
pub fn validate_account_number(account_number: &str) -> Result<(), ValidationError> {
    let normalized = pattern(SPECIAL_CHARACTERS_PATTERN)?
        .replace_all(account_number, "-")
        .into_owned();

    let length = normalized.chars().count();
    if length > ACCOUNT_NUMBER_LENGTH {
        return Err(ValidationError::NumberTooLong(normalized));
    }
    if length < ACCOUNT_NUMBER_LENGTH {
        return Err(ValidationError::NumberTooShort(normalized));
    }

    if !normalized.starts_with(ACCOUNT_NUMBER_PREFIX) {
        return Err(ValidationError::WrongNumberPrefix(normalized));
    }

    if !pattern(ID_PATTERN)?.is_match(&normalized) {
        return Err(ValidationError::MissingNumberId(normalized));
    }

    info!("account number {} validated", normalized);
    Ok(())
}

/// Validate a field against a set of valid values.
pub fn validate_strict_field(
    value: &str,
    valid_values: &[&str],
    field_name: &str,
) -> Result<(), ValidationError> {
    if !valid_values.contains(&value) {
        return Err(ValidationError::InvalidValue {
            field: field_name.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Validate the `type` field of an account.
pub fn validate_account_type(account_type: &str) -> Result<(), ValidationError> {
    validate_strict_field(account_type, VALID_TYPES, "type")
}

/// Validate the `status` field of an account.
pub fn validate_account_status(account_status: &str) -> Result<(), ValidationError> {
    validate_strict_field(account_status, VALID_STATUSES, "status")
}

/// Why a transfer did not pass its preconditions. Expected outcome, not a
/// fatal error: the processor logs it and leaves the store untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PreconditionFailure {
    #[error("sender account number {0} not found")]
    SenderNotFound(String),

    #[error("receiver account number {0} not found")]
    ReceiverNotFound(String),

    #[error("sender balance is less than the amount being sent")]
    InsufficientFunds,
}

fn rejected(failure: PreconditionFailure) -> PreconditionFailure {
    error!("{}", failure);
    failure
}

/// Check the preconditions of a transfer: both accounts exist and the sender
/// can cover the amount. Existence is checked before solvency so a missing
/// sender never reads like an empty one. The first failing condition is
/// logged and returned; on success both accounts are handed back to the
/// caller.
pub fn validate_transaction(
    sender: Option<Account>,
    sender_number: &str,
    receiver: Option<Account>,
    receiver_number: &str,
    amount: Decimal,
) -> Result<(Account, Account), PreconditionFailure> {
    let Some(sender) = sender else {
        return Err(rejected(PreconditionFailure::SenderNotFound(
            sender_number.to_string(),
        )));
    };
    let Some(receiver) = receiver else {
        return Err(rejected(PreconditionFailure::ReceiverNotFound(
            receiver_number.to_string(),
        )));
    };
    if sender.balance < amount {
        return Err(rejected(PreconditionFailure::InsufficientFunds));
    }
    Ok((sender, receiver))
}

/// Validate every account in a bulk-insert batch. The first failure aborts
/// the whole batch, so nothing is partially inserted.
pub fn validate_accounts_data(accounts_data: &[AccountSeed]) -> Result<(), ValidationError> {
    for account in accounts_data {
        validate_account_number(&account.number)?;
        validate_account_type(&account.account_type)?;
        validate_account_status(&account.status)?;
    }
    Ok(())
}
