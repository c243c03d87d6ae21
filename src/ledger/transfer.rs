use anyhow::{anyhow, Result};
use chrono::{NaiveDateTime, Utc};
use log::{error, info};
use rusqlite::types::Value;
use rust_decimal::Decimal;
use thiserror::Error;

use super::Ledger;
use crate::currency;
use crate::database::models::{Account, Bank, Transaction};
use crate::database::store;
use crate::validation::{self, PreconditionFailure};

/// Why a transfer was rejected. Rejections are expected outcomes: they are
/// logged, returned to the caller and leave the store untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransferRejection {
    #[error("transaction amount is negative")]
    NegativeAmount,

    #[error(transparent)]
    Precondition(#[from] PreconditionFailure),

    #[error("no exchange rate available")]
    RateUnavailable,
}

/// Outcome of a transfer attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    /// The transfer was applied and its audit record written.
    Recorded(Transaction),
    /// A precondition or the rate lookup failed; nothing was written.
    Rejected(TransferRejection),
}

impl TransferOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, TransferOutcome::Recorded(_))
    }
}

impl Ledger {
    /// Move `amount` (in the sender's currency) from one account to another.
    ///
    /// The transfer walks validation, conversion, balance application and
    /// audit recording in that order. Precondition and conversion failures
    /// reject the transfer without touching the store; once the transfer is
    /// applied, both balance updates and the audit row commit as one
    /// transaction, so a failure rolls the whole transfer back. Store
    /// errors propagate as fatal.
    pub fn perform_transaction(
        &self,
        sender_number: &str,
        receiver_number: &str,
        amount: Decimal,
        time: Option<NaiveDateTime>,
    ) -> Result<TransferOutcome> {
        if amount < Decimal::ZERO {
            error!("transaction amount is negative");
            return Ok(TransferOutcome::Rejected(TransferRejection::NegativeAmount));
        }

        let sender = self.db.get_record::<Account>("number", &sender_number)?;
        let receiver = self.db.get_record::<Account>("number", &receiver_number)?;

        let (sender, receiver) = match validation::validate_transaction(
            sender,
            sender_number,
            receiver,
            receiver_number,
            amount,
        ) {
            Ok(accounts) => accounts,
            Err(failure) => return Ok(TransferOutcome::Rejected(failure.into())),
        };

        let converted = match currency::convert_amount(
            self.rates.as_ref(),
            amount,
            &sender.currency,
            &receiver.currency,
        ) {
            Ok(converted) => converted,
            Err(e) => {
                error!("currency conversion failed: {}", e);
                return Ok(TransferOutcome::Rejected(TransferRejection::RateUnavailable));
            }
        };

        let sender_bank = self
            .db
            .get_record::<Bank>("id", &sender.bank_id)?
            .ok_or_else(|| anyhow!("bank {} of sender account {} not found", sender.bank_id, sender.id))?;
        let receiver_bank = self
            .db
            .get_record::<Bank>("id", &receiver.bank_id)?
            .ok_or_else(|| {
                anyhow!("bank {} of receiver account {} not found", receiver.bank_id, receiver.id)
            })?;

        let datetime = time.unwrap_or_else(|| Utc::now().naive_utc());
        let new_sender_balance = sender.balance - amount;
        let new_receiver_balance = receiver.balance + converted;

        let recorded = self.db.with_transaction(|tx| {
            store::update_record::<Account>(
                tx,
                &[("amount", Value::Text(new_sender_balance.to_string()))],
                sender.id,
            )?;
            store::update_record::<Account>(
                tx,
                &[("amount", Value::Text(new_receiver_balance.to_string()))],
                receiver.id,
            )?;
            let row = Transaction::new(
                sender_bank.name.clone(),
                receiver_bank.name.clone(),
                sender.id,
                receiver.id,
                sender.currency.clone(),
                amount,
                datetime,
            );
            store::insert_rows(tx, std::slice::from_ref(&row))?;
            Ok(Transaction {
                id: tx.last_insert_rowid(),
                ..row
            })
        })?;

        info!("transaction performed successfully");
        Ok(TransferOutcome::Recorded(recorded))
    }
}
