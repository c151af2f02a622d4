//! Account ledger: signed balance adjustments against a user's account.
//!
//! The ledger does not validate the resulting sign; a negative balance is
//! money owed. Callers own idempotency: appointments through their status
//! transitions, treatments through `bill_settled`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::BillingResult;
use crate::models::Account;
use crate::repository::UnitOfWork;

/// Why a balance moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerReason {
    AppointmentCharge,
    AppointmentRefund,
    TreatmentReconciliation,
    Payment,
}

impl fmt::Display for LedgerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LedgerReason::AppointmentCharge => "appointment_charge",
            LedgerReason::AppointmentRefund => "appointment_refund",
            LedgerReason::TreatmentReconciliation => "treatment_reconciliation",
            LedgerReason::Payment => "payment",
        };
        f.write_str(name)
    }
}

/// Create a zero-balance account
pub async fn open_account(uow: &mut dyn UnitOfWork, now: DateTime<Utc>) -> BillingResult<Account> {
    let account = Account {
        id: Uuid::new_v4(),
        balance: Decimal::ZERO,
        created_at: now,
        updated_at: now,
    };
    uow.insert_account(&account).await?;

    debug!(account_id = %account.id, "Account opened");
    Ok(account)
}

/// Apply `delta` to the account and persist it. Zero deltas write nothing.
pub async fn adjust(
    uow: &mut dyn UnitOfWork,
    account_id: Uuid,
    delta: Decimal,
    reason: LedgerReason,
    now: DateTime<Utc>,
) -> BillingResult<Account> {
    if delta.is_zero() {
        return uow.account(account_id).await;
    }

    let mut account = uow.account_for_update(account_id).await?;
    account.balance += delta;
    account.updated_at = now;
    uow.save_account(&account).await?;

    info!(
        account_id = %account.id,
        delta = %delta,
        balance = %account.balance,
        reason = %reason,
        "Ledger adjusted"
    );
    Ok(account)
}

/// Account of the user behind `patient_id`
pub async fn account_id_for_patient(uow: &mut dyn UnitOfWork, patient_id: Uuid) -> BillingResult<Uuid> {
    let patient = uow.patient(patient_id).await?;
    let user = uow.user(patient.user_id).await?;
    Ok(user.account_id)
}

pub async fn balance_of(uow: &mut dyn UnitOfWork, user_id: Uuid) -> BillingResult<Account> {
    let user = uow.user(user_id).await?;
    uow.account(user.account_id).await
}
