use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};
use crate::ledger::{self, LedgerReason};
use crate::models::{Account, NewPayment, Payment};
use crate::repository::UnitOfWork;

/// Record a deposit and credit the user's account. Payments are append-only.
pub async fn record_payment(
    uow: &mut dyn UnitOfWork,
    request: NewPayment,
    now: DateTime<Utc>,
) -> BillingResult<(Payment, Account)> {
    if request.amount <= Decimal::ZERO {
        return Err(BillingError::InvalidInput(format!(
            "payment amount must be positive, got {}",
            request.amount
        )));
    }

    let user = uow.user(request.user_id).await?;
    let payment = Payment {
        id: Uuid::new_v4(),
        user_id: user.id,
        amount: request.amount,
        method: request.method,
        reference: request.reference,
        created_at: now,
    };
    uow.insert_payment(&payment).await?;

    let account = ledger::adjust(uow, user.account_id, payment.amount, LedgerReason::Payment, now).await?;

    info!(payment_id = %payment.id, method = %payment.method, amount = %payment.amount, "Payment recorded");
    Ok((payment, account))
}
