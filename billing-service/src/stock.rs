//! Stock guard for medicine line items.
//!
//! Attaching a line decrements stock; removing one never restocks.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};
use crate::models::{MedicineLine, Treatment, TreatmentMedicine};
use crate::repository::UnitOfWork;

/// Reserve `line.quantity` units and record the line against `treatment`.
///
/// Fails without touching stock or lines when the quantity is zero or exceeds
/// what is on the shelf.
pub async fn attach_medicine(
    uow: &mut dyn UnitOfWork,
    treatment: &Treatment,
    line: MedicineLine,
    now: DateTime<Utc>,
) -> BillingResult<TreatmentMedicine> {
    if line.quantity == 0 {
        return Err(BillingError::InvalidInput("medicine quantity must be at least 1".to_string()));
    }

    let mut medicine = uow.medicine_for_update(line.medicine_id).await?;
    if medicine.stock < line.quantity {
        warn!(
            medicine_id = %medicine.id,
            available = medicine.stock,
            requested = line.quantity,
            "Insufficient stock"
        );
        return Err(BillingError::InsufficientStock {
            medicine: medicine.name,
            available: medicine.stock,
            requested: line.quantity,
        });
    }

    medicine.stock -= line.quantity;
    uow.save_medicine(&medicine).await?;

    let treatment_medicine = TreatmentMedicine {
        id: Uuid::new_v4(),
        treatment_id: treatment.id,
        medicine_id: medicine.id,
        quantity: line.quantity,
        prescription: line.prescription,
        created_at: now,
    };
    uow.insert_treatment_medicine(&treatment_medicine).await?;

    debug!(
        treatment_id = %treatment.id,
        medicine_id = %medicine.id,
        remaining = medicine.stock,
        "Medicine attached"
    );
    Ok(treatment_medicine)
}
