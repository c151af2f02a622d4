//! Treatment billing.
//!
//! A treatment's bill is the sum of its medicine lines (price × quantity),
//! the treatment charge of every distinct doctor involved, and its extra
//! fees. `bill_settled` records what the patient's account has already been
//! charged, so each reconciliation applies only the difference.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::BillingResult;
use crate::ledger::{self, LedgerReason};
use crate::models::{
    BillBreakdown, MedicineLine, NewTreatment, Treatment, TreatmentMedicine, TreatmentStatus, TreatmentUpdate,
};
use crate::repository::UnitOfWork;
use crate::stock;

impl BillBreakdown {
    /// Sum the three bill sources. Empty inputs contribute zero.
    pub fn compute(
        medicine_lines: impl IntoIterator<Item = (Decimal, u32)>,
        doctor_charges: impl IntoIterator<Item = Decimal>,
        extra_fees: impl IntoIterator<Item = Decimal>,
    ) -> Self {
        let medicine_bill = medicine_lines
            .into_iter()
            .map(|(price, quantity)| price * Decimal::from(quantity))
            .sum::<Decimal>();
        let doctor_bill = doctor_charges.into_iter().sum::<Decimal>();
        let extra_fee_bill = extra_fees.into_iter().sum::<Decimal>();

        Self {
            medicine_bill,
            doctor_bill,
            extra_fee_bill,
            total: medicine_bill + doctor_bill + extra_fee_bill,
        }
    }
}

/// Current bill of `treatment`, read through the unit of work
pub async fn total_bill(uow: &mut dyn UnitOfWork, treatment: &Treatment) -> BillingResult<BillBreakdown> {
    let mut medicine_lines = Vec::new();
    for line in uow.treatment_medicines(treatment.id).await? {
        let medicine = uow.medicine(line.medicine_id).await?;
        medicine_lines.push((medicine.price, line.quantity));
    }

    // doctor_ids is a set, so each doctor is charged once
    let mut doctor_charges = Vec::with_capacity(treatment.doctor_ids.len());
    for doctor_id in &treatment.doctor_ids {
        let profile = uow.doctor(*doctor_id).await?;
        doctor_charges.push(profile.speciality.treatment_charges);
    }

    let mut extra_fees = Vec::with_capacity(treatment.extra_fee_ids.len());
    for extra_fee_id in &treatment.extra_fee_ids {
        extra_fees.push(uow.extra_fee(*extra_fee_id).await?.amount);
    }

    Ok(BillBreakdown::compute(medicine_lines, doctor_charges, extra_fees))
}

/// Bring the patient's account in line with the treatment's current bill.
///
/// Persists the treatment when `bill_settled` moves.
pub async fn reconcile(
    uow: &mut dyn UnitOfWork,
    treatment: &mut Treatment,
    now: DateTime<Utc>,
) -> BillingResult<BillBreakdown> {
    let bill = total_bill(uow, treatment).await?;
    let delta = bill.total - treatment.bill_settled;

    if delta.is_zero() {
        debug!(treatment_id = %treatment.id, total = %bill.total, "Treatment bill unchanged");
        return Ok(bill);
    }

    let account_id = ledger::account_id_for_patient(uow, treatment.patient_id).await?;
    ledger::adjust(uow, account_id, -delta, LedgerReason::TreatmentReconciliation, now).await?;

    treatment.bill_settled = bill.total;
    treatment.updated_at = now;
    uow.update_treatment(treatment).await?;

    info!(
        treatment_id = %treatment.id,
        previous = %(bill.total - delta),
        total = %bill.total,
        "Treatment bill reconciled"
    );
    Ok(bill)
}

/// Reject unknown doctors and fees before they are linked
async fn check_links(
    uow: &mut dyn UnitOfWork,
    doctor_ids: &BTreeSet<Uuid>,
    extra_fee_ids: &BTreeSet<Uuid>,
) -> BillingResult<()> {
    for doctor_id in doctor_ids {
        uow.doctor(*doctor_id).await?;
    }
    for extra_fee_id in extra_fee_ids {
        uow.extra_fee(*extra_fee_id).await?;
    }
    Ok(())
}

pub async fn create(
    uow: &mut dyn UnitOfWork,
    request: NewTreatment,
    now: DateTime<Utc>,
) -> BillingResult<Treatment> {
    uow.patient(request.patient_id).await?;

    let doctor_ids: BTreeSet<Uuid> = request.doctor_ids.into_iter().collect();
    let extra_fee_ids: BTreeSet<Uuid> = request.extra_fee_ids.into_iter().collect();
    check_links(uow, &doctor_ids, &extra_fee_ids).await?;

    let mut treatment = Treatment {
        id: Uuid::new_v4(),
        patient_id: request.patient_id,
        patient_type: request.patient_type,
        diagnosis: request.diagnosis,
        details: request.details,
        treatment_status: TreatmentStatus::InProgress,
        doctor_ids,
        extra_fee_ids,
        bill_settled: Decimal::ZERO,
        created_at: now,
        updated_at: now,
    };
    uow.insert_treatment(&treatment).await?;

    for line in request.medicines {
        stock::attach_medicine(uow, &treatment, line, now).await?;
    }

    reconcile(uow, &mut treatment, now).await?;

    info!(treatment_id = %treatment.id, bill = %treatment.bill_settled, "Treatment created");
    Ok(treatment)
}

pub async fn update(
    uow: &mut dyn UnitOfWork,
    treatment_id: Uuid,
    changes: TreatmentUpdate,
    now: DateTime<Utc>,
) -> BillingResult<Treatment> {
    let mut treatment = uow.treatment_for_update(treatment_id).await?;

    if let Some(patient_type) = changes.patient_type {
        treatment.patient_type = patient_type;
    }
    if let Some(diagnosis) = changes.diagnosis {
        treatment.diagnosis = diagnosis;
    }
    if let Some(details) = changes.details {
        treatment.details = details;
    }
    if let Some(status) = changes.treatment_status {
        treatment.treatment_status = status;
    }
    if let Some(doctor_ids) = changes.doctor_ids {
        treatment.doctor_ids = doctor_ids.into_iter().collect();
    }
    if let Some(extra_fee_ids) = changes.extra_fee_ids {
        treatment.extra_fee_ids = extra_fee_ids.into_iter().collect();
    }

    check_links(uow, &treatment.doctor_ids, &treatment.extra_fee_ids).await?;

    treatment.updated_at = now;
    uow.update_treatment(&treatment).await?;
    reconcile(uow, &mut treatment, now).await?;

    Ok(treatment)
}

/// Attach a medicine line and reconcile the bill
pub async fn attach_medicine(
    uow: &mut dyn UnitOfWork,
    treatment_id: Uuid,
    line: MedicineLine,
    now: DateTime<Utc>,
) -> BillingResult<(TreatmentMedicine, Treatment)> {
    let mut treatment = uow.treatment_for_update(treatment_id).await?;
    let attached = stock::attach_medicine(uow, &treatment, line, now).await?;
    reconcile(uow, &mut treatment, now).await?;

    Ok((attached, treatment))
}

/// Remove a medicine line and reconcile the bill. Stock is not restored.
pub async fn remove_medicine(
    uow: &mut dyn UnitOfWork,
    line_id: Uuid,
    now: DateTime<Utc>,
) -> BillingResult<Treatment> {
    let line = uow.treatment_medicine(line_id).await?;
    let mut treatment = uow.treatment_for_update(line.treatment_id).await?;
    uow.delete_treatment_medicine(line.id).await?;
    reconcile(uow, &mut treatment, now).await?;

    Ok(treatment)
}
