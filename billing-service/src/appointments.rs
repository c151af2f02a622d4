//! Appointment lifecycle.
//!
//! Scheduled is the only non-terminal state. A booking is charged once when it
//! is created and refunded once when it leaves Scheduled for Cancelled, or is
//! deleted while still Scheduled. The refund is the amount recorded on the
//! booking, whichever doctor holds it by then.
//!
//! Availability and capacity are re-checked whenever the doctor or the time
//! changes. A request that cancels ignores any doctor or time it carries.

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::availability;
use crate::error::{BillingError, BillingResult};
use crate::ledger::{self, LedgerReason};
use crate::models::{Appointment, AppointmentStatus, AppointmentUpdate, NewAppointment, Speciality};
use crate::repository::UnitOfWork;

/// Ledger correction applied when an appointment moves to another doctor.
///
/// The result is a ledger delta; the booking's `charged_amount` moves by the
/// opposite amount so a later refund returns exactly what was charged.
/// Reassignment never re-prices the booking.
pub fn reassignment_charge_delta(_previous: &Speciality, _next: &Speciality) -> Decimal {
    Decimal::ZERO
}

/// Charge shown for an appointment: nothing once it is cancelled
pub fn displayed_charge(appointment: &Appointment) -> Decimal {
    match appointment.status {
        AppointmentStatus::Cancelled => Decimal::ZERO,
        AppointmentStatus::Scheduled | AppointmentStatus::Completed => appointment.charged_amount,
    }
}

fn ensure_future(instant: DateTime<Utc>, now: DateTime<Utc>) -> BillingResult<()> {
    if instant <= now {
        return Err(BillingError::InvalidInput(format!(
            "appointment time {} is not in the future",
            instant
        )));
    }
    Ok(())
}

/// Load an appointment for update, hiding appointments of other patients
async fn owned_appointment(
    uow: &mut dyn UnitOfWork,
    patient_id: Uuid,
    appointment_id: Uuid,
) -> BillingResult<Appointment> {
    let appointment = uow.appointment_for_update(appointment_id).await?;
    if appointment.patient_id != patient_id {
        return Err(BillingError::not_found("appointment", appointment_id));
    }
    Ok(appointment)
}

async fn refund(uow: &mut dyn UnitOfWork, appointment: &Appointment, now: DateTime<Utc>) -> BillingResult<()> {
    let account_id = ledger::account_id_for_patient(uow, appointment.patient_id).await?;
    ledger::adjust(
        uow,
        account_id,
        appointment.charged_amount,
        LedgerReason::AppointmentRefund,
        now,
    )
    .await?;
    Ok(())
}

pub async fn create(
    uow: &mut dyn UnitOfWork,
    request: NewAppointment,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> BillingResult<Appointment> {
    let account_id = ledger::account_id_for_patient(uow, request.patient_id).await?;
    let profile = uow.doctor_for_update(request.doctor_id).await?;

    ensure_future(request.appointment_datetime, now)?;
    availability::admit(uow, &profile, request.appointment_datetime, offset, None).await?;

    let appointment = Appointment {
        id: Uuid::new_v4(),
        patient_id: request.patient_id,
        doctor_id: request.doctor_id,
        appointment_datetime: request.appointment_datetime,
        reason: request.reason,
        status: AppointmentStatus::Scheduled,
        charged_amount: profile.speciality.appointment_charges,
        created_at: now,
        updated_at: now,
    };
    uow.insert_appointment(&appointment).await?;

    ledger::adjust(
        uow,
        account_id,
        -appointment.charged_amount,
        LedgerReason::AppointmentCharge,
        now,
    )
    .await?;

    info!(
        appointment_id = %appointment.id,
        doctor_id = %appointment.doctor_id,
        at = %appointment.appointment_datetime,
        "Appointment booked"
    );
    Ok(appointment)
}

pub async fn update(
    uow: &mut dyn UnitOfWork,
    patient_id: Uuid,
    appointment_id: Uuid,
    changes: AppointmentUpdate,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> BillingResult<Appointment> {
    let mut appointment = owned_appointment(uow, patient_id, appointment_id).await?;

    let current = appointment.status;
    let next = changes.status.unwrap_or(current);
    if !current.can_transition_to(next) {
        return Err(BillingError::InvalidTransition(format!(
            "appointment {} cannot go from {} to {}",
            appointment.id, current, next
        )));
    }

    let (target_doctor, target_time) = if changes.status == Some(AppointmentStatus::Cancelled) {
        (appointment.doctor_id, appointment.appointment_datetime)
    } else {
        (
            changes.doctor_id.unwrap_or(appointment.doctor_id),
            changes.appointment_datetime.unwrap_or(appointment.appointment_datetime),
        )
    };
    let doctor_changed = target_doctor != appointment.doctor_id;
    let time_changed = target_time != appointment.appointment_datetime;

    if doctor_changed || time_changed {
        if current.is_terminal() {
            return Err(BillingError::InvalidTransition(format!(
                "appointment {} is {} and cannot be rescheduled",
                appointment.id, current
            )));
        }
        if time_changed {
            ensure_future(target_time, now)?;
        }

        let profile = uow.doctor_for_update(target_doctor).await?;
        availability::admit(uow, &profile, target_time, offset, Some(appointment.id)).await?;

        if doctor_changed {
            let previous = uow.doctor(appointment.doctor_id).await?;
            let delta = reassignment_charge_delta(&previous.speciality, &profile.speciality);
            let account_id = ledger::account_id_for_patient(uow, appointment.patient_id).await?;
            ledger::adjust(uow, account_id, delta, LedgerReason::AppointmentCharge, now).await?;
            appointment.charged_amount -= delta;
        }

        appointment.doctor_id = target_doctor;
        appointment.appointment_datetime = target_time;
    }

    if let Some(reason) = changes.reason {
        appointment.reason = reason;
    }

    let cancelling = current == AppointmentStatus::Scheduled && next == AppointmentStatus::Cancelled;
    appointment.status = next;
    appointment.updated_at = now;
    uow.update_appointment(&appointment).await?;

    if cancelling {
        refund(uow, &appointment, now).await?;
        info!(appointment_id = %appointment.id, "Appointment cancelled and refunded");
    }

    Ok(appointment)
}

pub async fn cancel(
    uow: &mut dyn UnitOfWork,
    patient_id: Uuid,
    appointment_id: Uuid,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> BillingResult<Appointment> {
    let changes = AppointmentUpdate {
        status: Some(AppointmentStatus::Cancelled),
        ..Default::default()
    };
    update(uow, patient_id, appointment_id, changes, offset, now).await
}

pub async fn delete(
    uow: &mut dyn UnitOfWork,
    patient_id: Uuid,
    appointment_id: Uuid,
    now: DateTime<Utc>,
) -> BillingResult<()> {
    let appointment = owned_appointment(uow, patient_id, appointment_id).await?;

    // Cancelled bookings were refunded on cancellation
    if appointment.status == AppointmentStatus::Scheduled {
        refund(uow, &appointment, now).await?;
    }
    uow.delete_appointment(appointment.id).await?;

    info!(appointment_id = %appointment.id, status = %appointment.status, "Appointment deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn speciality(charges: Decimal) -> Speciality {
        Speciality {
            id: Uuid::new_v4(),
            name: "Cardiology".to_string(),
            appointment_charges: charges,
            treatment_charges: dec!(150),
            appointments_limit: 5,
        }
    }

    #[test]
    fn test_reassignment_never_reprices() {
        assert_eq!(reassignment_charge_delta(&speciality(dec!(100)), &speciality(dec!(400))), Decimal::ZERO);
    }

    #[test]
    fn test_displayed_charge_drops_to_zero_when_cancelled() {
        let now = Utc::now();
        let mut appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            appointment_datetime: now,
            reason: "follow-up".to_string(),
            status: AppointmentStatus::Completed,
            charged_amount: dec!(100),
            created_at: now,
            updated_at: now,
        };
        assert_eq!(displayed_charge(&appointment), dec!(100));

        appointment.status = AppointmentStatus::Cancelled;
        assert_eq!(displayed_charge(&appointment), Decimal::ZERO);
    }
}
