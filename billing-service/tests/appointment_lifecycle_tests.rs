//! Appointment booking, rescheduling, cancellation and deletion against the
//! in-memory store.

mod common;

use billing_service::*;
use common::{local, Fixture};
use error_common::{Classify, ErrorKind};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

// 2024-06-03 is a Monday, 2024-06-04 a Tuesday

#[tokio::test]
async fn test_book_then_cancel_restores_balance() {
    let fx = Fixture::new();
    let cardiology = fx.speciality(dec!(100), dec!(150), 5).await;
    let doctor = fx.doctor(&cardiology, &[WorkingDay::Monday], Shift::Day).await;
    let alice = fx.patient("alice").await;
    assert_eq!(fx.balance(&alice).await, Decimal::ZERO);

    let appointment = fx.book(&alice, &doctor, "2024-06-03 10:00").await.unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Scheduled);
    assert_eq!(fx.balance(&alice).await, dec!(-100));

    let cancelled = fx
        .service
        .cancel_appointment(Fixture::patient_id(&alice), appointment.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert_eq!(fx.balance(&alice).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_second_cancel_does_not_double_credit() {
    let fx = Fixture::new();
    let speciality = fx.speciality(dec!(100), dec!(0), 5).await;
    let doctor = fx.doctor(&speciality, &[WorkingDay::Monday], Shift::Day).await;
    let alice = fx.patient("alice").await;
    let patient_id = Fixture::patient_id(&alice);

    let appointment = fx.book(&alice, &doctor, "2024-06-03 10:00").await.unwrap();
    fx.service.cancel_appointment(patient_id, appointment.id).await.unwrap();
    fx.service.cancel_appointment(patient_id, appointment.id).await.unwrap();

    assert_eq!(fx.balance(&alice).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_off_shift_booking_is_rejected_without_charge() {
    let fx = Fixture::new();
    let speciality = fx.speciality(dec!(100), dec!(0), 5).await;
    let doctor = fx.doctor(&speciality, &[WorkingDay::Monday], Shift::Day).await;
    let alice = fx.patient("alice").await;

    let evening = fx.book(&alice, &doctor, "2024-06-03 20:00").await.unwrap_err();
    assert!(matches!(evening, BillingError::DoctorUnavailable { .. }));
    assert_eq!(evening.kind(), ErrorKind::DoctorUnavailable);

    let tuesday = fx.book(&alice, &doctor, "2024-06-04 10:00").await.unwrap_err();
    assert!(matches!(tuesday, BillingError::DoctorUnavailable { .. }));

    assert_eq!(fx.balance(&alice).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_capacity_counts_cancelled_bookings() {
    let fx = Fixture::new();
    let speciality = fx.speciality(dec!(50), dec!(0), 2).await;
    let doctor = fx.doctor(&speciality, &[WorkingDay::Monday], Shift::Day).await;
    let alice = fx.patient("alice").await;
    let bob = fx.patient("bob").await;

    let first = fx.book(&alice, &doctor, "2024-06-03 09:00").await.unwrap();
    fx.book(&bob, &doctor, "2024-06-03 11:00").await.unwrap();
    fx.service
        .cancel_appointment(Fixture::patient_id(&alice), first.id)
        .await
        .unwrap();

    let err = fx.book(&alice, &doctor, "2024-06-03 15:00").await.unwrap_err();
    match err {
        BillingError::CapacityExceeded { limit, date, .. } => {
            assert_eq!(limit, 2);
            assert_eq!(date.to_string(), "2024-06-03");
        }
        other => panic!("expected CapacityExceeded, got {:?}", other),
    }

    // Next Monday is a fresh day
    fx.book(&alice, &doctor, "2024-06-10 15:00").await.unwrap();
    assert_eq!(fx.balance(&alice).await, dec!(-50));
}

#[tokio::test]
async fn test_past_times_are_invalid() {
    let fx = Fixture::new();
    let speciality = fx.speciality(dec!(50), dec!(0), 2).await;
    let doctor = fx.doctor(&speciality, &[WorkingDay::Friday], Shift::Day).await;
    let alice = fx.patient("alice").await;

    let err = fx.book(&alice, &doctor, "2024-05-31 10:00").await.unwrap_err();
    assert!(matches!(err, BillingError::InvalidInput(_)));
}

#[tokio::test]
async fn test_time_at_end_of_calendar_is_invalid() {
    let fx = Fixture::new();
    let speciality = fx.speciality(dec!(50), dec!(0), 2).await;
    let doctor = fx.doctor(&speciality, &[WorkingDay::Friday], Shift::Night).await;
    let alice = fx.patient("alice").await;

    let err = fx
        .service
        .create_appointment(NewAppointment {
            patient_id: Fixture::patient_id(&alice),
            doctor_id: doctor.id,
            appointment_datetime: chrono::DateTime::<chrono::Utc>::MAX_UTC,
            reason: "consultation".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::InvalidInput(_)));
    assert_eq!(fx.balance(&alice).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_unknown_doctor_and_patient_are_not_found() {
    let fx = Fixture::new();
    let speciality = fx.speciality(dec!(50), dec!(0), 2).await;
    let doctor = fx.doctor(&speciality, &[WorkingDay::Monday], Shift::Day).await;
    let alice = fx.patient("alice").await;

    let ghost_doctor = Doctor { id: Uuid::new_v4(), ..doctor.clone() };
    let err = fx.book(&alice, &ghost_doctor, "2024-06-03 10:00").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = fx
        .service
        .create_appointment(NewAppointment {
            patient_id: Uuid::new_v4(),
            doctor_id: doctor.id,
            appointment_datetime: local("2024-06-03 10:00"),
            reason: "consultation".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_reschedule_reruns_admission_excluding_itself() {
    let fx = Fixture::new();
    let speciality = fx.speciality(dec!(100), dec!(0), 1).await;
    let doctor = fx.doctor(&speciality, &[WorkingDay::Monday], Shift::Day).await;
    let alice = fx.patient("alice").await;
    let patient_id = Fixture::patient_id(&alice);

    let appointment = fx.book(&alice, &doctor, "2024-06-03 09:00").await.unwrap();

    // Same day, limit 1: only possible because the booking does not count against itself
    let moved = fx
        .service
        .update_appointment(
            patient_id,
            appointment.id,
            AppointmentUpdate {
                appointment_datetime: Some(local("2024-06-03 14:00")),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.appointment_datetime, local("2024-06-03 14:00"));

    let err = fx
        .service
        .update_appointment(
            patient_id,
            appointment.id,
            AppointmentUpdate {
                appointment_datetime: Some(local("2024-06-03 21:00")),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::DoctorUnavailable { .. }));

    // Rejected reschedule leaves the booking where it was
    let stored = fx.repo.appointment(appointment.id).await.unwrap();
    assert_eq!(stored.appointment_datetime, local("2024-06-03 14:00"));
    assert_eq!(fx.balance(&alice).await, dec!(-100));
}

#[tokio::test]
async fn test_reassigning_doctor_keeps_booked_charge() {
    let fx = Fixture::new();
    let general = fx.speciality(dec!(100), dec!(0), 5).await;
    let surgery = fx.speciality(dec!(400), dec!(0), 5).await;
    let gp = fx.doctor(&general, &[WorkingDay::Monday], Shift::Day).await;
    let surgeon = fx.doctor(&surgery, &[WorkingDay::Monday], Shift::Day).await;
    let alice = fx.patient("alice").await;
    let patient_id = Fixture::patient_id(&alice);

    let appointment = fx.book(&alice, &gp, "2024-06-03 10:00").await.unwrap();
    fx.service
        .update_appointment(
            patient_id,
            appointment.id,
            AppointmentUpdate {
                doctor_id: Some(surgeon.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(fx.balance(&alice).await, dec!(-100));
    assert_eq!(fx.service.appointment_charge(patient_id, appointment.id).await.unwrap(), dec!(100));

    // The refund returns what was charged, not the new doctor's rate
    fx.service.cancel_appointment(patient_id, appointment.id).await.unwrap();
    assert_eq!(fx.balance(&alice).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_delete_after_reassignment_refunds_booked_charge() {
    let fx = Fixture::new();
    let surgery = fx.speciality(dec!(400), dec!(0), 5).await;
    let general = fx.speciality(dec!(100), dec!(0), 5).await;
    let surgeon = fx.doctor(&surgery, &[WorkingDay::Monday], Shift::Day).await;
    let gp = fx.doctor(&general, &[WorkingDay::Monday], Shift::Day).await;
    let alice = fx.patient("alice").await;
    let patient_id = Fixture::patient_id(&alice);

    let appointment = fx.book(&alice, &surgeon, "2024-06-03 10:00").await.unwrap();
    fx.service
        .update_appointment(
            patient_id,
            appointment.id,
            AppointmentUpdate {
                doctor_id: Some(gp.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    fx.service.delete_appointment(patient_id, appointment.id).await.unwrap();
    assert_eq!(fx.balance(&alice).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_cancel_with_new_time_still_cancels() {
    let fx = Fixture::new();
    let speciality = fx.speciality(dec!(100), dec!(0), 1).await;
    let doctor = fx.doctor(&speciality, &[WorkingDay::Monday], Shift::Day).await;
    let alice = fx.patient("alice").await;
    let bob = fx.patient("bob").await;
    let patient_id = Fixture::patient_id(&alice);

    let appointment = fx.book(&alice, &doctor, "2024-06-03 10:00").await.unwrap();
    fx.book(&bob, &doctor, "2024-06-10 10:00").await.unwrap();

    // 2024-06-10 is full, but a cancellation does not need a slot
    let cancelled = fx
        .service
        .update_appointment(
            patient_id,
            appointment.id,
            AppointmentUpdate {
                status: Some(AppointmentStatus::Cancelled),
                appointment_datetime: Some(local("2024-06-10 11:00")),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert_eq!(cancelled.appointment_datetime, local("2024-06-03 10:00"));
    assert_eq!(fx.balance(&alice).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_reassignment_checks_the_new_doctor_schedule() {
    let fx = Fixture::new();
    let speciality = fx.speciality(dec!(100), dec!(0), 5).await;
    let day = fx.doctor(&speciality, &[WorkingDay::Monday], Shift::Day).await;
    let night = fx.doctor(&speciality, &[WorkingDay::Monday], Shift::Night).await;
    let alice = fx.patient("alice").await;

    let appointment = fx.book(&alice, &day, "2024-06-03 10:00").await.unwrap();
    let err = fx
        .service
        .update_appointment(
            Fixture::patient_id(&alice),
            appointment.id,
            AppointmentUpdate {
                doctor_id: Some(night.id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::DoctorUnavailable { .. }));
}

#[tokio::test]
async fn test_terminal_states_cannot_be_left_or_moved() {
    let fx = Fixture::new();
    let speciality = fx.speciality(dec!(100), dec!(0), 5).await;
    let doctor = fx.doctor(&speciality, &[WorkingDay::Monday], Shift::Day).await;
    let alice = fx.patient("alice").await;
    let patient_id = Fixture::patient_id(&alice);

    let appointment = fx.book(&alice, &doctor, "2024-06-03 10:00").await.unwrap();
    fx.service
        .update_appointment(
            patient_id,
            appointment.id,
            AppointmentUpdate {
                status: Some(AppointmentStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let reopen = fx
        .service
        .update_appointment(
            patient_id,
            appointment.id,
            AppointmentUpdate {
                status: Some(AppointmentStatus::Scheduled),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(reopen, BillingError::InvalidTransition(_)));

    let cancel = fx.service.cancel_appointment(patient_id, appointment.id).await.unwrap_err();
    assert!(matches!(cancel, BillingError::InvalidTransition(_)));

    let moved = fx
        .service
        .update_appointment(
            patient_id,
            appointment.id,
            AppointmentUpdate {
                appointment_datetime: Some(local("2024-06-03 11:00")),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(moved, BillingError::InvalidTransition(_)));

    // Notes may still change
    let noted = fx
        .service
        .update_appointment(
            patient_id,
            appointment.id,
            AppointmentUpdate {
                reason: Some("seen, follow up in 2 weeks".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(noted.reason, "seen, follow up in 2 weeks");
    assert_eq!(fx.balance(&alice).await, dec!(-100));
}

#[tokio::test]
async fn test_delete_refunds_only_scheduled_bookings() {
    let fx = Fixture::new();
    let speciality = fx.speciality(dec!(100), dec!(0), 5).await;
    let doctor = fx.doctor(&speciality, &[WorkingDay::Monday], Shift::Day).await;
    let alice = fx.patient("alice").await;
    let patient_id = Fixture::patient_id(&alice);

    let scheduled = fx.book(&alice, &doctor, "2024-06-03 08:00").await.unwrap();
    let cancelled = fx.book(&alice, &doctor, "2024-06-03 09:00").await.unwrap();
    let completed = fx.book(&alice, &doctor, "2024-06-03 10:00").await.unwrap();
    assert_eq!(fx.balance(&alice).await, dec!(-300));

    fx.service.cancel_appointment(patient_id, cancelled.id).await.unwrap();
    fx.service
        .update_appointment(
            patient_id,
            completed.id,
            AppointmentUpdate {
                status: Some(AppointmentStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(fx.balance(&alice).await, dec!(-200));

    fx.service.delete_appointment(patient_id, scheduled.id).await.unwrap();
    assert_eq!(fx.balance(&alice).await, dec!(-100));

    fx.service.delete_appointment(patient_id, cancelled.id).await.unwrap();
    fx.service.delete_appointment(patient_id, completed.id).await.unwrap();
    assert_eq!(fx.balance(&alice).await, dec!(-100));
    assert!(fx.repo.appointment(completed.id).await.is_none());
}

#[tokio::test]
async fn test_other_patients_cannot_touch_an_appointment() {
    let fx = Fixture::new();
    let speciality = fx.speciality(dec!(100), dec!(0), 5).await;
    let doctor = fx.doctor(&speciality, &[WorkingDay::Monday], Shift::Day).await;
    let alice = fx.patient("alice").await;
    let mallory = fx.patient("mallory").await;

    let appointment = fx.book(&alice, &doctor, "2024-06-03 10:00").await.unwrap();
    let intruder = Fixture::patient_id(&mallory);

    let err = fx.service.cancel_appointment(intruder, appointment.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = fx.service.delete_appointment(intruder, appointment.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(fx.balance(&alice).await, dec!(-100));
    assert_eq!(fx.balance(&mallory).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_displayed_charge_is_zero_after_cancel() {
    let fx = Fixture::new();
    let speciality = fx.speciality(dec!(75.50), dec!(0), 5).await;
    let doctor = fx.doctor(&speciality, &[WorkingDay::Monday], Shift::Day).await;
    let alice = fx.patient("alice").await;
    let patient_id = Fixture::patient_id(&alice);

    let appointment = fx.book(&alice, &doctor, "2024-06-03 10:00").await.unwrap();
    assert_eq!(fx.service.appointment_charge(patient_id, appointment.id).await.unwrap(), dec!(75.50));

    fx.service.cancel_appointment(patient_id, appointment.id).await.unwrap();
    assert_eq!(fx.service.appointment_charge(patient_id, appointment.id).await.unwrap(), Decimal::ZERO);
}

#[tokio::test]
async fn test_failed_commit_leaves_no_booking_and_no_charge() {
    let fx = Fixture::new();
    let speciality = fx.speciality(dec!(100), dec!(0), 5).await;
    let doctor = fx.doctor(&speciality, &[WorkingDay::Monday], Shift::Day).await;
    let alice = fx.patient("alice").await;

    fx.repo.fail_next_commit();
    let err = fx.book(&alice, &doctor, "2024-06-03 10:00").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
    assert_eq!(fx.balance(&alice).await, Decimal::ZERO);

    // Capacity was not consumed either
    let spec_one = fx.speciality(dec!(100), dec!(0), 1).await;
    let busy = fx.doctor(&spec_one, &[WorkingDay::Monday], Shift::Day).await;
    fx.repo.fail_next_commit();
    fx.book(&alice, &busy, "2024-06-03 10:00").await.unwrap_err();
    fx.book(&alice, &busy, "2024-06-03 11:00").await.unwrap();
}

#[tokio::test]
async fn test_concurrent_bookings_never_exceed_capacity() {
    let fx = std::sync::Arc::new(Fixture::new());
    let speciality = fx.speciality(dec!(10), dec!(0), 3).await;
    let doctor = fx.doctor(&speciality, &[WorkingDay::Monday], Shift::Day).await;

    let mut patients = Vec::new();
    for i in 0..8 {
        patients.push(fx.patient(&format!("patient-{}", i)).await);
    }

    let mut handles = Vec::new();
    for patient in patients.clone() {
        let fx = fx.clone();
        let doctor = doctor.clone();
        handles.push(tokio::spawn(async move { fx.book(&patient, &doctor, "2024-06-03 10:00").await }));
    }

    let mut booked = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => booked += 1,
            Err(err) => assert!(matches!(err, BillingError::CapacityExceeded { .. })),
        }
    }
    assert_eq!(booked, 3);

    let mut total = Decimal::ZERO;
    for patient in &patients {
        total += fx.balance(patient).await;
    }
    assert_eq!(total, dec!(-30));
}
