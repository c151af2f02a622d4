#![allow(dead_code)]

use billing_service::*;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

pub fn nairobi() -> FixedOffset {
    FixedOffset::east_opt(3 * 3600).unwrap()
}

/// Saturday 2024-06-01 09:00 in Nairobi
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap()
}

/// Hospital-local wall time
pub fn local(date: &str) -> DateTime<Utc> {
    billing_service::availability::parse_instant(date, nairobi()).unwrap()
}

pub struct Fixture {
    pub repo: Arc<InMemoryBillingRepository>,
    pub service: BillingService,
}

impl Fixture {
    pub fn new() -> Self {
        let repo = Arc::new(InMemoryBillingRepository::new());
        let service = BillingService::new(repo.clone(), nairobi()).with_clock(Arc::new(FixedClock::new(now())));
        Self { repo, service }
    }

    pub async fn speciality(&self, appointment_charges: Decimal, treatment_charges: Decimal, limit: u32) -> Speciality {
        let speciality = Speciality {
            id: Uuid::new_v4(),
            name: format!("speciality-{}", Uuid::new_v4()),
            appointment_charges,
            treatment_charges,
            appointments_limit: limit,
        };
        self.repo.insert_speciality(speciality.clone()).await;
        speciality
    }

    pub async fn doctor(&self, speciality: &Speciality, days: &[WorkingDay], shift: Shift) -> Doctor {
        let doctor = Doctor {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            speciality_id: speciality.id,
            working_days: days.iter().copied().collect::<BTreeSet<_>>(),
            shift,
        };
        self.repo.insert_doctor(doctor.clone()).await;
        doctor
    }

    pub async fn patient(&self, username: &str) -> RegisteredUser {
        self.service
            .register_user(NewUser {
                username: username.to_string(),
                role: UserRole::Patient,
                email: Some(format!("{}@example.com", username)),
                phone_number: Some("+254712345678".to_string()),
            })
            .await
            .unwrap()
    }

    pub async fn medicine(&self, name: &str, price: Decimal, stock: u32) -> Medicine {
        let medicine = Medicine {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: MedicineCategory::Antibiotics,
            price,
            stock,
            expiry_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        };
        self.repo.insert_medicine(medicine.clone()).await;
        medicine
    }

    pub async fn extra_fee(&self, name: &str, amount: Decimal) -> ExtraFee {
        let fee = ExtraFee {
            id: Uuid::new_v4(),
            name: name.to_string(),
            details: String::new(),
            amount,
        };
        self.repo.insert_extra_fee(fee.clone()).await;
        fee
    }

    pub async fn balance(&self, registered: &RegisteredUser) -> Decimal {
        self.service.account_for(registered.user.id).await.unwrap().balance
    }

    pub fn patient_id(registered: &RegisteredUser) -> Uuid {
        registered.patient.as_ref().unwrap().id
    }

    pub async fn book(&self, registered: &RegisteredUser, doctor: &Doctor, at: &str) -> BillingResult<Appointment> {
        self.service
            .create_appointment(NewAppointment {
                patient_id: Self::patient_id(registered),
                doctor_id: doctor.id,
                appointment_datetime: local(at),
                reason: "consultation".to_string(),
            })
            .await
    }
}
