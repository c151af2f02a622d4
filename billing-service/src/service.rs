use chrono::{DateTime, FixedOffset, Utc};
use lazy_static::lazy_static;
use logger_redacted::PiiRedactor;
use regex::Regex;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::appointments;
use crate::availability;
use crate::clock::{Clock, SystemClock};
use crate::error::{BillingError, BillingResult};
use crate::ledger;
use crate::models::*;
use crate::payment;
use crate::repository::{BillingRepository, UnitOfWork};
use crate::treatments;

lazy_static! {
    static ref PHONE_NUMBER: Regex = Regex::new(r"^\+?1?\d{9,15}$").unwrap();
}

/// Entry point for every billing operation.
///
/// Each call runs in its own unit of work: admission checks, the entity write
/// and the ledger or stock write commit together or not at all.
pub struct BillingService {
    repository: Arc<dyn BillingRepository>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    redactor: PiiRedactor,
}

impl BillingService {
    /// Create a billing service for a hospital at `offset` from UTC
    pub fn new(repository: Arc<dyn BillingRepository>, offset: FixedOffset) -> Self {
        Self {
            repository,
            clock: Arc::new(SystemClock),
            offset,
            redactor: PiiRedactor::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_redactor(mut self, redactor: PiiRedactor) -> Self {
        self.redactor = redactor;
        self
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Parse a requested appointment time in hospital local time
    pub fn parse_instant(&self, raw: &str) -> BillingResult<DateTime<Utc>> {
        availability::parse_instant(raw, self.offset)
    }

    async fn begin(&self) -> BillingResult<Box<dyn UnitOfWork>> {
        self.repository.begin().await
    }

    async fn finish<T>(
        &self,
        operation: &'static str,
        uow: Box<dyn UnitOfWork>,
        result: BillingResult<T>,
    ) -> BillingResult<T> {
        let outcome = match result {
            Ok(value) => uow.commit().await.map(|_| value),
            // Dropping the unit of work rolls it back
            Err(err) => Err(err),
        };

        if let Err(err) = &outcome {
            match err {
                BillingError::Persistence(_) => error!(operation, error = %err, "Billing operation failed"),
                _ => debug!(operation, error = %err, "Billing operation rejected"),
            }
        }
        outcome
    }

    /// Create a user together with its account, and its patient profile when
    /// the role is Patient
    pub async fn register_user(&self, request: NewUser) -> BillingResult<RegisteredUser> {
        let username = request.username.trim().to_string();
        if username.is_empty() {
            return Err(BillingError::InvalidInput("username must not be empty".to_string()));
        }
        if let Some(phone) = &request.phone_number {
            if !PHONE_NUMBER.is_match(phone) {
                return Err(BillingError::InvalidInput(format!(
                    "phone number {} must be 9 to 15 digits with an optional leading +",
                    self.redactor.redact(phone)
                )));
            }
        }

        let now = self.clock.now();
        let mut uow = self.begin().await?;
        let result = register(uow.as_mut(), username, request, now).await;
        let registered = self.finish("register_user", uow, result).await?;

        let contact = [registered.user.email.as_deref(), registered.user.phone_number.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        info!(
            user_id = %registered.user.id,
            role = %registered.user.role,
            contact = %self.redactor.redact(&contact),
            "User registered"
        );
        Ok(registered)
    }

    pub async fn account_for(&self, user_id: Uuid) -> BillingResult<Account> {
        let mut uow = self.begin().await?;
        let result = ledger::balance_of(uow.as_mut(), user_id).await;
        self.finish("account_for", uow, result).await
    }

    pub async fn create_appointment(&self, request: NewAppointment) -> BillingResult<Appointment> {
        let mut uow = self.begin().await?;
        let result = appointments::create(uow.as_mut(), request, self.offset, self.clock.now()).await;
        self.finish("create_appointment", uow, result).await
    }

    pub async fn update_appointment(
        &self,
        patient_id: Uuid,
        appointment_id: Uuid,
        changes: AppointmentUpdate,
    ) -> BillingResult<Appointment> {
        let mut uow = self.begin().await?;
        let result = appointments::update(
            uow.as_mut(),
            patient_id,
            appointment_id,
            changes,
            self.offset,
            self.clock.now(),
        )
        .await;
        self.finish("update_appointment", uow, result).await
    }

    pub async fn cancel_appointment(&self, patient_id: Uuid, appointment_id: Uuid) -> BillingResult<Appointment> {
        let mut uow = self.begin().await?;
        let result =
            appointments::cancel(uow.as_mut(), patient_id, appointment_id, self.offset, self.clock.now()).await;
        self.finish("cancel_appointment", uow, result).await
    }

    pub async fn delete_appointment(&self, patient_id: Uuid, appointment_id: Uuid) -> BillingResult<()> {
        let mut uow = self.begin().await?;
        let result = appointments::delete(uow.as_mut(), patient_id, appointment_id, self.clock.now()).await;
        self.finish("delete_appointment", uow, result).await
    }

    /// Charge shown to the patient for an appointment
    pub async fn appointment_charge(&self, patient_id: Uuid, appointment_id: Uuid) -> BillingResult<Decimal> {
        let mut uow = self.begin().await?;
        let result = async {
            let appointment = uow.appointment(appointment_id).await?;
            if appointment.patient_id != patient_id {
                return Err(BillingError::not_found("appointment", appointment_id));
            }
            Ok(appointments::displayed_charge(&appointment))
        }
        .await;
        self.finish("appointment_charge", uow, result).await
    }

    pub async fn create_treatment(&self, request: NewTreatment) -> BillingResult<Treatment> {
        let mut uow = self.begin().await?;
        let result = treatments::create(uow.as_mut(), request, self.clock.now()).await;
        self.finish("create_treatment", uow, result).await
    }

    pub async fn update_treatment(&self, treatment_id: Uuid, changes: TreatmentUpdate) -> BillingResult<Treatment> {
        let mut uow = self.begin().await?;
        let result = treatments::update(uow.as_mut(), treatment_id, changes, self.clock.now()).await;
        self.finish("update_treatment", uow, result).await
    }

    pub async fn attach_medicine(&self, treatment_id: Uuid, line: MedicineLine) -> BillingResult<TreatmentMedicine> {
        let mut uow = self.begin().await?;
        let result = treatments::attach_medicine(uow.as_mut(), treatment_id, line, self.clock.now())
            .await
            .map(|(attached, _)| attached);
        self.finish("attach_medicine", uow, result).await
    }

    /// Remove a medicine line; the medicine's stock stays where it is
    pub async fn remove_medicine(&self, line_id: Uuid) -> BillingResult<Treatment> {
        let mut uow = self.begin().await?;
        let result = treatments::remove_medicine(uow.as_mut(), line_id, self.clock.now()).await;
        self.finish("remove_medicine", uow, result).await
    }

    /// Re-run reconciliation, e.g. after reference prices changed
    pub async fn reconcile_treatment_billing(&self, treatment_id: Uuid) -> BillingResult<BillBreakdown> {
        let mut uow = self.begin().await?;
        let now = self.clock.now();
        let result = async {
            let mut treatment = uow.treatment_for_update(treatment_id).await?;
            treatments::reconcile(uow.as_mut(), &mut treatment, now).await
        }
        .await;
        self.finish("reconcile_treatment_billing", uow, result).await
    }

    pub async fn treatment_bill(&self, treatment_id: Uuid) -> BillingResult<BillBreakdown> {
        let mut uow = self.begin().await?;
        let result = async {
            let treatment = uow.treatment(treatment_id).await?;
            treatments::total_bill(uow.as_mut(), &treatment).await
        }
        .await;
        self.finish("treatment_bill", uow, result).await
    }

    pub async fn record_payment(&self, request: NewPayment) -> BillingResult<(Payment, Account)> {
        let mut uow = self.begin().await?;
        let result = payment::record_payment(uow.as_mut(), request, self.clock.now()).await;
        self.finish("record_payment", uow, result).await
    }

    pub async fn is_doctor_working_now(&self, doctor_id: Uuid) -> BillingResult<bool> {
        let mut uow = self.begin().await?;
        let result = uow
            .doctor(doctor_id)
            .await
            .map(|profile| availability::is_working_now(&profile.doctor, self.clock.as_ref(), self.offset));
        self.finish("is_doctor_working_now", uow, result).await
    }
}

async fn register(
    uow: &mut dyn UnitOfWork,
    username: String,
    request: NewUser,
    now: DateTime<Utc>,
) -> BillingResult<RegisteredUser> {
    let account = ledger::open_account(uow, now).await?;

    let user = User {
        id: Uuid::new_v4(),
        username,
        role: request.role,
        email: request.email,
        phone_number: request.phone_number,
        account_id: account.id,
        created_at: now,
    };
    uow.insert_user(&user).await?;

    let patient = match user.role {
        UserRole::Patient => {
            let patient = Patient {
                id: Uuid::new_v4(),
                user_id: user.id,
                created_at: now,
            };
            uow.insert_patient(&patient).await?;
            Some(patient)
        }
        UserRole::Doctor | UserRole::Admin => None,
    };

    Ok(RegisteredUser { user, account, patient })
}
