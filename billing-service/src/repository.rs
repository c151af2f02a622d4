use crate::{
    error::{BillingError, BillingResult},
    models::*,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

pub mod postgres;

pub use postgres::PostgresBillingRepository;

/// Opens units of work against a billing store
#[async_trait]
pub trait BillingRepository: Send + Sync {
    async fn begin(&self) -> BillingResult<Box<dyn UnitOfWork>>;
}

/// One atomic unit of work.
///
/// Every read and write goes through the same transaction. `*_for_update`
/// reads lock the row until the unit of work ends. Dropping a unit of work
/// without calling [`UnitOfWork::commit`] discards all of its writes.
#[async_trait]
pub trait UnitOfWork: Send {
    // Accounts
    async fn insert_account(&mut self, account: &Account) -> BillingResult<()>;
    async fn account(&mut self, account_id: Uuid) -> BillingResult<Account>;
    async fn account_for_update(&mut self, account_id: Uuid) -> BillingResult<Account>;
    async fn save_account(&mut self, account: &Account) -> BillingResult<()>;

    // People
    async fn insert_user(&mut self, user: &User) -> BillingResult<()>;
    async fn user(&mut self, user_id: Uuid) -> BillingResult<User>;
    async fn insert_patient(&mut self, patient: &Patient) -> BillingResult<()>;
    async fn patient(&mut self, patient_id: Uuid) -> BillingResult<Patient>;

    // Doctors and capacity
    async fn doctor(&mut self, doctor_id: Uuid) -> BillingResult<DoctorProfile>;
    async fn doctor_for_update(&mut self, doctor_id: Uuid) -> BillingResult<DoctorProfile>;

    /// Appointments of `doctor_id` with `from <= datetime < to`, any status
    async fn count_doctor_appointments_between(
        &mut self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        excluding: Option<Uuid>,
    ) -> BillingResult<u64>;

    // Appointments
    async fn insert_appointment(&mut self, appointment: &Appointment) -> BillingResult<()>;
    async fn appointment(&mut self, appointment_id: Uuid) -> BillingResult<Appointment>;
    async fn appointment_for_update(&mut self, appointment_id: Uuid) -> BillingResult<Appointment>;
    async fn update_appointment(&mut self, appointment: &Appointment) -> BillingResult<()>;
    async fn delete_appointment(&mut self, appointment_id: Uuid) -> BillingResult<()>;

    // Treatments
    async fn insert_treatment(&mut self, treatment: &Treatment) -> BillingResult<()>;
    async fn treatment(&mut self, treatment_id: Uuid) -> BillingResult<Treatment>;
    async fn treatment_for_update(&mut self, treatment_id: Uuid) -> BillingResult<Treatment>;
    /// Writes the row together with its doctor and extra-fee sets
    async fn update_treatment(&mut self, treatment: &Treatment) -> BillingResult<()>;
    async fn treatment_medicines(&mut self, treatment_id: Uuid) -> BillingResult<Vec<TreatmentMedicine>>;
    async fn insert_treatment_medicine(&mut self, line: &TreatmentMedicine) -> BillingResult<()>;
    async fn treatment_medicine(&mut self, line_id: Uuid) -> BillingResult<TreatmentMedicine>;
    async fn delete_treatment_medicine(&mut self, line_id: Uuid) -> BillingResult<()>;

    // Reference data
    async fn medicine(&mut self, medicine_id: Uuid) -> BillingResult<Medicine>;
    async fn medicine_for_update(&mut self, medicine_id: Uuid) -> BillingResult<Medicine>;
    async fn save_medicine(&mut self, medicine: &Medicine) -> BillingResult<()>;
    async fn extra_fee(&mut self, extra_fee_id: Uuid) -> BillingResult<ExtraFee>;

    // Payments
    async fn insert_payment(&mut self, payment: &Payment) -> BillingResult<()>;

    async fn commit(self: Box<Self>) -> BillingResult<()>;
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    accounts: HashMap<Uuid, Account>,
    users: HashMap<Uuid, User>,
    patients: HashMap<Uuid, Patient>,
    specialities: HashMap<Uuid, Speciality>,
    doctors: HashMap<Uuid, Doctor>,
    appointments: HashMap<Uuid, Appointment>,
    treatments: HashMap<Uuid, Treatment>,
    treatment_medicines: HashMap<Uuid, TreatmentMedicine>,
    medicines: HashMap<Uuid, Medicine>,
    extra_fees: HashMap<Uuid, ExtraFee>,
    payments: Vec<Payment>,
}

impl MemoryState {
    fn doctor_profile(&self, doctor_id: Uuid) -> BillingResult<DoctorProfile> {
        let doctor = self
            .doctors
            .get(&doctor_id)
            .cloned()
            .ok_or_else(|| BillingError::not_found("doctor", doctor_id))?;
        let speciality = self
            .specialities
            .get(&doctor.speciality_id)
            .cloned()
            .ok_or_else(|| BillingError::not_found("speciality", doctor.speciality_id))?;

        Ok(DoctorProfile { doctor, speciality })
    }
}

/// In-memory billing store for testing and development.
///
/// A unit of work holds the store's lock for its whole lifetime and works on
/// a private copy that replaces the shared state on commit, so units of work
/// are serialized and a dropped one leaves no trace.
pub struct InMemoryBillingRepository {
    state: Arc<Mutex<MemoryState>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl InMemoryBillingRepository {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            fail_next_commit: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make the next commit fail as a storage error would
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    pub async fn insert_speciality(&self, speciality: Speciality) {
        self.state.lock().await.specialities.insert(speciality.id, speciality);
    }

    pub async fn insert_doctor(&self, doctor: Doctor) {
        self.state.lock().await.doctors.insert(doctor.id, doctor);
    }

    pub async fn insert_medicine(&self, medicine: Medicine) {
        self.state.lock().await.medicines.insert(medicine.id, medicine);
    }

    pub async fn insert_extra_fee(&self, fee: ExtraFee) {
        self.state.lock().await.extra_fees.insert(fee.id, fee);
    }

    pub async fn account(&self, account_id: Uuid) -> Option<Account> {
        self.state.lock().await.accounts.get(&account_id).cloned()
    }

    pub async fn appointment(&self, appointment_id: Uuid) -> Option<Appointment> {
        self.state.lock().await.appointments.get(&appointment_id).cloned()
    }

    pub async fn treatment(&self, treatment_id: Uuid) -> Option<Treatment> {
        self.state.lock().await.treatments.get(&treatment_id).cloned()
    }

    pub async fn medicine(&self, medicine_id: Uuid) -> Option<Medicine> {
        self.state.lock().await.medicines.get(&medicine_id).cloned()
    }

    pub async fn treatment_medicines(&self, treatment_id: Uuid) -> Vec<TreatmentMedicine> {
        self.state
            .lock()
            .await
            .treatment_medicines
            .values()
            .filter(|line| line.treatment_id == treatment_id)
            .cloned()
            .collect()
    }

    pub async fn payments_for(&self, user_id: Uuid) -> Vec<Payment> {
        self.state
            .lock()
            .await
            .payments
            .iter()
            .filter(|payment| payment.user_id == user_id)
            .cloned()
            .collect()
    }
}

impl Default for InMemoryBillingRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BillingRepository for InMemoryBillingRepository {
    async fn begin(&self) -> BillingResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        let fail_commit = self.fail_next_commit.swap(false, Ordering::SeqCst);

        Ok(Box::new(InMemoryUnitOfWork {
            guard,
            working,
            fail_commit,
        }))
    }
}

struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_commit: bool,
}

fn require<T: Clone>(map: &HashMap<Uuid, T>, entity: &'static str, id: Uuid) -> BillingResult<T> {
    map.get(&id).cloned().ok_or_else(|| BillingError::not_found(entity, id))
}

fn require_present<T>(map: &HashMap<Uuid, T>, entity: &'static str, id: Uuid) -> BillingResult<()> {
    if map.contains_key(&id) {
        Ok(())
    } else {
        Err(BillingError::not_found(entity, id))
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn insert_account(&mut self, account: &Account) -> BillingResult<()> {
        self.working.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn account(&mut self, account_id: Uuid) -> BillingResult<Account> {
        require(&self.working.accounts, "account", account_id)
    }

    async fn account_for_update(&mut self, account_id: Uuid) -> BillingResult<Account> {
        require(&self.working.accounts, "account", account_id)
    }

    async fn save_account(&mut self, account: &Account) -> BillingResult<()> {
        require_present(&self.working.accounts, "account", account.id)?;
        self.working.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn insert_user(&mut self, user: &User) -> BillingResult<()> {
        if self.working.users.values().any(|existing| existing.username == user.username) {
            return Err(BillingError::InvalidInput(format!(
                "username '{}' is already taken",
                user.username
            )));
        }
        self.working.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn user(&mut self, user_id: Uuid) -> BillingResult<User> {
        require(&self.working.users, "user", user_id)
    }

    async fn insert_patient(&mut self, patient: &Patient) -> BillingResult<()> {
        self.working.patients.insert(patient.id, patient.clone());
        Ok(())
    }

    async fn patient(&mut self, patient_id: Uuid) -> BillingResult<Patient> {
        require(&self.working.patients, "patient", patient_id)
    }

    async fn doctor(&mut self, doctor_id: Uuid) -> BillingResult<DoctorProfile> {
        self.working.doctor_profile(doctor_id)
    }

    async fn doctor_for_update(&mut self, doctor_id: Uuid) -> BillingResult<DoctorProfile> {
        self.working.doctor_profile(doctor_id)
    }

    async fn count_doctor_appointments_between(
        &mut self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        excluding: Option<Uuid>,
    ) -> BillingResult<u64> {
        let count = self
            .working
            .appointments
            .values()
            .filter(|a| a.doctor_id == doctor_id)
            .filter(|a| a.appointment_datetime >= from && a.appointment_datetime < to)
            .filter(|a| Some(a.id) != excluding)
            .count();

        Ok(count as u64)
    }

    async fn insert_appointment(&mut self, appointment: &Appointment) -> BillingResult<()> {
        self.working.appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn appointment(&mut self, appointment_id: Uuid) -> BillingResult<Appointment> {
        require(&self.working.appointments, "appointment", appointment_id)
    }

    async fn appointment_for_update(&mut self, appointment_id: Uuid) -> BillingResult<Appointment> {
        require(&self.working.appointments, "appointment", appointment_id)
    }

    async fn update_appointment(&mut self, appointment: &Appointment) -> BillingResult<()> {
        require_present(&self.working.appointments, "appointment", appointment.id)?;
        self.working.appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn delete_appointment(&mut self, appointment_id: Uuid) -> BillingResult<()> {
        self.working
            .appointments
            .remove(&appointment_id)
            .map(|_| ())
            .ok_or_else(|| BillingError::not_found("appointment", appointment_id))
    }

    async fn insert_treatment(&mut self, treatment: &Treatment) -> BillingResult<()> {
        self.working.treatments.insert(treatment.id, treatment.clone());
        Ok(())
    }

    async fn treatment(&mut self, treatment_id: Uuid) -> BillingResult<Treatment> {
        require(&self.working.treatments, "treatment", treatment_id)
    }

    async fn treatment_for_update(&mut self, treatment_id: Uuid) -> BillingResult<Treatment> {
        require(&self.working.treatments, "treatment", treatment_id)
    }

    async fn update_treatment(&mut self, treatment: &Treatment) -> BillingResult<()> {
        require_present(&self.working.treatments, "treatment", treatment.id)?;
        self.working.treatments.insert(treatment.id, treatment.clone());
        Ok(())
    }

    async fn treatment_medicines(&mut self, treatment_id: Uuid) -> BillingResult<Vec<TreatmentMedicine>> {
        let mut lines: Vec<TreatmentMedicine> = self
            .working
            .treatment_medicines
            .values()
            .filter(|line| line.treatment_id == treatment_id)
            .cloned()
            .collect();
        lines.sort_by_key(|line| line.created_at);
        Ok(lines)
    }

    async fn insert_treatment_medicine(&mut self, line: &TreatmentMedicine) -> BillingResult<()> {
        self.working.treatment_medicines.insert(line.id, line.clone());
        Ok(())
    }

    async fn treatment_medicine(&mut self, line_id: Uuid) -> BillingResult<TreatmentMedicine> {
        require(&self.working.treatment_medicines, "treatment medicine", line_id)
    }

    async fn delete_treatment_medicine(&mut self, line_id: Uuid) -> BillingResult<()> {
        self.working
            .treatment_medicines
            .remove(&line_id)
            .map(|_| ())
            .ok_or_else(|| BillingError::not_found("treatment medicine", line_id))
    }

    async fn medicine(&mut self, medicine_id: Uuid) -> BillingResult<Medicine> {
        require(&self.working.medicines, "medicine", medicine_id)
    }

    async fn medicine_for_update(&mut self, medicine_id: Uuid) -> BillingResult<Medicine> {
        require(&self.working.medicines, "medicine", medicine_id)
    }

    async fn save_medicine(&mut self, medicine: &Medicine) -> BillingResult<()> {
        require_present(&self.working.medicines, "medicine", medicine.id)?;
        self.working.medicines.insert(medicine.id, medicine.clone());
        Ok(())
    }

    async fn extra_fee(&mut self, extra_fee_id: Uuid) -> BillingResult<ExtraFee> {
        require(&self.working.extra_fees, "extra fee", extra_fee_id)
    }

    async fn insert_payment(&mut self, payment: &Payment) -> BillingResult<()> {
        self.working.payments.push(payment.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> BillingResult<()> {
        let InMemoryUnitOfWork {
            mut guard,
            working,
            fail_commit,
        } = *self;

        if fail_commit {
            warn!("Injected commit failure, discarding unit of work");
            return Err(BillingError::Persistence("commit failed".to_string()));
        }

        *guard = working;
        debug!("In-memory unit of work committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn account(balance: Decimal) -> Account {
        Account {
            id: Uuid::new_v4(),
            balance,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_dropped_unit_of_work_rolls_back() {
        let repo = InMemoryBillingRepository::new();
        let acc = account(Decimal::ZERO);

        {
            let mut uow = repo.begin().await.unwrap();
            uow.insert_account(&acc).await.unwrap();
        }

        assert!(repo.account(acc.id).await.is_none());
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let repo = InMemoryBillingRepository::new();
        let mut acc = account(Decimal::ZERO);

        let mut uow = repo.begin().await.unwrap();
        uow.insert_account(&acc).await.unwrap();
        acc.balance = dec!(-100);
        uow.save_account(&acc).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(repo.account(acc.id).await.unwrap().balance, dec!(-100));
    }

    #[tokio::test]
    async fn test_injected_failure_hits_only_next_commit() {
        let repo = InMemoryBillingRepository::new();
        let acc = account(dec!(5));
        repo.fail_next_commit();

        let mut uow = repo.begin().await.unwrap();
        uow.insert_account(&acc).await.unwrap();
        assert!(matches!(uow.commit().await, Err(BillingError::Persistence(_))));
        assert!(repo.account(acc.id).await.is_none());

        let mut uow = repo.begin().await.unwrap();
        uow.insert_account(&acc).await.unwrap();
        uow.commit().await.unwrap();
        assert!(repo.account(acc.id).await.is_some());
    }

    #[tokio::test]
    async fn test_capacity_count_is_half_open_and_honours_exclusion() {
        let repo = InMemoryBillingRepository::new();
        let doctor_id = Uuid::new_v4();
        let from = Utc::now();
        let to = from + chrono::Duration::hours(24);

        let mut uow = repo.begin().await.unwrap();
        let mut ids = Vec::new();
        for at in [from, from + chrono::Duration::hours(3), to] {
            let appointment = Appointment {
                id: Uuid::new_v4(),
                patient_id: Uuid::new_v4(),
                doctor_id,
                appointment_datetime: at,
                reason: "checkup".to_string(),
                status: AppointmentStatus::Cancelled,
                charged_amount: Decimal::ZERO,
                created_at: from,
                updated_at: from,
            };
            ids.push(appointment.id);
            uow.insert_appointment(&appointment).await.unwrap();
        }

        let all = uow.count_doctor_appointments_between(doctor_id, from, to, None).await.unwrap();
        let others = uow
            .count_doctor_appointments_between(doctor_id, from, to, Some(ids[0]))
            .await
            .unwrap();
        assert_eq!(all, 2);
        assert_eq!(others, 1);
    }
}
