//! PostgreSQL-backed billing store
//!
//! Each unit of work is one transaction opened by the shared
//! [`TransactionManager`], so the `lock_timeout` guard applies to every row
//! lock taken here:
//! - doctor rows serialize capacity checks for that doctor
//! - medicine rows serialize stock decrements
//! - account rows serialize balance adjustments

use crate::{
    error::{BillingError, BillingResult},
    models::*,
    repository::{BillingRepository, UnitOfWork},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database_layer::TransactionManager;
use sqlx::{postgres::PgRow, Postgres, Row, Transaction};
use std::collections::BTreeSet;
use tracing::debug;
use uuid::Uuid;

/// PostgreSQL billing repository
#[derive(Clone)]
pub struct PostgresBillingRepository {
    transactions: TransactionManager,
}

impl PostgresBillingRepository {
    pub fn new(transactions: TransactionManager) -> Self {
        Self { transactions }
    }
}

#[async_trait]
impl BillingRepository for PostgresBillingRepository {
    async fn begin(&self) -> BillingResult<Box<dyn UnitOfWork>> {
        let tx = self.transactions.begin().await?;
        Ok(Box::new(PostgresUnitOfWork { tx }))
    }
}

struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

fn storage(context: &str) -> impl FnOnce(sqlx::Error) -> BillingError + '_ {
    move |e| BillingError::Persistence(format!("{}: {}", context, e))
}

/// Unique violation on `users.username`
fn is_duplicate_username(err: &sqlx::Error) -> bool {
    err.as_database_error().map_or(false, |db| {
        db.code().as_deref() == Some("23505") && db.constraint() == Some("users_username_key")
    })
}

fn to_u32(value: i32, column: &str) -> BillingResult<u32> {
    u32::try_from(value)
        .map_err(|_| BillingError::Persistence(format!("negative value {} in {}", value, column)))
}

fn to_i32(value: u32, column: &str) -> BillingResult<i32> {
    i32::try_from(value)
        .map_err(|_| BillingError::InvalidInput(format!("{} value {} is too large", column, value)))
}

fn account_from_row(row: &PgRow) -> BillingResult<Account> {
    Ok(Account {
        id: row.try_get("id")?,
        balance: row.try_get("balance")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn user_from_row(row: &PgRow) -> BillingResult<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        role: role.parse()?,
        email: row.try_get("email")?,
        phone_number: row.try_get("phone_number")?,
        account_id: row.try_get("account_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn doctor_profile_from_row(row: &PgRow) -> BillingResult<DoctorProfile> {
    let shift: String = row.try_get("shift")?;
    let days: Vec<String> = row.try_get("working_days")?;
    let working_days = days
        .iter()
        .map(|day| day.parse::<WorkingDay>())
        .collect::<BillingResult<BTreeSet<_>>>()?;
    let limit: i32 = row.try_get("appointments_limit")?;

    Ok(DoctorProfile {
        doctor: Doctor {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            speciality_id: row.try_get("speciality_id")?,
            working_days,
            shift: shift.parse()?,
        },
        speciality: Speciality {
            id: row.try_get("speciality_id")?,
            name: row.try_get("speciality_name")?,
            appointment_charges: row.try_get("appointment_charges")?,
            treatment_charges: row.try_get("treatment_charges")?,
            appointments_limit: to_u32(limit, "appointments_limit")?,
        },
    })
}

fn appointment_from_row(row: &PgRow) -> BillingResult<Appointment> {
    let status: String = row.try_get("status")?;
    Ok(Appointment {
        id: row.try_get("id")?,
        patient_id: row.try_get("patient_id")?,
        doctor_id: row.try_get("doctor_id")?,
        appointment_datetime: row.try_get("appointment_datetime")?,
        reason: row.try_get("reason")?,
        status: status.parse()?,
        charged_amount: row.try_get("charged_amount")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn medicine_from_row(row: &PgRow) -> BillingResult<Medicine> {
    let category: String = row.try_get("category")?;
    let stock: i32 = row.try_get("stock")?;
    Ok(Medicine {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        category: category.parse()?,
        price: row.try_get("price")?,
        stock: to_u32(stock, "stock")?,
        expiry_date: row.try_get("expiry_date")?,
    })
}

fn treatment_medicine_from_row(row: &PgRow) -> BillingResult<TreatmentMedicine> {
    let quantity: i32 = row.try_get("quantity")?;
    Ok(TreatmentMedicine {
        id: row.try_get("id")?,
        treatment_id: row.try_get("treatment_id")?,
        medicine_id: row.try_get("medicine_id")?,
        quantity: to_u32(quantity, "quantity")?,
        prescription: row.try_get("prescription")?,
        created_at: row.try_get("created_at")?,
    })
}

const DOCTOR_PROFILE_SELECT: &str = r#"
    SELECT d.id, d.user_id, d.speciality_id, d.shift, d.working_days,
           s.name AS speciality_name, s.appointment_charges,
           s.treatment_charges, s.appointments_limit
    FROM doctors d
    JOIN specialities s ON s.id = d.speciality_id
    WHERE d.id = $1
"#;

const APPOINTMENT_SELECT: &str = r#"
    SELECT id, patient_id, doctor_id, appointment_datetime, reason,
           status, charged_amount, created_at, updated_at
    FROM appointments
    WHERE id = $1
"#;

const TREATMENT_SELECT: &str = r#"
    SELECT id, patient_id, patient_type, diagnosis, details,
           treatment_status, bill_settled, created_at, updated_at
    FROM treatments
    WHERE id = $1
"#;

impl PostgresUnitOfWork {
    async fn load_doctor(&mut self, doctor_id: Uuid, lock: bool) -> BillingResult<DoctorProfile> {
        // Lock only the doctor row; the speciality is read-only reference data
        let sql = if lock {
            format!("{} FOR UPDATE OF d", DOCTOR_PROFILE_SELECT)
        } else {
            DOCTOR_PROFILE_SELECT.to_string()
        };

        let row = sqlx::query(&sql)
            .bind(doctor_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(storage("Failed to load doctor"))?
            .ok_or_else(|| BillingError::not_found("doctor", doctor_id))?;

        doctor_profile_from_row(&row)
    }

    async fn load_account(&mut self, account_id: Uuid, lock: bool) -> BillingResult<Account> {
        let sql = if lock {
            "SELECT id, balance, created_at, updated_at FROM accounts WHERE id = $1 FOR UPDATE"
        } else {
            "SELECT id, balance, created_at, updated_at FROM accounts WHERE id = $1"
        };

        let row = sqlx::query(sql)
            .bind(account_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(storage("Failed to load account"))?
            .ok_or_else(|| BillingError::not_found("account", account_id))?;

        account_from_row(&row)
    }

    async fn load_appointment(&mut self, appointment_id: Uuid, lock: bool) -> BillingResult<Appointment> {
        let sql = if lock {
            format!("{} FOR UPDATE", APPOINTMENT_SELECT)
        } else {
            APPOINTMENT_SELECT.to_string()
        };

        let row = sqlx::query(&sql)
            .bind(appointment_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(storage("Failed to load appointment"))?
            .ok_or_else(|| BillingError::not_found("appointment", appointment_id))?;

        appointment_from_row(&row)
    }

    async fn load_medicine(&mut self, medicine_id: Uuid, lock: bool) -> BillingResult<Medicine> {
        let sql = if lock {
            "SELECT id, name, category, price, stock, expiry_date FROM medicines WHERE id = $1 FOR UPDATE"
        } else {
            "SELECT id, name, category, price, stock, expiry_date FROM medicines WHERE id = $1"
        };

        let row = sqlx::query(sql)
            .bind(medicine_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(storage("Failed to load medicine"))?
            .ok_or_else(|| BillingError::not_found("medicine", medicine_id))?;

        medicine_from_row(&row)
    }

    async fn load_treatment(&mut self, treatment_id: Uuid, lock: bool) -> BillingResult<Treatment> {
        let sql = if lock {
            format!("{} FOR UPDATE", TREATMENT_SELECT)
        } else {
            TREATMENT_SELECT.to_string()
        };

        let row = sqlx::query(&sql)
            .bind(treatment_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(storage("Failed to load treatment"))?
            .ok_or_else(|| BillingError::not_found("treatment", treatment_id))?;

        let doctor_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT doctor_id FROM treatment_doctors WHERE treatment_id = $1")
                .bind(treatment_id)
                .fetch_all(&mut *self.tx)
                .await
                .map_err(storage("Failed to load treatment doctors"))?;

        let extra_fee_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT extra_fee_id FROM treatment_extra_fees WHERE treatment_id = $1")
                .bind(treatment_id)
                .fetch_all(&mut *self.tx)
                .await
                .map_err(storage("Failed to load treatment extra fees"))?;

        let patient_type: String = row.try_get("patient_type")?;
        let treatment_status: String = row.try_get("treatment_status")?;

        Ok(Treatment {
            id: row.try_get("id")?,
            patient_id: row.try_get("patient_id")?,
            patient_type: patient_type.parse()?,
            diagnosis: row.try_get("diagnosis")?,
            details: row.try_get("details")?,
            treatment_status: treatment_status.parse()?,
            doctor_ids: doctor_ids.into_iter().collect(),
            extra_fee_ids: extra_fee_ids.into_iter().collect(),
            bill_settled: row.try_get("bill_settled")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn replace_treatment_links(&mut self, treatment: &Treatment) -> BillingResult<()> {
        sqlx::query("DELETE FROM treatment_doctors WHERE treatment_id = $1")
            .bind(treatment.id)
            .execute(&mut *self.tx)
            .await
            .map_err(storage("Failed to clear treatment doctors"))?;

        for doctor_id in &treatment.doctor_ids {
            sqlx::query("INSERT INTO treatment_doctors (treatment_id, doctor_id) VALUES ($1, $2)")
                .bind(treatment.id)
                .bind(doctor_id)
                .execute(&mut *self.tx)
                .await
                .map_err(storage("Failed to link treatment doctor"))?;
        }

        sqlx::query("DELETE FROM treatment_extra_fees WHERE treatment_id = $1")
            .bind(treatment.id)
            .execute(&mut *self.tx)
            .await
            .map_err(storage("Failed to clear treatment extra fees"))?;

        for extra_fee_id in &treatment.extra_fee_ids {
            sqlx::query("INSERT INTO treatment_extra_fees (treatment_id, extra_fee_id) VALUES ($1, $2)")
                .bind(treatment.id)
                .bind(extra_fee_id)
                .execute(&mut *self.tx)
                .await
                .map_err(storage("Failed to link treatment extra fee"))?;
        }

        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn insert_account(&mut self, account: &Account) -> BillingResult<()> {
        sqlx::query(
            "INSERT INTO accounts (id, balance, created_at, updated_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(account.id)
        .bind(account.balance)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(storage("Failed to insert account"))?;

        Ok(())
    }

    async fn account(&mut self, account_id: Uuid) -> BillingResult<Account> {
        self.load_account(account_id, false).await
    }

    async fn account_for_update(&mut self, account_id: Uuid) -> BillingResult<Account> {
        self.load_account(account_id, true).await
    }

    async fn save_account(&mut self, account: &Account) -> BillingResult<()> {
        let result = sqlx::query("UPDATE accounts SET balance = $2, updated_at = $3 WHERE id = $1")
            .bind(account.id)
            .bind(account.balance)
            .bind(account.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(storage("Failed to save account"))?;

        if result.rows_affected() == 0 {
            return Err(BillingError::not_found("account", account.id));
        }
        Ok(())
    }

    async fn insert_user(&mut self, user: &User) -> BillingResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, role, email, phone_number, account_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(user.role.as_str())
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(user.account_id)
        .bind(user.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if is_duplicate_username(&e) {
                BillingError::InvalidInput(format!("username '{}' is already taken", user.username))
            } else {
                storage("Failed to insert user")(e)
            }
        })?;

        Ok(())
    }

    async fn user(&mut self, user_id: Uuid) -> BillingResult<User> {
        let row = sqlx::query(
            "SELECT id, username, role, email, phone_number, account_id, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(storage("Failed to load user"))?
        .ok_or_else(|| BillingError::not_found("user", user_id))?;

        user_from_row(&row)
    }

    async fn insert_patient(&mut self, patient: &Patient) -> BillingResult<()> {
        sqlx::query("INSERT INTO patients (id, user_id, created_at) VALUES ($1, $2, $3)")
            .bind(patient.id)
            .bind(patient.user_id)
            .bind(patient.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(storage("Failed to insert patient"))?;

        Ok(())
    }

    async fn patient(&mut self, patient_id: Uuid) -> BillingResult<Patient> {
        let row = sqlx::query("SELECT id, user_id, created_at FROM patients WHERE id = $1")
            .bind(patient_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(storage("Failed to load patient"))?
            .ok_or_else(|| BillingError::not_found("patient", patient_id))?;

        Ok(Patient {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn doctor(&mut self, doctor_id: Uuid) -> BillingResult<DoctorProfile> {
        self.load_doctor(doctor_id, false).await
    }

    async fn doctor_for_update(&mut self, doctor_id: Uuid) -> BillingResult<DoctorProfile> {
        self.load_doctor(doctor_id, true).await
    }

    async fn count_doctor_appointments_between(
        &mut self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        excluding: Option<Uuid>,
    ) -> BillingResult<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM appointments
            WHERE doctor_id = $1
              AND appointment_datetime >= $2
              AND appointment_datetime < $3
              AND ($4::uuid IS NULL OR id <> $4)
            "#,
        )
        .bind(doctor_id)
        .bind(from)
        .bind(to)
        .bind(excluding)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(storage("Failed to count appointments"))?;

        Ok(count.max(0) as u64)
    }

    async fn insert_appointment(&mut self, appointment: &Appointment) -> BillingResult<()> {
        sqlx::query(
            r#"
            INSERT INTO appointments (
                id, patient_id, doctor_id, appointment_datetime,
                reason, status, charged_amount, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(appointment.id)
        .bind(appointment.patient_id)
        .bind(appointment.doctor_id)
        .bind(appointment.appointment_datetime)
        .bind(&appointment.reason)
        .bind(appointment.status.as_str())
        .bind(appointment.charged_amount)
        .bind(appointment.created_at)
        .bind(appointment.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(storage("Failed to insert appointment"))?;

        debug!(appointment_id = %appointment.id, "Appointment inserted");
        Ok(())
    }

    async fn appointment(&mut self, appointment_id: Uuid) -> BillingResult<Appointment> {
        self.load_appointment(appointment_id, false).await
    }

    async fn appointment_for_update(&mut self, appointment_id: Uuid) -> BillingResult<Appointment> {
        self.load_appointment(appointment_id, true).await
    }

    async fn update_appointment(&mut self, appointment: &Appointment) -> BillingResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE appointments
            SET doctor_id = $2, appointment_datetime = $3, reason = $4,
                status = $5, charged_amount = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(appointment.id)
        .bind(appointment.doctor_id)
        .bind(appointment.appointment_datetime)
        .bind(&appointment.reason)
        .bind(appointment.status.as_str())
        .bind(appointment.charged_amount)
        .bind(appointment.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(storage("Failed to update appointment"))?;

        if result.rows_affected() == 0 {
            return Err(BillingError::not_found("appointment", appointment.id));
        }
        Ok(())
    }

    async fn delete_appointment(&mut self, appointment_id: Uuid) -> BillingResult<()> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(appointment_id)
            .execute(&mut *self.tx)
            .await
            .map_err(storage("Failed to delete appointment"))?;

        if result.rows_affected() == 0 {
            return Err(BillingError::not_found("appointment", appointment_id));
        }
        Ok(())
    }

    async fn insert_treatment(&mut self, treatment: &Treatment) -> BillingResult<()> {
        sqlx::query(
            r#"
            INSERT INTO treatments (
                id, patient_id, patient_type, diagnosis, details,
                treatment_status, bill_settled, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(treatment.id)
        .bind(treatment.patient_id)
        .bind(treatment.patient_type.as_str())
        .bind(&treatment.diagnosis)
        .bind(&treatment.details)
        .bind(treatment.treatment_status.as_str())
        .bind(treatment.bill_settled)
        .bind(treatment.created_at)
        .bind(treatment.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(storage("Failed to insert treatment"))?;

        self.replace_treatment_links(treatment).await
    }

    async fn treatment(&mut self, treatment_id: Uuid) -> BillingResult<Treatment> {
        self.load_treatment(treatment_id, false).await
    }

    async fn treatment_for_update(&mut self, treatment_id: Uuid) -> BillingResult<Treatment> {
        self.load_treatment(treatment_id, true).await
    }

    async fn update_treatment(&mut self, treatment: &Treatment) -> BillingResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE treatments
            SET patient_type = $2, diagnosis = $3, details = $4,
                treatment_status = $5, bill_settled = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(treatment.id)
        .bind(treatment.patient_type.as_str())
        .bind(&treatment.diagnosis)
        .bind(&treatment.details)
        .bind(treatment.treatment_status.as_str())
        .bind(treatment.bill_settled)
        .bind(treatment.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(storage("Failed to update treatment"))?;

        if result.rows_affected() == 0 {
            return Err(BillingError::not_found("treatment", treatment.id));
        }

        self.replace_treatment_links(treatment).await
    }

    async fn treatment_medicines(&mut self, treatment_id: Uuid) -> BillingResult<Vec<TreatmentMedicine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, treatment_id, medicine_id, quantity, prescription, created_at
            FROM treatment_medicines
            WHERE treatment_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(treatment_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(storage("Failed to load treatment medicines"))?;

        rows.iter().map(treatment_medicine_from_row).collect()
    }

    async fn insert_treatment_medicine(&mut self, line: &TreatmentMedicine) -> BillingResult<()> {
        sqlx::query(
            r#"
            INSERT INTO treatment_medicines (
                id, treatment_id, medicine_id, quantity, prescription, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(line.id)
        .bind(line.treatment_id)
        .bind(line.medicine_id)
        .bind(to_i32(line.quantity, "quantity")?)
        .bind(&line.prescription)
        .bind(line.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(storage("Failed to insert treatment medicine"))?;

        Ok(())
    }

    async fn treatment_medicine(&mut self, line_id: Uuid) -> BillingResult<TreatmentMedicine> {
        let row = sqlx::query(
            r#"
            SELECT id, treatment_id, medicine_id, quantity, prescription, created_at
            FROM treatment_medicines
            WHERE id = $1
            "#,
        )
        .bind(line_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(storage("Failed to load treatment medicine"))?
        .ok_or_else(|| BillingError::not_found("treatment medicine", line_id))?;

        treatment_medicine_from_row(&row)
    }

    async fn delete_treatment_medicine(&mut self, line_id: Uuid) -> BillingResult<()> {
        let result = sqlx::query("DELETE FROM treatment_medicines WHERE id = $1")
            .bind(line_id)
            .execute(&mut *self.tx)
            .await
            .map_err(storage("Failed to delete treatment medicine"))?;

        if result.rows_affected() == 0 {
            return Err(BillingError::not_found("treatment medicine", line_id));
        }
        Ok(())
    }

    async fn medicine(&mut self, medicine_id: Uuid) -> BillingResult<Medicine> {
        self.load_medicine(medicine_id, false).await
    }

    async fn medicine_for_update(&mut self, medicine_id: Uuid) -> BillingResult<Medicine> {
        self.load_medicine(medicine_id, true).await
    }

    async fn save_medicine(&mut self, medicine: &Medicine) -> BillingResult<()> {
        let result = sqlx::query("UPDATE medicines SET stock = $2, price = $3 WHERE id = $1")
            .bind(medicine.id)
            .bind(to_i32(medicine.stock, "stock")?)
            .bind(medicine.price)
            .execute(&mut *self.tx)
            .await
            .map_err(storage("Failed to save medicine"))?;

        if result.rows_affected() == 0 {
            return Err(BillingError::not_found("medicine", medicine.id));
        }
        Ok(())
    }

    async fn extra_fee(&mut self, extra_fee_id: Uuid) -> BillingResult<ExtraFee> {
        let row = sqlx::query("SELECT id, name, details, amount FROM extra_fees WHERE id = $1")
            .bind(extra_fee_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(storage("Failed to load extra fee"))?
            .ok_or_else(|| BillingError::not_found("extra fee", extra_fee_id))?;

        Ok(ExtraFee {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            details: row.try_get("details")?,
            amount: row.try_get("amount")?,
        })
    }

    async fn insert_payment(&mut self, payment: &Payment) -> BillingResult<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, user_id, amount, method, reference, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(payment.id)
        .bind(payment.user_id)
        .bind(payment.amount)
        .bind(payment.method.as_str())
        .bind(&payment.reference)
        .bind(payment.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(storage("Failed to insert payment"))?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> BillingResult<()> {
        self.tx
            .commit()
            .await
            .map_err(storage("Failed to commit transaction"))?;

        debug!("Unit of work committed");
        Ok(())
    }
}
