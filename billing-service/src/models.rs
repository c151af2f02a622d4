use chrono::{DateTime, NaiveDate, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::BillingError;

/// Implements `as_str`, `Display` and `FromStr` for a closed enum stored as text
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = BillingError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(BillingError::InvalidInput(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

/// Per-user money account; negative balance means the user owes the hospital
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Amount owed, zero when the account is in credit
    pub fn pending_bill(&self) -> Decimal {
        if self.balance < Decimal::ZERO {
            self.balance.abs()
        } else {
            Decimal::ZERO
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Patient,
    Doctor,
    Admin,
}

text_enum!(UserRole {
    Patient => "patient",
    Doctor => "doctor",
    Admin => "admin",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub account_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub role: UserRole,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Result of registering a user: the user, its fresh account and, for
/// patients, the patient profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub user: User,
    pub account: Account,
    pub patient: Option<Patient>,
}

/// Doctor classification carrying charge rates and daily capacity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speciality {
    pub id: Uuid,
    pub name: String,
    pub appointment_charges: Decimal,
    pub treatment_charges: Decimal,
    pub appointments_limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shift {
    /// 06:00 to 17:59 local time
    Day,
    /// 18:00 to 05:59 local time
    Night,
}

text_enum!(Shift {
    Day => "day",
    Night => "night",
});

impl Shift {
    pub fn for_hour(hour: u32) -> Self {
        if (6..18).contains(&hour) {
            Shift::Day
        } else {
            Shift::Night
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkingDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl WorkingDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkingDay::Monday => "Monday",
            WorkingDay::Tuesday => "Tuesday",
            WorkingDay::Wednesday => "Wednesday",
            WorkingDay::Thursday => "Thursday",
            WorkingDay::Friday => "Friday",
            WorkingDay::Saturday => "Saturday",
            WorkingDay::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for WorkingDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkingDay {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<Weekday>()
            .map(WorkingDay::from)
            .map_err(|_| BillingError::InvalidInput(format!("unknown weekday '{}'", s)))
    }
}

impl From<Weekday> for WorkingDay {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => WorkingDay::Monday,
            Weekday::Tue => WorkingDay::Tuesday,
            Weekday::Wed => WorkingDay::Wednesday,
            Weekday::Thu => WorkingDay::Thursday,
            Weekday::Fri => WorkingDay::Friday,
            Weekday::Sat => WorkingDay::Saturday,
            Weekday::Sun => WorkingDay::Sunday,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub speciality_id: Uuid,
    pub working_days: BTreeSet<WorkingDay>,
    pub shift: Shift,
}

/// A doctor joined with its speciality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub doctor: Doctor,
    pub speciality: Speciality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

text_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    /// Scheduled may complete or cancel; terminal states are final.
    /// Staying in the same state is always allowed.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        match (self, next) {
            (current, next) if *current == next => true,
            (AppointmentStatus::Scheduled, AppointmentStatus::Completed)
            | (AppointmentStatus::Scheduled, AppointmentStatus::Cancelled) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_datetime: DateTime<Utc>,
    pub reason: String,
    pub status: AppointmentStatus,
    /// Amount debited for this booking, and refunded if it is cancelled
    pub charged_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_datetime: DateTime<Utc>,
    pub reason: String,
}

/// Partial appointment update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentUpdate {
    pub doctor_id: Option<Uuid>,
    pub appointment_datetime: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatientType {
    Outpatient,
    Inpatient,
}

text_enum!(PatientType {
    Outpatient => "outpatient",
    Inpatient => "inpatient",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentStatus {
    InProgress,
    Healed,
    Referred,
}

text_enum!(TreatmentStatus {
    InProgress => "in_progress",
    Healed => "healed",
    Referred => "referred",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub patient_type: PatientType,
    pub diagnosis: String,
    pub details: String,
    pub treatment_status: TreatmentStatus,
    pub doctor_ids: BTreeSet<Uuid>,
    pub extra_fee_ids: BTreeSet<Uuid>,
    /// Amount already applied to the patient's account for this treatment
    pub bill_settled: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Medicine line requested together with a new treatment or attached later
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicineLine {
    pub medicine_id: Uuid,
    pub quantity: u32,
    pub prescription: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTreatment {
    pub patient_id: Uuid,
    pub patient_type: PatientType,
    pub diagnosis: String,
    pub details: String,
    pub doctor_ids: Vec<Uuid>,
    pub extra_fee_ids: Vec<Uuid>,
    pub medicines: Vec<MedicineLine>,
}

/// Partial treatment update; a `Some` collection replaces the whole set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreatmentUpdate {
    pub patient_type: Option<PatientType>,
    pub diagnosis: Option<String>,
    pub details: Option<String>,
    pub treatment_status: Option<TreatmentStatus>,
    pub doctor_ids: Option<Vec<Uuid>>,
    pub extra_fee_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedicineCategory {
    Antibiotics,
    PainRelief,
    FirstAid,
    Vitamins,
    Supplements,
    CoughSyrup,
    Other,
}

text_enum!(MedicineCategory {
    Antibiotics => "antibiotics",
    PainRelief => "pain_relief",
    FirstAid => "first_aid",
    Vitamins => "vitamins",
    Supplements => "supplements",
    CoughSyrup => "cough_syrup",
    Other => "other",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: Uuid,
    pub name: String,
    pub category: MedicineCategory,
    pub price: Decimal,
    pub stock: u32,
    pub expiry_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentMedicine {
    pub id: Uuid,
    pub treatment_id: Uuid,
    pub medicine_id: Uuid,
    pub quantity: u32,
    pub prescription: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraFee {
    pub id: Uuid,
    pub name: String,
    pub details: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Mpesa,
    Bank,
    Other,
}

text_enum!(PaymentMethod {
    Cash => "cash",
    Mpesa => "mpesa",
    Bank => "bank",
    Other => "other",
});

/// Deposit into a user's account; never edited once recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub user_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: String,
}

/// Treatment bill split by source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BillBreakdown {
    pub medicine_bill: Decimal,
    pub doctor_bill: Decimal,
    pub extra_fee_bill: Decimal,
    pub total: Decimal,
}
