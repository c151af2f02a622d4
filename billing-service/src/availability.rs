//! Doctor availability and daily capacity checks.
//!
//! All wall-clock reasoning happens in the hospital's fixed UTC offset:
//! weekday, shift hour and the calendar day used for capacity counting.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{BillingError, BillingResult};
use crate::models::{Doctor, DoctorProfile, Shift, WorkingDay};
use crate::repository::UnitOfWork;

const LOCAL_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse an RFC 3339 timestamp, or a naive local timestamp in `offset`
pub fn parse_instant(raw: &str, offset: FixedOffset) -> BillingResult<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }

    for format in LOCAL_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return offset
                .from_local_datetime(&naive)
                .single()
                .map(|local| local.with_timezone(&Utc))
                .ok_or_else(|| BillingError::InvalidInput(format!("'{}' is not a valid local time", raw)));
        }
    }

    Err(BillingError::InvalidInput(format!("'{}' is not a valid timestamp", raw)))
}

/// Weekday and shift of `instant` both match the doctor's schedule
pub fn is_working_time(doctor: &Doctor, instant: DateTime<Utc>, offset: FixedOffset) -> bool {
    let local = instant.with_timezone(&offset);
    let day = WorkingDay::from(local.weekday());
    let shift = Shift::for_hour(local.hour());

    doctor.working_days.contains(&day) && doctor.shift == shift
}

/// [`is_working_time`] at the clock's current instant
pub fn is_working_now(doctor: &Doctor, clock: &dyn Clock, offset: FixedOffset) -> bool {
    is_working_time(doctor, clock.now(), offset)
}

fn out_of_range(what: impl std::fmt::Display) -> BillingError {
    BillingError::InvalidInput(format!("{} is outside the supported calendar range", what))
}

fn local_naive(instant: DateTime<Utc>, offset: FixedOffset) -> BillingResult<NaiveDateTime> {
    instant
        .naive_utc()
        .checked_add_signed(Duration::seconds(i64::from(offset.local_minus_utc())))
        .ok_or_else(|| out_of_range(instant))
}

/// UTC bounds `[start, end)` of a local calendar day
pub fn local_day_bounds(date: NaiveDate, offset: FixedOffset) -> BillingResult<(DateTime<Utc>, DateTime<Utc>)> {
    let midnight = date
        .and_time(NaiveTime::MIN)
        .checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))
        .ok_or_else(|| out_of_range(date))?;
    let end = midnight
        .checked_add_signed(Duration::days(1))
        .ok_or_else(|| out_of_range(date))?;
    Ok((Utc.from_utc_datetime(&midnight), Utc.from_utc_datetime(&end)))
}

/// Local calendar date of `instant`
pub fn local_date(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

/// Doctor still has room on `date`. Every appointment counts, cancelled ones
/// included; `excluding` leaves out an appointment being rescheduled.
pub async fn accepts_appointment_on(
    uow: &mut dyn UnitOfWork,
    profile: &DoctorProfile,
    date: NaiveDate,
    offset: FixedOffset,
    excluding: Option<Uuid>,
) -> BillingResult<bool> {
    let (from, to) = local_day_bounds(date, offset)?;
    let booked = uow
        .count_doctor_appointments_between(profile.doctor.id, from, to, excluding)
        .await?;

    Ok(booked < u64::from(profile.speciality.appointments_limit))
}

/// Admission control for booking `profile` at `instant`.
///
/// The doctor row must already be locked by the caller's unit of work.
pub async fn admit(
    uow: &mut dyn UnitOfWork,
    profile: &DoctorProfile,
    instant: DateTime<Utc>,
    offset: FixedOffset,
    excluding: Option<Uuid>,
) -> BillingResult<()> {
    let doctor_id = profile.doctor.id;
    local_naive(instant, offset)?;

    if !is_working_time(&profile.doctor, instant, offset) {
        warn!(doctor_id = %doctor_id, at = %instant, "Doctor not working at requested time");
        return Err(BillingError::DoctorUnavailable { doctor_id, at: instant });
    }

    let date = local_date(instant, offset);
    if !accepts_appointment_on(uow, profile, date, offset, excluding).await? {
        let limit = profile.speciality.appointments_limit;
        warn!(doctor_id = %doctor_id, date = %date, limit, "Doctor fully booked");
        return Err(BillingError::CapacityExceeded { doctor_id, date, limit });
    }

    Ok(())
}
