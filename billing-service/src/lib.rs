//! Patient billing for a hospital
//!
//! Keeps each patient's account balance consistent with the charges of their
//! appointments and treatments, and enforces doctor availability, daily
//! appointment capacity and medicine stock before any of those records are
//! written:
//! - [`ledger`]: signed balance adjustments
//! - [`availability`]: working-day, shift and capacity checks
//! - [`appointments`]: booking lifecycle with charge and refund
//! - [`treatments`]: bill aggregation and delta reconciliation
//! - [`stock`]: medicine stock guard
//! - [`payment`]: deposits
//!
//! [`BillingService`] runs every operation in one [`repository::UnitOfWork`].

pub mod appointments;
pub mod availability;
pub mod clock;
pub mod error;
pub mod ledger;
pub mod models;
pub mod payment;
pub mod repository;
pub mod service;
pub mod stock;
pub mod treatments;

pub use clock::*;
pub use error::*;
pub use models::*;
pub use repository::{BillingRepository, InMemoryBillingRepository, PostgresBillingRepository, UnitOfWork};
pub use service::*;
