//! Operations CLI for CareLedger
//!
//! Drives the billing operations against PostgreSQL for operators: schema
//! migrations, balance lookups, booking changes, medicine lines, bill
//! reconciliation and deposits. Every command prints its result as JSON.
//!
//! # Example Usage
//!
//! ```bash
//! careledger migrate
//! careledger balance --user 7d4c...
//! careledger book --patient 1f2e... --doctor 9a8b... --at "2024-06-03 10:00" --reason "Chest pain"
//! careledger cancel --patient 1f2e... --appointment 55aa...
//! careledger deposit --user 7d4c... --amount 1500 --method mpesa --reference QK12AB34CD
//! ```

pub mod cli;
pub mod commands;

pub use cli::*;
pub use commands::run;
