use billing_service::PaymentMethod;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use uuid::Uuid;

/// CareLedger operations tool
#[derive(Parser, Debug)]
#[command(name = "careledger")]
#[command(version)]
#[command(about = "Patient billing, appointment and treatment operations")]
pub struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(short, long, env = "CARELEDGER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Overrides database.url from the configuration
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply pending schema migrations
    Migrate,

    /// Show a user's account balance and pending bill
    Balance {
        #[arg(long)]
        user: Uuid,
    },

    /// Book an appointment; the time is hospital local time or RFC 3339
    Book {
        #[arg(long)]
        patient: Uuid,
        #[arg(long)]
        doctor: Uuid,
        #[arg(long)]
        at: String,
        #[arg(long, default_value = "")]
        reason: String,
    },

    /// Move an appointment to another time and/or doctor
    Reschedule {
        #[arg(long)]
        patient: Uuid,
        #[arg(long)]
        appointment: Uuid,
        #[arg(long)]
        doctor: Option<Uuid>,
        #[arg(long)]
        at: Option<String>,
    },

    /// Cancel an appointment and refund its charge
    Cancel {
        #[arg(long)]
        patient: Uuid,
        #[arg(long)]
        appointment: Uuid,
    },

    /// Delete an appointment, refunding it if still scheduled
    DeleteAppointment {
        #[arg(long)]
        patient: Uuid,
        #[arg(long)]
        appointment: Uuid,
    },

    /// Attach a medicine line to a treatment
    AttachMedicine {
        #[arg(long)]
        treatment: Uuid,
        #[arg(long)]
        medicine: Uuid,
        #[arg(long)]
        quantity: u32,
        #[arg(long, default_value = "")]
        prescription: String,
    },

    /// Remove a medicine line from its treatment (stock is not restored)
    RemoveMedicine {
        #[arg(long)]
        line: Uuid,
    },

    /// Recompute a treatment's bill and settle the difference
    Reconcile {
        #[arg(long)]
        treatment: Uuid,
    },

    /// Record a deposit
    Deposit {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        amount: Decimal,
        #[arg(long, default_value = "cash")]
        method: PaymentMethod,
        #[arg(long, default_value = "")]
        reference: String,
    },
}
