use anyhow::{Context, Result};
use billing_service::{
    AppointmentUpdate, BillingService, MedicineLine, NewAppointment, NewPayment, PostgresBillingRepository,
};
use config_engine::EngineConfig;
use database_layer::{run_migrations, DatabasePool, TransactionManager};
use logger_redacted::{init_tracing, PiiRedactor};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::cli::{Cli, Command};

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Execute one CLI command end to end
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = EngineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    if cli.verbose {
        config.logging.log_level = "debug".to_string();
    }

    init_tracing(&config.logging)?;
    let offset = config.hospital.offset()?;

    let pool = DatabasePool::connect(&config.database)
        .await
        .context("Failed to connect to database")?;

    if let Command::Migrate = cli.command {
        run_migrations(&pool).await?;
        info!("Migrations applied");
        return print(&json!({ "migrated": true }));
    }

    let transactions = TransactionManager::new(pool).with_lock_timeout(config.database.lock_timeout_ms);
    let repository = PostgresBillingRepository::new(transactions);
    let service = BillingService::new(Arc::new(repository), offset)
        .with_redactor(PiiRedactor::from_config(&config.logging));

    match cli.command {
        Command::Migrate => Ok(()),
        Command::Balance { user } => {
            let account = service.account_for(user).await?;
            print(&json!({
                "account_id": account.id,
                "balance": account.balance,
                "pending_bill": account.pending_bill(),
            }))
        }
        Command::Book { patient, doctor, at, reason } => {
            let appointment = service
                .create_appointment(NewAppointment {
                    patient_id: patient,
                    doctor_id: doctor,
                    appointment_datetime: service.parse_instant(&at)?,
                    reason,
                })
                .await?;
            print(&appointment)
        }
        Command::Reschedule { patient, appointment, doctor, at } => {
            let appointment_datetime = at.as_deref().map(|raw| service.parse_instant(raw)).transpose()?;
            let appointment = service
                .update_appointment(
                    patient,
                    appointment,
                    AppointmentUpdate {
                        doctor_id: doctor,
                        appointment_datetime,
                        ..Default::default()
                    },
                )
                .await?;
            print(&appointment)
        }
        Command::Cancel { patient, appointment } => {
            let appointment = service.cancel_appointment(patient, appointment).await?;
            print(&appointment)
        }
        Command::DeleteAppointment { patient, appointment } => {
            service.delete_appointment(patient, appointment).await?;
            print(&json!({ "deleted": appointment }))
        }
        Command::AttachMedicine { treatment, medicine, quantity, prescription } => {
            let line = service
                .attach_medicine(
                    treatment,
                    MedicineLine {
                        medicine_id: medicine,
                        quantity,
                        prescription,
                    },
                )
                .await?;
            print(&line)
        }
        Command::RemoveMedicine { line } => {
            let treatment = service.remove_medicine(line).await?;
            print(&treatment)
        }
        Command::Reconcile { treatment } => {
            let bill = service.reconcile_treatment_billing(treatment).await?;
            print(&bill)
        }
        Command::Deposit { user, amount, method, reference } => {
            let (payment, account) = service
                .record_payment(NewPayment {
                    user_id: user,
                    amount,
                    method,
                    reference,
                })
                .await?;
            print(&json!({ "payment": payment, "balance": account.balance }))
        }
    }
}
