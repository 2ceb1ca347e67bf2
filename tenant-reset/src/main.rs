//! Tenant Reset entry point.

use std::process::ExitCode;

use tenant_reset::config::ResetConfig;
use tenant_reset::startup::Application;

use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    let config = match ResetConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize tracing
    init_tracing(
        &config.service_name,
        &config.common.log_level,
        config.common.log_json,
    );

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting tenant-reset");

    // Log configuration (mask sensitive values)
    tracing::info!(
        service_name = %config.service_name,
        db_host = %config.database.host,
        db_port = config.database.port,
        db_name = %config.database.name,
        db_user = %config.database.user,
        api_url = %config.api.base_url,
        api_username = %config.api.username,
        orgs_to_keep = ?config.orgs_to_keep.iter().collect::<Vec<_>>(),
        users_to_keep = ?config.users_to_keep.iter().collect::<Vec<_>>(),
        poll_interval_ms = config.polling.interval.as_millis() as u64,
        poll_max_attempts = ?config.polling.max_attempts,
        max_rounds = ?config.max_rounds,
        "Configuration loaded"
    );

    let app = match Application::build(config).await {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build application");
            return ExitCode::FAILURE;
        }
    };

    match app.run().await {
        Ok(report) => {
            tracing::info!(
                caller_id = report.caller_id,
                organization_rounds = report.organization_rounds,
                organizations_deleted = report.organizations_deleted.len(),
                users_deleted = report.users_deleted.len(),
                users_referenced = report.users_referenced.len(),
                passwords_reset = report.passwords_reset,
                "Reset complete"
            );
            println!("Done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, phase = %e.phase(), "Reset failed");
            ExitCode::from(e.exit_code())
        }
    }
}
