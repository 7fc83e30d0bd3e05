use chrono::Utc;
use clap::Args;

use signoff_core::aggregate::RecordedDecision;
use signoff_core::config::{AppConfig, LoadOptions};
use signoff_core::domain::employee::EmployeeId;
use signoff_core::domain::plan::DecisionState;
use signoff_core::domain::request::RequestId;
use signoff_db::repositories::{
    RecordDecisionError, RequestRepository, SqlRequestRepository,
};
use signoff_db::{connect_with_settings, migrations};

use crate::commands::CommandResult;

#[derive(Debug, Args)]
pub struct DecideArgs {
    #[arg(long, help = "Approval request id")]
    pub request: String,
    #[arg(long, help = "Employee id of the decider")]
    pub employee: String,
    #[arg(long, help = "Decision to record: approved or declined")]
    pub decision: String,
    #[arg(long, help = "Optional remarks attached to the decision")]
    pub remarks: Option<String>,
}

pub fn run(args: &DecideArgs) -> CommandResult {
    let state = match args.decision.trim().to_ascii_lowercase().as_str() {
        "approved" => DecisionState::Approved,
        "declined" => DecisionState::Declined,
        other => {
            return CommandResult::failure(
                "decide",
                "invalid_argument",
                format!("unsupported decision `{other}` (expected approved|declined)"),
                2,
            );
        }
    };

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "decide",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "decide",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let outcome = SqlRequestRepository::new(pool.clone())
            .record_decision(
                &RequestId(args.request.clone()),
                RecordedDecision {
                    employee_id: EmployeeId(args.employee.clone()),
                    state,
                    decided_at: Utc::now(),
                    remarks: args.remarks.clone(),
                },
            )
            .await
            .map_err(|error| match error {
                RecordDecisionError::Repository(inner) => ("persistence", inner.to_string(), 4u8),
                RecordDecisionError::RequestNotFound(id) => {
                    ("not_found", format!("approval request `{id}` was not found"), 6u8)
                }
                RecordDecisionError::Rejected(inner) => {
                    ("decision_rejected", inner.to_string(), 7u8)
                }
            })?;

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(outcome)
    });

    match result {
        Ok(request) => CommandResult::success(
            "decide",
            format!(
                "recorded {} by {} on {}; overall status is now {:?}",
                args.decision.trim().to_ascii_lowercase(),
                args.employee,
                request.id.0,
                request.status,
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("decide", error_class, message, exit_code)
        }
    }
}
