use clap::Args;

use signoff_core::config::{AppConfig, LoadOptions};
use signoff_core::domain::plan::{ApprovalSlot, SlotRequirement};
use signoff_core::domain::request::RequestId;
use signoff_db::repositories::{RequestRepository, SqlRequestRepository};
use signoff_db::{connect_with_settings, migrations};

use crate::commands::CommandResult;

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[arg(long, help = "Approval request id")]
    pub request: String,
}

pub fn run(args: &StatusArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "status",
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
                "status",
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

        let request = SqlRequestRepository::new(pool.clone())
            .find_by_id(&RequestId(args.request.clone()))
            .await
            .map_err(|error| ("persistence", error.to_string(), 4u8))?
            .ok_or_else(|| {
                (
                    "not_found",
                    format!("approval request `{}` was not found", args.request),
                    6u8,
                )
            })?;

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(request)
    });

    match result {
        Ok(request) => {
            let mut lines = vec![format!(
                "request {} path `{}` applicant {} status {:?}",
                request.id.0, request.path.0, request.applicant_id.0, request.status,
            )];
            for step in &request.evaluators.steps {
                for slot in &step.slots {
                    lines.push(format!(
                        "  - step {} [{}] {}",
                        step.order_number,
                        slot.role,
                        describe_slot(slot),
                    ));
                }
            }
            CommandResult::success("status", lines.join("\n"))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("status", error_class, message, exit_code)
        }
    }
}

fn describe_slot(slot: &ApprovalSlot) -> String {
    let who = match &slot.requirement {
        SlotRequirement::Exactly { approver } => {
            format!("{} ({})", approver.full_name, approver.employee_id.0)
        }
        SlotRequirement::AnyOf { eligible } => {
            let names: Vec<String> =
                eligible.iter().map(|approver| approver.employee_id.0.clone()).collect();
            format!("any of {}", names.join(", "))
        }
    };

    match (&slot.decided_by, &slot.decided_at) {
        (Some(decider), Some(at)) => {
            format!("{who}: {:?} by {} at {}", slot.state, decider.0, at.to_rfc3339())
        }
        _ => format!("{who}: {:?}", slot.state),
    }
}
