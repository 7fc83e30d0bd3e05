use chrono::Utc;
use clap::Args;
use uuid::Uuid;

use signoff_core::audit::{AuditContext, InMemoryAuditSink};
use signoff_core::config::{AppConfig, LoadOptions};
use signoff_core::domain::employee::EmployeeId;
use signoff_core::domain::request::{ApprovalRequest, RequestId};
use signoff_core::domain::signatory::SignatoryPath;
use signoff_core::resolver::{ResolveOptions, SignatoryResolver};
use signoff_db::repositories::{RequestRepository, SqlRequestRepository};
use signoff_db::{connect_with_settings, load_snapshot, migrations};

use crate::commands::CommandResult;

#[derive(Debug, Args)]
pub struct ResolveArgs {
    #[arg(long, help = "Workflow path identifier, e.g. leave-request")]
    pub path: String,
    #[arg(long, help = "Employee id of the applicant")]
    pub applicant: String,
    #[arg(long, help = "Attach the applicant's record to the plan for display")]
    pub include_applicant: bool,
    #[arg(long, help = "Mark the request auto-approved regardless of configured signatories")]
    pub auto_approve: bool,
}

pub fn run(args: &ResolveArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "resolve",
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
                "resolve",
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

        let snapshot = load_snapshot(&pool)
            .await
            .map_err(|error| ("snapshot_load", error.to_string(), 5u8))?;

        let request_id = RequestId(format!("REQ-{}", Uuid::new_v4()));
        let resolver = SignatoryResolver::new(snapshot.config, snapshot.directory);
        let sink = InMemoryAuditSink::default();
        let resolution = resolver
            .resolve_with_audit(
                &SignatoryPath(args.path.clone()),
                &EmployeeId(args.applicant.clone()),
                &ResolveOptions {
                    include_applicant: args.include_applicant,
                    auto_approve: args.auto_approve,
                },
                &sink,
                &AuditContext::new(Some(request_id.clone()), "cli-resolve", "signoff-cli"),
            )
            .map_err(|error| ("not_found", error.to_string(), 6u8))?;

        for event in sink.events() {
            tracing::info!(
                event_type = %event.event_type,
                correlation_id = %event.correlation_id,
                outcome = ?event.outcome,
                "resolver audit event"
            );
        }

        let request = ApprovalRequest::from_plan(request_id, resolution.plan, Utc::now());
        SqlRequestRepository::new(pool.clone())
            .save(request.clone())
            .await
            .map_err(|error| ("persistence", error.to_string(), 4u8))?;

        pool.close().await;
        Ok::<ApprovalRequest, (&'static str, String, u8)>(request)
    });

    match result {
        Ok(request) => CommandResult::success(
            "resolve",
            format!(
                "created approval request {} for path `{}` with status {:?} ({} steps)",
                request.id.0,
                request.path.0,
                request.status,
                request.evaluators.steps.len(),
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("resolve", error_class, message, exit_code)
        }
    }
}
