use chrono::Utc;

use signoff_core::domain::employee::{Employee, EmployeeId, EmploymentStatus, JobId};
use signoff_core::domain::request::{ApprovalRequest, RequestId};
use signoff_core::domain::signatory::{RoleAssignment, SignatoryPath};
use signoff_core::resolver::{ResolveOptions, SignatoryResolver};

use crate::repositories::{
    EmployeeRepository, RepositoryError, RequestRepository, SignatoryConfigRepository,
    SqlEmployeeRepository, SqlRequestRepository, SqlSignatoryConfigRepository,
};
use crate::snapshot::load_snapshot;
use crate::DbPool;

const SEED_EMPLOYEES: &[(&str, &str, &str, &str)] = &[
    ("E-100", "Avery Cruz", "staff", "active"),
    ("E-200", "Morgan Tan", "dept-manager", "active"),
    ("E-301", "Riley Santos", "hr-officer", "active"),
    ("E-302", "Sam Aquino", "hr-officer", "active"),
    ("E-400", "Jordan Lim", "payroll-clerk", "separated"),
];

pub const SEED_REQUEST_ID: &str = "REQ-LEAVE-0001";

/// Deterministic demo dataset: a two-step leave-request path, a one-step
/// cash-advance path, an intentionally unconfigured expense-request path, and
/// one pending leave request for the staff applicant.
pub struct SeedDataset;

#[derive(Debug, Clone)]
pub struct SeedResult {
    pub employees_seeded: usize,
    pub paths_seeded: Vec<&'static str>,
    pub request_id: String,
}

#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

impl SeedDataset {
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let employee_repo = SqlEmployeeRepository::new(pool.clone());
        let now = Utc::now();
        for (id, name, job, status) in SEED_EMPLOYEES {
            let status = match *status {
                "separated" => EmploymentStatus::Separated,
                "on_leave" => EmploymentStatus::OnLeave,
                _ => EmploymentStatus::Active,
            };
            employee_repo
                .save(Employee {
                    id: EmployeeId((*id).to_string()),
                    full_name: (*name).to_string(),
                    job_id: JobId((*job).to_string()),
                    status,
                    deleted: false,
                    created_at: now,
                    updated_at: now,
                })
                .await?;
        }

        let config_repo = SqlSignatoryConfigRepository::new(pool.clone());
        let leave = SignatoryPath("leave-request".to_string());
        config_repo
            .replace_path(
                &leave,
                vec![
                    RoleAssignment {
                        path: leave.clone(),
                        order_number: 1,
                        job_id: JobId("dept-manager".to_string()),
                        role: "Recommending Approval".to_string(),
                        applies_to_all: false,
                    },
                    RoleAssignment {
                        path: leave.clone(),
                        order_number: 2,
                        job_id: JobId("hr-officer".to_string()),
                        role: "Final Approval".to_string(),
                        applies_to_all: true,
                    },
                ],
            )
            .await?;

        let cash_advance = SignatoryPath("cash-advance".to_string());
        config_repo
            .replace_path(
                &cash_advance,
                vec![RoleAssignment {
                    path: cash_advance.clone(),
                    order_number: 1,
                    job_id: JobId("dept-manager".to_string()),
                    role: "Final Approval".to_string(),
                    applies_to_all: false,
                }],
            )
            .await?;

        // `expense-request` is deliberately left without assignments so the
        // auto-approval fallback stays demonstrable.

        let snapshot = load_snapshot(pool).await?;
        let resolver = SignatoryResolver::new(snapshot.config, snapshot.directory);
        let resolution = resolver
            .resolve(
                &leave,
                &EmployeeId("E-100".to_string()),
                &ResolveOptions { include_applicant: true, auto_approve: false },
            )
            .map_err(|error| RepositoryError::Decode(format!("seed resolution: {error}")))?;

        SqlRequestRepository::new(pool.clone())
            .save(ApprovalRequest::from_plan(
                RequestId(SEED_REQUEST_ID.to_string()),
                resolution.plan,
                now,
            ))
            .await?;

        Ok(SeedResult {
            employees_seeded: SEED_EMPLOYEES.len(),
            paths_seeded: vec!["leave-request", "cash-advance"],
            request_id: SEED_REQUEST_ID.to_string(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks: Vec<(&'static str, bool)> = Vec::new();

        let employees = SqlEmployeeRepository::new(pool.clone()).list_all().await?;
        checks.push(("employees_present", employees.len() == SEED_EMPLOYEES.len()));

        let config_repo = SqlSignatoryConfigRepository::new(pool.clone());
        let leave_assignments =
            config_repo.list_for_path(&SignatoryPath("leave-request".to_string())).await?;
        checks.push(("leave_request_configured", leave_assignments.len() == 2));

        let expense_assignments =
            config_repo.list_for_path(&SignatoryPath("expense-request".to_string())).await?;
        checks.push(("expense_request_unconfigured", expense_assignments.is_empty()));

        let request = SqlRequestRepository::new(pool.clone())
            .find_by_id(&RequestId(SEED_REQUEST_ID.to_string()))
            .await?;
        let request_ok = request
            .as_ref()
            .map(|request| request.evaluators.steps.len() == 2)
            .unwrap_or(false);
        checks.push(("demo_request_present", request_ok));

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(VerificationResult { all_present, checks })
    }
}
