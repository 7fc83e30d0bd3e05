use std::collections::BTreeMap;

use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::directory::{RoleDirectory, SignatoryConfigSource};
use crate::domain::employee::{Employee, EmployeeId};
use crate::domain::plan::{
    ApprovalSlot, ApprovalStep, ApproverRef, PlanStatus, ResolvedApprovalPlan, SlotRequirement,
};
use crate::domain::signatory::{RoleAssignment, SignatoryPath};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Attach the applicant's own record to the plan for display.
    pub include_applicant: bool,
    /// Caller-decided bypass; the structural plan is still computed.
    pub auto_approve: bool,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("applicant `{0}` does not exist or is deleted")]
    ApplicantNotFound(String),
}

/// Why a configured requirement produced no slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigurationGap {
    /// The path has no role assignments at all.
    UnconfiguredPath,
    /// A required job currently has no eligible holder besides the applicant.
    NoEligibleHolder { order_number: u32, job_id: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub plan: ResolvedApprovalPlan,
    pub gaps: Vec<ConfigurationGap>,
}

/// Translates a `(path, applicant)` pair into a `ResolvedApprovalPlan`.
///
/// Pure read/compute: collaborators are injected and never mutated, so
/// concurrent resolutions need no coordination.
#[derive(Clone, Debug)]
pub struct SignatoryResolver<C, D> {
    config: C,
    directory: D,
}

impl<C, D> SignatoryResolver<C, D>
where
    C: SignatoryConfigSource,
    D: RoleDirectory,
{
    pub fn new(config: C, directory: D) -> Self {
        Self { config, directory }
    }

    pub fn resolve(
        &self,
        path: &SignatoryPath,
        applicant_id: &EmployeeId,
        options: &ResolveOptions,
    ) -> Result<Resolution, ResolveError> {
        let applicant = self
            .directory
            .find_employee(applicant_id)
            .filter(|employee| !employee.deleted)
            .ok_or_else(|| ResolveError::ApplicantNotFound(applicant_id.0.clone()))?;

        let assignments = self.config.assignments_for_path(path);
        let mut gaps = Vec::new();

        let steps = if assignments.is_empty() {
            gaps.push(ConfigurationGap::UnconfiguredPath);
            Vec::new()
        } else {
            self.build_steps(&assignments, applicant_id, &mut gaps)
        };

        let status = if options.auto_approve || steps.is_empty() {
            PlanStatus::AutoApproved
        } else {
            PlanStatus::Pending
        };

        let plan = ResolvedApprovalPlan {
            path: path.clone(),
            applicant_id: applicant_id.clone(),
            applicant: options.include_applicant.then(|| ApproverRef::from(&applicant)),
            steps,
            status,
        };

        Ok(Resolution { plan, gaps })
    }

    pub fn resolve_with_audit<S>(
        &self,
        path: &SignatoryPath,
        applicant_id: &EmployeeId,
        options: &ResolveOptions,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<Resolution, ResolveError>
    where
        S: AuditSink,
    {
        let result = self.resolve(path, applicant_id, options);
        match &result {
            Ok(resolution) => {
                for gap in &resolution.gaps {
                    sink.emit(
                        AuditEvent::new(
                            audit.request_id.clone(),
                            audit.correlation_id.clone(),
                            "resolution.configuration_gap",
                            AuditCategory::Configuration,
                            audit.actor.clone(),
                            AuditOutcome::Success,
                        )
                        .with_metadata("path", path.0.clone())
                        .with_metadata("gap", format!("{gap:?}")),
                    );
                }
                sink.emit(
                    AuditEvent::new(
                        audit.request_id.clone(),
                        audit.correlation_id.clone(),
                        "resolution.plan_resolved",
                        AuditCategory::Resolution,
                        audit.actor.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("path", path.0.clone())
                    .with_metadata("status", format!("{:?}", resolution.plan.status))
                    .with_metadata("steps", resolution.plan.steps.len().to_string()),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit.request_id.clone(),
                        audit.correlation_id.clone(),
                        "resolution.rejected",
                        AuditCategory::Resolution,
                        audit.actor.clone(),
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("path", path.0.clone())
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }

    fn build_steps(
        &self,
        assignments: &[RoleAssignment],
        applicant_id: &EmployeeId,
        gaps: &mut Vec<ConfigurationGap>,
    ) -> Vec<ApprovalStep> {
        let mut grouped: BTreeMap<u32, Vec<&RoleAssignment>> = BTreeMap::new();
        for assignment in assignments {
            grouped.entry(assignment.order_number).or_default().push(assignment);
        }

        let mut steps = Vec::new();
        for (order_number, group) in grouped {
            let mut slots = Vec::new();
            for assignment in group {
                let holders: Vec<Employee> = self
                    .directory
                    .find_employees_by_job(&assignment.job_id)
                    .into_iter()
                    .filter(|holder| &holder.id != applicant_id)
                    .collect();

                if holders.is_empty() {
                    gaps.push(ConfigurationGap::NoEligibleHolder {
                        order_number,
                        job_id: assignment.job_id.0.clone(),
                    });
                    continue;
                }

                if assignment.applies_to_all {
                    slots.extend(holders.iter().map(|holder| {
                        ApprovalSlot::new(
                            assignment.role.clone(),
                            SlotRequirement::Exactly { approver: ApproverRef::from(holder) },
                        )
                    }));
                } else {
                    slots.push(ApprovalSlot::new(
                        assignment.role.clone(),
                        SlotRequirement::AnyOf {
                            eligible: holders.iter().map(ApproverRef::from).collect(),
                        },
                    ));
                }
            }

            if !slots.is_empty() {
                steps.push(ApprovalStep { order_number, slots });
            }
        }

        steps
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::directory::{InMemoryRoleDirectory, InMemorySignatoryConfig};
    use crate::domain::employee::{Employee, EmployeeId, EmploymentStatus, JobId};
    use crate::domain::plan::{PlanStatus, SlotRequirement};
    use crate::domain::signatory::{RoleAssignment, SignatoryPath};
    use crate::resolver::{ConfigurationGap, ResolveError, ResolveOptions, SignatoryResolver};

    fn employee(id: &str, job: &str) -> Employee {
        let now = Utc::now();
        Employee {
            id: EmployeeId(id.to_owned()),
            full_name: format!("Employee {id}"),
            job_id: JobId(job.to_owned()),
            status: EmploymentStatus::Active,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn assignment(path: &str, order: u32, job: &str, role: &str, all: bool) -> RoleAssignment {
        RoleAssignment {
            path: SignatoryPath(path.to_owned()),
            order_number: order,
            job_id: JobId(job.to_owned()),
            role: role.to_owned(),
            applies_to_all: all,
        }
    }

    fn leave_request_resolver() -> SignatoryResolver<InMemorySignatoryConfig, InMemoryRoleDirectory>
    {
        let directory = InMemoryRoleDirectory::new(vec![
            employee("E-100", "staff"),
            employee("E-200", "dept-manager"),
            employee("E-301", "hr-officer"),
            employee("E-302", "hr-officer"),
        ]);
        let config = InMemorySignatoryConfig::new(vec![
            assignment("leave-request", 1, "dept-manager", "Recommending Approval", false),
            assignment("leave-request", 2, "hr-officer", "Final Approval", true),
        ]);
        SignatoryResolver::new(config, directory)
    }

    #[test]
    fn resolves_any_of_then_applies_to_all_steps() {
        let resolver = leave_request_resolver();
        let resolution = resolver
            .resolve(
                &SignatoryPath("leave-request".to_owned()),
                &EmployeeId("E-100".to_owned()),
                &ResolveOptions::default(),
            )
            .expect("resolution should succeed");

        let plan = resolution.plan;
        assert_eq!(plan.status, PlanStatus::Pending);
        assert_eq!(plan.steps.len(), 2);

        assert_eq!(plan.steps[0].order_number, 1);
        assert_eq!(plan.steps[0].slots.len(), 1);
        assert!(matches!(plan.steps[0].slots[0].requirement, SlotRequirement::AnyOf { .. }));

        assert_eq!(plan.steps[1].order_number, 2);
        assert_eq!(plan.steps[1].slots.len(), 2);
        assert!(plan
            .steps[1]
            .slots
            .iter()
            .all(|slot| matches!(slot.requirement, SlotRequirement::Exactly { .. })));
        assert!(resolution.gaps.is_empty());
    }

    #[test]
    fn unconfigured_path_auto_approves_with_empty_steps() {
        let resolver = leave_request_resolver();
        let resolution = resolver
            .resolve(
                &SignatoryPath("expense-request".to_owned()),
                &EmployeeId("E-100".to_owned()),
                &ResolveOptions::default(),
            )
            .expect("resolution should succeed");

        assert_eq!(resolution.plan.status, PlanStatus::AutoApproved);
        assert!(resolution.plan.steps.is_empty());
        assert_eq!(resolution.gaps, vec![ConfigurationGap::UnconfiguredPath]);
    }

    #[test]
    fn missing_applicant_is_rejected() {
        let resolver = leave_request_resolver();
        let error = resolver
            .resolve(
                &SignatoryPath("leave-request".to_owned()),
                &EmployeeId("E-999".to_owned()),
                &ResolveOptions::default(),
            )
            .expect_err("unknown applicant must fail");

        assert_eq!(error, ResolveError::ApplicantNotFound("E-999".to_owned()));
    }

    #[test]
    fn applicant_is_excluded_from_required_approvers() {
        let directory = InMemoryRoleDirectory::new(vec![
            employee("E-301", "hr-officer"),
            employee("E-302", "hr-officer"),
        ]);
        let config = InMemorySignatoryConfig::new(vec![assignment(
            "hr-policy-ack",
            1,
            "hr-officer",
            "Final Approval",
            true,
        )]);
        let resolver = SignatoryResolver::new(config, directory);

        let resolution = resolver
            .resolve(
                &SignatoryPath("hr-policy-ack".to_owned()),
                &EmployeeId("E-301".to_owned()),
                &ResolveOptions::default(),
            )
            .expect("resolution should succeed");

        assert_eq!(resolution.plan.steps.len(), 1);
        assert_eq!(resolution.plan.steps[0].slots.len(), 1);
        assert!(!resolution.plan.steps[0].slots[0]
            .requirement
            .accepts(&EmployeeId("E-301".to_owned())));
    }

    #[test]
    fn self_only_path_auto_approves() {
        let directory = InMemoryRoleDirectory::new(vec![employee("E-301", "hr-officer")]);
        let config = InMemorySignatoryConfig::new(vec![assignment(
            "hr-policy-ack",
            1,
            "hr-officer",
            "Final Approval",
            false,
        )]);
        let resolver = SignatoryResolver::new(config, directory);

        let resolution = resolver
            .resolve(
                &SignatoryPath("hr-policy-ack".to_owned()),
                &EmployeeId("E-301".to_owned()),
                &ResolveOptions::default(),
            )
            .expect("resolution should succeed");

        assert_eq!(resolution.plan.status, PlanStatus::AutoApproved);
        assert!(resolution.plan.steps.is_empty());
        assert!(matches!(
            resolution.gaps[0],
            ConfigurationGap::NoEligibleHolder { order_number: 1, .. }
        ));
    }

    #[test]
    fn caller_override_marks_auto_approved_but_keeps_structure() {
        let resolver = leave_request_resolver();
        let resolution = resolver
            .resolve(
                &SignatoryPath("leave-request".to_owned()),
                &EmployeeId("E-100".to_owned()),
                &ResolveOptions { include_applicant: false, auto_approve: true },
            )
            .expect("resolution should succeed");

        assert_eq!(resolution.plan.status, PlanStatus::AutoApproved);
        assert_eq!(resolution.plan.steps.len(), 2);
    }

    #[test]
    fn include_applicant_attaches_display_metadata() {
        let resolver = leave_request_resolver();
        let resolution = resolver
            .resolve(
                &SignatoryPath("leave-request".to_owned()),
                &EmployeeId("E-100".to_owned()),
                &ResolveOptions { include_applicant: true, auto_approve: false },
            )
            .expect("resolution should succeed");

        let applicant = resolution.plan.applicant.expect("applicant metadata attached");
        assert_eq!(applicant.employee_id, EmployeeId("E-100".to_owned()));
    }

    #[test]
    fn resolution_emits_audit_events_for_gaps_and_outcome() {
        let resolver = leave_request_resolver();
        let sink = InMemoryAuditSink::default();

        let _ = resolver
            .resolve_with_audit(
                &SignatoryPath("expense-request".to_owned()),
                &EmployeeId("E-100".to_owned()),
                &ResolveOptions::default(),
                &sink,
                &AuditContext::new(None, "req-77", "request-handler"),
            )
            .expect("resolution should succeed");

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "resolution.configuration_gap");
        assert_eq!(events[1].event_type, "resolution.plan_resolved");
        assert_eq!(events[1].metadata.get("status").map(String::as_str), Some("AutoApproved"));
    }
}
