use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::employee::{Employee, EmployeeId, JobId};
use crate::domain::signatory::SignatoryPath;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionState {
    Pending,
    Approved,
    Declined,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Pending,
    Approved,
    Declined,
    AutoApproved,
}

impl PlanStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Display/reference data for one person named by a plan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverRef {
    pub employee_id: EmployeeId,
    pub full_name: String,
    pub job_id: JobId,
}

impl From<&Employee> for ApproverRef {
    fn from(employee: &Employee) -> Self {
        Self {
            employee_id: employee.id.clone(),
            full_name: employee.full_name.clone(),
            job_id: employee.job_id.clone(),
        }
    }
}

/// Who may fulfill a slot.
///
/// `Exactly` pins the slot to one named employee (an applies-to-all
/// assignment expands into one such slot per eligible holder). `AnyOf`
/// accepts the first decision from any listed employee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlotRequirement {
    Exactly { approver: ApproverRef },
    AnyOf { eligible: Vec<ApproverRef> },
}

impl SlotRequirement {
    pub fn accepts(&self, employee_id: &EmployeeId) -> bool {
        match self {
            Self::Exactly { approver } => &approver.employee_id == employee_id,
            Self::AnyOf { eligible } => {
                eligible.iter().any(|approver| &approver.employee_id == employee_id)
            }
        }
    }
}

/// A single required-decision unit within a step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalSlot {
    pub role: String,
    pub requirement: SlotRequirement,
    pub state: DecisionState,
    pub decided_by: Option<EmployeeId>,
    pub decided_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
}

impl ApprovalSlot {
    pub fn new(role: impl Into<String>, requirement: SlotRequirement) -> Self {
        Self {
            role: role.into(),
            requirement,
            state: DecisionState::Pending,
            decided_by: None,
            decided_at: None,
            remarks: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, DecisionState::Pending)
    }
}

/// Slots sharing one order number; evaluated in parallel, gating later steps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStep {
    pub order_number: u32,
    pub slots: Vec<ApprovalSlot>,
}

impl ApprovalStep {
    pub fn is_fully_approved(&self) -> bool {
        self.slots.iter().all(|slot| slot.state == DecisionState::Approved)
    }

    pub fn has_decline(&self) -> bool {
        self.slots.iter().any(|slot| slot.state == DecisionState::Declined)
    }
}

/// The fully resolved routing for one applicant's one request.
///
/// Computed fresh on each use; only the `evaluators` payload the caller
/// persists against the subject record survives between resolutions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedApprovalPlan {
    pub path: SignatoryPath,
    pub applicant_id: EmployeeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant: Option<ApproverRef>,
    pub steps: Vec<ApprovalStep>,
    pub status: PlanStatus,
}

impl ResolvedApprovalPlan {
    /// The first step, in order, that still has a pending slot. `None` once
    /// every slot is decided or the plan carries no steps.
    pub fn current_step(&self) -> Option<&ApprovalStep> {
        self.steps.iter().find(|step| step.slots.iter().any(ApprovalSlot::is_pending))
    }
}
