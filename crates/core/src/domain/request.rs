use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::employee::EmployeeId;
use crate::domain::plan::{PlanStatus, ResolvedApprovalPlan};
use crate::domain::signatory::SignatoryPath;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

/// The subject workflow record the caller persists.
///
/// `evaluators` is the resolved plan with whatever decisions have been merged
/// into it so far; `status` is denormalized from the plan so list queries do
/// not need to parse the payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: RequestId,
    pub path: SignatoryPath,
    pub applicant_id: EmployeeId,
    pub status: PlanStatus,
    pub evaluators: ResolvedApprovalPlan,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApprovalRequest {
    pub fn from_plan(id: RequestId, plan: ResolvedApprovalPlan, now: DateTime<Utc>) -> Self {
        Self {
            id,
            path: plan.path.clone(),
            applicant_id: plan.applicant_id.clone(),
            status: plan.status,
            evaluators: plan,
            created_at: now,
            updated_at: now,
        }
    }
}
