pub mod employee;
pub mod plan;
pub mod request;
pub mod signatory;

pub use employee::{Employee, EmployeeId, EmploymentStatus, JobId};
pub use plan::{
    ApprovalSlot, ApprovalStep, ApproverRef, DecisionState, PlanStatus, ResolvedApprovalPlan,
    SlotRequirement,
};
pub use request::{ApprovalRequest, RequestId};
pub use signatory::{RoleAssignment, SignatoryPath};
