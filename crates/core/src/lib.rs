pub mod aggregate;
pub mod audit;
pub mod config;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod resolver;

pub use aggregate::{
    aggregate, merge_decisions, overall_status, record_decision, DecisionError, RecordedDecision,
};
pub use audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink,
};
pub use directory::{
    InMemoryRoleDirectory, InMemorySignatoryConfig, RoleDirectory, SignatoryConfigSource,
};
pub use domain::employee::{Employee, EmployeeId, EmploymentStatus, JobId};
pub use domain::plan::{
    ApprovalSlot, ApprovalStep, ApproverRef, DecisionState, PlanStatus, ResolvedApprovalPlan,
    SlotRequirement,
};
pub use domain::request::{ApprovalRequest, RequestId};
pub use domain::signatory::{RoleAssignment, SignatoryPath};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use resolver::{
    ConfigurationGap, Resolution, ResolveError, ResolveOptions, SignatoryResolver,
};
