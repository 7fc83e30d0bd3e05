use async_trait::async_trait;
use thiserror::Error;

use signoff_core::aggregate::{DecisionError, RecordedDecision};
use signoff_core::domain::employee::{Employee, EmployeeId};
use signoff_core::domain::request::{ApprovalRequest, RequestId};
use signoff_core::domain::signatory::{RoleAssignment, SignatoryPath};

pub mod employee;
pub mod memory;
pub mod request;
pub mod signatory;

pub use employee::SqlEmployeeRepository;
pub use memory::{
    InMemoryEmployeeRepository, InMemoryRequestRepository, InMemorySignatoryConfigRepository,
};
pub use request::SqlRequestRepository;
pub use signatory::SqlSignatoryConfigRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Failure modes of the transactional decision-recording flow.
#[derive(Debug, Error)]
pub enum RecordDecisionError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("approval request `{0}` was not found")]
    RequestNotFound(String),
    #[error(transparent)]
    Rejected(#[from] DecisionError),
}

#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError>;
    async fn list_all(&self) -> Result<Vec<Employee>, RepositoryError>;
    async fn save(&self, employee: Employee) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SignatoryConfigRepository: Send + Sync {
    async fn list_for_path(
        &self,
        path: &SignatoryPath,
    ) -> Result<Vec<RoleAssignment>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<RoleAssignment>, RepositoryError>;

    /// Swap the full assignment set for one path. Paths are configured as a
    /// unit; partial edits would leave order numbers inconsistent.
    async fn replace_path(
        &self,
        path: &SignatoryPath,
        assignments: Vec<RoleAssignment>,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn find_by_id(&self, id: &RequestId)
        -> Result<Option<ApprovalRequest>, RepositoryError>;

    async fn save(&self, request: ApprovalRequest) -> Result<(), RepositoryError>;

    async fn list_by_applicant(
        &self,
        applicant_id: &EmployeeId,
    ) -> Result<Vec<ApprovalRequest>, RepositoryError>;

    /// Load, validate, merge, and write back one decision atomically, so two
    /// approvers deciding at nearly the same time cannot lose an update.
    async fn record_decision(
        &self,
        id: &RequestId,
        decision: RecordedDecision,
    ) -> Result<ApprovalRequest, RecordDecisionError>;
}
