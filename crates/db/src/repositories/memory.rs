use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use signoff_core::aggregate::{self, RecordedDecision};
use signoff_core::domain::employee::{Employee, EmployeeId};
use signoff_core::domain::request::{ApprovalRequest, RequestId};
use signoff_core::domain::signatory::{RoleAssignment, SignatoryPath};

use super::{
    EmployeeRepository, RecordDecisionError, RepositoryError, RequestRepository,
    SignatoryConfigRepository,
};

#[derive(Default)]
pub struct InMemoryEmployeeRepository {
    employees: RwLock<HashMap<String, Employee>>,
}

#[async_trait::async_trait]
impl EmployeeRepository for InMemoryEmployeeRepository {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let employees = self.employees.read().await;
        Ok(employees.get(&id.0).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Employee>, RepositoryError> {
        let employees = self.employees.read().await;
        let mut all: Vec<Employee> = employees.values().cloned().collect();
        all.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(all)
    }

    async fn save(&self, employee: Employee) -> Result<(), RepositoryError> {
        let mut employees = self.employees.write().await;
        employees.insert(employee.id.0.clone(), employee);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySignatoryConfigRepository {
    assignments_by_path: RwLock<HashMap<String, Vec<RoleAssignment>>>,
}

#[async_trait::async_trait]
impl SignatoryConfigRepository for InMemorySignatoryConfigRepository {
    async fn list_for_path(
        &self,
        path: &SignatoryPath,
    ) -> Result<Vec<RoleAssignment>, RepositoryError> {
        let assignments = self.assignments_by_path.read().await;
        Ok(assignments.get(&path.normalized()).cloned().unwrap_or_default())
    }

    async fn list_all(&self) -> Result<Vec<RoleAssignment>, RepositoryError> {
        let assignments = self.assignments_by_path.read().await;
        let mut keys: Vec<&String> = assignments.keys().collect();
        keys.sort();
        Ok(keys.into_iter().flat_map(|key| assignments[key].clone()).collect())
    }

    async fn replace_path(
        &self,
        path: &SignatoryPath,
        mut assignments: Vec<RoleAssignment>,
    ) -> Result<(), RepositoryError> {
        assignments.sort_by_key(|assignment| assignment.order_number);
        let mut by_path = self.assignments_by_path.write().await;
        by_path.insert(path.normalized(), assignments);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryRequestRepository {
    requests: RwLock<HashMap<String, ApprovalRequest>>,
}

#[async_trait::async_trait]
impl RequestRepository for InMemoryRequestRepository {
    async fn find_by_id(
        &self,
        id: &RequestId,
    ) -> Result<Option<ApprovalRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id.0).cloned())
    }

    async fn save(&self, request: ApprovalRequest) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id.0.clone(), request);
        Ok(())
    }

    async fn list_by_applicant(
        &self,
        applicant_id: &EmployeeId,
    ) -> Result<Vec<ApprovalRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        let mut matching: Vec<ApprovalRequest> = requests
            .values()
            .filter(|request| &request.applicant_id == applicant_id)
            .cloned()
            .collect();
        matching.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(matching)
    }

    async fn record_decision(
        &self,
        id: &RequestId,
        decision: RecordedDecision,
    ) -> Result<ApprovalRequest, RecordDecisionError> {
        // The write lock plays the role the SQL transaction plays in the
        // production repository.
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(&id.0)
            .ok_or_else(|| RecordDecisionError::RequestNotFound(id.0.clone()))?;

        aggregate::record_decision(&mut request.evaluators, &decision)?;
        request.status = request.evaluators.status;
        request.updated_at = Utc::now();
        Ok(request.clone())
    }
}
