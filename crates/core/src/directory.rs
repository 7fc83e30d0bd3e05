use std::collections::HashMap;

use crate::domain::employee::{Employee, EmployeeId, JobId};
use crate::domain::signatory::{normalize_key, RoleAssignment, SignatoryPath};

/// Read access to who currently holds which job.
///
/// Injected into the resolver so the routing logic stays pure; production
/// callers materialize a snapshot from storage, tests use the in-memory
/// implementation directly.
pub trait RoleDirectory {
    fn find_employee(&self, id: &EmployeeId) -> Option<Employee>;

    /// Eligible holders of `job_id`, sorted by employee id. Implementations
    /// must already exclude deleted and separated records.
    fn find_employees_by_job(&self, job_id: &JobId) -> Vec<Employee>;
}

/// Read access to the role-assignment configuration for a path.
pub trait SignatoryConfigSource {
    /// Assignments for `path`, sorted by `order_number`. An empty result is
    /// not an error; the resolver treats it as "no gating required".
    fn assignments_for_path(&self, path: &SignatoryPath) -> Vec<RoleAssignment>;
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryRoleDirectory {
    employees: HashMap<String, Employee>,
}

impl InMemoryRoleDirectory {
    pub fn new(employees: Vec<Employee>) -> Self {
        let employees =
            employees.into_iter().map(|employee| (employee.id.0.clone(), employee)).collect();
        Self { employees }
    }
}

impl RoleDirectory for InMemoryRoleDirectory {
    fn find_employee(&self, id: &EmployeeId) -> Option<Employee> {
        self.employees.get(&id.0).cloned()
    }

    fn find_employees_by_job(&self, job_id: &JobId) -> Vec<Employee> {
        let job_key = normalize_key(&job_id.0);
        let mut holders: Vec<Employee> = self
            .employees
            .values()
            .filter(|employee| normalize_key(&employee.job_id.0) == job_key)
            .filter(|employee| employee.is_eligible_signatory())
            .cloned()
            .collect();
        holders.sort_by(|left, right| left.id.cmp(&right.id));
        holders
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemorySignatoryConfig {
    assignments_by_path: HashMap<String, Vec<RoleAssignment>>,
}

impl InMemorySignatoryConfig {
    pub fn new(assignments: Vec<RoleAssignment>) -> Self {
        let mut assignments_by_path: HashMap<String, Vec<RoleAssignment>> = HashMap::new();
        for assignment in assignments {
            assignments_by_path
                .entry(assignment.path.normalized())
                .or_default()
                .push(assignment);
        }
        for path_assignments in assignments_by_path.values_mut() {
            path_assignments.sort_by_key(|assignment| assignment.order_number);
        }
        Self { assignments_by_path }
    }
}

impl SignatoryConfigSource for InMemorySignatoryConfig {
    fn assignments_for_path(&self, path: &SignatoryPath) -> Vec<RoleAssignment> {
        self.assignments_by_path.get(&path.normalized()).cloned().unwrap_or_default()
    }
}
