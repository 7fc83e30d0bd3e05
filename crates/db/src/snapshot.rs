use signoff_core::directory::{InMemoryRoleDirectory, InMemorySignatoryConfig};

use crate::repositories::{
    EmployeeRepository, RepositoryError, SignatoryConfigRepository, SqlEmployeeRepository,
    SqlSignatoryConfigRepository,
};
use crate::DbPool;

/// A point-in-time copy of the reference data the resolver reads.
///
/// Loaded in one place so a resolution never mixes employees and assignments
/// from different moments; the resolver itself stays pure.
pub struct DirectorySnapshot {
    pub directory: InMemoryRoleDirectory,
    pub config: InMemorySignatoryConfig,
}

pub async fn load_snapshot(pool: &DbPool) -> Result<DirectorySnapshot, RepositoryError> {
    let employees = SqlEmployeeRepository::new(pool.clone()).list_all().await?;
    let assignments = SqlSignatoryConfigRepository::new(pool.clone()).list_all().await?;

    Ok(DirectorySnapshot {
        directory: InMemoryRoleDirectory::new(employees),
        config: InMemorySignatoryConfig::new(assignments),
    })
}
