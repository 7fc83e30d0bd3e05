use sqlx::Row;

use signoff_core::domain::employee::JobId;
use signoff_core::domain::signatory::{RoleAssignment, SignatoryPath};

use super::{RepositoryError, SignatoryConfigRepository};
use crate::DbPool;

pub struct SqlSignatoryConfigRepository {
    pool: DbPool,
}

impl SqlSignatoryConfigRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_assignment(row: &sqlx::sqlite::SqliteRow) -> Result<RoleAssignment, RepositoryError> {
    let path: String = row.try_get("path").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let order_number: i64 =
        row.try_get("order_number").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let job_id: String =
        row.try_get("job_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let role: String = row.try_get("role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let applies_to_all: i64 =
        row.try_get("applies_to_all").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let order_number = u32::try_from(order_number)
        .map_err(|_| RepositoryError::Decode(format!("invalid order_number {order_number}")))?;

    Ok(RoleAssignment {
        path: SignatoryPath(path),
        order_number,
        job_id: JobId(job_id),
        role,
        applies_to_all: applies_to_all != 0,
    })
}

#[async_trait::async_trait]
impl SignatoryConfigRepository for SqlSignatoryConfigRepository {
    async fn list_for_path(
        &self,
        path: &SignatoryPath,
    ) -> Result<Vec<RoleAssignment>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT path, order_number, job_id, role, applies_to_all
             FROM signatory_role_assignment
             WHERE path = ?
             ORDER BY order_number ASC, id ASC",
        )
        .bind(path.normalized())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_assignment).collect::<Result<Vec<_>, _>>()
    }

    async fn list_all(&self) -> Result<Vec<RoleAssignment>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT path, order_number, job_id, role, applies_to_all
             FROM signatory_role_assignment
             ORDER BY path ASC, order_number ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_assignment).collect::<Result<Vec<_>, _>>()
    }

    async fn replace_path(
        &self,
        path: &SignatoryPath,
        assignments: Vec<RoleAssignment>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM signatory_role_assignment WHERE path = ?")
            .bind(path.normalized())
            .execute(&mut *tx)
            .await?;

        for assignment in assignments {
            sqlx::query(
                "INSERT INTO signatory_role_assignment
                     (path, order_number, job_id, role, applies_to_all)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(path.normalized())
            .bind(i64::from(assignment.order_number))
            .bind(&assignment.job_id.0)
            .bind(&assignment.role)
            .bind(i64::from(assignment.applies_to_all))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
