use chrono::{DateTime, Utc};
use sqlx::Row;

use signoff_core::aggregate::{self, RecordedDecision};
use signoff_core::domain::employee::EmployeeId;
use signoff_core::domain::plan::{PlanStatus, ResolvedApprovalPlan};
use signoff_core::domain::request::{ApprovalRequest, RequestId};
use signoff_core::domain::signatory::SignatoryPath;

use super::{RecordDecisionError, RepositoryError, RequestRepository};
use crate::DbPool;

pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_status(s: &str) -> PlanStatus {
    match s {
        "approved" => PlanStatus::Approved,
        "declined" => PlanStatus::Declined,
        "auto_approved" => PlanStatus::AutoApproved,
        _ => PlanStatus::Pending,
    }
}

pub fn plan_status_as_str(status: &PlanStatus) -> &'static str {
    match status {
        PlanStatus::Pending => "pending",
        PlanStatus::Approved => "approved",
        PlanStatus::Declined => "declined",
        PlanStatus::AutoApproved => "auto_approved",
    }
}

const SELECT_REQUEST: &str = "SELECT id, path, applicant_id, status, evaluators,
        created_at, updated_at
 FROM approval_request";

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalRequest, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let path: String = row.try_get("path").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let applicant_id: String =
        row.try_get("applicant_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let evaluators_str: String =
        row.try_get("evaluators").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let evaluators: ResolvedApprovalPlan = serde_json::from_str(&evaluators_str)
        .map_err(|e| RepositoryError::Decode(format!("evaluators payload: {e}")))?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(ApprovalRequest {
        id: RequestId(id),
        path: SignatoryPath(path),
        applicant_id: EmployeeId(applicant_id),
        status: parse_status(&status_str),
        evaluators,
        created_at,
        updated_at,
    })
}

fn encode_evaluators(plan: &ResolvedApprovalPlan) -> Result<String, RepositoryError> {
    serde_json::to_string(plan)
        .map_err(|e| RepositoryError::Decode(format!("evaluators payload: {e}")))
}

#[async_trait::async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn find_by_id(
        &self,
        id: &RequestId,
    ) -> Result<Option<ApprovalRequest>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_REQUEST} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_request(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, request: ApprovalRequest) -> Result<(), RepositoryError> {
        let evaluators = encode_evaluators(&request.evaluators)?;

        sqlx::query(
            "INSERT INTO approval_request (id, path, applicant_id, status, evaluators,
                                           created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 status = excluded.status,
                 evaluators = excluded.evaluators,
                 updated_at = excluded.updated_at",
        )
        .bind(&request.id.0)
        .bind(&request.path.0)
        .bind(&request.applicant_id.0)
        .bind(plan_status_as_str(&request.status))
        .bind(&evaluators)
        .bind(request.created_at.to_rfc3339())
        .bind(request.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_by_applicant(
        &self,
        applicant_id: &EmployeeId,
    ) -> Result<Vec<ApprovalRequest>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> =
            sqlx::query(&format!("{SELECT_REQUEST} WHERE applicant_id = ? ORDER BY created_at DESC"))
                .bind(&applicant_id.0)
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(row_to_request).collect::<Result<Vec<_>, _>>()
    }

    async fn record_decision(
        &self,
        id: &RequestId,
        decision: RecordedDecision,
    ) -> Result<ApprovalRequest, RecordDecisionError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let row = sqlx::query(&format!("{SELECT_REQUEST} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;
        let Some(ref row) = row else {
            return Err(RecordDecisionError::RequestNotFound(id.0.clone()));
        };

        let mut request = row_to_request(row)?;
        aggregate::record_decision(&mut request.evaluators, &decision)?;
        request.status = request.evaluators.status;
        request.updated_at = Utc::now();

        let evaluators = encode_evaluators(&request.evaluators)?;
        sqlx::query(
            "UPDATE approval_request SET status = ?, evaluators = ?, updated_at = ? WHERE id = ?",
        )
        .bind(plan_status_as_str(&request.status))
        .bind(&evaluators)
        .bind(request.updated_at.to_rfc3339())
        .bind(&request.id.0)
        .execute(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;

        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(request)
    }
}
