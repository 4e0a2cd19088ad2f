//! Marketplace audit trail.
//!
//! Every state-changing marketplace operation appends an immutable record
//! with before/after snapshots. These rows back investor and regulator
//! traceability requirements; they are append-only and never updated or
//! deleted by the application.

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;

/// Append-only audit log writer
#[derive(Clone)]
pub struct AuditLog {
    pool: PgPool,
}

impl AuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append an audit record.
    ///
    /// `old_values`/`new_values` are JSON snapshots of the entity before and
    /// after the action; either may be absent (e.g. no prior state on create).
    pub async fn record(
        &self,
        entity_type: &str,
        entity_id: Uuid,
        action: &str,
        old_values: Option<Value>,
        new_values: Option<Value>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            INSERT INTO marketplace_audit_log (
                entity_type, entity_id, action, old_values, new_values, performed_by_type
            )
            VALUES ($1, $2, $3, $4, $5, 'system')
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .bind(action)
        .bind(old_values)
        .bind(new_values)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
