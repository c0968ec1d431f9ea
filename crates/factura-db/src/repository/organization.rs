//! # Organization Repository
//!
//! Tenants and their members. The API resolves the caller's role here on
//! every request.

use chrono::Utc;
use factura_core::{Membership, Organization, Role};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Repository for organizations and memberships.
#[derive(Debug, Clone)]
pub struct OrganizationRepository {
    pool: SqlitePool,
}

impl OrganizationRepository {
    /// Creates a new OrganizationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrganizationRepository { pool }
    }

    /// Creates an organization with a generated id.
    pub async fn create(&self, name: &str) -> DbResult<Organization> {
        let organization = Organization {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            created_at: Utc::now(),
        };

        debug!(id = %organization.id, name = %organization.name, "Creating organization");

        sqlx::query("INSERT INTO organizations (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&organization.id)
            .bind(&organization.name)
            .bind(organization.created_at)
            .execute(&self.pool)
            .await?;

        Ok(organization)
    }

    /// Gets an organization by id.
    pub async fn get(&self, id: &str) -> DbResult<Option<Organization>> {
        let organization = sqlx::query_as::<_, Organization>(
            "SELECT id, name, created_at FROM organizations WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(organization)
    }

    /// Adds a user to an organization, or changes their role.
    pub async fn upsert_member(&self, organization_id: &str, user_id: &str, role: Role) -> DbResult<()> {
        debug!(organization_id = %organization_id, user_id = %user_id, role = %role, "Upserting member");

        sqlx::query(
            r#"
            INSERT INTO organization_members (organization_id, user_id, role, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (organization_id, user_id) DO UPDATE SET role = excluded.role
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .bind(role)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::ForeignKeyViolation { .. } => DbError::not_found("Organization", organization_id),
            other => other,
        })?;

        Ok(())
    }

    /// Looks up a user's membership in one organization.
    ///
    /// ## Returns
    /// * `Ok(None)` - the user is not a member (or the organization doesn't exist)
    pub async fn membership(&self, organization_id: &str, user_id: &str) -> DbResult<Option<Membership>> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT
                m.organization_id,
                o.name AS organization_name,
                m.user_id,
                m.role,
                m.created_at
            FROM organization_members m
            JOIN organizations o ON o.id = m.organization_id
            WHERE m.organization_id = ?1 AND m.user_id = ?2
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(membership)
    }

    /// Every organization a user belongs to, by name.
    pub async fn memberships_for_user(&self, user_id: &str) -> DbResult<Vec<Membership>> {
        let memberships = sqlx::query_as::<_, Membership>(
            r#"
            SELECT
                m.organization_id,
                o.name AS organization_name,
                m.user_id,
                m.role,
                m.created_at
            FROM organization_members m
            JOIN organizations o ON o.id = m.organization_id
            WHERE m.user_id = ?1
            ORDER BY o.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(memberships)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use factura_core::Role;

    #[tokio::test]
    async fn test_membership_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.organizations();

        let acme = repo.create("Acme SRL").await.unwrap();
        let beta = repo.create("Beta EIRL").await.unwrap();
        repo.upsert_member(&acme.id, "user-1", Role::Owner).await.unwrap();
        repo.upsert_member(&beta.id, "user-1", Role::Seller).await.unwrap();

        let membership = repo.membership(&acme.id, "user-1").await.unwrap().unwrap();
        assert_eq!(membership.role, Role::Owner);
        assert_eq!(membership.organization_name, "Acme SRL");

        assert!(repo.membership(&acme.id, "user-2").await.unwrap().is_none());

        let all = repo.memberships_for_user("user-1").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].role, Role::Seller);
    }

    #[tokio::test]
    async fn test_upsert_changes_role() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.organizations();
        let org = repo.create("Acme").await.unwrap();

        repo.upsert_member(&org.id, "u", Role::Viewer).await.unwrap();
        repo.upsert_member(&org.id, "u", Role::Accountant).await.unwrap();

        let membership = repo.membership(&org.id, "u").await.unwrap().unwrap();
        assert_eq!(membership.role, Role::Accountant);
    }

    #[tokio::test]
    async fn test_member_of_unknown_organization() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let result = db.organizations().upsert_member("missing", "u", Role::Owner).await;
        assert!(matches!(result, Err(crate::DbError::NotFound { .. })));
    }
}
