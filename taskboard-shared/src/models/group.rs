/// Group ("board") model and database operations
///
/// A group has one creator and a member set. The creator is inserted into
/// the member set in the same transaction that creates the group and can
/// never be removed from it. Task routes refer to a group as a *board*.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE groups (
///     id UUID PRIMARY KEY,
///     name VARCHAR(100) NOT NULL,
///     created_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE group_members (
///     group_id UUID NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
///     PRIMARY KEY (group_id, user_id)
/// );
/// ```
///
/// The member set is read back as an aggregated `UUID[]` ordered by join
/// time, so `members[0]` is always the creator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;
use validator::Validate;

const GROUP_SELECT: &str = r#"
    SELECT g.id, g.name, g.created_by, g.created_at,
           COALESCE(
               array_agg(m.user_id ORDER BY m.joined_at) FILTER (WHERE m.user_id IS NOT NULL),
               '{}'
           ) AS members
    FROM groups g
    LEFT JOIN group_members m ON m.group_id = g.id
"#;

/// Group with its member set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: Uuid,

    pub name: String,

    /// Creator; always present in `members`
    pub created_by: Uuid,

    /// Member ids in join order, no duplicates
    pub members: Vec<Uuid>,

    pub created_at: DateTime<Utc>,
}

/// Input for creating a group
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGroup {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
}

impl Group {
    /// Checks whether `user_id` is in the member set
    pub fn has_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }

    /// Checks whether `user_id` created the group
    pub fn is_creator(&self, user_id: Uuid) -> bool {
        self.created_by == user_id
    }

    /// Inserts the bare group row; the caller adds the creator membership
    /// in the same transaction
    pub async fn insert_row<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        name: &str,
        created_by: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO groups (id, name, created_by) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(name)
            .bind(created_by)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Finds a group with its members
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("{GROUP_SELECT} WHERE g.id = $1 GROUP BY g.id");
        sqlx::query_as::<_, Group>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Locks the group row for the rest of the transaction and returns its
    /// creator, or None if the group does not exist
    pub async fn lock_creator<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar("SELECT created_by FROM groups WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Takes a share lock on the group row; returns false if it does not
    /// exist. Conflicts with `lock_creator`, so membership cannot change
    /// underneath the caller's transaction.
    pub async fn lock_shared<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<Uuid> = sqlx::query_scalar("SELECT id FROM groups WHERE id = $1 FOR SHARE")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(row.is_some())
    }

    /// Lists the groups a user belongs to, oldest first
    pub async fn list_for_user<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"{GROUP_SELECT}
            WHERE g.id IN (SELECT group_id FROM group_members WHERE user_id = $1)
            GROUP BY g.id
            ORDER BY g.created_at ASC"#
        );
        sqlx::query_as::<_, Group>(&query)
            .bind(user_id)
            .fetch_all(executor)
            .await
    }

    /// Adds a member; returns false when the user was already a member
    pub async fn insert_member<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO group_members (group_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (group_id, user_id) DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes a member; returns false when the user was not a member
    pub async fn delete_member<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM group_members WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Returns the subset of `user_ids` that are members of the group
    pub async fn members_among<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT user_id FROM group_members WHERE group_id = $1 AND user_id = ANY($2)",
        )
        .bind(group_id)
        .bind(user_ids)
        .fetch_all(executor)
        .await
    }

    /// Deletes a group; tasks, assignments and memberships cascade
    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_helpers() {
        let creator = Uuid::new_v4();
        let member = Uuid::new_v4();
        let group = Group {
            id: Uuid::new_v4(),
            name: "Launch".to_string(),
            created_by: creator,
            members: vec![creator, member],
            created_at: Utc::now(),
        };

        assert!(group.has_member(creator));
        assert!(group.has_member(member));
        assert!(!group.has_member(Uuid::new_v4()));
        assert!(group.is_creator(creator));
        assert!(!group.is_creator(member));
    }

    #[test]
    fn test_create_group_validation() {
        assert!(CreateGroup { name: "Launch".to_string() }.validate().is_ok());
        assert!(CreateGroup { name: String::new() }.validate().is_err());
        assert!(CreateGroup { name: "x".repeat(101) }.validate().is_err());
    }
}
