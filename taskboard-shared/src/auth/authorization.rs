/// Board-level authorization checks
///
/// Authentication says who the caller is; these helpers decide what they
/// may touch. Everything is keyed on group (board) membership:
///
/// 1. **Membership**: reading or changing a board, its members, or its
///    tasks requires being a member of it
/// 2. **Creator**: deleting a board requires being its creator
/// 3. **Self-removal**: a member may remove themself; only the creator may
///    remove someone else
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::auth::authorization::require_membership;
/// use taskboard_shared::auth::middleware::AuthContext;
/// use taskboard_shared::store::Store;
/// use uuid::Uuid;
///
/// async fn check(store: &dyn Store, auth: &AuthContext, board_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
///     let group = require_membership(store, board_id, auth.user_id).await?;
///     println!("{} may act on {}", auth.username, group.name);
///     Ok(())
/// }
/// ```

use tracing::warn;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::group::Group;
use crate::models::task::Task;
use crate::store::Store;

/// Errors from authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Caller is not a member of the board
    #[error("Not a member of board {0}")]
    NotMember(Uuid),

    /// Caller is not the board's creator
    #[error("Only the creator of board {0} may do this")]
    NotCreator(Uuid),

    /// Referenced group or task does not exist
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Loads a group and checks `user_id` is a member
///
/// # Errors
///
/// `Store(NotFound)` for a missing group, `NotMember` otherwise
pub async fn require_membership(
    store: &dyn Store,
    group_id: Uuid,
    user_id: Uuid,
) -> Result<Group, AuthzError> {
    let group = store
        .find_group(group_id)
        .await?
        .ok_or_else(|| StoreError::group_not_found(group_id))?;

    if !group.has_member(user_id) {
        warn!(%group_id, %user_id, "Caller is not a board member");
        return Err(AuthzError::NotMember(group_id));
    }

    Ok(group)
}

/// Loads a group and checks `user_id` created it
pub async fn require_creator(
    store: &dyn Store,
    group_id: Uuid,
    user_id: Uuid,
) -> Result<Group, AuthzError> {
    let group = store
        .find_group(group_id)
        .await?
        .ok_or_else(|| StoreError::group_not_found(group_id))?;

    if !group.is_creator(user_id) {
        warn!(%group_id, %user_id, "Caller is not the board creator");
        return Err(AuthzError::NotCreator(group_id));
    }

    Ok(group)
}

/// Loads a task and checks `user_id` is a member of its board
pub async fn require_task_access(
    store: &dyn Store,
    task_id: Uuid,
    user_id: Uuid,
) -> Result<Task, AuthzError> {
    let task = store
        .find_task(task_id)
        .await?
        .ok_or_else(|| StoreError::task_not_found(task_id))?;

    require_membership(store, task.board_id, user_id).await?;

    Ok(task)
}

/// Checks the caller may remove `target` from `group`
///
/// The creator may remove anyone (the store still refuses to remove the
/// creator); any other member may only remove themself.
pub fn can_remove_member(group: &Group, caller: Uuid, target: Uuid) -> Result<(), AuthzError> {
    if !group.has_member(caller) {
        return Err(AuthzError::NotMember(group.id));
    }
    if group.is_creator(caller) || caller == target {
        return Ok(());
    }
    Err(AuthzError::NotCreator(group.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::CreateUser;
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn group(creator: Uuid, members: Vec<Uuid>) -> Group {
        Group {
            id: Uuid::new_v4(),
            name: "Launch".to_string(),
            created_by: creator,
            members,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_can_remove_member() {
        let (creator, a, b, outsider) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let g = group(creator, vec![creator, a, b]);

        assert!(can_remove_member(&g, creator, a).is_ok());
        assert!(can_remove_member(&g, a, a).is_ok());
        assert!(matches!(can_remove_member(&g, a, b), Err(AuthzError::NotCreator(_))));
        assert!(matches!(
            can_remove_member(&g, outsider, outsider),
            Err(AuthzError::NotMember(_))
        ));
    }

    #[test]
    fn test_authz_error_display() {
        let id = Uuid::new_v4();
        assert_eq!(
            AuthzError::NotMember(id).to_string(),
            format!("Not a member of board {}", id)
        );
        assert_eq!(
            AuthzError::Store(StoreError::group_not_found(id)).to_string(),
            format!("group {} not found", id)
        );
    }

    #[tokio::test]
    async fn test_require_membership_and_creator() {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for name in ["ada", "bob"] {
            let user = store
                .create_user(CreateUser {
                    username: name.to_string(),
                    first_name: name.to_string(),
                    last_name: "Test".to_string(),
                    email: format!("{}@example.com", name),
                    password_hash: "$argon2id$placeholder".to_string(),
                    photo: None,
                })
                .await
                .unwrap();
            ids.push(user.id);
        }
        let (ada, bob) = (ids[0], ids[1]);
        let g = store.create_group("Launch", ada).await.unwrap();

        assert!(require_membership(&store, g.id, ada).await.is_ok());
        assert!(matches!(
            require_membership(&store, g.id, bob).await,
            Err(AuthzError::NotMember(_))
        ));
        assert!(matches!(
            require_membership(&store, Uuid::new_v4(), ada).await,
            Err(AuthzError::Store(StoreError::NotFound { .. }))
        ));

        store.add_member(g.id, bob).await.unwrap();
        assert!(require_membership(&store, g.id, bob).await.is_ok());
        assert!(require_creator(&store, g.id, ada).await.is_ok());
        assert!(matches!(
            require_creator(&store, g.id, bob).await,
            Err(AuthzError::NotCreator(_))
        ));
    }
}
