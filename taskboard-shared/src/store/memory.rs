/// In-memory store
///
/// Keeps users, groups, and tasks in vectors behind one `tokio::sync::RwLock`.
/// Every mutating operation takes the write lock exactly once, checks all of
/// its preconditions, and only then writes, so each call is atomic and a
/// failed call leaves no trace.
///
/// Vector order is insertion order, which doubles as creation order for
/// listings.
///
/// Used by the test suites and by `STORE_BACKEND=memory` for local runs;
/// data does not survive a restart.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{first_non_member, Store};
use crate::error::{StoreError, StoreResult};
use crate::models::group::Group;
use crate::models::task::{CreateTask, Task, TaskFilter, TaskPatch};
use crate::models::user::{CreateUser, User};

#[derive(Debug, Default)]
struct State {
    users: Vec<User>,
    groups: Vec<Group>,
    tasks: Vec<Task>,
}

impl State {
    fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn group(&self, id: Uuid) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    fn group_mut(&mut self, id: Uuid) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.id == id)
    }

    fn task_index(&self, id: Uuid) -> StoreResult<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| StoreError::task_not_found(id))
    }
}

/// Store backed by process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut state = self.state.write().await;

        if state.users.iter().any(|u| u.username == data.username) {
            return Err(StoreError::DuplicateIdentity { field: "username" });
        }
        if state
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&data.email))
        {
            return Err(StoreError::DuplicateIdentity { field: "email" });
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: data.username,
            first_name: data.first_name,
            last_name: data.last_name,
            email: data.email,
            password_hash: data.password_hash,
            photo: data.photo,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };
        state.users.push(user.clone());

        info!(user_id = %user.id, username = %user.username, "User created");
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.user(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn list_users(&self, limit: i64, offset: i64) -> StoreResult<Vec<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn record_login(&self, user_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| StoreError::user_not_found(user_id))?;
        user.last_login_at = Some(Utc::now());
        Ok(())
    }

    async fn create_group(&self, name: &str, creator_id: Uuid) -> StoreResult<Group> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::validation("name", "must not be empty"));
        }

        let mut state = self.state.write().await;
        if state.user(creator_id).is_none() {
            return Err(StoreError::user_not_found(creator_id));
        }

        let group = Group {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_by: creator_id,
            members: vec![creator_id],
            created_at: Utc::now(),
        };
        state.groups.push(group.clone());

        info!(group_id = %group.id, creator_id = %creator_id, "Group created");
        Ok(group)
    }

    async fn find_group(&self, id: Uuid) -> StoreResult<Option<Group>> {
        Ok(self.state.read().await.group(id).cloned())
    }

    async fn list_groups_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Group>> {
        let state = self.state.read().await;
        Ok(state
            .groups
            .iter()
            .filter(|g| g.has_member(user_id))
            .cloned()
            .collect())
    }

    async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> StoreResult<Group> {
        let mut state = self.state.write().await;

        let user_exists = state.user(user_id).is_some();
        let group = state
            .group_mut(group_id)
            .ok_or_else(|| StoreError::group_not_found(group_id))?;
        if !user_exists {
            return Err(StoreError::user_not_found(user_id));
        }
        if group.has_member(user_id) {
            return Err(StoreError::AlreadyMember { group_id, user_id });
        }

        group.members.push(user_id);
        info!(%group_id, %user_id, "Member added");
        Ok(group.clone())
    }

    async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> StoreResult<Group> {
        let mut state = self.state.write().await;

        let group = state
            .group_mut(group_id)
            .ok_or_else(|| StoreError::group_not_found(group_id))?;
        if group.is_creator(user_id) {
            warn!(%group_id, %user_id, "Refused to remove group creator");
            return Err(StoreError::CannotRemoveCreator(group_id));
        }
        if !group.has_member(user_id) {
            return Err(StoreError::NotAMember { group_id, user_id });
        }

        group.members.retain(|m| *m != user_id);
        let group = group.clone();

        let mut unassigned = 0;
        for task in state.tasks.iter_mut().filter(|t| t.board_id == group_id) {
            let before = task.assigned_to.len();
            task.assigned_to.retain(|a| *a != user_id);
            if task.assigned_to.len() != before {
                task.updated_at = Utc::now();
                unassigned += 1;
            }
        }

        info!(%group_id, %user_id, unassigned_tasks = unassigned, "Member removed");
        Ok(group)
    }

    async fn delete_group(&self, group_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;

        let before = state.groups.len();
        state.groups.retain(|g| g.id != group_id);
        if state.groups.len() == before {
            return Err(StoreError::group_not_found(group_id));
        }

        let tasks_before = state.tasks.len();
        state.tasks.retain(|t| t.board_id != group_id);

        info!(
            %group_id,
            deleted_tasks = tasks_before - state.tasks.len(),
            "Group deleted"
        );
        Ok(())
    }

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        let mut state = self.state.write().await;

        let board = state
            .group(data.board_id)
            .ok_or_else(|| StoreError::board_not_found(data.board_id))?;
        if let Some(user_id) = first_non_member(&data.assigned_to, &board.members) {
            warn!(board_id = %data.board_id, %user_id, "Initial assignee is not a board member");
            return Err(StoreError::AssigneeNotBoardMember {
                board_id: data.board_id,
                user_id,
            });
        }

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            board_id: data.board_id,
            created_by: data.created_by,
            title: data.title,
            description: data.description,
            status: data.status,
            priority: data.priority,
            deadline: data.deadline,
            assigned_to: data.assigned_to,
            created_at: now,
            updated_at: now,
        };
        state.tasks.push(task.clone());

        info!(task_id = %task.id, board_id = %task.board_id, "Task created");
        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let state = self.state.read().await;
        Ok(state.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> StoreResult<Task> {
        let mut state = self.state.write().await;

        let index = state.task_index(id)?;
        if let Some(assigned_to) = &patch.assigned_to {
            let board_id = state.tasks[index].board_id;
            let board = state
                .group(board_id)
                .ok_or_else(|| StoreError::board_not_found(board_id))?;
            if let Some(user_id) = first_non_member(assigned_to, &board.members) {
                warn!(%board_id, %user_id, "Assignee is not a board member");
                return Err(StoreError::AssigneeNotBoardMember { board_id, user_id });
            }
        }

        let task = &mut state.tasks[index];
        patch.apply_to(task);

        info!(task_id = %id, "Task updated");
        Ok(task.clone())
    }

    async fn assign_user(&self, task_id: Uuid, user_id: Uuid) -> StoreResult<Task> {
        let mut state = self.state.write().await;

        let index = state.task_index(task_id)?;
        let board_id = state.tasks[index].board_id;
        let board = state
            .group(board_id)
            .ok_or_else(|| StoreError::board_not_found(board_id))?;
        if !board.has_member(user_id) {
            warn!(%task_id, %board_id, %user_id, "Assignee is not a board member");
            return Err(StoreError::AssigneeNotBoardMember { board_id, user_id });
        }

        let task = &mut state.tasks[index];
        if !task.is_assigned_to(user_id) {
            task.assigned_to.push(user_id);
            task.updated_at = Utc::now();
            info!(%task_id, %user_id, "User assigned");
        } else {
            debug!(%task_id, %user_id, "User already assigned");
        }

        Ok(task.clone())
    }

    async fn unassign_user(&self, task_id: Uuid, user_id: Uuid) -> StoreResult<Task> {
        let mut state = self.state.write().await;

        let index = state.task_index(task_id)?;
        let task = &mut state.tasks[index];
        if task.is_assigned_to(user_id) {
            task.assigned_to.retain(|a| *a != user_id);
            task.updated_at = Utc::now();
            info!(%task_id, %user_id, "User unassigned");
        }

        Ok(task.clone())
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;

        let index = state.task_index(id)?;
        state.tasks.remove(index);

        info!(task_id = %id, "Task deleted");
        Ok(())
    }

    async fn list_tasks(&self, filter: TaskFilter) -> StoreResult<Vec<Task>> {
        let state = self.state.read().await;

        let tasks: Vec<Task> = state
            .tasks
            .iter()
            .filter(|t| filter.matches_task(t))
            .filter(|t| {
                filter.member_id.map_or(true, |member| {
                    state.group(t.board_id).map_or(false, |g| g.has_member(member))
                })
            })
            .cloned()
            .collect();

        debug!(?filter, count = tasks.len(), "Listed tasks");
        Ok(tasks)
    }
}
