/// Dashboard aggregation
///
/// A dashboard is a pure function of a task set, computed on every request.
/// Nothing is cached or materialized.
///
/// # Response Shape
///
/// ```json
/// {
///   "total": 3,
///   "status_counts": {"not_started": 2, "in_progress": 0, "done": 1},
///   "priority_counts": {"low": 0, "medium": 3, "high": 0},
///   "assignee_priority": {"<user id>": {"low": 0, "medium": 1, "high": 0}},
///   "priority_status": {
///     "low": {"not_started": 0, "in_progress": 0, "done": 0},
///     "medium": {"not_started": 2, "in_progress": 0, "done": 1},
///     "high": {"not_started": 0, "in_progress": 0, "done": 0}
///   }
/// }
/// ```
///
/// Every status and priority key is always present, zero or not.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::task::{Task, TaskPriority, TaskStatus};

/// Task count per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub not_started: u64,
    pub in_progress: u64,
    pub done: u64,
}

impl StatusCounts {
    fn bump(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::NotStarted => self.not_started += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Done => self.done += 1,
        }
    }

    pub fn get(&self, status: TaskStatus) -> u64 {
        match status {
            TaskStatus::NotStarted => self.not_started,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Done => self.done,
        }
    }
}

/// Task count per priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
}

impl PriorityCounts {
    fn bump(&mut self, priority: TaskPriority) {
        match priority {
            TaskPriority::Low => self.low += 1,
            TaskPriority::Medium => self.medium += 1,
            TaskPriority::High => self.high += 1,
        }
    }

    pub fn get(&self, priority: TaskPriority) -> u64 {
        match priority {
            TaskPriority::Low => self.low,
            TaskPriority::Medium => self.medium,
            TaskPriority::High => self.high,
        }
    }
}

/// Priority x status cross tabulation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityStatus {
    pub low: StatusCounts,
    pub medium: StatusCounts,
    pub high: StatusCounts,
}

impl PriorityStatus {
    pub fn row(&self, priority: TaskPriority) -> &StatusCounts {
        match priority {
            TaskPriority::Low => &self.low,
            TaskPriority::Medium => &self.medium,
            TaskPriority::High => &self.high,
        }
    }

    fn row_mut(&mut self, priority: TaskPriority) -> &mut StatusCounts {
        match priority {
            TaskPriority::Low => &mut self.low,
            TaskPriority::Medium => &mut self.medium,
            TaskPriority::High => &mut self.high,
        }
    }
}

/// Aggregate view over a task set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub total: u64,
    pub status_counts: StatusCounts,
    pub priority_counts: PriorityCounts,
    /// Per-assignee breakdown by priority; a task with several assignees
    /// counts once for each of them
    pub assignee_priority: BTreeMap<Uuid, PriorityCounts>,
    pub priority_status: PriorityStatus,
}

impl Dashboard {
    /// Aggregates a task set
    pub fn from_tasks<'a, I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut dashboard = Dashboard::default();

        for task in tasks {
            dashboard.total += 1;
            dashboard.status_counts.bump(task.status);
            dashboard.priority_counts.bump(task.priority);
            dashboard
                .priority_status
                .row_mut(task.priority)
                .bump(task.status);

            for assignee in &task.assigned_to {
                dashboard
                    .assignee_priority
                    .entry(*assignee)
                    .or_default()
                    .bump(task.priority);
            }
        }

        dashboard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(status: TaskStatus, priority: TaskPriority, assigned_to: Vec<Uuid>) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            board_id: Uuid::nil(),
            created_by: Uuid::nil(),
            title: "t".to_string(),
            description: None,
            status,
            priority,
            deadline: None,
            assigned_to,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_dashboard_has_all_keys() {
        let dashboard = Dashboard::from_tasks(&[]);
        assert_eq!(dashboard.total, 0);

        let json = serde_json::to_value(&dashboard).unwrap();
        assert_eq!(json["status_counts"]["in_progress"], 0);
        assert_eq!(json["priority_counts"]["high"], 0);
        assert_eq!(json["priority_status"]["low"]["done"], 0);
        assert!(json["assignee_priority"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_status_counts() {
        let tasks = vec![
            task(TaskStatus::NotStarted, TaskPriority::Medium, vec![]),
            task(TaskStatus::NotStarted, TaskPriority::Medium, vec![]),
            task(TaskStatus::Done, TaskPriority::Medium, vec![]),
        ];
        let dashboard = Dashboard::from_tasks(&tasks);

        assert_eq!(dashboard.total, 3);
        assert_eq!(
            dashboard.status_counts,
            StatusCounts {
                not_started: 2,
                in_progress: 0,
                done: 1
            }
        );
    }

    #[test]
    fn test_cross_tabulation_and_assignees() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let tasks = vec![
            task(TaskStatus::InProgress, TaskPriority::High, vec![a, b]),
            task(TaskStatus::Done, TaskPriority::High, vec![a]),
            task(TaskStatus::NotStarted, TaskPriority::Low, vec![]),
        ];
        let dashboard = Dashboard::from_tasks(&tasks);

        assert_eq!(dashboard.priority_counts.get(TaskPriority::High), 2);
        assert_eq!(dashboard.priority_counts.get(TaskPriority::Low), 1);
        assert_eq!(dashboard.priority_status.row(TaskPriority::High).in_progress, 1);
        assert_eq!(dashboard.priority_status.row(TaskPriority::High).done, 1);
        assert_eq!(dashboard.priority_status.row(TaskPriority::Low).not_started, 1);

        assert_eq!(dashboard.assignee_priority[&a].high, 2);
        assert_eq!(dashboard.assignee_priority[&b].high, 1);
        assert_eq!(dashboard.assignee_priority.len(), 2);
    }

    #[test]
    fn test_cross_tab_sums_to_total() {
        let tasks: Vec<Task> = TaskStatus::ALL
            .iter()
            .flat_map(|s| TaskPriority::ALL.iter().map(move |p| task(*s, *p, vec![])))
            .collect();
        let dashboard = Dashboard::from_tasks(&tasks);

        let sum: u64 = TaskPriority::ALL
            .iter()
            .flat_map(|p| TaskStatus::ALL.iter().map(move |s| (*p, *s)))
            .map(|(p, s)| dashboard.priority_status.row(p).get(s))
            .sum();
        assert_eq!(sum, dashboard.total);
        assert_eq!(dashboard.total, 9);
    }
}
