//! Client-side views over already-fetched task lists.

use crate::types::{Task, TaskStatus};

/// List-view filter: case-insensitive title search and exact due date.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub search: Option<String>,
    /// `YYYY-MM-DD`, compared verbatim against the task date.
    pub date: Option<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if !task.title.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }
        if let Some(date) = self.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            if task.date != date {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks.iter().filter(|t| self.matches(t)).collect()
    }
}

#[derive(Debug, Clone)]
pub struct KanbanColumn {
    pub status: TaskStatus,
    pub items: Vec<Task>,
}

/// A card moved between columns; the one backend call a drop produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub task_id: String,
    pub status: TaskStatus,
}

/// Four status columns in fixed order.
#[derive(Debug, Clone)]
pub struct KanbanBoard {
    columns: Vec<KanbanColumn>,
}

impl KanbanBoard {
    /// Group tasks by status. Tasks with an unknown status are left out.
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut columns: Vec<KanbanColumn> = TaskStatus::ALL
            .into_iter()
            .map(|status| KanbanColumn {
                status,
                items: Vec::new(),
            })
            .collect();

        for task in tasks {
            let Some(status) = task.status() else {
                continue;
            };
            if let Some(column) = columns.iter_mut().find(|c| c.status == status) {
                column.items.push(task);
            }
        }

        Self { columns }
    }

    pub fn columns(&self) -> &[KanbanColumn] {
        &self.columns
    }

    pub fn column(&self, status: TaskStatus) -> &[Task] {
        self.columns
            .iter()
            .find(|c| c.status == status)
            .map(|c| c.items.as_slice())
            .unwrap_or_default()
    }

    /// Move a card locally. Returns the status change to send, or `None`
    /// when the source index is out of range (nothing moved).
    pub fn move_task(
        &mut self,
        from: TaskStatus,
        from_index: usize,
        to: TaskStatus,
        to_index: usize,
    ) -> Option<StatusChange> {
        let source = self.columns.iter_mut().find(|c| c.status == from)?;
        if from_index >= source.items.len() {
            return None;
        }
        let mut task = source.items.remove(from_index);
        task.status = Some(to.as_str().to_string());

        let dest = self.columns.iter_mut().find(|c| c.status == to)?;
        let index = to_index.min(dest.items.len());
        let change = StatusChange {
            task_id: task.id.clone(),
            status: to,
        };
        dest.items.insert(index, task);
        Some(change)
    }
}
