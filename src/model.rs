use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::TrackerError;

/// Smallest and largest story point estimate accepted for a task.
pub const MIN_STORY_POINTS: u32 = 1;
pub const MAX_STORY_POINTS: u32 = 21;

/// Shortest and longest sprint, in days.
pub const MIN_SPRINT_DAYS: u32 = 1;
pub const MAX_SPRINT_DAYS: u32 = 30;

/// How urgent a backlog item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(TrackerError::validation(
                "priority",
                format!("expected High, Medium or Low, got '{}'", s),
            )),
        }
    }
}

/// Where a backlog item stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Backlog,
    InSprint,
    Completed,
}

impl TaskStatus {
    /// The label written to the sheet.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Backlog => "Backlog",
            TaskStatus::InSprint => "In Sprint",
            TaskStatus::Completed => "Completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Backlog" => Some(TaskStatus::Backlog),
            "In Sprint" | "InSprint" => Some(TaskStatus::InSprint),
            "Completed" => Some(TaskStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single unit of work, saved as a row of the Backlog sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacklogItem {
    pub task_name: String,
    pub priority: Priority,
    pub story_points: u32,
    pub assigned_to: String,
    pub status: TaskStatus,
}

/// One task placed in a sprint. The same task may be assigned more than once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub task_name: String,
    pub assigned_to: String,
    pub completed: bool,
}

impl Assignment {
    pub fn new(task_name: &str, assigned_to: &str) -> Self {
        Assignment {
            task_name: task_name.to_string(),
            assigned_to: assigned_to.to_string(),
            completed: false,
        }
    }
}

/// A time-boxed sprint, saved as a row of the Sprints sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprint {
    pub sprint_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub assigned_tasks: Vec<Assignment>,
    pub actual_close_date: Option<NaiveDate>,
}

/// Traits
pub trait SprintExtra {
    fn is_closed(&self) -> bool;
    fn assigned_count(&self) -> usize;
    fn completed_count(&self) -> usize;
}

impl SprintExtra for Sprint {
    fn is_closed(&self) -> bool {
        self.actual_close_date.is_some()
    }

    fn assigned_count(&self) -> usize {
        self.assigned_tasks.len()
    }

    fn completed_count(&self) -> usize {
        self.assigned_tasks.iter().filter(|a| a.completed).count()
    }
}
