//! Read-only figures derived from the sprints.

use std::fmt;

use chrono::NaiveDate;

use crate::model::{Sprint, SprintExtra};

/// How a sprint stands against its end date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SprintStatus {
    ClosedOnTime,
    ClosedLate,
    OnTrack,
    OnTime,
    Late,
}

impl SprintStatus {
    pub fn label(self) -> &'static str {
        match self {
            SprintStatus::ClosedOnTime => "Closed On Time",
            SprintStatus::ClosedLate => "Closed Late",
            SprintStatus::OnTrack => "On Track",
            SprintStatus::OnTime => "On Time",
            SprintStatus::Late => "Late",
        }
    }
}

impl fmt::Display for SprintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a sprint on `reference_date`. A close date decides on its own;
/// otherwise the end date is compared with the reference date.
pub fn task_status(sprint: &Sprint, reference_date: NaiveDate) -> SprintStatus {
    if let Some(closed_on) = sprint.actual_close_date {
        if closed_on <= sprint.end_date {
            return SprintStatus::ClosedOnTime;
        }
        return SprintStatus::ClosedLate;
    }

    if sprint.end_date > reference_date {
        SprintStatus::OnTrack
    } else if sprint.end_date == reference_date {
        SprintStatus::OnTime
    } else {
        SprintStatus::Late
    }
}

/// Average number of assignments per sprint, counting only sprints that
/// have at least one.
pub fn velocity(sprints: &[Sprint]) -> f64 {
    let counts: Vec<usize> = sprints
        .iter()
        .map(|s| s.assigned_count())
        .filter(|&count| count > 0)
        .collect();

    if counts.is_empty() {
        return 0.0;
    }
    counts.iter().sum::<usize>() as f64 / counts.len() as f64
}

/// Suggested number of tasks for the next sprint.
pub fn suggested_sprint_size(sprints: &[Sprint]) -> usize {
    velocity(sprints).floor() as usize
}

/// Percentage of assignments marked completed, over all sprints.
pub fn completion_rate(sprints: &[Sprint]) -> f64 {
    let total: usize = sprints.iter().map(|s| s.assigned_count()).sum();
    if total == 0 {
        return 0.0;
    }
    let completed: usize = sprints.iter().map(|s| s.completed_count()).sum();
    completed as f64 / total as f64 * 100.0
}

/// One point per sprint, in creation order: its start date and how many
/// tasks it has been assigned.
pub fn burndown_series(sprints: &[Sprint]) -> Vec<(NaiveDate, usize)> {
    sprints
        .iter()
        .map(|s| (s.start_date, s.assigned_count()))
        .collect()
}

/// Everything the report view shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub velocity: f64,
    pub suggested_sprint_size: usize,
    pub completion_rate: f64,
    pub burndown: Vec<(NaiveDate, usize)>,
    pub statuses: Vec<(String, SprintStatus)>,
}

pub fn summary(sprints: &[Sprint], reference_date: NaiveDate) -> Report {
    Report {
        velocity: velocity(sprints),
        suggested_sprint_size: suggested_sprint_size(sprints),
        completion_rate: completion_rate(sprints),
        burndown: burndown_series(sprints),
        statuses: sprints
            .iter()
            .map(|s| (s.sprint_name.clone(), task_status(s, reference_date)))
            .collect(),
    }
}
