use anyhow::{Context, Result};
use chrono::NaiveDate;
use prettytable::Table;
use scrumsheet::config::Settings;
use scrumsheet::model::{Priority, Sprint};
use scrumsheet::report::{summary, task_status};
use scrumsheet::{SheetStore, Tracker};

/// Width used to wrap the task list of a sprint.
const TASKS_COLUMN_WIDTH: usize = 48;

type SheetTracker = Tracker<SheetStore>;

pub fn add_task(
    tracker: &mut SheetTracker,
    name: String,
    priority: Priority,
    points: u32,
    assignee: String,
) -> Result<()> {
    let item = tracker
        .add_task(&name, priority, points, &assignee)
        .context("Failed to add task to the backlog.")?;
    println!(
        "{} ({}, {} points) added to the backlog.",
        item.task_name, item.priority, item.story_points
    );
    Ok(())
}

pub fn mark_done(tracker: &mut SheetTracker, task: String) -> Result<()> {
    tracker
        .mark_completed(&task)
        .context("Failed to complete task.")?;
    println!("{} completed.", task);
    Ok(())
}

pub fn backlog(tracker: &SheetTracker) -> Result<()> {
    let items = tracker.list_items();
    if items.is_empty() {
        println!("The backlog is empty. Use 'scrumsheet add' to add tasks.");
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(row!["#", "task", "priority", "points", "assigned to", "status"]);
    for (position, item) in items.iter().enumerate() {
        table.add_row(row![
            position + 1,
            item.task_name,
            item.priority,
            item.story_points,
            item.assigned_to,
            item.status
        ]);
    }
    table.printstd();
    Ok(())
}

pub fn start_sprint(
    tracker: &mut SheetTracker,
    settings: &Settings,
    name: String,
    length: u32,
) -> Result<()> {
    let sprint = tracker
        .start_sprint(&name, length, &settings.now())
        .context("Failed to start sprint.")?;
    println!(
        "Sprint '{}' started: {} to {}.",
        sprint.sprint_name, sprint.start_date, sprint.end_date
    );
    Ok(())
}

pub fn assign(tracker: &mut SheetTracker, sprint: String, task: String, to: String) -> Result<()> {
    tracker
        .assign_task(&sprint, &task, &to)
        .context("Failed to assign task.")?;
    println!("Task '{}' assigned to sprint '{}'.", task, sprint);
    Ok(())
}

pub fn complete(tracker: &mut SheetTracker, sprint: String, task: String) -> Result<()> {
    tracker
        .complete_assignment(&sprint, &task)
        .context("Failed to complete sprint task.")?;
    println!("Task '{}' completed in sprint '{}'.", task, sprint);
    Ok(())
}

pub fn close(
    tracker: &mut SheetTracker,
    settings: &Settings,
    sprint: String,
    on: Option<NaiveDate>,
) -> Result<()> {
    let closed_on = on.unwrap_or_else(|| settings.today());
    tracker
        .close_sprint(&sprint, closed_on)
        .context("Failed to close sprint.")?;
    println!("Sprint '{}' closed on {}.", sprint, closed_on);
    Ok(())
}

fn fmt_tasks(sprint: &Sprint) -> String {
    if sprint.assigned_tasks.is_empty() {
        return "-".to_string();
    }
    let text = sprint
        .assigned_tasks
        .iter()
        .map(|a| {
            let mut entry = a.task_name.clone();
            if !a.assigned_to.is_empty() {
                entry.push_str(&format!(" ({})", a.assigned_to));
            }
            if a.completed {
                entry.push_str(" [done]");
            }
            entry
        })
        .collect::<Vec<_>>()
        .join(", ");
    textwrap::fill(&text, TASKS_COLUMN_WIDTH)
}

pub fn sprints(tracker: &SheetTracker, settings: &Settings) -> Result<()> {
    let sprints = tracker.list_sprints();
    if sprints.is_empty() {
        println!("No sprints yet. Use 'scrumsheet start' to start one.");
        return Ok(());
    }

    let today = settings.today();
    let mut table = Table::new();
    table.add_row(row!["sprint", "start", "end", "closed", "status", "tasks"]);
    for sprint in sprints {
        let closed = sprint
            .actual_close_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(row![
            sprint.sprint_name,
            sprint.start_date,
            sprint.end_date,
            closed,
            task_status(sprint, today),
            fmt_tasks(sprint)
        ]);
    }
    table.printstd();
    Ok(())
}

pub fn report(tracker: &SheetTracker, settings: &Settings) -> Result<()> {
    let sprints = tracker.list_sprints();
    if sprints.is_empty() {
        println!("Not enough sprint data available for a report.");
        return Ok(());
    }

    let figures = summary(sprints, settings.today());
    println!(
        "Based on past sprints, the average velocity is {:.2} tasks per sprint.",
        figures.velocity
    );
    println!(
        "For the next sprint, consider selecting around {} tasks.",
        figures.suggested_sprint_size
    );
    println!("Completion rate: {:.1}%", figures.completion_rate);

    let mut table = Table::new();
    table.add_row(row!["sprint", "start", "assigned tasks", "status"]);
    for ((name, status), (start, count)) in figures.statuses.iter().zip(figures.burndown.iter()) {
        table.add_row(row![name, start, count, status]);
    }
    table.printstd();
    Ok(())
}
