//! The delimited `Tasks` column of the Sprints sheet.
//!
//! Each assignment is written as `<task> (Assigned to: <name>), ` and a
//! completed one gets a ` (Completed)` marker after the assignee group.
//! Entries without an assignee group (`<task>, `) are read as assignments
//! with an empty assignee. Task names must not contain `", "`.

use crate::model::Assignment;

const SEPARATOR: &str = ", ";
const ASSIGNEE_OPEN: &str = " (Assigned to: ";
const COMPLETED_MARKER: &str = " (Completed)";

/// Return the first sequence of `text` that the `Tasks` column uses as
/// structure, if any. Such text cannot be read back unchanged.
pub fn reserved_sequence(text: &str) -> Option<&'static str> {
    [SEPARATOR, ASSIGNEE_OPEN, COMPLETED_MARKER]
        .iter()
        .copied()
        .find(|sequence| text.contains(sequence))
}

/// Render assignments in sheet order, each followed by the separator.
pub fn format_tasks(assignments: &[Assignment]) -> String {
    let mut text = String::new();
    for assignment in assignments {
        text.push_str(&assignment.task_name);
        text.push_str(ASSIGNEE_OPEN);
        text.push_str(&assignment.assigned_to);
        text.push(')');
        if assignment.completed {
            text.push_str(COMPLETED_MARKER);
        }
        text.push_str(SEPARATOR);
    }
    text
}

/// Read a `Tasks` cell back into assignments. Blank entries are skipped.
pub fn parse_tasks(text: &str) -> Vec<Assignment> {
    text.split(SEPARATOR)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_entry)
        .collect()
}

fn parse_entry(entry: &str) -> Assignment {
    let (entry, completed) = match entry.strip_suffix(COMPLETED_MARKER.trim_start()) {
        Some(rest) => (rest.trim_end(), true),
        None => (entry, false),
    };

    if entry.ends_with(')') {
        if let Some(open) = entry.rfind(ASSIGNEE_OPEN) {
            let task_name = &entry[..open];
            let assigned_to = &entry[open + ASSIGNEE_OPEN.len()..entry.len() - 1];
            return Assignment {
                task_name: task_name.to_string(),
                assigned_to: assigned_to.to_string(),
                completed,
            };
        }
    }

    Assignment {
        task_name: entry.to_string(),
        assigned_to: String::new(),
        completed,
    }
}
