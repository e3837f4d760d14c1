use std::convert::TryFrom;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use humantime::parse_duration;
use scrumsheet::Priority;
use structopt::StructOpt;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Create the Backlog and Sprints worksheets.
    Init,
    /// Add a task to the backlog.
    Add {
        /// The task name.
        #[structopt()]
        name: String,

        /// High, Medium or Low.
        #[structopt(short, long, default_value = "Medium")]
        priority: Priority,

        /// Effort estimate, 1 to 21.
        #[structopt(short = "s", long, default_value = "1")]
        points: u32,

        /// Who owns the task.
        #[structopt(short, long, default_value = "")]
        assignee: String,
    },
    /// Mark a backlog task as completed.
    Done {
        #[structopt()]
        task: String,
    },
    /// List the backlog.
    Backlog,
    /// Start a sprint today.
    Start {
        /// The sprint name.
        #[structopt()]
        name: String,

        /// Length in days ("14") or as a span of whole days ("2weeks").
        #[structopt(parse(try_from_str = parse_sprint_length))]
        length: u32,
    },
    /// Assign a backlog task to a sprint.
    Assign {
        #[structopt()]
        sprint: String,

        #[structopt()]
        task: String,

        /// Who works on it during the sprint.
        #[structopt(short, long, default_value = "")]
        to: String,
    },
    /// Mark a task assigned to a sprint as completed.
    Complete {
        #[structopt()]
        sprint: String,

        #[structopt()]
        task: String,
    },
    /// Close a sprint.
    Close {
        #[structopt()]
        sprint: String,

        /// Close date as YYYY-MM-DD. Defaults to today.
        #[structopt(long, parse(try_from_str = parse_date))]
        on: Option<NaiveDate>,
    },
    /// Show every sprint and how it stands.
    Sprints,
    /// Show velocity, completion rate and burndown.
    Report,
}

#[derive(Debug, StructOpt)]
#[structopt(name = "scrumsheet", about = "Backlog and sprint tracking in a sheet.")]
pub struct CommandLineArgs {
    #[structopt(subcommand)]
    pub action: Command,

    /// Use a different sheet file.
    #[structopt(parse(from_os_str), short = "f", long)]
    pub sheet_file: Option<PathBuf>,

    /// Hours east of UTC used to decide what "today" is.
    #[structopt(long, env = "SCRUMSHEET_UTC_OFFSET", allow_hyphen_values = true)]
    pub utc_offset: Option<i32>,
}

/// Accept a plain number of days, or a humantime span of whole days.
pub fn parse_sprint_length(text: &str) -> Result<u32> {
    if let Ok(days) = text.trim().parse::<u32>() {
        return Ok(days);
    }
    let span = parse_duration(text)?;
    if span.as_secs() % SECONDS_PER_DAY != 0 || span.subsec_nanos() != 0 {
        return Err(anyhow!("Sprint length '{}' is not a whole number of days.", text));
    }
    u32::try_from(span.as_secs() / SECONDS_PER_DAY)
        .map_err(|_| anyhow!("Sprint length '{}' is too long.", text))
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")?)
}
