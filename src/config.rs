use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use directories::ProjectDirs;

/// Hours east of UTC used when no offset is given: US Eastern standard time.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = -5;

/// Where the sheet lives and which timezone "today" is computed in.
#[derive(Debug, Clone)]
pub struct Settings {
    pub sheet_file: PathBuf,
    pub utc_offset: FixedOffset,
}

impl Settings {
    /// Build settings from the command line values, falling back to the
    /// per-user data directory and the default offset.
    pub fn resolve(sheet_file: Option<PathBuf>, utc_offset_hours: Option<i32>) -> Result<Self> {
        let sheet_file = match sheet_file {
            Some(path) => path,
            None => find_default_sheet_file()?,
        };
        let utc_offset = offset_from_hours(utc_offset_hours.unwrap_or(DEFAULT_UTC_OFFSET_HOURS))?;
        Ok(Settings {
            sheet_file,
            utc_offset,
        })
    }

    /// The current time in the reference timezone.
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.utc_offset)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().naive_local().date()
    }
}

/// Turn a whole-hour offset into a timezone.
pub fn offset_from_hours(hours: i32) -> Result<FixedOffset> {
    if !(-23..=23).contains(&hours) {
        return Err(anyhow!("UTC offset must be between -23 and 23 hours, got {}", hours));
    }
    FixedOffset::east_opt(hours * 3600).ok_or_else(|| anyhow!("Invalid UTC offset {}.", hours))
}

fn find_default_sheet_file() -> Result<PathBuf> {
    let base_dirs = ProjectDirs::from("com", "scrumsheet", "scrumsheet")
        .ok_or_else(|| anyhow!("Failed to find a home directory for the sheet file."))?;
    let root_dir = base_dirs.data_dir();
    if !root_dir.exists() {
        std::fs::create_dir_all(root_dir)
            .with_context(|| format!("Failed to create directory {}.", root_dir.display()))?;
    }
    let mut path = PathBuf::from(root_dir);
    path.push("sheet.sqlite");
    Ok(path)
}
