use chrono::{DateTime, Duration, NaiveDate, TimeZone};
use log::{info, warn};

use crate::error::{EntityKind, TrackerError, TrackerResult};
use crate::legacy::reserved_sequence;
use crate::model::{
    Assignment, BacklogItem, Priority, Sprint, TaskStatus, MAX_SPRINT_DAYS, MAX_STORY_POINTS,
    MIN_SPRINT_DAYS, MIN_STORY_POINTS,
};
use crate::storage::{StorageClient, StorageResult};

/// The backlog and the sprints of one session, with the storage that holds
/// their durable copy.
///
/// Every mutation verifies the storage schema first, changes memory, then
/// persists. When persisting fails the in-memory state is kept as mutated;
/// call `resync` to fall back to what storage holds.
pub struct Tracker<S: StorageClient> {
    storage: S,
    backlog: Vec<BacklogItem>,
    sprints: Vec<Sprint>,
}

impl<S: StorageClient> Tracker<S> {
    /// Seed a tracker from storage.
    pub fn load(storage: S) -> TrackerResult<Self> {
        storage.verify_schema()?;
        let backlog = storage.load_backlog()?;
        let sprints = storage.load_sprints()?;
        info!(
            "loaded {} backlog items and {} sprints",
            backlog.len(),
            sprints.len()
        );
        Ok(Tracker {
            storage,
            backlog,
            sprints,
        })
    }

    /// Drop in-memory state and reload both stores.
    pub fn resync(&mut self) -> TrackerResult<()> {
        warn!("resynchronizing tracker from storage");
        self.storage.verify_schema()?;
        let backlog = self.storage.load_backlog()?;
        let sprints = self.storage.load_sprints()?;
        self.backlog = backlog;
        self.sprints = sprints;
        Ok(())
    }

    pub fn list_items(&self) -> &[BacklogItem] {
        &self.backlog
    }

    pub fn list_sprints(&self) -> &[Sprint] {
        &self.sprints
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Append a new item to the backlog.
    pub fn add_task(
        &mut self,
        name: &str,
        priority: Priority,
        story_points: u32,
        assigned_to: &str,
    ) -> TrackerResult<BacklogItem> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackerError::validation("task name", "must not be empty"));
        }
        check_sheet_text("task name", name)?;
        let assigned_to = assigned_to.trim();
        check_sheet_text("assignee", assigned_to)?;
        if story_points < MIN_STORY_POINTS || story_points > MAX_STORY_POINTS {
            return Err(TrackerError::validation(
                "story points",
                format!(
                    "must be between {} and {}, got {}",
                    MIN_STORY_POINTS, MAX_STORY_POINTS, story_points
                ),
            ));
        }
        self.storage.verify_schema()?;

        let item = BacklogItem {
            task_name: name.to_string(),
            priority,
            story_points,
            assigned_to: assigned_to.to_string(),
            status: TaskStatus::Backlog,
        };
        self.backlog.push(item.clone());
        info!("added '{}' to the backlog", item.task_name);

        persist_with(&mut self.storage, |s| s.append_backlog_row(&item))?;
        Ok(item)
    }

    /// Mark the first task named `task_name` as completed, whatever its
    /// current status.
    pub fn mark_completed(&mut self, task_name: &str) -> TrackerResult<()> {
        let index = self.task_index(task_name)?;
        self.storage.verify_schema()?;

        self.backlog[index].status = TaskStatus::Completed;
        info!("marked '{}' completed", task_name);

        let backlog = &self.backlog;
        persist_with(&mut self.storage, |s| s.rewrite_backlog(backlog))
    }

    /// Start a sprint on `now`'s calendar date lasting `duration_days`.
    pub fn start_sprint<Tz: TimeZone>(
        &mut self,
        name: &str,
        duration_days: u32,
        now: &DateTime<Tz>,
    ) -> TrackerResult<Sprint> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackerError::validation("sprint name", "must not be empty"));
        }
        check_sheet_text("sprint name", name)?;
        if duration_days < MIN_SPRINT_DAYS || duration_days > MAX_SPRINT_DAYS {
            return Err(TrackerError::validation(
                "sprint duration",
                format!(
                    "must be between {} and {} days, got {}",
                    MIN_SPRINT_DAYS, MAX_SPRINT_DAYS, duration_days
                ),
            ));
        }
        self.storage.verify_schema()?;

        let start_date = now.naive_local().date();
        let sprint = Sprint {
            sprint_name: name.to_string(),
            start_date,
            end_date: start_date + Duration::days(i64::from(duration_days)),
            assigned_tasks: Vec::new(),
            actual_close_date: None,
        };
        self.sprints.push(sprint.clone());
        info!(
            "started sprint '{}' from {} to {}",
            sprint.sprint_name, sprint.start_date, sprint.end_date
        );

        persist_with(&mut self.storage, |s| s.append_sprint_row(&sprint))?;
        Ok(sprint)
    }

    /// Put a backlog task into a sprint. The backlog item's own assignee
    /// is left alone; the assignment carries `assigned_to`.
    pub fn assign_task(
        &mut self,
        sprint_name: &str,
        task_name: &str,
        assigned_to: &str,
    ) -> TrackerResult<()> {
        let sprint_index = self.sprint_index(sprint_name)?;
        let task_index = self.task_index(task_name)?;
        let task_name = self.backlog[task_index].task_name.clone();
        check_sheet_text("task name", &task_name)?;
        let assigned_to = assigned_to.trim();
        check_sheet_text("assignee", assigned_to)?;
        self.storage.verify_schema()?;

        self.sprints[sprint_index]
            .assigned_tasks
            .push(Assignment::new(&task_name, assigned_to));
        self.backlog[task_index].status = TaskStatus::InSprint;
        info!("assigned '{}' to sprint '{}'", task_name, sprint_name);

        let backlog = &self.backlog;
        let sprints = &self.sprints;
        persist_with(&mut self.storage, |s| {
            s.rewrite_backlog(backlog)?;
            s.rewrite_sprints(sprints)
        })
    }

    /// Mark the first open assignment of `task_name` in the sprint as
    /// completed. Completing an already completed assignment succeeds
    /// without changes.
    pub fn complete_assignment(&mut self, sprint_name: &str, task_name: &str) -> TrackerResult<()> {
        let sprint_index = self.sprint_index(sprint_name)?;
        let task_name = task_name.trim();
        let assignments = &self.sprints[sprint_index].assigned_tasks;
        if !assignments.iter().any(|a| a.task_name == task_name) {
            return Err(TrackerError::not_found(
                EntityKind::Assignment,
                &format!("{} in sprint {}", task_name, sprint_name),
            ));
        }
        let open = assignments
            .iter()
            .position(|a| a.task_name == task_name && !a.completed);
        let open = match open {
            Some(index) => index,
            None => return Ok(()),
        };
        self.storage.verify_schema()?;

        self.sprints[sprint_index].assigned_tasks[open].completed = true;
        info!("completed '{}' in sprint '{}'", task_name, sprint_name);

        let sprints = &self.sprints;
        persist_with(&mut self.storage, |s| s.rewrite_sprints(sprints))
    }

    /// Record the day a sprint was closed. Closing again overwrites the
    /// previous date.
    pub fn close_sprint(&mut self, sprint_name: &str, actual_close_date: NaiveDate) -> TrackerResult<()> {
        let index = self.sprint_index(sprint_name)?;
        self.storage.verify_schema()?;

        self.sprints[index].actual_close_date = Some(actual_close_date);
        info!("closed sprint '{}' on {}", sprint_name, actual_close_date);

        let sprints = &self.sprints;
        persist_with(&mut self.storage, |s| s.rewrite_sprints(sprints))
    }

    fn task_index(&self, task_name: &str) -> TrackerResult<usize> {
        let task_name = task_name.trim();
        self.backlog
            .iter()
            .position(|item| item.task_name == task_name)
            .ok_or_else(|| TrackerError::not_found(EntityKind::Task, task_name))
    }

    fn sprint_index(&self, sprint_name: &str) -> TrackerResult<usize> {
        let sprint_name = sprint_name.trim();
        self.sprints
            .iter()
            .position(|sprint| sprint.sprint_name == sprint_name)
            .ok_or_else(|| TrackerError::not_found(EntityKind::Sprint, sprint_name))
    }
}

/// Reject text the `Tasks` column could not read back as written.
fn check_sheet_text(field: &'static str, text: &str) -> TrackerResult<()> {
    match reserved_sequence(text) {
        Some(sequence) => Err(TrackerError::validation(
            field,
            format!("must not contain '{}'", sequence),
        )),
        None => Ok(()),
    }
}

fn persist_with<S, F>(storage: &mut S, write: F) -> TrackerResult<()>
where
    S: StorageClient,
    F: FnOnce(&mut S) -> StorageResult<()>,
{
    write(storage).map_err(|err| {
        warn!("persisting failed, memory is ahead of storage: {}", err);
        TrackerError::from(err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::storage::SheetStore;
    use chrono::{FixedOffset, TimeZone};

    fn tracker() -> Tracker<SheetStore> {
        let store = SheetStore::open_in_memory().unwrap();
        store.init().unwrap();
        Tracker::load(store).unwrap()
    }

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 1, 23, 30, 0)
            .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Storage that holds rows in memory and can be told to fail writes.
    #[derive(Default)]
    struct FlakyStore {
        backlog: Vec<BacklogItem>,
        sprints: Vec<Sprint>,
        fail_writes: bool,
    }

    impl FlakyStore {
        fn write(&self) -> StorageResult<()> {
            if self.fail_writes {
                Err(StorageError::Unavailable("connection reset".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl StorageClient for FlakyStore {
        fn verify_schema(&self) -> StorageResult<()> {
            Ok(())
        }
        fn load_backlog(&self) -> StorageResult<Vec<BacklogItem>> {
            Ok(self.backlog.clone())
        }
        fn load_sprints(&self) -> StorageResult<Vec<Sprint>> {
            Ok(self.sprints.clone())
        }
        fn append_backlog_row(&mut self, item: &BacklogItem) -> StorageResult<()> {
            self.write()?;
            self.backlog.push(item.clone());
            Ok(())
        }
        fn append_sprint_row(&mut self, sprint: &Sprint) -> StorageResult<()> {
            self.write()?;
            self.sprints.push(sprint.clone());
            Ok(())
        }
        fn rewrite_backlog(&mut self, items: &[BacklogItem]) -> StorageResult<()> {
            self.write()?;
            self.backlog = items.to_vec();
            Ok(())
        }
        fn rewrite_sprints(&mut self, sprints: &[Sprint]) -> StorageResult<()> {
            self.write()?;
            self.sprints = sprints.to_vec();
            Ok(())
        }
    }

    #[test]
    fn add_task_appends_one_backlog_item() {
        let mut tracker = tracker();
        let item = tracker.add_task("Login page", Priority::High, 5, "").unwrap();

        assert_eq!(item.status, TaskStatus::Backlog);
        assert_eq!(tracker.list_items(), &[item.clone()]);
        assert_eq!(tracker.storage().load_backlog().unwrap(), vec![item]);
    }

    #[test]
    fn story_points_bounds() {
        let mut tracker = tracker();
        for points in &[0, 22] {
            let err = tracker.add_task("t", Priority::Low, *points, "").unwrap_err();
            assert!(matches!(err, TrackerError::Validation { field: "story points", .. }));
        }
        tracker.add_task("one", Priority::Low, 1, "").unwrap();
        tracker.add_task("twenty-one", Priority::Low, 21, "").unwrap();
        assert_eq!(tracker.list_items().len(), 2);
    }

    #[test]
    fn empty_task_name_is_rejected() {
        let mut tracker = tracker();
        let err = tracker.add_task("   ", Priority::Low, 3, "").unwrap_err();
        assert!(matches!(err, TrackerError::Validation { field: "task name", .. }));
        assert!(tracker.list_items().is_empty());
    }

    #[test]
    fn start_sprint_ends_duration_days_after_today() {
        let mut tracker = tracker();
        let sprint = tracker.start_sprint("Sprint 1", 14, &now()).unwrap();

        assert_eq!(sprint.start_date, date(2024, 6, 1));
        assert_eq!(sprint.end_date, date(2024, 6, 15));
        assert!(sprint.assigned_tasks.is_empty());
        assert_eq!(tracker.storage().load_sprints().unwrap(), vec![sprint]);
    }

    #[test]
    fn sprint_duration_bounds() {
        let mut tracker = tracker();
        for days in &[0, 31] {
            let err = tracker.start_sprint("S", *days, &now()).unwrap_err();
            assert!(matches!(err, TrackerError::Validation { field: "sprint duration", .. }));
        }
        assert!(tracker.start_sprint("", 5, &now()).is_err());
        tracker.start_sprint("S", 30, &now()).unwrap();
    }

    #[test]
    fn assign_task_moves_task_into_sprint() {
        let mut tracker = tracker();
        tracker.add_task("API", Priority::Medium, 8, "Bo").unwrap();
        tracker.start_sprint("Sprint 1", 7, &now()).unwrap();

        tracker.assign_task("Sprint 1", "API", "Ana").unwrap();

        let item = &tracker.list_items()[0];
        assert_eq!(item.status, TaskStatus::InSprint);
        assert_eq!(item.assigned_to, "Bo");
        assert_eq!(
            tracker.list_sprints()[0].assigned_tasks,
            vec![Assignment::new("API", "Ana")]
        );
        assert_eq!(
            tracker.storage().load_sprints().unwrap()[0].assigned_tasks,
            vec![Assignment::new("API", "Ana")]
        );
        assert_eq!(
            tracker.storage().load_backlog().unwrap()[0].status,
            TaskStatus::InSprint
        );
    }

    #[test]
    fn assign_unknown_names_changes_nothing() {
        let mut tracker = tracker();
        tracker.add_task("API", Priority::Medium, 8, "").unwrap();
        tracker.start_sprint("Sprint 1", 7, &now()).unwrap();
        let backlog = tracker.list_items().to_vec();
        let sprints = tracker.list_sprints().to_vec();

        let err = tracker.assign_task("Sprint 9", "API", "").unwrap_err();
        assert_eq!(err, TrackerError::not_found(EntityKind::Sprint, "Sprint 9"));
        let err = tracker.assign_task("Sprint 1", "Nope", "").unwrap_err();
        assert_eq!(err, TrackerError::not_found(EntityKind::Task, "Nope"));

        assert_eq!(tracker.list_items(), backlog.as_slice());
        assert_eq!(tracker.list_sprints(), sprints.as_slice());
    }

    #[test]
    fn repeated_assignment_is_kept() {
        let mut tracker = tracker();
        tracker.add_task("API", Priority::Medium, 8, "").unwrap();
        tracker.start_sprint("Sprint 1", 7, &now()).unwrap();
        tracker.assign_task("Sprint 1", "API", "Ana").unwrap();
        tracker.assign_task("Sprint 1", "API", "Bo").unwrap();
        assert_eq!(tracker.list_sprints()[0].assigned_tasks.len(), 2);
    }

    #[test]
    fn mark_completed_overwrites_in_sprint() {
        let mut tracker = tracker();
        tracker.add_task("API", Priority::Medium, 8, "").unwrap();
        tracker.start_sprint("Sprint 1", 7, &now()).unwrap();
        tracker.assign_task("Sprint 1", "API", "").unwrap();

        tracker.mark_completed("API").unwrap();
        assert_eq!(tracker.list_items()[0].status, TaskStatus::Completed);
        assert_eq!(
            tracker.storage().load_backlog().unwrap()[0].status,
            TaskStatus::Completed
        );

        let err = tracker.mark_completed("Missing").unwrap_err();
        assert!(matches!(err, TrackerError::NotFound { kind: EntityKind::Task, .. }));
    }

    #[test]
    fn duplicate_names_resolve_to_the_first_match() {
        let mut tracker = tracker();
        tracker.add_task("API", Priority::High, 8, "").unwrap();
        tracker.add_task("API", Priority::Low, 2, "").unwrap();

        tracker.mark_completed("API").unwrap();
        assert_eq!(tracker.list_items()[0].status, TaskStatus::Completed);
        assert_eq!(tracker.list_items()[1].status, TaskStatus::Backlog);
    }

    #[test]
    fn complete_assignment_flags_one_open_assignment() {
        let mut tracker = tracker();
        tracker.add_task("API", Priority::Medium, 8, "").unwrap();
        tracker.start_sprint("Sprint 1", 7, &now()).unwrap();
        tracker.assign_task("Sprint 1", "API", "Ana").unwrap();
        tracker.assign_task("Sprint 1", "API", "Bo").unwrap();

        tracker.complete_assignment("Sprint 1", "API").unwrap();
        let flags: Vec<bool> = tracker.list_sprints()[0]
            .assigned_tasks
            .iter()
            .map(|a| a.completed)
            .collect();
        assert_eq!(flags, vec![true, false]);

        tracker.complete_assignment("Sprint 1", "API").unwrap();
        tracker.complete_assignment("Sprint 1", "API").unwrap();
        assert!(tracker.storage().load_sprints().unwrap()[0]
            .assigned_tasks
            .iter()
            .all(|a| a.completed));

        let err = tracker.complete_assignment("Sprint 1", "Other").unwrap_err();
        assert!(matches!(err, TrackerError::NotFound { kind: EntityKind::Assignment, .. }));
    }

    #[test]
    fn close_sprint_sets_and_overwrites_the_close_date() {
        let mut tracker = tracker();
        tracker.start_sprint("Sprint 1", 7, &now()).unwrap();

        tracker.close_sprint("Sprint 1", date(2024, 6, 8)).unwrap();
        tracker.close_sprint("Sprint 1", date(2024, 6, 9)).unwrap();
        assert_eq!(
            tracker.storage().load_sprints().unwrap()[0].actual_close_date,
            Some(date(2024, 6, 9))
        );

        let err = tracker.close_sprint("Sprint 2", date(2024, 6, 9)).unwrap_err();
        assert_eq!(err, TrackerError::not_found(EntityKind::Sprint, "Sprint 2"));
    }

    #[test]
    fn separator_text_in_names_is_rejected() {
        let mut tracker = tracker();
        tracker.add_task("API", Priority::Medium, 8, "").unwrap();
        tracker.start_sprint("Sprint 1", 7, &now()).unwrap();
        let backlog = tracker.list_items().to_vec();
        let sprints = tracker.list_sprints().to_vec();

        let err = tracker.add_task("Login, signup", Priority::Low, 2, "").unwrap_err();
        assert_eq!(
            err,
            TrackerError::validation("task name", "must not contain ', '")
        );
        let err = tracker.add_task("Deploy (Completed)", Priority::Low, 2, "").unwrap_err();
        assert!(matches!(err, TrackerError::Validation { field: "task name", .. }));
        let err = tracker.add_task("Docs", Priority::Low, 2, "Bo, Cy").unwrap_err();
        assert!(matches!(err, TrackerError::Validation { field: "assignee", .. }));
        let err = tracker.start_sprint("Sprint 2, part 1", 7, &now()).unwrap_err();
        assert!(matches!(err, TrackerError::Validation { field: "sprint name", .. }));

        for assignee in &["Bo, Cy", "Bo (Assigned to: Cy"] {
            let err = tracker.assign_task("Sprint 1", "API", assignee).unwrap_err();
            assert!(matches!(err, TrackerError::Validation { field: "assignee", .. }));
        }

        assert_eq!(tracker.list_items(), backlog.as_slice());
        assert_eq!(tracker.list_sprints(), sprints.as_slice());
        assert_eq!(tracker.storage().load_backlog().unwrap(), backlog);
        assert_eq!(tracker.storage().load_sprints().unwrap(), sprints);
    }

    #[test]
    fn lookups_trim_names_like_inserts_do() {
        let mut tracker = tracker();
        tracker.add_task(" API", Priority::Medium, 8, "").unwrap();
        tracker.start_sprint("Sprint 1 ", 7, &now()).unwrap();

        tracker.assign_task(" Sprint 1", "API ", "Ana").unwrap();
        assert_eq!(
            tracker.list_sprints()[0].assigned_tasks,
            vec![Assignment::new("API", "Ana")]
        );
        tracker.complete_assignment("Sprint 1", " API").unwrap();
        tracker.mark_completed(" API").unwrap();
        tracker.close_sprint(" Sprint 1 ", date(2024, 6, 8)).unwrap();

        assert_eq!(tracker.list_items()[0].status, TaskStatus::Completed);
        assert!(tracker.list_sprints()[0].assigned_tasks[0].completed);
    }

    #[test]
    fn schema_mismatch_aborts_before_mutation() {
        let store = SheetStore::open_in_memory().unwrap();
        store.init().unwrap();
        let mut tracker = Tracker::load(store).unwrap();
        tracker.start_sprint("Sprint 1", 7, &now()).unwrap();

        let broken = SheetStore::open_in_memory().unwrap();
        tracker.storage = broken;

        let err = tracker.add_task("API", Priority::Low, 1, "").unwrap_err();
        assert!(matches!(err, TrackerError::SchemaMismatch { .. }));
        assert!(tracker.list_items().is_empty());

        let err = tracker.close_sprint("Sprint 1", date(2024, 6, 8)).unwrap_err();
        assert!(matches!(err, TrackerError::SchemaMismatch { .. }));
        assert_eq!(tracker.list_sprints()[0].actual_close_date, None);
    }

    #[test]
    fn storage_failure_leaves_memory_ahead_until_resync() {
        let mut tracker = Tracker::load(FlakyStore::default()).unwrap();
        tracker.add_task("API", Priority::Low, 1, "").unwrap();

        tracker.storage.fail_writes = true;
        let err = tracker.add_task("UI", Priority::Low, 1, "").unwrap_err();
        assert_eq!(err, TrackerError::StorageUnavailable("connection reset".to_string()));
        assert_eq!(tracker.list_items().len(), 2);

        tracker.storage.fail_writes = false;
        tracker.resync().unwrap();
        assert_eq!(tracker.list_items().len(), 1);
        assert_eq!(tracker.list_items()[0].task_name, "API");
    }
}
