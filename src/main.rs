#[macro_use]
extern crate prettytable;

use anyhow::{Context, Result};
use log::info;
use structopt::StructOpt;

mod cli;
mod interface;

use cli::{Command::*, CommandLineArgs};
use scrumsheet::config::Settings;
use scrumsheet::{SheetStore, Tracker};

/// Open the sheet and make sure both worksheets exist.
fn open_sheet(settings: &Settings) -> Result<SheetStore> {
    let store = SheetStore::open(&settings.sheet_file).with_context(|| {
        format!("Failed to open sheet {}.", settings.sheet_file.display())
    })?;
    store.init().context("Failed to create the worksheets.")?;
    Ok(store)
}

fn main() -> Result<()> {
    env_logger::init();

    // Get the command-line arguments.
    let CommandLineArgs {
        action,
        sheet_file,
        utc_offset,
    } = CommandLineArgs::from_args();

    let settings = Settings::resolve(sheet_file, utc_offset)?;
    info!("using sheet {}", settings.sheet_file.display());

    let store = open_sheet(&settings)?;
    if let Init = action {
        println!("Sheet ready at {}.", settings.sheet_file.display());
        return Ok(());
    }

    let mut tracker = Tracker::load(store).context("Failed to load the sheet.")?;

    // Perform the action.
    match action {
        Init => Ok(()),
        Add {
            name,
            priority,
            points,
            assignee,
        } => interface::add_task(&mut tracker, name, priority, points, assignee),
        Done { task } => interface::mark_done(&mut tracker, task),
        Backlog => interface::backlog(&tracker),
        Start { name, length } => interface::start_sprint(&mut tracker, &settings, name, length),
        Assign { sprint, task, to } => interface::assign(&mut tracker, sprint, task, to),
        Complete { sprint, task } => interface::complete(&mut tracker, sprint, task),
        Close { sprint, on } => interface::close(&mut tracker, &settings, sprint, on),
        Sprints => interface::sprints(&tracker, &settings),
        Report => interface::report(&tracker, &settings),
    }
}
