use std::process::ExitCode;

use anyhow::Result;
use calnote_core::config::CalNoteConfig;

pub fn run(config: &CalNoteConfig, cursor: bool) -> Result<ExitCode> {
    let orchestrator = config.orchestrator()?;
    orchestrator.reset(cursor)?;

    if cursor {
        println!("   Snapshot and sync token cleared; the next sync starts over");
    } else {
        println!("   Snapshot cleared; the next sync starts over");
    }

    Ok(ExitCode::SUCCESS)
}
