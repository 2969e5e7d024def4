use std::process::ExitCode;

use anyhow::Result;
use calnote_core::config::CalNoteConfig;
use owo_colors::OwoColorize;

pub fn run(config: &CalNoteConfig) -> Result<ExitCode> {
    let orchestrator = config.orchestrator()?;
    let lock = orchestrator.lock();

    if !lock.is_held()? {
        println!("{}", "   Run lock is not held".dimmed());
        return Ok(ExitCode::SUCCESS);
    }

    lock.force_release()?;
    println!("   Run lock released");

    Ok(ExitCode::SUCCESS)
}
