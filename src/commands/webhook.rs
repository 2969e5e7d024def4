use std::process::ExitCode;

use anyhow::Result;
use calnote_core::config::CalNoteConfig;

use super::exit_code;
use crate::render::PlanRender;
use crate::utils::tui;

pub async fn run(config: &CalNoteConfig, verbose: bool) -> Result<ExitCode> {
    let orchestrator = config.orchestrator()?;

    let spinner = tui::create_spinner("Applying calendar changes".to_string());
    let result = orchestrator.sync_changed().await;
    spinner.finish_and_clear();

    let report = result?;
    println!("{}", report.render(verbose));

    Ok(exit_code(&report))
}
