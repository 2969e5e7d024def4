use std::process::ExitCode;

use anyhow::Result;
use calnote_core::config::CalNoteConfig;
use calnote_core::diff::Direction;

use super::exit_code;
use crate::render::PlanRender;
use crate::utils::tui;

pub async fn run(
    config: &CalNoteConfig,
    direction: Option<Direction>,
    verbose: bool,
) -> Result<ExitCode> {
    let mut strategy = config.strategy;
    if let Some(direction) = direction {
        strategy.direction = direction;
    }
    let orchestrator = config.orchestrator()?.with_strategy(strategy);

    let spinner = tui::create_spinner(format!("Syncing ({})", strategy.direction));
    let result = orchestrator.sync().await;
    spinner.finish_and_clear();

    let report = result?;
    println!("{}", report.render(verbose));

    Ok(exit_code(&report))
}
