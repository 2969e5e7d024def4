use std::process::ExitCode;

use anyhow::Result;
use calnote_core::config::CalNoteConfig;
use owo_colors::OwoColorize;

use crate::render::PlanRender;
use crate::utils::tui;

pub async fn run(config: &CalNoteConfig, json: bool, verbose: bool) -> Result<ExitCode> {
    let orchestrator = config.orchestrator()?;

    let spinner = tui::create_spinner("Comparing calendar and documents".to_string());
    let result = orchestrator.plan().await;
    spinner.finish_and_clear();

    let plan = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(ExitCode::SUCCESS);
    }

    match plan {
        Some(plan) => println!("{}", plan.render(verbose)),
        None => println!(
            "{}",
            format!(
                "   No snapshot yet: the next sync seeds it from the {} side without writing",
                orchestrator.strategy().source_of_truth()
            )
            .dimmed()
        ),
    }

    if orchestrator.lock().is_held()? {
        println!("{}", "   A sync pass is running (run lock held)".yellow());
    }

    Ok(ExitCode::SUCCESS)
}
