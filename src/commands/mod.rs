pub mod reset;
pub mod status;
pub mod sync;
pub mod unlock;
pub mod webhook;

use std::process::ExitCode;

use calnote_core::sync::SyncReport;

/// Any failed write makes the whole run fail, so schedulers notice.
pub fn exit_code(report: &SyncReport) -> ExitCode {
    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
