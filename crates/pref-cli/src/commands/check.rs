//! Check command implementation

use colored::Colorize;
use pref_core::{Control, Severity, Status};

use super::session::{Locations, Session};
use crate::error::{CliError, Result};

/// Run the check command
///
/// Stored values that do not parse as their declared type are reported as
/// warnings (reads fall back to the zero value). Every current value is
/// then re-entered through its control so range, choice and required
/// checks apply; nothing is committed.
pub fn run_check(locations: &Locations) -> Result<()> {
    let session = Session::open(locations)?;

    let mut corrupt = 0;
    for decl in session.schema().keys() {
        let (value, _) = session.stored(decl)?;
        if !decl.key().accepts(&value) {
            corrupt += 1;
            println!(
                "{} stored value '{}' for {} is not a valid {}; using {}",
                "warning:".yellow().bold(),
                value,
                decl.name.cyan(),
                decl.value_type,
                decl.key().zero_text()
            );
        }
    }

    let (mut page, surface) = session.page();
    for (_, control) in surface.controls() {
        control.commit(&control.value());
    }
    let status = page.status();
    page.perform_cancel();

    let status = if corrupt > 0 && status.severity() < Severity::Warning {
        Status::warning(format!("{corrupt} stored value(s) could not be parsed"))
    } else {
        status
    };

    match status.severity() {
        Severity::Error => Err(CliError::rejected(&status)),
        Severity::Warning | Severity::Info => {
            println!("{} {}", "warning:".yellow().bold(), status.message());
            Ok(())
        }
        Severity::Ok => {
            println!("{} All preferences are valid", "OK".green().bold());
            Ok(())
        }
    }
}
