//! Set command implementation

use colored::Colorize;

use super::session::{Locations, Session};
use crate::error::{CliError, Result};

/// Split `KEY=VALUE`; the value may itself contain `=`.
fn parse_assignment(assignment: &str) -> Result<(&str, &str)> {
    match assignment.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => Err(CliError::user(format!(
            "Invalid assignment '{assignment}': expected KEY=VALUE"
        ))),
    }
}

/// Run the set command
///
/// Every assignment is entered through the key's control, in order, so
/// dependencies and validation behave as they would interactively.
pub fn run_set(locations: &Locations, assignments: &[String]) -> Result<()> {
    let parsed = assignments
        .iter()
        .map(|assignment| parse_assignment(assignment))
        .collect::<Result<Vec<_>>>()?;

    let session = Session::open(locations)?;
    for (key, _) in &parsed {
        session.decl(key)?;
    }

    let (mut page, surface) = session.page();
    for (key, value) in &parsed {
        let control = surface
            .control(key)
            .ok_or_else(|| CliError::user(format!("No control for preference key '{key}'")))?;
        if !control.commit(value) {
            return Err(CliError::user(format!("Preference '{key}' is currently disabled")));
        }
        tracing::debug!(%key, %value, status = %page.status(), "Applied assignment");
    }

    let status = page.status();
    if status.is_error() {
        return Err(CliError::rejected(&status));
    }
    page.perform_ok()?;

    if !status.is_ok() {
        println!("{} {}", "warning:".yellow().bold(), status.message());
    }
    println!(
        "{} Updated {} preference(s)",
        "OK".green().bold(),
        parsed.len()
    );
    Ok(())
}
