//! Reset command implementation

use colored::Colorize;

use super::session::{Locations, Session};
use crate::error::{CliError, Result};

/// Run the reset command
pub fn run_reset(locations: &Locations, keys: &[String]) -> Result<()> {
    let session = Session::open(locations)?;
    let decls = keys
        .iter()
        .map(|key| session.decl(key))
        .collect::<Result<Vec<_>>>()?;

    let (mut page, _surface) = session.page();
    if decls.is_empty() {
        page.perform_defaults()?;
    } else {
        let overlay = page
            .overlay()
            .cloned()
            .ok_or_else(|| CliError::user("Preference page is already closed"))?;
        for decl in &decls {
            overlay.set_to_default(&decl.key());
        }
    }
    page.perform_ok()?;

    let count = if decls.is_empty() {
        session.schema().keys().len()
    } else {
        decls.len()
    };
    println!("{} Reset {} preference(s) to defaults", "OK".green().bold(), count);
    Ok(())
}
