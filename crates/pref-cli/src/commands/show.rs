//! Show and get command implementations

use colored::Colorize;
use serde_json::json;

use super::session::{Locations, Session};
use crate::error::Result;

/// Run the show command
pub fn run_show(locations: &Locations, json: bool) -> Result<()> {
    let session = Session::open(locations)?;

    if json {
        let mut entries = Vec::new();
        for decl in session.schema().keys() {
            let (value, modified) = session.stored(decl)?;
            entries.push(json!({
                "name": decl.name,
                "store": decl.store,
                "type": decl.value_type,
                "value": value,
                "default": decl.default_text(),
                "modified": modified,
            }));
        }
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for tab in session.schema().tabs() {
        println!("{}", tab.bold());
        for decl in session.schema().keys().iter().filter(|decl| decl.tab() == tab) {
            let (value, modified) = session.stored(decl)?;
            let marker = if modified { "*".yellow() } else { " ".normal() };
            println!(
                "  {} {} = {} {}",
                marker,
                decl.name.cyan(),
                value,
                format!("({})", decl.label()).dimmed()
            );
        }
        println!();
    }
    Ok(())
}

/// Run the get command
pub fn run_get(locations: &Locations, key: &str) -> Result<()> {
    let session = Session::open(locations)?;
    let (value, _) = session.stored(session.decl(key)?)?;
    println!("{value}");
    Ok(())
}
