//! Command implementations for pref-cli

pub mod check;
pub mod reset;
pub mod session;
pub mod set;
pub mod show;

pub use check::run_check;
pub use reset::run_reset;
pub use session::Locations;
pub use set::run_set;
pub use show::{run_get, run_show};
