use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::ValidateArgs;
use crate::commands::default_db_path;
use crate::util::{now_utc_string, write_json_pretty};

mod run;
mod structural_invariants;
#[cfg(test)]
mod tests;

pub use self::run::run;

use self::structural_invariants::*;
