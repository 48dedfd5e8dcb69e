//! Command dispatch: bridges CLI args -> engine calls -> output formatting.

pub mod acl;
pub mod card;
pub mod devices;
pub mod util;

use latchkey_core::AclEngine;

use crate::cli::{Command, GlobalOpts};
use crate::config::Settings;
use crate::error::CliError;
use crate::fleet::FleetFile;

/// Everything a fleet-bound command needs.
pub struct Session {
    pub engine: AclEngine,
    pub fleet: FleetFile,
    pub settings: Settings,
}

impl Session {
    pub fn new(fleet: FleetFile, settings: Settings) -> Self {
        let engine = AclEngine::new(fleet.backend(), settings.engine.clone());
        Self {
            engine,
            fleet,
            settings,
        }
    }
}

/// Dispatch a fleet-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Devices => devices::handle(session, global).await,
        Command::Acl(args) => acl::handle(session, args, global).await,
        Command::Card(args) => card::handle(session, args, global).await,
        // Completions are handled before dispatch
        Command::Completions(_) => Ok(()),
    }
}
