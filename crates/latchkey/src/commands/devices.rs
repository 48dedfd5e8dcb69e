//! Device command handler.

use tabled::Tabled;

use latchkey_core::Device;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::Session;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Door 1")]
    door1: String,
    #[tabled(rename = "Door 2")]
    door2: String,
    #[tabled(rename = "Door 3")]
    door3: String,
    #[tabled(rename = "Door 4")]
    door4: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        let door = |i: usize| {
            let name = d.doors[i].trim();
            if name.is_empty() { "-".into() } else { name.to_owned() }
        };
        Self {
            id: d.id.to_string(),
            name: d.name.clone().unwrap_or_default(),
            door1: door(0),
            door2: door(1),
            door3: door(2),
            door4: door(3),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let devices = session.engine.list_devices().await?;
    let out = output::render_list(
        &session.settings.output,
        &devices,
        |d| DeviceRow::from(d),
        |d| d.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
