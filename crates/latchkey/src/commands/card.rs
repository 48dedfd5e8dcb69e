//! Single-card command handlers.

use tabled::Tabled;

use latchkey_core::{CardAccess, GrantRequest, RevokeRequest};

use crate::cli::{CardArgs, CardCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{Session, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DoorRow {
    #[tabled(rename = "Door")]
    name: String,
    #[tabled(rename = "Controller")]
    device: String,
    #[tabled(rename = "#")]
    door: u8,
    #[tabled(rename = "Access")]
    access: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
}

fn detail(access: &CardAccess) -> String {
    let rows: Vec<DoorRow> = access
        .doors
        .iter()
        .map(|(name, p)| DoorRow {
            name: name.clone(),
            device: p.device.to_string(),
            door: p.door,
            access: util::fmt_access(p.access),
            from: util::fmt_date(p.from),
            to: util::fmt_date(p.to),
        })
        .collect();

    format!("Card: {}\n{}", access.card, output::render_table(&rows))
}

fn plain(access: &CardAccess) -> String {
    access
        .doors
        .iter()
        .filter(|(_, p)| p.access.is_some_and(latchkey_core::DoorAccess::is_active))
        .map(|(name, _)| name.clone())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(session: &Session, args: CardArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let devices = session.engine.list_devices().await?;

    let card = match args.command {
        CardCommand::Get { card } => {
            let access = session.engine.get_card(&devices, card).await?;
            if access.is_unknown() {
                return Err(CliError::NotFound {
                    resource_type: "Card".into(),
                    identifier: card.to_string(),
                    list_command: "acl get".into(),
                });
            }
            let out = output::render_single(&session.settings.output, &access, detail, plain)?;
            output::print_output(&out, global.quiet);
            return Ok(());
        }

        CardCommand::Grant {
            card,
            from,
            to,
            profile,
            doors,
        } => {
            let request = GrantRequest {
                card,
                from: util::parse_date("from", &from)?,
                to: util::parse_date("to", &to)?,
                profile,
                doors,
            };
            let result = session.engine.grant(&devices, &request).await;
            // Writes made before a failure are real, keep them.
            session.fleet.save()?;
            result?;
            card
        }

        CardCommand::Revoke { card, doors } => {
            let request = RevokeRequest { card, doors };
            let result = session.engine.revoke(&devices, &request).await;
            session.fleet.save()?;
            result?;
            card
        }
    };

    let access = session.engine.get_card(&devices, card).await?;
    let out = output::render_single(&session.settings.output, &access, detail, plain)?;
    output::print_output(&out, global.quiet);
    Ok(())
}
