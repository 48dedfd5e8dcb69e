//! Fleet-wide ACL command handlers: get, compare, put, clear.

use std::collections::BTreeMap;

use serde::Serialize;
use tabled::Tabled;

use latchkey_core::{
    Acl, AclEngine, ConsolidatedDiff, ConsolidatedReport, Diff, DeviceId, Report, SummaryRow,
    consolidate_diffs, consolidate_reports, summarize,
};

use crate::cli::{AclArgs, AclCommand, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, Tone};

use super::{Session, util};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct CardRow {
    #[tabled(rename = "Controller")]
    device: String,
    #[tabled(rename = "Card")]
    card: u32,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Door 1")]
    door1: String,
    #[tabled(rename = "Door 2")]
    door2: String,
    #[tabled(rename = "Door 3")]
    door3: String,
    #[tabled(rename = "Door 4")]
    door4: String,
}

#[derive(Tabled)]
struct DiffRow {
    #[tabled(rename = "Controller")]
    device: String,
    #[tabled(rename = "Unchanged")]
    unchanged: usize,
    #[tabled(rename = "Updated")]
    updated: usize,
    #[tabled(rename = "Added")]
    added: usize,
    #[tabled(rename = "Deleted")]
    deleted: usize,
}

#[derive(Tabled)]
struct SummaryTableRow {
    #[tabled(rename = "Controller")]
    device: String,
    #[tabled(rename = "Unchanged")]
    unchanged: String,
    #[tabled(rename = "Updated")]
    updated: String,
    #[tabled(rename = "Added")]
    added: String,
    #[tabled(rename = "Deleted")]
    deleted: String,
    #[tabled(rename = "Failed")]
    failed: String,
    #[tabled(rename = "Errored")]
    errored: String,
}

impl SummaryTableRow {
    fn new(row: &SummaryRow, color: bool) -> Self {
        Self {
            device: row.device.to_string(),
            unchanged: output::count(row.unchanged, Tone::Quiet, color),
            updated: output::count(row.updated, Tone::Change, color),
            added: output::count(row.added, Tone::Change, color),
            deleted: output::count(row.deleted, Tone::Change, color),
            failed: output::count(row.failed, Tone::Problem, color),
            errored: output::count(row.errored, Tone::Problem, color),
        }
    }
}

#[derive(Tabled)]
struct ClearRow {
    #[tabled(rename = "Controller")]
    device: String,
    #[tabled(rename = "Cleared")]
    cleared: String,
}

// ── Structured output ───────────────────────────────────────────────

#[derive(Serialize)]
struct CompareOutput<'a> {
    devices: &'a BTreeMap<DeviceId, Diff>,
    consolidated: ConsolidatedDiff,
}

#[derive(Serialize)]
struct PutOutput<'a> {
    dry_run: bool,
    reports: &'a BTreeMap<DeviceId, Report>,
    summary: Vec<SummaryRow>,
    consolidated: ConsolidatedReport,
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(session: &Session, args: AclArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        AclCommand::Get => {
            let devices = session.engine.list_devices().await?;
            let (acl, errors) = session.engine.get_acl(&util::device_ids(&devices)).await;

            let out = output::render_single(&session.settings.output, &acl, card_table, plain_cards)?;
            output::print_output(&out, global.quiet);
            util::report_errors(&errors)
        }

        AclCommand::Compare { desired, with_pin } => {
            let desired = util::read_acl_file(&desired)?;
            let devices: Vec<DeviceId> = desired.keys().copied().collect();
            let (current, errors) = session.engine.get_acl(&devices).await;

            let diffs = if with_pin || session.settings.with_pin {
                AclEngine::compare_with_pin(&current, &desired)
            } else {
                AclEngine::compare(&current, &desired)
            };
            let result = CompareOutput {
                devices: &diffs,
                consolidated: consolidate_diffs(&diffs),
            };

            let out = output::render_single(&session.settings.output, &result, diff_table, |r| {
                plain_buckets(&[
                    ("updated", &r.consolidated.updated),
                    ("added", &r.consolidated.added),
                    ("deleted", &r.consolidated.deleted),
                ])
            })?;
            output::print_output(&out, global.quiet);
            util::report_errors(&errors)
        }

        AclCommand::Put {
            desired,
            dry_run,
            with_pin,
        } => {
            let desired = util::read_acl_file(&desired)?;
            let (reports, errors) = if with_pin || session.settings.with_pin {
                session.engine.put_acl_with_pin(&desired, dry_run).await
            } else {
                session.engine.put_acl(&desired, dry_run).await
            };
            if !dry_run {
                session.fleet.save()?;
            }

            let result = PutOutput {
                dry_run,
                reports: &reports,
                summary: summarize(&reports),
                consolidated: consolidate_reports(&reports),
            };
            let color = output::should_color(&global.color);

            let out = output::render_single(
                &session.settings.output,
                &result,
                |r| report_table(r, color),
                |r| {
                    plain_buckets(&[
                        ("updated", &r.consolidated.updated),
                        ("added", &r.consolidated.added),
                        ("deleted", &r.consolidated.deleted),
                        ("failed", &r.consolidated.failed),
                        ("errored", &r.consolidated.errored),
                    ])
                },
            )?;
            output::print_output(&out, global.quiet);

            let mut problems: Vec<String> = errors.iter().map(ToString::to_string).collect();
            problems.extend(reports.values().flat_map(|r| r.errors.iter().map(ToString::to_string)));
            util::report_errors(&problems)
        }

        AclCommand::Clear => {
            let devices = session.engine.list_devices().await?;
            let prompt = format!("Delete every card from {} controller(s)?", devices.len());
            if !util::confirm(&prompt, "acl clear", global.yes)? {
                return Ok(());
            }

            let (cleared, errors) = session.engine.clear_acl(&util::device_ids(&devices)).await;
            session.fleet.save()?;

            let rows: Vec<(DeviceId, bool)> = cleared.into_iter().collect();
            let out = output::render_list(
                &session.settings.output,
                &rows,
                |(device, ok)| ClearRow {
                    device: device.to_string(),
                    cleared: if *ok { "yes".into() } else { "declined".into() },
                },
                |(device, ok)| format!("{device} {ok}"),
            )?;
            output::print_output(&out, global.quiet);
            util::report_errors(&errors)
        }
    }
}

// ── Renderers ───────────────────────────────────────────────────────

fn card_table(acl: &Acl) -> String {
    let rows: Vec<CardRow> = acl
        .iter()
        .flat_map(|(device, cards)| {
            cards.values().map(move |c| CardRow {
                device: device.to_string(),
                card: c.card_number,
                from: util::fmt_date(c.from),
                to: util::fmt_date(c.to),
                door1: util::fmt_access(c.door(1)),
                door2: util::fmt_access(c.door(2)),
                door3: util::fmt_access(c.door(3)),
                door4: util::fmt_access(c.door(4)),
            })
        })
        .collect();
    output::render_table(&rows)
}

fn plain_cards(acl: &Acl) -> String {
    acl.iter()
        .flat_map(|(device, cards)| cards.keys().map(move |card| format!("{device} {card}")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn diff_table(result: &CompareOutput<'_>) -> String {
    let rows: Vec<DiffRow> = result
        .devices
        .iter()
        .map(|(device, d)| DiffRow {
            device: device.to_string(),
            unchanged: d.unchanged.len(),
            updated: d.updated.len(),
            added: d.added.len(),
            deleted: d.deleted.len(),
        })
        .collect();

    let c = &result.consolidated;
    [
        output::render_table(&rows),
        format!("Updated:   {}", util::fmt_cards(&c.updated)),
        format!("Added:     {}", util::fmt_cards(&c.added)),
        format!("Deleted:   {}", util::fmt_cards(&c.deleted)),
        format!("Unchanged: {}", util::fmt_cards(&c.unchanged)),
    ]
    .join("\n")
}

fn report_table(result: &PutOutput<'_>, color: bool) -> String {
    let rows: Vec<SummaryTableRow> = result
        .summary
        .iter()
        .map(|row| SummaryTableRow::new(row, color))
        .collect();

    let c = &result.consolidated;
    let mut lines = Vec::new();
    if result.dry_run {
        lines.push("Dry run: nothing was written.".to_owned());
    }
    lines.push(output::render_table(&rows));
    lines.push(format!("Updated:   {}", util::fmt_cards(&c.updated)));
    lines.push(format!("Added:     {}", util::fmt_cards(&c.added)));
    lines.push(format!("Deleted:   {}", util::fmt_cards(&c.deleted)));
    lines.push(format!("Failed:    {}", util::fmt_cards(&c.failed)));
    lines.push(format!("Errored:   {}", util::fmt_cards(&c.errored)));
    lines.join("\n")
}

/// `bucket card` lines for every non-empty bucket.
fn plain_buckets(buckets: &[(&str, &Vec<u32>)]) -> String {
    buckets
        .iter()
        .flat_map(|(name, cards)| cards.iter().map(move |card| format!("{name} {card}")))
        .collect::<Vec<_>>()
        .join("\n")
}
