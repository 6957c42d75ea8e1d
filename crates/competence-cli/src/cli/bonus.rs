//! `bonuses` command: per-skill totals from equipment, consumables and the
//! companion.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use competence_core::bonus::CompanionBonusCache;
use competence_infra::equipment::{FileCompanionSource, FileEquipmentSource, JsonItemCatalog};
use competence_types::bonus::BonusDetail;
use console::style;

use crate::state::{BonusFiles, Session};

fn load_items(path: &Path) -> JsonItemCatalog {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no item catalog; items contribute nothing");
        return JsonItemCatalog::default();
    }
    JsonItemCatalog::load(path).unwrap_or_else(|err| {
        tracing::warn!(path = %path.display(), error = %err, "item catalog ignored");
        JsonItemCatalog::default()
    })
}

fn format_details(details: &[BonusDetail]) -> String {
    details
        .iter()
        .map(|d| format!("{} {:+}", d.label, d.value))
        .collect::<Vec<_>>()
        .join(", ")
}

pub async fn show_bonuses(session: &Session, files: &BonusFiles, json: bool) -> Result<()> {
    let items = load_items(&files.items);
    let equipment = FileEquipmentSource::new(files.equipment.clone());
    let companion = CompanionBonusCache::new(FileCompanionSource::new(files.companion.clone()));
    companion.refresh(session.character_id()).await;

    let breakdown = session.bonus_breakdown_by_skill(
        &equipment,
        &items,
        &companion.bonuses(session.character_id()),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&breakdown)?);
        return Ok(());
    }

    if breakdown.is_empty() {
        println!();
        println!(
            "  {} No active bonuses. Sources read from {}",
            style("i").blue().bold(),
            style(files.equipment.parent().unwrap_or(&files.equipment).display()).dim()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Skill").fg(Color::White),
        Cell::new("Items").fg(Color::White),
        Cell::new("Companion").fg(Color::White),
        Cell::new("Total").fg(Color::White),
        Cell::new("Sources").fg(Color::White),
    ]);

    for (skill, bonus) in &breakdown {
        let sources = [
            format_details(&bonus.item_details),
            format_details(&bonus.companion_details),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" | ");

        table.add_row(vec![
            Cell::new(skill).fg(Color::Cyan),
            Cell::new(format!("{:+}", bonus.items)),
            Cell::new(format!("{:+}", bonus.companion)),
            Cell::new(format!("{:+}", bonus.total)).fg(Color::Green),
            Cell::new(sources).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}
