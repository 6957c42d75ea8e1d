//! Player commands: init, show, adjust, confirm.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use competence_core::session::BootstrapSource;
use competence_types::catalog::{Category, Skill};
use competence_types::character::CharacterId;
use console::style;
use serde::Serialize;

use crate::state::{AppState, Session};

#[derive(Serialize)]
struct SheetView {
    character_id: String,
    admin: bool,
    source: &'static str,
    categories: Vec<CategoryView>,
}

#[derive(Serialize)]
struct CategoryView {
    id: String,
    label: String,
    icon: String,
    budget: u32,
    pending_total: u32,
    locked: bool,
    skills: Vec<SkillView>,
}

#[derive(Serialize)]
struct SkillView {
    name: String,
    icon: String,
    base_value: u32,
    pending: u32,
    total: u32,
    cap: u32,
    custom: bool,
    deleted: bool,
}

#[derive(Serialize)]
struct AdjustView<'a> {
    changed: bool,
    category: &'a str,
    skill: &'a str,
    pending: u32,
    total: u32,
    budget: u32,
}

fn source_label(source: BootstrapSource) -> &'static str {
    match source {
        BootstrapSource::Remote => "remote",
        BootstrapSource::Cache => "cache",
        BootstrapSource::Defaults => "defaults",
    }
}

fn category_view(session: &Session, category: &Category) -> CategoryView {
    CategoryView {
        id: category.id.clone(),
        label: category.label.clone(),
        icon: category.icon.clone(),
        budget: session.budget(&category.id),
        pending_total: session.pending_total(&category.id),
        locked: session.is_locked(&category.id),
        skills: category
            .skills
            .iter()
            .map(|skill| skill_view(session, &category.id, skill))
            .collect(),
    }
}

fn skill_view(session: &Session, category: &str, skill: &Skill) -> SkillView {
    SkillView {
        name: skill.name.clone(),
        icon: skill.icon.clone(),
        base_value: skill.base_value,
        pending: session.pending(category, &skill.name),
        total: session.skill_total(category, &skill.name),
        cap: skill.cap,
        custom: skill.is_custom(),
        deleted: skill.is_tombstoned(),
    }
}

/// Look up a category or fail with the list of known ids.
pub(crate) fn require_category<'a>(session: &'a Session, id: &str) -> Result<&'a Category> {
    session.category(id).ok_or_else(|| {
        let known: Vec<&str> = session.categories().iter().map(|c| c.id.as_str()).collect();
        anyhow::anyhow!("unknown category '{id}' (known: {})", known.join(", "))
    })
}

/// Create a character and remember it as the active one.
pub async fn init_character(state: &AppState, name: &str, json: bool) -> Result<CharacterId> {
    if name.trim().is_empty() {
        anyhow::bail!("character name cannot be empty");
    }
    let character = state.create_character(name).await?;

    // In JSON mode the sheet printed next carries the id.
    if !json {
        println!();
        println!(
            "  {} Created character {} {}",
            style("✓").green().bold(),
            style(&character.name).cyan().bold(),
            style(format!("({})", character.id)).dim()
        );
    }
    Ok(character.id)
}

/// Print the whole sheet.
pub fn show(session: &Session, json: bool) -> Result<()> {
    if json {
        let view = SheetView {
            character_id: session.character_id().to_string(),
            admin: session.is_admin(),
            source: source_label(session.bootstrap_source()),
            categories: session
                .categories()
                .iter()
                .map(|c| category_view(session, c))
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {}",
        style("Character:").bold(),
        style(session.character_id()).cyan()
    );
    if session.status().local_only {
        println!(
            "  {} No active character; changes stay on this machine. Create one with: {}",
            style("i").blue().bold(),
            style("competences init <name>").yellow()
        );
    }

    for category in session.categories() {
        print_category(session, category, session.is_admin());
    }
    println!();
    Ok(())
}

pub(crate) fn print_category(session: &Session, category: &Category, show_deleted: bool) {
    let view = category_view(session, category);

    println!();
    let lock = if view.locked {
        style("locked").yellow().to_string()
    } else {
        style("open").green().to_string()
    };
    println!(
        "  {} {}  {} {}  {} {}  {}",
        view.icon,
        style(&view.label).bold(),
        style("budget").dim(),
        style(view.budget).cyan().bold(),
        style("pending").dim(),
        view.pending_total,
        lock
    );

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Skill").fg(Color::White),
        Cell::new("Base").fg(Color::White),
        Cell::new("Pending").fg(Color::White),
        Cell::new("Total").fg(Color::White),
        Cell::new("Cap").fg(Color::White),
    ]);

    for skill in &view.skills {
        if skill.deleted && !show_deleted {
            continue;
        }
        let mut label = format!("{} {}", skill.icon, skill.name);
        if skill.custom {
            label.push_str(" *");
        }
        let name_cell = if skill.deleted {
            Cell::new(format!("{label} (deleted)")).fg(Color::DarkGrey)
        } else {
            Cell::new(label).fg(Color::Cyan)
        };
        let pending_cell = if skill.pending > 0 {
            Cell::new(format!("+{}", skill.pending)).fg(Color::Yellow)
        } else {
            Cell::new("·").fg(Color::DarkGrey)
        };
        let total_cell = if skill.total >= skill.cap {
            Cell::new(skill.total).fg(Color::Green)
        } else {
            Cell::new(skill.total)
        };
        table.add_row(vec![
            name_cell,
            Cell::new(skill.base_value),
            pending_cell,
            total_cell,
            Cell::new(skill.cap).fg(Color::DarkGrey),
        ]);
    }

    println!("{table}");
}

/// Move points between the category budget and a skill.
pub fn adjust(session: &mut Session, category: &str, skill: &str, delta: i64, json: bool) -> Result<()> {
    require_category(session, category)?;
    let changed = session.adjust_skill_points(category, skill, delta);

    if json {
        let view = AdjustView {
            changed,
            category,
            skill,
            pending: session.pending(category, skill),
            total: session.skill_total(category, skill),
            budget: session.budget(category),
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!();
    if changed {
        println!(
            "  {} {} now {} ({} pending), {} points left in {}",
            style("✓").green().bold(),
            style(skill).cyan().bold(),
            style(session.skill_total(category, skill)).bold(),
            session.pending(category, skill),
            style(session.budget(category)).cyan(),
            category
        );
    } else {
        let reason = if session.is_locked(category) {
            "the category is locked"
        } else {
            "the skill cannot take that change"
        };
        println!(
            "  {} Nothing changed: {}",
            style("!").yellow().bold(),
            reason
        );
    }
    println!();
    Ok(())
}

/// Commit the pending points of a category.
pub fn confirm(session: &mut Session, category: &str, json: bool) -> Result<()> {
    require_category(session, category)?;
    let confirmed = session.confirm_category(category);

    if json {
        let category_ref = require_category(session, category)?;
        let view = serde_json::json!({
            "confirmed": confirmed,
            "category": category_view(session, category_ref),
        });
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    if confirmed {
        println!();
        println!(
            "  {} Confirmed {}",
            style("✓").green().bold(),
            style(category).cyan().bold()
        );
        let category_ref = require_category(session, category)?;
        print_category(session, category_ref, false);
    } else {
        println!();
        println!(
            "  {} Nothing to confirm in {} (locked or no pending points)",
            style("!").yellow().bold(),
            category
        );
    }
    println!();
    Ok(())
}
