//! Admin commands: budgets, resets and skill definition edits.
//!
//! All of these go through the session's admin editor, which rejects the
//! call unless the CLI was started with `--admin`.

use anyhow::Result;
use competence_types::error::AdminEditError;
use competence_types::skill::{NewSkill, SkillDraft};
use console::style;
use serde_json::json;

use super::sheet::{print_category, require_category};
use crate::state::Session;

/// Optional fields of `edit-skill`; unset fields keep their current value.
pub struct EditArgs {
    pub name: Option<String>,
    pub base: Option<i64>,
    pub cap: Option<i64>,
    pub icon: Option<String>,
}

fn admin_error(err: AdminEditError) -> anyhow::Error {
    match err {
        AdminEditError::NotAuthorized => {
            anyhow::anyhow!("{err} (run the command again with --admin)")
        }
        other => other.into(),
    }
}

fn done(message: String) {
    println!();
    println!("  {} {message}", style("✓").green().bold());
}

fn show_category(session: &Session, category: &str) -> Result<()> {
    let category = require_category(session, category)?;
    print_category(session, category, true);
    println!();
    Ok(())
}

pub fn reset(session: &mut Session, category: &str, json: bool) -> Result<()> {
    let budget = session.reset_category(category).map_err(admin_error)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "category": category, "budget": budget }))?
        );
        return Ok(());
    }

    done(format!(
        "Reset {}: budget back to {}",
        style(category).cyan().bold(),
        style(budget).bold()
    ));
    show_category(session, category)
}

pub fn set_budget(session: &mut Session, category: &str, points: i64, json: bool) -> Result<()> {
    let budget = session
        .set_category_budget(category, points)
        .map_err(admin_error)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "category": category, "budget": budget }))?
        );
        return Ok(());
    }

    done(format!(
        "Budget of {} set to {}",
        style(category).cyan().bold(),
        style(budget).bold()
    ));
    if i64::from(budget) != points {
        println!(
            "  {} {} was clamped to the allowed range",
            style("!").yellow().bold(),
            points
        );
    }
    println!();
    Ok(())
}

pub fn add_skill(
    session: &mut Session,
    category: &str,
    name: String,
    icon: Option<String>,
    cap: Option<i64>,
    json: bool,
) -> Result<()> {
    let skill = session
        .add_custom_skill(category, NewSkill { name, icon, cap })
        .map_err(admin_error)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&json!({
            "category": category,
            "skill": skill,
        }))?);
        return Ok(());
    }

    done(format!(
        "Added {} to {}",
        style(&skill.name).cyan().bold(),
        style(category).bold()
    ));
    show_category(session, category)
}

pub fn edit_skill(
    session: &mut Session,
    category: &str,
    skill: &str,
    args: EditArgs,
    json: bool,
) -> Result<()> {
    let current = require_category(session, category)?
        .find_skill(skill)
        .cloned()
        .ok_or_else(|| {
            admin_error(AdminEditError::UnknownSkill {
                category: category.to_string(),
                skill: skill.to_string(),
            })
        })?;

    let draft = SkillDraft {
        name: args.name.unwrap_or_else(|| current.name.clone()),
        base_value: args.base.unwrap_or(i64::from(current.base_value)),
        cap: args.cap.unwrap_or(i64::from(current.cap)),
        icon: args.icon,
    };
    let outcome = session
        .apply_skill_admin_edits(category, &current.name, draft)
        .map_err(admin_error)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&json!({
            "category": category,
            "name": outcome.name,
            "renamed": outcome.renamed,
            "notice": outcome.notice,
        }))?);
        return Ok(());
    }

    if outcome.renamed {
        done(format!(
            "Renamed {} to {}",
            style(&current.name).dim(),
            style(&outcome.name).cyan().bold()
        ));
    } else {
        done(format!("Updated {}", style(&outcome.name).cyan().bold()));
    }
    if let Some(notice) = &outcome.notice {
        println!("  {} {notice}", style("!").yellow().bold());
    }
    show_category(session, category)
}

pub fn delete_skill(session: &mut Session, category: &str, skill: &str, json: bool) -> Result<()> {
    let refund = session.delete_skill(category, skill).map_err(admin_error)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&json!({
            "category": category,
            "skill": skill,
            "refunded": refund,
            "budget": session.budget(category),
        }))?);
        return Ok(());
    }

    done(format!(
        "Deleted {} ({} points refunded)",
        style(skill).cyan().bold(),
        style(refund).bold()
    ));
    show_category(session, category)
}

pub fn restore_skill(session: &mut Session, category: &str, skill: &str, json: bool) -> Result<()> {
    session.restore_skill(category, skill).map_err(admin_error)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&json!({
            "category": category,
            "skill": skill,
            "restored": true,
        }))?);
        return Ok(());
    }

    done(format!("Restored {}", style(skill).cyan().bold()));
    show_category(session, category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_authorized_mentions_flag() {
        let err = admin_error(AdminEditError::NotAuthorized);
        assert!(err.to_string().contains("--admin"));
    }

    #[test]
    fn test_other_errors_keep_their_message() {
        let err = admin_error(AdminEditError::EmptyName);
        assert_eq!(err.to_string(), "skill name cannot be empty");
    }
}
