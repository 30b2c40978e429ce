//! `add`, `list`, `use`, `rename`, `remove` and `update`.

use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use dialoguer::{Confirm, Input, Password};
use serde::Serialize;

use ghmulti_core::accounts::{AccountSummary, NewAccount, UpdateRequest};

use super::{print_json, style, App};

pub struct AddArgs {
    pub name: Option<String>,
    pub username: Option<String>,
    pub gpg_key_id: Option<String>,
    pub ssh_key_path: Option<String>,
    pub token: Option<String>,
    pub no_token: bool,
}

fn prompt_required(value: Option<String>, prompt: &str) -> Result<String> {
    if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
        return Ok(v);
    }
    if !console::user_attended() {
        bail!("{} is required", prompt.to_lowercase());
    }
    let v: String = Input::new()
        .with_prompt(prompt)
        .interact_text()
        .with_context(|| format!("failed to read {}", prompt.to_lowercase()))?;
    Ok(v)
}

pub fn run_add(app: &App, args: AddArgs) -> Result<()> {
    let attended = console::user_attended();
    let name = prompt_required(args.name, "Account name")?;
    let username = prompt_required(args.username, "GitHub username")?;

    let token = match args.token {
        Some(t) => Some(t),
        None if args.no_token || !attended => None,
        None => {
            let t: String = Password::new()
                .with_prompt("GitHub token (leave empty to skip)")
                .allow_empty_password(true)
                .interact()
                .context("failed to read token")?;
            Some(t)
        }
    };

    let profile = app
        .mgr
        .add(NewAccount {
            name,
            username,
            signing_key: args.gpg_key_id,
            ssh_key_path: args.ssh_key_path,
            token,
        })
        .context("failed to add account")?;

    println!(
        "{}",
        style::success(&format!("Added account '{}' ({})", profile.name, profile.username))
    );
    if app.mgr.load().active.is_none() {
        println!(
            "  {}",
            style::dim(&format!("Make it the default with: ghmulti use {}", profile.name))
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct ListPayload {
    accounts: Vec<AccountSummary>,
}

pub fn run_list(app: &App, json: bool) -> Result<()> {
    let accounts = app.mgr.list(Some(&app.cwd));

    if json {
        return print_json(&ListPayload { accounts });
    }

    if accounts.is_empty() {
        println!("{}", style::warn("No accounts configured. Run 'ghmulti add' first."));
        return Ok(());
    }

    println!();
    println!("{}", style::header(&format!("Accounts ({})", accounts.len())));
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["", "Name", "Username", "Signing key", "SSH key"]);

    for a in &accounts {
        let marker = match (a.linked, a.default) {
            (true, _) => Cell::new("linked").fg(Color::Blue),
            (false, true) => Cell::new("default").fg(Color::Green),
            _ => Cell::new(""),
        };
        table.add_row(vec![
            marker,
            Cell::new(&a.name),
            Cell::new(&a.username),
            Cell::new(a.signing_key.as_deref().unwrap_or("—")),
            Cell::new(a.ssh_key_path.as_deref().unwrap_or("—")),
        ]);
    }

    println!("{}", table);
    println!();
    Ok(())
}

pub fn run_use(app: &App, name: &str) -> Result<()> {
    let profile = app
        .mgr
        .switch_default(name)
        .with_context(|| format!("failed to switch to '{}'", name))?;
    println!(
        "{}",
        style::success(&format!(
            "Switched global account to '{}' ({})",
            profile.name, profile.username
        ))
    );

    let resolution = app.mgr.resolve(&app.cwd);
    if let Some(linked) = resolution.linked_name.filter(|l| l != name) {
        println!(
            "  {}",
            style::info(&format!(
                "This repository is linked to '{}', which still applies here.",
                linked
            ))
        );
    }
    Ok(())
}

pub fn run_rename(app: &App, old: &str, new: &str) -> Result<()> {
    let outcome = app
        .mgr
        .rename(old, new, Some(&app.cwd))
        .context("failed to rename account")?;
    println!(
        "{}",
        style::success(&format!("Renamed account '{}' to '{}'", old, new))
    );
    if outcome.default_repointed {
        println!("  {}", style::dim("Global default updated."));
    }
    if outcome.link_repointed {
        println!("  {}", style::dim("Repository link updated."));
    }
    Ok(())
}

pub fn run_remove(app: &App, name: &str, yes: bool) -> Result<()> {
    if !app.mgr.load().contains(name) {
        bail!("account '{}' not found", name);
    }
    if !yes {
        if !console::user_attended() {
            bail!("refusing to remove '{}' without confirmation; pass --yes", name);
        }
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove account '{}'?", name))
            .default(false)
            .interact()
            .context("failed to read confirmation")?;
        if !confirmed {
            println!("{}", style::warn("Cancelled."));
            return Ok(());
        }
    }

    let outcome = app
        .mgr
        .remove(name, Some(&app.cwd))
        .context("failed to remove account")?;

    if outcome.unlinked {
        println!(
            "{}",
            style::info("Current repository was linked to the removed account and has been unlinked.")
        );
    }
    if outcome.default_changed {
        match outcome.new_default.as_deref() {
            Some(next) => println!("{}", style::info(&format!("Global default is now '{}'.", next))),
            None => println!("{}", style::info("No global default remains.")),
        }
    }
    println!("{}", style::success(&format!("Removed account '{}'", name)));
    Ok(())
}

pub fn run_update(app: &App, name: &str, req: UpdateRequest) -> Result<()> {
    let changed = app
        .mgr
        .update(name, req)
        .with_context(|| format!("failed to update '{}'", name))?;
    if changed {
        println!("{}", style::success(&format!("Updated account '{}'", name)));
    } else {
        println!("{}", style::info("No changes requested."));
    }
    Ok(())
}
