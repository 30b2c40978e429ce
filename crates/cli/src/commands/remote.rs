//! `push`, `pull`, `clone` and `remote add/remove`.

use anyhow::{Context, Result};
use dialoguer::{Confirm, Select};

use ghmulti_core::git::remote::redact_url;
use ghmulti_core::git::SystemGit;
use ghmulti_core::ops::{self, PullOptions, PushOptions, RemoteTarget};

use super::{style, App};

fn describe_target(target: &RemoteTarget, verb: &str, branch: &str) {
    if target.account_remote {
        println!(
            "{}",
            style::info(&format!("Using linked account remote: {}", target.remote))
        );
    }
    println!(
        "{}",
        style::info(&format!(
            "{} as '{}' ({}) via '{}' on branch '{}'",
            verb,
            target.profile.username,
            style::source_label(target.source),
            target.remote,
            branch
        ))
    );
    if !target.authenticated {
        println!(
            "  {}",
            style::dim("No token stored for this account; git will use its own credentials.")
        );
    }
}

pub fn run_push(app: &App, branch: String, message: Option<String>, remote: Option<String>) -> Result<()> {
    let opts = PushOptions {
        branch,
        message,
        remote,
    };
    let target = ops::push(&app.mgr, &SystemGit::new(), &app.cwd, &opts).context("push failed")?;
    describe_target(&target, "Pushed", &opts.branch);
    println!("{}", style::success("Push successful."));
    Ok(())
}

pub fn run_pull(app: &App, branch: String, remote: Option<String>) -> Result<()> {
    let opts = PullOptions { branch, remote };
    let target = ops::pull(&app.mgr, &SystemGit::new(), &app.cwd, &opts).context("pull failed")?;
    describe_target(&target, "Pulled", &opts.branch);
    println!("{}", style::success("Pull complete."));
    Ok(())
}

/// `link`: `Some(true)` link, `Some(false)` don't, `None` decide (ask when
/// no account was given).
pub fn run_clone(app: &App, url: &str, account: Option<&str>, link: Option<bool>) -> Result<()> {
    let attended = console::user_attended();
    let should_link = match (link, account) {
        (Some(l), _) => l,
        (None, Some(_)) => true,
        (None, None) if attended => Confirm::new()
            .with_prompt("Link an account to the cloned repository?")
            .default(false)
            .interact()
            .context("failed to read confirmation")?,
        (None, None) => false,
    };

    let link_to = match (should_link, account) {
        (false, _) => None,
        (true, Some(name)) => Some(name.to_string()),
        (true, None) => Some(choose_account(app)?),
    };

    println!("{}", style::info(&format!("Cloning {}...", url)));
    let outcome = ops::clone(
        &app.mgr,
        &SystemGit::new(),
        &app.cwd,
        url,
        account,
        link_to.as_deref(),
    )
    .context("clone failed")?;

    println!(
        "{}",
        style::success(&format!("Cloned {} into {}", url, outcome.directory.display()))
    );
    match outcome.linked {
        Some(name) => println!("{}", style::success(&format!("Repository linked to '{}'", name))),
        None => println!(
            "  {}",
            style::dim("Link an account later with: ghmulti link <account>")
        ),
    }
    Ok(())
}

pub fn run_remote_add(app: &App, account: &str, url: &str) -> Result<()> {
    let name = ops::add_account_remote(&app.cwd, account, url)
        .with_context(|| format!("failed to add remote for account '{}'", account))?;
    println!("{}", style::success(&format!("Added remote '{}' -> {}", name, redact_url(url))));
    Ok(())
}

pub fn run_remote_remove(app: &App, account: &str) -> Result<()> {
    let name = ops::remove_account_remote(&app.cwd, account)
        .with_context(|| format!("failed to remove remote for account '{}'", account))?;
    println!("{}", style::success(&format!("Removed remote '{}'", name)));
    Ok(())
}

fn choose_account(app: &App) -> Result<String> {
    let doc = app.mgr.load();
    if doc.accounts.is_empty() {
        anyhow::bail!("no accounts configured; run 'ghmulti add' first");
    }
    if !console::user_attended() {
        anyhow::bail!("pass --account to choose the account to link");
    }
    let names: Vec<&str> = doc.accounts.iter().map(|p| p.name.as_str()).collect();
    let choice = Select::new()
        .with_prompt("Select account to link to the cloned repository")
        .items(&names)
        .default(0)
        .interact()
        .context("failed to read account selection")?;
    Ok(names[choice].to_string())
}
