//! `link` and `unlink`.

use anyhow::{Context, Result};
use dialoguer::Confirm;

use ghmulti_core::git::remote::{account_remote_name, derive_account_remote_url, remotes_mention_user};
use ghmulti_core::git::GitRepo;
use ghmulti_core::Profile;

use super::{print_json, style, App};

/// What to do about a per-account remote after linking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteMode {
    Ask,
    Add,
    Skip,
}

pub fn run_link(app: &App, name: &str, mode: RemoteMode) -> Result<()> {
    let outcome = app
        .mgr
        .link(name, &app.cwd)
        .with_context(|| format!("failed to link account '{}'", name))?;
    println!(
        "{}",
        style::success(&format!("Linked account '{}' to this repository", outcome.profile.name))
    );
    println!(
        "  {}",
        style::dim("Local user.name, user.email, signing key and SSH command updated.")
    );

    if mode != RemoteMode::Skip {
        let repo = GitRepo::discover(&outcome.repo_root).context("failed to open repository")?;
        manage_remote(app, &repo, &outcome.profile, mode)?;
    }
    Ok(())
}

fn manage_remote(app: &App, repo: &GitRepo, profile: &Profile, mode: RemoteMode) -> Result<()> {
    let urls = repo.remote_urls().context("failed to list remotes")?;
    if remotes_mention_user(&urls, &profile.username) {
        println!(
            "  {}",
            style::info(&format!(
                "Found an existing remote that may belong to '{}'.",
                profile.username
            ))
        );
        return Ok(());
    }

    let remote_name = account_remote_name(&profile.name);
    let Some(url) = repo
        .remote_url("origin")
        .and_then(|origin| derive_account_remote_url(&origin, &profile.username, &app.settings.github.host))
    else {
        println!(
            "  {}",
            style::dim("No remote for this account and origin could not be rewritten; add one manually.")
        );
        return Ok(());
    };

    let add = match mode {
        RemoteMode::Add => true,
        RemoteMode::Ask if console::user_attended() => Confirm::new()
            .with_prompt(format!("Add remote '{}' -> {}?", remote_name, url))
            .default(false)
            .interact()
            .context("failed to read confirmation")?,
        _ => false,
    };
    if add {
        repo.add_remote(&remote_name, &url)
            .with_context(|| format!("failed to add remote '{}'", remote_name))?;
        println!("  {}", style::success(&format!("Added remote '{}' ({})", remote_name, url)));
    }
    Ok(())
}

pub fn run_unlink(app: &App, json: bool, reset_local_git: bool) -> Result<()> {
    let outcome = app
        .mgr
        .unlink(&app.cwd, reset_local_git)
        .context("failed to unlink repository")?;

    if json {
        return print_json(&outcome);
    }

    match outcome.previously_linked_account.as_deref() {
        Some(name) => println!(
            "{}",
            style::success(&format!("Unlinked repository from account '{}'", name))
        ),
        None => println!("{}", style::info("Repository was not linked to an account.")),
    }
    if reset_local_git {
        println!("  {}", style::dim("Local git identity fields were reset."));
    }
    Ok(())
}
