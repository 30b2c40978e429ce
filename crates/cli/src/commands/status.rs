//! `status`: effective account, git identity, token check.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use ghmulti_core::git::validate_token;
use ghmulti_core::status::{build_status_report, IdentitySnapshot, StatusReport};

use super::{print_json, style, App};

pub async fn run_status(app: &App, json: bool, verify: bool) -> Result<()> {
    let (mut report, token) = build_status_report(&app.mgr, &app.cwd);

    if let (true, Some(token)) = (verify, token.as_deref()) {
        let spinner = (!json).then(|| {
            let spinner = ProgressBar::new_spinner();
            if let Ok(s) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
                spinner.set_style(s.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
            }
            spinner.set_message("Verifying token with GitHub...");
            spinner.enable_steady_tick(std::time::Duration::from_millis(100));
            spinner
        });

        let check = validate_token(
            &app.settings.github.api_url,
            token,
            app.settings.token_check_timeout(),
        )
        .await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        report.record_token_check(check);
    }

    if json {
        return print_json(&report);
    }
    print_report(&report);
    Ok(())
}

fn print_identity(label: &str, id: &IdentitySnapshot) {
    let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "(unset)".to_string());
    println!("{}", style::header(label));
    println!("  user.name        {}", show(&id.user_name));
    println!("  user.email       {}", show(&id.user_email));
    println!("  user.signingkey  {}", show(&id.signing_key));
    println!("  core.sshCommand  {}", show(&id.ssh_command));
}

fn print_report(report: &StatusReport) {
    println!();
    println!("{}", style::header("ghmulti status"));
    println!("{}", "═".repeat(14));
    println!();

    if let Some(linked) = report.linked_account.as_deref() {
        println!("  Linked account   {} (via .ghmulti)", linked);
    }
    match &report.global_active_account {
        Some(a) => println!("  Global account   {} ({})", a.name, a.username),
        None => println!("  Global account   {}", style::dim("none")),
    }
    match &report.effective_active_account {
        Some(a) => println!(
            "  Effective        {} ({}) [{}]",
            a.name,
            a.username,
            style::source_label(a.source)
        ),
        None => println!(
            "  {}",
            style::error("No active account. Run 'ghmulti use <name>' or 'ghmulti link <name>'.")
        ),
    }
    println!();

    if report.repo_root.is_some() {
        print_identity("Local git identity", &report.local_identity);
        println!();
    }
    print_identity("Global git identity", &report.global_identity);
    println!();

    let token = &report.token_status;
    let line = match (token.present, token.valid) {
        (true, Some(true)) => style::success(&token.message),
        (true, Some(false)) => style::error(&token.message),
        (true, None) => style::warn(&token.message),
        (false, _) => style::error(&token.message),
    };
    println!("  Token            {}", line);

    if !report.warnings.is_empty() {
        println!();
        for w in &report.warnings {
            println!("  {}", style::warn(w));
        }
    }
    println!();
}
