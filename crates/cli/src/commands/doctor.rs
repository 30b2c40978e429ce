//! `doctor`: environment health checks.

use std::process::ExitCode;

use anyhow::Result;

use ghmulti_core::doctor::run_doctor as diagnose;

use super::{print_json, style, App};

/// Exit status is failure when any check reports an error.
pub fn run_doctor(app: &App, json: bool) -> Result<ExitCode> {
    let report = diagnose(&app.mgr, &app.cwd);

    if json {
        print_json(&report)?;
    } else {
        println!();
        println!("{}", style::header("ghmulti doctor"));
        println!("{}", "═".repeat(14));
        println!();
        for check in &report.checks {
            let line = format!("{:<16} {}", check.name, check.detail);
            if check.is_ok() {
                println!("  {}", style::success(&line));
            } else {
                println!("  {}", style::error(&line));
            }
        }
        println!();
        let failed = report.checks.iter().filter(|c| !c.is_ok()).count();
        if failed == 0 {
            println!("  {} All checks passed!", console::style("✓").green().bold());
        } else {
            println!(
                "  {} {} check(s) failed",
                console::style("!").yellow().bold(),
                failed
            );
        }
        println!();
    }

    Ok(if report.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
