//! `config init` and `config show`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use ghmulti_core::config::Settings;

use super::{style, App};

pub fn run_init(output: Option<&Path>, force: bool) -> Result<()> {
    let path: PathBuf = match output {
        Some(p) => p.to_path_buf(),
        None => Settings::default_path().context("could not determine the config directory")?,
    };

    if path.exists() && !force {
        bail!(
            "file already exists: {}. Use --force to overwrite it.",
            path.display()
        );
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, Settings::default_template()).context("failed to write settings file")?;

    println!("{}", style::success(&format!("Settings written to {}", path.display())));
    Ok(())
}

/// Effective settings after file loading and env overrides.
pub fn run_show(app: &App) -> Result<()> {
    let rendered = toml::to_string_pretty(&app.settings).context("failed to render settings")?;
    println!(
        "{}",
        style::dim(&format!(
            "# accounts file: {}",
            app.settings.accounts_path().display()
        ))
    );
    print!("{}", rendered);
    Ok(())
}
