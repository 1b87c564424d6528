use std::path::Path;

use crate::error::{GlError, Result};
use crate::settings::{save_settings, settings_path, Settings};

pub fn show(settings: &Settings) -> Result<()> {
    let json = serde_json::to_string_pretty(settings)?;
    println!("{json}");
    Ok(())
}

pub fn init(path: Option<&Path>, force: bool) -> Result<()> {
    let target = path.map(Path::to_path_buf).unwrap_or_else(settings_path);
    if target.exists() && !force {
        return Err(GlError::Settings(format!(
            "{} already exists (use --force to overwrite)",
            target.display()
        )));
    }
    let written = save_settings(&Settings::default(), Some(&target))?;
    println!("Wrote default settings to {}", written.display());
    Ok(())
}
