//! `gitbuddy init`: Write a default configuration file.

use gitbuddy_config::AppConfig;
use std::path::Path;

pub fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = AppConfig::config_path();
    if write_default_config(&path, force)? {
        println!("  ✅ Wrote default configuration to {}", path.display());
        println!("  Set index.host and your API keys, then run `gitbuddy doctor`.");
    } else {
        println!(
            "  ℹ️  {} already exists. Use --force to overwrite it.",
            path.display()
        );
    }
    Ok(())
}

/// Write the default TOML to `path`. Returns `false` if a file is already
/// there and `force` is not set.
fn write_default_config(path: &Path, force: bool) -> std::io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(true)
}
