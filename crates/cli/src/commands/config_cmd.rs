//! `parsec config`: Configuration management commands.

use std::path::Path;

use parsec_config::AppConfig;

pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub fn path() {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
}

pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    if write_default(&config_path)? {
        println!("Created config.toml at: {}", config_path.display());
    } else {
        println!("Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete it and re-run `parsec config init`.");
    }
    Ok(())
}

/// Write the default configuration unless a file is already there.
/// Returns whether a file was written.
fn write_default(config_path: &Path) -> std::io::Result<bool> {
    if config_path.exists() {
        return Ok(false);
    }
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, AppConfig::default_toml())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_valid() {
        let path = parsec_config::AppConfig::config_dir().join("config.toml");
        assert!(path.to_str().unwrap().ends_with("config.toml"));
    }

    #[test]
    fn init_writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".parsec").join("config.toml");

        assert!(write_default(&path).unwrap());
        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.agent.max_iterations, 10);
        assert_eq!(loaded.logs.max_entries, 200);
    }

    #[test]
    fn init_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[agent]\nmax_iterations = 3\n").unwrap();

        assert!(!write_default(&path).unwrap());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[agent]\nmax_iterations = 3\n"
        );
    }
}
