//! Configuration loading

use anyhow::Result;

use crate::Config;

/// Load configuration from a config file or environment variables
///
/// Config file search order:
/// 1. explicit path (command line flag)
/// 2. `FADECAST_CONFIG_PATH` environment variable
/// 3. ./config.yaml (current working directory)
/// 4. Fall back to environment variables only
///
/// Logging is not initialised yet at this point, so progress goes to stderr.
pub fn load_config(explicit_path: Option<&str>) -> Result<Config> {
    let config_path = explicit_path
        .map(str::to_string)
        .or_else(|| std::env::var("FADECAST_CONFIG_PATH").ok())
        .filter(|p| std::path::Path::new(p).exists())
        .or_else(|| {
            let cwd = "config.yaml";
            std::path::Path::new(cwd).exists().then(|| cwd.to_string())
        });

    let config = if let Some(path) = config_path {
        eprintln!("Loading config from {path}");
        Config::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Failed to load {path}: {e}"))?
    } else {
        Config::from_env().unwrap_or_else(|e| {
            eprintln!("Failed to load config from environment: {e}");
            eprintln!("Using default configuration");
            Config::default()
        })
    };

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Config validation error: {error}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s): {}",
            errors.len(),
            errors.join("; ")
        ));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_explicit_path_falls_back() {
        let config = load_config(Some("/definitely/not/here.yaml")).unwrap();
        assert!(config.server.http_port > 0);
    }
}
