use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::log::Level;

pub const LOG_VAR: &str = "PANCRACIO_LOG";
pub const RECIPES_VAR: &str = "PANCRACIO_RECETAS";
pub const HEARTBEAT_VAR: &str = "PANCRACIO_LATIDO";

pub fn os_env_hashmap() -> HashMap<String, String> {
    let mut map = HashMap::new();
    use std::env;
    for (key, val) in env::vars_os() {
        if let (Ok(k), Ok(v)) = (key.into_string(), val.into_string()) {
            map.insert(k, v);
        }
    }
    map
}

/// Runtime settings. The CLI layers its flags on top of these.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub log_level: Level,
    /// Directory holding one sub-directory per importable dependency.
    pub recipes_dir: PathBuf,
    /// Tick of the bot keep-alive loop.
    pub heartbeat: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            log_level: Level::Info,
            recipes_dir: PathBuf::from("libro_de_recetas"),
            heartbeat: Duration::from_secs(30),
        }
    }
}

impl Settings {
    pub fn from_env() -> Settings {
        Settings::from_map(&os_env_hashmap())
    }

    /// Unparseable values fall back to the defaults with a warning.
    pub fn from_map(vars: &HashMap<String, String>) -> Settings {
        let mut settings = Settings::default();
        if let Some(level) = vars.get(LOG_VAR) {
            match Level::from_str(level) {
                Ok(level) => settings.log_level = level,
                Err(e) => warn!("{}: {}", LOG_VAR, e),
            }
        }
        if let Some(dir) = vars.get(RECIPES_VAR) {
            if !dir.is_empty() {
                settings.recipes_dir = PathBuf::from(dir);
            }
        }
        if let Some(secs) = vars.get(HEARTBEAT_VAR) {
            match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => settings.heartbeat = Duration::from_secs(secs),
                _ => warn!("{}: se esperaban segundos, se obtuvo '{}'", HEARTBEAT_VAR, secs),
            }
        }
        settings
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        assert_eq!(Settings::from_map(&HashMap::new()), Settings::default());
    }

    #[test]
    fn reads_overrides() {
        let mut vars = HashMap::new();
        vars.insert(LOG_VAR.to_string(), "debug".to_string());
        vars.insert(RECIPES_VAR.to_string(), "/opt/recetas".to_string());
        vars.insert(HEARTBEAT_VAR.to_string(), "5".to_string());
        let settings = Settings::from_map(&vars);
        assert_eq!(settings.log_level, Level::Debug);
        assert_eq!(settings.recipes_dir, PathBuf::from("/opt/recetas"));
        assert_eq!(settings.heartbeat, Duration::from_secs(5));
    }

    #[test]
    fn bad_values_keep_defaults() {
        let mut vars = HashMap::new();
        vars.insert(LOG_VAR.to_string(), "ruido".to_string());
        vars.insert(HEARTBEAT_VAR.to_string(), "0".to_string());
        assert_eq!(Settings::from_map(&vars), Settings::default());
    }
}
