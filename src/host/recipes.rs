use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::book::{self, Line};
use crate::host::HostError;

pub const DISCORD: &str = "la_receta_de_discord";

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeInfo {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
}

/// Dependency loading plus the chat-bot operations a loaded dependency offers.
pub trait Recipes {
    fn load(&mut self, name: &str) -> Result<RecipeInfo, HostError>;
    fn is_loaded(&self, name: &str) -> bool;
    fn connect(&mut self, token: &str, bot_id: &str) -> Result<(), HostError>;
    fn send(&mut self, channel: &str, message: &str) -> Result<(), HostError>;
    fn set_status(&mut self, status: &str, activity: &str) -> Result<(), HostError>;
    fn register_slash(&mut self, name: &str, description: &str) -> Result<(), HostError>;
    fn set_prefix(&mut self, prefix: &str);
    fn register_handler(&mut self, kind: &str, procedure: &str) -> Result<(), HostError>;
    fn start_bot(&mut self, channel: &str) -> Result<(), HostError>;
    fn channel_info(&mut self, channel: &str) -> Result<String, HostError>;
    fn is_connected(&self) -> bool;
}

/// Loads dependencies from `<dir>/<name>/{info.pansos,main.pan}`.
///
/// No chat client ships with the interpreter, so every network operation
/// reports itself unavailable.
#[derive(Debug)]
pub struct Shelf {
    dir: PathBuf,
    loaded: BTreeMap<String, RecipeInfo>,
    prefix: String,
    handlers: BTreeMap<String, String>,
}

impl Shelf {
    pub fn new<P: AsRef<Path>>(dir: P) -> Shelf {
        Shelf {
            dir: dir.as_ref().to_path_buf(),
            loaded: BTreeMap::new(),
            prefix: "!".to_string(),
            handlers: BTreeMap::new(),
        }
    }

    #[cfg(test)]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[cfg(test)]
    pub fn handler(&self, kind: &str) -> Option<&str> {
        self.handlers.get(kind).map(String::as_str)
    }

    fn read_info(path: &Path) -> Result<BTreeMap<String, String>, HostError> {
        let text = fs::read_to_string(path).map_err(|source| HostError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut info = BTreeMap::new();
        for line in text.lines() {
            if let Line::Entry { key, value, .. } = book::parse_line(line) {
                info.insert(key.to_string(), value);
            }
        }
        Ok(info)
    }
}

impl Recipes for Shelf {
    fn load(&mut self, name: &str) -> Result<RecipeInfo, HostError> {
        if let Some(info) = self.loaded.get(name) {
            return Ok(info.clone());
        }
        let path = self.dir.join(name);
        let info_path = path.join("info.pansos");
        if name.is_empty() || !info_path.is_file() || !path.join("main.pan").is_file() {
            return Err(HostError::InvalidRecipe(name.to_string()));
        }
        let info = Shelf::read_info(&info_path)?;
        let recipe = RecipeInfo {
            name: info.get("nombre").cloned().unwrap_or_else(|| name.to_string()),
            version: info.get("version").cloned().unwrap_or_default(),
            path,
        };
        self.loaded.insert(name.to_string(), recipe.clone());
        Ok(recipe)
    }

    fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    fn connect(&mut self, _token: &str, _bot_id: &str) -> Result<(), HostError> {
        Err(HostError::Unavailable("conectar"))
    }

    fn send(&mut self, _channel: &str, _message: &str) -> Result<(), HostError> {
        Err(HostError::Unavailable("enviar"))
    }

    fn set_status(&mut self, _status: &str, _activity: &str) -> Result<(), HostError> {
        Err(HostError::Unavailable("estado"))
    }

    fn register_slash(&mut self, _name: &str, _description: &str) -> Result<(), HostError> {
        Err(HostError::Unavailable("registrar_slash"))
    }

    fn set_prefix(&mut self, prefix: &str) {
        self.prefix = prefix.to_string();
    }

    fn register_handler(&mut self, kind: &str, procedure: &str) -> Result<(), HostError> {
        self.handlers.insert(kind.to_string(), procedure.to_string());
        Ok(())
    }

    fn start_bot(&mut self, _channel: &str) -> Result<(), HostError> {
        Err(HostError::Unavailable("iniciar_bot_real"))
    }

    fn channel_info(&mut self, _channel: &str) -> Result<String, HostError> {
        Err(HostError::Unavailable("canal"))
    }

    fn is_connected(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::book::test_dir;

    #[test]
    fn loads_valid_dependency() {
        let dir = test_dir("recetas_ok");
        let dep = dir.join("saludos");
        fs::create_dir_all(&dep).unwrap();
        fs::write(dep.join("info.pansos"), "# info\nnombre:texto:\"Saludos\"\nversion:decimal:1.2\n").unwrap();
        fs::write(dep.join("main.pan"), "hornear \"hola\"\n").unwrap();

        let mut shelf = Shelf::new(&dir);
        let info = shelf.load("saludos").unwrap();
        assert_eq!(info.name, "Saludos");
        assert_eq!(info.version, "1.2");
        assert!(shelf.is_loaded("saludos"));
    }

    #[test]
    fn rejects_incomplete_dependency() {
        let dir = test_dir("recetas_mal");
        fs::create_dir_all(dir.join("vacia")).unwrap();
        let mut shelf = Shelf::new(&dir);
        assert!(matches!(shelf.load("vacia"), Err(HostError::InvalidRecipe(_))));
        assert!(matches!(shelf.load("inexistente"), Err(HostError::InvalidRecipe(_))));
        assert!(!shelf.is_loaded("vacia"));
    }

    #[test]
    fn chat_operations_are_unavailable() {
        let mut shelf = Shelf::new("no_existe");
        assert!(shelf.connect("t", "1").is_err());
        assert!(shelf.send("1", "hola").is_err());
        assert!(!shelf.is_connected());
        shelf.set_prefix("?");
        assert_eq!(shelf.prefix(), "?");
        shelf.register_handler("mensaje", "responder").unwrap();
        assert_eq!(shelf.handler("mensaje"), Some("responder"));
    }
}
