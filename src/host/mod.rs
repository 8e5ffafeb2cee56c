//! Everything the interpreter talks to but does not own: the console, the
//! window system and the dependency / chat-bot integration.

pub mod console;
pub mod recipes;
pub mod window;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Ventana '{0}' no encontrada")]
    WindowNotFound(String),
    #[error("Dependencia no valida: {0}")]
    InvalidRecipe(String),
    #[error("No se pudo leer {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} no disponible: no hay cliente de chat configurado")]
    Unavailable(&'static str),
}
