//! `.pansos` books: a typed `key:type:value` file mirrored in memory.
//!
//! The type column on disk is advisory. Values are kept as raw text and the
//! tag is derived again from that text whenever the book is saved or listed.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::parser::eval::{parse_float, parse_int};
use crate::parser::{decode_line, parse_list, trim, unquote};

pub const EXTENSION: &str = ".pansos";

pub const HEADER: &str = "# Archivo de datos Pancracio (.pansos)\n\
# Formato: clave:tipo:valor\n\
# Tipos soportados: entero, decimal, texto, lista\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Entero,
    Decimal,
    Texto,
    Lista,
}

impl Kind {
    /// Padded numbers are texto, so the padding survives a save.
    pub fn infer(value: &str) -> Kind {
        let padded = trim(value) != value;
        if value.len() >= 2 && value.starts_with('[') && value.ends_with(']') {
            Kind::Lista
        } else if padded {
            Kind::Texto
        } else if value.contains('.') && parse_float(value).is_some() {
            Kind::Decimal
        } else if parse_int(value).is_some() {
            Kind::Entero
        } else {
            Kind::Texto
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Kind::Entero => "entero",
            Kind::Decimal => "decimal",
            Kind::Texto => "texto",
            Kind::Lista => "lista",
        }
    }

    fn format(&self, value: &str) -> String {
        match self {
            Kind::Texto => format!("\"{}\"", value),
            _ => value.to_string(),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum BookError {
    #[error("No hay archivo abierto")]
    NotOpen,
    #[error("Clave no válida: {0}")]
    InvalidKey(String),
    #[error("No hay archivo especificado para guardar")]
    NoTarget,
    #[error("No se pudo {action} el archivo {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Lista '{0}' no encontrada")]
    MissingList(String),
    #[error("Elemento '{value}' no encontrado en la lista '{key}'")]
    MissingItem { key: String, value: String },
    #[error("Índice {index} fuera de rango para la lista '{key}'")]
    OutOfRange { key: String, index: i64 },
    #[error("Clave '{0}' no encontrada")]
    MissingKey(String),
}

impl BookError {
    /// Lookups that simply found nothing, as opposed to misuse or I/O failure.
    pub fn is_notice(&self) -> bool {
        matches!(
            self,
            BookError::MissingList(_)
                | BookError::MissingItem { .. }
                | BookError::OutOfRange { .. }
                | BookError::MissingKey(_)
        )
    }
}

/// Keys that are never stored, listed or saved.
pub fn is_valid_key(key: &str) -> bool {
    if key.is_empty() || key == "lingan" || key == "manolo perez" {
        return false;
    }
    !(key.contains(' ') && key.contains("perez"))
}

pub fn with_extension(name: &str) -> PathBuf {
    if name.contains(EXTENSION) {
        PathBuf::from(name)
    } else {
        PathBuf::from(format!("{}{}", name, EXTENSION))
    }
}

/// One line of a `.pansos` file.
#[derive(Debug, PartialEq)]
pub enum Line<'a> {
    Skip,
    Malformed,
    Entry {
        key: &'a str,
        kind: &'a str,
        value: String,
    },
}

pub fn parse_line(line: &str) -> Line<'_> {
    let line = trim(line);
    if line.is_empty() || line.starts_with('#') {
        return Line::Skip;
    }
    let Some(first) = line.find(':') else {
        return Line::Malformed;
    };
    let Some(second) = line[first + 1..].find(':').map(|i| i + first + 1) else {
        return Line::Malformed;
    };
    let key = trim(&line[..first]);
    let kind = trim(&line[first + 1..second]);
    let raw = &line[second + 1..];
    let value = if kind == Kind::Texto.as_str() {
        unquote(raw)
    } else {
        raw
    };
    Line::Entry {
        key,
        kind,
        value: value.to_string(),
    }
}

/// Items of a stored list, unquoted, without empty entries.
pub fn list_items(value: &str) -> Vec<String> {
    parse_list(value)
        .iter()
        .map(|item| unquote(item).to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

pub fn format_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| format!("\"{}\"", item)).collect();
    format!("[{}]", quoted.join(", "))
}

/// Result of opening a book.
#[derive(Debug)]
pub struct Loaded {
    pub path: PathBuf,
    pub entries: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Default)]
pub struct Book {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
    open: bool,
}

impl Book {
    pub fn new() -> Book {
        Book::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ensure_open(&self) -> Result<(), BookError> {
        if self.open {
            Ok(())
        } else {
            Err(BookError::NotOpen)
        }
    }

    fn write_file(path: &Path, body: &str, action: &'static str) -> Result<(), BookError> {
        fs::write(path, body).map_err(|source| BookError::Io {
            action,
            path: path.to_path_buf(),
            source,
        })
    }

    /// Truncates `name` to a bare header and makes it the open book.
    pub fn create(&mut self, name: &str) -> Result<PathBuf, BookError> {
        let path = with_extension(name);
        Book::write_file(&path, HEADER, "crear")?;
        self.entries.clear();
        self.path = Some(path.clone());
        self.open = true;
        Ok(path)
    }

    pub fn open(&mut self, name: &str) -> Result<Loaded, BookError> {
        let path = with_extension(name);
        let bytes = fs::read(&path).map_err(|source| BookError::Io {
            action: "abrir",
            path: path.clone(),
            source,
        })?;
        self.entries.clear();
        let mut warnings = Vec::new();
        for (n, line) in bytes.split(|b| *b == b'\n').enumerate() {
            let line = decode_line(line);
            match parse_line(&line) {
                Line::Skip => {}
                Line::Malformed => warnings.push(format!("Línea {} formato incorrecto", n + 1)),
                Line::Entry { key, .. } if !is_valid_key(key) => {
                    warnings.push(format!("Ignorando entrada problemática: {}", key))
                }
                Line::Entry { key, value, .. } => {
                    self.entries.insert(key.to_string(), value);
                }
            }
        }
        self.path = Some(path.clone());
        self.open = true;
        Ok(Loaded {
            path,
            entries: self.entries.len(),
            warnings,
        })
    }

    /// Writes every valid entry, sorted by key. Returns the target and the entry count.
    pub fn save(&mut self, name: Option<&str>) -> Result<(PathBuf, usize), BookError> {
        let path = match name {
            Some(name) => with_extension(name),
            None => self.path.clone().ok_or(BookError::NoTarget)?,
        };
        let mut body = HEADER.to_string();
        let mut count = 0;
        for (key, value) in self.entries.iter().filter(|(k, _)| is_valid_key(k)) {
            let kind = Kind::infer(value);
            body.push_str(&format!("{}:{}:{}\n", key, kind, kind.format(value)));
            count += 1;
        }
        Book::write_file(&path, &body, "guardar")?;
        if name.is_some() {
            self.path = Some(path.clone());
        }
        Ok((path, count))
    }

    /// Saves to the current file, if any, and closes the book.
    pub fn close(&mut self) -> Result<Option<(PathBuf, usize)>, BookError> {
        if !self.open || self.path.is_none() {
            return Ok(None);
        }
        let saved = self.save(None)?;
        self.open = false;
        Ok(Some(saved))
    }

    pub fn write(&mut self, key: &str, value: &str) -> Result<(), BookError> {
        self.ensure_open()?;
        if !is_valid_key(key) {
            return Err(BookError::InvalidKey(key.to_string()));
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn read(&self, key: &str) -> Option<&str> {
        if !self.open || !is_valid_key(key) {
            return None;
        }
        self.entries.get(key).map(String::as_str)
    }

    pub fn exists(&self, key: &str) -> bool {
        self.open && self.entries.contains_key(key)
    }

    pub fn delete(&mut self, key: &str) -> Result<(), BookError> {
        self.ensure_open()?;
        self.entries
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| BookError::MissingKey(key.to_string()))
    }

    pub fn add(&mut self, key: &str, value: &str) -> Result<(), BookError> {
        self.ensure_open()?;
        if !is_valid_key(key) {
            return Err(BookError::InvalidKey(key.to_string()));
        }
        let mut items = self.entries.get(key).map(|v| list_items(v)).unwrap_or_default();
        items.push(value.to_string());
        self.entries.insert(key.to_string(), format_list(&items));
        Ok(())
    }

    fn stored_list(&self, key: &str) -> Result<Vec<String>, BookError> {
        self.ensure_open()?;
        self.entries
            .get(key)
            .map(|v| list_items(v))
            .ok_or_else(|| BookError::MissingList(key.to_string()))
    }

    /// Removes the first item equal to `value`.
    pub fn remove(&mut self, key: &str, value: &str) -> Result<(), BookError> {
        let mut items = self.stored_list(key)?;
        let Some(pos) = items.iter().position(|item| item == value) else {
            return Err(BookError::MissingItem {
                key: key.to_string(),
                value: value.to_string(),
            });
        };
        items.remove(pos);
        self.entries.insert(key.to_string(), format_list(&items));
        Ok(())
    }

    /// Removes the item at a 0-based index and returns it.
    pub fn remove_at(&mut self, key: &str, index: i64) -> Result<String, BookError> {
        let mut items = self.stored_list(key)?;
        let pos = usize::try_from(index)
            .ok()
            .filter(|pos| *pos < items.len())
            .ok_or_else(|| BookError::OutOfRange {
                key: key.to_string(),
                index,
            })?;
        let removed = items.remove(pos);
        self.entries.insert(key.to_string(), format_list(&items));
        Ok(removed)
    }

    /// Valid entries, sorted, with their inferred kind.
    pub fn list(&self) -> Result<Vec<(&str, Kind, &str)>, BookError> {
        self.ensure_open()?;
        Ok(self
            .entries
            .iter()
            .filter(|(k, _)| is_valid_key(k))
            .map(|(k, v)| (k.as_str(), Kind::infer(v), v.as_str()))
            .collect())
    }

    pub fn clear(&mut self) -> Result<(), BookError> {
        self.ensure_open()?;
        self.entries.clear();
        Ok(())
    }
}

impl Drop for Book {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("{}", e);
        }
    }
}

/// Fresh scratch directory under the system temp dir.
#[cfg(test)]
pub fn test_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pancracio_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}
