use std::collections::BTreeMap;

use termion::event::Key;

use crate::host::HostError;

/// A rectangle with a velocity, owned by a game window.
#[derive(Debug, Clone, PartialEq)]
pub struct GameObject {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
    pub vx: i64,
    pub vy: i64,
    pub color: String,
    pub visible: bool,
}

impl GameObject {
    pub fn new(x: i64, y: i64, width: i64, height: i64, color: &str) -> GameObject {
        GameObject {
            x,
            y,
            width,
            height,
            vx: 0,
            vy: 0,
            color: color.to_string(),
            visible: true,
        }
    }

    /// Axis-aligned overlap. Touching edges do not count.
    pub fn overlaps(&self, other: &GameObject) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub title: String,
    pub color: String,
    pub game: bool,
    pub content: Vec<String>,
    pub objects: BTreeMap<String, GameObject>,
    keys: Vec<Key>,
}

impl Window {
    fn new(title: &str, color: &str, game: bool) -> Window {
        Window {
            title: title.to_string(),
            color: color.to_string(),
            game,
            content: Vec::new(),
            objects: BTreeMap::new(),
            keys: Vec::new(),
        }
    }

    /// Both objects must exist and be visible.
    pub fn collides(&self, a: &str, b: &str) -> bool {
        match (self.objects.get(a), self.objects.get(b)) {
            (Some(a), Some(b)) => a.visible && b.visible && a.overlaps(b),
            _ => false,
        }
    }
}

/// Maps the script's key names to terminal keys.
pub fn key_code(name: &str) -> Option<Key> {
    let key = match name.to_lowercase().as_str() {
        "arriba" => Key::Up,
        "abajo" => Key::Down,
        "izquierda" => Key::Left,
        "derecha" => Key::Right,
        "espacio" => Key::Char(' '),
        "enter" => Key::Char('\n'),
        "escape" => Key::Esc,
        "a" => Key::Char('a'),
        "s" => Key::Char('s'),
        "d" => Key::Char('d'),
        "w" => Key::Char('w'),
        _ => return None,
    };
    Some(key)
}

pub trait Windows {
    fn create(&mut self, title: &str, color: &str, game: bool);
    /// Appends a line to a text (non-game) window.
    fn write(&mut self, title: &str, text: &str) -> Result<(), HostError>;
    fn game(&self, title: &str) -> Option<&Window>;
    fn game_mut(&mut self, title: &str) -> Option<&mut Window>;
    /// Whether `name` is held in any game window.
    fn key_pressed(&self, name: &str) -> bool;
}

/// Keeps window state in memory. With `echo`, text written to a window is
/// also printed as `[title] text`.
#[derive(Debug, Default)]
pub struct Headless {
    windows: Vec<Window>,
    echo: bool,
}

impl Headless {
    pub fn new(echo: bool) -> Headless {
        Headless {
            windows: Vec::new(),
            echo,
        }
    }

    #[cfg(test)]
    pub fn window(&self, title: &str) -> Option<&Window> {
        self.windows.iter().find(|w| w.title == title)
    }

    /// Feeds a key event to every game window.
    #[cfg(test)]
    pub fn set_key(&mut self, name: &str, down: bool) {
        let Some(key) = key_code(name) else { return };
        for window in self.windows.iter_mut().filter(|w| w.game) {
            window.keys.retain(|k| *k != key);
            if down {
                window.keys.push(key);
            }
        }
    }
}

impl Windows for Headless {
    fn create(&mut self, title: &str, color: &str, game: bool) {
        self.windows.push(Window::new(title, color, game));
    }

    fn write(&mut self, title: &str, text: &str) -> Result<(), HostError> {
        let window = self
            .windows
            .iter_mut()
            .find(|w| w.title == title && !w.game)
            .ok_or_else(|| HostError::WindowNotFound(title.to_string()))?;
        window.content.push(text.to_string());
        if self.echo {
            println!("[{}] {}", title, text);
        }
        Ok(())
    }

    fn game(&self, title: &str) -> Option<&Window> {
        self.windows.iter().find(|w| w.title == title && w.game)
    }

    fn game_mut(&mut self, title: &str) -> Option<&mut Window> {
        self.windows.iter_mut().find(|w| w.title == title && w.game)
    }

    fn key_pressed(&self, name: &str) -> bool {
        match key_code(name) {
            Some(key) => self.windows.iter().any(|w| w.game && w.keys.contains(&key)),
            None => false,
        }
    }
}
