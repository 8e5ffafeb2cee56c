use crate::parser::strip_comment;

pub const KEYWORDS: &[&str] = &[
    "hornear", "ingrediente", "probar", "alternativa", "sino", "listo",
    "pedir_numero", "pedir_nombre", "receta", "cocinar", "mostrador",
    "entero", "texto", "decimal", "lista", "escribir", "boton", "entrada", "libro",
    "discord",
    "juego", "objeto", "mover", "dibujar", "colision", "tecla", "temporizador",
    "aleatorio", "posicionar", "objeto_x", "objeto_y", "ocultar",
];

pub const CLOSER: &str = "listo";
pub const FALLBACK: &str = "alternativa:";
pub const BRANCH: &str = "sino ";

/// What a clean (comment-free, trimmed) line does, judged by its leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tokens {
    Print,
    Declare,
    If,
    Recipe,
    Cook,
    Counter,
    WindowWrite,
    Book,
    Import,
    Discord,
    Game,
    Object,
    Move,
    Place,
    Hide,
    /// `listo`, `alternativa:` and `sino ...` outside of the block that owns them.
    Structural,
    Unknown,
}

// Order matters: `receta ` is split into Recipe/Import after matching.
const PREFIXES: &[(&str, Tokens)] = &[
    ("hornear ", Tokens::Print),
    ("ingrediente ", Tokens::Declare),
    ("probar ", Tokens::If),
    ("receta ", Tokens::Recipe),
    ("cocinar ", Tokens::Cook),
    ("mostrador ", Tokens::Counter),
    ("escribir ", Tokens::WindowWrite),
    ("libro ", Tokens::Book),
    ("discord ", Tokens::Discord),
    ("juego ", Tokens::Game),
    ("objeto ", Tokens::Object),
    ("mover ", Tokens::Move),
    ("posicionar ", Tokens::Place),
    ("ocultar ", Tokens::Hide),
];

impl Tokens {
    /// Classifies `line` and returns the text after the keyword.
    pub fn detect(line: &str) -> (Tokens, &str) {
        for (prefix, token) in PREFIXES {
            if let Some(rest) = line.strip_prefix(prefix) {
                let token = match token {
                    Tokens::Recipe if !line.contains('(') => Tokens::Import,
                    t => *t,
                };
                return (token, rest);
            }
        }
        if line == CLOSER || line == FALLBACK || line.starts_with(BRANCH) {
            (Tokens::Structural, line)
        } else {
            (Tokens::Unknown, line)
        }
    }
}

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Identifier rule for variables, parameters and recipe names.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    !is_keyword(name) && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Lines that raise the block depth. Every `receta ` line counts, imports
/// included, when matching a `listo`.
pub fn is_opener(line: &str) -> bool {
    line.starts_with("probar ") || line.starts_with("receta ")
}

pub fn is_branch(line: &str) -> bool {
    line.starts_with(BRANCH) || line == FALLBACK
}

/// Index of the `listo` closing the block opened at `start`.
pub fn find_closer(lines: &[String], start: usize) -> Option<usize> {
    let mut depth = 1;
    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        let line = strip_comment(line);
        if is_opener(line) {
            depth += 1;
        } else if line == CLOSER {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Condition text of `probar cond:` / `sino cond:`, or None without the trailing colon.
pub fn header_condition<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    line.strip_prefix(keyword)?.strip_suffix(':')
}

#[cfg(test)]
mod test {
    use super::*;

    fn lines(src: &[&str]) -> Vec<String> {
        src.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn detects_statements() {
        assert_eq!(Tokens::detect("hornear \"hola\""), (Tokens::Print, "\"hola\""));
        assert_eq!(Tokens::detect("receta saludar(nombre):").0, Tokens::Recipe);
        assert_eq!(Tokens::detect("receta \"la_receta_de_discord\""), (Tokens::Import, "\"la_receta_de_discord\""));
        assert_eq!(Tokens::detect("sino x > 1:").0, Tokens::Structural);
        assert_eq!(Tokens::detect("listo").0, Tokens::Structural);
        assert_eq!(Tokens::detect("hornearx").0, Tokens::Unknown);
        assert_eq!(Tokens::detect("hornear").0, Tokens::Unknown);
    }

    #[test]
    fn validates_names() {
        assert!(is_valid_name("edad"));
        assert!(is_valid_name("_x1"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("1x"));
        assert!(!is_valid_name("mi nombre"));
        assert!(!is_valid_name("hornear"));
        assert!(!is_valid_name("aleatorio"));
    }

    #[test]
    fn closer_skips_nested_recipe() {
        let src = lines(&[
            "probar x > 1:",
            "  receta f(a):",
            "    hornear a",
            "  listo",
            "  hornear \"fin\"",
            "listo",
        ]);
        assert_eq!(find_closer(&src, 0), Some(5));
        assert_eq!(find_closer(&src, 1), Some(3));
    }

    #[test]
    fn import_inside_block_needs_its_own_closer() {
        let src = lines(&[
            "probar x > 1:",
            "  receta \"algo\"",
            "listo # fin",
        ]);
        assert_eq!(find_closer(&src, 0), None);
        let mut closed = src.clone();
        closed.push("listo".to_string());
        assert_eq!(find_closer(&closed, 0), Some(3));
        assert_eq!(find_closer(&lines(&["probar x > 1:", "hornear x"]), 0), None);
    }

    #[test]
    fn extracts_conditions() {
        assert_eq!(header_condition("probar x > 1:", "probar "), Some("x > 1"));
        assert_eq!(header_condition("sino x < 0:", BRANCH), Some("x < 0"));
        assert_eq!(header_condition("probar x > 1", "probar "), None);
    }
}
