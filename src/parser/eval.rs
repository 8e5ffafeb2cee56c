use rand::Rng;

use crate::host::console::Console;
use crate::host::window::Windows;
use crate::log::Level;
use crate::parser::vars::{display_list, Namespaces};
use crate::parser::{call_args, find_top_level, is_quoted, split_args, split_parts, trim, unquote};

const INT_OPS: &[&str] = &[" + ", " - ", " * ", " / ", " % "];
const FLOAT_OPS: &[&str] = &[" + ", " - ", " * ", " / "];
const COMPARATORS: &[&str] = &[" == ", " != ", " <= ", " >= ", " < ", " > "];
const EPSILON: f64 = 0.0001;

pub fn parse_int(s: &str) -> Option<i64> {
    trim(s).parse().ok()
}

/// Plain decimal or exponent notation only; `inf`/`nan` are text.
pub fn parse_float(s: &str) -> Option<f64> {
    let s = trim(s);
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit() || "+-.eE".contains(c)) {
        return None;
    }
    s.parse().ok()
}

/// At most two fractional digits, no trailing zeros, no dangling point.
pub fn format_float(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        return (v as i64).to_string();
    }
    let fixed = format!("{:.2}", v);
    match fixed.trim_end_matches('0').trim_end_matches('.') {
        "" | "-" | "-0" => "0".to_string(),
        s => s.to_string(),
    }
}

/// Resolves expressions against one set of namespaces.
///
/// The `try_*` methods return `None` when the text is not a value of that
/// type; `int` and `float` report that and yield 0 instead.
pub struct Evaluator<'a> {
    vars: &'a Namespaces,
    windows: &'a dyn Windows,
    console: &'a mut dyn Console,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        vars: &'a Namespaces,
        windows: &'a dyn Windows,
        console: &'a mut dyn Console,
    ) -> Evaluator<'a> {
        Evaluator {
            vars,
            windows,
            console,
        }
    }

    /// Concatenation of every `" + "` / `", "` separated part.
    pub fn text(&mut self, expr: &str) -> String {
        split_parts(trim(expr))
            .into_iter()
            .map(|part| self.part(part))
            .collect()
    }

    fn part(&self, part: &str) -> String {
        if is_quoted(part) {
            return unquote(part).to_string();
        }
        if let Some(s) = self.vars.texts.get(part) {
            return s.clone();
        }
        if let Some(items) = self.vars.lists.get(part) {
            return display_list(items);
        }
        if let Some(n) = self.vars.ints.get(part) {
            return n.to_string();
        }
        if let Some(f) = self.vars.floats.get(part) {
            return format_float(*f);
        }
        if let Some(n) = parse_int(part) {
            return n.to_string();
        }
        if let Some(f) = parse_float(part) {
            return format_float(f);
        }
        part.to_string()
    }

    fn random(&mut self, args: &str) -> Option<i64> {
        let args = split_args(args);
        if args.len() != 2 {
            return None;
        }
        let mut min = self.try_int(args[0])?;
        let mut max = self.try_int(args[1])?;
        if min > max {
            std::mem::swap(&mut min, &mut max);
        }
        Some(rand::thread_rng().gen_range(min..=max))
    }

    pub fn try_int(&mut self, expr: &str) -> Option<i64> {
        let expr = trim(expr);
        if let Some(args) = call_args(expr, "aleatorio") {
            return self.random(args);
        }
        if let Some(n) = self.vars.ints.get(expr) {
            return Some(*n);
        }
        if let Some(f) = self.vars.floats.get(expr) {
            return Some(*f as i64);
        }
        if let Some(n) = parse_int(expr) {
            return Some(n);
        }
        let (pos, op) = find_top_level(expr, INT_OPS)?;
        let left = self.try_int(&expr[..pos])?;
        let right = self.try_int(&expr[pos + op.len()..])?;
        Some(match op {
            " + " => left.wrapping_add(right),
            " - " => left.wrapping_sub(right),
            " * " => left.wrapping_mul(right),
            " / " if right == 0 => {
                self.console.report(Level::Error, "División por cero");
                0
            }
            " / " => left.wrapping_div(right),
            _ if right == 0 => {
                self.console.report(Level::Error, "Módulo por cero");
                0
            }
            _ => left.wrapping_rem(right),
        })
    }

    pub fn int(&mut self, expr: &str) -> i64 {
        match self.try_int(expr) {
            Some(n) => n,
            None => {
                self.unresolved(expr, "entero");
                0
            }
        }
    }

    pub fn try_float(&mut self, expr: &str) -> Option<f64> {
        let expr = trim(expr);
        if call_args(expr, "aleatorio").is_some() {
            return self.try_int(expr).map(|n| n as f64);
        }
        if let Some(f) = self.vars.floats.get(expr) {
            return Some(*f);
        }
        if let Some(n) = self.vars.ints.get(expr) {
            return Some(*n as f64);
        }
        if let Some(f) = parse_float(expr) {
            return Some(f);
        }
        let (pos, op) = find_top_level(expr, FLOAT_OPS)?;
        let left = self.try_float(&expr[..pos])?;
        let right = self.try_float(&expr[pos + op.len()..])?;
        Some(match op {
            " + " => left + right,
            " - " => left - right,
            " * " => left * right,
            _ if right == 0.0 => {
                self.console.report(Level::Error, "División por cero");
                0.0
            }
            _ => left / right,
        })
    }

    pub fn float(&mut self, expr: &str) -> f64 {
        match self.try_float(expr) {
            Some(f) => f,
            None => {
                self.unresolved(expr, "decimal");
                0.0
            }
        }
    }

    /// `tecla("k")`, `colision(ventana, a, b)` or `left <cmp> right`.
    pub fn condition(&mut self, cond: &str) -> bool {
        let cond = trim(cond);
        if let Some(arg) = call_args(cond, "tecla") {
            let key = self.text(arg);
            return self.windows.key_pressed(&key);
        }
        if let Some(args) = call_args(cond, "colision") {
            let args: Vec<String> = split_args(args).into_iter().map(|a| self.text(a)).collect();
            if let [window, a, b] = args.as_slice() {
                return self
                    .windows
                    .game(window)
                    .map_or(false, |win| win.collides(a, b));
            }
            self.console
                .report(Level::Error, "colision necesita ventana, objeto y objeto");
            return false;
        }
        let Some((pos, op)) = find_top_level(cond, COMPARATORS) else {
            self.console
                .report(Level::Warn, &format!("Condicion sin comparador: {}", cond));
            return false;
        };
        let left = self.float(&cond[..pos]);
        let right = self.float(&cond[pos + op.len()..]);
        match op {
            " == " => (left - right).abs() < EPSILON,
            " != " => (left - right).abs() >= EPSILON,
            " <= " => left <= right,
            " >= " => left >= right,
            " < " => left < right,
            _ => left > right,
        }
    }

    fn unresolved(&mut self, expr: &str, kind: &str) {
        self.console.report(
            Level::Warn,
            &format!("No se pudo evaluar '{}' como {}", trim(expr), kind),
        );
    }
}
