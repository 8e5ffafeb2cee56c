use std::collections::HashMap;

use crate::parser::unquote;

/// A value bound into exactly one namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum Variable {
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

/// The four independent namespaces. A name may be bound in several at once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespaces {
    pub ints: HashMap<String, i64>,
    pub floats: HashMap<String, f64>,
    pub texts: HashMap<String, String>,
    pub lists: HashMap<String, Vec<String>>,
}

impl Namespaces {
    pub fn set(&mut self, name: &str, value: Variable) {
        let name = name.to_string();
        match value {
            Variable::Int(n) => {
                self.ints.insert(name, n);
            }
            Variable::Float(f) => {
                self.floats.insert(name, f);
            }
            Variable::Text(s) => {
                self.texts.insert(name, s);
            }
            Variable::List(items) => {
                self.lists.insert(name, items);
            }
        }
    }
}

/// Joins list items for display, dropping one layer of quotes from each.
pub fn display_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| unquote(item))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Procedure {
    pub name: String,
    pub params: Vec<String>,
    /// Verbatim source lines, evaluated only when cooked.
    pub body: Vec<String>,
    pub line: usize,
}

/// Per-interpreter state: the namespaces plus the recipe table.
#[derive(Debug, Default)]
pub struct Context {
    pub vars: Namespaces,
    procedures: HashMap<String, Procedure>,
}

impl Context {
    pub fn new() -> Context {
        Context::default()
    }

    pub fn define(&mut self, procedure: Procedure) {
        self.procedures.insert(procedure.name.clone(), procedure);
    }

    pub fn procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures.get(name)
    }

    /// Copy of every namespace, taken on recipe entry.
    pub fn snapshot(&self) -> Namespaces {
        self.vars.clone()
    }

    /// Puts a snapshot back, discarding anything bound since it was taken.
    pub fn restore(&mut self, saved: Namespaces) {
        self.vars = saved;
    }
}
