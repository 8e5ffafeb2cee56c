use anyhow::{bail, Result};

use crate::book::Book;
use crate::env::Settings;
use crate::host::console::{Console, Terminal};
use crate::host::recipes::{Recipes, Shelf};
use crate::host::window::{Headless, Windows};
use crate::log::Level;
use crate::parser::eval::{parse_int, Evaluator};
use crate::parser::tokens::{
    find_closer, header_condition, is_branch, is_opener, is_valid_name, Tokens, BRANCH, FALLBACK,
};
use crate::parser::vars::{Context, Procedure, Variable};
use crate::parser::{
    call_args, is_bracketed, is_quoted, parse_list, split_args, strip_comment, trim, unquote,
};

/// Nested `cocinar` calls allowed before the innermost one is refused.
pub const MAX_DEPTH: usize = 256;

/// Splits `name(args)` (optionally followed by `:`) into the name and the raw argument text.
fn signature(text: &str) -> Option<(&str, &str)> {
    let open = text.find('(')?;
    let close = text.rfind(')')?;
    if close < open {
        return None;
    }
    Some((trim(&text[..open]), &text[open + 1..close]))
}

/// Runs Pancracio lines against one set of variables, recipes and an open book.
pub struct Interpreter {
    pub(super) ctx: Context,
    pub(super) book: Book,
    pub(super) console: Box<dyn Console>,
    pub(super) windows: Box<dyn Windows>,
    pub(super) recipes: Box<dyn Recipes>,
    pub(super) settings: Settings,
    depth: usize,
}

impl Interpreter {
    pub fn new(settings: Settings) -> Interpreter {
        let recipes = Box::new(Shelf::new(&settings.recipes_dir));
        Interpreter::with_hosts(
            settings,
            Box::new(Terminal::new()),
            Box::new(Headless::new(true)),
            recipes,
        )
    }

    pub fn with_hosts(
        settings: Settings,
        console: Box<dyn Console>,
        windows: Box<dyn Windows>,
        recipes: Box<dyn Recipes>,
    ) -> Interpreter {
        Interpreter {
            ctx: Context::new(),
            book: Book::new(),
            console,
            windows,
            recipes,
            settings,
            depth: 0,
        }
    }

    #[cfg(test)]
    pub fn vars(&self) -> &crate::parser::vars::Namespaces {
        &self.ctx.vars
    }

    #[cfg(test)]
    pub fn windows(&self) -> &dyn Windows {
        self.windows.as_ref()
    }

    /// Executes every line in order. Blocks move the cursor past their `listo`.
    pub fn run(&mut self, lines: &[String]) {
        let mut cursor = 0;
        while cursor < lines.len() {
            self.exec_line(lines, &mut cursor);
            cursor += 1;
        }
    }

    /// Executes the line at `cursor`. A failure is reported with its line number
    /// and never reaches the caller.
    pub fn exec_line(&mut self, lines: &[String], cursor: &mut usize) {
        let start = *cursor;
        if let Err(e) = self.dispatch(lines, cursor) {
            self.report(Level::Error, &format!("Error en la linea {}: {:#}", start + 1, e));
        }
    }

    /// Flushes the open book, if it has a file.
    pub fn finish(&mut self) {
        match self.book.close() {
            Ok(Some((path, count))) => self.console.print(&format!(
                "Archivo guardado exitosamente: {} ({} entradas válidas)",
                path.display(),
                count
            )),
            Ok(None) => {}
            Err(e) => self.report(Level::Error, &e.to_string()),
        }
    }

    pub(super) fn eval(&mut self) -> Evaluator<'_> {
        Evaluator::new(&self.ctx.vars, self.windows.as_ref(), self.console.as_mut())
    }

    pub(super) fn report(&mut self, level: Level, message: &str) {
        self.console.report(level, message);
    }

    fn dispatch(&mut self, lines: &[String], cursor: &mut usize) -> Result<()> {
        let line = strip_comment(&lines[*cursor]);
        if line.is_empty() {
            return Ok(());
        }
        let (token, rest) = Tokens::detect(line);
        match token {
            Tokens::Print => {
                let text = self.eval().text(rest);
                self.console.print(&text);
            }
            Tokens::Declare => self.declare(rest)?,
            Tokens::If => self.conditional(lines, cursor),
            Tokens::Recipe => self.define(lines, cursor),
            Tokens::Cook => self.cook(rest)?,
            Tokens::Counter => self.counter(rest),
            Tokens::WindowWrite => self.window_write(rest),
            Tokens::Book => self.book_statement(rest),
            Tokens::Import => self.import(rest),
            Tokens::Discord => self.discord(rest),
            Tokens::Game => self.game(rest),
            Tokens::Object => self.object(rest),
            Tokens::Move => self.move_object(rest),
            Tokens::Place => self.place(rest),
            Tokens::Hide => self.hide(rest),
            Tokens::Structural => {}
            Tokens::Unknown => {
                self.report(Level::Error, &format!("Linea no reconocida: {}", line))
            }
        }
        Ok(())
    }

    fn declare(&mut self, rest: &str) -> Result<()> {
        let Some((name, expr)) = rest.split_once(" = ") else {
            self.report(Level::Error, "Sintaxis incorrecta en declaracion de ingrediente");
            return Ok(());
        };
        let name = trim(name);
        if !is_valid_name(name) {
            self.report(
                Level::Error,
                &format!("'{}' no es un nombre de variable valido", name),
            );
            return Ok(());
        }
        let value = self.classify(trim(expr))?;
        self.ctx.vars.set(name, value);
        Ok(())
    }

    /// Evaluates a right-hand side into the namespace its shape suggests.
    pub(super) fn classify(&mut self, expr: &str) -> Result<Variable> {
        let expr = trim(expr);
        if let Some(message) = call_args(expr, "pedir_numero") {
            return Ok(Variable::Int(self.ask_number(message)?));
        }
        if let Some(message) = call_args(expr, "pedir_nombre") {
            return Ok(Variable::Text(self.ask_text(message)?));
        }
        if is_bracketed(expr) {
            return Ok(Variable::List(parse_list(expr)));
        }
        if let Some(items) = self.ctx.vars.lists.get(expr) {
            return Ok(Variable::List(items.clone()));
        }
        if is_quoted(expr) || self.ctx.vars.texts.contains_key(expr) {
            return Ok(Variable::Text(self.eval().text(expr)));
        }
        let floating = expr.contains('.') || self.ctx.vars.floats.contains_key(expr);
        let mut eval = self.eval();
        let value = if floating {
            eval.try_float(expr).map(Variable::Float)
        } else {
            eval.try_int(expr).map(Variable::Int)
        };
        Ok(value.unwrap_or_else(|| Variable::Text(eval.text(expr))))
    }

    fn prompt_message(&mut self, message: &str, default: &str) -> String {
        let message = trim(message);
        if message.is_empty() {
            default.to_string()
        } else {
            self.eval().text(message)
        }
    }

    fn ask_number(&mut self, message: &str) -> Result<i64> {
        let mut prompt = self.prompt_message(message, "Ingrese un numero: ");
        loop {
            let Some(answer) = self.console.prompt(&prompt)? else {
                bail!("la entrada se cerro mientras se esperaba un numero");
            };
            if let Some(n) = parse_int(&answer) {
                return Ok(n);
            }
            prompt = "Error: Ingrese un numero valido: ".to_string();
        }
    }

    fn ask_text(&mut self, message: &str) -> Result<String> {
        let prompt = self.prompt_message(message, "Ingrese un texto: ");
        match self.console.prompt(&prompt)? {
            Some(answer) => Ok(answer),
            None => bail!("la entrada se cerro mientras se esperaba un texto"),
        }
    }

    /// `libro "existe", key` asks the book directly; anything else goes to the evaluator.
    fn test(&mut self, cond: &str) -> bool {
        if let Some(args) = cond.strip_prefix("libro ") {
            let args = split_args(args);
            if args.first().map(|a| unquote(a)) == Some("existe") {
                let key = match args.get(1) {
                    Some(key) => self.eval().text(key),
                    None => String::new(),
                };
                return self.book.exists(&key);
            }
        }
        self.eval().condition(cond)
    }

    /// Runs from `from` up to the next top-level branch marker or `closer`.
    fn run_branch(&mut self, lines: &[String], from: usize, closer: usize) {
        let mut i = from;
        while i < closer {
            if is_branch(strip_comment(&lines[i])) {
                break;
            }
            self.exec_line(lines, &mut i);
            i += 1;
        }
    }

    fn conditional(&mut self, lines: &[String], cursor: &mut usize) {
        let start = *cursor;
        let Some(closer) = find_closer(lines, start) else {
            self.report(
                Level::Error,
                "No se encontro 'listo' para cerrar el condicional",
            );
            *cursor = lines.len() - 1;
            return;
        };
        *cursor = closer;

        let mut taken = match header_condition(strip_comment(&lines[start]), "probar ") {
            Some(cond) => self.test(cond),
            None => {
                self.report(Level::Error, "Falta ':' al final de la condicion");
                false
            }
        };
        if taken {
            self.run_branch(lines, start + 1, closer);
            return;
        }

        let mut i = start + 1;
        while !taken && i < closer {
            let line = strip_comment(&lines[i]);
            if is_opener(line) {
                // branches of a nested block are not ours
                i = find_closer(lines, i).unwrap_or(closer) + 1;
                continue;
            }
            if let Some(cond) = header_condition(line, BRANCH) {
                taken = self.test(cond);
            } else if line == FALLBACK {
                taken = true;
            }
            if taken {
                self.run_branch(lines, i + 1, closer);
            }
            i += 1;
        }
    }

    fn define(&mut self, lines: &[String], cursor: &mut usize) {
        let start = *cursor;
        let Some(closer) = find_closer(lines, start) else {
            self.report(Level::Error, "No se encontro 'listo' para cerrar la receta");
            *cursor = lines.len() - 1;
            return;
        };
        *cursor = closer;

        let header = strip_comment(&lines[start]);
        let header = header.strip_prefix("receta ").unwrap_or(header);
        let Some((name, params)) = signature(header) else {
            self.report(Level::Error, "Sintaxis incorrecta en receta");
            return;
        };
        if !is_valid_name(name) {
            self.report(Level::Error, &format!("Nombre de receta invalido: {}", name));
            return;
        }
        debug!("receta '{}' definida en la linea {}", name, start + 1);
        self.ctx.define(Procedure {
            name: name.to_string(),
            params: split_args(params).into_iter().map(String::from).collect(),
            body: lines[start + 1..closer].to_vec(),
            line: start,
        });
    }

    fn cook(&mut self, call: &str) -> Result<()> {
        let Some((name, args)) = signature(call) else {
            self.report(Level::Error, "Sintaxis incorrecta en cocinar");
            return Ok(());
        };
        let Some(procedure) = self.ctx.procedure(name).cloned() else {
            self.report(Level::Error, &format!("Receta no encontrada: {}", name));
            return Ok(());
        };
        if self.depth >= MAX_DEPTH {
            bail!(
                "demasiada recursion en la receta '{}' (limite {})",
                name,
                MAX_DEPTH
            );
        }

        // surplus arguments are never evaluated
        let mut values = Vec::new();
        for (_, arg) in procedure.params.iter().zip(split_args(args)) {
            values.push(self.classify(arg)?);
        }

        debug!(
            "cocinando '{}' (definida en la linea {}, nivel {})",
            name,
            procedure.line + 1,
            self.depth + 1
        );
        let saved = self.ctx.snapshot();
        for (param, value) in procedure.params.iter().zip(values) {
            self.ctx.vars.set(param, value);
        }
        self.depth += 1;
        self.run(&procedure.body);
        self.depth -= 1;
        self.ctx.restore(saved);
        Ok(())
    }
}
