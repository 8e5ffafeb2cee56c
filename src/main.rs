#[macro_use]
mod log;
mod book;
mod env;
mod host;
mod parser;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::process;
use std::thread;

use anyhow::{anyhow, bail, Context, Result};
use clap::{arg, Command};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::env::Settings;
use crate::log::Level;
use crate::parser::exec::Interpreter;
use crate::parser::tokens::{Tokens, CLOSER};
use crate::parser::{strip_comment, trim};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

// recipes may recurse deeply; the default main stack is too small in debug builds
const STACK_SIZE: usize = 64 * 1024 * 1024;

fn load_and_run<P: AsRef<Path>>(path: P, interp: &mut Interpreter) -> Result<()> {
    let path = path.as_ref();
    if path.extension().and_then(|ext| ext.to_str()) != Some("pan") {
        bail!("El archivo debe tener extension .pan: {}", path.display());
    }
    let src = File::open(path)
        .with_context(|| format!("No se pudo abrir el archivo {}", path.display()))?;
    parser::exec(&mut BufReader::new(src), interp)
}

/// Blocks opened but not yet closed by `lines`. An import never holds the
/// prompt open.
fn open_blocks(lines: &[String]) -> i32 {
    lines.iter().fold(0, |depth, line| {
        let line = strip_comment(line);
        if matches!(Tokens::detect(line).0, Tokens::If | Tokens::Recipe) {
            depth + 1
        } else if line == CLOSER {
            depth - 1
        } else {
            depth
        }
    })
}

/// Reads lines until every block is closed, then runs them together.
fn start_shell(interp: &mut Interpreter) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut pending: Vec<String> = Vec::new();
    loop {
        let prompt = if pending.is_empty() { "pan> " } else { "...  " };
        match editor.readline(prompt) {
            Ok(line) => {
                if pending.is_empty() && trim(&line) == "salir" {
                    break;
                }
                let _ = editor.add_history_entry(line.as_str());
                pending.push(line);
                if open_blocks(&pending) > 0 {
                    continue;
                }
                interp.run(&pending);
                pending.clear();
            }
            Err(ReadlineError::Interrupted) => pending.clear(),
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn run() -> Result<()> {
    let matches = Command::new("pan")
        .version(VERSION)
        .author(AUTHORS)
        .about(DESCRIPTION)
        .arg(arg!([file] "Script .pan to execute"))
        .arg(arg!(-c --command <COMMAND> "Line to execute").required(false))
        .arg(arg!(--log <LEVEL> "Diagnostic level: error, aviso, info, debug, traza").required(false))
        .get_matches();

    let mut settings = Settings::from_env();
    if let Some(level) = matches.value_of("log") {
        match Level::from_str(level) {
            Ok(level) => settings.log_level = level,
            Err(e) => warn!("{}", e),
        }
    }
    log::set_level(settings.log_level);
    debug!(
        "nivel {}, dependencias en {}",
        log::level().as_str(),
        settings.recipes_dir.display()
    );

    let mut interp = Interpreter::new(settings);
    if let Some(command) = matches.value_of("command") {
        parser::exec(&mut command.as_bytes(), &mut interp)?;
    } else if let Some(file) = matches.value_of("file") {
        load_and_run(file, &mut interp)?;
    } else {
        start_shell(&mut interp)?;
    }
    interp.finish();
    Ok(())
}

fn main() {
    let worker = thread::Builder::new().stack_size(STACK_SIZE).spawn(run);
    let result = match worker {
        Ok(handle) => handle
            .join()
            .unwrap_or_else(|_| Err(anyhow!("el interprete se detuvo inesperadamente"))),
        Err(e) => Err(e.into()),
    };
    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use anyhow::{Context, Result};

    use super::{load_and_run, open_blocks};
    use crate::env::Settings;
    use crate::host::console::Recorder;
    use crate::host::recipes::Shelf;
    use crate::host::window::Headless;
    use crate::parser::exec::Interpreter;

    fn interpreter(console: &Recorder) -> Interpreter {
        Interpreter::with_hosts(
            Settings::default(),
            Box::new(console.clone()),
            Box::new(Headless::new(false)),
            Box::new(Shelf::new("test/recetas")),
        )
    }

    /// Runs `test/<name>.pan` and compares its output with `test/<name>.out`.
    fn check(name: &str) -> Result<()> {
        let console = Recorder::new();
        let mut interp = interpreter(&console);
        load_and_run(format!("test/{}.pan", name), &mut interp)?;
        let expected = fs::read_to_string(format!("test/{}.out", name))
            .with_context(|| format!("missing golden file for {}", name))?;
        let expected: Vec<&str> = expected.lines().collect();
        assert_eq!(console.output(), expected, "output of {}.pan", name);
        assert!(console.errors().is_empty(), "{:?}", console.errors());
        Ok(())
    }

    #[test]
    fn hello() -> Result<()> {
        check("hola")
    }

    #[test]
    fn arithmetic() -> Result<()> {
        check("aritmetica")
    }

    #[test]
    fn conditionals() -> Result<()> {
        check("condicionales")
    }

    #[test]
    fn recipes() -> Result<()> {
        check("recetas")
    }

    #[test]
    fn lists() -> Result<()> {
        check("listas")
    }

    #[test]
    fn dependency() -> Result<()> {
        check("dependencia")
    }

    #[test]
    fn requires_pan_extension() {
        let console = Recorder::new();
        let mut interp = interpreter(&console);
        assert!(load_and_run("test/hola.out", &mut interp).is_err());
        assert!(load_and_run("test/no_existe.pan", &mut interp).is_err());
    }

    #[test]
    fn shell_waits_for_closers() {
        let mut lines = vec!["probar 1 == 1:".to_string(), "receta f():".to_string()];
        assert_eq!(open_blocks(&lines), 2);
        lines.push("listo".to_string());
        lines.push("listo # fin".to_string());
        assert_eq!(open_blocks(&lines), 0);
        assert_eq!(open_blocks(&["receta \"dep\"".to_string()]), 0);
    }
}
