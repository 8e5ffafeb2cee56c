use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::log::{self, Level};

/// Where script output goes, where interactive input comes from, and where
/// diagnostics are reported.
pub trait Console {
    fn print(&mut self, text: &str);
    /// Shows `message` and reads one line. `None` means the input is closed.
    fn prompt(&mut self, message: &str) -> Result<Option<String>>;
    fn report(&mut self, level: Level, message: &str);
}

/// stdout for output, rustyline for prompts, the logger for diagnostics.
#[derive(Default)]
pub struct Terminal {
    editor: Option<DefaultEditor>,
}

impl Terminal {
    pub fn new() -> Terminal {
        Terminal::default()
    }
}

impl Console for Terminal {
    fn print(&mut self, text: &str) {
        println!("{}", text);
    }

    fn prompt(&mut self, message: &str) -> Result<Option<String>> {
        if self.editor.is_none() {
            self.editor = Some(DefaultEditor::new()?);
        }
        let Some(editor) = self.editor.as_mut() else {
            return Ok(None);
        };
        match editor.readline(message) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn report(&mut self, level: Level, message: &str) {
        log::emit(level, format_args!("{}", message));
    }
}

#[cfg(test)]
pub use self::recorder::Recorder;

#[cfg(test)]
mod recorder {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use anyhow::Result;

    use super::Console;
    use crate::log::Level;

    #[derive(Default)]
    struct Tape {
        output: Vec<String>,
        prompts: Vec<String>,
        reports: Vec<(Level, String)>,
        input: VecDeque<String>,
    }

    /// In-memory console. Clones share one tape so a test can keep a handle
    /// after giving the console to an interpreter.
    #[derive(Clone, Default)]
    pub struct Recorder(Rc<RefCell<Tape>>);

    impl Recorder {
        pub fn new() -> Recorder {
            Recorder::default()
        }

        pub fn with_input(lines: &[&str]) -> Recorder {
            let recorder = Recorder::new();
            recorder.0.borrow_mut().input = lines.iter().map(|s| s.to_string()).collect();
            recorder
        }

        pub fn output(&self) -> Vec<String> {
            self.0.borrow().output.clone()
        }

        pub fn prompts(&self) -> Vec<String> {
            self.0.borrow().prompts.clone()
        }

        pub fn reports(&self) -> Vec<(Level, String)> {
            self.0.borrow().reports.clone()
        }

        pub fn errors(&self) -> Vec<String> {
            self.reports()
                .into_iter()
                .filter(|(level, _)| *level == Level::Error)
                .map(|(_, message)| message)
                .collect()
        }

        pub fn mentions(&self, needle: &str) -> bool {
            self.reports().iter().any(|(_, message)| message.contains(needle))
        }
    }

    impl Console for Recorder {
        fn print(&mut self, text: &str) {
            self.0.borrow_mut().output.push(text.to_string());
        }

        fn prompt(&mut self, message: &str) -> Result<Option<String>> {
            let mut tape = self.0.borrow_mut();
            tape.prompts.push(message.to_string());
            Ok(tape.input.pop_front())
        }

        fn report(&mut self, level: Level, message: &str) {
            self.0.borrow_mut().reports.push((level, message.to_string()));
        }
    }
}
