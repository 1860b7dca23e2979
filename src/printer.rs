//! Output sinks for values, actions and errors.

use std::cell::RefCell;
use std::fmt::Display;

use tracing::info;

use crate::value::Value;

pub trait Printer {
    fn print_line(&self, line: &str);
    fn print_value(&self, value: &Value);
    fn print_action(&self, message: &str);
    fn print_error(&self, err: &dyn Display);
}

/// Writes to stdout/stderr. Actions are echoed only when verbose.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsolePrinter {
    verbose: bool,
}

impl ConsolePrinter {
    pub fn new(verbose: bool) -> Self {
        ConsolePrinter { verbose }
    }
}

impl Printer for ConsolePrinter {
    fn print_line(&self, line: &str) {
        println!("{line}");
    }

    fn print_value(&self, value: &Value) {
        println!("{}", value.show());
    }

    fn print_action(&self, message: &str) {
        info!(action = message, "action");
        if self.verbose {
            println!("Action: {message}");
        }
    }

    fn print_error(&self, err: &dyn Display) {
        eprintln!("error: {err}");
    }
}

/// Collects output in memory.
#[derive(Debug, Default)]
pub struct BufferPrinter {
    lines: RefCell<Vec<String>>,
}

impl BufferPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.borrow().iter().any(|line| line.contains(needle))
    }

    fn push(&self, line: String) {
        self.lines.borrow_mut().push(line);
    }
}

impl Printer for BufferPrinter {
    fn print_line(&self, line: &str) {
        self.push(line.to_string());
    }

    fn print_value(&self, value: &Value) {
        self.push(value.show());
    }

    fn print_action(&self, message: &str) {
        self.push(format!("Action: {message}"));
    }

    fn print_error(&self, err: &dyn Display) {
        self.push(format!("error: {err}"));
    }
}
