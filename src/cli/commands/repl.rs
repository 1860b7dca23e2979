use std::io::{self, BufRead, Write};

use anyhow::Result;

use crate::cli::commands::open_session;
use scenario::{SessionConfig, execute};

pub(crate) fn cmd_repl(config: &SessionConfig) -> Result<()> {
    let mut world = open_session(config)?;
    let macros = world.macros().clone();
    let stdin = io::stdin();
    let mut input = String::new();

    println!("Scenario REPL. Enter scenario lines; `quit` or `exit` to leave.");
    loop {
        print!("{}> ", world.network());
        io::stdout().flush().ok();
        input.clear();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let line = input.trim();
        match line {
            "" => continue,
            "quit" | "exit" => break,
            _ => world = execute(&world, line, &macros),
        }
    }
    Ok(())
}
