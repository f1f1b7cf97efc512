//! Shell Module
//!
//! A line-oriented command shell over a [`LogEngine`].
//!
//! ## Commands
//! - `put <key> <value>`: append and index
//! - `get <key>`: print the quoted value or `entry not found`
//! - `del <key>`: drop from the index (comes back after a restart)
//! - `scan [start] [end]`: ordered listing, btree index only
//! - `help`, `quit`

mod command;

use std::io::{BufRead, Write};
use std::ops::Bound;

use tracing::warn;

use crate::engine::LogEngine;
use crate::error::Result;
use crate::index::Index;

pub use command::{Command, USAGE};

/// Outcome of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Value(Vec<u8>),
    NotFound,
    Entries(Vec<(Vec<u8>, Vec<u8>)>),
    Message(String),
    Quit,
}

/// Run a single command against `engine`
pub fn execute<I: Index>(engine: &LogEngine<I>, command: Command) -> Result<Reply> {
    match command {
        Command::Get { key } => Ok(match engine.get(&key)? {
            Some(value) => Reply::Value(value),
            None => Reply::NotFound,
        }),
        Command::Put { key, value } => {
            engine.put(&key, &value)?;
            Ok(Reply::Ok)
        }
        Command::Delete { key } => {
            warn!("Delete is not logged; the key returns after a restart");
            engine.delete(&key)?;
            Ok(Reply::Ok)
        }
        Command::Scan { start, end } => {
            let start = start.as_deref().map_or(Bound::Unbounded, Bound::Included);
            let end = end.as_deref().map_or(Bound::Unbounded, Bound::Excluded);
            let entries = engine.scan(start, end)?.collect::<Result<Vec<_>>>()?;
            Ok(Reply::Entries(entries))
        }
        Command::Help => Ok(Reply::Message(USAGE.to_string())),
        Command::Quit => Ok(Reply::Quit),
    }
}

/// Interactive loop reading commands from `input` and writing to `output`
pub struct Shell<'a, I: Index, R, W> {
    engine: &'a LogEngine<I>,
    input: R,
    output: W,
    prompt: bool,
}

impl<'a, I: Index, R: BufRead, W: Write> Shell<'a, I, R, W> {
    pub fn new(engine: &'a LogEngine<I>, input: R, output: W) -> Self {
        Self {
            engine,
            input,
            output,
            prompt: true,
        }
    }

    /// Disable the banner and `> ` prompt (for piped input)
    pub fn quiet(mut self) -> Self {
        self.prompt = false;
        self
    }

    /// Read commands until `quit` or end of input
    ///
    /// Command failures are printed and the loop goes on; only I/O errors on
    /// the shell's own streams end it early.
    pub fn run(&mut self) -> Result<()> {
        if self.prompt {
            writeln!(self.output, "Key-Value Database REPL")?;
            writeln!(self.output, "{}", USAGE)?;
        }

        let mut line = String::new();
        loop {
            if self.prompt {
                write!(self.output, "> ")?;
                self.output.flush()?;
            }

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                break;
            }

            let reply = match Command::parse(&line) {
                Ok(Some(command)) => execute(self.engine, command),
                Ok(None) => continue,
                Err(e) => Err(e),
            };

            match reply {
                Ok(Reply::Quit) => break,
                Ok(reply) => self.print(&reply)?,
                Err(e) => writeln!(self.output, "Error: {}", e)?,
            }
        }

        self.output.flush()?;
        Ok(())
    }

    fn print(&mut self, reply: &Reply) -> Result<()> {
        match reply {
            Reply::Ok => writeln!(self.output, "OK")?,
            Reply::Value(value) => writeln!(self.output, "{}", quote(value))?,
            Reply::NotFound => writeln!(self.output, "entry not found")?,
            Reply::Entries(entries) => {
                for (key, value) in entries {
                    writeln!(self.output, "{} = {}", quote(key), quote(value))?;
                }
                writeln!(self.output, "({} entries)", entries.len())?;
            }
            Reply::Message(message) => writeln!(self.output, "{}", message)?,
            Reply::Quit => {}
        }
        Ok(())
    }
}

/// Double-quoted, escaped rendering of raw bytes
pub fn quote(bytes: &[u8]) -> String {
    format!("{:?}", String::from_utf8_lossy(bytes))
}
