//! Shell command definitions
//!
//! Parses one input line into a command.

use crate::error::{KvError, Result};

/// A parsed shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Get a value by key
    Get { key: Vec<u8> },

    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Drop a key from the index (not logged)
    Delete { key: Vec<u8> },

    /// List pairs in key order, optionally from `start` (inclusive) to `end` (exclusive)
    Scan {
        start: Option<Vec<u8>>,
        end: Option<Vec<u8>>,
    },

    /// Print the command list
    Help,

    /// Leave the shell
    Quit,
}

pub const USAGE: &str = "Commands: put <key> <value>, get <key>, del <key>, scan [start] [end], help, quit";

impl Command {
    /// Parse a line; `Ok(None)` for a blank line
    ///
    /// The value of `put` is the rest of the line after the key, so it may
    /// contain spaces.
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let (name, tail) = split_word(line);
        if name.is_empty() {
            return Ok(None);
        }
        let (first, rest) = split_word(tail);
        let first = Some(first).filter(|s| !s.is_empty());
        let rest = Some(rest).filter(|s| !s.is_empty());

        let command = match name.to_ascii_lowercase().as_str() {
            "quit" | "q" | "exit" => Command::Quit,
            "help" | "?" => Command::Help,
            "get" => match first {
                Some(key) if rest.is_none() => Command::Get { key: key.into() },
                _ => return Err(usage("get <key>")),
            },
            "put" | "set" => match (first, rest) {
                (Some(key), Some(value)) => Command::Put {
                    key: key.into(),
                    value: value.into(),
                },
                _ => return Err(usage("put <key> <value>")),
            },
            "del" | "delete" => match first {
                Some(key) if rest.is_none() => Command::Delete { key: key.into() },
                _ => return Err(usage("del <key>")),
            },
            "scan" => {
                let mut bounds = rest.unwrap_or_default().split_whitespace();
                let end = bounds.next().map(|s| s.as_bytes().to_vec());
                if bounds.next().is_some() {
                    return Err(usage("scan [start] [end]"));
                }
                Command::Scan {
                    start: first.map(|s| s.as_bytes().to_vec()),
                    end,
                }
            }
            other => return Err(KvError::Shell(format!("Invalid command: {}", other))),
        };

        Ok(Some(command))
    }
}

/// Split off the first whitespace-delimited word, trimming both parts
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (s, ""),
    }
}

fn usage(form: &str) -> KvError {
    KvError::Shell(format!("Usage: {}", form))
}
