// Copyright 2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The client side of the UCI protocol, used to ask an external engine for moves.
//! See [here](http://wbec-ridderkerk.nl/html/UCIProtocol.html) for full documentation on the
//! protocol.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, info_span, trace};

use crate::notation;
use crate::player::MoveSuggester;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to read engine config {}: {source}", .path.display())]
    Config { path: PathBuf, source: io::Error },
    #[error("malformed engine config: {0}")]
    ConfigFormat(#[from] serde_json::Error),
    #[error("no engine named {0:?} in the config")]
    UnknownEngine(String),
    #[error("engine i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("engine closed its output")]
    UnexpectedEof,
    #[error("engine does not support option {0:?}")]
    UnknownOption(String),
    #[error("engine suggested an unreadable move: {0:?}")]
    InvalidBestMove(String),
    #[error("invalid position: {0}")]
    InvalidPosition(String),
    #[error("no legal moves in this position")]
    NoLegalMoves,
}

fn default_depth() -> u32 {
    10
}

/// How to launch and configure one engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_depth")]
    pub depth: u32,
    #[serde(default)]
    pub options: BTreeMap<String, serde_json::Value>,
}

impl EngineConfig {
    pub fn new(path: impl Into<PathBuf>) -> EngineConfig {
        EngineConfig {
            path: path.into(),
            args: Vec::new(),
            depth: default_depth(),
            options: BTreeMap::new(),
        }
    }
}

/// Reads the engine named `name` out of a JSON file mapping engine names to configs.
pub fn load_config(path: &Path, name: &str) -> Result<EngineConfig, EngineError> {
    let text = fs::read_to_string(path).map_err(|source| EngineError::Config {
        path: path.to_owned(),
        source,
    })?;
    parse_config(&text, name)
}

pub fn parse_config(text: &str, name: &str) -> Result<EngineConfig, EngineError> {
    let mut configs: BTreeMap<String, EngineConfig> = serde_json::from_str(text)?;
    configs
        .remove(name)
        .ok_or_else(|| EngineError::UnknownEngine(name.to_owned()))
}

/// A running engine process. The process is told to quit and killed when this is dropped.
pub struct UciEngine {
    name: String,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    depth: u32,
    options: Vec<String>,
    info: Vec<String>,
}

impl UciEngine {
    /// Starts the engine, performs the UCI handshake and applies the configured options.
    pub fn spawn(name: &str, config: &EngineConfig) -> Result<UciEngine, EngineError> {
        let _span = info_span!("engine", name).entered();
        let mut child = Command::new(&config.path)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                return Err(EngineError::UnexpectedEof);
            }
        };

        let mut engine = UciEngine {
            name: name.to_owned(),
            child,
            stdin,
            stdout: BufReader::new(stdout),
            depth: config.depth,
            options: Vec::new(),
            info: Vec::new(),
        };

        engine.handshake()?;
        for (option, value) in &config.options {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            engine.set_option(option, &value)?;
        }

        engine.wait_ready()?;
        info!(options = engine.options.len(), "engine ready");
        Ok(engine)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Options the engine advertised during the handshake.
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// `info` lines printed during the last search.
    pub fn info(&self) -> &[String] {
        &self.info
    }

    fn send(&mut self, line: &str) -> Result<(), EngineError> {
        trace!(engine = %self.name, "> {}", line);
        writeln!(self.stdin, "{}", line)?;
        self.stdin.flush()?;
        Ok(())
    }

    fn receive(&mut self) -> Result<String, EngineError> {
        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(EngineError::UnexpectedEof);
        }

        let line = line.trim_end().to_owned();
        trace!(engine = %self.name, "< {}", line);
        Ok(line)
    }

    fn handshake(&mut self) -> Result<(), EngineError> {
        self.send("uci")?;
        loop {
            let line = self.receive()?;
            let components: Vec<_> = line.split_whitespace().collect();
            match components.as_slice() {
                ["uciok"] => return Ok(()),
                ["option", "name", rest @ ..] => {
                    let name: Vec<&str> =
                        rest.iter().copied().take_while(|&t| t != "type").collect();
                    self.options.push(name.join(" "));
                }
                ["id", "name", rest @ ..] => info!(id = %rest.join(" "), "engine identified"),
                _ => {}
            }
        }
    }

    /// Sets an option the engine advertised. Option names are matched case-insensitively.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        if !self.options.iter().any(|o| o.eq_ignore_ascii_case(name)) {
            return Err(EngineError::UnknownOption(name.to_owned()));
        }

        self.send(&format!("setoption name {} value {}", name, value))
    }

    pub fn wait_ready(&mut self) -> Result<(), EngineError> {
        self.send("isready")?;
        while self.receive()? != "readyok" {}
        Ok(())
    }

    pub fn new_game(&mut self) -> Result<(), EngineError> {
        self.send("ucinewgame")?;
        self.wait_ready()
    }

    pub fn set_position(&mut self, fen: &str) -> Result<(), EngineError> {
        self.send(&format!("position fen {}", fen))
    }

    /// Searches the current position and returns the best move in long algebraic notation.
    pub fn go(&mut self) -> Result<String, EngineError> {
        self.info.clear();
        self.send(&format!("go depth {}", self.depth))?;
        loop {
            let line = self.receive()?;
            let mut components = line.split_whitespace();
            match components.next() {
                Some("info") => self.info.push(line.clone()),
                Some("bestmove") => {
                    let mov = components.next().unwrap_or_default();
                    notation::parse_long_algebraic(mov)
                        .map_err(|_| EngineError::InvalidBestMove(mov.to_owned()))?;
                    return Ok(mov.to_owned());
                }
                _ => {}
            }
        }
    }
}

impl MoveSuggester for UciEngine {
    fn best_move(&mut self, fen: &str) -> Result<String, EngineError> {
        let _span = info_span!("best_move", engine = %self.name).entered();
        self.new_game()?;
        self.set_position(fen)?;
        self.go()
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        let _ = self.send("quit");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
