//=====================================================
// File: devtools/repl.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: REPL session state for the ChronoScript driver
// Objective: Keep one interpreter alive across lines, recognise REPL
//            commands, and clear diagnostics between lines
//=====================================================

use std::rc::Rc;

use crate::config::RuntimeConfig;
use crate::diagnostics::ErrorSink;
use crate::interpreter::Interpreter;
use crate::runtime::{RunReport, run_source};
use crate::source::SourceFile;

pub const HELP: &str = "\
Commands:
  exit       leave the REPL
  help       show this message
  clear      clear recorded diagnostics
  reset      start over with a fresh interpreter
  paradox    show the current paradox level
  resources  show remaining aethel and chronons
Anything else is evaluated as ChronoScript; a trailing ';' is optional.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Exit,
    Help,
    Clear,
    Reset,
    Paradox,
    Resources,
}

impl ReplCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "exit" | "quit" => Some(ReplCommand::Exit),
            "help" => Some(ReplCommand::Help),
            "clear" => Some(ReplCommand::Clear),
            "reset" => Some(ReplCommand::Reset),
            "paradox" => Some(ReplCommand::Paradox),
            "resources" => Some(ReplCommand::Resources),
            _ => None,
        }
    }
}

/// What a single REPL input produced.
#[derive(Debug)]
pub enum ReplOutput {
    Exit,
    Message(String),
    Evaluated(RunReport),
    Empty,
}

pub struct ReplSession {
    interpreter: Interpreter,
    config: RuntimeConfig,
    line_number: usize,
}

impl ReplSession {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            interpreter: Interpreter::with_config(config.clone(), ErrorSink::new()),
            config,
            line_number: 0,
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    //Function: handle_line
    //Purpose: Run a REPL command or evaluate one line of source
    //Inputs: line: raw input
    //Returns: ReplOutput
    pub fn handle_line(&mut self, line: &str) -> ReplOutput {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return ReplOutput::Empty;
        }
        if let Some(command) = ReplCommand::parse(trimmed) {
            return self.run_command(command);
        }

        self.line_number += 1;
        let mut text = trimmed.to_string();
        if !text.ends_with(';') && !text.ends_with('}') {
            text.push(';');
        }
        let name = format!("<repl:{}>", self.line_number);
        let report = run_source(
            &mut self.interpreter,
            Rc::new(SourceFile::from_string(text, name)),
        );
        self.interpreter.sink().clear();
        ReplOutput::Evaluated(report)
    }

    fn run_command(&mut self, command: ReplCommand) -> ReplOutput {
        match command {
            ReplCommand::Exit => ReplOutput::Exit,
            ReplCommand::Help => ReplOutput::Message(HELP.to_string()),
            ReplCommand::Clear => {
                self.interpreter.sink().clear();
                ReplOutput::Message("Diagnostics cleared.".to_string())
            }
            ReplCommand::Reset => {
                self.interpreter = Interpreter::with_config(self.config.clone(), ErrorSink::new());
                self.line_number = 0;
                ReplOutput::Message("Interpreter reset.".to_string())
            }
            ReplCommand::Paradox => {
                let ledger = self.interpreter.ledger();
                ReplOutput::Message(format!(
                    "Paradox level: {} (warning above {})",
                    ledger.paradox_level(),
                    ledger.high_water_mark()
                ))
            }
            ReplCommand::Resources => {
                let ledger = self.interpreter.ledger();
                ReplOutput::Message(format!(
                    "Aethel: {:.2}  Chronons: {:.2}",
                    ledger.aethel(),
                    ledger.chronons()
                ))
            }
        }
    }
}


//=====================================================
// End of file
//=====================================================
