//=====================================================
// File: lib.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: ChronoScript library root
// Objective: Source buffers, lexer, parser, temporal ledger and
//            tree-walking interpreter for the ChronoScript language
//=====================================================

pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod interpreter;
pub mod parser;
pub mod runtime;
pub mod source;
pub mod temporal;
pub mod tokenizer;
pub mod devtools {
    pub mod repl;
}

pub use config::RuntimeConfig;
pub use diagnostics::{Diagnostic, ErrorSink, FatalError, Severity};
pub use interpreter::{Interpreter, RuntimeError, ScriptError, Value};
pub use parser::{ParseError, ParseFailure, Parser, parse_str};
pub use source::{SourceFile, SourceLocation};
pub use temporal::TemporalLedger;
pub use tokenizer::{Lexer, Token, TokenKind};

//=====================================================
// End of file
//=====================================================
