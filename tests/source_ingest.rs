use std::io::Write;
use std::rc::Rc;

use chronoscript::config::RuntimeConfig;
use chronoscript::diagnostics::ErrorSink;
use chronoscript::interpreter::Value;
use chronoscript::runtime::run_file;
use chronoscript::source::SourceFile;
use chronoscript::tokenizer::{Lexer, TokenKind};

fn write_script(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".chs")
        .tempfile()
        .expect("temp file");
    file.write_all(text.as_bytes()).expect("write");
    file
}

#[test]
fn file_sources_run_end_to_end() {
    let file = write_script("DECLARE CONF total : INT = 0;\r\nFOR_CHRONON(3) { total += 2; }\r\ntotal;\r\n");
    let report = run_file(file.path(), RuntimeConfig::default()).expect("readable");
    assert!(!report.has_errors(), "{:?}", report.diagnostics);
    assert_eq!(report.value, Some(Value::int(6)));
}

#[test]
fn diagnostics_point_into_the_file() {
    let file = write_script("DECLARE CONF a : INT = 1;\n\na = a + missing;\n");
    let report = run_file(file.path(), RuntimeConfig::default()).expect("readable");
    let diagnostic = &report.diagnostics[0];
    assert_eq!(diagnostic.location.line, 3);
    let name = file.path().display().to_string();
    assert_eq!(diagnostic.location.source_name(), Some(name.as_str()));
    assert!(diagnostic.to_string().contains(":3:"));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let result = run_file(dir.path().join("absent.chs"), RuntimeConfig::default());
    assert!(result.is_err());
}

#[test]
fn lexer_reads_file_sources() {
    let file = write_script("BRANCH_TIMELINE() { x :: y; }");
    let source = Rc::new(SourceFile::from_path(file.path()).expect("readable"));
    let mut lexer = Lexer::new(source, ErrorSink::new());
    let kinds: Vec<TokenKind> = lexer.tokenize_all().iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::BranchTimeline,
            TokenKind::LeftParen,
            TokenKind::RightParen,
            TokenKind::LeftBrace,
            TokenKind::Identifier,
            TokenKind::DoubleColon,
            TokenKind::Identifier,
            TokenKind::Semicolon,
            TokenKind::RightBrace,
            TokenKind::Eof,
        ]
    );
}
