//! Slide writer: commits slide records on behalf of the editor.
//!
//! Spawned by the persistence bridge once per save. Reads one request frame
//! on stdin, writes the slide under the content root, answers with one
//! response frame on stdout. Logs go to stderr so stdout stays a clean frame
//! channel.
//!
//! ```text
//! slide-writer [--root <dir>]       serve one request frame
//! slide-writer --check <file>       decode and lint a slide record
//! ```

use slide_bridge::{FsWriter, WriteResponse, serve_one};
use slide_core::{EditorConfig, LintSeverity, decode_slide, lint_slide};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    // ── `slide-writer --check <file>` ───────────────────────────────────
    if args.get(1).map(String::as_str) == Some("--check") {
        let Some(path) = args.get(2) else {
            eprintln!("slide-writer --check: missing file argument");
            return ExitCode::from(2);
        };
        return check(path);
    }

    // ── Serve mode ──────────────────────────────────────────────────────
    let root = match args.get(1).map(String::as_str) {
        None => PathBuf::from("."),
        Some("--root") => match args.get(2) {
            Some(dir) => PathBuf::from(dir),
            None => {
                eprintln!("slide-writer --root: missing directory argument");
                return ExitCode::from(2);
            }
        },
        Some(other) => {
            eprintln!("slide-writer: unknown argument '{other}'");
            eprintln!("  usage: slide-writer [--root <dir>] | --check <file>");
            return ExitCode::from(2);
        }
    };

    let writer = FsWriter::new(root);
    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    match serve_one(&mut stdin, &mut stdout, &writer).await {
        Ok(WriteResponse::Ok { .. }) => ExitCode::SUCCESS,
        Ok(WriteResponse::Error { .. }) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn check(path: &str) -> ExitCode {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("slide-writer --check: {path}: {e}");
            return ExitCode::FAILURE;
        }
    };
    let slide = match decode_slide(&text, &EditorConfig::default()) {
        Ok(slide) => slide,
        Err(e) => {
            eprintln!("slide-writer --check: {path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let diags = lint_slide(&slide);
    for diag in &diags {
        let level = match diag.severity {
            LintSeverity::Warning => "warning",
            LintSeverity::Info => "info",
        };
        println!("{path}: {level}[{}] {}: {}", diag.rule, diag.uid, diag.message);
    }
    if diags.iter().any(|d| d.severity == LintSeverity::Warning) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
