use std::io::{IsTerminal, Write};

use bertrpc_term::Term;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;

use crate::convert::term_to_json;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// The answer to one `call` or `cast`.
#[derive(Serialize)]
pub struct ReplyOutput<'a> {
    pub kind: &'a str,
    pub module: &'a str,
    pub function: &'a str,
    pub result: Value,
    pub term: String,
}

impl<'a> ReplyOutput<'a> {
    pub fn new(kind: &'a str, module: &'a str, function: &'a str, value: &Term) -> Self {
        Self {
            kind,
            module,
            function,
            result: term_to_json(value),
            term: value.to_string(),
        }
    }
}

pub fn print_reply(out: &ReplyOutput<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "MODULE", "FUNCTION", "RESULT"])
                .add_row(vec![
                    out.kind.to_string(),
                    out.module.to_string(),
                    out.function.to_string(),
                    out.term.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{}:{} -> {}", out.module, out.function, out.term);
        }
        OutputFormat::Raw => println!("{}", out.term),
    }
}

/// A decoded term.
#[derive(Serialize)]
pub struct TermOutput {
    pub kind: &'static str,
    pub value: Value,
    pub term: String,
}

impl TermOutput {
    pub fn new(term: &Term) -> Self {
        Self {
            kind: term.kind(),
            value: term_to_json(term),
            term: term.to_string(),
        }
    }
}

pub fn print_term(out: &TermOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "TERM"])
                .add_row(vec![out.kind.to_string(), out.term.clone()]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => println!("{}", out.term),
    }
}

/// An encoded term.
#[derive(Serialize)]
pub struct EncodedOutput {
    pub size: usize,
    pub hex: String,
    pub bytes: String,
}

impl EncodedOutput {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            size: bytes.len(),
            hex: hex::encode(bytes),
            bytes: erlang_binary(bytes),
        }
    }
}

pub fn print_encoded(out: &EncodedOutput, raw: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SIZE", "HEX"])
                .add_row(vec![out.size.to_string(), out.hex.clone()]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", out.bytes),
        OutputFormat::Raw => print_raw(raw),
    }
}

/// Announce a bound server so scripts can find an ephemeral port.
#[derive(Serialize)]
pub struct ListeningOutput {
    pub endpoint: String,
    pub modules: Vec<String>,
}

pub fn print_listening(out: &ListeningOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        _ => println!("listening on {} ({})", out.endpoint, out.modules.join(", ")),
    }
    let _ = std::io::stdout().flush();
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// `<<131,97,1>>`
pub fn erlang_binary(bytes: &[u8]) -> String {
    let body: Vec<String> = bytes.iter().map(u8::to_string).collect();
    format!("<<{}>>", body.join(","))
}
