mod cmd;
mod convert;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "bertrpc", version, about = "BERT-RPC client, server and codec tool")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_call_subcommand() {
        let cli = Cli::try_parse_from([
            "bertrpc",
            "call",
            "localhost:7000",
            "math",
            "sum",
            "--args",
            "[[1,2,3]]",
        ])
        .expect("call args should parse");

        match cli.command {
            Command::Call(args) => {
                assert_eq!(args.module, "math");
                assert_eq!(args.args.as_deref(), Some("[[1,2,3]]"));
                assert_eq!(args.timeout, "5s");
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn parses_serve_module_list() {
        let cli = Cli::try_parse_from(["bertrpc", "serve", "/tmp/b.sock", "--module", "math,say"])
            .expect("serve args should parse");
        match cli.command {
            Command::Serve(args) => {
                assert_eq!(
                    args.modules,
                    Some(vec!["math".to_string(), "say".to_string()])
                );
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn call_requires_function() {
        let err = Cli::try_parse_from(["bertrpc", "call", "localhost:7000", "math"])
            .expect_err("missing function should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn global_format_after_subcommand() {
        let cli = Cli::try_parse_from(["bertrpc", "decode", "836101", "--format", "pretty"])
            .expect("decode args should parse");
        assert!(matches!(cli.format, Some(OutputFormat::Pretty)));
    }
}
