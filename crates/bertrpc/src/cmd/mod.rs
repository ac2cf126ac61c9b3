use std::time::Duration;

use bertrpc_term::{EncodeConfig, Encoder, Generation};
use bertrpc_transport::Endpoint;
use clap::{Args, Subcommand};

use crate::exit::{transport_error, CliError, CliResult};
use crate::output::OutputFormat;

pub mod call;
pub mod codec;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the demo modules until interrupted.
    Serve(ServeArgs),
    /// Call a remote function and print its reply.
    Call(CallArgs),
    /// Cast to a remote function (waits only for the acknowledgement).
    Cast(CallArgs),
    /// Encode a JSON value as BERT.
    Encode(EncodeArgs),
    /// Decode hex-encoded BERT bytes.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Call(args) => call::run_call(args, format),
        Command::Cast(args) => call::run_cast(args, format),
        Command::Encode(args) => codec::run_encode(args, format),
        Command::Decode(args) => codec::run_decode(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Endpoint to bind (unix:/path, /path or host:port).
    pub endpoint: String,
    /// Demo modules to expose (comma-separated). Default: all.
    #[arg(long = "module", value_delimiter = ',')]
    pub modules: Option<Vec<String>>,
    /// Maximum request payload in bytes.
    #[arg(long)]
    pub max_payload: Option<usize>,
    /// Encode replies with bare-atom booleans and dictionaries.
    #[arg(long)]
    pub legacy: bool,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Endpoint to connect to (unix:/path, /path or host:port).
    pub endpoint: String,
    /// Remote module name.
    pub module: String,
    /// Remote function name.
    pub function: String,
    /// Arguments as JSON; an array is the argument list.
    #[arg(long)]
    pub args: Option<String>,
    /// Maximum time to wait for the reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Encode the request with bare-atom booleans and dictionaries.
    #[arg(long)]
    pub legacy: bool,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// JSON value to encode.
    #[arg(long)]
    pub json: String,
    /// Encode with bare-atom booleans and dictionaries.
    #[arg(long)]
    pub legacy: bool,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex-encoded term, starting with 83 (the 131 version byte).
    pub hex: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_endpoint(input: &str) -> CliResult<Endpoint> {
    input
        .parse()
        .map_err(|err| transport_error("invalid endpoint", err))
}

pub(crate) fn encoder(legacy: bool) -> Encoder {
    let generation = if legacy {
        Generation::Legacy
    } else {
        Generation::Current
    };
    Encoder::new(EncodeConfig::default().with_generation(generation))
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
    }

    #[test]
    fn endpoint_errors_are_usage_errors() {
        assert_eq!(parse_endpoint("nonsense").unwrap_err().code, crate::exit::USAGE);
        assert!(parse_endpoint("127.0.0.1:7000").is_ok());
    }
}
