use crate::cmd::{encoder, DecodeArgs, EncodeArgs};
use crate::convert::json_to_term;
use crate::exit::{codec_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_encoded, print_term, EncodedOutput, OutputFormat, TermOutput};

pub fn run_encode(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let value: serde_json::Value = serde_json::from_str(&args.json)
        .map_err(|err| CliError::usage(format!("--json is not valid JSON: {err}")))?;
    let term = json_to_term(&value);
    let bytes = encoder(args.legacy)
        .encode(&term)
        .map_err(|err| codec_error("encode failed", err))?;

    print_encoded(&EncodedOutput::new(&bytes), &bytes, format);
    Ok(SUCCESS)
}

pub fn run_decode(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_hex(&args.hex)?;
    let term = bertrpc_term::decode(&bytes).map_err(|err| codec_error("decode failed", err))?;
    print_term(&TermOutput::new(&term), format);
    Ok(SUCCESS)
}

/// Accepts plain hex with optional whitespace and an optional `0x` prefix.
fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let cleaned: String = input.split_whitespace().collect();
    let cleaned = cleaned.strip_prefix("0x").unwrap_or(&cleaned);
    hex::decode(cleaned)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid hex input: {err}")))
}
