use bertrpc_frame::FrameConfig;
use bertrpc_rpc::{Client, ClientConfig, Request};
use bertrpc_term::Term;
use tracing::debug;

use crate::cmd::{encoder, parse_duration, parse_endpoint, CallArgs};
use crate::convert::parse_args;
use crate::exit::{rpc_error, CliError, CliResult, SUCCESS};
use crate::output::{print_reply, OutputFormat, ReplyOutput};

pub fn run_call(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let (client, request) = prepare(&args, false)?;
    let value = client
        .call(&request.module, &request.function, request.args)
        .map_err(|err| rpc_error("call failed", err))?;
    client.close();

    print_reply(
        &ReplyOutput::new("call", &args.module, &args.function, &value),
        format,
    );
    Ok(SUCCESS)
}

/// Casts still get a `{noreply}` (or error) acknowledgement; waiting for it
/// lets the exit code report remote failures.
pub fn run_cast(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let (client, request) = prepare(&args, true)?;
    let timeout = parse_duration(&args.timeout)?;
    client
        .send(&request)
        .and_then(|pending| pending.wait_timeout(timeout))
        .map_err(|err| rpc_error("cast failed", err))?;
    client.close();

    print_reply(
        &ReplyOutput::new("cast", &args.module, &args.function, &Term::atom("noreply")),
        format,
    );
    Ok(SUCCESS)
}

fn prepare(args: &CallArgs, cast: bool) -> CliResult<(Client, Request)> {
    let endpoint = parse_endpoint(&args.endpoint)?;
    let timeout = parse_duration(&args.timeout)?;
    let call_args = match &args.args {
        Some(text) => parse_args(text)
            .map_err(|err| CliError::usage(format!("--args is not valid JSON: {err}")))?,
        None => Vec::new(),
    };

    let config = ClientConfig::default()
        .with_frame_config(FrameConfig::default().with_write_timeout(Some(timeout)))
        .with_encoder(encoder(args.legacy))
        .with_call_timeout(Some(timeout));
    let client = Client::connect_with_config(&endpoint, config)
        .map_err(|err| rpc_error("connect failed", err))?;

    let request = if cast {
        Request::cast(args.module.as_str(), args.function.as_str(), call_args)
    } else {
        Request::call(args.module.as_str(), args.function.as_str(), call_args)
    };
    debug!(endpoint = %endpoint, request = %request, "connected");
    Ok((client, request))
}
