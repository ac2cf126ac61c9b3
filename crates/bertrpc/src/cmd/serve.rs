use bertrpc::demos;
use bertrpc_frame::FrameConfig;
use bertrpc_rpc::{Server, ServerConfig, ShutdownHandle};
use tracing::info;

use crate::cmd::{encoder, parse_endpoint, ServeArgs};
use crate::exit::{rpc_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_listening, ListeningOutput, OutputFormat};

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint = parse_endpoint(&args.endpoint)?;
    let registry = demos::registry(args.modules.as_deref()).map_err(CliError::usage)?;
    let modules: Vec<String> = registry
        .module_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut frame = FrameConfig::default();
    if let Some(max) = args.max_payload {
        frame = frame.with_max_payload_size(max);
    }
    let config = ServerConfig::default()
        .with_frame_config(frame)
        .with_encoder(encoder(args.legacy));

    let server = Server::bind(&endpoint, registry)
        .map_err(|err| rpc_error("bind failed", err))?
        .with_config(config);
    install_ctrlc_handler(server.shutdown_handle())?;

    print_listening(
        &ListeningOutput {
            endpoint: server.local_endpoint().to_string(),
            modules,
        },
        format,
    );

    server.serve().map_err(|err| rpc_error("serve failed", err))?;
    info!("interrupted; exiting");
    Ok(SUCCESS)
}

fn install_ctrlc_handler(handle: ShutdownHandle) -> CliResult<()> {
    ctrlc::set_handler(move || handle.shutdown())
        .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
