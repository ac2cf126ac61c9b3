use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("bertrpc {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: bertrpc");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "build_target: {}",
        option_env!("BERTRPC_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "features: rpc={}, async={}, cli=true",
        cfg!(feature = "rpc"),
        cfg!(feature = "async")
    );
    println!("default_generation: current");

    Ok(SUCCESS)
}
