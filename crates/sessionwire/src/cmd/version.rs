use sessionwire_schema::{DEFAULT_MAX_PAYLOAD, ID_MAX, LABEL_MAX};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("sessionwire {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: sessionwire");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "profile: {}",
        option_env!("SESSIONWIRE_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("default_id_max: {ID_MAX}");
    println!("default_label_max: {LABEL_MAX}");
    println!("default_max_payload: {DEFAULT_MAX_PAYLOAD}");

    Ok(SUCCESS)
}
