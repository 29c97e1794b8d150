use std::collections::BTreeMap;

use serde::Serialize;
use sessionwire_schema::RegistryConfig;

use crate::cmd::{EnvinfoArgs, LimitArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{new_table, print_json, print_json_pretty, OutputFormat, SCHEMA_ID_BASE};

/// Variables that change how the CLI resolves limits or logs.
const ENV_VARS: [&str; 6] = [
    "SESSIONWIRE_ID_MAX",
    "SESSIONWIRE_LABEL_MAX",
    "SESSIONWIRE_STRICT",
    "SESSIONWIRE_MAX_PAYLOAD",
    "SESSIONWIRE_LOG_LEVEL",
    "RUST_LOG",
];

#[derive(Debug, Serialize)]
struct BuildInfo {
    target: String,
    profile: &'static str,
}

/// Limits after flags, environment and defaults are merged.
#[derive(Debug, Serialize)]
struct EffectiveLimits {
    id_max: usize,
    label_max: usize,
    strict_mode: bool,
    max_payload_size: usize,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    problem: Option<String>,
}

impl EffectiveLimits {
    fn resolve(config: RegistryConfig) -> Self {
        let problem = config.validated().err().map(|err| err.to_string());
        Self {
            id_max: config.id_max,
            label_max: config.label_max,
            strict_mode: config.strict_mode,
            max_payload_size: config.max_payload_size,
            valid: problem.is_none(),
            problem,
        }
    }
}

#[derive(Debug, Serialize)]
struct EnvInfoOutput {
    schema_id: String,
    version: &'static str,
    build: BuildInfo,
    limits: EffectiveLimits,
    environment: BTreeMap<&'static str, Option<String>>,
}

/// Reports the configuration a `validate` run would use. Invalid limits are
/// reported rather than treated as an error, so this still works as a diagnostic.
pub fn run(_args: EnvinfoArgs, limits: &LimitArgs, format: OutputFormat) -> CliResult<i32> {
    let output = EnvInfoOutput {
        schema_id: format!("{SCHEMA_ID_BASE}/envinfo.schema.json"),
        version: env!("CARGO_PKG_VERSION"),
        build: BuildInfo {
            target: option_env!("SESSIONWIRE_BUILD_TARGET")
                .map(str::to_string)
                .unwrap_or_else(|| {
                    format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS)
                }),
            profile: option_env!("SESSIONWIRE_BUILD_PROFILE").unwrap_or("unknown"),
        },
        limits: EffectiveLimits::resolve(limits.to_config()),
        environment: ENV_VARS
            .iter()
            .map(|name| (*name, std::env::var(name).ok()))
            .collect(),
    };

    if !output.limits.valid {
        tracing::warn!(problem = ?output.limits.problem, "effective limits are invalid");
    }

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Pretty => print_json_pretty(&output),
        OutputFormat::Table => {
            let l = &output.limits;
            let mut table = new_table(vec!["SETTING", "VALUE"]);
            table.add_row(vec!["version".to_string(), output.version.to_string()]);
            table.add_row(vec!["target".to_string(), output.build.target.clone()]);
            table.add_row(vec!["profile".to_string(), output.build.profile.to_string()]);
            table.add_row(vec!["id_max".to_string(), l.id_max.to_string()]);
            table.add_row(vec!["label_max".to_string(), l.label_max.to_string()]);
            table.add_row(vec!["strict_mode".to_string(), l.strict_mode.to_string()]);
            table.add_row(vec![
                "max_payload_size".to_string(),
                l.max_payload_size.to_string(),
            ]);
            table.add_row(vec![
                "limits".to_string(),
                l.problem.clone().unwrap_or_else(|| "ok".to_string()),
            ]);
            for (name, value) in &output.environment {
                table.add_row(vec![
                    name.to_string(),
                    value.clone().unwrap_or_else(|| "(not set)".to_string()),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Raw => println!(
            "id_max={} label_max={} strict_mode={} max_payload_size={}",
            output.limits.id_max,
            output.limits.label_max,
            output.limits.strict_mode,
            output.limits.max_payload_size
        ),
    }

    Ok(SUCCESS)
}
