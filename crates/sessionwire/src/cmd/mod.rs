use clap::{Args, Subcommand};
use std::path::PathBuf;

use sessionwire_schema::{
    RegistryConfig, SchemaRegistry, UpdateKind, DEFAULT_MAX_PAYLOAD, ID_MAX, LABEL_MAX,
};

use crate::exit::{schema_error, CliResult};
use crate::output::OutputFormat;

pub mod envinfo;
pub mod schema;
pub mod validate;
pub mod variants;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate update documents from a file, an argument or stdin.
    Validate(ValidateArgs),
    /// Print the JSON Schema for the update union or one variant.
    Schema(SchemaArgs),
    /// List update variants and their fields.
    Variants(VariantsArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Print build and environment diagnostics.
    Envinfo(EnvinfoArgs),
}

pub fn run(command: Command, limits: &LimitArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Validate(args) => validate::run(args, &limits.registry()?, format),
        Command::Schema(args) => schema::run(args, &limits.registry()?, format),
        Command::Variants(args) => variants::run(args, &limits.registry()?, format),
        Command::Version(args) => version::run(args),
        Command::Envinfo(args) => envinfo::run(args, limits, format),
    }
}

/// Registry limits, overridable per invocation or through the environment.
#[derive(Args, Debug, Clone)]
pub struct LimitArgs {
    /// Maximum length of session and machine identifiers.
    #[arg(long, env = "SESSIONWIRE_ID_MAX", default_value_t = ID_MAX, global = true)]
    pub id_max: usize,
    /// Maximum length of usage keys and breakdown entry names.
    #[arg(long, env = "SESSIONWIRE_LABEL_MAX", default_value_t = LABEL_MAX, global = true)]
    pub label_max: usize,
    /// Reject fields not declared by the update variant.
    #[arg(long, env = "SESSIONWIRE_STRICT", global = true)]
    pub strict: bool,
    /// Maximum payload size in bytes.
    #[arg(
        long,
        env = "SESSIONWIRE_MAX_PAYLOAD",
        default_value_t = DEFAULT_MAX_PAYLOAD,
        global = true
    )]
    pub max_payload: usize,
}

impl LimitArgs {
    pub fn to_config(&self) -> RegistryConfig {
        RegistryConfig {
            id_max: self.id_max,
            label_max: self.label_max,
            strict_mode: self.strict,
            max_payload_size: self.max_payload,
        }
    }

    pub fn registry(&self) -> CliResult<SchemaRegistry> {
        let config = self.to_config();
        tracing::debug!(?config, "building registry");
        SchemaRegistry::with_config(config).map_err(|err| schema_error("invalid limits", err))
    }
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Read input from a file. Reads stdin when neither FILE nor --json is given.
    pub file: Option<PathBuf>,
    /// Inline JSON document.
    #[arg(long, conflicts_with = "file")]
    pub json: Option<String>,
    /// Treat input as newline-delimited JSON, one update per line.
    #[arg(long)]
    pub lines: bool,
}

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Print only this variant (e.g. activity, machine-status).
    #[arg(long, value_name = "KIND")]
    pub variant: Option<UpdateKind>,
}

#[derive(Args, Debug, Default)]
pub struct VariantsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct EnvinfoArgs {}
