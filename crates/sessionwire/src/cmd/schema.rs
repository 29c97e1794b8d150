use sessionwire_schema::json_schema::{compile, union_schema, variant_schema};
use sessionwire_schema::SchemaRegistry;

use crate::cmd::SchemaArgs;
use crate::exit::{schema_error, CliResult, SUCCESS};
use crate::output::{print_json, print_json_pretty, OutputFormat};

pub fn run(args: SchemaArgs, registry: &SchemaRegistry, format: OutputFormat) -> CliResult<i32> {
    let config = registry.config();

    // The exported document must compile.
    compile(config).map_err(|err| schema_error("exported schema is invalid", err))?;

    let schema = match args.variant {
        Some(kind) => variant_schema(kind, config),
        None => union_schema(config),
    };

    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(&schema),
        OutputFormat::Table | OutputFormat::Pretty => print_json_pretty(&schema),
    }

    Ok(SUCCESS)
}
