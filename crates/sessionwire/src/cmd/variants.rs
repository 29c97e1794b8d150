use serde::Serialize;
use sessionwire_schema::validator::describe_field;
use sessionwire_schema::{RegistryConfig, SchemaRegistry, UpdateKind};

use crate::cmd::VariantsArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{new_table, print_json, OutputFormat, SCHEMA_ID_BASE};

#[derive(Debug, Serialize)]
struct FieldOutput {
    name: &'static str,
    kind: &'static str,
    constraint: String,
}

#[derive(Debug, Serialize)]
struct VariantOutput {
    #[serde(rename = "type")]
    kind: UpdateKind,
    fields: Vec<FieldOutput>,
}

#[derive(Debug, Serialize)]
struct VariantsOutput {
    schema_id: String,
    variants: Vec<VariantOutput>,
}

pub fn run(_args: VariantsArgs, registry: &SchemaRegistry, format: OutputFormat) -> CliResult<i32> {
    let output = VariantsOutput {
        schema_id: format!("{SCHEMA_ID_BASE}/variants.schema.json"),
        variants: registry
            .variants()
            .iter()
            .map(|kind| describe_variant(*kind, registry.config()))
            .collect(),
    };

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table => {
            let mut table = new_table(vec!["TYPE", "FIELD", "CONSTRAINT"]);
            for variant in &output.variants {
                for field in &variant.fields {
                    table.add_row(vec![
                        variant.kind.as_str().to_string(),
                        field.name.to_string(),
                        field.constraint.clone(),
                    ]);
                }
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for variant in &output.variants {
                println!("{}", variant.kind);
                for field in &variant.fields {
                    println!("  {:<12} {}", field.name, field.constraint);
                }
            }
        }
        OutputFormat::Raw => {
            for variant in &output.variants {
                println!("{}", variant.kind);
            }
        }
    }

    Ok(SUCCESS)
}

fn describe_variant(kind: UpdateKind, config: &RegistryConfig) -> VariantOutput {
    VariantOutput {
        kind,
        fields: kind
            .fields()
            .iter()
            .map(|spec| FieldOutput {
                name: spec.name,
                kind: spec.kind.as_str(),
                constraint: describe_field(spec.kind, config),
            })
            .collect(),
    }
}
