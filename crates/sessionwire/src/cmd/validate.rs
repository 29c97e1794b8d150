use std::fs::File;
use std::io::Read;

use sessionwire_schema::{EphemeralUpdate, SchemaError, SchemaRegistry};

use crate::cmd::ValidateArgs;
use crate::exit::{io_error, schema_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_raw_line, print_report, CheckedDocument, OutputFormat, ValidationReport};

pub fn run(args: ValidateArgs, registry: &SchemaRegistry, format: OutputFormat) -> CliResult<i32> {
    let input = read_input(&args, registry)?;

    let outcomes: Vec<(Option<usize>, Result<EphemeralUpdate, SchemaError>)> = if args.lines {
        let text = std::str::from_utf8(&input)
            .map_err(|err| CliError::new(DATA_INVALID, format!("input is not UTF-8: {err}")))?;
        registry
            .validate_lines(text)
            .into_iter()
            .map(|outcome| (Some(outcome.line), outcome.result))
            .collect()
    } else {
        vec![(None, registry.validate_payload(&input))]
    };

    for (line, result) in &outcomes {
        if let Err(err) = result {
            tracing::warn!(line = ?line, error = %err, "update rejected");
        }
    }

    let all_valid = outcomes.iter().all(|(_, result)| result.is_ok());

    if matches!(format, OutputFormat::Raw) {
        for update in outcomes.iter().filter_map(|(_, result)| result.as_ref().ok()) {
            let bytes = registry
                .encode(update)
                .map_err(|err| schema_error("failed encoding update", err))?;
            print_raw_line(&bytes);
        }
    } else {
        let documents = outcomes
            .iter()
            .map(|(line, result)| CheckedDocument::new(*line, result))
            .collect();
        print_report(&ValidationReport::new(documents), format);
    }

    if all_valid {
        Ok(SUCCESS)
    } else {
        Ok(DATA_INVALID)
    }
}

/// Reads the input. A FILE of `-` means stdin.
///
/// A single document is read through a cap of `max_payload_size + 1` bytes, so
/// oversized input is never buffered whole; the registry rejects the overflow.
/// NDJSON input is read whole and capped per line by the registry.
fn read_input(args: &ValidateArgs, registry: &SchemaRegistry) -> CliResult<Vec<u8>> {
    if let Some(json) = &args.json {
        return Ok(json.as_bytes().to_vec());
    }

    let max_payload = registry.config().max_payload_size;
    let cap = (!args.lines).then_some(max_payload);

    let input = match &args.file {
        Some(path) if path.as_os_str() != "-" => File::open(path)
            .and_then(|file| read_capped(file, cap))
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?,
        _ => read_capped(std::io::stdin().lock(), cap)
            .map_err(|err| io_error("failed reading stdin", err))?,
    };

    tracing::debug!(
        bytes = input.len(),
        max_payload,
        lines = args.lines,
        "read input"
    );
    Ok(input)
}

fn read_capped<R: Read>(mut reader: R, cap: Option<usize>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    match cap {
        Some(max) => reader.take(max as u64 + 1).read_to_end(&mut buf)?,
        None => reader.read_to_end(&mut buf)?,
    };
    Ok(buf)
}
