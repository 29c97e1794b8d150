use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use sessionwire_schema::{EphemeralUpdate, SchemaError};

pub const SCHEMA_ID_BASE: &str = "https://schemas.sessionwire.dev/cli/v1";

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Outcome of checking one document.
#[derive(Debug, Serialize)]
pub struct CheckedDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckedDocument {
    pub fn new(line: Option<usize>, result: &Result<EphemeralUpdate, SchemaError>) -> Self {
        match result {
            Ok(update) => Self {
                line,
                valid: true,
                kind: Some(update.kind().as_str()),
                class: None,
                field: None,
                error: None,
            },
            Err(err) => {
                let (class, field) = match err {
                    SchemaError::Validation(inner) => {
                        (inner.class().as_str(), inner.field().map(str::to_string))
                    }
                    SchemaError::InvalidJson(_) => ("invalid-json", None),
                    SchemaError::PayloadTooLarge { .. } => ("payload-too-large", None),
                    SchemaError::InvalidConfig(_) | SchemaError::CompileFailed(_) => {
                        ("internal", None)
                    }
                };
                Self {
                    line,
                    valid: false,
                    kind: None,
                    class: Some(class),
                    field,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    fn location(&self) -> String {
        self.line
            .map(|line| line.to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub schema_id: String,
    pub valid: bool,
    pub checked: usize,
    pub failed: usize,
    pub documents: Vec<CheckedDocument>,
}

impl ValidationReport {
    pub fn new(documents: Vec<CheckedDocument>) -> Self {
        let failed = documents.iter().filter(|doc| !doc.valid).count();
        Self {
            schema_id: format!("{SCHEMA_ID_BASE}/validation-report.schema.json"),
            valid: failed == 0,
            checked: documents.len(),
            failed,
            documents,
        }
    }
}

pub fn print_report(report: &ValidationReport, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(report),
        OutputFormat::Table => {
            let mut table = new_table(vec!["LINE", "STATUS", "KIND", "DETAIL"]);
            for doc in &report.documents {
                table.add_row(vec![
                    doc.location(),
                    status_text(doc.valid).to_string(),
                    doc.kind.unwrap_or("-").to_string(),
                    doc.error.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
            println!("{} checked, {} failed", report.checked, report.failed);
        }
        OutputFormat::Pretty => {
            for doc in &report.documents {
                match (&doc.kind, &doc.error) {
                    (Some(kind), _) => println!("line {}: ok ({kind})", doc.location()),
                    (None, Some(error)) => println!(
                        "line {}: {} [{}]",
                        doc.location(),
                        error,
                        doc.class.unwrap_or("error")
                    ),
                    (None, None) => println!("line {}: invalid", doc.location()),
                }
            }
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_json_pretty<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw_line(data: &[u8]) {
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(data);
    let _ = out.write_all(b"\n");
    let _ = out.flush();
}

pub fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn status_text(valid: bool) -> &'static str {
    if valid {
        "OK"
    } else {
        "INVALID"
    }
}
