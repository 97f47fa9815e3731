//! Rendering of raw and normalized documents for the command line.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use clap::ValueEnum;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Serialization format for command output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// A YAML sequence of documents.
    #[default]
    Yaml,

    /// A pretty-printed JSON array.
    Json,
}

/// Render a list of documents.
pub fn render<T: Serialize>(items: &[T], format: OutputFormat) -> Result<String> {
    let text = match format {
        OutputFormat::Yaml => serde_yaml_ng::to_string(items)?,
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(items)?;
            json.push('\n');
            json
        }
    };
    Ok(text)
}

/// Write rendered documents to `path`, or to stdout when `None`.
pub fn write_documents<T: Serialize>(
    items: &[T],
    format: OutputFormat,
    path: Option<&Path>,
) -> Result<()> {
    let text = render(items, format)?;
    match path {
        Some(path) => fs::write(path, text)?,
        None => io::stdout().lock().write_all(text.as_bytes())?,
    }
    Ok(())
}

/// Read documents written by [`write_documents`].
///
/// YAML is a superset of the JSON output, so both formats load through the
/// YAML parser.
pub fn read_documents<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_yaml_ng::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawDocument;

    fn sample() -> Vec<RawDocument> {
        vec![RawDocument {
            doc: "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<record/>".to_string(),
            source: "pubmedcentral".to_string(),
            doc_id: "oai:pubmedcentral.nih.gov:1".to_string(),
            filetype: "xml".to_string(),
        }]
    }

    #[test]
    fn test_render_json() {
        let json = render(&sample(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["doc_id"], "oai:pubmedcentral.nih.gov:1");
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        for format in [OutputFormat::Yaml, OutputFormat::Json] {
            let path = dir.path().join("raw.out");
            write_documents(&sample(), format, Some(&path)).unwrap();
            let loaded: Vec<RawDocument> = read_documents(&path).unwrap();
            assert_eq!(loaded, sample());
        }
    }
}
