//! Record sources: the built-in demo batch and JSONL files.
//!
//! JSONL rows look like `{"text": "...", "metadata": {"key": "value" | ["a", "b"]}}`.
//! Empty lines are skipped; a malformed row fails the whole read with the
//! 1-based line number.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info};

use crate::errors::RagError;
use crate::record::{Metadata, MetadataValue, Record};

/// The two-record demo batch. The metadata keeps the embedded text under
/// `textToEmbed` next to the descriptive fields.
pub fn default_records() -> Vec<Record> {
    vec![
        demo_record(
            "My dog's name is Steve.",
            &["playing fetch", "running in the park"],
            "July 19, 2023",
        ),
        demo_record(
            "My cat's name is Sandy.",
            &["napping", "chasing laser pointers"],
            "August 7, 2019",
        ),
    ]
}

fn demo_record(text: &str, activities: &[&str], born: &str) -> Record {
    let mut metadata = Metadata::new();
    metadata.insert("textToEmbed".into(), MetadataValue::from(text));
    metadata.insert(
        "favouriteActivities".into(),
        MetadataValue::from(activities.to_vec()),
    );
    metadata.insert("born".into(), MetadataValue::from(born));
    Record {
        text: text.to_string(),
        metadata,
    }
}

/// Reads records from a JSONL file.
///
/// # Errors
/// - [`RagError::Io`] if the file cannot be read.
/// - [`RagError::Parse`] if a non-empty line is not a valid record.
pub fn read_records(jsonl_path: impl AsRef<Path>) -> Result<Vec<Record>, RagError> {
    info!("Reading records JSONL: {:?}", jsonl_path.as_ref());

    let reader = BufReader::new(File::open(jsonl_path.as_ref())?);
    let mut out = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(&line).map_err(|source| RagError::Parse {
            line: i + 1,
            source,
        })?;
        out.push(record);
    }

    debug!("Loaded {} records", out.len());
    Ok(out)
}
