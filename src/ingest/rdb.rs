//! Binary reference databases (RDB), read through an external decoder tool.
//!
//! The tool is run as `<tool> <file> list` and prints one JSON object per line. Exit codes 0 and
//! 1 are both normal for it; anything else, or any output on stderr, fails the document.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::process::Command;

use crate::engine::tools::{decode_hex, file_stem_of, path_to_db_string};
use crate::utils::config::RDB_TOOL_LIST_ARG;
use crate::{Collection, Item, ParsedRdb};

/// One decoded record. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
struct RdbRecord {
    name: Option<String>,
    crc: Option<String>,
    md5: Option<String>,
    sha1: Option<String>,
    #[serde(default)]
    size: Option<Value>,
}

fn size_of(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl RdbRecord {
    /// An item needs a name and at least one hash.
    fn into_item(self, collection: usize) -> Option<Item> {
        let name = self.name.filter(|n| !n.is_empty())?;
        let sha1 = self.sha1.as_deref().and_then(decode_hex);
        let md5 = self.md5.as_deref().and_then(decode_hex);
        let crc32 = self.crc.as_deref().and_then(decode_hex);
        if sha1.is_none() && md5.is_none() && crc32.is_none() {
            return None;
        }
        Some(Item {
            collection,
            name,
            sha1,
            md5,
            crc32,
            size: self.size.as_ref().and_then(size_of),
        })
    }
}

/// Turn the tool's stdout into items. Blank and malformed lines are dropped.
pub fn parse_listing(stdout: &str, collection: usize) -> Vec<Item> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_str::<RdbRecord>(line).ok())
        .filter_map(|record| record.into_item(collection))
        .collect()
}

/// Run the decoder on `path` and collect one [`Collection`] with its items.
pub fn read_rdb_file(tool: &Path, path: &Path) -> Result<ParsedRdb> {
    let output = Command::new(tool)
        .arg(path)
        .arg(RDB_TOOL_LIST_ARG)
        .output()
        .with_context(|| format!("run {} on {}", tool.display(), path.display()))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    let code = output.status.code();
    if !matches!(code, Some(0 | 1)) || !stderr.is_empty() {
        bail!(
            "{} failed on {} (exit code {}): {}",
            tool.display(),
            path.display(),
            code.map_or_else(|| "none".to_string(), |c| c.to_string()),
            stderr.trim()
        );
    }

    let filepath = path_to_db_string(path);
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(ParsedRdb {
        collections: vec![Collection {
            filepath: filepath.clone(),
            name: file_stem_of(path),
        }],
        items: parse_listing(&stdout, 0),
        filepath,
    })
}
