//! CSV rendering, atomic output and read-back of manifest files
//!
//! Layout: the header row `name,md5,download_url` followed by a newline, then
//! one record per entry joined by newlines, with no newline after the last
//! record. Fields containing a comma, quote, CR or LF are quoted with
//! embedded quotes doubled; all other fields are written verbatim.

use std::borrow::Cow;
use std::mem;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::app::models::{Manifest, ManifestEntry};
use crate::constants::manifest as layout;
use crate::errors::{ManifestError, ManifestResult};

/// Output file name for a dataset: `dandiset_<dataset>_manifest.csv`
pub fn manifest_file_name(dataset_id: &str) -> String {
    format!("{}{}{}", layout::FILE_PREFIX, dataset_id, layout::FILE_SUFFIX)
}

/// Quotes a field when it would otherwise break the row
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn render_record(entry: &ManifestEntry) -> String {
    entry
        .fields()
        .iter()
        .map(|field| escape_field(field))
        .collect::<Vec<_>>()
        .join(",")
}

/// Renders the manifest as CSV text
pub fn render_csv(manifest: &Manifest) -> String {
    let records: Vec<String> = manifest.entries().iter().map(render_record).collect();
    format!("{}\n{}", layout::HEADER, records.join("\n"))
}

fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(layout::TEMP_FILE_SUFFIX);
    destination.with_file_name(name)
}

/// Writes the manifest to `destination` via a temp file and rename
///
/// An existing file at `destination` is replaced. On failure the temp file is
/// removed and `destination` is left untouched.
pub async fn write_manifest(manifest: &Manifest, destination: &Path) -> ManifestResult<()> {
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let temp_path = temp_path_for(destination);
    let contents = render_csv(manifest);

    if let Err(e) = write_temp_file(&temp_path, contents.as_bytes()).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }

    if let Err(e) = tokio::fs::rename(&temp_path, destination).await {
        tracing::error!("Rename of {} failed: {}", temp_path.display(), e);
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(ManifestError::AtomicOperationFailed {
            temp_path,
            final_path: destination.to_path_buf(),
        });
    }

    tracing::info!(
        "Wrote {} entries to {}",
        manifest.len(),
        destination.display()
    );
    Ok(())
}

async fn write_temp_file(path: &Path, bytes: &[u8]) -> ManifestResult<()> {
    let mut file = File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}

/// Reads and parses a manifest file
pub async fn read_manifest(path: &Path) -> ManifestResult<Vec<ManifestEntry>> {
    if !path.exists() {
        return Err(ManifestError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let text = tokio::fs::read_to_string(path).await?;
    parse_manifest_csv(&text)
}

/// Parses manifest CSV text back into entries
///
/// Accepts both `\n` and `\r\n` line endings and a trailing newline.
pub fn parse_manifest_csv(text: &str) -> ManifestResult<Vec<ManifestEntry>> {
    let (header, body) = text.split_once('\n').unwrap_or((text, ""));
    let header = header.trim_end_matches('\r');
    if header != layout::HEADER {
        return Err(ManifestError::InvalidHeader {
            expected: layout::HEADER.to_string(),
            found: header.to_string(),
        });
    }

    parse_records(body, 2)?
        .into_iter()
        .map(|(line, fields)| {
            let count = fields.len();
            match <[String; 3]>::try_from(fields) {
                Ok([name, checksum, download_url]) => Ok(ManifestEntry {
                    name,
                    checksum,
                    download_url,
                }),
                Err(_) => Err(ManifestError::InvalidFormat {
                    line,
                    reason: format!("expected 3 fields, found {count}"),
                }),
            }
        })
        .collect()
}

/// Splits CSV text into records, each tagged with its starting line number
fn parse_records(body: &str, first_line: usize) -> ManifestResult<Vec<(usize, Vec<String>)>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut line = first_line;
    let mut record_line = first_line;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() && !quoted => {
                in_quotes = true;
                quoted = true;
            }
            '"' => {
                return Err(ManifestError::InvalidFormat {
                    line,
                    reason: "unexpected quote inside unquoted field".to_string(),
                })
            }
            ',' => {
                record.push(mem::take(&mut field));
                quoted = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                if !(record.is_empty() && field.is_empty() && !quoted) {
                    record.push(mem::take(&mut field));
                    records.push((record_line, mem::take(&mut record)));
                }
                quoted = false;
                line += 1;
                record_line = line;
            }
            _ if quoted => {
                return Err(ManifestError::InvalidFormat {
                    line,
                    reason: "characters after closing quote".to_string(),
                })
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(ManifestError::InvalidFormat {
            line: record_line,
            reason: "unterminated quoted field".to_string(),
        });
    }
    if !(record.is_empty() && field.is_empty() && !quoted) {
        record.push(field);
        records.push((record_line, record));
    }

    Ok(records)
}
