use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{NoteSpec, Result};

/// Formatting options for chart export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    /// Digits after the decimal point for time and duration.
    pub precision: usize,
    /// Comment written as the first line, prefixed with `#`.
    pub header: Option<String>,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            precision: 4,
            header: Some("time,pitch,duration,lane".to_string()),
        }
    }
}

/// Writes notes in the `time,pitch,duration,lane` chart format understood by
/// [`crate::DeclarativeSource`].
pub fn write_chart<W: Write>(mut out: W, notes: &[NoteSpec], settings: &ChartSettings) -> Result<()> {
    if let Some(header) = &settings.header {
        for line in header.lines() {
            writeln!(out, "# {line}")?;
        }
    }
    let p = settings.precision;
    for note in notes {
        writeln!(
            out,
            "{:.p$},{},{:.p$},{}",
            note.time, note.pitch, note.duration, note.lane
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Writes `notes` to `path`, replacing any existing file. Returns the number
/// of records written.
pub fn export_chart(path: impl AsRef<Path>, notes: &[NoteSpec], settings: &ChartSettings) -> Result<usize> {
    let path = path.as_ref();
    let file = std::fs::File::create(path)?;
    write_chart(BufWriter::new(file), notes, settings)?;
    tracing::info!(path = %path.display(), notes = notes.len(), "chart exported");
    Ok(notes.len())
}
