use std::path::Path;

use super::{sort_tail, BeatSource, SourceKind};
use crate::{NoteSpec, Result};

/// Separators accepted in place of a comma.
const ALT_SEPARATORS: [char; 4] = ['，', '；', ';', '\t'];

/// Why a chart record was skipped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("expected at least 3 fields (time,pitch,duration[,lane]), found {found}")]
    TooFewFields { found: usize },
    #[error("field `{field}` is not a valid number: `{value}`")]
    InvalidNumber { field: &'static str, value: String },
}

/// A skipped record together with its 1-based line number.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordIssue {
    pub line: usize,
    pub error: RecordError,
}

impl std::fmt::Display for RecordIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.error)
    }
}

/// Result of parsing a chart: the valid subset plus a diagnostic per skipped
/// line.
#[derive(Debug, Clone, Default)]
pub struct ParsedChart {
    pub notes: Vec<NoteSpec>,
    pub issues: Vec<RecordIssue>,
}

/// Parses the flat `time,pitch,duration[,lane]` format.
///
/// A leading byte-order mark is dropped. Blank and `#` lines are ignored.
/// Malformed records are skipped and reported; lanes are clamped into `[0, lanes)` and negative durations to
/// zero. Notes keep file order; sort them before scheduling.
pub fn parse_chart(text: &str, lanes: usize) -> ParsedChart {
    let max_lane = lanes.max(1) - 1;
    let mut chart = ParsedChart::default();
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_record(line, max_lane) {
            Ok(spec) => chart.notes.push(spec),
            Err(error) => {
                let issue = RecordIssue {
                    line: index + 1,
                    error,
                };
                tracing::warn!(%issue, record = line, "skipping chart record");
                chart.issues.push(issue);
            }
        }
    }

    chart
}

fn parse_record(line: &str, max_lane: usize) -> std::result::Result<NoteSpec, RecordError> {
    let normalized = normalize_separators(line);
    let fields: Vec<&str> = normalized
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();
    if fields.len() < 3 {
        return Err(RecordError::TooFewFields { found: fields.len() });
    }

    let time = parse_float("time", fields[0])?;
    let pitch = parse_int("pitch", fields[1])?;
    let duration = parse_float("duration", fields[2])?.max(0.0);
    let lane = match fields.get(3) {
        Some(raw) => parse_int("lane", raw)?.clamp(0, max_lane as i64) as usize,
        None => 0,
    };
    let pitch = i32::try_from(pitch).map_err(|_| RecordError::InvalidNumber {
        field: "pitch",
        value: fields[1].to_string(),
    })?;

    Ok(NoteSpec::new(time, lane, duration, pitch))
}

fn normalize_separators(line: &str) -> String {
    line.chars()
        .map(|c| if ALT_SEPARATORS.contains(&c) { ',' } else { c })
        .collect()
}

fn parse_float(field: &'static str, raw: &str) -> std::result::Result<f64, RecordError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RecordError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}

fn parse_int(field: &'static str, raw: &str) -> std::result::Result<i64, RecordError> {
    raw.parse::<i64>().map_err(|_| RecordError::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}

/// File-driven source replaying a parsed chart once.
#[derive(Debug, Clone)]
pub struct DeclarativeSource {
    notes: Vec<NoteSpec>,
    issues: Vec<RecordIssue>,
    cursor: usize,
    covered_until: f64,
}

impl DeclarativeSource {
    pub fn from_chart(chart: ParsedChart) -> Self {
        let ParsedChart { mut notes, issues } = chart;
        notes.sort_by(NoteSpec::schedule_cmp);
        Self {
            notes,
            issues,
            cursor: 0,
            covered_until: f64::NEG_INFINITY,
        }
    }

    pub fn parse(text: &str, lanes: usize) -> Self {
        Self::from_chart(parse_chart(text, lanes))
    }

    /// Loads a chart file. Bytes that are not UTF-8 are replaced rather than
    /// rejected, so they only spoil the record they sit in.
    pub fn from_file(path: impl AsRef<Path>, lanes: usize) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let source = Self::parse(&String::from_utf8_lossy(&bytes), lanes);
        tracing::info!(
            path = %path.display(),
            notes = source.notes.len(),
            skipped = source.issues.len(),
            "loaded chart"
        );
        Ok(source)
    }

    pub fn notes(&self) -> &[NoteSpec] {
        &self.notes
    }

    pub fn issues(&self) -> &[RecordIssue] {
        &self.issues
    }

    pub fn remaining(&self) -> usize {
        self.notes.len() - self.cursor
    }
}

impl BeatSource for DeclarativeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Stream
    }

    fn produce_due(&mut self, since: f64, until: f64, out: &mut Vec<NoteSpec>) {
        let start = out.len();
        while let Some(spec) = self.notes.get(self.cursor) {
            if spec.time >= until {
                break;
            }
            if spec.time >= since {
                out.push(*spec);
            } else {
                tracing::debug!(time = spec.time, since, "chart note already behind; not spawned");
            }
            self.cursor += 1;
        }
        self.covered_until = self.covered_until.max(until);
        sort_tail(out, start);
    }

    fn covered_until(&self) -> f64 {
        self.covered_until
    }

    fn reset(&mut self) {
        self.cursor = 0;
        self.covered_until = f64::NEG_INFINITY;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_malformed_lines_and_clamps_fields() {
        let chart = parse_chart("1.0,60,0.5,1\nbad,line\n2.0,-5,0.3,9\n", 4);

        assert_eq!(chart.notes.len(), 2);
        assert_eq!(chart.notes[0], NoteSpec::new(1.0, 1, 0.5, 60));
        assert_eq!(chart.notes[1].lane, 3);
        assert_eq!(chart.notes[1].pitch, -5);
        assert!(chart.notes[1].duration >= 0.0);

        assert_eq!(chart.issues.len(), 1);
        assert_eq!(chart.issues[0].line, 2);
        assert_eq!(chart.issues[0].error, RecordError::TooFewFields { found: 2 });
    }

    #[test]
    fn ignores_comments_blanks_and_normalizes_separators() {
        let text = "# header\n\n0.5;62\t0.25\n1.5，64；0.1,,2\n";
        let chart = parse_chart(text, 4);

        assert!(chart.issues.is_empty());
        assert_eq!(
            chart.notes,
            vec![NoteSpec::new(0.5, 0, 0.25, 62), NoteSpec::new(1.5, 2, 0.1, 64)]
        );
    }

    #[test]
    fn reports_unparsable_numbers_with_field_name() {
        let chart = parse_chart("1.0,abc,0.5\n1.0,60,0.5,x\n3.0,60,-1\n", 4);

        assert_eq!(chart.notes.len(), 1);
        assert_eq!(chart.notes[0].duration, 0.0);
        let fields: Vec<_> = chart
            .issues
            .iter()
            .map(|issue| match &issue.error {
                RecordError::InvalidNumber { field, .. } => *field,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(fields, vec!["pitch", "lane"]);
    }

    #[test]
    fn negative_lane_clamps_to_zero() {
        let chart = parse_chart("1.0,60,0.5,-3", 4);
        assert_eq!(chart.notes[0].lane, 0);
    }

    #[test]
    fn produces_sorted_notes_once() {
        let mut source = DeclarativeSource::parse("3.0,60,0.2\n1.0,61,0.2\n2.0,62,0.2\n", 4);
        let mut out = Vec::new();

        source.produce_due(f64::NEG_INFINITY, 2.5, &mut out);
        assert_eq!(out.iter().map(|n| n.time).collect::<Vec<_>>(), vec![1.0, 2.0]);

        source.produce_due(2.5, 2.5, &mut out);
        assert_eq!(out.len(), 2);

        source.produce_due(2.5, 10.0, &mut out);
        assert_eq!(out.len(), 3);
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn loads_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "0.0,60,0.3,0\n0.5,62,0.3,1\nnope\n").unwrap();

        let source = DeclarativeSource::from_file(file.path(), 2).unwrap();
        assert_eq!(source.notes().len(), 2);
        assert_eq!(source.issues().len(), 1);
    }

    #[test]
    fn leading_byte_order_mark_is_ignored() {
        let chart = parse_chart("\u{FEFF}1.0,60,0.5,1\n2.0,61,0.5,2\n", 4);
        assert!(chart.issues.is_empty());
        assert_eq!(chart.notes[0], NoteSpec::new(1.0, 1, 0.5, 60));
        assert_eq!(chart.notes.len(), 2);

        let chart = parse_chart("\u{FEFF}# header\n1.0,60,0.5,1\n", 4);
        assert!(chart.issues.is_empty());
        assert_eq!(chart.notes.len(), 1);
    }

    #[test]
    fn non_utf8_bytes_only_spoil_their_own_line() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut bytes = b"# ".to_vec();
        bytes.extend_from_slice(&[0xC6, 0xD7, 0xC3, 0xE6]);
        bytes.extend_from_slice(b"\n1.0,60,0.5,1\n2.0,61,0.5,2\n3.0,\xFF,0.5,0\n");
        std::fs::write(file.path(), bytes).unwrap();

        let source = DeclarativeSource::from_file(file.path(), 4).unwrap();
        assert_eq!(source.notes().len(), 2);
        assert_eq!(source.issues().len(), 1);
        assert_eq!(source.issues()[0].line, 4);
    }
}
