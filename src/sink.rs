use std::collections::HashSet;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde::Serialize;

use crate::request::{OutputMode, RecordFormat};

// ---------------------------------------------------------------------------
// ResultSet
// ---------------------------------------------------------------------------

/// Insertion-ordered, duplicate-suppressing record collection.
///
/// Insertion order is "first completion wins" — whichever worker produced a
/// record first keeps its slot; later duplicates are dropped silently.
#[derive(Default)]
struct ResultSet {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl ResultSet {
    fn insert(&mut self, record: String) {
        if self.seen.insert(record.clone()) {
            self.order.push(record);
        }
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Shape of one JSON-lines record.
#[derive(Serialize)]
struct JsonRecord<'a> {
    path: &'a str,
}

enum Regime {
    /// Write-through. No dedup: an identical manifest reachable via several
    /// branches is reported once per branch. Intentional — streaming output
    /// is a live feed, not an aggregate.
    Stream(RecordFormat),
    Buffered {
        format: Option<RecordFormat>, // None = one JSON array
        set: Mutex<ResultSet>,
    },
}

/// Terminal for every match record a scan produces.
///
/// Shared by reference across all workers. The output stream sits behind a
/// mutex so a record is always written as one atomic unit — concurrent
/// producers may interleave *records*, never bytes within one.
pub(crate) struct Sink<'w> {
    regime: Regime,
    out: Mutex<&'w mut (dyn Write + Send)>,
    matches: AtomicUsize,
}

impl<'w> Sink<'w> {
    pub(crate) fn new(mode: OutputMode, out: &'w mut (dyn Write + Send)) -> Self {
        let regime = match mode {
            OutputMode::Stream(format) => Regime::Stream(format),
            OutputMode::Buffered(format) => Regime::Buffered {
                format: Some(format),
                set: Mutex::default(),
            },
            OutputMode::JsonArray => Regime::Buffered {
                format: None,
                set: Mutex::default(),
            },
        };
        Self {
            regime,
            out: Mutex::new(out),
            matches: AtomicUsize::new(0),
        }
    }

    /// Route one match record. Streaming writes it now; buffered mode files
    /// it for [`finish`](Sink::finish).
    pub(crate) fn push(&self, record: String) {
        self.matches.fetch_add(1, Ordering::Relaxed);
        match &self.regime {
            Regime::Stream(format) => {
                if let Ok(mut out) = self.out.lock() {
                    write_record(&mut **out, *format, &record);
                }
            }
            Regime::Buffered { set, .. } => {
                if let Ok(mut set) = set.lock() {
                    set.insert(record);
                }
            }
        }
    }

    /// Emit buffered output. Call exactly once, after every dispatched unit
    /// of work has settled, and only when the scan was not cancelled — a
    /// cancelled buffered scan emits nothing.
    pub(crate) fn finish(self) {
        let Regime::Buffered { format, set } = self.regime else {
            return;
        };
        let set = set.into_inner().unwrap_or_default();
        let Ok(out) = self.out.into_inner() else {
            return;
        };
        match format {
            Some(format) => {
                for record in &set.order {
                    write_record(&mut *out, format, record);
                }
            }
            None => {
                let _ = serde_json::to_writer_pretty(&mut *out, &set.order);
                let _ = out.write_all(b"\n");
            }
        }
    }

    /// Total records routed through this sink, duplicates included.
    pub(crate) fn matches(&self) -> usize {
        self.matches.load(Ordering::Relaxed)
    }
}

// Output failures are not scan failures; a closed pipe should not turn a
// clean scan into an error.
fn write_record(out: &mut dyn Write, format: RecordFormat, record: &str) {
    match format {
        RecordFormat::Plain => {
            let _ = writeln!(out, "{record}");
        }
        RecordFormat::NullTerminated => {
            let _ = out.write_all(record.as_bytes());
            let _ = out.write_all(&[0]);
        }
        RecordFormat::JsonLines => {
            if let Ok(line) = serde_json::to_string(&JsonRecord { path: record }) {
                let _ = writeln!(out, "{line}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
