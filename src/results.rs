use std::time::Duration;

/// Summary of a completed scan.
///
/// Match records themselves go to the output writer; this is the caller-facing
/// accounting that remains once the scan is done.
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// Records routed to the output, duplicates included. In buffered modes
    /// the emitted list can be shorter than this after deduplication.
    pub matches: usize,

    /// Non-directory entries the walk encountered (matched or not).
    pub files: usize,

    /// Directories the walk encountered.
    pub dirs: usize,

    /// Wall-clock time from scan start to the last worker settling.
    pub duration: Duration,
}
