//! Stream resynchronization for fixed-size records with a textual header.
//!
//! While [`SyncState::Syncing`], bytes go one at a time through a
//! [`HeaderMatcher`]; a full header match is followed by a bulk read of the
//! record body. Once [`SyncState::Synchronized`], the next record's header is
//! read at its expected offset and validated in place. A header that fails
//! validation drops the record and falls back to hunting, starting from the
//! byte after the rejected header start, so lock is regained within one
//! record length.

use std::collections::VecDeque;

use tracing::trace;

use crate::header::{HeaderMatcher, HeaderPattern, MatchStep};

/// How records of one protocol are framed.
pub trait RecordFormat {
    fn header(&self) -> &HeaderPattern;

    /// Full record length, header included, for a header that matched the
    /// pattern. `None` rejects the header.
    fn record_len(&self, header: &[u8]) -> Option<usize>;
}

/// Public synchronization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Syncing,
    Synchronized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Matching header bytes one at a time.
    Hunting,
    /// Header matched while hunting; reading the body.
    Acquiring,
    /// Locked; reading the next header for in-place validation.
    Header,
    /// Locked with a valid header; reading the body.
    Body,
}

/// Counters kept by a [`RecordSync`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub records: u64,
    pub discarded: u64,
    pub resyncs: u64,
    pub skipped_bytes: u64,
}

/// Push-based record synchronizer.
#[derive(Debug)]
pub struct RecordSync<F: RecordFormat> {
    format: F,
    matcher: HeaderMatcher,
    phase: Phase,
    pending: VecDeque<u8>,
    record: Vec<u8>,
    record_len: usize,
    stats: SyncStats,
}

impl<F: RecordFormat> RecordSync<F> {
    pub fn new(format: F) -> Self {
        let matcher = HeaderMatcher::new(format.header().clone());
        Self {
            format,
            matcher,
            phase: Phase::Hunting,
            pending: VecDeque::new(),
            record: Vec::new(),
            record_len: 0,
            stats: SyncStats::default(),
        }
    }

    pub fn format(&self) -> &F {
        &self.format
    }

    pub fn state(&self) -> SyncState {
        match self.phase {
            Phase::Hunting | Phase::Acquiring => SyncState::Syncing,
            Phase::Header | Phase::Body => SyncState::Synchronized,
        }
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Drop lock and any partial record, e.g. after a device reset.
    pub fn reset(&mut self) {
        self.phase = Phase::Hunting;
        self.matcher.reset();
        self.pending.clear();
        self.record.clear();
        self.record_len = 0;
    }

    /// Feed received bytes, calling `on_record` for every complete record.
    /// Returns the number of records delivered.
    pub fn feed(&mut self, bytes: &[u8], mut on_record: impl FnMut(&[u8])) -> usize {
        self.pending.extend(bytes);
        let mut delivered = 0;
        while !self.pending.is_empty() {
            match self.phase {
                Phase::Hunting => self.hunt(),
                Phase::Acquiring | Phase::Body => {
                    if self.fill(self.record_len) {
                        on_record(&self.record);
                        delivered += 1;
                        self.stats.records += 1;
                        self.record.clear();
                        self.phase = Phase::Header;
                    }
                }
                Phase::Header => {
                    let header_len = self.format.header().len();
                    if self.fill(header_len) {
                        self.validate_header();
                    }
                }
            }
        }
        delivered
    }

    fn hunt(&mut self) {
        while let Some(byte) = self.pending.pop_front() {
            if self.matcher.feed(byte) == MatchStep::Complete {
                let header = self.matcher.header();
                match self.format.record_len(header) {
                    Some(len) if len >= header.len() && len > 0 => {
                        self.record.clear();
                        self.record.extend_from_slice(header);
                        self.record_len = len;
                        self.matcher.reset();
                        self.phase = Phase::Acquiring;
                        return;
                    }
                    _ => {
                        let rejected = header.to_vec();
                        self.stats.skipped_bytes += 1;
                        self.matcher.reset();
                        self.requeue_after_first(rejected);
                        return;
                    }
                }
            }
            if self.matcher.matched() == 0 {
                self.stats.skipped_bytes += 1;
            }
        }
    }

    /// Move bytes from `pending` into `record` until it holds `len` bytes.
    fn fill(&mut self, len: usize) -> bool {
        let missing = len.saturating_sub(self.record.len());
        let take = missing.min(self.pending.len());
        self.record.extend(self.pending.drain(..take));
        self.record.len() >= len
    }

    fn validate_header(&mut self) {
        let valid_len = if self.format.header().matches(&self.record) {
            self.format.record_len(&self.record)
        } else {
            None
        };
        match valid_len {
            Some(len) if len >= self.record.len() && len > 0 => {
                self.record_len = len;
                self.phase = Phase::Body;
            }
            _ => {
                trace!(header = ?self.record, "Record header mismatch, resynchronizing");
                self.stats.discarded += 1;
                self.stats.resyncs += 1;
                let rejected = std::mem::take(&mut self.record);
                self.requeue_after_first(rejected);
                self.matcher.reset();
                self.phase = Phase::Hunting;
            }
        }
    }

    /// Put everything but the first byte of `bytes` back in front of `pending`.
    fn requeue_after_first(&mut self, bytes: Vec<u8>) {
        for &byte in bytes.iter().skip(1).rev() {
            self.pending.push_front(byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HeaderElement::*;

    /// `#` + digit header, 4-byte records.
    struct Tiny;

    impl RecordFormat for Tiny {
        fn header(&self) -> &HeaderPattern {
            static PATTERN: std::sync::OnceLock<HeaderPattern> = std::sync::OnceLock::new();
            PATTERN.get_or_init(|| HeaderPattern::new([Literal(b'#'), Any]))
        }

        fn record_len(&self, header: &[u8]) -> Option<usize> {
            header.get(1).filter(|b| b.is_ascii_digit()).map(|_| 4)
        }
    }

    fn collect(sync: &mut RecordSync<Tiny>, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        sync.feed(bytes, |r| out.push(r.to_vec()));
        out
    }

    #[test]
    fn test_locks_after_garbage() {
        let mut sync = RecordSync::new(Tiny);
        assert_eq!(sync.state(), SyncState::Syncing);
        let records = collect(&mut sync, b"zz#1ab#2cd");
        assert_eq!(records, vec![b"#1ab".to_vec(), b"#2cd".to_vec()]);
        assert_eq!(sync.state(), SyncState::Synchronized);
        assert_eq!(sync.stats().records, 2);
    }

    #[test]
    fn test_split_delivery() {
        let mut sync = RecordSync::new(Tiny);
        let mut records = collect(&mut sync, b"#1");
        assert!(records.is_empty());
        records.extend(collect(&mut sync, b"a"));
        records.extend(collect(&mut sync, b"b#"));
        records.extend(collect(&mut sync, b"2cd"));
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_bad_header_resyncs_within_one_record() {
        let mut sync = RecordSync::new(Tiny);
        let records = collect(&mut sync, b"#1ab!2cd#3ef");
        assert_eq!(records, vec![b"#1ab".to_vec(), b"#3ef".to_vec()]);
        assert_eq!(sync.stats().discarded, 1);
        assert_eq!(sync.state(), SyncState::Synchronized);
    }

    #[test]
    fn test_header_rejected_by_length_while_hunting() {
        let mut sync = RecordSync::new(Tiny);
        // "#x" matches the pattern but is rejected by the format
        let records = collect(&mut sync, b"#x#1ab");
        assert_eq!(records, vec![b"#1ab".to_vec()]);
    }

    #[test]
    fn test_reset_drops_lock() {
        let mut sync = RecordSync::new(Tiny);
        collect(&mut sync, b"#1ab#2");
        sync.reset();
        assert_eq!(sync.state(), SyncState::Syncing);
        assert_eq!(collect(&mut sync, b"cd#3ef"), vec![b"#3ef".to_vec()]);
    }
}
