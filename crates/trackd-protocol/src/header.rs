//! Record header patterns and the byte-at-a-time matcher used while hunting
//! for synchronization.

use crate::station::station_index;

/// One position of a record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderElement {
    /// Exactly this byte.
    Literal(u8),
    /// A station id character (`1`-`9`, `A`-`Z`, `a`-`z`).
    StationId,
    /// Any byte.
    Any,
}

impl HeaderElement {
    pub fn matches(self, byte: u8) -> bool {
        match self {
            HeaderElement::Literal(expected) => byte == expected,
            HeaderElement::StationId => station_index(byte).is_some(),
            HeaderElement::Any => true,
        }
    }
}

/// Fixed-length sequence of header elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPattern {
    elements: Vec<HeaderElement>,
}

impl HeaderPattern {
    pub fn new(elements: impl Into<Vec<HeaderElement>>) -> Self {
        Self {
            elements: elements.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Validate a complete header in place.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        bytes.len() == self.elements.len() && self.matches_prefix(bytes)
    }

    /// True if `bytes` matches the first `bytes.len()` elements.
    pub fn matches_prefix(&self, bytes: &[u8]) -> bool {
        bytes.len() <= self.elements.len()
            && self
                .elements
                .iter()
                .zip(bytes)
                .all(|(element, &byte)| element.matches(byte))
    }
}

/// Outcome of feeding one byte to a [`HeaderMatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStep {
    /// Still hunting; the value is the length of the current partial match.
    Partial(usize),
    /// A full header has been matched; read it with [`HeaderMatcher::header`].
    Complete,
}

/// Incremental header matcher.
///
/// On a mismatch the matcher falls back to the longest suffix of the bytes
/// seen so far that is still a valid header prefix, so a header starting
/// inside a failed partial match is not missed.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    pattern: HeaderPattern,
    history: Vec<u8>,
}

impl HeaderMatcher {
    pub fn new(pattern: HeaderPattern) -> Self {
        let capacity = pattern.len();
        Self {
            pattern,
            history: Vec::with_capacity(capacity),
        }
    }

    pub fn pattern(&self) -> &HeaderPattern {
        &self.pattern
    }

    /// Number of header bytes currently matched.
    pub fn matched(&self) -> usize {
        self.history.len()
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// The matched header after [`MatchStep::Complete`].
    pub fn header(&self) -> &[u8] {
        &self.history
    }

    pub fn feed(&mut self, byte: u8) -> MatchStep {
        if self.history.len() == self.pattern.len() {
            self.history.clear();
        }
        self.history.push(byte);
        if !self.pattern.matches_prefix(&self.history) {
            let start = (1..self.history.len())
                .find(|&k| self.pattern.matches_prefix(self.history.get(k..).unwrap_or_default()))
                .unwrap_or(self.history.len());
            self.history.drain(..start);
        }
        if self.history.len() == self.pattern.len() {
            MatchStep::Complete
        } else {
            MatchStep::Partial(self.history.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use HeaderElement::*;

    fn pattern() -> HeaderPattern {
        HeaderPattern::new([Literal(b'\r'), Literal(b'\n'), Literal(b'0'), StationId, Any])
    }

    fn feed_all(matcher: &mut HeaderMatcher, bytes: &[u8]) -> Vec<usize> {
        bytes
            .iter()
            .enumerate()
            .filter(|&(_, &b)| matcher.feed(b) == MatchStep::Complete)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_matches_after_garbage() {
        let mut matcher = HeaderMatcher::new(pattern());
        let hits = feed_all(&mut matcher, b"xyz\r\n01 ");
        assert_eq!(hits, vec![7]);
        assert_eq!(matcher.header(), b"\r\n01 ");
    }

    #[test]
    fn test_restart_inside_partial_match() {
        let mut matcher = HeaderMatcher::new(pattern());
        // first attempt fails at the station byte, second CR starts a new match
        let hits = feed_all(&mut matcher, b"\r\n0\r\n0A ");
        assert_eq!(hits, vec![7]);
        assert_eq!(matcher.header(), b"\r\n0A ");
    }

    #[test]
    fn test_invalid_station_rejected() {
        let mut matcher = HeaderMatcher::new(pattern());
        assert!(feed_all(&mut matcher, b"\r\n0# ").is_empty());
        assert_eq!(matcher.matched(), 0);
    }

    #[test]
    fn test_in_place_validation() {
        let p = pattern();
        assert!(p.matches(b"\r\n0z\x00"));
        assert!(!p.matches(b"\r\n0z"));
        assert!(!p.matches(b"\n\n0z "));
        assert!(p.matches_prefix(b"\r\n"));
    }

    #[test]
    fn test_back_to_back_headers() {
        let mut matcher = HeaderMatcher::new(pattern());
        let hits = feed_all(&mut matcher, b"\r\n01 \r\n02 ");
        assert_eq!(hits, vec![4, 9]);
    }
}
