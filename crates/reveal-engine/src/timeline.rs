//! Clock-free rendition of a reveal.
//!
//! [`timeline`] yields the exact snapshots the engine publishes for an input,
//! each tagged with its offset from the start. Nothing sleeps; callers that
//! want real time can wait out `at` themselves.

use crate::config::Speed;
use crate::state::{RevealState, TickOutcome};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A snapshot and the moment it appears, relative to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedSnapshot {
    /// Offset from the start of the reveal.
    #[serde(rename = "at_ms", with = "millis")]
    pub at: Duration,

    /// Revealed prefixes at that moment.
    pub revealed: Vec<String>,
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Reset,
    Settle,
    Ticking,
    Done,
}

/// Lazy iterator over the snapshots of one reveal.
#[derive(Debug, Clone)]
pub struct Timeline {
    state: RevealState,
    speed: Speed,
    elapsed: Duration,
    stage: Stage,
}

/// Build the timeline for `texts` at `speed`.
///
/// The first item is always the empty reset snapshot at offset zero. Leading
/// empty texts are settled at offset zero too, then one character appears per
/// `speed` interval until every text is revealed.
pub fn timeline(texts: Vec<String>, speed: Speed) -> Timeline {
    Timeline {
        state: RevealState::new(texts),
        speed,
        elapsed: Duration::ZERO,
        stage: Stage::Reset,
    }
}

impl Timeline {
    /// Total time until the last snapshot, without consuming the iterator.
    pub fn duration(&self) -> Duration {
        let ticks = u32::try_from(self.state.remaining_chars()).unwrap_or(u32::MAX);
        self.elapsed + self.speed.delay() * ticks
    }

    fn emit(&self) -> TimedSnapshot {
        TimedSnapshot {
            at: self.elapsed,
            revealed: self.state.revealed().to_vec(),
        }
    }
}

impl Iterator for Timeline {
    type Item = TimedSnapshot;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stage {
                Stage::Reset => {
                    self.stage = Stage::Settle;
                    return Some(self.emit());
                }
                Stage::Settle => {
                    self.stage = Stage::Ticking;
                    if self.state.settle() {
                        return Some(self.emit());
                    }
                }
                Stage::Ticking => {
                    if self.state.is_done() {
                        self.stage = Stage::Done;
                        continue;
                    }
                    self.elapsed += self.speed.delay();
                    if self.state.tick() == TickOutcome::Finished {
                        self.stage = Stage::Done;
                    }
                    return Some(self.emit());
                }
                Stage::Done => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|t| (*t).to_string()).collect()
    }

    fn at(ms: u64, revealed: &[&str]) -> TimedSnapshot {
        TimedSnapshot {
            at: Duration::from_millis(ms),
            revealed: texts(revealed),
        }
    }

    #[test]
    fn test_single_text_at_default_speed() {
        let frames: Vec<_> = timeline(texts(&["Hi"]), Speed::default()).collect();
        assert_eq!(frames, vec![at(0, &[]), at(30, &["H"]), at(60, &["Hi"])]);
    }

    #[test]
    fn test_two_texts() {
        let frames: Vec<_> = timeline(texts(&["A", "BC"]), Speed::from_millis(10)).collect();
        assert_eq!(
            frames,
            vec![
                at(0, &[]),
                at(10, &["A"]),
                at(20, &["A", "B"]),
                at(30, &["A", "BC"]),
            ]
        );
    }

    #[test]
    fn test_empty_input_yields_only_reset() {
        let frames: Vec<_> = timeline(Vec::new(), Speed::default()).collect();
        assert_eq!(frames, vec![at(0, &[])]);
    }

    #[test]
    fn test_leading_empty_text_costs_no_time() {
        let frames: Vec<_> = timeline(texts(&["", "Q"]), Speed::from_millis(10)).collect();
        assert_eq!(frames, vec![at(0, &[]), at(0, &[""]), at(10, &["", "Q"])]);
    }

    #[test]
    fn test_final_snapshot_matches_input() {
        let input = texts(&["Yes! sizes 7–11.", "", "Want it?"]);
        let last = timeline(input.clone(), Speed::from_millis(5)).last().unwrap();
        assert_eq!(last.revealed, input);
        // 16 + 0 + 8 characters.
        assert_eq!(last.at, Duration::from_millis(24 * 5));
    }

    #[test]
    fn test_duration_matches_last_offset() {
        let line = timeline(texts(&["abc", "de"]), Speed::from_millis(7));
        let expected = line.duration();
        assert_eq!(line.last().unwrap().at, expected);
    }

    #[test]
    fn test_serializes_offset_in_millis() {
        let json = serde_json::to_string(&at(30, &["H"])).unwrap();
        assert_eq!(json, r#"{"at_ms":30,"revealed":["H"]}"#);
    }
}
