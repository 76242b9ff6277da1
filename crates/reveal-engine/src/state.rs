//! Reveal state and the tick algorithm.
//!
//! A [`RevealState`] tracks how far through an ordered list of texts the
//! reveal has progressed. Each [`tick`](RevealState::tick) reveals exactly one
//! more character; completed and empty texts are stepped over without costing
//! a tick. Character counts are Unicode scalar values, not display width.

use serde::{Deserialize, Serialize};

/// Progress of one reveal over one input list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealState {
    texts: Vec<String>,

    /// Index of the text being revealed; `texts.len()` once finished.
    current_text_index: usize,

    /// Characters of the current text already revealed.
    current_char_index: usize,

    /// Byte offset matching `current_char_index` in the current text.
    byte_offset: usize,

    /// One entry per started text, each a prefix of its text.
    revealed: Vec<String>,
}

/// What a single [`RevealState::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// One character was revealed and more remain.
    Revealed,
    /// The state changed and is now terminal.
    Finished,
    /// Already terminal; nothing changed.
    Idle,
}

impl TickOutcome {
    /// Whether the tick changed what a host would render.
    pub fn changed(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Position of the reveal state machine within one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RevealPhase {
    /// No input has been supplied yet.
    #[default]
    Idle,
    /// Characters remain to be revealed.
    Revealing {
        text_index: usize,
        char_index: usize,
    },
    /// Every text is fully revealed.
    Done,
}

impl std::fmt::Display for RevealPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Revealing {
                text_index,
                char_index,
            } => write!(f, "revealing text {text_index} at char {char_index}"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// What the host sees: the revealed prefixes, tagged with their generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RevealSnapshot {
    /// Input generation this snapshot belongs to (0 before any input).
    pub generation: u64,

    /// Revealed prefix of each started text, in order.
    pub revealed: Vec<String>,

    /// Machine position when the snapshot was taken.
    pub phase: RevealPhase,
}

impl RevealSnapshot {
    /// Capture the observable part of `state`.
    pub fn from_state(generation: u64, state: &RevealState) -> Self {
        Self {
            generation,
            revealed: state.revealed.clone(),
            phase: state.phase(),
        }
    }

    /// Whether this snapshot is terminal for its generation.
    pub fn is_done(&self) -> bool {
        self.phase == RevealPhase::Done
    }
}

impl RevealState {
    /// Create a fresh state for `texts` with nothing revealed.
    pub fn new(texts: Vec<String>) -> Self {
        Self {
            texts,
            current_text_index: 0,
            current_char_index: 0,
            byte_offset: 0,
            revealed: Vec::new(),
        }
    }

    /// The full input texts.
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    /// The revealed prefixes so far.
    pub fn revealed(&self) -> &[String] {
        &self.revealed
    }

    /// Index of the text currently being revealed.
    pub fn current_text_index(&self) -> usize {
        self.current_text_index
    }

    /// Characters of the current text revealed so far.
    pub fn current_char_index(&self) -> usize {
        self.current_char_index
    }

    /// Whether every text has been fully revealed.
    pub fn is_done(&self) -> bool {
        self.current_text_index >= self.texts.len()
    }

    /// Current machine position.
    pub fn phase(&self) -> RevealPhase {
        if self.is_done() {
            RevealPhase::Done
        } else {
            RevealPhase::Revealing {
                text_index: self.current_text_index,
                char_index: self.current_char_index,
            }
        }
    }

    /// Step past every text that has nothing left to reveal.
    ///
    /// Empty texts passed over get an empty entry in `revealed`. Returns
    /// `true` if any entry was added.
    pub fn settle(&mut self) -> bool {
        let mut changed = false;
        while let Some(text) = self.texts.get(self.current_text_index) {
            if self.byte_offset < text.len() {
                break;
            }
            if self.revealed.len() <= self.current_text_index {
                self.revealed.push(String::new());
                changed = true;
            }
            self.current_text_index += 1;
            self.current_char_index = 0;
            self.byte_offset = 0;
        }
        changed
    }

    /// Reveal the next character.
    ///
    /// Finished texts are settled before and after the reveal, so index bumps
    /// never cost a tick of their own and the state turns terminal as soon as
    /// the last character is shown.
    pub fn tick(&mut self) -> TickOutcome {
        let settled = self.settle();

        // The terminal check must come before any indexed access.
        let next = self
            .texts
            .get(self.current_text_index)
            .and_then(|text| text[self.byte_offset..].chars().next());
        let Some(ch) = next else {
            return if settled {
                TickOutcome::Finished
            } else {
                TickOutcome::Idle
            };
        };

        match self.revealed.get_mut(self.current_text_index) {
            Some(entry) => entry.push(ch),
            None => self.revealed.push(ch.to_string()),
        }
        self.byte_offset += ch.len_utf8();
        self.current_char_index += 1;

        self.settle();
        if self.is_done() {
            TickOutcome::Finished
        } else {
            TickOutcome::Revealed
        }
    }

    /// Characters still to be revealed across all remaining texts.
    pub fn remaining_chars(&self) -> usize {
        let Some(current) = self.texts.get(self.current_text_index) else {
            return 0;
        };
        let rest: usize = self.texts[self.current_text_index + 1..]
            .iter()
            .map(|t| t.chars().count())
            .sum();
        current[self.byte_offset..].chars().count() + rest
    }
}
