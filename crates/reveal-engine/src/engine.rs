//! Async driver for the reveal state machine.
//!
//! [`SequentialRevealEngine`] owns one driver task per input generation. The
//! task sleeps `speed` between ticks and publishes every change to a watch
//! channel. Restarting aborts the old task and bumps the generation; every
//! publish compares generations under the channel lock, so a tick that was
//! already in flight cannot land in a newer generation.

use crate::config::Speed;
use crate::state::{RevealPhase, RevealSnapshot, RevealState, TickOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Reveals an ordered list of texts one character at a time.
///
/// # Example
///
/// ```ignore
/// let engine = SequentialRevealEngine::start(texts, Speed::default())?;
/// let mut sub = engine.subscribe();
/// while let Some(snapshot) = sub.changed().await {
///     render(&snapshot.revealed);
///     if snapshot.is_done() {
///         break;
///     }
/// }
/// ```
#[derive(Debug)]
pub struct SequentialRevealEngine {
    snapshot_tx: Arc<watch::Sender<RevealSnapshot>>,
    speed_tx: watch::Sender<Speed>,
    texts: Vec<String>,
    generation: u64,
    task: Option<JoinHandle<()>>,
    runtime: Handle,
}

impl SequentialRevealEngine {
    /// Create an idle engine on the current tokio runtime.
    pub fn new(speed: Speed) -> Result<Self, EngineError> {
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        let (snapshot_tx, _) = watch::channel(RevealSnapshot::default());
        let (speed_tx, _) = watch::channel(speed);

        Ok(Self {
            snapshot_tx: Arc::new(snapshot_tx),
            speed_tx,
            texts: Vec::new(),
            generation: 0,
            task: None,
            runtime,
        })
    }

    /// Create an engine and immediately start revealing `texts`.
    pub fn start(texts: Vec<String>, speed: Speed) -> Result<Self, EngineError> {
        let mut engine = Self::new(speed)?;
        engine.initialize(texts);
        Ok(engine)
    }

    /// Discard all progress and start revealing `texts` from the beginning.
    ///
    /// Returns the new generation.
    pub fn initialize(&mut self, texts: Vec<String>) -> u64 {
        self.cancel_pending();

        self.generation += 1;
        let generation = self.generation;
        let state = RevealState::new(texts.clone());
        self.texts = texts;

        // Installing the reset snapshot is what invalidates the old driver.
        self.snapshot_tx
            .send_replace(RevealSnapshot::from_state(generation, &state));

        debug!(
            generation,
            texts = self.texts.len(),
            speed_ms = self.speed().as_millis(),
            "Starting reveal"
        );

        let driver = Driver {
            generation,
            state,
            snapshot_tx: Arc::clone(&self.snapshot_tx),
            speed_rx: self.speed_tx.subscribe(),
        };
        self.task = Some(self.runtime.spawn(driver.run()));
        generation
    }

    /// Restart only if `texts` differs from the current input.
    ///
    /// Returns `true` if a new generation was started.
    pub fn set_texts(&mut self, texts: Vec<String>) -> bool {
        if self.generation > 0 && self.texts == texts {
            return false;
        }
        self.initialize(texts);
        true
    }

    /// Change the cadence without losing progress.
    ///
    /// The pending delay is restarted at the new speed.
    pub fn set_speed(&mut self, speed: Speed) {
        let changed = self.speed_tx.send_if_modified(|current| {
            if *current == speed {
                return false;
            }
            *current = speed;
            true
        });
        if changed {
            debug!(generation = self.generation, speed_ms = speed.as_millis(), "Speed changed");
        }
    }

    /// Current per-character delay.
    pub fn speed(&self) -> Speed {
        *self.speed_tx.borrow()
    }

    /// Current input.
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    /// Current generation (0 before the first input).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> RevealSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Current machine position.
    pub fn phase(&self) -> RevealPhase {
        self.snapshot_tx.borrow().phase
    }

    /// Whether the current generation has finished.
    pub fn is_done(&self) -> bool {
        self.snapshot_tx.borrow().is_done()
    }

    /// Observe snapshots as they are published.
    pub fn subscribe(&self) -> RevealSubscription {
        RevealSubscription {
            rx: self.snapshot_tx.subscribe(),
        }
    }

    /// Cancel any pending tick. The last snapshot stays observable.
    pub fn shutdown(&mut self) {
        if self.cancel_pending() {
            debug!(generation = self.generation, "Reveal cancelled");
        }
    }

    fn cancel_pending(&mut self) -> bool {
        match self.task.take() {
            Some(task) if !task.is_finished() => {
                task.abort();
                true
            }
            _ => false,
        }
    }
}

impl Drop for SequentialRevealEngine {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

/// The task side of one generation.
struct Driver {
    generation: u64,
    state: RevealState,
    snapshot_tx: Arc<watch::Sender<RevealSnapshot>>,
    speed_rx: watch::Receiver<Speed>,
}

impl Driver {
    async fn run(mut self) {
        if self.state.settle() && !self.publish() {
            return;
        }

        while !self.state.is_done() {
            let speed = *self.speed_rx.borrow_and_update();
            tokio::select! {
                () = tokio::time::sleep(speed.delay()) => {}
                changed = self.speed_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    continue;
                }
            }

            let outcome = self.state.tick();
            trace!(
                generation = self.generation,
                text_index = self.state.current_text_index(),
                char_index = self.state.current_char_index(),
                ?outcome,
                "Tick"
            );
            if !outcome.changed() {
                break;
            }
            if !self.publish() {
                debug!(generation = self.generation, "Dropping stale tick");
                return;
            }
        }

        debug!(generation = self.generation, "Reveal finished");
    }

    /// Publish the current state unless a newer generation owns the channel.
    fn publish(&self) -> bool {
        let generation = self.generation;
        let snapshot = RevealSnapshot::from_state(generation, &self.state);
        let mut current_generation = true;
        self.snapshot_tx.send_if_modified(|current| {
            if current.generation != generation {
                current_generation = false;
                return false;
            }
            *current = snapshot;
            true
        });
        current_generation
    }
}

/// Receiving side of an engine's snapshots.
#[derive(Debug, Clone)]
pub struct RevealSubscription {
    rx: watch::Receiver<RevealSnapshot>,
}

impl RevealSubscription {
    /// Latest snapshot, without waiting.
    pub fn snapshot(&self) -> RevealSnapshot {
        self.rx.borrow().clone()
    }

    /// Latest snapshot, marking it seen so [`changed`](Self::changed) only
    /// reports newer ones.
    pub fn latest(&mut self) -> RevealSnapshot {
        self.rx.borrow_and_update().clone()
    }

    /// Wait for the next published snapshot.
    ///
    /// Returns `None` once the engine is gone.
    pub async fn changed(&mut self) -> Option<RevealSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait for a change, with a timeout.
    ///
    /// Returns `true` if a snapshot was published in time.
    pub async fn wait_for_change(&mut self, timeout: Duration) -> bool {
        matches!(tokio::time::timeout(timeout, self.rx.changed()).await, Ok(Ok(())))
    }

    /// Wait until a snapshot satisfies `condition`.
    ///
    /// Returns the snapshot, or `None` on timeout or if the engine is gone.
    pub async fn wait_for<F>(&mut self, condition: F, timeout: Duration) -> Option<RevealSnapshot>
    where
        F: Fn(&RevealSnapshot) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let snapshot = self.rx.borrow_and_update().clone();
            if condition(&snapshot) {
                return Some(snapshot);
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }

            match tokio::time::timeout(remaining, self.rx.changed()).await {
                Ok(Ok(())) => {}
                _ => return None,
            }
        }
    }

    /// Wait until the current generation is fully revealed.
    pub async fn wait_until_done(&mut self, timeout: Duration) -> Option<RevealSnapshot> {
        self.wait_for(RevealSnapshot::is_done, timeout).await
    }
}

/// Errors that can occur when starting an engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No tokio runtime to schedule ticks on.
    #[error("reveal engine must be created inside a tokio runtime")]
    NoRuntime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|t| (*t).to_string()).collect()
    }

    /// Collect every snapshot until the generation finishes.
    async fn collect_until_done(sub: &mut RevealSubscription) -> Vec<RevealSnapshot> {
        let mut frames = Vec::new();
        while let Some(snapshot) = sub.changed().await {
            let done = snapshot.is_done();
            frames.push(snapshot);
            if done {
                break;
            }
        }
        frames
    }

    fn assert_near(elapsed: Duration, ms: u64) {
        let expected = Duration::from_millis(ms);
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(5),
            "expected ~{ms}ms, got {elapsed:?}"
        );
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        assert!(matches!(
            SequentialRevealEngine::new(Speed::default()),
            Err(EngineError::NoRuntime)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_text_timing() {
        let start = Instant::now();
        let engine = SequentialRevealEngine::start(texts(&["Hi"]), Speed::from_millis(30)).unwrap();
        let mut sub = engine.subscribe();
        assert!(sub.snapshot().revealed.is_empty());
        assert_eq!(sub.snapshot().generation, 1);

        let first = sub.changed().await.unwrap();
        assert_eq!(first.revealed, ["H"]);
        assert_near(start.elapsed(), 30);

        let second = sub.changed().await.unwrap();
        assert_eq!(second.revealed, ["Hi"]);
        assert!(second.is_done());
        assert_near(start.elapsed(), 60);

        // Terminal: nothing else arrives.
        assert!(!sub.wait_for_change(Duration::from_secs(1)).await);
        assert!(engine.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_texts_in_order() {
        let engine =
            SequentialRevealEngine::start(texts(&["A", "BC"]), Speed::from_millis(10)).unwrap();
        let mut sub = engine.subscribe();
        let frames: Vec<_> = collect_until_done(&mut sub)
            .await
            .into_iter()
            .map(|s| s.revealed)
            .collect();
        assert_eq!(frames, vec![vec!["A"], vec!["A", "B"], vec!["A", "BC"]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_input_is_immediately_done() {
        let engine = SequentialRevealEngine::start(Vec::new(), Speed::default()).unwrap();
        let mut sub = engine.subscribe();
        let snapshot = sub.snapshot();
        assert!(snapshot.revealed.is_empty());
        assert_eq!(snapshot.phase, RevealPhase::Done);
        assert!(!sub.wait_for_change(Duration::from_secs(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_discards_stale_progress() {
        let mut engine =
            SequentialRevealEngine::start(texts(&["X"]), Speed::from_millis(30)).unwrap();
        let mut sub = engine.subscribe();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let generation = engine.initialize(texts(&["Y", "Z"]));
        assert_eq!(generation, 2);

        let reset = sub.changed().await.unwrap();
        assert_eq!(reset.generation, 2);
        assert!(reset.revealed.is_empty());

        let frames = collect_until_done(&mut sub).await;
        assert!(frames.iter().all(|s| s.generation == 2));
        assert!(frames
            .iter()
            .all(|s| s.revealed.iter().all(|r| !r.contains('X'))));
        let revealed: Vec<_> = frames.into_iter().map(|s| s.revealed).collect();
        assert_eq!(revealed, vec![vec!["Y"], vec!["Y", "Z"]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_text_does_not_stall() {
        let start = Instant::now();
        let engine =
            SequentialRevealEngine::start(texts(&["", "Q"]), Speed::from_millis(10)).unwrap();
        let mut sub = engine.subscribe();

        let done = sub.wait_until_done(Duration::from_secs(1)).await.unwrap();
        assert_eq!(done.revealed, ["", "Q"]);
        assert_near(start.elapsed(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_empty_texts_finish_without_ticks() {
        let start = Instant::now();
        let engine = SequentialRevealEngine::start(texts(&["", ""]), Speed::from_millis(50)).unwrap();
        let mut sub = engine.subscribe();

        let done = sub.wait_until_done(Duration::from_secs(1)).await.unwrap();
        assert_eq!(done.revealed, ["", ""]);
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_texts_ignores_equal_input() {
        let mut engine =
            SequentialRevealEngine::start(texts(&["same"]), Speed::default()).unwrap();
        assert!(!engine.set_texts(texts(&["same"])));
        assert_eq!(engine.generation(), 1);
        assert!(engine.set_texts(texts(&["other"])));
        assert_eq!(engine.generation(), 2);
        assert_eq!(engine.texts(), ["other"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_speed_keeps_progress() {
        let start = Instant::now();
        let mut engine =
            SequentialRevealEngine::start(texts(&["abc"]), Speed::from_millis(100)).unwrap();
        let mut sub = engine.subscribe();

        let first = sub.changed().await.unwrap();
        assert_eq!(first.revealed, ["a"]);
        assert_near(start.elapsed(), 100);

        engine.set_speed(Speed::from_millis(10));
        assert_eq!(engine.speed().as_millis(), 10);

        let frames = collect_until_done(&mut sub).await;
        let revealed: Vec<_> = frames.into_iter().map(|s| s.revealed).collect();
        assert_eq!(revealed, vec![vec!["ab"], vec!["abc"]]);
        assert_near(start.elapsed(), 120);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_ticks() {
        let mut engine =
            SequentialRevealEngine::start(texts(&["abcdef"]), Speed::from_millis(10)).unwrap();
        let mut sub = engine.subscribe();
        sub.wait_for(|s| s.revealed == ["ab"], Duration::from_secs(1))
            .await
            .unwrap();

        engine.shutdown();
        assert!(!sub.wait_for_change(Duration::from_millis(100)).await);
        assert_eq!(engine.snapshot().revealed, ["ab"]);
        assert!(!engine.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_closes_subscription() {
        let engine =
            SequentialRevealEngine::start(texts(&["abcdef"]), Speed::from_millis(10)).unwrap();
        let mut sub = engine.subscribe();
        drop(engine);
        assert!(sub.changed().await.is_none());
        assert!(sub.snapshot().revealed.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_driver_cannot_publish() {
        let (tx, _rx) = watch::channel(RevealSnapshot::default());
        let snapshot_tx = Arc::new(tx);
        let (_speed_tx, speed_rx) = watch::channel(Speed::default());

        // Channel already belongs to generation 2.
        snapshot_tx.send_replace(RevealSnapshot {
            generation: 2,
            ..RevealSnapshot::default()
        });

        let mut state = RevealState::new(texts(&["old"]));
        state.tick();
        let stale = Driver {
            generation: 1,
            state,
            snapshot_tx: Arc::clone(&snapshot_tx),
            speed_rx,
        };

        assert!(!stale.publish());
        let current = snapshot_tx.borrow().clone();
        assert_eq!(current.generation, 2);
        assert!(current.revealed.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshots_never_shrink_within_generation() {
        let input = texts(&["Would you like", "", "sizes 7–11?"]);
        let engine = SequentialRevealEngine::start(input.clone(), Speed::from_millis(3)).unwrap();
        let mut sub = engine.subscribe();
        let frames = collect_until_done(&mut sub).await;

        let mut previous: Vec<usize> = Vec::new();
        for frame in &frames {
            for (i, entry) in frame.revealed.iter().enumerate() {
                assert!(input[i].starts_with(entry.as_str()));
                if let Some(prev) = previous.get(i) {
                    assert!(entry.chars().count() >= *prev);
                }
                if i + 1 < frame.revealed.len() {
                    assert_eq!(entry, &input[i]);
                }
            }
            previous = frame.revealed.iter().map(|e| e.chars().count()).collect();
        }
        assert_eq!(frames.last().unwrap().revealed, input);
    }
}
