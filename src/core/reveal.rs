/// Reveal engine — cancellable, pausable, tick-driven typewriter tasks.
///
/// A task never sleeps on its own. The host feeds elapsed time through
/// `RevealTask::tick` and gets back the steps that became due.
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RevealError {
    #[error("reveal task {0} is still revealing")]
    AlreadyRevealing(u64),
    #[error("reveal task {0} has nothing left to resume")]
    NothingToResume(u64),
}

/// Lifecycle of a single reveal task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealPhase {
    /// Characters are still being emitted.
    Revealing,
    /// Emission suspended; `RevealEngine::resume` continues it.
    Paused,
    /// Full text shown, waiting out the post-complete delay.
    Lingering,
    /// Finished. No further steps will be produced.
    Complete,
    /// Stopped before finishing. Already-emitted text stays as it was.
    Cancelled,
}

impl RevealPhase {
    /// Whether the task may still produce steps.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Revealing | Self::Paused | Self::Lingering)
    }
}

/// Output of a reveal task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealStep {
    /// A growing prefix of the line.
    Partial(String),
    /// The full line. Emitted once on natural completion and again by
    /// every `complete` call.
    Finished(String),
    /// The post-complete delay elapsed; the owner should move on.
    AutoAdvance,
}

#[derive(Debug)]
struct RevealShared {
    id: u64,
    phase: Cell<RevealPhase>,
}

/// Read-only view of a task's lifecycle, kept alive after the task itself
/// has been replaced.
#[derive(Debug, Clone)]
pub struct RevealHandle {
    shared: Rc<RevealShared>,
}

impl RevealHandle {
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn phase(&self) -> RevealPhase {
        self.shared.phase.get()
    }

    pub fn is_live(&self) -> bool {
        self.phase().is_live()
    }

    pub fn is_done(&self) -> bool {
        !self.is_live()
    }

    pub fn is_cancelled(&self) -> bool {
        self.phase() == RevealPhase::Cancelled
    }
}

/// One in-flight reveal of one line.
#[derive(Debug)]
pub struct RevealTask {
    handle: RevealHandle,
    text: String,
    /// Byte offset just past each char, so prefixes never split UTF-8.
    boundaries: Vec<usize>,
    shown: usize,
    per_char: Duration,
    post_complete: Duration,
    timer: Duration,
}

impl RevealTask {
    pub fn handle(&self) -> RevealHandle {
        self.handle.clone()
    }

    pub fn id(&self) -> u64 {
        self.handle.id()
    }

    pub fn phase(&self) -> RevealPhase {
        self.handle.phase()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of chars currently visible.
    pub fn shown_chars(&self) -> usize {
        self.shown
    }

    pub fn total_chars(&self) -> usize {
        self.boundaries.len()
    }

    pub fn visible_text(&self) -> &str {
        match self.shown {
            0 => "",
            n => &self.text[..self.boundaries[n - 1]],
        }
    }

    fn set_phase(&self, phase: RevealPhase) {
        self.handle.shared.phase.set(phase);
    }

    /// Advance the task by `elapsed` and return whatever became due.
    ///
    /// A zero per-char delay reveals the whole line in one step.
    pub fn tick(&mut self, elapsed: Duration) -> Vec<RevealStep> {
        let mut steps = Vec::new();
        match self.phase() {
            RevealPhase::Revealing => {
                let total = self.total_chars();
                self.timer += elapsed;
                if self.per_char.is_zero() {
                    self.shown = total;
                } else {
                    while self.shown < total && self.timer >= self.per_char {
                        self.timer -= self.per_char;
                        self.shown += 1;
                        if self.shown < total {
                            steps.push(RevealStep::Partial(self.visible_text().to_string()));
                        }
                    }
                }
                if self.shown >= total {
                    self.finish(&mut steps);
                }
            }
            RevealPhase::Lingering => {
                self.timer += elapsed;
                self.linger(&mut steps);
            }
            RevealPhase::Paused | RevealPhase::Complete | RevealPhase::Cancelled => {}
        }
        steps
    }

    /// `timer` holds the time elapsed since the last char came due, so the
    /// linger starts at the moment the line completed.
    fn finish(&mut self, steps: &mut Vec<RevealStep>) {
        steps.push(RevealStep::Finished(self.text.clone()));
        if self.post_complete.is_zero() {
            self.set_phase(RevealPhase::Complete);
        } else {
            self.set_phase(RevealPhase::Lingering);
            self.linger(steps);
        }
    }

    fn linger(&mut self, steps: &mut Vec<RevealStep>) {
        if self.timer >= self.post_complete {
            self.timer -= self.post_complete;
            self.set_phase(RevealPhase::Complete);
            steps.push(RevealStep::AutoAdvance);
        }
    }

    /// Time left over from the tick that produced `AutoAdvance`. The owner
    /// feeds it to the next task.
    pub fn surplus(&self) -> Duration {
        match self.phase() {
            RevealPhase::Complete if !self.post_complete.is_zero() => self.timer,
            _ => Duration::ZERO,
        }
    }

    /// Jump straight to the full text. Also drops a pending auto-advance.
    ///
    /// Idempotent: every call on a non-cancelled task returns the same
    /// full text.
    pub fn complete(&mut self) -> Option<RevealStep> {
        if self.phase() == RevealPhase::Cancelled {
            return None;
        }
        self.shown = self.total_chars();
        self.set_phase(RevealPhase::Complete);
        Some(RevealStep::Finished(self.text.clone()))
    }

    /// Stop producing steps. A task that already completed stays complete.
    pub fn cancel(&mut self) {
        if self.phase().is_live() {
            self.set_phase(RevealPhase::Cancelled);
        }
    }

    /// Suspend emission. Returns false unless the task was revealing.
    pub fn pause(&mut self) -> bool {
        if self.phase() == RevealPhase::Revealing {
            self.set_phase(RevealPhase::Paused);
            true
        } else {
            false
        }
    }
}

/// Issues reveal tasks with unique ids.
#[derive(Debug, Default)]
pub struct RevealEngine {
    next_id: u64,
}

impl RevealEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn make_task(
        &mut self,
        text: &str,
        shown: usize,
        per_char: Duration,
        post_complete: Duration,
        timer: Duration,
    ) -> RevealTask {
        self.next_id += 1;
        let boundaries = text
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .collect();
        RevealTask {
            handle: RevealHandle {
                shared: Rc::new(RevealShared {
                    id: self.next_id,
                    phase: Cell::new(RevealPhase::Revealing),
                }),
            },
            text: text.to_string(),
            boundaries,
            shown,
            per_char,
            post_complete,
            timer,
        }
    }

    /// Start revealing `text`. The first char is due immediately, so
    /// callers should `tick(Duration::ZERO)` the new task right away.
    pub fn begin(&mut self, text: &str, per_char: Duration, post_complete: Duration) -> RevealTask {
        self.make_task(text, 0, per_char, post_complete, per_char)
    }

    /// Continue a paused task as a fresh one that starts from the prefix
    /// already on screen, typing at `per_char` from here on. The paused
    /// task is cancelled; its post-complete delay carries over.
    pub fn resume(
        &mut self,
        paused: &mut RevealTask,
        per_char: Duration,
    ) -> Result<RevealTask, RevealError> {
        match paused.phase() {
            RevealPhase::Revealing => Err(RevealError::AlreadyRevealing(paused.id())),
            RevealPhase::Paused | RevealPhase::Cancelled
                if paused.shown < paused.total_chars() =>
            {
                paused.cancel();
                Ok(self.make_task(
                    &paused.text,
                    paused.shown,
                    per_char,
                    paused.post_complete,
                    paused.timer,
                ))
            }
            _ => Err(RevealError::NothingToResume(paused.id())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS_10: Duration = Duration::from_millis(10);

    fn partials(steps: &[RevealStep]) -> Vec<&str> {
        steps
            .iter()
            .filter_map(|s| match s {
                RevealStep::Partial(p) => Some(p.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn first_char_is_immediate() {
        let mut engine = RevealEngine::new();
        let mut task = engine.begin("abc", MS_10, Duration::ZERO);
        let steps = task.tick(Duration::ZERO);
        assert_eq!(partials(&steps), vec!["a"]);
        assert_eq!(task.phase(), RevealPhase::Revealing);
    }

    #[test]
    fn emits_growing_prefixes_then_finishes() {
        let mut engine = RevealEngine::new();
        let mut task = engine.begin("abc", MS_10, Duration::ZERO);
        task.tick(Duration::ZERO);
        assert_eq!(partials(&task.tick(MS_10)), vec!["ab"]);
        let steps = task.tick(MS_10);
        assert_eq!(steps, vec![RevealStep::Finished("abc".to_string())]);
        assert_eq!(task.phase(), RevealPhase::Complete);
        assert!(task.tick(MS_10).is_empty());
    }

    #[test]
    fn large_tick_emits_every_prefix() {
        let mut engine = RevealEngine::new();
        let mut task = engine.begin("abcd", MS_10, Duration::ZERO);
        task.tick(Duration::ZERO);
        let steps = task.tick(Duration::from_millis(25));
        assert_eq!(partials(&steps), vec!["ab", "abc"]);
        assert_eq!(task.visible_text(), "abc");
    }

    #[test]
    fn zero_delay_reveals_everything_at_once() {
        let mut engine = RevealEngine::new();
        let mut task = engine.begin("Hello there", Duration::ZERO, Duration::ZERO);
        let steps = task.tick(Duration::ZERO);
        assert_eq!(steps, vec![RevealStep::Finished("Hello there".to_string())]);
        assert_eq!(task.phase(), RevealPhase::Complete);
    }

    #[test]
    fn empty_text_finishes_immediately() {
        let mut engine = RevealEngine::new();
        let mut task = engine.begin("", MS_10, Duration::ZERO);
        assert_eq!(
            task.tick(Duration::ZERO),
            vec![RevealStep::Finished(String::new())]
        );
    }

    #[test]
    fn multibyte_prefixes_stay_on_char_boundaries() {
        let mut engine = RevealEngine::new();
        let mut task = engine.begin("héé", MS_10, Duration::ZERO);
        task.tick(Duration::ZERO);
        assert_eq!(partials(&task.tick(MS_10)), vec!["hé"]);
        assert_eq!(task.visible_text(), "hé");
    }

    #[test]
    fn post_complete_delay_schedules_auto_advance() {
        let mut engine = RevealEngine::new();
        let mut task = engine.begin("ab", MS_10, Duration::from_millis(50));
        task.tick(Duration::ZERO);
        task.tick(MS_10);
        assert_eq!(task.phase(), RevealPhase::Lingering);
        assert!(task.tick(Duration::from_millis(40)).is_empty());
        assert_eq!(task.tick(MS_10), vec![RevealStep::AutoAdvance]);
        assert_eq!(task.phase(), RevealPhase::Complete);
    }

    #[test]
    fn coarse_tick_carries_remainder_into_linger() {
        let mut engine = RevealEngine::new();
        let mut task = engine.begin("ab", MS_10, Duration::from_millis(50));
        task.tick(Duration::ZERO);
        let steps = task.tick(Duration::from_secs(1));
        assert_eq!(
            steps,
            vec![RevealStep::Finished("ab".to_string()), RevealStep::AutoAdvance]
        );
        assert_eq!(task.phase(), RevealPhase::Complete);
        assert_eq!(task.surplus(), Duration::from_millis(940));
    }

    #[test]
    fn linger_counts_from_last_char_not_tick_boundary() {
        let mut engine = RevealEngine::new();
        let mut task = engine.begin("ab", MS_10, Duration::from_millis(50));
        task.tick(Duration::ZERO);
        // "b" came due 10ms into this 40ms tick.
        task.tick(Duration::from_millis(40));
        assert_eq!(task.phase(), RevealPhase::Lingering);
        assert_eq!(task.tick(Duration::from_millis(20)), vec![RevealStep::AutoAdvance]);
        assert_eq!(task.surplus(), Duration::ZERO);
    }

    #[test]
    fn complete_short_circuits_and_is_idempotent() {
        let mut engine = RevealEngine::new();
        let mut task = engine.begin("Hello", MS_10, Duration::from_millis(50));
        task.tick(Duration::ZERO);
        let first = task.complete();
        let second = task.complete();
        assert_eq!(first, Some(RevealStep::Finished("Hello".to_string())));
        assert_eq!(first, second);
        assert_eq!(task.visible_text(), "Hello");
        // The follow-up signal was dropped along with the remaining delays.
        assert!(task.tick(Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn complete_during_linger_cancels_auto_advance() {
        let mut engine = RevealEngine::new();
        let mut task = engine.begin("a", Duration::ZERO, Duration::from_millis(50));
        task.tick(Duration::ZERO);
        assert_eq!(task.phase(), RevealPhase::Lingering);
        task.complete();
        assert!(task.tick(Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn cancel_stops_emission_and_keeps_prefix() {
        let mut engine = RevealEngine::new();
        let mut task = engine.begin("abc", MS_10, Duration::ZERO);
        task.tick(Duration::ZERO);
        let handle = task.handle();
        task.cancel();
        assert!(handle.is_cancelled());
        assert!(task.tick(Duration::from_secs(1)).is_empty());
        assert_eq!(task.visible_text(), "a");
        assert_eq!(task.complete(), None);
    }

    #[test]
    fn cancel_after_completion_keeps_complete() {
        let mut engine = RevealEngine::new();
        let mut task = engine.begin("a", Duration::ZERO, Duration::ZERO);
        task.tick(Duration::ZERO);
        task.cancel();
        assert_eq!(task.phase(), RevealPhase::Complete);
    }

    #[test]
    fn pause_then_resume_continues_from_prefix() {
        let mut engine = RevealEngine::new();
        let mut task = engine.begin("abcd", MS_10, Duration::ZERO);
        task.tick(Duration::ZERO);
        task.tick(MS_10);
        assert!(task.pause());
        assert!(task.tick(Duration::from_secs(1)).is_empty());

        let mut resumed = engine.resume(&mut task, MS_10).unwrap();
        assert!(task.handle().is_cancelled());
        assert_ne!(resumed.id(), task.id());
        assert_eq!(resumed.visible_text(), "ab");
        assert_eq!(partials(&resumed.tick(MS_10)), vec!["abc"]);
        assert_eq!(
            resumed.tick(MS_10),
            vec![RevealStep::Finished("abcd".to_string())]
        );
    }

    #[test]
    fn resume_picks_up_new_speed_and_keeps_linger() {
        let mut engine = RevealEngine::new();
        let mut task = engine.begin("abcd", MS_10, Duration::from_millis(50));
        task.tick(Duration::ZERO);
        task.tick(MS_10);
        assert!(task.pause());

        let mut resumed = engine.resume(&mut task, Duration::from_millis(20)).unwrap();
        assert!(resumed.tick(MS_10).is_empty());
        assert_eq!(partials(&resumed.tick(MS_10)), vec!["abc"]);
        assert_eq!(
            resumed.tick(Duration::from_millis(20)),
            vec![RevealStep::Finished("abcd".to_string())]
        );
        assert_eq!(resumed.phase(), RevealPhase::Lingering);
        assert_eq!(resumed.tick(Duration::from_millis(50)), vec![RevealStep::AutoAdvance]);
    }

    #[test]
    fn resume_while_revealing_is_rejected() {
        let mut engine = RevealEngine::new();
        let mut task = engine.begin("abc", MS_10, Duration::ZERO);
        task.tick(Duration::ZERO);
        let id = task.id();
        assert_eq!(
            engine.resume(&mut task, MS_10).unwrap_err(),
            RevealError::AlreadyRevealing(id)
        );
        assert_eq!(task.phase(), RevealPhase::Revealing);
    }

    #[test]
    fn resume_after_completion_has_nothing_to_do() {
        let mut engine = RevealEngine::new();
        let mut task = engine.begin("ab", Duration::ZERO, Duration::ZERO);
        task.tick(Duration::ZERO);
        assert!(matches!(
            engine.resume(&mut task, MS_10),
            Err(RevealError::NothingToResume(_))
        ));
    }

    #[test]
    fn task_ids_are_unique() {
        let mut engine = RevealEngine::new();
        let a = engine.begin("a", MS_10, Duration::ZERO);
        let b = engine.begin("a", MS_10, Duration::ZERO);
        assert_ne!(a.id(), b.id());
    }
}
