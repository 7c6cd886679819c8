//! Round countdowns
//!
//! Timers here never sleep on their own. Arming a timer hands a [`Tick`] and
//! a delay to the host's scheduling closure; when the delay elapses the host
//! feeds the tick back through `tick`. Each tick carries the generation of the
//! timer that scheduled it, and every arm or cancel bumps the generation, so
//! at most one pending tick is ever honoured.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// Delay between two consecutive ticks of a running timer
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// A scheduled one-second tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    /// Generation of the timer at the time the tick was scheduled
    generation: u64,
}

impl Tick {
    /// Returns the generation this tick belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

fn progress(time_left: u64, duration: u64) -> f64 {
    if duration == 0 {
        0.
    } else {
        (time_left as f64 / duration as f64).clamp(0., 1.)
    }
}

/// Point-in-time view of a timer for the presentation layer
#[skip_serializing_none]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Snapshot {
    /// Seconds left in the current phase
    pub time_left: u64,
    /// Length of the current phase in seconds
    pub duration: u64,
    /// `time_left / duration`, clamped to `[0, 1]`
    pub progress: f64,
    /// Answer timer phase, absent for single-phase countdowns
    pub phase: Option<TimerPhase>,
}

/// Timer updates sent to the presentation layer on every honoured tick
#[derive(Debug, Clone, Copy, Serialize)]
pub enum UpdateMessage {
    /// The discussion countdown moved
    DiscussionTick(Snapshot),
    /// The answer timer moved
    AnswerTick(Snapshot),
}

/// Result of feeding a tick to a [`Countdown`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    /// The tick was cancelled or superseded and has been ignored
    Stale,
    /// One second elapsed, the value is the time left
    Ticked(u64),
    /// The countdown reached zero
    Expired,
}

/// A single-phase cancellable countdown in whole seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Countdown {
    duration: u64,
    time_left: u64,
    generation: u64,
    armed: bool,
}

impl Countdown {
    /// Creates a stopped countdown of `duration` seconds
    pub fn new(duration: u64) -> Self {
        Self {
            duration,
            time_left: duration,
            generation: 0,
            armed: false,
        }
    }

    /// Seconds left before expiry
    pub fn time_left(&self) -> u64 {
        self.time_left
    }

    /// Full length of the countdown in seconds
    pub fn duration(&self) -> u64 {
        self.duration
    }

    /// Whether a tick is currently pending
    pub fn is_running(&self) -> bool {
        self.armed
    }

    /// Fraction of time left, clamped to `[0, 1]`
    pub fn progress(&self) -> f64 {
        progress(self.time_left, self.duration)
    }

    /// Current generation, matching the last scheduled tick while running
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Snapshot for the presentation layer
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            time_left: self.time_left,
            duration: self.duration,
            progress: self.progress(),
            phase: None,
        }
    }

    /// Arms the countdown from its current time left
    ///
    /// Any tick scheduled before this call becomes stale.
    pub fn start<S: FnMut(Tick, Duration)>(&mut self, mut schedule: S) {
        self.generation += 1;
        self.armed = true;
        schedule(
            Tick {
                generation: self.generation,
            },
            TICK_INTERVAL,
        );
    }

    /// Sets a new duration and arms the countdown from the top
    pub fn restart<S: FnMut(Tick, Duration)>(&mut self, duration: u64, schedule: S) {
        self.reset(duration);
        self.start(schedule);
    }

    /// Stops the countdown and loads a new duration without arming it
    pub fn reset(&mut self, duration: u64) {
        self.cancel();
        self.duration = duration;
        self.time_left = duration;
    }

    /// Invalidates the pending tick, keeping the time left
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.armed = false;
    }

    /// Handles a tick delivered by the host
    ///
    /// Schedules the following tick unless the countdown expired.
    pub fn tick<S: FnMut(Tick, Duration)>(
        &mut self,
        tick: Tick,
        mut schedule: S,
    ) -> CountdownEvent {
        if !self.armed || tick.generation != self.generation {
            return CountdownEvent::Stale;
        }

        self.time_left = self.time_left.saturating_sub(1);

        if self.time_left == 0 {
            self.cancel();
            CountdownEvent::Expired
        } else {
            schedule(tick, TICK_INTERVAL);
            CountdownEvent::Ticked(self.time_left)
        }
    }
}

/// Phases of the answer timer, strictly monotonic
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum TimerPhase {
    /// Grace period before anyone has typed
    #[default]
    Typing,
    /// Window to finish an answer once typing started
    Completing,
    /// Timer finished, either by submission or by expiry
    Done,
}

/// Result of feeding a tick to an [`AnswerTimer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// The tick was cancelled or superseded and has been ignored
    Stale,
    /// One second elapsed, the value is the time left
    Ticked(u64),
    /// Time ran out; the answer must be submitted as it stands
    ///
    /// Emitted at most once between resets.
    AutoSubmit,
}

/// Two-phase answer countdown
///
/// The timer starts in [`TimerPhase::Typing`] with the typing grace period.
/// The first keystroke moves it to [`TimerPhase::Completing`] with a fresh
/// completion window. Running out of time in either phase yields a single
/// [`TimerEvent::AutoSubmit`], even when nothing was typed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerTimer {
    typing_time: u64,
    completion_time: u64,
    phase: TimerPhase,
    countdown: Countdown,
    auto_submitted: bool,
}

impl AnswerTimer {
    /// Creates a stopped timer in the typing phase
    ///
    /// # Arguments
    ///
    /// * `typing_time` - Grace period in seconds
    /// * `completion_time` - Completion window in seconds
    pub fn new(typing_time: u64, completion_time: u64) -> Self {
        Self {
            typing_time,
            completion_time,
            phase: TimerPhase::Typing,
            countdown: Countdown::new(typing_time),
            auto_submitted: false,
        }
    }

    /// Current phase
    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    /// Seconds left in the current phase
    pub fn time_left(&self) -> u64 {
        self.countdown.time_left()
    }

    /// Length of the current phase in seconds
    pub fn current_duration(&self) -> u64 {
        self.countdown.duration()
    }

    /// Whether the one-shot auto-submit has fired since the last reset
    pub fn has_auto_submitted(&self) -> bool {
        self.auto_submitted
    }

    /// Whether a tick is currently pending
    pub fn is_running(&self) -> bool {
        self.countdown.is_running()
    }

    /// Fraction of the current phase left, clamped to `[0, 1]`
    pub fn progress(&self) -> f64 {
        self.countdown.progress()
    }

    /// Generation the next honoured tick must carry
    pub fn generation(&self) -> u64 {
        self.countdown.generation()
    }

    /// Snapshot for the presentation layer
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: Some(self.phase),
            ..self.countdown.snapshot()
        }
    }

    /// Arms the timer from its current state
    ///
    /// Does nothing once the timer is done.
    pub fn start<S: FnMut(Tick, Duration)>(&mut self, schedule: S) {
        if self.phase != TimerPhase::Done {
            self.countdown.start(schedule);
        }
    }

    /// Moves from typing to completing, restarting the countdown
    ///
    /// # Returns
    ///
    /// `true` if the phase changed, `false` if the timer had already left
    /// the typing phase
    pub fn start_completion_phase<S: FnMut(Tick, Duration)>(&mut self, schedule: S) -> bool {
        if self.phase != TimerPhase::Typing {
            return false;
        }

        self.phase = TimerPhase::Completing;
        self.countdown.restart(self.completion_time, schedule);
        true
    }

    /// Handles a tick delivered by the host
    pub fn tick<S: FnMut(Tick, Duration)>(&mut self, tick: Tick, schedule: S) -> TimerEvent {
        match self.countdown.tick(tick, schedule) {
            CountdownEvent::Stale => TimerEvent::Stale,
            CountdownEvent::Ticked(time_left) => TimerEvent::Ticked(time_left),
            CountdownEvent::Expired => {
                self.phase = TimerPhase::Done;
                if self.auto_submitted {
                    TimerEvent::Stale
                } else {
                    self.auto_submitted = true;
                    TimerEvent::AutoSubmit
                }
            }
        }
    }

    /// Finishes the timer after a manual submission
    pub fn stop(&mut self) {
        self.phase = TimerPhase::Done;
        self.countdown.cancel();
    }

    /// Invalidates the pending tick, keeping phase and time left
    pub fn cancel(&mut self) {
        self.countdown.cancel();
    }

    /// Re-arms a cancelled timer with the time it had left
    pub fn resume<S: FnMut(Tick, Duration)>(&mut self, schedule: S) {
        self.start(schedule);
    }

    /// Returns to a stopped typing phase with the full grace period
    pub fn reset(&mut self) {
        self.phase = TimerPhase::Typing;
        self.countdown.reset(self.typing_time);
        self.auto_submitted = false;
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Default)]
    struct Scheduler {
        pending: Vec<Tick>,
    }

    impl Scheduler {
        fn schedule(&mut self) -> impl FnMut(Tick, Duration) + '_ {
            move |tick, delay| {
                assert_eq!(delay, TICK_INTERVAL);
                self.pending.push(tick);
            }
        }

        /// Delivers every tick that was due after one more second
        fn advance(&mut self, timer: &mut AnswerTimer) -> Vec<TimerEvent> {
            let due = std::mem::take(&mut self.pending);
            due.into_iter()
                .map(|tick| timer.tick(tick, self.schedule()))
                .collect()
        }

        fn advance_countdown(&mut self, countdown: &mut Countdown) -> Vec<CountdownEvent> {
            let due = std::mem::take(&mut self.pending);
            due.into_iter()
                .map(|tick| countdown.tick(tick, self.schedule()))
                .collect()
        }
    }

    fn auto_submits(events: &[TimerEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, TimerEvent::AutoSubmit))
            .count()
    }

    #[test]
    fn test_countdown_expires_after_duration() {
        let mut scheduler = Scheduler::default();
        let mut countdown = Countdown::new(3);
        countdown.start(scheduler.schedule());

        assert_eq!(
            scheduler.advance_countdown(&mut countdown),
            vec![CountdownEvent::Ticked(2)]
        );
        assert_eq!(
            scheduler.advance_countdown(&mut countdown),
            vec![CountdownEvent::Ticked(1)]
        );
        assert_eq!(
            scheduler.advance_countdown(&mut countdown),
            vec![CountdownEvent::Expired]
        );
        assert!(scheduler.pending.is_empty());
        assert!(!countdown.is_running());
    }

    #[test]
    fn test_countdown_cancel_makes_pending_tick_stale() {
        let mut scheduler = Scheduler::default();
        let mut countdown = Countdown::new(10);
        countdown.start(scheduler.schedule());
        countdown.cancel();

        assert_eq!(
            scheduler.advance_countdown(&mut countdown),
            vec![CountdownEvent::Stale]
        );
        assert_eq!(countdown.time_left(), 10);
    }

    #[test]
    fn test_countdown_restart_supersedes_old_tick() {
        let mut scheduler = Scheduler::default();
        let mut countdown = Countdown::new(10);
        countdown.start(scheduler.schedule());
        countdown.restart(4, scheduler.schedule());

        let events = scheduler.advance_countdown(&mut countdown);
        assert_eq!(events, vec![CountdownEvent::Stale, CountdownEvent::Ticked(3)]);
        assert_eq!(scheduler.pending.len(), 1);
    }

    #[rstest]
    #[case(1, 1)]
    #[case(5, 15)]
    #[case(30, 5)]
    fn test_untouched_timer_auto_submits_once(#[case] typing: u64, #[case] completion: u64) {
        let mut scheduler = Scheduler::default();
        let mut timer = AnswerTimer::new(typing, completion);
        timer.start(scheduler.schedule());

        let mut fired_at = None;
        let mut total = 0;
        for second in 1..=typing + completion + 5 {
            let events = scheduler.advance(&mut timer);
            let count = auto_submits(&events);
            if count > 0 && fired_at.is_none() {
                fired_at = Some(second);
            }
            total += count;
        }

        assert_eq!(total, 1);
        assert_eq!(fired_at, Some(typing));
        assert_eq!(timer.phase(), TimerPhase::Done);
        assert!(timer.has_auto_submitted());
    }

    #[test]
    fn test_typing_timeout_with_no_input_fires_at_five_seconds() {
        let mut scheduler = Scheduler::default();
        let mut timer = AnswerTimer::new(5, 15);
        timer.start(scheduler.schedule());

        for _ in 0..4 {
            assert_eq!(auto_submits(&scheduler.advance(&mut timer)), 0);
        }
        assert_eq!(
            scheduler.advance(&mut timer),
            vec![TimerEvent::AutoSubmit]
        );
        assert!(scheduler.pending.is_empty());
    }

    #[test]
    fn test_completion_phase_suppresses_typing_expiry() {
        let mut scheduler = Scheduler::default();
        let mut timer = AnswerTimer::new(5, 15);
        timer.start(scheduler.schedule());

        for _ in 0..4 {
            scheduler.advance(&mut timer);
        }
        assert_eq!(timer.time_left(), 1);

        assert!(timer.start_completion_phase(scheduler.schedule()));
        assert_eq!(timer.phase(), TimerPhase::Completing);
        assert_eq!(timer.time_left(), 15);
        assert_eq!(timer.current_duration(), 15);

        // the old typing tick is stale and must not reach zero
        let events = scheduler.advance(&mut timer);
        assert_eq!(auto_submits(&events), 0);
        assert!(events.contains(&TimerEvent::Stale));
        assert_eq!(timer.time_left(), 14);

        let mut total = 0;
        for _ in 0..20 {
            total += auto_submits(&scheduler.advance(&mut timer));
        }
        assert_eq!(total, 1);
    }

    #[test]
    fn test_start_completion_phase_is_idempotent() {
        let mut once = Scheduler::default();
        let mut timer_once = AnswerTimer::new(5, 15);
        timer_once.start(once.schedule());
        timer_once.start_completion_phase(once.schedule());

        let mut twice = Scheduler::default();
        let mut timer_twice = AnswerTimer::new(5, 15);
        timer_twice.start(twice.schedule());
        assert!(timer_twice.start_completion_phase(twice.schedule()));
        assert!(!timer_twice.start_completion_phase(twice.schedule()));

        assert_eq!(timer_once.phase(), timer_twice.phase());
        assert_eq!(timer_once.time_left(), timer_twice.time_left());
        assert_eq!(once.pending.len(), twice.pending.len());
    }

    #[test]
    fn test_start_completion_phase_ignored_when_done() {
        let mut scheduler = Scheduler::default();
        let mut timer = AnswerTimer::new(1, 15);
        timer.start(scheduler.schedule());
        scheduler.advance(&mut timer);

        assert_eq!(timer.phase(), TimerPhase::Done);
        assert!(!timer.start_completion_phase(scheduler.schedule()));
        assert_eq!(timer.phase(), TimerPhase::Done);
        assert!(scheduler.pending.is_empty());
    }

    #[test]
    fn test_reset_after_done_matches_fresh_timer() {
        let mut scheduler = Scheduler::default();
        let mut timer = AnswerTimer::new(2, 15);
        timer.start(scheduler.schedule());
        scheduler.advance(&mut timer);
        scheduler.advance(&mut timer);
        assert_eq!(timer.phase(), TimerPhase::Done);

        timer.reset();
        let fresh = AnswerTimer::new(2, 15);

        assert_eq!(timer.phase(), fresh.phase());
        assert_eq!(timer.time_left(), fresh.time_left());
        assert_eq!(timer.current_duration(), fresh.current_duration());
        assert_eq!(timer.has_auto_submitted(), fresh.has_auto_submitted());
        assert_eq!(timer.is_running(), fresh.is_running());
        assert!((timer.progress() - fresh.progress()).abs() < f64::EPSILON);

        // and it can fire again
        timer.start(scheduler.schedule());
        scheduler.advance(&mut timer);
        assert_eq!(scheduler.advance(&mut timer), vec![TimerEvent::AutoSubmit]);
    }

    #[test]
    fn test_reset_cancels_pending_tick() {
        let mut scheduler = Scheduler::default();
        let mut timer = AnswerTimer::new(5, 15);
        timer.start(scheduler.schedule());
        timer.reset();

        assert_eq!(scheduler.advance(&mut timer), vec![TimerEvent::Stale]);
        assert_eq!(timer.time_left(), 5);
    }

    #[test]
    fn test_stop_prevents_auto_submit() {
        let mut scheduler = Scheduler::default();
        let mut timer = AnswerTimer::new(2, 15);
        timer.start(scheduler.schedule());
        timer.stop();

        for _ in 0..5 {
            assert_eq!(auto_submits(&scheduler.advance(&mut timer)), 0);
        }
        assert_eq!(timer.phase(), TimerPhase::Done);
        assert!(!timer.has_auto_submitted());
    }

    #[test]
    fn test_cancel_and_resume_keeps_time_left() {
        let mut scheduler = Scheduler::default();
        let mut timer = AnswerTimer::new(5, 15);
        timer.start(scheduler.schedule());
        scheduler.advance(&mut timer);
        timer.cancel();

        assert_eq!(scheduler.advance(&mut timer), vec![TimerEvent::Stale]);
        assert_eq!(timer.time_left(), 4);

        timer.resume(scheduler.schedule());
        assert_eq!(scheduler.advance(&mut timer), vec![TimerEvent::Ticked(3)]);
    }

    #[test]
    fn test_progress_tracks_current_phase() {
        let mut scheduler = Scheduler::default();
        let mut timer = AnswerTimer::new(4, 10);
        assert!((timer.progress() - 1.).abs() < f64::EPSILON);

        timer.start(scheduler.schedule());
        scheduler.advance(&mut timer);
        assert!((timer.progress() - 0.75).abs() < f64::EPSILON);

        timer.start_completion_phase(scheduler.schedule());
        assert!((timer.progress() - 1.).abs() < f64::EPSILON);
    }

    #[test]
    fn test_progress_with_zero_duration() {
        let countdown = Countdown::new(0);
        assert!(countdown.progress().abs() < f64::EPSILON);
    }

    #[test]
    fn test_snapshot_serialization() {
        let timer = AnswerTimer::new(5, 15);
        let json = serde_json::to_string(&UpdateMessage::AnswerTick(timer.snapshot())).unwrap();
        assert!(json.contains("AnswerTick"));
        assert!(json.contains("Typing"));

        let countdown = Countdown::new(60);
        let json =
            serde_json::to_string(&UpdateMessage::DiscussionTick(countdown.snapshot())).unwrap();
        assert!(!json.contains("phase"));
    }
}
