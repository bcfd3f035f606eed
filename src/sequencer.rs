use std::collections::VecDeque;

pub const COMMAND_MARKER: char = '#';
pub const SCRIPT_STEP_MS: u64 = 2000;
pub const COUNTDOWN_STEP_MS: u64 = 1000;
pub const CLOCK_POLL_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Script,
    Countdown,
    Clock,
}

/// One due tick of the active timer. `index` counts up for script steps and
/// down to zero for countdowns; clock ticks ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFire {
    pub kind: TimerKind,
    pub index: i64,
}

#[derive(Debug, Clone)]
struct ActiveTimer {
    kind: TimerKind,
    delay_ms: u64,
    next_due_ms: u64,
    current: i64,
    max: Option<i64>,
    reverse: bool,
}

/// Drives the script token queue on a single timer slot. Starting a new
/// timer replaces the old one, so a countdown or clock takes over from the
/// script step timer and vice versa.
pub struct Sequencer {
    tokens: VecDeque<String>,
    timer: Option<ActiveTimer>,
}

impl Sequencer {
    /// Splits `sequence` on `|` verbatim; empty tokens are kept and display
    /// as a blank shape.
    pub fn from_sequence(sequence: &str) -> Self {
        Self {
            tokens: sequence.split('|').map(str::to_owned).collect(),
            timer: None,
        }
    }

    pub fn tokens_remaining(&self) -> usize {
        self.tokens.len()
    }

    pub fn next_token(&mut self) -> Option<String> {
        self.tokens.pop_front()
    }

    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    pub fn cancel(&mut self) {
        self.timer = None;
    }

    /// Steps through the remaining tokens, one fire per token, starting
    /// immediately. Does nothing when no tokens are left.
    pub fn start_script(&mut self, now_ms: u64) {
        if self.tokens.is_empty() {
            self.timer = None;
            return;
        }
        self.timer = Some(ActiveTimer {
            kind: TimerKind::Script,
            delay_ms: SCRIPT_STEP_MS,
            next_due_ms: now_ms,
            current: 1,
            max: Some(self.tokens.len() as i64),
            reverse: false,
        });
    }

    /// Counts `from` down to zero, firing `from` immediately.
    pub fn start_countdown(&mut self, now_ms: u64, from: i64) {
        self.timer = Some(ActiveTimer {
            kind: TimerKind::Countdown,
            delay_ms: COUNTDOWN_STEP_MS,
            next_due_ms: now_ms,
            current: from,
            max: None,
            reverse: true,
        });
    }

    /// Fires once per second forever; used to watch for minute changes.
    pub fn start_clock(&mut self, now_ms: u64) {
        self.timer = Some(ActiveTimer {
            kind: TimerKind::Clock,
            delay_ms: CLOCK_POLL_MS,
            next_due_ms: now_ms,
            current: 0,
            max: None,
            reverse: false,
        });
    }

    /// Returns the next due fire at `now_ms`, advancing the timer. The
    /// terminal fire (last script step, countdown zero) is still emitted;
    /// the timer is cleared alongside it.
    pub fn poll(&mut self, now_ms: u64) -> Option<TimerFire> {
        let timer = self.timer.as_mut()?;
        if now_ms < timer.next_due_ms {
            return None;
        }

        let fire = TimerFire {
            kind: timer.kind,
            index: timer.current,
        };

        let terminal = if timer.reverse {
            timer.current <= 0
        } else {
            timer.max.is_some_and(|max| timer.current >= max)
        };

        if terminal {
            self.timer = None;
        } else {
            timer.current += if timer.reverse { -1 } else { 1 };
            timer.next_due_ms += timer.delay_ms;
        }
        Some(fire)
    }
}

/// Command word of a `#`-prefixed token ("countdown" from "#countdown 3").
pub fn command_of(token: &str) -> Option<&str> {
    let first = token.split(' ').next()?;
    first.strip_prefix(COMMAND_MARKER)
}

/// Second space-separated word, the command argument.
pub fn value_of(token: &str) -> Option<&str> {
    token.split(' ').nth(1)
}

#[cfg(test)]
mod tests {
    use super::{command_of, value_of, Sequencer, TimerKind};

    #[test]
    fn script_fires_immediately_then_every_two_seconds() {
        let mut sequencer = Sequencer::from_sequence("a|b|c");
        sequencer.start_script(0);

        let first = sequencer.poll(0).expect("immediate fire");
        assert_eq!(first.kind, TimerKind::Script);
        assert_eq!(first.index, 1);
        assert!(sequencer.poll(1999).is_none());
        assert_eq!(sequencer.poll(2000).expect("second fire").index, 2);
        assert_eq!(sequencer.poll(4000).expect("third fire").index, 3);
        assert!(sequencer.poll(60_000).is_none(), "terminal step clears timer");
    }

    #[test]
    fn countdown_counts_to_zero_and_stops() {
        let mut sequencer = Sequencer::from_sequence("");
        sequencer.start_countdown(0, 3);

        let indices: Vec<i64> = (0..4)
            .map(|step| sequencer.poll(step * 1000).expect("due fire").index)
            .collect();
        assert_eq!(indices, vec![3, 2, 1, 0]);
        assert!(sequencer.poll(10_000).is_none());
        assert!(!sequencer.has_timer());
    }

    #[test]
    fn late_poll_drains_missed_fires_one_at_a_time() {
        let mut sequencer = Sequencer::from_sequence("");
        sequencer.start_countdown(0, 2);
        assert_eq!(sequencer.poll(5000).expect("fire").index, 2);
        assert_eq!(sequencer.poll(5000).expect("fire").index, 1);
        assert_eq!(sequencer.poll(5000).expect("fire").index, 0);
        assert!(sequencer.poll(5000).is_none());
    }

    #[test]
    fn starting_a_timer_replaces_the_previous_one() {
        let mut sequencer = Sequencer::from_sequence("a|b");
        sequencer.start_script(0);
        sequencer.poll(0);
        sequencer.start_countdown(0, 5);
        let fire = sequencer.poll(0).expect("countdown fire");
        assert_eq!(fire.kind, TimerKind::Countdown);
        assert_eq!(fire.index, 5);
    }

    #[test]
    fn clock_never_terminates() {
        let mut sequencer = Sequencer::from_sequence("");
        sequencer.start_clock(0);
        for step in 0..100u64 {
            let fire = sequencer.poll(step * 1000).expect("clock tick");
            assert_eq!(fire.kind, TimerKind::Clock);
        }
        assert!(sequencer.has_timer());
    }

    #[test]
    fn empty_script_does_not_start() {
        let mut sequencer = Sequencer::from_sequence("");
        let _ = sequencer.next_token();
        assert_eq!(sequencer.tokens_remaining(), 0);
        sequencer.start_script(0);
        assert!(!sequencer.has_timer());
    }

    #[test]
    fn split_keeps_empty_tokens() {
        let sequencer = Sequencer::from_sequence("|a||b|");
        assert_eq!(sequencer.tokens_remaining(), 5);
    }

    #[test]
    fn command_parsing() {
        assert_eq!(command_of("#countdown 3"), Some("countdown"));
        assert_eq!(value_of("#countdown 3"), Some("3"));
        assert_eq!(command_of("#time"), Some("time"));
        assert_eq!(value_of("#time"), None);
        assert_eq!(command_of("Hello"), None);
        assert_eq!(command_of(""), None);
        assert_eq!(command_of("#rectangle 10x4"), Some("rectangle"));
        assert_eq!(value_of("#rectangle 10x4"), Some("10x4"));
    }
}
