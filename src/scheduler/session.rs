//! Human-like browsing sessions.
//!
//! A [`Session`] is a bounded burst of paced queries. Its length, activity
//! profile and time-of-day multiplier are drawn once when it starts and
//! held for its whole lifetime.
//!
//! ```text
//! Active ──break──▶ OnBreak ──resume──▶ Active ── … ──▶ Ended
//! ```

use std::time::Duration;

use chrono::{DateTime, Local, Timelike};
use rand::Rng;

use crate::config::{ProfileConfig, SessionConfig, Span};

/// Named activity tiers. Each maps to a delay range and a break policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityProfile {
    Light,
    Moderate,
    Active,
}

impl ActivityProfile {
    pub const ALL: [Self; 3] = [Self::Light, Self::Moderate, Self::Active];

    /// Pick a profile uniformly at random.
    pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    /// This profile's settings within `config`.
    pub fn settings<'a>(&self, config: &'a SessionConfig) -> &'a ProfileConfig {
        match self {
            Self::Light => &config.light,
            Self::Moderate => &config.moderate,
            Self::Active => &config.active,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Moderate => "moderate",
            Self::Active => "active",
        }
    }
}

impl std::fmt::Display for ActivityProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delay multiplier for the hour a session starts in.
///
/// Night hours slow pacing down; early morning speeds it up.
pub fn time_of_day_multiplier(hour: u32) -> f64 {
    match hour {
        0..=5 => 1.5,
        6..=8 => 0.8,
        9..=16 => 1.0,
        17..=22 => 1.2,
        _ => 1.4,
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Active,
    OnBreak,
    Ended,
}

/// What to do after a completed query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pause {
    /// Step away; the session is `OnBreak` until resumed.
    Break(Duration),
    /// Ordinary inter-query delay, optionally stretched by a distraction.
    Delay {
        base: Duration,
        distraction: Option<Duration>,
    },
}

impl Pause {
    /// Total time to wait.
    pub fn duration(&self) -> Duration {
        match *self {
            Self::Break(d) => d,
            Self::Delay { base, distraction } => base + distraction.unwrap_or_default(),
        }
    }
}

/// One browsing session.
#[derive(Debug, Clone)]
pub struct Session {
    started_at: DateTime<Local>,
    max_duration_minutes: f64,
    profile: ActivityProfile,
    multiplier: f64,
    delay_secs: Span,
    break_probability: f64,
    break_secs: Span,
    distraction_probability: f64,
    distraction_secs: Span,
    phase: SessionPhase,
}

impl Session {
    /// Start a session at `now` with freshly drawn parameters.
    pub fn start<R: Rng + ?Sized>(
        config: &SessionConfig,
        now: DateTime<Local>,
        rng: &mut R,
    ) -> Self {
        let max_duration_minutes = config.duration_minutes.sample(rng);
        let profile = ActivityProfile::draw(rng);
        let multiplier = time_of_day_multiplier(now.hour());
        let settings = profile.settings(config);

        Self {
            started_at: now,
            max_duration_minutes,
            profile,
            multiplier,
            delay_secs: settings.delay_secs.scaled(multiplier),
            break_probability: settings.break_probability,
            break_secs: settings.break_secs,
            distraction_probability: config.distraction_probability,
            distraction_secs: config.distraction_secs,
            phase: SessionPhase::Active,
        }
    }

    /// Whether another query may be issued at `now`.
    ///
    /// False once the elapsed time reaches the drawn session length, or
    /// after [`end`](Self::end).
    pub fn should_continue(&self, now: DateTime<Local>) -> bool {
        if self.phase == SessionPhase::Ended {
            return false;
        }
        let elapsed_minutes = (now - self.started_at).num_milliseconds() as f64 / 60_000.0;
        elapsed_minutes < self.max_duration_minutes
    }

    /// Decide the pause that follows a completed query.
    ///
    /// A break moves the session to [`SessionPhase::OnBreak`]; call
    /// [`resume`](Self::resume) once it has been waited out.
    pub fn next_pause<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Pause {
        if rng.gen_bool(self.break_probability) {
            self.phase = SessionPhase::OnBreak;
            return Pause::Break(secs(self.break_secs.sample(rng)));
        }

        let base = secs(self.delay_secs.sample(rng));
        let distraction = rng
            .gen_bool(self.distraction_probability)
            .then(|| secs(self.distraction_secs.sample(rng)));
        Pause::Delay { base, distraction }
    }

    pub fn resume(&mut self) {
        if self.phase == SessionPhase::OnBreak {
            self.phase = SessionPhase::Active;
        }
    }

    pub fn end(&mut self) {
        self.phase = SessionPhase::Ended;
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn profile(&self) -> ActivityProfile {
        self.profile
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn max_duration_minutes(&self) -> f64 {
        self.max_duration_minutes
    }

    /// Inter-query delay range after the time-of-day multiplier.
    pub fn delay_secs(&self) -> Span {
        self.delay_secs
    }
}

/// Gap between two consecutive sessions.
pub fn long_pause<R: Rng + ?Sized>(config: &SessionConfig, rng: &mut R) -> Duration {
    secs(config.long_pause_minutes.sample(rng) * 60.0)
}

pub(crate) fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
