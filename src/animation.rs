use std::time::Duration;

use instant::Instant;

use crate::config::{Ramp, SliderConfig};

/// Signed multiplier applied to the live angle and offset.
///
/// One value is shared by both animations: rotation reads it as left/right,
/// translation as back/forward. Starting either motion overwrites it, so a
/// held angle flips sign when a translation starts in the other direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i8)]
pub enum Direction {
    Negative = -1,
    #[default]
    Positive = 1,
}

impl Direction {
    pub const LEFT: Direction = Direction::Negative;
    pub const RIGHT: Direction = Direction::Positive;
    pub const BACK: Direction = Direction::Negative;
    pub const FORWARD: Direction = Direction::Positive;

    pub fn sign(self) -> f32 {
        self as i8 as f32
    }
}

/// Which scalar a tick advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Rotation,
    Translation,
}

impl Motion {
    pub const ALL: [Motion; 2] = [Motion::Rotation, Motion::Translation];

    pub fn label(self) -> &'static str {
        match self {
            Motion::Rotation => "rotation",
            Motion::Translation => "translation",
        }
    }
}

/// Returned by every tick; `Stop` cancels the motion's schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Stop,
}

/// Everything the scene renderer reads each frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnimationState {
    /// Live rotation of the foreground cover, degrees.
    pub angle: f32,
    /// Live sideways shift of the whole stack.
    pub offset: f32,
    pub direction: Direction,
}

/// One linear ramp plus its pending deadline.
#[derive(Debug, Clone, Copy)]
struct Track {
    ramp: Ramp,
    /// Ticks since the last start. The scalar is `steps * step`, so ten
    /// 0.05 steps land on exactly 0.5.
    steps: u32,
    deadline: Option<Instant>,
}

impl Track {
    fn new(ramp: Ramp) -> Self {
        Self {
            ramp,
            steps: 0,
            deadline: None,
        }
    }

    fn value(&self) -> f32 {
        self.steps as f32 * self.ramp.step
    }
}

/// Drives the angle and offset ramps from event-loop deadlines.
///
/// Idle -> Animating on `start`, back to Idle when a tick crosses the
/// ceiling or on `reset`.
pub struct Animator {
    state: AnimationState,
    rotation: Track,
    translation: Track,
    interval: Duration,
    redraw_requested: bool,
}

impl Animator {
    pub fn new(config: &SliderConfig) -> Self {
        Self {
            state: AnimationState::default(),
            rotation: Track::new(config.rotation),
            translation: Track::new(config.translation),
            interval: config.tick_interval,
            redraw_requested: false,
        }
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    fn track(&self, motion: Motion) -> &Track {
        match motion {
            Motion::Rotation => &self.rotation,
            Motion::Translation => &self.translation,
        }
    }

    fn track_mut(&mut self, motion: Motion) -> &mut Track {
        match motion {
            Motion::Rotation => &mut self.rotation,
            Motion::Translation => &mut self.translation,
        }
    }

    fn sync_state(&mut self) {
        self.state.angle = self.rotation.value();
        self.state.offset = self.translation.value();
    }

    /// Record the direction, zero the motion's scalar and schedule its
    /// first tick one interval from `now`. Restarting a running motion
    /// reuses its schedule.
    pub fn start(&mut self, motion: Motion, direction: Direction, now: Instant) {
        self.state.direction = direction;
        let interval = self.interval;
        let track = self.track_mut(motion);
        track.steps = 0;
        track.deadline = Some(now + interval);
        self.sync_state();
        log::debug!("Starting {} ({:?})", motion.label(), direction);
    }

    /// Advance `motion` one step and request a redraw.
    pub fn tick(&mut self, motion: Motion) -> TickOutcome {
        let track = self.track_mut(motion);
        track.steps += 1;
        let past_ceiling = track.value() > track.ramp.ceiling;
        self.sync_state();
        self.redraw_requested = true;

        if past_ceiling {
            TickOutcome::Stop
        } else {
            TickOutcome::Continue
        }
    }

    /// Zero both scalars and request one redraw. Pending ticks are
    /// cancelled so a running ramp cannot overwrite the reset.
    pub fn reset(&mut self) {
        for motion in Motion::ALL {
            let track = self.track_mut(motion);
            track.steps = 0;
            track.deadline = None;
        }
        self.sync_state();
        self.redraw_requested = true;
        log::debug!("Reset to center");
    }

    /// Run one tick for every motion whose deadline has passed. The next
    /// deadline is measured from `now`; missed intervals are not replayed.
    pub fn poll(&mut self, now: Instant) {
        let interval = self.interval;
        for motion in Motion::ALL {
            let due = matches!(self.track(motion).deadline, Some(at) if at <= now);
            if !due {
                continue;
            }
            let outcome = self.tick(motion);
            let track = self.track_mut(motion);
            track.deadline = match outcome {
                TickOutcome::Continue => Some(now + interval),
                TickOutcome::Stop => {
                    log::debug!("{} finished at {:.2}", motion.label(), track.value());
                    None
                }
            };
        }
    }

    /// Earliest pending tick, if any motion is running.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.rotation.deadline, self.translation.deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    #[cfg(test)]
    pub fn is_animating(&self) -> bool {
        self.next_deadline().is_some()
    }

    /// Returns true once per redraw request.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animator() -> Animator {
        Animator::new(&SliderConfig::default())
    }

    #[test]
    fn rotation_stops_after_fifth_tick() {
        let mut anim = animator();
        anim.start(Motion::Rotation, Direction::LEFT, Instant::now());

        for _ in 0..4 {
            assert_eq!(anim.tick(Motion::Rotation), TickOutcome::Continue);
        }
        assert_eq!(anim.tick(Motion::Rotation), TickOutcome::Stop);
        assert_eq!(anim.state().angle, 50.0);
    }

    #[test]
    fn translation_boundary_is_exact() {
        let mut anim = animator();
        anim.start(Motion::Translation, Direction::FORWARD, Instant::now());

        for _ in 0..10 {
            assert_eq!(anim.tick(Motion::Translation), TickOutcome::Continue);
        }
        assert_eq!(anim.state().offset, 0.5);
        assert_eq!(anim.tick(Motion::Translation), TickOutcome::Stop);
        assert!(anim.state().offset > 0.5);
    }

    #[test]
    fn start_zeroes_only_its_own_scalar() {
        let mut anim = animator();
        let now = Instant::now();
        anim.start(Motion::Rotation, Direction::RIGHT, now);
        anim.tick(Motion::Rotation);
        anim.start(Motion::Translation, Direction::BACK, now);
        anim.tick(Motion::Translation);
        anim.tick(Motion::Translation);

        anim.start(Motion::Translation, Direction::FORWARD, now);
        let state = anim.state();
        assert_eq!(state.angle, 10.0);
        assert_eq!(state.offset, 0.0);
        assert_eq!(state.direction, Direction::Positive);
    }

    #[test]
    fn reset_zeroes_everything() {
        let mut anim = animator();
        let now = Instant::now();
        anim.start(Motion::Rotation, Direction::LEFT, now);
        anim.start(Motion::Translation, Direction::BACK, now);
        for _ in 0..3 {
            anim.tick(Motion::Rotation);
            anim.tick(Motion::Translation);
        }
        anim.take_redraw();

        anim.reset();
        assert_eq!(anim.state().angle, 0.0);
        assert_eq!(anim.state().offset, 0.0);
        assert!(anim.take_redraw());
        assert!(!anim.take_redraw());
    }

    #[test]
    fn reset_cancels_running_ticks() {
        let mut anim = animator();
        let now = Instant::now();
        anim.start(Motion::Rotation, Direction::LEFT, now);
        anim.poll(now + Duration::from_millis(16));
        assert!(anim.is_animating());

        anim.reset();
        assert!(!anim.is_animating());
        anim.poll(now + Duration::from_secs(1));
        assert_eq!(anim.state().angle, 0.0);
    }

    #[test]
    fn rotate_left_runs_to_completion() {
        let mut anim = animator();
        let t0 = Instant::now();
        let interval = Duration::from_millis(16);
        anim.start(Motion::Rotation, Direction::LEFT, t0);

        let mut redraws = 0;
        for k in 1..=10 {
            anim.poll(t0 + interval * k);
            if anim.take_redraw() {
                redraws += 1;
            }
        }

        assert_eq!(anim.state().angle, 50.0);
        assert_eq!(anim.state().direction, Direction::Negative);
        assert_eq!(anim.next_deadline(), None);
        assert_eq!(redraws, 5);
    }

    #[test]
    fn poll_waits_for_deadline() {
        let mut anim = animator();
        let t0 = Instant::now();
        anim.start(Motion::Translation, Direction::BACK, t0);

        anim.poll(t0 + Duration::from_millis(5));
        assert_eq!(anim.state().offset, 0.0);
        assert!(!anim.take_redraw());

        anim.poll(t0 + Duration::from_millis(16));
        assert_eq!(anim.state().offset, 0.05);
        assert_eq!(
            anim.next_deadline(),
            Some(t0 + Duration::from_millis(32))
        );
    }

    #[test]
    fn both_motions_run_side_by_side() {
        let mut anim = animator();
        let t0 = Instant::now();
        anim.start(Motion::Rotation, Direction::RIGHT, t0);
        anim.start(Motion::Translation, Direction::FORWARD, t0);

        anim.poll(t0 + Duration::from_millis(16));
        assert_eq!(anim.state().angle, 10.0);
        assert_eq!(anim.state().offset, 0.05);
    }

    #[test]
    fn direction_signs() {
        assert_eq!(Direction::LEFT.sign(), -1.0);
        assert_eq!(Direction::BACK.sign(), -1.0);
        assert_eq!(Direction::RIGHT.sign(), 1.0);
        assert_eq!(Direction::FORWARD.sign(), 1.0);
    }
}
