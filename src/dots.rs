use std::collections::VecDeque;
use std::f32::consts::PI;

use crate::rng::SeededRng;

const ALPHA_FLOOR: f32 = 0.1;
const DEPTH_FLOOR: f32 = 1.0;
const EASE_RATE: f32 = 0.05;

/// Hold value that makes a dot snap straight to its target each frame
/// instead of easing toward it.
pub const HOLD_TELEPORT: i32 = -1;

/// A queued movement target. `None` fields keep the dot's current value, so
/// a waypoint can change depth or alpha without disturbing position.
#[derive(Debug, Clone, Copy, Default)]
pub struct Waypoint {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub z: Option<f32>,
    pub a: Option<f32>,
    pub hold: i32,
}

#[derive(Debug, Clone, Copy)]
struct MotionTarget {
    x: f32,
    y: f32,
    z: f32,
    a: f32,
}

/// One particle. Position eases toward the current target; depth and alpha
/// ease separately at a fixed rate with hard floors.
#[derive(Debug, Clone)]
pub struct Dot {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub a: f32,
    pub hold: i32,
    pub easing: f32,
    pub settled: bool,
    pub rgb: (u8, u8, u8),
    target: MotionTarget,
    queue: VecDeque<Waypoint>,
}

impl Dot {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            z: 5.0,
            a: 1.0,
            hold: 0,
            easing: 0.07,
            settled: false,
            rgb: (255, 255, 255),
            target: MotionTarget {
                x,
                y,
                z: 5.0,
                a: 1.0,
            },
            queue: VecDeque::new(),
        }
    }

    pub fn enqueue(&mut self, waypoint: Waypoint) {
        self.queue.push_back(waypoint);
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Advances the dot by one frame. When the current target is reached the
    /// next waypoint is dequeued; with an empty queue, settled dots jitter in
    /// place and unsettled dots wander to a nearby random spot.
    pub fn update(&mut self, rng: &mut SeededRng) {
        if self.step_towards_target() {
            if let Some(waypoint) = self.queue.pop_front() {
                self.target.x = waypoint.x.unwrap_or(self.x);
                self.target.y = waypoint.y.unwrap_or(self.y);
                self.target.z = waypoint.z.unwrap_or(self.z);
                self.target.a = waypoint.a.unwrap_or(self.a);
                self.hold = waypoint.hold;
            } else if self.settled {
                self.x -= (rng.unit() * PI).sin();
                self.y -= (rng.unit() * PI).sin();
            } else {
                self.enqueue(Waypoint {
                    x: Some(self.x + rng.unit() * 50.0 - 25.0),
                    y: Some(self.y + rng.unit() * 50.0 - 25.0),
                    ..Waypoint::default()
                });
            }
        }

        self.a = (self.a - (self.a - self.target.a) * EASE_RATE).max(ALPHA_FLOOR);
        self.z = (self.z - (self.z - self.target.z) * EASE_RATE).max(DEPTH_FLOOR);
    }

    /// Returns true once the positional target is reached (or on every frame
    /// while teleporting).
    fn step_towards_target(&mut self) -> bool {
        if self.hold == HOLD_TELEPORT {
            self.x = self.target.x;
            self.y = self.target.y;
            return true;
        }

        let dx = self.x - self.target.x;
        let dy = self.y - self.target.y;
        let distance = (dx * dx + dy * dy).sqrt();

        if distance > 1.0 {
            let step = self.easing * distance;
            self.x -= (dx / distance) * step;
            self.y -= (dy / distance) * step;
        } else if self.hold > 0 {
            self.hold -= 1;
        } else {
            return true;
        }
        false
    }
}

/// Grow-only pool of dots. Shapes never shrink the pool; dots left over
/// after a transition are released to drift instead.
#[derive(Debug, Default)]
pub struct DotPool {
    dots: Vec<Dot>,
}

impl DotPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.dots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dots.is_empty()
    }

    /// Ensures at least `count` dots exist, spawning new ones at the given
    /// position. Never removes dots.
    pub fn grow_to(&mut self, count: usize, x: f32, y: f32) {
        while self.dots.len() < count {
            self.dots.push(Dot::new(x, y));
        }
    }

    pub fn dots(&self) -> &[Dot] {
        &self.dots
    }

    pub fn dots_mut(&mut self) -> &mut [Dot] {
        &mut self.dots
    }

    pub fn update_all(&mut self, rng: &mut SeededRng) {
        for dot in &mut self.dots {
            dot.update(rng);
        }
    }
}
