use crate::dots::{DotPool, Waypoint};
use crate::rng::SeededRng;
use crate::shapes::TargetCloud;

/// Assigns pool dots to the points of each new shape and releases leftovers.
/// The pool only ever grows; surplus dots drift dimly until a bigger shape
/// claims them again.
pub struct Transitioner {
    pool: DotPool,
    shape_width: f32,
    shape_height: f32,
    offset_x: f32,
    offset_y: f32,
}

impl Transitioner {
    pub fn new() -> Self {
        Self {
            pool: DotPool::new(),
            shape_width: 0.0,
            shape_height: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    pub fn pool(&self) -> &DotPool {
        &self.pool
    }

    /// Centering offset applied to cloud points, derived from the current
    /// shape extents.
    fn compensate(&mut self, area_w: f32, area_h: f32) {
        self.offset_x = area_w / 2.0 - self.shape_width / 2.0;
        self.offset_y = area_h / 2.0 - self.shape_height / 2.0;
    }

    /// Retargets the pool at `cloud`. Each point is claimed by one dot in a
    /// random pairing; dots without a point are released to drift. `fast`
    /// tightens the easing for rapid-fire shapes like countdown digits.
    pub fn switch_shape(
        &mut self,
        cloud: TargetCloud,
        fast: bool,
        area_w: f32,
        area_h: f32,
        rng: &mut SeededRng,
    ) {
        self.shape_width = cloud.width;
        self.shape_height = cloud.height;
        self.compensate(area_w, area_h);

        self.pool
            .grow_to(cloud.points.len(), area_w / 2.0, area_h / 2.0);

        let mut remaining = cloud.points;
        let mut assigned = 0usize;

        while !remaining.is_empty() {
            let pick = rng.below(remaining.len());
            let point = remaining.swap_remove(pick);

            let dot = &mut self.pool.dots_mut()[assigned];
            dot.clear_queue();
            dot.easing = if fast {
                0.25
            } else if dot.settled {
                0.14
            } else {
                0.11
            };

            if dot.settled {
                dot.enqueue(Waypoint {
                    z: Some(rng.unit() * 20.0 + 10.0),
                    a: Some(rng.unit()),
                    hold: 18,
                    ..Waypoint::default()
                });
            } else {
                dot.enqueue(Waypoint {
                    z: Some(rng.unit() * 5.0 + 5.0),
                    hold: if fast { 18 } else { 30 },
                    ..Waypoint::default()
                });
            }
            dot.settled = true;

            dot.enqueue(Waypoint {
                x: Some(point.x + self.offset_x),
                y: Some(point.y + self.offset_y),
                a: Some(1.0),
                z: Some(5.0),
                hold: 0,
            });
            dot.rgb = point.rgb;
            assigned += 1;
        }

        for dot in &mut self.pool.dots_mut()[assigned..] {
            if !dot.settled {
                continue;
            }
            dot.clear_queue();
            dot.enqueue(Waypoint {
                z: Some(rng.unit() * 20.0 + 10.0),
                a: Some(rng.unit()),
                hold: 20,
                ..Waypoint::default()
            });
            dot.settled = false;
            dot.easing = 0.04;
            dot.enqueue(Waypoint {
                x: Some(rng.unit() * area_w),
                y: Some(rng.unit() * area_h),
                a: Some(0.3),
                z: Some(rng.unit() * 4.0),
                hold: 0,
            });
        }
    }

    /// Advances every dot by one frame.
    pub fn update(&mut self, rng: &mut SeededRng) {
        self.pool.update_all(rng);
    }
}

impl Default for Transitioner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Transitioner;
    use crate::rng::SeededRng;
    use crate::shapes::{CloudPoint, TargetCloud};

    fn cloud_of(count: usize) -> TargetCloud {
        let points = (0..count)
            .map(|i| CloudPoint {
                x: (i % 10) as f32 * 13.0,
                y: (i / 10) as f32 * 13.0,
                rgb: (255, 0, 0),
            })
            .collect();
        TargetCloud {
            points,
            width: 130.0,
            height: 130.0,
        }
    }

    #[test]
    fn exactly_cloud_size_dots_are_settled() {
        let mut rng = SeededRng::new(9);
        let mut transitioner = Transitioner::new();
        transitioner.switch_shape(cloud_of(50), false, 1280.0, 720.0, &mut rng);
        transitioner.switch_shape(cloud_of(20), false, 1280.0, 720.0, &mut rng);

        let settled = transitioner
            .pool()
            .dots()
            .iter()
            .filter(|dot| dot.settled)
            .count();
        assert_eq!(settled, 20);
        assert_eq!(transitioner.pool().len(), 50);
    }

    #[test]
    fn pool_never_shrinks_across_shapes() {
        let mut rng = SeededRng::new(4);
        let mut transitioner = Transitioner::new();
        for &count in &[10usize, 40, 5, 40, 1] {
            transitioner.switch_shape(cloud_of(count), false, 640.0, 480.0, &mut rng);
            assert!(transitioner.pool().len() >= count);
        }
        assert_eq!(transitioner.pool().len(), 40);
    }

    #[test]
    fn released_dots_get_drift_easing() {
        let mut rng = SeededRng::new(11);
        let mut transitioner = Transitioner::new();
        transitioner.switch_shape(cloud_of(30), false, 1280.0, 720.0, &mut rng);
        transitioner.switch_shape(cloud_of(0), false, 1280.0, 720.0, &mut rng);

        for dot in transitioner.pool().dots() {
            assert!(!dot.settled);
            assert!((dot.easing - 0.04).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn fast_transition_uses_tight_easing() {
        let mut rng = SeededRng::new(2);
        let mut transitioner = Transitioner::new();
        transitioner.switch_shape(cloud_of(10), true, 1280.0, 720.0, &mut rng);
        for dot in transitioner.pool().dots().iter().take(10) {
            assert!((dot.easing - 0.25).abs() < f32::EPSILON);
            assert!(dot.settled);
        }
    }

    #[test]
    fn assigned_dots_carry_point_colors() {
        let mut rng = SeededRng::new(8);
        let mut transitioner = Transitioner::new();
        transitioner.switch_shape(cloud_of(12), false, 1280.0, 720.0, &mut rng);
        for dot in transitioner.pool().dots() {
            assert_eq!(dot.rgb, (255, 0, 0));
        }
    }
}
