use glam::DVec2;
use std::collections::VecDeque;

/// How long the outer-bob trail remembers visited points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrailPolicy {
    /// Keep every point for the lifetime of the playback.
    Unbounded,
    /// Keep only the newest `n` points; survives loop restarts.
    Capped(usize),
    /// Forget everything whenever playback wraps back to the first frame.
    ResetOnWrap,
}

/// Accumulated screen-space path of the outer bob.
///
/// Points are appended once per rendered tick, oldest first. What happens
/// to old points is decided by the [`TrailPolicy`]:
///
/// - [`TrailPolicy::Unbounded`] never drops anything, so the trail grows by
///   one point per tick forever.
/// - [`TrailPolicy::Capped`] behaves like a ring buffer.
/// - [`TrailPolicy::ResetOnWrap`] clears the trail in [`Trail::on_wrap`].
#[derive(Debug)]
pub struct Trail {
    points: VecDeque<DVec2>,
    policy: TrailPolicy,
}

impl Trail {
    /// Creates an empty [`Trail`] with the given retention policy.
    ///
    /// For [`TrailPolicy::Capped`] the full capacity is reserved up front.
    pub fn new(policy: TrailPolicy) -> Self {
        let points = match policy {
            TrailPolicy::Capped(cap) => VecDeque::with_capacity(cap),
            _ => VecDeque::new(),
        };
        Self { points, policy }
    }

    /// The retention policy fixed at construction.
    pub fn policy(&self) -> TrailPolicy {
        self.policy
    }

    /// Number of points currently retained.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// `true` before the first push and after a reset on wrap.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Appends one point, evicting the oldest one if the cap is reached.
    ///
    /// With `Capped(0)` nothing is ever stored.
    pub fn push(&mut self, p: DVec2) {
        if let TrailPolicy::Capped(cap) = self.policy {
            if cap == 0 {
                return;
            }
            while self.points.len() >= cap {
                self.points.pop_front();
            }
        }
        self.points.push_back(p);
    }

    /// Called by playback when the frame index wraps back to zero.
    pub fn on_wrap(&mut self) {
        if self.policy == TrailPolicy::ResetOnWrap {
            self.points.clear();
        }
    }

    /// The stored points as one contiguous slice, oldest first.
    ///
    /// Takes `&mut self` because a wrapped ring buffer is rotated in place.
    pub fn as_slice(&mut self) -> &[DVec2] {
        self.points.make_contiguous()
    }

    /// Most recently recorded point.
    pub fn last(&self) -> Option<DVec2> {
        self.points.back().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(i: usize) -> DVec2 {
        DVec2::new(i as f64, -(i as f64))
    }

    #[test]
    fn unbounded_keeps_everything_across_wraps() {
        let mut trail = Trail::new(TrailPolicy::Unbounded);
        for i in 0..10 {
            trail.push(pt(i));
            if i % 3 == 2 {
                trail.on_wrap();
            }
        }

        assert_eq!(trail.len(), 10);
        assert_eq!(trail.as_slice()[0], pt(0));
        assert_eq!(trail.last(), Some(pt(9)));
    }

    #[test]
    fn capped_keeps_newest_points_in_order() {
        let mut trail = Trail::new(TrailPolicy::Capped(4));
        for i in 0..11 {
            trail.push(pt(i));
        }
        trail.on_wrap();

        assert_eq!(trail.len(), 4);
        assert_eq!(trail.as_slice(), &[pt(7), pt(8), pt(9), pt(10)]);
    }

    #[test]
    fn capped_zero_stores_nothing() {
        let mut trail = Trail::new(TrailPolicy::Capped(0));
        trail.push(pt(1));
        assert!(trail.is_empty());
        assert!(trail.as_slice().is_empty());
    }

    #[test]
    fn reset_on_wrap_clears_only_on_wrap() {
        let mut trail = Trail::new(TrailPolicy::ResetOnWrap);
        trail.push(pt(0));
        trail.push(pt(1));
        assert_eq!(trail.len(), 2);

        trail.on_wrap();
        assert!(trail.is_empty());

        trail.push(pt(2));
        assert_eq!(trail.as_slice(), &[pt(2)]);
        assert_eq!(trail.policy(), TrailPolicy::ResetOnWrap);
    }
}
