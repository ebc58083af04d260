//! Collision-avoiding placement for new map nodes.
//!
//! The layout engine is a set of stateless functions over the current store
//! and a candidate point: placement is deterministic for a fixed graph state
//! and fixed inputs, which is what makes branch geometry testable. Placement
//! never fails -- when the attempt bound is exhausted the last candidate is
//! returned best-effort and a visual overlap is accepted.

use serde::{Deserialize, Serialize};

use crate::store::GraphStore;

/// Minimum distance between any two node centers.
pub const NODE_SPACING: f64 = 150.0;
/// Bound on perturbation attempts before giving up (best-effort).
pub const MAX_ATTEMPTS: u32 = 15;
/// Horizontal gap between a parent and its diagnosis/test anchors.
pub const GAP_X: f64 = 140.0;
/// Vertical gap between a parent and the next downstream row.
pub const GAP_Y: f64 = 140.0;
/// Vertical spacing between fanned-out siblings.
pub const FAN_GAP: f64 = 110.0;

/// Per-attempt lateral nudge, a fixed fraction of the spacing constant.
const NUDGE: f64 = NODE_SPACING * 0.5;
/// Per-attempt radius growth of the center-bias spiral.
const SPIRAL_STEP: f64 = NODE_SPACING / 3.0;

/// A 2-D canvas position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Creates a point.
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Soft directional preference for collision correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// Nudge left-and-down per attempt.
    Left,
    /// Nudge right-and-down per attempt.
    Right,
    /// Walk a growing spiral around the base point.
    Center,
}

/// Which side of the parent a sibling group fans out on.
pub type Side = Bias;

/// Returns `true` iff `(x, y)` keeps at least `min_distance` from every node
/// currently in the store.
pub fn is_safe(store: &GraphStore, x: f64, y: f64, min_distance: f64) -> bool {
    let candidate = Point::new(x, y);
    store
        .nodes()
        .all(|node| node.pos.distance(candidate) >= min_distance)
}

/// Finds a non-overlapping position near `base`, honoring `bias`.
///
/// Returns `base` unchanged when it is already safe. Otherwise perturbs the
/// candidate up to [`MAX_ATTEMPTS`] times: lateral biases nudge x (signed by
/// the bias) and y by [`NUDGE`] per attempt; [`Bias::Center`] walks a spiral
/// with a 45-degree step and a radius growing by [`SPIRAL_STEP`] per attempt.
/// Exhausting the bound returns the last candidate anyway.
pub fn find_safe_position(store: &GraphStore, base: Point, bias: Bias) -> Point {
    if is_safe(store, base.x, base.y, NODE_SPACING) {
        return base;
    }

    let mut candidate = base;
    for attempt in 1..=MAX_ATTEMPTS {
        let k = attempt as f64;
        candidate = match bias {
            Bias::Left => Point::new(base.x - NUDGE * k, base.y + NUDGE * k),
            Bias::Right => Point::new(base.x + NUDGE * k, base.y + NUDGE * k),
            Bias::Center => {
                let angle = (k * 45.0_f64).to_radians();
                let radius = k * SPIRAL_STEP;
                Point::new(base.x + radius * angle.cos(), base.y + radius * angle.sin())
            }
        };
        if is_safe(store, candidate.x, candidate.y, NODE_SPACING) {
            return candidate;
        }
    }
    candidate
}

/// Base positions for a group of `count` siblings fanned vertically around an
/// anchor offset from `parent`.
///
/// The anchor sits one [`GAP_Y`] downstream of the parent and one [`GAP_X`]
/// to the side given by `side` ([`Bias::Center`] keeps the parent's x). The
/// group is centered on the anchor with [`FAN_GAP`] spacing, independent of
/// collision avoidance -- callers apply [`find_safe_position`] per node as a
/// secondary correction.
pub fn fan_positions(parent: Point, count: usize, side: Side) -> Vec<Point> {
    let anchor_x = match side {
        Side::Left => parent.x - GAP_X,
        Side::Right => parent.x + GAP_X,
        Side::Center => parent.x,
    };
    let anchor_y = parent.y + GAP_Y;
    let mid = (count.saturating_sub(1)) as f64 / 2.0;
    (0..count)
        .map(|i| Point::new(anchor_x, anchor_y + (i as f64 - mid) * FAN_GAP))
        .collect()
}

/// Anchor for a new aggregation point: below-left of the bounding box of the
/// owning symptom's test children.
///
/// Callers correct the anchor with [`find_safe_position`] and a
/// [`Bias::Right`] preference. An empty slice anchors below-left of the
/// origin (the caller guarantees at least one test child in practice).
pub fn aggregator_anchor(test_positions: &[Point]) -> Point {
    let mut min_x = 0.0_f64;
    let mut max_y = 0.0_f64;
    for (i, p) in test_positions.iter().enumerate() {
        if i == 0 {
            min_x = p.x;
            max_y = p.y;
        } else {
            min_x = min_x.min(p.x);
            max_y = max_y.max(p.y);
        }
    }
    Point::new(min_x - GAP_X, max_y + GAP_Y)
}
