//! Seeded spatial placement: radial rings, jittered grids with rejection, and
//! posts along a line.
//!
//! All positions are tile-local XZ (`Vec2`), all angles radians. Jitter and
//! density parameters are unitless fractions of the local cell size (the
//! angular step and radius for rings, the cell edge for grids, the post
//! spacing for lines).
//!
//! A candidate that lands inside an [`ExclusionZone`] gets exactly one
//! resample. If the resample is still blocked the caller's [`RejectPolicy`]
//! decides: `Skip` drops the item, `ClampOutward` pushes it out of each zone
//! it overlaps in a single pass. The clamp can push an item into a zone it
//! already passed, so residual overlap is possible and accepted. Every loop
//! is bounded by the requested count, so generation is O(N) per call.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec2;

use crate::seed::SeedStream;

/// Resample attempts allowed per blocked candidate.
pub const MAX_RESAMPLES: u32 = 1;
/// Upper bound on items in one ring.
pub const MAX_RING_COUNT: u32 = 4_096;
/// Upper bound on cells visited by one grid.
pub const MAX_GRID_CELLS: usize = 16_384;
/// Upper bound on posts along one line.
pub const MAX_LINE_POSTS: usize = 1_024;
/// Smallest accepted grid cell / post spacing.
pub const MIN_CELL_SIZE: f32 = 0.25;

/// Distance an outward clamp leaves between an item and the zone edge.
const CLAMP_MARGIN: f32 = 0.05;
const EPSILON: f32 = 1e-6;

// ---------------------------------------------------------------------------
// Exclusion zones
// ---------------------------------------------------------------------------

/// Region placement should keep clear of.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ExclusionZone {
    /// A disc, e.g. a building footprint.
    Circle {
        /// Disc centre.
        center: Vec2,
        /// Disc radius.
        radius: f32,
    },
    /// An axis-aligned rectangle.
    Rect {
        /// Minimum corner.
        min: Vec2,
        /// Maximum corner.
        max: Vec2,
    },
    /// A band around a segment, e.g. a canal, river or path.
    Corridor {
        /// Segment start.
        start: Vec2,
        /// Segment end.
        end: Vec2,
        /// Half of the band width.
        half_width: f32,
    },
}

impl ExclusionZone {
    /// Whether `p` lies strictly inside the zone.
    pub fn contains(&self, p: Vec2) -> bool {
        match *self {
            Self::Circle { center, radius } => p.distance_squared(center) < radius * radius,
            Self::Rect { min, max } => p.x > min.x && p.x < max.x && p.y > min.y && p.y < max.y,
            Self::Corridor {
                start,
                end,
                half_width,
            } => p.distance_squared(closest_on_segment(p, start, end)) < half_width * half_width,
        }
    }

    /// The nearest point just outside the zone. Points already outside are
    /// returned unchanged.
    pub fn push_outside(&self, p: Vec2) -> Vec2 {
        if !self.contains(p) {
            return p;
        }
        match *self {
            Self::Circle { center, radius } => {
                let dir = (p - center).try_normalize().unwrap_or(Vec2::X);
                center + dir * (radius + CLAMP_MARGIN)
            }
            Self::Rect { min, max } => {
                let left = p.x - min.x;
                let right = max.x - p.x;
                let down = p.y - min.y;
                let up = max.y - p.y;
                let nearest = left.min(right).min(down).min(up);
                if nearest == left {
                    Vec2::new(min.x - CLAMP_MARGIN, p.y)
                } else if nearest == right {
                    Vec2::new(max.x + CLAMP_MARGIN, p.y)
                } else if nearest == down {
                    Vec2::new(p.x, min.y - CLAMP_MARGIN)
                } else {
                    Vec2::new(p.x, max.y + CLAMP_MARGIN)
                }
            }
            Self::Corridor {
                start,
                end,
                half_width,
            } => {
                let q = closest_on_segment(p, start, end);
                let dir = (p - q)
                    .try_normalize()
                    .or_else(|| (end - start).perp().try_normalize())
                    .unwrap_or(Vec2::X);
                q + dir * (half_width + CLAMP_MARGIN)
            }
        }
    }
}

fn closest_on_segment(p: Vec2, start: Vec2, end: Vec2) -> Vec2 {
    let seg = end - start;
    let len_sq = seg.length_squared();
    if len_sq < EPSILON {
        return start;
    }
    let t = ((p - start).dot(seg) / len_sq).clamp(0.0, 1.0);
    start + seg * t
}

/// Whether any zone blocks `p`.
pub fn is_excluded(zones: &[ExclusionZone], p: Vec2) -> bool {
    zones.iter().any(|z| z.contains(p))
}

/// What happens to a candidate that is still blocked after its resample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectPolicy {
    /// Drop the item. The call may return fewer items than requested.
    Skip,
    /// Push the item out of every zone it overlaps. Always returns the
    /// requested count; residual overlap with a second zone is possible.
    ClampOutward,
}

/// How a placement was resolved against the exclusion zones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The first candidate was clear.
    Clean,
    /// The first candidate was blocked, the resample was clear.
    Resampled,
    /// Both attempts were blocked and the item was pushed outward.
    Clamped,
}

/// One placed item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Tile-local XZ position.
    pub position: Vec2,
    /// Yaw in radians, `[0, TAU)`.
    pub rotation: f32,
    /// Ring slot, grid cell or post index that produced this item.
    pub slot: u32,
    /// How the exclusion zones were resolved.
    pub resolution: Resolution,
}

fn resolve(
    candidate: Vec2,
    resample: impl FnOnce() -> Vec2,
    zones: &[ExclusionZone],
    policy: RejectPolicy,
) -> Option<(Vec2, Resolution)> {
    if !is_excluded(zones, candidate) {
        return Some((candidate, Resolution::Clean));
    }
    let retry = resample();
    if !is_excluded(zones, retry) {
        return Some((retry, Resolution::Resampled));
    }
    match policy {
        RejectPolicy::Skip => None,
        RejectPolicy::ClampOutward => {
            let clamped = zones.iter().fold(retry, |p, zone| zone.push_outside(p));
            Some((clamped, Resolution::Clamped))
        }
    }
}

/// Wrap an angle into `[0, TAU)`.
#[inline]
pub fn wrap_angle(a: f32) -> f32 {
    let w = a.rem_euclid(TAU);
    if w.is_finite() && w < TAU { w } else { 0.0 }
}

fn finite_or(v: f32, default: f32) -> f32 {
    if v.is_finite() { v } else { default }
}

fn finite_vec_or(v: Vec2, default: Vec2) -> Vec2 {
    if v.is_finite() { v } else { default }
}

fn unit_clamp(v: f32, max: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, max) }
}

// ---------------------------------------------------------------------------
// Radial ring
// ---------------------------------------------------------------------------

/// Which way ring items face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Facing {
    /// Toward the ring centre.
    Inward,
    /// Away from the ring centre.
    Outward,
    /// Along the ring, counter-clockwise.
    Tangent,
    /// Seeded random yaw.
    Seeded,
}

/// Parameters for [`radial_ring`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RingParams {
    /// Ring centre.
    pub center: Vec2,
    /// Number of items.
    pub count: u32,
    /// Nominal radius.
    pub radius: f32,
    /// Angle of slot 0.
    pub angle_offset: f32,
    /// Angular jitter as a fraction of the step `TAU / count`, clamped to
    /// `[0, 0.5]` so neighbouring slots never swap order.
    pub angle_jitter: f32,
    /// Radial jitter as a fraction of `radius`, clamped to `[0, 1]`.
    pub radius_jitter: f32,
    /// Item orientation.
    pub facing: Facing,
}

impl RingParams {
    /// `count` items at `radius` around the origin, no jitter, facing inward.
    pub fn new(count: u32, radius: f32) -> Self {
        Self {
            center: Vec2::ZERO,
            count,
            radius,
            angle_offset: 0.0,
            angle_jitter: 0.0,
            radius_jitter: 0.0,
            facing: Facing::Inward,
        }
    }

    /// Move the ring centre.
    pub fn with_center(mut self, center: Vec2) -> Self {
        self.center = center;
        self
    }

    /// Rotate the whole ring.
    pub fn with_angle_offset(mut self, angle_offset: f32) -> Self {
        self.angle_offset = angle_offset;
        self
    }

    /// Set angular and radial jitter fractions.
    pub fn with_jitter(mut self, angle_jitter: f32, radius_jitter: f32) -> Self {
        self.angle_jitter = angle_jitter;
        self.radius_jitter = radius_jitter;
        self
    }

    /// Set item orientation.
    pub fn with_facing(mut self, facing: Facing) -> Self {
        self.facing = facing;
        self
    }

    fn sanitized(self) -> Self {
        Self {
            center: finite_vec_or(self.center, Vec2::ZERO),
            count: self.count.min(MAX_RING_COUNT),
            radius: finite_or(self.radius, 0.0).max(0.0),
            angle_offset: finite_or(self.angle_offset, 0.0),
            angle_jitter: unit_clamp(self.angle_jitter, 0.5),
            radius_jitter: unit_clamp(self.radius_jitter, 1.0),
            facing: self.facing,
        }
    }

    /// Smallest radius any item can be placed at, before exclusion handling.
    pub fn min_radius(&self) -> f32 {
        let p = self.sanitized();
        p.radius * (1.0 - p.radius_jitter)
    }

    /// Largest radius any item can be placed at, before exclusion handling.
    pub fn max_radius(&self) -> f32 {
        let p = self.sanitized();
        p.radius * (1.0 + p.radius_jitter)
    }
}

/// Place `count` items around a centre at angle step `TAU / count`, each
/// perturbed by seeded angle and radius jitter.
///
/// Item `i` draws from `stream.fork(i)`, so adding exclusion zones or
/// changing the policy never shifts the draws of other items. With no zones
/// the result always has exactly `count` items (capped at
/// [`MAX_RING_COUNT`]).
pub fn radial_ring(
    params: RingParams,
    stream: SeedStream,
    zones: &[ExclusionZone],
    policy: RejectPolicy,
) -> Vec<Placement> {
    let p = params.sanitized();
    if p.count == 0 {
        return Vec::new();
    }
    let step = TAU / p.count as f32;
    let mut out = Vec::with_capacity(p.count as usize);

    for i in 0..p.count {
        let item = stream.fork(u64::from(i));
        let candidate = ring_point(&p, step, i, item, 0);
        let Some((position, resolution)) =
            resolve(candidate, || ring_point(&p, step, i, item, 1), zones, policy)
        else {
            continue;
        };

        let bearing = libm::atan2f(position.y - p.center.y, position.x - p.center.x);
        let rotation = match p.facing {
            Facing::Inward => wrap_angle(bearing + PI),
            Facing::Outward => wrap_angle(bearing),
            Facing::Tangent => wrap_angle(bearing + FRAC_PI_2),
            Facing::Seeded => item.range(4, 0.0, TAU),
        };

        out.push(Placement {
            position,
            rotation,
            slot: i,
            resolution,
        });
    }

    out
}

fn ring_point(p: &RingParams, step: f32, i: u32, item: SeedStream, attempt: u64) -> Vec2 {
    let theta = p.angle_offset + i as f32 * step + item.signed(attempt * 2) * p.angle_jitter * step;
    let r = p.radius * (1.0 + item.signed(attempt * 2 + 1) * p.radius_jitter);
    p.center + Vec2::new(libm::cosf(theta), libm::sinf(theta)) * r
}

// ---------------------------------------------------------------------------
// Grid with rejection
// ---------------------------------------------------------------------------

/// Orientation of grid items.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GridRotation {
    /// Every item uses this yaw.
    Fixed(f32),
    /// Seeded multiple of 90 degrees.
    QuarterTurns,
    /// Seeded yaw in `[0, TAU)`.
    Seeded,
}

/// Parameters for [`grid_with_rejection`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridParams {
    /// Footprint minimum corner.
    pub min: Vec2,
    /// Footprint maximum corner.
    pub max: Vec2,
    /// Cell edge length.
    pub cell_size: f32,
    /// Probability of keeping a cell, `[0, 1]`.
    pub density: f32,
    /// Position jitter as a fraction of the cell, `[0, 1]`. At 1.0 an item can
    /// land anywhere in its cell.
    pub jitter: f32,
    /// Item orientation.
    pub rotation: GridRotation,
}

impl GridParams {
    /// A fully dense, unjittered grid over `[min, max]`.
    pub fn new(min: Vec2, max: Vec2, cell_size: f32) -> Self {
        Self {
            min,
            max,
            cell_size,
            density: 1.0,
            jitter: 0.0,
            rotation: GridRotation::Fixed(0.0),
        }
    }

    /// Set the keep probability.
    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    /// Set the jitter fraction.
    pub fn with_jitter(mut self, jitter: f32) -> Self {
        self.jitter = jitter;
        self
    }

    /// Set item orientation.
    pub fn with_rotation(mut self, rotation: GridRotation) -> Self {
        self.rotation = rotation;
        self
    }

    fn sanitized(self) -> Self {
        let a = finite_vec_or(self.min, Vec2::ZERO);
        let b = finite_vec_or(self.max, Vec2::ZERO);
        let cell_size = if self.cell_size.is_finite() {
            self.cell_size.max(MIN_CELL_SIZE)
        } else {
            1.0
        };
        Self {
            min: a.min(b),
            max: a.max(b),
            cell_size,
            density: unit_clamp(self.density, 1.0),
            jitter: unit_clamp(self.jitter, 1.0),
            rotation: match self.rotation {
                GridRotation::Fixed(a) => GridRotation::Fixed(wrap_angle(finite_or(a, 0.0))),
                other => other,
            },
        }
    }

    /// Number of `(columns, rows)` the footprint divides into.
    ///
    /// Each count is `extent / cell_size` rounded to the nearest integer, so
    /// `columns * rows` tracks `(W / s) * (D / s)` for any footprint.
    pub fn dimensions(&self) -> (usize, usize) {
        let p = self.sanitized();
        let size = p.max - p.min;
        (
            (size.x / p.cell_size).round() as usize,
            (size.y / p.cell_size).round() as usize,
        )
    }

    /// Edge lengths of one cell after [`GridParams::dimensions`] divides the
    /// footprint. Cells stretch or shrink from `cell_size` so the grid covers
    /// the footprint exactly.
    pub fn cell_extent(&self) -> Vec2 {
        let p = self.sanitized();
        let (cols, rows) = p.dimensions();
        let size = p.max - p.min;
        let axis = |extent: f32, count: usize| {
            if count == 0 {
                p.cell_size
            } else {
                extent / count as f32
            }
        };
        Vec2::new(axis(size.x, cols), axis(size.y, rows))
    }
}

/// Walk the cells of a rectangular footprint, keep each with probability
/// `density`, and jitter kept items inside their cell.
///
/// Cells are stretched to cover the footprint, see
/// [`GridParams::cell_extent`]. At most [`MAX_GRID_CELLS`] cells are visited,
/// in row-major order. Cell `k` draws from `stream.fork(k)`.
pub fn grid_with_rejection(
    params: GridParams,
    stream: SeedStream,
    zones: &[ExclusionZone],
    policy: RejectPolicy,
) -> Vec<Placement> {
    let p = params.sanitized();
    let (cols, rows) = p.dimensions();
    let cells = cols.saturating_mul(rows).min(MAX_GRID_CELLS);
    if cells == 0 {
        return Vec::new();
    }

    let cell = p.cell_extent();
    let reach = cell * (0.5 * p.jitter);

    let mut out = Vec::with_capacity((cells as f32 * p.density).ceil() as usize);

    for k in 0..cells {
        let item = stream.fork(k as u64);
        if !item.chance(0, p.density) {
            continue;
        }
        let (col, row) = (k % cols, k / cols);
        let center = p.min + Vec2::new(col as f32 + 0.5, row as f32 + 0.5) * cell;
        let candidate = center + Vec2::new(item.signed(1), item.signed(2)) * reach;
        let Some((position, resolution)) = resolve(
            candidate,
            || center + Vec2::new(item.signed(3), item.signed(4)) * reach,
            zones,
            policy,
        ) else {
            continue;
        };

        let rotation = match p.rotation {
            GridRotation::Fixed(a) => a,
            GridRotation::QuarterTurns => item.pick(5, 4) as f32 * FRAC_PI_2,
            GridRotation::Seeded => item.range(5, 0.0, TAU),
        };

        out.push(Placement {
            position,
            rotation,
            slot: k as u32,
            resolution,
        });
    }

    out
}

// ---------------------------------------------------------------------------
// Posts along a line
// ---------------------------------------------------------------------------

/// Parameters for [`line_posts`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineParams {
    /// First post.
    pub start: Vec2,
    /// Last post.
    pub end: Vec2,
    /// Target distance between posts.
    pub spacing: f32,
    /// Sideways jitter as a fraction of `spacing`, `[0, 1]`.
    pub jitter: f32,
}

/// Evenly spaced posts from `start` to `end` inclusive, jittered sideways.
///
/// Posts face along the line. A zero-length line yields a single post.
pub fn line_posts(
    params: LineParams,
    stream: SeedStream,
    zones: &[ExclusionZone],
    policy: RejectPolicy,
) -> Vec<Placement> {
    let start = finite_vec_or(params.start, Vec2::ZERO);
    let end = finite_vec_or(params.end, start);
    let spacing = if params.spacing.is_finite() {
        params.spacing.max(MIN_CELL_SIZE)
    } else {
        1.0
    };
    let jitter = unit_clamp(params.jitter, 1.0) * spacing * 0.5;

    let seg = end - start;
    let length = seg.length();
    let dir = seg.try_normalize().unwrap_or(Vec2::X);
    let side = dir.perp();
    let heading = wrap_angle(libm::atan2f(dir.y, dir.x));

    let posts = if length < EPSILON {
        1
    } else {
        ((length / spacing).round() as usize + 1).min(MAX_LINE_POSTS)
    };
    let step = if posts > 1 { length / (posts - 1) as f32 } else { 0.0 };

    let mut out = Vec::with_capacity(posts);
    for i in 0..posts {
        let item = stream.fork(i as u64);
        let base = start + dir * (step * i as f32);
        let candidate = base + side * (item.signed(0) * jitter);
        let Some((position, resolution)) = resolve(
            candidate,
            || base + side * (item.signed(1) * jitter),
            zones,
            policy,
        ) else {
            continue;
        };
        out.push(Placement {
            position,
            rotation: heading,
            slot: i as u32,
            resolution,
        });
    }
    out
}
