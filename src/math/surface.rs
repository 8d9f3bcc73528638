use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};
use crate::math::mesh::LineMesh;

pub type SurfaceFormula = fn(f64, f64) -> DVec3;

/// Richmond's minimal surface. Undefined at `u = v = 0`.
pub fn richmond(u: f64, v: f64) -> DVec3 {
    let r2 = u * u + v * v;
    DVec3::new(
        u.powi(3) / 3.0 - u * v * v + u / r2,
        -u * u * v + v.powi(3) / 3.0 - v / r2,
        2.0 * u,
    )
}

/// What to do with segments touching the parameter-space origin, where
/// formulas such as [`richmond`] divide by zero.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SingularityPolicy {
    /// Emit every segment, non-finite coordinates included.
    PassThrough,
    /// Drop segments with an endpoint where `u² + v² < epsilon` or whose
    /// evaluated position is not finite.
    Skip { epsilon: f64 },
}

impl Default for SingularityPolicy {
    fn default() -> Self {
        Self::Skip { epsilon: 1e-12 }
    }
}

impl SingularityPolicy {
    fn keeps(&self, params: [(f64, f64); 2], points: [DVec3; 2]) -> bool {
        match *self {
            Self::PassThrough => true,
            Self::Skip { epsilon } => {
                params.iter().all(|(u, v)| u * u + v * v >= epsilon)
                    && points.iter().all(|p| p.is_finite())
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct ParametricSurfaceSpec {
    u_range: (f64, f64),
    v_range: (f64, f64),
    u_steps: usize,
    v_steps: usize,
    formula: SurfaceFormula,
}

impl ParametricSurfaceSpec {
    pub fn new(
        u_range: (f64, f64),
        v_range: (f64, f64),
        u_steps: usize,
        v_steps: usize,
        formula: SurfaceFormula,
    ) -> Result<Self> {
        for (name, (lo, hi)) in [("u", u_range), ("v", v_range)] {
            if !lo.is_finite() || !hi.is_finite() || lo >= hi {
                return Err(ViewerError::Config(format!(
                    "{name} range must satisfy min < max, got ({lo}, {hi})"
                )));
            }
        }
        if u_steps == 0 || v_steps == 0 {
            return Err(ViewerError::Config(format!(
                "step counts must be positive, got u={u_steps} v={v_steps}"
            )));
        }
        if grid_vertex_count(u_steps, v_steps).is_none_or(|n| u32::try_from(n).is_err()) {
            return Err(ViewerError::Config(format!(
                "u={u_steps} v={v_steps} steps produce more vertices than a draw call can address"
            )));
        }

        Ok(Self {
            u_range,
            v_range,
            u_steps,
            v_steps,
            formula,
        })
    }

    /// Richmond's surface over `[-2, 2] × [-2, 2]` with 100 steps per axis.
    #[cfg(test)]
    pub fn richmond_default() -> Self {
        Self {
            u_range: (-2.0, 2.0),
            v_range: (-2.0, 2.0),
            u_steps: 100,
            v_steps: 100,
            formula: richmond,
        }
    }

    pub fn u_step(&self) -> f64 {
        (self.u_range.1 - self.u_range.0) / self.u_steps as f64
    }

    pub fn v_step(&self) -> f64 {
        (self.v_range.1 - self.v_range.0) / self.v_steps as f64
    }

    fn u_at(&self, i: usize) -> f64 {
        self.u_range.0 + i as f64 * self.u_step()
    }

    fn v_at(&self, j: usize) -> f64 {
        self.v_range.0 + j as f64 * self.v_step()
    }

    pub fn evaluate(&self, u: f64, v: f64) -> DVec3 {
        (self.formula)(u, v)
    }
}

/// Vertices emitted by both curve families before any segment is skipped.
fn grid_vertex_count(u_steps: usize, v_steps: usize) -> Option<usize> {
    let horizontal = v_steps.checked_add(1)?.checked_mul(u_steps)?;
    let vertical = u_steps.checked_add(1)?.checked_mul(v_steps)?;
    horizontal.checked_add(vertical)?.checked_mul(2)
}

pub struct SurfaceWireframe {
    /// Constant-v curves, stepping u.
    pub horizontal: LineMesh,
    /// Constant-u curves, stepping v.
    pub vertical: LineMesh,
}

impl SurfaceWireframe {
    pub fn combined(&self) -> LineMesh {
        let mut mesh = LineMesh::with_segment_capacity(
            self.horizontal.segment_count() + self.vertical.segment_count(),
        );
        mesh.extend(&self.horizontal);
        mesh.extend(&self.vertical);
        mesh
    }
}

pub fn tessellate(spec: &ParametricSurfaceSpec, policy: SingularityPolicy) -> SurfaceWireframe {
    let mut horizontal = LineMesh::with_segment_capacity((spec.v_steps + 1) * spec.u_steps);
    for j in 0..=spec.v_steps {
        let v = spec.v_at(j);
        for i in 0..spec.u_steps {
            let (u0, u1) = (spec.u_at(i), spec.u_at(i + 1));
            push_checked(&mut horizontal, spec, policy, [(u0, v), (u1, v)]);
        }
    }

    let mut vertical = LineMesh::with_segment_capacity((spec.u_steps + 1) * spec.v_steps);
    for i in 0..=spec.u_steps {
        let u = spec.u_at(i);
        for j in 0..spec.v_steps {
            let (v0, v1) = (spec.v_at(j), spec.v_at(j + 1));
            push_checked(&mut vertical, spec, policy, [(u, v0), (u, v1)]);
        }
    }

    log::debug!(
        "tessellated surface: {} horizontal, {} vertical segments",
        horizontal.segment_count(),
        vertical.segment_count()
    );

    SurfaceWireframe {
        horizontal,
        vertical,
    }
}

fn push_checked(
    mesh: &mut LineMesh,
    spec: &ParametricSurfaceSpec,
    policy: SingularityPolicy,
    params: [(f64, f64); 2],
) {
    let start = spec.evaluate(params[0].0, params[0].1);
    let end = spec.evaluate(params[1].0, params[1].1);
    if policy.keeps(params, [start, end]) {
        mesh.push_segment(start, end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane(u: f64, v: f64) -> DVec3 {
        DVec3::new(u, v, 0.0)
    }

    #[test]
    fn richmond_known_values() {
        let p = richmond(1.0, 0.0);
        assert!((p.x - 4.0 / 3.0).abs() < 1e-12);
        assert_eq!(p.y, 0.0);
        assert_eq!(p.z, 2.0);

        let q = richmond(0.0, 1.0);
        assert_eq!(q.x, 0.0);
        assert!((q.y + 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(q.z, 0.0);
    }

    #[test]
    fn richmond_is_singular_at_origin() {
        assert!(!richmond(0.0, 0.0).is_finite());
    }

    #[test]
    fn pass_through_counts_match_grid() {
        let spec = ParametricSurfaceSpec::richmond_default();
        let wire = tessellate(&spec, SingularityPolicy::PassThrough);

        assert_eq!(wire.horizontal.segment_count(), 101 * 100);
        assert_eq!(wire.vertical.segment_count(), 101 * 100);
        assert_eq!(wire.combined().segment_count(), 2 * 101 * 100);
    }

    #[test]
    fn skip_drops_exactly_the_segments_touching_the_origin() {
        let spec = ParametricSurfaceSpec::richmond_default();
        let all = tessellate(&spec, SingularityPolicy::PassThrough);
        let kept = tessellate(&spec, SingularityPolicy::default());

        assert_eq!(kept.horizontal.segment_count(), 101 * 100 - 2);
        assert_eq!(kept.vertical.segment_count(), 101 * 100 - 2);

        // Grid index 50 is the parameter origin on both axes. Horizontal
        // segments are laid out row by row (v), vertical ones column by column (u).
        let touching = [50 * 100 + 49, 50 * 100 + 50];
        let families = [
            (&all.horizontal, &kept.horizontal),
            (&all.vertical, &kept.vertical),
        ];
        for (full, filtered) in families {
            let expected: Vec<_> = full
                .segments()
                .enumerate()
                .filter(|(k, _)| !touching.contains(k))
                .map(|(_, segment)| segment)
                .collect();
            let actual: Vec<_> = filtered.segments().collect();
            assert_eq!(actual, expected);
            assert!(filtered.vertices.iter().all(|c| c.is_finite()));
        }
        for k in touching {
            let (a, b) = all.horizontal.segments().nth(k).unwrap();
            assert!(a.iter().chain(b.iter()).any(|c| !c.is_finite()));
        }
    }

    #[test]
    fn skip_epsilon_can_clear_a_disc_around_the_origin() {
        // Step 0.5, so the origin and its four axis neighbours fall inside r² < 0.3.
        let spec = ParametricSurfaceSpec::new((-1.0, 1.0), (-1.0, 1.0), 4, 4, plane).unwrap();
        let wire = tessellate(&spec, SingularityPolicy::Skip { epsilon: 0.3 });

        assert_eq!(wire.horizontal.segment_count(), 20 - 8);
        assert_eq!(wire.vertical.segment_count(), 20 - 8);
        for (a, b) in wire.combined().segments() {
            for p in [a, b] {
                assert!(p[0] * p[0] + p[1] * p[1] >= 0.3, "{p:?}");
            }
        }
    }

    #[test]
    fn rejects_step_counts_that_overflow_vertex_indices() {
        let err =
            ParametricSurfaceSpec::new((0.0, 1.0), (0.0, 1.0), usize::MAX, 1, plane).unwrap_err();
        assert!(matches!(err, ViewerError::Config(_)));

        let unit = (0.0, 1.0);
        assert!(ParametricSurfaceSpec::new(unit, unit, 100_000, 100_000, plane).is_err());
        assert!(ParametricSurfaceSpec::new(unit, unit, 1_000, 1_000, plane).is_ok());
    }

    #[test]
    fn segments_follow_index_stepping() {
        let spec = ParametricSurfaceSpec::new((0.0, 2.0), (0.0, 1.0), 2, 1, plane).unwrap();
        let wire = tessellate(&spec, SingularityPolicy::PassThrough);

        let horizontal: Vec<_> = wire.horizontal.segments().collect();
        assert_eq!(
            horizontal,
            vec![
                ([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
                ([1.0, 0.0, 0.0], [2.0, 0.0, 0.0]),
                ([0.0, 1.0, 0.0], [1.0, 1.0, 0.0]),
                ([1.0, 1.0, 0.0], [2.0, 1.0, 0.0]),
            ]
        );

        let vertical: Vec<_> = wire.vertical.segments().collect();
        assert_eq!(
            vertical,
            vec![
                ([0.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
                ([1.0, 0.0, 0.0], [1.0, 1.0, 0.0]),
                ([2.0, 0.0, 0.0], [2.0, 1.0, 0.0]),
            ]
        );
    }

    #[test]
    fn tessellation_is_deterministic() {
        let spec = ParametricSurfaceSpec::richmond_default();
        let a = tessellate(&spec, SingularityPolicy::default()).combined();
        let b = tessellate(&spec, SingularityPolicy::default()).combined();

        let bits = |m: &LineMesh| m.vertices.iter().map(|f| f.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn rejects_empty_or_inverted_domains() {
        assert!(ParametricSurfaceSpec::new((1.0, 1.0), (0.0, 1.0), 4, 4, plane).is_err());
        assert!(ParametricSurfaceSpec::new((0.0, 1.0), (2.0, -2.0), 4, 4, plane).is_err());
        assert!(ParametricSurfaceSpec::new((0.0, 1.0), (0.0, 1.0), 0, 4, plane).is_err());
        assert!(ParametricSurfaceSpec::new((f64::NAN, 1.0), (0.0, 1.0), 4, 4, plane).is_err());
    }
}
