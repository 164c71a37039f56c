//! Initial blade population generation.
//!
//! Runs once on the host before upload. The default entry points use an
//! unseeded thread RNG, so two runs never produce the same field;
//! `generate_with` accepts any `Rng` for reproducible tests and benches.

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec3;
use rand::Rng;

use crate::grass::blade::Blade;
use crate::grass::config::{BladeRanges, GrassConfig, Placement};

/// Position of the single debug blade
pub const SINGLE_BLADE_POSITION: Vec3 = Vec3::new(0.5, 0.0, 0.0);
const SINGLE_BLADE_HEIGHT: f32 = 5.0;
const SINGLE_BLADE_WIDTH: f32 = 2.0;
const SINGLE_BLADE_STIFFNESS: f32 = 2.5;

/// `count` blades scattered over a `bounds` x `bounds` square on the XZ plane.
pub fn generate(count: usize, bounds: f32) -> Vec<Blade> {
    generate_with(&mut rand::thread_rng(), Placement::Plane, count, bounds, &BladeRanges::default())
}

/// Population described by a grass config.
pub fn generate_from_config(config: &GrassConfig) -> Vec<Blade> {
    generate_with(
        &mut rand::thread_rng(),
        config.placement,
        config.blade_count as usize,
        config.bounds,
        &config.ranges,
    )
}

/// Generate a population with an explicit RNG and placement policy.
pub fn generate_with<R: Rng + ?Sized>(
    rng: &mut R,
    placement: Placement,
    count: usize,
    bounds: f32,
    ranges: &BladeRanges,
) -> Vec<Blade> {
    match placement {
        Placement::Single => vec![single_blade()],
        Placement::Plane => (0..count).map(|_| plane_blade(rng, bounds, ranges)).collect(),
        Placement::Heart => (0..count).map(|_| heart_blade(rng, ranges)).collect(),
    }
}

/// The fixed debug blade: base (0.5, 0, 0), height 5, width 2.
pub fn single_blade() -> Blade {
    Blade::new(
        SINGLE_BLADE_POSITION,
        Vec3::Y,
        FRAC_PI_2,
        SINGLE_BLADE_HEIGHT,
        SINGLE_BLADE_WIDTH,
        SINGLE_BLADE_STIFFNESS,
    )
}

fn random_shape<R: Rng + ?Sized>(rng: &mut R, ranges: &BladeRanges) -> (f32, f32, f32, f32) {
    let direction = rng.gen_range(0.0..TAU);
    let height = ranges.height.lerp(rng.r#gen::<f32>());
    let width = ranges.width.lerp(rng.r#gen::<f32>());
    let stiffness = ranges.stiffness.lerp(rng.r#gen::<f32>());
    (direction, height, width, stiffness)
}

fn plane_blade<R: Rng + ?Sized>(rng: &mut R, bounds: f32, ranges: &BladeRanges) -> Blade {
    let x = (rng.r#gen::<f32>() - 0.5) * bounds;
    let z = (rng.r#gen::<f32>() - 0.5) * bounds;
    let (direction, height, width, stiffness) = random_shape(rng, ranges);
    Blade::new(Vec3::new(x, 0.0, z), Vec3::Y, direction, height, width, stiffness)
}

/// Point on the heart surface for parameters `t, s` in [0, 2π).
pub fn heart_point(t: f32, s: f32) -> Vec3 {
    let sin3 = t.sin().powi(3);
    Vec3::new(
        16.0 * sin3,
        13.0 * t.cos() - 5.0 * (2.0 * t).cos() - 2.0 * (3.0 * t).cos() - (4.0 * t).cos(),
        16.0 * sin3 * s.cos(),
    )
}

fn heart_blade<R: Rng + ?Sized>(rng: &mut R, ranges: &BladeRanges) -> Blade {
    let t = rng.gen_range(0.0..TAU);
    let s = rng.gen_range(0.0..TAU);
    let position = heart_point(t, s);
    // Outward from the surface center; Blade::new falls back to +Y at the origin
    let up = position.normalize_or(Vec3::Y);
    let (direction, height, width, stiffness) = random_shape(rng, ranges);
    Blade::new(position, up, direction, height, width, stiffness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_single_blade() {
        let blades = generate_with(&mut StdRng::seed_from_u64(1), Placement::Single, 500, 30.0, &BladeRanges::default());
        assert_eq!(blades.len(), 1);
        let blade = blades[0];
        assert_eq!(blade.base(), SINGLE_BLADE_POSITION);
        assert_eq!(blade.height(), 5.0);
        assert_eq!(blade.width(), 2.0);
        assert_eq!(blade.v1, [0.5, 5.0, 0.0, 5.0]);
        assert!(blade.validate().is_ok());
    }

    #[test]
    fn test_plane_population_invariants() {
        let ranges = BladeRanges::default();
        let bounds = 30.0;
        let blades = generate_with(&mut StdRng::seed_from_u64(7), Placement::Plane, 4000, bounds, &ranges);
        assert_eq!(blades.len(), 4000);

        for blade in &blades {
            blade.validate().expect("generated blade must be valid");
            let base = blade.base();
            assert!(base.x.abs() <= bounds / 2.0 && base.z.abs() <= bounds / 2.0);
            assert_eq!(base.y, 0.0);
            assert_eq!(blade.up_vector(), Vec3::Y);
            assert!((0.0..TAU).contains(&blade.direction()));
            assert!(ranges.height.contains(blade.height()));
            assert!(ranges.width.contains(blade.width()));
            assert!(ranges.stiffness.contains(blade.stiffness()));
        }
    }

    #[test]
    fn test_plane_population_spreads_over_all_quadrants() {
        let blades = generate_with(&mut StdRng::seed_from_u64(3), Placement::Plane, 400, 30.0, &BladeRanges::default());
        let mut quadrants = [0usize; 4];
        for blade in &blades {
            let b = blade.base();
            let q = usize::from(b.x >= 0.0) * 2 + usize::from(b.z >= 0.0);
            quadrants[q] += 1;
        }
        assert!(quadrants.iter().all(|&n| n > 50), "quadrants = {quadrants:?}");
    }

    #[test]
    fn test_heart_blades_point_outward() {
        let blades = generate_with(&mut StdRng::seed_from_u64(11), Placement::Heart, 256, 0.0, &BladeRanges::default());
        assert_eq!(blades.len(), 256);
        for blade in &blades {
            blade.validate().expect("heart blade must be valid");
            let base = blade.base();
            if base.length() > 1e-3 {
                assert!(blade.up_vector().dot(base.normalize()) > 0.999);
            }
        }
    }

    #[test]
    fn test_zero_count() {
        assert!(generate(0, 30.0).is_empty());
    }

    #[test]
    fn test_unseeded_runs_differ() {
        let a = generate(16, 30.0);
        let b = generate(16, 30.0);
        assert_ne!(a, b);
    }
}
