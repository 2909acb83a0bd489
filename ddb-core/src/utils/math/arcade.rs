//! Arcade-drive mapping for a differential (tank) drivetrain.
//!
//! The `ArcadeMapping` struct turns one forward/back axis and one rotation axis
//! into independent left and right side demands. Inputs are shaped the same way
//! the competition drive library does it (clamp, deadband, optional squaring) so
//! operator feel matches the stock robot code exactly.
//!
//! # Example
//! ```rust
//! use ddb_core::utils::math::arcade::ArcadeMapping;
//! let mapping = ArcadeMapping::new(0.0, false, 1.0);
//! let out = mapping.compute(1.0, 0.0);
//! assert_eq!((out.left, out.right), (1.0, 1.0));
//! ```
//!
use libm;

/// Default joystick deadband applied before the mapping.
pub const DEFAULT_DEADBAND: f32 = 0.02;
/// Default output scale applied after clamping.
pub const DEFAULT_MAX_OUTPUT: f32 = 1.0;

/// Per-side demand produced by the drive mapping, each in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriveOutput {
    pub left: f32,
    pub right: f32,
}

impl DriveOutput {
    /// Both sides at rest.
    pub const STOPPED: DriveOutput = DriveOutput {
        left: 0.0,
        right: 0.0,
    };
}

/// Input shaping and scaling parameters for arcade drive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcadeMapping {
    /// Inputs with magnitude at or below this are treated as zero.
    deadband: f32,
    /// Square inputs (keeping sign) for finer control at low speed.
    square_inputs: bool,
    /// Scale applied to each side after clamping.
    max_output: f32,
}

impl Default for ArcadeMapping {
    fn default() -> Self {
        Self::new(DEFAULT_DEADBAND, true, DEFAULT_MAX_OUTPUT)
    }
}

impl ArcadeMapping {
    /// Instantiate with the given deadband, squaring flag and output scale.
    pub fn new(
        deadband: f32,
        square_inputs: bool,
        max_output: f32,
    ) -> Self {
        Self {
            deadband,
            square_inputs,
            max_output,
        }
    }

    /// Shape a single raw axis value: clamp, deadband, then optional squaring.
    pub fn shape_input(
        &self,
        value: f32,
    ) -> f32 {
        let v = apply_deadband(value.clamp(-1.0, 1.0), self.deadband);
        if self.square_inputs {
            libm::copysignf(v * v, v)
        } else {
            v
        }
    }

    /// Compute left/right demands for `forward` drive and `rotate` turn rate.
    ///
    /// Positive `forward` drives both sides forward, positive `rotate` turns
    /// clockwise (left side faster). Each side is clamped to `[-1, 1]` before
    /// `max_output` is applied, regardless of how large `|forward| + |rotate|` is.
    pub fn compute(
        &self,
        forward: f32,
        rotate: f32,
    ) -> DriveOutput {
        let x = self.shape_input(forward);
        let z = self.shape_input(rotate);

        let max_input = libm::copysignf(libm::fabsf(x).max(libm::fabsf(z)), x);

        let (left, right) = if x >= 0.0 {
            if z >= 0.0 {
                (max_input, x - z)
            } else {
                (x + z, max_input)
            }
        } else if z >= 0.0 {
            (x + z, max_input)
        } else {
            (max_input, x - z)
        };

        DriveOutput {
            left: left.clamp(-1.0, 1.0) * self.max_output,
            right: right.clamp(-1.0, 1.0) * self.max_output,
        }
    }
}

/// Zero out `value` inside `±deadband` and rescale the rest back onto `[-1, 1]`.
pub fn apply_deadband(
    value: f32,
    deadband: f32,
) -> f32 {
    if libm::fabsf(value) > deadband {
        if value > 0.0 {
            (value - deadband) / (1.0 - deadband)
        } else {
            (value + deadband) / (1.0 - deadband)
        }
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    fn approx(
        a: f32,
        b: f32,
    ) -> bool {
        libm::fabsf(a - b) < EPS
    }

    #[test]
    fn test_straight_forward_full_speed() {
        let out = ArcadeMapping::default().compute(1.0, 0.0);
        assert!(approx(out.left, 1.0));
        assert!(approx(out.right, 1.0));
    }

    #[test]
    fn test_pure_rotation() {
        let out = ArcadeMapping::default().compute(0.0, 1.0);
        assert!(approx(out.left, 1.0));
        assert!(approx(out.right, -1.0));

        let out = ArcadeMapping::default().compute(0.0, -1.0);
        assert!(approx(out.left, -1.0));
        assert!(approx(out.right, 1.0));
    }

    #[test]
    fn test_half_speed_is_shaped() {
        // (0.5 - 0.02) / 0.98 squared
        let expected = {
            let v = 0.48f32 / 0.98;
            v * v
        };
        let out = ArcadeMapping::default().compute(0.5, 0.0);
        assert!(approx(out.left, expected));
        assert!(approx(out.right, expected));
    }

    #[test]
    fn test_raw_mapping_quadrants() {
        let m = ArcadeMapping::new(0.0, false, 1.0);

        let out = m.compute(0.5, 0.25);
        assert!(approx(out.left, 0.5) && approx(out.right, 0.25));

        let out = m.compute(0.5, -0.25);
        assert!(approx(out.left, 0.25) && approx(out.right, 0.5));

        let out = m.compute(-0.5, 0.25);
        assert!(approx(out.left, -0.25) && approx(out.right, -0.5));

        let out = m.compute(-0.5, -0.25);
        assert!(approx(out.left, -0.5) && approx(out.right, -0.25));
    }

    #[test]
    fn test_outputs_always_clamped() {
        let m = ArcadeMapping::new(0.0, false, 1.0);
        let samples = [-1.0f32, -0.75, -0.3, 0.0, 0.4, 0.8, 1.0, 3.5, -7.0];
        for &x in samples.iter() {
            for &z in samples.iter() {
                let out = m.compute(x, z);
                assert!(
                    (-1.0..=1.0).contains(&out.left) && (-1.0..=1.0).contains(&out.right),
                    "unclamped output for ({}, {}): {:?}",
                    x,
                    z,
                    out
                );
            }
        }
    }

    #[test]
    fn test_mapping_is_idempotent() {
        let m = ArcadeMapping::default();
        assert_eq!(m.compute(0.37, -0.81), m.compute(0.37, -0.81));
    }

    #[test]
    fn test_deadband_zeroes_small_inputs() {
        assert_eq!(apply_deadband(0.01, 0.02), 0.0);
        assert_eq!(apply_deadband(-0.02, 0.02), 0.0);
        assert!(approx(apply_deadband(1.0, 0.02), 1.0));
        assert!(approx(apply_deadband(-1.0, 0.02), -1.0));
        assert_eq!(ArcadeMapping::default().compute(0.015, -0.01), DriveOutput::STOPPED);
    }

    #[test]
    fn test_max_output_scales_each_side() {
        let out = ArcadeMapping::new(0.0, false, 0.5).compute(1.0, 1.0);
        assert!(approx(out.left, 0.5));
        assert!(approx(out.right, 0.0));
    }
}
