//! Derived quantities for a measured impedance Z = rs + j·xs.

use num_complex::Complex32;

use crate::Measurement;

/// Reference impedance of a 50 Ω system.
pub const DEFAULT_Z0: f32 = 50.0;

// Beyond this |Γ| the VSWR is reported as VSWR_MAX.
const GAMMA_LIMIT: f32 = 0.980_197_8;
pub const VSWR_MAX: f32 = 99.999;

impl Measurement {
    /// The impedance as a complex number.
    pub fn impedance(&self) -> Complex32 {
        Complex32::new(self.rs, self.xs)
    }

    /// |Z| in ohms.
    pub fn magnitude(&self) -> f32 {
        self.impedance().norm()
    }

    /// Γ = (Z − Z0) / (Z + Z0) against a purely resistive `z0`.
    pub fn reflection_coefficient(&self, z0: f32) -> Complex32 {
        let z = self.impedance();
        let z0 = Complex32::new(z0, 0.0);
        (z - z0) / (z + z0)
    }

    /// Voltage standing wave ratio against `z0`, capped at [`VSWR_MAX`].
    pub fn vswr(&self, z0: f32) -> f32 {
        let gamma = self.reflection_coefficient(z0).norm();
        if gamma.is_nan() || gamma > GAMMA_LIMIT {
            return VSWR_MAX;
        }
        (1.0 + gamma) / (1.0 - gamma)
    }
}
