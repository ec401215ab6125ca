use crate::error::{CaseError, Result};
use crate::global_variables::*;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UnitSystem {
    length: Float,
    velocity: Float,
    time: Float,
    density: Float,
    mass: Float,
}

impl UnitSystem {
    pub fn calibrate(
        lbm_length: Float,
        lbm_velocity: Float,
        lbm_density: Float,
        si_length: Float,
        si_velocity: Float,
        si_density: Float,
    ) -> Result<Self> {
        let references = [
            ("lbm_length", lbm_length),
            ("lbm_velocity", lbm_velocity),
            ("lbm_density", lbm_density),
            ("si_length", si_length),
            ("si_velocity", si_velocity),
            ("si_density", si_density),
        ];
        for (name, value) in references {
            if !value.is_finite() || value <= 0.0 {
                return Err(CaseError::invalid(
                    name,
                    format!("reference values must be positive, got {value}"),
                ));
            }
        }
        let length = si_length / lbm_length;
        let velocity = si_velocity / lbm_velocity;
        let time = length / velocity;
        let density = si_density / lbm_density;
        let mass = density * length * length * length;
        Ok(Self {
            length,
            velocity,
            time,
            density,
            mass,
        })
    }

    pub fn length_factor(&self) -> Float {
        self.length
    }

    pub fn velocity_factor(&self) -> Float {
        self.velocity
    }

    pub fn time_factor(&self) -> Float {
        self.time
    }

    pub fn density_factor(&self) -> Float {
        self.density
    }

    pub fn mass_factor(&self) -> Float {
        self.mass
    }

    pub fn viscosity_factor(&self) -> Float {
        self.length * self.length / self.time
    }

    pub fn force_factor(&self) -> Float {
        self.mass * self.length / (self.time * self.time)
    }
}

impl UnitSystem {
    pub fn x(&self, si_x: Float) -> Float {
        si_x / self.length
    }

    pub fn si_x(&self, x: Float) -> Float {
        x * self.length
    }

    pub fn u(&self, si_u: Float) -> Float {
        si_u / self.velocity
    }

    pub fn si_u(&self, u: Float) -> Float {
        u * self.velocity
    }

    pub fn t(&self, si_t: Float) -> u64 {
        (si_t / self.time).round().max(0.0) as u64
    }

    pub fn si_t(&self, t: u64) -> Float {
        t as Float * self.time
    }

    pub fn rho(&self, si_rho: Float) -> Float {
        si_rho / self.density
    }

    pub fn si_rho(&self, rho: Float) -> Float {
        rho * self.density
    }

    pub fn mass(&self, si_mass: Float) -> Float {
        si_mass / self.mass
    }

    pub fn si_mass(&self, mass: Float) -> Float {
        mass * self.mass
    }

    pub fn nu(&self, si_nu: Float) -> Float {
        si_nu / self.viscosity_factor()
    }

    pub fn si_nu(&self, nu: Float) -> Float {
        nu * self.viscosity_factor()
    }

    pub fn force(&self, si_force: Float) -> Float {
        si_force / self.force_factor()
    }

    pub fn si_force(&self, force: Float) -> Float {
        force * self.force_factor()
    }

    pub fn force_density(&self, si_force_density: Float) -> Float {
        let factor = self.force_factor() / (self.length * self.length * self.length);
        si_force_density / factor
    }

    pub fn si_force_density(&self, force_density: Float) -> Float {
        let factor = self.force_factor() / (self.length * self.length * self.length);
        force_density * factor
    }

    pub fn reynolds_number(&self, x: Float, u: Float, nu: Float) -> Float {
        x * u / nu
    }

    pub fn si_reynolds_number(&self, si_x: Float, si_u: Float, si_nu: Float) -> Float {
        si_x * si_u / si_nu
    }

    pub fn reynolds_report(&self, si_x: Float, si_u: Float, si_nu: Float) -> String {
        let reynolds_number = self.si_reynolds_number(si_x, si_u, si_nu);
        format!("Re = {}", reynolds_number.round() as u64)
    }
}

pub fn relaxation_time(nu: Float) -> Float {
    CS_2_INV * nu + 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn bucket_units() -> UnitSystem {
        let lbm_length = LATTICE_LENGTH_RATIO * 781.0;
        UnitSystem::calibrate(
            lbm_length,
            LATTICE_VELOCITY,
            LATTICE_DENSITY,
            SI_LENGTH,
            SI_VELOCITY,
            SI_DENSITY,
        )
        .unwrap()
    }

    #[test]
    fn reference_values_map_onto_each_other() {
        let units = bucket_units();
        assert_relative_eq!(units.x(SI_LENGTH), 156.2, max_relative = 1e-12);
        assert_relative_eq!(units.u(SI_VELOCITY), LATTICE_VELOCITY, max_relative = 1e-12);
        assert_relative_eq!(units.rho(SI_DENSITY), LATTICE_DENSITY, max_relative = 1e-12);
    }

    #[test]
    fn bucket_reynolds_number() {
        let units = bucket_units();
        let reynolds_number = units.si_reynolds_number(SI_LENGTH, SI_VELOCITY, SI_VISCOSITY);
        assert!(reynolds_number > 5.0e5 && reynolds_number < 6.0e5);
        let lattice = units.reynolds_number(
            units.x(SI_LENGTH),
            units.u(SI_VELOCITY),
            units.nu(SI_VISCOSITY),
        );
        assert_relative_eq!(lattice, reynolds_number, max_relative = 1e-9);
        assert_eq!(units.reynolds_report(SI_LENGTH, SI_VELOCITY, SI_VISCOSITY), "Re = 554054");
    }

    #[test]
    fn duration_converts_to_step_count() {
        let units = bucket_units();
        let steps = units.t(DURATION);
        assert_eq!(steps, (DURATION / units.time_factor()).round() as u64);
        assert!(steps > 11_000 && steps < 12_000);
        assert_relative_eq!(units.si_t(steps), DURATION, max_relative = 1e-3);
    }

    #[test]
    fn derived_scales_follow_dimensional_analysis() {
        let units = bucket_units();
        assert_relative_eq!(
            units.time_factor(),
            units.length_factor() / units.velocity_factor(),
            max_relative = 1e-12
        );
        assert_relative_eq!(
            units.mass_factor(),
            units.density_factor() * units.length_factor().powi(3),
            max_relative = 1e-12
        );
        assert_relative_eq!(units.si_force(units.force(2.5)), 2.5, max_relative = 1e-12);
        assert_relative_eq!(
            units.si_force_density(units.force_density(9.81)),
            9.81,
            max_relative = 1e-12
        );
    }

    #[test]
    fn non_positive_references_are_rejected() {
        assert!(UnitSystem::calibrate(0.0, 0.05, 1.0, 8.2, 1.0, 1.225).is_err());
        assert!(UnitSystem::calibrate(100.0, 0.05, 1.0, 8.2, -1.0, 1.225).is_err());
        assert!(UnitSystem::calibrate(100.0, 0.05, 1.0, 8.2, 1.0, Float::NAN).is_err());
    }

    #[test]
    fn one_sixth_viscosity_relaxes_in_one_step() {
        assert_relative_eq!(relaxation_time(1.0 / 6.0), 1.0, max_relative = 1e-12);
    }

    proptest! {
        #[test]
        fn dynamic_similarity(
            lbm_length in 1.0..1000.0_f64,
            lbm_velocity in 0.001..0.2_f64,
            si_length in 1e-3..100.0_f64,
            si_velocity in 1e-3..50.0_f64,
            si_density in 0.1..2000.0_f64,
            si_nu in 1e-7..1e-2_f64,
        ) {
            let units = UnitSystem::calibrate(
                lbm_length, lbm_velocity, 1.0, si_length, si_velocity, si_density,
            ).unwrap();
            let si = units.si_reynolds_number(si_length, si_velocity, si_nu);
            let lattice = units.reynolds_number(
                units.x(si_length),
                units.u(si_velocity),
                units.nu(si_nu),
            );
            prop_assert!((si - lattice).abs() <= 1e-9 * si.abs());
        }
    }
}
