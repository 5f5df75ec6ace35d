//! Upstream plasma scales reported once the populations exist.
//!
//! Quantities whose denominator (density, field magnitude) vanishes are
//! reported as zero.

use crate::common::constants::{
    CHARGE_ELEMENTARY, MASS_ELECTRON, PERMEABILITY, PERMITTIVITY, PI, SPEED_LIGHT,
};
use crate::domain::{Vec3, cross, norm, squared_norm};
use crate::modules::population::{Population, PopulationCategory};

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Plasma frequency of a species with charge `q` and mass `m` in a plasma of
/// electron density `ne`.
pub fn plasma_frequency(ne: f64, q: f64, m: f64) -> f64 {
    ratio(ne * q * q, m * PERMITTIVITY).max(0.0).sqrt()
}

pub fn plasma_period(omega: f64) -> f64 {
    ratio(2.0 * PI, omega)
}

pub fn inertial_length(omega: f64) -> f64 {
    ratio(SPEED_LIGHT, omega)
}

pub fn larmor_radius(mass: f64, speed: f64, charge: f64, b: f64) -> f64 {
    ratio(mass * speed, charge * b)
}

pub fn larmor_period(mass: f64, charge: f64, b: f64) -> f64 {
    ratio(2.0 * PI * mass, charge * b)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolarWindScales {
    pub name: String,
    pub plasma_frequency: f64,
    pub plasma_period: f64,
    pub inertial_length: f64,
    pub thermal_larmor_radius: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickupScales {
    pub name: String,
    pub larmor_period: f64,
    pub larmor_radius: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamDiagnostics {
    pub electron_density: f64,
    pub mass_density: f64,
    pub bulk_speed: f64,
    pub alfven_speed: f64,
    pub exb_drift: Vec3,
    pub exb_speed: f64,
    pub whistler_speed: f64,
    pub imf_magnitude: f64,
    pub imf_perpendicular: f64,
    pub cone_angle_deg: f64,
    pub clock_angle_deg: f64,
    pub electron_plasma_frequency: f64,
    pub electron_plasma_period: f64,
    pub electron_inertial_length: f64,
    pub solar_wind: Vec<SolarWindScales>,
    pub pickup: Vec<PickupScales>,
    pub electron_pickup: PickupScales,
}

impl UpstreamDiagnostics {
    pub fn compute(populations: &[Population], imf: Vec3, dx: f64) -> Self {
        let solar_wind: Vec<&Population> = populations
            .iter()
            .filter(|population| population.category == PopulationCategory::SolarWind)
            .collect();

        let electron_density = solar_wind
            .iter()
            .map(|population| population.charge * population.density)
            .sum::<f64>()
            / CHARGE_ELEMENTARY;
        let mass_density: f64 = solar_wind
            .iter()
            .map(|population| population.mass * population.density)
            .sum();
        let momentum: f64 = solar_wind
            .iter()
            .map(|population| population.mass * population.density * population.velocity)
            .sum();

        let b2 = squared_norm(imf);
        let b = b2.sqrt();
        let bulk_speed = ratio(momentum, mass_density);
        let alfven_speed = ratio(b, (PERMEABILITY * mass_density).max(0.0).sqrt());

        let electric = cross(imf, [-bulk_speed, 0.0, 0.0]);
        let exb_drift = cross(electric, imf).map(|component| ratio(component, b2));
        let exb_speed = norm(exb_drift);
        let whistler_speed = if electron_density > 0.0 && dx > 0.0 {
            2.0 * PI * b / (PERMEABILITY * electron_density * CHARGE_ELEMENTARY * dx)
        } else {
            0.0
        };

        let imf_perpendicular = (imf[1] * imf[1] + imf[2] * imf[2]).sqrt();
        let electron_plasma_frequency =
            plasma_frequency(electron_density, CHARGE_ELEMENTARY, MASS_ELECTRON);

        let solar_wind = solar_wind
            .iter()
            .map(|population| {
                let omega = plasma_frequency(electron_density, population.charge, population.mass);
                SolarWindScales {
                    name: population.name.clone(),
                    plasma_frequency: omega,
                    plasma_period: plasma_period(omega),
                    inertial_length: inertial_length(omega),
                    thermal_larmor_radius: larmor_radius(
                        population.mass,
                        population.vth,
                        population.charge,
                        b,
                    ),
                }
            })
            .collect();

        let pickup = populations
            .iter()
            .map(|population| PickupScales {
                name: population.name.clone(),
                larmor_period: larmor_period(population.mass, population.charge, b),
                larmor_radius: larmor_radius(population.mass, exb_speed, population.charge, b),
            })
            .collect();

        Self {
            electron_density,
            mass_density,
            bulk_speed,
            alfven_speed,
            exb_drift,
            exb_speed,
            whistler_speed,
            imf_magnitude: b,
            imf_perpendicular,
            cone_angle_deg: imf_perpendicular.atan2(imf[0]).to_degrees(),
            clock_angle_deg: imf[1].atan2(imf[2]).to_degrees(),
            electron_plasma_frequency,
            electron_plasma_period: plasma_period(electron_plasma_frequency),
            electron_inertial_length: inertial_length(electron_plasma_frequency),
            solar_wind,
            pickup,
            electron_pickup: PickupScales {
                name: "e-".to_string(),
                larmor_period: larmor_period(MASS_ELECTRON, CHARGE_ELEMENTARY, b),
                larmor_radius: larmor_radius(MASS_ELECTRON, exb_speed, CHARGE_ELEMENTARY, b),
            },
        }
    }

    pub fn pickup_average_speed(&self) -> f64 {
        4.0 * self.exb_speed / PI
    }

    pub fn pickup_max_speed(&self) -> f64 {
        2.0 * self.exb_speed
    }

    pub fn report_lines(&self, dt: f64, dx: f64, r_object: f64) -> Vec<String> {
        let mut lines = vec![
            "(UPSTREAM CFL CONDITIONS)".to_string(),
            format!("dt = {dt} s = {} ms", dt / 1e-3),
            format!(
                "dx = {} km = R_object/{} = {} R_object",
                dx / 1e3,
                ratio(r_object, dx),
                ratio(dx, r_object)
            ),
            format!("dx/dt = {} km/s", ratio(dx, dt) / 1e3),
            format!("bulk speed = {} km/s", self.bulk_speed / 1e3),
            format!("alfven velocity = {} km/s", self.alfven_speed / 1e3),
            format!(
                "ExB drift velocity = ({},{},{}) km/s",
                self.exb_drift[0] / 1e3,
                self.exb_drift[1] / 1e3,
                self.exb_drift[2] / 1e3
            ),
            format!("ExB drift speed = {} km/s", self.exb_speed / 1e3),
            format!(
                "Pickup ion avg speed (4*VExB/pi) = {} km/s",
                self.pickup_average_speed() / 1e3
            ),
            format!(
                "Pickup ion max speed (2*VExB) = {} km/s",
                self.pickup_max_speed() / 1e3
            ),
            format!("Fastest whistler speed = {} km/s", self.whistler_speed / 1e3),
            "==== SOLAR WIND POPULATIONS ====".to_string(),
        ];
        for scales in &self.solar_wind {
            lines.push(format!(
                "plasma period({}) = {} s = {} dt",
                scales.name,
                scales.plasma_period,
                ratio(scales.plasma_period, dt)
            ));
        }
        lines.push(format!(
            "plasma period(e-) = {} s = {} dt",
            self.electron_plasma_period,
            ratio(self.electron_plasma_period, dt)
        ));
        for scales in &self.solar_wind {
            lines.push(format!(
                "inertial length({}) = {} km = {} dx",
                scales.name,
                scales.inertial_length / 1e3,
                ratio(scales.inertial_length, dx)
            ));
        }
        lines.push(format!(
            "inertial length(e-) = {} km = {} dx",
            self.electron_inertial_length / 1e3,
            ratio(self.electron_inertial_length, dx)
        ));
        for scales in &self.solar_wind {
            lines.push(format!(
                "thermal Larmor radius({}) = {} km = {} dx",
                scales.name,
                scales.thermal_larmor_radius / 1e3,
                ratio(scales.thermal_larmor_radius, dx)
            ));
        }

        lines.push("==== ALL POPULATIONS AS PICKUP IONS ====".to_string());
        for scales in self.pickup.iter().chain(std::iter::once(&self.electron_pickup)) {
            lines.push(format!(
                "Larmor period({}) = {} s = {} dt",
                scales.name,
                scales.larmor_period,
                ratio(scales.larmor_period, dt)
            ));
        }
        for scales in self.pickup.iter().chain(std::iter::once(&self.electron_pickup)) {
            lines.push(format!(
                "Larmor radius({}) = {} km = {} dx",
                scales.name,
                scales.larmor_radius / 1e3,
                ratio(scales.larmor_radius, dx)
            ));
        }
        lines
    }

    pub fn imf_lines(&self, imf: Vec3) -> Vec<String> {
        vec![
            format!("IMF Bx  = {} nT", imf[0] / 1e-9),
            format!("IMF By  = {} nT", imf[1] / 1e-9),
            format!("IMF Bz  = {} nT", imf[2] / 1e-9),
            format!("IMF |B| = {} nT", self.imf_magnitude / 1e-9),
            format!(
                "IMF Bperp = sqrt(By^2 + Bz^2)     = {} nT",
                self.imf_perpendicular / 1e-9
            ),
            format!(
                "IMF Cone angle  = atan2(Bperp,Bx) = {} deg",
                self.cone_angle_deg
            ),
            format!("IMF Clock angle = atan2(By,Bz)    = {} deg", self.clock_angle_deg),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::{UpstreamDiagnostics, inertial_length, larmor_radius, plasma_frequency};
    use crate::common::constants::{CHARGE_ELEMENTARY, MASS_PROTON, SPEED_LIGHT};
    use crate::modules::population::{Population, PopulationCategory};

    fn proton(name: &str, category: PopulationCategory, density: f64) -> Population {
        Population {
            name: name.to_string(),
            category,
            charge: CHARGE_ELEMENTARY,
            mass: MASS_PROTON,
            density,
            velocity: 400.0e3,
            vth: 40.0e3,
            output_tag: "-".to_string(),
            include_in_plasma: true,
        }
    }

    fn close(actual: f64, expected: f64, relative: f64) -> bool {
        (actual - expected).abs() <= relative * expected.abs()
    }

    #[test]
    fn zero_denominators_give_zero_instead_of_nan() {
        assert_eq!(plasma_frequency(0.0, CHARGE_ELEMENTARY, MASS_PROTON), 0.0);
        assert_eq!(inertial_length(0.0), 0.0);
        assert_eq!(larmor_radius(MASS_PROTON, 1.0e5, CHARGE_ELEMENTARY, 0.0), 0.0);

        let diagnostics = UpstreamDiagnostics::compute(&[], [0.0; 3], 1.0e5);
        assert_eq!(diagnostics.bulk_speed, 0.0);
        assert_eq!(diagnostics.alfven_speed, 0.0);
        assert_eq!(diagnostics.exb_drift, [0.0; 3]);
        assert_eq!(diagnostics.whistler_speed, 0.0);
        assert_eq!(diagnostics.electron_inertial_length, 0.0);
        assert!(
            diagnostics
                .report_lines(0.01, 1.0e5, 2.0e6)
                .iter()
                .all(|line| !line.contains("NaN"))
        );
    }

    #[test]
    fn proton_solar_wind_scales_match_textbook_values() {
        let populations = vec![
            proton("H+sw", PopulationCategory::SolarWind, 1.0e7),
            proton("H+planet", PopulationCategory::Exosphere, 1.0e9),
        ];
        let diagnostics = UpstreamDiagnostics::compute(&populations, [0.0, 0.0, 10.0e-9], 1.0e5);

        assert!(close(diagnostics.electron_density, 1.0e7, 1.0e-12));
        assert!(close(diagnostics.bulk_speed, 400.0e3, 1.0e-12));
        // ion plasma frequency at 10 cm^-3 is about 4.16e3 rad/s
        let omega = diagnostics.solar_wind[0].plasma_frequency;
        assert!(close(omega, 4.16e3, 1.0e-2));
        assert!(close(
            diagnostics.solar_wind[0].inertial_length,
            SPEED_LIGHT / omega,
            1.0e-12
        ));
        assert!(close(diagnostics.alfven_speed, 69.0e3, 1.0e-2));
        assert_eq!(diagnostics.solar_wind.len(), 1);
        assert_eq!(diagnostics.pickup.len(), 2);
    }

    #[test]
    fn exb_drift_of_perpendicular_field_equals_flow() {
        let populations = vec![proton("H+sw", PopulationCategory::SolarWind, 1.0e7)];
        let diagnostics = UpstreamDiagnostics::compute(&populations, [0.0, 0.0, 5.0e-9], 1.0e5);

        assert!(close(diagnostics.exb_drift[0], -400.0e3, 1.0e-12));
        assert!(diagnostics.exb_drift[1].abs() < 1.0e-6);
        assert!(close(diagnostics.exb_speed, 400.0e3, 1.0e-12));
        assert!(close(diagnostics.pickup_max_speed(), 800.0e3, 1.0e-12));
        assert_eq!(diagnostics.clock_angle_deg, 0.0);
        assert!(close(diagnostics.cone_angle_deg, 90.0, 1.0e-12));
    }

    #[test]
    fn parallel_field_has_no_drift() {
        let populations = vec![proton("H+sw", PopulationCategory::SolarWind, 1.0e7)];
        let diagnostics = UpstreamDiagnostics::compute(&populations, [5.0e-9, 0.0, 0.0], 1.0e5);
        assert_eq!(diagnostics.exb_speed, 0.0);
        assert_eq!(diagnostics.pickup[0].larmor_radius, 0.0);
        assert!(diagnostics.pickup[0].larmor_period > 0.0);
    }
}
