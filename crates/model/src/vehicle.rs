use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Gravitational acceleration (m/s²). Passed around explicitly so the
/// physics stays testable in isolation.
pub const GRAVITY: f64 = 9.81;

const WATTS_PER_HP: f64 = 745.7;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct MassParams {
    /// Total vehicle mass (kg)
    pub mass: f64,
    /// Center-of-gravity height (m)
    pub cog_height: f64,
    /// Front-to-rear axle distance (m)
    pub wheelbase: f64,
    /// Front weight fraction, 0..1
    pub weight_distribution: f64,
}

impl Default for MassParams {
    fn default() -> Self {
        Self { mass: 800.0, cog_height: 0.3, wheelbase: 2.5, weight_distribution: 0.45 }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct AeroParams {
    /// Lift coefficient, negative when the car generates downforce
    pub cl: f64,
    /// Drag coefficient
    pub cd: f64,
    /// Reference area (m²)
    pub frontal_area: f64,
    /// Air density (kg/m³)
    pub air_density: f64,
}

impl Default for AeroParams {
    fn default() -> Self {
        Self { cl: -3.0, cd: 0.8, frontal_area: 1.5, air_density: 1.225 }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct TireParams {
    /// Longitudinal friction coefficient
    pub mu_x: f64,
    /// Lateral friction coefficient
    pub mu_y: f64,
    /// Load-sensitivity exponent, 0..1 (1 = grip scales linearly with load)
    pub load_sensitivity: f64,
    /// Effective rolling radius (m)
    pub tire_radius: f64,
}

impl Default for TireParams {
    fn default() -> Self {
        Self { mu_x: 1.6, mu_y: 1.8, load_sensitivity: 0.9, tire_radius: 0.3 }
    }
}

/// One sample of the engine torque curve.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct TorquePoint {
    pub rpm: f64,
    /// Engine torque at that RPM (Nm)
    pub torque: f64,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct PowertrainParams {
    /// RPM -> torque samples, ascending by RPM
    #[serde(default)]
    pub torque_curve: Vec<TorquePoint>,
    /// Gearbox ratios, first gear first
    #[serde(default)]
    pub gear_ratios: Vec<f64>,
    pub final_drive_ratio: f64,
    /// Transmission efficiency, 0..1
    pub drivetrain_efficiency: f64,
    pub max_rpm: f64,
    pub min_rpm: f64,
    /// Gear change duration (s)
    pub shift_time: f64,
}

impl Default for PowertrainParams {
    fn default() -> Self {
        Self {
            torque_curve: Vec::new(),
            gear_ratios: Vec::new(),
            final_drive_ratio: 3.5,
            drivetrain_efficiency: 0.95,
            max_rpm: 15000.0,
            min_rpm: 4000.0,
            shift_time: 0.05,
        }
    }
}

impl PowertrainParams {
    /// Engine torque at `rpm`, linearly interpolated over the curve and
    /// clamped at its extremes.
    pub fn torque_at(&self, rpm: f64) -> f64 {
        let (Some(first), Some(last)) = (self.torque_curve.first(), self.torque_curve.last())
        else {
            return 0.0;
        };

        let rpm = rpm.max(0.0);
        if rpm <= first.rpm {
            return first.torque;
        }
        if rpm >= last.rpm {
            return last.torque;
        }

        for w in self.torque_curve.windows(2) {
            if rpm <= w[1].rpm {
                let t = (rpm - w[0].rpm) / (w[1].rpm - w[0].rpm);
                return w[0].torque + t * (w[1].torque - w[0].torque);
            }
        }

        last.torque
    }

    /// Total transmission ratio for a 1-based gear number, zero for an
    /// invalid gear.
    pub fn total_ratio(&self, gear: i8) -> f64 {
        if gear < 1 || gear as usize > self.gear_ratios.len() {
            return 0.0;
        }
        self.gear_ratios[gear as usize - 1] * self.final_drive_ratio
    }

    /// Engine speed for road speed `v` in `gear` (1-based).
    pub fn rpm_at(&self, v: f64, tire_radius: f64, gear: i8) -> f64 {
        let ratio = self.total_ratio(gear);
        if ratio <= 0.0 || tire_radius <= 0.0 {
            return 0.0;
        }
        (v / tire_radius) * ratio * 60.0 / (2.0 * PI)
    }

    /// Pick the gear for road speed `v`: highest gear that keeps the engine
    /// in the 70-90 % power band, then any gear inside the legal RPM range,
    /// then first gear.
    pub fn optimal_gear(&self, v: f64, tire_radius: f64) -> i8 {
        if self.gear_ratios.is_empty() || tire_radius <= 0.0 || v <= 0.1 {
            return 1;
        }

        let band_low = self.max_rpm * 0.70;
        let band_high = self.max_rpm * 0.90;

        for i in (0..self.gear_ratios.len()).rev() {
            let gear = (i + 1) as i8;
            let rpm = self.rpm_at(v, tire_radius, gear);
            if rpm >= self.min_rpm && rpm <= self.max_rpm && rpm >= band_low && rpm <= band_high {
                return gear;
            }
        }

        for i in 0..self.gear_ratios.len() {
            let gear = (i + 1) as i8;
            let rpm = self.rpm_at(v, tire_radius, gear);
            if rpm >= self.min_rpm && rpm <= self.max_rpm {
                return gear;
            }
        }

        1
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct BrakeParams {
    /// Brake-system force cap (N)
    pub max_brake_force: f64,
    /// Front brake fraction, 0..1
    pub brake_bias: f64,
}

impl Default for BrakeParams {
    fn default() -> Self {
        Self { max_brake_force: 20000.0, brake_bias: 0.6 }
    }
}

/// Complete vehicle description: the five parameter groups the solver
/// consumes. Must pass [`VehicleSpec::validate`] before any solve.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct VehicleSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mass: MassParams,
    #[serde(default)]
    pub aero: AeroParams,
    #[serde(default)]
    pub tire: TireParams,
    #[serde(default)]
    pub powertrain: PowertrainParams,
    #[serde(default)]
    pub brake: BrakeParams,
}

impl VehicleSpec {
    /// Check all parameter groups for physical consistency. A spec that
    /// fails here must never reach the solver.
    pub fn validate(&self) -> Result<(), ModelError> {
        use ModelError::InvalidVehicle;

        if self.mass.mass <= 0.0 {
            return Err(InvalidVehicle("mass must be positive"));
        }
        if self.mass.cog_height < 0.0 {
            return Err(InvalidVehicle("cog height must not be negative"));
        }
        if self.mass.wheelbase <= 0.0 {
            return Err(InvalidVehicle("wheelbase must be positive"));
        }
        if !(0.0..=1.0).contains(&self.mass.weight_distribution) {
            return Err(InvalidVehicle("weight distribution must be within 0..1"));
        }

        if self.aero.frontal_area <= 0.0 {
            return Err(InvalidVehicle("frontal area must be positive"));
        }
        if self.aero.air_density <= 0.0 {
            return Err(InvalidVehicle("air density must be positive"));
        }

        if self.tire.mu_x <= 0.0 || self.tire.mu_y <= 0.0 {
            return Err(InvalidVehicle("friction coefficients must be positive"));
        }
        if self.tire.tire_radius <= 0.0 {
            return Err(InvalidVehicle("tire radius must be positive"));
        }
        if !(0.0..=1.0).contains(&self.tire.load_sensitivity) {
            return Err(InvalidVehicle("load sensitivity must be within 0..1"));
        }

        if self.powertrain.torque_curve.is_empty() {
            return Err(InvalidVehicle("torque curve must not be empty"));
        }
        if self.powertrain.torque_curve.windows(2).any(|w| w[0].rpm >= w[1].rpm) {
            return Err(InvalidVehicle("torque curve must be ascending by rpm"));
        }
        if self.powertrain.gear_ratios.is_empty() {
            return Err(InvalidVehicle("gear ratio list must not be empty"));
        }
        if self.powertrain.final_drive_ratio <= 0.0 {
            return Err(InvalidVehicle("final drive ratio must be positive"));
        }
        let eff = self.powertrain.drivetrain_efficiency;
        if eff <= 0.0 || eff > 1.0 {
            return Err(InvalidVehicle("drivetrain efficiency must be within 0..1"));
        }

        if self.brake.max_brake_force <= 0.0 {
            return Err(InvalidVehicle("max brake force must be positive"));
        }
        if !(0.0..=1.0).contains(&self.brake.brake_bias) {
            return Err(InvalidVehicle("brake bias must be within 0..1"));
        }

        Ok(())
    }

    /// Peak engine power over the torque curve (W).
    pub fn max_engine_power(&self) -> f64 {
        self.powertrain
            .torque_curve
            .iter()
            .map(|p| p.torque * p.rpm * 2.0 * PI / 60.0)
            .fold(0.0_f64, f64::max)
    }

    /// Power-to-weight ratio (hp/kg).
    pub fn power_to_weight(&self) -> f64 {
        if self.mass.mass <= 0.0 {
            return 0.0;
        }
        self.max_engine_power() / WATTS_PER_HP / self.mass.mass
    }

    /// Drag-limited top speed from the power/drag balance:
    /// v = (2 P / (rho Cd A))^(1/3).
    pub fn max_theoretical_speed(&self) -> f64 {
        let power = self.max_engine_power() * self.powertrain.drivetrain_efficiency;
        let denom = self.aero.air_density * self.aero.cd * self.aero.frontal_area;
        if denom <= 0.0 {
            return 0.0;
        }
        (2.0 * power / denom).powf(1.0 / 3.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn test_vehicle() -> VehicleSpec {
        VehicleSpec {
            name: "test car".to_string(),
            powertrain: PowertrainParams {
                torque_curve: vec![
                    TorquePoint { rpm: 4000.0, torque: 200.0 },
                    TorquePoint { rpm: 8000.0, torque: 300.0 },
                    TorquePoint { rpm: 12000.0, torque: 250.0 },
                ],
                gear_ratios: vec![3.0, 2.2, 1.7, 1.3, 1.0],
                ..PowertrainParams::default()
            },
            ..VehicleSpec::default()
        }
    }

    #[test]
    fn default_with_curve_and_gears_validates() {
        assert!(test_vehicle().validate().is_ok());
    }

    #[test]
    fn rejects_bad_parameters() {
        let mut v = test_vehicle();
        v.mass.mass = 0.0;
        assert!(v.validate().is_err());

        let mut v = test_vehicle();
        v.brake.brake_bias = 1.4;
        assert!(v.validate().is_err());

        let mut v = test_vehicle();
        v.powertrain.torque_curve.clear();
        assert!(v.validate().is_err());

        let mut v = test_vehicle();
        v.powertrain.gear_ratios.clear();
        assert!(v.validate().is_err());

        let mut v = test_vehicle();
        v.tire.tire_radius = -0.3;
        assert!(v.validate().is_err());
    }

    #[test]
    fn torque_interpolates_and_clamps() {
        let pt = test_vehicle().powertrain;
        // below and above the curve: clamped
        assert!((pt.torque_at(0.0) - 200.0).abs() < 1e-9);
        assert!((pt.torque_at(20000.0) - 250.0).abs() < 1e-9);
        // midway between 4000 and 8000
        assert!((pt.torque_at(6000.0) - 250.0).abs() < 1e-9);
        // exact sample
        assert!((pt.torque_at(8000.0) - 300.0).abs() < 1e-9);
    }

    #[test]
    fn optimal_gear_prefers_power_band() {
        let v = test_vehicle();
        let pt = &v.powertrain;
        let r = v.tire.tire_radius;

        let gear = pt.optimal_gear(60.0, r);
        let rpm = pt.rpm_at(60.0, r, gear);
        assert!(rpm >= pt.min_rpm && rpm <= pt.max_rpm);
        // no higher gear should also sit in the band
        for higher in (gear + 1)..=(pt.gear_ratios.len() as i8) {
            let hr = pt.rpm_at(60.0, r, higher);
            assert!(!(hr >= pt.max_rpm * 0.70 && hr <= pt.max_rpm * 0.90 && hr >= pt.min_rpm));
        }
    }

    #[test]
    fn optimal_gear_defaults_to_first_at_standstill() {
        let v = test_vehicle();
        assert_eq!(v.powertrain.optimal_gear(0.0, v.tire.tire_radius), 1);
    }

    #[test]
    fn theoretical_speed_grows_with_power() {
        let v = test_vehicle();
        let mut stronger = v.clone();
        for p in &mut stronger.powertrain.torque_curve {
            p.torque *= 2.0;
        }
        assert!(stronger.max_theoretical_speed() > v.max_theoretical_speed());
    }
}
