use model::{LapResult, ModelError, SimulationState, Track, VehicleSpec, GRAVITY};
use physics::{AeroModel, PowertrainModel};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::envelope::{Envelope, EnvelopeConfig};

#[derive(Debug, Error)]
pub enum SolverError {
    #[error(transparent)]
    InvalidVehicle(#[from] ModelError),
}

/// Tunable solver behavior. Defaults mirror a downforce-class race car;
/// every threshold that used to be a literal in the reference engine is a
/// field here.
#[derive(Clone, Debug)]
pub struct SolverConfig {
    pub max_iterations: u32,
    /// Convergence tolerance on the lap-time change between iterations (s)
    pub tolerance: f64,
    pub envelope: EnvelopeConfig,
    /// |kappa| below this counts as straight (1/m)
    pub straight_kappa_threshold: f64,
    /// Nominal speed cap returned for straight sections (m/s). A pragmatic
    /// stand-in for a true drag-limited top-speed solve
    /// (`VehicleSpec::max_theoretical_speed`), kept for parity with the
    /// reference behavior.
    pub straight_speed: f64,
    /// Nominal cap when downforce alone exceeds the mechanical-grip
    /// requirement in the cornering relation (m/s)
    pub downforce_dominated_speed: f64,
    /// Rolling-start speed used to seed the profiles (m/s)
    pub initial_speed: f64,
    /// Lower speed floor for the integrations (m/s)
    pub min_speed: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tolerance: 1e-3,
            envelope: EnvelopeConfig::default(),
            straight_kappa_threshold: 0.002,
            straight_speed: 110.0,
            downforce_dominated_speed: 100.0,
            initial_speed: 50.0,
            min_speed: 1.0,
        }
    }
}

/// Highest speed sustainable at curvature `kappa` without exceeding lateral
/// grip, from m v^2 |kappa| = mu_y (m g + downforce(v)).
pub fn cornering_speed_limit(vehicle: &VehicleSpec, kappa: f64, cfg: &SolverConfig) -> f64 {
    let abs_kappa = kappa.abs();
    if abs_kappa < cfg.straight_kappa_threshold {
        return cfg.straight_speed;
    }

    let m = vehicle.mass.mass;
    let mu = vehicle.tire.mu_y;
    let aero = &vehicle.aero;

    // cl is negative for downforce, so -cl makes the term positive
    let aero_factor = 0.5 * mu * aero.air_density * (-aero.cl) * aero.frontal_area;
    let denominator = m * abs_kappa - aero_factor;

    if denominator <= 0.0 {
        // downforce grows faster with v^2 than the grip demand; the car is
        // limited by something else (drag, power) long before the tires
        return cfg.downforce_dominated_speed;
    }

    let v_squared = mu * m * GRAVITY / denominator;
    if v_squared < 0.0 {
        return 0.0;
    }
    v_squared.sqrt()
}

/// Three-pass quasi-steady-state solver: a cornering-limit profile, a
/// forward acceleration-limited pass and a backward braking-limited pass,
/// iterated until the lap time settles.
pub struct LapSolver<'a> {
    track: &'a Track,
    vehicle: &'a VehicleSpec,
    cfg: SolverConfig,
    envelope: Envelope,
    aero: AeroModel,
    powertrain: PowertrainModel,

    v_corner: Vec<f64>,
    v_accel: Vec<f64>,
    v_brake: Vec<f64>,
    v_optimal: Vec<f64>,
}

impl<'a> LapSolver<'a> {
    /// Validates the vehicle and precomputes the acceleration envelope.
    pub fn new(
        track: &'a Track,
        vehicle: &'a VehicleSpec,
        cfg: SolverConfig,
    ) -> Result<Self, SolverError> {
        vehicle.validate()?;

        let envelope = Envelope::generate(vehicle, &cfg.envelope);
        let aero = AeroModel::new(&vehicle.aero);
        let powertrain = PowertrainModel::new(&vehicle.powertrain, vehicle.tire.tire_radius);

        let n = track.len();
        Ok(Self {
            track,
            vehicle,
            cfg,
            envelope,
            aero,
            powertrain,
            v_corner: vec![0.0; n],
            v_accel: vec![0.0; n],
            v_brake: vec![0.0; n],
            v_optimal: vec![0.0; n],
        })
    }

    /// The precomputed acceleration envelope for this vehicle.
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Run the solver to convergence (or the iteration cap) and build the
    /// telemetry trace. Non-convergence is reported on the result, not as
    /// an error; the last profile is still the best available answer.
    pub fn solve(&mut self) -> LapResult {
        let n = self.track.len();

        info!(
            points = n,
            length_m = self.track.total_length(),
            "solving lap for {} on {}",
            self.vehicle.name,
            self.track.name()
        );

        // the cornering limit only depends on geometry, compute it once
        for i in 0..n {
            self.v_corner[i] = cornering_speed_limit(self.vehicle, self.track.point(i).kappa, &self.cfg);
        }

        // rolling-start seed, never above the local cornering limit
        for i in 0..n {
            let seed = self.cfg.initial_speed.min(self.v_corner[i]);
            self.v_accel[i] = seed;
            self.v_brake[i] = seed;
        }

        let mut lap_time = 0.0;
        let mut prev_lap_time = f64::INFINITY;
        let mut converged = false;
        let mut iterations = 0;

        for iter in 0..self.cfg.max_iterations {
            iterations = iter + 1;

            self.forward_pass();
            self.backward_pass();

            for i in 0..n {
                self.v_optimal[i] = self.v_corner[i].min(self.v_accel[i]).min(self.v_brake[i]);
            }

            lap_time = self.lap_time();
            debug!(iteration = iterations, lap_time_s = lap_time, "solver iteration");

            if (lap_time - prev_lap_time).abs() < self.cfg.tolerance {
                converged = true;
                info!(iterations, lap_time_s = lap_time, "lap time converged");
                break;
            }
            prev_lap_time = lap_time;
        }

        if !converged {
            warn!(
                iterations = self.cfg.max_iterations,
                lap_time_s = lap_time,
                "lap time did not converge within the iteration cap"
            );
        }

        self.build_result(lap_time, converged, iterations)
    }

    /// Accelerate out of every point as hard as the envelope allows,
    /// clamped by the cornering limit at the next point.
    fn forward_pass(&mut self) {
        let n = self.track.len();

        for i in 0..n - 1 {
            let v_start = self.v_accel[i].max(self.cfg.min_speed);
            let point = self.track.point(i);

            let ay = v_start * v_start * point.kappa.abs();
            let ax = self.envelope.max_acceleration(v_start, ay);

            let v_squared = v_start * v_start + 2.0 * ax * point.ds;
            let v_end = if v_squared > 0.0 { v_squared.sqrt() } else { v_start };

            self.v_accel[i + 1] = v_end.min(self.v_corner[i + 1]).max(self.cfg.min_speed);
        }

        // loop closure: last point feeds back into the first
        let last = n - 1;
        let v_start = self.v_accel[last];
        let point = self.track.point(last);
        let ay = v_start * v_start * point.kappa.abs();
        let ax = self.envelope.max_acceleration(v_start, ay);
        let v_squared = v_start * v_start + 2.0 * ax * point.ds;
        let v_end = if v_squared > 0.0 { v_squared.sqrt() } else { 0.0 };

        self.v_accel[0] = self.v_accel[0].min(v_end.min(self.v_corner[0]));
    }

    /// Walk the lap in reverse to find the latest possible braking points.
    fn backward_pass(&mut self) {
        let n = self.track.len();

        for i in (1..n).rev() {
            let v_start = self.v_brake[i].max(self.cfg.min_speed);
            let i_prev = i - 1;
            let ds_prev = self.track.point(i_prev).ds;

            let ay = v_start * v_start * self.track.point(i).kappa.abs();
            let ax = self.envelope.max_braking(v_start, ay); // negative

            let v_squared = v_start * v_start - 2.0 * ax * ds_prev;
            let v_prev = if v_squared > 0.0 { v_squared.sqrt() } else { v_start };

            self.v_brake[i_prev] = v_prev.min(self.v_corner[i_prev]).max(self.cfg.min_speed);
        }

        // loop closure: first point feeds back into the last
        let v_start = self.v_brake[0];
        let ds_last = self.track.point(n - 1).ds;
        let ay = v_start * v_start * self.track.point(0).kappa.abs();
        let ax = self.envelope.max_braking(v_start, ay);
        let v_squared = v_start * v_start - 2.0 * ax * ds_last;
        let v_prev = if v_squared > 0.0 { v_squared.sqrt() } else { 0.0 };

        self.v_brake[n - 1] = self.v_brake[n - 1].min(v_prev.min(self.v_corner[n - 1]));
    }

    fn lap_time(&self) -> f64 {
        let mut total = 0.0;
        for (i, v) in self.v_optimal.iter().enumerate() {
            if *v > 0.0 {
                total += self.track.point(i).ds / v;
            }
        }
        total
    }

    fn build_result(&self, lap_time: f64, converged: bool, iterations: u32) -> LapResult {
        let n = self.track.len();
        let mut states = Vec::with_capacity(n);
        let mut cumulative_time = 0.0;

        for i in 0..n {
            states.push(self.build_state(i, cumulative_time));

            let v = self.v_optimal[i];
            if v > 0.0 {
                cumulative_time += self.track.point(i).ds / v;
            }
        }

        LapResult {
            id: Uuid::new_v4(),
            vehicle: self.vehicle.name.clone(),
            track: self.track.name().to_string(),
            lap_time,
            converged,
            iterations,
            states,
        }
    }

    /// Reconstruct one telemetry state from the final speed profile.
    ///
    /// Throttle and brake are scaled from the sign and magnitude of the
    /// reconstructed longitudinal acceleration, not re-solved against the
    /// powertrain; treat them as estimates.
    fn build_state(&self, index: usize, timestamp: f64) -> SimulationState {
        let point = self.track.point(index);
        let v = self.v_optimal[index];
        let mass = self.vehicle.mass.mass;

        let mut state = SimulationState {
            s: point.s,
            n: 0.0, // centerline path, no lateral optimization
            x: point.x,
            y: point.y,
            z: point.z,
            v,
            v_kmh: v * 3.6,
            timestamp,
            ..Default::default()
        };

        state.ay = v * v * point.kappa;

        // longitudinal acceleration from the discrete speed change ahead
        if index < self.track.len() - 1 {
            let v_next = self.v_optimal[index + 1];
            let dt = if v > 0.0 { point.ds / v } else { 0.0 };
            state.ax = if dt > 0.0 { (v_next - v) / dt } else { 0.0 };
        }

        state.az = GRAVITY;
        state.update_g_forces(GRAVITY);

        state.curvature = point.kappa;
        state.radius = if point.kappa.abs() > 1e-6 { 1.0 / point.kappa.abs() } else { 1e9 };
        state.banking_angle = point.banking;

        state.drag_force = self.aero.drag_force(v);
        state.downforce = self.aero.downforce(v);
        state.vertical_load = self.aero.total_vertical_load(v, mass, GRAVITY);
        state.tire_force_x = mass * state.ax;
        state.tire_force_y = mass * state.ay;

        if state.ax > 0.1 {
            state.throttle = (state.ax / 20.0).min(1.0);
            state.brake = 0.0;
        } else if state.ax < -0.1 {
            state.throttle = 0.0;
            state.brake = (-state.ax / 30.0).min(1.0);
        }

        state.steering_angle = (self.vehicle.mass.wheelbase * point.kappa).atan();

        state.gear = self.powertrain.optimal_gear(v);
        state.rpm = self.powertrain.rpm(v, state.gear);
        state.engine_torque = self.powertrain.engine_torque(state.rpm);
        state.wheel_force = self.powertrain.wheel_force(v, state.gear);

        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{PowertrainParams, TorquePoint};

    fn test_vehicle() -> VehicleSpec {
        VehicleSpec {
            name: "solver test car".to_string(),
            powertrain: PowertrainParams {
                torque_curve: vec![
                    TorquePoint { rpm: 4000.0, torque: 250.0 },
                    TorquePoint { rpm: 10000.0, torque: 320.0 },
                    TorquePoint { rpm: 14000.0, torque: 280.0 },
                ],
                gear_ratios: vec![3.2, 2.5, 2.0, 1.6, 1.3, 1.1],
                ..PowertrainParams::default()
            },
            ..VehicleSpec::default()
        }
    }

    #[test]
    fn straights_get_the_nominal_cap() {
        let cfg = SolverConfig::default();
        let v = test_vehicle();
        assert!((cornering_speed_limit(&v, 0.0, &cfg) - cfg.straight_speed).abs() < 1e-12);
        assert!((cornering_speed_limit(&v, 0.0015, &cfg) - cfg.straight_speed).abs() < 1e-12);
    }

    #[test]
    fn cornering_speed_follows_the_grip_relation() {
        let cfg = SolverConfig::default();
        let mut v = test_vehicle();
        v.aero.cl = 0.0; // no downforce: v = sqrt(mu g / kappa)

        let kappa = 0.05;
        let expected = (v.tire.mu_y * GRAVITY / kappa).sqrt();
        assert!((cornering_speed_limit(&v, kappa, &cfg) - expected).abs() < 1e-9);
        // direction does not matter
        assert!((cornering_speed_limit(&v, -kappa, &cfg) - expected).abs() < 1e-9);
    }

    #[test]
    fn cornering_speed_is_non_decreasing_in_lateral_grip() {
        let cfg = SolverConfig::default();
        let kappa = 0.03;
        let mut prev = 0.0;
        for mu_y in [1.0, 1.2, 1.4, 1.6, 1.8, 2.0] {
            let mut v = test_vehicle();
            v.tire.mu_y = mu_y;
            let limit = cornering_speed_limit(&v, kappa, &cfg);
            assert!(limit >= prev - 1e-9, "mu_y = {mu_y}: {limit} < {prev}");
            prev = limit;
        }
    }

    #[test]
    fn downforce_dominated_corners_fall_back_to_the_cap() {
        let cfg = SolverConfig::default();
        let mut v = test_vehicle();
        v.aero.cl = -12.0; // extreme downforce
        let limit = cornering_speed_limit(&v, 0.005, &cfg);
        assert!((limit - cfg.downforce_dominated_speed).abs() < 1e-12);
    }

    #[test]
    fn solver_rejects_invalid_vehicles() {
        let samples: Vec<model::TrackSample> = (0..32)
            .map(|i| {
                let theta = 2.0 * std::f64::consts::PI * i as f64 / 32.0;
                model::TrackSample {
                    x: 100.0 * theta.cos(),
                    y: 100.0 * theta.sin(),
                    z: 0.0,
                    w_tr_left: 5.0,
                    w_tr_right: 5.0,
                    banking: 0.0,
                }
            })
            .collect();
        let track = Track::from_samples("ring", &samples).unwrap();

        let mut bad = test_vehicle();
        bad.powertrain.gear_ratios.clear();
        assert!(LapSolver::new(&track, &bad, SolverConfig::default()).is_err());
    }
}
