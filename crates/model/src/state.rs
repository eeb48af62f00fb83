use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Quasi-steady-state snapshot of the vehicle at one track point.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct SimulationState {
    /// Arc length along the track (m)
    pub s: f64,
    /// Lateral offset from the centerline (m), positive = left
    pub n: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,

    /// Speed (m/s)
    pub v: f64,
    pub v_kmh: f64,
    /// Longitudinal acceleration (m/s²)
    pub ax: f64,
    /// Lateral acceleration (m/s²)
    pub ay: f64,
    /// Vertical acceleration (m/s²)
    pub az: f64,

    pub gx: f64,
    pub gy: f64,
    pub gz: f64,
    pub g_total: f64,

    /// Throttle fraction, 0..1
    pub throttle: f64,
    /// Brake fraction, 0..1
    pub brake: f64,
    /// Steering angle (rad)
    pub steering_angle: f64,

    /// 1-based gear, 0 = neutral
    pub gear: i8,
    pub rpm: f64,
    pub engine_torque: f64,
    pub wheel_force: f64,

    pub drag_force: f64,
    pub downforce: f64,
    pub tire_force_x: f64,
    pub tire_force_y: f64,
    pub vertical_load: f64,

    /// Track curvature at this point (1/m)
    pub curvature: f64,
    /// Turn radius (m), effectively infinite on straights
    pub radius: f64,
    pub banking_angle: f64,

    /// Time since the lap start (s)
    pub timestamp: f64,
}

impl Default for SimulationState {
    fn default() -> Self {
        Self {
            s: 0.0,
            n: 0.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            v: 0.0,
            v_kmh: 0.0,
            ax: 0.0,
            ay: 0.0,
            az: 0.0,
            gx: 0.0,
            gy: 0.0,
            gz: 0.0,
            g_total: 0.0,
            throttle: 0.0,
            brake: 0.0,
            steering_angle: 0.0,
            gear: 1,
            rpm: 0.0,
            engine_torque: 0.0,
            wheel_force: 0.0,
            drag_force: 0.0,
            downforce: 0.0,
            tire_force_x: 0.0,
            tire_force_y: 0.0,
            vertical_load: 0.0,
            curvature: 0.0,
            radius: 1e9,
            banking_angle: 0.0,
            timestamp: 0.0,
        }
    }
}

impl SimulationState {
    /// Derive the G-force fields from the stored accelerations.
    pub fn update_g_forces(&mut self, gravity: f64) {
        self.gx = self.ax / gravity;
        self.gy = self.ay / gravity;
        self.gz = self.az / gravity;
        self.g_total = (self.gx * self.gx + self.gy * self.gy + self.gz * self.gz).sqrt();
    }
}

/// Result of one solve: lap time plus the per-point telemetry trace.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct LapResult {
    #[serde(with = "uuid::serde::simple")]
    pub id: Uuid,
    pub vehicle: String,
    pub track: String,
    /// Optimal lap time (s)
    pub lap_time: f64,
    /// Whether the solver hit its convergence tolerance
    pub converged: bool,
    /// Solver iterations actually used
    pub iterations: u32,
    #[serde(default)]
    pub states: Vec<SimulationState>,
}

impl LapResult {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn max_speed(&self) -> f64 {
        self.states.iter().map(|s| s.v).fold(0.0_f64, f64::max)
    }

    /// Average speed over the lap, estimated from the last state's arc
    /// length.
    pub fn average_speed(&self) -> f64 {
        if self.lap_time <= 0.0 {
            return 0.0;
        }
        match self.states.last() {
            Some(last) => last.s / self.lap_time,
            None => 0.0,
        }
    }

    /// Peak (|gx|, |gy|, g_total) over the lap.
    pub fn max_g_forces(&self) -> (f64, f64, f64) {
        let mut max_gx = 0.0_f64;
        let mut max_gy = 0.0_f64;
        let mut max_g = 0.0_f64;
        for s in &self.states {
            max_gx = max_gx.max(s.gx.abs());
            max_gy = max_gy.max(s.gy.abs());
            max_g = max_g.max(s.g_total);
        }
        (max_gx, max_gy, max_g)
    }
}
