use model::{VehicleSpec, GRAVITY};
use physics::{AeroModel, PowertrainModel, TireModel};
use rayon::prelude::*;
use tracing::info;

/// Grid bounds and engineering caps for envelope generation. The caps are
/// numerical-stability clamps against unrealistic extrapolation, not
/// physics; tune them per vehicle class if needed.
#[derive(Clone, Debug)]
pub struct EnvelopeConfig {
    /// Lowest gridded speed (m/s)
    pub v_min: f64,
    /// Highest gridded speed (m/s)
    pub v_max: f64,
    /// Speed resolution (m/s)
    pub v_step: f64,
    /// Highest gridded lateral acceleration magnitude (m/s²)
    pub ay_max: f64,
    /// Lateral acceleration resolution (m/s²)
    pub ay_step: f64,
    /// Upper clamp on forward acceleration (m/s²)
    pub max_accel: f64,
    /// Upper clamp on deceleration magnitude (m/s²)
    pub max_decel: f64,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            v_min: 0.0,
            v_max: 120.0,
            v_step: 0.5,
            ay_max: 50.0,
            ay_step: 1.0,
            max_accel: 50.0,
            max_decel: 60.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Cell {
    accel: f64,
    brake: f64,
}

/// One grid node, as yielded by [`Envelope::samples`].
#[derive(Clone, Copy, Debug)]
pub struct EnvelopeSample {
    pub v: f64,
    pub ay: f64,
    /// Peak forward acceleration at (v, ay) (m/s²)
    pub ax_accel: f64,
    /// Peak deceleration at (v, ay) (m/s², negative)
    pub ax_brake: f64,
}

/// Precomputed (speed, lateral acceleration) -> peak longitudinal
/// acceleration map ("GGV diagram"). Generation happens in the constructor,
/// so every live `Envelope` is queryable.
#[derive(Clone, Debug)]
pub struct Envelope {
    cfg: EnvelopeConfig,
    n_v: usize,
    n_ay: usize,
    cells: Vec<Cell>,
}

impl Envelope {
    /// Build the full grid for `vehicle`. Cells are independent, so rows
    /// are computed in parallel.
    pub fn generate(vehicle: &VehicleSpec, cfg: &EnvelopeConfig) -> Self {
        let aero = AeroModel::new(&vehicle.aero);
        let tire = TireModel::new(&vehicle.tire);
        let powertrain = PowertrainModel::new(&vehicle.powertrain, vehicle.tire.tire_radius);

        let n_v = ((cfg.v_max - cfg.v_min) / cfg.v_step).floor() as usize + 1;
        let n_ay = (cfg.ay_max / cfg.ay_step).floor() as usize + 1;

        info!(
            speeds = n_v,
            lateral_levels = n_ay,
            v_max = cfg.v_max,
            "generating acceleration envelope"
        );

        let mass = vehicle.mass.mass;
        let brake_cap = vehicle.brake.max_brake_force;

        // one independent row per gridded speed; rayon keeps row order
        let rows: Vec<Vec<Cell>> = (0..n_v)
            .into_par_iter()
            .map(|vi| {
                let v = cfg.v_min + vi as f64 * cfg.v_step;
                (0..n_ay)
                    .map(|ayi| {
                        let ay = ayi as f64 * cfg.ay_step;
                        Cell {
                            accel: max_acceleration_at(
                                v, ay, mass, &aero, &tire, &powertrain, cfg.max_accel,
                            ),
                            brake: max_braking_at(
                                v, ay, mass, brake_cap, &aero, &tire, cfg.max_decel,
                            ),
                        }
                    })
                    .collect()
            })
            .collect();
        let cells: Vec<Cell> = rows.into_iter().flatten().collect();

        Self { cfg: cfg.clone(), n_v, n_ay, cells }
    }

    pub fn config(&self) -> &EnvelopeConfig {
        &self.cfg
    }

    /// Peak forward acceleration at (v, |ay|), bilinearly interpolated and
    /// clamped to the grid domain (m/s²).
    pub fn max_acceleration(&self, v: f64, ay: f64) -> f64 {
        self.interpolate(v, ay.abs(), |c| c.accel)
    }

    /// Peak deceleration at (v, |ay|) (m/s², negative).
    pub fn max_braking(&self, v: f64, ay: f64) -> f64 {
        self.interpolate(v, ay.abs(), |c| c.brake)
    }

    /// Iterate all grid nodes, speed-major.
    pub fn samples(&self) -> impl Iterator<Item = EnvelopeSample> + '_ {
        self.cells.iter().enumerate().map(|(i, c)| {
            let vi = i / self.n_ay;
            let ayi = i % self.n_ay;
            EnvelopeSample {
                v: self.cfg.v_min + vi as f64 * self.cfg.v_step,
                ay: ayi as f64 * self.cfg.ay_step,
                ax_accel: c.accel,
                ax_brake: c.brake,
            }
        })
    }

    fn interpolate(&self, v: f64, ay: f64, value: impl Fn(&Cell) -> f64) -> f64 {
        let v = v.clamp(self.cfg.v_min, self.cfg.v_max);
        let ay = ay.clamp(0.0, self.cfg.ay_max);

        let (vi, vt) = axis_index((v - self.cfg.v_min) / self.cfg.v_step, self.n_v);
        let (ayi, ayt) = axis_index(ay / self.cfg.ay_step, self.n_ay);

        let at = |vi: usize, ayi: usize| value(&self.cells[vi * self.n_ay + ayi]);
        let vi1 = (vi + 1).min(self.n_v - 1);
        let ayi1 = (ayi + 1).min(self.n_ay - 1);

        let v00 = at(vi, ayi);
        let v10 = at(vi1, ayi);
        let v01 = at(vi, ayi1);
        let v11 = at(vi1, ayi1);

        let low = v00 * (1.0 - vt) + v10 * vt;
        let high = v01 * (1.0 - vt) + v11 * vt;
        low * (1.0 - ayt) + high * ayt
    }
}

/// Bracketing cell index and interpolation fraction along one grid axis.
fn axis_index(frac: f64, n: usize) -> (usize, f64) {
    if n <= 1 {
        return (0, 0.0);
    }
    let i = (frac.floor().max(0.0) as usize).min(n - 2);
    (i, (frac - i as f64).clamp(0.0, 1.0))
}

fn max_acceleration_at(
    v: f64,
    ay: f64,
    mass: f64,
    aero: &AeroModel,
    tire: &TireModel,
    powertrain: &PowertrainModel,
    cap: f64,
) -> f64 {
    let v = v.max(0.1);

    let fz_total = aero.total_vertical_load(v, mass, GRAVITY);
    let fy_required = mass * ay;

    let fx_tire = tire.available_longitudinal_force(fz_total, fy_required);
    let fx_engine = powertrain.max_wheel_force(v);
    let drag = aero.drag_force(v);

    // traction is the lesser of what the engine makes and what the tires
    // can transmit; drag always subtracts
    let ax = (fx_engine.min(fx_tire) - drag) / mass;
    ax.clamp(0.0, cap)
}

fn max_braking_at(
    v: f64,
    ay: f64,
    mass: f64,
    brake_cap: f64,
    aero: &AeroModel,
    tire: &TireModel,
    cap: f64,
) -> f64 {
    let v = v.max(0.1);

    let fz_total = aero.total_vertical_load(v, mass, GRAVITY);
    let fy_required = mass * ay;

    let fx_tire = tire.available_longitudinal_force(fz_total, fy_required);
    let fx_brake = fx_tire.min(brake_cap);
    let drag = aero.drag_force(v);

    // drag helps slow the car down
    let ax = -(fx_brake + drag) / mass;
    ax.max(-cap)
}
