use model::AeroParams;

/// Aerodynamic forces as a function of speed.
#[derive(Clone, Debug)]
pub struct AeroModel {
    params: AeroParams,
}

impl AeroModel {
    pub fn new(params: &AeroParams) -> Self {
        Self { params: params.clone() }
    }

    /// 0.5 * rho * A, shared by drag and lift.
    fn dynamic_coefficient(&self) -> f64 {
        0.5 * self.params.air_density * self.params.frontal_area
    }

    /// Drag force at speed `v` (N), always opposing motion.
    pub fn drag_force(&self, v: f64) -> f64 {
        self.dynamic_coefficient() * self.params.cd * v * v
    }

    /// Downforce at speed `v` (N). Cl is negative for a downforce-generating
    /// car, so the sign flip makes the returned value positive.
    pub fn downforce(&self, v: f64) -> f64 {
        -self.dynamic_coefficient() * self.params.cl * v * v
    }

    /// Total vertical tire load: weight plus downforce (N).
    pub fn total_vertical_load(&self, v: f64, mass: f64, gravity: f64) -> f64 {
        mass * gravity + self.downforce(v)
    }

    /// Power consumed by drag at speed `v` (W).
    pub fn drag_power(&self, v: f64) -> f64 {
        self.drag_force(v) * v
    }
}
