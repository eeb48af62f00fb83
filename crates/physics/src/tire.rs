use model::TireParams;

/// Static load per tire the friction coefficients are referenced to (N).
const FZ_REFERENCE: f64 = 2000.0;

/// Load-sensitive friction model with a combined-grip (friction circle)
/// constraint.
#[derive(Clone, Debug)]
pub struct TireModel {
    params: TireParams,
}

impl TireModel {
    pub fn new(params: &TireParams) -> Self {
        Self { params: params.clone() }
    }

    /// Effective friction coefficient at vertical load `fz`:
    /// mu_eff = mu_base * (Fz / Fz_ref)^(sensitivity - 1). Grip grows
    /// sub-linearly with load for sensitivity < 1.
    pub fn effective_mu(&self, fz: f64, base_mu: f64) -> f64 {
        if fz <= 0.0 {
            return 0.0;
        }
        let load_ratio = fz / FZ_REFERENCE;
        base_mu * load_ratio.powf(self.params.load_sensitivity - 1.0)
    }

    /// Peak longitudinal force at load `fz` with no lateral demand (N).
    pub fn max_longitudinal_force(&self, fz: f64) -> f64 {
        self.effective_mu(fz, self.params.mu_x) * fz
    }

    /// Peak lateral force at load `fz` with no longitudinal demand (N).
    pub fn max_lateral_force(&self, fz: f64) -> f64 {
        self.effective_mu(fz, self.params.mu_y) * fz
    }

    /// Combined-grip budget at load `fz`, using the averaged friction
    /// coefficient (N).
    pub fn max_total_force(&self, fz: f64) -> f64 {
        let mu_avg = (self.params.mu_x + self.params.mu_y) / 2.0;
        self.effective_mu(fz, mu_avg) * fz
    }

    /// Longitudinal force still available while `fy_current` is being used
    /// laterally: Fx = sqrt((mu Fz)^2 - Fy^2), zero when saturated.
    pub fn available_longitudinal_force(&self, fz: f64, fy_current: f64) -> f64 {
        let f_max = self.max_total_force(fz);
        let budget = f_max * f_max - fy_current * fy_current;
        if budget <= 0.0 {
            return 0.0;
        }
        budget.sqrt()
    }

    /// Lateral force still available while `fx_current` is being used
    /// longitudinally.
    pub fn available_lateral_force(&self, fz: f64, fx_current: f64) -> f64 {
        let f_max = self.max_total_force(fz);
        let budget = f_max * f_max - fx_current * fx_current;
        if budget <= 0.0 {
            return 0.0;
        }
        budget.sqrt()
    }

    pub fn is_within_friction_circle(&self, fx: f64, fy: f64, fz: f64) -> bool {
        (fx * fx + fy * fy).sqrt() <= self.max_total_force(fz)
    }
}
