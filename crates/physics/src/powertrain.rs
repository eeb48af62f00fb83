use model::PowertrainParams;

/// Engine + transmission model mapping road speed to wheel force.
#[derive(Clone, Debug)]
pub struct PowertrainModel {
    params: PowertrainParams,
    tire_radius: f64,
}

impl PowertrainModel {
    pub fn new(params: &PowertrainParams, tire_radius: f64) -> Self {
        Self { params: params.clone(), tire_radius }
    }

    /// Engine speed for road speed `v` in `gear` (1-based), zero for an
    /// invalid gear.
    pub fn rpm(&self, v: f64, gear: i8) -> f64 {
        self.params.rpm_at(v, self.tire_radius, gear)
    }

    /// Interpolated engine torque at `rpm` (Nm).
    pub fn engine_torque(&self, rpm: f64) -> f64 {
        self.params.torque_at(rpm)
    }

    /// Tractive force at the contact patch for speed `v` in `gear` (N).
    /// Zero when the engine would fall outside its operating RPM window.
    pub fn wheel_force(&self, v: f64, gear: i8) -> f64 {
        if v <= 0.0 {
            return 0.0;
        }
        let ratio = self.params.total_ratio(gear);
        if ratio <= 0.0 {
            return 0.0;
        }

        let rpm = self.rpm(v, gear);
        if rpm < self.params.min_rpm || rpm > self.params.max_rpm {
            return 0.0;
        }

        let wheel_torque = self.engine_torque(rpm) * ratio * self.params.drivetrain_efficiency;
        wheel_torque / self.tire_radius
    }

    /// Best tractive force over all gears at speed `v` (N). Near standstill
    /// this falls back to first gear at crawl speed.
    pub fn max_wheel_force(&self, v: f64) -> f64 {
        if v <= 0.0 {
            return self.wheel_force(0.01, 1);
        }

        (1..=self.params.gear_ratios.len() as i8)
            .map(|gear| self.wheel_force(v, gear))
            .fold(0.0_f64, f64::max)
    }

    /// Gear selection for speed `v`, preferring the high-power band.
    pub fn optimal_gear(&self, v: f64) -> i8 {
        if v <= 0.0 {
            return 1;
        }
        self.params.optimal_gear(v, self.tire_radius)
    }

    /// Peak power through the drivetrain (W).
    pub fn max_power(&self) -> f64 {
        self.params
            .torque_curve
            .iter()
            .map(|p| p.torque * p.rpm * 2.0 * std::f64::consts::PI / 60.0)
            .fold(0.0_f64, f64::max)
            * self.params.drivetrain_efficiency
    }

    /// RPM at which the engine makes peak power.
    pub fn peak_power_rpm(&self) -> f64 {
        let mut best_power = 0.0_f64;
        let mut best_rpm = 0.0_f64;
        for p in &self.params.torque_curve {
            let power = p.torque * p.rpm * 2.0 * std::f64::consts::PI / 60.0;
            if power > best_power {
                best_power = power;
                best_rpm = p.rpm;
            }
        }
        best_rpm
    }

    /// Power delivered at the wheels for speed `v` in `gear` (W).
    pub fn wheel_power(&self, v: f64, gear: i8) -> f64 {
        self.wheel_force(v, gear) * v
    }
}
