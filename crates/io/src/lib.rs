//! File-format boundary: track/vehicle import and telemetry export

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs::File, path::Path};

use model::{
    AeroParams, BrakeParams, LapResult, MassParams, PowertrainParams, TireParams, TorquePoint,
    Track, TrackSample, VehicleSpec,
};
use solver::Envelope;

/// Import a centerline CSV in the common race-track-database layout:
/// `x_m, y_m, w_tr_right_m, w_tr_left_m`, with `#` comment lines. The track
/// name is taken from the file stem.
pub fn import_track_csv(path: &Path) -> Result<Track> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening track csv {}", path.display()))?;

    let mut samples = Vec::new();
    for rec in rdr.deserialize() {
        let row: Vec<f64> = rec?;
        if row.len() < 4 {
            continue;
        }
        samples.push(TrackSample {
            x: row[0],
            y: row[1],
            z: 0.0,
            w_tr_left: row[3],
            w_tr_right: row[2],
            banking: 0.0,
        });
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Unnamed Track".to_string());

    Ok(Track::from_samples(name, &samples)?)
}

#[derive(Deserialize)]
struct TrackPointFile {
    x: f64,
    y: f64,
    #[serde(default)]
    elevation: f64,
    #[serde(default = "default_edge_width")]
    w_tr_left: f64,
    #[serde(default = "default_edge_width")]
    w_tr_right: f64,
    #[serde(default)]
    banking: f64,
}

fn default_edge_width() -> f64 {
    5.0
}

#[derive(Deserialize)]
struct TrackFile {
    #[serde(default)]
    name: Option<String>,
    points: Vec<TrackPointFile>,
}

/// Import a track JSON document: `{ "name": ..., "points": [{x, y, ...}] }`.
pub fn import_track_json(path: &Path) -> Result<Track> {
    let file =
        File::open(path).with_context(|| format!("opening track json {}", path.display()))?;
    let doc: TrackFile = serde_json::from_reader(std::io::BufReader::new(file))?;

    let samples: Vec<TrackSample> = doc
        .points
        .iter()
        .map(|p| TrackSample {
            x: p.x,
            y: p.y,
            z: p.elevation,
            w_tr_left: p.w_tr_left,
            w_tr_right: p.w_tr_right,
            banking: p.banking,
        })
        .collect();

    let name = doc.name.unwrap_or_else(|| "Unnamed Track".to_string());
    Ok(Track::from_samples(name, &samples)?)
}

#[derive(Deserialize)]
#[serde(default)]
struct MassFile {
    mass: f64,
    cog_height: f64,
    wheelbase: f64,
    weight_distribution: f64,
}

impl Default for MassFile {
    fn default() -> Self {
        let d = MassParams::default();
        Self {
            mass: d.mass,
            cog_height: d.cog_height,
            wheelbase: d.wheelbase,
            weight_distribution: d.weight_distribution,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct AeroFile {
    #[serde(rename = "Cl")]
    cl: f64,
    #[serde(rename = "Cd")]
    cd: f64,
    frontal_area: f64,
    air_density: f64,
}

impl Default for AeroFile {
    fn default() -> Self {
        let d = AeroParams::default();
        Self { cl: d.cl, cd: d.cd, frontal_area: d.frontal_area, air_density: d.air_density }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct TireFile {
    mu_x: f64,
    mu_y: f64,
    load_sensitivity: f64,
    tire_radius: f64,
}

impl Default for TireFile {
    fn default() -> Self {
        let d = TireParams::default();
        Self {
            mu_x: d.mu_x,
            mu_y: d.mu_y,
            load_sensitivity: d.load_sensitivity,
            tire_radius: d.tire_radius,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct PowertrainFile {
    /// RPM (as an object key) -> torque in Nm
    engine_torque_curve: std::collections::HashMap<String, f64>,
    gear_ratios: Vec<f64>,
    final_drive: f64,
    efficiency: f64,
    max_rpm: f64,
    min_rpm: f64,
    shift_time: f64,
}

impl Default for PowertrainFile {
    fn default() -> Self {
        let d = PowertrainParams::default();
        Self {
            engine_torque_curve: std::collections::HashMap::new(),
            gear_ratios: Vec::new(),
            final_drive: d.final_drive_ratio,
            efficiency: d.drivetrain_efficiency,
            max_rpm: d.max_rpm,
            min_rpm: d.min_rpm,
            shift_time: d.shift_time,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct BrakeFile {
    max_brake_force: f64,
    brake_bias: f64,
}

impl Default for BrakeFile {
    fn default() -> Self {
        let d = BrakeParams::default();
        Self { max_brake_force: d.max_brake_force, brake_bias: d.brake_bias }
    }
}

#[derive(Deserialize)]
struct VehicleFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    mass: MassFile,
    #[serde(default)]
    aerodynamics: AeroFile,
    #[serde(default)]
    tire: TireFile,
    #[serde(default)]
    powertrain: PowertrainFile,
    #[serde(default)]
    brake: BrakeFile,
}

/// Import and validate a vehicle JSON document. The torque curve comes in
/// as an object keyed by RPM strings and is sorted ascending here.
pub fn import_vehicle_json(path: &Path) -> Result<VehicleSpec> {
    let file =
        File::open(path).with_context(|| format!("opening vehicle json {}", path.display()))?;
    let doc: VehicleFile = serde_json::from_reader(std::io::BufReader::new(file))?;

    let mut torque_curve = Vec::with_capacity(doc.powertrain.engine_torque_curve.len());
    for (rpm, torque) in &doc.powertrain.engine_torque_curve {
        let rpm: f64 =
            rpm.parse().with_context(|| format!("torque curve key {rpm:?} is not a number"))?;
        torque_curve.push(TorquePoint { rpm, torque: *torque });
    }
    torque_curve.sort_by(|a, b| a.rpm.partial_cmp(&b.rpm).unwrap_or(std::cmp::Ordering::Equal));

    let spec = VehicleSpec {
        name: doc.name.unwrap_or_else(|| "Unnamed Vehicle".to_string()),
        mass: MassParams {
            mass: doc.mass.mass,
            cog_height: doc.mass.cog_height,
            wheelbase: doc.mass.wheelbase,
            weight_distribution: doc.mass.weight_distribution,
        },
        aero: AeroParams {
            cl: doc.aerodynamics.cl,
            cd: doc.aerodynamics.cd,
            frontal_area: doc.aerodynamics.frontal_area,
            air_density: doc.aerodynamics.air_density,
        },
        tire: TireParams {
            mu_x: doc.tire.mu_x,
            mu_y: doc.tire.mu_y,
            load_sensitivity: doc.tire.load_sensitivity,
            tire_radius: doc.tire.tire_radius,
        },
        powertrain: PowertrainParams {
            torque_curve,
            gear_ratios: doc.powertrain.gear_ratios,
            final_drive_ratio: doc.powertrain.final_drive,
            drivetrain_efficiency: doc.powertrain.efficiency,
            max_rpm: doc.powertrain.max_rpm,
            min_rpm: doc.powertrain.min_rpm,
            shift_time: doc.powertrain.shift_time,
        },
        brake: BrakeParams {
            max_brake_force: doc.brake.max_brake_force,
            brake_bias: doc.brake.brake_bias,
        },
    };

    spec.validate()?;
    Ok(spec)
}

#[derive(Serialize)]
struct TelemetryRow {
    timestamp_s: f64,
    arc_length_m: f64,
    pos_x_m: f64,
    pos_y_m: f64,
    pos_z_m: f64,
    lateral_offset_m: f64,
    speed_ms: f64,
    speed_kmh: f64,
    accel_long_ms2: f64,
    accel_lat_ms2: f64,
    accel_vert_ms2: f64,
    g_long: f64,
    g_lat: f64,
    g_vert: f64,
    g_total: f64,
    throttle_pct: f64,
    brake_pct: f64,
    steering_angle_rad: f64,
    gear: i8,
    rpm: f64,
    engine_torque_nm: f64,
    wheel_force_n: f64,
    drag_force_n: f64,
    downforce_n: f64,
    tire_force_long_n: f64,
    tire_force_lat_n: f64,
    vertical_load_n: f64,
    curvature_inv_m: f64,
    radius_m: f64,
    banking_rad: f64,
}

/// Export the telemetry trace as CSV, one row per simulation state.
pub fn export_telemetry_csv(result: &LapResult, path: &Path) -> Result<()> {
    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("creating telemetry csv {}", path.display()))?;

    for s in &result.states {
        w.serialize(TelemetryRow {
            timestamp_s: s.timestamp,
            arc_length_m: s.s,
            pos_x_m: s.x,
            pos_y_m: s.y,
            pos_z_m: s.z,
            lateral_offset_m: s.n,
            speed_ms: s.v,
            speed_kmh: s.v_kmh,
            accel_long_ms2: s.ax,
            accel_lat_ms2: s.ay,
            accel_vert_ms2: s.az,
            g_long: s.gx,
            g_lat: s.gy,
            g_vert: s.gz,
            g_total: s.g_total,
            throttle_pct: s.throttle * 100.0,
            brake_pct: s.brake * 100.0,
            steering_angle_rad: s.steering_angle,
            gear: s.gear,
            rpm: s.rpm,
            engine_torque_nm: s.engine_torque,
            wheel_force_n: s.wheel_force,
            drag_force_n: s.drag_force,
            downforce_n: s.downforce,
            tire_force_long_n: s.tire_force_x,
            tire_force_lat_n: s.tire_force_y,
            vertical_load_n: s.vertical_load,
            curvature_inv_m: s.curvature,
            radius_m: s.radius,
            banking_rad: s.banking_angle,
        })?;
    }

    w.flush()?;
    Ok(())
}

/// Export the whole lap result (time, convergence info and states) as JSON.
pub fn export_telemetry_json(result: &LapResult, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("creating telemetry json {}", path.display()))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), result)?;
    Ok(())
}

#[derive(Serialize)]
struct EnvelopeRow {
    velocity_ms: f64,
    lateral_accel_ms2: f64,
    max_accel_ms2: f64,
    max_brake_ms2: f64,
}

/// Export every envelope grid node as CSV.
pub fn export_ggv_csv(envelope: &Envelope, path: &Path) -> Result<()> {
    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("creating envelope csv {}", path.display()))?;

    for sample in envelope.samples() {
        w.serialize(EnvelopeRow {
            velocity_ms: sample.v,
            lateral_accel_ms2: sample.ay,
            max_accel_ms2: sample.ax_accel,
            max_brake_ms2: sample.ax_brake,
        })?;
    }

    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn scratch_file(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("vsim-io-test-{}-{}", std::process::id(), name));
        p
    }

    #[test]
    fn imports_centerline_csv() {
        let path = scratch_file("track.csv");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "# x_m,y_m,w_tr_right_m,w_tr_left_m").unwrap();
        writeln!(f, "0.0,0.0,4.0,5.0").unwrap();
        writeln!(f, "100.0,0.0,4.0,5.0").unwrap();
        writeln!(f, "100.0,80.0,4.0,5.0").unwrap();
        writeln!(f, "0.0,80.0,4.0,5.0").unwrap();
        drop(f);

        let track = import_track_csv(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(track.len(), 4);
        assert!((track.total_length() - 360.0).abs() < 1e-9);
        assert!((track.point(0).w_tr_left - 5.0).abs() < 1e-12);
        assert!((track.point(0).w_tr_right - 4.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_degenerate_csv_tracks() {
        let path = scratch_file("short.csv");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "0.0,0.0,4.0,4.0").unwrap();
        writeln!(f, "10.0,0.0,4.0,4.0").unwrap();
        drop(f);

        let err = import_track_csv(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(err.is_err());
    }

    #[test]
    fn imports_track_json_with_defaults() {
        let path = scratch_file("track.json");
        std::fs::write(
            &path,
            r#"{
                "name": "tri",
                "points": [
                    {"x": 0.0, "y": 0.0},
                    {"x": 50.0, "y": 0.0, "elevation": 2.0},
                    {"x": 0.0, "y": 50.0, "banking": 0.1}
                ]
            }"#,
        )
        .unwrap();

        let track = import_track_json(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(track.name(), "tri");
        assert_eq!(track.len(), 3);
        assert!((track.point(0).w_tr_left - 5.0).abs() < 1e-12);
        assert!((track.point(1).z - 2.0).abs() < 1e-12);
        assert!((track.point(2).banking - 0.1).abs() < 1e-12);
    }

    #[test]
    fn imports_and_validates_vehicle_json() {
        let path = scratch_file("vehicle.json");
        std::fs::write(
            &path,
            r#"{
                "name": "gp car",
                "mass": {"mass": 795.0},
                "aerodynamics": {"Cl": -3.1, "Cd": 0.9},
                "powertrain": {
                    "engine_torque_curve": {"10000": 310.0, "5000": 260.0, "14000": 285.0},
                    "gear_ratios": [3.0, 2.3, 1.8, 1.4, 1.1],
                    "final_drive": 3.6
                }
            }"#,
        )
        .unwrap();

        let vehicle = import_vehicle_json(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(vehicle.name, "gp car");
        assert!((vehicle.mass.mass - 795.0).abs() < 1e-12);
        assert!((vehicle.aero.cl + 3.1).abs() < 1e-12);
        // defaults fill the missing groups
        assert!((vehicle.tire.mu_y - 1.8).abs() < 1e-12);
        // map keys come out sorted by rpm
        let rpms: Vec<f64> = vehicle.powertrain.torque_curve.iter().map(|p| p.rpm).collect();
        assert_eq!(rpms, vec![5000.0, 10000.0, 14000.0]);
    }

    #[test]
    fn vehicle_json_without_a_drivetrain_fails_validation() {
        let path = scratch_file("empty-vehicle.json");
        std::fs::write(&path, r#"{ "name": "shell" }"#).unwrap();

        let err = import_vehicle_json(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(err.is_err());
    }

    fn small_result() -> LapResult {
        serde_json::from_str(
            r#"{
                "id": "00000000000000000000000000000001",
                "vehicle": "car",
                "track": "loop",
                "lap_time": 12.5,
                "converged": true,
                "iterations": 3,
                "states": [
                    {
                        "s": 0.0, "n": 0.0, "x": 0.0, "y": 0.0, "z": 0.0,
                        "v": 40.0, "v_kmh": 144.0, "ax": 1.0, "ay": -8.0, "az": 9.81,
                        "gx": 0.1, "gy": -0.8, "gz": 1.0, "g_total": 1.3,
                        "throttle": 0.05, "brake": 0.0, "steering_angle": 0.01,
                        "gear": 4, "rpm": 9000.0, "engine_torque": 290.0, "wheel_force": 5000.0,
                        "drag_force": 1500.0, "downforce": 4000.0,
                        "tire_force_x": 800.0, "tire_force_y": -6400.0, "vertical_load": 11848.0,
                        "curvature": -0.005, "radius": 200.0, "banking_angle": 0.0,
                        "timestamp": 0.0
                    },
                    {
                        "s": 10.0, "n": 0.0, "x": 10.0, "y": 0.0, "z": 0.0,
                        "v": 41.0, "v_kmh": 147.6, "ax": 0.9, "ay": -8.1, "az": 9.81,
                        "gx": 0.09, "gy": -0.82, "gz": 1.0, "g_total": 1.31,
                        "throttle": 0.04, "brake": 0.0, "steering_angle": 0.01,
                        "gear": 4, "rpm": 9200.0, "engine_torque": 291.0, "wheel_force": 4980.0,
                        "drag_force": 1570.0, "downforce": 4190.0,
                        "tire_force_x": 720.0, "tire_force_y": -6480.0, "vertical_load": 12038.0,
                        "curvature": -0.005, "radius": 200.0, "banking_angle": 0.0,
                        "timestamp": 0.25
                    }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn telemetry_csv_has_one_row_per_state() {
        let result = small_result();
        let path = scratch_file("telemetry.csv");
        export_telemetry_csv(&result, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1 + result.len());
        assert!(lines[0].starts_with("timestamp_s,arc_length_m,"));
        assert!(lines[1].contains("144"));
    }

    #[test]
    fn telemetry_json_round_trips() {
        let result = small_result();
        let path = scratch_file("telemetry.json");
        export_telemetry_json(&result, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let back: LapResult = serde_json::from_str(&contents).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn envelope_csv_lists_every_grid_node() {
        use solver::{Envelope, EnvelopeConfig};

        let vehicle = VehicleSpec {
            powertrain: PowertrainParams {
                torque_curve: vec![
                    TorquePoint { rpm: 4000.0, torque: 250.0 },
                    TorquePoint { rpm: 12000.0, torque: 300.0 },
                ],
                gear_ratios: vec![3.0, 2.0, 1.3],
                ..PowertrainParams::default()
            },
            ..VehicleSpec::default()
        };
        let cfg =
            EnvelopeConfig { v_max: 20.0, v_step: 5.0, ay_max: 10.0, ay_step: 5.0, ..Default::default() };
        let envelope = Envelope::generate(&vehicle, &cfg);

        let path = scratch_file("ggv.csv");
        export_ggv_csv(&envelope, &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        // 5 speeds x 3 lateral levels plus the header
        assert_eq!(contents.lines().count(), 1 + 5 * 3);
        assert!(contents.lines().next().unwrap().starts_with("velocity_ms,"));
    }
}
