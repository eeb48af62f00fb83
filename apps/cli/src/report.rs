//! Human-readable lap summary, printed after a solve.

use model::{LapResult, Track, VehicleSpec};

pub fn print_summary(track: &Track, vehicle: &VehicleSpec, result: &LapResult) {
    let line = "=".repeat(72);

    println!("{line}");
    println!("Track: {} ({} points, {:.1} m)", track.name(), track.len(), track.total_length());
    println!(
        "Vehicle: {} ({:.0} kg, {:.2} hp/kg, Cd {:.2}, Cl {:.2})",
        vehicle.name,
        vehicle.mass.mass,
        vehicle.power_to_weight(),
        vehicle.aero.cd,
        vehicle.aero.cl
    );
    println!("{line}");

    println!("Optimal lap time: {} ({:.3} s)", format_time(result.lap_time), result.lap_time);
    if result.converged {
        println!("Converged after {} iterations", result.iterations);
    } else {
        println!("Did not converge within {} iterations; best profile reported", result.iterations);
    }

    let max_speed = result.max_speed();
    let avg_speed = result.average_speed();
    let (max_gx, max_gy, max_g) = result.max_g_forces();

    println!("Max speed: {:.1} km/h ({:.1} m/s)", max_speed * 3.6, max_speed);
    println!("Avg speed: {:.1} km/h ({:.1} m/s)", avg_speed * 3.6, avg_speed);
    println!("Peak G: {max_gx:.2} long / {max_gy:.2} lat / {max_g:.2} total");
    println!("{line}");
}

/// MM:SS.mmm
pub fn format_time(seconds: f64) -> String {
    let minutes = (seconds / 60.0) as u32;
    let secs = seconds - minutes as f64 * 60.0;
    format!("{minutes:02}:{secs:06.3}")
}

/// File-name-safe variant of a vehicle or track name.
pub fn clean_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if matches!(c, ' ' | '-' | '(' | ')') { '_' } else { c })
        .collect();
    while out.contains("__") {
        out = out.replace("__", "_");
    }
    out
}
