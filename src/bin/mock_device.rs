//! Mock drainage sensor device for local development.
//!
//! Serves the same plain-text body as the real device at `/root`, cycling
//! through the readings given on the command line (one per request).
//!
//! Usage:
//!   cargo run --bin mock_device -- --port 8080 "50.00%:30" "99.90%:30" "12.00%:5"
//!
//! Then point the daemon at it:
//!   DRAINMON_HOST=127.0.0.1 DRAINMON_PORT=8080 cargo run --bin drainmon

use std::env;

use drainmon_service::logging;
use tracing::{error, info};

const DEFAULT_PORT: u16 = 8080;
const DEVICE_PATH: &str = "/root";

/// One scripted reading: water level text and distance in centimetres.
struct Reading {
    water_level: String,
    distance_cm: i64,
}

impl Reading {
    fn body(&self) -> String {
        format!("waterLevel: {}, distance: {}", self.water_level, self.distance_cm)
    }
}

/// Readings served in order, one per `/root` request, wrapping around.
struct ReadingCycle {
    readings: Vec<Reading>,
    served: usize,
}

impl ReadingCycle {
    fn new(readings: Vec<Reading>) -> Self {
        Self { readings, served: 0 }
    }

    /// Status code and body for a request to `url`. Only `/root` advances
    /// the cycle.
    fn respond(&mut self, url: &str) -> (u16, String) {
        if url != DEVICE_PATH || self.readings.is_empty() {
            return (404, "not found".to_string());
        }
        let body = self.readings[self.served % self.readings.len()].body();
        self.served += 1;
        (200, body)
    }
}

fn parse_reading(arg: &str) -> Result<Reading, String> {
    let (level, distance) = arg
        .rsplit_once(':')
        .ok_or_else(|| format!("expected LEVEL:DISTANCE, got {}", arg))?;
    let distance_cm = distance
        .parse()
        .map_err(|_| format!("distance must be an integer: {}", distance))?;
    Ok(Reading {
        water_level: level.to_string(),
        distance_cm,
    })
}

fn main() {
    logging::init_logging("info");

    let args: Vec<String> = env::args().skip(1).collect();
    let mut port = DEFAULT_PORT;
    let mut readings = Vec::new();

    let mut i = 0;
    while i < args.len() {
        if args[i] == "--port" {
            match args.get(i + 1).and_then(|p| p.parse().ok()) {
                Some(p) => port = p,
                None => {
                    eprintln!("Error: --port requires a port number");
                    std::process::exit(1);
                }
            }
            i += 2;
            continue;
        }
        match parse_reading(&args[i]) {
            Ok(reading) => readings.push(reading),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        i += 1;
    }

    if readings.is_empty() {
        readings.push(Reading {
            water_level: "50.00%".to_string(),
            distance_cm: 30,
        });
    }

    let server = match tiny_http::Server::http(format!("0.0.0.0:{}", port)) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Failed to start mock device: {}", e);
            std::process::exit(1);
        }
    };
    info!(port, readings = readings.len(), path = DEVICE_PATH, "mock device listening");

    let mut cycle = ReadingCycle::new(readings);
    for request in server.incoming_requests() {
        let (code, body) = cycle.respond(request.url());
        if code == 200 {
            info!(%body, "serving reading");
        }
        let response = tiny_http::Response::from_string(body).with_status_code(tiny_http::StatusCode(code));

        if let Err(e) = request.respond(response) {
            error!(error = %e, "failed to send response");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(args: &[&str]) -> ReadingCycle {
        ReadingCycle::new(args.iter().map(|a| parse_reading(a).expect("reading")).collect())
    }

    #[test]
    fn test_parse_reading() {
        let reading = parse_reading("99.90%:5").expect("should parse");
        assert_eq!(reading.body(), "waterLevel: 99.90%, distance: 5");
        assert!(parse_reading("99.90%").is_err());
        assert!(parse_reading("99.90%:near").is_err());
    }

    #[test]
    fn test_cycle_wraps_around() {
        let mut cycle = cycle(&["50.00%:30", "99.90%:30"]);
        assert_eq!(cycle.respond("/root").1, "waterLevel: 50.00%, distance: 30");
        assert_eq!(cycle.respond("/root").1, "waterLevel: 99.90%, distance: 30");
        assert_eq!(cycle.respond("/root").1, "waterLevel: 50.00%, distance: 30");
    }

    #[test]
    fn test_other_paths_do_not_advance_cycle() {
        let mut cycle = cycle(&["50.00%:30", "99.90%:30"]);
        assert_eq!(cycle.respond("/favicon.ico").0, 404);
        assert_eq!(cycle.respond("/status").0, 404);
        assert_eq!(cycle.respond("/root"), (200, "waterLevel: 50.00%, distance: 30".to_string()));
    }
}
