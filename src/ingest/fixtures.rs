//! Test fixtures: representative bodies served by the sensor device.
//!
//! The device answers `GET /root` with `text/plain` in a fixed order:
//!   `<water level name>: <percentage>, <distance name>: <centimetres>`
//!
//! The firmware caps the water-level percentage at `99.90%`, which is the
//! reading the default overflow rule looks for.

/// Half-full drain, nothing in front of the ultrasonic sensor.
pub(crate) const NORMAL_BODY: &str = "waterLevel: 50.00%, distance: 30";

/// Drain at the firmware's maximum reading.
pub(crate) const OVERFLOW_BODY: &str = "waterLevel: 99.90%, distance: 45";

/// Debris 5 cm from the sensor.
pub(crate) const BLOCKAGE_BODY: &str = "waterLevel: 12.50%, distance: 5";

/// Both conditions at once.
pub(crate) const OVERFLOW_AND_BLOCKAGE_BODY: &str = "waterLevel: 99.90%, distance: 20";

/// Capitalised field names and a trailing CRLF.
pub(crate) const VERBOSE_NAMES_BODY: &str = "Water Level: 73.25%, Distance: 112\r\n";

/// Distance field dropped by a truncated write.
pub(crate) const ONE_FIELD_BODY: &str = "waterLevel: 50.00%";

/// An extra field appended by newer firmware.
pub(crate) const THREE_FIELD_BODY: &str = "waterLevel: 50.00%, distance: 30, battery: 88%";

/// Sensor timeout reported as text instead of a number.
pub(crate) const NON_NUMERIC_DISTANCE_BODY: &str = "waterLevel: 50.00%, distance: timeout";
