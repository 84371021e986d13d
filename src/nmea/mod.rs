//! NMEA ASCII output formatting
//!
//! Pure functions from an output snapshot to the sentence set consumed
//! by glide computers: `GPRMC`, `GPGGA`, `GPMWV`, two `POV` records and
//! `HCHDT`. All number rendering is integer based; every sentence is
//! closed with the XOR checksum, CR and LF.

use crate::math::{NavFrame, Vec3};
use libm::{atan2f, sqrtf};

/// m/s to knots (90 * 60 NM / 10000 km * 3600 s/h)
const MPS_TO_KNOTS: f32 = 1.944;

/// radians to tenths of a degree
const RAD_TO_DEGREE_10: f32 = 572.958;

/// 2 pi as used for heading wrapping
const TWO_PI: f32 = 6.2832;

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Buffer capacity: the complete sentence set stays well below this.
const BUFFER_CAPACITY: usize = 512;

/// GNSS position, time and motion snapshot for the position sentences.
#[derive(Debug, Clone, Copy)]
pub struct GnssCoordinates {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub day: u8,
    pub month: u8,
    pub year: u16,
    /// Latitude in degrees, positive north
    pub latitude: f64,
    /// Longitude in degrees, positive east
    pub longitude: f64,
    /// Ground speed, m/s
    pub speed_motion: f32,
    /// True track, radians
    pub heading_motion: f32,
    /// 0 = no fix
    pub sat_fix_type: u8,
    /// Satellites used
    pub sats_number: u8,
    /// NED down position (negative altitude MSL), m
    pub position_down: f32,
    /// Geoid separation, decimeters
    pub geo_sep_dm: i32,
}

/// Everything one reporting tick feeds to the formatter.
#[derive(Debug, Clone, Copy)]
pub struct OutputData {
    pub coordinates: GnssCoordinates,
    /// Wind average, NED, m/s
    pub wind_average: Vec3,
    /// True airspeed, m/s
    pub tas: f32,
    /// Static pressure, Pa
    pub static_pressure: f32,
    /// Pitot differential pressure, Pa
    pub pitot_pressure: f32,
    /// Total-energy variometer, m/s
    pub vario: f32,
    /// Supply voltage, V
    pub supply_voltage: f32,
    /// Relative humidity 0..1, zero when no air-data sensor is fitted
    pub humidity: f32,
    /// Outside air temperature, degrees C
    pub temperature: f32,
    /// Euler attitude, radians
    pub roll: f32,
    pub nick: f32,
    pub yaw: f32,
}

/// Output accumulator for one reporting tick.
#[derive(Debug, Default)]
pub struct NmeaBuffer {
    data: heapless::Vec<u8, BUFFER_CAPACITY>,
}

impl NmeaBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_str(&self) -> &str {
        // the formatter only ever emits ASCII
        core::str::from_utf8(&self.data).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn push(&mut self, byte: u8) {
        let _ = self.data.push(byte);
    }

    fn push_str(&mut self, s: &str) {
        for &b in s.as_bytes() {
            self.push(b);
        }
    }
}

/// Minimal-width unsigned integer
fn push_u32(buf: &mut NmeaBuffer, value: u32) {
    if value >= 10 {
        push_u32(buf, value / 10);
    }
    buf.push(b'0' + (value % 10) as u8);
}

/// Zero-padded fixed-width unsigned integer
fn push_digits(buf: &mut NmeaBuffer, value: u32, width: u32) {
    let mut divisor = 1u32;
    for _ in 1..width {
        divisor *= 10;
    }
    let mut rest = value;
    while divisor > 0 {
        buf.push(b'0' + ((rest / divisor) % 10) as u8);
        rest %= divisor.max(1);
        divisor /= 10;
    }
}

fn push_2digits(buf: &mut NmeaBuffer, value: u8) {
    buf.push(b'0' + value / 10);
    buf.push(b'0' + value % 10);
}

/// Signed value scaled by 100, rendered with exactly two decimals
fn push_2_decimals(buf: &mut NmeaBuffer, mut number: i32) {
    if number < 0 {
        buf.push(b'-');
        number = -number;
    }
    let number = number as u32;
    push_u32(buf, number / 100);
    buf.push(b'.');
    buf.push(b'0' + ((number / 10) % 10) as u8);
    buf.push(b'0' + (number % 10) as u8);
}

/// Signed value scaled by 10, rendered with exactly one decimal
fn push_1_decimal(buf: &mut NmeaBuffer, mut number: i32) {
    if number < 0 {
        buf.push(b'-');
        number = -number;
    }
    let number = number as u32;
    push_u32(buf, number / 10);
    buf.push(b'.');
    buf.push(b'0' + (number % 10) as u8);
}

/// Geographic angle as (D)DDMM.MMMMM plus hemisphere letter.
fn push_angle(buf: &mut NmeaBuffer, angle: f64, degree_digits: u32, pos: u8, neg: u8) {
    let positive = angle > 0.0;
    let angle = if positive { angle } else { -angle };

    let degree = angle as u32;
    push_digits(buf, degree, degree_digits);

    let mut minutes = (angle - degree as f64) * 60.0;
    let min = minutes as u32;
    push_2digits(buf, min as u8);
    buf.push(b'.');

    minutes -= min as f64;
    let frac = (minutes * 100_000.0 + 0.5) as u32;
    push_digits(buf, frac % 100_000, 5);

    buf.push(b',');
    buf.push(if positive { pos } else { neg });
}

fn push_time(buf: &mut NmeaBuffer, c: &GnssCoordinates) {
    push_2digits(buf, c.hour);
    push_2digits(buf, c.minute);
    push_2digits(buf, c.second);
    buf.push_str(".00");
}

/// Close the sentence started at `start`: XOR checksum of everything
/// after the `$`, rendered as two uppercase hex digits, then CR LF.
fn append_tail(buf: &mut NmeaBuffer, start: usize) {
    let mut checksum = 0u8;
    for &byte in &buf.as_bytes()[start + 1..] {
        checksum ^= byte;
    }
    buf.push(b'*');
    buf.push(HEX[(checksum >> 4) as usize]);
    buf.push(HEX[(checksum & 0x0f) as usize]);
    buf.push(b'\r');
    buf.push(b'\n');
}

/// Validate the checksum of one `$...*HH` line (trailing CR LF
/// tolerated).
pub fn nmea_checksum_valid(line: &[u8]) -> bool {
    if line.first() != Some(&b'$') {
        return false;
    }
    let mut checksum = 0u8;
    let mut index = 1;
    while index < line.len() && line[index] != b'*' {
        checksum ^= line[index];
        index += 1;
    }
    if index + 2 >= line.len() {
        return false;
    }
    let valid = line[index + 1] == HEX[(checksum >> 4) as usize]
        && line[index + 2] == HEX[(checksum & 0x0f) as usize];
    let rest = &line[index + 3..];
    valid && (rest.is_empty() || rest == b"\r\n")
}

/// Time, position, groundspeed and track: `$GPRMC`.
pub fn format_rmc(c: &GnssCoordinates, buf: &mut NmeaBuffer) {
    let start = buf.len();
    buf.push_str("$GPRMC,");
    push_time(buf, c);
    buf.push(b',');
    buf.push(if c.sat_fix_type != 0 { b'A' } else { b'V' });
    buf.push(b',');

    push_angle(buf, c.latitude, 2, b'N', b'S');
    buf.push(b',');
    push_angle(buf, c.longitude, 3, b'E', b'W');
    buf.push(b',');

    // groundspeed, tenths of knots
    let knots = (c.speed_motion * MPS_TO_KNOTS * 10.0 + 0.5) as u32;
    push_digits(buf, knots, 4);
    buf.push_str(".0,");

    // true track, tenths of degrees
    let mut true_track = c.heading_motion;
    if true_track < 0.0 {
        true_track += TWO_PI;
    }
    let track = (true_track * RAD_TO_DEGREE_10 + 0.5) as u32;
    push_digits(buf, track, 4);
    buf.push_str(".0,");

    push_2digits(buf, c.day);
    push_2digits(buf, c.month);
    push_2digits(buf, (c.year % 100) as u8);
    buf.push_str(",,,A");

    append_tail(buf, start);
}

/// Position, satellite count and geoid separation: `$GPGGA`.
pub fn format_gga(c: &GnssCoordinates, buf: &mut NmeaBuffer) {
    let start = buf.len();
    buf.push_str("$GPGGA,");
    push_time(buf, c);
    buf.push(b',');

    push_angle(buf, c.latitude, 2, b'N', b'S');
    buf.push(b',');
    push_angle(buf, c.longitude, 3, b'E', b'W');
    buf.push(b',');

    // fix quality: this sentence is only assembled with a receiver
    // attached, so it always reports a standard GPS fix
    buf.push(b'1');
    buf.push(b',');

    push_2digits(buf, c.sats_number);
    buf.push_str(",0.0,");

    let altitude_msl_dm = (c.position_down * -10.0) as u32;
    push_digits(buf, altitude_msl_dm / 10, 4);
    buf.push(b'.');
    buf.push(b'0' + (altitude_msl_dm % 10) as u8);
    buf.push_str(",M,");

    let mut geo_sep = c.geo_sep_dm;
    if geo_sep < 0 {
        geo_sep = -geo_sep;
        buf.push(b'-');
    }
    let geo_sep = geo_sep as u32;
    push_digits(buf, geo_sep / 10, 3);
    buf.push(b'.');
    buf.push(b'0' + (geo_sep % 10) as u8);
    buf.push_str(",m,,");

    append_tail(buf, start);
}

/// Wind report: `$GPMWV`, direction the wind comes from, true.
pub fn format_mwv(wind_north: f32, wind_east: f32, buf: &mut NmeaBuffer) {
    let start = buf.len();
    buf.push_str("$GPMWV,");

    let direction = atan2f(-wind_east, -wind_north);
    let mut angle_10 = (direction * RAD_TO_DEGREE_10 + 0.5) as i32;
    if angle_10 < 0 {
        angle_10 += 3600;
    }
    let angle_10 = angle_10 as u32;
    push_digits(buf, angle_10 / 10, 3);
    buf.push(b'.');
    buf.push(b'0' + (angle_10 % 10) as u8);
    buf.push_str(",T,");

    let speed_10 = (sqrtf(wind_north * wind_north + wind_east * wind_east) * 10.0) as u32;
    push_digits(buf, speed_10 / 10, 3);
    buf.push(b'.');
    buf.push(b'0' + (speed_10 % 10) as u8);
    buf.push_str(",M,A");

    append_tail(buf, start);
}

/// OpenVario record: TEK vario, pressures, TAS, supply voltage and the
/// optional outside-air block.
#[allow(clippy::too_many_arguments)]
pub fn format_pov(
    tas: f32,
    static_pressure: f32,
    pitot_pressure: f32,
    tek_vario: f32,
    voltage: f32,
    airdata_available: bool,
    humidity_percent: f32,
    temperature: f32,
    buf: &mut NmeaBuffer,
) {
    let start = buf.len();
    buf.push_str("$POV,E,");
    push_2_decimals(buf, (tek_vario * 100.0) as i32);

    buf.push_str(",P,");
    push_2_decimals(buf, static_pressure as i32);

    let pitot = if pitot_pressure < 0.0 {
        0.0
    } else {
        pitot_pressure
    };
    buf.push_str(",R,");
    push_2_decimals(buf, pitot as i32);

    buf.push_str(",S,");
    push_2_decimals(buf, (tas * 360.0) as i32); // m/s -> 1/100 km/h

    buf.push_str(",V,");
    push_1_decimal(buf, (voltage * 10.0) as i32);

    if airdata_available {
        buf.push_str(",H,");
        push_2_decimals(buf, (humidity_percent * 100.0) as i32);
        buf.push_str(",T,");
        push_2_decimals(buf, (temperature * 100.0) as i32);
    }

    append_tail(buf, start);
}

/// OpenVario attitude record: bank, nick and yaw in tenths of degrees
/// (`B` because `R` already reports the pitot pressure).
pub fn format_pov_attitude(roll: f32, nick: f32, yaw: f32, buf: &mut NmeaBuffer) {
    let start = buf.len();
    buf.push_str("$POV,B,");
    push_1_decimal(buf, (roll * RAD_TO_DEGREE_10 + 0.5) as i32);

    buf.push_str(",N,");
    push_1_decimal(buf, (nick * RAD_TO_DEGREE_10 + 0.5) as i32);

    let mut yaw = yaw;
    if yaw < 0.0 {
        yaw += TWO_PI;
    }
    buf.push_str(",Y,");
    push_1_decimal(buf, (yaw * RAD_TO_DEGREE_10 + 0.5) as i32);

    append_tail(buf, start);
}

/// True heading report: `$HCHDT`.
pub fn format_hchdt(true_heading: f32, buf: &mut NmeaBuffer) {
    let start = buf.len();

    // wrap into [0, 2 pi) first so a slightly negative heading reports
    // just below 360 degrees
    let mut heading = true_heading;
    if heading < 0.0 {
        heading += TWO_PI;
    }
    let heading_10 = (heading * 573.0) as i32;

    buf.push_str("$HCHDT,");
    push_1_decimal(buf, heading_10);
    buf.push_str(",T");

    append_tail(buf, start);
}

/// The complete reporting set for one snapshot.
pub fn format_nmea_sentences(output: &OutputData, buf: &mut NmeaBuffer) {
    format_rmc(&output.coordinates, buf);
    format_gga(&output.coordinates, buf);
    format_mwv(
        output.wind_average.north(),
        output.wind_average.east(),
        buf,
    );
    format_pov(
        output.tas,
        output.static_pressure,
        output.pitot_pressure,
        output.vario,
        output.supply_voltage,
        output.humidity > 0.0,
        output.humidity * 100.0,
        output.temperature,
        buf,
    );
    format_pov_attitude(output.roll, output.nick, output.yaw, buf);
    format_hchdt(output.yaw, buf);
}
