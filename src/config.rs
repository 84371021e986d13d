//! Engine configuration
//!
//! All tuning parameters are loaded once at construction; defaults carry
//! the production tuning. Invalid combinations (a zero antenna baseline,
//! a non-positive sample time) are rejected at boot, the unit never
//! flies on a half-read configuration.

/// Configuration validation failures, fatal at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Antenna baseline must be positive to normalize the slave offsets
    InvalidAntennaGeometry,
    /// Sample time must be positive
    InvalidSampleTime,
    /// Filter gains must be non-negative
    InvalidGain,
    /// Turn-rate hysteresis band must satisfy 0 < low < high
    InvalidTurnRateBand,
}

impl ConfigError {
    /// Variant name as a static string (usable with defmt on embedded)
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigError::InvalidAntennaGeometry => "InvalidAntennaGeometry",
            ConfigError::InvalidSampleTime => "InvalidSampleTime",
            ConfigError::InvalidGain => "InvalidGain",
            ConfigError::InvalidTurnRateBand => "InvalidTurnRateBand",
        }
    }
}

/// Navigation engine configuration.
#[derive(Debug, Clone, Copy)]
pub struct NavConfig {
    /// IMU sample time, seconds (100 Hz tick)
    pub sample_time: f32,

    /// Magnetic inclination of the configured location, radians
    pub inclination: f32,
    /// Magnetic declination of the configured location, radians
    pub declination: f32,

    /// Down offset of the slave GNSS antenna, meters
    pub ant_slave_down: f32,
    /// Right offset of the slave GNSS antenna, meters
    pub ant_slave_right: f32,
    /// Distance between the GNSS antennas, meters
    pub ant_baselength: f32,

    /// Enable automatic magnetometer calibration
    pub mag_auto_calib: bool,
    /// Enable automatic Earth-field parameter estimation
    pub mag_earth_auto: bool,

    /// Attitude loop proportional gain
    pub p_gain: f32,
    /// Attitude loop integral gain
    pub i_gain: f32,
    /// Dual-GNSS heading gain
    pub h_gain: f32,
    /// Magnetic heading gain while circling
    pub m_h_gain: f32,
    /// Acceleration cross-product gain
    pub cross_gain: f32,

    /// Turn rate above which the circling counter rises, rad/s
    pub high_turn_rate: f32,
    /// Turn rate below which the circling counter falls, rad/s
    pub low_turn_rate: f32,
    /// Counter ceiling: ticks of sustained turning until CIRCLING
    pub circle_limit: u32,
    /// Attitude-loop quiescence bound for calibration feeding
    pub nav_correction_limit: f32,
    /// Earth-field estimate acceptance bound (standard deviation)
    pub induction_std_deviation_limit: f32,

    /// Cutoff-to-sample-rate ratio of the angle averagers
    pub angle_f_by_fs: f32,
    /// Cutoff-to-sample-rate ratio of the G-load averager
    pub g_load_f_by_fs: f32,

    /// Sensor units per unit Earth induction
    pub mag_scale: f32,
    /// Weight of the vertical channel in the energy computations
    pub vertical_energy_tuning_factor: f32,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            sample_time: 0.01,
            inclination: 67.0_f32.to_radians(),
            declination: 3.0_f32.to_radians(),
            ant_slave_down: 0.0,
            ant_slave_right: 0.0,
            ant_baselength: 1.0,
            mag_auto_calib: true,
            mag_earth_auto: false,
            p_gain: 0.03,
            i_gain: 6.0e-5,
            h_gain: 38.0,
            m_h_gain: 10.0,
            cross_gain: 0.05,
            high_turn_rate: 0.15,
            low_turn_rate: 0.0707,
            circle_limit: 300,
            nav_correction_limit: 5.0,
            induction_std_deviation_limit: 0.1,
            angle_f_by_fs: 0.02,
            g_load_f_by_fs: 0.04,
            mag_scale: 10_000.0,
            vertical_energy_tuning_factor: 1.0,
        }
    }
}

impl NavConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.ant_baselength > 0.0) {
            return Err(ConfigError::InvalidAntennaGeometry);
        }
        if !(self.sample_time > 0.0) {
            return Err(ConfigError::InvalidSampleTime);
        }
        if self.p_gain < 0.0 || self.i_gain < 0.0 || self.h_gain < 0.0 || self.cross_gain < 0.0 {
            return Err(ConfigError::InvalidGain);
        }
        if !(self.low_turn_rate > 0.0) || !(self.high_turn_rate > self.low_turn_rate) {
            return Err(ConfigError::InvalidTurnRateBand);
        }
        Ok(())
    }
}
