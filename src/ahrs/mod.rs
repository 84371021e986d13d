//! Attitude and heading reference system
//!
//! A quaternion complementary filter at the IMU rate. The gyro
//! propagates the attitude; gravity direction, GNSS acceleration and a
//! heading observation (dual-antenna GNSS, magnetometer, or none) pull
//! the long-term errors out through a P correction plus a slowly
//! integrating I channel. A circling classifier gates which corrections
//! are trusted in which flight phase and drives the in-flight
//! magnetometer calibration of [`crate::magcal`].

mod circling;

pub use circling::{CircleState, CirclingDetector};

use crate::config::{ConfigError, NavConfig};
use crate::filters::LowPass;
use crate::magcal::store::{
    decode_calibration, encode_calibration, CalibrationStore, StoreError, BLOB_LEN,
};
use crate::magcal::{
    CommitSource, CompassCalibration, EarthInductionCollector, MagCalibrationCollector,
    MagneticInductionReport,
};
use crate::math::{wrap_pi, Attitude, BodyFrame, Mat3, NavFrame, Vec3};
use crate::{log_info, log_warn};
use libm::{atan2f, cosf, fabsf, sinf, sqrtf};
use nalgebra::Quaternion;

/// Floor for the squared horizontal induction component when deriving
/// the magnetic loop gain (the field is nearly vertical at the poles).
const MIN_HORIZONTAL_INDUCTION_SQ: f32 = 0.01;

/// Straight-flight boost of the acceleration cross correction when no
/// heading observation is available at all.
const ACC_ONLY_STRAIGHT_BOOST: f32 = 40.0;

/// One IMU tick worth of AHRS input.
///
/// Units: rad/s, m/s^2, normalized induction, m/s^2, rad.
#[derive(Debug, Clone, Copy)]
pub struct AhrsMeasurement {
    /// Body turn rates
    pub gyro: Vec3,
    /// Body specific force
    pub acc: Vec3,
    /// Raw magnetometer reading
    pub mag: Vec3,
    /// GNSS acceleration in the navigation frame
    pub gnss_acceleration: Vec3,
    /// Dual-antenna true heading, when the GNSS solution carries one
    pub gnss_heading: Option<f32>,
}

/// Fatal construction failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    Config(ConfigError),
    Calibration(StoreError),
}

impl BootError {
    pub fn as_str(&self) -> &'static str {
        match self {
            BootError::Config(e) => e.as_str(),
            BootError::Calibration(e) => e.as_str(),
        }
    }
}

impl From<ConfigError> for BootError {
    fn from(e: ConfigError) -> Self {
        BootError::Config(e)
    }
}

impl From<StoreError> for BootError {
    fn from(e: StoreError) -> Self {
        BootError::Calibration(e)
    }
}

/// The attitude estimator.
///
/// Generic over the calibration persistence capability so tests inject
/// an in-memory store.
pub struct AhrsEngine<S: CalibrationStore> {
    config: NavConfig,
    ts_div_2: f32,
    antenna_down_correction: f32,
    antenna_right_correction: f32,

    attitude: Attitude,
    body2nav: Mat3,
    euler_roll: f32,
    euler_nick: f32,
    euler_yaw: f32,
    initialized: bool,

    acceleration_nav: Vec3,
    induction_nav: Vec3,
    expected_nav_induction: Vec3,
    magnetic_control_gain: f32,

    gyro_integrator: Vec3,
    nav_correction: Vec3,

    circling: CirclingDetector,
    slip_angle_averager: LowPass,
    nick_angle_averager: LowPass,
    turn_rate_averager: LowPass,
    g_load_averager: LowPass,

    heading_difference: f32,
    magnetic_disturbance: f32,

    compass_calibration: CompassCalibration,
    mag_collector: MagCalibrationCollector,
    earth_collector: EarthInductionCollector,
    report: Option<MagneticInductionReport>,

    store: S,
}

impl<S: CalibrationStore> AhrsEngine<S> {
    /// Construct the engine: validate the configuration and load the
    /// persisted magnetometer calibration.
    ///
    /// A store that has never been written is fine (the unit starts
    /// uncalibrated); a store that fails to read or holds a corrupt
    /// blob refuses to boot.
    pub fn new(config: NavConfig, mut store: S) -> Result<Self, BootError> {
        config.validate()?;

        let mut buf = [0u8; BLOB_LEN];
        let len = store.load(&mut buf)?;
        let compass_calibration = if len == 0 {
            CompassCalibration::default()
        } else {
            let (bias, scale) = decode_calibration(&buf[..len])?;
            CompassCalibration::from_persisted(bias, scale)
        };

        let inclination = config.inclination;
        let declination = config.declination;
        let expected_nav_induction = Vec3::new(
            cosf(inclination),
            cosf(inclination) * sinf(declination),
            sinf(inclination),
        );

        let mut engine = Self {
            ts_div_2: config.sample_time / 2.0,
            antenna_down_correction: config.ant_slave_down / config.ant_baselength,
            antenna_right_correction: config.ant_slave_right / config.ant_baselength,
            attitude: Attitude::default(),
            body2nav: Mat3::identity(),
            euler_roll: 0.0,
            euler_nick: 0.0,
            euler_yaw: 0.0,
            initialized: false,
            acceleration_nav: Vec3::zeros(),
            induction_nav: Vec3::zeros(),
            expected_nav_induction,
            magnetic_control_gain: 0.0,
            gyro_integrator: Vec3::zeros(),
            nav_correction: Vec3::zeros(),
            circling: CirclingDetector::new(
                config.high_turn_rate,
                config.low_turn_rate,
                config.circle_limit,
            ),
            slip_angle_averager: LowPass::new(config.angle_f_by_fs),
            nick_angle_averager: LowPass::new(config.angle_f_by_fs),
            turn_rate_averager: LowPass::new(config.angle_f_by_fs),
            g_load_averager: LowPass::new(config.g_load_f_by_fs),
            heading_difference: 0.0,
            magnetic_disturbance: 0.0,
            compass_calibration,
            mag_collector: MagCalibrationCollector::new(),
            earth_collector: EarthInductionCollector::new(),
            report: None,
            store,
            config,
        };
        engine.update_magnetic_loop_gain();
        Ok(engine)
    }

    /// Initial attitude from the first accelerometer and magnetometer
    /// sample: down from gravity, north from the induction (deviation
    /// neglected here), east completes the triad.
    pub fn attitude_setup(&mut self, acceleration: Vec3, mag: Vec3) {
        let induction = if self.compass_calibration.is_done() {
            self.compass_calibration.calibrate(mag)
        } else {
            mag
        };

        let down = (-acceleration).normalize();
        let mut north = induction.normalize();
        let east = down.cross(&north).normalize();
        north = east.cross(&down).normalize();

        self.attitude = Attitude::from_axes(north, east, down);
        self.body2nav = self.attitude.rotation_matrix();
        let (roll, nick, yaw) = self.attitude.euler_angles();
        self.euler_roll = roll;
        self.euler_nick = nick;
        self.euler_yaw = yaw;
        self.initialized = true;
    }

    /// One AHRS tick. Picks the dual-antenna GNSS compass when the
    /// measurement carries a heading, the magnetometer compass
    /// otherwise.
    pub fn update(&mut self, m: &AhrsMeasurement) {
        if !self.initialized {
            self.attitude_setup(m.acc, m.mag);
        }
        match m.gnss_heading {
            Some(heading) => self.update_diff_gnss(m, heading),
            None => self.update_compass(m),
        }
    }

    /// One AHRS tick without any heading observation (startup, or the
    /// magnetometer is unusable): gravity leveling plus the
    /// acceleration cross product only.
    pub fn update_acc_only(&mut self, m: &AhrsMeasurement) {
        if !self.initialized {
            self.attitude_setup(m.acc, m.mag);
        }

        let nav_acceleration = self.body2nav * m.acc;

        self.nav_correction.x = -nav_acceleration.east() + m.gnss_acceleration.east();
        self.nav_correction.y = nav_acceleration.north() - m.gnss_acceleration.north();

        self.circling.update(fabsf(self.turn_rate_averager.output()));

        let mut cross_correction = nav_acceleration.north() * m.gnss_acceleration.east()
            - nav_acceleration.east() * m.gnss_acceleration.north();

        if self.circling.state() == CircleState::StraightFlight {
            // empirically tuned, OM flight 2022-07-24
            cross_correction *= ACC_ONLY_STRAIGHT_BOOST;
        }

        self.nav_correction.z = cross_correction * self.config.cross_gain;
        let mut gyro_correction =
            self.body2nav.transpose() * self.nav_correction * self.config.p_gain;

        self.gyro_integrator += gyro_correction;
        gyro_correction += self.gyro_integrator * self.config.i_gain;

        self.update_attitude(m.acc, m.gyro + gyro_correction, m.mag);
    }

    /// Dual-antenna GNSS compass update.
    fn update_diff_gnss(&mut self, m: &AhrsMeasurement, gnss_heading: f32) {
        let old_state = self.circling.state();
        let circling_state = self
            .circling
            .update(fabsf(self.turn_rate_averager.output()));

        let mag = if self.compass_calibration.is_done() {
            self.compass_calibration.calibrate(m.mag)
        } else {
            m.mag
        };

        let nav_acceleration = self.body2nav * m.acc;
        let nav_induction = self.body2nav * mag;

        // correct the baseline vector for antenna misalignment, then
        // reference against the present yaw
        let heading_difference = wrap_pi(
            gnss_heading + self.antenna_down_correction * sinf(self.euler_roll)
                - self.antenna_right_correction * cosf(self.euler_roll)
                - self.euler_yaw,
        );
        self.heading_difference = heading_difference;

        self.nav_correction.x = -nav_acceleration.east() + m.gnss_acceleration.east();
        self.nav_correction.y = nav_acceleration.north() - m.gnss_acceleration.north();

        if circling_state == CircleState::Circling {
            let cross_correction = nav_acceleration.north() * m.gnss_acceleration.east()
                - nav_acceleration.east() * m.gnss_acceleration.north();
            let mag_correction = nav_induction.north() * self.expected_nav_induction.east()
                - nav_induction.east() * self.expected_nav_induction.north();
            self.nav_correction.z = cross_correction * self.config.cross_gain
                + mag_correction * self.magnetic_control_gain;
        } else {
            self.nav_correction.z = heading_difference * self.config.h_gain;
        }

        let mut gyro_correction =
            self.body2nav.transpose() * self.nav_correction * self.config.p_gain;

        // maneuvering corrupts the integrator, feed it in calm flight only
        if circling_state == CircleState::StraightFlight {
            self.gyro_integrator += gyro_correction;
        }
        gyro_correction += self.gyro_integrator * self.config.i_gain;

        self.update_attitude(m.acc, m.gyro + gyro_correction, mag);

        if circling_state == CircleState::Circling
            && self.nav_correction.norm() < self.config.nav_correction_limit
        {
            self.feed_magnetic_induction_observer(m.mag);
        }

        if self.config.mag_auto_calib
            && old_state == CircleState::Circling
            && circling_state == CircleState::Transition
        {
            self.handle_magnetic_calibration(CommitSource::DgnssCompass);
        }
    }

    /// Magnetometer compass update.
    fn update_compass(&mut self, m: &AhrsMeasurement) {
        let mag = if self.compass_calibration.is_done() {
            self.compass_calibration.calibrate(m.mag)
        } else {
            m.mag
        };

        let nav_acceleration = self.body2nav * m.acc;
        let nav_induction = self.body2nav * mag;

        self.nav_correction.x = -nav_acceleration.east() + m.gnss_acceleration.east();
        self.nav_correction.y = nav_acceleration.north() - m.gnss_acceleration.north();

        let old_state = self.circling.state();
        let circling_state = self
            .circling
            .update(fabsf(self.turn_rate_averager.output()));

        let mag_correction = nav_induction.north() * self.expected_nav_induction.east()
            - nav_induction.east() * self.expected_nav_induction.north();

        let mut gyro_correction;
        match circling_state {
            CircleState::StraightFlight | CircleState::Transition => {
                self.nav_correction.z = self.magnetic_control_gain * mag_correction;
                gyro_correction =
                    self.body2nav.transpose() * self.nav_correction * self.config.p_gain;
                self.gyro_integrator += gyro_correction;
            }
            CircleState::Circling => {
                let cross_correction = nav_acceleration.north() * m.gnss_acceleration.east()
                    - nav_acceleration.east() * m.gnss_acceleration.north();
                self.nav_correction.z = cross_correction * self.config.cross_gain
                    + mag_correction * self.config.m_h_gain;
                gyro_correction =
                    self.body2nav.transpose() * self.nav_correction * self.config.p_gain;
            }
        }

        gyro_correction += self.gyro_integrator * self.config.i_gain;

        self.update_attitude(m.acc, m.gyro + gyro_correction, mag);

        if circling_state == CircleState::Circling
            && self.nav_correction.norm() < self.config.nav_correction_limit
        {
            self.feed_magnetic_induction_observer(m.mag);
        }

        if self.config.mag_auto_calib
            && old_state == CircleState::Circling
            && circling_state == CircleState::Transition
        {
            self.handle_magnetic_calibration(CommitSource::MagCompass);
        }
    }

    /// Shared attitude-advance tail: propagate the quaternion with the
    /// corrected rates, recompute every derived observable.
    fn update_attitude(&mut self, acc: Vec3, gyro: Vec3, mag: Vec3) {
        self.attitude.rotate(
            gyro.x * self.ts_div_2,
            gyro.y * self.ts_div_2,
            gyro.z * self.ts_div_2,
        );

        self.body2nav = self.attitude.rotation_matrix();
        self.acceleration_nav = self.body2nav * acc;
        self.induction_nav = self.body2nav * mag;
        let (roll, nick, yaw) = self.attitude.euler_angles();
        self.euler_roll = roll;
        self.euler_nick = nick;
        self.euler_yaw = yaw;

        let nav_rotation = self.body2nav * gyro;
        self.turn_rate_averager.respond(nav_rotation.down());

        self.slip_angle_averager
            .respond(atan2f(-acc.right(), -acc.down()));
        self.nick_angle_averager
            .respond(atan2f(acc.front(), -acc.down()));
        self.g_load_averager.respond(acc.norm());

        self.magnetic_disturbance = (self.induction_nav - self.expected_nav_induction).norm();
    }

    /// Collect calibration data: expected body induction against the raw
    /// sensor, and the nav-frame induction for the Earth-field
    /// estimator. Only called in quiescent circling.
    fn feed_magnetic_induction_observer(&mut self, mag_sensor: Vec3) {
        let right_turn = self.turn_rate_averager.output() > 0.0;
        let expected_body = self.body2nav.transpose() * self.expected_nav_induction;
        self.mag_collector
            .feed(expected_body, mag_sensor, self.config.mag_scale, right_turn);
        self.earth_collector.feed(self.induction_nav, right_turn);
    }

    /// Commit on leaving circling: fit the regression bank of the turn
    /// direction that just ended, install if improved, optionally adopt
    /// the observed Earth field, persist and report.
    fn handle_magnetic_calibration(&mut self, source: CommitSource) {
        let right_turn = self.turn_rate_averager.output() > 0.0;

        let mut calibration_changed = match self.mag_collector.fit(right_turn) {
            Some(fits) => self
                .compass_calibration
                .set_calibration_if_improved(&fits, self.config.mag_scale),
            None => false,
        };

        let mut induction_error = 0.0;
        if self.earth_collector.data_valid() {
            induction_error = sqrtf(self.earth_collector.variance());

            if self.config.mag_earth_auto
                && induction_error < self.config.induction_std_deviation_limit
            {
                self.expected_nav_induction = self.earth_collector.estimated_induction().normalize();
                self.update_magnetic_loop_gain();
                calibration_changed = true;
            }
            self.earth_collector.reset();
        }
        self.mag_collector.reset();

        if calibration_changed {
            let (bias, scale) = self.compass_calibration.coefficients();
            let blob = encode_calibration(bias, scale);
            if let Err(_e) = self.store.save(&blob) {
                log_warn!("magnetic calibration store failed: {=str}", _e.as_str());
            }
            log_info!("magnetic calibration updated");

            self.report = Some(MagneticInductionReport {
                calibration: *self.compass_calibration.axes(),
                nav_induction: self.expected_nav_induction,
                nav_induction_std_deviation: induction_error,
                source,
            });
        }
    }

    /// The magnetic heading error scales with the horizontal field
    /// component; normalize the loop gain so the correction has the same
    /// authority at any inclination.
    fn update_magnetic_loop_gain(&mut self) {
        let horizontal_sq = self.expected_nav_induction.north() * self.expected_nav_induction.north()
            + self.expected_nav_induction.east() * self.expected_nav_induction.east();
        self.magnetic_control_gain =
            self.config.m_h_gain / horizontal_sq.max(MIN_HORIZONTAL_INDUCTION_SQ);
    }

    // observables

    /// Attitude quaternion, scalar-first, unit norm.
    pub fn quaternion(&self) -> Quaternion<f32> {
        self.attitude.quaternion()
    }

    /// (roll, nick, yaw) in radians, ZYX convention.
    pub fn euler_angles(&self) -> (f32, f32, f32) {
        (self.euler_roll, self.euler_nick, self.euler_yaw)
    }

    /// Body-to-nav rotation matrix, recomputed every tick.
    pub fn body_to_nav(&self) -> &Mat3 {
        &self.body2nav
    }

    /// Unit navigation-frame forward vector (body front in nav).
    pub fn heading_vector(&self) -> Vec3 {
        self.body2nav * Vec3::new(1.0, 0.0, 0.0)
    }

    pub fn acceleration_nav(&self) -> Vec3 {
        self.acceleration_nav
    }

    pub fn induction_nav(&self) -> Vec3 {
        self.induction_nav
    }

    pub fn expected_induction(&self) -> Vec3 {
        self.expected_nav_induction
    }

    /// Filtered yaw turn rate, rad/s, positive turning right.
    pub fn turn_rate(&self) -> f32 {
        self.turn_rate_averager.output()
    }

    /// Filtered slip angle, rad.
    pub fn slip_angle(&self) -> f32 {
        self.slip_angle_averager.output()
    }

    /// Filtered pitch-from-acceleration angle, rad.
    pub fn nick_angle(&self) -> f32 {
        self.nick_angle_averager.output()
    }

    /// Filtered load factor, m/s^2.
    pub fn g_load(&self) -> f32 {
        self.g_load_averager.output()
    }

    pub fn circle_state(&self) -> CircleState {
        self.circling.state()
    }

    /// Last D-GNSS minus AHRS heading difference, rad.
    pub fn heading_difference(&self) -> f32 {
        self.heading_difference
    }

    /// Norm of (observed - expected) nav-frame induction.
    pub fn magnetic_disturbance(&self) -> f32 {
        self.magnetic_disturbance
    }

    /// Gyro integrator (I channel), exposed for monitoring.
    pub fn gyro_integrator(&self) -> Vec3 {
        self.gyro_integrator
    }

    pub fn compass_calibration(&self) -> &CompassCalibration {
        &self.compass_calibration
    }

    /// Fetch and clear the pending calibration-change report. Returns
    /// `Some` exactly once per commit that changed anything.
    pub fn take_calibration_report(&mut self) -> Option<MagneticInductionReport> {
        self.report.take()
    }
}
