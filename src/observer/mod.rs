//! Flight observer: variometer, speed compensation and wind
//!
//! Runs once per IMU tick behind the AHRS. Two vertical Kalman filters
//! (barometric and GNSS) estimate the uncompensated climb rate, three
//! independent speed-compensation computations remove the pseudo-climb
//! of airspeed changes, and their blend yields the total-energy
//! variometer. The instantaneous wind falls out of the difference
//! between GNSS velocity and the air-relative velocity along the
//! heading vector.

use crate::ahrs::CircleState;
use crate::filters::{Decimator, Differentiator, HpLpFusion, LowPass};
use crate::kalman::{KalmanVAOffset, KalmanVarioPva, GNSS_VARIO_NOISE, PRESSURE_VARIO_NOISE};
use crate::math::{NavFrame, Vec3};
use bitflags::bitflags;

/// 1 / (2 * 9.81)
const ONE_DIV_BY_GRAVITY_TIMES_2: f32 = 0.0509684;

/// Reciprocal gravity as tuned in flight
const RECIP_GRAVITY: f32 = 0.1094;

/// Wind decimation 100 Hz -> 10 Hz
const WIND_DECIMATION_RATIO: u32 = 10;

/// Averager gain of the variometer displays
const VARIO_F_BY_FS: f32 = 0.03;

/// Blender gain of the speed-compensation fusion
const SPEED_COMP_F_BY_FS: f32 = 0.005;

bitflags! {
    /// GNSS receiver status forwarded to the observer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GnssStatus: u8 {
        /// A navigation fix is available
        const FIX = 0b0000_0001;
        /// The dual-antenna heading is valid
        const HEADING = 0b0000_0010;
    }
}

/// One tick worth of flight-observer input.
#[derive(Debug, Clone, Copy)]
pub struct ObserverInput {
    /// GNSS velocity, NED, m/s
    pub gnss_velocity: Vec3,
    /// GNSS acceleration, NED, m/s^2 (carried through to the output
    /// snapshot, the estimation itself runs on the AHRS acceleration)
    pub gnss_acceleration: Vec3,
    /// AHRS navigation-frame acceleration, m/s^2
    pub ahrs_acceleration: Vec3,
    /// Unit navigation-frame forward vector from the AHRS
    pub heading_vector: Vec3,
    /// GNSS altitude in the down coordinate (negative altitude), m
    pub gnss_negative_altitude: f32,
    /// Barometric altitude in the down coordinate (negative altitude), m
    pub pressure_altitude: f32,
    /// True airspeed, m/s
    pub tas: f32,
    /// Indicated airspeed, m/s
    pub ias: f32,
    /// Circling classification from the AHRS (carried through to the
    /// output snapshot)
    pub circle_state: CircleState,
    /// Slow wind average maintained by the host, NED, m/s
    pub wind_average: Vec3,
    /// GNSS receiver status
    pub gnss_status: GnssStatus,
}

/// Kalman-filter driven flight observer.
#[derive(Debug, Clone)]
pub struct FlightObserver {
    kalman_vario_pressure: KalmanVarioPva,
    kalman_vario_gnss: KalmanVarioPva,
    kalman_v_a_north: KalmanVAOffset,
    kalman_v_a_east: KalmanVAOffset,

    kinetic_energy_differentiator: Differentiator,
    specific_energy_differentiator: Differentiator,
    windspeed_decimator: Decimator,
    speed_compensation_fusioner: HpLpFusion,
    vario_averager_pressure: LowPass,
    vario_averager_gnss: LowPass,

    vertical_energy_tuning_factor: f32,

    vario_uncompensated_pressure: f32,
    vario_uncompensated_gnss: f32,
    speed_compensation_ias: f32,
    speed_compensation_ins_gnss_1: f32,
    speed_compensation_kalman_2: f32,
    speed_compensation_energy_3: f32,
    speed_compensation_gnss: f32,
    specific_energy: f32,
}

impl FlightObserver {
    pub fn new(sample_time: f32, vertical_energy_tuning_factor: f32) -> Self {
        Self {
            kalman_vario_pressure: KalmanVarioPva::new(sample_time, PRESSURE_VARIO_NOISE),
            kalman_vario_gnss: KalmanVarioPva::new(sample_time, GNSS_VARIO_NOISE),
            kalman_v_a_north: KalmanVAOffset::new(sample_time),
            kalman_v_a_east: KalmanVAOffset::new(sample_time),
            kinetic_energy_differentiator: Differentiator::new(1.0 / sample_time),
            specific_energy_differentiator: Differentiator::new(1.0 / sample_time),
            windspeed_decimator: Decimator::new(WIND_DECIMATION_RATIO),
            speed_compensation_fusioner: HpLpFusion::new(SPEED_COMP_F_BY_FS),
            vario_averager_pressure: LowPass::new(VARIO_F_BY_FS),
            vario_averager_gnss: LowPass::new(VARIO_F_BY_FS),
            vertical_energy_tuning_factor,
            vario_uncompensated_pressure: 0.0,
            vario_uncompensated_gnss: 0.0,
            speed_compensation_ias: 0.0,
            speed_compensation_ins_gnss_1: 0.0,
            speed_compensation_kalman_2: 0.0,
            speed_compensation_energy_3: 0.0,
            speed_compensation_gnss: 0.0,
            specific_energy: 0.0,
        }
    }

    /// Re-seed both vertical filters at known altitudes (boot, or after
    /// a long sensor outage).
    pub fn reset(&mut self, pressure_negative_altitude: f32, gnss_negative_altitude: f32) {
        self.kalman_vario_pressure
            .reset(pressure_negative_altitude, -9.81);
        self.kalman_vario_gnss.reset(gnss_negative_altitude, -9.81);
    }

    /// One observer tick at the IMU rate.
    pub fn update(&mut self, input: &ObserverInput) {
        self.vario_uncompensated_pressure = self
            .kalman_vario_pressure
            .update(input.pressure_altitude, input.ahrs_acceleration.down());

        // kinetic-energy rate from the airspeed sensor
        self.speed_compensation_ias = self
            .kinetic_energy_differentiator
            .respond(input.ias * input.ias * ONE_DIV_BY_GRAVITY_TIMES_2);

        // positive on positive total-energy gain
        self.vario_averager_pressure
            .respond(self.speed_compensation_ias - self.vario_uncompensated_pressure);

        if !input.gnss_status.contains(GnssStatus::FIX) {
            // no fix: maintain the GNSS outputs with pressure data
            self.vario_uncompensated_gnss = self.vario_uncompensated_pressure;
            self.speed_compensation_gnss = self.speed_compensation_ias;
            self.vario_averager_gnss
                .respond(self.speed_compensation_ias - self.vario_uncompensated_pressure);
            return;
        }

        // 100 Hz -> 10 Hz instantaneous wind
        let air_velocity = input.heading_vector * input.tas;
        self.windspeed_decimator
            .respond(input.gnss_velocity - air_velocity);

        // the NED-frame Kalman vario reports negative while climbing
        self.vario_uncompensated_gnss = -self.kalman_vario_gnss.update_with_velocity(
            input.gnss_negative_altitude,
            input.gnss_velocity.down(),
            input.ahrs_acceleration.down(),
        );

        // speed compensation 1: INS acceleration dot air velocity
        let mut air_velocity = input.gnss_velocity - input.wind_average;
        air_velocity.z = self.kalman_vario_gnss.vario();
        let mut acceleration = input.ahrs_acceleration;
        acceleration.z = self.kalman_vario_gnss.acceleration_observed();
        self.speed_compensation_ins_gnss_1 = air_velocity.dot(&acceleration) * RECIP_GRAVITY;

        // horizontal filters run in the air (not ground) system
        self.kalman_v_a_north.update(
            input.gnss_velocity.north() - input.wind_average.north(),
            input.ahrs_acceleration.north(),
        );
        self.kalman_v_a_east.update(
            input.gnss_velocity.east() - input.wind_average.east(),
            input.ahrs_acceleration.east(),
        );

        // speed compensation 2: filtered velocity dot filtered acceleration
        self.speed_compensation_kalman_2 = (self.kalman_v_a_north.velocity()
            * self.kalman_v_a_north.acceleration()
            + self.kalman_v_a_east.velocity() * self.kalman_v_a_east.acceleration()
            + self.kalman_vario_gnss.vario()
                * self.kalman_vario_gnss.acceleration_observed()
                * self.vertical_energy_tuning_factor)
            * RECIP_GRAVITY;

        let v_north = input.gnss_velocity.north() - input.wind_average.north();
        let v_east = input.gnss_velocity.east() - input.wind_average.east();
        self.specific_energy = (v_north * v_north
            + v_east * v_east
            + input.gnss_velocity.down() * input.gnss_velocity.down()
                * self.vertical_energy_tuning_factor)
            * ONE_DIV_BY_GRAVITY_TIMES_2;

        // speed compensation 3: energy differentiation
        self.speed_compensation_energy_3 = self
            .specific_energy_differentiator
            .respond(self.specific_energy);

        // blend the three mechanisms: 1 and 2 carry the dynamics,
        // 3 holds the long term
        self.speed_compensation_gnss = self.speed_compensation_fusioner.respond(
            0.5 * (self.speed_compensation_ins_gnss_1 + self.speed_compensation_kalman_2),
            self.speed_compensation_energy_3,
        );

        self.vario_averager_gnss
            .respond(self.vario_uncompensated_gnss + self.speed_compensation_gnss);
    }

    // observables

    /// Barometric uncompensated vario (down-frame sign convention).
    pub fn vario_uncompensated_pressure(&self) -> f32 {
        self.vario_uncompensated_pressure
    }

    /// GNSS uncompensated vario, positive while climbing.
    pub fn vario_uncompensated_gnss(&self) -> f32 {
        self.vario_uncompensated_gnss
    }

    /// Barometric total-energy variometer, m/s.
    pub fn vario_averager_pressure(&self) -> f32 {
        self.vario_averager_pressure.output()
    }

    /// GNSS total-energy variometer, m/s.
    pub fn vario_averager_gnss(&self) -> f32 {
        self.vario_averager_gnss.output()
    }

    /// Kinetic-energy rate from the airspeed sensor.
    pub fn speed_compensation_ias(&self) -> f32 {
        self.speed_compensation_ias
    }

    pub fn speed_compensation_ins_gnss_1(&self) -> f32 {
        self.speed_compensation_ins_gnss_1
    }

    pub fn speed_compensation_kalman_2(&self) -> f32 {
        self.speed_compensation_kalman_2
    }

    pub fn speed_compensation_energy_3(&self) -> f32 {
        self.speed_compensation_energy_3
    }

    /// Blended GNSS speed compensation.
    pub fn speed_compensation_gnss(&self) -> f32 {
        self.speed_compensation_gnss
    }

    /// Air-relative specific energy, meters.
    pub fn specific_energy(&self) -> f32 {
        self.specific_energy
    }

    /// Instantaneous wind from the decimation filter, NED, m/s.
    pub fn wind(&self) -> Vec3 {
        self.windspeed_decimator.output()
    }
}
