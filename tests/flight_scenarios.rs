//! End-to-end flight scenarios through the full engine
//!
//! Each test drives the AHRS (and where relevant the flight observer
//! and the NMEA formatter) with synthetic sensor streams at the 100 Hz
//! tick and checks the externally observable behavior.

use glide_sense::ahrs::{AhrsEngine, AhrsMeasurement, CircleState};
use glide_sense::config::NavConfig;
use glide_sense::magcal::store::MemoryStore;
use glide_sense::math::{Mat3, Vec3};
use glide_sense::nmea::{format_nmea_sentences, nmea_checksum_valid, GnssCoordinates, OutputData};
use glide_sense::observer::{FlightObserver, GnssStatus, ObserverInput};

const TICKS_PER_SECOND: usize = 100;

fn test_config() -> NavConfig {
    NavConfig {
        inclination: 60.0_f32.to_radians(),
        declination: 0.0,
        ..Default::default()
    }
}

fn engine() -> AhrsEngine<MemoryStore> {
    AhrsEngine::new(test_config(), MemoryStore::new()).unwrap()
}

/// Body magnetometer reading for the engine's current attitude, with an
/// inverse sensor error applied: raw = true / scale + bias.
fn raw_mag(ahrs: &AhrsEngine<MemoryStore>, bias: Vec3, scale: Vec3) -> Vec3 {
    let expected_body = ahrs.body_to_nav().transpose() * ahrs.expected_induction();
    Vec3::new(
        expected_body.x / scale.x + bias.x,
        expected_body.y / scale.y + bias.y,
        expected_body.z / scale.z + bias.z,
    )
}

#[test]
fn level_cruise_settles_to_zero_attitude_and_vario() {
    let mut ahrs = engine();
    let mut observer = FlightObserver::new(0.01, 1.0);
    observer.reset(0.0, 0.0);

    let measurement = AhrsMeasurement {
        gyro: Vec3::zeros(),
        acc: Vec3::new(0.0, 0.0, -9.81),
        mag: Vec3::new(0.5, 0.0, 0.866),
        gnss_acceleration: Vec3::zeros(),
        gnss_heading: None,
    };

    for _ in 0..10 * TICKS_PER_SECOND {
        ahrs.update(&measurement);
        observer.update(&ObserverInput {
            gnss_velocity: Vec3::new(50.0, 0.0, 0.0),
            gnss_acceleration: Vec3::zeros(),
            ahrs_acceleration: ahrs.acceleration_nav(),
            heading_vector: ahrs.heading_vector(),
            gnss_negative_altitude: 0.0,
            pressure_altitude: 0.0,
            tas: 50.0,
            ias: 50.0,
            circle_state: ahrs.circle_state(),
            wind_average: Vec3::zeros(),
            gnss_status: GnssStatus::FIX,
        });
    }

    let (roll, nick, yaw) = ahrs.euler_angles();
    assert!(roll.abs() < 1e-3, "roll = {}", roll);
    assert!(nick.abs() < 1e-3, "nick = {}", nick);
    assert!(yaw.abs() < 1e-3, "yaw = {}", yaw);
    assert!(
        observer.vario_averager_pressure().abs() < 0.05,
        "pressure TEK = {}",
        observer.vario_averager_pressure()
    );
    assert!(
        observer.vario_averager_gnss().abs() < 0.05,
        "GNSS TEK = {}",
        observer.vario_averager_gnss()
    );
    assert!(observer.wind().norm() < 0.05, "wind = {:?}", observer.wind());
}

#[test]
fn quaternion_and_rotation_invariants_hold_through_maneuvering() {
    let mut ahrs = engine();
    let mut measurement = AhrsMeasurement {
        gyro: Vec3::zeros(),
        acc: Vec3::new(0.0, 0.0, -9.81),
        mag: Vec3::new(0.5, 0.0, 0.866),
        gnss_acceleration: Vec3::zeros(),
        gnss_heading: None,
    };

    for tick in 0..20 * TICKS_PER_SECOND {
        let t = tick as f32 * 0.01;
        measurement.gyro = Vec3::new(0.4 * (0.7 * t).sin(), 0.2 * (1.1 * t).cos(), 0.3);
        ahrs.update(&measurement);

        let norm = ahrs.quaternion().norm();
        assert!((norm - 1.0).abs() < 1e-6, "|q| = {} at tick {}", norm, tick);

        let r = ahrs.body_to_nav();
        let err = (r * r.transpose() - Mat3::identity()).norm();
        assert!(err < 1e-5, "R orthogonality error {} at tick {}", err, tick);
    }
}

#[test]
fn sustained_turn_enters_and_leaves_circling() {
    let mut ahrs = engine();
    let level = AhrsMeasurement {
        gyro: Vec3::zeros(),
        acc: Vec3::new(0.0, 0.0, -9.81),
        mag: Vec3::new(0.5, 0.0, 0.866),
        gnss_acceleration: Vec3::zeros(),
        gnss_heading: None,
    };
    ahrs.update(&level);

    // 0.3 rad/s is far above the upper hysteresis bound; the filtered
    // turn rate plus the counter need a few hundred ticks each. The
    // magnetometer rotates with the attitude as on the real aircraft.
    for _ in 0..10 * TICKS_PER_SECOND {
        let turning = AhrsMeasurement {
            gyro: Vec3::new(0.0, 0.0, 0.3),
            mag: ahrs.body_to_nav().transpose() * ahrs.expected_induction(),
            ..level
        };
        ahrs.update(&turning);
    }
    assert_eq!(ahrs.circle_state(), CircleState::Circling);
    assert!(ahrs.turn_rate() > 0.25, "turn rate = {}", ahrs.turn_rate());

    for _ in 0..10 * TICKS_PER_SECOND {
        let straight = AhrsMeasurement {
            mag: ahrs.body_to_nav().transpose() * ahrs.expected_induction(),
            ..level
        };
        ahrs.update(&straight);
    }
    assert_eq!(ahrs.circle_state(), CircleState::StraightFlight);
}

#[test]
fn circling_commit_recovers_injected_magnetometer_error() {
    let mut ahrs = engine();
    let bias = Vec3::new(0.05, -0.03, 0.02);
    let scale = Vec3::new(1.08, 0.94, 1.02);

    let mut reports = 0;
    let mut last_report = None;

    // right-hand thermal for 40 s with a gentle bank oscillation so
    // every body axis sees induction spread
    for tick in 0..40 * TICKS_PER_SECOND {
        let t = tick as f32 * 0.01;
        let gyro = Vec3::new(0.15 * (0.5 * t).cos(), 0.0, 0.3);
        let acc = Vec3::new(0.0, 0.0, -9.81);
        // keep the leveling loop quiescent so calibration data flows
        let gnss_acceleration = ahrs.body_to_nav() * acc;
        let measurement = AhrsMeasurement {
            gyro,
            acc,
            mag: raw_mag(&ahrs, bias, scale),
            gnss_acceleration,
            gnss_heading: None,
        };
        ahrs.update(&measurement);
        if let Some(report) = ahrs.take_calibration_report() {
            reports += 1;
            last_report = Some(report);
        }
    }
    assert_eq!(ahrs.circle_state(), CircleState::Circling);
    assert_eq!(reports, 0, "no commit while still circling");

    // roll out: the CIRCLING -> TRANSITION edge commits exactly once
    for _ in 0..10 * TICKS_PER_SECOND {
        let acc = Vec3::new(0.0, 0.0, -9.81);
        let gnss_acceleration = ahrs.body_to_nav() * acc;
        let measurement = AhrsMeasurement {
            gyro: Vec3::zeros(),
            acc,
            mag: raw_mag(&ahrs, bias, scale),
            gnss_acceleration,
            gnss_heading: None,
        };
        ahrs.update(&measurement);
        if let Some(report) = ahrs.take_calibration_report() {
            reports += 1;
            last_report = Some(report);
        }
    }

    assert_eq!(ahrs.circle_state(), CircleState::StraightFlight);
    assert_eq!(reports, 1, "exactly one commit at the exit edge");

    let report = last_report.unwrap();
    for i in 0..3 {
        assert!(
            (report.calibration[i].bias - bias[i]).abs() < 0.02,
            "axis {}: bias = {} (want {})",
            i,
            report.calibration[i].bias,
            bias[i]
        );
        assert!(
            (report.calibration[i].scale - scale[i]).abs() < 0.05,
            "axis {}: scale = {} (want {})",
            i,
            report.calibration[i].scale,
            scale[i]
        );
    }
    assert!(ahrs.compass_calibration().is_done());
}

#[test]
fn dgnss_idempotence_with_consistent_observations() {
    let mut ahrs = engine();
    let acc = Vec3::new(0.0, 0.0, -9.81);
    let mag = Vec3::new(0.5, 0.0, 0.866);

    // one tick to initialize, then read the settled attitude
    ahrs.update(&AhrsMeasurement {
        gyro: Vec3::zeros(),
        acc,
        mag,
        gnss_acceleration: Vec3::zeros(),
        gnss_heading: None,
    });
    let (roll0, nick0, yaw0) = ahrs.euler_angles();

    // zero rates, GNSS acceleration equal to the navigated
    // acceleration, GNSS heading equal to the present yaw: nothing may
    // move
    for _ in 0..10 * TICKS_PER_SECOND {
        let measurement = AhrsMeasurement {
            gyro: Vec3::zeros(),
            acc,
            mag,
            gnss_acceleration: ahrs.acceleration_nav(),
            gnss_heading: Some(ahrs.euler_angles().2),
        };
        ahrs.update(&measurement);
    }

    let (roll, nick, yaw) = ahrs.euler_angles();
    assert!((roll - roll0).abs() < 1e-4, "roll drifted {}", roll - roll0);
    assert!((nick - nick0).abs() < 1e-4, "nick drifted {}", nick - nick0);
    assert!((yaw - yaw0).abs() < 1e-4, "yaw drifted {}", yaw - yaw0);
}

#[test]
fn gnss_loss_mirrors_pressure_outputs() {
    let mut observer = FlightObserver::new(0.01, 1.0);
    observer.reset(-800.0, -800.0);

    let mut input = ObserverInput {
        gnss_velocity: Vec3::new(30.0, 0.0, 0.0),
        gnss_acceleration: Vec3::zeros(),
        ahrs_acceleration: Vec3::new(0.0, 0.0, -9.81),
        heading_vector: Vec3::new(1.0, 0.0, 0.0),
        gnss_negative_altitude: -800.0,
        pressure_altitude: -800.0,
        tas: 30.0,
        ias: 30.0,
        circle_state: CircleState::StraightFlight,
        wind_average: Vec3::zeros(),
        gnss_status: GnssStatus::FIX,
    };
    for _ in 0..500 {
        observer.update(&input);
    }

    input.gnss_status = GnssStatus::empty();
    for _ in 0..500 {
        // keep some life in the signals while the fix is gone
        input.pressure_altitude -= 0.002;
        input.ias += 0.001;
        observer.update(&input);
        assert_eq!(
            observer.vario_uncompensated_gnss().to_bits(),
            observer.vario_uncompensated_pressure().to_bits()
        );
        assert_eq!(
            observer.speed_compensation_gnss().to_bits(),
            observer.speed_compensation_ias().to_bits()
        );
    }
}

#[test]
fn full_pipeline_produces_valid_nmea() {
    let mut ahrs = engine();
    let mut observer = FlightObserver::new(0.01, 1.0);
    observer.reset(-650.0, -650.0);

    let measurement = AhrsMeasurement {
        gyro: Vec3::zeros(),
        acc: Vec3::new(0.0, 0.0, -9.81),
        mag: Vec3::new(0.5, 0.0, 0.866),
        gnss_acceleration: Vec3::zeros(),
        gnss_heading: None,
    };
    for _ in 0..5 * TICKS_PER_SECOND {
        ahrs.update(&measurement);
        observer.update(&ObserverInput {
            gnss_velocity: Vec3::new(28.0, 3.0, 0.0),
            gnss_acceleration: Vec3::zeros(),
            ahrs_acceleration: ahrs.acceleration_nav(),
            heading_vector: ahrs.heading_vector(),
            gnss_negative_altitude: -650.0,
            pressure_altitude: -650.0,
            tas: 28.0,
            ias: 28.0,
            circle_state: ahrs.circle_state(),
            wind_average: Vec3::new(0.0, 3.0, 0.0),
            gnss_status: GnssStatus::FIX,
        });
    }

    let (roll, nick, yaw) = ahrs.euler_angles();
    let output = OutputData {
        coordinates: GnssCoordinates {
            hour: 14,
            minute: 2,
            second: 33,
            day: 17,
            month: 6,
            year: 2025,
            latitude: 48.1234,
            longitude: 9.8765,
            speed_motion: 28.16,
            heading_motion: 0.107,
            sat_fix_type: 1,
            sats_number: 11,
            position_down: -650.0,
            geo_sep_dm: 481,
        },
        wind_average: Vec3::new(0.0, 3.0, 0.0),
        tas: 28.0,
        static_pressure: 93450.0,
        pitot_pressure: 480.0,
        vario: observer.vario_averager_gnss(),
        supply_voltage: 12.4,
        humidity: 0.38,
        temperature: 19.5,
        roll,
        nick,
        yaw,
    };

    let mut buf = glide_sense::nmea::NmeaBuffer::new();
    format_nmea_sentences(&output, &mut buf);

    let lines: Vec<&str> = buf.as_str().split_terminator("\r\n").collect();
    assert_eq!(lines.len(), 6);
    for line in lines {
        assert!(
            nmea_checksum_valid(line.as_bytes()),
            "invalid checksum on {}",
            line
        );
    }
}
