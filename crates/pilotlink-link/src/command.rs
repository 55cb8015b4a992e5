//! Outbound commands.
//!
//! A [`Command`] serializes to one JSON object with the `Cmd` discriminator
//! first, followed by the payload fields under their wire names. Payload
//! types keep every field optional so that commands built from loosely typed
//! input (host JSON) can be checked and rejected with the names of all
//! missing fields.

use serde::{Deserialize, Serialize};

use crate::error::{require, require_finite, Result};
use crate::options::{AhrsCalibration, Geometry};
use crate::quantize::quantize;

/// An outbound command frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "Cmd")]
pub enum Command {
    #[serde(rename = "CONFIG")]
    Configure(Configuration),
    #[serde(rename = "MOV")]
    Move(Motion),
    #[serde(rename = "ROTA")]
    Rotate(Rotation),
    #[serde(rename = "ESC")]
    Esc {
        #[serde(rename = "Value")]
        value: u8,
    },
    #[serde(rename = "RESET")]
    Reset(PoseReset),
    /// Sent once when the board first reports in.
    Init,
}

impl Command {
    /// The `Cmd` discriminator this command goes out with.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Configure(_) => "CONFIG",
            Self::Move(_) => "MOV",
            Self::Rotate(_) => "ROTA",
            Self::Esc { .. } => "ESC",
            Self::Reset(_) => "RESET",
            Self::Init => "Init",
        }
    }

    pub fn configure(configuration: Configuration) -> Self {
        Self::Configure(configuration)
    }

    /// `CONFIG` carrying only the drive geometry.
    pub fn initialize_geometry(geometry: &Geometry) -> Result<Self> {
        Ok(Self::Configure(Configuration {
            geometry: Some(geometry.to_wire()?),
            ..Configuration::default()
        }))
    }

    /// `CONFIG` carrying only the AHRS offsets.
    pub fn calibrate_ahrs(calibration: &AhrsCalibration) -> Result<Self> {
        Ok(Self::Configure(Configuration {
            imu_offsets: Some(calibration.to_wire()?),
            ..Configuration::default()
        }))
    }

    /// `MOV` with raw motor outputs. Requires `M1` and `M2`.
    pub fn set_motor_power(motion: Motion) -> Result<Self> {
        require(&[("M1", motion.m1.is_some()), ("M2", motion.m2.is_some())])?;
        require_finite(&motion.numeric_fields())?;
        Ok(Self::Move(motion))
    }

    /// `MOV` over a distance. Requires `Dist`; `Dist`, `Hdg` and `Pwr` are
    /// quantized.
    pub fn drive_distance(motion: Motion) -> Result<Self> {
        require(&[("Dist", motion.distance.is_some())])?;
        require_finite(&motion.numeric_fields())?;
        Ok(Self::Move(Motion {
            distance: motion.distance.map(quantize),
            heading: motion.heading.map(quantize),
            power: motion.power.map(quantize),
            ..motion
        }))
    }

    /// `ROTA` to an absolute heading. Requires `Hdg`; `Hdg` and `Pwr` are
    /// quantized.
    pub fn turn_to(rotation: Rotation) -> Result<Self> {
        require(&[("Hdg", rotation.heading.is_some())])?;
        require_finite(&[("Hdg", rotation.heading), ("Pwr", rotation.power)])?;
        Ok(Self::Rotate(Rotation {
            heading: rotation.heading.map(quantize),
            power: rotation.power.map(quantize),
        }))
    }

    pub fn enable_motors() -> Self {
        Self::Esc { value: 1 }
    }

    pub fn reset(reset: PoseReset) -> Result<Self> {
        require_finite(&[("X", reset.x), ("Y", reset.y), ("H", reset.h)])?;
        Ok(Self::Reset(reset))
    }
}

/// `CONFIG` payload. Only the sections that are set go out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// `[ticksPerMeter, mMax]`
    #[serde(rename = "Geom", default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<[f64; 2]>,
    /// `[Kp, Ki, Kd]`
    #[serde(rename = "mPID", default, skip_serializing_if = "Option::is_none")]
    pub motor_pid: Option<[f64; 3]>,
    /// `[Kp, Ki, Kd]`
    #[serde(rename = "hPID", default, skip_serializing_if = "Option::is_none")]
    pub heading_pid: Option<[f64; 3]>,
    /// `[a_x, a_y, a_z, g_x, g_y, g_z]`
    #[serde(rename = "MPU", default, skip_serializing_if = "Option::is_none")]
    pub imu_offsets: Option<[f64; 6]>,
}

/// `MOV` payload: either raw motor outputs or a distance to drive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    #[serde(rename = "M1", default, skip_serializing_if = "Option::is_none")]
    pub m1: Option<f64>,
    #[serde(rename = "M2", default, skip_serializing_if = "Option::is_none")]
    pub m2: Option<f64>,
    /// Meters.
    #[serde(rename = "Dist", default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Degrees.
    #[serde(rename = "Hdg", default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    #[serde(rename = "Pwr", default, skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
}

impl Motion {
    pub fn motor_power(m1: f64, m2: f64) -> Self {
        Self {
            m1: Some(m1),
            m2: Some(m2),
            ..Self::default()
        }
    }

    pub fn distance(distance: f64) -> Self {
        Self {
            distance: Some(distance),
            ..Self::default()
        }
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }

    pub fn with_power(mut self, power: f64) -> Self {
        self.power = Some(power);
        self
    }

    fn numeric_fields(&self) -> [(&'static str, Option<f64>); 5] {
        [
            ("M1", self.m1),
            ("M2", self.m2),
            ("Dist", self.distance),
            ("Hdg", self.heading),
            ("Pwr", self.power),
        ]
    }
}

/// `ROTA` payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    /// Degrees.
    #[serde(rename = "Hdg", default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    #[serde(rename = "Pwr", default, skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
}

impl Rotation {
    pub fn heading(heading: f64) -> Self {
        Self {
            heading: Some(heading),
            power: None,
        }
    }

    pub fn with_power(mut self, power: f64) -> Self {
        self.power = Some(power);
        self
    }
}

/// `RESET` payload. Omitted coordinates reset to zero on the board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseReset {
    #[serde(rename = "X", default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(rename = "Y", default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(rename = "H", default, skip_serializing_if = "Option::is_none")]
    pub h: Option<f64>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::LinkError;

    fn wire(command: &Command) -> String {
        serde_json::to_string(command).unwrap()
    }

    #[test]
    fn discriminator_is_first_field() {
        let line = wire(&Command::turn_to(Rotation::heading(45.5)).unwrap());
        assert!(line.starts_with("{\"Cmd\":\"ROTA\""), "{line}");

        assert_eq!(wire(&Command::Init), r#"{"Cmd":"Init"}"#);
        assert_eq!(wire(&Command::enable_motors()), r#"{"Cmd":"ESC","Value":1}"#);
    }

    #[test]
    fn motor_power_requires_both_motors() {
        let err = Command::set_motor_power(Motion {
            m1: Some(1.0),
            ..Motion::default()
        })
        .unwrap_err();
        assert_eq!(err, LinkError::MissingFields(vec!["M2"]));

        let err = Command::set_motor_power(Motion::default()).unwrap_err();
        assert_eq!(err, LinkError::MissingFields(vec!["M1", "M2"]));
    }

    #[test]
    fn motor_power_from_host_json() {
        let motion: Motion = serde_json::from_value(json!({ "M1": 1 })).unwrap();
        let err = Command::set_motor_power(motion).unwrap_err();
        assert_eq!(err.to_string(), "missing required fields: [M2]");

        let motion: Motion = serde_json::from_value(json!({ "M1": 1, "M2": 2 })).unwrap();
        let command = Command::set_motor_power(motion).unwrap();
        assert_eq!(wire(&command), r#"{"Cmd":"MOV","M1":1.0,"M2":2.0}"#);
    }

    #[test]
    fn explicit_null_counts_as_missing() {
        let motion: Motion = serde_json::from_value(json!({ "M1": 1, "M2": null })).unwrap();
        assert_eq!(
            Command::set_motor_power(motion).unwrap_err(),
            LinkError::MissingFields(vec!["M2"])
        );
    }

    #[test]
    fn drive_distance_quantizes_all_numeric_fields() {
        let command =
            Command::drive_distance(Motion::distance(1.0).with_heading(90.123456).with_power(0.5))
                .unwrap();

        assert_eq!(
            command,
            Command::Move(Motion {
                distance: Some(1.0001),
                heading: Some(90.1234),
                power: Some(0.5),
                ..Motion::default()
            })
        );
        assert_eq!(
            wire(&command),
            r#"{"Cmd":"MOV","Dist":1.0001,"Hdg":90.1234,"Pwr":0.5}"#
        );
    }

    #[test]
    fn drive_distance_requires_distance() {
        let err = Command::drive_distance(Motion::default().with_heading(10.0)).unwrap_err();
        assert_eq!(err, LinkError::MissingFields(vec!["Dist"]));
    }

    #[test]
    fn turn_to_quantizes_heading_and_power() {
        let command = Command::turn_to(Rotation::heading(-45.0).with_power(0.33333)).unwrap();
        assert_eq!(
            command,
            Command::Rotate(Rotation {
                heading: Some(-44.9999),
                power: Some(0.3333),
            })
        );

        let err = Command::turn_to(Rotation::default()).unwrap_err();
        assert_eq!(err, LinkError::MissingFields(vec!["Hdg"]));
    }

    #[test]
    fn geometry_and_calibration_go_out_as_config() {
        let command = Command::initialize_geometry(&Geometry::new(4900.0, 450.0)).unwrap();
        assert_eq!(wire(&command), r#"{"Cmd":"CONFIG","Geom":[4900.0,450.0]}"#);

        let err = Command::initialize_geometry(&Geometry::default()).unwrap_err();
        assert_eq!(err, LinkError::MissingFields(vec!["ticksPerMeter", "mMax"]));

        let command = Command::calibrate_ahrs(&AhrsCalibration::new(
            [1.0, 2.0, 3.0],
            [4.0, 5.0, 6.0],
        ))
        .unwrap();
        assert_eq!(
            wire(&command),
            r#"{"Cmd":"CONFIG","MPU":[1.0,2.0,3.0,4.0,5.0,6.0]}"#
        );

        let err = Command::calibrate_ahrs(&AhrsCalibration::default()).unwrap_err();
        assert!(matches!(err, LinkError::MissingFields(ref fields) if fields.len() == 6));
    }

    #[test]
    fn reset_sends_only_supplied_coordinates() {
        assert_eq!(wire(&Command::reset(PoseReset::default()).unwrap()), r#"{"Cmd":"RESET"}"#);
        assert_eq!(
            wire(
                &Command::reset(PoseReset {
                    h: Some(180.0),
                    ..PoseReset::default()
                })
                .unwrap()
            ),
            r#"{"Cmd":"RESET","H":180.0}"#
        );
    }

    #[test]
    fn tag_matches_serialized_discriminator() {
        let commands = [
            Command::configure(Configuration::default()),
            Command::Move(Motion::default()),
            Command::Rotate(Rotation::default()),
            Command::enable_motors(),
            Command::reset(PoseReset::default()).unwrap(),
            Command::Init,
        ];
        for command in commands {
            let value = serde_json::to_value(&command).unwrap();
            assert_eq!(value[pilotlink_frame::COMMAND_FIELD], command.tag());
        }
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let err = Command::drive_distance(Motion::distance(f64::NAN)).unwrap_err();
        assert_eq!(err, LinkError::NonFinite(vec!["Dist"]));

        let err = Command::turn_to(Rotation::heading(f64::INFINITY).with_power(f64::NAN))
            .unwrap_err();
        assert_eq!(err, LinkError::NonFinite(vec!["Hdg", "Pwr"]));

        let err = Command::set_motor_power(Motion::motor_power(1.0, f64::NEG_INFINITY))
            .unwrap_err();
        assert_eq!(err, LinkError::NonFinite(vec!["M2"]));

        let err = Command::reset(PoseReset {
            x: Some(f64::NAN),
            ..PoseReset::default()
        })
        .unwrap_err();
        assert_eq!(err, LinkError::NonFinite(vec!["X"]));
    }

    #[test]
    fn missing_fields_are_reported_before_non_finite_ones() {
        let err = Command::drive_distance(Motion::default().with_heading(f64::NAN)).unwrap_err();
        assert_eq!(err, LinkError::MissingFields(vec!["Dist"]));
    }

    #[test]
    fn huge_distances_stay_numbers_on_the_wire() {
        let command = Command::drive_distance(Motion::distance(1e305)).unwrap();
        assert_eq!(
            command,
            Command::Move(Motion {
                distance: Some(1e305),
                ..Motion::default()
            })
        );
        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(value["Dist"].as_f64(), Some(1e305));
    }
}
