use serde::{Deserialize, Serialize};

use crate::command::Configuration;
use crate::error::{require, require_finite, LinkError, Result};

/// Drive geometry of the robot.
///
/// Fields are optional so that partially filled values coming from JSON can
/// be reported field by field instead of failing to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geometry {
    /// Encoder ticks per meter traveled.
    pub ticks_per_meter: Option<f64>,
    /// Maximum motor output.
    pub m_max: Option<f64>,
}

impl Geometry {
    pub fn new(ticks_per_meter: f64, m_max: f64) -> Self {
        Self {
            ticks_per_meter: Some(ticks_per_meter),
            m_max: Some(m_max),
        }
    }

    /// Wire form `[ticksPerMeter, mMax]`.
    pub fn to_wire(&self) -> Result<[f64; 2]> {
        require(&[
            ("ticksPerMeter", self.ticks_per_meter.is_some()),
            ("mMax", self.m_max.is_some()),
        ])?;
        require_finite(&[("ticksPerMeter", self.ticks_per_meter), ("mMax", self.m_max)])?;
        Ok([
            self.ticks_per_meter.unwrap_or_default(),
            self.m_max.unwrap_or_default(),
        ])
    }
}

/// Accelerometer and gyro offsets for the board's AHRS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AhrsCalibration {
    pub a_x: Option<f64>,
    pub a_y: Option<f64>,
    pub a_z: Option<f64>,
    pub g_x: Option<f64>,
    pub g_y: Option<f64>,
    pub g_z: Option<f64>,
}

impl AhrsCalibration {
    pub fn new(accel: [f64; 3], gyro: [f64; 3]) -> Self {
        Self {
            a_x: Some(accel[0]),
            a_y: Some(accel[1]),
            a_z: Some(accel[2]),
            g_x: Some(gyro[0]),
            g_y: Some(gyro[1]),
            g_z: Some(gyro[2]),
        }
    }

    /// Wire form `[a_x, a_y, a_z, g_x, g_y, g_z]`.
    pub fn to_wire(&self) -> Result<[f64; 6]> {
        let fields = [
            ("a_x", self.a_x),
            ("a_y", self.a_y),
            ("a_z", self.a_z),
            ("g_x", self.g_x),
            ("g_y", self.g_y),
            ("g_z", self.g_z),
        ];
        require(&fields.map(|(name, value)| (name, value.is_some())))?;
        require_finite(&fields)?;
        Ok(fields.map(|(_, value)| value.unwrap_or_default()))
    }
}

/// Options a driver is constructed with.
///
/// Deserializes from the JSON layout hosts keep on disk:
/// `{ "geometry": {"ticksPerMeter", "mMax"}, "mPID", "hPID", "ahrsCalibration" }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverOptions {
    pub geometry: Option<Geometry>,
    /// Motor PID gains `[Kp, Ki, Kd]`.
    #[serde(rename = "mPID", skip_serializing_if = "Option::is_none")]
    pub motor_pid: Option<[f64; 3]>,
    /// Heading PID gains `[Kp, Ki, Kd]`.
    #[serde(rename = "hPID", skip_serializing_if = "Option::is_none")]
    pub heading_pid: Option<[f64; 3]>,
    #[serde(rename = "ahrsCalibration", skip_serializing_if = "Option::is_none")]
    pub ahrs_calibration: Option<AhrsCalibration>,
}

impl DriverOptions {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry: Some(geometry),
            ..Self::default()
        }
    }

    pub fn with_motor_pid(mut self, gains: [f64; 3]) -> Self {
        self.motor_pid = Some(gains);
        self
    }

    pub fn with_heading_pid(mut self, gains: [f64; 3]) -> Self {
        self.heading_pid = Some(gains);
        self
    }

    pub fn with_ahrs_calibration(mut self, calibration: AhrsCalibration) -> Self {
        self.ahrs_calibration = Some(calibration);
        self
    }

    /// Parse options from their JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| LinkError::Configuration(format!("unreadable driver options: {err}")))
    }

    /// Validate the options and build the configuration sent to the board
    /// during bootstrap.
    ///
    /// Missing geometry, or geometry/calibration with missing fields, is a
    /// configuration error.
    pub fn bootstrap_configuration(&self) -> Result<Configuration> {
        let geometry = self.geometry.as_ref().ok_or_else(|| {
            LinkError::Configuration("robot geometry must be specified".to_string())
        })?;
        let geometry = geometry.to_wire().map_err(|err| in_section("geometry", err))?;
        let imu_offsets = self
            .ahrs_calibration
            .as_ref()
            .map(AhrsCalibration::to_wire)
            .transpose()
            .map_err(|err| in_section("ahrsCalibration", err))?;

        Ok(Configuration {
            geometry: Some(geometry),
            motor_pid: self.motor_pid,
            heading_pid: self.heading_pid,
            imu_offsets,
        })
    }
}

fn in_section(section: &str, err: LinkError) -> LinkError {
    LinkError::Configuration(format!("{section}: {err}"))
}
