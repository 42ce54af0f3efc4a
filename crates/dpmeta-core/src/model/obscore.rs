//! IVOA ObsCore attributes.
//!
//! Every attribute is optional and is written as `null` when unset; absence is
//! valid. Text attributes are plain strings so documents produced elsewhere
//! load unchanged. The vocabularies below name the values this tooling writes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Facility names.
pub mod facility {
    pub const SKA: &str = "SKA-Observatory";
    pub const SKA_LOW: &str = "SKA-LOW";
    pub const SKA_MID: &str = "SKA-MID";
    pub const UNKNOWN: &str = "Unknown";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObsCore {
    #[serde(default)]
    pub dataproduct_type: Option<String>,
    #[serde(default)]
    pub calib_level: Option<CalibrationLevel>,
    #[serde(default)]
    pub obs_collection: Option<String>,
    #[serde(default)]
    pub obs_id: Option<String>,
    #[serde(default)]
    pub obs_publisher_did: Option<String>,
    #[serde(default)]
    pub facility_name: Option<String>,
    #[serde(default)]
    pub instrument_name: Option<String>,
    #[serde(default)]
    pub instrument_ant_diameter: Option<AntennaDiameter>,
    #[serde(default)]
    pub ant_number: Option<u64>,
    #[serde(default)]
    pub pol_states: Option<String>,
    #[serde(default)]
    pub pol_xel: Option<u64>,
    /// Degrees.
    #[serde(default)]
    pub s_ra: Option<f64>,
    /// Degrees.
    #[serde(default)]
    pub s_dec: Option<f64>,
    /// MJD.
    #[serde(default)]
    pub t_min: Option<f64>,
    /// MJD.
    #[serde(default)]
    pub t_max: Option<f64>,
    /// Seconds.
    #[serde(default)]
    pub t_exptime: Option<f64>,
    /// Seconds.
    #[serde(default)]
    pub t_resolution: Option<f64>,
    /// MHz.
    #[serde(default)]
    pub f_min: Option<f64>,
    /// MHz.
    #[serde(default)]
    pub f_max: Option<f64>,
    #[serde(default)]
    pub em_xel: Option<u64>,
    #[serde(default)]
    pub target_name: Option<String>,
    #[serde(default)]
    pub access_format: Option<String>,
    #[serde(default)]
    pub access_url: Option<String>,
    /// KiB.
    #[serde(default)]
    pub access_estsize: Option<u64>,
    #[serde(default)]
    pub o_ucd: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Dish diameter shared by all antennas, or a label when they differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AntennaDiameter {
    Metres(f64),
    Label(String),
}

impl AntennaDiameter {
    /// Label used when antennas have different diameters.
    pub const VARIOUS: &'static str = "various";

    pub fn various() -> Self {
        Self::Label(Self::VARIOUS.to_string())
    }

    pub fn as_metres(&self) -> Option<f64> {
        match self {
            Self::Metres(m) => Some(*m),
            Self::Label(_) => None,
        }
    }
}

macro_rules! string_vocabulary {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> Self {
                v.as_str().to_string()
            }
        }
    };
}

string_vocabulary! {
    /// Primary nature of the data product.
    DataProductType {
        Ms => "MS",
        PointingOffsets => "POINTING-OFFSETS",
        Unknown => "Unknown",
    }
}

string_vocabulary! {
    /// Data collection the product belongs to.
    ObservationCollection {
        Simulation => "Simulation",
        Unknown => "Unknown",
    }
}

string_vocabulary! {
    /// Unified Content Descriptor of the observable.
    Ucd {
        Count => "phot.count",
        FluxDensity => "phot.flux.density",
        Fourier => "stat.fourier",
    }
}

string_vocabulary! {
    /// MIME type of the product when downloaded as a file.
    AccessFormat {
        Binary => "application/octet-stream",
        Fits => "image/fits",
        Hdf5 => "application/x-hdf5",
        Jpeg => "image/jpeg",
        Png => "image/png",
        TarGz => "application/x-tar-gzip",
        Unknown => "application/unknown",
    }
}

/// Amount of calibration applied (IVOA levels 0 to 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CalibrationLevel {
    Level0 = 0,
    Level1 = 1,
    Level2 = 2,
    Level3 = 3,
    Level4 = 4,
}

impl TryFrom<u8> for CalibrationLevel {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::Level0),
            1 => Ok(Self::Level1),
            2 => Ok(Self::Level2),
            3 => Ok(Self::Level3),
            4 => Ok(Self::Level4),
            other => Err(format!("calibration level must be 0..=4, got {other}")),
        }
    }
}

impl From<CalibrationLevel> for u8 {
    fn from(v: CalibrationLevel) -> Self {
        v as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_attributes_serialize_as_null() {
        let v = serde_json::to_value(ObsCore::default()).unwrap();
        assert_eq!(v["s_ra"], Value::Null);
        assert_eq!(v["instrument_ant_diameter"], Value::Null);
        assert_eq!(v["calib_level"], Value::Null);
    }

    #[test]
    fn diameter_is_number_or_label() {
        let n: AntennaDiameter = serde_yaml::from_str("10").unwrap();
        assert_eq!(n, AntennaDiameter::Metres(10.0));
        let l: AntennaDiameter = serde_yaml::from_str("various").unwrap();
        assert_eq!(l, AntennaDiameter::various());
        assert_eq!(serde_json::to_value(AntennaDiameter::Metres(13.5)).unwrap(), 13.5);
    }

    #[test]
    fn vocabulary_wire_strings() {
        assert_eq!(DataProductType::PointingOffsets.as_str(), "POINTING-OFFSETS");
        assert_eq!(Ucd::parse("stat.fourier"), Some(Ucd::Fourier));
        assert_eq!(AccessFormat::Unknown.to_string(), "application/unknown");
        assert_eq!(ObservationCollection::ALL.len(), 2);
        assert_eq!(AccessFormat::parse("text/plain"), None);
    }

    #[test]
    fn calibration_level_range() {
        assert_eq!(CalibrationLevel::try_from(3), Ok(CalibrationLevel::Level3));
        assert!(CalibrationLevel::try_from(5).is_err());
        let bad: Result<ObsCore, _> = serde_yaml::from_str("calib_level: 9");
        assert!(bad.is_err());
        let ok: ObsCore = serde_yaml::from_str("calib_level: 0").unwrap();
        assert_eq!(ok.calib_level, Some(CalibrationLevel::Level0));
    }
}
