use std::convert::TryFrom;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Radio access technology generation, selecting the coverage radius and the data rate
/// assigned to every device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Technology {
    /// 1G
    G1,
    /// 2G
    G2,
    /// 3G
    G3,
    /// 4G
    G4,
    /// 5G
    G5,
    /// 6G
    G6,
}

/// Coverage radius and device data rate of a technology.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile {
    /// Maximum device-to-edge distance in kilometers.
    pub radius: f64,
    /// Data rate in Mbps.
    pub data_rate: f64,
}

impl Technology {
    /// Numeric ID, 1 through 6.
    #[must_use]
    pub fn id(self) -> u8 {
        match self {
            Self::G1 => 1,
            Self::G2 => 2,
            Self::G3 => 3,
            Self::G4 => 4,
            Self::G5 => 5,
            Self::G6 => 6,
        }
    }

    /// Fixed coverage radius and data rate.
    #[must_use]
    pub fn profile(self) -> Profile {
        let (radius, data_rate) = match self {
            Self::G1 => (20.0, 0.0024),
            Self::G2 => (10.0, 0.064),
            Self::G3 => (5.0, 2.0),
            Self::G4 => (3.0, 100.0),
            Self::G5 => (0.6, 1000.0),
            Self::G6 => (0.32, 10000.0),
        };
        Profile { radius, data_rate }
    }
}

impl TryFrom<u8> for Technology {
    type Error = Error;
    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(Self::G1),
            2 => Ok(Self::G2),
            3 => Ok(Self::G3),
            4 => Ok(Self::G4),
            5 => Ok(Self::G5),
            6 => Ok(Self::G6),
            id => Err(Error::UnknownTechnology(id)),
        }
    }
}

impl From<Technology> for u8 {
    fn from(technology: Technology) -> Self {
        technology.id()
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}G", self.id())
    }
}
