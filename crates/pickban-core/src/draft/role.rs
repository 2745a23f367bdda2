// Lane roles shown next to the local team's picks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Short role code derived from a roster member's assigned position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "TOP")]
    Top,
    #[serde(rename = "JGL")]
    Jungle,
    #[serde(rename = "MID")]
    Middle,
    #[serde(rename = "ADC")]
    Bottom,
    #[serde(rename = "SUP")]
    Support,
}

impl Role {
    /// Map the client's `assignedPosition` string to a role.
    ///
    /// Matching is exact; blind pick and custom games send an empty string,
    /// which maps to `None` like any other unknown value.
    pub fn from_assigned_position(position: &str) -> Option<Self> {
        match position {
            "top" => Some(Role::Top),
            "jungle" => Some(Role::Jungle),
            "middle" => Some(Role::Middle),
            "bottom" => Some(Role::Bottom),
            "utility" => Some(Role::Support),
            _ => None,
        }
    }

    /// The short code used on the overlay.
    pub fn code(&self) -> &'static str {
        match self {
            Role::Top => "TOP",
            Role::Jungle => "JGL",
            Role::Middle => "MID",
            Role::Bottom => "ADC",
            Role::Support => "SUP",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
