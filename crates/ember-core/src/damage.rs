//! Damage classification shared by templates and actors

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::EmberError;

/// The eight damage types. Actors may resist, amplify, or invert each
/// one; templates declare which type their impact deals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageKind {
    #[default]
    Slash,
    Crush,
    Poke,
    Holy,
    Evil,
    Fire,
    Ice,
    Zap,
}

impl DamageKind {
    pub const ALL: [DamageKind; 8] = [
        DamageKind::Slash,
        DamageKind::Crush,
        DamageKind::Poke,
        DamageKind::Holy,
        DamageKind::Evil,
        DamageKind::Fire,
        DamageKind::Ice,
        DamageKind::Zap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DamageKind::Slash => "slash",
            DamageKind::Crush => "crush",
            DamageKind::Poke => "poke",
            DamageKind::Holy => "holy",
            DamageKind::Evil => "evil",
            DamageKind::Fire => "fire",
            DamageKind::Ice => "ice",
            DamageKind::Zap => "zap",
        }
    }
}

impl fmt::Display for DamageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DamageKind {
    type Err = EmberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "slash" => Ok(DamageKind::Slash),
            "crush" => Ok(DamageKind::Crush),
            "poke" => Ok(DamageKind::Poke),
            "holy" => Ok(DamageKind::Holy),
            "evil" => Ok(DamageKind::Evil),
            "fire" => Ok(DamageKind::Fire),
            "ice" => Ok(DamageKind::Ice),
            "zap" => Ok(DamageKind::Zap),
            other => Err(EmberError::ParseError(format!(
                "Unknown damage kind '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_strings() {
        for kind in DamageKind::ALL {
            assert_eq!(kind.as_str().parse::<DamageKind>().unwrap(), kind);
        }
    }

    #[test]
    fn rejects_unknown_names() {
        assert!("sonic".parse::<DamageKind>().is_err());
    }
}
