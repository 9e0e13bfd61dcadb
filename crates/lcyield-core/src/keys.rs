//! Dataset identity: decay mode, magnet polarity, data-taking year, stripping
//! campaign and the MC sample kinds.
//!
//! `DatasetKey`'s display form names derived files, so it must stay stable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Friend-table name under which derived meta columns are attached.
pub const META_FRIEND_NAME: &str = "MetaTree";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DecayMode {
    PKpi,
    PKK,
    Ppipi,
    PKSLL,
    PKSDD,
    Pphi,
}

impl DecayMode {
    pub const ALL: [DecayMode; 6] = [
        DecayMode::PKpi,
        DecayMode::PKK,
        DecayMode::Ppipi,
        DecayMode::PKSLL,
        DecayMode::PKSDD,
        DecayMode::Pphi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DecayMode::PKpi => "pKpi",
            DecayMode::PKK => "pKK",
            DecayMode::Ppipi => "ppipi",
            DecayMode::PKSLL => "pKSLL",
            DecayMode::PKSDD => "pKSDD",
            DecayMode::Pphi => "pphi",
        }
    }

    pub fn is_ks(&self) -> bool {
        matches!(self, DecayMode::PKSLL | DecayMode::PKSDD)
    }

    /// Simulation event type number of the signal MC sample, where one exists.
    pub fn mc_event_type(&self) -> Option<u32> {
        match self {
            DecayMode::PKpi => Some(15874000),
            DecayMode::PKK => Some(15674000),
            DecayMode::Ppipi => Some(15674010),
            DecayMode::Pphi => Some(15674001),
            DecayMode::PKSLL | DecayMode::PKSDD => None,
        }
    }
}

impl fmt::Display for DecayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecayMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DecayMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| Error::UnknownKey(format!("decay mode '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Polarity {
    MagUp,
    MagDown,
    Combined,
}

impl Polarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::MagUp => "MagUp",
            Polarity::MagDown => "MagDown",
            Polarity::Combined => "Combined",
        }
    }

    /// The physical polarities a dataset of this polarity is made of.
    pub fn components(&self) -> &'static [Polarity] {
        match self {
            Polarity::MagUp => &[Polarity::MagUp],
            Polarity::MagDown => &[Polarity::MagDown],
            Polarity::Combined => &[Polarity::MagUp, Polarity::MagDown],
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Polarity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "MagUp" | "up" => Ok(Polarity::MagUp),
            "MagDown" | "down" => Ok(Polarity::MagDown),
            "Combined" | "combined" => Ok(Polarity::Combined),
            other => Err(Error::UnknownKey(format!("polarity '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Year {
    Y2011,
    Y2012,
}

impl Year {
    pub fn as_u16(&self) -> u16 {
        match self {
            Year::Y2011 => 2011,
            Year::Y2012 => 2012,
        }
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

impl FromStr for Year {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "2011" => Ok(Year::Y2011),
            "2012" => Ok(Year::Y2012),
            other => Err(Error::UnknownKey(format!("year '{other}'"))),
        }
    }
}

/// Central stripping campaign a dataset was processed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stripping {
    S20r1,
    S20r0,
    S17b,
}

impl Stripping {
    /// Campaign for a year. `legacy` selects 17b for 2011.
    pub fn for_year(year: Year, legacy: bool) -> Self {
        match (year, legacy) {
            (Year::Y2011, true) => Stripping::S17b,
            (Year::Y2011, false) => Stripping::S20r1,
            (Year::Y2012, _) => Stripping::S20r0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stripping::S20r1 => "20r1",
            Stripping::S20r0 => "20r0",
            Stripping::S17b => "17b",
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Stripping::S17b)
    }
}

impl fmt::Display for Stripping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Simulated sample stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum McType {
    /// Generator-level events, before detector simulation.
    Generated,
    /// Reconstructed signal, matched to truth without the stripping selection.
    Cheated,
    /// Full reconstruction after the stripping selection.
    Stripped,
}

impl McType {
    pub fn as_str(&self) -> &'static str {
        match self {
            McType::Generated => "generated",
            McType::Cheated => "cheated",
            McType::Stripped => "stripped",
        }
    }
}

impl fmt::Display for McType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for McType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "generated" => Ok(McType::Generated),
            "cheated" => Ok(McType::Cheated),
            "stripped" => Ok(McType::Stripped),
            other => Err(Error::UnknownKey(format!("MC sample '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetKey {
    pub mode: DecayMode,
    pub polarity: Polarity,
    pub year: Year,
    pub stripping: Stripping,
    pub mc: bool,
}

impl DatasetKey {
    pub fn new(mode: DecayMode, polarity: Polarity, year: Year, legacy: bool, mc: bool) -> Self {
        Self {
            mode,
            polarity,
            year,
            stripping: Stripping::for_year(year, legacy),
            mc,
        }
    }

    pub fn with_polarity(self, polarity: Polarity) -> Self {
        Self { polarity, ..self }
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.mode, self.year, self.stripping, self.polarity
        )?;
        if self.mc {
            f.write_str("-mc")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_display_is_stable() {
        let key = DatasetKey::new(DecayMode::PKpi, Polarity::MagUp, Year::Y2011, false, false);
        assert_eq!(key.to_string(), "pKpi-2011-20r1-MagUp");
        let mc = DatasetKey::new(DecayMode::Ppipi, Polarity::MagDown, Year::Y2012, false, true);
        assert_eq!(mc.to_string(), "ppipi-2012-20r0-MagDown-mc");
        let legacy = DatasetKey::new(DecayMode::PKK, Polarity::Combined, Year::Y2011, true, false);
        assert_eq!(legacy.to_string(), "pKK-2011-17b-Combined");
    }

    #[test]
    fn modes_parse_from_their_names() {
        for m in DecayMode::ALL {
            assert_eq!(m.as_str().parse::<DecayMode>().unwrap(), m);
        }
        assert!("pKKK".parse::<DecayMode>().is_err());
    }

    #[test]
    fn combined_polarity_has_both_components() {
        assert_eq!(
            Polarity::Combined.components(),
            &[Polarity::MagUp, Polarity::MagDown]
        );
        assert_eq!(Polarity::MagUp.components(), &[Polarity::MagUp]);
    }

    #[test]
    fn ks_modes_have_no_signal_mc() {
        assert!(DecayMode::PKSLL.mc_event_type().is_none());
        assert_eq!(DecayMode::Pphi.mc_event_type(), Some(15674001));
    }
}
