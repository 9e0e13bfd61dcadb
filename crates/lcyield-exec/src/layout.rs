//! Where datasets live under the data directory.

use std::path::{Path, PathBuf};

use lcyield_core::keys::{DatasetKey, DecayMode, McType, Polarity, Stripping, Year};

use crate::error::{ExecError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    data_dir: PathBuf,
}

impl DataLayout {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn file(dir: PathBuf, name: String) -> String {
        dir.join(name).to_string_lossy().into_owned()
    }

    /// Collision ntuple of one physical polarity.
    pub fn collision_file(&self, year: Year, stripping: Stripping, polarity: Polarity) -> String {
        Self::file(
            self.data_dir.join("Collision").join(year.to_string()),
            format!("DVntuple.{year}.{stripping}.{polarity}.rec"),
        )
    }

    /// Integrated luminosity table of one physical polarity.
    pub fn lumi_file(&self, year: Year, stripping: Stripping, polarity: Polarity) -> String {
        Self::file(
            self.data_dir.join("Collision").join(year.to_string()),
            format!("LumiTuple.{year}.{stripping}.{polarity}.rec"),
        )
    }

    /// Signal MC ntuple of one physical polarity and sample stage.
    pub fn mc_file(
        &self,
        mode: DecayMode,
        year: Year,
        stripping: Stripping,
        polarity: Polarity,
        sample: McType,
    ) -> Result<String> {
        let event_type = mode
            .mc_event_type()
            .ok_or_else(|| ExecError::NotFound(format!("no signal MC for {mode}")))?;
        Ok(Self::file(
            self.data_dir
                .join("MonteCarlo")
                .join(year.to_string())
                .join(event_type.to_string()),
            format!("DVntuple.{year}.{stripping}.{polarity}.{sample}.rec"),
        ))
    }

    /// Files chained for `key`, one per physical polarity. MC keys read the
    /// given sample; collision keys ignore it.
    pub fn files(&self, key: &DatasetKey, sample: McType) -> Result<Vec<String>> {
        key.polarity
            .components()
            .iter()
            .map(|&p| {
                if key.mc {
                    self.mc_file(key.mode, key.year, key.stripping, p, sample)
                } else {
                    Ok(self.collision_file(key.year, key.stripping, p))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_paths() {
        let layout = DataLayout::new("/data");
        let key = DatasetKey::new(DecayMode::PKpi, Polarity::Combined, Year::Y2011, false, false);
        assert_eq!(
            layout.files(&key, McType::Stripped).unwrap(),
            vec![
                "/data/Collision/2011/DVntuple.2011.20r1.MagUp.rec".to_string(),
                "/data/Collision/2011/DVntuple.2011.20r1.MagDown.rec".to_string(),
            ]
        );
    }

    #[test]
    fn mc_paths_carry_event_type_and_sample() {
        let layout = DataLayout::new("/data");
        let key = DatasetKey::new(DecayMode::PKK, Polarity::MagDown, Year::Y2012, false, true);
        assert_eq!(
            layout.files(&key, McType::Cheated).unwrap(),
            vec!["/data/MonteCarlo/2012/15674000/DVntuple.2012.20r0.MagDown.cheated.rec".to_string()]
        );
    }

    #[test]
    fn ks_modes_have_no_mc() {
        let layout = DataLayout::new("/data");
        let key = DatasetKey::new(DecayMode::PKSLL, Polarity::MagUp, Year::Y2011, false, true);
        assert!(matches!(
            layout.files(&key, McType::Stripped),
            Err(ExecError::NotFound(_))
        ));
    }
}
