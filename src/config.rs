use serde::Deserialize;

use crate::error::Result;
use crate::storage::StorageType;
use crate::value_err;

/// How the final counters are printed on stdout.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `faults,reads,writes` on a single line.
    Csv,
    /// Boxed human-readable summary.
    Summary,
}

impl std::str::FromStr for OutputFormat {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(OutputFormat::Csv),
            "summary" => Ok(OutputFormat::Summary),
            _ => Err(value_err!("unknown output format: {}", s)),
        }
    }
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct Config {
    pub log_level: String,

    /// Size in bytes of a page, a frame and a disk block.
    pub frame_size: usize,

    pub storage_type: StorageType,
    pub disk_path: String,

    pub output: OutputFormat,

    /// Seed for the random replacement policy. Runs are not reproducible
    /// without one.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Config {
    pub fn new(file: &str) -> Result<Config> {
        let mut cfg = config::Config::builder()
            .set_default("log_level", "warn")?
            .set_default("frame_size", 4096)?
            .set_default("storage_type", "file")?
            .set_default("disk_path", "myvirtualdisk")?
            .set_default("output", "csv")?;
        if !file.is_empty() {
            cfg = cfg.add_source(config::File::with_name(file))
        }
        cfg = cfg.add_source(config::Environment::with_prefix("VIRTMEM"));
        let cfg: Config = cfg.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.frame_size == 0 || self.frame_size % 4 != 0 {
            return Err(value_err!(
                "frame_size must be a nonzero multiple of 4, got {}",
                self.frame_size
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() -> Result<()> {
        let cfg = Config::new("")?;
        assert_eq!(StorageType::File, cfg.storage_type);
        assert_eq!(OutputFormat::Csv, cfg.output);
        assert_eq!(4096, cfg.frame_size);
        assert_eq!("myvirtualdisk", cfg.disk_path);
        Ok(())
    }

    #[test]
    fn test_invalid_frame_size() {
        let cfg = Config {
            log_level: "warn".into(),
            frame_size: 4095,
            storage_type: StorageType::Memory,
            disk_path: String::new(),
            output: OutputFormat::Csv,
            seed: None,
        };
        assert!(matches!(cfg.validate(), Err(crate::error::Error::Value(_))));
    }

    #[test]
    fn test_output_format_from_str() -> Result<()> {
        assert_eq!(OutputFormat::Summary, "summary".parse()?);
        assert!("xml".parse::<OutputFormat>().is_err());
        Ok(())
    }
}
