use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::ffi::OsString;
use std::path::PathBuf;

pub const DATA_FILE: &str = "bp-data.csv";
pub const DATA_ENV: &str = "BPLOG_DATA";

pub struct Config {
    pub data_path: PathBuf,
}

impl Config {
    /// Resolve the data file: `--data` flag, then `BPLOG_DATA`, then the
    /// platform data directory.
    pub fn load(data_flag: Option<PathBuf>) -> Result<Self> {
        let data_path = resolve_data_path(data_flag, std::env::var_os(DATA_ENV), default_data_path)?;
        Ok(Config { data_path })
    }
}

fn resolve_data_path<F>(flag: Option<PathBuf>, env: Option<OsString>, default: F) -> Result<PathBuf>
where
    F: FnOnce() -> Result<PathBuf>,
{
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Some(path) = env.filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    default()
}

fn default_data_path() -> Result<PathBuf> {
    let proj_dirs =
        ProjectDirs::from("", "", "bplog").context("Could not determine home directory")?;

    let data_dir = proj_dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

    Ok(data_dir.join(DATA_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fallback() -> Result<PathBuf> {
        Ok(PathBuf::from("/default/bp-data.csv"))
    }

    #[test]
    fn test_flag_wins() {
        let path = resolve_data_path(
            Some(PathBuf::from("flag.csv")),
            Some(OsString::from("env.csv")),
            fallback,
        )
        .unwrap();
        assert_eq!(path, PathBuf::from("flag.csv"));
    }

    #[test]
    fn test_env_over_default() {
        let path = resolve_data_path(None, Some(OsString::from("env.csv")), fallback).unwrap();
        assert_eq!(path, PathBuf::from("env.csv"));
    }

    #[test]
    fn test_empty_env_ignored() {
        let path = resolve_data_path(None, Some(OsString::new()), fallback).unwrap();
        assert_eq!(path, PathBuf::from("/default/bp-data.csv"));
    }

    #[test]
    fn test_default_not_called_when_overridden() {
        let path = resolve_data_path(Some(PathBuf::from("flag.csv")), None, || {
            panic!("default should not be resolved")
        })
        .unwrap();
        assert_eq!(path, PathBuf::from("flag.csv"));
    }
}
