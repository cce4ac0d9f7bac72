use std::{fs, path::Path};

use anyhow::{Context, Result};
use maze_explorer_system_exploration::ProfileBook;

/// Location searched when no profile file is given on the command line.
pub(crate) const DEFAULT_PROFILE_PATH: &str = "config/profiles.toml";

/// Loads the profile book used to tune every episode.
///
/// An explicit path must exist. Without one, the default location is tried
/// and the built-in profile is used when nothing is there.
pub(crate) fn load(explicit: Option<&Path>) -> Result<ProfileBook> {
    let path = match explicit {
        Some(path) => path,
        None => {
            let fallback = Path::new(DEFAULT_PROFILE_PATH);
            if !fallback.is_file() {
                log::debug!("no profile file found, using built-in defaults");
                return Ok(ProfileBook::default());
            }
            fallback
        }
    };

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read profiles from {}", path.display()))?;
    parse(&contents).with_context(|| format!("invalid profiles in {}", path.display()))
}

fn parse(contents: &str) -> Result<ProfileBook> {
    Ok(toml::from_str(contents)?)
}
