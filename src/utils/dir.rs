use std::{env, io, path::PathBuf};

use anyhow::{anyhow, Result};

const APPLICATION_DIR_NAME: &str = "prodoma";

/// Resolves the directory holding preferences and logs. An explicit directory always wins.
pub fn application_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    let path = match explicit {
        Some(path) => path,
        None => default_application_path()?,
    };

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

#[cfg(windows)]
fn default_application_path() -> Result<PathBuf> {
    let mut path = env::var("APPDATA")
        .map(PathBuf::from)
        .map_err(|_| anyhow!("APPDATA should be present on Windows"))?;
    path.push(APPLICATION_DIR_NAME);
    Ok(path)
}

#[cfg(not(windows))]
fn default_application_path() -> Result<PathBuf> {
    let mut path = env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|_| {
            env::var("HOME").map(|home| {
                let mut path = PathBuf::from(home);
                path.push(".local/state");
                path
            })
        })
        .map_err(|_| anyhow!("Couldn't find neither XDG_STATE_HOME nor HOME"))?;
    path.push(APPLICATION_DIR_NAME);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::application_dir;

    #[test]
    fn explicit_dir_is_created() -> Result<()> {
        let root = tempdir()?;
        let target = root.path().join("nested").join("state");

        let resolved = application_dir(Some(target.clone()))?;

        assert_eq!(resolved, target);
        assert!(target.is_dir());
        Ok(())
    }
}
