use std::{
    ffi::OsString,
    fmt,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::error::{Error, Result};

pub const DATA_DIR_ENV_VAR: &str = "BOOKMARKER_DATA_DIR";

/// Where the data directory setting came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Flag,
    Env,
    Xdg,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Flag => f.write_str("--data-dir"),
            Source::Env => f.write_str(DATA_DIR_ENV_VAR),
            Source::Xdg => f.write_str("XDG data home"),
        }
    }
}

/// The directory holding `bookmarks.db` and `search_index/`.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
    source: Source,
}

impl DataDir {
    /// Resolve the data directory, creating it if needed. In order of
    /// priority:
    /// 1. An explicit path (from --data-dir)
    /// 2. The BOOKMARKER_DATA_DIR environment variable, when non-empty
    /// 3. The XDG data directory (~/.local/share/bookmarker/)
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        Self::resolve_from(explicit, std::env::var_os(DATA_DIR_ENV_VAR))
    }

    fn resolve_from(
        explicit: Option<&Path>,
        env: Option<OsString>,
    ) -> Result<Self> {
        let (root, source) = match (explicit, env) {
            (Some(path), _) => (path.to_path_buf(), Source::Flag),
            (None, Some(value)) if !value.is_empty() => {
                (PathBuf::from(value), Source::Env)
            }
            _ => (xdg_data_home()?, Source::Xdg),
        };

        ensure_dir(&root)?;
        tracing::debug!(root = %root.display(), %source, "data directory");
        Ok(Self { root, source })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn bookmarks_db(&self) -> PathBuf {
        self.root.join("bookmarks.db")
    }

    /// The search index directory, created on first use.
    pub fn index_dir(&self) -> Result<PathBuf> {
        let path = self.root.join("search_index");
        ensure_dir(&path)?;
        Ok(path)
    }
}

fn xdg_data_home() -> Result<PathBuf> {
    xdg::BaseDirectories::with_prefix("bookmarker")
        .get_data_home()
        .ok_or_else(|| {
            Error::Config("could not determine XDG data home directory".into())
        })
}

fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .map_err(|_| Error::DataDir(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins_over_env() {
        let flag = tempfile::tempdir().unwrap();
        let env = tempfile::tempdir().unwrap();

        let dir = DataDir::resolve_from(
            Some(flag.path()),
            Some(env.path().as_os_str().to_owned()),
        )
        .unwrap();

        assert_eq!(dir.root(), flag.path());
        assert_eq!(dir.source(), Source::Flag);
        assert_eq!(dir.bookmarks_db(), flag.path().join("bookmarks.db"));
    }

    #[test]
    fn env_is_used_without_flag() {
        let env = tempfile::tempdir().unwrap();
        let root = env.path().join("from-env");

        let dir =
            DataDir::resolve_from(None, Some(root.clone().into_os_string()))
                .unwrap();

        assert_eq!(dir.root(), root);
        assert_eq!(dir.source(), Source::Env);
        assert!(root.is_dir());
    }

    #[test]
    fn resolve_creates_missing_root() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        let dir = DataDir::resolve(Some(&nested)).unwrap();

        assert!(dir.root().is_dir());
    }

    #[test]
    fn unusable_root_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("occupied");
        std::fs::write(&file, "not a directory").unwrap();

        let err = DataDir::resolve(Some(&file)).unwrap_err();
        assert!(matches!(err, Error::DataDir(path) if path == file));
    }

    #[test]
    fn index_dir_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DataDir::resolve(Some(tmp.path())).unwrap();
        let index = dir.index_dir().unwrap();

        assert!(index.is_dir());
        assert_eq!(index, tmp.path().join("search_index"));
    }

    #[test]
    fn source_names_the_setting() {
        assert_eq!(Source::Flag.to_string(), "--data-dir");
        assert_eq!(Source::Env.to_string(), "BOOKMARKER_DATA_DIR");
    }
}
