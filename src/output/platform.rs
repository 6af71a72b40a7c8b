//! Desktop stand-ins for the platform share sheet, photo library and permission prompts

use crate::config::{OutputOptions, PhotoOptions};
use crate::error::PhotoAccess;
use std::io;
use std::path::{Path, PathBuf};

/// Native mechanism handing a file to another application
#[async_trait::async_trait]
pub trait ShareTarget: Send + Sync {
    /// Share the file at `path`.
    async fn share(&self, path: &Path) -> io::Result<()>;
}

/// Persistent store of the user's images
#[async_trait::async_trait]
pub trait MediaLibrary: Send + Sync {
    /// Import the file at `path`, returning where the library stored it.
    async fn import(&self, path: &Path) -> io::Result<PathBuf>;
}

/// Boolean capability checks standing in for permission dialogs
pub trait PermissionGate: Send + Sync {
    /// Whether the given photo library access is granted.
    fn granted(&self, access: PhotoAccess) -> bool;
}

/// Shares by launching an external program with the file path as its only argument
#[derive(Debug, Clone)]
pub struct CommandShare {
    program: String,
}

impl CommandShare {
    /// Launch `program` for every share.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Build from output options.
    pub fn from_options(options: &OutputOptions) -> Self {
        Self::new(options.share_command.clone())
    }
}

#[async_trait::async_trait]
impl ShareTarget for CommandShare {
    async fn share(&self, path: &Path) -> io::Result<()> {
        tracing::debug!(program = %self.program, path = %path.display(), "Launching share command");
        let status = tokio::process::Command::new(&self.program)
            .arg(path)
            .status()
            .await?;

        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!(
                "share command '{}' exited with {status}",
                self.program
            )))
        }
    }
}

/// Photo library backed by a plain directory
#[derive(Debug, Clone)]
pub struct DirectoryLibrary {
    dir: PathBuf,
}

impl DirectoryLibrary {
    /// Store imported images under `dir`, creating it on first import.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Library root
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait::async_trait]
impl MediaLibrary for DirectoryLibrary {
    async fn import(&self, path: &Path) -> io::Result<PathBuf> {
        let file_name = path.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no file name", path.display()),
            )
        })?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let destination = self.dir.join(file_name);
        tokio::fs::copy(path, &destination).await?;
        Ok(destination)
    }
}

/// Permission grants read from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfiguredPermissions {
    /// Logo picking allowed
    pub read: bool,
    /// Saving allowed
    pub write: bool,
}

impl ConfiguredPermissions {
    /// Grant everything.
    pub fn allow_all() -> Self {
        Self {
            read: true,
            write: true,
        }
    }

    /// Build from photo options.
    pub fn from_options(options: &PhotoOptions) -> Self {
        Self {
            read: options.allow_read,
            write: options.allow_write,
        }
    }
}

impl PermissionGate for ConfiguredPermissions {
    fn granted(&self, access: PhotoAccess) -> bool {
        match access {
            PhotoAccess::Read => self.read,
            PhotoAccess::Write => self.write,
        }
    }
}
