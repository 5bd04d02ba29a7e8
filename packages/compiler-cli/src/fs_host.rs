//! A [`Host`] backed by the real filesystem, used by the `cadlc` binary.
//! `std::fs` underneath, collapsed to the flat [`Host`] contract. There is
//! no real JS runtime here: this host never discovers external-module
//! exports on its own and always answers
//! [`Host::get_external_module_exports`] with an empty map, relying on the
//! caller to have registered decorators into a shared registry out-of-band
//! (see `compiler-cli`'s `DecoratorRegistry`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::host::{ExternalExport, FileContents, Host, HostError, HostResult, Stat};
use crate::logging::{LogLevel, Logger};

pub struct FsHost<L: Logger> {
    lib_dirs: Vec<String>,
    logger: L,
}

impl<L: Logger> FsHost<L> {
    pub fn new(logger: L, lib_dirs: Vec<String>) -> Self {
        FsHost { lib_dirs, logger }
    }

    fn normalize(path: &Path) -> String {
        path.to_string_lossy().replace('\\', "/")
    }
}

impl<L: Logger> Host for FsHost<L> {
    fn read_file(&self, path: &str) -> HostResult<FileContents> {
        std::fs::read_to_string(path)
            .map(|text| FileContents { path: path.to_string(), text })
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => HostError::FileNotFound(path.to_string()),
                _ => HostError::Io { path: path.to_string(), source: e },
            })
    }

    fn stat(&self, path: &str) -> HostResult<Stat> {
        let meta = std::fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => HostError::FileNotFound(path.to_string()),
            _ => HostError::Io { path: path.to_string(), source: e },
        })?;
        Ok(Stat { is_file: meta.is_file(), is_directory: meta.is_dir() })
    }

    fn realpath(&self, path: &str) -> HostResult<String> {
        std::fs::canonicalize(path)
            .map(|p| Self::normalize(&p))
            .map_err(|e| HostError::Io { path: path.to_string(), source: e })
    }

    fn get_external_module_exports(&self, _path: &str) -> HostResult<HashMap<String, ExternalExport>> {
        Ok(HashMap::new())
    }

    fn get_lib_dirs(&self) -> Vec<String> {
        self.lib_dirs.clone()
    }

    fn write_file(&self, path: &str, content: &[u8]) -> HostResult<()> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| HostError::Io { path: path.to_string(), source: e })?;
        }
        std::fs::write(path, content).map_err(|e| HostError::Io { path: path.to_string(), source: e })
    }

    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => self.logger.debug(message),
            LogLevel::Info => self.logger.info(message),
            LogLevel::Warn => self.logger.warn(message),
            LogLevel::Error => self.logger.error(message),
        }
    }

    fn resolve_absolute_path(&self, path: &str) -> String {
        let p = Path::new(path);
        if p.is_absolute() {
            Self::normalize(p)
        } else {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            Self::normalize(&cwd.join(p))
        }
    }
}
