//! Package descriptors: the `package.json`-shaped file a directory import
//! resolves through. A plain `serde::Deserialize` struct loaded with
//! `serde_json::from_str`, cut down to the three fields the loader actually
//! consults.

use serde::Deserialize;

use crate::host::{Host, HostResult};

/// The fields of a `package.json` the loader cares about. `cadl_main` names
/// the CADL entry point for a directory import, substituting the package
/// field that names it for the usual main field; `main` is the node-style
/// fallback for ordinary external-module resolution.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageDescriptor {
    pub name: Option<String>,
    pub main: Option<String>,
    #[serde(rename = "cadlMain")]
    pub cadl_main: Option<String>,
}

impl PackageDescriptor {
    /// The entry point a directory/package import should resolve to:
    /// `cadlMain` takes priority over `main`.
    pub fn entry_point(&self) -> Option<&str> {
        self.cadl_main.as_deref().or(self.main.as_deref())
    }

    pub fn load(host: &dyn Host, path: &str) -> HostResult<Self> {
        let contents = host.read_file(path)?;
        Ok(serde_json::from_str(&contents.text).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadl_main_takes_priority_over_main() {
        let desc: PackageDescriptor =
            serde_json::from_str(r#"{"name":"lib","main":"dist/index.js","cadlMain":"lib/main.cadl"}"#).unwrap();
        assert_eq!(desc.entry_point(), Some("lib/main.cadl"));
    }

    #[test]
    fn falls_back_to_main_when_cadl_main_absent() {
        let desc: PackageDescriptor = serde_json::from_str(r#"{"main":"dist/index.js"}"#).unwrap();
        assert_eq!(desc.entry_point(), Some("dist/index.js"));
    }
}
