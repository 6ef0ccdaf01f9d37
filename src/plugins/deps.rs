//! Declared plugin dependencies and their resolution.
//!
//! Plugins are linked into the binary, so the packages they can depend on
//! are the ones the host knows at build time. A resolver maps a package
//! name to the version available.

use semver::{Version, VersionReq};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

use crate::error::PluginError;

/// A package a plugin needs, with the versions it accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub requirement: VersionReq,
}

impl Dependency {
    pub fn new(name: impl Into<String>, requirement: &str) -> Result<Self, semver::Error> {
        Ok(Self {
            name: name.into(),
            requirement: VersionReq::parse(requirement)?,
        })
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.requirement)
    }
}

/// Looks up the version of a package available to plugins.
pub trait DependencyResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Version>;
}

/// Resolver backed by a fixed package table.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    packages: HashMap<String, Version>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packages shipped with this binary.
    pub fn builtin() -> Self {
        let mut resolver = Self::new();
        for (name, version) in [
            ("slirc-bot", crate::VERSION),
            ("slirc-proto", slirc_proto::VERSION),
        ] {
            match Version::parse(version) {
                Ok(version) => {
                    resolver.packages.insert(name.to_string(), version);
                }
                Err(e) => warn!(package = name, error = %e, "unparseable package version"),
            }
        }
        resolver
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, version: Version) -> Self {
        self.packages.insert(name.into(), version);
        self
    }
}

impl DependencyResolver for StaticResolver {
    fn resolve(&self, name: &str) -> Option<Version> {
        self.packages.get(name).cloned()
    }
}

/// Check every dependency of `plugin`, failing on the first one that is
/// absent or too old/new.
pub fn check(
    resolver: &dyn DependencyResolver,
    plugin: &str,
    dependencies: &[Dependency],
) -> Result<(), PluginError> {
    for dep in dependencies {
        let satisfied = resolver
            .resolve(&dep.name)
            .is_some_and(|version| dep.requirement.matches(&version));
        if !satisfied {
            return Err(PluginError::MissingDependency {
                plugin: plugin.to_string(),
                dependency: dep.name.clone(),
                requirement: dep.requirement.to_string(),
            });
        }
    }
    Ok(())
}
