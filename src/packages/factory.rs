// src/packages/factory.rs

//! Maps package kinds to their handler types

use crate::packages::integration::IntegrationPackage;
use crate::packages::plugin::PluginPackage;
use crate::packages::traits::{HandlerFactory, PackageHandler};
use crate::packages::{PackageDescription, PackageKind};
use crate::repository::GitSource;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Creates handlers that store payloads under one storage root and fetch
/// them through a shared git source
pub struct GitHubHandlerFactory {
    root: PathBuf,
    source: Arc<dyn GitSource>,
}

impl GitHubHandlerFactory {
    pub fn new(root: &Path, source: Arc<dyn GitSource>) -> Self {
        Self {
            root: root.to_path_buf(),
            source,
        }
    }
}

impl HandlerFactory for GitHubHandlerFactory {
    fn create(&self, description: &PackageDescription) -> Box<dyn PackageHandler> {
        let source = Arc::clone(&self.source);
        match description.kind {
            PackageKind::Integration => {
                Box::new(IntegrationPackage::new(description, &self.root, source))
            }
            PackageKind::Plugin => Box::new(PluginPackage::new(description, &self.root, source)),
        }
    }
}
