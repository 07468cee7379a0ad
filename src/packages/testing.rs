// src/packages/testing.rs

//! In-memory doubles for git sources and handlers used by unit tests

use crate::error::{Error, Result};
use crate::packages::traits::{HandlerFactory, PackageHandler};
use crate::packages::PackageDescription;
use crate::repository::GitSource;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Build a gzipped tarball from `(path, content)` pairs
pub fn tarball(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Git source backed by maps; anything not registered is not found
#[derive(Default)]
pub struct FakeSource {
    tags: Mutex<HashMap<String, Vec<String>>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tags(&self, full_name: &str, tags: &[&str]) {
        self.tags.lock().unwrap().insert(
            full_name.to_string(),
            tags.iter().map(|t| t.to_string()).collect(),
        );
    }

    pub fn add_tarball(&self, full_name: &str, git_ref: &str, content: Vec<u8>) {
        self.insert(format!("tarball:{}@{}", full_name, git_ref), content);
    }

    pub fn add_tree_file(&self, full_name: &str, git_ref: &str, path: &str, content: &[u8]) {
        self.insert(format!("tree:{}@{}:{}", full_name, git_ref, path), content.to_vec());
    }

    pub fn add_release_file(&self, full_name: &str, tag: &str, file: &str, content: &[u8]) {
        self.insert(format!("release:{}@{}:{}", full_name, tag, file), content.to_vec());
    }

    fn insert(&self, key: String, content: Vec<u8>) {
        self.files.lock().unwrap().insert(key, content);
    }

    fn file(&self, key: String) -> Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or(Error::NotFoundError(key))
    }
}

impl GitSource for FakeSource {
    fn tags(&self, full_name: &str) -> Result<Vec<String>> {
        self.tags
            .lock()
            .unwrap()
            .get(full_name)
            .cloned()
            .ok_or_else(|| Error::NotFoundError(format!("repository {}", full_name)))
    }

    fn tree_file(&self, full_name: &str, git_ref: &str, path: &str) -> Result<Vec<u8>> {
        self.file(format!("tree:{}@{}:{}", full_name, git_ref, path))
    }

    fn release_file(&self, full_name: &str, tag: &str, filename: &str) -> Result<Vec<u8>> {
        self.file(format!("release:{}@{}:{}", full_name, tag, filename))
    }

    fn tarball(&self, full_name: &str, git_ref: &str) -> Result<Vec<u8>> {
        self.file(format!("tarball:{}@{}", full_name, git_ref))
    }
}

/// Shared state behind `RecordingFactory` and the handlers it creates
#[derive(Default)]
pub struct Recorder {
    /// `operation name@version` in call order
    pub calls: Vec<String>,
    /// Packages whose payload exists, `name -> version`
    pub installed: HashMap<String, String>,
    /// `operation name` pairs that fail when called
    pub failures: HashSet<String>,
    /// Latest version per package; unknown packages are not found
    pub latest: HashMap<String, String>,
}

/// Factory for handlers that only record what they are asked to do
#[derive(Clone, Default)]
pub struct RecordingFactory {
    pub state: Arc<Mutex<Recorder>>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, operation: &str, full_name: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(format!("{} {}", operation, full_name));
    }

    pub fn set_installed(&self, full_name: &str, version: &str) {
        self.state
            .lock()
            .unwrap()
            .installed
            .insert(full_name.to_string(), version.to_string());
    }

    pub fn set_latest(&self, full_name: &str, version: &str) {
        self.state
            .lock()
            .unwrap()
            .latest
            .insert(full_name.to_string(), version.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn installed(&self) -> HashMap<String, String> {
        self.state.lock().unwrap().installed.clone()
    }
}

impl HandlerFactory for RecordingFactory {
    fn create(&self, description: &PackageDescription) -> Box<dyn PackageHandler> {
        Box::new(RecordingHandler {
            full_name: description.full_name.clone(),
            version: description.version.clone(),
            state: Arc::clone(&self.state),
        })
    }
}

pub struct RecordingHandler {
    full_name: String,
    version: String,
    state: Arc<Mutex<Recorder>>,
}

impl RecordingHandler {
    fn record(&self, operation: &str, version: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("{} {}@{}", operation, self.full_name, version));
        if state
            .failures
            .contains(&format!("{} {}", operation, self.full_name))
        {
            return Err(Error::DownloadError(format!(
                "{} of {} failed",
                operation, self.full_name
            )));
        }
        Ok(())
    }
}

impl PackageHandler for RecordingHandler {
    fn initialize(&mut self) -> Result<()> {
        self.record("initialize", &self.version)?;
        self.state
            .lock()
            .unwrap()
            .installed
            .insert(self.full_name.clone(), self.version.clone());
        Ok(())
    }

    fn load(&mut self) -> Result<()> {
        self.record("load", &self.version)?;
        let state = self.state.lock().unwrap();
        match state.installed.get(&self.full_name) {
            Some(version) if *version == self.version => Ok(()),
            _ => Err(Error::NotFoundError(format!("{} payload", self.full_name))),
        }
    }

    fn switch(&mut self, version: &str) -> Result<()> {
        self.record("switch", version)?;
        self.version = version.to_string();
        self.state
            .lock()
            .unwrap()
            .installed
            .insert(self.full_name.clone(), self.version.clone());
        Ok(())
    }

    fn destroy(&mut self) -> Result<()> {
        self.record("destroy", &self.version)?;
        self.state.lock().unwrap().installed.remove(&self.full_name);
        Ok(())
    }

    fn latest_version(&self, _stable_only: bool) -> Result<String> {
        self.record("latest", &self.version)?;
        self.state
            .lock()
            .unwrap()
            .latest
            .get(&self.full_name)
            .cloned()
            .ok_or_else(|| Error::NotFoundError(format!("tags of {}", self.full_name)))
    }

    fn export(&self, _target: &Path) -> Result<()> {
        self.record("export", &self.version)
    }
}
