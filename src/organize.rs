use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::TimeDelta;

use crate::error::{FilesystemError, Result};
use crate::geocode::{GeocodeService, PlaceNameResolver};
use crate::photo_metadata::{MetadataSource, PhotoMetadata, PhotoRecord};
use crate::segment::{OrganizationPlan, VisitSegmenter};

/// Which directory entries count as photos.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameFilter {
    /// Must appear somewhere in the name.
    pub prefix: String,
    /// Case-insensitive suffix, usually the extension.
    pub file_type: Option<String>,
    pub exclusion: Option<String>,
}

impl NameFilter {
    pub fn matches(&self, name: &str) -> bool {
        let typed = self
            .file_type
            .as_ref()
            .map_or(true, |t| name.to_lowercase().ends_with(&t.to_lowercase()));
        let excluded = self
            .exclusion
            .as_ref()
            .is_some_and(|e| name.contains(e.as_str()));
        name.contains(&self.prefix) && typed && !excluded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderStatus {
    Created,
    AlreadyExists,
}

pub trait FileStore {
    /// File names directly under `directory`, sorted.
    fn list_files(
        &self,
        directory: &Path,
        filter: &NameFilter,
    ) -> std::result::Result<Vec<String>, FilesystemError>;

    fn create_folder(&self, path: &Path) -> std::result::Result<FolderStatus, FilesystemError>;

    fn move_file(
        &self,
        source: &Path,
        destination: &Path,
    ) -> std::result::Result<(), FilesystemError>;
}

/// The local disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileStore;

impl FileStore for LocalFileStore {
    fn list_files(
        &self,
        directory: &Path,
        filter: &NameFilter,
    ) -> std::result::Result<Vec<String>, FilesystemError> {
        let list_err = |reason: String| FilesystemError::List {
            path: directory.to_path_buf(),
            reason,
        };
        if !directory.is_dir() {
            return Err(list_err("not a directory".to_string()));
        }

        let walker = globwalk::GlobWalkerBuilder::from_patterns(directory, &["*"])
            .max_depth(1)
            .file_type(globwalk::FileType::FILE)
            .build()
            .map_err(|e| list_err(e.to_string()))?;

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| list_err(e.to_string()))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if filter.matches(&name) {
                files.push(name);
            }
        }
        files.sort();
        Ok(files)
    }

    fn create_folder(&self, path: &Path) -> std::result::Result<FolderStatus, FilesystemError> {
        if path.is_dir() {
            return Ok(FolderStatus::AlreadyExists);
        }
        fs::create_dir_all(path).map_err(|source| FilesystemError::CreateFolder {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(FolderStatus::Created)
    }

    fn move_file(
        &self,
        source: &Path,
        destination: &Path,
    ) -> std::result::Result<(), FilesystemError> {
        let move_err = |e: io::Error| FilesystemError::Move {
            from: source.to_path_buf(),
            to: destination.to_path_buf(),
            source: e,
        };
        if fs::rename(source, destination).is_ok() {
            return Ok(());
        }
        // rename cannot cross filesystems
        fs::copy(source, destination).map_err(move_err)?;
        fs::remove_file(source).map_err(move_err)
    }
}

/// Where the extracted metadata goes before anything is moved.
pub trait AuditSink {
    fn persist(&self, records: &[PhotoMetadata]) -> io::Result<()>;
}

/// Pretty-printed JSON array in a single file.
pub struct JsonAuditSink {
    path: PathBuf,
}

impl JsonAuditSink {
    pub fn new(path: &Path) -> JsonAuditSink {
        JsonAuditSink {
            path: path.to_path_buf(),
        }
    }
}

impl AuditSink for JsonAuditSink {
    fn persist(&self, records: &[PhotoMetadata]) -> io::Result<()> {
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, records)?;
        writer.flush()?;
        tracing::info!("Exif data stored in {}", self.path.display());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct OrganizeReport {
    pub folders_created: usize,
    pub folders_existing: usize,
    pub files_moved: usize,
    pub failures: Vec<FilesystemError>,
}

/// Drives a whole run: list, extract, group, then create folders and move.
pub struct Organizer<'a, G> {
    root: PathBuf,
    filter: NameFilter,
    threshold: TimeDelta,
    metadata: &'a dyn MetadataSource,
    resolver: &'a PlaceNameResolver<G>,
    store: &'a dyn FileStore,
    audit: &'a dyn AuditSink,
}

impl<'a, G: GeocodeService> Organizer<'a, G> {
    pub fn new(
        root: &Path,
        filter: NameFilter,
        threshold: TimeDelta,
        metadata: &'a dyn MetadataSource,
        resolver: &'a PlaceNameResolver<G>,
        store: &'a dyn FileStore,
        audit: &'a dyn AuditSink,
    ) -> Organizer<'a, G> {
        Organizer {
            root: root.to_path_buf(),
            filter,
            threshold,
            metadata,
            resolver,
            store,
            audit,
        }
    }

    /// Reads every photo and groups them. Nothing on disk changes.
    pub fn plan(&self) -> Result<(Vec<PhotoMetadata>, OrganizationPlan)> {
        let files = self.store.list_files(&self.root, &self.filter)?;
        tracing::info!("Found {} photos in {}", files.len(), self.root.display());

        let mut dump = Vec::with_capacity(files.len());
        for file in files {
            let mut metadata = self.metadata.extract(&self.root.join(&file))?;
            tracing::debug!("{} taken at {}", file, metadata.record.timestamp);
            metadata.record.file_name = file;
            dump.push(metadata);
        }

        let records: Vec<PhotoRecord> = dump.iter().map(|m| m.record.clone()).collect();
        let visits = VisitSegmenter::new(self.resolver, self.threshold).segment(&records)?;
        let plan = OrganizationPlan::from(visits);
        tracing::info!("{} photos grouped into {} places", records.len(), plan.len());
        Ok((dump, plan))
    }

    /// Creates every folder, then moves every file. Failures are collected,
    /// not fatal, and nothing already moved is rolled back.
    pub fn apply(&self, plan: &OrganizationPlan) -> OrganizeReport {
        let mut report = OrganizeReport::default();

        for label in plan.labels() {
            match self.store.create_folder(&self.root.join(label)) {
                Ok(FolderStatus::Created) => {
                    tracing::info!("Folder '{}' created in '{}'", label, self.root.display());
                    report.folders_created += 1;
                }
                Ok(FolderStatus::AlreadyExists) => {
                    tracing::debug!("Folder '{}' already exists", label);
                    report.folders_existing += 1;
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    report.failures.push(e);
                }
            }
        }

        for (label, files) in plan.iter() {
            for file in files {
                let source = self.root.join(file);
                let destination = self.root.join(label).join(file);
                match self.store.move_file(&source, &destination) {
                    Ok(()) => {
                        tracing::debug!("Moved {} to {}", file, label);
                        report.files_moved += 1;
                    }
                    Err(e) => {
                        tracing::warn!("{}", e);
                        report.failures.push(e);
                    }
                }
            }
        }

        report
    }

    pub fn run(&self) -> Result<OrganizeReport> {
        let (dump, plan) = self.plan()?;
        if let Err(e) = self.audit.persist(&dump) {
            tracing::warn!("Unable to store exif data: {}", e);
        }
        if plan.is_empty() {
            tracing::info!("Nothing to organize in {}", self.root.display());
            return Ok(OrganizeReport::default());
        }
        Ok(self.apply(&plan))
    }
}
