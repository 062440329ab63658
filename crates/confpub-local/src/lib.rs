//! Simulated Confluence backend on the local filesystem.
//!
//! [`LocalBackend`] implements [`Backend`] over a directory tree so that a dry
//! run walks through exactly the same publishing protocol as a real publish:
//!
//! ```text
//! {base}/
//! └── {space}/
//!     └── {sanitized-title}/
//!         ├── metadata.json
//!         ├── content.html
//!         ├── attachments/
//!         └── {child-title}/
//!             └── ...
//! ```
//!
//! Lookups go through an in-memory index first and fall back to walking the
//! base directory, so a fresh instance rediscovers pages written by an earlier
//! run.
//!
//! Unlike Confluence, [`create`](Backend::create) never reports
//! `AlreadyExists`: an existing record with the same `(space, title)` is
//! replaced in place. The new record takes over its directory and child
//! pages; its stored attachments are dropped.

mod record;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use confpub_backend::{Attachment, Backend, BackendError, BackendErrorKind, RemotePage};
use record::{ATTACHMENTS_DIR, PageRecord, io_error, sanitize_title, walk_page_dirs, write_content};

/// Backend identifier for error messages.
pub(crate) const BACKEND: &str = "Local";

/// Index of known page directories.
#[derive(Debug, Default)]
struct PageIndex {
    /// Page id to page directory.
    dirs: HashMap<String, PathBuf>,
    /// `(space, title)` to page id.
    titles: HashMap<(String, String), String>,
}

impl PageIndex {
    fn insert(&mut self, record: &PageRecord, dir: PathBuf) {
        self.dirs.insert(record.id.clone(), dir);
        self.titles
            .insert((record.space.clone(), record.title.clone()), record.id.clone());
    }

    fn remove(&mut self, record: &PageRecord) {
        self.dirs.remove(&record.id);
        self.titles
            .remove(&(record.space.clone(), record.title.clone()));
    }

    /// Move every indexed directory under `from` to the same place under `to`.
    fn rebase(&mut self, from: &Path, to: &Path) {
        for dir in self.dirs.values_mut() {
            if let Ok(rest) = dir.strip_prefix(from) {
                *dir = to.join(rest);
            }
        }
    }
}

/// Filesystem-backed [`Backend`] used for dry runs.
///
/// The index belongs to this instance only; two instances over the same
/// directory see each other's pages through the directory walk. Every
/// operation runs on the blocking thread pool.
pub struct LocalBackend {
    store: Arc<PageStore>,
}

impl LocalBackend {
    /// Create a backend rooted at `base_dir`.
    ///
    /// The directory is created lazily on the first write.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: Arc::new(PageStore {
                base_dir: base_dir.into(),
                index: Mutex::new(PageIndex::default()),
            }),
        }
    }

    /// Root directory of the simulated instance.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.store.base_dir
    }

    /// Directory of the page with the given id, if it exists.
    ///
    /// Blocks on the filesystem.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no page has this id.
    pub fn page_dir(&self, page_id: &str) -> Result<PathBuf, BackendError> {
        self.store.locate(page_id).map(|(dir, _)| dir)
    }

    /// Run a store operation on the blocking pool.
    async fn blocking<T, F>(&self, target: String, op: F) -> Result<T, BackendError>
    where
        T: Send + 'static,
        F: FnOnce(&PageStore) -> Result<T, BackendError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| {
                BackendError::new(BackendErrorKind::Other)
                    .with_backend(BACKEND)
                    .with_target(target)
                    .with_message("blocking task failed")
                    .with_source(e)
            })?
    }
}

/// Page directories under one base directory.
struct PageStore {
    /// Root directory of the simulated instance.
    base_dir: PathBuf,
    /// Page directory index.
    index: Mutex<PageIndex>,
}

impl PageStore {
    /// Find a page directory and record by id.
    fn locate(&self, page_id: &str) -> Result<(PathBuf, PageRecord), BackendError> {
        let cached = self.index.lock().unwrap().dirs.get(page_id).cloned();
        if let Some(dir) = cached {
            match PageRecord::read(&dir) {
                Ok(record) if record.id == page_id => return Ok((dir, record)),
                _ => debug!(page_id, dir = %dir.display(), "stale index entry"),
            }
        }

        for dir in walk_page_dirs(&self.base_dir) {
            let Ok(record) = PageRecord::read(&dir) else {
                continue;
            };
            let found = record.id == page_id;
            self.index.lock().unwrap().insert(&record, dir.clone());
            if found {
                return Ok((dir, record));
            }
        }

        Err(BackendError::not_found(page_id).with_backend(BACKEND))
    }

    /// Find a page directory and record by `(space, title)`.
    fn locate_by_title(&self, space: &str, title: &str) -> Option<(PathBuf, PageRecord)> {
        let key = (space.to_owned(), title.to_owned());
        let cached = {
            let index = self.index.lock().unwrap();
            index
                .titles
                .get(&key)
                .and_then(|id| index.dirs.get(id))
                .cloned()
        };
        if let Some(dir) = cached {
            if let Ok(record) = PageRecord::read(&dir)
                && record.space == space
                && record.title == title
            {
                debug!(space, title, "index hit");
                return Some((dir, record));
            }
            debug!(space, title, dir = %dir.display(), "stale index entry");
            self.index.lock().unwrap().titles.remove(&key);
        }

        let mut found = None;
        for dir in walk_page_dirs(&self.base_dir) {
            let record = match PageRecord::read(&dir) {
                Ok(record) => record,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Skipping unreadable page record");
                    continue;
                }
            };
            self.index.lock().unwrap().insert(&record, dir.clone());
            if found.is_none() && record.space == space && record.title == title {
                found = Some((dir, record));
            }
        }
        found
    }

    /// Choose a directory for a new page under `parent_dir`.
    fn new_page_dir(parent_dir: &Path, title: &str, id: &str) -> PathBuf {
        let dir = parent_dir.join(sanitize_title(title));
        if dir.exists() {
            // Another title sanitized to the same name
            let short_id = id.get(..8).unwrap_or(id);
            return parent_dir.join(format!("{}-{short_id}", sanitize_title(title)));
        }
        dir
    }

    /// Rename a page directory after a title change.
    ///
    /// Returns the directory the page lives in afterwards.
    fn rename_page_dir(&self, dir: &Path, new_title: &str) -> Result<PathBuf, BackendError> {
        let Some(parent) = dir.parent() else {
            return Ok(dir.to_path_buf());
        };
        let target = parent.join(sanitize_title(new_title));
        if target == dir {
            return Ok(dir.to_path_buf());
        }
        if target.exists() {
            warn!(
                from = %dir.display(),
                to = %target.display(),
                "Rename target exists, keeping page directory in place"
            );
            return Ok(dir.to_path_buf());
        }

        fs::rename(dir, &target).map_err(|e| io_error(e, dir))?;
        self.index.lock().unwrap().rebase(dir, &target);
        debug!(from = %dir.display(), to = %target.display(), "renamed page directory");
        Ok(target)
    }

    /// Take over the directory of a page that is being created again.
    ///
    /// Child page directories stay and are re-pointed at `new_id`; stored
    /// attachments are dropped. The directory moves under `parent_dir` when
    /// the page is created under another parent. Returns the directory the
    /// new record goes into.
    fn reuse_page_dir(
        &self,
        stale_dir: &Path,
        stale: &PageRecord,
        parent_dir: &Path,
        new_id: &str,
    ) -> Result<PathBuf, BackendError> {
        warn!(
            space = %stale.space,
            title = %stale.title,
            page_id = %stale.id,
            dir = %stale_dir.display(),
            "Replacing existing page record"
        );

        let attachments_dir = stale_dir.join(ATTACHMENTS_DIR);
        match fs::remove_dir_all(&attachments_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(e, &attachments_dir)),
        }
        self.index.lock().unwrap().remove(stale);

        for child_dir in walk_page_dirs(stale_dir) {
            if child_dir == stale_dir {
                continue;
            }
            let Ok(mut child) = PageRecord::read(&child_dir) else {
                continue;
            };
            if child.parent_id.as_deref() == Some(stale.id.as_str()) {
                child.parent_id = Some(new_id.to_owned());
                child.write(&child_dir)?;
                self.index.lock().unwrap().insert(&child, child_dir);
            }
        }

        // A page cannot move into its own subtree
        if stale_dir.parent() == Some(parent_dir) || parent_dir.starts_with(stale_dir) {
            return Ok(stale_dir.to_path_buf());
        }
        let target = Self::new_page_dir(parent_dir, &stale.title, new_id);
        fs::create_dir_all(parent_dir).map_err(|e| io_error(e, parent_dir))?;
        fs::rename(stale_dir, &target).map_err(|e| io_error(e, stale_dir))?;
        self.index.lock().unwrap().rebase(stale_dir, &target);
        debug!(from = %stale_dir.display(), to = %target.display(), "moved page directory");
        Ok(target)
    }

    fn find_by_title(&self, space: &str, title: &str) -> Result<Option<RemotePage>, BackendError> {
        match self.locate_by_title(space, title) {
            Some((dir, record)) => record.to_page(&dir).map(Some),
            None => Ok(None),
        }
    }

    fn create(
        &self,
        space: &str,
        title: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> Result<RemotePage, BackendError> {
        let parent_dir = match parent_id {
            Some(parent_id) => self.locate(parent_id)?.0,
            None => self.base_dir.join(sanitize_title(space)),
        };

        let record = PageRecord {
            id: Uuid::new_v4().to_string(),
            title: title.to_owned(),
            space: space.to_owned(),
            parent_id: parent_id.map(str::to_owned),
            version: 1,
            attachments: BTreeMap::new(),
        };
        let dir = match self.locate_by_title(space, title) {
            Some((stale_dir, stale)) => {
                self.reuse_page_dir(&stale_dir, &stale, &parent_dir, &record.id)?
            }
            None => Self::new_page_dir(&parent_dir, title, &record.id),
        };
        let attachments_dir = dir.join(ATTACHMENTS_DIR);
        fs::create_dir_all(&attachments_dir).map_err(|e| io_error(e, &attachments_dir))?;
        write_content(&dir, content)?;
        record.write(&dir)?;

        info!(space, title, page_id = %record.id, dir = %dir.display(), "Created page");
        let page = record.to_page(&dir)?;
        self.index.lock().unwrap().insert(&record, dir);
        Ok(page)
    }

    fn update(
        &self,
        page_id: &str,
        title: &str,
        content: &str,
        expected_version: u32,
    ) -> Result<RemotePage, BackendError> {
        let (dir, mut record) = self.locate(page_id)?;
        if record.version != expected_version {
            return Err(
                BackendError::version_conflict(page_id, expected_version, record.version)
                    .with_backend(BACKEND),
            );
        }

        let dir = if record.title == title {
            dir
        } else {
            let moved = self.rename_page_dir(&dir, title)?;
            self.index.lock().unwrap().remove(&record);
            moved
        };

        record.title = title.to_owned();
        record.version += 1;
        write_content(&dir, content)?;
        record.write(&dir)?;

        info!(
            space = %record.space,
            title,
            page_id,
            version = record.version,
            "Updated page"
        );
        let page = record.to_page(&dir)?;
        self.index.lock().unwrap().insert(&record, dir);
        Ok(page)
    }

    fn upload_attachment(
        &self,
        page_id: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<Attachment, BackendError> {
        if filename.is_empty()
            || filename.contains(['/', '\\'])
            || filename == "."
            || filename == ".."
        {
            return Err(BackendError::new(BackendErrorKind::InvalidInput)
                .with_backend(BACKEND)
                .with_target(page_id)
                .with_message(format!("invalid attachment filename {filename:?}")));
        }

        let (dir, mut record) = self.locate(page_id)?;
        let attachments_dir = dir.join(ATTACHMENTS_DIR);
        fs::create_dir_all(&attachments_dir).map_err(|e| io_error(e, &attachments_dir))?;
        let path = attachments_dir.join(filename);
        fs::write(&path, data).map_err(|e| io_error(e, &path))?;

        let relative = format!("{ATTACHMENTS_DIR}/{filename}");
        record.attachments.insert(filename.to_owned(), relative.clone());
        record.write(&dir)?;

        debug!(page_id, filename, size = data.len(), "stored attachment");
        Ok(Attachment {
            id: relative,
            filename: filename.to_owned(),
            page_id: page_id.to_owned(),
            size: Some(data.len() as u64),
        })
    }

    fn list_attachments(&self, page_id: &str) -> Result<Vec<Attachment>, BackendError> {
        let (dir, record) = self.locate(page_id)?;
        Ok(record
            .attachments
            .into_iter()
            .map(|(filename, relative)| Attachment {
                size: fs::metadata(dir.join(&relative)).ok().map(|m| m.len()),
                id: relative,
                filename,
                page_id: page_id.to_owned(),
            })
            .collect())
    }
}

#[async_trait]
impl Backend for LocalBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn find_by_title(
        &self,
        space: &str,
        title: &str,
    ) -> Result<Option<RemotePage>, BackendError> {
        let (owned_space, owned_title) = (space.to_owned(), title.to_owned());
        self.blocking(format!("{space}/{title}"), move |store| {
            store.find_by_title(&owned_space, &owned_title)
        })
        .await
    }

    async fn create(
        &self,
        space: &str,
        title: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> Result<RemotePage, BackendError> {
        let (owned_space, owned_title, owned_content) =
            (space.to_owned(), title.to_owned(), content.to_owned());
        let parent_id = parent_id.map(str::to_owned);
        self.blocking(format!("{space}/{title}"), move |store| {
            store.create(
                &owned_space,
                &owned_title,
                &owned_content,
                parent_id.as_deref(),
            )
        })
        .await
    }

    async fn update(
        &self,
        page_id: &str,
        title: &str,
        content: &str,
        expected_version: u32,
    ) -> Result<RemotePage, BackendError> {
        let (owned_id, owned_title, owned_content) =
            (page_id.to_owned(), title.to_owned(), content.to_owned());
        self.blocking(page_id.to_owned(), move |store| {
            store.update(&owned_id, &owned_title, &owned_content, expected_version)
        })
        .await
    }

    async fn upload_attachment(
        &self,
        page_id: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<Attachment, BackendError> {
        let (owned_id, owned_filename, data) =
            (page_id.to_owned(), filename.to_owned(), data.to_vec());
        self.blocking(page_id.to_owned(), move |store| {
            store.upload_attachment(&owned_id, &owned_filename, &data)
        })
        .await
    }

    async fn list_attachments(&self, page_id: &str) -> Result<Vec<Attachment>, BackendError> {
        let owned_id = page_id.to_owned();
        self.blocking(page_id.to_owned(), move |store| {
            store.list_attachments(&owned_id)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use record::{CONTENT_FILE, METADATA_FILE};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_local_backend_is_send_sync() {
        assert_send_sync::<LocalBackend>();
    }

    fn setup() -> (tempfile::TempDir, LocalBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());
        (dir, backend)
    }

    #[tokio::test]
    async fn test_find_in_empty_backend() {
        let (_dir, backend) = setup();

        assert_eq!(backend.find_by_title("DOCS", "Home").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_writes_layout() {
        let (dir, backend) = setup();

        let page = backend
            .create("DOCS", "Getting Started", "<p>hi</p>", None)
            .await
            .unwrap();

        let page_dir = dir.path().join("DOCS").join("Getting_Started");
        assert_eq!(page.version, 1);
        assert_eq!(page.parent_id, None);
        assert!(Uuid::parse_str(&page.id).is_ok());
        assert!(page_dir.join(METADATA_FILE).is_file());
        assert!(page_dir.join(ATTACHMENTS_DIR).is_dir());
        assert_eq!(
            fs::read_to_string(page_dir.join(CONTENT_FILE)).unwrap(),
            "<p>hi</p>"
        );
        assert_eq!(backend.page_dir(&page.id).unwrap(), page_dir);
    }

    #[tokio::test]
    async fn test_child_nests_under_parent_dir() {
        let (dir, backend) = setup();
        let root = backend.create("DOCS", "Root", "r", None).await.unwrap();

        let child = backend
            .create("DOCS", "Child", "c", Some(&root.id))
            .await
            .unwrap();

        assert_eq!(child.parent_id.as_deref(), Some(root.id.as_str()));
        assert_eq!(
            backend.page_dir(&child.id).unwrap(),
            dir.path().join("DOCS").join("Root").join("Child")
        );
    }

    #[tokio::test]
    async fn test_create_with_unknown_parent() {
        let (_dir, backend) = setup();

        let err = backend
            .create("DOCS", "Child", "c", Some("missing"))
            .await
            .unwrap_err();

        assert!(err.is(BackendErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_find_returns_created_page() {
        let (_dir, backend) = setup();
        let created = backend.create("DOCS", "Home", "<p>x</p>", None).await.unwrap();

        let found = backend.find_by_title("DOCS", "Home").await.unwrap();

        assert_eq!(found, Some(created));
        assert_eq!(backend.find_by_title("OPS", "Home").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_second_instance_rediscovers_from_disk() {
        let (dir, backend) = setup();
        let root = backend.create("DOCS", "Root", "r", None).await.unwrap();
        let child = backend
            .create("DOCS", "Child", "c", Some(&root.id))
            .await
            .unwrap();

        let fresh = LocalBackend::new(dir.path());

        assert_eq!(fresh.find_by_title("DOCS", "Child").await.unwrap(), Some(child.clone()));
        let updated = fresh.update(&child.id, "Child", "c2", 1).await.unwrap();
        assert_eq!(updated.version, 2);
    }

    #[tokio::test]
    async fn test_update_increments_version() {
        let (_dir, backend) = setup();
        let page = backend.create("DOCS", "Home", "v1", None).await.unwrap();

        let page = backend.update(&page.id, "Home", "v2", 1).await.unwrap();
        let page = backend.update(&page.id, "Home", "v3", 2).await.unwrap();

        assert_eq!(page.version, 3);
        assert_eq!(page.content, "v3");
    }

    #[tokio::test]
    async fn test_update_rejects_stale_version() {
        let (_dir, backend) = setup();
        let page = backend.create("DOCS", "Home", "v1", None).await.unwrap();
        backend.update(&page.id, "Home", "v2", 1).await.unwrap();

        let err = backend.update(&page.id, "Home", "v3", 1).await.unwrap_err();

        assert!(err.is(BackendErrorKind::VersionConflict));
        assert!(err.to_string().contains("current is 2"));
    }

    #[tokio::test]
    async fn test_update_unknown_page() {
        let (_dir, backend) = setup();

        let err = backend.update("nope", "Home", "x", 1).await.unwrap_err();

        assert!(err.is(BackendErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_title_change_renames_directory() {
        let (dir, backend) = setup();
        let root = backend.create("DOCS", "Root", "r", None).await.unwrap();
        let child = backend
            .create("DOCS", "Child", "c", Some(&root.id))
            .await
            .unwrap();

        backend.update(&root.id, "New Root", "r2", 1).await.unwrap();

        let new_dir = dir.path().join("DOCS").join("New_Root");
        assert_eq!(backend.page_dir(&root.id).unwrap(), new_dir);
        assert_eq!(backend.page_dir(&child.id).unwrap(), new_dir.join("Child"));
        assert!(!dir.path().join("DOCS").join("Root").exists());
        assert_eq!(backend.find_by_title("DOCS", "Root").await.unwrap(), None);
        let renamed = backend.find_by_title("DOCS", "New Root").await.unwrap().unwrap();
        assert_eq!(renamed.version, 2);
    }

    #[tokio::test]
    async fn test_rename_skipped_when_target_exists() {
        let (dir, backend) = setup();
        let page = backend.create("DOCS", "Draft", "d", None).await.unwrap();
        fs::create_dir_all(dir.path().join("DOCS").join("Final")).unwrap();

        let updated = backend.update(&page.id, "Final", "f", 1).await.unwrap();

        assert_eq!(updated.title, "Final");
        assert_eq!(
            backend.page_dir(&page.id).unwrap(),
            dir.path().join("DOCS").join("Draft")
        );
        assert_eq!(
            backend.find_by_title("DOCS", "Final").await.unwrap().map(|p| p.id),
            Some(page.id)
        );
    }

    #[tokio::test]
    async fn test_create_replaces_existing_record() {
        let (dir, backend) = setup();
        let first = backend.create("DOCS", "Home", "old", None).await.unwrap();

        let second = backend.create("DOCS", "Home", "new", None).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(second.version, 1);
        assert!(backend.page_dir(&first.id).is_err());
        let found = backend.find_by_title("DOCS", "Home").await.unwrap().unwrap();
        assert_eq!(found.id, second.id);
        assert_eq!(found.content, "new");
        assert_eq!(walk_page_dirs(&dir.path().join("DOCS")).len(), 1);
    }

    #[tokio::test]
    async fn test_create_again_keeps_child_pages() {
        let (dir, backend) = setup();
        let root = backend.create("DOCS", "Root", "r", None).await.unwrap();
        let child = backend
            .create("DOCS", "Child", "c", Some(&root.id))
            .await
            .unwrap();
        backend.upload_attachment(&root.id, "app.js", b"x").await.unwrap();

        let recreated = backend.create("DOCS", "Root", "r2", None).await.unwrap();

        let root_dir = dir.path().join("DOCS").join("Root");
        assert_eq!(backend.page_dir(&recreated.id).unwrap(), root_dir);
        assert!(backend.list_attachments(&recreated.id).await.unwrap().is_empty());
        assert!(!root_dir.join(ATTACHMENTS_DIR).join("app.js").exists());

        let found = backend.find_by_title("DOCS", "Child").await.unwrap().unwrap();
        assert_eq!(found.id, child.id);
        assert_eq!(found.content, "c");
        assert_eq!(found.parent_id, Some(recreated.id.clone()));
        assert_eq!(backend.page_dir(&child.id).unwrap(), root_dir.join("Child"));

        let fresh = LocalBackend::new(dir.path());
        let rediscovered = fresh.find_by_title("DOCS", "Child").await.unwrap().unwrap();
        assert_eq!(rediscovered.parent_id, Some(recreated.id));
    }

    #[tokio::test]
    async fn test_create_again_under_new_parent_moves_subtree() {
        let (dir, backend) = setup();
        let home = backend.create("DOCS", "Home", "h", None).await.unwrap();
        let guide = backend.create("DOCS", "Guide", "g", None).await.unwrap();
        let install = backend
            .create("DOCS", "Install", "i", Some(&guide.id))
            .await
            .unwrap();

        let moved = backend
            .create("DOCS", "Guide", "g2", Some(&home.id))
            .await
            .unwrap();

        let guide_dir = dir.path().join("DOCS").join("Home").join("Guide");
        assert_eq!(moved.parent_id, Some(home.id));
        assert_eq!(backend.page_dir(&moved.id).unwrap(), guide_dir);
        assert_eq!(backend.page_dir(&install.id).unwrap(), guide_dir.join("Install"));
        assert!(!dir.path().join("DOCS").join("Guide").exists());
        assert_eq!(
            backend.find_by_title("DOCS", "Install").await.unwrap().unwrap().parent_id,
            Some(moved.id)
        );
    }

    #[tokio::test]
    async fn test_sanitized_name_collision_gets_distinct_dir() {
        let (_dir, backend) = setup();
        let a = backend.create("DOCS", "A/B", "1", None).await.unwrap();
        let b = backend.create("DOCS", "A B", "2", None).await.unwrap();

        assert_ne!(backend.page_dir(&a.id).unwrap(), backend.page_dir(&b.id).unwrap());
        assert_eq!(
            backend.find_by_title("DOCS", "A/B").await.unwrap().unwrap().content,
            "1"
        );
    }

    #[tokio::test]
    async fn test_upload_and_list_attachments() {
        let (_dir, backend) = setup();
        let page = backend.create("DOCS", "Home", "x", None).await.unwrap();

        let attachment = backend
            .upload_attachment(&page.id, "app.js", b"console.log(1)")
            .await
            .unwrap();
        backend
            .upload_attachment(&page.id, "app.css", b"body{}")
            .await
            .unwrap();

        assert_eq!(attachment.id, "attachments/app.js");
        assert_eq!(attachment.size, Some(14));
        let listed = backend.list_attachments(&page.id).await.unwrap();
        let names: Vec<_> = listed.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(names, vec!["app.css", "app.js"]);
        assert_eq!(listed[0].size, Some(6));
        assert_eq!(
            fs::read(backend.page_dir(&page.id).unwrap().join("attachments/app.js")).unwrap(),
            b"console.log(1)"
        );
    }

    #[tokio::test]
    async fn test_upload_does_not_bump_version() {
        let (_dir, backend) = setup();
        let page = backend.create("DOCS", "Home", "x", None).await.unwrap();

        backend.upload_attachment(&page.id, "a.txt", b"a").await.unwrap();

        let found = backend.find_by_title("DOCS", "Home").await.unwrap().unwrap();
        assert_eq!(found.version, 1);
    }

    #[tokio::test]
    async fn test_upload_same_filename_replaces() {
        let (_dir, backend) = setup();
        let page = backend.create("DOCS", "Home", "x", None).await.unwrap();

        backend.upload_attachment(&page.id, "a.txt", b"one").await.unwrap();
        backend.upload_attachment(&page.id, "a.txt", b"three").await.unwrap();

        let listed = backend.list_attachments(&page.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].size, Some(5));
    }

    #[tokio::test]
    async fn test_upload_rejects_path_traversal() {
        let (_dir, backend) = setup();
        let page = backend.create("DOCS", "Home", "x", None).await.unwrap();

        let err = backend
            .upload_attachment(&page.id, "../escape.txt", b"x")
            .await
            .unwrap_err();

        assert!(err.is(BackendErrorKind::InvalidInput));
    }

    #[tokio::test]
    async fn test_upsert_through_local_backend() {
        let (_dir, backend) = setup();
        backend.upsert("DOCS", "Root", "r", None).await.unwrap();

        backend.upsert("DOCS", "Child", "c1", Some("Root")).await.unwrap();
        let child = backend
            .upsert("DOCS", "Child", "c2", Some("Root"))
            .await
            .map(|p| (p.version, p.content, p.parent_id.is_some()))
            .unwrap();

        assert_eq!(child, (2, "c2".to_owned(), true));
    }
}
