use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error, info, warn};

use icon_gate::{AuthorizationChecker, Decision};
use icon_meta::{FileRemoval, MetadataStore};
use icon_types::{
    icon_file_path, AllowList, AllowListSummary, Caller, IconDescriptor, IconFileKey, IconName,
    Privilege,
};
use icon_vcs::{BlobVersionStore, Commit, CommitMessage, CommitRef, VcsError};

use crate::error::{CoreError, CoreResult};
use crate::locks::NameLocks;
use crate::report::ConsistencyReport;

/// A file stored by a successful create or add.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IconFile {
    pub name: IconName,
    pub key: IconFileKey,
    /// The blob store commit that holds the bytes.
    pub commit: CommitRef,
    pub content_length: u64,
}

impl IconFile {
    /// Canonical retrieval path.
    pub fn path(&self) -> String {
        icon_file_path(&self.name, &self.key)
    }
}

/// Keeps the metadata index and the blob version store in agreement.
///
/// Mutations write in a fixed order and undo the first step when the second
/// one fails:
///
/// - create / add: commit the blob, then insert the metadata entry.
/// - remove: delete the metadata entry, then commit the blob removal.
///
/// When the undo fails too, the operation reports
/// [`CoreError::StorageInconsistency`] and logs both failures.
///
/// Mutations of one icon name are serialized; different names proceed in
/// parallel. Once admitted, a mutation runs in its own task, so dropping the
/// returned future does not interrupt it halfway.
///
/// Cloning is cheap and shares the same stores and lock table.
#[derive(Clone)]
pub struct IconStorageCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    meta: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobVersionStore>,
    allow_list: AllowList,
    locks: NameLocks,
}

impl IconStorageCoordinator {
    pub fn new(
        meta: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobVersionStore>,
        allow_list: AllowList,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                meta,
                blobs,
                allow_list,
                locks: NameLocks::new(),
            }),
        }
    }

    // ---- Queries ----

    /// Every icon in creation order.
    pub async fn list_icons(&self) -> CoreResult<Vec<IconDescriptor>> {
        let records = self.inner.meta.list_icons().await?;
        Ok(records.iter().map(|r| r.descriptor()).collect())
    }

    pub async fn describe_icon(&self, name: &str) -> CoreResult<IconDescriptor> {
        let name = lookup_name(name)?;
        self.inner
            .meta
            .get_icon(&name)
            .await?
            .map(|r| r.descriptor())
            .ok_or_else(|| icon_not_found(&name))
    }

    /// Bytes of one icon file.
    ///
    /// Both the metadata entry and the blob must exist; a blob with no entry
    /// is not visible here.
    pub async fn get_icon_file_content(
        &self,
        name: &str,
        format: &str,
        size: &str,
    ) -> CoreResult<Bytes> {
        let name = lookup_name(name)?;
        let key = IconFileKey::new(format, size);

        let record = self
            .inner
            .meta
            .get_icon(&name)
            .await?
            .ok_or_else(|| icon_not_found(&name))?;
        if !record.has_file(&key) {
            return Err(file_not_found(&name, &key));
        }

        let path = icon_file_path(&name, &key);
        match self.inner.blobs.read_file(&path).await? {
            Some(content) => Ok(Bytes::from(content)),
            None => {
                debug!(%path, "metadata entry without committed blob");
                Err(file_not_found(&name, &key))
            }
        }
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.inner.allow_list
    }

    pub fn allow_list_summary(&self) -> AllowListSummary {
        self.inner.allow_list.summary()
    }

    /// Up to `limit` blob store commits, newest first.
    pub async fn history(&self, limit: usize) -> CoreResult<Vec<Commit>> {
        Ok(self.inner.blobs.history(limit).await?)
    }

    /// Compare both stores, re-hash every stored object, and report every
    /// disagreement. Repairs nothing.
    ///
    /// Not serialized against mutations; run it on a quiet repository for an
    /// exact answer.
    pub async fn verify_consistency(&self) -> CoreResult<ConsistencyReport> {
        let records = self.inner.meta.list_icons().await?;
        let stored: BTreeSet<String> = self.inner.blobs.list_paths().await?.into_iter().collect();

        let mut expected = BTreeSet::new();
        let mut report = ConsistencyReport {
            icons_checked: records.len(),
            ..Default::default()
        };
        for record in &records {
            for key in &record.files {
                let path = icon_file_path(&record.name, key);
                report.files_checked += 1;
                if !stored.contains(&path) {
                    report.missing_blobs.push(path.clone());
                }
                expected.insert(path);
            }
        }
        report.orphan_blobs = stored.difference(&expected).cloned().collect();
        report.damaged_blobs = self.inner.blobs.damaged_paths().await?;

        if report.is_consistent() {
            info!(
                icons = report.icons_checked,
                files = report.files_checked,
                "stores consistent"
            );
        } else {
            warn!(
                missing = report.missing_blobs.len(),
                orphans = report.orphan_blobs.len(),
                damaged = report.damaged_blobs.len(),
                "stores disagree"
            );
        }
        Ok(report)
    }

    // ---- Mutations ----

    /// Create an icon with its first file.
    pub async fn create_icon(
        &self,
        name: &str,
        format: &str,
        size: &str,
        content: Bytes,
        caller: &Caller,
    ) -> CoreResult<IconFile> {
        authorize(Privilege::CreateIcon, caller)?;
        let name = IconName::new(name)?;
        let key = self.validate_key(format, size)?;
        let caller = caller.clone();
        self.run_detached(move |inner| async move {
            inner.create_icon(name, key, content, caller).await
        })
        .await
    }

    /// Add a file to an existing icon.
    pub async fn add_icon_file(
        &self,
        name: &str,
        format: &str,
        size: &str,
        content: Bytes,
        caller: &Caller,
    ) -> CoreResult<IconFile> {
        authorize(Privilege::AddIconFile, caller)?;
        let name = IconName::new(name)?;
        let key = self.validate_key(format, size)?;
        let caller = caller.clone();
        self.run_detached(move |inner| async move {
            inner.add_icon_file(name, key, content, caller).await
        })
        .await
    }

    /// Remove one file. Removing the last file removes the icon.
    pub async fn remove_icon_file(
        &self,
        name: &str,
        format: &str,
        size: &str,
        caller: &Caller,
    ) -> CoreResult<FileRemoval> {
        authorize(Privilege::RemoveIconFile, caller)?;
        let name = IconName::new(name)?;
        let key = IconFileKey::new(format, size);
        let caller = caller.clone();
        self.run_detached(move |inner| async move {
            let _guard = inner.locks.acquire(&name).await;
            let removal = inner.remove_file_locked(&name, &key, &caller).await?;
            info!(icon = %name, file = %key, user = %caller.user, ?removal, "icon file removed");
            Ok(removal)
        })
        .await
    }

    /// Remove an icon and all of its files.
    pub async fn remove_icon(&self, name: &str, caller: &Caller) -> CoreResult<()> {
        authorize(Privilege::RemoveIconFile, caller)?;
        let name = IconName::new(name)?;
        let caller = caller.clone();
        self.run_detached(move |inner| async move { inner.remove_icon(name, caller).await })
            .await
    }

    /// Wipe both stores. Only meant for startup, before any request is served.
    pub async fn reset(&self) -> CoreResult<()> {
        self.inner.meta.reset().await?;
        self.inner.blobs.reset().await?;
        warn!("icon data reset");
        Ok(())
    }

    fn validate_key(&self, format: &str, size: &str) -> CoreResult<IconFileKey> {
        let key = IconFileKey::new(format, size);
        self.inner.allow_list.validate(&key)?;
        Ok(key)
    }

    /// Run a mutation body in its own task and wait for it.
    async fn run_detached<T, F, Fut>(&self, body: F) -> CoreResult<T>
    where
        F: FnOnce(Arc<Inner>) -> Fut,
        Fut: Future<Output = CoreResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let task = tokio::spawn(body(Arc::clone(&self.inner)));
        match task.await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "mutation task did not complete");
                Err(CoreError::StorageInconsistency(
                    "mutation task did not complete".into(),
                ))
            }
        }
    }
}

impl Inner {
    async fn create_icon(
        &self,
        name: IconName,
        key: IconFileKey,
        content: Bytes,
        caller: Caller,
    ) -> CoreResult<IconFile> {
        let _guard = self.locks.acquire(&name).await;
        if self.meta.get_icon(&name).await?.is_some() {
            return Err(CoreError::AlreadyExists(format!("icon {name}")));
        }
        let file = self
            .store_file(&name, &key, content, &caller, "Create icon")
            .await?;
        info!(icon = %name, file = %key, user = %caller.user, commit = %file.commit.short(), "icon created");
        Ok(file)
    }

    async fn add_icon_file(
        &self,
        name: IconName,
        key: IconFileKey,
        content: Bytes,
        caller: Caller,
    ) -> CoreResult<IconFile> {
        let _guard = self.locks.acquire(&name).await;
        let record = self
            .meta
            .get_icon(&name)
            .await?
            .ok_or_else(|| icon_not_found(&name))?;
        if record.has_file(&key) {
            return Err(CoreError::AlreadyExists(format!("icon {name} file {key}")));
        }
        let file = self
            .store_file(&name, &key, content, &caller, "Add icon file")
            .await?;
        info!(icon = %name, file = %key, user = %caller.user, commit = %file.commit.short(), "icon file added");
        Ok(file)
    }

    async fn remove_icon(&self, name: IconName, caller: Caller) -> CoreResult<()> {
        let _guard = self.locks.acquire(&name).await;
        let record = self
            .meta
            .get_icon(&name)
            .await?
            .ok_or_else(|| icon_not_found(&name))?;
        for key in &record.files {
            self.remove_file_locked(&name, key, &caller).await?;
        }
        info!(icon = %name, files = record.files.len(), user = %caller.user, "icon removed");
        Ok(())
    }

    /// Commit the blob, then index it. Caller holds the name lock.
    async fn store_file(
        &self,
        name: &IconName,
        key: &IconFileKey,
        content: Bytes,
        caller: &Caller,
        action: &str,
    ) -> CoreResult<IconFile> {
        let path = icon_file_path(name, key);
        let message = CommitMessage::new(&caller.user, format!("{action} {name} {key}"));
        let commit = self.blobs.write_file(&path, &content, &message).await?;
        debug!(%path, commit = %commit.short(), "blob committed");

        if let Err(step_err) = self.meta.insert_file(name, key).await {
            warn!(%path, error = %step_err, "metadata insert failed; removing committed blob");
            let undo = CommitMessage::new(&caller.user, format!("Revert {action} {name} {key}"));
            if let Err(undo_err) = self.blobs.delete_file(&path, &undo).await {
                error!(
                    icon = %name,
                    file = %key,
                    %path,
                    %commit,
                    step_error = %step_err,
                    compensation_error = %undo_err,
                    "blob committed without a metadata entry"
                );
                return Err(CoreError::StorageInconsistency(format!(
                    "blob {path} committed without a metadata entry"
                )));
            }
            return Err(step_err.into());
        }

        Ok(IconFile {
            name: name.clone(),
            key: key.clone(),
            commit,
            content_length: content.len() as u64,
        })
    }

    /// Drop the index entry, then the blob. Caller holds the name lock.
    async fn remove_file_locked(
        &self,
        name: &IconName,
        key: &IconFileKey,
        caller: &Caller,
    ) -> CoreResult<FileRemoval> {
        let removal = self.meta.delete_file(name, key).await?;
        let path = icon_file_path(name, key);
        let message = CommitMessage::new(&caller.user, format!("Remove icon file {name} {key}"));

        match self.blobs.delete_file(&path, &message).await {
            Ok(commit) => {
                debug!(%path, commit = %commit.short(), "blob removal committed");
                Ok(removal)
            }
            Err(VcsError::PathNotFound(_)) => {
                warn!(%path, "metadata entry had no blob; removed the entry only");
                Ok(removal)
            }
            Err(step_err) => {
                warn!(%path, error = %step_err, "blob delete failed; restoring metadata entry");
                if let Err(undo_err) = self.meta.insert_file(name, key).await {
                    error!(
                        icon = %name,
                        file = %key,
                        %path,
                        step_error = %step_err,
                        compensation_error = %undo_err,
                        "metadata entry removed while its blob remains"
                    );
                    return Err(CoreError::StorageInconsistency(format!(
                        "metadata entry for {path} removed while its blob remains"
                    )));
                }
                Err(step_err.into())
            }
        }
    }
}

fn authorize(required: Privilege, caller: &Caller) -> CoreResult<()> {
    match AuthorizationChecker::check_caller(required, caller) {
        Decision::Allowed => Ok(()),
        Decision::Denied { missing } => Err(CoreError::Forbidden {
            user: caller.user.clone(),
            required: missing,
        }),
    }
}

/// Names that fail validation cannot have been stored, so readers see them
/// as absent.
fn lookup_name(name: &str) -> CoreResult<IconName> {
    IconName::new(name).map_err(|_| CoreError::NotFound(format!("icon {name:?}")))
}

fn icon_not_found(name: &IconName) -> CoreError {
    CoreError::NotFound(format!("icon {name}"))
}

fn file_not_found(name: &IconName, key: &IconFileKey) -> CoreError {
    CoreError::NotFound(format!("icon {name} file {key}"))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use icon_meta::{IconRecord, InMemoryMetadataStore, MetaError, MetaResult};
    use icon_types::PrivilegeSet;
    use icon_vcs::{ContentHasher, FsBlobStore, InMemoryBlobStore, VcsResult};

    use super::*;

    // ---------------------------------------------------------------
    // Fault-injecting adapters
    // ---------------------------------------------------------------

    #[derive(Default)]
    struct FaultyMeta {
        inner: InMemoryMetadataStore,
        fail_insert: AtomicBool,
        fail_delete: AtomicBool,
    }

    #[async_trait]
    impl MetadataStore for FaultyMeta {
        async fn get_icon(&self, name: &IconName) -> MetaResult<Option<IconRecord>> {
            self.inner.get_icon(name).await
        }

        async fn list_icons(&self) -> MetaResult<Vec<IconRecord>> {
            self.inner.list_icons().await
        }

        async fn insert_file(&self, name: &IconName, key: &IconFileKey) -> MetaResult<()> {
            if self.fail_insert.load(Ordering::SeqCst) {
                return Err(MetaError::Unavailable("injected insert failure".into()));
            }
            self.inner.insert_file(name, key).await
        }

        async fn delete_file(&self, name: &IconName, key: &IconFileKey) -> MetaResult<FileRemoval> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(MetaError::Unavailable("injected delete failure".into()));
            }
            self.inner.delete_file(name, key).await
        }

        async fn reset(&self) -> MetaResult<()> {
            self.inner.reset().await
        }
    }

    #[derive(Default)]
    struct FaultyBlobs {
        inner: InMemoryBlobStore,
        fail_write: AtomicBool,
        fail_delete: AtomicBool,
        slow_write: AtomicBool,
    }

    #[async_trait]
    impl BlobVersionStore for FaultyBlobs {
        async fn write_file(
            &self,
            path: &str,
            content: &[u8],
            message: &CommitMessage,
        ) -> VcsResult<CommitRef> {
            if self.slow_write.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            if self.fail_write.load(Ordering::SeqCst) {
                return Err(VcsError::Unavailable("injected write failure".into()));
            }
            self.inner.write_file(path, content, message).await
        }

        async fn read_file(&self, path: &str) -> VcsResult<Option<Vec<u8>>> {
            self.inner.read_file(path).await
        }

        async fn delete_file(&self, path: &str, message: &CommitMessage) -> VcsResult<CommitRef> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(VcsError::Unavailable("injected delete failure".into()));
            }
            self.inner.delete_file(path, message).await
        }

        async fn list_paths(&self) -> VcsResult<Vec<String>> {
            self.inner.list_paths().await
        }

        async fn history(&self, limit: usize) -> VcsResult<Vec<Commit>> {
            self.inner.history(limit).await
        }

        async fn damaged_paths(&self) -> VcsResult<Vec<String>> {
            self.inner.damaged_paths().await
        }

        async fn reset(&self) -> VcsResult<()> {
            self.inner.reset().await
        }
    }

    struct Fixture {
        meta: Arc<FaultyMeta>,
        blobs: Arc<FaultyBlobs>,
        coordinator: IconStorageCoordinator,
    }

    fn fixture() -> Fixture {
        let meta = Arc::new(FaultyMeta::default());
        let blobs = Arc::new(FaultyBlobs::default());
        let allow_list = AllowList::from_pairs([
            ("french", vec!["great", "big", "small"]),
            ("svg", vec!["24px", "48px"]),
        ]);
        let coordinator = IconStorageCoordinator::new(meta.clone(), blobs.clone(), allow_list);
        Fixture {
            meta,
            blobs,
            coordinator,
        }
    }

    fn admin() -> Caller {
        Caller::new("ux", PrivilegeSet::all())
    }

    fn content(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn create_then_read_content() {
        let f = fixture();
        let file = f
            .coordinator
            .create_icon("zazie", "french", "great", content("<svg/>"), &admin())
            .await
            .unwrap();
        assert_eq!(file.path(), "/icons/zazie/formats/french/sizes/great");
        assert_eq!(file.content_length, 6);

        let bytes = f
            .coordinator
            .get_icon_file_content("zazie", "french", "great")
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"<svg/>");
    }

    #[tokio::test]
    async fn zazie_two_sizes_listed() {
        let f = fixture();
        f.coordinator
            .create_icon("zazie", "french", "great", content("g"), &admin())
            .await
            .unwrap();
        f.coordinator
            .add_icon_file("zazie", "french", "big", content("b"), &admin())
            .await
            .unwrap();

        let icons = f.coordinator.list_icons().await.unwrap();
        assert_eq!(icons.len(), 1);
        let zazie = &icons[0];
        assert_eq!(zazie.name, "zazie");
        assert_eq!(
            zazie.path("french", "great"),
            Some("/icons/zazie/formats/french/sizes/great")
        );
        assert_eq!(
            zazie.path("french", "big"),
            Some("/icons/zazie/formats/french/sizes/big")
        );
    }

    #[tokio::test]
    async fn list_keeps_creation_order() {
        let f = fixture();
        for name in ["zazie", "cartouche", "apple"] {
            f.coordinator
                .create_icon(name, "svg", "24px", content(name), &admin())
                .await
                .unwrap();
        }
        let names: Vec<String> = f
            .coordinator
            .list_icons()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["zazie", "cartouche", "apple"]);
    }

    #[tokio::test]
    async fn empty_repository_lists_nothing() {
        let f = fixture();
        assert!(f.coordinator.list_icons().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_then_remove_icon() {
        let f = fixture();
        f.coordinator
            .create_icon("zazie", "french", "great", content("g"), &admin())
            .await
            .unwrap();
        f.coordinator
            .add_icon_file("zazie", "french", "big", content("b"), &admin())
            .await
            .unwrap();
        f.coordinator.remove_icon("zazie", &admin()).await.unwrap();

        assert!(f.coordinator.describe_icon("zazie").await.unwrap_err().is_not_found());
        assert!(f
            .coordinator
            .get_icon_file_content("zazie", "french", "great")
            .await
            .unwrap_err()
            .is_not_found());
        assert!(f.blobs.list_paths().await.unwrap().is_empty());
        // Two writes, two removals.
        assert_eq!(f.coordinator.history(10).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn removing_last_file_removes_icon() {
        let f = fixture();
        f.coordinator
            .create_icon("zazie", "french", "great", content("g"), &admin())
            .await
            .unwrap();
        f.coordinator
            .add_icon_file("zazie", "french", "big", content("b"), &admin())
            .await
            .unwrap();

        let first = f
            .coordinator
            .remove_icon_file("zazie", "french", "great", &admin())
            .await
            .unwrap();
        assert_eq!(first, FileRemoval::FileRemoved);
        let described = f.coordinator.describe_icon("zazie").await.unwrap();
        assert_eq!(described.file_count(), 1);

        let last = f
            .coordinator
            .remove_icon_file("zazie", "french", "big", &admin())
            .await
            .unwrap();
        assert_eq!(last, FileRemoval::IconRemoved);
        assert!(f.coordinator.describe_icon("zazie").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn remove_missing_file_is_not_found() {
        let f = fixture();
        let err = f
            .coordinator
            .remove_icon_file("ghost", "svg", "24px", &admin())
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        f.coordinator
            .create_icon("zazie", "svg", "24px", content("x"), &admin())
            .await
            .unwrap();
        let err = f
            .coordinator
            .remove_icon_file("zazie", "svg", "48px", &admin())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(f.coordinator.remove_icon("ghost", &admin()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn describe_unknown_is_not_found() {
        let f = fixture();
        let err = f.coordinator.describe_icon("unknown").await.unwrap_err();
        assert!(err.is_not_found());
        // A name that could never be stored is simply absent.
        assert!(f.coordinator.describe_icon("..").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn add_to_missing_icon_commits_nothing() {
        let f = fixture();
        let err = f
            .coordinator
            .add_icon_file("ghost", "svg", "24px", content("x"), &admin())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(f.coordinator.history(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_create_keeps_original() {
        let f = fixture();
        f.coordinator
            .create_icon("zazie", "svg", "24px", content("first"), &admin())
            .await
            .unwrap();
        let err = f
            .coordinator
            .create_icon("zazie", "svg", "48px", content("second"), &admin())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists(_)));

        let bytes = f
            .coordinator
            .get_icon_file_content("zazie", "svg", "24px")
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"first");
        assert_eq!(f.coordinator.history(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_file_is_rejected() {
        let f = fixture();
        f.coordinator
            .create_icon("zazie", "svg", "24px", content("a"), &admin())
            .await
            .unwrap();
        let err = f
            .coordinator
            .add_icon_file("zazie", "svg", "24px", content("b"), &admin())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists(_)));
    }

    // ---------------------------------------------------------------
    // Validation and authorization
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn missing_privilege_changes_nothing() {
        let f = fixture();
        let adder = Caller::new("adder", [Privilege::AddIconFile]);

        let err = f
            .coordinator
            .create_icon("zazie", "svg", "24px", content("x"), &adder)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Forbidden {
                required: Privilege::CreateIcon,
                ..
            }
        ));
        assert!(f.coordinator.list_icons().await.unwrap().is_empty());
        assert!(f.coordinator.history(10).await.unwrap().is_empty());

        f.coordinator
            .create_icon("zazie", "svg", "24px", content("x"), &admin())
            .await
            .unwrap();
        let err = f
            .coordinator
            .remove_icon("zazie", &adder)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");
        let err = f
            .coordinator
            .remove_icon_file("zazie", "svg", "24px", &adder)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Forbidden {
                required: Privilege::RemoveIconFile,
                ..
            }
        ));
        let err = f
            .coordinator
            .add_icon_file("zazie", "svg", "48px", content("y"), &Caller::anonymous())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");

        assert_eq!(f.coordinator.describe_icon("zazie").await.unwrap().file_count(), 1);
        assert_eq!(f.coordinator.history(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_inputs_are_rejected() {
        let f = fixture();
        let err = f
            .coordinator
            .create_icon("a/b", "svg", "24px", content("x"), &admin())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidName(_)));

        let err = f
            .coordinator
            .create_icon("zazie", "gif", "24px", content("x"), &admin())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidFormatOrSize { .. }));

        let err = f
            .coordinator
            .create_icon("zazie", "svg", "great", content("x"), &admin())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidFormatOrSize { .. }));
        assert!(f.coordinator.history(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn commits_name_the_caller() {
        let f = fixture();
        let caller = Caller::new("designer", PrivilegeSet::all());
        f.coordinator
            .create_icon("zazie", "svg", "24px", content("x"), &caller)
            .await
            .unwrap();
        let head = &f.coordinator.history(1).await.unwrap()[0];
        assert_eq!(head.author, "designer");
        assert!(head.message.contains("zazie"));
    }

    // ---------------------------------------------------------------
    // Compensation
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn failed_metadata_insert_removes_blob() {
        let f = fixture();
        f.meta.fail_insert.store(true, Ordering::SeqCst);

        let err = f
            .coordinator
            .create_icon("zazie", "svg", "24px", content("x"), &admin())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AdapterUnavailable(_)));
        assert!(f.blobs.list_paths().await.unwrap().is_empty());
        assert!(f.meta.list_icons().await.unwrap().is_empty());
        // Write and its revert both stay in history.
        assert_eq!(f.coordinator.history(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_compensation_is_inconsistency() {
        let f = fixture();
        f.meta.fail_insert.store(true, Ordering::SeqCst);
        f.blobs.fail_delete.store(true, Ordering::SeqCst);

        let err = f
            .coordinator
            .create_icon("zazie", "svg", "24px", content("x"), &admin())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::StorageInconsistency(_)));

        let report = f.coordinator.verify_consistency().await.unwrap();
        assert_eq!(report.orphan_blobs, vec!["/icons/zazie/formats/svg/sizes/24px"]);
        // The orphan is invisible to readers.
        assert!(f
            .coordinator
            .get_icon_file_content("zazie", "svg", "24px")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn failed_blob_write_is_surfaced_directly() {
        let f = fixture();
        f.blobs.fail_write.store(true, Ordering::SeqCst);
        let err = f
            .coordinator
            .create_icon("zazie", "svg", "24px", content("x"), &admin())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AdapterUnavailable(_)));
        assert!(f.meta.list_icons().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_blob_delete_restores_metadata() {
        let f = fixture();
        f.coordinator
            .create_icon("zazie", "svg", "24px", content("x"), &admin())
            .await
            .unwrap();
        f.blobs.fail_delete.store(true, Ordering::SeqCst);

        let err = f
            .coordinator
            .remove_icon_file("zazie", "svg", "24px", &admin())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AdapterUnavailable(_)));

        let bytes = f
            .coordinator
            .get_icon_file_content("zazie", "svg", "24px")
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"x");
        assert!(f.coordinator.verify_consistency().await.unwrap().is_consistent());
    }

    #[tokio::test]
    async fn failed_metadata_restore_is_inconsistency() {
        let f = fixture();
        f.coordinator
            .create_icon("zazie", "svg", "24px", content("x"), &admin())
            .await
            .unwrap();
        f.blobs.fail_delete.store(true, Ordering::SeqCst);
        f.meta.fail_insert.store(true, Ordering::SeqCst);

        let err = f
            .coordinator
            .remove_icon_file("zazie", "svg", "24px", &admin())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "storage_inconsistency");
    }

    #[tokio::test]
    async fn failed_metadata_delete_touches_no_blob() {
        let f = fixture();
        f.coordinator
            .create_icon("zazie", "svg", "24px", content("x"), &admin())
            .await
            .unwrap();
        f.meta.fail_delete.store(true, Ordering::SeqCst);

        let err = f.coordinator.remove_icon("zazie", &admin()).await.unwrap_err();
        assert!(matches!(err, CoreError::AdapterUnavailable(_)));
        assert_eq!(f.coordinator.history(10).await.unwrap().len(), 1);
        assert!(f.coordinator.verify_consistency().await.unwrap().is_consistent());
    }

    // ---------------------------------------------------------------
    // Consistency audit
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn audit_reports_missing_blob() {
        let f = fixture();
        f.coordinator
            .create_icon("zazie", "svg", "24px", content("x"), &admin())
            .await
            .unwrap();
        f.blobs
            .inner
            .delete_file("/icons/zazie/formats/svg/sizes/24px", &CommitMessage::new("op", "drop"))
            .await
            .unwrap();

        let report = f.coordinator.verify_consistency().await.unwrap();
        assert_eq!(report.icons_checked, 1);
        assert_eq!(report.files_checked, 1);
        assert_eq!(report.missing_blobs, vec!["/icons/zazie/formats/svg/sizes/24px"]);
        assert!(report.orphan_blobs.is_empty());

        // Removing the dangling entry still succeeds and restores agreement.
        f.coordinator
            .remove_icon_file("zazie", "svg", "24px", &admin())
            .await
            .unwrap();
        assert!(f.coordinator.verify_consistency().await.unwrap().is_consistent());
    }

    #[tokio::test]
    async fn audit_reports_damaged_object_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = Arc::new(FsBlobStore::open(dir.path()).await.unwrap());
        let coordinator = IconStorageCoordinator::new(
            Arc::new(InMemoryMetadataStore::new()),
            blobs,
            AllowList::default(),
        );
        coordinator
            .create_icon("zazie", "svg", "24px", content("<svg/>"), &admin())
            .await
            .unwrap();
        coordinator
            .create_icon("cartouche", "svg", "24px", content("<svg></svg>"), &admin())
            .await
            .unwrap();
        assert!(coordinator.verify_consistency().await.unwrap().is_consistent());

        let hex = ContentHasher::BLOB.hash(b"<svg/>").to_hex();
        std::fs::write(dir.path().join("objects").join(&hex[..2]).join(&hex[2..]), b"junk").unwrap();

        let report = coordinator.verify_consistency().await.unwrap();
        assert!(report.missing_blobs.is_empty());
        assert!(report.orphan_blobs.is_empty());
        assert_eq!(report.damaged_blobs, vec!["/icons/zazie/formats/svg/sizes/24px"]);
        assert_eq!(report.discrepancy_count(), 1);
    }

    // ---------------------------------------------------------------
    // Concurrency
    // ---------------------------------------------------------------

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_of_different_files_succeed() {
        let f = fixture();
        f.coordinator
            .create_icon("zazie", "french", "great", content("g"), &admin())
            .await
            .unwrap();

        let a = {
            let c = f.coordinator.clone();
            tokio::spawn(async move {
                c.add_icon_file("zazie", "french", "big", content("b"), &admin())
                    .await
            })
        };
        let b = {
            let c = f.coordinator.clone();
            tokio::spawn(async move {
                c.add_icon_file("zazie", "french", "small", content("s"), &admin())
                    .await
            })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let described = f.coordinator.describe_icon("zazie").await.unwrap();
        assert_eq!(described.file_count(), 3);
        assert!(f.coordinator.verify_consistency().await.unwrap().is_consistent());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_of_same_file_one_wins() {
        let f = fixture();
        f.coordinator
            .create_icon("zazie", "french", "great", content("g"), &admin())
            .await
            .unwrap();

        let mut handles = Vec::new();
        for body in ["one", "two"] {
            let c = f.coordinator.clone();
            handles.push(tokio::spawn(async move {
                c.add_icon_file("zazie", "french", "big", content(body), &admin())
                    .await
            }));
        }
        let mut ok = 0;
        let mut exists = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(CoreError::AlreadyExists(_)) => exists += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!((ok, exists), (1, 1));
        // One create, one add.
        assert_eq!(f.coordinator.history(10).await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_of_same_name_one_wins() {
        let f = fixture();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let c = f.coordinator.clone();
            handles.push(tokio::spawn(async move {
                c.create_icon("zazie", "svg", "24px", content("x"), &admin())
                    .await
            }));
        }
        let mut ok = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn dropped_caller_does_not_cancel_mutation() {
        let f = fixture();
        f.blobs.slow_write.store(true, Ordering::SeqCst);

        let attempt = tokio::time::timeout(
            Duration::from_millis(5),
            f.coordinator
                .create_icon("zazie", "svg", "24px", content("x"), &admin()),
        )
        .await;
        assert!(attempt.is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        let described = f.coordinator.describe_icon("zazie").await.unwrap();
        assert_eq!(described.file_count(), 1);
        assert!(f.coordinator.verify_consistency().await.unwrap().is_consistent());
    }

    // ---------------------------------------------------------------
    // Misc
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn allow_list_summary_is_exposed() {
        let f = fixture();
        let summary = f.coordinator.allow_list_summary();
        assert_eq!(summary.allowed_file_formats, vec!["french", "svg"]);
        assert!(f.coordinator.allow_list().is_allowed("french", "big"));
    }

    #[tokio::test]
    async fn reset_empties_both_stores() {
        let f = fixture();
        f.coordinator
            .create_icon("zazie", "svg", "24px", content("x"), &admin())
            .await
            .unwrap();
        f.coordinator.reset().await.unwrap();
        assert!(f.coordinator.list_icons().await.unwrap().is_empty());
        assert!(f.coordinator.history(10).await.unwrap().is_empty());
    }
}
