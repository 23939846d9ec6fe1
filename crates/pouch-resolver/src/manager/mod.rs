//! Package manager facade
//!
//! One [`PackageManager`] serves a whole install session. It owns the
//! per-run bookkeeping (which names were analysed, which were installed) so
//! that every worker sharing it sees the same state.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashSet;
use pouch_cache::{ArchiveFetcher, MembershipSet, Storage};
use pouch_core::error::{PouchError, PouchResult};
use pouch_core::events::EventSink;
use pouch_core::types::{
    Analysis, ArchiveEntry, EntryKind, InstallOutcome, PackageIdentity, PackageRequest,
    DEFAULT_SKIP_PACKAGES,
};
use pouch_core::utils::{parent_dir, safe_join};

use crate::resolve::VersionResolver;

/// Directory below the project root that receives installed packages
pub const NODE_MODULES: &str = "node_modules";

/// Resolve, fetch and write packages for one install session
#[derive(Debug)]
pub struct PackageManager {
    resolver: VersionResolver,
    fetcher: ArchiveFetcher,
    storage: Arc<dyn Storage>,
    events: EventSink,
    skip_packages: Vec<String>,
    /// Names analysed this run
    analyzed: DashSet<String>,
    /// Names installed or being installed this run
    installed: DashSet<String>,
    /// Optional set shared with other sessions of the same run; records
    /// installs but never suppresses one
    membership: Option<Arc<MembershipSet>>,
}

impl PackageManager {
    pub fn new(resolver: VersionResolver, fetcher: ArchiveFetcher, storage: Arc<dyn Storage>) -> Self {
        Self {
            resolver,
            fetcher,
            storage,
            events: EventSink::disabled(),
            skip_packages: DEFAULT_SKIP_PACKAGES.iter().map(|s| s.to_string()).collect(),
            analyzed: DashSet::new(),
            installed: DashSet::new(),
            membership: None,
        }
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Replace the exclusion list; a package is skipped when its name
    /// contains any entry
    pub fn with_skip_packages(mut self, skip_packages: Vec<String>) -> Self {
        self.skip_packages = skip_packages;
        self
    }

    /// Also record install markers in a set shared across sessions
    pub fn with_membership(mut self, membership: Arc<MembershipSet>) -> Self {
        self.membership = Some(membership);
        self
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.skip_packages
            .iter()
            .any(|skip| !skip.is_empty() && name.contains(skip.as_str()))
    }

    /// Whether `name` has been installed (or claimed for install) this run
    pub fn is_installed(&self, name: &str) -> bool {
        self.installed.contains(name)
    }

    /// Resolve one request and list its dependencies
    ///
    /// Returns `None` when the name was already analysed this run.
    pub async fn analyze(&self, request: &PackageRequest) -> PouchResult<Option<Analysis>> {
        if !self.analyzed.insert(request.name.clone()) {
            tracing::debug!("Skipping {}: already analysed", request.name);
            return Ok(None);
        }

        self.events.info(format!("analysing {}", request));
        let package = match self.resolver.resolve(&request.name, &request.range).await {
            Ok(package) => package,
            Err(e) => {
                // A later edge to the same name gets another attempt
                self.analyzed.remove(&request.name);
                return Err(e.with_package(&request.name, &request.range));
            },
        };
        self.events
            .info(format!("analysed {}@{}", package.name, package.version));

        Ok(Some(Analysis { package }))
    }

    /// Install one package under `{root}/node_modules/{name}`
    pub async fn install(&self, root: &str, identity: &PackageIdentity) -> PouchResult<InstallOutcome> {
        let key = identity.to_string();

        if self.is_installed(&identity.name) {
            self.events.info(format!("hit cache {}", key));
            return Ok(InstallOutcome::AlreadyInstalled);
        }
        if self.is_excluded(&identity.name) {
            self.events.info(format!("skip excluded package {}", key));
            return Ok(InstallOutcome::Excluded);
        }
        if !self.mark_installing(&identity.name)? {
            self.events.info(format!("hit cache {}", key));
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        match self.download_and_write(root, identity).await {
            Ok(files) => {
                self.events.info(format!("install npm done {}", key));
                Ok(InstallOutcome::Installed { files })
            },
            Err(e) => {
                let e = e.with_package(&identity.name, &identity.version);
                self.events.error(format!("install failed: {}", e));
                Err(e)
            },
        }
    }

    /// Claim `name` before any I/O; `false` when this run already holds it
    ///
    /// The per-run set decides. The shared membership set only stores
    /// hashes, so a name it already reports is still installed here.
    fn mark_installing(&self, name: &str) -> PouchResult<bool> {
        if !self.installed.insert(name.to_string()) {
            return Ok(false);
        }
        if let Some(membership) = &self.membership {
            match membership.claim(name) {
                Ok(true) => {},
                Ok(false) => {
                    tracing::debug!("{} already in the membership set, installing anyway", name);
                },
                Err(PouchError::CapacityExceeded { capacity }) => {
                    tracing::warn!(
                        "Membership set full ({} keys), tracking {} locally",
                        capacity,
                        name
                    );
                },
                Err(e) => {
                    self.installed.remove(name);
                    return Err(e);
                },
            }
        }
        Ok(true)
    }

    async fn download_and_write(&self, root: &str, identity: &PackageIdentity) -> PouchResult<usize> {
        let tarball_url = if identity.tarball_url.is_empty() {
            self.resolver
                .resolve(&identity.name, &identity.version)
                .await?
                .tarball_url
        } else {
            identity.tarball_url.clone()
        };

        let entries = self.fetcher.fetch_and_extract(&tarball_url).await?;
        let package_dir = safe_join(root, &format!("{}/{}", NODE_MODULES, identity.name))?;
        self.write_entries(&package_dir, &entries).await
    }

    /// Write extracted entries below `package_dir`, creating parents first;
    /// returns the number of files written
    async fn write_entries(&self, package_dir: &str, entries: &[ArchiveEntry]) -> PouchResult<usize> {
        let mut created: HashSet<String> = HashSet::new();
        let mut files = 0;

        for entry in entries {
            let target = safe_join(package_dir, &entry.path)?;
            match entry.kind {
                EntryKind::Directory => {
                    self.ensure_dir(&target, &mut created).await?;
                },
                EntryKind::File => {
                    let parent = parent_dir(&target).unwrap_or(package_dir);
                    self.ensure_dir(parent, &mut created).await?;
                    self.storage
                        .write_file(&target, entry.content.as_bytes())
                        .await?;
                    files += 1;
                },
            }
        }

        tracing::debug!("Wrote {} files to {}", files, package_dir);
        Ok(files)
    }

    async fn ensure_dir(&self, dir: &str, created: &mut HashSet<String>) -> PouchResult<()> {
        if created.insert(dir.to_string()) {
            self.storage.mkdir(dir, true).await?;
        }
        Ok(())
    }
}
