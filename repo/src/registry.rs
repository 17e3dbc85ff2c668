use crate::error::RepoError;
use crate::error::Result;
use crate::git;
use crate::sidecar;
use crate::sidecar::Sidecar;
use agentloop_store::EventStore;
use agentloop_store::RepositoryBinding;
use agentloop_store::RepositoryKind;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullOutcome {
    pub ok: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub ok: bool,
    pub commit: Option<String>,
    pub noop: bool,
    pub remoteless: bool,
    pub error: Option<String>,
}

/// Maps repository aliases to working directories, mirroring every binding
/// into both the event store and a JSON sidecar
/// (`repo_manager.py::_load_repo_connections`/`_save_repo_connections`).
pub struct RepositoryRegistry {
    store: EventStore,
    base_dir: PathBuf,
    sidecar_path: PathBuf,
    default_working_dir: PathBuf,
    bindings: RwLock<BTreeMap<String, RepositoryBinding>>,
}

impl RepositoryRegistry {
    /// Loads bindings from the store (source of truth); if the store is
    /// empty, falls back to the sidecar file and re-seeds the store from
    /// it, matching the Supervisor's own "prefer store, fall back to
    /// `state.json`" snapshot convention.
    pub async fn open(
        store: EventStore,
        base_dir: impl Into<PathBuf>,
        sidecar_path: impl Into<PathBuf>,
        default_working_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let base_dir = base_dir.into();
        let sidecar_path = sidecar_path.into();
        tokio::fs::create_dir_all(&base_dir).await?;

        let mut bindings: BTreeMap<String, RepositoryBinding> = store
            .list_repository_bindings()
            .await?
            .into_iter()
            .map(|binding| (binding.alias.clone(), binding))
            .collect();

        if bindings.is_empty() {
            let loaded = sidecar::load(&sidecar_path).await?;
            for (alias, binding) in loaded.repositories {
                store.upsert_repository_binding(&binding).await?;
                bindings.insert(alias, binding);
            }
        }

        let registry = Self {
            store,
            base_dir,
            sidecar_path,
            default_working_dir: default_working_dir.into(),
            bindings: RwLock::new(bindings),
        };
        registry.persist_sidecar().await?;
        Ok(registry)
    }

    async fn persist_sidecar(&self) -> Result<()> {
        let bindings = self.bindings.read().await;
        let sidecar = Sidecar {
            repositories: bindings.clone(),
            last_updated: Some(Utc::now()),
        };
        sidecar::save(&self.sidecar_path, &sidecar).await
    }

    async fn insert_binding(&self, binding: RepositoryBinding) -> Result<()> {
        self.store.upsert_repository_binding(&binding).await?;
        self.bindings
            .write()
            .await
            .insert(binding.alias.clone(), binding);
        self.persist_sidecar().await
    }

    fn derive_alias_from_url(url: &str) -> String {
        url.rsplit('/')
            .next()
            .unwrap_or(url)
            .trim_end_matches(".git")
            .to_string()
    }

    /// Clones `url` into `{base_dir}/{alias}`; fails if the alias already
    /// exists. Ports `repo_manager.py::connect_to_github_repo`.
    pub async fn connect_remote(
        &self,
        url: &str,
        alias: Option<String>,
        branch: &str,
    ) -> Result<RepositoryBinding> {
        let alias = alias.unwrap_or_else(|| Self::derive_alias_from_url(url));
        if self.bindings.read().await.contains_key(&alias) {
            return Err(RepoError::AliasExists { alias });
        }

        let working_dir = self.base_dir.join(&alias);
        git::clone(url, &working_dir, branch).await?;

        let now = Utc::now();
        let binding = RepositoryBinding {
            alias: alias.clone(),
            kind: RepositoryKind::Remote,
            working_dir: working_dir.to_string_lossy().to_string(),
            remote_url: Some(url.to_string()),
            branch: Some(branch.to_string()),
            active: true,
            connected_at: now,
            last_pull: Some(now),
        };
        self.insert_binding(binding.clone()).await?;
        Ok(binding)
    }

    /// Binds an existing directory. Ports
    /// `repo_manager.py::connect_to_local_folder`.
    pub async fn connect_local(
        &self,
        path: &Path,
        alias: Option<String>,
        init: bool,
    ) -> Result<RepositoryBinding> {
        if !path.exists() {
            return Err(RepoError::PathNotFound {
                path: path.display().to_string(),
            });
        }
        if !path.is_dir() {
            return Err(RepoError::NotADirectory {
                path: path.display().to_string(),
            });
        }

        let alias = alias.unwrap_or_else(|| {
            path.file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| "repo".to_string())
        });
        if self.bindings.read().await.contains_key(&alias) {
            return Err(RepoError::AliasExists { alias });
        }

        let mut is_git = git::is_git_repository(path).await;
        if !is_git && init {
            git::init(path).await?;
            is_git = true;
        }

        let (branch, remote_url) = if is_git {
            (git::current_branch(path).await, git::remote_url(path).await)
        } else {
            (None, None)
        };

        let binding = RepositoryBinding {
            alias: alias.clone(),
            kind: RepositoryKind::Local,
            working_dir: path.to_string_lossy().to_string(),
            remote_url,
            branch,
            active: true,
            connected_at: Utc::now(),
            last_pull: None,
        };
        self.insert_binding(binding.clone()).await?;
        Ok(binding)
    }

    /// Removes a binding; if `remove_files` and the repository was cloned
    /// by us, also deletes its working directory.
    pub async fn disconnect(&self, alias: &str, remove_files: bool) -> Result<()> {
        let binding = self.get(alias).await?;

        self.store.remove_repository_binding(alias).await?;
        self.bindings.write().await.remove(alias);
        self.persist_sidecar().await?;

        if remove_files && binding.kind == RepositoryKind::Remote {
            let working_dir = PathBuf::from(&binding.working_dir);
            if working_dir.exists() {
                tokio::fs::remove_dir_all(&working_dir).await?;
            }
        }
        Ok(())
    }

    /// Pulls the latest changes. Fails with a structural error if the
    /// alias is untracked or carries no remote; a git-level failure is
    /// reported inside `PullOutcome` rather than as an `Err`, per the
    /// registry's "never raises" failure model.
    pub async fn pull(&self, alias: &str) -> Result<PullOutcome> {
        let binding = self.get(alias).await?;
        let working_dir = PathBuf::from(&binding.working_dir);

        if !git::is_git_repository(&working_dir).await {
            return Err(RepoError::Untracked {
                alias: alias.to_string(),
            });
        }
        if !git::has_remote(&working_dir).await {
            return Ok(PullOutcome {
                ok: false,
                error: Some("no remote configured".to_string()),
            });
        }

        match git::pull(&working_dir).await {
            Ok(_) => {
                self.store.touch_repository_pull(alias).await?;
                if let Some(existing) = self.bindings.write().await.get_mut(alias) {
                    existing.last_pull = Some(Utc::now());
                }
                self.persist_sidecar().await?;
                Ok(PullOutcome {
                    ok: true,
                    error: None,
                })
            }
            Err(err) => Ok(PullOutcome {
                ok: false,
                error: Some(err.to_string()),
            }),
        }
    }

    /// Stages all changes, commits iff dirty, and pushes if a remote
    /// exists. Ports `repo_manager.py::push_repo_changes`.
    pub async fn commit_and_push(
        &self,
        alias: &str,
        message: Option<String>,
    ) -> Result<CommitOutcome> {
        let binding = self.get(alias).await?;
        let working_dir = PathBuf::from(&binding.working_dir);

        if !git::is_git_repository(&working_dir).await {
            return Err(RepoError::Untracked {
                alias: alias.to_string(),
            });
        }

        let dirty = match git::is_dirty(&working_dir).await {
            Ok(dirty) => dirty,
            Err(err) => {
                return Ok(CommitOutcome {
                    ok: false,
                    commit: None,
                    noop: false,
                    remoteless: false,
                    error: Some(err.to_string()),
                })
            }
        };
        if !dirty {
            return Ok(CommitOutcome {
                ok: true,
                commit: None,
                noop: true,
                remoteless: false,
                error: None,
            });
        }

        if let Err(err) = git::add_all(&working_dir).await {
            return Ok(CommitOutcome {
                ok: false,
                commit: None,
                noop: false,
                remoteless: false,
                error: Some(err.to_string()),
            });
        }

        let message = message.unwrap_or_else(|| {
            format!("Agent updates - {}", Utc::now().format("%Y-%m-%d %H:%M:%S"))
        });
        let commit_id = match git::commit(&working_dir, &message).await {
            Ok(id) => id,
            Err(err) => {
                return Ok(CommitOutcome {
                    ok: false,
                    commit: None,
                    noop: false,
                    remoteless: false,
                    error: Some(err.to_string()),
                })
            }
        };

        let has_remote = git::has_remote(&working_dir).await;
        if !has_remote {
            return Ok(CommitOutcome {
                ok: true,
                commit: Some(commit_id),
                noop: false,
                remoteless: true,
                error: None,
            });
        }

        match git::push(&working_dir).await {
            Ok(()) => Ok(CommitOutcome {
                ok: true,
                commit: Some(commit_id),
                noop: false,
                remoteless: false,
                error: None,
            }),
            Err(err) => Ok(CommitOutcome {
                ok: false,
                commit: Some(commit_id),
                noop: false,
                remoteless: false,
                error: Some(err.to_string()),
            }),
        }
    }

    pub async fn scan(&self, alias: &str) -> Result<crate::scan::ScanResult> {
        let binding = self.get(alias).await?;
        let working_dir = PathBuf::from(&binding.working_dir);
        Ok(crate::scan::scan(&working_dir)?)
    }

    pub async fn tree(&self, alias: &str, max_depth: usize) -> Result<Vec<crate::scan::FileNode>> {
        let binding = self.get(alias).await?;
        let working_dir = PathBuf::from(&binding.working_dir);
        Ok(crate::scan::tree(&working_dir, max_depth)?)
    }

    pub async fn set_active(&self, alias: &str, active: bool) -> Result<()> {
        self.get(alias).await?;
        self.store.set_repository_active(alias, active).await?;
        if let Some(binding) = self.bindings.write().await.get_mut(alias) {
            binding.active = active;
        }
        self.persist_sidecar().await
    }

    pub async fn list(&self) -> Vec<RepositoryBinding> {
        self.bindings.read().await.values().cloned().collect()
    }

    pub async fn get(&self, alias: &str) -> Result<RepositoryBinding> {
        self.bindings
            .read()
            .await
            .get(alias)
            .cloned()
            .ok_or_else(|| RepoError::NotFound {
                alias: alias.to_string(),
            })
    }

    /// The working directory writes should target for a task without a
    /// `target_repo`.
    pub fn default_working_dir(&self) -> &Path {
        &self.default_working_dir
    }

    /// Resolves a task's target repository to a working directory,
    /// falling back to the implicit default repo when `alias` is `None`.
    pub async fn working_dir(&self, alias: Option<&str>) -> Result<PathBuf> {
        match alias {
            Some(alias) => self.get(alias).await.map(|binding| PathBuf::from(binding.working_dir)),
            None => Ok(self.default_working_dir.clone()),
        }
    }
}
