use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, RwLock},
};

use {secrecy::Secret, tracing::info};

/// Immutable snapshot of a workspace's resolvable conversations.
///
/// A directory is always replaced wholesale, never patched in place. Readers
/// hold an [`Arc`] to the snapshot and are unaffected by concurrent reloads.
#[derive(Debug, Default)]
pub struct ChannelDirectory {
    /// Every resolvable key (id, channel name, or user name variant) to the
    /// conversation id it denotes.
    names: HashMap<String, String>,
    /// Ids of direct (one counterpart) conversations.
    direct: HashSet<String>,
    /// Ids of named group conversations.
    group: HashSet<String>,
}

impl ChannelDirectory {
    /// Self-map a conversation id so a raw id always resolves, regardless of
    /// how the conversation is classified afterwards.
    pub fn insert_id(&mut self, id: &str) {
        self.names.insert(id.to_string(), id.to_string());
    }

    /// Record a named group conversation. The id maps to itself so a raw id
    /// always resolves.
    pub fn insert_group(&mut self, id: &str, name: &str) {
        self.names.insert(id.to_string(), id.to_string());
        self.names.insert(name.to_string(), id.to_string());
        self.group.insert(id.to_string());
    }

    /// Record a direct conversation under every name variant of its
    /// counterpart user.
    pub fn insert_direct(
        &mut self,
        id: &str,
        login: &str,
        real_name: Option<&str>,
        display_name: Option<&str>,
    ) {
        self.names.insert(id.to_string(), id.to_string());
        self.names.insert(login.to_string(), id.to_string());
        if let Some(real_name) = real_name.filter(|n| !n.is_empty()) {
            self.names.insert(real_name.to_string(), id.to_string());
        }
        if let Some(display_name) = display_name.filter(|n| !n.is_empty()) {
            self.names.insert(display_name.to_string(), id.to_string());
        }
        self.direct.insert(id.to_string());
    }

    pub fn resolve(&self, key: &str) -> Option<&str> {
        self.names.get(key).map(String::as_str)
    }

    pub fn is_direct(&self, id: &str) -> bool {
        self.direct.contains(id)
    }

    pub fn is_group(&self, id: &str) -> bool {
        self.group.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.direct.len() + self.group.len()
    }
}

struct WorkspaceState {
    token: Secret<String>,
    directory: Arc<ChannelDirectory>,
}

/// Registry of installed workspaces and their directory snapshots.
#[derive(Default)]
pub struct WorkspaceRegistry {
    workspaces: RwLock<HashMap<String, WorkspaceState>>,
}

impl WorkspaceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or refresh the credential for a workspace.
    ///
    /// Re-registering keeps the existing directory snapshot; resolution stays
    /// live on the old snapshot until the next reload completes.
    pub fn register_token(&self, workspace_id: &str, token: Secret<String>) {
        let mut workspaces = self.workspaces.write().unwrap_or_else(|e| e.into_inner());
        match workspaces.get_mut(workspace_id) {
            Some(state) => {
                state.token = token;
                info!(workspace_id, "refreshed workspace credential");
            },
            None => {
                workspaces.insert(
                    workspace_id.to_string(),
                    WorkspaceState {
                        token,
                        directory: Arc::new(ChannelDirectory::default()),
                    },
                );
                info!(workspace_id, "registered new workspace");
            },
        }
    }

    pub fn token(&self, workspace_id: &str) -> Option<Secret<String>> {
        let workspaces = self.workspaces.read().unwrap_or_else(|e| e.into_inner());
        workspaces.get(workspace_id).map(|state| state.token.clone())
    }

    pub fn is_installed(&self, workspace_id: &str) -> bool {
        let workspaces = self.workspaces.read().unwrap_or_else(|e| e.into_inner());
        workspaces.contains_key(workspace_id)
    }

    /// Snapshot of the workspace's directory, or `None` if not installed.
    pub fn directory(&self, workspace_id: &str) -> Option<Arc<ChannelDirectory>> {
        let workspaces = self.workspaces.read().unwrap_or_else(|e| e.into_inner());
        workspaces
            .get(workspace_id)
            .map(|state| Arc::clone(&state.directory))
    }

    /// Atomically swap in a freshly built directory.
    ///
    /// Returns `false` if the workspace was uninstalled in the meantime, in
    /// which case the new directory is discarded.
    pub fn replace_directory(&self, workspace_id: &str, directory: ChannelDirectory) -> bool {
        let mut workspaces = self.workspaces.write().unwrap_or_else(|e| e.into_inner());
        match workspaces.get_mut(workspace_id) {
            Some(state) => {
                state.directory = Arc::new(directory);
                true
            },
            None => false,
        }
    }

    pub fn workspace_ids(&self) -> Vec<String> {
        let workspaces = self.workspaces.read().unwrap_or_else(|e| e.into_inner());
        workspaces.keys().cloned().collect()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    fn sample_directory() -> ChannelDirectory {
        let mut dir = ChannelDirectory::default();
        dir.insert_group("C100", "general");
        dir.insert_direct("D200", "bob", Some("Bob Smith"), Some("bsmith"));
        dir
    }

    #[rstest]
    #[case::group_id("C100", Some("C100"))]
    #[case::group_name("general", Some("C100"))]
    #[case::direct_id("D200", Some("D200"))]
    #[case::login("bob", Some("D200"))]
    #[case::real_name("Bob Smith", Some("D200"))]
    #[case::display_name("bsmith", Some("D200"))]
    #[case::unknown("random", None)]
    fn directory_resolution(#[case] key: &str, #[case] expected: Option<&str>) {
        assert_eq!(sample_directory().resolve(key), expected);
    }

    #[test]
    fn direct_and_group_sets_are_disjoint() {
        let dir = sample_directory();
        assert!(dir.is_group("C100"));
        assert!(!dir.is_direct("C100"));
        assert!(dir.is_direct("D200"));
        assert!(!dir.is_group("D200"));
        assert_eq!(dir.len(), 2);
    }

    #[test]
    fn bare_id_resolves_without_classification() {
        let mut dir = ChannelDirectory::default();
        dir.insert_id("X1");
        assert_eq!(dir.resolve("X1"), Some("X1"));
        assert!(!dir.is_direct("X1"));
        assert!(!dir.is_group("X1"));
    }

    #[test]
    fn direct_insert_skips_empty_name_variants() {
        let mut dir = ChannelDirectory::default();
        dir.insert_direct("D1", "carol", Some(""), None);
        assert_eq!(dir.resolve("carol"), Some("D1"));
        assert_eq!(dir.resolve(""), None);
    }

    #[test]
    fn register_preserves_existing_directory() {
        let registry = WorkspaceRegistry::new();
        registry.register_token("T1", Secret::new("xoxb-1".to_string()));
        assert!(registry.replace_directory("T1", sample_directory()));

        registry.register_token("T1", Secret::new("xoxb-2".to_string()));
        let dir = registry.directory("T1").unwrap();
        assert_eq!(dir.resolve("general"), Some("C100"));
    }

    #[test]
    fn replace_discards_for_unknown_workspace() {
        let registry = WorkspaceRegistry::new();
        assert!(!registry.replace_directory("T9", sample_directory()));
        assert!(!registry.is_installed("T9"));
        assert!(registry.directory("T9").is_none());
    }

    #[test]
    fn snapshot_survives_swap() {
        let registry = WorkspaceRegistry::new();
        registry.register_token("T1", Secret::new("xoxb-1".to_string()));
        registry.replace_directory("T1", sample_directory());

        let old = registry.directory("T1").unwrap();
        registry.replace_directory("T1", ChannelDirectory::default());

        // The held snapshot still resolves; new readers see the empty one.
        assert_eq!(old.resolve("general"), Some("C100"));
        assert!(registry.directory("T1").unwrap().is_empty());
    }
}
