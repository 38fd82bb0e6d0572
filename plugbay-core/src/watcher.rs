//! Plugin directory observation and event normalization

use std::path::{Path, PathBuf};

use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher, recommended_watcher};
use tokio::sync::mpsc;

use crate::error::HostError;

/// Normalized change events handed to the lifecycle manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactEvent {
    /// Artifact appeared or changed; schedule a (re)load
    Reload(PathBuf),
    /// Artifact went away; unload immediately
    Unload(PathBuf),
}

/// Loadable-module suffix for the current platform
pub fn module_suffix() -> &'static str {
    std::env::consts::DLL_EXTENSION
}

/// Stem of the shared contracts library. It lives next to the plugins when
/// deployments copy the whole target directory, and must never be treated as
/// a plugin or the host would try to reload itself.
const CONTRACTS_STEM: &str = "plugbay_api";

/// Whether `path` names a loadable plugin artifact.
pub fn is_artifact(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    if !ext.eq_ignore_ascii_case(module_suffix()) {
        return false;
    }
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    stem.trim_start_matches("lib") != CONTRACTS_STEM
}

fn push_reload(out: &mut Vec<ArtifactEvent>, path: &Path) {
    if is_artifact(path) {
        out.push(ArtifactEvent::Reload(path.to_path_buf()));
    }
}

fn push_unload(out: &mut Vec<ArtifactEvent>, path: &Path) {
    if is_artifact(path) {
        out.push(ArtifactEvent::Unload(path.to_path_buf()));
    }
}

/// Map one raw filesystem notification onto artifact events.
///
/// Renames are handled unconditionally as old-name unload plus new-name
/// reload, whichever halves survive the artifact filter.
pub fn normalize(event: &notify::Event) -> Vec<ArtifactEvent> {
    let mut out = Vec::new();
    match &event.kind {
        EventKind::Create(_) => {
            for path in &event.paths {
                push_reload(&mut out, path);
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            for path in &event.paths {
                push_unload(&mut out, path);
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            for path in &event.paths {
                push_reload(&mut out, path);
            }
        }
        EventKind::Modify(ModifyKind::Name(_)) => {
            // Both/Any: the first path is the old name, the rest are new.
            if let Some((old, rest)) = event.paths.split_first() {
                push_unload(&mut out, old);
                for path in rest {
                    push_reload(&mut out, path);
                }
            }
        }
        EventKind::Modify(_) => {
            for path in &event.paths {
                push_reload(&mut out, path);
            }
        }
        EventKind::Remove(_) => {
            for path in &event.paths {
                push_unload(&mut out, path);
            }
        }
        EventKind::Access(_) | EventKind::Any | EventKind::Other => {}
    }
    out
}

/// Watches the plugin directory and pumps normalized events into a channel.
///
/// Dropping the watcher stops the stream.
pub struct PluginWatcher {
    _watcher: RecommendedWatcher,
}

impl PluginWatcher {
    /// Start watching `dir` (subdirectories are not scanned).
    pub fn start(dir: &Path, tx: mpsc::Sender<ArtifactEvent>) -> Result<Self, HostError> {
        let mut watcher =
            recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    for artifact_event in normalize(&event) {
                        // The callback runs on the notify thread.
                        if tx.blocking_send(artifact_event).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "file watcher error");
                }
            })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(Self { _watcher: watcher })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};

    fn so(name: &str) -> PathBuf {
        PathBuf::from(format!("/plugins/{name}.{}", module_suffix()))
    }

    #[test]
    fn test_is_artifact_accepts_platform_suffix() {
        assert!(is_artifact(&so("alpha")));
        assert!(!is_artifact(Path::new("/plugins/alpha.txt")));
        assert!(!is_artifact(Path::new("/plugins/alpha")));
    }

    #[test]
    fn test_is_artifact_filters_contracts_module() {
        assert!(!is_artifact(&so("plugbay_api")));
        assert!(!is_artifact(&so("libplugbay_api")));
        assert!(is_artifact(&so("libsomething_else")));
    }

    #[test]
    fn test_create_maps_to_reload() {
        let event = notify::Event::new(EventKind::Create(CreateKind::File)).add_path(so("a"));
        assert_eq!(normalize(&event), vec![ArtifactEvent::Reload(so("a"))]);
    }

    #[test]
    fn test_data_and_metadata_changes_map_to_reload() {
        let data =
            notify::Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
                .add_path(so("a"));
        assert_eq!(normalize(&data), vec![ArtifactEvent::Reload(so("a"))]);

        let meta =
            notify::Event::new(EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)))
                .add_path(so("a"));
        assert_eq!(normalize(&meta), vec![ArtifactEvent::Reload(so("a"))]);
    }

    #[test]
    fn test_remove_maps_to_unload() {
        let event = notify::Event::new(EventKind::Remove(RemoveKind::File)).add_path(so("a"));
        assert_eq!(normalize(&event), vec![ArtifactEvent::Unload(so("a"))]);
    }

    #[test]
    fn test_rename_both_maps_to_unload_plus_reload() {
        let event = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(so("old"))
            .add_path(so("new"));
        assert_eq!(
            normalize(&event),
            vec![
                ArtifactEvent::Unload(so("old")),
                ArtifactEvent::Reload(so("new")),
            ]
        );
    }

    #[test]
    fn test_rename_away_from_suffix_only_unloads() {
        // a.so -> a.old: the destination is not an artifact.
        let event = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(so("a"))
            .add_path(PathBuf::from("/plugins/a.old"));
        assert_eq!(normalize(&event), vec![ArtifactEvent::Unload(so("a"))]);
    }

    #[test]
    fn test_rename_halves_map_separately() {
        let from = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From)))
            .add_path(so("a"));
        assert_eq!(normalize(&from), vec![ArtifactEvent::Unload(so("a"))]);

        let to = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
            .add_path(so("a"));
        assert_eq!(normalize(&to), vec![ArtifactEvent::Reload(so("a"))]);
    }

    #[test]
    fn test_access_events_are_ignored() {
        let event = notify::Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(so("a"));
        assert!(normalize(&event).is_empty());
    }

    #[test]
    fn test_non_artifact_paths_are_filtered() {
        let event = notify::Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/plugins/readme.md"));
        assert!(normalize(&event).is_empty());
    }
}
