// src/watch/event_handler.rs

//! Turning one changed path into trigger notifications.

use std::path::Path;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::watch::path_utils::relative_str;
use crate::watch::patterns::TriggerProfile;

/// A trigger class matched a changed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerFired {
    /// Name of the matching [`TriggerProfile`].
    pub trigger: String,
    /// Changed path relative to the watched root, forward slashes.
    pub path: String,
}

/// Names of the profiles interested in `rel_path`, in profile order.
pub fn matching_triggers<'a>(profiles: &'a [TriggerProfile], rel_path: &str) -> Vec<&'a str> {
    profiles
        .iter()
        .filter(|p| p.matches(rel_path))
        .map(|p| p.name())
        .collect()
}

/// Forward one trigger per matching profile.
///
/// Returns `false` once the receiving side is gone, so the caller can stop
/// its event loop.
pub async fn process_file_change(
    root: &Path,
    path: &Path,
    profiles: &[TriggerProfile],
    tx: &mpsc::Sender<TriggerFired>,
) -> bool {
    let Some(rel_str) = relative_str(root, path) else {
        warn!("could not relativize path {:?} against root {:?}", path, root);
        return true;
    };

    for trigger in matching_triggers(profiles, &rel_str) {
        debug!(trigger = %trigger, path = %rel_str, "watch match -> triggering");
        let fired = TriggerFired {
            trigger: trigger.to_string(),
            path: rel_str.clone(),
        };
        if tx.send(fired).await.is_err() {
            debug!("trigger receiver closed");
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, watch: &str) -> TriggerProfile {
        TriggerProfile::new(name, &[watch.to_string()], &[]).unwrap()
    }

    #[test]
    fn several_profiles_may_match_one_path() {
        let profiles = vec![
            profile("html", "src/**/*.html"),
            profile("bundle", "src/**/*"),
            profile("stylus", "src/css/**/*"),
        ];
        assert_eq!(
            matching_triggers(&profiles, "src/index.html"),
            vec!["html", "bundle"]
        );
        assert!(matching_triggers(&profiles, "build/src/index.html").is_empty());
    }

    #[tokio::test]
    async fn forwards_relative_paths() {
        let profiles = vec![profile("static", "src/static/**/*")];
        let (tx, mut rx) = mpsc::channel(4);

        let open = process_file_change(
            Path::new("/m"),
            Path::new("/m/src/static/logo.png"),
            &profiles,
            &tx,
        )
        .await;
        assert!(open);

        let fired = rx.recv().await.unwrap();
        assert_eq!(
            fired,
            TriggerFired {
                trigger: "static".into(),
                path: "src/static/logo.png".into()
            }
        );
    }

    #[tokio::test]
    async fn closed_receiver_stops_processing() {
        let profiles = vec![profile("static", "**/*")];
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let open =
            process_file_change(Path::new("/m"), Path::new("/m/a.txt"), &profiles, &tx).await;
        assert!(!open);
    }
}
