use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, trace};

/// Maps repositories to the rooms that want to hear about them.
///
/// Repository names are case-insensitive, implementations store and look them up lowercased.
pub trait SubscriptionRegistry: Send + Sync {
    /// Rooms subscribed to `repo`.
    fn lookup(&self, repo: &str) -> anyhow::Result<Vec<String>>;

    /// Subscribes `destination` to `repo`, replacing the token of an existing subscription.
    fn insert(&self, destination: &str, repo: &str, token: &str) -> anyhow::Result<()>;

    /// Returns whether there was such a subscription.
    fn delete(&self, destination: &str, repo: &str) -> anyhow::Result<bool>;

    /// Repositories `destination` is subscribed to, sorted.
    fn list(&self, destination: &str) -> anyhow::Result<Vec<String>>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub destination: String,
    pub repo: String,
    pub token: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SubscriptionFile {
    #[serde(default)]
    subscriptions: Vec<Subscription>,
}

/// Registry persisted as a YAML file.
///
/// The file is read again on every operation, so subscriptions added by another process (e.g.
/// the `subscribe` subcommand) are picked up by a running bot. Writes replace the file with an
/// atomic rename, readers see either the old or the new content, never a partial one.
///
/// Writers don't lock the file: two processes updating it at the same time keep the last write.
pub struct FileRegistry {
    path: PathBuf,
}

impl FileRegistry {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> anyhow::Result<SubscriptionFile> {
        if !self.path.is_file() {
            trace!("no subscription file at {}", self.path.display());
            return Ok(SubscriptionFile::default());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("couldn't open {}", self.path.display()))?;
        serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("couldn't parse {}", self.path.display()))
    }

    fn save(&self, content: &SubscriptionFile) -> anyhow::Result<()> {
        let serialized =
            serde_yaml::to_string(content).context("couldn't serialize subscriptions")?;

        // the temporary file must live on the same filesystem for the rename to be atomic
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)
            .with_context(|| format!("couldn't create temporary file in {}", dir.display()))?;
        file.write_all(serialized.as_bytes())
            .and_then(|_| file.as_file().sync_all())
            .with_context(|| format!("couldn't write {}", file.path().display()))?;
        file.persist(&self.path)
            .with_context(|| format!("couldn't replace {}", self.path.display()))?;

        Ok(())
    }

    fn update<T>(&self, f: impl FnOnce(&mut SubscriptionFile) -> T) -> anyhow::Result<T> {
        let mut content = self.load()?;
        let result = f(&mut content);
        self.save(&content)?;

        Ok(result)
    }
}

impl SubscriptionRegistry for FileRegistry {
    fn lookup(&self, repo: &str) -> anyhow::Result<Vec<String>> {
        let repo = repo.to_lowercase();
        let content = self.load()?;

        Ok(content
            .subscriptions
            .into_iter()
            .filter(|sub| sub.repo == repo)
            .map(|sub| sub.destination)
            .collect())
    }

    fn insert(&self, destination: &str, repo: &str, token: &str) -> anyhow::Result<()> {
        let repo = repo.to_lowercase();
        debug!("subscribing {} to {}", destination, repo);

        self.update(|content| {
            let existing = content
                .subscriptions
                .iter_mut()
                .find(|sub| sub.destination == destination && sub.repo == repo);

            match existing {
                Some(sub) => sub.token = token.to_owned(),
                None => content.subscriptions.push(Subscription {
                    destination: destination.to_owned(),
                    repo,
                    token: token.to_owned(),
                }),
            }
        })
    }

    fn delete(&self, destination: &str, repo: &str) -> anyhow::Result<bool> {
        let repo = repo.to_lowercase();
        debug!("unsubscribing {} from {}", destination, repo);

        self.update(|content| {
            let before = content.subscriptions.len();
            content
                .subscriptions
                .retain(|sub| !(sub.destination == destination && sub.repo == repo));
            content.subscriptions.len() != before
        })
    }

    fn list(&self, destination: &str) -> anyhow::Result<Vec<String>> {
        let mut repos: Vec<String> = self
            .load()?
            .subscriptions
            .into_iter()
            .filter(|sub| sub.destination == destination)
            .map(|sub| sub.repo)
            .collect();
        repos.sort();

        Ok(repos)
    }
}
