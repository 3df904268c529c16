//! Capability model and compatibility registry.
//!
//! An action is only safe to run against records that carry the data it
//! needs (a chat push needs a renderable message, an offline-download
//! trigger needs a downloadable URL). Instead of inspecting records at
//! dispatch time, each record kind declares the capabilities it
//! implements and each action kind declares the capabilities it
//! requires. The [`CapabilityRegistry`] is built once at startup from
//! explicit registration calls, is immutable afterwards, and is injected
//! into the components that consult it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// A unit of data a record kind can provide to actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// The record can render itself as a chat message.
    ChatMessage,
    /// The record carries a URL suitable for an offline-download task.
    OfflineDownload,
}

/// Closed set of record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Plain,
    Torrent,
    Certificate,
}

impl RecordKind {
    /// Capabilities implemented by this record kind.
    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            RecordKind::Plain => &[Capability::ChatMessage],
            RecordKind::Torrent => &[Capability::ChatMessage, Capability::OfflineDownload],
            RecordKind::Certificate => &[Capability::ChatMessage],
        }
    }
}

/// Closed set of spider kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpiderKind {
    Rss,
    Mikan,
    SslCheck,
}

impl SpiderKind {
    /// Prefix used when building record ids, stable across restarts.
    pub fn prefix(self) -> &'static str {
        match self {
            SpiderKind::Rss => "RssSpider",
            SpiderKind::Mikan => "MikanSpider",
            SpiderKind::SslCheck => "SslCheckSpider",
        }
    }
}

impl fmt::Display for SpiderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Closed set of action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    ChatPush,
    OfflineDownload,
}

impl ActionKind {
    /// Capabilities a record kind must implement for this action to run.
    pub fn required_capabilities(self) -> &'static [Capability] {
        match self {
            ActionKind::ChatPush => &[Capability::ChatMessage],
            ActionKind::OfflineDownload => &[Capability::OfflineDownload],
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::ChatPush => "ChatPushAction",
            ActionKind::OfflineDownload => "OfflineDownloadAction",
        };
        f.write_str(name)
    }
}

/// True iff every required capability is implemented.
pub fn supports_capabilities(required: &[Capability], implemented: &[Capability]) -> bool {
    required.iter().all(|cap| implemented.contains(cap))
}

/// Static compatibility table between spider kinds and action kinds.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    spiders: BTreeMap<SpiderKind, RecordKind>,
    actions: BTreeMap<ActionKind, &'static [Capability]>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a spider kind with the record kind it produces.
    ///
    /// Duplicate registrations are ignored, registration is idempotent.
    pub fn register_spider(&mut self, kind: SpiderKind, record_kind: RecordKind) {
        if self.spiders.contains_key(&kind) {
            tracing::debug!("Spider kind {} already registered, ignoring", kind);
            return;
        }
        self.spiders.insert(kind, record_kind);
    }

    /// Register an action kind. Duplicate registrations are ignored.
    pub fn register_action(&mut self, kind: ActionKind) {
        if self.actions.contains_key(&kind) {
            tracing::debug!("Action kind {} already registered, ignoring", kind);
            return;
        }
        self.actions.insert(kind, kind.required_capabilities());
    }

    /// Capability requirements of a registered action kind.
    pub fn requirements(&self, kind: ActionKind) -> &'static [Capability] {
        self.actions.get(&kind).copied().unwrap_or(&[])
    }

    /// Record kind produced by a registered spider kind.
    pub fn record_kind(&self, kind: SpiderKind) -> Option<RecordKind> {
        self.spiders.get(&kind).copied()
    }

    /// All registered action kinds compatible with a spider kind.
    pub fn supported_action_kinds(&self, spider: SpiderKind) -> BTreeSet<ActionKind> {
        let Some(record_kind) = self.record_kind(spider) else {
            return BTreeSet::new();
        };
        let implemented = record_kind.capabilities();
        self.actions
            .iter()
            .filter(|(_, required)| supports_capabilities(required, implemented))
            .map(|(kind, _)| *kind)
            .collect()
    }

    /// Whether a single action kind is compatible with a spider kind.
    pub fn supports(&self, spider: SpiderKind, action: ActionKind) -> bool {
        self.supported_action_kinds(spider).contains(&action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CapabilityRegistry {
        let mut reg = CapabilityRegistry::new();
        reg.register_spider(SpiderKind::Rss, RecordKind::Plain);
        reg.register_spider(SpiderKind::Mikan, RecordKind::Torrent);
        reg.register_spider(SpiderKind::SslCheck, RecordKind::Certificate);
        reg.register_action(ActionKind::ChatPush);
        reg.register_action(ActionKind::OfflineDownload);
        reg
    }

    #[test]
    fn superset_of_requirements_is_supported() {
        // Torrent implements {ChatMessage, OfflineDownload}, a superset of
        // both actions' requirements.
        let required = ActionKind::OfflineDownload.required_capabilities();
        assert!(supports_capabilities(
            required,
            RecordKind::Torrent.capabilities()
        ));
        // Plain implements only {ChatMessage}.
        assert!(!supports_capabilities(
            required,
            RecordKind::Plain.capabilities()
        ));
    }

    #[test]
    fn supported_action_kinds_per_spider() {
        let reg = registry();
        let rss = reg.supported_action_kinds(SpiderKind::Rss);
        assert!(rss.contains(&ActionKind::ChatPush));
        assert!(!rss.contains(&ActionKind::OfflineDownload));

        let mikan = reg.supported_action_kinds(SpiderKind::Mikan);
        assert!(mikan.contains(&ActionKind::ChatPush));
        assert!(mikan.contains(&ActionKind::OfflineDownload));
    }

    #[test]
    fn duplicate_registration_is_ignored() {
        let mut reg = registry();
        // Conflicting re-registration must not override the first one.
        reg.register_spider(SpiderKind::Rss, RecordKind::Torrent);
        assert_eq!(reg.record_kind(SpiderKind::Rss), Some(RecordKind::Plain));
        reg.register_action(ActionKind::ChatPush);
        assert_eq!(
            reg.requirements(ActionKind::ChatPush),
            &[Capability::ChatMessage]
        );
    }

    #[test]
    fn unregistered_spider_supports_nothing() {
        let reg = CapabilityRegistry::new();
        assert!(reg.supported_action_kinds(SpiderKind::Rss).is_empty());
    }
}
