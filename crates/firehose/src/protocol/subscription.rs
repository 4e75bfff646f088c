use crate::protocol::MessageKind;
use serde::Deserialize;
use std::collections::BTreeSet;

/// The set of message kinds whose payloads are mirrored onto the `data` channel.
///
/// A subscription is either a set of kinds, the `all` sentinel which forwards every
/// emission, or disabled. Naming [`MessageKind::All`] among other kinds selects the
/// sentinel, and an empty set is the same as disabled.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "Option<Vec<MessageKind>>")]
pub struct Subscription {
    inner: Inner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Inner {
    Disabled,
    Everything,
    Kinds(BTreeSet<MessageKind>),
}

impl Subscription {
    /// No kind is forwarded, kind-specific events still fire
    pub fn disabled() -> Self {
        Self { inner: Inner::Disabled }
    }

    /// Every emitted kind, `all` included, is forwarded
    pub fn all() -> Self {
        Self { inner: Inner::Everything }
    }

    pub fn kinds<I>(kinds: I) -> Self
    where
        I: IntoIterator<Item = MessageKind>,
    {
        let kinds = kinds.into_iter().collect::<BTreeSet<_>>();
        if kinds.contains(&MessageKind::All) {
            Self::all()
        } else if kinds.is_empty() {
            Self::disabled()
        } else {
            Self { inner: Inner::Kinds(kinds) }
        }
    }

    /// Returns true if events of `kind` are also emitted as `data`
    pub fn forwards(&self, kind: MessageKind) -> bool {
        match &self.inner {
            Inner::Disabled => false,
            Inner::Everything => true,
            Inner::Kinds(kinds) => kinds.contains(&kind),
        }
    }

    #[inline]
    pub fn is_disabled(&self) -> bool {
        matches!(self.inner, Inner::Disabled)
    }

    #[inline]
    pub fn is_all(&self) -> bool {
        matches!(self.inner, Inner::Everything)
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::kinds([MessageKind::Tweet])
    }
}

impl FromIterator<MessageKind> for Subscription {
    fn from_iter<I: IntoIterator<Item = MessageKind>>(iter: I) -> Self {
        Self::kinds(iter)
    }
}

impl From<Option<Vec<MessageKind>>> for Subscription {
    fn from(kinds: Option<Vec<MessageKind>>) -> Self {
        match kinds {
            Some(kinds) => Self::kinds(kinds),
            None => Self::disabled(),
        }
    }
}
