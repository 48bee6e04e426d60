use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Scheduling effect carried by a taint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaintEffect {
    NoSchedule,
    PreferNoSchedule,
    NoExecute,
}

impl TaintEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaintEffect::NoSchedule => "NoSchedule",
            TaintEffect::PreferNoSchedule => "PreferNoSchedule",
            TaintEffect::NoExecute => "NoExecute",
        }
    }
}

impl fmt::Display for TaintEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaintEffect {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NoSchedule" => Ok(TaintEffect::NoSchedule),
            "PreferNoSchedule" => Ok(TaintEffect::PreferNoSchedule),
            "NoExecute" => Ok(TaintEffect::NoExecute),
            other => Err(ModelError::UnknownEffect(other.to_string())),
        }
    }
}

/// Node taint `{key, value, effect}`.
///
/// Set membership uses the full triple (see [`Taint::identity`]).
/// `time_added` is server-managed metadata; it is carried through untouched and never takes part in identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Taint {
    pub key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    pub effect: TaintEffect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_added: Option<String>,
}

impl Taint {
    pub fn new(key: impl Into<String>, value: impl Into<String>, effect: TaintEffect) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            effect,
            time_added: None,
        }
    }

    /// Canonical identity used for add/remove/dedup.
    #[inline]
    pub fn identity(&self) -> (&str, &str, TaintEffect) {
        (&self.key, &self.value, self.effect)
    }

    /// Returns `true` if both taints share the same `{key, value, effect}`.
    #[inline]
    pub fn same_identity(&self, other: &Taint) -> bool {
        self.identity() == other.identity()
    }

    /// Returns `true` if both taints occupy the same `{key, effect}` slot.
    ///
    /// The API server allows at most one taint per slot.
    #[inline]
    pub fn same_slot(&self, other: &Taint) -> bool {
        self.key == other.key && self.effect == other.effect
    }
}

impl fmt::Display for Taint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}:{}", self.key, self.value, self.effect)
    }
}

/// Parses the `kubectl taint` shorthand: `key=value:Effect` or `key:Effect`.
impl FromStr for Taint {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidTaint(s.to_string());

        let (head, effect) = s.trim().rsplit_once(':').ok_or_else(invalid)?;
        let (key, value) = match head.split_once('=') {
            Some((key, value)) => (key, value),
            None => (head, ""),
        };
        if key.is_empty() || value.contains('=') {
            return Err(invalid());
        }

        Ok(Taint::new(key, value, effect.parse()?))
    }
}
