use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ShapeMismatch;

/// Entry every usage breakdown must carry.
pub const TOTAL_KEY: &str = "total";

/// Discriminant of an [`EphemeralUpdate`], in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateKind {
    Activity,
    Usage,
    MachineActivity,
    MachineStatus,
}

impl UpdateKind {
    /// All variants, in the order the registry tries them.
    pub const ALL: [UpdateKind; 4] = [
        UpdateKind::Activity,
        UpdateKind::Usage,
        UpdateKind::MachineActivity,
        UpdateKind::MachineStatus,
    ];

    /// The literal carried in the `type` field.
    pub const fn as_str(self) -> &'static str {
        match self {
            UpdateKind::Activity => "activity",
            UpdateKind::Usage => "usage",
            UpdateKind::MachineActivity => "machine-activity",
            UpdateKind::MachineStatus => "machine-status",
        }
    }

    pub fn from_discriminant(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// Declared fields, excluding `type`, in the order they are checked.
    pub const fn fields(self) -> &'static [FieldSpec] {
        match self {
            UpdateKind::Activity => ACTIVITY_FIELDS,
            UpdateKind::Usage => USAGE_FIELDS,
            UpdateKind::MachineActivity => MACHINE_ACTIVITY_FIELDS,
            UpdateKind::MachineStatus => MACHINE_STATUS_FIELDS,
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateKind {
    type Err = ShapeMismatch;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_discriminant(s).ok_or_else(|| ShapeMismatch::UnknownVariant(s.to_string()))
    }
}

/// Value constraint attached to a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Non-empty string bounded by `id_max`.
    Id,
    /// Non-empty string bounded by `label_max`.
    Label,
    Boolean,
    Number,
    /// Number map with bounded keys and a mandatory `total` entry.
    Breakdown,
}

impl FieldKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            FieldKind::Id => "id",
            FieldKind::Label => "label",
            FieldKind::Boolean => "boolean",
            FieldKind::Number => "number",
            FieldKind::Breakdown => "breakdown",
        }
    }
}

/// A declared field of a variant, by wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind }
}

const ACTIVITY_FIELDS: &[FieldSpec] = &[
    field("sid", FieldKind::Id),
    field("active", FieldKind::Boolean),
    field("activeAt", FieldKind::Number),
    field("thinking", FieldKind::Boolean),
];

const USAGE_FIELDS: &[FieldSpec] = &[
    field("sid", FieldKind::Id),
    field("key", FieldKind::Label),
    field("timestamp", FieldKind::Number),
    field("tokens", FieldKind::Breakdown),
    field("cost", FieldKind::Breakdown),
];

const MACHINE_ACTIVITY_FIELDS: &[FieldSpec] = &[
    field("machineId", FieldKind::Id),
    field("active", FieldKind::Boolean),
    field("activeAt", FieldKind::Number),
];

const MACHINE_STATUS_FIELDS: &[FieldSpec] = &[
    field("machineId", FieldKind::Id),
    field("online", FieldKind::Boolean),
    field("timestamp", FieldKind::Number),
];

/// Whether a session is active and whether its agent is thinking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityUpdate {
    pub sid: String,
    pub active: bool,
    pub active_at: f64,
    pub thinking: bool,
}

/// Token and cost accounting for one usage report of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageUpdate {
    pub sid: String,
    pub key: String,
    pub timestamp: f64,
    pub tokens: UsageBreakdown,
    pub cost: UsageBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineActivityUpdate {
    pub machine_id: String,
    pub active: bool,
    pub active_at: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineStatusUpdate {
    pub machine_id: String,
    pub online: bool,
    pub timestamp: f64,
}

/// Provider-specific number map that always carries a `total` entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UsageBreakdown(BTreeMap<String, f64>);

impl UsageBreakdown {
    pub fn new(total: f64) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(TOTAL_KEY.to_string(), total);
        Self(entries)
    }

    /// Add or replace an entry. Replacing `total` updates the aggregate.
    pub fn with_entry(mut self, key: impl Into<String>, value: f64) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Callers must have checked that `entries` contains [`TOTAL_KEY`].
    pub(crate) fn from_checked(entries: BTreeMap<String, f64>) -> Self {
        debug_assert!(entries.contains_key(TOTAL_KEY));
        Self(entries)
    }

    pub fn total(&self) -> f64 {
        self.0.get(TOTAL_KEY).copied().unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(key, value)| (key.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A validated ephemeral event, tagged by its `type` discriminant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum EphemeralUpdate {
    #[serde(rename = "activity")]
    Activity(ActivityUpdate),
    #[serde(rename = "usage")]
    Usage(UsageUpdate),
    #[serde(rename = "machine-activity")]
    MachineActivity(MachineActivityUpdate),
    #[serde(rename = "machine-status")]
    MachineStatus(MachineStatusUpdate),
}

impl EphemeralUpdate {
    pub fn kind(&self) -> UpdateKind {
        match self {
            EphemeralUpdate::Activity(_) => UpdateKind::Activity,
            EphemeralUpdate::Usage(_) => UpdateKind::Usage,
            EphemeralUpdate::MachineActivity(_) => UpdateKind::MachineActivity,
            EphemeralUpdate::MachineStatus(_) => UpdateKind::MachineStatus,
        }
    }

    pub fn as_activity(&self) -> Option<&ActivityUpdate> {
        match self {
            EphemeralUpdate::Activity(update) => Some(update),
            _ => None,
        }
    }

    pub fn as_usage(&self) -> Option<&UsageUpdate> {
        match self {
            EphemeralUpdate::Usage(update) => Some(update),
            _ => None,
        }
    }

    pub fn as_machine_activity(&self) -> Option<&MachineActivityUpdate> {
        match self {
            EphemeralUpdate::MachineActivity(update) => Some(update),
            _ => None,
        }
    }

    pub fn as_machine_status(&self) -> Option<&MachineStatusUpdate> {
        match self {
            EphemeralUpdate::MachineStatus(update) => Some(update),
            _ => None,
        }
    }

    /// Session the update belongs to, for session-scoped variants.
    pub fn sid(&self) -> Option<&str> {
        match self {
            EphemeralUpdate::Activity(update) => Some(&update.sid),
            EphemeralUpdate::Usage(update) => Some(&update.sid),
            _ => None,
        }
    }

    /// Machine the update belongs to, for machine-scoped variants.
    pub fn machine_id(&self) -> Option<&str> {
        match self {
            EphemeralUpdate::MachineActivity(update) => Some(&update.machine_id),
            EphemeralUpdate::MachineStatus(update) => Some(&update.machine_id),
            _ => None,
        }
    }
}

impl From<ActivityUpdate> for EphemeralUpdate {
    fn from(update: ActivityUpdate) -> Self {
        EphemeralUpdate::Activity(update)
    }
}

impl From<UsageUpdate> for EphemeralUpdate {
    fn from(update: UsageUpdate) -> Self {
        EphemeralUpdate::Usage(update)
    }
}

impl From<MachineActivityUpdate> for EphemeralUpdate {
    fn from(update: MachineActivityUpdate) -> Self {
        EphemeralUpdate::MachineActivity(update)
    }
}

impl From<MachineStatusUpdate> for EphemeralUpdate {
    fn from(update: MachineStatusUpdate) -> Self {
        EphemeralUpdate::MachineStatus(update)
    }
}
