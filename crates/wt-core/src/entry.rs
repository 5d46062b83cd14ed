//! Time entries as read from the provider.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;

use crate::interval::{IntervalError, TimeInterval};
use crate::types::{EntryId, IdError, ProjectId, TagId};

/// Reasons a raw record cannot become a [`SourceEntry`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EntryError {
    /// A required interval field is absent, e.g. a timer that is still running.
    #[error("entry {id} has no {field}")]
    Malformed { id: String, field: &'static str },

    /// The interval fields are present but do not form a valid interval.
    #[error("entry {id}: {source}")]
    InvalidInterval {
        id: String,
        #[source]
        source: IntervalError,
    },

    /// An identifier on the record is invalid.
    #[error("entry {id}: {source}")]
    InvalidId {
        id: String,
        #[source]
        source: IdError,
    },
}

/// A record exactly as the provider returned it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub id: String,
    pub description: Option<String>,
    pub project_id: Option<String>,
    pub tag_ids: Vec<String>,
    pub billable: bool,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Descriptive fields copied onto every entry derived from a source entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntryMetadata {
    pub description: String,
    pub project_id: Option<ProjectId>,
    pub tag_ids: Vec<TagId>,
    pub billable: bool,
}

/// A validated entry with a complete interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceEntry {
    id: EntryId,
    interval: TimeInterval,
    metadata: EntryMetadata,
}

impl SourceEntry {
    pub const fn new(id: EntryId, interval: TimeInterval, metadata: EntryMetadata) -> Self {
        Self {
            id,
            interval,
            metadata,
        }
    }

    /// Validates a raw record, viewing its instants in `timezone`.
    pub fn from_raw(raw: RawEntry, timezone: Tz) -> Result<Self, EntryError> {
        let invalid_id = |source| EntryError::InvalidId {
            id: raw.id.clone(),
            source,
        };

        let id = EntryId::new(raw.id.clone()).map_err(invalid_id)?;
        let start = raw.start.ok_or_else(|| EntryError::Malformed {
            id: raw.id.clone(),
            field: "start",
        })?;
        let end = raw.end.ok_or_else(|| EntryError::Malformed {
            id: raw.id.clone(),
            field: "end",
        })?;
        let interval = TimeInterval::from_utc(start, end, timezone).map_err(|source| {
            EntryError::InvalidInterval {
                id: raw.id.clone(),
                source,
            }
        })?;

        // Clockify reports "no project" as either null or an empty string
        let project_id = match raw.project_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(project) => Some(ProjectId::new(project).map_err(invalid_id)?),
        };
        let tag_ids = raw
            .tag_ids
            .iter()
            .map(|tag| TagId::new(tag.as_str()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid_id)?;

        Ok(Self {
            id,
            interval,
            metadata: EntryMetadata {
                description: raw.description.unwrap_or_default(),
                project_id,
                tag_ids,
                billable: raw.billable,
            },
        })
    }

    pub const fn id(&self) -> &EntryId {
        &self.id
    }

    pub const fn interval(&self) -> &TimeInterval {
        &self.interval
    }

    pub const fn metadata(&self) -> &EntryMetadata {
        &self.metadata
    }
}
