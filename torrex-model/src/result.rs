/// Outcome of one availability check against the debrid/cache collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Availability {
    /// Instantly fetchable from the user's account.
    Available,
    /// Not cached; may still be fetched on demand.
    Unavailable,
    /// The debrid account is waiting for the user to approve a new
    /// connection.
    AuthRequired,
}

/// Caller-facing stream entry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankedResult {
    /// Display name: availability marker, indexer, quality and tags.
    pub name: String,
    /// Display title: release title, language flag, seeders and size.
    pub title: String,
    /// Deep link resolved later by the debrid resolver.
    pub url: String,
}

/// What the engine hands to the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamResponse {
    Streams(Vec<RankedResult>),
    /// A single informational entry asking the user to authorize a pending
    /// debrid connection.
    AuthRequired(RankedResult),
    NoResults,
}

impl StreamResponse {
    /// Normalizes an empty stream list into `NoResults`.
    pub fn from_streams(streams: Vec<RankedResult>) -> Self {
        if streams.is_empty() {
            StreamResponse::NoResults
        } else {
            StreamResponse::Streams(streams)
        }
    }

    /// Entries in display order; empty for `NoResults`.
    pub fn results(&self) -> &[RankedResult] {
        match self {
            StreamResponse::Streams(streams) => streams,
            StreamResponse::AuthRequired(notice) => std::slice::from_ref(notice),
            StreamResponse::NoResults => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results().is_empty()
    }
}
