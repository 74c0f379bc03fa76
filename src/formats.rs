use serde::{Deserialize, Serialize};

/// Metadata of one shared track, keyed by its link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub description: String,
    pub cover: String,
    pub link: String,
}
