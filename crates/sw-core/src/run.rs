//! Run identity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity and start time of one detection cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStamp {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
}

impl RunStamp {
    /// A fresh run starting now
    pub fn new() -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        Self {
            run_id: id[..12].to_string(),
            started_at: Utc::now(),
        }
    }

    /// A run with a fixed id and start time
    pub fn at(run_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at,
        }
    }
}

impl Default for RunStamp {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_run_ids_differ() {
        let a = RunStamp::new();
        let b = RunStamp::new();
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.run_id.len(), 12);
    }
}
