//! RemoveTodayUseCase: delete every stored picture dated today.
//!
//! "Today" is computed with the configured [`DayPolicy`] and compared with
//! each item's `image_date`, which the display records in its own local
//! clock.  Items without a readable date are never deleted.

use chrono::{DateTime, Utc};
use tracing::info;
use weatherart_core::{CleanupFilter, DayPolicy};

use super::device_session::{DeletionOutcome, DeviceSession, SessionError};

/// Result of a removal run.
#[derive(Debug, Default)]
pub struct RemovalReport {
    pub outcomes: Vec<DeletionOutcome>,
}

impl RemovalReport {
    pub fn removed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.removed()
    }
}

/// The remove-today use case.
pub struct RemoveTodayUseCase {
    /// `None` scans every category.
    category: Option<String>,
    policy: DayPolicy,
}

impl RemoveTodayUseCase {
    /// An empty `category` means all categories.
    pub fn new(category: Option<String>, policy: DayPolicy) -> Self {
        Self {
            category: category.filter(|c| !c.is_empty()),
            policy,
        }
    }

    /// Deletes matching items and closes `session`.
    ///
    /// # Errors
    ///
    /// Fails only if the initial listing fails; individual deletions are
    /// reported in the [`RemovalReport`].
    pub async fn run(
        &self,
        session: &mut DeviceSession,
        now: DateTime<Utc>,
    ) -> Result<RemovalReport, SessionError> {
        let filter = CleanupFilter::today(self.category.clone(), self.policy, now);
        info!(
            day = ?filter.day,
            category = filter.category.as_deref().unwrap_or("*"),
            "removing today's images"
        );
        let result = session.remove_by_filter(&filter).await;
        session.close().await;

        let report = RemovalReport { outcomes: result? };
        if report.outcomes.is_empty() {
            info!("no images from today found");
        } else {
            info!(
                removed = report.removed(),
                failed = report.failed(),
                "removal finished"
            );
        }
        Ok(report)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
