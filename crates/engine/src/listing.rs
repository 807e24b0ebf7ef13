//! Board listing read path.
//!
//! Joined dispatch×driver rows grouped per company, with the countdown
//! projected from one shared `now` snapshot so rows never skew against
//! each other. Nothing here is persisted.

use std::collections::HashMap;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use fleetline_core::{project_countdown, Countdown, DispatchStatus};
use fleetline_storage::{DispatchStorage, LogisticFilter, LogisticListing};

use crate::engine::TransitionEngine;
use crate::error::EngineError;

/// One board row: the dispatch record joined with its driver, plus the
/// derived countdown.
#[derive(Debug, Clone, Serialize)]
pub struct LogisticView {
    pub id: Uuid,
    pub post: bool,
    pub driver_id: Uuid,
    pub status: DispatchStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub effective_since: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub estimated_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
    pub state: String,
    pub location: String,
    pub emoji: String,
    pub note: String,
    pub cargo_id: Option<Uuid>,
    pub driver_name: String,
    pub driver_surname: String,
    pub driver_type: String,
    pub driver_position: String,
    pub company_id: Uuid,
    pub countdown: Countdown,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A company's slice of the board, rows already in status-rank order.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyListing {
    pub company_id: Uuid,
    pub company_name: String,
    pub logistics: Vec<LogisticView>,
}

/// One page of the board plus the total match count.
#[derive(Debug, Clone, Serialize)]
pub struct ListingPage {
    pub companies: Vec<CompanyListing>,
    pub total: u64,
}

impl<S: DispatchStorage> TransitionEngine<S> {
    /// Fetch one page of the dispatch board.
    pub async fn list(&self, filter: &LogisticFilter) -> Result<ListingPage, EngineError> {
        let (rows, total) = self.storage().list_logistics(filter).await?;

        let names: HashMap<Uuid, String> = self
            .storage()
            .list_companies()
            .await?
            .into_iter()
            .map(|c| (c.id, format!("{} {}", c.name, c.scac)))
            .collect();

        let now = OffsetDateTime::now_utc();
        let mut companies: Vec<CompanyListing> = Vec::new();
        for row in rows {
            let view = into_view(row, now);
            match companies.last_mut() {
                Some(group) if group.company_id == view.company_id => {
                    group.logistics.push(view);
                }
                _ => companies.push(CompanyListing {
                    company_id: view.company_id,
                    company_name: names.get(&view.company_id).cloned().unwrap_or_default(),
                    logistics: vec![view],
                }),
            }
        }

        Ok(ListingPage { companies, total })
    }
}

fn into_view(row: LogisticListing, now: OffsetDateTime) -> LogisticView {
    let rec = row.logistic;
    let countdown = project_countdown(rec.status, rec.effective_since, rec.estimated_at, now);
    LogisticView {
        id: rec.id,
        post: rec.post,
        driver_id: rec.driver_id,
        status: rec.status,
        effective_since: rec.effective_since,
        estimated_at: rec.estimated_at,
        scheduled_at: rec.scheduled_at,
        state: rec.state,
        location: rec.location,
        emoji: rec.emoji,
        note: rec.note,
        cargo_id: rec.cargo_id,
        driver_name: row.driver_name,
        driver_surname: row.driver_surname,
        driver_type: row.driver_type,
        driver_position: row.driver_position,
        company_id: row.company_id,
        countdown,
        updated_at: rec.updated_at,
    }
}
