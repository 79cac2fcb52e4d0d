use std::sync::Arc;
use std::time::{Duration, Instant};
use dashmap::DashMap;
use tracing::debug;

use crate::domain::models::{blackout::Blackout, court::Court, schedule::ScheduleSlot};
use crate::domain::ports::{BlackoutRepository, CourtRepository};
use crate::error::AppError;

/// Read-mostly view of one court: its schedule and blackouts.
#[derive(Debug)]
pub struct CourtCatalog {
    pub court: Court,
    pub slots: Vec<ScheduleSlot>,
    pub blackouts: Vec<Blackout>,
}

struct Entry {
    catalog: Arc<CourtCatalog>,
    loaded_at: Instant,
}

/// Per-court TTL cache. Writers call `invalidate` after touching the court, its slots or blackouts.
pub struct CatalogCache {
    entries: DashMap<String, Entry>,
    ttl: Duration,
    court_repo: Arc<dyn CourtRepository>,
    blackout_repo: Arc<dyn BlackoutRepository>,
}

impl CatalogCache {
    pub fn new(court_repo: Arc<dyn CourtRepository>, blackout_repo: Arc<dyn BlackoutRepository>, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            court_repo,
            blackout_repo,
        }
    }

    pub async fn get(&self, court_id: &str) -> Result<Arc<CourtCatalog>, AppError> {
        if let Some(entry) = self.entries.get(court_id)
            && entry.loaded_at.elapsed() < self.ttl
        {
            return Ok(entry.catalog.clone());
        }

        debug!("Catalog cache miss for court {}", court_id);
        let catalog = Arc::new(self.load(court_id).await?);
        self.entries.insert(court_id.to_string(), Entry {
            catalog: catalog.clone(),
            loaded_at: Instant::now(),
        });
        Ok(catalog)
    }

    /// Bypasses the cache; used on write paths that must see the latest catalog.
    pub async fn load(&self, court_id: &str) -> Result<CourtCatalog, AppError> {
        let court = self.court_repo.find_by_id(court_id).await?
            .ok_or(AppError::NotFound("Court not found".into()))?;
        let slots = self.court_repo.list_slots(court_id).await?;
        let blackouts = self.blackout_repo.list_by_court(court_id).await?;

        Ok(CourtCatalog { court, slots, blackouts })
    }

    pub fn invalidate(&self, court_id: &str) {
        self.entries.remove(court_id);
    }
}
