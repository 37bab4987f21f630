//! Threat query operations

use serde::Serialize;
use tracing::debug;

use crate::db::{CategoryStat, Database, SeverityStat};
use crate::error::{AppError, AppResult};
use crate::query::ThreatQuery;
use crate::threat::ThreatRecord;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatPage {
    pub data: Vec<ThreatRecord>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatStats {
    pub total: i64,
    pub by_category: Vec<CategoryStat>,
    pub by_severity: Vec<SeverityStat>,
}

#[derive(Clone)]
pub struct ThreatService {
    db: Database,
}

impl ThreatService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, query: &ThreatQuery) -> AppResult<ThreatPage> {
        let (data, total) = tokio::try_join!(
            self.db.list_threats(query),
            self.db.count_threats(&query.filter)
        )?;
        debug!(
            page = query.page,
            limit = query.limit,
            returned = data.len(),
            total,
            "listed threats"
        );

        Ok(ThreatPage {
            data,
            total,
            page: query.page,
            limit: query.limit,
            total_pages: query.total_pages(total),
        })
    }

    pub async fn find_one(&self, id: i64) -> AppResult<ThreatRecord> {
        self.db
            .find_threat(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Threat with ID {} not found", id)))
    }

    pub async fn stats(&self) -> AppResult<ThreatStats> {
        let (total, by_category, by_severity) = tokio::try_join!(
            self.db.get_total_count(),
            self.db.get_category_stats(),
            self.db.get_severity_stats()
        )?;

        Ok(ThreatStats {
            total,
            by_category,
            by_severity,
        })
    }
}
