//! SQLite-backed job store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{CreateJobGroupRequest, Job, JobError, JobGroup, JobState, JobStore, StatusUpdate};
use crate::provider::ProviderCost;
use crate::storage::DurableRef;

const JOB_COLUMNS: &str = "id, parent_id, variation_index, requester_id, prompt, provider, \
     provider_task_id, state, progress, provider_url, thumbnail_url, failure_reason, \
     durable_key, durable_url, cost_units, provider_cost, created_at, updated_at";

/// How long a migration claim holds before another worker may take it over.
const DEFAULT_CLAIM_LEASE: Duration = Duration::from_secs(600);

/// SQLite-backed job store.
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
    claim_lease: Duration,
}

impl SqliteJobStore {
    /// Create a new SQLite job store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, JobError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            claim_lease: DEFAULT_CLAIM_LEASE,
        })
    }

    /// Create an in-memory SQLite job store (useful for testing).
    pub fn in_memory() -> Result<Self, JobError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            claim_lease: DEFAULT_CLAIM_LEASE,
        })
    }

    /// Set how long a migration claim is honoured.
    ///
    /// A claim older than this is treated as abandoned (the claiming worker
    /// died mid-ingest) and can be taken again.
    pub fn with_claim_lease(mut self, lease: Duration) -> Self {
        self.claim_lease = lease;
        self
    }

    fn initialize_schema(conn: &Connection) -> Result<(), JobError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS job_groups (
                id TEXT PRIMARY KEY,
                requester_id TEXT NOT NULL,
                prompt TEXT NOT NULL,
                total_cost INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                parent_id TEXT NOT NULL REFERENCES job_groups(id),
                variation_index INTEGER NOT NULL,
                requester_id TEXT NOT NULL,
                prompt TEXT NOT NULL,
                provider TEXT NOT NULL,
                provider_task_id TEXT NOT NULL,
                state TEXT NOT NULL,
                progress INTEGER NOT NULL DEFAULT 0,
                provider_url TEXT,
                thumbnail_url TEXT,
                failure_reason TEXT,
                durable_key TEXT,
                durable_url TEXT,
                migration_claimed_at INTEGER,
                cost_units INTEGER NOT NULL,
                provider_cost TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (parent_id, variation_index)
            );

            CREATE INDEX IF NOT EXISTS idx_job_groups_requester ON job_groups(requester_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_jobs_parent ON jobs(parent_id);
            CREATE INDEX IF NOT EXISTS idx_jobs_state ON jobs(state);
            "#,
        )
        .map_err(db_err)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, JobError> {
        self.conn
            .lock()
            .map_err(|_| JobError::Database("connection mutex poisoned".to_string()))
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
        let state_str: String = row.get(7)?;
        let state = JobState::parse(&state_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                7,
                rusqlite::types::Type::Text,
                format!("unknown job state: {}", state_str).into(),
            )
        })?;

        let durable_key: Option<String> = row.get(12)?;
        let durable_url: Option<String> = row.get(13)?;
        let durable_ref = match (durable_key, durable_url) {
            (Some(key), Some(url)) => Some(DurableRef { key, url }),
            _ => None,
        };

        // Cost is informational; an unreadable blob shouldn't hide the job
        let provider_cost: Option<ProviderCost> = row
            .get::<_, Option<String>>(15)?
            .and_then(|json| serde_json::from_str(&json).ok());

        let created_at: String = row.get(16)?;
        let updated_at: String = row.get(17)?;

        Ok(Job {
            id: row.get(0)?,
            parent_id: row.get(1)?,
            variation_index: row.get(2)?,
            requester_id: row.get(3)?,
            prompt: row.get(4)?,
            provider: row.get(5)?,
            provider_task_id: row.get(6)?,
            state,
            progress: row.get(8)?,
            provider_url: row.get(9)?,
            thumbnail_url: row.get(10)?,
            failure_reason: row.get(11)?,
            durable_ref,
            cost_units: row.get(14)?,
            provider_cost,
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
        })
    }

    fn load_job(conn: &Connection, id: &str) -> Result<Option<Job>, JobError> {
        conn.query_row(
            &format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS),
            params![id],
            Self::row_to_job,
        )
        .optional()
        .map_err(db_err)
    }

    fn require_job(conn: &Connection, id: &str) -> Result<Job, JobError> {
        Self::load_job(conn, id)?.ok_or_else(|| JobError::NotFound(id.to_string()))
    }

    fn load_group(conn: &Connection, parent_id: &str) -> Result<Option<JobGroup>, JobError> {
        let header = conn
            .query_row(
                "SELECT id, requester_id, prompt, total_cost, created_at FROM job_groups WHERE id = ?1",
                params![parent_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, u32>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()
            .map_err(db_err)?;

        let Some((id, requester_id, prompt, total_cost, created_at)) = header else {
            return Ok(None);
        };

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM jobs WHERE parent_id = ?1 ORDER BY variation_index ASC",
                JOB_COLUMNS
            ))
            .map_err(db_err)?;

        let jobs = stmt
            .query_map(params![id], Self::row_to_job)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        Ok(Some(JobGroup {
            parent_id: id,
            requester_id,
            prompt,
            total_cost,
            created_at: parse_timestamp(&created_at),
            jobs,
        }))
    }
}

impl JobStore for SqliteJobStore {
    fn create_group(&self, request: CreateJobGroupRequest) -> Result<JobGroup, JobError> {
        request.validate()?;

        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;

        let parent_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let total_cost = request.total_cost();

        tx.execute(
            "INSERT INTO job_groups (id, requester_id, prompt, total_cost, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                parent_id,
                request.requester_id,
                request.prompt,
                total_cost,
                now.to_rfc3339()
            ],
        )
        .map_err(db_err)?;

        let mut new_jobs = request.jobs.clone();
        new_jobs.sort_by_key(|j| j.variation_index);

        let mut jobs = Vec::with_capacity(new_jobs.len());
        for new_job in new_jobs {
            let id = uuid::Uuid::new_v4().to_string();
            let provider_cost_json = new_job
                .provider_cost
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|e| JobError::Database(e.to_string()))?;

            tx.execute(
                "INSERT INTO jobs (id, parent_id, variation_index, requester_id, prompt, provider, provider_task_id, state, progress, cost_units, provider_cost, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?10, ?11, ?11)",
                params![
                    id,
                    parent_id,
                    new_job.variation_index,
                    request.requester_id,
                    request.prompt,
                    new_job.provider,
                    new_job.provider_task_id,
                    JobState::Pending.as_str(),
                    new_job.cost_units,
                    provider_cost_json,
                    now.to_rfc3339(),
                ],
            )
            .map_err(db_err)?;

            jobs.push(Job {
                id,
                parent_id: parent_id.clone(),
                variation_index: new_job.variation_index,
                requester_id: request.requester_id.clone(),
                prompt: request.prompt.clone(),
                provider: new_job.provider,
                provider_task_id: new_job.provider_task_id,
                state: JobState::Pending,
                progress: 0,
                provider_url: None,
                thumbnail_url: None,
                failure_reason: None,
                durable_ref: None,
                cost_units: new_job.cost_units,
                provider_cost: new_job.provider_cost,
                created_at: now,
                updated_at: now,
            });
        }

        tx.commit().map_err(db_err)?;

        Ok(JobGroup {
            parent_id,
            requester_id: request.requester_id,
            prompt: request.prompt,
            total_cost,
            created_at: now,
            jobs,
        })
    }

    fn get_job(&self, id: &str) -> Result<Option<Job>, JobError> {
        let conn = self.conn()?;
        Self::load_job(&conn, id)
    }

    fn get_group(&self, parent_or_job_id: &str) -> Result<Option<JobGroup>, JobError> {
        let conn = self.conn()?;

        let parent_id: Option<String> = conn
            .query_row(
                "SELECT id FROM job_groups WHERE id = ?1 UNION ALL SELECT parent_id FROM jobs WHERE id = ?1 LIMIT 1",
                params![parent_or_job_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;

        match parent_id {
            Some(parent_id) => Self::load_group(&conn, &parent_id),
            None => Ok(None),
        }
    }

    fn list_groups(
        &self,
        requester_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<JobGroup>, JobError> {
        let conn = self.conn()?;

        let ids: Vec<String> = {
            let mut stmt = conn
                .prepare(
                    "SELECT id FROM job_groups WHERE requester_id = ?1 ORDER BY created_at DESC, id ASC LIMIT ?2 OFFSET ?3",
                )
                .map_err(db_err)?;
            let rows = stmt
                .query_map(params![requester_id, limit, offset], |row| row.get(0))
                .map_err(db_err)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_err)?
        };

        let mut groups = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(group) = Self::load_group(&conn, &id)? {
                groups.push(group);
            }
        }
        Ok(groups)
    }

    fn update_status(&self, id: &str, update: &StatusUpdate) -> Result<Job, JobError> {
        let conn = self.conn()?;
        let current = Self::require_job(&conn, id)?;

        let same_state = update.state == current.state;
        if (same_state && current.state.is_terminal())
            || (!same_state && !current.state.can_transition_to(update.state))
        {
            return Err(JobError::InvalidTransition {
                job_id: id.to_string(),
                from: current.state,
                to: update.state,
            });
        }

        // Providers don't repeat URLs on every poll; keep what we already know
        let provider_url = update
            .provider_url
            .clone()
            .or_else(|| current.provider_url.clone());
        let thumbnail_url = update
            .thumbnail_url
            .clone()
            .or_else(|| current.thumbnail_url.clone());
        let failure_reason = update
            .failure_reason
            .clone()
            .or_else(|| current.failure_reason.clone());
        let now = Utc::now();

        let changed = conn
            .execute(
                "UPDATE jobs SET state = ?1, progress = ?2, provider_url = ?3, thumbnail_url = ?4, failure_reason = ?5, updated_at = ?6 WHERE id = ?7 AND state = ?8",
                params![
                    update.state.as_str(),
                    update.progress,
                    provider_url,
                    thumbnail_url,
                    failure_reason,
                    now.to_rfc3339(),
                    id,
                    current.state.as_str(),
                ],
            )
            .map_err(db_err)?;

        if changed == 0 {
            // Row moved under us (another process); report against its new state
            let latest = Self::require_job(&conn, id)?;
            return Err(JobError::InvalidTransition {
                job_id: id.to_string(),
                from: latest.state,
                to: update.state,
            });
        }

        Ok(Job {
            state: update.state,
            progress: update.progress,
            provider_url,
            thumbnail_url,
            failure_reason,
            updated_at: now,
            ..current
        })
    }

    fn claim_migration(&self, id: &str) -> Result<bool, JobError> {
        let conn = self.conn()?;
        let now = Utc::now();
        let lease_ms = i64::try_from(self.claim_lease.as_millis()).unwrap_or(i64::MAX);
        let stale_before = now.timestamp_millis().saturating_sub(lease_ms);

        let changed = conn
            .execute(
                "UPDATE jobs SET migration_claimed_at = ?1, updated_at = ?2 \
                 WHERE id = ?3 AND state = ?4 AND durable_key IS NULL \
                 AND (migration_claimed_at IS NULL OR migration_claimed_at < ?5)",
                params![
                    now.timestamp_millis(),
                    now.to_rfc3339(),
                    id,
                    JobState::Completed.as_str(),
                    stale_before
                ],
            )
            .map_err(db_err)?;

        if changed == 0 {
            Self::require_job(&conn, id)?;
            return Ok(false);
        }
        Ok(true)
    }

    fn release_migration(&self, id: &str) -> Result<(), JobError> {
        let conn = self.conn()?;

        let changed = conn
            .execute(
                "UPDATE jobs SET migration_claimed_at = NULL WHERE id = ?1 AND durable_key IS NULL",
                params![id],
            )
            .map_err(db_err)?;

        if changed == 0 {
            Self::require_job(&conn, id)?;
        }
        Ok(())
    }

    fn set_durable_ref(&self, id: &str, durable_ref: &DurableRef) -> Result<Job, JobError> {
        let conn = self.conn()?;
        let now = Utc::now();

        let changed = conn
            .execute(
                "UPDATE jobs SET durable_key = ?1, durable_url = ?2, updated_at = ?3 WHERE id = ?4 AND state = ?5 AND durable_key IS NULL",
                params![
                    durable_ref.key,
                    durable_ref.url,
                    now.to_rfc3339(),
                    id,
                    JobState::Completed.as_str()
                ],
            )
            .map_err(db_err)?;

        let job = Self::require_job(&conn, id)?;
        if changed == 0 {
            let reason = if job.durable_ref.is_some() {
                "durable reference already set".to_string()
            } else {
                format!("job is {}, not completed", job.state)
            };
            return Err(JobError::DurableRefRejected {
                job_id: id.to_string(),
                reason,
            });
        }

        Ok(job)
    }
}

fn db_err(e: rusqlite::Error) -> JobError {
    JobError::Database(e.to_string())
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::NewJob;

    fn create_test_store() -> SqliteJobStore {
        SqliteJobStore::in_memory().unwrap()
    }

    fn create_test_request() -> CreateJobGroupRequest {
        CreateJobGroupRequest {
            requester_id: "user-1".to_string(),
            prompt: "a cat on a skateboard".to_string(),
            jobs: (0..3)
                .map(|i| NewJob {
                    variation_index: i,
                    provider: if i == 1 { "runway" } else { "luma" }.to_string(),
                    provider_task_id: format!("task-{}", i),
                    cost_units: 10,
                    provider_cost: None,
                })
                .collect(),
        }
    }

    fn completed_update(url: &str) -> StatusUpdate {
        StatusUpdate {
            state: JobState::Completed,
            progress: 100,
            provider_url: Some(url.to_string()),
            thumbnail_url: None,
            failure_reason: None,
        }
    }

    fn durable(key: &str) -> DurableRef {
        DurableRef {
            key: key.to_string(),
            url: format!("https://store.example/{}", key),
        }
    }

    #[test]
    fn test_create_group() {
        let store = create_test_store();
        let group = store.create_group(create_test_request()).unwrap();

        assert!(!group.parent_id.is_empty());
        assert_eq!(group.total_cost, 30);
        assert_eq!(group.jobs.len(), 3);
        for (i, job) in group.jobs.iter().enumerate() {
            assert_eq!(job.variation_index as usize, i);
            assert_eq!(job.parent_id, group.parent_id);
            assert_eq!(job.state, JobState::Pending);
        }
        assert_eq!(group.jobs[1].provider, "runway");
    }

    #[test]
    fn test_create_group_rejects_partial_group() {
        let store = create_test_store();
        let mut request = create_test_request();
        request.jobs.pop();

        let result = store.create_group(request);
        assert!(matches!(result, Err(JobError::InvalidGroup(_))));

        let groups = store.list_groups("user-1", 10, 0).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_get_group_by_parent_or_job_id() {
        let store = create_test_store();
        let group = store.create_group(create_test_request()).unwrap();

        let by_parent = store.get_group(&group.parent_id).unwrap().unwrap();
        assert_eq!(by_parent, group);

        let by_job = store.get_group(&group.jobs[2].id).unwrap().unwrap();
        assert_eq!(by_job.parent_id, group.parent_id);
        assert_eq!(by_job.jobs.len(), 3);

        assert!(store.get_group("nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_list_groups_by_requester() {
        let store = create_test_store();
        store.create_group(create_test_request()).unwrap();
        store.create_group(create_test_request()).unwrap();

        let mut other = create_test_request();
        other.requester_id = "user-2".to_string();
        store.create_group(other).unwrap();

        assert_eq!(store.list_groups("user-1", 10, 0).unwrap().len(), 2);
        assert_eq!(store.list_groups("user-1", 1, 0).unwrap().len(), 1);
        assert_eq!(store.list_groups("user-2", 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn test_update_status_forward() {
        let store = create_test_store();
        let group = store.create_group(create_test_request()).unwrap();
        let id = &group.jobs[0].id;

        let processing = StatusUpdate {
            state: JobState::Processing,
            progress: 40,
            provider_url: None,
            thumbnail_url: None,
            failure_reason: None,
        };
        let job = store.update_status(id, &processing).unwrap();
        assert_eq!(job.state, JobState::Processing);
        assert_eq!(job.progress, 40);

        let job = store
            .update_status(id, &completed_update("https://cdn.example/v.mp4"))
            .unwrap();
        assert_eq!(job.state, JobState::Completed);

        let fetched = store.get_job(id).unwrap().unwrap();
        assert_eq!(fetched.state, JobState::Completed);
        assert_eq!(
            fetched.provider_url.as_deref(),
            Some("https://cdn.example/v.mp4")
        );
    }

    #[test]
    fn test_update_status_rejects_regression() {
        let store = create_test_store();
        let group = store.create_group(create_test_request()).unwrap();
        let id = &group.jobs[0].id;

        store
            .update_status(id, &completed_update("https://cdn.example/v.mp4"))
            .unwrap();

        let failed = StatusUpdate {
            state: JobState::Failed,
            progress: 0,
            provider_url: None,
            thumbnail_url: None,
            failure_reason: Some("late failure".to_string()),
        };
        let result = store.update_status(id, &failed);
        assert!(matches!(
            result,
            Err(JobError::InvalidTransition {
                from: JobState::Completed,
                to: JobState::Failed,
                ..
            })
        ));

        let fetched = store.get_job(id).unwrap().unwrap();
        assert_eq!(fetched.state, JobState::Completed);
    }

    #[test]
    fn test_update_status_same_state_keeps_known_url() {
        let store = create_test_store();
        let group = store.create_group(create_test_request()).unwrap();
        let id = &group.jobs[0].id;

        let mut update = StatusUpdate {
            state: JobState::Processing,
            progress: 10,
            provider_url: None,
            thumbnail_url: Some("https://cdn.example/thumb.jpg".to_string()),
            failure_reason: None,
        };
        store.update_status(id, &update).unwrap();

        update.progress = 60;
        update.thumbnail_url = None;
        let job = store.update_status(id, &update).unwrap();
        assert_eq!(job.progress, 60);
        assert_eq!(
            job.thumbnail_url.as_deref(),
            Some("https://cdn.example/thumb.jpg")
        );
    }

    #[test]
    fn test_update_status_nonexistent_job() {
        let store = create_test_store();
        let result = store.update_status("missing", &completed_update("https://x"));
        assert!(matches!(result, Err(JobError::NotFound(_))));
    }

    #[test]
    fn test_claim_migration_is_exclusive() {
        let store = create_test_store();
        let group = store.create_group(create_test_request()).unwrap();
        let id = &group.jobs[0].id;

        // Not completed yet
        assert!(!store.claim_migration(id).unwrap());

        store
            .update_status(id, &completed_update("https://cdn.example/v.mp4"))
            .unwrap();

        assert!(store.claim_migration(id).unwrap());
        assert!(!store.claim_migration(id).unwrap());

        store.release_migration(id).unwrap();
        assert!(store.claim_migration(id).unwrap());
    }

    #[test]
    fn test_stale_claim_can_be_retaken() {
        let store = SqliteJobStore::in_memory()
            .unwrap()
            .with_claim_lease(Duration::from_millis(50));
        let group = store.create_group(create_test_request()).unwrap();
        let id = &group.jobs[0].id;
        store
            .update_status(id, &completed_update("https://cdn.example/v.mp4"))
            .unwrap();

        assert!(store.claim_migration(id).unwrap());
        assert!(!store.claim_migration(id).unwrap());

        // The claimer never released; once the lease lapses another worker takes over
        std::thread::sleep(Duration::from_millis(80));
        assert!(store.claim_migration(id).unwrap());
        assert!(!store.claim_migration(id).unwrap());

        // Migrated jobs are never reclaimed, however old the claim
        store.set_durable_ref(id, &durable("videos/u/a.mp4")).unwrap();
        std::thread::sleep(Duration::from_millis(80));
        assert!(!store.claim_migration(id).unwrap());
    }

    #[test]
    fn test_claim_migration_nonexistent_job() {
        let store = create_test_store();
        assert!(matches!(
            store.claim_migration("missing"),
            Err(JobError::NotFound(_))
        ));
    }

    #[test]
    fn test_set_durable_ref_once() {
        let store = create_test_store();
        let group = store.create_group(create_test_request()).unwrap();
        let id = &group.jobs[0].id;

        store
            .update_status(id, &completed_update("https://cdn.example/v.mp4"))
            .unwrap();
        assert!(store.claim_migration(id).unwrap());

        let job = store.set_durable_ref(id, &durable("videos/a.mp4")).unwrap();
        assert_eq!(job.durable_ref, Some(durable("videos/a.mp4")));

        let second = store.set_durable_ref(id, &durable("videos/b.mp4"));
        assert!(matches!(second, Err(JobError::DurableRefRejected { .. })));

        let fetched = store.get_job(id).unwrap().unwrap();
        assert_eq!(fetched.durable_ref, Some(durable("videos/a.mp4")));

        // Migrated jobs can't be claimed again
        store.release_migration(id).unwrap();
        assert!(!store.claim_migration(id).unwrap());
    }

    #[test]
    fn test_set_durable_ref_requires_completed() {
        let store = create_test_store();
        let group = store.create_group(create_test_request()).unwrap();

        let result = store.set_durable_ref(&group.jobs[0].id, &durable("videos/a.mp4"));
        match result {
            Err(JobError::DurableRefRejected { reason, .. }) => {
                assert_eq!(reason, "job is pending, not completed");
            }
            other => panic!("Expected DurableRefRejected, got {:?}", other),
        }
    }

    #[test]
    fn test_provider_cost_persisted() {
        let store = create_test_store();
        let mut request = create_test_request();
        request.jobs[1].provider_cost = Some(ProviderCost {
            credits: Some(50),
            usd: 0.5,
        });
        let group = store.create_group(request).unwrap();

        let job = store.get_job(&group.jobs[1].id).unwrap().unwrap();
        assert_eq!(job.provider_cost.unwrap().credits, Some(50));
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("jobs.db");

        let store = SqliteJobStore::new(&db_path).unwrap();
        let group = store.create_group(create_test_request()).unwrap();

        assert!(db_path.exists());
        assert!(store.get_group(&group.parent_id).unwrap().is_some());
    }
}
