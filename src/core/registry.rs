//! In-memory job registry.
//!
//! Jobs live for the lifetime of the process. Each job is written only by the
//! task processing it; readers always get a cloned snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Job, JobError};

#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job: Job) {
        self.jobs.write().await.insert(job.id, job);
    }

    /// Snapshot of one job
    pub async fn get(&self, job_id: Uuid) -> Result<Job, JobError> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .cloned()
            .ok_or(JobError::NotFound(job_id))
    }

    /// Mutate a job in place under the write lock
    pub async fn update<R>(
        &self,
        job_id: Uuid,
        f: impl FnOnce(&mut Job) -> R,
    ) -> Result<R, JobError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(JobError::NotFound(job_id))?;
        Ok(f(job))
    }

    /// Most recent jobs first
    pub async fn list(&self, limit: usize) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        jobs
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{JobStatus, NotificationTargets};

    fn job() -> Job {
        Job::new(
            Uuid::new_v4(),
            "id.png".into(),
            "hash".into(),
            NotificationTargets::default(),
        )
    }

    #[tokio::test]
    async fn test_get_returns_snapshot() {
        let registry = JobRegistry::new();
        let job = job();
        let id = job.id;
        registry.insert(job).await;

        let mut snapshot = registry.get(id).await.unwrap();
        snapshot.status = JobStatus::Failed;

        assert_eq!(registry.get(id).await.unwrap().status, JobStatus::Submitted);
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let registry = JobRegistry::new();
        let id = Uuid::new_v4();

        assert_eq!(registry.get(id).await.unwrap_err(), JobError::NotFound(id));
        assert_eq!(
            registry.update(id, |_| ()).await.unwrap_err(),
            JobError::NotFound(id)
        );
    }

    #[tokio::test]
    async fn test_update_applies_transition() {
        let registry = JobRegistry::new();
        let job = job();
        let id = job.id;
        registry.insert(job).await;

        registry.update(id, |job| job.start()).await.unwrap().unwrap();
        assert_eq!(registry.get(id).await.unwrap().status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn test_list_newest_first_with_limit() {
        let registry = JobRegistry::new();
        let mut ids = Vec::new();
        for offset in 0..3 {
            let mut job = job();
            job.created_at += chrono::Duration::seconds(offset);
            ids.push(job.id);
            registry.insert(job).await;
        }

        let listed: Vec<Uuid> = registry.list(2).await.into_iter().map(|j| j.id).collect();
        assert_eq!(listed, vec![ids[2], ids[1]]);
        assert_eq!(registry.len().await, 3);
    }
}
