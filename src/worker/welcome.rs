//! Welcome notifications for newly registered users.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{JobError, JobHandler};
use crate::db::{Database, UserRepository};
use crate::{Id, Result};

/// Queue name for welcome jobs.
pub const WELCOME_QUEUE: &str = "welcome";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeJob {
    pub user_id: Option<Id>,
}

impl WelcomeJob {
    pub fn new(user_id: Id) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }
}

pub struct WelcomeWorker {
    db: Database,
}

impl WelcomeWorker {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl JobHandler for WelcomeWorker {
    type Job = WelcomeJob;

    async fn handle(&self, job: &WelcomeJob) -> Result<()> {
        let user_id = job.user_id.as_ref().ok_or(JobError::MissingUserId)?;
        let user = UserRepository::new(self.db.pool())
            .get_by_id(user_id)
            .await?
            .ok_or(JobError::UserNotFound)?;

        info!("Welcome {}!", user.email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewUser;
    use crate::VaultError;

    #[tokio::test]
    async fn test_welcome_existing_user() {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("new@example.com", "hash"))
            .await
            .unwrap();

        let worker = WelcomeWorker::new(db);
        assert!(worker.handle(&WelcomeJob::new(user.id)).await.is_ok());
    }

    #[tokio::test]
    async fn test_welcome_errors() {
        let db = Database::open_in_memory().await.unwrap();
        let worker = WelcomeWorker::new(db);

        assert!(matches!(
            worker.handle(&WelcomeJob { user_id: None }).await,
            Err(VaultError::Job(JobError::MissingUserId))
        ));
        assert!(matches!(
            worker.handle(&WelcomeJob::new(Id::from("ghost"))).await,
            Err(VaultError::Job(JobError::UserNotFound))
        ));
    }
}
