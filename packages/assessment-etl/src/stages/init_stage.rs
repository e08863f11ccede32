use std::sync::Arc;

use assessment_storage::{UserRecord, UserStore};
use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::checkpoint::CheckpointSummary;
use crate::error::Result;
use crate::job::EtlStage;
use crate::pipeline::{EtlContext, PipelineData, StageHandler};

/// Ensures the job's user record exists
pub struct InitStage {
    users: Arc<dyn UserStore>,
}

impl InitStage {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl StageHandler for InitStage {
    fn stage(&self) -> EtlStage {
        EtlStage::Initialization
    }

    async fn execute(&self, ctx: &mut EtlContext, _data: &mut PipelineData) -> Result<CheckpointSummary> {
        let user_id = ctx.job.user_id;

        if self.users.get_by_id(user_id).await?.is_some() {
            return Ok(CheckpointSummary::count("users_created", 0));
        }

        info!(user_id = %user_id, "Creating user record");
        let user = UserRecord::new(user_id, ctx.job.test_sequence_id)
            .with_name(format!("User_{}", user_id))
            .completed_at(Utc::now());
        self.users.create(user).await?;
        ctx.rollback.user_created = Some(user_id);

        Ok(CheckpointSummary::count("users_created", 1))
    }
}
