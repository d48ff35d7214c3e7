use crate::Db;
use bh_core::{
    models::{DeveloperId, ProjectId},
    ports::DirectoryRepository,
};

impl DirectoryRepository for Db {
    async fn project_exists(&self, project_id: ProjectId) -> Result<bool, Self::Error> {
        sqlx::query_scalar::<_, bool>("select exists (select 1 from project where id = $1)")
            .bind(project_id.0)
            .fetch_one(&self.reader)
            .await
    }

    async fn developer_exists(&self, developer_id: DeveloperId) -> Result<bool, Self::Error> {
        sqlx::query_scalar::<_, bool>("select exists (select 1 from developer where id = $1)")
            .bind(developer_id.0)
            .fetch_one(&self.reader)
            .await
    }
}
