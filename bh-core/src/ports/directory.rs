use crate::models::{DeveloperId, ProjectId};

/// Existence checks against the user and project directory.
///
/// Users and projects are managed elsewhere; auctions and bids only need to
/// know that the referenced rows exist.
pub trait DirectoryRepository: super::Repository {
    /// Whether the project exists
    fn project_exists(
        &self,
        project_id: ProjectId,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Whether the developer exists
    fn developer_exists(
        &self,
        developer_id: DeveloperId,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;
}
