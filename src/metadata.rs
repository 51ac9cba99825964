use crate::task::ProjectId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub project_id: ProjectId,
    pub project_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_completion_date: Option<NaiveDate>,
}

impl ProjectMetadata {
    pub fn new(project_id: ProjectId, project_name: impl Into<String>) -> Self {
        Self {
            project_id,
            project_name: project_name.into(),
            start_date: None,
            estimated_completion_date: None,
        }
    }
}

impl Default for ProjectMetadata {
    fn default() -> Self {
        Self::new(ProjectId::generate(), "New Project")
    }
}
