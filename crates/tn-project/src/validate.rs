//! Project validation logic.

use crate::schema::Project;
use tn_model::ModelError;
use tn_sim::SimError;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },

    #[error("Invalid model: {0}")]
    Model(#[from] ModelError),

    #[error("Invalid controls: {0}")]
    Controls(#[from] SimError),
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.version > crate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }

    if project.name.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "name".to_string(),
            value: format!("{:?}", project.name),
            reason: "must not be empty".to_string(),
        });
    }

    let tanks = project.model.validate()?.tanks();

    if let Some(controls) = &project.controls {
        controls.validate(tanks)?;
    }

    if project.run.record_every == 0 {
        return Err(ValidationError::InvalidValue {
            field: "run.record_every".to_string(),
            value: "0".to_string(),
            reason: "must be positive".to_string(),
        });
    }

    if let Some(levels) = &project.run.initial_levels {
        if levels.len() != tanks {
            return Err(ValidationError::InvalidValue {
                field: "run.initial_levels".to_string(),
                value: format!("{} entries", levels.len()),
                reason: format!("grid has {tanks} tanks"),
            });
        }
        if let Some(h) = levels.iter().find(|h| !h.is_finite() || **h < 0.0) {
            return Err(ValidationError::InvalidValue {
                field: "run.initial_levels".to_string(),
                value: h.to_string(),
                reason: "levels must be finite and non-negative".to_string(),
            });
        }
    }

    Ok(())
}
