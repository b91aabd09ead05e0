//! Submission request DTOs

use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{constants::languages, models::NewSubmission};

/// Create submission request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubmissionRequest {
    /// Source code
    #[validate(length(min = 1, max = 1048576))] // 1MB max
    pub source_code: String,

    /// Execution-service language id
    #[validate(custom(function = "validate_language"))]
    pub language_id: i32,

    /// Problem to submit for
    pub case_id: Uuid,

    /// Authenticated submitter
    pub user_id: Uuid,

    pub contest_id: Option<Uuid>,

    /// Class the contest is taken in, if any
    pub class_id: Option<Uuid>,
}

impl From<CreateSubmissionRequest> for NewSubmission {
    fn from(request: CreateSubmissionRequest) -> Self {
        Self {
            source_code: request.source_code,
            language_id: request.language_id,
            case_id: request.case_id,
            user_id: request.user_id,
            contest_id: request.contest_id,
            class_transaction_id: request.class_id,
        }
    }
}

fn validate_language(language_id: i32) -> Result<(), ValidationError> {
    if languages::find(language_id).is_none() {
        return Err(ValidationError::new("unsupported_language"));
    }
    Ok(())
}

/// Restricts a listing to one class, or to submissions outside any class
#[derive(Debug, Deserialize)]
pub struct ClassFilterQuery {
    pub class_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(language_id: i32, source_code: &str) -> CreateSubmissionRequest {
        CreateSubmissionRequest {
            source_code: source_code.to_string(),
            language_id,
            case_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            contest_id: None,
            class_id: None,
        }
    }

    #[test]
    fn test_known_language_is_valid() {
        assert!(request(71, "print(1)").validate().is_ok());
    }

    #[test]
    fn test_unknown_language_is_rejected() {
        let errors = request(999, "print(1)").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("language_id"));
    }

    #[test]
    fn test_validate_language_by_value() {
        assert!(validate_language(54).is_ok());
        assert_eq!(
            validate_language(0).unwrap_err().code,
            "unsupported_language"
        );
    }

    #[test]
    fn test_empty_source_is_rejected() {
        let errors = request(71, "").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("source_code"));
    }

    #[test]
    fn test_class_id_maps_to_class_transaction() {
        let mut req = request(71, "x");
        let class_id = Uuid::new_v4();
        req.class_id = Some(class_id);

        let new: NewSubmission = req.into();
        assert_eq!(new.class_transaction_id, Some(class_id));
    }
}
