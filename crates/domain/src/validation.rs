//! Request validation on top of the `validator` crate.

use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::DomainError;

/// Validates a request, turning rule violations into
/// [`DomainError::Validation`] with one `field: rule` detail per failure.
pub fn validate<T: Validate>(request: &T) -> Result<(), DomainError> {
    request.validate().map_err(into_domain_error)
}

/// Converts collected validation errors into a domain error.
pub fn into_domain_error(errors: ValidationErrors) -> DomainError {
    let mut details = Vec::new();
    collect(&errors, "", &mut details);
    details.sort();
    DomainError::validation("the request is not valid", details)
}

fn collect(errors: &ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                for err in errs {
                    out.push(format!("{path}: {}", err.code));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(inner, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, max = 5))]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn test_valid_request_passes() {
        let ok = Sample {
            name: "ok".to_string(),
            email: "a@b.co".to_string(),
        };
        assert!(validate(&ok).is_ok());
    }

    #[test]
    fn test_details_name_field_and_rule() {
        let bad = Sample {
            name: String::new(),
            email: "nope".to_string(),
        };
        let err = validate(&bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        match err {
            DomainError::Validation { details, .. } => {
                assert_eq!(details, vec!["email: email", "name: length"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
