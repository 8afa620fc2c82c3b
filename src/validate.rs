use regex::Regex;
use std::sync::LazyLock;

use crate::error::AppError;

// Non-empty local part, one @, domain with at least one dot and a non-empty
// tail. Combined with the length floor this is the whole email rule.
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern"));

pub fn email(addr: &str) -> Result<(), AppError> {
    if addr.len() < 5 || !EMAIL_RE.is_match(addr) {
        return Err(AppError::Validation {
            field: "email",
            constraint: "must contain @ and a domain, minimum length 5".to_string(),
        });
    }
    Ok(())
}

pub fn title(title: &str) -> Result<String, AppError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation {
            field: "title",
            constraint: "required and must be non-empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

pub fn quantity(quantity: i64) -> Result<(), AppError> {
    if quantity < 1 {
        return Err(AppError::Validation {
            field: "quantity",
            constraint: "must be a positive integer".to_string(),
        });
    }
    Ok(())
}

pub fn rating(rating: i64) -> Result<(), AppError> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::Validation {
            field: "rating",
            constraint: "must be between 1 and 5".to_string(),
        });
    }
    Ok(())
}

pub fn family_size(family_size: i64) -> Result<(), AppError> {
    if family_size < 1 {
        return Err(AppError::Validation {
            field: "family_size",
            constraint: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn field_of(err: AppError) -> &'static str {
        match err {
            AppError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn email_accepts_plain_addresses() {
        assert!(email("a@b.c").is_ok());
        assert!(email("donor@example.org").is_ok());
        assert!(email("first.last@mail.example.co").is_ok());
    }

    #[test]
    fn email_rejects_degenerate_forms() {
        for bad in ["abc", "a@b", "@b.c", "a@", "a@b.", "a b@c.d", "a@.c", "", "a@bc"] {
            let err = email(bad).expect_err(bad);
            assert_eq!(field_of(err), "email");
        }
    }

    #[test]
    fn title_requires_non_empty() {
        assert_eq!(title("  Winter Coats ").unwrap(), "Winter Coats");
        assert_eq!(field_of(title("").unwrap_err()), "title");
        assert_eq!(field_of(title("   ").unwrap_err()), "title");
    }

    #[test]
    fn quantity_boundaries() {
        assert!(quantity(1).is_ok());
        assert_eq!(field_of(quantity(0).unwrap_err()), "quantity");
        assert_eq!(field_of(quantity(-3).unwrap_err()), "quantity");
    }

    #[test]
    fn rating_boundaries_inclusive() {
        assert!(rating(1).is_ok());
        assert!(rating(5).is_ok());
        assert_eq!(field_of(rating(0).unwrap_err()), "rating");
        assert_eq!(field_of(rating(6).unwrap_err()), "rating");
    }

    #[test]
    fn family_size_floor() {
        assert!(family_size(1).is_ok());
        assert_eq!(field_of(family_size(0).unwrap_err()), "family_size");
    }
}
