pub mod donations;
pub mod feedback;
pub mod matches;
pub mod profiles;
pub mod reports;
pub mod requests;

use crate::auth::{AuthenticatedUser, Role};
use crate::error::AppError;

pub(crate) fn require_role(user: &AuthenticatedUser, role: Role) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Authorization(format!(
            "requires the {} role, token carries {}",
            role.as_str(),
            user.role.as_str()
        )));
    }
    Ok(())
}
