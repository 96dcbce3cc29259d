use examguard_common::protocol::Role;
use rand::Rng;
use thiserror::Error;

/// Upper bound (exclusive) of the numeric suffix of generated student ids.
const STUDENT_ID_SPACE: u32 = 100_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoginError {
    #[error("Please fill all fields")]
    MissingFields,
}

/// Who is using the client. No credentials are checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub email: String,
    pub name: String,
    pub role: Role,
}

pub fn login(email: &str, password: &str, role: Role) -> Result<UserProfile, LoginError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(LoginError::MissingFields);
    }

    let name = email.split('@').next().unwrap_or(email).to_string();
    Ok(UserProfile {
        email: email.to_string(),
        name,
        role,
    })
}

/// Identity of one exam sitting.
///
/// Passed as `Arc<StudentSession>` to every periodic task of the sitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentSession {
    pub student_id: String,
    pub exam_user_id: String,
    pub role: Role,
}

impl StudentSession {
    pub fn start(profile: &UserProfile) -> Self {
        Self {
            student_id: generate_student_id(),
            exam_user_id: profile.email.clone(),
            role: profile.role,
        }
    }
}

pub fn generate_student_id() -> String {
    let n = rand::thread_rng().gen_range(0..STUDENT_ID_SPACE);
    format!("student_{}", n)
}
