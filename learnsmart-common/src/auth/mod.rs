//! Account authentication primitives
//!
//! # Design Principle
//!
//! This module contains ONLY:
//! - Password hashing and verification (argon2)
//! - Bearer token issue/validation (HS256 JWT)
//! - Signing secret persistence (settings table)
//!
//! HTTP extraction and middleware live in the API crate.

pub mod password;
pub mod token;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use password::{hash_password, verify_password};
pub use token::{issue_token, load_signing_secret, validate_token, Claims, TokenKeys};

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
    Instructor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Instructor => "instructor",
        }
    }

    /// Roles allowed to create and edit courses
    pub fn can_author_courses(&self) -> bool {
        matches!(self, Role::Admin | Role::Instructor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "instructor" => Ok(Role::Instructor),
            other => Err(crate::Error::InvalidInput(format!("Unknown role: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::User, Role::Admin, Role::Instructor] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_course_authoring_roles() {
        assert!(!Role::User.can_author_courses());
        assert!(Role::Admin.can_author_courses());
        assert!(Role::Instructor.can_author_courses());
        assert_eq!(Role::default(), Role::User);
    }
}
