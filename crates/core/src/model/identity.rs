use crate::model::ids::UserId;

/// Who is driving the session, as reported by the authentication collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Identity {
    #[default]
    Anonymous,
    SignedIn(UserId),
}

impl Identity {
    /// Treats a missing or blank id as anonymous.
    #[must_use]
    pub fn from_optional(user_id: Option<&str>) -> Self {
        match user_id.map(str::trim) {
            Some(id) if !id.is_empty() => Self::SignedIn(UserId::new(id)),
            _ => Self::Anonymous,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Anonymous => None,
            Self::SignedIn(id) => Some(id),
        }
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        matches!(self, Self::SignedIn(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_ids_are_anonymous() {
        assert_eq!(Identity::from_optional(None), Identity::Anonymous);
        assert_eq!(Identity::from_optional(Some("  ")), Identity::Anonymous);
        assert!(!Identity::default().is_signed_in());
    }

    #[test]
    fn signed_in_exposes_user_id() {
        let identity = Identity::from_optional(Some(" user-1 "));
        assert!(identity.is_signed_in());
        assert_eq!(identity.user_id().map(UserId::as_str), Some("user-1"));
    }
}
