use std::collections::HashSet;
use std::env;

use log::debug;
use serde::Serialize;

use sacristan_core::DocumentStore;

use crate::util::normalize_email;

/// The collection whose per-account documents authoritatively confer the
/// teacher role. Documents are keyed by provider uid.
pub const TEACHER_ROLE_COLLECTION: &str = "teachers";

/// The effective role of the signed-in account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
    Unknown,
}

/// How far role resolution has progressed for the current session.
///
/// The email check is instant and runs on sign-in; the authoritative
/// document check follows asynchronously and can only refine the result. A
/// failed document check leaves the optimistic grant standing, since the
/// role document often does not exist yet right after a first sign-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RoleResolution {
    /// Nobody is signed in, or resolution has not run yet.
    #[default]
    Unknown,
    /// The email is not on the allow-list. Terminal; no document check runs.
    NotMatched,
    /// The email is allow-listed. Already a teacher, pending confirmation.
    EmailMatched,
    /// The authoritative role document exists.
    Confirmed,
    /// The document check failed. The optimistic grant stands.
    Unconfirmed,
}

impl RoleResolution {
    pub fn role(&self) -> Role {
        match self {
            RoleResolution::Unknown => Role::Unknown,
            RoleResolution::NotMatched => Role::Student,
            RoleResolution::EmailMatched
            | RoleResolution::Confirmed
            | RoleResolution::Unconfirmed => Role::Teacher,
        }
    }

    pub fn is_teacher(&self) -> bool {
        self.role() == Role::Teacher
    }

    /// Folds the outcome of the authoritative document check into the
    /// resolution. Only an optimistic match can move; every other state,
    /// and in particular a granted role, is never downgraded here.
    pub fn after_document_check(self, exists: bool) -> Self {
        match (self, exists) {
            (RoleResolution::EmailMatched, true) => RoleResolution::Confirmed,
            (RoleResolution::EmailMatched, false) => RoleResolution::Unconfirmed,
            (other, _) => other,
        }
    }
}

/// Checks whether the authoritative role document exists for the account.
///
/// A missing document and a failed read both come back as `false`. Right
/// after a first sign-in the document may simply not be provisioned yet, so
/// the miss is logged and otherwise ignored.
pub async fn confirm_role<S>(store: &S, uid: &str) -> bool
where
    S: DocumentStore + ?Sized,
{
    match store.get(TEACHER_ROLE_COLLECTION, uid).await {
        Ok(_) => true,
        Err(error) => {
            debug!("teacher role for {} is unconfirmed: {}", uid, error);
            false
        }
    }
}

/// The static set of emails eligible for the teacher role.
///
/// This is the optimistic side of authorization: it is consulted before any
/// per-account document exists, and changing it requires a redeploy.
#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    emails: HashSet<String>,
}

impl Allowlist {
    pub const ENV_VAR: &'static str = "SACRISTAN_TEACHER_EMAILS";

    pub fn new(emails: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self {
            emails: emails
                .into_iter()
                .map(|email| normalize_email(email.as_ref()))
                .collect(),
        }
    }

    /// Reads the comma-separated allow-list from the environment. A missing
    /// or empty variable yields an empty list, which never matches.
    pub fn from_env() -> Self {
        let raw = env::var(Self::ENV_VAR).unwrap_or_default();

        Self::new(raw.split(',').filter(|email| !email.trim().is_empty()))
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(&normalize_email(email))
    }

    /// The instant, optimistic half of role resolution.
    pub fn resolve_email(&self, email: &str) -> RoleResolution {
        if self.contains(email) {
            RoleResolution::EmailMatched
        } else {
            RoleResolution::NotMatched
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn matches_emails_case_insensitively() {
        let allowlist = Allowlist::new(["Teacher@Example.com"]);

        assert!(allowlist.contains("teacher@example.com"));
        assert!(allowlist.contains(" TEACHER@EXAMPLE.COM "));
        assert!(!allowlist.contains("other@example.com"));
    }

    #[test]
    fn resolves_emails_to_an_optimistic_result() {
        let allowlist = Allowlist::new(["teacher@example.com"]);

        assert_eq!(
            allowlist.resolve_email("teacher@example.com"),
            RoleResolution::EmailMatched
        );
        assert_eq!(
            allowlist.resolve_email("student@example.com"),
            RoleResolution::NotMatched
        );
    }

    #[test]
    fn empty_allowlists_never_match() {
        let allowlist = Allowlist::default();

        assert_eq!(
            allowlist.resolve_email("teacher@example.com"),
            RoleResolution::NotMatched
        );
    }

    #[test]
    fn reads_the_allowlist_from_the_environment() {
        env::set_var(Allowlist::ENV_VAR, "a@example.com, B@Example.com ,");

        let allowlist = Allowlist::from_env();

        assert!(allowlist.contains("a@example.com"));
        assert!(allowlist.contains("b@example.com"));
        assert!(!allowlist.contains("c@example.com"));

        env::remove_var(Allowlist::ENV_VAR);
    }

    #[test]
    fn confirmation_upgrades_only_optimistic_matches() {
        use RoleResolution::*;

        assert_eq!(EmailMatched.after_document_check(true), Confirmed);
        assert_eq!(EmailMatched.after_document_check(false), Unconfirmed);

        for terminal in [Unknown, NotMatched, Confirmed, Unconfirmed] {
            assert_eq!(terminal.after_document_check(true), terminal);
            assert_eq!(terminal.after_document_check(false), terminal);
        }
    }

    #[test]
    fn roles_follow_the_resolution() {
        use RoleResolution::*;

        assert_eq!(Unknown.role(), Role::Unknown);
        assert_eq!(NotMatched.role(), Role::Student);

        for teacher in [EmailMatched, Confirmed, Unconfirmed] {
            assert_eq!(teacher.role(), Role::Teacher);
            assert!(teacher.is_teacher());
        }
    }
}
