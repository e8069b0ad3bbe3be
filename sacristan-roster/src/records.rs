use chrono::{DateTime, Utc};
use serde::Serialize;

use sacristan_core::{Document, DocumentId, FromDocument};

/// A student who can be assigned liturgical roles.
///
/// Like every record here, this decodes permissively: whatever fields a
/// stored document is missing simply stay unset, and the id always comes
/// from the document's external key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: DocumentId,
    pub name: String,
    pub email: Option<String>,
    pub joined_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl FromDocument for Student {
    const COLLECTION: &'static str = "students";

    fn from_document(document: &Document) -> Self {
        Self {
            id: document.id.clone(),
            name: document.text_or_empty("name"),
            email: document.text("email").map(str::to_string),
            joined_at: document.timestamp("joinedAt"),
            created_at: document.timestamp("createdAt"),
            updated_at: document.timestamp("updatedAt"),
        }
    }
}

/// A mass on the calendar, along with the roles it needs filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MassDate {
    pub id: DocumentId,
    pub date: Option<DateTime<Utc>>,
    pub required_roles: Vec<String>,
    pub created_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl FromDocument for MassDate {
    const COLLECTION: &'static str = "massDates";

    fn from_document(document: &Document) -> Self {
        Self {
            id: document.id.clone(),
            date: document.timestamp("date"),
            required_roles: document.text_list("requiredRoles"),
            created_by: document.text("createdBy").map(str::to_string),
            created_at: document.timestamp("createdAt"),
        }
    }
}

/// Whether a student can serve on a given mass date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityStatus {
    Available,
    Unavailable,
    Uncertain,
}

impl AvailabilityStatus {
    /// Parses the stored representation. Unknown text yields `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "available" => Some(Self::Available),
            "unavailable" => Some(Self::Unavailable),
            "uncertain" => Some(Self::Uncertain),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Unavailable => "unavailable",
            Self::Uncertain => "uncertain",
        }
    }
}

/// One student's availability for one mass date.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub id: DocumentId,
    pub student_id: DocumentId,
    pub mass_date_id: DocumentId,
    pub status: Option<AvailabilityStatus>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl FromDocument for Availability {
    const COLLECTION: &'static str = "availabilities";

    fn from_document(document: &Document) -> Self {
        Self {
            id: document.id.clone(),
            student_id: document.text_or_empty("studentId"),
            mass_date_id: document.text_or_empty("massDateId"),
            status: document.text("status").and_then(AvailabilityStatus::parse),
            created_at: document.timestamp("createdAt"),
            updated_at: document.timestamp("updatedAt"),
        }
    }
}

/// A student filling one role on one mass date.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: DocumentId,
    pub mass_date_id: DocumentId,
    pub student_id: DocumentId,
    pub role: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl FromDocument for Assignment {
    const COLLECTION: &'static str = "assignments";

    fn from_document(document: &Document) -> Self {
        Self {
            id: document.id.clone(),
            mass_date_id: document.text_or_empty("massDateId"),
            student_id: document.text_or_empty("studentId"),
            role: document.text_or_empty("role"),
            created_at: document.timestamp("createdAt"),
            updated_at: document.timestamp("updatedAt"),
        }
    }
}

/// The lifecycle of a swap request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapStatus {
    Pending,
    Accepted,
    Rejected,
}

impl SwapStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

/// One student asking another to take over an assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub id: DocumentId,
    pub requester_id: DocumentId,
    pub target_id: DocumentId,
    pub status: Option<SwapStatus>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl FromDocument for SwapRequest {
    const COLLECTION: &'static str = "swapRequests";

    fn from_document(document: &Document) -> Self {
        Self {
            id: document.id.clone(),
            requester_id: document.text_or_empty("requesterId"),
            target_id: document.text_or_empty("targetId"),
            status: document.text("status").and_then(SwapStatus::parse),
            created_at: document.timestamp("createdAt"),
            updated_at: document.timestamp("updatedAt"),
        }
    }
}
