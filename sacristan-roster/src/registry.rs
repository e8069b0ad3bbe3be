use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;
use serde_json::json;

use sacristan_core::{
    commit_in_chunks, fields_from_json, random_id, DocumentId, DocumentStore, FieldValue, Fields,
    FromDocument, Result, WriteBatch,
};

use crate::util::normalize_email;
use crate::{
    Assignment, Availability, AvailabilityStatus, MassDate, RosterContext, Student, SwapRequest,
    SwapStatus, TEACHER_ROLE_COLLECTION,
};

/// Plain record keeping over the scheduling collections: creates, updates,
/// and deletes. Every write lands in the store directly; the live views
/// pick it up through their own subscriptions.
pub struct Registry<S> {
    store: Arc<S>,
}

#[derive(Debug)]
pub struct NewStudent {
    pub name: String,
    pub email: Option<String>,
    pub joined_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct UpdatedStudent {
    pub id: DocumentId,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug)]
pub struct NewMassDate {
    pub date: DateTime<Utc>,
    pub required_roles: Vec<String>,
    pub created_by: Option<String>,
}

#[derive(Debug)]
pub struct NewAvailability {
    pub student_id: DocumentId,
    pub mass_date_id: DocumentId,
    pub status: AvailabilityStatus,
}

#[derive(Debug)]
pub struct NewAssignment {
    pub mass_date_id: DocumentId,
    pub student_id: DocumentId,
    pub role: String,
}

#[derive(Debug)]
pub struct NewSwapRequest {
    pub requester_id: DocumentId,
    pub target_id: DocumentId,
}

/// An account to provision the authoritative teacher role for.
#[derive(Debug)]
pub struct TeacherGrant {
    pub uid: String,
    pub email: String,
    pub name: String,
}

impl<S> Registry<S>
where
    S: DocumentStore,
{
    pub fn new<P>(context: &RosterContext<S, P>) -> Self {
        Self {
            store: context.store.clone(),
        }
    }

    /// Adds a student, returning the stored record.
    pub async fn add_student(&self, new_student: NewStudent) -> Result<Student> {
        let mut fields = fields_from_json(json!({ "name": new_student.name }));

        if let Some(email) = new_student.email {
            fields.insert("email".into(), normalize_email(&email).into());
        }

        if let Some(joined_at) = new_student.joined_at {
            fields.insert("joinedAt".into(), joined_at.into());
        }

        stamp_created(&mut fields);
        stamp_updated(&mut fields);

        let student: Student = self.create(random_id(), fields).await?;

        info!("student {} added", student.id);

        Ok(student)
    }

    /// Updates a student, leaving unspecified fields as they are.
    pub async fn update_student(&self, updated_student: UpdatedStudent) -> Result<Student> {
        let mut document = self
            .store
            .get(Student::COLLECTION, &updated_student.id)
            .await?;

        if let Some(name) = updated_student.name {
            document.fields.insert("name".into(), name.into());
        }

        if let Some(email) = updated_student.email {
            document
                .fields
                .insert("email".into(), normalize_email(&email).into());
        }

        stamp_updated(&mut document.fields);

        self.store
            .set(Student::COLLECTION, &updated_student.id, document.fields)
            .await?;

        self.read(&updated_student.id).await
    }

    pub async fn remove_student(&self, id: &str) -> Result<()> {
        self.store.delete(Student::COLLECTION, id).await
    }

    /// Puts a mass on the calendar.
    pub async fn add_mass_date(&self, new_mass_date: NewMassDate) -> Result<MassDate> {
        let mut fields = Fields::new();

        fields.insert("date".into(), new_mass_date.date.into());
        fields.insert("requiredRoles".into(), new_mass_date.required_roles.into());

        if let Some(created_by) = new_mass_date.created_by {
            fields.insert("createdBy".into(), created_by.into());
        }

        stamp_created(&mut fields);

        let mass_date: MassDate = self.create(random_id(), fields).await?;

        info!("mass date {} added", mass_date.id);

        Ok(mass_date)
    }

    pub async fn remove_mass_date(&self, id: &str) -> Result<()> {
        self.store.delete(MassDate::COLLECTION, id).await
    }

    /// Records a student's availability for one mass date.
    pub async fn record_availability(
        &self,
        new_availability: NewAvailability,
    ) -> Result<Availability> {
        let mut fields = fields_from_json(json!({
            "studentId": new_availability.student_id,
            "massDateId": new_availability.mass_date_id,
            "status": new_availability.status.as_str(),
        }));

        stamp_created(&mut fields);
        stamp_updated(&mut fields);

        self.create(random_id(), fields).await
    }

    pub async fn update_availability(
        &self,
        id: &str,
        status: AvailabilityStatus,
    ) -> Result<Availability> {
        let mut document = self.store.get(Availability::COLLECTION, id).await?;

        document.fields.insert("status".into(), status.as_str().into());
        stamp_updated(&mut document.fields);

        self.store
            .set(Availability::COLLECTION, id, document.fields)
            .await?;

        self.read(id).await
    }

    /// Records a whole roster of assignments in one call, splitting the
    /// writes into store-sized batches. Returns the new ids in input order.
    pub async fn record_assignments(
        &self,
        new_assignments: Vec<NewAssignment>,
    ) -> Result<Vec<DocumentId>> {
        let mut batch = WriteBatch::new();
        let mut ids = Vec::with_capacity(new_assignments.len());

        for new_assignment in new_assignments {
            let mut fields = fields_from_json(json!({
                "massDateId": new_assignment.mass_date_id,
                "studentId": new_assignment.student_id,
                "role": new_assignment.role,
            }));

            stamp_created(&mut fields);
            stamp_updated(&mut fields);

            let id = random_id();
            batch.set(Assignment::COLLECTION, id.clone(), fields);
            ids.push(id);
        }

        commit_in_chunks(&*self.store, batch).await?;

        info!("{} assignments recorded", ids.len());

        Ok(ids)
    }

    pub async fn remove_assignment(&self, id: &str) -> Result<()> {
        self.store.delete(Assignment::COLLECTION, id).await
    }

    /// Asks another student to take over, opening a pending swap request.
    pub async fn request_swap(&self, new_swap: NewSwapRequest) -> Result<SwapRequest> {
        let mut fields = fields_from_json(json!({
            "requesterId": new_swap.requester_id,
            "targetId": new_swap.target_id,
            "status": SwapStatus::Pending.as_str(),
        }));

        stamp_created(&mut fields);
        stamp_updated(&mut fields);

        self.create(random_id(), fields).await
    }

    pub async fn accept_swap(&self, id: &str) -> Result<SwapRequest> {
        self.respond_to_swap(id, SwapStatus::Accepted).await
    }

    pub async fn reject_swap(&self, id: &str) -> Result<SwapRequest> {
        self.respond_to_swap(id, SwapStatus::Rejected).await
    }

    /// Provisions the authoritative role document for an account, keyed by
    /// its provider uid.
    pub async fn grant_teacher_role(&self, grant: TeacherGrant) -> Result<()> {
        let mut fields = fields_from_json(json!({
            "email": normalize_email(&grant.email),
            "name": grant.name,
            "role": "teacher",
        }));

        stamp_created(&mut fields);

        self.store
            .set(TEACHER_ROLE_COLLECTION, &grant.uid, fields)
            .await?;

        info!("teacher role granted to {}", grant.uid);

        Ok(())
    }

    async fn respond_to_swap(&self, id: &str, status: SwapStatus) -> Result<SwapRequest> {
        let mut document = self.store.get(SwapRequest::COLLECTION, id).await?;

        document.fields.insert("status".into(), status.as_str().into());
        stamp_updated(&mut document.fields);

        self.store
            .set(SwapRequest::COLLECTION, id, document.fields)
            .await?;

        self.read(id).await
    }

    /// Writes the fields, then reads the stored document back as a record.
    async fn create<T>(&self, id: DocumentId, fields: Fields) -> Result<T>
    where
        T: FromDocument,
    {
        self.store.set(T::COLLECTION, &id, fields).await?;
        self.read(&id).await
    }

    async fn read<T>(&self, id: &str) -> Result<T>
    where
        T: FromDocument,
    {
        let document = self.store.get(T::COLLECTION, id).await?;

        Ok(T::from_document(&document))
    }
}

fn stamp_created(fields: &mut Fields) {
    fields.insert("createdAt".into(), FieldValue::ServerTime);
}

fn stamp_updated(fields: &mut Fields) {
    fields.insert("updatedAt".into(), FieldValue::ServerTime);
}
