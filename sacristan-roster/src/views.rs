use std::sync::Arc;

use sacristan_core::{
    CollectionObserver, Direction, DocumentStore, FromDocument, Query, Result, Subscription,
};

use crate::{Assignment, Availability, MassDate, RosterContext, Student, SwapRequest, SwapStatus};

/// The live views the scheduling screens are built from.
///
/// Each call establishes one subscription and streams the full decoded
/// collection to its observer until the subscription is cancelled. Views
/// update independently of one another; anything joined across two views
/// must be re-derived on every delivery, since the other side may not have
/// caught up yet.
pub struct Views<S> {
    store: Arc<S>,
}

impl<S> Views<S>
where
    S: DocumentStore,
{
    pub fn new<P>(context: &RosterContext<S, P>) -> Self {
        Self {
            store: context.store.clone(),
        }
    }

    /// All students, ordered by name.
    pub async fn students<O>(&self, observer: O) -> Result<Subscription>
    where
        O: CollectionObserver<Student> + 'static,
    {
        let query = Query::collection(Student::COLLECTION).order_by("name", Direction::Ascending);

        Subscription::start(&*self.store, query, observer).await
    }

    /// The calendar of masses, chronological.
    pub async fn mass_dates<O>(&self, observer: O) -> Result<Subscription>
    where
        O: CollectionObserver<MassDate> + 'static,
    {
        let query = Query::collection(MassDate::COLLECTION).order_by("date", Direction::Ascending);

        Subscription::start(&*self.store, query, observer).await
    }

    /// Every recorded availability, oldest first.
    pub async fn availabilities<O>(&self, observer: O) -> Result<Subscription>
    where
        O: CollectionObserver<Availability> + 'static,
    {
        let query = Query::collection(Availability::COLLECTION)
            .order_by("createdAt", Direction::Ascending);

        Subscription::start(&*self.store, query, observer).await
    }

    /// The assignments of one mass date.
    pub async fn assignments_for_mass_date<O>(
        &self,
        mass_date_id: &str,
        observer: O,
    ) -> Result<Subscription>
    where
        O: CollectionObserver<Assignment> + 'static,
    {
        let query = Query::collection(Assignment::COLLECTION)
            .where_eq("massDateId", mass_date_id)
            .order_by("createdAt", Direction::Ascending);

        Subscription::start(&*self.store, query, observer).await
    }

    /// The assignments of one student across all mass dates.
    pub async fn assignments_for_student<O>(
        &self,
        student_id: &str,
        observer: O,
    ) -> Result<Subscription>
    where
        O: CollectionObserver<Assignment> + 'static,
    {
        let query = Query::collection(Assignment::COLLECTION)
            .where_eq("studentId", student_id)
            .order_by("createdAt", Direction::Ascending);

        Subscription::start(&*self.store, query, observer).await
    }

    /// The pending swap requests aimed at one student, oldest first. This
    /// is the student's inbox; resolved requests drop out of it.
    pub async fn pending_swaps_for_student<O>(
        &self,
        student_id: &str,
        observer: O,
    ) -> Result<Subscription>
    where
        O: CollectionObserver<SwapRequest> + 'static,
    {
        let query = Query::collection(SwapRequest::COLLECTION)
            .where_eq("targetId", student_id)
            .where_eq("status", SwapStatus::Pending.as_str())
            .order_by("createdAt", Direction::Ascending);

        Subscription::start(&*self.store, query, observer).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        Allowlist, LocalProvider, NewAssignment, NewMassDate, NewStudent, NewSwapRequest, Registry,
    };

    use chrono::{DateTime, TimeZone, Utc};
    use crossbeam::channel::Receiver;
    use sacristan_core::channel_observer;
    use sacristan_impls::MemoryStore;
    use std::sync::Arc;

    struct Fixture {
        views: Views<MemoryStore>,
        registry: Registry<MemoryStore>,
    }

    fn fixture() -> Fixture {
        let context = RosterContext {
            store: Arc::new(MemoryStore::new()),
            provider: Arc::new(LocalProvider::new()),
            allowlist: Allowlist::default(),
        };

        Fixture {
            views: Views::new(&context),
            registry: Registry::new(&context),
        }
    }

    fn new_student(name: &str) -> NewStudent {
        NewStudent {
            name: name.to_string(),
            email: None,
            joined_at: None,
        }
    }

    fn new_assignment(mass_date_id: &str, student_id: &str, role: &str) -> NewAssignment {
        NewAssignment {
            mass_date_id: mass_date_id.to_string(),
            student_id: student_id.to_string(),
            role: role.to_string(),
        }
    }

    /// Drains the channel and returns the most recent snapshot.
    fn latest<T>(receiver: &Receiver<Vec<T>>) -> Vec<T> {
        let mut last = None;

        while let Ok(snapshot) = receiver.try_recv() {
            last = Some(snapshot);
        }

        last.expect("at least one snapshot was delivered")
    }

    #[tokio::test]
    async fn students_arrive_sorted_by_name() {
        let fixture = fixture();

        for name in ["Miriam", "Ana", "Teresa"] {
            fixture
                .registry
                .add_student(new_student(name))
                .await
                .expect("student is added");
        }

        let (sender, receiver) = crossbeam::channel::unbounded();

        let _subscription = fixture
            .views
            .students(channel_observer(sender))
            .await
            .expect("view starts");

        let names: Vec<String> = latest(&receiver).into_iter().map(|s| s.name).collect();

        assert_eq!(names, vec!["Ana", "Miriam", "Teresa"]);
    }

    fn saturday(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, 10, 0, 0)
            .single()
            .expect("date is valid")
    }

    #[tokio::test]
    async fn mass_dates_arrive_chronologically_and_follow_changes() {
        let fixture = fixture();

        let (sender, receiver) = crossbeam::channel::unbounded();

        let _subscription = fixture
            .views
            .mass_dates(channel_observer(sender))
            .await
            .expect("view starts");

        assert!(latest(&receiver).is_empty());

        let mut added = vec![];

        // Inserted out of calendar order.
        for day in [10, 17, 3] {
            let mass_date = fixture
                .registry
                .add_mass_date(NewMassDate {
                    date: saturday(day),
                    required_roles: vec!["acolyte".to_string()],
                    created_by: None,
                })
                .await
                .expect("mass date is added");

            added.push(mass_date);
        }

        let dates: Vec<_> = latest(&receiver).into_iter().map(|m| m.date).collect();

        assert_eq!(
            dates,
            vec![
                Some(saturday(3)),
                Some(saturday(10)),
                Some(saturday(17))
            ]
        );

        fixture
            .registry
            .remove_mass_date(&added[1].id)
            .await
            .expect("mass date is removed");

        let remaining: Vec<_> = latest(&receiver).into_iter().map(|m| m.date).collect();

        assert_eq!(remaining, vec![Some(saturday(3)), Some(saturday(10))]);
    }

    #[tokio::test]
    async fn assignment_views_stay_scoped_to_their_parameter() {
        let fixture = fixture();

        fixture
            .registry
            .record_assignments(vec![
                new_assignment("m1", "s1", "acolyte"),
                new_assignment("m1", "s2", "lector"),
                new_assignment("m2", "s1", "acolyte"),
            ])
            .await
            .expect("assignments are recorded");

        let (by_date, by_date_rx) = crossbeam::channel::unbounded();
        let (by_student, by_student_rx) = crossbeam::channel::unbounded();

        let _date_view = fixture
            .views
            .assignments_for_mass_date("m1", channel_observer(by_date))
            .await
            .expect("view starts");

        let _student_view = fixture
            .views
            .assignments_for_student("s1", channel_observer(by_student))
            .await
            .expect("view starts");

        let for_date = latest(&by_date_rx);
        assert_eq!(for_date.len(), 2);
        assert!(for_date.iter().all(|a| a.mass_date_id == "m1"));

        let for_student = latest(&by_student_rx);
        assert_eq!(for_student.len(), 2);
        assert!(for_student.iter().all(|a| a.student_id == "s1"));
    }

    #[tokio::test]
    async fn unrelated_writes_do_not_wake_a_scoped_view() {
        let fixture = fixture();

        let (sender, receiver) = crossbeam::channel::unbounded();

        let _subscription = fixture
            .views
            .assignments_for_mass_date("m1", channel_observer(sender))
            .await
            .expect("view starts");

        assert!(latest(&receiver).is_empty());

        fixture
            .registry
            .record_assignments(vec![new_assignment("m2", "s1", "acolyte")])
            .await
            .expect("assignment is recorded");

        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn the_swap_inbox_only_holds_pending_requests() {
        let fixture = fixture();

        let first = fixture
            .registry
            .request_swap(NewSwapRequest {
                requester_id: "s1".to_string(),
                target_id: "s2".to_string(),
            })
            .await
            .expect("swap is requested");

        fixture
            .registry
            .request_swap(NewSwapRequest {
                requester_id: "s3".to_string(),
                target_id: "s2".to_string(),
            })
            .await
            .expect("swap is requested");

        fixture
            .registry
            .request_swap(NewSwapRequest {
                requester_id: "s1".to_string(),
                target_id: "s9".to_string(),
            })
            .await
            .expect("swap is requested");

        let (sender, receiver) = crossbeam::channel::unbounded();

        let _subscription = fixture
            .views
            .pending_swaps_for_student("s2", channel_observer(sender))
            .await
            .expect("view starts");

        assert_eq!(latest(&receiver).len(), 2);

        fixture
            .registry
            .accept_swap(&first.id)
            .await
            .expect("swap is accepted");

        let inbox = latest(&receiver);

        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].requester_id, "s3");
    }

    #[tokio::test]
    async fn cancelled_views_go_quiet() {
        let fixture = fixture();

        let (sender, receiver) = crossbeam::channel::unbounded();

        let subscription = fixture
            .views
            .students(channel_observer(sender))
            .await
            .expect("view starts");

        assert!(latest(&receiver).is_empty());

        subscription.cancel();

        fixture
            .registry
            .add_student(new_student("Ana"))
            .await
            .expect("student is added");

        assert!(receiver.try_recv().is_err());
    }
}
