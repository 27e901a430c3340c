//! Schedule operations on top of a [`DocumentStore`].
//!
//! Each method is one user action: it resolves the caller's role, checks the
//! permission the action needs, and performs its writes as a single atomic
//! batch. Nothing is written when a check fails.

use chrono::{DateTime, NaiveDate, Utc};

use crate::access::{
    self, RoleResolution, ensure_can_create_events, ensure_can_delete_event,
    ensure_can_manage_members, ensure_not_self, resolve_role, role_of,
};
use crate::aggregate::CalendarMonth;
use crate::deletion::{DeleteChoice, execute_deletion, resolve_series_deletion};
use crate::error::{GroupCalError, GroupCalResult};
use crate::identity::Identity;
use crate::model::{Event, Member, Role, Schedule, UserProfile, normalize_email};
use crate::series::{EventDraft, EventSeries, build_event_series};
use crate::store::{
    BatchOp, CollectionPath, Document, DocumentStore, Filter, OrderBy, Subscription, encode,
};

/// A schedule as seen by one identity.
#[derive(Debug, Clone)]
pub struct OpenSchedule {
    pub schedule: Schedule,
    pub access: RoleResolution,
    pub role: Role,
    pub members: Vec<Member>,
}

impl OpenSchedule {
    pub fn can_manage_members(&self) -> bool {
        access::can_manage_members(self.role)
    }

    pub fn can_create_events(&self) -> bool {
        access::can_create_events(self.role)
    }
}

#[derive(Clone)]
pub struct ScheduleService<S> {
    store: S,
}

impl<S: DocumentStore> ScheduleService<S> {
    pub fn new(store: S) -> Self {
        ScheduleService { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // USERS:

    /// Record `identity` in the user directory so others can add it by email.
    pub async fn upsert_user(&self, identity: &Identity) -> GroupCalResult<()> {
        let profile = UserProfile::from(identity);
        self.store
            .set_document(&CollectionPath::users(), &profile.id, encode(&profile)?)
            .await
    }

    async fn find_user_by_email(&self, email: &str) -> GroupCalResult<Option<UserProfile>> {
        let docs = self
            .store
            .query_collection(
                &CollectionPath::users(),
                &[Filter::equals("email", normalize_email(email))],
                None,
            )
            .await?;
        docs.first().map(Document::decode).transpose()
    }

    // SCHEDULES:

    /// Create a schedule owned by `owner`, with the owner as its first admin.
    pub async fn create_schedule(
        &self,
        owner: &Identity,
        title: &str,
        description: Option<&str>,
        now: DateTime<Utc>,
    ) -> GroupCalResult<Schedule> {
        if title.trim().is_empty() {
            return Err(GroupCalError::validation("Schedule title is required"));
        }

        let schedule = Schedule::new(title, description, owner, now);
        let owner_member = Member {
            id: owner.id.clone(),
            email: owner.email.clone(),
            display_name: owner.display_label().to_string(),
            role: Role::Admin,
            added_at: now,
            added_by: owner.id.clone(),
        };

        self.store
            .atomic_batch(vec![
                BatchOp::Create {
                    path: CollectionPath::schedules(),
                    id: schedule.id.clone(),
                    data: encode(&schedule)?,
                },
                BatchOp::Create {
                    path: CollectionPath::members(&schedule.id),
                    id: owner_member.id.clone(),
                    data: encode(&owner_member)?,
                },
            ])
            .await?;

        tracing::info!(schedule = %schedule.id, owner = %owner.id, "created schedule");
        Ok(schedule)
    }

    /// Schedules owned by `owner`, newest first.
    pub async fn list_owned_schedules(&self, owner: &Identity) -> GroupCalResult<Vec<Schedule>> {
        self.store
            .query_collection(
                &CollectionPath::schedules(),
                &[Filter::equals("ownerId", owner.id.as_str())],
                Some(&OrderBy::desc("createdAt")),
            )
            .await?
            .iter()
            .map(Document::decode)
            .collect()
    }

    pub async fn get_schedule(&self, schedule_id: &str) -> GroupCalResult<Schedule> {
        self.store
            .get_document(&CollectionPath::schedules(), schedule_id)
            .await?
            .ok_or_else(|| GroupCalError::not_found(format!("Schedule '{schedule_id}'")))?
            .decode()
    }

    /// Load a schedule with the caller's role. Fails if the caller has none.
    pub async fn open_schedule(
        &self,
        schedule_id: &str,
        actor: &Identity,
    ) -> GroupCalResult<OpenSchedule> {
        let schedule = self.get_schedule(schedule_id).await?;
        let members = self.list_members(schedule_id).await?;

        let access = resolve_role(&schedule, &members, actor);
        let role = role_of(&schedule, &members, actor).inspect_err(|_| {
            tracing::warn!(schedule = schedule_id, actor = %actor.id, "access refused");
        })?;

        Ok(OpenSchedule {
            schedule,
            access,
            role,
            members,
        })
    }

    // MEMBERS:

    /// Members in the order they were added.
    pub async fn list_members(&self, schedule_id: &str) -> GroupCalResult<Vec<Member>> {
        self.store
            .query_collection(
                &CollectionPath::members(schedule_id),
                &[],
                Some(&OrderBy::asc("addedAt")),
            )
            .await?
            .iter()
            .map(Document::decode)
            .collect()
    }

    /// Add the user registered under `email` with `role`. Admins only.
    pub async fn add_member(
        &self,
        schedule_id: &str,
        actor: &Identity,
        email: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> GroupCalResult<Member> {
        let open = self.open_schedule(schedule_id, actor).await?;
        ensure_can_manage_members(open.role)?;

        let user = self.find_user_by_email(email).await?.ok_or_else(|| {
            GroupCalError::not_found(format!("User with email '{}'", email.trim()))
        })?;

        if open.members.iter().any(|m| m.id == user.id) {
            return Err(GroupCalError::validation(format!(
                "{} is already a member of this schedule",
                user.display_name
            )));
        }

        let member = Member {
            id: user.id.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            role,
            added_at: now,
            added_by: actor.id.clone(),
        };

        self.store
            .atomic_batch(vec![BatchOp::Create {
                path: CollectionPath::members(schedule_id),
                id: member.id.clone(),
                data: encode(&member)?,
            }])
            .await?;

        tracing::info!(schedule = schedule_id, member = %member.id, %role, "added member");
        Ok(member)
    }

    /// Remove another member. Admins only, and never the caller themself.
    pub async fn remove_member(
        &self,
        schedule_id: &str,
        actor: &Identity,
        member_id: &str,
    ) -> GroupCalResult<Member> {
        ensure_not_self(actor, member_id)?;

        let open = self.open_schedule(schedule_id, actor).await?;
        ensure_can_manage_members(open.role)?;

        let member = open
            .members
            .into_iter()
            .find(|m| m.id == member_id)
            .ok_or_else(|| GroupCalError::not_found(format!("Member '{member_id}'")))?;

        self.store
            .delete_document(&CollectionPath::members(schedule_id), member_id)
            .await?;

        tracing::info!(schedule = schedule_id, member = member_id, "removed member");
        Ok(member)
    }

    pub async fn subscribe_members(
        &self,
        schedule_id: &str,
        actor: &Identity,
    ) -> GroupCalResult<Subscription> {
        self.open_schedule(schedule_id, actor).await?;
        self.store
            .subscribe(&CollectionPath::members(schedule_id), Vec::new())
            .await
    }

    // EVENTS:

    /// Build and store the events described by `draft`, all or nothing.
    pub async fn create_events(
        &self,
        schedule_id: &str,
        actor: &Identity,
        draft: &EventDraft,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> GroupCalResult<EventSeries> {
        let open = self.open_schedule(schedule_id, actor).await?;
        ensure_can_create_events(open.role)?;

        let series = build_event_series(draft, actor, today, now)?;

        let path = CollectionPath::events(schedule_id);
        let ops = series
            .events()
            .iter()
            .map(|event| {
                Ok(BatchOp::Create {
                    path: path.clone(),
                    id: event.id.clone(),
                    data: encode(event)?,
                })
            })
            .collect::<GroupCalResult<Vec<_>>>()?;
        self.store.atomic_batch(ops).await?;

        tracing::info!(schedule = schedule_id, count = series.len(), "created events");
        Ok(series)
    }

    pub async fn get_event(&self, schedule_id: &str, event_id: &str) -> GroupCalResult<Event> {
        self.store
            .get_document(&CollectionPath::events(schedule_id), event_id)
            .await?
            .ok_or_else(|| GroupCalError::not_found(format!("Event '{event_id}'")))?
            .decode()
    }

    /// All events of a schedule, ordered by start time.
    pub async fn list_events(&self, schedule_id: &str, actor: &Identity) -> GroupCalResult<Vec<Event>> {
        self.open_schedule(schedule_id, actor).await?;
        self.query_events(schedule_id, &[]).await
    }

    /// Events dated within `month`, ordered by start time.
    pub async fn events_in_month(
        &self,
        schedule_id: &str,
        actor: &Identity,
        month: CalendarMonth,
    ) -> GroupCalResult<Vec<Event>> {
        self.open_schedule(schedule_id, actor).await?;
        self.query_events(schedule_id, &month_filters(month)).await
    }

    async fn query_events(&self, schedule_id: &str, filters: &[Filter]) -> GroupCalResult<Vec<Event>> {
        self.store
            .query_collection(
                &CollectionPath::events(schedule_id),
                filters,
                Some(&OrderBy::asc("startTime")),
            )
            .await?
            .iter()
            .map(Document::decode)
            .collect()
    }

    /// Live events of a schedule, optionally limited to one month.
    pub async fn subscribe_events(
        &self,
        schedule_id: &str,
        actor: &Identity,
        month: Option<CalendarMonth>,
    ) -> GroupCalResult<Subscription> {
        self.open_schedule(schedule_id, actor).await?;
        let filters = month.map(month_filters).unwrap_or_default();
        self.store
            .subscribe(&CollectionPath::events(schedule_id), filters)
            .await
    }

    /// Delete an event, or its whole series, on behalf of `actor`.
    ///
    /// Only the event's creator may do this, with create permission, and
    /// only for events dated `today` or later. Returns the number deleted.
    pub async fn delete_event(
        &self,
        schedule_id: &str,
        actor: &Identity,
        event_id: &str,
        choice: Option<DeleteChoice>,
        today: NaiveDate,
    ) -> GroupCalResult<usize> {
        let open = self.open_schedule(schedule_id, actor).await?;
        let event = self.get_event(schedule_id, event_id).await?;
        ensure_can_delete_event(open.role, &event, actor, today)?;

        let plan = resolve_series_deletion(&event, choice)?;
        execute_deletion(&self.store, schedule_id, &plan).await
    }
}

fn month_filters(month: CalendarMonth) -> Vec<Filter> {
    let (first, last) = month.range();
    vec![
        Filter::ge("date", first.to_string()),
        Filter::le("date", last.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecurrenceType;
    use crate::series::RecurrenceRule;
    use crate::store::MemoryStore;
    use chrono::{NaiveTime, Weekday};

    fn ana() -> Identity {
        Identity::new("u1", "ana@example.com", Some("Ana"))
    }

    fn bo() -> Identity {
        Identity::new("u2", "Bo@Example.com", Some("Bo"))
    }

    fn cy() -> Identity {
        Identity::new("u3", "cy@example.com", None)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn draft(date: NaiveDate, recurring: Option<RecurrenceRule>) -> EventDraft {
        EventDraft {
            title: "Shift".into(),
            description: None,
            date,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            recurring,
        }
    }

    async fn setup() -> (ScheduleService<MemoryStore>, Schedule) {
        let service = ScheduleService::new(MemoryStore::new());
        for who in [ana(), bo(), cy()] {
            service.upsert_user(&who).await.unwrap();
        }
        let schedule = service
            .create_schedule(&ana(), "Front desk", Some("Rota"), Utc::now())
            .await
            .unwrap();
        (service, schedule)
    }

    #[tokio::test]
    async fn creator_becomes_admin_member() {
        let (service, schedule) = setup().await;
        let open = service.open_schedule(&schedule.id, &ana()).await.unwrap();
        assert_eq!(open.access, RoleResolution::Owner);
        assert_eq!(open.members.len(), 1);
        assert_eq!(open.members[0].role, Role::Admin);

        let owned = service.list_owned_schedules(&ana()).await.unwrap();
        assert_eq!(owned, vec![schedule]);
        assert!(service.list_owned_schedules(&bo()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_schedule_is_not_found_and_strangers_are_refused() {
        let (service, schedule) = setup().await;
        let err = service.open_schedule("nope", &ana()).await.unwrap_err();
        assert!(matches!(err, GroupCalError::NotFound(_)));

        let err = service.open_schedule(&schedule.id, &bo()).await.unwrap_err();
        assert!(matches!(err, GroupCalError::Authorization(_)));
    }

    #[tokio::test]
    async fn admin_adds_members_by_email_once() {
        let (service, schedule) = setup().await;
        let member = service
            .add_member(&schedule.id, &ana(), "  BO@example.com ", Role::Editor, Utc::now())
            .await
            .unwrap();
        assert_eq!(member.id, "u2");
        assert_eq!(member.email, "bo@example.com");
        assert_eq!(member.added_by, "u1");

        let again = service
            .add_member(&schedule.id, &ana(), "bo@example.com", Role::Viewer, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(again, GroupCalError::Validation(_)));

        let unknown = service
            .add_member(&schedule.id, &ana(), "zed@example.com", Role::Viewer, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(unknown, GroupCalError::NotFound(_)));
    }

    #[tokio::test]
    async fn only_admins_manage_members() {
        let (service, schedule) = setup().await;
        service
            .add_member(&schedule.id, &ana(), "bo@example.com", Role::Editor, Utc::now())
            .await
            .unwrap();

        let err = service
            .add_member(&schedule.id, &bo(), "cy@example.com", Role::Viewer, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, GroupCalError::Authorization(_)));
        assert_eq!(service.list_members(&schedule.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn members_cannot_remove_themselves() {
        let (service, schedule) = setup().await;
        let err = service.remove_member(&schedule.id, &ana(), "u1").await.unwrap_err();
        assert!(matches!(err, GroupCalError::Authorization(_)));

        service
            .add_member(&schedule.id, &ana(), "bo@example.com", Role::Viewer, Utc::now())
            .await
            .unwrap();
        let removed = service.remove_member(&schedule.id, &ana(), "u2").await.unwrap();
        assert_eq!(removed.id, "u2");

        let err = service.remove_member(&schedule.id, &ana(), "u2").await.unwrap_err();
        assert!(matches!(err, GroupCalError::NotFound(_)));
    }

    #[tokio::test]
    async fn member_subscription_follows_additions_and_removals() {
        let (service, schedule) = setup().await;
        let err = service.subscribe_members(&schedule.id, &bo()).await.unwrap_err();
        assert!(matches!(err, GroupCalError::Authorization(_)));

        let mut sub = service.subscribe_members(&schedule.id, &ana()).await.unwrap();
        let initial: Vec<Member> = sub.next_as().await.unwrap().unwrap();
        assert_eq!(initial.len(), 1);

        service
            .add_member(&schedule.id, &ana(), "bo@example.com", Role::Editor, Utc::now())
            .await
            .unwrap();
        let added: Vec<Member> = sub.next_as().await.unwrap().unwrap();
        assert_eq!(added.len(), 2);
        assert!(added.iter().any(|m| m.id == "u2" && m.role == Role::Editor));

        service.remove_member(&schedule.id, &ana(), "u2").await.unwrap();
        let removed: Vec<Member> = sub.next_as().await.unwrap().unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, "u1");

        sub.cancel();
        assert_eq!(service.store().subscriber_count(), 0);
    }

    #[tokio::test]
    async fn past_dates_are_refused_before_anything_is_written() {
        let (service, schedule) = setup().await;
        let err = service
            .create_events(&schedule.id, &ana(), &draft(d(2029, 12, 31), None), d(2030, 1, 1), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, GroupCalError::Validation(_)));
        assert!(service.list_events(&schedule.id, &ana()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn viewers_cannot_create_events() {
        let (service, schedule) = setup().await;
        service
            .add_member(&schedule.id, &ana(), "cy@example.com", Role::Viewer, Utc::now())
            .await
            .unwrap();

        let err = service
            .create_events(&schedule.id, &cy(), &draft(d(2030, 1, 1), None), d(2030, 1, 1), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, GroupCalError::Authorization(_)));
    }

    #[tokio::test]
    async fn oversized_series_writes_nothing() {
        let (service, schedule) = setup().await;
        let rule = RecurrenceRule {
            pattern: RecurrenceType::Daily,
            end_date: d(2030, 12, 31),
            selected_weekdays: vec![],
        };
        let err = service
            .create_events(&schedule.id, &ana(), &draft(d(2030, 1, 1), Some(rule)), d(2030, 1, 1), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, GroupCalError::Validation(_)));
        assert!(service.list_events(&schedule.id, &ana()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn month_query_returns_only_that_month_in_time_order() {
        let (service, schedule) = setup().await;
        let rule = RecurrenceRule {
            pattern: RecurrenceType::Custom,
            end_date: d(2030, 3, 10),
            selected_weekdays: vec![Weekday::Mon, Weekday::Thu],
        };
        service
            .create_events(&schedule.id, &ana(), &draft(d(2030, 1, 20), Some(rule)), d(2030, 1, 1), Utc::now())
            .await
            .unwrap();

        let feb = CalendarMonth::new(2030, 2).unwrap();
        let events = service.events_in_month(&schedule.id, &ana(), feb).await.unwrap();
        assert_eq!(events.len(), 8);
        assert!(events.iter().all(|e| feb.contains(e.date)));
        assert!(events.windows(2).all(|w| w[0].start_time < w[1].start_time));
    }

    #[tokio::test]
    async fn delete_event_enforces_creator_and_date() {
        let (service, schedule) = setup().await;
        service
            .add_member(&schedule.id, &ana(), "bo@example.com", Role::Editor, Utc::now())
            .await
            .unwrap();
        let series = service
            .create_events(&schedule.id, &bo(), &draft(d(2030, 1, 10), None), d(2030, 1, 1), Utc::now())
            .await
            .unwrap();
        let event_id = series.events()[0].id.clone();

        // Admin, but not the creator.
        let err = service
            .delete_event(&schedule.id, &ana(), &event_id, None, d(2030, 1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, GroupCalError::Authorization(_)));

        // Creator, but the day has passed.
        let err = service
            .delete_event(&schedule.id, &bo(), &event_id, None, d(2030, 1, 11))
            .await
            .unwrap_err();
        assert!(matches!(err, GroupCalError::Authorization(_)));

        let deleted = service
            .delete_event(&schedule.id, &bo(), &event_id, None, d(2030, 1, 10))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
    }

    #[tokio::test]
    async fn whole_series_deletion_removes_every_occurrence() {
        let (service, schedule) = setup().await;
        let rule = RecurrenceRule {
            pattern: RecurrenceType::Weekly,
            end_date: d(2030, 3, 1),
            selected_weekdays: vec![],
        };
        let series = service
            .create_events(&schedule.id, &ana(), &draft(d(2030, 1, 4), Some(rule)), d(2030, 1, 1), Utc::now())
            .await
            .unwrap();
        let count = series.len();
        let target = series.events()[2].id.clone();

        let deleted = service
            .delete_event(&schedule.id, &ana(), &target, Some(DeleteChoice::WholeSeries), d(2030, 1, 1))
            .await
            .unwrap();
        assert_eq!(deleted, count);
        assert!(service.list_events(&schedule.id, &ana()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn event_subscription_follows_writes() {
        let (service, schedule) = setup().await;
        let mut sub = service
            .subscribe_events(&schedule.id, &ana(), None)
            .await
            .unwrap();
        let initial: Vec<Event> = sub.next_as().await.unwrap().unwrap();
        assert!(initial.is_empty());

        service
            .create_events(&schedule.id, &ana(), &draft(d(2030, 1, 1), None), d(2030, 1, 1), Utc::now())
            .await
            .unwrap();
        let after: Vec<Event> = sub.next_as().await.unwrap().unwrap();
        assert_eq!(after.len(), 1);

        sub.cancel();
        assert_eq!(service.store().subscriber_count(), 0);
    }
}
