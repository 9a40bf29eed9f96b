//! Goal, deliverable and goal-event repository tests.
//!
//! Skipped unless DATABASE_URL points at a Postgres instance.

use chrono::{Duration, TimeZone, Utc};
use forge_db::test_fixtures::TestDatabase;
use forge_db::{
    plan_placeholder_slots, DeliverableInput, DeliverableRepository, GoalInput, GoalRepository,
    InfoTagInput, SlotRequest, UpdateDeliverableRequest,
};
use uuid::Uuid;

async fn setup() -> Option<TestDatabase> {
    dotenvy::dotenv().ok();
    TestDatabase::connect().await
}

fn sample_goal() -> GoalInput {
    GoalInput {
        title: "  Launch beta  ".to_string(),
        description: "Get it out".to_string(),
        due_date: Some(Utc.with_ymd_and_hms(2026, 12, 1, 17, 0, 0).unwrap()),
        deliverables: vec![
            DeliverableInput {
                title: "Write docs".to_string(),
                minutes_estimate: Some(60),
                ..Default::default()
            },
            DeliverableInput {
                title: "Cut release".to_string(),
                completed: true,
                ..Default::default()
            },
        ],
        info_tags: vec![InfoTagInput {
            title: "Owner".to_string(),
            info: "Platform team".to_string(),
        }],
    }
}

#[tokio::test]
async fn test_create_and_get_goal_with_children() {
    let Some(t) = setup().await else { return };
    let user = t.create_user().await;

    let goal = t.db.goals.create(&user, sample_goal()).await.unwrap();
    assert_eq!(goal.title, "Launch beta");
    assert_eq!(goal.user_id, user);
    assert_eq!(goal.deliverables.len(), 2);
    assert_eq!(goal.deliverables[0].order, 0);
    assert_eq!(goal.deliverables[1].order, 1);
    assert!(goal.deliverables[1].completed);
    assert_eq!(goal.info_tags.len(), 1);
    assert_eq!(goal.info_tags[0].goal_id, Some(goal.id));

    let fetched = t.db.goals.get(&user, goal.id).await.unwrap().unwrap();
    assert_eq!(fetched.deliverables[0].title, "Write docs");

    t.cleanup(&user).await;
}

#[tokio::test]
async fn test_goals_are_scoped_to_owner() {
    let Some(t) = setup().await else { return };
    let alice = t.create_user().await;
    let bob = t.create_user().await;

    let goal = t.db.goals.create(&alice, sample_goal()).await.unwrap();

    assert!(t.db.goals.get(&bob, goal.id).await.unwrap().is_none());
    assert!(t.db.goals.list_for_user(&bob).await.unwrap().is_empty());
    assert!(t
        .db
        .goals
        .replace(&bob, goal.id, GoalInput::default())
        .await
        .unwrap()
        .is_none());
    assert!(!t.db.goals.delete(&bob, goal.id).await.unwrap());
    assert!(t.db.goals.get(&alice, goal.id).await.unwrap().is_some());

    t.cleanup(&alice).await;
    t.cleanup(&bob).await;
}

#[tokio::test]
async fn test_list_newest_first() {
    let Some(t) = setup().await else { return };
    let user = t.create_user().await;

    let first = t.db.goals.create(&user, sample_goal()).await.unwrap();
    let second = t
        .db
        .goals
        .create(
            &user,
            GoalInput {
                title: "Second".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let goals = t.db.goals.list_for_user(&user).await.unwrap();
    assert_eq!(goals.len(), 2);
    assert_eq!(goals[0].id, second.id);
    assert_eq!(goals[1].id, first.id);
    assert_eq!(goals[1].deliverables.len(), 2);

    t.cleanup(&user).await;
}

#[tokio::test]
async fn test_replace_swaps_children() {
    let Some(t) = setup().await else { return };
    let user = t.create_user().await;
    let goal = t.db.goals.create(&user, sample_goal()).await.unwrap();

    let replaced = t
        .db
        .goals
        .replace(
            &user,
            goal.id,
            GoalInput {
                title: "Launch GA".to_string(),
                deliverables: vec![DeliverableInput {
                    title: "Only step".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(replaced.title, "Launch GA");
    assert_eq!(replaced.description, "");
    assert!(replaced.due_date.is_none());
    assert_eq!(replaced.deliverables.len(), 1);
    assert_eq!(replaced.deliverables[0].title, "Only step");
    assert!(replaced.info_tags.is_empty());

    let old = goal.deliverables[0].id;
    assert!(t.db.deliverables.get(&user, old).await.unwrap().is_none());

    t.cleanup(&user).await;
}

#[tokio::test]
async fn test_delete_cascades_deliverables() {
    let Some(t) = setup().await else { return };
    let user = t.create_user().await;
    let goal = t.db.goals.create(&user, sample_goal()).await.unwrap();
    let child = goal.deliverables[0].id;

    assert!(t.db.goals.delete(&user, goal.id).await.unwrap());
    assert!(t.db.goals.get(&user, goal.id).await.unwrap().is_none());
    assert!(t.db.deliverables.get(&user, child).await.unwrap().is_none());

    t.cleanup(&user).await;
}

#[tokio::test]
async fn test_deliverable_partial_update() {
    let Some(t) = setup().await else { return };
    let user = t.create_user().await;
    let goal = t.db.goals.create(&user, sample_goal()).await.unwrap();
    let id = goal.deliverables[0].id;

    let updated = t
        .db
        .deliverables
        .update(
            &user,
            id,
            UpdateDeliverableRequest {
                completed: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert!(updated.completed);
    assert_eq!(updated.title, "Write docs");
    assert_eq!(updated.minutes_estimate, Some(60));

    let cleared = t
        .db
        .deliverables
        .update(
            &user,
            id,
            UpdateDeliverableRequest {
                minutes_estimate: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cleared.minutes_estimate, None);
    assert!(cleared.completed);

    let other = t.create_user().await;
    assert!(t
        .db
        .deliverables
        .update(&other, id, UpdateDeliverableRequest::default())
        .await
        .unwrap()
        .is_none());
    assert!(!t.db.deliverables.delete(&other, id).await.unwrap());
    assert!(t.db.deliverables.delete(&user, id).await.unwrap());

    t.cleanup(&user).await;
    t.cleanup(&other).await;
}

#[tokio::test]
async fn test_goal_events_only_scheduled() {
    let Some(t) = setup().await else { return };
    let user = t.create_user().await;
    let goal = t.db.goals.create(&user, sample_goal()).await.unwrap();

    assert!(t.db.deliverables.list_goal_events(&user).await.unwrap().is_empty());

    let start = Utc.with_ymd_and_hms(2026, 11, 2, 9, 0, 0).unwrap();
    t.db.deliverables
        .update(
            &user,
            goal.deliverables[0].id,
            UpdateDeliverableRequest {
                start: Some(Some(start)),
                end: Some(Some(start + Duration::hours(1))),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let events = t.db.deliverables.list_goal_events(&user).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].goal_title, "Launch beta");
    assert_eq!(events[0].start, start);

    // Explicit nulls unschedule the deliverable again.
    let cleared = t
        .db
        .deliverables
        .update(
            &user,
            goal.deliverables[0].id,
            UpdateDeliverableRequest {
                start: Some(None),
                end: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(!cleared.is_scheduled());
    assert!(t.db.deliverables.list_goal_events(&user).await.unwrap().is_empty());

    t.cleanup(&user).await;
}

#[tokio::test]
async fn test_assign_placeholder_slots() {
    let Some(t) = setup().await else { return };
    let user = t.create_user().await;
    let goal = t.db.goals.create(&user, sample_goal()).await.unwrap();

    let window_start = Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap();
    let requests = vec![SlotRequest {
        deliverable_id: goal.deliverables[0].id,
        minutes_estimate: Some(60),
    }];
    let slots =
        plan_placeholder_slots(window_start, window_start + Duration::days(2), &requests).unwrap();

    let written = t
        .db
        .deliverables
        .assign_slots(&user, goal.id, &slots)
        .await
        .unwrap();
    assert_eq!(written, 1);

    let d = t
        .db
        .deliverables
        .get(&user, goal.deliverables[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(d.start, Some(window_start));
    assert_eq!(d.end, Some(window_start + Duration::minutes(60)));

    // A foreign goal id writes nothing.
    let written = t
        .db
        .deliverables
        .assign_slots(&user, Uuid::now_v7(), &slots)
        .await
        .unwrap();
    assert_eq!(written, 0);

    t.cleanup(&user).await;
}
