use kanban_core::Version;
use kanban_harness::{task_draft, TestApp};
use kanban_service::{EntityKind, ServiceError, TASK_CHANNEL};
use kanban_storage::PageRequest;
use serde_json::json;

// ============================================================================
// Task lifecycle
// ============================================================================

#[test]
fn create_task_starts_at_version_one() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    let task = app.create_task("Rig the spotlight")?;

    assert_eq!(task.version, Version::new(1));
    assert_eq!(task.title, "Rig the spotlight");
    assert_eq!(task.status, "TO_DO");
    assert_eq!(task.priority, "MEDIUM");
    assert!(task.assignee_ids.is_empty());

    let fetched = app.service.get_task(task.id)?;
    assert_eq!(fetched, task);
    Ok(())
}

#[test]
fn create_task_resolves_assignees() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    let alice = app.seed_user("alice")?;
    let bob = app.seed_user("bob")?;

    let mut draft = task_draft("Paint the backdrop");
    draft.assignee_ids = Some(vec![bob, alice]);
    let task = app.service.create_task(&draft)?;

    assert_eq!(task.assignee_ids, vec![alice, bob]);
    Ok(())
}

#[test]
fn create_task_rejects_unknown_assignee() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    let alice = app.seed_user("alice")?;

    let mut draft = task_draft("Paint the backdrop");
    draft.assignee_ids = Some(vec![alice, kanban_core::UserId::new(99)]);
    let result = app.service.create_task(&draft);

    assert!(matches!(
        result,
        Err(ServiceError::NotFound {
            kind: EntityKind::User,
            id: 99,
        })
    ));
    Ok(())
}

#[test]
fn create_task_rejects_invalid_fields() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;

    let mut draft = task_draft("   ");
    assert!(matches!(
        app.service.create_task(&draft),
        Err(ServiceError::Validation(_))
    ));

    draft = task_draft("Valid title");
    draft.status = Some("PAUSED".into());
    assert!(matches!(
        app.service.create_task(&draft),
        Err(ServiceError::Validation(_))
    ));
    Ok(())
}

#[test]
fn get_missing_task_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let app = TestApp::new()?;
    let result = app.service.get_task(kanban_core::TaskId::new(42));
    assert!(matches!(
        result,
        Err(ServiceError::NotFound {
            kind: EntityKind::Task,
            id: 42,
        })
    ));
    Ok(())
}

// ============================================================================
// Listing
// ============================================================================

#[test]
fn list_tasks_pages_newest_first() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    for i in 0..5 {
        app.create_task(&format!("Task {i}"))?;
    }

    let first = app.service.list_tasks(None, PageRequest::new(0, 2))?;
    assert_eq!(first.total, 5);
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.items[0].title, "Task 4");
    assert_eq!(first.items[1].title, "Task 3");

    let last = app.service.list_tasks(None, PageRequest::new(2, 2))?;
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.items[0].title, "Task 0");
    Ok(())
}

#[test]
fn list_tasks_filters_by_status() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    let a = app.create_task("A")?;
    app.create_task("B")?;
    app.patch_task(a.id, json!({"version": 1, "status": "DONE"}))?;

    let done = app.service.list_tasks(Some("DONE"), PageRequest::first())?;
    assert_eq!(done.total, 1);
    assert_eq!(done.items[0].title, "A");

    let todo = app.service.list_tasks(Some("TO_DO"), PageRequest::first())?;
    assert_eq!(todo.total, 1);
    assert_eq!(todo.items[0].title, "B");

    assert!(matches!(
        app.service.list_tasks(Some("PAUSED"), PageRequest::first()),
        Err(ServiceError::Validation(_))
    ));
    Ok(())
}

// ============================================================================
// Replace
// ============================================================================

#[test]
fn replace_task_overwrites_everything() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    let alice = app.seed_user("alice")?;

    let mut draft = task_draft("Old title");
    draft.description = Some("old description".into());
    draft.assignee_ids = Some(vec![alice]);
    let task = app.service.create_task(&draft)?;

    // Omitted description and assignees are gone after a replace.
    let mut replacement = task_draft("New title");
    replacement.version = Some(task.version);
    replacement.status = Some("IN_PROGRESS".into());
    let updated = app.service.replace_task(task.id, &replacement)?;

    assert_eq!(updated.version, Version::new(2));
    assert_eq!(updated.title, "New title");
    assert_eq!(updated.status, "IN_PROGRESS");
    assert_eq!(updated.description, None);
    assert!(updated.assignee_ids.is_empty());
    Ok(())
}

#[test]
fn replace_task_without_version_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    let task = app.create_task("A")?;

    let replacement = task_draft("B");
    assert!(matches!(
        app.service.replace_task(task.id, &replacement),
        Err(ServiceError::MissingVersion)
    ));

    // Untouched on rejection.
    assert_eq!(app.service.get_task(task.id)?.title, "A");
    Ok(())
}

// ============================================================================
// Delete
// ============================================================================

#[test]
fn delete_task_detaches_it_from_projects() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    let task = app.create_task("Doomed")?;
    let keeper = app.create_task("Keeper")?;

    let project = app.create_project("Stage build")?;
    let project = app.patch_project(
        project.id,
        json!({"version": 1, "task_ids": [task.id, keeper.id]}),
    )?;
    assert_eq!(project.version, Version::new(2));

    app.service.delete_task(task.id)?;

    assert!(matches!(
        app.service.get_task(task.id),
        Err(ServiceError::NotFound { .. })
    ));

    // The holding project lost the reference and took a version bump.
    let project = app.service.get_project(project.id)?;
    assert_eq!(project.task_ids, vec![keeper.id]);
    assert_eq!(project.version, Version::new(3));
    Ok(())
}

#[test]
fn delete_missing_task_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    assert!(matches!(
        app.service.delete_task(kanban_core::TaskId::new(7)),
        Err(ServiceError::NotFound {
            kind: EntityKind::Task,
            id: 7,
        })
    ));
    Ok(())
}

// ============================================================================
// Notifications
// ============================================================================

#[test]
fn task_mutations_publish_to_the_task_channel() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    let task = app.create_task("Watched")?;
    app.patch_task(task.id, json!({"version": 1, "title": "Watched closely"}))?;
    app.service.delete_task(task.id)?;

    let events = app.events_on(TASK_CHANNEL);
    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["title"], "Watched");
    assert_eq!(events[1]["title"], "Watched closely");
    assert_eq!(events[1]["version"], 2);
    // A delete publishes the bare id.
    assert_eq!(events[2], json!(task.id.get()));
    Ok(())
}

#[test]
fn rejected_updates_publish_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    let task = app.create_task("Quiet")?;
    app.clear_events();

    let _ = app.patch_task(task.id, json!({"version": 1, "title": ""}));
    let _ = app.patch_task(task.id, json!({"title": "no version"}));

    assert!(app.events_on(TASK_CHANNEL).is_empty());
    Ok(())
}
