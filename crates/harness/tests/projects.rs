use kanban_core::Version;
use kanban_harness::{project_draft, TestApp};
use kanban_service::{EntityKind, ServiceError, PROJECT_CHANNEL};
use kanban_storage::PageRequest;
use serde_json::json;

// ============================================================================
// Project lifecycle
// ============================================================================

#[test]
fn create_project_starts_at_version_one() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    let project = app.create_project("Stage build")?;

    assert_eq!(project.version, Version::new(1));
    assert_eq!(project.name, "Stage build");
    assert!(project.participant_ids.is_empty());
    assert!(project.task_ids.is_empty());

    let fetched = app.service.get_project(project.id)?;
    assert_eq!(fetched, project);
    Ok(())
}

#[test]
fn create_project_resolves_both_relationships() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    let alice = app.seed_user("alice")?;
    let task = app.create_task("Hang the curtain")?;

    let mut draft = project_draft("Stage build");
    draft.participant_ids = Some(vec![alice]);
    draft.task_ids = Some(vec![task.id]);
    let project = app.service.create_project(&draft)?;

    assert_eq!(project.participant_ids, vec![alice]);
    assert_eq!(project.task_ids, vec![task.id]);
    Ok(())
}

#[test]
fn create_project_rejects_dangling_task() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    let mut draft = project_draft("Stage build");
    draft.task_ids = Some(vec![kanban_core::TaskId::new(404)]);

    assert!(matches!(
        app.service.create_project(&draft),
        Err(ServiceError::NotFound {
            kind: EntityKind::Task,
            id: 404,
        })
    ));
    Ok(())
}

#[test]
fn create_project_requires_a_name() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    assert!(matches!(
        app.service.create_project(&project_draft("   ")),
        Err(ServiceError::Validation(_))
    ));
    Ok(())
}

#[test]
fn list_projects_pages() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    for i in 0..3 {
        app.create_project(&format!("Project {i}"))?;
    }

    let page = app.service.list_projects(PageRequest::new(0, 2))?;
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].name, "Project 2");
    Ok(())
}

// ============================================================================
// Replace and patch
// ============================================================================

#[test]
fn replace_project_overwrites_relationships() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    let alice = app.seed_user("alice")?;
    let bob = app.seed_user("bob")?;

    let mut draft = project_draft("Stage build");
    draft.participant_ids = Some(vec![alice]);
    let project = app.service.create_project(&draft)?;

    let mut replacement = project_draft("Stage rebuild");
    replacement.version = Some(project.version);
    replacement.participant_ids = Some(vec![bob]);
    let updated = app.service.replace_project(project.id, &replacement)?;

    assert_eq!(updated.version, Version::new(2));
    assert_eq!(updated.name, "Stage rebuild");
    assert_eq!(updated.participant_ids, vec![bob]);
    Ok(())
}

#[test]
fn patch_project_reconciles_participants_before_tasks() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    let project = app.create_project("Stage build")?;

    // Both relationship keys are dangling; the participant failure wins
    // because participants reconcile first.
    let result = app.patch_project(
        project.id,
        json!({"version": 1, "participant_ids": [77], "task_ids": [88]}),
    );
    assert!(matches!(
        result,
        Err(ServiceError::NotFound {
            kind: EntityKind::User,
            id: 77,
        })
    ));
    Ok(())
}

#[test]
fn patch_project_clears_a_null_relationship() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    let alice = app.seed_user("alice")?;
    let task = app.create_task("Hang the curtain")?;

    let mut draft = project_draft("Stage build");
    draft.participant_ids = Some(vec![alice]);
    draft.task_ids = Some(vec![task.id]);
    let project = app.service.create_project(&draft)?;

    // Null clears participants; the untouched task set survives.
    let updated = app.patch_project(project.id, json!({"version": 1, "participant_ids": null}))?;
    assert!(updated.participant_ids.is_empty());
    assert_eq!(updated.task_ids, vec![task.id]);
    Ok(())
}

#[test]
fn patch_project_replaces_with_an_empty_array() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    let task = app.create_task("Hang the curtain")?;

    let mut draft = project_draft("Stage build");
    draft.task_ids = Some(vec![task.id]);
    let project = app.service.create_project(&draft)?;

    // Present-but-empty is a replacement with nothing, not a no-op.
    let updated = app.patch_project(project.id, json!({"version": 1, "task_ids": []}))?;
    assert!(updated.task_ids.is_empty());
    Ok(())
}

// ============================================================================
// Delete and notifications
// ============================================================================

#[test]
fn delete_project_leaves_its_tasks_alone() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    let task = app.create_task("Survivor")?;

    let mut draft = project_draft("Short lived");
    draft.task_ids = Some(vec![task.id]);
    let project = app.service.create_project(&draft)?;

    app.service.delete_project(project.id)?;

    assert!(matches!(
        app.service.get_project(project.id),
        Err(ServiceError::NotFound { .. })
    ));
    // Deleting the aggregate never cascades into the referenced tasks.
    assert_eq!(app.service.get_task(task.id)?.title, "Survivor");
    Ok(())
}

#[test]
fn project_mutations_publish_to_the_project_channel() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new()?;
    let project = app.create_project("Watched")?;
    app.patch_project(project.id, json!({"version": 1, "name": "Watched closely"}))?;
    app.service.delete_project(project.id)?;

    let events = app.events_on(PROJECT_CHANNEL);
    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["name"], "Watched");
    assert_eq!(events[1]["name"], "Watched closely");
    assert_eq!(events[2], json!(project.id.get()));
    Ok(())
}
