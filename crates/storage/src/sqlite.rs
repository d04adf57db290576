use std::collections::BTreeSet;

use rusqlite::{Connection, params};

use kanban_core::record::{ProjectRecord, TaskPriority, TaskRecord, TaskStatus, UserRecord};
use kanban_core::time::now_millis;
use kanban_core::{ProjectId, TaskId, UserId, Version};

use crate::error::StorageError;
use crate::page::{Page, PageRequest};
use crate::traits::{NewProject, NewTask, Storage};

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

const TASK_COLUMNS: &str =
    "task_id, version, title, description, status, priority, created_at, updated_at, due_at";

fn read_task(conn: &Connection, id: TaskId) -> Result<Option<TaskRecord>, StorageError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE task_id = ?1"
    ))?;
    let mut rows = stmt.query_map(params![id.get()], read_task_row)?;

    match rows.next() {
        Some(row) => {
            let record = task_from_row(conn, row?)?;
            Ok(Some(record))
        }
        None => Ok(None),
    }
}

type TaskRow = (
    i64,
    i64,
    String,
    Option<String>,
    String,
    String,
    i64,
    i64,
    Option<i64>,
);

fn read_task_row(row: &rusqlite::Row) -> rusqlite::Result<TaskRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn task_from_row(conn: &Connection, row: TaskRow) -> Result<TaskRecord, StorageError> {
    let (task_id, version, title, description, status, priority, created_at, updated_at, due_at) =
        row;
    let id = TaskId::new(task_id);
    Ok(TaskRecord {
        id,
        version: Version::new(version),
        title,
        description,
        status: TaskStatus::parse(&status)?,
        priority: TaskPriority::parse(&priority)?,
        created_at,
        updated_at,
        due_at,
        assignees: task_assignees(conn, id)?,
    })
}

fn task_assignees(conn: &Connection, id: TaskId) -> Result<BTreeSet<UserId>, StorageError> {
    let mut stmt = conn.prepare("SELECT user_id FROM task_assignees WHERE task_id = ?1")?;
    let rows = stmt.query_map(params![id.get()], |row| row.get::<_, i64>(0))?;

    let mut assignees = BTreeSet::new();
    for row in rows {
        assignees.insert(UserId::new(row?));
    }
    Ok(assignees)
}

fn write_task_assignees(
    conn: &Connection,
    id: TaskId,
    assignees: &BTreeSet<UserId>,
) -> Result<(), StorageError> {
    conn.execute("DELETE FROM task_assignees WHERE task_id = ?1", params![id.get()])?;
    for user_id in assignees {
        conn.execute(
            "INSERT INTO task_assignees (task_id, user_id) VALUES (?1, ?2)",
            params![id.get(), user_id.get()],
        )?;
    }
    Ok(())
}

fn read_project(conn: &Connection, id: ProjectId) -> Result<Option<ProjectRecord>, StorageError> {
    let mut stmt =
        conn.prepare("SELECT project_id, version, name FROM projects WHERE project_id = ?1")?;
    let mut rows = stmt.query_map(params![id.get()], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    match rows.next() {
        Some(row) => {
            let (project_id, version, name) = row?;
            let id = ProjectId::new(project_id);
            Ok(Some(ProjectRecord {
                id,
                version: Version::new(version),
                name,
                participants: project_members(conn, id, "project_participants", "user_id")?
                    .into_iter()
                    .map(UserId::new)
                    .collect(),
                tasks: project_members(conn, id, "project_tasks", "task_id")?
                    .into_iter()
                    .map(TaskId::new)
                    .collect(),
            }))
        }
        None => Ok(None),
    }
}

fn project_members(
    conn: &Connection,
    id: ProjectId,
    table: &str,
    column: &str,
) -> Result<Vec<i64>, StorageError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {column} FROM {table} WHERE project_id = ?1"
    ))?;
    let rows = stmt.query_map(params![id.get()], |row| row.get::<_, i64>(0))?;
    let mut members = Vec::new();
    for row in rows {
        members.push(row?);
    }
    Ok(members)
}

fn write_project_members(
    conn: &Connection,
    id: ProjectId,
    table: &str,
    column: &str,
    members: &[i64],
) -> Result<(), StorageError> {
    conn.execute(
        &format!("DELETE FROM {table} WHERE project_id = ?1"),
        params![id.get()],
    )?;
    for member in members {
        conn.execute(
            &format!("INSERT INTO {table} (project_id, {column}) VALUES (?1, ?2)"),
            params![id.get(), member],
        )?;
    }
    Ok(())
}

fn exists(conn: &Connection, sql: &str, id: i64) -> Result<bool, StorageError> {
    let found: bool = conn.query_row(sql, params![id], |row| row.get(0))?;
    Ok(found)
}

impl Storage for SqliteStorage {
    fn insert_task(&mut self, new: &NewTask) -> Result<TaskRecord, StorageError> {
        let now = now_millis()?;
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO tasks (version, title, description, status, priority, created_at, updated_at, due_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                Version::INITIAL.get(),
                new.title,
                new.description,
                new.status.as_str(),
                new.priority.as_str(),
                now,
                now,
                new.due_at,
            ],
        )?;
        let id = TaskId::new(tx.last_insert_rowid());
        write_task_assignees(&tx, id, &new.assignees)?;

        let record = read_task(&tx, id)?
            .ok_or_else(|| StorageError::NotFound(format!("task {id} after insert")))?;
        tx.commit()?;
        Ok(record)
    }

    fn get_task(&self, id: TaskId) -> Result<Option<TaskRecord>, StorageError> {
        read_task(&self.conn, id)
    }

    fn task_exists(&self, id: TaskId) -> Result<bool, StorageError> {
        exists(
            &self.conn,
            "SELECT EXISTS (SELECT 1 FROM tasks WHERE task_id = ?1)",
            id.get(),
        )
    }

    fn save_task(
        &mut self,
        candidate: &TaskRecord,
        expected: Version,
    ) -> Result<TaskRecord, StorageError> {
        let now = now_millis()?;
        let tx = self.conn.transaction()?;

        // Compare-and-swap on the version column: the second line of
        // defense against writers racing between load and persist.
        let changed = tx.execute(
            "UPDATE tasks SET version = ?1, title = ?2, description = ?3, status = ?4,
                 priority = ?5, due_at = ?6, updated_at = ?7
             WHERE task_id = ?8 AND version = ?9",
            params![
                expected.next().get(),
                candidate.title,
                candidate.description,
                candidate.status.as_str(),
                candidate.priority.as_str(),
                candidate.due_at,
                now,
                candidate.id.get(),
                expected.get(),
            ],
        )?;
        if changed == 0 {
            let still_there = exists(
                &tx,
                "SELECT EXISTS (SELECT 1 FROM tasks WHERE task_id = ?1)",
                candidate.id.get(),
            )?;
            return Err(if still_there {
                StorageError::VersionMismatch {
                    id: format!("task {}", candidate.id),
                    expected: expected.get(),
                }
            } else {
                StorageError::NotFound(format!("task {}", candidate.id))
            });
        }

        write_task_assignees(&tx, candidate.id, &candidate.assignees)?;

        let saved = read_task(&tx, candidate.id)?
            .ok_or_else(|| StorageError::NotFound(format!("task {} after save", candidate.id)))?;
        tx.commit()?;
        Ok(saved)
    }

    fn delete_task(&mut self, id: TaskId) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM task_assignees WHERE task_id = ?1", params![id.get()])?;
        let changed = tx.execute("DELETE FROM tasks WHERE task_id = ?1", params![id.get()])?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("task {id}")));
        }
        tx.commit()?;
        Ok(())
    }

    fn list_tasks(&self, page: PageRequest) -> Result<Page<TaskRecord>, StorageError> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             ORDER BY created_at DESC, task_id DESC LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt
            .query_map(params![page.limit(), page.offset()], read_task_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut items = Vec::new();
        for row in rows {
            items.push(task_from_row(&self.conn, row)?);
        }
        Ok(Page {
            items,
            page: page.page(),
            size: page.size(),
            total: total as u64,
        })
    }

    fn list_tasks_by_status(
        &self,
        status: TaskStatus,
        page: PageRequest,
    ) -> Result<Page<TaskRecord>, StorageError> {
        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE status = ?1
             ORDER BY created_at DESC, task_id DESC LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
            .query_map(
                params![status.as_str(), page.limit(), page.offset()],
                read_task_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut items = Vec::new();
        for row in rows {
            items.push(task_from_row(&self.conn, row)?);
        }
        Ok(Page {
            items,
            page: page.page(),
            size: page.size(),
            total: total as u64,
        })
    }

    fn insert_project(&mut self, new: &NewProject) -> Result<ProjectRecord, StorageError> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO projects (version, name) VALUES (?1, ?2)",
            params![Version::INITIAL.get(), new.name],
        )?;
        let id = ProjectId::new(tx.last_insert_rowid());

        let participants: Vec<i64> = new.participants.iter().map(|u| u.get()).collect();
        let tasks: Vec<i64> = new.tasks.iter().map(|t| t.get()).collect();
        write_project_members(&tx, id, "project_participants", "user_id", &participants)?;
        write_project_members(&tx, id, "project_tasks", "task_id", &tasks)?;

        let record = read_project(&tx, id)?
            .ok_or_else(|| StorageError::NotFound(format!("project {id} after insert")))?;
        tx.commit()?;
        Ok(record)
    }

    fn get_project(&self, id: ProjectId) -> Result<Option<ProjectRecord>, StorageError> {
        read_project(&self.conn, id)
    }

    fn project_exists(&self, id: ProjectId) -> Result<bool, StorageError> {
        exists(
            &self.conn,
            "SELECT EXISTS (SELECT 1 FROM projects WHERE project_id = ?1)",
            id.get(),
        )
    }

    fn save_project(
        &mut self,
        candidate: &ProjectRecord,
        expected: Version,
    ) -> Result<ProjectRecord, StorageError> {
        let tx = self.conn.transaction()?;

        let changed = tx.execute(
            "UPDATE projects SET version = ?1, name = ?2 WHERE project_id = ?3 AND version = ?4",
            params![
                expected.next().get(),
                candidate.name,
                candidate.id.get(),
                expected.get(),
            ],
        )?;
        if changed == 0 {
            let still_there = exists(
                &tx,
                "SELECT EXISTS (SELECT 1 FROM projects WHERE project_id = ?1)",
                candidate.id.get(),
            )?;
            return Err(if still_there {
                StorageError::VersionMismatch {
                    id: format!("project {}", candidate.id),
                    expected: expected.get(),
                }
            } else {
                StorageError::NotFound(format!("project {}", candidate.id))
            });
        }

        let participants: Vec<i64> = candidate.participants.iter().map(|u| u.get()).collect();
        let tasks: Vec<i64> = candidate.tasks.iter().map(|t| t.get()).collect();
        write_project_members(&tx, candidate.id, "project_participants", "user_id", &participants)?;
        write_project_members(&tx, candidate.id, "project_tasks", "task_id", &tasks)?;

        let saved = read_project(&tx, candidate.id)?.ok_or_else(|| {
            StorageError::NotFound(format!("project {} after save", candidate.id))
        })?;
        tx.commit()?;
        Ok(saved)
    }

    fn delete_project(&mut self, id: ProjectId) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM project_participants WHERE project_id = ?1",
            params![id.get()],
        )?;
        tx.execute(
            "DELETE FROM project_tasks WHERE project_id = ?1",
            params![id.get()],
        )?;
        let changed = tx.execute(
            "DELETE FROM projects WHERE project_id = ?1",
            params![id.get()],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("project {id}")));
        }
        tx.commit()?;
        Ok(())
    }

    fn list_projects(&self, page: PageRequest) -> Result<Page<ProjectRecord>, StorageError> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))?;

        let mut stmt = self.conn.prepare(
            "SELECT project_id FROM projects ORDER BY project_id DESC LIMIT ?1 OFFSET ?2",
        )?;
        let ids = stmt
            .query_map(params![page.limit(), page.offset()], |row| {
                row.get::<_, i64>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut items = Vec::new();
        for id in ids {
            let record = read_project(&self.conn, ProjectId::new(id))?
                .ok_or_else(|| StorageError::NotFound(format!("project {id} during list")))?;
            items.push(record);
        }
        Ok(Page {
            items,
            page: page.page(),
            size: page.size(),
            total: total as u64,
        })
    }

    fn projects_containing_task(&self, id: TaskId) -> Result<Vec<ProjectId>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT project_id FROM project_tasks WHERE task_id = ?1")?;
        let rows = stmt.query_map(params![id.get()], |row| row.get::<_, i64>(0))?;
        let mut projects = Vec::new();
        for row in rows {
            projects.push(ProjectId::new(row?));
        }
        Ok(projects)
    }

    fn detach_task_from_projects(&mut self, id: TaskId) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        // Membership changes count as project updates, so affected
        // projects take a version bump.
        tx.execute(
            "UPDATE projects SET version = version + 1
             WHERE project_id IN (SELECT project_id FROM project_tasks WHERE task_id = ?1)",
            params![id.get()],
        )?;
        tx.execute("DELETE FROM project_tasks WHERE task_id = ?1", params![id.get()])?;
        tx.commit()?;
        Ok(())
    }

    fn insert_user(&mut self, username: &str) -> Result<UserRecord, StorageError> {
        let result = self.conn.execute(
            "INSERT INTO users (username) VALUES (?1)",
            params![username],
        );
        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(StorageError::ConstraintViolation(format!(
                    "username already taken: {username}"
                )));
            }
            Err(e) => return Err(StorageError::Sqlite(e)),
        }
        Ok(UserRecord {
            id: UserId::new(self.conn.last_insert_rowid()),
            username: username.to_string(),
        })
    }

    fn get_user(&self, id: UserId) -> Result<Option<UserRecord>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_id, username FROM users WHERE user_id = ?1")?;
        let mut rows = stmt.query_map(params![id.get()], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        match rows.next() {
            Some(row) => {
                let (user_id, username) = row?;
                Ok(Some(UserRecord {
                    id: UserId::new(user_id),
                    username,
                }))
            }
            None => Ok(None),
        }
    }

    fn user_exists(&self, id: UserId) -> Result<bool, StorageError> {
        exists(
            &self.conn,
            "SELECT EXISTS (SELECT 1 FROM users WHERE user_id = ?1)",
            id.get(),
        )
    }
}
