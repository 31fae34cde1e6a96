use std::path::PathBuf;

use codeloom_common::args::StudentDirArgs;
use deadpool_redis::Pool;
use redis::AsyncCommands;

use crate::dirs;
use crate::error::StoreError;
use crate::student::{CodespaceInfo, CodespaceStatus, Student, UserInfo, check_len};

const KEY_PREFIX: &str = "student:";

const FIELDS: &[&str] = &[
    "pwd_hash",
    "user_info.name",
    "user_info.mail",
    "codespace.status",
    "codespace.url",
    "codespace.time_quota",
    "codespace.time_used",
    "codespace.last_start",
    "codespace.last_stop",
    "codespace.last_active",
    "codespace.last_watch",
];

fn key(sid: &str) -> String {
    format!("{KEY_PREFIX}{sid}")
}

fn sid_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(KEY_PREFIX)
}

fn parse_i64(value: &Option<String>) -> i64 {
    value.as_deref().and_then(|v| v.parse().ok()).unwrap_or(0)
}

/// Durable `sid -> Student` map over a Redis hash per student, plus
/// the on-disk per-student directory tree it is responsible for
/// keeping in lockstep with the record's existence.
#[derive(Clone)]
pub struct StudentStore {
    pool: Pool,
    students_dir: PathBuf,
    archive_dir: PathBuf,
}

impl StudentStore {
    pub fn new(pool: Pool, args: &StudentDirArgs) -> Self {
        Self {
            pool,
            students_dir: PathBuf::from(&args.students_dir),
            archive_dir: PathBuf::from(&args.archive_students_dir),
        }
    }

    pub async fn exists(&self, sid: &str) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await?;
        let exists: bool = conn.exists(key(sid)).await?;
        Ok(exists)
    }

    pub async fn read(&self, sid: &str) -> Result<Student, StoreError> {
        let mut conn = self.pool.get().await?;
        let values: Vec<Option<String>> = conn.hget(key(sid), FIELDS).await?;

        let pwd_hash = values.first().cloned().flatten().ok_or_else(|| StoreError::NotFound(sid.to_string()))?;

        let status = values
            .get(3)
            .cloned()
            .flatten()
            .and_then(|s| s.parse::<CodespaceStatus>().ok())
            .unwrap_or(CodespaceStatus::Stopped);

        Ok(Student {
            sid: sid.to_string(),
            pwd_hash,
            user_info: UserInfo {
                name: values.get(1).cloned().flatten().unwrap_or_default(),
                mail: values.get(2).cloned().flatten().unwrap_or_default(),
            },
            codespace: CodespaceInfo {
                status,
                url: values.get(4).cloned().flatten().unwrap_or_default(),
                time_quota: parse_i64(values.get(5).unwrap_or(&None)),
                time_used: parse_i64(values.get(6).unwrap_or(&None)),
                last_start: parse_i64(values.get(7).unwrap_or(&None)),
                last_stop: parse_i64(values.get(8).unwrap_or(&None)),
                last_active: parse_i64(values.get(9).unwrap_or(&None)),
                last_watch: parse_i64(values.get(10).unwrap_or(&None)),
            },
        })
    }

    pub async fn write(&self, student: &Student) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        let pairs: Vec<(&str, String)> = vec![
            ("pwd_hash", student.pwd_hash.clone()),
            ("user_info.name", student.user_info.name.clone()),
            ("user_info.mail", student.user_info.mail.clone()),
            ("codespace.status", student.codespace.status.to_string()),
            ("codespace.url", student.codespace.url.clone()),
            ("codespace.time_quota", student.codespace.time_quota.to_string()),
            ("codespace.time_used", student.codespace.time_used.to_string()),
            ("codespace.last_start", student.codespace.last_start.to_string()),
            ("codespace.last_stop", student.codespace.last_stop.to_string()),
            ("codespace.last_active", student.codespace.last_active.to_string()),
            ("codespace.last_watch", student.codespace.last_watch.to_string()),
        ];
        let _: () = conn.hset_multiple(key(&student.sid), &pairs).await?;
        Ok(())
    }

    /// Creates the record's backing directory tree and writes the
    /// initial hash. Does not touch the orchestrator — callers that
    /// need the workload allocated alongside enrollment sequence that
    /// themselves (see the lifecycle controller's `create_student`).
    pub async fn create_record(&self, mut student: Student, now: i64) -> Result<(), StoreError> {
        check_len("sid", &student.sid)?;
        student.user_info.validate()?;

        if self.exists(&student.sid).await? {
            return Err(StoreError::AlreadyExists(student.sid));
        }

        dirs::create_tree(&self.students_dir, &student.sid).await?;

        student.codespace.last_start = now;
        student.codespace.last_stop = now;
        student.codespace.last_active = now;
        student.codespace.last_watch = now;

        if let Err(e) = self.write(&student).await {
            dirs::remove_tree(&self.students_dir, &student.sid).await.ok();
            return Err(e);
        }

        Ok(())
    }

    /// Rolls back a `create_record` whose caller failed a later step
    /// (e.g. orchestrator allocation).
    pub async fn rollback_create(&self, sid: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        let _: () = conn.del(key(sid)).await?;
        dirs::remove_tree(&self.students_dir, sid).await
    }

    /// Archives the directory tree and removes the record. Does not
    /// touch the orchestrator.
    pub async fn delete_record(&self, sid: &str) -> Result<(), StoreError> {
        if !self.exists(sid).await? {
            return Err(StoreError::NotFound(sid.to_string()));
        }

        dirs::archive_tree(&self.students_dir, &self.archive_dir, sid).await?;

        let mut conn = self.pool.get().await?;
        let _: () = conn.del(key(sid)).await?;
        Ok(())
    }

    pub async fn all_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut conn = self.pool.get().await?;
        let mut ids = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(format!("{KEY_PREFIX}*"))
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await?;
            ids.extend(keys.iter().filter_map(|k| sid_from_key(k)).map(str::to_string));
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        Ok(ids)
    }

    /// Reads every student record. Per-id read failures are logged
    /// and skipped rather than aborting the whole scan.
    pub async fn iter_all(&self) -> Result<Vec<Student>, StoreError> {
        let ids = self.all_ids().await?;
        let mut students = Vec::with_capacity(ids.len());
        for sid in ids {
            match self.read(&sid).await {
                Ok(student) => students.push(student),
                Err(StoreError::NotFound(_)) => {
                    use owo_colors::OwoColorize;
                    println!("{}", format!("student {sid:?} not found during iteration").yellow());
                }
                Err(e) => {
                    use owo_colors::OwoColorize;
                    println!("{}", format!("skipping student {sid:?} during iteration: {e}").yellow());
                }
            }
        }
        Ok(students)
    }

    pub async fn reset_password(&self, sid: &str, new_password: &str) -> Result<(), StoreError> {
        let mut student = self.read(sid).await?;
        student.pwd_hash = crate::password::hash_password(new_password)?;
        self.write(&student).await
    }

    pub async fn check_password(&self, sid: &str, password: &str) -> bool {
        match self.read(sid).await {
            Ok(student) => crate::password::verify_password(password, &student.pwd_hash),
            Err(_) => false,
        }
    }

    pub async fn set_user_info(&self, sid: &str, user_info: UserInfo) -> Result<(), StoreError> {
        user_info.validate()?;
        let mut student = self.read(sid).await?;
        student.user_info = user_info;
        self.write(&student).await
    }

    pub async fn set_time_quota(&self, sid: &str, time_quota: i64) -> Result<(), StoreError> {
        let mut student = self.read(sid).await?;
        student.codespace.time_quota = time_quota;
        self.write(&student).await
    }
}
