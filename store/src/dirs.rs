use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::error::StoreError;

const SUBDIRS: [&str; 3] = ["code", "io", "root"];
const WORLD_READABLE: u32 = 0o755;

fn student_path(students_dir: &Path, sid: &str) -> PathBuf {
    students_dir.join(sid)
}

/// Creates the per-student `{code, io, root}` directory tree. A tree
/// that already exists is left untouched (matches re-running
/// enrollment against a partially provisioned student).
pub async fn create_tree(students_dir: &Path, sid: &str) -> Result<(), StoreError> {
    let root = student_path(students_dir, sid);
    if tokio::fs::try_exists(&root).await.unwrap_or(false) {
        println!(
            "{}",
            format!("student directory {} already exists, skipping creation", root.display())
                .yellow()
        );
        return Ok(());
    }

    for sub in SUBDIRS {
        let dir = root.join(sub);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| StoreError::Directory {
            sid: sid.to_string(),
            message: format!("failed to create {}: {e}", dir.display()),
        })?;
        tokio::fs::set_permissions(&dir, std::fs::Permissions::from_mode(WORLD_READABLE))
            .await
            .map_err(|e| StoreError::Directory {
                sid: sid.to_string(),
                message: format!("failed to chmod {}: {e}", dir.display()),
            })?;
    }

    Ok(())
}

/// Removes a tree created by [`create_tree`]. Used to roll back a
/// failed enrollment.
pub async fn remove_tree(students_dir: &Path, sid: &str) -> Result<(), StoreError> {
    let root = student_path(students_dir, sid);
    match tokio::fs::remove_dir_all(&root).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::Directory {
            sid: sid.to_string(),
            message: format!("failed to remove {}: {e}", root.display()),
        }),
    }
}

/// Moves a student's directory tree under the archive root, named
/// `<sid>_archived_<iso timestamp>`. A missing source tree is not an
/// error — deletion is still idempotent on a record whose directory
/// was already archived or never created.
pub async fn archive_tree(students_dir: &Path, archive_dir: &Path, sid: &str) -> Result<(), StoreError> {
    let root = student_path(students_dir, sid);
    if !tokio::fs::try_exists(&root).await.unwrap_or(false) {
        return Ok(());
    }

    tokio::fs::create_dir_all(archive_dir)
        .await
        .map_err(|e| StoreError::Directory {
            sid: sid.to_string(),
            message: format!("failed to create archive root {}: {e}", archive_dir.display()),
        })?;

    let dest = archive_dir.join(format!("{sid}_archived_{}", Utc::now().to_rfc3339()));
    tokio::fs::rename(&root, &dest).await.map_err(|e| StoreError::Directory {
        sid: sid.to_string(),
        message: format!("failed to archive {} to {}: {e}", root.display(), dest.display()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_the_three_subdirs() {
        let tmp = tempfile::tempdir().unwrap();
        create_tree(tmp.path(), "24111352").await.unwrap();
        for sub in SUBDIRS {
            assert!(tmp.path().join("24111352").join(sub).is_dir());
        }
    }

    #[tokio::test]
    async fn create_tree_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        create_tree(tmp.path(), "24111352").await.unwrap();
        create_tree(tmp.path(), "24111352").await.unwrap();
    }

    #[tokio::test]
    async fn archive_moves_tree_under_archive_root() {
        let tmp = tempfile::tempdir().unwrap();
        let students = tmp.path().join("students");
        let archive = tmp.path().join("archive");
        create_tree(&students, "24111352").await.unwrap();

        archive_tree(&students, &archive, "24111352").await.unwrap();

        assert!(!students.join("24111352").exists());
        let mut entries = tokio::fs::read_dir(&archive).await.unwrap();
        let entry = entries.next_entry().await.unwrap().expect("one archived dir");
        assert!(entry.file_name().to_string_lossy().starts_with("24111352_archived_"));
    }

    #[tokio::test]
    async fn archive_of_missing_tree_is_a_no_op() {
        let tmp = tempfile::tempdir().unwrap();
        archive_tree(&tmp.path().join("students"), &tmp.path().join("archive"), "ghost")
            .await
            .unwrap();
    }
}
