// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Archive extraction recorded as `unpacking` tasks.

use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, TaskError};
use crate::model::{NewTask, TaskId, TaskType, TaskUpdate};
use crate::registry::TaskRegistry;

#[derive(Debug, Error)]
pub enum UnpackError {
	#[error("unsupported archive format: {0}")]
	UnsupportedFormat(PathBuf),

	#[error("archive entry escapes the destination: {0}")]
	UnsafeEntry(String),

	#[error("zip error: {0}")]
	Zip(#[from] zip::result::ZipError),

	#[error("I/O error: {0}")]
	Io(#[from] io::Error),

	#[error("extraction task panicked")]
	Join,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
	Zip,
	TarGz,
}

impl ArchiveFormat {
	pub fn detect(path: &Path) -> Option<Self> {
		let name = path.file_name()?.to_string_lossy().to_lowercase();
		if name.ends_with(".zip") {
			Some(Self::Zip)
		} else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
			Some(Self::TarGz)
		} else {
			None
		}
	}
}

/// Extract `archive` into `dest` on the blocking pool, tracked as a task.
///
/// The task targets `dest`, so it archives only once the directory exists.
#[instrument(skip(registry))]
pub async fn unpack_with_task(
	registry: &TaskRegistry,
	archive: &Path,
	dest: &Path,
	delete_after: bool,
) -> Result<TaskId> {
	let id = registry.create(NewTask::new(TaskType::Unpacking, dest)).await?;

	match extract(archive.to_path_buf(), dest.to_path_buf()).await {
		Ok(entries) => {
			info!(task_id = %id, entries, "archive unpacked");
			registry.update(id, TaskUpdate::completed()).await?;

			if delete_after {
				if let Err(e) = tokio::fs::remove_file(archive).await {
					warn!(task_id = %id, error = %e, "failed to delete unpacked archive");
				}
			}
			Ok(id)
		}
		Err(e) => {
			let reason = e.to_string();
			registry.mark_failed(id, reason.clone()).await?;
			Err(TaskError::UnpackFailed {
				task_id: id,
				reason,
			})
		}
	}
}

/// Extract without task bookkeeping. Returns the number of entries written.
pub async fn extract(archive: PathBuf, dest: PathBuf) -> std::result::Result<usize, UnpackError> {
	tokio::task::spawn_blocking(move || extract_blocking(&archive, &dest))
		.await
		.map_err(|_| UnpackError::Join)?
}

fn extract_blocking(archive: &Path, dest: &Path) -> std::result::Result<usize, UnpackError> {
	let format = ArchiveFormat::detect(archive)
		.ok_or_else(|| UnpackError::UnsupportedFormat(archive.to_path_buf()))?;

	std::fs::create_dir_all(dest)?;
	debug!(archive = %archive.display(), dest = %dest.display(), ?format, "extracting");

	match format {
		ArchiveFormat::Zip => extract_zip(archive, dest),
		ArchiveFormat::TarGz => extract_tar_gz(archive, dest),
	}
}

fn extract_zip(archive: &Path, dest: &Path) -> std::result::Result<usize, UnpackError> {
	let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
	let mut written = 0;

	for i in 0..zip.len() {
		let mut entry = zip.by_index(i)?;
		let relative = entry
			.enclosed_name()
			.ok_or_else(|| UnpackError::UnsafeEntry(entry.name().to_string()))?;
		let out = dest.join(relative);

		if entry.is_dir() {
			std::fs::create_dir_all(&out)?;
			continue;
		}

		if let Some(parent) = out.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let mut file = File::create(&out)?;
		io::copy(&mut entry, &mut file)?;

		#[cfg(unix)]
		if let Some(mode) = entry.unix_mode() {
			use std::os::unix::fs::PermissionsExt;
			std::fs::set_permissions(&out, std::fs::Permissions::from_mode(mode & 0o777))?;
		}

		written += 1;
	}

	Ok(written)
}

fn extract_tar_gz(archive: &Path, dest: &Path) -> std::result::Result<usize, UnpackError> {
	let mut tar = tar::Archive::new(GzDecoder::new(File::open(archive)?));
	let mut written = 0;

	for entry in tar.entries()? {
		let mut entry = entry?;
		let relative = entry.path()?.into_owned();
		if !is_contained(&relative) {
			return Err(UnpackError::UnsafeEntry(relative.display().to_string()));
		}

		entry.unpack_in(dest)?;
		written += 1;
	}

	Ok(written)
}

fn is_contained(path: &Path) -> bool {
	path.components()
		.all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
