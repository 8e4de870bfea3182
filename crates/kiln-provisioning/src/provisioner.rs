// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use kiln_runtime::{RuntimeResolver, RuntimeTarget, ScriptDialect};
use kiln_sources::SourceResolver;
use kiln_tasks::{unpack_with_task, Downloader, TaskError, TaskId};
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use crate::error::{ProvisioningError, Result};
use crate::materialize::{materialize, LaunchSettings};
use crate::spec::ProvisionSpec;

/// A ready-to-run instance directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedInstance {
	pub name: String,
	pub directory: PathBuf,
	pub script: PathBuf,
	pub artifact: PathBuf,
	pub runtime_executable: PathBuf,
	pub task_ids: Vec<TaskId>,
}

type TaskLog = Arc<Mutex<Vec<TaskId>>>;

fn record(log: &TaskLog, id: TaskId) {
	log.lock().unwrap_or_else(|e| e.into_inner()).push(id);
}

/// A provisioning run in the background.
pub struct ProvisionHandle {
	name: String,
	tasks: TaskLog,
	join: JoinHandle<Result<ProvisionedInstance>>,
}

impl ProvisionHandle {
	pub fn instance_name(&self) -> &str {
		&self.name
	}

	/// Task ids allocated so far, in allocation order.
	pub fn task_ids(&self) -> Vec<TaskId> {
		self.tasks.lock().unwrap_or_else(|e| e.into_inner()).clone()
	}

	pub fn is_finished(&self) -> bool {
		self.join.is_finished()
	}

	pub async fn join(self) -> Result<ProvisionedInstance> {
		self.join.await.map_err(|_| ProvisioningError::Aborted)?
	}
}

/// Releases an instance name when its provisioning run ends.
struct InFlight {
	names: Arc<Mutex<HashSet<String>>>,
	name: String,
}

impl InFlight {
	fn acquire(names: &Arc<Mutex<HashSet<String>>>, name: &str) -> Result<Self> {
		let mut set = names.lock().unwrap_or_else(|e| e.into_inner());
		if !set.insert(name.to_string()) {
			return Err(ProvisioningError::AlreadyInProgress(name.to_string()));
		}
		Ok(Self {
			names: Arc::clone(names),
			name: name.to_string(),
		})
	}
}

impl Drop for InFlight {
	fn drop(&mut self) {
		self.names
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.remove(&self.name);
	}
}

/// Turns a [`ProvisionSpec`] into a runnable instance directory.
#[derive(Clone)]
pub struct Provisioner {
	runtimes: Arc<RuntimeResolver>,
	sources: Arc<SourceResolver>,
	downloader: Downloader,
	servers_dir: PathBuf,
	in_flight: Arc<Mutex<HashSet<String>>>,
}

impl Provisioner {
	pub fn new(
		runtimes: Arc<RuntimeResolver>,
		sources: Arc<SourceResolver>,
		downloader: Downloader,
		servers_dir: impl Into<PathBuf>,
	) -> Self {
		Self {
			runtimes,
			sources,
			downloader,
			servers_dir: servers_dir.into(),
			in_flight: Arc::new(Mutex::new(HashSet::new())),
		}
	}

	pub fn instance_dir(&self, name: &str) -> PathBuf {
		self.servers_dir.join(name)
	}

	/// Provision and wait for the result.
	pub async fn provision(&self, spec: ProvisionSpec) -> Result<ProvisionedInstance> {
		spec.validate()?;
		let guard = InFlight::acquire(&self.in_flight, &spec.instance_name)?;
		let result = self.run(&spec, &Arc::new(Mutex::new(Vec::new()))).await;
		drop(guard);
		result
	}

	/// Start provisioning in the background. Validation and the in-flight
	/// check happen before this returns.
	pub fn spawn(&self, spec: ProvisionSpec) -> Result<ProvisionHandle> {
		spec.validate()?;
		let guard = InFlight::acquire(&self.in_flight, &spec.instance_name)?;

		let tasks: TaskLog = Arc::new(Mutex::new(Vec::new()));
		let this = self.clone();
		let log = Arc::clone(&tasks);
		let name = spec.instance_name.clone();

		let join = tokio::spawn(async move {
			let _guard = guard;
			this.run(&spec, &log).await
		});

		Ok(ProvisionHandle { name, tasks, join })
	}

	#[instrument(skip(self, spec, tasks), fields(instance = %spec.instance_name, source = %spec.software_source, version = %spec.software_version))]
	async fn run(&self, spec: &ProvisionSpec, tasks: &TaskLog) -> Result<ProvisionedInstance> {
		let (java, dialect) = self.ensure_runtime(spec, tasks).await?;

		let url = self
			.sources
			.resolve_download_url(&spec.software_source, &spec.software_version)
			.await?;

		let directory = self.instance_dir(&spec.instance_name);
		tokio::fs::create_dir_all(&directory).await?;

		let artifact_name = spec.artifact_name();
		let artifact = directory.join(&artifact_name);
		self.tracked_download(&url, &artifact, tasks).await?;

		let script = materialize(
			&directory,
			&LaunchSettings {
				dialect,
				java: &java,
				flags: &spec.launch_flags,
				artifact: &artifact_name,
				instance_name: &spec.instance_name,
				port: spec.port,
			},
		)
		.await?;

		info!(directory = %directory.display(), "instance provisioned");

		Ok(ProvisionedInstance {
			name: spec.instance_name.clone(),
			directory,
			script,
			artifact,
			runtime_executable: java,
			task_ids: tasks.lock().unwrap_or_else(|e| e.into_inner()).clone(),
		})
	}

	async fn ensure_runtime(&self, spec: &ProvisionSpec, tasks: &TaskLog) -> Result<(PathBuf, ScriptDialect)> {
		let version = spec.effective_runtime_version().to_string();

		match self.runtimes.resolve_for_host(&version)? {
			RuntimeTarget::Constrained(runtime) => {
				if tokio::fs::try_exists(&runtime.executable).await.unwrap_or(false) {
					Ok((runtime.executable, ScriptDialect::Constrained))
				} else {
					Err(ProvisioningError::RuntimeUnavailable {
						version,
						hint: runtime.install_hint,
					})
				}
			}
			RuntimeTarget::Managed(descriptor) => {
				if let Some(java) = descriptor.verified_executable().await {
					info!(java = %java.display(), "runtime already installed");
					return Ok((java, descriptor.dialect));
				}

				info!(runtime = %version, url = %descriptor.url, "installing runtime");
				self.tracked_download(&descriptor.url, &descriptor.download_path, tasks)
					.await?;

				let unpack = unpack_with_task(
					self.downloader.registry(),
					&descriptor.download_path,
					&descriptor.unpack_path,
					true,
				)
				.await;
				match &unpack {
					Ok(id) => record(tasks, *id),
					Err(e) => {
						if let Some(id) = e.task_id() {
							record(tasks, id);
						}
					}
				}
				unpack?;

				let java = descriptor.verified_executable().await.ok_or_else(|| {
					ProvisioningError::RuntimeExecutableMissing {
						version: version.clone(),
						path: descriptor.unpack_path.clone(),
					}
				})?;
				Ok((java, descriptor.dialect))
			}
		}
	}

	async fn tracked_download(&self, url: &str, path: &Path, tasks: &TaskLog) -> std::result::Result<TaskId, TaskError> {
		let id = self.downloader.begin(url, path).await?;
		record(tasks, id);
		self.downloader.run(id, url, path).await?;
		Ok(id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use kiln_common_http::{Fetcher, RetryConfig};
	use kiln_common_store::{CatalogCache, MemoryStore};
	use kiln_sources::{SourceEndpoints, SourceRegistry};
	use kiln_tasks::{TaskRegistry, TaskStatus};
	use std::time::Duration;
	use tempfile::TempDir;
	use wiremock::matchers::{method, path, path_regex};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	struct Fixture {
		_tmp: TempDir,
		binaries: PathBuf,
		servers: PathBuf,
		registry: Arc<TaskRegistry>,
		provisioner: Provisioner,
	}

	async fn fixture(base: &str) -> Fixture {
		let tmp = TempDir::new().unwrap();
		let binaries = tmp.path().join("binaries");
		let servers = tmp.path().join("servers");

		let store = Arc::new(MemoryStore::new());
		let catalog = Arc::new(CatalogCache::new(store.clone(), CatalogCache::DEFAULT_TTL));
		let registry = Arc::new(TaskRegistry::open(store).await.unwrap());
		let client = kiln_common_http::new_client().unwrap();
		let fetcher = Fetcher::new(client.clone(), RetryConfig::no_retry());

		let runtimes = RuntimeResolver::new(fetcher.clone(), &binaries, base, Arc::clone(&catalog))
			.with_constrained(false);
		let endpoints = SourceEndpoints {
			mojang_manifest: format!("{base}/manifest.json"),
			papermc: base.to_string(),
			purpur: format!("{base}/v2/purpur"),
			magma: format!("{base}/api/v2"),
			spigot_listing: format!("{base}/spigot"),
		};
		let sources = SourceResolver::new(fetcher, Arc::new(SourceRegistry::builtin()), endpoints, catalog);
		let downloader = Downloader::new(client, Arc::clone(&registry))
			.with_timeouts(Duration::from_secs(5), Duration::from_secs(5));

		let provisioner = Provisioner::new(Arc::new(runtimes), Arc::new(sources), downloader, &servers);

		Fixture {
			_tmp: tmp,
			binaries,
			servers,
			registry,
			provisioner,
		}
	}

	fn install_fake_runtime(f: &Fixture, version: &str) -> PathBuf {
		let exe = if cfg!(windows) { "java.exe" } else { "java" };
		let java = f.binaries.join("java").join(version).join("bin").join(exe);
		std::fs::create_dir_all(java.parent().unwrap()).unwrap();
		std::fs::write(&java, b"").unwrap();
		java
	}

	async fn mount_purpur_jar(server: &MockServer, version: &str) {
		Mock::given(method("GET"))
			.and(path(format!("/v2/purpur/{version}/latest/download")))
			.respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK-jar".to_vec()))
			.mount(server)
			.await;
	}

	#[tokio::test]
	async fn provisions_with_installed_runtime() {
		let server = MockServer::start().await;
		mount_purpur_jar(&server, "1.20.1").await;
		let f = fixture(&server.uri()).await;
		let java = install_fake_runtime(&f, "20");

		let spec = ProvisionSpec::new("lobby", "purpur", "1.20.1").with_port(25570);
		let instance = f.provisioner.provision(spec).await.unwrap();

		assert_eq!(instance.directory, f.servers.join("lobby"));
		assert_eq!(instance.runtime_executable, java);
		assert_eq!(std::fs::read(&instance.artifact).unwrap(), b"PK-jar");
		assert_eq!(instance.artifact.file_name().unwrap(), "purpur-1.20.1.jar");

		let script = std::fs::read_to_string(&instance.script).unwrap();
		assert!(script.contains(&java.display().to_string()));
		assert!(script.contains("-Xms1G -Xmx2G -jar \"purpur-1.20.1.jar\" nogui"));

		let props = std::fs::read_to_string(instance.directory.join("server.properties")).unwrap();
		assert!(props.contains("server-port=25570"));

		assert_eq!(instance.task_ids.len(), 1);
		let task = f.registry.get(instance.task_ids[0]).await.unwrap();
		assert_eq!(task.status, TaskStatus::Completed);
	}

	#[tokio::test]
	async fn reprovisioning_overwrites_cleanly() {
		let server = MockServer::start().await;
		mount_purpur_jar(&server, "1.20.1").await;
		let f = fixture(&server.uri()).await;
		install_fake_runtime(&f, "20");

		let first = f
			.provisioner
			.provision(ProvisionSpec::new("lobby", "purpur", "1.20.1"))
			.await
			.unwrap();
		let second = f
			.provisioner
			.provision(ProvisionSpec::new("lobby", "purpur", "1.20.1").with_port(25599))
			.await
			.unwrap();

		assert_eq!(first.script, second.script);
		let props = std::fs::read_to_string(second.directory.join("server.properties")).unwrap();
		assert!(props.contains("server-port=25599"));
		assert_eq!(std::fs::read_to_string(second.directory.join("eula.txt")).unwrap(), "eula=true\n");
	}

	#[tokio::test]
	async fn artifact_failure_marks_its_task_failed() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(404))
			.mount(&server)
			.await;
		let f = fixture(&server.uri()).await;
		install_fake_runtime(&f, "20");

		let handle = f
			.provisioner
			.spawn(ProvisionSpec::new("broken", "purpur", "1.20.1"))
			.unwrap();
		let err = handle.join().await.unwrap_err();
		let task_err = match err {
			ProvisioningError::Task(e) => e,
			other => panic!("expected task error, got {other:?}"),
		};

		let task = f.registry.get(task_err.task_id().unwrap()).await.unwrap();
		assert_eq!(task.status, TaskStatus::Failed);
		assert!(!f.servers.join("broken").join("start.sh").exists());
	}

	#[tokio::test]
	async fn unknown_source_aborts_before_download() {
		let server = MockServer::start().await;
		let f = fixture(&server.uri()).await;
		install_fake_runtime(&f, "20");

		let err = f
			.provisioner
			.provision(ProvisionSpec::new("x", "bukkit", "1.20.1"))
			.await
			.unwrap_err();
		assert!(matches!(err, ProvisioningError::Source(_)));
		assert!(f.registry.list_by_status(TaskStatus::InProgress).await.is_empty());
	}

	#[tokio::test]
	async fn concurrent_provisioning_of_one_name_is_rejected() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(
				ResponseTemplate::new(200)
					.set_body_bytes(b"jar".to_vec())
					.set_delay(Duration::from_millis(300)),
			)
			.mount(&server)
			.await;
		let f = fixture(&server.uri()).await;
		install_fake_runtime(&f, "20");

		let first = f
			.provisioner
			.spawn(ProvisionSpec::new("lobby", "purpur", "1.20.1"))
			.unwrap();
		let second = f
			.provisioner
			.spawn(ProvisionSpec::new("lobby", "purpur", "1.20.1"));
		assert!(matches!(second, Err(ProvisioningError::AlreadyInProgress(_))));

		first.join().await.unwrap();
		let third = f
			.provisioner
			.spawn(ProvisionSpec::new("lobby", "purpur", "1.20.1"))
			.unwrap();
		third.join().await.unwrap();
	}

	#[tokio::test]
	async fn invalid_specs_are_rejected_up_front() {
		let f = fixture("http://127.0.0.1:9").await;
		let err = f
			.provisioner
			.provision(ProvisionSpec::new("../escape", "purpur", "1.20.1"))
			.await
			.unwrap_err();
		assert!(matches!(err, ProvisioningError::InvalidSpec(_)));
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn downloads_and_unpacks_a_missing_runtime() {
		use flate2::write::GzEncoder;
		use flate2::Compression;

		let mut archive = Vec::new();
		{
			let encoder = GzEncoder::new(&mut archive, Compression::fast());
			let mut builder = tar::Builder::new(encoder);
			let mut header = tar::Header::new_gnu();
			header.set_size(3);
			header.set_mode(0o755);
			header.set_cksum();
			builder
				.append_data(&mut header, "jdk-17.0.9+9/bin/java", &b"elf"[..])
				.unwrap();
			builder.into_inner().unwrap().finish().unwrap();
		}

		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path_regex(r"^/v3/binary/latest/17/ga/"))
			.respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
			.mount(&server)
			.await;
		mount_purpur_jar(&server, "1.18.2").await;

		let f = fixture(&server.uri()).await;
		let spec = ProvisionSpec::new("legacy", "purpur", "1.18.2").with_runtime_version(17);
		let handle = f.provisioner.spawn(spec).unwrap();
		let instance = handle.join().await.unwrap();

		assert_eq!(
			instance.runtime_executable,
			f.binaries.join("java/17/jdk-17.0.9+9/bin/java")
		);
		assert_eq!(instance.task_ids.len(), 3);
		assert!(f.registry.list_by_status(TaskStatus::InProgress).await.is_empty());
		assert_eq!(f.registry.list_archived().await.len(), 3);
	}
}
