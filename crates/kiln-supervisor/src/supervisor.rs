// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SupervisorError};
use crate::instance::{InstanceConfig, InstanceInfo, InstanceStatus};
use crate::logs::{LogBuffer, LogLine, LogStream};
use crate::process::{self, LAUNCH_SCRIPT};

const KILL_CONFIRM_TIMEOUT: Duration = Duration::from_secs(10);
const EVENT_CAPACITY: usize = 256;

struct Instance {
	name: String,
	directory: PathBuf,
	config: InstanceConfig,
	/// Serializes lifecycle operations on this instance.
	ops: Mutex<()>,
	state: Mutex<RunState>,
	/// Kept apart from `state` so a blocked write never stalls status reads.
	stdin: Mutex<Option<ChildStdin>>,
	logs: StdMutex<LogBuffer>,
	events: broadcast::Sender<LogLine>,
}

struct RunState {
	status: InstanceStatus,
	pid: Option<u32>,
	/// Bumped per spawn; exit watchers only touch the run they belong to.
	generation: u64,
	exited: Option<watch::Receiver<bool>>,
	restart_attempts: u32,
	last_exit_code: Option<i32>,
}

impl RunState {
	fn new() -> Self {
		Self {
			status: InstanceStatus::Stopped,
			pid: None,
			generation: 0,
			exited: None,
			restart_attempts: 0,
			last_exit_code: None,
		}
	}

	fn clear_process(&mut self) {
		self.status = InstanceStatus::Stopped;
		self.pid = None;
		self.exited = None;
	}
}

impl Instance {
	fn record(&self, stream: LogStream, line: String) {
		info!(target: "kiln::instance", instance = %self.name, stream = stream.as_str(), "{line}");
		self.logs
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.push(line.clone());
		// No subscribers is fine.
		let _ = self.events.send(LogLine {
			instance: self.name.clone(),
			stream,
			line,
		});
	}
}

/// Owns every registered instance and its child process.
pub struct Supervisor {
	instances: RwLock<HashMap<String, Arc<Instance>>>,
}

impl Default for Supervisor {
	fn default() -> Self {
		Self::new()
	}
}

impl Supervisor {
	pub fn new() -> Self {
		Self {
			instances: RwLock::new(HashMap::new()),
		}
	}

	pub async fn add_instance(
		&self,
		name: impl Into<String>,
		directory: impl Into<PathBuf>,
		config: InstanceConfig,
	) -> Result<()> {
		let name = name.into();
		let directory = directory.into();
		let directory = std::path::absolute(&directory).unwrap_or(directory);

		let mut instances = self.instances.write().await;
		if instances.contains_key(&name) {
			return Err(SupervisorError::AlreadyExists(name));
		}

		let (events, _) = broadcast::channel(EVENT_CAPACITY);
		let instance = Instance {
			name: name.clone(),
			directory,
			logs: StdMutex::new(LogBuffer::new(config.log_capacity)),
			config,
			ops: Mutex::new(()),
			state: Mutex::new(RunState::new()),
			stdin: Mutex::new(None),
			events,
		};
		debug!(instance = %name, dir = %instance.directory.display(), "instance registered");
		instances.insert(name, Arc::new(instance));
		Ok(())
	}

	async fn instance(&self, name: &str) -> Result<Arc<Instance>> {
		self.instances
			.read()
			.await
			.get(name)
			.cloned()
			.ok_or_else(|| SupervisorError::UnknownInstance(name.to_string()))
	}

	/// Spawn the instance's launch script. A no-op unless stopped.
	#[instrument(skip(self))]
	pub async fn start(&self, name: &str) -> Result<()> {
		let instance = self.instance(name).await?;
		let _ops = instance.ops.lock().await;
		start_locked(&instance).await
	}

	/// Write one newline-terminated line to the instance's stdin.
	#[instrument(skip(self, text))]
	pub async fn send_command(&self, name: &str, text: &str) -> Result<()> {
		let instance = self.instance(name).await?;
		let _ops = instance.ops.lock().await;
		write_line(&instance, text).await
	}

	/// Ask the server to exit via its stop command. The exit watcher
	/// completes the transition to stopped.
	#[instrument(skip(self))]
	pub async fn stop(&self, name: &str) -> Result<()> {
		let instance = self.instance(name).await?;
		let _ops = instance.ops.lock().await;
		stop_locked(&instance).await
	}

	#[instrument(skip(self))]
	pub async fn kill(&self, name: &str) -> Result<()> {
		let instance = self.instance(name).await?;
		let _ops = instance.ops.lock().await;
		kill_locked(&instance).await
	}

	/// Stop, wait up to the configured stop timeout, kill if still alive,
	/// then start again.
	#[instrument(skip(self))]
	pub async fn restart(&self, name: &str) -> Result<()> {
		let instance = self.instance(name).await?;
		let _ops = instance.ops.lock().await;

		let (status, exited) = {
			let state = instance.state.lock().await;
			(state.status, state.exited.clone())
		};

		if status != InstanceStatus::Stopped {
			if status != InstanceStatus::Stopping {
				if let Err(err) = stop_locked(&instance).await {
					warn!(instance = %name, error = %err, "stop command failed during restart");
				}
			}
			let graceful = match exited {
				Some(rx) => tokio::time::timeout(instance.config.stop_timeout, wait_exited(rx))
					.await
					.is_ok(),
				None => true,
			};
			if !graceful {
				warn!(instance = %name, timeout = ?instance.config.stop_timeout, "instance did not stop in time, killing");
			}
			kill_locked(&instance).await?;
		}

		instance.state.lock().await.restart_attempts += 1;
		start_locked(&instance).await
	}

	/// Last `n` output lines, stdout and stderr interleaved in arrival order.
	pub async fn get_logs(&self, name: &str, n: usize) -> Result<Vec<String>> {
		let instance = self.instance(name).await?;
		let logs = instance.logs.lock().unwrap_or_else(PoisonError::into_inner);
		Ok(logs.tail(n))
	}

	pub async fn subscribe(&self, name: &str) -> Result<broadcast::Receiver<LogLine>> {
		Ok(self.instance(name).await?.events.subscribe())
	}

	pub async fn status(&self, name: &str) -> Result<InstanceStatus> {
		let instance = self.instance(name).await?;
		let status = instance.state.lock().await.status;
		Ok(status)
	}

	pub async fn info(&self, name: &str) -> Result<InstanceInfo> {
		let instance = self.instance(name).await?;
		Ok(snapshot(&instance).await)
	}

	pub async fn list(&self) -> Vec<InstanceInfo> {
		let instances: Vec<Arc<Instance>> = self.instances.read().await.values().cloned().collect();
		let mut infos = Vec::with_capacity(instances.len());
		for instance in instances {
			infos.push(snapshot(&instance).await);
		}
		infos.sort_by(|a, b| a.name.cmp(&b.name));
		infos
	}

	/// Kill the instance if it is running, then forget it.
	#[instrument(skip(self))]
	pub async fn remove_instance(&self, name: &str) -> Result<()> {
		let instance = self.instance(name).await?;
		{
			let _ops = instance.ops.lock().await;
			kill_locked(&instance).await?;
		}
		self.instances.write().await.remove(name);
		info!(instance = %name, "instance removed");
		Ok(())
	}

	/// Kill every instance. Failures are logged and do not stop the sweep.
	pub async fn shutdown(&self) {
		let instances: Vec<Arc<Instance>> = self.instances.read().await.values().cloned().collect();
		for instance in instances {
			let _ops = instance.ops.lock().await;
			if let Err(err) = kill_locked(&instance).await {
				warn!(instance = %instance.name, error = %err, "failed to kill instance during shutdown");
			}
		}
	}
}

async fn snapshot(instance: &Instance) -> InstanceInfo {
	let state = instance.state.lock().await;
	InstanceInfo {
		name: instance.name.clone(),
		directory: instance.directory.clone(),
		status: state.status,
		pid: state.pid,
		restart_attempts: state.restart_attempts,
		last_exit_code: state.last_exit_code,
	}
}

async fn start_locked(instance: &Arc<Instance>) -> Result<()> {
	{
		let mut state = instance.state.lock().await;
		if state.status != InstanceStatus::Stopped {
			info!(instance = %instance.name, status = %state.status, "start ignored, instance is not stopped");
			return Ok(());
		}
		let script = instance.directory.join(LAUNCH_SCRIPT);
		if !tokio::fs::try_exists(&script).await.unwrap_or(false) {
			return Err(SupervisorError::ScriptMissing {
				name: instance.name.clone(),
				path: script,
			});
		}
		state.status = InstanceStatus::Starting;
	}

	let mut child = match process::launch_command(&instance.directory).spawn() {
		Ok(child) => child,
		Err(source) => {
			instance.state.lock().await.status = InstanceStatus::Stopped;
			return Err(SupervisorError::SpawnFailed {
				name: instance.name.clone(),
				source,
			});
		}
	};

	let pid = child.id();
	let stdin = child.stdin.take();
	if let Some(stdout) = child.stdout.take() {
		tokio::spawn(pump_lines(Arc::clone(instance), LogStream::Stdout, stdout));
	}
	if let Some(stderr) = child.stderr.take() {
		tokio::spawn(pump_lines(Arc::clone(instance), LogStream::Stderr, stderr));
	}

	*instance.stdin.lock().await = stdin;

	let (exited_tx, exited_rx) = watch::channel(false);
	let generation = {
		let mut state = instance.state.lock().await;
		state.generation += 1;
		state.status = InstanceStatus::Running;
		state.pid = pid;
		state.exited = Some(exited_rx);
		state.generation
	};
	tokio::spawn(watch_exit(Arc::clone(instance), child, generation, exited_tx));

	info!(instance = %instance.name, pid = ?pid, "instance started");
	Ok(())
}

/// Bounded by the command timeout so a child that stops reading cannot hold
/// the operation lock, and with it `kill`, indefinitely.
async fn write_line(instance: &Instance, text: &str) -> Result<()> {
	if instance.state.lock().await.status == InstanceStatus::Stopped {
		return Err(SupervisorError::NotRunning(instance.name.clone()));
	}
	let mut stdin = instance.stdin.lock().await;
	let Some(pipe) = stdin.as_mut() else {
		return Err(SupervisorError::NotRunning(instance.name.clone()));
	};
	let mut line = text.to_string();
	if !line.ends_with('\n') {
		line.push('\n');
	}

	let write = write_and_flush(pipe, line.as_bytes());
	match tokio::time::timeout(instance.config.command_timeout, write).await {
		Ok(result) => Ok(result?),
		Err(_) => {
			warn!(
				instance = %instance.name,
				timeout = ?instance.config.command_timeout,
				"instance is not reading its input"
			);
			Err(SupervisorError::CommandTimeout(instance.name.clone()))
		}
	}
}

async fn write_and_flush(pipe: &mut ChildStdin, bytes: &[u8]) -> std::io::Result<()> {
	pipe.write_all(bytes).await?;
	pipe.flush().await
}

async fn stop_locked(instance: &Instance) -> Result<()> {
	match instance.state.lock().await.status {
		InstanceStatus::Stopped => return Err(SupervisorError::NotRunning(instance.name.clone())),
		InstanceStatus::Stopping => return Ok(()),
		InstanceStatus::Starting | InstanceStatus::Running => {}
	}

	write_line(instance, &instance.config.stop_command).await?;

	let mut state = instance.state.lock().await;
	// The process may already have exited on the command.
	if state.status != InstanceStatus::Stopped {
		state.status = InstanceStatus::Stopping;
	}
	info!(instance = %instance.name, "stop command sent");
	Ok(())
}

async fn kill_locked(instance: &Instance) -> Result<()> {
	let (pid, exited) = {
		let state = instance.state.lock().await;
		if state.status == InstanceStatus::Stopped {
			return Ok(());
		}
		(state.pid, state.exited.clone())
	};

	if let Some(pid) = pid {
		process::kill_tree(pid).await?;
	}
	if let Some(rx) = exited {
		if tokio::time::timeout(KILL_CONFIRM_TIMEOUT, wait_exited(rx))
			.await
			.is_err()
		{
			warn!(instance = %instance.name, "no exit confirmation after kill");
		}
	}

	{
		let mut state = instance.state.lock().await;
		if state.status != InstanceStatus::Stopped {
			// Detach the late watcher from this run.
			state.generation += 1;
			state.clear_process();
		}
	}
	instance.stdin.lock().await.take();
	info!(instance = %instance.name, "instance killed");
	Ok(())
}

async fn wait_exited(mut exited: watch::Receiver<bool>) {
	loop {
		let done = *exited.borrow_and_update();
		if done {
			return;
		}
		if exited.changed().await.is_err() {
			return;
		}
	}
}

async fn pump_lines<R>(instance: Arc<Instance>, stream: LogStream, reader: R)
where
	R: AsyncRead + Unpin + Send + 'static,
{
	let mut reader = BufReader::new(reader);
	let mut buf = Vec::new();
	loop {
		buf.clear();
		match reader.read_until(b'\n', &mut buf).await {
			Ok(0) => break,
			Ok(_) => {
				let line = String::from_utf8_lossy(&buf);
				let line = line.trim_end_matches(['\n', '\r']).to_string();
				instance.record(stream, line);
			}
			Err(err) => {
				debug!(instance = %instance.name, stream = stream.as_str(), error = %err, "output reader stopped");
				break;
			}
		}
	}
}

async fn watch_exit(
	instance: Arc<Instance>,
	mut child: Child,
	generation: u64,
	exited: watch::Sender<bool>,
) {
	let outcome = child.wait().await;
	let code = outcome.as_ref().ok().and_then(|status| status.code());
	{
		let mut state = instance.state.lock().await;
		if state.generation == generation {
			state.clear_process();
			state.last_exit_code = code;
		}
	}
	match outcome {
		Ok(status) => info!(instance = %instance.name, ?status, "instance exited"),
		Err(err) => warn!(instance = %instance.name, error = %err, "failed waiting for instance"),
	}
	let _ = exited.send(true);
}
