use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::process::Command;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinHandle};

use crate::config::LauncherConfig;
use crate::identity::{IdentityGenerator, LaunchIdentity, RandomIdentity};
use crate::installer::{Installer, LocalInstaller};
use crate::progress::{deliver, LaunchEvent, ProgressObserver, ProgressTracker};
use crate::version::VersionCatalog;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchState {
    Idle,
    Installing,
    Resolving,
    Spawned,
    Completed,
}

/// Install roots with a launch in flight, process-wide.
static ACTIVE_ROOTS: Mutex<BTreeSet<PathBuf>> = Mutex::new(BTreeSet::new());

fn active_roots() -> MutexGuard<'static, BTreeSet<PathBuf>> {
    match ACTIVE_ROOTS.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn root_key(root: &Path) -> PathBuf {
    std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf())
}

/// True while any task, from any [`Launcher`], is running in `root`.
pub fn is_root_active(root: &Path) -> bool {
    active_roots().contains(&root_key(root))
}

/// Exclusive hold on an install root. Released on drop, so an unwinding or
/// cancelled task frees the root as well.
struct RootClaim {
    key: PathBuf,
}

impl RootClaim {
    fn acquire(root: &Path) -> Option<Self> {
        let key = root_key(root);
        if active_roots().insert(key.clone()) {
            Some(Self { key })
        } else {
            None
        }
    }
}

impl Drop for RootClaim {
    fn drop(&mut self) {
        active_roots().remove(&self.key);
    }
}

/// Everything the background half of a task needs. Cloned out of the
/// [`LaunchTask`] so the spawned future owns its data.
#[derive(Clone)]
struct TaskContext {
    install_root: PathBuf,
    installer: Arc<dyn Installer>,
    identity_generator: Arc<dyn IdentityGenerator>,
    state: Arc<Mutex<LaunchState>>,
}

impl TaskContext {
    fn state(&self) -> LaunchState {
        match self.state.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn transition(&self, new: LaunchState) {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        log::debug!("Launch task: {:?} -> {:?}", *guard, new);
        *guard = new;
    }
}

/// One launch of one version: install, resolve identity, spawn, wait.
///
/// Tasks are single use. Once [`start`](Self::start) has been called the
/// task never returns to `Idle`; build a new one to launch again.
pub struct LaunchTask {
    context: TaskContext,
    observers: Vec<Arc<dyn ProgressObserver>>,
}

impl std::fmt::Debug for LaunchTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchTask")
            .field("install_root", &self.context.install_root)
            .field("state", &self.state())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl LaunchTask {
    pub fn new(
        install_root: PathBuf,
        installer: Arc<dyn Installer>,
        identity_generator: Arc<dyn IdentityGenerator>,
    ) -> Self {
        Self {
            context: TaskContext {
                install_root,
                installer,
                identity_generator,
                state: Arc::new(Mutex::new(LaunchState::Idle)),
            },
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn ProgressObserver>) {
        self.observers.push(observer);
    }

    pub fn state(&self) -> LaunchState {
        self.context.state()
    }

    pub fn install_root(&self) -> &Path {
        &self.context.install_root
    }

    /// Starts the launch on a tokio task and returns the handle the caller
    /// drains to deliver events to the registered observers.
    ///
    /// Fails with [`Error::Precondition`], without emitting any event, when
    /// `version_id` is empty, when this task has already been started, or
    /// when another task in this process is active on the same install root.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, version_id: &str, username: &str) -> Result<LaunchHandle> {
        if version_id.is_empty() {
            return Err(Error::Precondition("version id must not be empty".to_string()));
        }

        let claim = {
            let mut state = match self.context.state.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if *state != LaunchState::Idle {
                return Err(Error::Precondition(format!(
                    "launch task is {:?}, not Idle",
                    *state
                )));
            }

            let claim = RootClaim::acquire(&self.context.install_root).ok_or_else(|| {
                Error::Precondition(format!(
                    "another launch is already active in {:?}",
                    self.context.install_root
                ))
            })?;

            *state = LaunchState::Installing;
            claim
        };

        log::info!("Launching {} from {:?}", version_id, self.context.install_root);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        // Queued before the task exists so it is always the first event.
        let _ = events_tx.send(LaunchEvent::BusyChanged(true));

        let task = tokio::spawn(run(
            self.context.clone(),
            version_id.to_string(),
            username.to_string(),
            events_tx,
            claim,
        ));

        Ok(LaunchHandle {
            events: events_rx,
            observers: self.observers.clone(),
            task: Some(task),
            finished: false,
        })
    }
}

async fn run(
    context: TaskContext,
    version_id: String,
    username: String,
    events: UnboundedSender<LaunchEvent>,
    claim: RootClaim,
) -> Result<LaunchIdentity> {
    // Run the steps on their own task so a panicking collaborator still
    // reaches the cleanup below.
    let attempt = tokio::spawn({
        let context = context.clone();
        let version_id = version_id.clone();
        let events = events.clone();
        async move { execute(&context, &version_id, &username, &events).await }
    })
    .await;

    let result = match attempt {
        Ok(result) => result,
        Err(e) => Err(aborted_step_error(context.state(), e)),
    };

    if let Err(e) = &result {
        log::error!("Launch of {} failed: {}", version_id, e);
        let _ = events.send(LaunchEvent::Failed(e.to_string()));
    }

    context.transition(LaunchState::Completed);
    drop(claim);
    let _ = events.send(LaunchEvent::BusyChanged(false));

    result
}

/// Maps a panicked or cancelled step to the error of the phase it died in.
fn aborted_step_error(state: LaunchState, err: JoinError) -> Error {
    let reason = if err.is_panic() {
        let payload = err.into_panic();
        match payload.downcast_ref::<&str>() {
            Some(message) => format!("panicked: {}", message),
            None => match payload.downcast_ref::<String>() {
                Some(message) => format!("panicked: {}", message),
                None => "panicked".to_string(),
            },
        }
    } else {
        err.to_string()
    };

    match state {
        LaunchState::Installing => Error::Install(reason),
        _ => Error::ProcessSpawn(reason),
    }
}

async fn execute(
    context: &TaskContext,
    version_id: &str,
    username: &str,
    events: &UnboundedSender<LaunchEvent>,
) -> Result<LaunchIdentity> {
    {
        let tracker = ProgressTracker::new(events.clone());
        context
            .installer
            .install_version(version_id, &context.install_root, &tracker)
            .await
            .map_err(|e| match e {
                Error::Install(_) => e,
                other => Error::Install(other.to_string()),
            })?;
    }

    context.transition(LaunchState::Resolving);
    let identity = LaunchIdentity::resolve(username, context.identity_generator.as_ref());
    log::info!("Playing as {}", identity.username);

    let argv = context
        .installer
        .build_launch_command(version_id, &context.install_root, &identity)
        .await
        .map_err(|e| match e {
            Error::ProcessSpawn(_) => e,
            other => Error::ProcessSpawn(other.to_string()),
        })?;

    let (program, args) = argv
        .split_first()
        .ok_or_else(|| Error::ProcessSpawn(format!("empty launch command for {}", version_id)))?;

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(&context.install_root)
        .stdin(Stdio::null());

    #[cfg(target_os = "windows")]
    command.creation_flags(crate::platform::CREATE_NO_WINDOW);

    let mut child = command
        .spawn()
        .map_err(|e| Error::ProcessSpawn(format!("failed to start {}: {}", program, e)))?;

    context.transition(LaunchState::Spawned);
    log::info!("Game started (pid {:?})", child.id());

    match child.wait().await {
        Ok(status) => log::debug!("Game exited with {}", status),
        Err(e) => log::warn!("Lost track of the game process: {}", e),
    }

    Ok(identity)
}

/// Owner-side end of a running [`LaunchTask`]. Observers are invoked only
/// from whichever context drains this handle.
pub struct LaunchHandle {
    events: UnboundedReceiver<LaunchEvent>,
    observers: Vec<Arc<dyn ProgressObserver>>,
    task: Option<JoinHandle<Result<LaunchIdentity>>>,
    finished: bool,
}

impl LaunchHandle {
    fn handle_event(&mut self, event: LaunchEvent) {
        if event == LaunchEvent::BusyChanged(false) {
            self.finished = true;
        }
        deliver(&self.observers, &event);
    }

    /// Delivers every event queued so far without waiting. Suited to
    /// polling from an event loop. Returns the number delivered.
    pub fn try_dispatch(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            delivered += 1;
        }
        delivered
    }

    /// Delivers events as they arrive until the task has emitted its last one.
    pub async fn dispatch(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(event) = self.events.recv().await {
            self.handle_event(event);
            delivered += 1;
        }
        delivered
    }

    /// True once the final `busy=false` has been delivered.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Dispatches all remaining events, then returns the task's result:
    /// the identity the game ran with, or the error that ended the task.
    pub async fn wait(mut self) -> Result<LaunchIdentity> {
        self.dispatch().await;

        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| Error::Install(format!("launch task aborted: {}", e)))?,
            None => Err(Error::Precondition("launch result already taken".to_string())),
        }
    }
}

/// Creates launch tasks for one install root. Only one of them, or of any
/// other task on the same root, runs at a time.
pub struct Launcher {
    config: LauncherConfig,
    installer: Arc<dyn Installer>,
    identity_generator: Arc<dyn IdentityGenerator>,
}

impl Launcher {
    pub fn new(config: LauncherConfig) -> Self {
        let installer = Arc::new(LocalInstaller::new(&config));
        Self::with_collaborators(config, installer, Arc::new(RandomIdentity))
    }

    pub fn with_collaborators(
        config: LauncherConfig,
        installer: Arc<dyn Installer>,
        identity_generator: Arc<dyn IdentityGenerator>,
    ) -> Self {
        Self {
            config,
            installer,
            identity_generator,
        }
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    pub fn catalog(&self) -> VersionCatalog {
        VersionCatalog::new(self.installer.clone(), self.config.install_root.clone())
    }

    pub fn new_task(&self) -> LaunchTask {
        LaunchTask::new(
            self.config.install_root.clone(),
            self.installer.clone(),
            self.identity_generator.clone(),
        )
    }

    /// True while a task is running in this launcher's install root.
    pub fn is_busy(&self) -> bool {
        is_root_active(&self.config.install_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MockIdentityGenerator;
    use crate::installer::InstallCallbacks;
    use crate::progress::ProgressState;
    use crate::version::VersionMetadata;
    use async_trait::async_trait;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Clone, Copy, PartialEq)]
    enum Mode {
        Run,
        FailInstall,
        PanicInstall,
        PanicCommand,
    }

    struct FakeInstaller {
        mode: Mode,
        command: Vec<String>,
        built_for: Mutex<Vec<LaunchIdentity>>,
    }

    impl FakeInstaller {
        fn with_mode(mode: Mode, command: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                mode,
                command: command.iter().map(|s| s.to_string()).collect(),
                built_for: Mutex::new(Vec::new()),
            })
        }

        fn running(command: &[&str]) -> Arc<Self> {
            Self::with_mode(Mode::Run, command)
        }

        fn failing() -> Arc<Self> {
            Self::with_mode(Mode::FailInstall, &["true"])
        }

        fn built_for(&self) -> Vec<LaunchIdentity> {
            self.built_for.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Installer for FakeInstaller {
        async fn list_version_metadata(&self) -> Result<Vec<VersionMetadata>> {
            Ok(vec![VersionMetadata::new("1.20.1", "release")])
        }

        async fn install_version(
            &self,
            _version_id: &str,
            _install_root: &Path,
            callbacks: &dyn InstallCallbacks,
        ) -> Result<()> {
            callbacks.set_status("Downloading");
            callbacks.set_max(2);
            callbacks.set_progress(1);
            if self.mode == Mode::PanicInstall {
                panic!("installer blew up");
            }
            if self.mode == Mode::FailInstall {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            callbacks.set_progress(2);
            Ok(())
        }

        async fn build_launch_command(
            &self,
            _version_id: &str,
            _install_root: &Path,
            identity: &LaunchIdentity,
        ) -> Result<Vec<String>> {
            if self.mode == Mode::PanicCommand {
                panic!("no main class");
            }
            self.built_for.lock().unwrap().push(identity.clone());
            Ok(self.command.clone())
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<LaunchEvent>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<LaunchEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ProgressObserver for Recorder {
        fn on_busy_changed(&self, busy: bool) {
            self.events.lock().unwrap().push(LaunchEvent::BusyChanged(busy));
        }

        fn on_progress(&self, current: u64, max: u64, label: &str) {
            self.events.lock().unwrap().push(LaunchEvent::Progress(ProgressState {
                current,
                max,
                label: label.to_string(),
            }));
        }

        fn on_error(&self, message: &str) {
            self.events.lock().unwrap().push(LaunchEvent::Failed(message.to_string()));
        }
    }

    fn progress(current: u64, max: u64) -> LaunchEvent {
        LaunchEvent::Progress(ProgressState {
            current,
            max,
            label: "Downloading".to_string(),
        })
    }

    fn task_with(installer: Arc<FakeInstaller>, root: &Path) -> (LaunchTask, Arc<Recorder>) {
        let mut task = LaunchTask::new(root.to_path_buf(), installer, Arc::new(RandomIdentity));
        let recorder = Arc::new(Recorder::default());
        task.add_observer(recorder.clone());
        (task, recorder)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_launch_event_shape() {
        let root = TempDir::new().unwrap();
        let (task, recorder) = task_with(FakeInstaller::running(&["true"]), root.path());
        assert_eq!(task.state(), LaunchState::Idle);

        let handle = task.start("1.20.1", "Steve").unwrap();
        let identity = handle.wait().await.unwrap();

        assert_eq!(identity.username, "Steve");
        assert_eq!(task.state(), LaunchState::Completed);
        assert_eq!(
            recorder.events(),
            vec![
                LaunchEvent::BusyChanged(true),
                LaunchEvent::Progress(ProgressState {
                    current: 0,
                    max: 0,
                    label: "Downloading".to_string(),
                }),
                progress(0, 2),
                progress(1, 2),
                progress(2, 2),
                LaunchEvent::BusyChanged(false),
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_normal_completion() {
        let root = TempDir::new().unwrap();
        let (task, recorder) = task_with(FakeInstaller::running(&["sh", "-c", "exit 3"]), root.path());

        let result = task.start("1.20.1", "Steve").unwrap().wait().await;
        assert!(result.is_ok());
        assert_eq!(recorder.events().last(), Some(&LaunchEvent::BusyChanged(false)));
        assert!(!recorder.events().iter().any(|e| matches!(e, LaunchEvent::Failed(_))));
    }

    #[tokio::test]
    async fn test_install_failure_skips_spawn() {
        let root = TempDir::new().unwrap();
        let installer = FakeInstaller::failing();
        let (task, recorder) = task_with(installer.clone(), root.path());

        let result = task.start("1.20.1", "").unwrap().wait().await;

        assert!(matches!(result, Err(Error::Install(ref msg)) if msg.contains("disk full")));
        assert!(installer.built_for().is_empty());
        assert_eq!(task.state(), LaunchState::Completed);

        let events = recorder.events();
        assert_eq!(events.first(), Some(&LaunchEvent::BusyChanged(true)));
        assert_eq!(events.last(), Some(&LaunchEvent::BusyChanged(false)));
        let failed_at = events
            .iter()
            .position(|e| matches!(e, LaunchEvent::Failed(_)))
            .unwrap();
        assert!(events[failed_at..]
            .iter()
            .all(|e| !matches!(e, LaunchEvent::Progress(_))));
        assert_eq!(events[failed_at - 1], progress(1, 2));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported() {
        let root = TempDir::new().unwrap();
        let (task, recorder) = task_with(
            FakeInstaller::running(&["/definitely/not/a/real/java"]),
            root.path(),
        );

        let result = task.start("1.20.1", "Steve").unwrap().wait().await;

        assert!(matches!(result, Err(Error::ProcessSpawn(_))));
        assert_eq!(recorder.events().last(), Some(&LaunchEvent::BusyChanged(false)));
    }

    #[tokio::test]
    async fn test_empty_command_is_spawn_error() {
        let root = TempDir::new().unwrap();
        let (task, _recorder) = task_with(FakeInstaller::running(&[]), root.path());

        let result = task.start("1.20.1", "Steve").unwrap().wait().await;
        assert!(matches!(result, Err(Error::ProcessSpawn(_))));
    }

    #[tokio::test]
    async fn test_empty_version_is_rejected_without_events() {
        let root = TempDir::new().unwrap();
        let (task, recorder) = task_with(FakeInstaller::running(&["true"]), root.path());

        let result = task.start("", "Steve");

        assert!(matches!(result, Err(Error::Precondition(_))));
        assert_eq!(task.state(), LaunchState::Idle);
        assert!(recorder.events().is_empty());
    }

    #[tokio::test]
    async fn test_second_start_is_rejected() {
        let root = TempDir::new().unwrap();
        let (task, recorder) = task_with(FakeInstaller::failing(), root.path());

        let handle = task.start("1.20.1", "Steve").unwrap();
        let second = task.start("1.20.1", "Steve");
        assert!(matches!(second, Err(Error::Precondition(_))));

        let _ = handle.wait().await;
        let busy_true = recorder
            .events()
            .iter()
            .filter(|e| **e == LaunchEvent::BusyChanged(true))
            .count();
        assert_eq!(busy_true, 1);

        // A completed task stays completed.
        assert!(matches!(
            task.start("1.20.1", "Steve"),
            Err(Error::Precondition(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_username_is_generated() {
        let root = TempDir::new().unwrap();
        let installer = FakeInstaller::running(&["/definitely/not/a/real/java"]);

        let mut generator = MockIdentityGenerator::new();
        generator
            .expect_random_username()
            .times(1)
            .returning(|| "LuckyFox7".to_string());
        generator
            .expect_random_session_id()
            .times(1)
            .returning(|| "5d1c7a5e-0000-4000-8000-000000000001".to_string());

        let task = LaunchTask::new(root.path().to_path_buf(), installer.clone(), Arc::new(generator));
        let _ = task.start("1.20.1", "").unwrap().wait().await;

        let built = installer.built_for();
        assert_eq!(built.len(), 1);
        assert_eq!(built[0].username, "LuckyFox7");
        assert_eq!(built[0].session_id, "5d1c7a5e-0000-4000-8000-000000000001");
        assert!(built[0].auth_token.is_empty());
    }

    #[tokio::test]
    async fn test_launcher_serializes_tasks() {
        let root = TempDir::new().unwrap();
        let installer = FakeInstaller::failing();
        let launcher = Launcher::with_collaborators(
            LauncherConfig::with_install_root(root.path().to_path_buf()),
            installer,
            Arc::new(RandomIdentity),
        );

        let first = launcher.new_task();
        let second = launcher.new_task();

        let handle = first.start("1.20.1", "Steve").unwrap();
        assert!(launcher.is_busy());
        assert!(matches!(
            second.start("1.19.4", "Alex"),
            Err(Error::Precondition(_))
        ));
        assert_eq!(second.state(), LaunchState::Idle);

        let _ = handle.wait().await;
        assert!(!launcher.is_busy());

        let retry = second.start("1.19.4", "Alex").unwrap();
        assert!(matches!(retry.wait().await, Err(Error::Install(_))));
    }

    #[tokio::test]
    async fn test_tasks_on_same_root_are_serialized_without_launcher() {
        let root = TempDir::new().unwrap();
        let (first, _) = task_with(FakeInstaller::failing(), root.path());
        let (second, recorder) = task_with(FakeInstaller::failing(), root.path());

        let handle = first.start("1.20.1", "Steve").unwrap();
        assert!(is_root_active(root.path()));
        assert!(matches!(
            second.start("1.19.4", "Alex"),
            Err(Error::Precondition(_))
        ));
        assert!(recorder.events().is_empty());

        let _ = handle.wait().await;
        assert!(!is_root_active(root.path()));
        assert!(second.start("1.19.4", "Alex").unwrap().wait().await.is_err());
    }

    #[tokio::test]
    async fn test_separate_launchers_share_the_root_guard() {
        let root = TempDir::new().unwrap();
        let config = LauncherConfig::with_install_root(root.path().to_path_buf());
        let one = Launcher::with_collaborators(
            config.clone(),
            FakeInstaller::failing(),
            Arc::new(RandomIdentity),
        );
        let two = Launcher::with_collaborators(config, FakeInstaller::failing(), Arc::new(RandomIdentity));

        let handle = one.new_task().start("1.20.1", "Steve").unwrap();
        assert!(two.is_busy());
        assert!(matches!(
            two.new_task().start("1.20.1", "Alex"),
            Err(Error::Precondition(_))
        ));

        let _ = handle.wait().await;
        assert!(!two.is_busy());
    }

    #[tokio::test]
    async fn test_other_roots_are_independent() {
        let root_a = TempDir::new().unwrap();
        let root_b = TempDir::new().unwrap();
        let (a, _) = task_with(FakeInstaller::failing(), root_a.path());
        let (b, _) = task_with(FakeInstaller::failing(), root_b.path());

        let first = a.start("1.20.1", "Steve").unwrap();
        let second = b.start("1.20.1", "Alex").unwrap();
        let _ = first.wait().await;
        let _ = second.wait().await;
    }

    #[tokio::test]
    async fn test_installer_panic_still_completes() {
        let root = TempDir::new().unwrap();
        let installer = FakeInstaller::with_mode(Mode::PanicInstall, &["true"]);
        let (task, recorder) = task_with(installer.clone(), root.path());

        let result = task.start("1.20.1", "Steve").unwrap().wait().await;

        assert!(matches!(result, Err(Error::Install(ref msg)) if msg.contains("installer blew up")));
        assert!(installer.built_for().is_empty());
        assert_eq!(task.state(), LaunchState::Completed);
        assert!(!is_root_active(root.path()));

        let events = recorder.events();
        assert_eq!(events.first(), Some(&LaunchEvent::BusyChanged(true)));
        assert_eq!(events.last(), Some(&LaunchEvent::BusyChanged(false)));
        assert!(matches!(events[events.len() - 2], LaunchEvent::Failed(_)));

        let (retry, _) = task_with(FakeInstaller::failing(), root.path());
        let retried = retry.start("1.20.1", "Steve").unwrap().wait().await;
        assert!(matches!(retried, Err(Error::Install(ref msg)) if msg.contains("disk full")));
    }

    #[tokio::test]
    async fn test_command_panic_is_spawn_error() {
        let root = TempDir::new().unwrap();
        let (task, recorder) = task_with(
            FakeInstaller::with_mode(Mode::PanicCommand, &["true"]),
            root.path(),
        );

        let result = task.start("1.20.1", "Steve").unwrap().wait().await;

        assert!(matches!(result, Err(Error::ProcessSpawn(ref msg)) if msg.contains("no main class")));
        assert_eq!(task.state(), LaunchState::Completed);
        assert_eq!(recorder.events().last(), Some(&LaunchEvent::BusyChanged(false)));
        assert!(!is_root_active(root.path()));
    }

    #[tokio::test]
    async fn test_try_dispatch_polling() {
        let root = TempDir::new().unwrap();
        let (task, recorder) = task_with(FakeInstaller::failing(), root.path());

        let mut handle = task.start("1.20.1", "Steve").unwrap();
        let mut delivered = 0;
        for _ in 0..200 {
            delivered += handle.try_dispatch();
            if handle.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert!(handle.is_finished());
        assert_eq!(delivered, recorder.events().len());
        assert_eq!(recorder.events().last(), Some(&LaunchEvent::BusyChanged(false)));
    }

    #[tokio::test]
    async fn test_catalog_uses_launcher_installer() {
        let root = TempDir::new().unwrap();
        let launcher = Launcher::with_collaborators(
            LauncherConfig::with_install_root(root.path().to_path_buf()),
            FakeInstaller::running(&["true"]),
            Arc::new(RandomIdentity),
        );

        let available = launcher.catalog().list_available().await.unwrap();
        assert_eq!(available, vec!["1.20.1".to_string()]);
    }
}
