pub mod config;
pub mod error;
pub mod identity;
pub mod installer;
pub mod launch;
pub mod platform;
pub mod progress;
pub mod version;

pub use config::{ConfigManager, LauncherConfig};
pub use error::{Error, Result};
pub use identity::{IdentityGenerator, LaunchIdentity, RandomIdentity};
pub use installer::{InstallCallbacks, Installer, LocalInstaller};
pub use launch::{is_root_active, LaunchHandle, LaunchState, LaunchTask, Launcher};
pub use progress::{ConsoleProgress, LaunchEvent, ProgressObserver, ProgressState};
pub use version::{sort_key, NumericPart, VersionCatalog, VersionId, VersionMetadata};
