use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use sha1::{Digest, Sha1};

use crate::config::LauncherConfig;
use crate::identity::LaunchIdentity;
use crate::platform;
use crate::version::{VersionManifest, VersionMetadata, MANIFEST_FILE, VERSIONS_DIR};
use crate::{Error, Result};

/// The three progress channels an install reports through. Each call
/// carries only the field that changed.
pub trait InstallCallbacks: Send + Sync {
    fn set_status(&self, label: &str);
    fn set_progress(&self, current: u64);
    fn set_max(&self, max: u64);
}

/// Version listing, installation and command construction.
#[async_trait]
pub trait Installer: Send + Sync {
    async fn list_version_metadata(&self) -> Result<Vec<VersionMetadata>>;

    async fn install_version(
        &self,
        version_id: &str,
        install_root: &Path,
        callbacks: &dyn InstallCallbacks,
    ) -> Result<()>;

    /// Full argument vector, program first.
    async fn build_launch_command(
        &self,
        version_id: &str,
        install_root: &Path,
        identity: &LaunchIdentity,
    ) -> Result<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct VersionDetails {
    id: String,
    #[serde(rename = "mainClass")]
    main_class: String,
    #[serde(default)]
    libraries: Vec<Library>,
    arguments: Option<Arguments>,
    #[serde(rename = "minecraftArguments")]
    minecraft_arguments: Option<String>,
    #[serde(rename = "assetIndex")]
    asset_index: Option<AssetIndex>,
    assets: Option<String>,
    #[serde(rename = "type", default)]
    release_type: String,
    #[serde(default)]
    downloads: HashMap<String, Artifact>,
}

#[derive(Debug, Deserialize)]
struct AssetIndex {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Library {
    name: String,
    downloads: Option<LibraryDownloads>,
    #[serde(default)]
    rules: Vec<Rule>,
    natives: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct LibraryDownloads {
    artifact: Option<Artifact>,
    #[serde(default)]
    classifiers: HashMap<String, Artifact>,
}

#[derive(Debug, Clone, Deserialize)]
struct Artifact {
    #[serde(default)]
    path: String,
    sha1: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Rule {
    action: String,
    os: Option<OsRule>,
    features: Option<HashMap<String, bool>>,
}

#[derive(Debug, Deserialize)]
struct OsRule {
    name: Option<String>,
    arch: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Arguments {
    #[serde(default)]
    game: Vec<Argument>,
    #[serde(default)]
    jvm: Vec<Argument>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Argument {
    Plain(String),
    Conditional { rules: Vec<Rule>, value: ArgumentValue },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArgumentValue {
    Single(String),
    Many(Vec<String>),
}

impl Rule {
    fn applies(&self) -> bool {
        // Optional launcher features (demo mode, custom resolution) are never enabled.
        if self.features.as_ref().is_some_and(|f| !f.is_empty()) {
            return false;
        }

        match &self.os {
            Some(os) => {
                let name_matches = os
                    .name
                    .as_deref()
                    .map_or(true, |name| name == platform::host_os_name());
                let arch_matches = os
                    .arch
                    .as_deref()
                    .map_or(true, |arch| arch == std::env::consts::ARCH);
                name_matches && arch_matches
            }
            None => true,
        }
    }
}

/// Later rules override earlier ones; an empty list allows.
fn rules_allow(rules: &[Rule]) -> bool {
    if rules.is_empty() {
        return true;
    }

    let mut allowed = false;
    for rule in rules {
        if rule.applies() {
            allowed = rule.action == "allow";
        }
    }
    allowed
}

impl Argument {
    fn values(&self) -> Vec<String> {
        match self {
            Argument::Plain(value) => vec![value.clone()],
            Argument::Conditional { rules, value } => {
                if !rules_allow(rules) {
                    return Vec::new();
                }
                match value {
                    ArgumentValue::Single(v) => vec![v.clone()],
                    ArgumentValue::Many(v) => v.clone(),
                }
            }
        }
    }
}

/// `group:artifact:version` to `group/path/artifact/version/artifact-version.jar`.
fn maven_path(name: &str) -> Option<String> {
    let mut parts = name.split(':');
    let group = parts.next()?;
    let artifact = parts.next()?;
    let version = parts.next()?;
    Some(format!(
        "{}/{}/{}/{}-{}.jar",
        group.replace('.', "/"),
        artifact,
        version,
        artifact,
        version
    ))
}

impl Library {
    fn artifact(&self) -> Option<Artifact> {
        match self.downloads.as_ref().and_then(|d| d.artifact.clone()) {
            Some(artifact) => Some(artifact),
            None if self.natives.is_none() => maven_path(&self.name).map(|path| Artifact {
                path,
                sha1: None,
            }),
            None => None,
        }
    }

    fn native_artifact(&self) -> Option<Artifact> {
        let classifier = self.natives.as_ref()?.get(platform::host_os_name())?;
        let bits = if cfg!(target_pointer_width = "64") { "64" } else { "32" };
        let classifier = classifier.replace("${arch}", bits);
        self.downloads
            .as_ref()?
            .classifiers
            .get(&classifier)
            .cloned()
    }
}

struct RequiredFile {
    path: PathBuf,
    sha1: Option<String>,
}

/// Installer that works against an already populated install root: it
/// verifies that a version's files are present and intact, extracts its
/// natives and builds the java command line. It never touches the network.
pub struct LocalInstaller {
    install_root: PathBuf,
    java_path: PathBuf,
    memory_max_mb: u32,
    jvm_args: String,
    launcher_name: String,
    launcher_version: String,
}

impl LocalInstaller {
    pub fn new(config: &LauncherConfig) -> Self {
        Self {
            install_root: config.install_root.clone(),
            java_path: config.java_path.clone(),
            memory_max_mb: config.memory_max_mb,
            jvm_args: config.jvm_args.clone(),
            launcher_name: config.launcher_name.clone(),
            launcher_version: config.launcher_version.clone(),
        }
    }

    fn version_dir(install_root: &Path, version_id: &str) -> PathBuf {
        install_root.join(VERSIONS_DIR).join(version_id)
    }

    fn natives_dir(install_root: &Path, version_id: &str) -> PathBuf {
        Self::version_dir(install_root, version_id).join("natives")
    }

    async fn load_details(install_root: &Path, version_id: &str) -> Result<VersionDetails> {
        let path = Self::version_dir(install_root, version_id).join(format!("{}.json", version_id));
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::Install(format!(
                    "Version {} is not present in {:?}",
                    version_id, install_root
                )));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content)
            .map_err(|e| Error::Install(format!("Invalid version file {:?}: {}", path, e)))
    }

    fn client_jar(install_root: &Path, version_id: &str) -> PathBuf {
        Self::version_dir(install_root, version_id).join(format!("{}.jar", version_id))
    }

    fn required_files(install_root: &Path, details: &VersionDetails) -> Vec<RequiredFile> {
        let libraries_dir = install_root.join("libraries");
        let mut files = Vec::new();

        for library in details.libraries.iter().filter(|l| rules_allow(&l.rules)) {
            for artifact in library.artifact().into_iter().chain(library.native_artifact()) {
                files.push(RequiredFile {
                    path: libraries_dir.join(&artifact.path),
                    sha1: artifact.sha1,
                });
            }
        }

        files.push(RequiredFile {
            path: Self::client_jar(install_root, &details.id),
            sha1: details.downloads.get("client").and_then(|c| c.sha1.clone()),
        });
        files
    }

    async fn calculate_file_hash(path: &Path) -> Result<String> {
        let contents = tokio::fs::read(path).await?;
        let mut hasher = Sha1::new();
        hasher.update(&contents);
        Ok(hex::encode(hasher.finalize()))
    }

    async fn verify_file(file: &RequiredFile) -> Result<()> {
        if !file.path.is_file() {
            return Err(Error::Install(format!("Missing file {:?}", file.path)));
        }

        if let Some(expected) = &file.sha1 {
            let actual = Self::calculate_file_hash(&file.path).await?;
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(Error::Install(format!(
                    "Hash mismatch for {:?}: expected {}, got {}",
                    file.path, expected, actual
                )));
            }
        }
        Ok(())
    }

    fn extract_natives(jars: Vec<PathBuf>, natives_dir: PathBuf) -> Result<usize> {
        std::fs::create_dir_all(&natives_dir)?;
        let mut extracted = 0;

        for jar in jars {
            let file = std::fs::File::open(&jar)?;
            let mut archive = zip::ZipArchive::new(file)?;

            for i in 0..archive.len() {
                let mut entry = archive.by_index(i)?;
                if entry.is_dir() || !platform::is_native_library(entry.name()) {
                    continue;
                }

                let Some(file_name) = Path::new(entry.name()).file_name().map(|n| n.to_owned()) else {
                    continue;
                };
                let mut output = std::fs::File::create(natives_dir.join(file_name))?;
                std::io::copy(&mut entry, &mut output)?;
                extracted += 1;
            }
        }

        Ok(extracted)
    }

    fn classpath(install_root: &Path, details: &VersionDetails) -> String {
        let libraries_dir = install_root.join("libraries");
        let mut entries: Vec<String> = details
            .libraries
            .iter()
            .filter(|l| rules_allow(&l.rules))
            .filter_map(|l| l.artifact())
            .map(|a| libraries_dir.join(a.path).to_string_lossy().into_owned())
            .collect();

        entries.dedup();
        entries.push(
            Self::client_jar(install_root, &details.id)
                .to_string_lossy()
                .into_owned(),
        );
        entries.join(platform::get_classpath_separator())
    }
}

/// Replaces `${name}` placeholders; unknown names are left untouched.
fn substitute(args: Vec<String>, values: &HashMap<&str, String>) -> Vec<String> {
    let placeholder = match Regex::new(r"\$\{([a-zA-Z_]+)\}") {
        Ok(re) => re,
        Err(_) => return args,
    };

    args.into_iter()
        .map(|arg| {
            placeholder
                .replace_all(&arg, |caps: &regex::Captures| {
                    values
                        .get(&caps[1])
                        .cloned()
                        .unwrap_or_else(|| caps[0].to_string())
                })
                .into_owned()
        })
        .collect()
}

#[async_trait]
impl Installer for LocalInstaller {
    async fn list_version_metadata(&self) -> Result<Vec<VersionMetadata>> {
        let path = self.install_root.join(MANIFEST_FILE);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(path));
            }
            Err(e) => return Err(e.into()),
        };

        let manifest: VersionManifest = serde_json::from_str(&content)?;
        Ok(manifest.versions)
    }

    async fn install_version(
        &self,
        version_id: &str,
        install_root: &Path,
        callbacks: &dyn InstallCallbacks,
    ) -> Result<()> {
        callbacks.set_status(&format!("Reading version {}", version_id));
        let details = Self::load_details(install_root, version_id).await?;

        let files = Self::required_files(install_root, &details);
        callbacks.set_max(files.len() as u64);
        callbacks.set_progress(0);
        callbacks.set_status("Verifying libraries");

        for (i, file) in files.iter().enumerate() {
            Self::verify_file(file).await?;
            callbacks.set_progress(i as u64 + 1);
        }

        let native_jars: Vec<PathBuf> = details
            .libraries
            .iter()
            .filter(|l| rules_allow(&l.rules))
            .filter_map(|l| l.native_artifact())
            .map(|a| install_root.join("libraries").join(a.path))
            .collect();

        if !native_jars.is_empty() {
            callbacks.set_status("Extracting natives");
            let natives_dir = Self::natives_dir(install_root, version_id);
            let extracted = tokio::task::spawn_blocking(move || {
                Self::extract_natives(native_jars, natives_dir)
            })
            .await
            .map_err(|e| Error::Install(format!("Native extraction task failed: {}", e)))??;
            log::debug!("Extracted {} native libraries for {}", extracted, version_id);
        }

        callbacks.set_status("Installation complete");
        log::info!("Version {} verified in {:?}", version_id, install_root);
        Ok(())
    }

    async fn build_launch_command(
        &self,
        version_id: &str,
        install_root: &Path,
        identity: &LaunchIdentity,
    ) -> Result<Vec<String>> {
        let details = Self::load_details(install_root, version_id)
            .await
            .map_err(|e| Error::ProcessSpawn(e.to_string()))?;

        let natives_dir = Self::natives_dir(install_root, version_id);
        let assets_root = install_root.join("assets");
        let assets_index = details
            .asset_index
            .as_ref()
            .map(|a| a.id.clone())
            .or_else(|| details.assets.clone())
            .unwrap_or_else(|| details.id.clone());

        let mut values: HashMap<&str, String> = HashMap::new();
        values.insert("auth_player_name", identity.username.clone());
        values.insert("version_name", details.id.clone());
        values.insert("game_directory", install_root.to_string_lossy().into_owned());
        values.insert("assets_root", assets_root.to_string_lossy().into_owned());
        values.insert("game_assets", assets_root.to_string_lossy().into_owned());
        values.insert("assets_index_name", assets_index);
        values.insert("auth_uuid", identity.session_id.clone());
        values.insert("auth_access_token", identity.auth_token.clone());
        values.insert(
            "auth_session",
            format!("token:{}:{}", identity.auth_token, identity.session_id),
        );
        values.insert("user_type", identity.user_type().to_string());
        values.insert("user_properties", "{}".to_string());
        values.insert("version_type", details.release_type.clone());
        values.insert("natives_directory", natives_dir.to_string_lossy().into_owned());
        values.insert("classpath", Self::classpath(install_root, &details));
        values.insert("launcher_name", self.launcher_name.clone());
        values.insert("launcher_version", self.launcher_version.clone());
        values.insert("clientid", String::new());
        values.insert("auth_xuid", String::new());

        let arguments = details.arguments.unwrap_or_default();

        let mut jvm_args: Vec<String> = self.jvm_args.split_whitespace().map(String::from).collect();
        jvm_args.push(format!("-Xmx{}M", self.memory_max_mb));
        if arguments.jvm.is_empty() {
            jvm_args.push("-Djava.library.path=${natives_directory}".to_string());
            jvm_args.push("-cp".to_string());
            jvm_args.push("${classpath}".to_string());
        } else {
            jvm_args.extend(arguments.jvm.iter().flat_map(Argument::values));
        }

        let game_args: Vec<String> = if !arguments.game.is_empty() {
            arguments.game.iter().flat_map(Argument::values).collect()
        } else {
            details
                .minecraft_arguments
                .as_deref()
                .unwrap_or_default()
                .split_whitespace()
                .map(String::from)
                .collect()
        };

        let mut command = vec![self.java_path.to_string_lossy().into_owned()];
        command.extend(substitute(jvm_args, &values));
        command.push(details.main_class);
        command.extend(substitute(game_args, &values));

        log::debug!("Launch command for {}: {:?}", version_id, command);
        Ok(command)
    }
}
