use std::path::PathBuf;

pub const PRODUCT_NAME: &str = "DynamoLauncher";

/// Windows `CREATE_NO_WINDOW` process creation flag.
#[cfg(target_os = "windows")]
pub const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// The per-application install root: the platform's default game data
/// directory with the product name in place of `minecraft`.
pub fn default_install_root() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(format!(".{}", PRODUCT_NAME))
    }

    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(PRODUCT_NAME)
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(format!(".{}", PRODUCT_NAME))
    }
}

/// Resolves `path` against the current directory unless it is already absolute.
pub fn absolutize(path: PathBuf) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

pub fn get_classpath_separator() -> &'static str {
    if cfg!(windows) {
        ";"
    } else {
        ":"
    }
}

/// OS name as it appears in version manifest rules.
pub fn host_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

pub fn is_native_library(file_name: &str) -> bool {
    file_name.ends_with(".dll") || file_name.ends_with(".so") || file_name.ends_with(".dylib")
}
