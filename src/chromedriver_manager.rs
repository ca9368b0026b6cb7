use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

const READINESS_TIMEOUT_SECS: u64 = 15;

/// Chrome-for-testing platform tag for the running OS.
pub fn platform_tag() -> Option<&'static str> {
    match (std::env::consts::OS, std::env::consts::ARCH) {
        ("windows", _) => Some("win64"),
        ("linux", "x86_64") => Some("linux64"),
        ("macos", "aarch64") => Some("mac-arm64"),
        ("macos", _) => Some("mac-x64"),
        _ => None,
    }
}

pub fn driver_file_name() -> &'static str {
    if cfg!(windows) {
        "chromedriver.exe"
    } else {
        "chromedriver"
    }
}

/// Owns the chromedriver process the browser session talks to.
pub struct ChromeDriverManager {
    driver_path: PathBuf,
    process: Arc<Mutex<Option<Child>>>,
}

impl ChromeDriverManager {
    /// Uses `explicit_path` when given, else a driver already on `PATH`,
    /// else the executable's directory (where a download lands).
    pub fn new(explicit_path: Option<&str>) -> Self {
        let driver_path = match explicit_path {
            Some(path) => PathBuf::from(path),
            None => find_on_path(driver_file_name()).unwrap_or_else(|| {
                std::env::current_exe()
                    .ok()
                    .and_then(|exe| exe.parent().map(Path::to_path_buf))
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(driver_file_name())
            }),
        };

        Self {
            driver_path,
            process: Arc::new(Mutex::new(None)),
        }
    }

    pub fn driver_path(&self) -> &Path {
        &self.driver_path
    }

    pub fn is_available(&self) -> bool {
        self.driver_path.is_file()
    }

    pub async fn ensure_driver_available(&self) -> Result<()> {
        if !self.is_available() {
            info!(path = %self.driver_path.display(), "ChromeDriver not found, downloading");
            self.download_chromedriver()
                .await
                .context("Failed to download ChromeDriver. Please check your internet connection.")?;
        } else {
            debug!(path = %self.driver_path.display(), "ChromeDriver found");
        }
        Ok(())
    }

    pub async fn start_driver(&self, port: u16) -> Result<()> {
        self.ensure_driver_available().await?;

        let mut process_guard = self.process.lock().await;
        if process_guard.is_some() {
            debug!(port, "ChromeDriver already running");
            return Ok(());
        }

        info!(port, "starting ChromeDriver");
        let child = Command::new(&self.driver_path)
            .arg(format!("--port={}", port))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| {
                format!(
                    "Failed to start ChromeDriver from {:?}. Make sure Chrome is installed.",
                    self.driver_path
                )
            })?;

        *process_guard = Some(child);

        if !self.wait_for_readiness(port, READINESS_TIMEOUT_SECS).await? {
            if let Some(mut child) = process_guard.take() {
                let _ = child.kill();
                let _ = child.wait();
            }
            return Err(anyhow::anyhow!(
                "ChromeDriver failed to become ready within {} seconds",
                READINESS_TIMEOUT_SECS
            ));
        }

        info!(port, "ChromeDriver ready");
        Ok(())
    }

    /// Stops the process if this manager started one. Safe to call repeatedly.
    pub async fn stop_driver(&self) -> Result<()> {
        let mut process_guard = self.process.lock().await;
        if let Some(mut child) = process_guard.take() {
            child.kill().context("Failed to stop ChromeDriver")?;
            let _ = child.wait();
            debug!("ChromeDriver stopped");
        }
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        let mut process_guard = self.process.lock().await;
        match process_guard.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    async fn download_chromedriver(&self) -> Result<()> {
        let platform = platform_tag()
            .ok_or_else(|| anyhow::anyhow!("No ChromeDriver build for this platform"))?;
        let version = self.get_latest_version().await?;
        info!(%version, platform, "downloading ChromeDriver");

        let download_url = format!(
            "https://storage.googleapis.com/chrome-for-testing-public/{}/{}/chromedriver-{}.zip",
            version, platform, platform
        );

        let response = reqwest::get(&download_url).await?.error_for_status()?;
        let zip_data = response.bytes().await?;

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data))?;
        let wanted = driver_file_name();
        let mut extracted = false;

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let file_name = file.name().to_string();
            // Archives nest the binary under chromedriver-<platform>/
            if file_name.rsplit('/').next() == Some(wanted) {
                if let Some(parent) = self.driver_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut outfile = fs::File::create(&self.driver_path)?;
                std::io::copy(&mut file, &mut outfile)?;
                extracted = true;
                break;
            }
        }

        if !extracted {
            return Err(anyhow::anyhow!("{} not found in {}", wanted, download_url));
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.driver_path, fs::Permissions::from_mode(0o755))?;
        }

        info!(path = %self.driver_path.display(), "ChromeDriver downloaded");
        Ok(())
    }

    async fn wait_for_readiness(&self, port: u16, timeout_secs: u64) -> Result<bool> {
        let client = reqwest::Client::new();
        let url = format!("http://localhost:{}/status", port);
        let timeout = tokio::time::Duration::from_secs(timeout_secs);
        let start = tokio::time::Instant::now();

        while start.elapsed() < timeout {
            if let Ok(response) = client.get(&url).send().await {
                if response.status().is_success() {
                    return Ok(true);
                }
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
        }

        Ok(false)
    }

    async fn get_latest_version(&self) -> Result<String> {
        let response = reqwest::get(
            "https://googlechromelabs.github.io/chrome-for-testing/LATEST_RELEASE_STABLE",
        )
        .await?
        .error_for_status()?;
        Ok(response.text().await?.trim().to_string())
    }
}

fn find_on_path(file_name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(file_name))
        .find(|candidate| candidate.is_file())
}

impl Drop for ChromeDriverManager {
    fn drop(&mut self) {
        if let Ok(mut process_guard) = self.process.try_lock() {
            if let Some(mut child) = process_guard.take() {
                let _ = child.kill();
                let _ = child.wait();
            }
        }
    }
}
