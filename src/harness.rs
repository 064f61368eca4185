//! Interactive orchestration: the main menu and each testing action.
//!
//! Every action reports its own outcome; the menu loop catches action
//! errors, prints them, and keeps going. Nothing here should be able to
//! take the whole harness down short of a broken terminal.

use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::config::{self, Config};
use crate::dubbing::download::download_artifact;
use crate::dubbing::murf::MurfClient;
use crate::dubbing::{await_completion, DubJob, DubService, PollOutcome};
use crate::emulator::{EmulatorClient, EndpointHealth, FUNCTION_NAMES};
use crate::error::{DubError, Result};
use crate::locale::{Locale, LOCALES};
use crate::logs::LogViewer;
use crate::media::{AudioExtractor, MediaToolFactory, VideoFetcher};
use crate::storage::{self, Storage};

const MENU_ITEMS: &[(&str, &str)] = &[
    ("Environment check", "Verify tools and API access"),
    ("Video download", "Download video from a tweet"),
    ("Audio extraction", "Extract audio from a local video file"),
    ("Direct dubbing", "Send a local video to the dubbing service and poll"),
    ("Complete flow", "Run the full backend dubbing process"),
    ("View logs", "Show recent backend function logs"),
    ("Emulator status", "Check the local emulator"),
    ("Configuration", "View current project configuration"),
    ("Quit", "Exit the application"),
];

pub struct Harness {
    config: Config,
    storage: Storage,
    fetcher: Box<dyn VideoFetcher>,
    extractor: Box<dyn AudioExtractor>,
    dubber: MurfClient,
    emulator: EmulatorClient,
    logs: LogViewer,
    http: reqwest::Client,
    theme: ColorfulTheme,
}

impl Harness {
    pub fn new(config: Config) -> Result<Self> {
        let storage = Storage::new(config.storage.clone());
        let fetcher = MediaToolFactory::create_fetcher(&config.tools);
        let extractor = MediaToolFactory::create_extractor(&config.tools);
        let dubber = MurfClient::new(config.murf.clone())?;
        let emulator =
            EmulatorClient::new(config.emulator.clone(), config.tools.firebase_path.clone())?;
        let logs = LogViewer::new(
            config.tools.firebase_path.clone(),
            std::env::current_dir()?,
        );
        let http = reqwest::Client::builder()
            .user_agent(concat!("dubkit/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            config,
            storage,
            fetcher,
            extractor,
            dubber,
            emulator,
            logs,
            http,
            theme: ColorfulTheme::default(),
        })
    }

    /// Interactive main loop. Action errors are printed and the menu
    /// returns; only "Quit" or a declined continue prompt exits.
    pub async fn run_menu(&self) -> Result<()> {
        let labels: Vec<String> = MENU_ITEMS
            .iter()
            .map(|(name, hint)| format!("{name:<20} {hint}"))
            .collect();
        let quit_index = MENU_ITEMS.len() - 1;

        loop {
            println!();
            let choice = Select::with_theme(&self.theme)
                .with_prompt("Select an option")
                .items(&labels)
                .default(0)
                .interact()?;

            if choice == quit_index {
                break;
            }

            println!();
            if let Err(e) = self.dispatch(choice).await {
                eprintln!("\nError: {e}");
            }

            let again = Confirm::with_theme(&self.theme)
                .with_prompt("Return to the main menu?")
                .default(true)
                .interact()?;
            if !again {
                break;
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    async fn dispatch(&self, choice: usize) -> Result<()> {
        match choice {
            0 => self.check_environment().await,
            1 => self.fetch_video(None, None).await,
            2 => self.extract_audio(None, None).await,
            3 => self.dub_local_file(None, None).await,
            4 => self.run_backend_flow(None, None).await,
            5 => self.view_logs().await,
            6 => self.emulator_status().await,
            7 => self.show_configuration().await,
            _ => Ok(()),
        }
    }

    /// Verify tools, keys, and directories without touching the network.
    pub async fn check_environment(&self) -> Result<()> {
        println!("Running environment checks...\n");
        let mut all_ok = true;

        match &self.config.murf.api_key {
            Some(key) => println!("  + MURF_API_KEY: {}", config::mask_secret(key)),
            None => {
                all_ok = false;
                println!("  - MURF_API_KEY is not set (direct dubbing unavailable)");
            }
        }

        match self.fetcher.version().await {
            Ok(version) => println!("  + yt-dlp: {version}"),
            Err(e) => {
                all_ok = false;
                println!("  - yt-dlp: {e}");
            }
        }
        match self.extractor.version().await {
            Ok(version) => println!("  + ffmpeg: {version}"),
            Err(e) => {
                all_ok = false;
                println!("  - ffmpeg: {e}");
            }
        }
        match tool_version(&self.config.tools.firebase_path, "--version").await {
            Some(version) => println!("  + firebase-tools: {version}"),
            None => {
                all_ok = false;
                println!("  - firebase-tools not found (emulator flows unavailable)");
            }
        }

        self.storage.ensure_dirs()?;
        println!(
            "  + output directories: {} and {}",
            self.storage.downloads_dir().display(),
            self.storage.dubbed_dir().display()
        );

        if all_ok {
            println!("\nEnvironment checks passed.");
        } else {
            println!("\nSome checks failed; the affected actions will not work.");
        }
        Ok(())
    }

    /// Download the video attached to a tweet into the downloads directory.
    pub async fn fetch_video(
        &self,
        url: Option<String>,
        output_dir: Option<PathBuf>,
    ) -> Result<()> {
        let url = self.prompt_string("Enter tweet URL", url, None)?;

        let output_dir = match output_dir {
            Some(dir) => dir,
            None => PathBuf::from(self.prompt_string(
                "Output directory",
                None,
                Some(self.storage.downloads_dir().display().to_string()),
            )?),
        };
        std::fs::create_dir_all(&output_dir)?;
        let dest = output_dir.join(storage::download_file_name(chrono::Utc::now().timestamp()));

        let spinner = self.spinner("Downloading video...");
        let result = self.fetcher.fetch(&url, &dest).await;
        spinner.finish_and_clear();

        let path = match result {
            Ok(path) => path,
            Err(e) => {
                println!("Download failed. Possible fixes:");
                println!("  1) Update yt-dlp to the latest release");
                println!("  2) If the tweet requires login, pass cookies from your browser:");
                println!("     yt-dlp --cookies-from-browser chrome 'https://twitter.com/...'");
                println!("  3) Ensure the URL is a public tweet with an attached video.");
                return Err(e);
            }
        };

        let size = std::fs::metadata(&path)?.len();
        println!("Video downloaded to: {} ({:.2} MB)", path.display(), mb(size));
        println!("Tip: audio extraction and direct dubbing default to this file.");
        Ok(())
    }

    /// Extract the audio track of a local video file to mp3.
    pub async fn extract_audio(
        &self,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
    ) -> Result<()> {
        let input = self.resolve_input_video(input, "Enter video file path")?;
        let output = output.unwrap_or_else(|| input.with_extension("mp3"));

        let spinner = self.spinner("Extracting audio...");
        let result = self.extractor.extract_audio(&input, &output).await;
        spinner.finish_and_clear();
        result?;

        let size = std::fs::metadata(&output)?.len();
        println!("Audio extracted to: {} ({:.2} MB)", output.display(), mb(size));
        Ok(())
    }

    /// Submit a local video to the dubbing service, wait for the job, and
    /// save the dubbed artifact.
    pub async fn dub_local_file(
        &self,
        input: Option<PathBuf>,
        language: Option<String>,
    ) -> Result<()> {
        if self.config.murf.api_key.is_none() {
            return Err(DubError::Config("MURF_API_KEY is not set".to_string()));
        }

        let input = self.resolve_input_video(input, "Enter video file path (MP4/MOV/MKV/WEBM)")?;
        let locale = self.resolve_locale(language)?;

        let spinner = self.spinner("Creating dubbing job...");
        let submit_result = self.dubber.submit(&input, locale).await;
        spinner.finish_and_clear();
        let job_id = submit_result?;

        println!("Job created: {job_id}. Polling status...");
        let mut job = DubJob::new(job_id, input, locale);

        let spinner = self.spinner("Waiting for dubbing to complete...");
        let wait_result = await_completion(
            &self.dubber,
            &job.id,
            self.config.polling.max_attempts,
            Duration::from_secs(self.config.polling.interval_secs),
        )
        .await;
        spinner.finish_and_clear();

        let download_url = match wait_result {
            Ok(url) => {
                job.apply(&PollOutcome::Completed {
                    download_url: url.clone(),
                });
                url
            }
            Err(DubError::JobFailed(reason)) => {
                job.apply(&PollOutcome::Failed {
                    reason: reason.clone(),
                });
                debug!("terminal job state: {:?}", job);
                return Err(DubError::JobFailed(reason));
            }
            Err(e) => return Err(e),
        };
        debug!("terminal job state: {:?}", job);

        println!("Dubbing completed.");
        println!("Download URL: {download_url}");
        self.save_artifact(&download_url, locale).await
    }

    /// Run the complete backend dubbing flow through the local emulator.
    pub async fn run_backend_flow(
        &self,
        url: Option<String>,
        language: Option<String>,
    ) -> Result<()> {
        let url = self.prompt_string("Enter tweet URL", url, None)?;
        let url = crate::media::ytdlp::normalize_tweet_url(&url);
        let locale = self.resolve_locale(language)?;

        if !self.ensure_emulator_running().await? {
            println!("Cancelled. Emulator not running.");
            return Ok(());
        }

        println!("Calling local dubbing service...");
        let spinner = self.spinner("Processing (this may take several minutes)...");
        let result = self.emulator.dub_video(&url, locale).await;
        spinner.finish_and_clear();
        let dubbed_url = result?;

        println!("Dubbing completed by backend.");
        println!("Download URL: {dubbed_url}");
        self.save_artifact(&dubbed_url, locale).await
    }

    /// Show recent backend function logs.
    pub async fn view_logs(&self) -> Result<()> {
        println!("Fetching backend logs...");

        if self.emulator.ui_reachable().await {
            let open_ui = Confirm::with_theme(&self.theme)
                .with_prompt("Open emulator functions UI in browser?")
                .default(false)
                .interact()?;
            if open_ui {
                open_target(&format!("{}/functions", self.emulator.ui_url()));
            }
        }

        match self.logs.functions_log().await {
            Ok(log) => {
                println!("{log}");
                return Ok(());
            }
            Err(e) => debug!("functions:log unavailable: {}", e),
        }

        // Not every firebase-tools version supports functions:log.
        match self.logs.latest_debug_log() {
            Some(path) => {
                println!("{} (filtered, recent)\n", path.display());
                for line in self.logs.filtered_debug_log(&path)? {
                    println!("{line}");
                }
                println!(
                    "\nTip: for full logs and filters, open {}/functions",
                    self.emulator.ui_url()
                );
            }
            None => println!(
                "No local emulator logs found. Start the emulator or open {}.",
                self.emulator.ui_url()
            ),
        }
        Ok(())
    }

    /// Probe (and optionally start) the local emulator.
    pub async fn emulator_status(&self) -> Result<()> {
        println!("Checking emulator status...");

        if !self.emulator.ui_reachable().await {
            println!("Emulator UI not reachable at {}", self.emulator.ui_url());
            if !self.ensure_emulator_running().await? {
                return Ok(());
            }
        }

        println!("\nEmulator UI: {}", self.emulator.ui_url());
        for status in self.emulator.probe_functions().await {
            let symbol = if status.health == EndpointHealth::Up {
                '+'
            } else {
                'x'
            };
            println!(
                "  {} {}: {}  ({})",
                symbol, status.name, status.health, status.url
            );
        }

        let open_ui = Confirm::with_theme(&self.theme)
            .with_prompt("Open emulator functions UI?")
            .default(false)
            .interact()?;
        if open_ui {
            open_target(&format!("{}/functions", self.emulator.ui_url()));
        }
        Ok(())
    }

    /// Show tool versions, directories, masked secrets, and endpoints.
    pub async fn show_configuration(&self) -> Result<()> {
        println!("Current configuration\n");

        println!("Tools:");
        println!(
            "  yt-dlp:   {}",
            self.fetcher
                .version()
                .await
                .unwrap_or_else(|_| "unknown".to_string())
        );
        println!(
            "  ffmpeg:   {}",
            self.extractor
                .version()
                .await
                .unwrap_or_else(|_| "unknown".to_string())
        );
        println!(
            "  node:     {}",
            tool_version("node", "--version")
                .await
                .unwrap_or_else(|| "unknown".to_string())
        );
        println!(
            "  firebase: {}",
            tool_version(&self.config.tools.firebase_path, "--version")
                .await
                .unwrap_or_else(|| "unknown".to_string())
        );

        match self.firebase_projects().await {
            Some(listing) => println!("\nProjects:\n{listing}"),
            None => println!(
                "\nProjects: unavailable (run `firebase login`, then `firebase use --add`)"
            ),
        }

        self.storage.ensure_dirs()?;
        println!("\nDirectories:");
        println!(
            "  downloads: {} ({} items)",
            self.storage.downloads_dir().display(),
            Storage::item_count(self.storage.downloads_dir())
        );
        println!(
            "  dubbed:    {} ({} items)",
            self.storage.dubbed_dir().display(),
            Storage::item_count(self.storage.dubbed_dir())
        );

        println!("\nEnvironment:");
        for (name, masked) in config::env_report() {
            match masked {
                Some(value) => println!("  {name}: {value}"),
                None => println!("  {name}: Not Set"),
            }
        }

        println!("\nEmulator endpoints:");
        println!("  UI:            {}", self.emulator.ui_url());
        for name in FUNCTION_NAMES {
            println!("  {:<14} {}", format!("{name}:"), self.emulator.function_url(name));
        }
        Ok(())
    }

    /// Stream a dubbed artifact into the dubbed directory, then offer to
    /// open it. The open steps are best-effort.
    async fn save_artifact(&self, download_url: &str, locale: &'static Locale) -> Result<()> {
        std::fs::create_dir_all(self.storage.dubbed_dir())?;
        let dest = self.storage.new_dubbed_path(locale);

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} Saving dubbed video... {bytes}")
                .unwrap(),
        );
        let mut bar_mode = false;

        let artifact = download_artifact(
            &self.http,
            download_url,
            &dest,
            Duration::from_secs(self.config.murf.download_timeout_secs),
            |done, total| {
                if let Some(total) = total {
                    if !bar_mode {
                        pb.set_style(
                            ProgressStyle::default_bar()
                                .template(
                                    "Saving dubbed video... [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
                                )
                                .unwrap()
                                .progress_chars("#>-"),
                        );
                        pb.set_length(total);
                        bar_mode = true;
                    }
                }
                pb.set_position(done);
            },
        )
        .await?;
        pb.finish_and_clear();

        println!(
            "Saved to: {} ({:.2} MB)",
            artifact.path.display(),
            mb(artifact.size_bytes)
        );

        let open_file = Confirm::with_theme(&self.theme)
            .with_prompt("Open saved file?")
            .default(false)
            .interact()?;
        if open_file {
            open_target(&artifact.path.display().to_string());
        }
        let open_url = Confirm::with_theme(&self.theme)
            .with_prompt("Open download URL in browser?")
            .default(false)
            .interact()?;
        if open_url {
            open_target(download_url);
        }
        Ok(())
    }

    /// Make sure the emulator is up, offering to start it if not.
    /// Returns false when the operator declines.
    async fn ensure_emulator_running(&self) -> Result<bool> {
        if self.emulator.ui_reachable().await {
            return Ok(true);
        }

        let start = Confirm::with_theme(&self.theme)
            .with_prompt("The emulator is not running. Start it now?")
            .default(true)
            .interact()?;
        if !start {
            return Ok(false);
        }

        println!("Starting emulator (waiting for readiness)...");
        let spinner = self.spinner(&format!(
            "Waiting for emulator UI at {}...",
            self.emulator.ui_url()
        ));
        let result = self.emulator.start_and_wait().await;
        spinner.finish_and_clear();
        result.map(|_| true)
    }

    fn resolve_input_video(&self, input: Option<PathBuf>, prompt: &str) -> Result<PathBuf> {
        let input = match input {
            Some(path) => path,
            None => {
                let latest = self.storage.latest_download();
                if let Some(latest) = &latest {
                    println!("Latest downloaded file detected: {}", latest.display());
                }
                PathBuf::from(self.prompt_string(
                    prompt,
                    None,
                    latest.map(|p| p.display().to_string()),
                )?)
            }
        };

        if !input.exists() {
            let recent = self.storage.recent_downloads(5);
            if !recent.is_empty() {
                println!("Recent files in downloads:");
                for path in recent {
                    println!("  - {}", path.display());
                }
            }
            return Err(DubError::FileNotFound(input.display().to_string()));
        }
        Ok(input)
    }

    fn resolve_locale(&self, language: Option<String>) -> Result<&'static Locale> {
        match language {
            Some(input) => Locale::resolve(&input).ok_or_else(|| {
                DubError::Config(format!("Unknown target language '{input}'"))
            }),
            None => {
                let labels: Vec<String> = LOCALES
                    .iter()
                    .map(|l| format!("{:<3} {}", l.short, l))
                    .collect();
                let default = LOCALES.iter().position(|l| l.short == "en").unwrap_or(0);
                let index = Select::with_theme(&self.theme)
                    .with_prompt("Select target language")
                    .items(&labels)
                    .default(default)
                    .interact()?;
                Ok(&LOCALES[index])
            }
        }
    }

    fn prompt_string(
        &self,
        prompt: &str,
        preset: Option<String>,
        default: Option<String>,
    ) -> Result<String> {
        if let Some(value) = preset {
            return Ok(value);
        }
        let mut input = Input::<String>::with_theme(&self.theme).with_prompt(prompt);
        if let Some(default) = default {
            input = input.default(default);
        }
        Ok(input.interact_text()?)
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    async fn firebase_projects(&self) -> Option<String> {
        let output = Command::new(&self.config.tools.firebase_path)
            .arg("projects:list")
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }
}

async fn tool_version(binary: &str, arg: &str) -> Option<String> {
    let output = Command::new(binary).arg(arg).output().await.ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|l| l.trim().to_string())
}

/// Best-effort open of a file or URL; failures are silently ignored.
fn open_target(target: &str) {
    #[cfg(target_os = "macos")]
    const OPENER: &str = "open";
    #[cfg(not(target_os = "macos"))]
    const OPENER: &str = "xdg-open";

    let _ = std::process::Command::new(OPENER)
        .arg(target)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn();
}

fn mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mb_converts_binary_megabytes() {
        assert_eq!(mb(1_048_576), 1.0);
        assert_eq!(mb(0), 0.0);
        assert!((mb(1_572_864) - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn quit_is_the_last_menu_item() {
        assert_eq!(MENU_ITEMS.last().unwrap().0, "Quit");
    }
}
