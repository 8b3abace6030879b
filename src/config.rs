use clap::Parser;
use std::path::PathBuf;

/// LMS report agent: drives a browser through the vendor dashboard to
/// generate and fetch spreadsheet reports, served back via a small web UI.
#[derive(Parser, Debug, Clone)]
#[command(name = "lms-report-agent")]
pub struct CliArgs {
    /// Directory where fetched reports are stored
    #[arg(short = 'o', long = "downloads-dir", default_value = "server_downloads")]
    pub downloads_dir: PathBuf,

    /// HTTP port for the operator UI and API
    #[arg(long = "port", default_value_t = DEFAULT_HTTP_PORT)]
    pub port: u16,

    /// WebDriver endpoint used to drive Chrome
    #[arg(long = "webdriver-url", default_value = DEFAULT_WEBDRIVER_URL)]
    pub webdriver_url: String,

    /// Run the browser headless (default is headed so the operator can watch)
    #[arg(long = "headless")]
    pub headless: bool,

    /// Seconds to keep the browser open after a flow completes
    #[arg(long = "cooldown-secs", default_value_t = COOLDOWN_SECS_DEFAULT)]
    pub cooldown_secs: u64,

    /// Seconds to wait for the vendor to compute a report after requesting
    /// "Generate Shareable Link" (the dashboard exposes no completion signal)
    #[arg(long = "report-dwell-secs", default_value_t = REPORT_DWELL_SECS_DEFAULT)]
    pub report_dwell_secs: u64,

    /// Log file for agent output
    #[arg(short = 'l', long = "log-file")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub downloads_dir: PathBuf,
    pub port: u16,
    pub webdriver_url: String,
    pub headless: bool,
    pub cooldown_secs: u64,
    pub report_dwell_secs: u64,
    pub log_file: Option<PathBuf>,
}

// HTTP constants
pub const DEFAULT_HTTP_PORT: u16 = 8000;
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

// Cancellation / cooldown constants
pub const COOLDOWN_SECS_DEFAULT: u64 = 300; // 5 minutes
pub const CANCEL_POLL_INTERVAL_SECS: u64 = 5;

// Pipeline wait constants
pub const PAGE_READY_TIMEOUT_SECS: u64 = 60;
pub const PAGE_SETTLE_MS: u64 = 2000;
pub const LOGIN_FIELD_TIMEOUT_SECS: u64 = 30;
pub const PASSWORD_FIELD_TIMEOUT_SECS: u64 = 10;
pub const LOGIN_SUBMIT_TIMEOUT_SECS: u64 = 5;
pub const MENU_TIMEOUT_SECS: u64 = 30;
pub const SEARCH_BOX_TIMEOUT_SECS: u64 = 20;
pub const NAV_STEP_TIMEOUT_SECS: u64 = 10;
pub const CARD_TIMEOUT_SECS: u64 = 5;
pub const MODULE_RENDER_DWELL_SECS: u64 = 10;
pub const EXPORT_STEP_TIMEOUT_SECS: u64 = 5;
pub const EXPORT_MENU_TIMEOUT_SECS: u64 = 10;
pub const REPORT_DWELL_SECS_DEFAULT: u64 = 90;
pub const TEST_ANALYSIS_SETTLE_SECS: u64 = 10;
pub const DOWNLOAD_WAIT_TIMEOUT_SECS: u64 = 120;
pub const DOWNLOAD_POLL_INTERVAL_MS: u64 = 500;
pub const DIALOG_DISMISS_DELAY_SECS: u64 = 10;
pub const LOCATE_POLL_INTERVAL_MS: u64 = 250;

// chromedriver bootstrap
pub const CHROMEDRIVER_SPAWN_WAIT_MS: u64 = 1500;

impl AgentConfig {
    pub fn from_args(args: CliArgs) -> Self {
        AgentConfig {
            downloads_dir: args.downloads_dir,
            port: args.port,
            webdriver_url: args.webdriver_url,
            headless: args.headless,
            cooldown_secs: args.cooldown_secs,
            report_dwell_secs: args.report_dwell_secs,
            log_file: args.log_file,
        }
    }

    /// Per-run staging directory the browser downloads into before the file
    /// is renamed into `downloads_dir`.
    pub fn staging_dir(&self, run_id: uuid::Uuid) -> PathBuf {
        std::env::temp_dir().join(format!("lms-report-agent-{run_id}"))
    }
}
