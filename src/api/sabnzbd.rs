//! SABnzbd wire format
//!
//! Only the fields Lidarr-style clients read are modelled. Most queue values are
//! placeholders: a download is reported as a nominal 100 MB job whose remaining
//! megabytes track the completed-track percentage.

use crate::config::Config;
use crate::registry::DownloadSnapshot;
use crate::types::JobId;
use crate::utils::directory_size;
use serde::{Deserialize, Serialize};

/// Version string reported to clients
pub const SABNZBD_VERSION: &str = "4.5.1";

/// History size reported when the complete folder cannot be measured
pub const FALLBACK_HISTORY_BYTES: u64 = 10_000;

/// Nominal per-track duration reported as `download_time`
pub const HISTORY_SECONDS_PER_TRACK: u64 = 30;

/// Query parameters of `/api`
#[derive(Debug, Default, Deserialize)]
pub struct SabParams {
    /// Operation selector
    pub mode: Option<String>,
    /// Payload of addurl, or the sub-operation of history
    pub name: Option<String>,
    /// Comma-separated nzo ids for a history delete
    pub value: Option<String>,
    /// `1` removes the files along with the history entry
    pub del_files: Option<String>,
}

impl SabParams {
    /// Ids listed in `value`
    pub fn delete_ids(&self) -> Vec<JobId> {
        self.value
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(JobId::from_nzo_id)
            .collect()
    }

    /// Whether `del_files` asks for the folder to go too
    pub fn delete_files(&self) -> bool {
        matches!(self.del_files.as_deref().map(str::trim), Some("1" | "true"))
    }
}

/// Acknowledgment of addurl/addfile
#[derive(Debug, Serialize, Deserialize)]
pub struct AddResponse {
    /// Always true
    pub status: bool,
    /// The created job ids
    pub nzo_ids: Vec<String>,
}

impl AddResponse {
    /// Acknowledge a single job
    pub fn for_job(id: &JobId) -> Self {
        Self {
            status: true,
            nzo_ids: vec![id.nzo_id()],
        }
    }
}

/// Rejection of an add payload that carried no album id
#[derive(Debug, Serialize, Deserialize)]
pub struct AddRejected {
    /// Always false
    pub status: bool,
    /// What was missing
    pub error: String,
}

/// `mode=version`
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse {
    /// Reported version
    pub version: String,
}

/// `mode=get_config`
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigResponse {
    /// Config body
    pub config: SabConfig,
}

/// Config body of `mode=get_config`
#[derive(Debug, Serialize, Deserialize)]
pub struct SabConfig {
    /// Misc section
    pub misc: SabMisc,
    /// Configured categories (exactly one)
    pub categories: Vec<SabCategory>,
    /// Sorters (always empty)
    pub sorters: Vec<serde_json::Value>,
}

/// Misc section of the SABnzbd config
#[derive(Debug, Serialize, Deserialize)]
pub struct SabMisc {
    /// Root of finished downloads
    pub complete_dir: String,
    /// TV sorting switch
    pub enable_tv_sorting: bool,
    /// Movie sorting switch
    pub enable_movie_sorting: bool,
    /// Pre-check switch
    pub pre_check: bool,
    /// History retention count
    pub history_retention: String,
    /// History retention mode
    pub history_retention_option: String,
}

/// One category entry
#[derive(Debug, Serialize, Deserialize)]
pub struct SabCategory {
    /// Category name
    pub name: String,
    /// Post-processing flags
    pub pp: String,
    /// Script name
    pub script: String,
    /// Category folder
    pub dir: String,
    /// Priority
    pub priority: i32,
}

impl ConfigResponse {
    /// Static config describing the single category
    pub fn from_config(config: &Config) -> Self {
        let complete_root = config.download.download_dir.join("complete");
        Self {
            config: SabConfig {
                misc: SabMisc {
                    complete_dir: complete_root.display().to_string(),
                    enable_tv_sorting: false,
                    enable_movie_sorting: false,
                    pre_check: false,
                    history_retention: String::new(),
                    history_retention_option: "all".to_string(),
                },
                categories: vec![SabCategory {
                    name: config.download.category.clone(),
                    pp: String::new(),
                    script: "Default".to_string(),
                    dir: config.download.incomplete_dir().display().to_string(),
                    priority: -100,
                }],
                sorters: vec![],
            },
        }
    }
}

/// `mode=queue`
#[derive(Debug, Serialize, Deserialize)]
pub struct QueueResponse {
    /// Queue body
    pub queue: Queue,
}

/// Queue body
#[derive(Debug, Serialize, Deserialize)]
pub struct Queue {
    /// Always false
    pub paused: bool,
    /// One slot per active download
    pub slots: Vec<QueueSlot>,
}

/// One queue entry
#[allow(missing_docs)]
#[derive(Debug, Serialize, Deserialize)]
pub struct QueueSlot {
    pub status: String,
    pub index: usize,
    pub password: String,
    pub avg_age: String,
    pub script: String,
    pub direct_unpack: String,
    pub mb: String,
    pub mbleft: String,
    pub mbmissing: String,
    pub size: String,
    pub sizeleft: String,
    pub filename: String,
    pub labels: Vec<String>,
    pub priority: String,
    pub cat: String,
    pub timeleft: String,
    pub percentage: String,
    pub nzo_id: String,
    pub unpackopts: String,
}

/// `H:MM:SS`
pub fn format_timeleft(seconds: u64) -> String {
    format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

impl QueueSlot {
    /// Queue entry for a download that is not done yet
    pub fn from_snapshot(index: usize, snapshot: &DownloadSnapshot, config: &Config) -> Self {
        let percentage = snapshot.percentage();
        let left = 100u32.saturating_sub(percentage);
        let seconds = config.download.seconds_per_track * snapshot.remaining_tracks() as u64;

        Self {
            status: "Downloading".to_string(),
            index,
            password: String::new(),
            avg_age: "2895d".to_string(),
            script: "None".to_string(),
            direct_unpack: "30/30".to_string(),
            mb: "100".to_string(),
            mbleft: left.to_string(),
            mbmissing: "0.0".to_string(),
            size: "100 MB".to_string(),
            sizeleft: format!("{} MB", left),
            filename: snapshot.folder_name.clone(),
            labels: vec![],
            priority: "Normal".to_string(),
            cat: config.download.category.clone(),
            timeleft: format_timeleft(seconds),
            percentage: percentage.to_string(),
            nzo_id: snapshot.id.nzo_id(),
            unpackopts: "3".to_string(),
        }
    }
}

/// `mode=history`
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// History body
    pub history: History,
}

/// History body
#[derive(Debug, Serialize, Deserialize)]
pub struct History {
    /// One slot per finished download
    pub slots: Vec<HistorySlot>,
}

/// One history entry
#[derive(Debug, Serialize, Deserialize)]
pub struct HistorySlot {
    /// Folder name
    pub name: String,
    /// Name of the submitted NZB
    pub nzb_name: String,
    /// Category
    pub category: String,
    /// Bytes on disk
    pub bytes: u64,
    /// Nominal download time in seconds
    pub download_time: u64,
    /// `Completed` or `Failed`
    pub status: String,
    /// Final folder
    pub storage: String,
    /// Job id
    pub nzo_id: String,
}

impl HistorySlot {
    /// History entry for a done or failed download, measuring its folder
    pub async fn from_snapshot(snapshot: &DownloadSnapshot, config: &Config) -> Self {
        let storage = config.download.complete_dir().join(&snapshot.folder_name);
        let bytes = directory_size(&storage)
            .await
            .unwrap_or(FALLBACK_HISTORY_BYTES);
        let status = if snapshot.completed < 0 {
            "Failed"
        } else {
            "Completed"
        };

        Self {
            name: snapshot.folder_name.clone(),
            nzb_name: format!("{}.nzb", snapshot.folder_name),
            category: config.download.category.clone(),
            bytes,
            download_time: snapshot.declared as u64 * HISTORY_SECONDS_PER_TRACK,
            status: status.to_string(),
            storage: storage.display().to_string(),
            nzo_id: snapshot.id.nzo_id(),
        }
    }
}
