use anyhow::{Context, Result};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 5000;

/// File locations and naming, loaded from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub home: PathBuf,
    pub tracker_path: PathBuf,
    pub scan_config_path: PathBuf,
    pub resumes_dir: PathBuf,
    pub cover_letters_dir: PathBuf,
    pub why_company_dir: PathBuf,
    pub candidate_name: String,
    pub base_resume: PathBuf,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let home = match var("JOBTRACK_HOME") {
            Some(home) => PathBuf::from(home),
            None => std::env::current_dir().context("Failed to resolve current directory")?,
        };
        // Relative values resolve against home.
        let path_or = |key: &str, default: &str| home.join(var(key).unwrap_or_else(|| default.to_string()));
        let candidate_name = var("CANDIDATE_NAME").unwrap_or_else(|| "Your_Name".to_string());
        let base_resume = path_or("BASE_RESUME_FILENAME", &format!("{candidate_name}_Resume.pdf"));

        Ok(Config {
            tracker_path: path_or("JOBTRACK_TRACKER", "job_tracker.csv"),
            scan_config_path: path_or("JOBTRACK_SCAN_CONFIG", "job_search_config.json"),
            resumes_dir: path_or("JOBTRACK_RESUMES_DIR", "Resumes"),
            cover_letters_dir: path_or("JOBTRACK_COVER_LETTERS_DIR", "CoverLetters"),
            why_company_dir: path_or("JOBTRACK_WHY_COMPANY_DIR", "WhyCompany"),
            base_resume,
            port: match var("PORT") {
                Some(port) => port
                    .trim()
                    .parse::<u16>()
                    .context("PORT must be a valid port number")?,
                None => DEFAULT_PORT,
            },
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            candidate_name,
            home,
        })
    }

    pub fn resume_prefix(&self) -> String {
        format!("{}_Resume_", self.candidate_name)
    }

    pub fn cover_letter_prefix(&self) -> String {
        format!("{}_CoverLetter_", self.candidate_name)
    }

    pub fn why_company_prefix(&self) -> String {
        format!("{}_WhyCompany_", self.candidate_name)
    }
}
