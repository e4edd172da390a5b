use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::scan::normalized_set;
use crate::models::{DATE_FORMAT, FIELDNAMES, JobRecord, ParseValueError, Priority, Status};
use crate::store::write_atomic;

/// The job tracker CSV. Every mutation reads the whole file and rewrites it.
///
/// Rows are addressed by their 0-based position. Deleting a row shifts every
/// later row down by one, so callers must re-resolve indices after a delete.
#[derive(Debug, Clone)]
pub struct Tracker {
    path: PathBuf,
}

impl Tracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ensure_exists(&self) -> Result<()> {
        if !self.path.exists() {
            return Err(anyhow!("{} not found", self.path.display()));
        }
        Ok(())
    }

    /// Loads every row with a non-blank Company. A missing file is an empty tracker.
    pub fn load(&self) -> Result<Vec<JobRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        let mut jobs = Vec::new();
        for (line, row) in reader.deserialize::<JobRecord>().enumerate() {
            let job = row.with_context(|| {
                format!("Bad row {} in {}", line + 2, self.path.display())
            })?;
            if job.company.trim().is_empty() {
                continue;
            }
            jobs.push(job);
        }
        Ok(jobs)
    }

    pub fn save(&self, jobs: &[JobRecord]) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(FIELDNAMES)?;
        for job in jobs {
            writer.serialize(job)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow!("Failed to flush CSV: {}", e))?;
        write_atomic(&self.path, &bytes)?;
        tracing::info!(path = %self.path.display(), rows = jobs.len(), "saved tracker");
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<Option<JobRecord>> {
        Ok(self.load()?.into_iter().nth(index))
    }

    /// Appends a row. A new row always passes through the applied-date rule.
    pub fn add(&self, mut job: JobRecord) -> Result<JobRecord> {
        let mut jobs = self.load()?;
        job.apply_applied_rule();
        jobs.push(job.clone());
        self.save(&jobs)?;
        Ok(job)
    }

    /// Edits the row at `index` in place and rewrites the file.
    ///
    /// Returns `None` when the index is out of range. A set Applied Date
    /// always promotes Not Applied; the follow-up date is only scheduled when
    /// the edit changed Applied Date.
    pub fn modify<F>(&self, index: usize, edit: F) -> Result<Option<JobRecord>>
    where
        F: FnOnce(&mut JobRecord),
    {
        let mut jobs = self.load()?;
        let Some(job) = jobs.get_mut(index) else {
            return Ok(None);
        };
        let applied_before = job.applied_date.clone();
        edit(job);
        if job.applied_date != applied_before {
            job.apply_applied_rule();
        } else {
            job.promote_applied();
        }
        let updated = job.clone();
        self.save(&jobs)?;
        Ok(Some(updated))
    }

    pub fn delete(&self, index: usize) -> Result<Option<JobRecord>> {
        let mut jobs = self.load()?;
        if index >= jobs.len() {
            return Ok(None);
        }
        let removed = jobs.remove(index);
        self.save(&jobs)?;
        Ok(Some(removed))
    }

    pub fn hide(&self, index: usize, reason: &str) -> Result<Option<JobRecord>> {
        self.modify(index, |job| job.hide(reason))
    }

    pub fn unhide(&self, index: usize) -> Result<Option<JobRecord>> {
        self.modify(index, JobRecord::unhide)
    }

    pub fn append_note(&self, index: usize, note: &str, today: NaiveDate) -> Result<Option<JobRecord>> {
        self.modify(index, |job| job.append_note(note, today))
    }

    /// Records the application date; status and follow-up follow from it.
    pub fn set_applied(&self, index: usize, date: NaiveDate) -> Result<Option<JobRecord>> {
        self.modify(index, |job| job.applied_date = date.format(DATE_FORMAT).to_string())
    }

    /// Normalized Job URLs of every tracked row.
    pub fn tracked_urls(&self) -> Result<HashSet<String>> {
        let jobs = self.load()?;
        Ok(normalized_set(
            jobs.iter().map(|job| job.job_url.trim()).filter(|url| !url.is_empty()),
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    pub total: usize,
    pub applied: usize,
    pub not_applied: usize,
    pub interviewing: usize,
    pub offers: usize,
    pub rejected: usize,
}

impl Stats {
    pub fn compute<'a>(jobs: impl IntoIterator<Item = &'a JobRecord>) -> Self {
        let mut stats = Stats::default();
        for job in jobs {
            stats.total += 1;
            if job.status == Status::NotApplied {
                stats.not_applied += 1;
            } else {
                stats.applied += 1;
            }
            if job.status.is_interviewing() {
                stats.interviewing += 1;
            }
            if job.status.is_offer() {
                stats.offers += 1;
            }
            if job.status.is_dead_end() {
                stats.rejected += 1;
            }
        }
        stats
    }

    /// Share of applications that reached a screen, interview or offer.
    pub fn response_rate(&self) -> Option<f64> {
        if self.applied == 0 {
            return None;
        }
        Some((self.interviewing + self.offers) as f64 / self.applied as f64 * 100.0)
    }

    pub fn response_rate_label(&self) -> String {
        match self.response_rate() {
            Some(rate) => format!("{:.0}%", rate),
            None => "N/A".to_string(),
        }
    }
}

/// Rows with a follow-up date, soonest first, paired with their row index.
pub fn followups(jobs: &[JobRecord], include_hidden: bool) -> Vec<(usize, &JobRecord)> {
    let mut due: Vec<(usize, &JobRecord)> = jobs
        .iter()
        .enumerate()
        .filter(|(_, job)| include_hidden || !job.hidden)
        .filter(|(_, job)| !job.next_follow_up.trim().is_empty())
        .collect();
    due.sort_by(|a, b| a.1.next_follow_up.cmp(&b.1.next_follow_up));
    due
}

/// Coarse status buckets used by the job list filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Applied,
    NotApplied,
    Interviewing,
    Offers,
    Rejected,
}

impl Group {
    pub const ALL: [Group; 5] = [
        Group::Applied,
        Group::NotApplied,
        Group::Interviewing,
        Group::Offers,
        Group::Rejected,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Group::Applied => "applied",
            Group::NotApplied => "not_applied",
            Group::Interviewing => "interviewing",
            Group::Offers => "offers",
            Group::Rejected => "rejected",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Group::Applied => "Applied",
            Group::NotApplied => "Not Applied",
            Group::Interviewing => "Interviewing",
            Group::Offers => "Offers",
            Group::Rejected => "Rejected/Closed",
        }
    }

    pub fn contains(&self, job: &JobRecord) -> bool {
        match self {
            Group::Applied => job.status != Status::NotApplied,
            Group::NotApplied => job.status == Status::NotApplied,
            Group::Interviewing => job.status.is_interviewing(),
            Group::Offers => job.status.is_offer(),
            Group::Rejected => job.status.is_dead_end(),
        }
    }
}

impl FromStr for Group {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Group::ALL
            .into_iter()
            .find(|g| g.key() == s)
            .ok_or_else(|| ParseValueError {
                kind: "group",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Priority,
    Company,
    Status,
    Salary,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::Priority,
        SortKey::Company,
        SortKey::Status,
        SortKey::Salary,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            SortKey::Priority => "priority",
            SortKey::Company => "company",
            SortKey::Status => "status",
            SortKey::Salary => "salary",
        }
    }
}

impl FromStr for SortKey {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "priority" => Ok(SortKey::Priority),
            "company" => Ok(SortKey::Company),
            "status" => Ok(SortKey::Status),
            "salary" => Ok(SortKey::Salary),
            _ => Err(ParseValueError {
                kind: "sort key",
                value: s.to_string(),
            }),
        }
    }
}

/// Filter and ordering for the job list view.
#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub group: Option<Group>,
    pub show_hidden: bool,
    pub sort: Option<SortKey>,
    pub descending: bool,
}

impl JobQuery {
    /// Matching rows paired with their original index. Sorting is stable.
    pub fn apply<'a>(&self, jobs: &'a [JobRecord]) -> Vec<(usize, &'a JobRecord)> {
        let mut rows: Vec<(usize, &JobRecord)> = jobs
            .iter()
            .enumerate()
            .filter(|(_, job)| self.show_hidden || !job.hidden)
            .filter(|(_, job)| self.group.is_none_or(|g| g.contains(job)))
            .filter(|(_, job)| self.status.as_ref().is_none_or(|s| &job.status == s))
            .filter(|(_, job)| self.priority.as_ref().is_none_or(|p| job.priority.as_ref() == Some(p)))
            .collect();

        if let Some(sort) = self.sort {
            rows.sort_by(|(_, a), (_, b)| {
                let ordering = match sort {
                    SortKey::Priority => Priority::rank(a.priority.as_ref()).cmp(&Priority::rank(b.priority.as_ref())),
                    SortKey::Company => a.company.to_lowercase().cmp(&b.company.to_lowercase()),
                    SortKey::Status => a.status.as_str().cmp(b.status.as_str()),
                    SortKey::Salary => a.total_comp.cmp(&b.total_comp),
                };
                if self.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InterviewStage;

    fn tracker_in(dir: &tempfile::TempDir) -> Tracker {
        Tracker::new(dir.path().join("job_tracker.csv"))
    }

    fn job(company: &str, status: Status) -> JobRecord {
        let mut job = JobRecord::new(company, "Engineer");
        job.status = status;
        job
    }

    #[test]
    fn test_save_writes_exact_header() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_in(&dir);
        tracker.save(&[]).unwrap();

        let contents = std::fs::read_to_string(tracker.path()).unwrap();
        assert_eq!(
            contents.lines().next().unwrap(),
            "Company,Position,Location,Salary (Base),Total Comp Est.,Status,Applied Date,\
             Job URL,Contact Name,Contact Email,Contact Phone,Last Contact Date,\
             Next Follow-Up,Interview Stage,Notes,Priority,Hidden,Hide Reason"
        );
    }

    #[test]
    fn test_load_skips_blank_company_and_tolerates_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_in(&dir);
        std::fs::write(
            tracker.path(),
            "Company,Position,Status,Priority,Hidden,Extra\n\
             Acme,SRE,Applied,High,yes,ignored\n\
             ,Orphan,Applied,,,\n\
             \"Globex, Inc\",Platform Engineer,,,,\n",
        )
        .unwrap();

        let jobs = tracker.load().unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].priority, Some(Priority::High));
        assert!(jobs[0].hidden);
        assert_eq!(jobs[1].company, "Globex, Inc");
        assert_eq!(jobs[1].status, Status::NotApplied);
        assert_eq!(jobs[1].interview_stage, None);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_in(&dir);
        assert!(tracker.load().unwrap().is_empty());
        assert!(tracker.ensure_exists().is_err());
    }

    #[test]
    fn test_add_applies_applied_rule() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_in(&dir);
        let mut record = JobRecord::new("Acme", "SRE");
        record.applied_date = "2025-02-01".to_string();

        let added = tracker.add(record).unwrap();
        assert_eq!(added.status, Status::Applied);
        assert_eq!(added.next_follow_up, "2025-02-08");
        assert_eq!(tracker.load().unwrap(), vec![added]);
    }

    #[test]
    fn test_modify_setting_applied_date_promotes_status() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_in(&dir);
        tracker.save(&[job("Acme", Status::NotApplied)]).unwrap();

        let updated = tracker
            .modify(0, |job| job.applied_date = "2025-03-30".to_string())
            .unwrap()
            .unwrap();

        assert_eq!(updated.status, Status::Applied);
        assert_eq!(updated.next_follow_up, "2025-04-06");
        assert_eq!(tracker.get(0).unwrap().unwrap(), updated);
        assert!(tracker.modify(5, |_| {}).unwrap().is_none());
    }

    #[test]
    fn test_set_applied_keeps_existing_follow_up() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_in(&dir);
        let mut record = job("Acme", Status::NotApplied);
        record.next_follow_up = "2025-12-01".to_string();
        tracker.save(&[record]).unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 11, 3).unwrap();
        let updated = tracker.set_applied(0, date).unwrap().unwrap();
        assert_eq!(updated.applied_date, "2025-11-03");
        assert_eq!(updated.status, Status::Applied);
        assert_eq!(updated.next_follow_up, "2025-12-01");
    }

    #[test]
    fn test_modify_without_date_change_leaves_follow_up_blank() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_in(&dir);
        let mut record = job("Acme", Status::NotApplied);
        record.applied_date = "2025-03-30".to_string();
        tracker.save(&[record]).unwrap();

        let today = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();
        let updated = tracker.append_note(0, "recruiter called", today).unwrap().unwrap();
        assert_eq!(updated.notes, "04/02: recruiter called");
        assert_eq!(updated.status, Status::Applied);
        assert!(updated.next_follow_up.is_empty());
    }

    #[test]
    fn test_unrecognized_values_load_and_save_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_in(&dir);
        std::fs::write(
            tracker.path(),
            "Company,Position,Status,Interview Stage,Priority\n\
             Acme,SRE,Applied,,High\n\
             Globex,Dev,Interviewing,Panel,Urgent\n",
        )
        .unwrap();

        let jobs = tracker.load().unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].status, Status::Other("Interviewing".to_string()));
        assert_eq!(jobs[1].interview_stage, Some(InterviewStage::Other("Panel".to_string())));
        assert_eq!(jobs[1].priority, Some(Priority::Other("Urgent".to_string())));

        tracker.modify(1, |job| job.location = "Remote".to_string()).unwrap();
        let contents = std::fs::read_to_string(tracker.path()).unwrap();
        let row = contents.lines().nth(2).unwrap();
        assert!(row.starts_with("Globex,Dev,Remote,,,Interviewing,"));
        assert!(row.contains(",Panel,,Urgent,"));

        let query = JobQuery {
            sort: Some(SortKey::Priority),
            ..JobQuery::default()
        };
        let order: Vec<&str> = query.apply(&jobs).iter().map(|(_, j)| j.company.as_str()).collect();
        assert_eq!(order, vec!["Acme", "Globex"]);
        assert_eq!(Stats::compute(&jobs).interviewing, 1);
    }

    #[test]
    fn test_delete_shifts_later_rows() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_in(&dir);
        tracker
            .save(&[
                job("A", Status::Applied),
                job("B", Status::Applied),
                job("C", Status::Applied),
                job("D", Status::Applied),
            ])
            .unwrap();

        let removed = tracker.delete(1).unwrap().unwrap();
        assert_eq!(removed.company, "B");

        let companies: Vec<String> = tracker.load().unwrap().into_iter().map(|j| j.company).collect();
        assert_eq!(companies, vec!["A", "C", "D"]);
        assert_eq!(tracker.get(1).unwrap().unwrap().company, "C");
        assert!(tracker.delete(3).unwrap().is_none());
    }

    #[test]
    fn test_hide_and_unhide_round_trip_through_csv() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_in(&dir);
        tracker.save(&[job("Acme", Status::Applied)]).unwrap();

        tracker.hide(0, "Bad Location").unwrap();
        let raw = std::fs::read_to_string(tracker.path()).unwrap();
        assert!(raw.lines().nth(1).unwrap().ends_with(",yes,Bad Location"));

        let restored = tracker.unhide(0).unwrap().unwrap();
        assert!(!restored.hidden);
        assert!(restored.hide_reason.is_empty());
    }

    #[test]
    fn test_notes_append_persists() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_in(&dir);
        tracker.save(&[job("Acme", Status::Applied)]).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 6, 9).unwrap();

        tracker.append_note(0, "pinged recruiter", today).unwrap();
        tracker.append_note(0, "no reply", today).unwrap();

        assert_eq!(
            tracker.get(0).unwrap().unwrap().notes,
            "06/09: pinged recruiter | 06/09: no reply"
        );
    }

    #[test]
    fn test_tracked_urls_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_in(&dir);
        let mut a = job("A", Status::Applied);
        a.job_url = "https://jobs.example.com/1/?utm=x".to_string();
        let b = job("B", Status::Applied);
        tracker.save(&[a, b]).unwrap();

        let urls = tracker.tracked_urls().unwrap();
        assert_eq!(urls.len(), 1);
        assert!(urls.contains("https://jobs.example.com/1"));
    }

    #[test]
    fn test_stats_and_response_rate() {
        let jobs = vec![
            job("A", Status::NotApplied),
            job("B", Status::Applied),
            job("C", Status::PhoneScreenScheduled),
            job("D", Status::OfferReceived),
            job("E", Status::Rejected),
        ];
        let stats = Stats::compute(&jobs);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.applied, 4);
        assert_eq!(stats.not_applied, 1);
        assert_eq!(stats.interviewing, 1);
        assert_eq!(stats.offers, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.response_rate_label(), "50%");
        assert_eq!(Stats::default().response_rate_label(), "N/A");
    }

    #[test]
    fn test_followups_sorted_and_hidden_excluded() {
        let mut a = job("A", Status::Applied);
        a.next_follow_up = "2025-05-10".to_string();
        let mut b = job("B", Status::Applied);
        b.next_follow_up = "2025-05-01".to_string();
        let mut c = job("C", Status::Applied);
        c.next_follow_up = "2025-04-01".to_string();
        c.hidden = true;
        let jobs = vec![a, b, job("D", Status::Applied), c];

        let due: Vec<usize> = followups(&jobs, false).into_iter().map(|(i, _)| i).collect();
        assert_eq!(due, vec![1, 0]);
        assert_eq!(followups(&jobs, true).len(), 3);
    }

    #[test]
    fn test_query_filters_and_sorts() {
        let mut a = job("beta", Status::Applied);
        a.priority = Some(Priority::Low);
        let mut b = job("Alpha", Status::TechnicalInterviewScheduled);
        b.priority = Some(Priority::Critical);
        let mut c = job("Gamma", Status::NotApplied);
        c.hidden = true;
        let d = job("delta", Status::Applied);
        let jobs = vec![a, b, c, d];

        let query = JobQuery {
            sort: Some(SortKey::Priority),
            ..Default::default()
        };
        let order: Vec<usize> = query.apply(&jobs).into_iter().map(|(i, _)| i).collect();
        assert_eq!(order, vec![1, 3, 0]);

        let query = JobQuery {
            show_hidden: true,
            sort: Some(SortKey::Company),
            descending: true,
            ..Default::default()
        };
        let order: Vec<usize> = query.apply(&jobs).into_iter().map(|(i, _)| i).collect();
        assert_eq!(order, vec![2, 3, 0, 1]);

        let query = JobQuery {
            group: Some(Group::Interviewing),
            ..Default::default()
        };
        assert_eq!(query.apply(&jobs).len(), 1);

        let query = JobQuery {
            status: Some(Status::Applied),
            priority: Some(Priority::Low),
            ..Default::default()
        };
        assert_eq!(query.apply(&jobs)[0].0, 0);
    }
}
