use chrono::NaiveDate;
use serde::de::IntoDeserializer;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Tracker CSV header, in file order. Other tools read the same file, so the
/// names and order are fixed.
pub const FIELDNAMES: [&str; 18] = [
    "Company",
    "Position",
    "Location",
    "Salary (Base)",
    "Total Comp Est.",
    "Status",
    "Applied Date",
    "Job URL",
    "Contact Name",
    "Contact Email",
    "Contact Phone",
    "Last Contact Date",
    "Next Follow-Up",
    "Interview Stage",
    "Notes",
    "Priority",
    "Hidden",
    "Hide Reason",
];

pub const HIDE_REASONS: [&str; 6] = [
    "Not a Good Fit",
    "Bad Location",
    "Low Compensation",
    "Position Closed",
    "Bad Reviews",
    "Other",
];

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const FOLLOW_UP_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseValueError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a set of tracker values that round-trip through their display
/// strings.
///
/// `FromStr` only accepts the known labels. Values read back from the file
/// go through `from_stored`, which keeps anything else as `Other` so rows
/// written by other tools load and save unchanged.
macro_rules! labeled_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $label,)+
                    $name::Other(raw) => raw,
                }
            }

            pub fn is_known(&self) -> bool {
                !matches!(self, $name::Other(_))
            }

            pub fn from_stored(raw: &str) -> Self {
                raw.parse().unwrap_or_else(|_| {
                    tracing::warn!(kind = $kind, value = raw, "keeping unrecognized tracker value");
                    $name::Other(raw.to_string())
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseValueError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $name::ALL
                    .iter()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .cloned()
                    .ok_or_else(|| ParseValueError {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Ok($name::from_stored(&raw))
            }
        }
    };
}

labeled_enum!(Status, "status", {
    NotApplied => "Not Applied",
    Applied => "Applied",
    PhoneScreenScheduled => "Phone Screen Scheduled",
    PhoneScreenComplete => "Phone Screen Complete",
    TechnicalInterviewScheduled => "Technical Interview Scheduled",
    TechnicalInterviewComplete => "Technical Interview Complete",
    OnsiteInterviewScheduled => "On-Site/Virtual Interview Scheduled",
    OnsiteInterviewComplete => "On-Site/Virtual Interview Complete",
    OfferReceived => "Offer Received",
    OfferAccepted => "Offer Accepted",
    OfferDeclined => "Offer Declined",
    Rejected => "Rejected",
    Withdrawn => "Withdrawn",
    NoResponse => "No Response",
    PositionClosed => "Position Closed",
});

labeled_enum!(InterviewStage, "interview stage", {
    None => "None",
    RecruiterScreen => "Recruiter Screen",
    HiringManagerScreen => "Hiring Manager Screen",
    TechnicalPhone => "Technical Phone",
    TakeHome => "Take-Home Assessment",
    VirtualOnsite => "Virtual On-Site",
    InPersonOnsite => "In-Person On-Site",
    FinalRound => "Final Round",
    TeamMatch => "Team Match",
    OfferStage => "Offer Stage",
    Negotiation => "Negotiation",
});

labeled_enum!(Priority, "priority", {
    Critical => "Critical",
    High => "High",
    Medium => "Medium",
    Low => "Low",
});

impl Default for Status {
    fn default() -> Self {
        Status::NotApplied
    }
}

impl Status {
    /// Any screen or interview stage, scheduled or complete.
    pub fn is_interviewing(&self) -> bool {
        let label = self.as_str();
        label.contains("Interview") || label.contains("Screen")
    }

    pub fn is_offer(&self) -> bool {
        matches!(
            self,
            Status::OfferReceived | Status::OfferAccepted | Status::OfferDeclined
        )
    }

    pub fn is_dead_end(&self) -> bool {
        matches!(
            self,
            Status::Rejected | Status::NoResponse | Status::PositionClosed
        )
    }
}

impl Priority {
    /// Sort rank; blank and unrecognized priorities rank with Medium.
    pub fn rank(priority: Option<&Priority>) -> u8 {
        match priority {
            Some(Priority::Critical) => 0,
            Some(Priority::High) => 1,
            Some(Priority::Low) => 3,
            Some(Priority::Medium | Priority::Other(_)) | None => 2,
        }
    }
}

/// One row of the tracker CSV. Identity is the row position; there is no id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobRecord {
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Position")]
    pub position: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Salary (Base)")]
    pub salary_base: String,
    #[serde(rename = "Total Comp Est.")]
    pub total_comp: String,
    #[serde(rename = "Status", deserialize_with = "status_or_default")]
    pub status: Status,
    #[serde(rename = "Applied Date")]
    pub applied_date: String,
    #[serde(rename = "Job URL")]
    pub job_url: String,
    #[serde(rename = "Contact Name")]
    pub contact_name: String,
    #[serde(rename = "Contact Email")]
    pub contact_email: String,
    #[serde(rename = "Contact Phone")]
    pub contact_phone: String,
    #[serde(rename = "Last Contact Date")]
    pub last_contact_date: String,
    #[serde(rename = "Next Follow-Up")]
    pub next_follow_up: String,
    #[serde(rename = "Interview Stage", deserialize_with = "blank_as_none")]
    pub interview_stage: Option<InterviewStage>,
    #[serde(rename = "Notes")]
    pub notes: String,
    #[serde(rename = "Priority", deserialize_with = "blank_as_none")]
    pub priority: Option<Priority>,
    #[serde(rename = "Hidden", with = "yes_flag")]
    pub hidden: bool,
    #[serde(rename = "Hide Reason")]
    pub hide_reason: String,
}

impl JobRecord {
    pub fn new(company: &str, position: &str) -> Self {
        Self {
            company: company.to_string(),
            position: position.to_string(),
            ..Default::default()
        }
    }

    pub fn label(&self) -> String {
        format!("{} - {}", self.company, self.position)
    }

    /// Keeps Status and the follow-up date consistent with Applied Date.
    ///
    /// A set Applied Date promotes Not Applied to Applied, and fills a blank
    /// Next Follow-Up with Applied Date + 7 days when the date parses.
    pub fn apply_applied_rule(&mut self) {
        self.schedule_follow_up();
        self.promote_applied();
    }

    /// The status half of the applied-date rule. Edits that leave Applied
    /// Date alone run only this part.
    pub fn promote_applied(&mut self) {
        if !self.applied_date.trim().is_empty() && self.status == Status::NotApplied {
            self.status = Status::Applied;
        }
    }

    fn schedule_follow_up(&mut self) {
        if !self.next_follow_up.trim().is_empty() {
            return;
        }
        if let Ok(date) = NaiveDate::parse_from_str(self.applied_date.trim(), DATE_FORMAT) {
            let follow_up = date + chrono::Duration::days(FOLLOW_UP_DAYS);
            self.next_follow_up = follow_up.format(DATE_FORMAT).to_string();
        }
    }

    /// Appends a dated entry to the notes log.
    pub fn append_note(&mut self, note: &str, today: NaiveDate) {
        let note = note.trim();
        if note.is_empty() {
            return;
        }
        let entry = format!("{}: {}", today.format("%m/%d"), note);
        if self.notes.is_empty() {
            self.notes = entry;
        } else {
            self.notes = format!("{} | {}", self.notes, entry);
        }
    }

    pub fn hide(&mut self, reason: &str) {
        self.hidden = true;
        self.hide_reason = reason.trim().to_string();
    }

    pub fn unhide(&mut self) {
        self.hidden = false;
        self.hide_reason.clear();
    }
}

fn status_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Status, D::Error> {
    let raw = String::deserialize(deserializer)?;
    if raw.trim().is_empty() {
        return Ok(Status::default());
    }
    Ok(Status::from_stored(&raw))
}

fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    if raw.trim().is_empty() {
        return Ok(None);
    }
    T::deserialize(raw.into_deserializer()).map(Some)
}

mod yes_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "yes" } else { "" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(raw.trim().eq_ignore_ascii_case("yes"))
    }
}
