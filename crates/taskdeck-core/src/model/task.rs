use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskdeckError};

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_NAME_LENGTH: usize = 200;
pub const MAX_USERNAME_LENGTH: usize = 150;

/// A registered user. Users own tasks; they are plain records here, the
/// auth subsystem that creates them upstream is out of scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInput {
    pub username: String,
    pub email: String,
}

/// A named grouping that tasks may optionally belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Task urgency, stored as an ordered integer where 1 is most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Priority {
    High,
    Medium,
    Low,
    VeryLow,
}

impl Priority {
    pub fn as_i64(self) -> i64 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
            Priority::VeryLow => 4,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Low
    }
}

impl TryFrom<i64> for Priority {
    type Error = String;

    fn try_from(value: i64) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::High),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::Low),
            4 => Ok(Priority::VeryLow),
            other => Err(format!("invalid priority {other} (expected 1-4)")),
        }
    }
}

impl From<Priority> for i64 {
    fn from(p: Priority) -> i64 {
        p.as_i64()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
            Priority::VeryLow => "Very Low",
        };
        write!(f, "{s}")
    }
}

/// An ISO-8601 duration, held as whole seconds.
///
/// Only the day/time designators are supported (`P2DT3H`, `PT90S`, ...);
/// year and month designators are rejected because they have no fixed
/// length in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsoDuration(i64);

impl IsoDuration {
    pub fn from_seconds(seconds: i64) -> Self {
        Self(seconds)
    }

    pub fn num_seconds(self) -> i64 {
        self.0
    }
}

impl fmt::Display for IsoDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.0;
        if total == 0 {
            return write!(f, "PT0S");
        }
        let days = total / 86_400;
        let hours = (total % 86_400) / 3_600;
        let minutes = (total % 3_600) / 60;
        let seconds = total % 60;

        write!(f, "P")?;
        if days > 0 {
            write!(f, "{days}D")?;
        }
        if hours > 0 || minutes > 0 || seconds > 0 {
            write!(f, "T")?;
            if hours > 0 {
                write!(f, "{hours}H")?;
            }
            if minutes > 0 {
                write!(f, "{minutes}M")?;
            }
            if seconds > 0 {
                write!(f, "{seconds}S")?;
            }
        }
        Ok(())
    }
}

impl FromStr for IsoDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let rest = s
            .strip_prefix('P')
            .ok_or_else(|| format!("invalid ISO-8601 duration '{s}': missing 'P' prefix"))?;
        if rest.is_empty() {
            return Err(format!("invalid ISO-8601 duration '{s}': empty body"));
        }

        let (date_part, time_part) = match rest.split_once('T') {
            Some((d, t)) => (d, Some(t)),
            None => (rest, None),
        };
        if time_part == Some("") {
            return Err(format!("invalid ISO-8601 duration '{s}': empty time part"));
        }

        let mut total = parse_components(date_part, &[('W', 604_800), ('D', 86_400)], s)?;
        if let Some(time) = time_part {
            let time_secs = parse_components(time, &[('H', 3_600), ('M', 60), ('S', 1)], s)?;
            total = total
                .checked_add(time_secs)
                .ok_or_else(|| format!("invalid ISO-8601 duration '{s}': value out of range"))?;
        }
        Ok(IsoDuration(total))
    }
}

/// Parse a run of `<number><designator>` components in declaration order.
fn parse_components(
    part: &str,
    designators: &[(char, i64)],
    original: &str,
) -> std::result::Result<i64, String> {
    let mut total = 0i64;
    let mut digits = String::new();
    let mut next_designator = 0usize;

    for c in part.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let pos = designators[next_designator..]
            .iter()
            .position(|(d, _)| *d == c)
            .ok_or_else(|| format!("invalid ISO-8601 duration '{original}': unexpected '{c}'"))?;
        if digits.is_empty() {
            return Err(format!(
                "invalid ISO-8601 duration '{original}': '{c}' without a number"
            ));
        }
        let value: i64 = digits
            .parse()
            .map_err(|_| format!("invalid ISO-8601 duration '{original}': bad number"))?;
        total = value
            .checked_mul(designators[next_designator + pos].1)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| {
                format!("invalid ISO-8601 duration '{original}': value out of range")
            })?;
        next_designator += pos + 1;
        digits.clear();
    }

    if !digits.is_empty() {
        return Err(format!(
            "invalid ISO-8601 duration '{original}': trailing digits"
        ));
    }
    Ok(total)
}

impl Serialize for IsoDuration {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for IsoDuration {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A user-owned unit of work with optional project affiliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Referenced user id; always present.
    pub owner: i64,
    /// Referenced project id, if any.
    pub project_id: Option<i64>,
    /// Set once at creation; immutable across full-replace updates.
    pub creation_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub duration: Option<IsoDuration>,
    pub priority: Priority,
}

/// A task with its owner and project records embedded, the shape the
/// JSON API returns.
#[derive(Debug, Clone, Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub owner_detail: User,
    pub project: Option<Project>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner: i64,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: Option<IsoDuration>,
    #[serde(default)]
    pub priority: Priority,
}

// -- Validation --

pub fn validate_user_input(input: &UserInput) -> Result<()> {
    let username = input.username.trim();
    if username.is_empty() {
        return Err(TaskdeckError::InvalidInput("username cannot be empty".into()));
    }
    if username.len() > MAX_USERNAME_LENGTH {
        return Err(TaskdeckError::InvalidInput(format!(
            "username exceeds maximum length of {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if !input.email.contains('@') {
        return Err(TaskdeckError::InvalidInput(format!(
            "'{}' is not a valid email address",
            input.email
        )));
    }
    Ok(())
}

pub fn validate_project_input(input: &ProjectInput) -> Result<()> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(TaskdeckError::InvalidInput("name cannot be empty".into()));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(TaskdeckError::InvalidInput(format!(
            "name exceeds maximum length of {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

pub fn validate_task_input(input: &TaskInput) -> Result<()> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(TaskdeckError::InvalidInput("title cannot be empty".into()));
    }
    if title.len() > MAX_TITLE_LENGTH {
        return Err(TaskdeckError::InvalidInput(format!(
            "title exceeds maximum length of {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}
