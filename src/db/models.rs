/// Data models for database operations.
/// Represents users, groups, message addressing, and the request/response
/// shapes of the REST API.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    pub id: i64,
    pub groupname: String,
}

/// Message addressing target: exactly one of a user or a group.
/// Persisted as two nullable columns with a mutual-exclusion constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    User(i64),
    Group(i64),
}

impl Recipient {
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Recipient::User(id) => Some(*id),
            Recipient::Group(_) => None,
        }
    }

    pub fn group_id(&self) -> Option<i64> {
        match self {
            Recipient::User(_) => None,
            Recipient::Group(id) => Some(*id),
        }
    }
}

/// A fully resolved message awaiting insertion. Produced by the addressing
/// resolver; carries ids only, never object graphs.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub sender_id: i64,
    pub recipient: Recipient,
    pub reply_to_id: Option<i64>,
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

/// A stored message with sender and recipient names resolved at read time.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: i64,
    pub sender_id: i64,
    pub sender: String,
    pub recipient: Recipient,
    pub recipient_name: String,
    pub reply_to_id: Option<i64>,
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

// Request/Response DTOs

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    pub groupname: String,
    pub usernames: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupResponse {
    pub id: i64,
    pub groupname: String,
    pub members: Vec<String>,
}

/// Wire form of a message's addressing target: `{"username": ..}` or
/// `{"groupname": ..}`.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RecipientRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groupname: Option<String>,
}

/// A recipient reference narrowed to its single target.
#[derive(Debug, PartialEq, Eq)]
pub enum RecipientTarget<'a> {
    User(&'a str),
    Group(&'a str),
}

impl RecipientRef {
    /// Narrow to the single named target. Naming both, neither, or an empty
    /// name is a malformed request.
    pub fn target(&self) -> Result<RecipientTarget<'_>, ApiError> {
        let target = match (self.username.as_deref(), self.groupname.as_deref()) {
            (Some(username), None) => RecipientTarget::User(username),
            (None, Some(groupname)) => RecipientTarget::Group(groupname),
            _ => {
                return Err(ApiError::invalid(
                    "recipient must name exactly one of username or groupname",
                ))
            }
        };
        match target {
            RecipientTarget::User("") => {
                Err(ApiError::invalid("recipient username must not be empty"))
            }
            RecipientTarget::Group("") => {
                Err(ApiError::invalid("recipient groupname must not be empty"))
            }
            other => Ok(other),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ComposeMessageRequest {
    pub sender: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub recipient: RecipientRef,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReplyMessageRequest {
    pub sender: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: i64,
    pub sender: String,
    pub recipient: RecipientRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub re: Option<i64>,
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl From<&Message> for MessageResponse {
    fn from(message: &Message) -> Self {
        let recipient = match message.recipient {
            Recipient::User(_) => RecipientRef {
                username: Some(message.recipient_name.clone()),
                groupname: None,
            },
            Recipient::Group(_) => RecipientRef {
                username: None,
                groupname: Some(message.recipient_name.clone()),
            },
        };
        MessageResponse {
            id: message.id,
            sender: message.sender.clone(),
            recipient,
            re: message.reply_to_id,
            subject: message.subject.clone(),
            body: message.body.clone(),
            sent_at: message.sent_at,
        }
    }
}

fn non_empty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::invalid(format!("{} must not be empty", field)));
    }
    Ok(())
}

impl RegisterUserRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        non_empty("username", &self.username)
    }
}

impl CreateGroupRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        non_empty("groupname", &self.groupname)?;
        if self.usernames.is_empty() {
            return Err(ApiError::invalid("usernames must not be empty"));
        }
        for username in &self.usernames {
            non_empty("usernames entry", username)?;
        }
        Ok(())
    }
}

impl ComposeMessageRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        non_empty("sender", &self.sender)?;
        non_empty("subject", &self.subject)?;
        non_empty("body", &self.body)
    }
}

impl ReplyMessageRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        non_empty("sender", &self.sender)?;
        non_empty("subject", &self.subject)?;
        non_empty("body", &self.body)
    }
}
