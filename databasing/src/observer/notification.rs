//! Notification payloads

use chrono::Utc;
use std::collections::BTreeMap;
use std::fmt::Display;

use crate::error::Result;

/// One event delivered to observers as a flat JSON object of strings
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    subject_id: u32,
    message_id: u32,
    message_time: i64,
    error: Option<String>,
    details: BTreeMap<String, String>,
}

impl Notification {
    pub fn new(subject_id: u32, message_id: u32) -> Self {
        Self {
            subject_id,
            message_id,
            message_time: Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            error: None,
            details: BTreeMap::new(),
        }
    }

    pub fn detail(mut self, key: &str, value: impl Display) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }

    pub fn error(mut self, error: Option<&dyn Display>) -> Self {
        self.error = error.map(|e| e.to_string());
        self
    }

    pub fn message_id(&self) -> u32 {
        self.message_id
    }

    /// Serialize as `{subjectId, messageId, messageTime, error?, ...details}`
    pub fn to_json(&self) -> Result<String> {
        let mut payload = self.details.clone();
        payload.insert("subjectId".to_string(), self.subject_id.to_string());
        payload.insert("messageId".to_string(), self.message_id.to_string());
        payload.insert("messageTime".to_string(), self.message_time.to_string());
        if let Some(error) = &self.error {
            payload.insert("error".to_string(), error.clone());
        }
        Ok(serde_json::to_string(&payload)?)
    }
}
