//! Startup diagnostic check models.

use serde::{Deserialize, Serialize};

/// Identifier of one startup check, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckId {
    Kubeconfig,
    Parse,
    Contexts,
    Connection,
    Namespaces,
}

impl CheckId {
    pub const ALL: [CheckId; 5] = [
        CheckId::Kubeconfig,
        CheckId::Parse,
        CheckId::Contexts,
        CheckId::Connection,
        CheckId::Namespaces,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CheckId::Kubeconfig => "Locating kubeconfig",
            CheckId::Parse => "Parsing configuration",
            CheckId::Contexts => "Loading contexts",
            CheckId::Connection => "Connecting to cluster",
            CheckId::Namespaces => "Fetching namespaces",
        }
    }
}

/// Status of a startup check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    #[default]
    Pending,
    Running,
    Success,
    Error,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pending => "pending",
            CheckStatus::Running => "running",
            CheckStatus::Success => "success",
            CheckStatus::Error => "error",
        }
    }
}

/// One row of the startup screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupCheck {
    pub id: CheckId,
    pub label: String,
    pub status: CheckStatus,
    pub message: Option<String>,
}

impl StartupCheck {
    pub fn pending(id: CheckId) -> Self {
        Self {
            id,
            label: id.label().to_string(),
            status: CheckStatus::Pending,
            message: None,
        }
    }
}

/// The ordered list of startup checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupChecks {
    checks: Vec<StartupCheck>,
}

impl Default for StartupChecks {
    fn default() -> Self {
        Self::new()
    }
}

impl StartupChecks {
    /// All five checks, pending.
    pub fn new() -> Self {
        Self {
            checks: CheckId::ALL.iter().map(|id| StartupCheck::pending(*id)).collect(),
        }
    }

    pub fn checks(&self) -> &[StartupCheck] {
        &self.checks
    }

    pub fn get(&self, id: CheckId) -> Option<&StartupCheck> {
        self.checks.iter().find(|c| c.id == id)
    }

    pub fn status(&self, id: CheckId) -> CheckStatus {
        self.get(id).map(|c| c.status).unwrap_or_default()
    }

    pub fn mark_running(&mut self, id: CheckId) {
        self.update(id, CheckStatus::Running, None);
    }

    pub fn mark_success(&mut self, id: CheckId, message: Option<String>) {
        self.update(id, CheckStatus::Success, message);
    }

    /// Mark every running check as failed with `message`.
    pub fn fail_running(&mut self, message: &str) {
        for check in self.checks.iter_mut().filter(|c| c.status == CheckStatus::Running) {
            check.status = CheckStatus::Error;
            check.message = Some(message.to_string());
        }
    }

    /// Whether every check succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.checks.iter().all(|c| c.status == CheckStatus::Success)
    }

    /// Percentage of checks in `success`, rounded.
    pub fn progress(&self) -> u8 {
        let completed = self
            .checks
            .iter()
            .filter(|c| c.status == CheckStatus::Success)
            .count();
        ((completed as f64 / self.checks.len() as f64) * 100.0).round() as u8
    }

    /// Label of the running check, or an empty string.
    pub fn current_label(&self) -> &str {
        self.checks
            .iter()
            .find(|c| c.status == CheckStatus::Running)
            .map(|c| c.label.as_str())
            .unwrap_or("")
    }

    fn update(&mut self, id: CheckId, status: CheckStatus, message: Option<String>) {
        if let Some(check) = self.checks.iter_mut().find(|c| c.id == id) {
            check.status = status;
            if message.is_some() {
                check.message = message;
            }
        }
    }
}
