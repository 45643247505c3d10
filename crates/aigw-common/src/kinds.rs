use serde::{Deserialize, Serialize};

/// The three call shapes the sync pipeline and job engine both dispatch.
/// Carried verbatim into `RequestLog.kind` / `Job.kind` (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Responses,
    #[serde(rename = "chat.completions")]
    ChatCompletions,
    Models,
}

impl RequestKind {
    /// The rate-limiter endpoint label for this kind (`spec.md` §4.E).
    pub fn endpoint_label(self) -> &'static str {
        match self {
            RequestKind::Responses => "responses",
            RequestKind::ChatCompletions => "chat.completions",
            RequestKind::Models => "models",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.endpoint_label())
    }
}

/// Terminal status of one provider call (`RequestLog.status`, `JobAttempt.status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Succeeded,
    Failed,
}

/// Job lifecycle state (`spec.md` §3, `Job.status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// `true` once the job has reached a terminal state (`spec.md` §3 invariant:
    /// "once status is terminal it does not change").
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_completions_wire_form_uses_a_dot_not_an_underscore() {
        let value = serde_json::to_value(RequestKind::ChatCompletions).unwrap();
        assert_eq!(value, serde_json::json!("chat.completions"));
        let parsed: RequestKind = serde_json::from_value(serde_json::json!("chat.completions")).unwrap();
        assert_eq!(parsed, RequestKind::ChatCompletions);
    }
}
