#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    Stored,
    Blocked,
    RequireReauth,
    PendingApproval,
}

impl SubmitStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmitStatus::Stored => "stored",
            SubmitStatus::Blocked => "blocked",
            SubmitStatus::RequireReauth => "require_reauth",
            SubmitStatus::PendingApproval => "pending_approval",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Allow,
    RequireReauth,
    Block,
    PendingApproval,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Allow => "allow",
            Action::RequireReauth => "require_reauth",
            Action::Block => "block",
            Action::PendingApproval => "pending_approval",
        }
    }
}

impl From<relay_policy::Action> for Action {
    fn from(value: relay_policy::Action) -> Self {
        match value {
            relay_policy::Action::Allow => Action::Allow,
            relay_policy::Action::RequireReauth => Action::RequireReauth,
            relay_policy::Action::Block => Action::Block,
            relay_policy::Action::PendingApproval => Action::PendingApproval,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub status: SubmitStatus,
    pub risk: i64,
    pub policy: Action,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct HybridSubmitOutcome {
    pub outcome: SubmitOutcome,
    pub key_id: String,
    pub encrypted_message_b64: Option<String>,
}
