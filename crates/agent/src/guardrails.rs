use concierge_core::domain::customer::CustomerId;

/// A tool invocation described in terms of whose records it touches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailIntent {
    ReadGuestRecords { session_guest: CustomerId, requested_guest: Option<CustomerId> },
    CreateForBooking { session_guest: CustomerId, booking_owner: CustomerId },
    UpdateStatus { session_guest: CustomerId, record_owner: CustomerId, cancellation: bool },
}

impl GuardrailIntent {
    pub fn action_key(&self) -> &'static str {
        match self {
            Self::ReadGuestRecords { .. } => "guest.read_records",
            Self::CreateForBooking { .. } => "guest.create_request",
            Self::UpdateStatus { cancellation: true, .. } => "guest.cancel_request",
            Self::UpdateStatus { .. } => "guest.progress_request",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Deny { reason_code: &'static str, user_message: String, fallback_path: &'static str },
    Degrade { reason_code: &'static str, user_message: String, fallback_path: &'static str },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    /// When false, tools may read and write any guest's records.
    pub enforce_guest_scope: bool,
    /// Whether chat may move requests forward (in progress, completed,
    /// delivered). Cancelling an own request is always allowed.
    pub llm_can_progress_status: bool,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self { enforce_guest_scope: true, llm_can_progress_status: false }
    }
}

impl GuardrailPolicy {
    pub fn evaluate(&self, intent: &GuardrailIntent) -> GuardrailDecision {
        match intent {
            GuardrailIntent::ReadGuestRecords { requested_guest: None, .. } => {
                GuardrailDecision::Degrade {
                    reason_code: "guest_scope_defaulted",
                    user_message: "Showing records for the guest in this conversation.".to_string(),
                    fallback_path: "session_guest_scope",
                }
            }
            GuardrailIntent::ReadGuestRecords { session_guest, requested_guest: Some(requested) }
                if self.enforce_guest_scope && session_guest != requested =>
            {
                foreign_guest_denial()
            }
            GuardrailIntent::ReadGuestRecords { .. } => GuardrailDecision::Allow,
            GuardrailIntent::CreateForBooking { session_guest, booking_owner }
                if self.enforce_guest_scope && session_guest != booking_owner =>
            {
                foreign_guest_denial()
            }
            GuardrailIntent::CreateForBooking { .. } => GuardrailDecision::Allow,
            GuardrailIntent::UpdateStatus { session_guest, record_owner, .. }
                if self.enforce_guest_scope && session_guest != record_owner =>
            {
                foreign_guest_denial()
            }
            GuardrailIntent::UpdateStatus { cancellation: false, .. }
                if !self.llm_can_progress_status =>
            {
                GuardrailDecision::Deny {
                    reason_code: "status_progress_disallowed",
                    user_message: "Hotel staff update the progress of requests. I can only cancel \
                                   a request on your behalf."
                        .to_string(),
                    fallback_path: "staff_status_update",
                }
            }
            GuardrailIntent::UpdateStatus { .. } => GuardrailDecision::Allow,
        }
    }
}

fn foreign_guest_denial() -> GuardrailDecision {
    GuardrailDecision::Deny {
        reason_code: "foreign_guest_records",
        user_message: "I can only help with requests that belong to your own bookings.".to_string(),
        fallback_path: "front_desk",
    }
}
