use gradbot_core::SessionSnapshot;

/// A transcript bubble as the page renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub is_user: bool,
    pub content: String,
    pub time: String,
    /// User message whose request failed; it will never get a reply.
    pub unanswered: bool,
}

impl MessageView {
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Vec<Self> {
        snapshot
            .messages
            .iter()
            .map(|message| MessageView {
                is_user: message.is_user(),
                content: message.content.clone(),
                time: message.display_time(),
                unanswered: message.is_user() && snapshot.is_failed(message.exchange),
            })
            .collect()
    }

    pub fn bubble_class(&self) -> &'static str {
        if self.is_user {
            "bubble bubble-user"
        } else {
            "bubble bubble-assistant"
        }
    }
}
