//! Send cycle orchestration
//!
//! A [`Session`] owns the transcript, the draft input and the pending flag.
//! A send cycle is split in two so a UI can keep drawing while the request
//! is in flight:
//!
//! 1. [`Session::submit`] validates the draft, appends the user turn, clears
//!    the draft and marks the session pending. It returns the
//!    [`SendRequest`] to hand to a [`ChatProvider`].
//! 2. [`Session::complete`] appends the reply, or the fallback turn on
//!    failure, and clears the pending flag.
//!
//! [`Session::send`] runs both phases back to back.

use crate::error::SendError;
use crate::persona;
use crate::provider::{ChatProvider, SendRequest};
use crate::state::{Conversation, Turn};

/// What a call to [`Session::send`] did when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sent {
    /// Empty draft or a send already in flight; nothing changed
    Ignored,
    Replied,
}

#[derive(Debug, Clone)]
pub struct Session {
    conversation: Conversation,
    draft: String,
    pending: bool,
    system: String,
    fallback: String,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Session seeded with the cooking assistant persona
    pub fn new() -> Self {
        Self::with_persona(persona::GREETING, persona::SYSTEM_PROMPT, persona::FALLBACK_REPLY)
    }

    pub fn with_persona(greeting: &str, system: &str, fallback: &str) -> Self {
        Self {
            conversation: Conversation::seeded(greeting),
            draft: String::new(),
            pending: false,
            system: system.to_string(),
            fallback: fallback.to_string(),
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn turns(&self) -> &[Turn] {
        self.conversation.turns()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut String {
        &mut self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Suggested prompts are offered only before the first send starts
    pub fn shows_suggestions(&self) -> bool {
        self.conversation.is_seed_only() && !self.pending
    }

    /// Copy suggested prompt `index` into the draft without sending.
    /// Returns false when suggestions are hidden or the index is out of range.
    pub fn use_suggestion(&mut self, index: usize) -> bool {
        if !self.shows_suggestions() {
            return false;
        }
        match persona::SUGGESTED_PROMPTS.get(index) {
            Some(prompt) => {
                self.draft = (*prompt).to_string();
                true
            }
            None => false,
        }
    }

    /// Start a send cycle with `text`.
    ///
    /// Returns `None` without touching any state when `text` is blank or a
    /// send is already pending.
    pub fn submit(&mut self, text: &str) -> Option<SendRequest> {
        if text.trim().is_empty() || self.pending {
            tracing::debug!(pending = self.pending, "send ignored");
            return None;
        }

        let mut updated = self.conversation.turns().to_vec();
        updated.push(Turn::user(text));

        self.conversation.replace_all(updated.clone());
        self.draft.clear();
        self.pending = true;

        tracing::info!(turns = updated.len(), "send started");

        Some(SendRequest {
            system: self.system.clone(),
            messages: updated,
        })
    }

    /// Start a send cycle with the current draft
    pub fn submit_draft(&mut self) -> Option<SendRequest> {
        let text = self.draft.clone();
        self.submit(&text)
    }

    /// Finish the pending send cycle.
    ///
    /// On failure the fallback turn takes the reply's place and the error is
    /// returned to the caller. Pending is cleared in every case.
    pub fn complete(&mut self, result: Result<String, SendError>) -> Result<(), SendError> {
        if !self.pending {
            tracing::warn!("completion arrived with no send pending, dropping it");
            return result.map(|_| ());
        }

        let mut updated = self.conversation.turns().to_vec();
        let outcome = match result {
            Ok(reply) => {
                updated.push(Turn::assistant(reply));
                tracing::info!(turns = updated.len(), "send completed");
                Ok(())
            }
            Err(err) => {
                updated.push(Turn::assistant(self.fallback.clone()));
                tracing::warn!(kind = err.kind(), error = %err, "send failed");
                Err(err)
            }
        };

        self.conversation.replace_all(updated);
        self.pending = false;
        outcome
    }

    /// Run a whole send cycle against `provider`
    pub async fn send<P>(&mut self, provider: &P, text: &str) -> Result<Sent, SendError>
    where
        P: ChatProvider + ?Sized,
    {
        let Some(request) = self.submit(text) else {
            return Ok(Sent::Ignored);
        };

        let result = provider.complete(&request).await;
        self.complete(result).map(|()| Sent::Replied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ChatRole;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Provider returning queued replies and recording every request
    struct MockProvider {
        replies: Mutex<VecDeque<Result<String, SendError>>>,
        requests: Mutex<Vec<SendRequest>>,
    }

    impl MockProvider {
        fn new() -> Self {
            Self {
                replies: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn queue_reply(&self, reply: &str) {
            self.replies.lock().unwrap().push_back(Ok(reply.to_string()));
        }

        fn queue_error(&self, error: SendError) {
            self.replies.lock().unwrap().push_back(Err(error));
        }

        fn recorded_requests(&self) -> Vec<SendRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatProvider for MockProvider {
        async fn complete(&self, request: &SendRequest) -> Result<String, SendError> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(SendError::MissingText))
        }

        fn model(&self) -> &str {
            "mock"
        }

        fn display_name(&self) -> &'static str {
            "Mock"
        }
    }

    #[test]
    fn test_submit_appends_user_turn_synchronously() {
        let mut session = Session::new();
        session.set_draft("鶏肉を使った料理のアイデア");

        let request = session.submit_draft().expect("send accepted");

        assert_eq!(session.turns().len(), 2);
        assert_eq!(session.turns()[1], Turn::user("鶏肉を使った料理のアイデア"));
        assert_eq!(session.draft(), "");
        assert!(session.is_pending());
        assert_eq!(request.messages, session.turns());
        assert_eq!(request.system, persona::SYSTEM_PROMPT);
    }

    #[test]
    fn test_pending_only_between_submit_and_complete() {
        let mut session = Session::new();
        assert!(!session.is_pending());

        session.submit("パスタ").unwrap();
        assert!(session.is_pending());

        session.complete(Ok("どうぞ".to_string())).unwrap();
        assert!(!session.is_pending());
    }

    #[test]
    fn test_each_cycle_adds_two_turns() {
        let mut session = Session::new();
        for i in 0..3 {
            let before = session.turns().len();
            session.submit(&format!("質問 {i}")).unwrap();
            let result = if i % 2 == 0 {
                Ok("答え".to_string())
            } else {
                Err(SendError::MissingText)
            };
            let _ = session.complete(result);
            assert_eq!(session.turns().len(), before + 2);
        }
    }

    #[test]
    fn test_submit_while_pending_is_a_no_op() {
        let mut session = Session::new();
        session.submit("first").unwrap();
        session.set_draft("second draft");
        let turns_before = session.turns().to_vec();

        assert!(session.submit("second").is_none());
        assert!(session.submit_draft().is_none());

        assert_eq!(session.turns(), turns_before.as_slice());
        assert_eq!(session.draft(), "second draft");
        assert!(session.is_pending());
    }

    #[test]
    fn test_blank_text_is_a_no_op() {
        let mut session = Session::new();
        session.set_draft("   ");

        assert!(session.submit("").is_none());
        assert!(session.submit("   ").is_none());
        assert!(session.submit("\n\t").is_none());
        assert!(session.submit_draft().is_none());

        assert_eq!(session.turns().len(), 1);
        assert!(!session.is_pending());
        assert_eq!(session.draft(), "   ");
    }

    #[test]
    fn test_user_text_is_kept_untrimmed() {
        let mut session = Session::new();
        session.submit("  カレー  ").unwrap();
        assert_eq!(session.turns()[1].content, "  カレー  ");
    }

    #[test]
    fn test_failure_appends_fallback_in_reply_position() {
        let mut session = Session::new();
        session.submit("質問").unwrap();

        let result = session.complete(Err(SendError::Task("boom".to_string())));

        assert!(matches!(result, Err(SendError::Task(_))));
        assert_eq!(session.turns().len(), 3);
        assert_eq!(session.turns()[2], Turn::assistant(persona::FALLBACK_REPLY));
        assert!(!session.is_pending());
    }

    #[test]
    fn test_stray_completion_leaves_transcript_alone() {
        let mut session = Session::new();
        assert!(session.complete(Ok("late".to_string())).is_ok());
        assert!(session.complete(Err(SendError::MissingText)).is_err());
        assert_eq!(session.turns().len(), 1);
    }

    #[test]
    fn test_suggestions_visible_only_before_first_send() {
        let mut session = Session::new();
        assert!(session.shows_suggestions());

        session.submit("hi").unwrap();
        assert!(!session.shows_suggestions());

        session.complete(Ok("hello".to_string())).unwrap();
        assert!(!session.shows_suggestions());
    }

    #[test]
    fn test_use_suggestion_populates_draft_without_sending() {
        let mut session = Session::new();

        assert!(session.use_suggestion(1));
        assert_eq!(session.draft(), "簡単な和食のレシピを教えて");
        assert_eq!(session.turns().len(), 1);
        assert!(!session.is_pending());

        assert!(!session.use_suggestion(persona::SUGGESTED_PROMPTS.len()));
        assert_eq!(session.draft(), "簡単な和食のレシピを教えて");
    }

    #[test]
    fn test_use_suggestion_rejected_once_hidden() {
        let mut session = Session::new();
        session.submit("hi").unwrap();
        assert!(!session.use_suggestion(0));
        assert_eq!(session.draft(), "");
    }

    #[tokio::test]
    async fn test_send_success_scenario() {
        let provider = MockProvider::new();
        provider.queue_reply("オムライスはいかがですか?");
        let mut session = Session::new();
        session.set_draft("簡単な和食のレシピを教えて");

        let sent = session.send(&provider, "簡単な和食のレシピを教えて").await.unwrap();

        assert_eq!(sent, Sent::Replied);
        assert_eq!(
            session.turns(),
            &[
                Turn::assistant(persona::GREETING),
                Turn::user("簡単な和食のレシピを教えて"),
                Turn::assistant("オムライスはいかがですか?"),
            ]
        );
        assert!(!session.is_pending());
        assert_eq!(session.draft(), "");

        let requests = provider.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages.len(), 2);
        assert_eq!(requests[0].messages[1].role, ChatRole::User);
    }

    #[tokio::test]
    async fn test_send_failure_scenario() {
        let provider = MockProvider::new();
        provider.queue_error(SendError::Task("connection reset".to_string()));
        let mut session = Session::new();

        let err = session.send(&provider, "今日の夕食に何を作ればいい?").await.unwrap_err();

        assert_eq!(err.kind(), "task");
        assert_eq!(session.turns().len(), 3);
        assert_eq!(session.turns()[1], Turn::user("今日の夕食に何を作ればいい?"));
        assert_eq!(session.turns()[2], Turn::assistant(persona::FALLBACK_REPLY));
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn test_send_blank_text_makes_no_request() {
        let provider = MockProvider::new();
        let mut session = Session::new();

        assert_eq!(session.send(&provider, "   ").await.unwrap(), Sent::Ignored);
        assert!(provider.recorded_requests().is_empty());
        assert_eq!(session.turns().len(), 1);
    }

    #[tokio::test]
    async fn test_second_cycle_carries_full_history() {
        let provider = MockProvider::new();
        provider.queue_reply("one");
        provider.queue_reply("two");
        let mut session = Session::new();

        session.send(&provider, "a").await.unwrap();
        session.send(&provider, "b").await.unwrap();

        let requests = provider.recorded_requests();
        assert_eq!(requests[1].messages.len(), 4);
        assert_eq!(requests[1].messages[2], Turn::assistant("one"));
        assert_eq!(session.turns().len(), 5);
    }
}
