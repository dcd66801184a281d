use chrono::{DateTime, Utc};

use crate::domain::session::ChatSession;
use crate::error::CoreError;

/// Sliding window cap shared uniformly by `/chat` and `/chat-open` (spec §4.12, §5;
/// SPEC_FULL §9 resolves the ambiguity over whether Live Mode is exempt — it is not).
pub fn check_and_record(
    session: &mut ChatSession,
    now: DateTime<Utc>,
    max_messages: u32,
    window: chrono::Duration,
) -> Result<(), CoreError> {
    if now - session.window_started_at > window {
        session.window_started_at = now;
        session.message_count_in_window = 0;
    }

    if session.message_count_in_window >= max_messages {
        return Err(CoreError::RateLimited {
            retry_reply: "You've sent a lot of messages in a short time — please wait a few minutes before continuing."
                .to_string(),
        });
    }

    session.message_count_in_window += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn caps_at_max_messages_within_window() {
        let mut session = ChatSession::new(Uuid::new_v4(), Utc::now());
        let now = Utc::now();
        for _ in 0..5 {
            check_and_record(&mut session, now, 5, chrono::Duration::minutes(15)).unwrap();
        }
        let err = check_and_record(&mut session, now, 5, chrono::Duration::minutes(15));
        assert!(err.is_err());
    }

    #[test]
    fn window_resets_after_expiry() {
        let mut session = ChatSession::new(Uuid::new_v4(), Utc::now());
        let first = Utc::now();
        check_and_record(&mut session, first, 1, chrono::Duration::minutes(15)).unwrap();
        let later = first + chrono::Duration::minutes(16);
        assert!(check_and_record(&mut session, later, 1, chrono::Duration::minutes(15)).is_ok());
    }
}
