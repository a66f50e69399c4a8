/// Addressing resolution for composed messages and replies.
/// Validates sender/recipient references against the identity store and
/// produces a message draft; nothing is written until resolution succeeds.
use chrono::Utc;

use crate::db::models::{
    ComposeMessageRequest, MessageDraft, Recipient, RecipientTarget, ReplyMessageRequest, User,
};
use crate::db::{Database, DbPool};
use crate::error::ApiError;

async fn resolve_sender(pool: &DbPool, username: &str) -> Result<User, ApiError> {
    Database::find_user(pool, username)
        .await?
        .ok_or_else(|| ApiError::not_found("user with given username does not exist"))
}

/// Resolve a composed message: recipient field exclusivity first, then the
/// sender, then the named user or group.
pub async fn resolve_compose(
    pool: &DbPool,
    request: &ComposeMessageRequest,
) -> Result<MessageDraft, ApiError> {
    request.validate()?;
    let target = request.recipient.target()?;

    let sender = resolve_sender(pool, &request.sender).await?;

    let recipient = match target {
        RecipientTarget::User(username) => {
            let user = Database::find_user(pool, username).await?.ok_or_else(|| {
                ApiError::not_found("recipient user with given username does not exist")
            })?;
            Recipient::User(user.id)
        }
        RecipientTarget::Group(groupname) => {
            let group = Database::find_group(pool, groupname).await?.ok_or_else(|| {
                ApiError::not_found("recipient group with given groupname does not exist")
            })?;
            Recipient::Group(group.id)
        }
    };

    Ok(MessageDraft {
        sender_id: sender.id,
        recipient,
        reply_to_id: None,
        subject: request.subject.clone(),
        body: request.body.clone(),
        sent_at: Utc::now(),
    })
}

/// Resolve a reply to an existing message. The reply re-uses the origin
/// message's own recipient/group as its addressing target, not the origin's
/// sender, so every reply in a 1:1 thread stays nominally addressed to the
/// same fixed user.
pub async fn resolve_reply(
    pool: &DbPool,
    request: &ReplyMessageRequest,
    origin_id: i64,
) -> Result<MessageDraft, ApiError> {
    request.validate()?;

    let sender = resolve_sender(pool, &request.sender).await?;

    let origin = Database::get_message(pool, origin_id)
        .await?
        .ok_or_else(|| ApiError::not_found("message with given id does not exist"))?;

    Ok(MessageDraft {
        sender_id: sender.id,
        recipient: origin.recipient,
        reply_to_id: Some(origin.id),
        subject: request.subject.clone(),
        body: request.body.clone(),
        sent_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::db::models::RecipientRef;

    fn compose_request(sender: &str, recipient: RecipientRef) -> ComposeMessageRequest {
        ComposeMessageRequest {
            sender: sender.to_string(),
            subject: "Greetings".to_string(),
            body: "You are hired".to_string(),
            recipient,
        }
    }

    fn to_user(username: &str) -> RecipientRef {
        RecipientRef {
            username: Some(username.to_string()),
            groupname: None,
        }
    }

    fn to_group(groupname: &str) -> RecipientRef {
        RecipientRef {
            username: None,
            groupname: Some(groupname.to_string()),
        }
    }

    #[tokio::test]
    async fn test_resolve_compose_to_user() {
        let pool = create_test_pool();
        let alice = Database::create_user(&pool, "alice").await.expect("create failed");
        let bob = Database::create_user(&pool, "bob").await.expect("create failed");

        let draft = resolve_compose(&pool, &compose_request("alice", to_user("bob")))
            .await
            .expect("Resolution should succeed");

        assert_eq!(draft.sender_id, alice.id);
        assert_eq!(draft.recipient, Recipient::User(bob.id));
        assert_eq!(draft.reply_to_id, None);
    }

    #[tokio::test]
    async fn test_resolve_compose_to_group() {
        let pool = create_test_pool();
        let alice = Database::create_user(&pool, "alice").await.expect("create failed");
        let group = Database::create_group(&pool, "team", &[alice.clone()])
            .await
            .expect("create failed");

        let draft = resolve_compose(&pool, &compose_request("alice", to_group("team")))
            .await
            .expect("Resolution should succeed");

        assert_eq!(draft.recipient, Recipient::Group(group.id));
    }

    #[tokio::test]
    async fn test_resolve_compose_rejects_both_recipient_fields() {
        let pool = create_test_pool();
        Database::create_user(&pool, "alice").await.expect("create failed");

        let both = RecipientRef {
            username: Some("bob".to_string()),
            groupname: Some("team".to_string()),
        };
        let result = resolve_compose(&pool, &compose_request("alice", both)).await;
        assert!(matches!(result, Err(ApiError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_resolve_compose_rejects_missing_recipient_fields() {
        let pool = create_test_pool();
        Database::create_user(&pool, "alice").await.expect("create failed");

        let result =
            resolve_compose(&pool, &compose_request("alice", RecipientRef::default())).await;
        assert!(matches!(result, Err(ApiError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_resolve_compose_exclusivity_checked_before_sender() {
        let pool = create_test_pool();

        // Sender does not exist either; the contradictory recipient must win
        let both = RecipientRef {
            username: Some("bob".to_string()),
            groupname: Some("team".to_string()),
        };
        let result = resolve_compose(&pool, &compose_request("nobody", both)).await;
        assert!(matches!(result, Err(ApiError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_resolve_compose_unknown_sender() {
        let pool = create_test_pool();
        Database::create_user(&pool, "bob").await.expect("create failed");

        let result = resolve_compose(&pool, &compose_request("nobody", to_user("bob"))).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_resolve_compose_unknown_recipient() {
        let pool = create_test_pool();
        Database::create_user(&pool, "alice").await.expect("create failed");

        let result = resolve_compose(&pool, &compose_request("alice", to_user("nobody"))).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));

        let result = resolve_compose(&pool, &compose_request("alice", to_group("nowhere"))).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    fn reply_request(sender: &str) -> ReplyMessageRequest {
        ReplyMessageRequest {
            sender: sender.to_string(),
            subject: "Re: Greetings".to_string(),
            body: "Thanks".to_string(),
        }
    }

    #[tokio::test]
    async fn test_resolve_reply_inherits_origin_recipient() {
        let pool = create_test_pool();
        Database::create_user(&pool, "alice").await.expect("create failed");
        let bob = Database::create_user(&pool, "bob").await.expect("create failed");

        let origin = Database::create_message(
            &pool,
            &resolve_compose(&pool, &compose_request("alice", to_user("bob")))
                .await
                .expect("resolve failed"),
        )
        .await
        .expect("create failed");

        // Bob replies; the reply is still addressed to the origin's own
        // recipient (bob), not to the origin's sender (alice).
        let draft = resolve_reply(&pool, &reply_request("bob"), origin.id)
            .await
            .expect("Resolution should succeed");

        assert_eq!(draft.recipient, Recipient::User(bob.id));
        assert_eq!(draft.reply_to_id, Some(origin.id));
    }

    #[tokio::test]
    async fn test_resolve_reply_to_group_message() {
        let pool = create_test_pool();
        let alice = Database::create_user(&pool, "alice").await.expect("create failed");
        let bob = Database::create_user(&pool, "bob").await.expect("create failed");
        let group = Database::create_group(&pool, "team", &[alice, bob])
            .await
            .expect("create failed");

        let origin = Database::create_message(
            &pool,
            &resolve_compose(&pool, &compose_request("alice", to_group("team")))
                .await
                .expect("resolve failed"),
        )
        .await
        .expect("create failed");

        let draft = resolve_reply(&pool, &reply_request("bob"), origin.id)
            .await
            .expect("Resolution should succeed");

        assert_eq!(draft.recipient, Recipient::Group(group.id));
        assert_eq!(draft.reply_to_id, Some(origin.id));
    }

    #[tokio::test]
    async fn test_resolve_reply_unknown_origin() {
        let pool = create_test_pool();
        Database::create_user(&pool, "bob").await.expect("create failed");

        let result = resolve_reply(&pool, &reply_request("bob"), 150).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_resolve_reply_unknown_sender() {
        let pool = create_test_pool();
        Database::create_user(&pool, "alice").await.expect("create failed");

        let result = resolve_reply(&pool, &reply_request("nobody"), 1).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
