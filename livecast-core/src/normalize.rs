//! Mapping from raw upstream events to outbound wire messages.
//!
//! Every event kind maps 1:1 except gifts, which carry the streak phase:
//! a streak-capable gift with the streak still open is `in-progress`
//! (shown transiently, repeated as the count grows), anything else is
//! `ended` with the final repeat count.

use crate::event::{GiftPhase, OutboundMessage, UpstreamEvent};

/// Gift type code the platform uses for streak-capable gifts.
const STREAKABLE_GIFT_TYPE: i32 = 1;

/// Social message suffixes, rendered client-side after the username.
pub const SUBSCRIBED_MESSAGE: &str = " subscribed!";
pub const FOLLOWED_MESSAGE: &str = " followed!";
pub const SHARED_MESSAGE: &str = " shared the stream!";

/// Normalize one upstream event into its outbound message.
#[must_use]
pub fn normalize(event: UpstreamEvent) -> OutboundMessage {
    match event {
        UpstreamEvent::Chat { nickname, comment } => OutboundMessage::Chat {
            username: nickname,
            message: comment,
        },
        UpstreamEvent::Gift {
            nickname,
            gift_name,
            gift_type,
            repeat_count,
            repeat_end,
            diamond_count,
        } => {
            let phase = if gift_type == STREAKABLE_GIFT_TYPE && !repeat_end {
                GiftPhase::InProgress
            } else {
                GiftPhase::Ended
            };
            OutboundMessage::Gift {
                username: nickname,
                gift_name,
                repeat_count,
                value: diamond_count,
                message: phase,
            }
        }
        UpstreamEvent::RoomUser { viewer_count } => OutboundMessage::ViewerCount {
            count: viewer_count,
        },
        UpstreamEvent::Like { total_like_count } => OutboundMessage::LikeCount {
            count: total_like_count,
        },
        UpstreamEvent::Subscribe { nickname } => OutboundMessage::Social {
            username: nickname,
            message: SUBSCRIBED_MESSAGE.to_string(),
        },
        UpstreamEvent::Follow { nickname } => OutboundMessage::Social {
            username: nickname,
            message: FOLLOWED_MESSAGE.to_string(),
        },
        UpstreamEvent::Share { nickname } => OutboundMessage::Social {
            username: nickname,
            message: SHARED_MESSAGE.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gift(gift_type: i32, repeat_end: bool, repeat_count: u32) -> UpstreamEvent {
        UpstreamEvent::Gift {
            nickname: "carol".to_string(),
            gift_name: "Rose".to_string(),
            gift_type,
            repeat_count,
            repeat_end,
            diamond_count: 1,
        }
    }

    #[test]
    fn test_gift_streak_in_progress_then_ended() {
        // Streak open: transient in-progress message with the running count
        let first = normalize(gift(1, false, 3));
        match first {
            OutboundMessage::Gift {
                repeat_count,
                message,
                ..
            } => {
                assert_eq!(repeat_count, 3);
                assert_eq!(message, GiftPhase::InProgress);
            }
            other => panic!("Expected Gift, got {other:?}"),
        }

        // Streak closed: final count, ended phase
        let second = normalize(gift(1, true, 7));
        match second {
            OutboundMessage::Gift {
                repeat_count,
                message,
                ..
            } => {
                assert_eq!(repeat_count, 7);
                assert_eq!(message, GiftPhase::Ended);
            }
            other => panic!("Expected Gift, got {other:?}"),
        }
    }

    #[test]
    fn test_non_streakable_gift_is_ended_immediately() {
        let msg = normalize(gift(5, false, 1));
        match msg {
            OutboundMessage::Gift { message, .. } => assert_eq!(message, GiftPhase::Ended),
            other => panic!("Expected Gift, got {other:?}"),
        }
    }

    #[test]
    fn test_chat_maps_nickname_and_comment() {
        let msg = normalize(UpstreamEvent::Chat {
            nickname: "bob".to_string(),
            comment: "hi".to_string(),
        });
        assert_eq!(
            msg,
            OutboundMessage::Chat {
                username: "bob".to_string(),
                message: "hi".to_string(),
            }
        );
    }

    #[test]
    fn test_counters_map_one_to_one() {
        assert_eq!(
            normalize(UpstreamEvent::RoomUser { viewer_count: 250 }),
            OutboundMessage::ViewerCount { count: 250 }
        );
        assert_eq!(
            normalize(UpstreamEvent::Like {
                total_like_count: 99
            }),
            OutboundMessage::LikeCount { count: 99 }
        );
    }

    #[test]
    fn test_social_events_carry_exact_suffixes() {
        let follow = normalize(UpstreamEvent::Follow {
            nickname: "dave".to_string(),
        });
        assert_eq!(
            follow,
            OutboundMessage::Social {
                username: "dave".to_string(),
                message: " followed!".to_string(),
            }
        );

        let subscribe = normalize(UpstreamEvent::Subscribe {
            nickname: "erin".to_string(),
        });
        assert_eq!(
            subscribe,
            OutboundMessage::Social {
                username: "erin".to_string(),
                message: " subscribed!".to_string(),
            }
        );

        let share = normalize(UpstreamEvent::Share {
            nickname: "frank".to_string(),
        });
        assert_eq!(
            share,
            OutboundMessage::Social {
                username: "frank".to_string(),
                message: " shared the stream!".to_string(),
            }
        );
    }
}
