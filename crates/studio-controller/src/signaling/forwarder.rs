//! Signaling forwarder.
//!
//! Relays a negotiation message from one connection to the right subset of
//! its room. Delivery is best-effort and at-most-once: there is no queuing
//! beyond each connection's outbound buffer and no retry. Nothing here is an
//! error; every drop is logged, counted and reported in the outcome.

use crate::observability::metrics;
use crate::presence::{ConnectionRegistry, MembershipTable};
use crate::signaling::protocol::{ServerEvent, SignalEvent};
use crate::types::{ConnectionId, RoomId};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

/// Why a forward delivered nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The frame named no room.
    MissingRoom,
    /// The frame carried no payload.
    MissingPayload,
    /// The room has no membership entry.
    UnknownRoom,
    /// The explicit target is not a member of the room.
    TargetNotMember,
    /// The explicit target is the sender itself.
    SelfTarget,
    /// The target was a member but its outbound queue refused the message.
    Undeliverable,
}

impl DropReason {
    /// Bounded label for metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DropReason::MissingRoom => "missing_room",
            DropReason::MissingPayload => "missing_payload",
            DropReason::UnknownRoom => "unknown_room",
            DropReason::TargetNotMember => "target_not_member",
            DropReason::SelfTarget => "self_target",
            DropReason::Undeliverable => "undeliverable",
        }
    }
}

/// Result of one forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// The message was queued for these connections. May be empty when the
    /// sender is alone in the room.
    Delivered { recipients: Vec<ConnectionId> },
    /// Nothing was delivered.
    Dropped(DropReason),
}

impl ForwardOutcome {
    /// Recipients of a delivered forward; empty when dropped.
    #[must_use]
    pub fn recipients(&self) -> &[ConnectionId] {
        match self {
            ForwardOutcome::Delivered { recipients } => recipients,
            ForwardOutcome::Dropped(_) => &[],
        }
    }
}

/// Room-scoped fan-out of signaling messages.
#[derive(Debug, Clone)]
pub struct SignalingForwarder {
    registry: Arc<ConnectionRegistry>,
    membership: Arc<MembershipTable>,
}

impl SignalingForwarder {
    pub fn new(registry: Arc<ConnectionRegistry>, membership: Arc<MembershipTable>) -> Self {
        Self {
            registry,
            membership,
        }
    }

    /// Forward `payload` as `event` from `sender` within `room_id`.
    ///
    /// With a `target`, only that connection receives the message, and only if
    /// it is a current member of the room. Without a target every member
    /// except the sender receives it. A forward that reaches at least the
    /// routing step touches the room.
    pub fn forward(
        &self,
        sender: &ConnectionId,
        event: SignalEvent,
        room_id: &RoomId,
        payload: Option<&Value>,
        target: Option<&ConnectionId>,
    ) -> ForwardOutcome {
        let outcome = self.route(sender, event, room_id, payload, target);

        match &outcome {
            ForwardOutcome::Delivered { recipients } => {
                self.membership.touch(room_id);
                metrics::record_signal_forwarded(event, recipients.len());
                trace!(
                    target: "studio.signaling",
                    event = event.wire_name(),
                    room_id = %room_id,
                    sender = %sender,
                    recipients = recipients.len(),
                    "Signal forwarded"
                );
            }
            ForwardOutcome::Dropped(reason) => {
                metrics::record_signal_dropped(event, *reason);
                debug!(
                    target: "studio.signaling",
                    event = event.wire_name(),
                    room_id = %room_id,
                    sender = %sender,
                    reason = reason.as_str(),
                    "Signal dropped"
                );
            }
        }

        outcome
    }

    fn route(
        &self,
        sender: &ConnectionId,
        event: SignalEvent,
        room_id: &RoomId,
        payload: Option<&Value>,
        target: Option<&ConnectionId>,
    ) -> ForwardOutcome {
        let Some(payload) = payload else {
            return ForwardOutcome::Dropped(DropReason::MissingPayload);
        };

        // Snapshot taken under the room's shard lock; delivery happens after
        // the lock is released.
        let Some(members) = self.membership.try_room_members(room_id) else {
            return ForwardOutcome::Dropped(DropReason::UnknownRoom);
        };

        let recipients: Vec<ConnectionId> = match target {
            Some(target) if target == sender => {
                return ForwardOutcome::Dropped(DropReason::SelfTarget);
            }
            Some(target) if members.contains(target) => vec![target.clone()],
            Some(_) => return ForwardOutcome::Dropped(DropReason::TargetNotMember),
            None => members.into_iter().filter(|id| id != sender).collect(),
        };

        let message = ServerEvent::signal(event, room_id, payload.clone(), sender);
        let delivered: Vec<ConnectionId> = recipients
            .into_iter()
            .filter(|recipient| match self.registry.deliver(recipient, message.clone()) {
                Ok(()) => true,
                Err(e) => {
                    debug!(
                        target: "studio.signaling",
                        recipient = %recipient,
                        error = e.as_str(),
                        "Recipient skipped"
                    );
                    false
                }
            })
            .collect();

        if target.is_some() && delivered.is_empty() {
            return ForwardOutcome::Dropped(DropReason::Undeliverable);
        }

        ForwardOutcome::Delivered {
            recipients: delivered,
        }
    }
}
