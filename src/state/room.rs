//! Room lifecycle controller.
//!
//! ```text
//! Idle -> Connecting -> RoomResolving -> Joined -> Closed
//!                            |
//!                            +-> Failed
//! ```
//!
//! Any state may move to `Closed`. `Failed` records a rejected create/join;
//! the attempt is never retried.

#[cfg(test)]
#[path = "room_test.rs"]
mod room_test;

use crate::error::ChatError;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RoomPhase {
    #[default]
    Idle,
    Connecting,
    RoomResolving,
    Joined,
    Closed,
    Failed(ChatError),
}

/// Where the bound room id came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoomSource {
    /// Passed in by the caller, e.g. from an invite link.
    Supplied,
    /// Last room remembered by this browser profile.
    Cached,
    /// Newly created for this session.
    Created,
}

/// Decision taken once the connection is ready.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoomPlan {
    Join { room_id: String, source: RoomSource },
    Create,
}

/// Pick the room to enter: supplied beats cached, otherwise create.
pub fn plan_room(supplied: Option<&str>, cached: Option<&str>) -> RoomPlan {
    let usable = |id: Option<&str>| id.map(str::trim).filter(|id| !id.is_empty()).map(str::to_owned);
    if let Some(room_id) = usable(supplied) {
        return RoomPlan::Join { room_id, source: RoomSource::Supplied };
    }
    if let Some(room_id) = usable(cached) {
        return RoomPlan::Join { room_id, source: RoomSource::Cached };
    }
    RoomPlan::Create
}

#[derive(Clone, Debug, Default)]
pub struct RoomController {
    phase: RoomPhase,
    supplied: Option<String>,
    room_id: Option<String>,
    source: Option<RoomSource>,
}

impl RoomController {
    pub fn new(supplied: Option<String>) -> Self {
        Self { supplied, ..Self::default() }
    }

    pub fn phase(&self) -> &RoomPhase {
        &self.phase
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    pub fn source(&self) -> Option<RoomSource> {
        self.source
    }

    pub fn is_joined(&self) -> bool {
        self.phase == RoomPhase::Joined
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, RoomPhase::Closed | RoomPhase::Failed(_))
    }

    /// `Idle -> Connecting`.
    pub fn begin_connecting(&mut self) -> bool {
        self.advance(RoomPhase::Idle, RoomPhase::Connecting)
    }

    /// `Connecting -> RoomResolving`; returns the plan, or `None` when the
    /// controller is not waiting for readiness.
    pub fn on_ready(&mut self, cached: Option<&str>) -> Option<RoomPlan> {
        if !self.advance(RoomPhase::Connecting, RoomPhase::RoomResolving) {
            return None;
        }
        let plan = plan_room(self.supplied.as_deref(), cached);
        log::info!("room plan: {plan:?}");
        Some(plan)
    }

    /// Bind the resolved room id. The first binding wins.
    pub fn bind(&mut self, room_id: String, source: RoomSource) -> bool {
        if self.room_id.is_some() || self.phase != RoomPhase::RoomResolving {
            return false;
        }
        self.room_id = Some(room_id);
        self.source = Some(source);
        true
    }

    /// `RoomResolving -> Joined`; requires a bound room.
    pub fn on_joined(&mut self) -> bool {
        if self.room_id.is_none() {
            return false;
        }
        self.advance(RoomPhase::RoomResolving, RoomPhase::Joined)
    }

    /// Record a terminal failure unless already finished.
    pub fn fail(&mut self, err: ChatError) {
        if self.is_finished() {
            return;
        }
        log::warn!("room session failed: {err}");
        self.phase = RoomPhase::Failed(err);
    }

    /// Any state `-> Closed`. A recorded failure is kept.
    pub fn close(&mut self) {
        if self.is_finished() {
            return;
        }
        self.phase = RoomPhase::Closed;
    }

    fn advance(&mut self, from: RoomPhase, to: RoomPhase) -> bool {
        if self.phase != from {
            log::debug!("ignoring room transition {from:?} -> {to:?} while {:?}", self.phase);
            return false;
        }
        self.phase = to;
        true
    }
}
