use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Lifecycle states a game thread moves through.
///
/// The common path is `Future → Pregame → Posted → Over`; postponement and
/// removal are absorbing alternates reachable from any pre-`Over` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    /// The game is known but nothing has been posted yet.
    Future,
    /// A pregame thread is live; the gamechat has not been posted.
    Pregame,
    /// The gamechat thread is live and being updated.
    Posted,
    /// The game finished and the thread has been closed out.
    Over,
    /// The game was postponed; no further updates happen.
    Postponed,
    /// The thread was removed out of band; no further updates happen.
    Removed,
    /// The thread is managed by other tooling and is never touched here.
    External,
}

impl ThreadStatus {
    /// Whether this state admits no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ThreadStatus::Over | ThreadStatus::Postponed | ThreadStatus::Removed
        )
    }

    /// Whether a submission must exist for a record in this state.
    ///
    /// `Future` implies no submission has occurred; `Postponed`/`Removed`
    /// may carry one if the thread was already live when the game died.
    pub fn expects_submission(self) -> bool {
        matches!(
            self,
            ThreadStatus::Pregame | ThreadStatus::Posted | ThreadStatus::Over
        )
    }
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThreadStatus::Future => "Future",
            ThreadStatus::Pregame => "Pregame",
            ThreadStatus::Posted => "Posted",
            ThreadStatus::Over => "Over",
            ThreadStatus::Postponed => "Postponed",
            ThreadStatus::Removed => "Removed",
            ThreadStatus::External => "External",
        };
        f.write_str(name)
    }
}

/// Error returned when parsing an unknown status string from a store row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown thread status `{0}`")]
pub struct UnknownStatus(pub String);

impl FromStr for ThreadStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Future" => Ok(ThreadStatus::Future),
            "Pregame" => Ok(ThreadStatus::Pregame),
            "Posted" => Ok(ThreadStatus::Posted),
            "Over" => Ok(ThreadStatus::Over),
            "Postponed" => Ok(ThreadStatus::Postponed),
            "Removed" => Ok(ThreadStatus::Removed),
            "External" => Ok(ThreadStatus::External),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

/// Events that can be applied to a thread's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadEvent {
    /// The pregame thread was submitted.
    PregamePosted,
    /// The gamechat thread was submitted.
    GamechatPosted,
    /// The feed reported the game as final.
    GameFinished,
    /// The feed reported the game as postponed.
    GamePostponed,
    /// The thread was removed out of band.
    ThreadRemoved,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while {from}")]
pub struct InvalidTransition {
    /// The status the thread was in when the invalid event was received.
    pub from: ThreadStatus,
    /// The event that cannot be applied from this status.
    pub event: ThreadEvent,
}

impl ThreadStatus {
    /// Compute the status an event leads to, rejecting invalid transitions.
    ///
    /// Terminal states and `External` accept no events at all; the caller is
    /// expected to surface the error as a data warning and leave the stored
    /// status unchanged rather than guess.
    pub fn apply(self, event: ThreadEvent) -> Result<ThreadStatus, InvalidTransition> {
        let next = match (self, event) {
            (ThreadStatus::Future, ThreadEvent::PregamePosted) => ThreadStatus::Pregame,
            (ThreadStatus::Future | ThreadStatus::Pregame, ThreadEvent::GamechatPosted) => {
                ThreadStatus::Posted
            }
            (ThreadStatus::Posted, ThreadEvent::GameFinished) => ThreadStatus::Over,
            (
                ThreadStatus::Future | ThreadStatus::Pregame | ThreadStatus::Posted,
                ThreadEvent::GamePostponed,
            ) => ThreadStatus::Postponed,
            (
                ThreadStatus::Future | ThreadStatus::Pregame | ThreadStatus::Posted,
                ThreadEvent::ThreadRemoved,
            ) => ThreadStatus::Removed,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
