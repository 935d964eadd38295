// ============================================================
// Layer 3 — Service State
// ============================================================
// Lifecycle tag of an inference service, as seen from outside:
//
//   Uninitialized → Loading → Ready → Closed
//                      └────► FailedInit
//
// Lives in the domain layer so errors can carry it without
// depending on the application layer.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Uninitialized,
    Loading,
    Ready,
    Closed,
    FailedInit,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading       => "loading",
            Self::Ready         => "ready",
            Self::Closed        => "closed",
            Self::FailedInit    => "failed-init",
        };
        f.write_str(name)
    }
}
