use std::fmt;

/// Check-in state machine position, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckinState {
    Start,
    Authenticated,
    Issued,
    Awaiting,
    Classified,
    Drilling,
    Done,
}

impl fmt::Display for CheckinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Authenticated => "authenticated",
            Self::Issued => "issued",
            Self::Awaiting => "awaiting",
            Self::Classified => "classified",
            Self::Drilling => "drilling",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}
