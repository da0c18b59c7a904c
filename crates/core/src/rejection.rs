use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Additive set of reasons a control-surface request was rejected.
///
/// An empty set means the request was accepted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rejection(u8);

impl Rejection {
    pub const ACCEPTED: Rejection = Rejection(0);
    pub const PLAYER_UNKNOWN: Rejection = Rejection(1);
    pub const LEGEND_UNKNOWN: Rejection = Rejection(1 << 1);
    pub const ACCOUNT_UNKNOWN: Rejection = Rejection(1 << 2);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_accepted(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Rejection) -> bool {
        self.0 & other.0 == other.0
    }

    /// `flag` if `condition` holds, otherwise nothing.
    pub const fn when(condition: bool, flag: Rejection) -> Rejection {
        if condition {
            flag
        } else {
            Rejection::ACCEPTED
        }
    }
}

impl BitOr for Rejection {
    type Output = Rejection;

    fn bitor(self, rhs: Rejection) -> Rejection {
        Rejection(self.0 | rhs.0)
    }
}

impl BitOrAssign for Rejection {
    fn bitor_assign(&mut self, rhs: Rejection) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_accepted() {
            return write!(f, "accepted");
        }
        let mut reasons = Vec::new();
        if self.contains(Rejection::PLAYER_UNKNOWN) {
            reasons.push("unknown player");
        }
        if self.contains(Rejection::LEGEND_UNKNOWN) {
            reasons.push("unknown legend");
        }
        if self.contains(Rejection::ACCOUNT_UNKNOWN) {
            reasons.push("unknown account");
        }
        write!(f, "{}", reasons.join(", "))
    }
}

impl std::error::Error for Rejection {}
