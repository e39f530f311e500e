use core::fmt;

/// Operational status of a link.
///
/// `Active` only has meaning for valves (the valve enforces its setting) and is
/// treated like `Open` for pipes and pumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinkStatus {
    #[default]
    Open,
    Closed,
    Active,
}

impl LinkStatus {
    pub fn is_closed(self) -> bool {
        matches!(self, LinkStatus::Closed)
    }

    /// Numeric encoding used by value conditions (closed=0, open=1, active=2).
    pub fn as_f64(self) -> f64 {
        match self {
            LinkStatus::Closed => 0.0,
            LinkStatus::Open => 1.0,
            LinkStatus::Active => 2.0,
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkStatus::Open => "OPEN",
            LinkStatus::Closed => "CLOSED",
            LinkStatus::Active => "ACTIVE",
        };
        f.write_str(s)
    }
}
