use serde::{Deserialize, Serialize};

/// Trading venue an agent, deployment or position belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Venue {
    Hyperliquid,
    Ostium,
    Gmx,
    Spot,
    Multi,
}

impl Venue {
    pub const ALL: [Venue; 5] = [
        Venue::Hyperliquid,
        Venue::Ostium,
        Venue::Gmx,
        Venue::Spot,
        Venue::Multi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::Hyperliquid => "HYPERLIQUID",
            Venue::Ostium => "OSTIUM",
            Venue::Gmx => "GMX",
            Venue::Spot => "SPOT",
            Venue::Multi => "MULTI",
        }
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Venue {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Venue::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown venue: {s}"))
    }
}

/// Agent publication status
pub mod agent_status {
    pub const PUBLIC: &str = "PUBLIC";
    pub const PRIVATE: &str = "PRIVATE";
    pub const DRAFT: &str = "DRAFT";
}

/// Deployment subscription status
pub mod deployment_status {
    pub const ACTIVE: &str = "ACTIVE";
    pub const PAUSED: &str = "PAUSED";
}

/// Position lifecycle status
pub mod position_status {
    pub const OPEN: &str = "OPEN";
}

/// Which deployment of the external trade index a trade lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_venue_round_trip_names() {
        for venue in Venue::ALL {
            assert_eq!(Venue::try_from(venue.as_str()), Ok(venue));
        }
        assert_eq!(Venue::try_from("ostium"), Ok(Venue::Ostium));
        assert!(Venue::try_from("BINANCE").is_err());
    }
}
