//! Registry of robots heard on the discovery port

use crate::operator::Target;
use minibot_shared::DiscoveryAnnouncement;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

/// What the console knows about one robot
#[derive(Debug, Clone)]
pub struct RobotInfo {
    pub identity: String,
    pub address: IpAddr,
    pub first_seen: Instant,
    pub last_seen: Instant,
    pub announcements: u64,
}

/// How an announcement changed the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// First announcement from this identity
    New,
    /// Known identity, now at a different address
    Moved,
    /// Known identity at the same address
    Refreshed,
}

/// Tracks every robot that has announced itself
#[derive(Debug, Default)]
pub struct RobotRegistry {
    robots: HashMap<String, RobotInfo>,
}

impl RobotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an announcement heard at `now`
    pub fn observe(&mut self, announcement: &DiscoveryAnnouncement, now: Instant) -> Observation {
        match self.robots.get_mut(&announcement.identity) {
            Some(info) => {
                info.last_seen = now;
                info.announcements += 1;
                if info.address != announcement.address {
                    info.address = announcement.address;
                    Observation::Moved
                } else {
                    Observation::Refreshed
                }
            }
            None => {
                self.robots.insert(
                    announcement.identity.clone(),
                    RobotInfo {
                        identity: announcement.identity.clone(),
                        address: announcement.address,
                        first_seen: now,
                        last_seen: now,
                        announcements: 1,
                    },
                );
                Observation::New
            }
        }
    }

    pub fn get(&self, identity: &str) -> Option<&RobotInfo> {
        self.robots.get(identity)
    }

    /// Where to send commands for `identity`
    pub fn command_addr(&self, identity: &str, port: u16) -> Option<SocketAddr> {
        self.get(identity).map(|info| SocketAddr::new(info.address, port))
    }

    /// Command endpoints of every known robot
    pub fn all_command_addrs(&self, port: u16) -> Vec<SocketAddr> {
        self.robots
            .values()
            .map(|info| SocketAddr::new(info.address, port))
            .collect()
    }

    /// Command endpoints for `target`; `None` for an unknown robot
    ///
    /// Fleet-wide datagrams also go to the broadcast address so robots that
    /// dropped out of the registry still receive them.
    pub fn destinations(&self, target: &Target, port: u16) -> Option<Vec<SocketAddr>> {
        match target {
            Target::AllRobots => {
                let mut addrs = self.all_command_addrs(port);
                addrs.push(SocketAddr::from((Ipv4Addr::BROADCAST, port)));
                Some(addrs)
            }
            Target::Robot(id) => self.command_addr(id, port).map(|addr| vec![addr]),
        }
    }

    /// Identities of every known robot, sorted
    pub fn identities(&self) -> Vec<&str> {
        self.robots().into_iter().map(|r| r.identity.as_str()).collect()
    }

    /// Known robots sorted by identity
    pub fn robots(&self) -> Vec<&RobotInfo> {
        let mut robots: Vec<_> = self.robots.values().collect();
        robots.sort_by(|a, b| a.identity.cmp(&b.identity));
        robots
    }

    /// Drop robots silent for longer than `stale_after`; returns their identities
    pub fn remove_stale(&mut self, now: Instant, stale_after: Duration) -> Vec<String> {
        let stale: Vec<String> = self
            .robots
            .iter()
            .filter(|(_, info)| now.saturating_duration_since(info.last_seen) > stale_after)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &stale {
            self.robots.remove(id);
        }
        stale
    }

    pub fn count(&self) -> usize {
        self.robots.len()
    }
}
