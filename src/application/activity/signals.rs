//! User activity signals

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::application::events::{EventBus, EventSubscriber};

/// Kinds of user input that count as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySignal {
    PointerDown,
    PointerMove,
    KeyDown,
    Scroll,
    TouchStart,
    Click,
}

impl ActivitySignal {
    pub const ALL: [ActivitySignal; 6] = [
        ActivitySignal::PointerDown,
        ActivitySignal::PointerMove,
        ActivitySignal::KeyDown,
        ActivitySignal::Scroll,
        ActivitySignal::TouchStart,
        ActivitySignal::Click,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivitySignal::PointerDown => "pointer_down",
            ActivitySignal::PointerMove => "pointer_move",
            ActivitySignal::KeyDown => "key_down",
            ActivitySignal::Scroll => "scroll",
            ActivitySignal::TouchStart => "touch_start",
            ActivitySignal::Click => "click",
        }
    }
}

impl fmt::Display for ActivitySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivitySignal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivitySignal::ALL
            .iter()
            .find(|signal| signal.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown activity signal: {}", s))
    }
}

/// Broadcast source of activity signals. Hosts emit into it from their
/// input handling; monitors listen.
#[derive(Clone)]
pub struct ActivityFeed {
    bus: EventBus<ActivitySignal>,
}

impl ActivityFeed {
    pub fn new() -> Self {
        Self {
            bus: EventBus::new("activity"),
        }
    }

    pub fn emit(&self, signal: ActivitySignal) {
        self.bus.publish(signal);
    }

    pub fn subscribe(&self) -> EventSubscriber<ActivitySignal> {
        self.bus.subscribe()
    }

    pub fn listeners(&self) -> usize {
        self.bus.subscriber_count()
    }
}

impl Default for ActivityFeed {
    fn default() -> Self {
        Self::new()
    }
}
