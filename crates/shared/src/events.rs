use std::collections::VecDeque;
use std::str::FromStr;

use crate::error::Error;

/// Navigation requests sent by controls and page scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapCommand {
    NextSlide,
    PrevSlide,
    ShowHome,
    FlyHome,
}

impl MapCommand {
    pub const ALL: [MapCommand; 4] = [
        MapCommand::NextSlide,
        MapCommand::PrevSlide,
        MapCommand::ShowHome,
        MapCommand::FlyHome,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            MapCommand::NextSlide => "NEXT SLIDE",
            MapCommand::PrevSlide => "PREV SLIDE",
            MapCommand::ShowHome => "SHOW HOME",
            MapCommand::FlyHome => "FLY HOME",
        }
    }
}

impl FromStr for MapCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MapCommand::ALL
            .into_iter()
            .find(|cmd| cmd.wire_name() == s)
            .ok_or_else(|| Error::UnknownCommand(s.to_string()))
    }
}

impl std::fmt::Display for MapCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Notifications the map root emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapEvent {
    /// Engine ready and initial layers, stops and media are in place.
    Loaded,
}

impl MapEvent {
    pub fn wire_name(self) -> &'static str {
        match self {
            MapEvent::Loaded => "MAP LOADED",
        }
    }
}

/// Notifications a declared location sends about itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationEvent {
    Updated,
    Removed,
}

impl LocationEvent {
    pub fn wire_name(self) -> &'static str {
        match self {
            LocationEvent::Updated => "LOCATION UPDATED",
            LocationEvent::Removed => "LOCATION REMOVED",
        }
    }
}

/// FIFO channel of pending commands, drained in submission order.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: VecDeque<MapCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    pub fn push(&mut self, cmd: MapCommand) {
        self.pending.push_back(cmd);
    }

    pub fn pop(&mut self) -> Option<MapCommand> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
