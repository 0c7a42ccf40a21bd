use std::fmt;

use crate::volume::encode_level;

/// Direction of a relative volume step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Up,
    Down,
}

impl StepDirection {
    /// Direction for a signed delta; `None` for zero or NaN
    pub fn from_delta(delta: f32) -> Option<Self> {
        if delta > 0.0 {
            Some(StepDirection::Up)
        } else if delta < 0.0 {
            Some(StepDirection::Down)
        } else {
            None
        }
    }
}

/// Main zone commands accepted by the goform command endpoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// `MVUP`
    VolumeUp,
    /// `MVDN`
    VolumeDown,
    /// `MV{level}` with the target in display units
    SetVolume(f32),
    /// `MUON`
    MuteOn,
    /// `MUOFF`
    MuteOff,
}

impl Command {
    pub fn step(direction: StepDirection) -> Self {
        match direction {
            StepDirection::Up => Command::VolumeUp,
            StepDirection::Down => Command::VolumeDown,
        }
    }

    pub fn mute(muted: bool) -> Self {
        if muted {
            Command::MuteOn
        } else {
            Command::MuteOff
        }
    }

    /// The query string sent to the receiver
    pub fn token(&self) -> String {
        match self {
            Command::VolumeUp => "MVUP".to_string(),
            Command::VolumeDown => "MVDN".to_string(),
            Command::SetVolume(display) => format!("MV{}", encode_level(*display)),
            Command::MuteOn => "MUON".to_string(),
            Command::MuteOff => "MUOFF".to_string(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}
