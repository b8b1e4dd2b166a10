use chrono::{DateTime, Local};
use std::fmt;

/// One of the four remote zones, selected by the slider on the IR beacon/remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Channel1 = 0,
    Channel2 = 1,
    Channel3 = 2,
    Channel4 = 3,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Channel1,
        Channel::Channel2,
        Channel::Channel3,
        Channel::Channel4,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Driver attribute holding this channel's raw value (`value0`..`value3`)
    pub fn value_attribute(self) -> String {
        format!("value{}", self.index())
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel {}", self.index() + 1)
    }
}

// Button codes as reported by the IR-REMOTE mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Button {
    RedUp = 1,
    RedDown = 2,
    BlueUp = 3,
    BlueDown = 4,
}

impl Button {
    pub const ALL: [Button; 4] = [
        Button::RedUp,
        Button::RedDown,
        Button::BlueUp,
        Button::BlueDown,
    ];

    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Button::RedUp),
            2 => Some(Button::RedDown),
            3 => Some(Button::BlueUp),
            4 => Some(Button::BlueDown),
            _ => None,
        }
    }

    fn slot(self) -> usize {
        self as usize - 1
    }
}

/// Interpretation of a single raw channel value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    /// No button active on the channel
    Idle,
    Button(Button),
    /// Any other code, e.g. the combination codes 5..=11 the remote sends
    /// when two buttons are held together. These never produce a press or
    /// release event.
    Unknown(u16),
}

impl From<u16> for Reading {
    fn from(value: u16) -> Self {
        if value == 0 {
            return Reading::Idle;
        }
        match Button::from_code(value) {
            Some(button) => Reading::Button(button),
            None => Reading::Unknown(value),
        }
    }
}

/// Raw observation of one channel, produced by a poller
#[derive(Debug, Clone)]
pub struct RawSample {
    pub channel: Channel,
    pub value: u16,
    pub timestamp: DateTime<Local>,
}

impl RawSample {
    pub fn new(channel: Channel, value: u16) -> Self {
        Self {
            channel,
            value,
            timestamp: Local::now(),
        }
    }

    pub fn reading(&self) -> Reading {
        Reading::from(self.value)
    }
}

/// Identity of a button within a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ButtonKey {
    pub channel: Channel,
    pub button: Button,
}

impl ButtonKey {
    pub fn new(channel: Channel, button: Button) -> Self {
        Self { channel, button }
    }

    /// `channel * 10 + button`; unique over the whole domain
    pub fn encode(self) -> u16 {
        self.channel.index() as u16 * 10 + self.button.code()
    }
}

impl fmt::Display for ButtonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{} (#{})", self.button, self.channel, self.encode())
    }
}

/// Pressed/held flags for every (channel, button) pair of one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PressedSet {
    flags: [[bool; 4]; 4],
}

impl PressedSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn is_set(&self, key: ButtonKey) -> bool {
        self.flags[key.channel.index()][key.button.slot()]
    }

    /// Sets the flag, returning whether it was previously clear
    pub fn set(&mut self, key: ButtonKey) -> bool {
        let flag = &mut self.flags[key.channel.index()][key.button.slot()];
        let was_clear = !*flag;
        *flag = true;
        was_clear
    }

    /// Clears the flag, returning whether it was previously set
    pub fn clear(&mut self, key: ButtonKey) -> bool {
        let flag = &mut self.flags[key.channel.index()][key.button.slot()];
        let was_set = *flag;
        *flag = false;
        was_set
    }

    pub fn clear_channel(&mut self, channel: Channel) {
        self.flags[channel.index()] = [false; 4];
    }

    #[cfg(test)]
    fn held_count(&self) -> usize {
        self.flags.iter().flatten().filter(|flag| **flag).count()
    }
}
