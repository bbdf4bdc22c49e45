use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use super::error::ModelError;

/// Frames aggregated by the views. Ranges are inclusive on both ends.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FrameSelection {
    Single { frame: usize },
    Range { begin: usize, end: usize },
}

impl FrameSelection {
    pub fn full(total_frames: usize) -> Self {
        Self::Range {
            begin: 0,
            end: total_frames.saturating_sub(1),
        }
    }

    pub fn bounds(self) -> (usize, usize) {
        match self {
            Self::Single { frame } => (frame, frame),
            Self::Range { begin, end } => (begin, end),
        }
    }

    pub(super) fn validate(self, total_frames: usize) -> Result<(), ModelError> {
        let (begin, end) = self.bounds();
        let reason = if begin > end {
            Some(format!("begin {begin} is after end {end}"))
        } else if end >= total_frames {
            Some(format!("frame {end} is outside [0, {total_frames})"))
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ModelError::InvalidFrameSelection {
                selection: self,
                reason,
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for FrameSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single { frame } => write!(f, "frame {frame}"),
            Self::Range { begin, end } => write!(f, "frames {begin}..={end}"),
        }
    }
}

/// Parses `7` as a single frame and `2:9` as an inclusive range.
impl FromStr for FrameSelection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|error| format!("invalid frame index `{part}`: {error}"))
        };

        match value.split_once(':') {
            Some((begin, end)) => Ok(Self::Range {
                begin: parse(begin)?,
                end: parse(end)?,
            }),
            None => Ok(Self::Single {
                frame: parse(value)?,
            }),
        }
    }
}

/// Per-edge presence flags with a prefix sum so any inclusive range is
/// counted in constant time. Derived from topology only.
#[derive(Clone, Debug)]
pub(super) struct Presence {
    flags: Vec<bool>,
    prefix: Vec<u32>,
}

impl Presence {
    pub(super) fn new(flags: Vec<bool>) -> Self {
        let mut prefix = Vec::with_capacity(flags.len() + 1);
        prefix.push(0);
        let mut running = 0u32;
        for &present in &flags {
            running += u32::from(present);
            prefix.push(running);
        }

        Self { flags, prefix }
    }

    pub(super) fn count(&self, selection: FrameSelection) -> u32 {
        let (begin, end) = selection.bounds();
        let last = self.flags.len();
        if begin >= last {
            return 0;
        }
        let end = end.min(last - 1);
        self.prefix[end + 1] - self.prefix[begin]
    }
}
