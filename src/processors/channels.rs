//! Fluorescence channel selection.
//!
//! A SubCell model is trained on a fixed subset of the four stains. The subset
//! is configured as a string of channel letters (`rybg`, `rbg`, `ybg`, `bg`, ...)
//! and always loaded in red, yellow, blue, green order.

use crate::core::{SubCellError, SubCellResult};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// One fluorescence channel of a cell image set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Channel {
    /// Microtubule stain.
    Red,
    /// Endoplasmic reticulum stain.
    Yellow,
    /// Nucleus stain.
    Blue,
    /// Protein of interest.
    Green,
}

impl Channel {
    /// All channels in manifest column order.
    pub const ALL: [Channel; 4] = [Channel::Red, Channel::Yellow, Channel::Blue, Channel::Green];

    /// The letter used for this channel in channel-set strings.
    pub fn letter(self) -> char {
        match self {
            Channel::Red => 'r',
            Channel::Yellow => 'y',
            Channel::Blue => 'b',
            Channel::Green => 'g',
        }
    }

    /// Index of this channel's path column in a manifest row.
    pub fn column(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Yellow => 1,
            Channel::Blue => 2,
            Channel::Green => 3,
        }
    }

    fn from_letter(letter: char) -> Option<Self> {
        Channel::ALL.into_iter().find(|c| c.letter() == letter)
    }
}

/// The subset of channels a model consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelSet {
    mask: [bool; 4],
}

impl ChannelSet {
    /// Returns true if the set includes the given channel.
    pub fn contains(&self, channel: Channel) -> bool {
        self.mask[channel.column()]
    }

    /// Iterates the selected channels in red, yellow, blue, green order.
    pub fn iter(&self) -> impl Iterator<Item = Channel> + use<> {
        let set = *self;
        Channel::ALL.into_iter().filter(move |c| set.contains(*c))
    }

    /// Number of selected channels.
    pub fn len(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    /// Returns true if no channel is selected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromStr for ChannelSet {
    type Err = SubCellError;

    fn from_str(s: &str) -> SubCellResult<Self> {
        let mut set = ChannelSet::default();
        for letter in s.trim().chars() {
            let channel = Channel::from_letter(letter.to_ascii_lowercase()).ok_or_else(|| {
                SubCellError::config_error_with_context(
                    "model_channels",
                    s,
                    &format!("unknown channel letter '{letter}', expected any of r, y, b, g"),
                )
            })?;
            set.mask[channel.column()] = true;
        }
        if set.is_empty() {
            return Err(SubCellError::config_error_with_context(
                "model_channels",
                s,
                "at least one channel is required",
            ));
        }
        Ok(set)
    }
}

impl fmt::Display for ChannelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for channel in self.iter() {
            write!(f, "{}", channel.letter())?;
        }
        Ok(())
    }
}

impl Serialize for ChannelSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_set() {
        let set: ChannelSet = "rybg".parse().unwrap();
        assert_eq!(set.len(), 4);
        assert_eq!(set.to_string(), "rybg");
    }

    #[test]
    fn test_parse_subset_keeps_column_order() {
        let set: ChannelSet = "br".parse().unwrap();
        let channels: Vec<Channel> = set.iter().collect();
        assert_eq!(channels, vec![Channel::Red, Channel::Blue]);
        assert!(!set.contains(Channel::Yellow));
        assert!(!set.contains(Channel::Green));
        assert_eq!(set.to_string(), "rb");
    }

    #[test]
    fn test_parse_rejects_unknown_letter() {
        let err = "rxb".parse::<ChannelSet>().unwrap_err();
        assert!(err.to_string().contains("'x'"));
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!("".parse::<ChannelSet>().is_err());
        assert!("  ".parse::<ChannelSet>().is_err());
    }
}
