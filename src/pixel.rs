//! Quantized and normalized pixel representations.
//!
//! The raster engine stores channels as bounded integers in `[0, Q]`, where
//! `Q` is the engine's quantum maximum and varies by engine build. `Q` is
//! therefore carried as a runtime value ([`Quantum`]) and threaded through
//! every conversion; nothing in this crate assumes a channel width at compile
//! time.

use serde::{Deserialize, Serialize};

/// Runtime-queried maximum value of one quantized channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantum(pub u32);

impl Quantum {
    pub const EIGHT_BIT: Quantum = Quantum(255);
    pub const SIXTEEN_BIT: Quantum = Quantum(65_535);

    fn scale(self) -> f64 {
        f64::from(self.0)
    }
}

/// One color channel of a pixel.
///
/// `Alpha` here is transmittance: 0 is fully transparent. The inverse
/// "opacity" convention (0 is fully opaque) appears only through
/// [`Pixel::opacity`] / [`Pixel::set_opacity`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    Red,
    Green,
    Blue,
    Alpha,
}

impl Channel {
    pub const RGB: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    /// Index of this channel in an rgb triple; `None` for `Alpha`.
    pub fn rgb_index(self) -> Option<usize> {
        match self {
            Channel::Red => Some(0),
            Channel::Green => Some(1),
            Channel::Blue => Some(2),
            Channel::Alpha => None,
        }
    }

    fn bit(self) -> u8 {
        match self {
            Channel::Red => 1,
            Channel::Green => 1 << 1,
            Channel::Blue => 1 << 2,
            Channel::Alpha => 1 << 3,
        }
    }
}

/// Set of channels a traversal is allowed to recompute; every channel outside
/// the mask passes through unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMask(u8);

impl ChannelMask {
    pub const EMPTY: ChannelMask = ChannelMask(0);
    pub const RGB: ChannelMask = ChannelMask(0b0111);
    pub const ALL: ChannelMask = ChannelMask(0b1111);

    pub fn of(channels: &[Channel]) -> Self {
        let mut mask = 0u8;
        for ch in channels {
            mask |= ch.bit();
        }
        ChannelMask(mask)
    }

    pub fn with(self, channel: Channel) -> Self {
        ChannelMask(self.0 | channel.bit())
    }

    pub fn contains(self, channel: Channel) -> bool {
        self.0 & channel.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// One quantized pixel, channels in `[0, Q]`, alpha as transmittance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pixel {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
    pub alpha: u32,
}

impl Pixel {
    pub fn new(red: u32, green: u32, blue: u32, alpha: u32) -> Self {
        Pixel {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub fn channel(self, channel: Channel) -> u32 {
        match channel {
            Channel::Red => self.red,
            Channel::Green => self.green,
            Channel::Blue => self.blue,
            Channel::Alpha => self.alpha,
        }
    }

    fn set_channel(&mut self, channel: Channel, value: u32) {
        match channel {
            Channel::Red => self.red = value,
            Channel::Green => self.green = value,
            Channel::Blue => self.blue = value,
            Channel::Alpha => self.alpha = value,
        }
    }

    /// Opacity is the inverse of alpha: `Q - alpha`, 0 meaning fully opaque.
    pub fn opacity(self, q: Quantum) -> u32 {
        q.0.saturating_sub(self.alpha)
    }

    pub fn set_opacity(&mut self, q: Quantum, opacity: u32) {
        self.alpha = q.0.saturating_sub(opacity.min(q.0));
    }

    /// All four channels rescaled to `[0.0, 1.0]` doubles.
    pub fn to_normalized(self, q: Quantum) -> [f64; 4] {
        let scale = q.scale();
        [
            f64::from(self.red) / scale,
            f64::from(self.green) / scale,
            f64::from(self.blue) / scale,
            f64::from(self.alpha) / scale,
        ]
    }

    /// Quantize four normalized channels back into a pixel. Out-of-range
    /// input is clamped, never rejected.
    pub fn from_normalized(values: [f64; 4], q: Quantum) -> Pixel {
        Pixel {
            red: quantize(values[0], q),
            green: quantize(values[1], q),
            blue: quantize(values[2], q),
            alpha: quantize(values[3], q),
        }
    }

    /// Write only the channels present in `mask`; the rest of `self` is left
    /// untouched. The destination pixel starts as a copy of the source pixel,
    /// so an unmasked channel stays byte-identical to that seed.
    pub fn apply_normalized_masked(&mut self, values: [f64; 4], mask: ChannelMask, q: Quantum) {
        for (i, ch) in [Channel::Red, Channel::Green, Channel::Blue, Channel::Alpha]
            .into_iter()
            .enumerate()
        {
            if mask.contains(ch) {
                self.set_channel(ch, quantize(values[i], q));
            }
        }
    }
}

/// High-precision reference color: channels already stored as normalized
/// doubles, so conversion only clamps on construction, never rescales.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefColor {
    rgb: [f64; 3],
}

impl RefColor {
    pub fn new(red: f64, green: f64, blue: f64) -> Self {
        RefColor {
            rgb: [clamp01(red), clamp01(green), clamp01(blue)],
        }
    }

    pub fn rgb(self) -> [f64; 3] {
        self.rgb
    }
}

pub(crate) fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

fn quantize(value: f64, q: Quantum) -> u32 {
    let scaled = (clamp01(value) * q.scale()).round();
    (scaled as u32).min(q.0)
}
