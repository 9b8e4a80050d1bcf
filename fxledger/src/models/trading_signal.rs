use std::fmt;
use std::str::FromStr;

use crate::pairs::CurrencyPair;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Bullish,
    Bearish,
    Neutral,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Bullish => "bullish",
            Label::Bearish => "bearish",
            Label::Neutral => "neutral",
        }
    }

    pub fn polarity(&self) -> i8 {
        match self {
            Label::Bullish => 1,
            Label::Bearish => -1,
            Label::Neutral => 0,
        }
    }

    pub fn is_directional(&self) -> bool {
        *self != Label::Neutral
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// Accepts both vocabularies in use: bullish/bearish and positive/negative.
impl FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bullish" | "positive" => Ok(Label::Bullish),
            "bearish" | "negative" => Ok(Label::Bearish),
            "neutral" => Ok(Label::Neutral),
            other => Err(format!("unknown label '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Long,
    Short,
    Neutral,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Long => "LONG",
            Signal::Short => "SHORT",
            Signal::Neutral => "NEUTRAL",
        }
    }

    // +1.0 captures the raw price move, -1.0 captures its negation
    pub fn direction(&self) -> f64 {
        match self {
            Signal::Long => 1.0,
            Signal::Short => -1.0,
            Signal::Neutral => 0.0,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LONG" => Ok(Signal::Long),
            "SHORT" => Ok(Signal::Short),
            "NEUTRAL" => Ok(Signal::Neutral),
            other => Err(format!("unknown signal '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sentiment {
    pub label: Label,
    pub confidence: f64, // in [0, 1]
}

impl Sentiment {
    pub fn new(label: Label, confidence: f64) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Sentiment { label, confidence }
    }

    pub fn neutral() -> Self {
        Sentiment::new(Label::Neutral, 0.0)
    }
}

/// Which side of the pair the text talked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionedSide {
    Base,
    Quote,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradingSignal {
    pub pair: CurrencyPair,
    pub sentiment: Sentiment,
    pub side: MentionedSide,
    pub signal: Signal,
}

// direction = sign(label) XOR (mentioned side is the quote currency)
pub fn derive_signal(label: Label, side: MentionedSide) -> Signal {
    let polarity = match side {
        MentionedSide::Base => label.polarity(),
        MentionedSide::Quote => -label.polarity(),
    };
    match polarity {
        1 => Signal::Long,
        -1 => Signal::Short,
        _ => Signal::Neutral,
    }
}
