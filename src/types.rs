//! Core types for spark-fasteners.
//!
//! These are the small value types every fastener shares: precedence levels,
//! flag words, logical time, identity, and construction options.

use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

use crate::error::FastenerError;

// =============================================================================
// Timestamp
// =============================================================================

/// Logical time of an update pass, in milliseconds.
///
/// All fasteners recohered during one frame share the same timestamp.
pub type Timestamp = u64;

// =============================================================================
// Affinity - Precedence of a value assignment
// =============================================================================

/// How strongly a fastener holds on to its current value.
///
/// Lower affinities are more easily overridden. An inlet may only force an
/// outlet into derived mode when its effective affinity (clamped to at most
/// [`Affinity::Intrinsic`]) is at least the outlet's affinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Affinity {
    /// Never explicitly set. Anything may override it.
    #[default]
    Transient,
    /// Set from outside the owning component (props, inherited defaults).
    Extrinsic,
    /// Set by the owning component itself.
    Intrinsic,
    /// Deliberately pinned. Inlets never override it.
    Reflexive,
}

impl Affinity {
    /// Affinity this fastener exerts on its outlets.
    ///
    /// `Reflexive` is local to the cell that holds it and propagates as `Intrinsic`.
    pub fn effective(self) -> Self {
        self.min(Affinity::Intrinsic)
    }

    /// Whether a fastener at `self` may force an outlet at `outlet` into derived mode.
    pub fn overrides(self, outlet: Affinity) -> bool {
        self.effective() >= outlet
    }
}

// =============================================================================
// Fastener Flags (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Core state bits shared by every fastener.
    ///
    /// Specializations keep their own flag words (see
    /// [`ConstraintFlags`](crate::constraint::ConstraintFlags)) instead of
    /// claiming bits here.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FastenerFlags: u8 {
        const NONE = 0;
        /// Value is sourced from the inlet rather than a direct assignment.
        const DERIVED = 1 << 0;
        /// A recohere is pending.
        const DECOHERENT = 1 << 1;
        /// May bind to an inlet at all.
        const INHERITS = 1 << 2;
        /// The owner is mounted; a scheduler context is attached.
        const MOUNTED = 1 << 3;
    }
}

// =============================================================================
// Fastener Identity
// =============================================================================

/// Stable identity of a fastener, used to deduplicate outlet lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FastenerId(u64);

thread_local! {
    static NEXT_FASTENER_ID: Cell<u64> = const { Cell::new(1) };
}

impl FastenerId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        NEXT_FASTENER_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            FastenerId(id)
        })
    }

    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FastenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Fastener Config
// =============================================================================

/// Construction options shared by all fastener kinds.
///
/// # Example
///
/// ```
/// use spark_fasteners::{Affinity, FastenerConfig};
///
/// let config = FastenerConfig::default()
///     .with_affinity(Affinity::Intrinsic)
///     .with_inherits(false);
/// assert!(!config.inherits);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastenerConfig {
    /// Initial affinity of the cell.
    pub affinity: Affinity,
    /// Whether the cell may derive from an inlet.
    pub inherits: bool,
}

impl Default for FastenerConfig {
    fn default() -> Self {
        Self {
            affinity: Affinity::Transient,
            inherits: true,
        }
    }
}

impl FastenerConfig {
    /// Set the initial affinity.
    pub fn with_affinity(mut self, affinity: Affinity) -> Self {
        self.affinity = affinity;
        self
    }

    /// Set whether the cell may derive from an inlet.
    pub fn with_inherits(mut self, inherits: bool) -> Self {
        self.inherits = inherits;
        self
    }

    pub(crate) fn flags(&self) -> FastenerFlags {
        if self.inherits {
            FastenerFlags::INHERITS
        } else {
            FastenerFlags::NONE
        }
    }
}

// =============================================================================
// Length - Numeric style value
// =============================================================================

/// Unit of a [`Length`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthUnit {
    #[default]
    Px,
    Pct,
    Em,
}

impl LengthUnit {
    fn suffix(self) -> &'static str {
        match self {
            LengthUnit::Px => "px",
            LengthUnit::Pct => "%",
            LengthUnit::Em => "em",
        }
    }
}

/// A CSS length: a number and a unit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Length {
    pub value: f64,
    pub unit: LengthUnit,
}

impl Length {
    pub const ZERO: Length = Length { value: 0.0, unit: LengthUnit::Px };

    pub fn px(value: f64) -> Self {
        Self { value, unit: LengthUnit::Px }
    }

    pub fn pct(value: f64) -> Self {
        Self { value, unit: LengthUnit::Pct }
    }

    pub fn em(value: f64) -> Self {
        Self { value, unit: LengthUnit::Em }
    }

    /// Render as a CSS value string (`"12px"`, `"50%"`).
    pub fn to_css(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

impl FromStr for Length {
    type Err = FastenerError;

    /// Parse `"12px"`, `"50%"`, `"1.5em"`, or a bare number (pixels).
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let s = input.trim();
        let (number, unit) = if let Some(n) = s.strip_suffix("px") {
            (n, LengthUnit::Px)
        } else if let Some(n) = s.strip_suffix('%') {
            (n, LengthUnit::Pct)
        } else if let Some(n) = s.strip_suffix("em") {
            (n, LengthUnit::Em)
        } else {
            (s, LengthUnit::Px)
        };
        let value: f64 = number.trim().parse().map_err(|_| FastenerError::Parse {
            input: input.to_string(),
            reason: "expected a number with an optional px, % or em unit".to_string(),
        })?;
        if !value.is_finite() {
            return Err(FastenerError::Parse {
                input: input.to_string(),
                reason: "length must be finite".to_string(),
            });
        }
        Ok(Length { value, unit })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affinity_ordering() {
        assert!(Affinity::Transient < Affinity::Extrinsic);
        assert!(Affinity::Extrinsic < Affinity::Intrinsic);
        assert!(Affinity::Intrinsic < Affinity::Reflexive);
    }

    #[test]
    fn test_affinity_override_is_clamped() {
        assert!(Affinity::Intrinsic.overrides(Affinity::Extrinsic));
        assert!(Affinity::Intrinsic.overrides(Affinity::Intrinsic));
        assert!(!Affinity::Intrinsic.overrides(Affinity::Reflexive));
        // Reflexive inlets exert only Intrinsic precedence downstream
        assert!(!Affinity::Reflexive.overrides(Affinity::Reflexive));
        assert!(!Affinity::Transient.overrides(Affinity::Extrinsic));
    }

    #[test]
    fn test_fastener_ids_are_unique() {
        let a = FastenerId::next();
        let b = FastenerId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn test_config_flags() {
        assert_eq!(FastenerConfig::default().flags(), FastenerFlags::INHERITS);
        assert_eq!(
            FastenerConfig::default().with_inherits(false).flags(),
            FastenerFlags::NONE
        );
    }

    #[test]
    fn test_length_parse() {
        assert_eq!("12px".parse::<Length>().ok(), Some(Length::px(12.0)));
        assert_eq!("50%".parse::<Length>().ok(), Some(Length::pct(50.0)));
        assert_eq!(" 1.5em ".parse::<Length>().ok(), Some(Length::em(1.5)));
        assert_eq!("7".parse::<Length>().ok(), Some(Length::px(7.0)));
        assert!("wide".parse::<Length>().is_err());
        assert!("px".parse::<Length>().is_err());
    }

    #[test]
    fn test_length_to_css() {
        assert_eq!(Length::px(12.0).to_css(), "12px");
        assert_eq!(Length::pct(50.5).to_css(), "50.5%");
    }
}
