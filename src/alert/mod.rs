//! Safety tiers, proximity zones, and the alert that follows from them.
//!
//! - `thresholds`: age → safety tier.
//! - `zones`: tier + distance → alert zone, plus on-site detection.
//! - `notify`: one notification for the most severe non-empty zone.

pub mod notify;
pub mod thresholds;
pub mod zones;
