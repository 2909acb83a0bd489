//! Math utilities for the differential-drive bot.
//!
//! This module provides the arcade-drive mapping from operator axes to side demands.

pub mod arcade;
