pub mod calculator;

pub use calculator::{calculate_minority_interest, MinorityInterest, MinorityInterestRecord};
