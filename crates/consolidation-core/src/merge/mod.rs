pub mod method_merger;

pub use method_merger::{merge_companies, ConsolidatedAccount, ConsolidatedMap, Contribution};
