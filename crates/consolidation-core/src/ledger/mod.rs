pub mod model;
pub mod reader;

pub use model::{
    Account, AccountLinks, AccountType, Company, CompanyId, ConsolidationMethod, NormalSide,
    Transaction, TransactionKind,
};
pub use reader::{read_company_ledgers, CompanyLedger, LedgerSource, LocalTrialBalance};
