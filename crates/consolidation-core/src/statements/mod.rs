pub mod generator;

pub use generator::{
    generate_statements, BalanceSheet, CashFlowStatement, ConsolidatedTrialBalance,
    EliminationsSummary, FinancialStatements, IncomeStatement, Worksheet, TOLERANCE,
};
