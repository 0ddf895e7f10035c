use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Currency, Money, Percent};

// ---------------------------------------------------------------------------
// Companies
// ---------------------------------------------------------------------------

/// Opaque company identifier, unique within a consolidation group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompanyId(pub String);

impl CompanyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How much of a company's financial statements enters the consolidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsolidationMethod {
    /// 100% of every account balance, with minority interest carved out.
    Full,
    /// Ownership-weighted share of every account balance.
    Proportional,
    /// Single-line investment equal to the ownership share of net income.
    Equity,
}

/// A participant in the consolidation. Immutable input to a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub currency: Currency,
    /// Percentage held by the consolidating parent, 0–100.
    pub ownership_pct: Percent,
    pub method: ConsolidationMethod,
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountType {
    /// Conventional normal-balance side for the account type.
    pub fn normal_side(&self) -> NormalSide {
        match self {
            AccountType::Asset | AccountType::Expense => NormalSide::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Revenue => {
                NormalSide::Credit
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalSide {
    Debit,
    Credit,
}

/// Typed intercompany relationships attached to an account. These replace
/// free-form metadata tags so elimination matching is a structured join.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountLinks {
    /// Counterparty company for intercompany receivable/payable or
    /// revenue/expense positions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intercompany_with: Option<CompanyId>,
    /// Company this account records an equity investment in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub investment_in: Option<CompanyId>,
    /// Counterparty for intercompany dividends (payer on the income side,
    /// receiver on the distribution side).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_counterparty: Option<CompanyId>,
}

impl AccountLinks {
    pub fn is_empty(&self) -> bool {
        self.intercompany_with.is_none()
            && self.investment_in.is_none()
            && self.dividend_counterparty.is_none()
    }
}

/// A ledger account belonging to one company. Read-only snapshot as of the
/// consolidation date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique within the owning company.
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub normal_side: NormalSide,
    pub balance: Money,
    #[serde(default, skip_serializing_if = "AccountLinks::is_empty")]
    pub links: AccountLinks,
}

impl Account {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        account_type: AccountType,
        balance: Money,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            account_type,
            normal_side: account_type.normal_side(),
            balance,
            links: AccountLinks::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Posted transaction types that participate in consolidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    JournalEntry,
    CustomerInvoice,
    VendorInvoice,
}

impl TransactionKind {
    /// The transaction types a consolidation run reads from the ledger.
    pub const CONSOLIDATION_RELEVANT: [TransactionKind; 3] = [
        TransactionKind::JournalEntry,
        TransactionKind::CustomerInvoice,
        TransactionKind::VendorInvoice,
    ];
}

/// A posted financial event. Used only for elimination detection; balances
/// come from [`Account`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub kind: TransactionKind,
    /// Counterpart entity, when the transaction crosses company boundaries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<CompanyId>,
    pub amount: Money,
    pub date: NaiveDate,
}
