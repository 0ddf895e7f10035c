use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ledger::model::{Account, Company, CompanyId, NormalSide, Transaction, TransactionKind};
use crate::types::{Money, TOLERANCE};
use crate::ConsolidationResult;

// ---------------------------------------------------------------------------
// External ledger seam
// ---------------------------------------------------------------------------

/// Read-only view over the group's ledger store. Implementations are expected
/// to bound their own I/O; the engine never writes back through this seam.
pub trait LedgerSource {
    fn fetch_accounts(
        &self,
        company: &CompanyId,
        as_of: NaiveDate,
    ) -> ConsolidationResult<Vec<Account>>;

    fn fetch_transactions(
        &self,
        company: &CompanyId,
        as_of: NaiveDate,
        kinds: &[TransactionKind],
    ) -> ConsolidationResult<Vec<Transaction>>;
}

// ---------------------------------------------------------------------------
// Per-company snapshot
// ---------------------------------------------------------------------------

/// One row of a single company's local trial balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalTrialBalanceRow {
    pub code: String,
    pub name: String,
    pub debit: Money,
    pub credit: Money,
}

/// Debit/credit split of one company's accounts, by normal-balance side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalTrialBalance {
    pub rows: Vec<LocalTrialBalanceRow>,
    pub total_debits: Money,
    pub total_credits: Money,
}

/// Everything the engine reads for one company as of the consolidation date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyLedger {
    pub company: Company,
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
    pub trial_balance: LocalTrialBalance,
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Fetch accounts and consolidation-relevant transactions for every company.
///
/// A company whose ledger cannot be reached degrades to an empty dataset with
/// a warning; partial consolidation is preferable to aborting the whole run.
pub fn read_company_ledgers(
    source: &dyn LedgerSource,
    companies: &[Company],
    as_of: NaiveDate,
) -> (Vec<CompanyLedger>, Vec<String>) {
    let mut ledgers = Vec::with_capacity(companies.len());
    let mut warnings = Vec::new();

    for company in companies {
        let accounts = match source.fetch_accounts(&company.id, as_of) {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!(company = %company.id, error = %e, "ledger accounts unavailable");
                warnings.push(format!(
                    "Company {}: accounts unavailable ({e}); consolidating with empty ledger",
                    company.id
                ));
                Vec::new()
            }
        };

        let transactions = match source.fetch_transactions(
            &company.id,
            as_of,
            &TransactionKind::CONSOLIDATION_RELEVANT,
        ) {
            Ok(txns) => txns,
            Err(e) => {
                warn!(company = %company.id, error = %e, "ledger transactions unavailable");
                warnings.push(format!(
                    "Company {}: transactions unavailable ({e}); elimination detection limited",
                    company.id
                ));
                Vec::new()
            }
        };

        // Filter defensively even if the source honours the query.
        let transactions: Vec<Transaction> = transactions
            .into_iter()
            .filter(|t| {
                t.date <= as_of && TransactionKind::CONSOLIDATION_RELEVANT.contains(&t.kind)
            })
            .collect();

        let trial_balance = local_trial_balance(&accounts);
        let imbalance = (trial_balance.total_debits - trial_balance.total_credits).abs();
        if imbalance >= TOLERANCE {
            warn!(company = %company.id, %imbalance, "local trial balance out of balance");
            warnings.push(format!(
                "Company {}: local trial balance out of balance by {imbalance} before consolidation",
                company.id
            ));
        }

        ledgers.push(CompanyLedger {
            company: company.clone(),
            accounts,
            transactions,
            trial_balance,
        });
    }

    (ledgers, warnings)
}

/// Split account balances into debit/credit columns by normal side.
pub fn local_trial_balance(accounts: &[Account]) -> LocalTrialBalance {
    let mut rows = Vec::with_capacity(accounts.len());
    let mut total_debits = Decimal::ZERO;
    let mut total_credits = Decimal::ZERO;

    for account in accounts {
        let (debit, credit) = match account.normal_side {
            NormalSide::Debit => (account.balance, Decimal::ZERO),
            NormalSide::Credit => (Decimal::ZERO, account.balance),
        };
        total_debits += debit;
        total_credits += credit;
        rows.push(LocalTrialBalanceRow {
            code: account.code.clone(),
            name: account.name.clone(),
            debit,
            credit,
        });
    }

    LocalTrialBalance {
        rows,
        total_debits,
        total_credits,
    }
}
