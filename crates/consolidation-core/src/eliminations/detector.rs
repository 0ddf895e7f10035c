use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::fx::translator::TranslatedCompany;
use crate::ledger::model::{AccountType, CompanyId, ConsolidationMethod, TransactionKind};
use crate::types::Money;

// ---------------------------------------------------------------------------
// Canonical elimination accounts
// ---------------------------------------------------------------------------

pub const INTERCOMPANY_RECEIVABLE: &str = "Intercompany Receivable";
pub const INTERCOMPANY_PAYABLE: &str = "Intercompany Payable";
pub const INTERCOMPANY_REVENUE: &str = "Intercompany Revenue";
pub const INTERCOMPANY_EXPENSE: &str = "Intercompany Expense";
/// Fallback label when a dividend payer account cannot be located at
/// detection time; such candidates surface as unresolved at processing time.
pub const INTERCOMPANY_DIVIDEND: &str = "Intercompany Dividend";

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EliminationKind {
    ReceivablePayable,
    RevenueExpense,
    InvestmentEquity,
    Dividend,
}

/// A detected intercompany adjustment. Candidates are always emitted, even
/// when a counterpart account may not resolve, so the audit trail is
/// complete; unapplicable ones are skipped by the processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EliminationEntry {
    pub description: String,
    pub source_company: CompanyId,
    pub target_company: CompanyId,
    /// Account on the source side: a canonical elimination account name, or a
    /// concrete account code for investment and dividend candidates.
    pub source_account: String,
    /// Counterpart account on the target side.
    pub target_account: String,
    pub amount: Money,
    pub kind: EliminationKind,
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Scan the translated dataset for intercompany relationships. Pure; emits
/// candidates in a deterministic order (transaction pass, dividend pass,
/// investment pass), each in company order.
pub fn detect_eliminations(translated: &[TranslatedCompany]) -> Vec<EliminationEntry> {
    let in_set: HashSet<&CompanyId> = translated.iter().map(|tc| &tc.company.id).collect();
    let mut entries = Vec::new();

    cross_company_transaction_pass(translated, &in_set, &mut entries);
    dividend_pass(translated, &in_set, &mut entries);
    investment_pass(translated, &mut entries);

    entries
}

/// Transactions whose counterpart entity is another company in the set map to
/// canonical elimination accounts by transaction type.
fn cross_company_transaction_pass(
    translated: &[TranslatedCompany],
    in_set: &HashSet<&CompanyId>,
    entries: &mut Vec<EliminationEntry>,
) {
    for tc in translated {
        for tt in &tc.transactions {
            let Some(counterparty) = &tt.transaction.counterparty else {
                continue;
            };
            if counterparty == &tc.company.id || !in_set.contains(counterparty) {
                continue;
            }

            let entry = match tt.transaction.kind {
                TransactionKind::CustomerInvoice | TransactionKind::VendorInvoice => {
                    EliminationEntry {
                        description: format!(
                            "Intercompany receivable/payable: {} ↔ {} ({})",
                            tc.company.id, counterparty, tt.transaction.amount
                        ),
                        source_company: tc.company.id.clone(),
                        target_company: counterparty.clone(),
                        source_account: INTERCOMPANY_RECEIVABLE.to_string(),
                        target_account: INTERCOMPANY_PAYABLE.to_string(),
                        amount: tt.transaction.amount,
                        kind: EliminationKind::ReceivablePayable,
                    }
                }
                TransactionKind::JournalEntry => EliminationEntry {
                    description: format!(
                        "Intercompany revenue/expense: {} ↔ {} ({})",
                        tc.company.id, counterparty, tt.transaction.amount
                    ),
                    source_company: tc.company.id.clone(),
                    target_company: counterparty.clone(),
                    source_account: INTERCOMPANY_REVENUE.to_string(),
                    target_account: INTERCOMPANY_EXPENSE.to_string(),
                    amount: tt.transaction.amount,
                    kind: EliminationKind::RevenueExpense,
                },
            };
            entries.push(entry);
        }
    }
}

/// Dividend candidates are emitted from the receiver's side only (the
/// revenue-type account linked to the payer), so one intercompany dividend
/// never yields two candidates.
fn dividend_pass(
    translated: &[TranslatedCompany],
    in_set: &HashSet<&CompanyId>,
    entries: &mut Vec<EliminationEntry>,
) {
    for tc in translated {
        for ta in &tc.accounts {
            if ta.account.account_type != AccountType::Revenue || ta.account.balance.is_zero() {
                continue;
            }
            let Some(payer) = &ta.account.links.dividend_counterparty else {
                continue;
            };
            if payer == &tc.company.id || !in_set.contains(payer) {
                continue;
            }

            // Locate the payer's distribution account for the processor.
            let payer_account = translated
                .iter()
                .find(|other| &other.company.id == payer)
                .and_then(|other| {
                    other.accounts.iter().find(|pa| {
                        pa.account.account_type != AccountType::Revenue
                            && pa.account.links.dividend_counterparty.as_ref()
                                == Some(&tc.company.id)
                    })
                })
                .map(|pa| pa.account.code.clone())
                .unwrap_or_else(|| INTERCOMPANY_DIVIDEND.to_string());

            entries.push(EliminationEntry {
                description: format!(
                    "Intercompany dividend: {} → {} ({})",
                    payer, tc.company.id, ta.account.balance
                ),
                source_company: tc.company.id.clone(),
                target_company: payer.clone(),
                source_account: ta.account.code.clone(),
                target_account: payer_account,
                amount: ta.account.balance,
                kind: EliminationKind::Dividend,
            });
        }
    }
}

/// For each company owned below 100%, eliminate the parent's recorded
/// investment against the ownership share of the subsidiary's equity. The
/// amount is capped at the recorded investment balance so no more is
/// eliminated than was actually invested.
fn investment_pass(translated: &[TranslatedCompany], entries: &mut Vec<EliminationEntry>) {
    for target in translated {
        if target.company.ownership_pct >= dec!(100) {
            continue;
        }

        let holder = translated.iter().find_map(|tc| {
            if tc.company.ownership_pct != dec!(100)
                || tc.company.method != ConsolidationMethod::Full
            {
                return None;
            }
            tc.accounts
                .iter()
                .find(|ta| ta.account.links.investment_in.as_ref() == Some(&target.company.id))
                .map(|ta| (tc, ta))
        });

        let Some((holder_tc, investment)) = holder else {
            continue;
        };

        let target_equity = target.net_assets();
        let ownership_share = target_equity * target.company.ownership_pct / dec!(100);
        let amount = investment.account.balance.min(ownership_share);

        entries.push(EliminationEntry {
            description: format!(
                "Investment elimination: {} investment in {} ({})",
                holder_tc.company.id, target.company.id, amount
            ),
            source_company: holder_tc.company.id.clone(),
            target_company: target.company.id.clone(),
            source_account: investment.account.code.clone(),
            target_account: String::new(),
            amount,
            kind: EliminationKind::InvestmentEquity,
        });
    }
}
