use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::eliminations::detector::{
    EliminationEntry, EliminationKind, INTERCOMPANY_EXPENSE, INTERCOMPANY_PAYABLE,
    INTERCOMPANY_RECEIVABLE, INTERCOMPANY_REVENUE,
};
use crate::ledger::model::{AccountType, CompanyId};
use crate::merge::method_merger::{ConsolidatedMap, Contribution};
use crate::types::Money;

/// A candidate the processor could not apply, kept for manual review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnresolvedElimination {
    pub entry: EliminationEntry,
    pub reason: String,
}

/// Result of applying eliminations to a merged snapshot. The input map is
/// never touched; each stage of the pipeline hands the next an independent
/// snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EliminationOutcome {
    pub map: ConsolidatedMap,
    pub applied: Vec<EliminationEntry>,
    pub unresolved: Vec<UnresolvedElimination>,
    /// Net signed balance adjustment per account code; feeds the worksheet's
    /// elimination column.
    pub adjustments: BTreeMap<String, Money>,
}

/// Apply elimination candidates in detection order. A candidate whose target
/// accounts cannot be located is skipped and recorded as unresolved; a single
/// unmatched elimination never fails the consolidation.
pub fn apply_eliminations(map: &ConsolidatedMap, entries: &[EliminationEntry]) -> EliminationOutcome {
    let mut outcome = EliminationOutcome {
        map: map.clone(),
        applied: Vec::new(),
        unresolved: Vec::new(),
        adjustments: BTreeMap::new(),
    };

    for entry in entries {
        let result = match entry.kind {
            EliminationKind::ReceivablePayable => apply_two_sided(
                &mut outcome,
                entry,
                INTERCOMPANY_RECEIVABLE,
                AccountType::Asset,
                INTERCOMPANY_PAYABLE,
                AccountType::Liability,
            ),
            EliminationKind::RevenueExpense => apply_two_sided(
                &mut outcome,
                entry,
                INTERCOMPANY_REVENUE,
                AccountType::Revenue,
                INTERCOMPANY_EXPENSE,
                AccountType::Expense,
            ),
            EliminationKind::InvestmentEquity => apply_investment_equity(&mut outcome, entry),
            EliminationKind::Dividend => apply_dividend(&mut outcome, entry),
        };

        match result {
            Ok(()) => outcome.applied.push(entry.clone()),
            Err(reason) => {
                warn!(kind = ?entry.kind, %reason, "elimination skipped");
                outcome.unresolved.push(UnresolvedElimination {
                    entry: entry.clone(),
                    reason,
                });
            }
        }
    }

    outcome
}

// ---------------------------------------------------------------------------
// Per-kind application
// ---------------------------------------------------------------------------

/// Receivable/payable and revenue/expense eliminations subtract the amount
/// from both legs. Both must resolve, or the double entry would break. The
/// debit leg belongs to the source company, the credit leg to the target.
fn apply_two_sided(
    outcome: &mut EliminationOutcome,
    entry: &EliminationEntry,
    debit_name: &str,
    debit_type: AccountType,
    credit_name: &str,
    credit_type: AccountType,
) -> Result<(), String> {
    let debit_code = resolve_account(
        &outcome.map,
        debit_name,
        debit_type,
        &entry.source_company,
        &entry.target_company,
    )
    .ok_or_else(|| format!("no {debit_name} account in the consolidated map"))?;
    let credit_code = resolve_account(
        &outcome.map,
        credit_name,
        credit_type,
        &entry.target_company,
        &entry.source_company,
    )
    .ok_or_else(|| format!("no {credit_name} account in the consolidated map"))?;

    adjust_leg(outcome, &debit_code, -entry.amount, &entry.source_company);
    adjust_leg(outcome, &credit_code, -entry.amount, &entry.target_company);
    Ok(())
}

/// Zero the recorded investment and pull the target company's merged equity
/// contributions down pro-rata by `amount / total target equity`.
fn apply_investment_equity(
    outcome: &mut EliminationOutcome,
    entry: &EliminationEntry,
) -> Result<(), String> {
    if !outcome.map.contains_key(&entry.source_account) {
        return Err(format!(
            "investment account {} not found in the consolidated map",
            entry.source_account
        ));
    }

    let total_target_equity: Money = outcome
        .map
        .values()
        .filter(|a| a.account_type == AccountType::Equity)
        .flat_map(|a| &a.contributions)
        .filter(|c| c.company == entry.target_company)
        .map(|c| c.amount)
        .sum();

    if total_target_equity.is_zero() {
        return Err(format!(
            "target company {} has no merged equity to eliminate against",
            entry.target_company
        ));
    }

    let ratio = entry.amount / total_target_equity;

    // Zero the investment line.
    let investment_balance = outcome.map[&entry.source_account].balance;
    adjust(outcome, &entry.source_account, -investment_balance);
    if let Some(account) = outcome.map.get_mut(&entry.source_account) {
        for contribution in &mut account.contributions {
            contribution.amount = Decimal::ZERO;
        }
    }

    // Reduce the target's equity accounts proportionally.
    let equity_codes: Vec<String> = outcome
        .map
        .values()
        .filter(|a| {
            a.account_type == AccountType::Equity
                && a.contributions
                    .iter()
                    .any(|c| c.company == entry.target_company)
        })
        .map(|a| a.code.clone())
        .collect();

    for code in equity_codes {
        let delta = {
            let account = &outcome.map[&code];
            account
                .contributions
                .iter()
                .filter(|c| c.company == entry.target_company)
                .map(|c| c.amount)
                .sum::<Money>()
                * ratio
        };
        adjust(outcome, &code, -delta);
        if let Some(account) = outcome.map.get_mut(&code) {
            for contribution in &mut account.contributions {
                if contribution.company == entry.target_company {
                    contribution.amount -= contribution.amount * ratio;
                }
            }
        }
    }

    Ok(())
}

/// Subtract the dividend from the receiver's income account and the payer's
/// distribution account.
fn apply_dividend(outcome: &mut EliminationOutcome, entry: &EliminationEntry) -> Result<(), String> {
    if !outcome.map.contains_key(&entry.source_account) {
        return Err(format!(
            "dividend income account {} not found",
            entry.source_account
        ));
    }
    if !outcome.map.contains_key(&entry.target_account) {
        return Err(format!(
            "dividend distribution account {} not found for payer {}",
            entry.target_account, entry.target_company
        ));
    }

    let (income, distribution) = (entry.source_account.clone(), entry.target_account.clone());
    adjust_leg(outcome, &income, -entry.amount, &entry.source_company);
    adjust_leg(outcome, &distribution, -entry.amount, &entry.target_company);
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Find an account by canonical elimination name (case-insensitive substring)
/// or, failing that, by an intercompany link pointing at the leg's
/// counterparty on an account the owning company contributed to.
fn resolve_account(
    map: &ConsolidatedMap,
    canonical_name: &str,
    account_type: AccountType,
    owner: &CompanyId,
    counterparty: &CompanyId,
) -> Option<String> {
    let needle = canonical_name.to_ascii_lowercase();

    map.values()
        .find(|a| {
            a.account_type == account_type && a.name.to_ascii_lowercase().contains(&needle)
        })
        .or_else(|| {
            map.values().find(|a| {
                a.account_type == account_type
                    && a.links.intercompany_with.as_ref() == Some(counterparty)
                    && a.contributions.iter().any(|c| &c.company == owner)
            })
        })
        .map(|a| a.code.clone())
}

/// Apply a leg's delta to the account balance and to the owning company's
/// contribution, so per-company figures stay consistent with the
/// post-elimination balance.
fn adjust_leg(outcome: &mut EliminationOutcome, code: &str, delta: Money, owner: &CompanyId) {
    adjust(outcome, code, delta);
    if let Some(account) = outcome.map.get_mut(code) {
        if let Some(contribution) = account
            .contributions
            .iter_mut()
            .find(|c| &c.company == owner)
        {
            contribution.amount += delta;
        } else {
            account.contributions.push(Contribution {
                company: owner.clone(),
                pct: dec!(100),
                amount: delta,
            });
        }
    }
}

fn adjust(outcome: &mut EliminationOutcome, code: &str, delta: Money) {
    if let Some(account) = outcome.map.get_mut(code) {
        account.balance += delta;
    }
    *outcome
        .adjustments
        .entry(code.to_string())
        .or_insert(Decimal::ZERO) += delta;
}
