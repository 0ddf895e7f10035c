use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::eliminations::detector::EliminationKind;
use crate::eliminations::processor::{EliminationOutcome, UnresolvedElimination};
use crate::fx::translator::TranslatedCompany;
use crate::ledger::model::{AccountType, CompanyId, NormalSide};
use crate::merge::method_merger::ConsolidatedMap;
use crate::minority::calculator::MinorityInterest;
use crate::types::{Currency, Money, Rate};

pub use crate::types::TOLERANCE;

// ---------------------------------------------------------------------------
// Trial balance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub debit: Money,
    pub credit: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedTrialBalance {
    pub rows: Vec<TrialBalanceRow>,
    pub total_debits: Money,
    pub total_credits: Money,
    pub is_balanced: bool,
}

// ---------------------------------------------------------------------------
// Balance sheet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSheetLine {
    pub code: String,
    pub name: String,
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub current_assets: Vec<BalanceSheetLine>,
    pub non_current_assets: Vec<BalanceSheetLine>,
    pub total_assets: Money,
    pub current_liabilities: Vec<BalanceSheetLine>,
    pub non_current_liabilities: Vec<BalanceSheetLine>,
    pub total_liabilities: Money,
    pub equity_lines: Vec<BalanceSheetLine>,
    /// Revenue − expenses for the period, not yet closed to equity accounts.
    pub current_earnings: Money,
    /// Non-controlling share, carved out of group equity as its own line.
    pub minority_interest: Money,
    /// Equity attributable to the parent: accounts + current earnings −
    /// minority interest.
    pub total_equity: Money,
    pub total_equity_and_minority: Money,
    /// assets − liabilities − equity − minority interest. Must be ~0; a
    /// violation is reportable, never a crash.
    pub checksum: Money,
    pub balanced: bool,
}

// ---------------------------------------------------------------------------
// Income statement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub total_revenue: Money,
    pub cost_of_sales: Money,
    pub gross_profit: Money,
    pub operating_expenses: Money,
    /// Placeholder classification: gross profit less operating expenses.
    pub operating_income: Money,
    pub total_expenses: Money,
    pub net_income: Money,
    pub minority_interest_income: Money,
    pub net_income_attributable_to_parent: Money,
}

// ---------------------------------------------------------------------------
// Cash flow
// ---------------------------------------------------------------------------

/// Structurally simplified cash flow statement. The sections are emitted at
/// zero: the shape is kept for interface compatibility while actual cash-flow
/// computation remains unimplemented.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CashFlowStatement {
    pub cash_from_operations: Money,
    pub cash_from_investing: Money,
    pub cash_from_financing: Money,
    pub net_change_in_cash: Money,
}

// ---------------------------------------------------------------------------
// Worksheet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorksheetColumn {
    pub company: CompanyId,
    pub company_name: String,
    pub currency: Currency,
    pub rate: Rate,
    /// False when the neutral 1.0 fallback was applied for a missing rate.
    pub rate_verified: bool,
    /// Cumulative translation adjustment for this company, in reporting
    /// currency. Zero for companies already in the reporting currency.
    pub translation_adjustment: Money,
    /// True when the prior rate behind the adjustment was estimated rather
    /// than sourced.
    pub cta_estimated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorksheetRow {
    pub code: String,
    pub name: String,
    pub company_amounts: BTreeMap<CompanyId, Money>,
    /// Pre-translation local-currency balances per contributing company.
    pub original_amounts: BTreeMap<CompanyId, Money>,
    pub elimination: Money,
    pub consolidated: Money,
}

/// Company-by-company audit trail: one column per contributing company, one
/// elimination column, one consolidated column per account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worksheet {
    pub columns: Vec<WorksheetColumn>,
    pub rows: Vec<WorksheetRow>,
}

// ---------------------------------------------------------------------------
// Eliminations summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EliminationsSummaryLine {
    pub kind: EliminationKind,
    pub count: usize,
    pub total: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EliminationsSummary {
    pub by_kind: Vec<EliminationsSummaryLine>,
    pub total_count: usize,
    pub total_amount: Money,
    /// Candidates skipped for manual review; non-empty means the statements
    /// need human sign-off before they are treated as final.
    pub unresolved: Vec<UnresolvedElimination>,
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialStatements {
    pub trial_balance: ConsolidatedTrialBalance,
    pub balance_sheet: BalanceSheet,
    pub income_statement: IncomeStatement,
    pub cash_flow: CashFlowStatement,
    pub worksheet: Worksheet,
    pub eliminations_summary: EliminationsSummary,
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Build the full consolidated statement set from the post-elimination map.
/// `merged` is the pre-elimination snapshot backing the worksheet's company
/// columns.
pub fn generate_statements(
    merged: &ConsolidatedMap,
    outcome: &EliminationOutcome,
    minority: &MinorityInterest,
    translated: &[TranslatedCompany],
) -> (FinancialStatements, Vec<String>) {
    let mut warnings = Vec::new();

    let trial_balance = build_trial_balance(&outcome.map);
    if !trial_balance.is_balanced {
        warnings.push(format!(
            "Consolidated trial balance out of balance: debits {} vs credits {}",
            trial_balance.total_debits, trial_balance.total_credits
        ));
    }

    let balance_sheet = build_balance_sheet(&outcome.map, minority.total_balance);
    if !balance_sheet.balanced {
        warn!(checksum = %balance_sheet.checksum, "balance sheet checksum violation");
        warnings.push(format!(
            "Balance sheet checksum {} exceeds tolerance {TOLERANCE}; statements require review",
            balance_sheet.checksum
        ));
    }

    let income_statement = build_income_statement(&outcome.map, minority.total_income);
    let cash_flow = CashFlowStatement::default();
    let worksheet = build_worksheet(merged, outcome, translated);
    let eliminations_summary = build_eliminations_summary(outcome);

    (
        FinancialStatements {
            trial_balance,
            balance_sheet,
            income_statement,
            cash_flow,
            worksheet,
            eliminations_summary,
        },
        warnings,
    )
}

fn build_trial_balance(map: &ConsolidatedMap) -> ConsolidatedTrialBalance {
    let mut rows = Vec::with_capacity(map.len());
    let mut total_debits = Decimal::ZERO;
    let mut total_credits = Decimal::ZERO;

    for account in map.values() {
        let (debit, credit) = match account.account_type.normal_side() {
            NormalSide::Debit => (account.balance, Decimal::ZERO),
            NormalSide::Credit => (Decimal::ZERO, account.balance),
        };
        total_debits += debit;
        total_credits += credit;
        rows.push(TrialBalanceRow {
            code: account.code.clone(),
            name: account.name.clone(),
            account_type: account.account_type,
            debit,
            credit,
        });
    }

    let is_balanced = (total_debits - total_credits).abs() < TOLERANCE;
    ConsolidatedTrialBalance {
        rows,
        total_debits,
        total_credits,
        is_balanced,
    }
}

/// Current/non-current bucketing by code-prefix convention: asset codes below
/// 15xx and liability codes below 25xx are current; anything unparseable is
/// non-current.
fn is_current(code: &str, account_type: AccountType) -> bool {
    let prefix: Option<u32> = code.chars().take(2).collect::<String>().parse().ok();
    match (account_type, prefix) {
        (AccountType::Asset, Some(p)) => p < 15,
        (AccountType::Liability, Some(p)) => p < 25,
        _ => false,
    }
}

fn build_balance_sheet(map: &ConsolidatedMap, minority_interest: Money) -> BalanceSheet {
    let mut current_assets = Vec::new();
    let mut non_current_assets = Vec::new();
    let mut current_liabilities = Vec::new();
    let mut non_current_liabilities = Vec::new();
    let mut equity_lines = Vec::new();

    let mut total_assets = Decimal::ZERO;
    let mut total_liabilities = Decimal::ZERO;
    let mut equity_accounts_total = Decimal::ZERO;
    let mut total_revenue = Decimal::ZERO;
    let mut total_expenses = Decimal::ZERO;

    for account in map.values() {
        let line = BalanceSheetLine {
            code: account.code.clone(),
            name: account.name.clone(),
            amount: account.balance,
        };
        match account.account_type {
            AccountType::Asset => {
                total_assets += account.balance;
                if is_current(&account.code, AccountType::Asset) {
                    current_assets.push(line);
                } else {
                    non_current_assets.push(line);
                }
            }
            AccountType::Liability => {
                total_liabilities += account.balance;
                if is_current(&account.code, AccountType::Liability) {
                    current_liabilities.push(line);
                } else {
                    non_current_liabilities.push(line);
                }
            }
            AccountType::Equity => {
                equity_accounts_total += account.balance;
                equity_lines.push(line);
            }
            AccountType::Revenue => total_revenue += account.balance,
            AccountType::Expense => total_expenses += account.balance,
        }
    }

    let current_earnings = total_revenue - total_expenses;
    let total_equity = equity_accounts_total + current_earnings - minority_interest;
    let total_equity_and_minority = total_equity + minority_interest;
    let checksum = total_assets - total_liabilities - total_equity - minority_interest;

    BalanceSheet {
        current_assets,
        non_current_assets,
        total_assets,
        current_liabilities,
        non_current_liabilities,
        total_liabilities,
        equity_lines,
        current_earnings,
        minority_interest,
        total_equity,
        total_equity_and_minority,
        balanced: checksum.abs() < TOLERANCE,
        checksum,
    }
}

fn build_income_statement(map: &ConsolidatedMap, minority_income: Money) -> IncomeStatement {
    let mut total_revenue = Decimal::ZERO;
    let mut cost_of_sales = Decimal::ZERO;
    let mut operating_expenses = Decimal::ZERO;

    for account in map.values() {
        match account.account_type {
            AccountType::Revenue => total_revenue += account.balance,
            AccountType::Expense => {
                // Cost-of-sales convention: expense codes in the 5xxx range.
                if account.code.starts_with('5') {
                    cost_of_sales += account.balance;
                } else {
                    operating_expenses += account.balance;
                }
            }
            _ => {}
        }
    }

    let gross_profit = total_revenue - cost_of_sales;
    let operating_income = gross_profit - operating_expenses;
    let total_expenses = cost_of_sales + operating_expenses;
    let net_income = total_revenue - total_expenses;

    IncomeStatement {
        total_revenue,
        cost_of_sales,
        gross_profit,
        operating_expenses,
        operating_income,
        total_expenses,
        net_income,
        minority_interest_income: minority_income,
        net_income_attributable_to_parent: net_income - minority_income,
    }
}

fn build_worksheet(
    merged: &ConsolidatedMap,
    outcome: &EliminationOutcome,
    translated: &[TranslatedCompany],
) -> Worksheet {
    let columns = translated
        .iter()
        .map(|tc| WorksheetColumn {
            company: tc.company.id.clone(),
            company_name: tc.company.name.clone(),
            currency: tc.company.currency.clone(),
            rate: tc.rate.rate(),
            rate_verified: tc.rate.verified(),
            translation_adjustment: tc.translation_adjustment,
            cta_estimated: tc.cta_estimated,
        })
        .collect();

    // Local-currency balances per account code and company, for audit display.
    let mut originals: BTreeMap<String, BTreeMap<CompanyId, Money>> = BTreeMap::new();
    for tc in translated {
        for ta in &tc.accounts {
            *originals
                .entry(ta.account.code.clone())
                .or_default()
                .entry(tc.company.id.clone())
                .or_insert(Decimal::ZERO) += ta.original_balance;
        }
    }

    let rows = merged
        .values()
        .map(|account| {
            let mut company_amounts: BTreeMap<CompanyId, Money> = BTreeMap::new();
            for contribution in &account.contributions {
                *company_amounts
                    .entry(contribution.company.clone())
                    .or_insert(Decimal::ZERO) += contribution.amount;
            }
            let elimination = outcome
                .adjustments
                .get(&account.code)
                .copied()
                .unwrap_or(Decimal::ZERO);
            let consolidated = outcome
                .map
                .get(&account.code)
                .map(|a| a.balance)
                .unwrap_or(account.balance + elimination);

            WorksheetRow {
                code: account.code.clone(),
                name: account.name.clone(),
                company_amounts,
                original_amounts: originals.get(&account.code).cloned().unwrap_or_default(),
                elimination,
                consolidated,
            }
        })
        .collect();

    Worksheet { columns, rows }
}

fn build_eliminations_summary(outcome: &EliminationOutcome) -> EliminationsSummary {
    let mut by_kind: BTreeMap<&'static str, EliminationsSummaryLine> = BTreeMap::new();

    for entry in &outcome.applied {
        let key = kind_key(entry.kind);
        let line = by_kind.entry(key).or_insert(EliminationsSummaryLine {
            kind: entry.kind,
            count: 0,
            total: Decimal::ZERO,
        });
        line.count += 1;
        line.total += entry.amount;
    }

    let by_kind: Vec<EliminationsSummaryLine> = by_kind.into_values().collect();
    let total_count = by_kind.iter().map(|l| l.count).sum();
    let total_amount = by_kind.iter().map(|l| l.total).sum();

    EliminationsSummary {
        by_kind,
        total_count,
        total_amount,
        unresolved: outcome.unresolved.clone(),
    }
}

fn kind_key(kind: EliminationKind) -> &'static str {
    match kind {
        EliminationKind::ReceivablePayable => "receivable_payable",
        EliminationKind::RevenueExpense => "revenue_expense",
        EliminationKind::InvestmentEquity => "investment_equity",
        EliminationKind::Dividend => "dividend",
    }
}
