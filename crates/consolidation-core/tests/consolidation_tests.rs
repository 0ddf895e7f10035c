use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use consolidation_core::engine::{run_consolidation, ConsolidationInput};
use consolidation_core::fx::RateSource;
use consolidation_core::ledger::{
    Account, AccountType, Company, CompanyId, ConsolidationMethod, LedgerSource, Transaction,
    TransactionKind,
};
use consolidation_core::types::Currency;
use consolidation_core::ConsolidationResult;

// ===========================================================================
// Fixtures
// ===========================================================================

#[derive(Default)]
struct MapLedger {
    accounts: HashMap<CompanyId, Vec<Account>>,
    transactions: HashMap<CompanyId, Vec<Transaction>>,
}

impl MapLedger {
    fn with_accounts(mut self, company: &str, accounts: Vec<Account>) -> Self {
        self.accounts.insert(CompanyId::new(company), accounts);
        self
    }

    fn with_transactions(mut self, company: &str, transactions: Vec<Transaction>) -> Self {
        self.transactions
            .insert(CompanyId::new(company), transactions);
        self
    }
}

impl LedgerSource for MapLedger {
    fn fetch_accounts(
        &self,
        company: &CompanyId,
        _as_of: NaiveDate,
    ) -> ConsolidationResult<Vec<Account>> {
        Ok(self.accounts.get(company).cloned().unwrap_or_default())
    }

    fn fetch_transactions(
        &self,
        company: &CompanyId,
        _as_of: NaiveDate,
        _kinds: &[TransactionKind],
    ) -> ConsolidationResult<Vec<Transaction>> {
        Ok(self.transactions.get(company).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct FixedRates {
    rates: HashMap<(Currency, Currency), Decimal>,
}

impl FixedRates {
    fn with(mut self, from: Currency, to: Currency, rate: Decimal) -> Self {
        self.rates.insert((from, to), rate);
        self
    }
}

impl RateSource for FixedRates {
    fn get_rate(&self, from: &Currency, to: &Currency, date: NaiveDate) -> Option<Decimal> {
        // Spot only; historical lookups (prior year) intentionally miss so the
        // translation adjustment falls back to its estimate.
        if date != as_of() {
            return None;
        }
        self.rates.get(&(from.clone(), to.clone())).copied()
    }
}

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
}

fn company(
    id: &str,
    currency: Currency,
    ownership: Decimal,
    method: ConsolidationMethod,
) -> Company {
    Company {
        id: CompanyId::new(id),
        name: id.to_uppercase(),
        currency,
        ownership_pct: ownership,
        method,
    }
}

fn input(companies: Vec<Company>) -> ConsolidationInput {
    ConsolidationInput {
        consolidation_date: as_of(),
        reporting_currency: Currency::USD,
        companies,
        eliminate_intercompany: true,
        include_currency_translation: true,
        include_minority_interest: true,
    }
}

fn invoice(id: &str, counterparty: &str, amount: Decimal) -> Transaction {
    Transaction {
        id: id.into(),
        kind: TransactionKind::CustomerInvoice,
        counterparty: Some(CompanyId::new(counterparty)),
        amount,
        date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
    }
}

// ===========================================================================
// Full consolidation identity
// ===========================================================================

#[test]
fn test_single_company_full_method_reproduces_trial_balance() {
    let ledger = MapLedger::default().with_accounts(
        "parent",
        vec![
            Account::new("1000", "Cash", AccountType::Asset, dec!(250000)),
            Account::new("1600", "Plant", AccountType::Asset, dec!(400000)),
            Account::new("2000", "Payables", AccountType::Liability, dec!(150000)),
            Account::new("3000", "Share Capital", AccountType::Equity, dec!(500000)),
            Account::new("4000", "Sales", AccountType::Revenue, dec!(300000)),
            Account::new("5000", "Cost of Sales", AccountType::Expense, dec!(300000)),
        ],
    );
    let params = input(vec![company(
        "parent",
        Currency::USD,
        dec!(100),
        ConsolidationMethod::Full,
    )]);

    let result = run_consolidation(&params, &ledger, &FixedRates::default()).unwrap();
    let out = &result.result;

    assert_eq!(out.summary.companies_consolidated, 1);
    assert_eq!(out.summary.eliminations_count, 0);
    assert_eq!(out.statements.trial_balance.rows.len(), 6);
    assert_eq!(out.statements.trial_balance.total_debits, dec!(950000));
    assert_eq!(out.statements.trial_balance.total_credits, dec!(950000));
    assert!(out.statements.trial_balance.is_balanced);
    assert!(out.statements.balance_sheet.balanced);
    assert!(result.warnings.is_empty());
}

// ===========================================================================
// Proportional scaling
// ===========================================================================

#[test]
fn test_proportional_method_scales_every_account() {
    let ledger = MapLedger::default().with_accounts(
        "jv",
        vec![
            Account::new("1000", "Cash", AccountType::Asset, dec!(100000)),
            Account::new("2000", "Payables", AccountType::Liability, dec!(40000)),
            Account::new("3000", "Share Capital", AccountType::Equity, dec!(60000)),
        ],
    );
    let params = input(vec![company(
        "jv",
        Currency::USD,
        dec!(40),
        ConsolidationMethod::Proportional,
    )]);

    let result = run_consolidation(&params, &ledger, &FixedRates::default()).unwrap();
    let rows = &result.result.statements.trial_balance.rows;

    let cash = rows.iter().find(|r| r.code == "1000").unwrap();
    assert_eq!(cash.debit, dec!(40000.0));
    let payables = rows.iter().find(|r| r.code == "2000").unwrap();
    assert_eq!(payables.credit, dec!(16000.0));
    let capital = rows.iter().find(|r| r.code == "3000").unwrap();
    assert_eq!(capital.credit, dec!(24000.0));
    assert!(result.result.statements.balance_sheet.balanced);
}

// ===========================================================================
// Minority interest scenario: 80% sub with 1,000,000 net assets
// ===========================================================================

#[test]
fn test_eighty_percent_sub_yields_200k_minority_interest() {
    let ledger = MapLedger::default()
        .with_accounts(
            "parent",
            vec![
                Account::new("1000", "Cash", AccountType::Asset, dec!(500000)),
                Account::new("3000", "Share Capital", AccountType::Equity, dec!(500000)),
            ],
        )
        .with_accounts(
            "sub",
            vec![
                Account::new("1000", "Cash", AccountType::Asset, dec!(1200000)),
                Account::new("2600", "Loans", AccountType::Liability, dec!(200000)),
                Account::new("3000", "Share Capital", AccountType::Equity, dec!(1000000)),
            ],
        );
    let params = input(vec![
        company("parent", Currency::USD, dec!(100), ConsolidationMethod::Full),
        company("sub", Currency::USD, dec!(80), ConsolidationMethod::Full),
    ]);

    let result = run_consolidation(&params, &ledger, &FixedRates::default()).unwrap();
    let out = &result.result;

    assert_eq!(out.summary.minority_interest_total, dec!(200000.00));
    assert_eq!(out.minority_interest.records.len(), 1);
    assert_eq!(out.minority_interest.records[0].minority_pct, dec!(20));

    let bs = &out.statements.balance_sheet;
    assert_eq!(bs.minority_interest, dec!(200000.00));
    // Parent's own 500,000 plus its 800,000 share of the sub.
    assert_eq!(bs.total_equity, dec!(1300000.00));
    assert_eq!(bs.checksum, Decimal::ZERO);
    assert!(bs.balanced);
}

#[test]
fn test_minority_interest_reflects_applied_eliminations() {
    // The sub owes the parent 50,000; eliminating the payable lifts the
    // sub's net assets from 1,000,000 to 1,050,000 before the 20% split.
    let ledger = MapLedger::default()
        .with_accounts(
            "parent",
            vec![
                Account::new(
                    "1200",
                    "Intercompany Receivable",
                    AccountType::Asset,
                    dec!(50000),
                ),
                Account::new("1000", "Cash", AccountType::Asset, dec!(450000)),
                Account::new("3000", "Share Capital", AccountType::Equity, dec!(500000)),
            ],
        )
        .with_accounts(
            "sub",
            vec![
                Account::new("1000", "Cash", AccountType::Asset, dec!(1200000)),
                Account::new(
                    "2200",
                    "Intercompany Payable",
                    AccountType::Liability,
                    dec!(50000),
                ),
                Account::new("2600", "Loans", AccountType::Liability, dec!(150000)),
                Account::new("3000", "Share Capital", AccountType::Equity, dec!(1000000)),
            ],
        )
        .with_transactions("parent", vec![invoice("inv-1", "sub", dec!(50000))]);
    let params = input(vec![
        company("parent", Currency::USD, dec!(100), ConsolidationMethod::Full),
        company("sub", Currency::USD, dec!(80), ConsolidationMethod::Full),
    ]);

    let result = run_consolidation(&params, &ledger, &FixedRates::default()).unwrap();
    let out = &result.result;

    assert_eq!(out.summary.eliminations_count, 1);
    assert_eq!(out.summary.minority_interest_total, dec!(210000.00));
    assert_eq!(out.minority_interest.records[0].minority_balance, dec!(210000.00));

    let bs = &out.statements.balance_sheet;
    assert_eq!(bs.minority_interest, dec!(210000.00));
    assert_eq!(bs.checksum, Decimal::ZERO);
    assert!(bs.balanced);
}

#[test]
fn test_minority_completeness_property() {
    let ledger = MapLedger::default().with_accounts(
        "sub",
        vec![
            Account::new("1000", "Cash", AccountType::Asset, dec!(750000)),
            Account::new("2000", "Payables", AccountType::Liability, dec!(250000)),
            Account::new("3000", "Share Capital", AccountType::Equity, dec!(500000)),
        ],
    );
    let params = input(vec![company(
        "sub",
        Currency::USD,
        dec!(65),
        ConsolidationMethod::Full,
    )]);

    let result = run_consolidation(&params, &ledger, &FixedRates::default()).unwrap();
    let record = &result.result.minority_interest.records[0];

    let net_assets = dec!(500000);
    let ownership_share = net_assets * dec!(65) / dec!(100);
    assert_eq!(record.minority_balance + ownership_share, net_assets);
}

// ===========================================================================
// Currency translation scenario: EUR sub at 1.08
// ===========================================================================

#[test]
fn test_eur_sub_contributes_translated_balances() {
    let ledger = MapLedger::default()
        .with_accounts(
            "parent",
            vec![
                Account::new("1000", "Cash", AccountType::Asset, dec!(50000)),
                Account::new("3000", "Share Capital", AccountType::Equity, dec!(50000)),
            ],
        )
        .with_accounts(
            "sub-eu",
            vec![
                Account::new("1010", "Bank", AccountType::Asset, dec!(100000)),
                Account::new("3000", "Share Capital", AccountType::Equity, dec!(100000)),
            ],
        );
    let rates = FixedRates::default().with(Currency::EUR, Currency::USD, dec!(1.08));
    let params = input(vec![
        company("parent", Currency::USD, dec!(100), ConsolidationMethod::Full),
        company("sub-eu", Currency::EUR, dec!(100), ConsolidationMethod::Full),
    ]);

    let result = run_consolidation(&params, &ledger, &rates).unwrap();
    let out = &result.result;

    let bank = out
        .statements
        .trial_balance
        .rows
        .iter()
        .find(|r| r.code == "1010")
        .unwrap();
    assert_eq!(bank.debit, dec!(108000.00));

    let ws = &out.statements.worksheet;
    let eu_column = ws
        .columns
        .iter()
        .find(|c| c.company == CompanyId::new("sub-eu"))
        .unwrap();
    assert_eq!(eu_column.rate, dec!(1.08));
    assert!(eu_column.rate_verified);

    // No historical rate is on file, so the adjustment uses the estimated
    // prior rate: 100,000 × (1.08 − 1.08 × 0.95) = 5,400.
    assert_eq!(eu_column.translation_adjustment, dec!(5400));
    assert!(eu_column.cta_estimated);

    let bank_row = ws.rows.iter().find(|r| r.code == "1010").unwrap();
    assert_eq!(
        bank_row.original_amounts[&CompanyId::new("sub-eu")],
        dec!(100000)
    );
    assert_eq!(
        bank_row.company_amounts[&CompanyId::new("sub-eu")],
        dec!(108000.00)
    );
    assert!(out.statements.balance_sheet.balanced);
}

#[test]
fn test_missing_rate_flags_company_as_unverified() {
    let ledger = MapLedger::default().with_accounts(
        "sub-eu",
        vec![
            Account::new("1010", "Bank", AccountType::Asset, dec!(100000)),
            Account::new("3000", "Share Capital", AccountType::Equity, dec!(100000)),
        ],
    );
    let params = input(vec![company(
        "sub-eu",
        Currency::EUR,
        dec!(100),
        ConsolidationMethod::Full,
    )]);

    let result = run_consolidation(&params, &ledger, &FixedRates::default()).unwrap();

    let column = &result.result.statements.worksheet.columns[0];
    assert!(!column.rate_verified);
    assert_eq!(column.rate, Decimal::ONE);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("rate-unverified")));
}

// ===========================================================================
// Intercompany elimination scenario: 50,000 invoice
// ===========================================================================

#[test]
fn test_intercompany_invoice_eliminated_from_both_legs() {
    let ledger = MapLedger::default()
        .with_accounts(
            "parent",
            vec![
                Account::new(
                    "1200",
                    "Intercompany Receivable",
                    AccountType::Asset,
                    dec!(50000),
                ),
                Account::new("4000", "Sales", AccountType::Revenue, dec!(50000)),
            ],
        )
        .with_accounts(
            "sub",
            vec![
                Account::new(
                    "2200",
                    "Intercompany Payable",
                    AccountType::Liability,
                    dec!(50000),
                ),
                Account::new("5000", "Cost of Sales", AccountType::Expense, dec!(50000)),
            ],
        )
        .with_transactions("parent", vec![invoice("inv-1", "sub", dec!(50000))]);
    let params = input(vec![
        company("parent", Currency::USD, dec!(100), ConsolidationMethod::Full),
        company("sub", Currency::USD, dec!(100), ConsolidationMethod::Full),
    ]);

    let result = run_consolidation(&params, &ledger, &FixedRates::default()).unwrap();
    let out = &result.result;

    assert_eq!(out.summary.eliminations_count, 1);
    let summary = &out.statements.eliminations_summary;
    assert_eq!(summary.total_amount, dec!(50000));
    assert!(summary.unresolved.is_empty());

    let rows = &out.statements.trial_balance.rows;
    let receivable = rows.iter().find(|r| r.code == "1200").unwrap();
    assert_eq!(receivable.debit, Decimal::ZERO);
    let payable = rows.iter().find(|r| r.code == "2200").unwrap();
    assert_eq!(payable.credit, Decimal::ZERO);
    assert!(out.statements.balance_sheet.balanced);
}

#[test]
fn test_zero_intercompany_input_means_no_eliminations() {
    let ledger = MapLedger::default()
        .with_accounts(
            "parent",
            vec![
                Account::new("1000", "Cash", AccountType::Asset, dec!(1000)),
                Account::new("3000", "Share Capital", AccountType::Equity, dec!(1000)),
            ],
        )
        .with_transactions("parent", vec![invoice("inv-1", "outsider", dec!(7000))]);
    let params = input(vec![company(
        "parent",
        Currency::USD,
        dec!(100),
        ConsolidationMethod::Full,
    )]);

    let result = run_consolidation(&params, &ledger, &FixedRates::default()).unwrap();
    let out = &result.result;

    assert_eq!(out.summary.eliminations_count, 0);
    assert!(out.statements.eliminations_summary.by_kind.is_empty());
    assert!(out.statements.eliminations_summary.unresolved.is_empty());
    assert_eq!(
        out.statements.trial_balance.total_debits,
        dec!(1000),
        "processor must be a no-op"
    );
}

#[test]
fn test_unmatched_elimination_recorded_not_fatal() {
    // The invoice is intercompany but neither company carries canonical
    // intercompany accounts, so the candidate cannot be applied.
    let ledger = MapLedger::default()
        .with_accounts(
            "parent",
            vec![
                Account::new("1000", "Cash", AccountType::Asset, dec!(1000)),
                Account::new("3000", "Share Capital", AccountType::Equity, dec!(1000)),
            ],
        )
        .with_accounts(
            "sub",
            vec![
                Account::new("1000", "Cash", AccountType::Asset, dec!(500)),
                Account::new("3000", "Share Capital", AccountType::Equity, dec!(500)),
            ],
        )
        .with_transactions("parent", vec![invoice("inv-1", "sub", dec!(200))]);
    let params = input(vec![
        company("parent", Currency::USD, dec!(100), ConsolidationMethod::Full),
        company("sub", Currency::USD, dec!(100), ConsolidationMethod::Full),
    ]);

    let result = run_consolidation(&params, &ledger, &FixedRates::default()).unwrap();
    let out = &result.result;

    assert_eq!(out.summary.eliminations_count, 0);
    assert_eq!(out.statements.eliminations_summary.unresolved.len(), 1);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("Unresolved elimination")));
    assert!(out.statements.balance_sheet.balanced);
}

// ===========================================================================
// Investment elimination and the balance invariant
// ===========================================================================

#[test]
fn test_investment_elimination_keeps_balance_invariant() {
    let mut investment = Account::new(
        "1700",
        "Investment in Sub",
        AccountType::Asset,
        dec!(800000),
    );
    investment.links.investment_in = Some(CompanyId::new("sub"));

    let ledger = MapLedger::default()
        .with_accounts(
            "parent",
            vec![
                Account::new("1000", "Cash", AccountType::Asset, dec!(200000)),
                investment,
                Account::new("3000", "Share Capital", AccountType::Equity, dec!(1000000)),
            ],
        )
        .with_accounts(
            "sub",
            vec![
                Account::new("1000", "Cash", AccountType::Asset, dec!(1200000)),
                Account::new("2600", "Loans", AccountType::Liability, dec!(200000)),
                Account::new("3100", "Sub Share Capital", AccountType::Equity, dec!(600000)),
                Account::new("3200", "Retained Earnings", AccountType::Equity, dec!(400000)),
            ],
        );
    let params = input(vec![
        company("parent", Currency::USD, dec!(100), ConsolidationMethod::Full),
        company("sub", Currency::USD, dec!(80), ConsolidationMethod::Full),
    ]);

    let result = run_consolidation(&params, &ledger, &FixedRates::default()).unwrap();
    let out = &result.result;

    assert_eq!(out.summary.eliminations_count, 1);

    let rows = &out.statements.trial_balance.rows;
    let inv = rows.iter().find(|r| r.code == "1700").unwrap();
    assert_eq!(inv.debit, Decimal::ZERO, "investment fully eliminated");

    // Sub equity scaled down by 800,000 / 1,000,000: 20% survives.
    let sub_capital = rows.iter().find(|r| r.code == "3100").unwrap();
    assert_eq!(sub_capital.credit, dec!(120000.0));
    let retained = rows.iter().find(|r| r.code == "3200").unwrap();
    assert_eq!(retained.credit, dec!(80000.0));

    let bs = &out.statements.balance_sheet;
    assert_eq!(bs.minority_interest, dec!(200000.00));
    assert_eq!(bs.total_equity, dec!(1000000.00));
    assert_eq!(bs.checksum, Decimal::ZERO);
    assert!(bs.balanced);
}

// ===========================================================================
// Equity method
// ===========================================================================

#[test]
fn test_equity_method_company_enters_as_single_line() {
    let ledger = MapLedger::default()
        .with_accounts(
            "parent",
            vec![
                Account::new("1000", "Cash", AccountType::Asset, dec!(100000)),
                Account::new("3000", "Share Capital", AccountType::Equity, dec!(100000)),
            ],
        )
        .with_accounts(
            "assoc",
            vec![
                Account::new("1000", "Cash", AccountType::Asset, dec!(900000)),
                Account::new("4000", "Sales", AccountType::Revenue, dec!(500000)),
                Account::new("6000", "Wages", AccountType::Expense, dec!(300000)),
            ],
        );
    let params = input(vec![
        company("parent", Currency::USD, dec!(100), ConsolidationMethod::Full),
        company("assoc", Currency::USD, dec!(30), ConsolidationMethod::Equity),
    ]);

    let result = run_consolidation(&params, &ledger, &FixedRates::default()).unwrap();
    let rows = &result.result.statements.trial_balance.rows;

    // The associate's own accounts never merge.
    assert!(rows.iter().all(|r| r.code != "4000" && r.code != "6000"));
    let inv = rows.iter().find(|r| r.code == "INV-assoc").unwrap();
    // (500,000 − 300,000) × 30% = 60,000
    assert_eq!(inv.debit, dec!(60000.0));
}

// ===========================================================================
// Degraded-mode behaviour
// ===========================================================================

#[test]
fn test_company_with_no_ledger_data_consolidates_empty() {
    let ledger = MapLedger::default().with_accounts(
        "parent",
        vec![
            Account::new("1000", "Cash", AccountType::Asset, dec!(1000)),
            Account::new("3000", "Share Capital", AccountType::Equity, dec!(1000)),
        ],
    );
    // "ghost" has no data at all; the run must still complete.
    let params = input(vec![
        company("parent", Currency::USD, dec!(100), ConsolidationMethod::Full),
        company("ghost", Currency::USD, dec!(100), ConsolidationMethod::Full),
    ]);

    let result = run_consolidation(&params, &ledger, &FixedRates::default()).unwrap();
    let out = &result.result;

    assert_eq!(out.summary.companies_consolidated, 2);
    assert_eq!(out.statements.trial_balance.total_debits, dec!(1000));
    assert_eq!(out.statements.worksheet.columns.len(), 2);
}

#[test]
fn test_cash_flow_shape_preserved() {
    let ledger = MapLedger::default().with_accounts(
        "parent",
        vec![
            Account::new("1000", "Cash", AccountType::Asset, dec!(1000)),
            Account::new("3000", "Share Capital", AccountType::Equity, dec!(1000)),
        ],
    );
    let params = input(vec![company(
        "parent",
        Currency::USD,
        dec!(100),
        ConsolidationMethod::Full,
    )]);

    let result = run_consolidation(&params, &ledger, &FixedRates::default()).unwrap();
    let cf = &result.result.statements.cash_flow;

    assert_eq!(cf.cash_from_operations, Decimal::ZERO);
    assert_eq!(cf.cash_from_investing, Decimal::ZERO);
    assert_eq!(cf.cash_from_financing, Decimal::ZERO);
    assert_eq!(cf.net_change_in_cash, Decimal::ZERO);
}

// ===========================================================================
// Worksheet reconciliation
// ===========================================================================

#[test]
fn test_worksheet_reconciles_for_mixed_group() {
    let ledger = MapLedger::default()
        .with_accounts(
            "parent",
            vec![
                Account::new(
                    "1200",
                    "Intercompany Receivable",
                    AccountType::Asset,
                    dec!(30000),
                ),
                Account::new("1000", "Cash", AccountType::Asset, dec!(20000)),
                Account::new("3000", "Share Capital", AccountType::Equity, dec!(20000)),
                Account::new("4000", "Sales", AccountType::Revenue, dec!(30000)),
            ],
        )
        .with_accounts(
            "sub",
            vec![
                Account::new(
                    "2200",
                    "Intercompany Payable",
                    AccountType::Liability,
                    dec!(30000),
                ),
                Account::new("1000", "Cash", AccountType::Asset, dec!(50000)),
                Account::new("3000", "Share Capital", AccountType::Equity, dec!(50000)),
                Account::new("5000", "Cost of Sales", AccountType::Expense, dec!(30000)),
            ],
        )
        .with_transactions("parent", vec![invoice("inv-1", "sub", dec!(30000))]);
    let params = input(vec![
        company("parent", Currency::USD, dec!(100), ConsolidationMethod::Full),
        company("sub", Currency::USD, dec!(100), ConsolidationMethod::Full),
    ]);

    let result = run_consolidation(&params, &ledger, &FixedRates::default()).unwrap();
    let ws = &result.result.statements.worksheet;

    for row in &ws.rows {
        let contributed: Decimal = row.company_amounts.values().copied().sum();
        assert_eq!(
            contributed + row.elimination,
            row.consolidated,
            "row {} must reconcile",
            row.code
        );
    }
}
