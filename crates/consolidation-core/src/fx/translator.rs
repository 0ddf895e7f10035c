use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ledger::model::{Account, AccountType, Company, Transaction};
use crate::ledger::reader::CompanyLedger;
use crate::types::{Currency, Money, Rate};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Conservative prior-rate estimate used for the translation adjustment when
/// no historical rate is available: prior = current × 0.95. Flagged with a
/// warning whenever it is applied.
const PRIOR_RATE_ESTIMATE_FACTOR: Decimal = dec!(0.95);

// ---------------------------------------------------------------------------
// External rate seam
// ---------------------------------------------------------------------------

/// Spot-rate lookup. A missing rate is a normal, handled condition, hence
/// `Option` rather than an error.
pub trait RateSource {
    fn get_rate(&self, from: &Currency, to: &Currency, date: NaiveDate) -> Option<Rate>;
}

/// Outcome of a rate lookup. `Defaulted` means the neutral 1.0 fallback was
/// applied because the source had no rate; callers and tests can always tell
/// it apart from a genuine 1:1 rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "rate")]
pub enum RateLookup {
    Found(Rate),
    Defaulted,
}

impl RateLookup {
    pub fn rate(&self) -> Rate {
        match self {
            RateLookup::Found(r) => *r,
            RateLookup::Defaulted => Decimal::ONE,
        }
    }

    pub fn verified(&self) -> bool {
        matches!(self, RateLookup::Found(_))
    }
}

// ---------------------------------------------------------------------------
// Translated dataset
// ---------------------------------------------------------------------------

/// An account with its balance restated in the reporting currency. The local
/// figure and the applied rate stay alongside for audit and worksheet display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatedAccount {
    pub account: Account,
    pub original_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatedTransaction {
    pub transaction: Transaction,
    pub original_amount: Money,
}

/// One company's full dataset in the reporting currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatedCompany {
    pub company: Company,
    pub rate: RateLookup,
    pub accounts: Vec<TranslatedAccount>,
    pub transactions: Vec<TranslatedTransaction>,
    /// Cumulative translation adjustment approximation:
    /// (assets − liabilities) × (current rate − prior rate), in reporting
    /// currency. Zero for companies already in the reporting currency.
    pub translation_adjustment: Money,
    /// True when the prior rate backing the adjustment was estimated rather
    /// than sourced.
    pub cta_estimated: bool,
}

impl TranslatedCompany {
    /// Sum of translated balances for one account type.
    pub fn total_by_type(&self, account_type: AccountType) -> Money {
        self.accounts
            .iter()
            .filter(|a| a.account.account_type == account_type)
            .map(|a| a.account.balance)
            .sum()
    }

    pub fn net_assets(&self) -> Money {
        self.total_by_type(AccountType::Asset) - self.total_by_type(AccountType::Liability)
    }

    pub fn net_income(&self) -> Money {
        self.total_by_type(AccountType::Revenue) - self.total_by_type(AccountType::Expense)
    }
}

// ---------------------------------------------------------------------------
// Translation
// ---------------------------------------------------------------------------

/// Restate every company's balances and transactions in the reporting
/// currency. Same-currency companies pass through unchanged; a missing spot
/// rate falls back to 1.0 and flags the company as rate-unverified.
pub fn translate_companies(
    ledgers: Vec<CompanyLedger>,
    reporting_currency: &Currency,
    rates: &dyn RateSource,
    as_of: NaiveDate,
    include_translation: bool,
) -> (Vec<TranslatedCompany>, Vec<String>) {
    let mut translated = Vec::with_capacity(ledgers.len());
    let mut warnings = Vec::new();

    for ledger in ledgers {
        if !include_translation || &ledger.company.currency == reporting_currency {
            translated.push(pass_through(ledger));
            continue;
        }

        let lookup = match rates.get_rate(&ledger.company.currency, reporting_currency, as_of) {
            Some(rate) => RateLookup::Found(rate),
            None => {
                warn!(
                    company = %ledger.company.id,
                    currency = ?ledger.company.currency,
                    "no spot rate available; defaulting to 1.0"
                );
                warnings.push(format!(
                    "Company {}: no {:?}→{:?} rate for {as_of}; contribution is rate-unverified (rate 1.0 applied)",
                    ledger.company.id, ledger.company.currency, reporting_currency
                ));
                RateLookup::Defaulted
            }
        };
        let rate = lookup.rate();

        let accounts: Vec<TranslatedAccount> = ledger
            .accounts
            .into_iter()
            .map(|mut account| {
                let original_balance = account.balance;
                account.balance *= rate;
                TranslatedAccount {
                    account,
                    original_balance,
                }
            })
            .collect();

        let transactions: Vec<TranslatedTransaction> = ledger
            .transactions
            .into_iter()
            .map(|mut transaction| {
                let original_amount = transaction.amount;
                transaction.amount *= rate;
                TranslatedTransaction {
                    transaction,
                    original_amount,
                }
            })
            .collect();

        let (prior_rate, cta_estimated) = prior_rate(
            rates,
            &ledger.company.currency,
            reporting_currency,
            as_of,
            rate,
        );
        if cta_estimated {
            warnings.push(format!(
                "Company {}: no historical rate for the translation adjustment; prior rate estimated at current × {PRIOR_RATE_ESTIMATE_FACTOR}",
                ledger.company.id
            ));
        }

        // Net assets in local currency times the rate movement.
        let local_net_assets: Money = accounts
            .iter()
            .filter(|a| a.account.account_type == AccountType::Asset)
            .map(|a| a.original_balance)
            .sum::<Money>()
            - accounts
                .iter()
                .filter(|a| a.account.account_type == AccountType::Liability)
                .map(|a| a.original_balance)
                .sum::<Money>();
        let translation_adjustment = local_net_assets * (rate - prior_rate);

        translated.push(TranslatedCompany {
            company: ledger.company,
            rate: lookup,
            accounts,
            transactions,
            translation_adjustment,
            cta_estimated,
        });
    }

    (translated, warnings)
}

fn pass_through(ledger: CompanyLedger) -> TranslatedCompany {
    TranslatedCompany {
        company: ledger.company,
        rate: RateLookup::Found(Decimal::ONE),
        accounts: ledger
            .accounts
            .into_iter()
            .map(|account| TranslatedAccount {
                original_balance: account.balance,
                account,
            })
            .collect(),
        transactions: ledger
            .transactions
            .into_iter()
            .map(|transaction| TranslatedTransaction {
                original_amount: transaction.amount,
                transaction,
            })
            .collect(),
        translation_adjustment: Decimal::ZERO,
        cta_estimated: false,
    }
}

/// Historical rate one year before the consolidation date, or the
/// conservative estimate when the source has none.
fn prior_rate(
    rates: &dyn RateSource,
    from: &Currency,
    to: &Currency,
    as_of: NaiveDate,
    current_rate: Rate,
) -> (Rate, bool) {
    let prior_date = as_of
        .with_year(as_of.year() - 1)
        .unwrap_or_else(|| as_of - Days::new(365));

    match rates.get_rate(from, to, prior_date) {
        Some(rate) => (rate, false),
        None => (current_rate * PRIOR_RATE_ESTIMATE_FACTOR, true),
    }
}
