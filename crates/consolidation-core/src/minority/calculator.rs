use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::fx::translator::TranslatedCompany;
use crate::ledger::model::{AccountType, CompanyId, ConsolidationMethod};
use crate::merge::method_merger::ConsolidatedMap;
use crate::types::{Money, Percent};

/// Minority (non-controlling) interest in one under-100%-owned,
/// fully-consolidated company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinorityInterestRecord {
    pub company: CompanyId,
    pub company_name: String,
    pub ownership_pct: Percent,
    pub minority_pct: Percent,
    /// Minority share of post-elimination net assets (assets − liabilities).
    pub minority_balance: Money,
    /// Minority share of post-elimination net income (revenue − expenses).
    pub minority_income: Money,
}

/// Per-company records plus aggregate totals. The totals become explicit
/// equity-section and income-statement line items, never silently netted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinorityInterest {
    pub records: Vec<MinorityInterestRecord>,
    pub total_balance: Money,
    pub total_income: Money,
}

/// Compute minority interest for every `full`-method company owned below
/// 100%. Net assets and net income are measured from the company's
/// contribution records in the post-elimination consolidated map, so
/// intercompany adjustments flow into the minority share. Other methods carry
/// no minority claim in this engine: proportional merges only the owned
/// share, and equity-method companies enter as a single investment line.
pub fn calculate_minority_interest(
    translated: &[TranslatedCompany],
    consolidated: &ConsolidatedMap,
) -> MinorityInterest {
    let mut result = MinorityInterest::default();

    for tc in translated {
        if tc.company.method != ConsolidationMethod::Full || tc.company.ownership_pct >= dec!(100)
        {
            continue;
        }

        let (net_assets, net_income) = company_position(&tc.company.id, consolidated);
        let minority_pct = dec!(100) - tc.company.ownership_pct;
        let minority_balance = net_assets * minority_pct / dec!(100);
        let minority_income = net_income * minority_pct / dec!(100);

        result.total_balance += minority_balance;
        result.total_income += minority_income;
        result.records.push(MinorityInterestRecord {
            company: tc.company.id.clone(),
            company_name: tc.company.name.clone(),
            ownership_pct: tc.company.ownership_pct,
            minority_pct,
            minority_balance,
            minority_income,
        });
    }

    result
}

/// One company's (net assets, net income) summed from its contributions
/// across the consolidated map.
fn company_position(company: &CompanyId, consolidated: &ConsolidatedMap) -> (Money, Money) {
    let mut net_assets = Decimal::ZERO;
    let mut net_income = Decimal::ZERO;

    for account in consolidated.values() {
        let share: Money = account
            .contributions
            .iter()
            .filter(|c| &c.company == company)
            .map(|c| c.amount)
            .sum();
        match account.account_type {
            AccountType::Asset => net_assets += share,
            AccountType::Liability => net_assets -= share,
            AccountType::Revenue => net_income += share,
            AccountType::Expense => net_income -= share,
            AccountType::Equity => {}
        }
    }

    (net_assets, net_income)
}
