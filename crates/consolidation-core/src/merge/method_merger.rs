use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::fx::translator::TranslatedCompany;
use crate::ledger::model::{AccountLinks, AccountType, CompanyId, ConsolidationMethod};
use crate::types::{Money, Percent};

/// One company's share of a consolidated account. Appended, never
/// overwritten, so the worksheet can trace every balance back to its source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contribution {
    pub company: CompanyId,
    /// Share of the company's local balance that was merged, 0–100.
    pub pct: Percent,
    pub amount: Money,
}

/// The merged representation of one logical account across all contributing
/// companies. Balances are mutated by the elimination processor after the
/// merger creates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedAccount {
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub balance: Money,
    pub contributions: Vec<Contribution>,
    /// Intercompany links carried over from the first contributing account
    /// that declared them; used for elimination matching.
    #[serde(default, skip_serializing_if = "AccountLinks::is_empty")]
    pub links: AccountLinks,
}

/// Consolidated accounts keyed by account code. BTreeMap keeps statement and
/// worksheet ordering deterministic.
pub type ConsolidatedMap = BTreeMap<String, ConsolidatedAccount>;

/// Merge every company's accounts into one consolidated map according to its
/// declared method: `full` adds 100% of each balance, `proportional` adds the
/// ownership-weighted share, and `equity` collapses the company into a single
/// synthetic investment line.
pub fn merge_companies(translated: &[TranslatedCompany]) -> ConsolidatedMap {
    let mut map = ConsolidatedMap::new();

    for tc in translated {
        match tc.company.method {
            ConsolidationMethod::Full => merge_weighted(&mut map, tc, Decimal::ONE),
            ConsolidationMethod::Proportional => {
                merge_weighted(&mut map, tc, tc.company.ownership_pct / dec!(100))
            }
            ConsolidationMethod::Equity => merge_equity_line(&mut map, tc),
        }
    }

    map
}

fn merge_weighted(map: &mut ConsolidatedMap, tc: &TranslatedCompany, factor: Decimal) {
    for ta in &tc.accounts {
        let contributed = ta.account.balance * factor;
        let entry = map
            .entry(ta.account.code.clone())
            .or_insert_with(|| ConsolidatedAccount {
                code: ta.account.code.clone(),
                name: ta.account.name.clone(),
                account_type: ta.account.account_type,
                balance: Decimal::ZERO,
                contributions: Vec::new(),
                links: AccountLinks::default(),
            });

        entry.balance += contributed;
        entry.contributions.push(Contribution {
            company: tc.company.id.clone(),
            pct: factor * dec!(100),
            amount: contributed,
        });
        if entry.links.is_empty() && !ta.account.links.is_empty() {
            entry.links = ta.account.links.clone();
        }
    }
}

/// Equity method: no per-account merge. A single synthetic investment line
/// carries the ownership share of the company's net income.
fn merge_equity_line(map: &mut ConsolidatedMap, tc: &TranslatedCompany) {
    let factor = tc.company.ownership_pct / dec!(100);
    let amount = tc.net_income() * factor;
    let code = format!("INV-{}", tc.company.id);

    let entry = map.entry(code.clone()).or_insert_with(|| ConsolidatedAccount {
        code,
        name: format!("Investment in {}", tc.company.name),
        account_type: AccountType::Asset,
        balance: Decimal::ZERO,
        contributions: Vec::new(),
        links: AccountLinks {
            investment_in: Some(tc.company.id.clone()),
            ..AccountLinks::default()
        },
    });

    entry.balance += amount;
    entry.contributions.push(Contribution {
        company: tc.company.id.clone(),
        pct: tc.company.ownership_pct,
        amount,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::translator::{RateLookup, TranslatedAccount, TranslatedCompany};
    use crate::ledger::model::{Account, Company};
    use crate::types::Currency;
    use rust_decimal_macros::dec;

    fn translated(
        id: &str,
        ownership: Decimal,
        method: ConsolidationMethod,
        accounts: Vec<Account>,
    ) -> TranslatedCompany {
        TranslatedCompany {
            company: Company {
                id: CompanyId::new(id),
                name: id.to_uppercase(),
                currency: Currency::USD,
                ownership_pct: ownership,
                method,
            },
            rate: RateLookup::Found(Decimal::ONE),
            accounts: accounts
                .into_iter()
                .map(|account| TranslatedAccount {
                    original_balance: account.balance,
                    account,
                })
                .collect(),
            transactions: vec![],
            translation_adjustment: Decimal::ZERO,
            cta_estimated: false,
        }
    }

    #[test]
    fn test_full_method_adds_everything() {
        let tc = translated(
            "parent",
            dec!(100),
            ConsolidationMethod::Full,
            vec![Account::new("1000", "Cash", AccountType::Asset, dec!(900))],
        );
        let map = merge_companies(&[tc]);

        let cash = &map["1000"];
        assert_eq!(cash.balance, dec!(900));
        assert_eq!(cash.contributions.len(), 1);
        assert_eq!(cash.contributions[0].pct, dec!(100));
    }

    #[test]
    fn test_proportional_scales_every_balance() {
        let tc = translated(
            "jv",
            dec!(40),
            ConsolidationMethod::Proportional,
            vec![
                Account::new("1000", "Cash", AccountType::Asset, dec!(1000)),
                Account::new("2000", "Loans", AccountType::Liability, dec!(500)),
            ],
        );
        let map = merge_companies(&[tc]);

        assert_eq!(map["1000"].balance, dec!(400.0));
        assert_eq!(map["2000"].balance, dec!(200.0));
        assert_eq!(map["1000"].contributions[0].pct, dec!(40.0));
    }

    #[test]
    fn test_shared_codes_accumulate_and_append() {
        let a = translated(
            "parent",
            dec!(100),
            ConsolidationMethod::Full,
            vec![Account::new("1000", "Cash", AccountType::Asset, dec!(300))],
        );
        let b = translated(
            "sub",
            dec!(100),
            ConsolidationMethod::Full,
            vec![Account::new("1000", "Cash", AccountType::Asset, dec!(200))],
        );
        let map = merge_companies(&[a, b]);

        let cash = &map["1000"];
        assert_eq!(cash.balance, dec!(500));
        assert_eq!(cash.contributions.len(), 2);
        assert_eq!(cash.contributions[0].company, CompanyId::new("parent"));
        assert_eq!(cash.contributions[1].company, CompanyId::new("sub"));
    }

    #[test]
    fn test_equity_method_single_line_only() {
        let tc = translated(
            "assoc",
            dec!(30),
            ConsolidationMethod::Equity,
            vec![
                Account::new("1000", "Cash", AccountType::Asset, dec!(5000)),
                Account::new("4000", "Sales", AccountType::Revenue, dec!(2000)),
                Account::new("6000", "Wages", AccountType::Expense, dec!(800)),
            ],
        );
        let map = merge_companies(&[tc]);

        assert_eq!(map.len(), 1, "individual accounts must not merge");
        let inv = &map["INV-assoc"];
        assert_eq!(inv.name, "Investment in ASSOC");
        assert_eq!(inv.account_type, AccountType::Asset);
        // (2000 - 800) × 30% = 360
        assert_eq!(inv.balance, dec!(360.0));
        assert_eq!(inv.links.investment_in, Some(CompanyId::new("assoc")));
    }

    #[test]
    fn test_links_carried_from_first_declaring_account() {
        let mut intercompany = Account::new(
            "1200",
            "Intercompany Receivable",
            AccountType::Asset,
            dec!(50),
        );
        intercompany.links.intercompany_with = Some(CompanyId::new("sub"));
        let a = translated(
            "parent",
            dec!(100),
            ConsolidationMethod::Full,
            vec![intercompany],
        );
        let map = merge_companies(&[a]);

        assert_eq!(
            map["1200"].links.intercompany_with,
            Some(CompanyId::new("sub"))
        );
    }
}
