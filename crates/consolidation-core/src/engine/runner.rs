use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use tracing::info;

use crate::eliminations::detector::detect_eliminations;
use crate::eliminations::processor::apply_eliminations;
use crate::error::ConsolidationError;
use crate::fx::translator::{translate_companies, RateSource};
use crate::ledger::model::Company;
use crate::ledger::reader::{read_company_ledgers, LedgerSource};
use crate::merge::method_merger::merge_companies;
use crate::minority::calculator::{calculate_minority_interest, MinorityInterest};
use crate::statements::generator::{generate_statements, FinancialStatements};
use crate::types::{with_metadata, ComputationOutput, Currency, Money};
use crate::ConsolidationResult;

const METHODOLOGY: &str =
    "Multi-Entity Consolidation with Intercompany Elimination and Minority Interest";

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Parameters for one consolidation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationInput {
    pub consolidation_date: NaiveDate,
    pub reporting_currency: Currency,
    pub companies: Vec<Company>,
    pub eliminate_intercompany: bool,
    pub include_currency_translation: bool,
    pub include_minority_interest: bool,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Top-level roll-up handed to callers alongside the statements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationSummary {
    pub companies_consolidated: usize,
    pub eliminations_count: usize,
    pub minority_interest_total: Money,
}

/// Full result of a consolidation run. Immutable once generated; the run
/// recorder persists it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationOutput {
    pub summary: ConsolidationSummary,
    pub statements: FinancialStatements,
    pub minority_interest: MinorityInterest,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Execute a consolidation run: read per-company ledgers, translate to the
/// reporting currency, detect and apply intercompany eliminations, compute
/// minority interest, and generate the statement set.
///
/// Every downstream stage operates on the complete per-company dataset, so
/// ledger reads and translations form a join barrier before elimination
/// detection. All non-fatal conditions accumulate in the output's warnings;
/// only invalid input or storage failure aborts the run.
pub fn run_consolidation(
    input: &ConsolidationInput,
    ledger: &dyn LedgerSource,
    rates: &dyn RateSource,
) -> ConsolidationResult<ComputationOutput<ConsolidationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;

    info!(
        companies = input.companies.len(),
        date = %input.consolidation_date,
        currency = ?input.reporting_currency,
        "starting consolidation run"
    );

    let (ledgers, read_warnings) =
        read_company_ledgers(ledger, &input.companies, input.consolidation_date);
    warnings.extend(read_warnings);

    let (translated, fx_warnings) = translate_companies(
        ledgers,
        &input.reporting_currency,
        rates,
        input.consolidation_date,
        input.include_currency_translation,
    );
    warnings.extend(fx_warnings);

    let entries = if input.eliminate_intercompany {
        detect_eliminations(&translated)
    } else {
        Vec::new()
    };

    let merged = merge_companies(&translated);
    let outcome = apply_eliminations(&merged, &entries);
    for unresolved in &outcome.unresolved {
        warnings.push(format!(
            "Unresolved elimination ({}): {}",
            unresolved.entry.description, unresolved.reason
        ));
    }

    let minority = if input.include_minority_interest {
        calculate_minority_interest(&translated, &outcome.map)
    } else {
        MinorityInterest::default()
    };

    let (statements, statement_warnings) =
        generate_statements(&merged, &outcome, &minority, &translated);
    warnings.extend(statement_warnings);

    let summary = ConsolidationSummary {
        companies_consolidated: translated.len(),
        eliminations_count: outcome.applied.len(),
        minority_interest_total: minority.total_balance,
    };

    info!(
        eliminations = summary.eliminations_count,
        warnings = warnings.len(),
        "consolidation run complete"
    );

    let output = ConsolidationOutput {
        summary,
        statements,
        minority_interest: minority,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(METHODOLOGY, input, warnings, elapsed, output))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_input(input: &ConsolidationInput) -> ConsolidationResult<()> {
    if input.companies.is_empty() {
        return Err(ConsolidationError::InvalidInput {
            field: "companies".into(),
            reason: "At least one company is required".into(),
        });
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for company in &input.companies {
        if !seen.insert(company.id.as_str()) {
            return Err(ConsolidationError::InvalidInput {
                field: "companies".into(),
                reason: format!("Duplicate company id {}", company.id),
            });
        }
        if company.ownership_pct < Decimal::ZERO || company.ownership_pct > dec!(100) {
            return Err(ConsolidationError::InvalidInput {
                field: "ownership_pct".into(),
                reason: format!(
                    "Company {}: ownership must be between 0 and 100, got {}",
                    company.id, company.ownership_pct
                ),
            });
        }
    }

    Ok(())
}
