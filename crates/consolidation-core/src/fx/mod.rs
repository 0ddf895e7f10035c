pub mod translator;

pub use translator::{
    translate_companies, RateLookup, RateSource, TranslatedAccount, TranslatedCompany,
    TranslatedTransaction,
};
