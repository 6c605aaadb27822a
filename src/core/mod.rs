mod ledger;
mod types;

pub use ledger::{
    LedgerError, add_expense, add_income, add_investment, normalize_entry_name,
    normalize_investment_name, remove_expense, remove_income, remove_investment,
    replace_expenses, update_expense, update_fixed,
};
pub use types::{Document, Entry, FixedAmounts, Investment, NewEntry, NewInvestment};
