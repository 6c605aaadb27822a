use thiserror::Error;

use super::types::{Document, Entry, FixedAmounts, Investment, NewEntry, NewInvestment};

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("Gasto não encontrado")]
    ExpenseNotFound(String),
    #[error("Valor fora do intervalo permitido para {0}")]
    AmountOutOfRange(String),
}

/// Income and expense names are only trimmed.
pub fn normalize_entry_name(name: &str) -> String {
    name.trim().to_string()
}

/// Investment names are compared and stored uppercased, without trimming.
pub fn normalize_investment_name(name: &str) -> String {
    name.to_uppercase()
}

pub fn add_income(doc: &mut Document, new: NewEntry) -> &[Entry] {
    doc.incomes.push(entry_from(new));
    &doc.incomes
}

pub fn remove_income<'a>(doc: &'a mut Document, name: &str, date: &str) -> &'a [Entry] {
    remove_entries(&mut doc.incomes, name, date);
    &doc.incomes
}

pub fn add_expense(doc: &mut Document, new: NewEntry) -> &[Entry] {
    doc.expenses.push(entry_from(new));
    &doc.expenses
}

pub fn remove_expense<'a>(doc: &'a mut Document, name: &str, date: &str) -> &'a [Entry] {
    remove_entries(&mut doc.expenses, name, date);
    &doc.expenses
}

/// Overwrites the amount of the first expense whose name matches
/// case-insensitively. Later matches are left alone.
pub fn update_expense<'a>(
    doc: &'a mut Document,
    name: &str,
    amount: f64,
) -> Result<&'a [Entry], LedgerError> {
    let wanted = name.to_lowercase();
    let target = doc
        .expenses
        .iter_mut()
        .find(|expense| expense.name.to_lowercase() == wanted)
        .ok_or_else(|| LedgerError::ExpenseNotFound(name.to_string()))?;
    target.amount = amount;
    Ok(&doc.expenses)
}

pub fn replace_expenses(doc: &mut Document, expenses: Vec<Entry>) -> &[Entry] {
    doc.expenses = expenses;
    &doc.expenses
}

/// Merges into an existing (name, kind) position when there is one,
/// otherwise appends. The merged position takes the new date.
///
/// Totals that would stop being finite are rejected and leave the position
/// as it was; JSON has no representation for them.
pub fn add_investment(
    doc: &mut Document,
    new: NewInvestment,
) -> Result<&[Investment], LedgerError> {
    match doc
        .investments
        .iter_mut()
        .find(|inv| inv.name == new.name && inv.kind == new.kind)
    {
        Some(existing) => {
            let quantity = existing.quantity + new.quantity;
            let amount = existing.amount + new.amount;
            if !(quantity.is_finite() && amount.is_finite()) {
                return Err(LedgerError::AmountOutOfRange(new.name));
            }
            existing.quantity = quantity;
            existing.amount = amount;
            existing.date = new.date;
        }
        None => {
            if !(new.quantity.is_finite() && new.amount.is_finite()) {
                return Err(LedgerError::AmountOutOfRange(new.name));
            }
            doc.investments.push(Investment {
                name: new.name,
                kind: new.kind,
                quantity: new.quantity,
                amount: new.amount,
                date: new.date,
                extra: Default::default(),
            });
        }
    }
    Ok(&doc.investments)
}

pub fn remove_investment<'a>(doc: &'a mut Document, name: &str, kind: &str) -> &'a [Investment] {
    doc.investments.retain(|inv| !(inv.name == name && inv.kind == kind));
    &doc.investments
}

pub fn update_fixed(doc: &mut Document, fixed: FixedAmounts) -> FixedAmounts {
    doc.fixed = fixed;
    doc.fixed
}

fn entry_from(new: NewEntry) -> Entry {
    Entry {
        name: new.name,
        amount: new.amount,
        date: new.date,
        extra: Default::default(),
    }
}

fn remove_entries(entries: &mut Vec<Entry>, name: &str, date: &str) {
    entries.retain(|entry| !(entry.name == name && entry.date == date));
}
