use std::collections::{BTreeMap, HashMap};

use log::*;
use settle_common::Money;

use crate::{
    db_types::{Bill, BillItem},
    split::{PersonSplit, SplitError, SplitMethod, SplitRequest, SplitResult},
};

/// Amounts within this many cents of the bill total are accepted by a custom split.
const CUSTOM_TOLERANCE: Money = Money::from_cents(1);

/// The largest party a bill can be split between, whatever the method.
pub const MAX_PEOPLE: u32 = 1000;

/// Runs whichever policy the request names.
pub fn split(bill: &Bill, request: &SplitRequest) -> Result<SplitResult, SplitError> {
    match request {
        SplitRequest::Equal { num_people } => equal(bill, *num_people),
        SplitRequest::Custom { amounts, labels } => custom(bill, amounts, labels),
        SplitRequest::Items { assignments, labels } => by_items(bill, assignments, labels),
    }
}

/// Splits the bill evenly between `num_people` participants, named `Person 1`, `Person 2`, ...
///
/// Each of the total, tax, service fee and subtotal is divided separately and rounded to the cent. The difference
/// between the bill total and the sum of the rounded shares is added to the last participant's amount.
pub fn equal(bill: &Bill, num_people: u32) -> Result<SplitResult, SplitError> {
    check_party_size(num_people as usize)?;
    let share = |m: Money| m.split_even(num_people);
    let (Some(amount), Some(tax), Some(fee), Some(subtotal)) =
        (share(bill.total_amount), share(bill.tax_amount), share(bill.service_fee_amount), share(bill.subtotal))
    else {
        return Err(SplitError::InvalidArgument("The number of people must be greater than zero".into()));
    };
    let mut splits = (1..=num_people)
        .map(|i| PersonSplit {
            person_id: format!("person_{i}"),
            name: format!("Person {i}"),
            amount,
            tax_share: tax,
            service_fee_share: fee,
            subtotal_share: subtotal,
            items: None,
        })
        .collect::<Vec<_>>();
    let residual = bill.total_amount - amount * i64::from(num_people);
    absorb_residual(&mut splits, residual);
    debug!("🧾️ Split bill #{} ({}) evenly {num_people} ways", bill.id, bill.total_amount);
    Ok(SplitResult { method: SplitMethod::Equal, bill_id: bill.id, total_amount: bill.total_amount, splits })
}

/// Splits the bill according to the amounts each person has chosen to pay.
///
/// The amounts must add up to the bill total, give or take a cent. Tax, service fee and subtotal shares are in
/// proportion to `amount / total`.
pub fn custom(
    bill: &Bill,
    amounts: &BTreeMap<String, Money>,
    labels: &HashMap<String, String>,
) -> Result<SplitResult, SplitError> {
    if amounts.is_empty() {
        return Err(SplitError::InvalidArgument("No amounts were provided".into()));
    }
    check_party_size(amounts.len())?;
    if let Some((person, amount)) = amounts.iter().find(|(_, a)| a.is_negative()) {
        return Err(SplitError::InvalidArgument(format!("{person} has a negative amount ({amount})")));
    }
    let total = bill.total_amount;
    let allocated = amounts
        .values()
        .try_fold(Money::ZERO, |sum, &amount| sum.checked_add(amount))
        .ok_or_else(|| SplitError::InvalidArgument("The amounts are too large to add up".into()))?;
    if (allocated - total).abs() > CUSTOM_TOLERANCE {
        return Err(SplitError::Inconsistent { allocated, total });
    }
    let mut splits = amounts
        .iter()
        .map(|(person, &amount)| PersonSplit {
            person_id: person.clone(),
            name: label_for(person, labels),
            amount,
            tax_share: bill.tax_amount.pro_rata(amount, total),
            service_fee_share: bill.service_fee_amount.pro_rata(amount, total),
            subtotal_share: bill.subtotal.pro_rata(amount, total),
            items: None,
        })
        .collect::<Vec<_>>();
    absorb_residual(&mut splits, total - allocated);
    debug!("🧾️ Split bill #{} ({total}) between {} people by amount", bill.id, splits.len());
    Ok(SplitResult { method: SplitMethod::Custom, bill_id: bill.id, total_amount: total, splits })
}

/// Splits the bill by who ordered what. `assignments` maps each person to the ids of the items they are paying for.
///
/// Every item on the bill must be claimed by exactly one person. Tax and service fee are shared in proportion to each
/// person's part of the bill subtotal. The bill's items must be loaded.
pub fn by_items(
    bill: &Bill,
    assignments: &BTreeMap<String, Vec<i64>>,
    labels: &HashMap<String, String>,
) -> Result<SplitResult, SplitError> {
    if assignments.is_empty() {
        return Err(SplitError::InvalidArgument("No item assignments were provided".into()));
    }
    check_party_size(assignments.len())?;
    let items_by_id = bill.items.iter().map(|i| (i.id, i)).collect::<HashMap<i64, &BillItem>>();
    let mut claimed = HashMap::<i64, &str>::new();
    for (person, item_ids) in assignments {
        for id in item_ids {
            if !items_by_id.contains_key(id) {
                return Err(SplitError::NotFound(*id));
            }
            if let Some(other) = claimed.insert(*id, person.as_str()) {
                return Err(SplitError::InvalidArgument(format!(
                    "Item {id} is claimed by both {other} and {person}"
                )));
            }
        }
    }
    if let Some(item) = bill.items.iter().find(|i| !claimed.contains_key(&i.id)) {
        return Err(SplitError::Incomplete { item_id: item.id, item_name: item.name.clone() });
    }

    let mut splits = assignments
        .iter()
        .map(|(person, item_ids)| {
            let items = item_ids.iter().filter_map(|id| items_by_id.get(id).map(|&i| i.clone())).collect::<Vec<_>>();
            let subtotal: Money = items.iter().map(|i| i.subtotal).sum();
            let tax_share = bill.tax_amount.pro_rata(subtotal, bill.subtotal);
            let service_fee_share = bill.service_fee_amount.pro_rata(subtotal, bill.subtotal);
            PersonSplit {
                person_id: person.clone(),
                name: label_for(person, labels),
                amount: subtotal + tax_share + service_fee_share,
                tax_share,
                service_fee_share,
                subtotal_share: subtotal,
                items: Some(items),
            }
        })
        .collect::<Vec<_>>();

    let allocated: Money = splits.iter().map(|s| s.amount).sum();
    let residual = bill.total_amount - allocated;
    // Rounding two shares per person can drift by at most a cent each
    let max_drift = Money::from_cents(2 * i64::try_from(splits.len()).unwrap_or(i64::MAX / 2));
    if residual.abs() > max_drift {
        warn!("🧾️ Items on bill #{} do not add up to its subtotal. {allocated} != {}", bill.id, bill.total_amount);
        return Err(SplitError::Inconsistent { allocated, total: bill.total_amount });
    }
    absorb_residual(&mut splits, residual);
    debug!("🧾️ Split bill #{} ({}) between {} people by item", bill.id, bill.total_amount, splits.len());
    Ok(SplitResult { method: SplitMethod::Items, bill_id: bill.id, total_amount: bill.total_amount, splits })
}

fn check_party_size(people: usize) -> Result<(), SplitError> {
    if people > MAX_PEOPLE as usize {
        return Err(SplitError::InvalidArgument(format!(
            "A bill can be split between at most {MAX_PEOPLE} people, not {people}"
        )));
    }
    Ok(())
}

fn absorb_residual(splits: &mut [PersonSplit], residual: Money) {
    if let Some(last) = splits.last_mut() {
        last.amount += residual;
    }
}

fn label_for(person: &str, labels: &HashMap<String, String>) -> String {
    labels.get(person).cloned().unwrap_or_else(|| person.to_string())
}
