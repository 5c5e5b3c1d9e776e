//! Expansion of a [`SplitRule`] into concrete [`Split`]s.
//!
//! Proportional rules round every share half-up, then hand out the residual
//! cents one at a time starting from the first participant, so the shares
//! always add up to the expense amount.

use crate::{EngineError, ExpenseItem, ItemInput, Money, Participant, ResultEngine, SplitRule};
use crate::{Split, util::new_id};

const FULL_BASIS_POINTS: u32 = 10_000;

/// Splits and items produced by a rule.
#[derive(Debug, Default)]
pub(crate) struct Expansion {
    pub splits: Vec<Split>,
    pub items: Vec<ExpenseItem>,
}

pub(crate) fn expand_rule(amount: Money, rule: &SplitRule) -> ResultEngine<Expansion> {
    match rule {
        SplitRule::Equal { participants } => {
            ensure_not_empty(participants.len())?;
            let splits = participants
                .iter()
                .cloned()
                .zip(amount.split_even(participants.len()))
                .map(|(p, a)| Split::new(p, a))
                .collect();
            Ok(Expansion {
                splits,
                items: Vec::new(),
            })
        }
        SplitRule::Exact { amounts } => {
            ensure_not_empty(amounts.len())?;
            if amounts.iter().any(|(_, a)| a.is_negative()) {
                return Err(EngineError::InvalidAmount(
                    "split amounts must be >= 0".to_string(),
                ));
            }
            Ok(Expansion {
                splits: amounts
                    .iter()
                    .map(|(p, a)| Split::new(p.clone(), *a))
                    .collect(),
                items: Vec::new(),
            })
        }
        SplitRule::Percentage { basis_points } => {
            ensure_not_empty(basis_points.len())?;
            let total: u64 = basis_points.iter().map(|(_, bp)| u64::from(*bp)).sum();
            if total != u64::from(FULL_BASIS_POINTS) {
                return Err(EngineError::InvalidAmount(format!(
                    "percentages must add up to 100%, got {}.{:02}%",
                    total / 100,
                    total % 100
                )));
            }
            proportional(amount, basis_points, i64::from(FULL_BASIS_POINTS))
        }
        SplitRule::Shares { weights } => {
            ensure_not_empty(weights.len())?;
            let total: i64 = weights.iter().map(|(_, w)| i64::from(*w)).sum();
            if total == 0 {
                return Err(EngineError::InvalidAmount(
                    "share weights must not all be zero".to_string(),
                ));
            }
            proportional(amount, weights, total)
        }
        SplitRule::Itemized { items } => itemized(items),
    }
}

fn ensure_not_empty(len: usize) -> ResultEngine<()> {
    if len == 0 {
        return Err(EngineError::InvalidInput(
            "an expense needs at least one split".to_string(),
        ));
    }
    Ok(())
}

fn proportional(
    amount: Money,
    weights: &[(Participant, u32)],
    denominator: i64,
) -> ResultEngine<Expansion> {
    let mut shares = weights
        .iter()
        .map(|(_, w)| {
            amount
                .mul_ratio_half_up(i64::from(*w), denominator)
                .ok_or_else(|| EngineError::InvalidAmount("split amount overflow".to_string()))
        })
        .collect::<ResultEngine<Vec<Money>>>()?;
    distribute_residual(amount, &mut shares)?;

    Ok(Expansion {
        splits: weights
            .iter()
            .zip(shares)
            .map(|((p, _), a)| Split::new(p.clone(), a))
            .collect(),
        items: Vec::new(),
    })
}

/// Moves shares one cent at a time, from the first participant on, until
/// they add up to `amount`. A share never goes below zero.
fn distribute_residual(amount: Money, shares: &mut [Money]) -> ResultEngine<()> {
    let overflow = || EngineError::InvalidAmount("split amount overflow".to_string());
    let one = Money::new(1);
    let total = shares
        .iter()
        .try_fold(Money::ZERO, |acc, share| acc.checked_add(*share))
        .ok_or_else(overflow)?;
    let mut residual = amount.checked_sub(total).ok_or_else(overflow)?;
    let mut idx = 0;
    while !residual.is_zero() && !shares.is_empty() {
        let share = &mut shares[idx % shares.len()];
        if residual.is_positive() {
            *share += one;
            residual -= one;
        } else if share.is_positive() {
            *share -= one;
            residual += one;
        }
        idx += 1;
    }
    Ok(())
}

fn itemized(items: &[ItemInput]) -> ResultEngine<Expansion> {
    ensure_not_empty(items.len())?;
    let mut expansion = Expansion::default();

    for item in items {
        if !item.amount.is_positive() {
            return Err(EngineError::InvalidAmount(format!(
                "item \"{}\" must have a positive amount",
                item.name
            )));
        }
        if item.amount > Money::MAX {
            return Err(EngineError::InvalidAmount(format!(
                "item \"{}\" must be <= {}",
                item.name,
                Money::MAX
            )));
        }
        let mut involved: Vec<Participant> = Vec::with_capacity(item.involved.len());
        for participant in &item.involved {
            if !involved.contains(participant) {
                involved.push(participant.clone());
            }
        }
        if involved.is_empty() {
            return Err(EngineError::InvalidInput(format!(
                "item \"{}\" involves nobody",
                item.name
            )));
        }

        for (participant, share) in involved.iter().zip(item.amount.split_even(involved.len())) {
            match expansion
                .splits
                .iter_mut()
                .find(|s| &s.participant == participant)
            {
                Some(split) => {
                    split.amount = split.amount.checked_add(share).ok_or_else(|| {
                        EngineError::InvalidAmount("split amount overflow".to_string())
                    })?;
                }
                None => expansion
                    .splits
                    .push(Split::new(participant.clone(), share)),
            }
        }
        expansion.items.push(ExpenseItem {
            id: new_id(),
            name: item.name.trim().to_string(),
            amount: item.amount,
            involved,
        });
    }

    Ok(expansion)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: &str) -> Participant {
        Participant::registered(id)
    }

    fn cents(expansion: &Expansion) -> Vec<i64> {
        expansion.splits.iter().map(|s| s.amount.cents()).collect()
    }

    #[test]
    fn equal_split_gives_leftover_to_first() {
        let rule = SplitRule::Equal {
            participants: vec![p("a"), p("b"), p("c")],
        };
        let expansion = expand_rule(Money::new(10_000), &rule).unwrap();
        assert_eq!(cents(&expansion), vec![3334, 3333, 3333]);
    }

    #[test]
    fn percentage_must_cover_everything() {
        let rule = SplitRule::Percentage {
            basis_points: vec![(p("a"), 5000), (p("b"), 4000)],
        };
        let err = expand_rule(Money::new(1000), &rule).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }

    #[test]
    fn percentage_rounds_half_up_then_rebalances() {
        // 1/3 each of 1.00: 33.33% rounds to 33 cents, the spare cent goes
        // to the first participant.
        let rule = SplitRule::Percentage {
            basis_points: vec![(p("a"), 3334), (p("b"), 3333), (p("c"), 3333)],
        };
        let expansion = expand_rule(Money::new(100), &rule).unwrap();
        assert_eq!(cents(&expansion), vec![34, 33, 33]);

        // Half-up rounding overshoots here: 5 x 0.5 cent would round to 5.
        let rule = SplitRule::Shares {
            weights: vec![(p("a"), 1), (p("b"), 1), (p("c"), 1), (p("d"), 1)],
        };
        let expansion = expand_rule(Money::new(2), &rule).unwrap();
        assert_eq!(cents(&expansion).iter().sum::<i64>(), 2);
    }

    #[test]
    fn shares_are_proportional() {
        let rule = SplitRule::Shares {
            weights: vec![(p("a"), 2), (p("b"), 1)],
        };
        let expansion = expand_rule(Money::new(900), &rule).unwrap();
        assert_eq!(cents(&expansion), vec![600, 300]);
    }

    #[test]
    fn itemized_merges_participants() {
        let rule = SplitRule::Itemized {
            items: vec![
                ItemInput::new("pizza", Money::new(1500), vec![p("a"), p("b"), p("c")]),
                ItemInput::new("wine", Money::new(1000), vec![p("a"), p("b")]),
            ],
        };
        let expansion = expand_rule(Money::new(2500), &rule).unwrap();
        assert_eq!(cents(&expansion), vec![1000, 1000, 500]);
        assert_eq!(expansion.items.len(), 2);
        assert_eq!(expansion.items[1].involved, vec![p("a"), p("b")]);
    }

    #[test]
    fn itemized_rejects_empty_involvement() {
        let rule = SplitRule::Itemized {
            items: vec![ItemInput::new("tip", Money::new(100), Vec::new())],
        };
        assert!(matches!(
            expand_rule(Money::new(100), &rule),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn exact_rejects_negative_amounts() {
        let rule = SplitRule::Exact {
            amounts: vec![(p("a"), Money::new(-1)), (p("b"), Money::new(101))],
        };
        assert!(expand_rule(Money::new(100), &rule).is_err());
    }
}
