use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Streaks {
    pub current: u32,
    pub highest: u32,
}

/// Walk consecutive-day runs over a member's distinct check-in dates.
/// `current` only counts if the most recent date is today or yesterday;
/// an older tail means the streak is broken regardless of its length.
pub fn calculate(dates: &[NaiveDate], today: NaiveDate) -> Streaks {
    if dates.is_empty() {
        return Streaks { current: 0, highest: 0 };
    }

    let mut distinct: Vec<NaiveDate> = dates.to_vec();
    distinct.sort_unstable();
    distinct.dedup();

    let mut highest = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;

    for &date in &distinct {
        run = match prev {
            Some(p) if (date - p).num_days() == 1 => run + 1,
            _ => 1,
        };
        highest = highest.max(run);
        prev = Some(date);
    }

    let last = distinct[distinct.len() - 1];
    let current = if (today - last).num_days() <= 1 { run } else { 0 };

    Streaks { current, highest }
}
