use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::checkin::CheckinWithMember;

/// One row of the daily admin view: either a whole family collapsed into
/// a single entry, or an individual check-in.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TodayEntry {
    Family(FamilyEntry),
    Individual(IndividualEntry),
}

#[derive(Debug, Serialize)]
pub struct FamilyEntry {
    pub checkin_id: Uuid,
    pub email: String,
    pub name: &'static str,
    pub timestamp: DateTime<Utc>,
    pub is_family: bool,
    pub family_members: Vec<IndividualEntry>,
    pub member_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndividualEntry {
    pub checkin_id: Uuid,
    pub member_id: Uuid,
    pub name: String,
    pub email: String,
    pub timestamp: DateTime<Utc>,
}

impl TodayEntry {
    fn timestamp(&self) -> DateTime<Utc> {
        match self {
            TodayEntry::Family(f) => f.timestamp,
            TodayEntry::Individual(i) => i.timestamp,
        }
    }
}

/// Group today's check-ins by email. An email owning more than one
/// non-deleted member in the store renders as one "Family" entry —
/// regardless of how many of them checked in today — stamped with the
/// earliest of today's timestamps for that email. `family_sizes` comes
/// from one batched member count over every email seen.
pub fn group_today(
    rows: Vec<CheckinWithMember>,
    family_sizes: &HashMap<String, i64>,
) -> Vec<TodayEntry> {
    let mut groups: Vec<(String, Vec<IndividualEntry>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let entry = IndividualEntry {
            checkin_id: row.checkin_id,
            member_id: row.member_id,
            name: row.name,
            email: row.email.clone(),
            timestamp: row.timestamp,
        };
        match index.get(&row.email) {
            Some(&i) => groups[i].1.push(entry),
            None => {
                index.insert(row.email.clone(), groups.len());
                groups.push((row.email, vec![entry]));
            }
        }
    }

    let mut result: Vec<TodayEntry> = Vec::with_capacity(groups.len());
    for (email, members) in groups {
        let family_size = family_sizes.get(&email).copied().unwrap_or(0);
        if family_size > 1 {
            let earliest = members
                .iter()
                .map(|m| m.timestamp)
                .min()
                .unwrap_or_else(Utc::now);
            result.push(TodayEntry::Family(FamilyEntry {
                checkin_id: members[0].checkin_id,
                email,
                name: "Family",
                timestamp: earliest,
                is_family: true,
                member_count: members.len(),
                family_members: members,
            }));
        } else {
            result.extend(members.into_iter().map(TodayEntry::Individual));
        }
    }

    result.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
    result
}

/// Bucket granularity for range reports; maps to `date_trunc` units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketUnit {
    Day,
    Week,
    Month,
    Year,
}

impl BucketUnit {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "day" => Some(BucketUnit::Day),
            "week" => Some(BucketUnit::Week),
            "month" => Some(BucketUnit::Month),
            "year" => Some(BucketUnit::Year),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            BucketUnit::Day => "day",
            BucketUnit::Week => "week",
            BucketUnit::Month => "month",
            BucketUnit::Year => "year",
        }
    }
}
