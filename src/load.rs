//! Member load bookkeeping.
//!
//! Every code path that changes a task's assignee adjusts the team counters
//! through [`apply_assignment_change`]. Selection helpers used by the balancer
//! live here as well so both balancing operations rank members the same way.

use std::collections::HashMap;

use serde::Serialize;

use crate::task::Task;
use crate::team::{Member, Team};

/// Counters touched by one assignment change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub released: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed: Option<String>,
}

impl LoadChange {
    pub fn is_empty(&self) -> bool {
        self.released.is_none() && self.claimed.is_none()
    }
}

/// Move one unit of load from `old` to `new`.
///
/// The old member is decremented (never below zero), the new member is
/// incremented. Unknown member ids are ignored. `old == new` is a no-op.
pub fn apply_assignment_change(
    team: &mut Team,
    old: Option<&str>,
    new: Option<&str>,
) -> LoadChange {
    let mut change = LoadChange::default();
    if old == new {
        return change;
    }

    if let Some(old_id) = old {
        if let Some(member) = team.member_mut(old_id) {
            if member.current_tasks > 0 {
                member.current_tasks -= 1;
                change.released = Some(old_id.to_string());
            }
        }
    }

    if let Some(new_id) = new {
        if let Some(member) = team.member_mut(new_id) {
            member.current_tasks += 1;
            change.claimed = Some(new_id.to_string());
        }
    }

    change
}

/// Undo a change returned by [`apply_assignment_change`]
pub fn revert_assignment_change(team: &mut Team, change: &LoadChange) {
    if let Some(claimed) = change.claimed.as_deref() {
        if let Some(member) = team.member_mut(claimed) {
            member.current_tasks = member.current_tasks.saturating_sub(1);
        }
    }
    if let Some(released) = change.released.as_deref() {
        if let Some(member) = team.member_mut(released) {
            member.current_tasks += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecountChange {
    pub member_id: String,
    pub name: String,
    pub before: u32,
    pub after: u32,
}

/// Set every member counter to the number of `tasks` assigned to it.
///
/// Tasks assigned to ids outside the team are ignored.
pub fn recount(team: &mut Team, tasks: &[Task]) -> Vec<RecountChange> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for task in tasks {
        if let Some(member_id) = task.assigned_member.member_id.as_deref() {
            *counts.entry(member_id).or_default() += 1;
        }
    }

    let mut changes = Vec::new();
    for member in &mut team.members {
        let after = counts.get(member.id.as_str()).copied().unwrap_or(0);
        if member.current_tasks != after {
            changes.push(RecountChange {
                member_id: member.id.clone(),
                name: member.name.clone(),
                before: member.current_tasks,
                after,
            });
            member.current_tasks = after;
        }
    }
    changes
}

/// Member with the strictly smallest load ratio; earlier members win ties.
///
/// Zero-capacity members have no ratio and are never picked.
pub fn least_loaded(team: &Team) -> Option<&Member> {
    let mut best: Option<(&Member, f64)> = None;
    for member in &team.members {
        let Some(ratio) = member.load_ratio() else {
            continue;
        };
        let better = match best {
            Some((_, best_ratio)) => ratio < best_ratio,
            None => true,
        };
        if better {
            best = Some((member, ratio));
        }
    }
    best.map(|(member, _)| member)
}

/// Member that should receive a task taken from `exclude`.
///
/// Candidates are below capacity; the lowest `current_tasks` wins and ties go
/// to the earlier member.
pub fn relief_target<'a>(team: &'a Team, exclude: &str) -> Option<&'a Member> {
    team.members
        .iter()
        .filter(|member| member.id != exclude && member.has_room())
        .fold(None, |best: Option<&Member>, member| match best {
            Some(current) if current.current_tasks <= member.current_tasks => Some(current),
            _ => Some(member),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn member(name: &str, capacity: u32, current: u32) -> Member {
        let mut member = Member::new(name, "dev", capacity);
        member.id = format!("mbr-{}", name.to_lowercase());
        member.current_tasks = current;
        member
    }

    fn team(members: Vec<Member>) -> Team {
        Team {
            id: "team-t".to_string(),
            name: "T".to_string(),
            description: None,
            owner: "alice".to_string(),
            members,
            version: 0,
            created_at: Utc::now(),
        }
    }

    fn current(team: &Team, id: &str) -> u32 {
        team.member(id).unwrap().current_tasks
    }

    #[test]
    fn reassignment_moves_one_unit() {
        let mut team = team(vec![member("A", 3, 2), member("B", 3, 0)]);
        let change = apply_assignment_change(&mut team, Some("mbr-a"), Some("mbr-b"));
        assert_eq!(change.released.as_deref(), Some("mbr-a"));
        assert_eq!(change.claimed.as_deref(), Some("mbr-b"));
        assert_eq!(current(&team, "mbr-a"), 1);
        assert_eq!(current(&team, "mbr-b"), 1);
    }

    #[test]
    fn same_member_is_noop() {
        let mut team = team(vec![member("A", 3, 2)]);
        let change = apply_assignment_change(&mut team, Some("mbr-a"), Some("mbr-a"));
        assert!(change.is_empty());
        assert_eq!(current(&team, "mbr-a"), 2);
    }

    #[test]
    fn release_floors_at_zero() {
        let mut team = team(vec![member("A", 3, 0)]);
        let change = apply_assignment_change(&mut team, Some("mbr-a"), None);
        assert!(change.released.is_none());
        assert_eq!(current(&team, "mbr-a"), 0);
    }

    #[test]
    fn revert_restores_counters() {
        let mut team = team(vec![member("A", 3, 2), member("B", 3, 1)]);
        let before = team.clone();
        let change = apply_assignment_change(&mut team, Some("mbr-a"), Some("mbr-b"));
        revert_assignment_change(&mut team, &change);
        assert_eq!(team, before);
    }

    #[test]
    fn least_loaded_prefers_lowest_ratio() {
        let team = team(vec![member("A", 4, 2), member("B", 5, 1)]);
        assert_eq!(least_loaded(&team).unwrap().name, "B");
    }

    #[test]
    fn least_loaded_ties_go_to_first_and_skip_zero_capacity() {
        let team = team(vec![member("Z", 0, 0), member("A", 2, 1), member("B", 4, 2)]);
        assert_eq!(least_loaded(&team).unwrap().name, "A");

        let idle = team_with_only_zero_capacity();
        assert!(least_loaded(&idle).is_none());
    }

    fn team_with_only_zero_capacity() -> Team {
        team(vec![member("Z", 0, 0)])
    }

    #[test]
    fn relief_target_picks_least_busy_member_with_room() {
        let team = team(vec![
            member("A", 2, 3),
            member("B", 3, 2),
            member("C", 3, 1),
            member("D", 3, 1),
            member("E", 1, 1),
        ]);
        assert_eq!(relief_target(&team, "mbr-a").unwrap().name, "C");
        assert!(relief_target(&team_with_only_zero_capacity(), "mbr-a").is_none());
    }
}
