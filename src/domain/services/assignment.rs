//! Lead distribution across active employees.
//!
//! For every lead the assigner narrows the candidates to those whose language
//! and location both match, then language only, then everyone, and picks the
//! least-loaded employee in that set (lowest id on ties). Each pick adds one
//! to the chosen employee's load so a batch spreads evenly.

use std::collections::HashMap;

use crate::domain::{Lead, User};

#[derive(Debug, Clone)]
struct Slot {
    id: i64,
    language: Option<String>,
    location: Option<String>,
    load: i64,
}

fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

/// Stateful assigner for one batch of leads.
#[derive(Debug, Clone)]
pub struct LeadAssigner {
    slots: Vec<Slot>,
}

impl LeadAssigner {
    /// `loads` maps employee id to their current open + ongoing lead count.
    /// Inactive users and admins are ignored.
    pub fn new(employees: &[User], loads: &HashMap<i64, i64>) -> Self {
        let mut slots: Vec<Slot> = employees
            .iter()
            .filter(|e| e.is_active() && !e.is_admin())
            .map(|e| Slot {
                id: e.id,
                language: normalize(e.language.as_deref()),
                location: normalize(e.location.as_deref()),
                load: loads.get(&e.id).copied().unwrap_or(0),
            })
            .collect();
        slots.sort_by_key(|s| s.id);
        Self { slots }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Count a lead that already has an owner against that owner's load.
    pub fn record(&mut self, employee_id: i64) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.id == employee_id) {
            slot.load += 1;
        }
    }

    /// Pick an assignee for `lead` and count it against their load.
    pub fn assign(&mut self, lead: &Lead) -> Option<i64> {
        let language = normalize(lead.language.as_deref());
        let location = normalize(lead.location.as_deref());

        let lang_match = |s: &Slot| language.is_some() && s.language == language;
        let full_match = |s: &Slot| lang_match(s) && location.is_some() && s.location == location;

        let pick = |pred: &dyn Fn(&Slot) -> bool| {
            self.slots
                .iter()
                .enumerate()
                .filter(|(_, s)| pred(s))
                .min_by_key(|(_, s)| (s.load, s.id))
                .map(|(i, _)| i)
        };

        let index = pick(&full_match)
            .or_else(|| pick(&lang_match))
            .or_else(|| pick(&|_| true))?;

        let slot = &mut self.slots[index];
        slot.load += 1;
        Some(slot.id)
    }

    /// Assign every lead in place, returning how many received an assignee.
    pub fn assign_all(&mut self, leads: &mut [Lead]) -> usize {
        leads
            .iter_mut()
            .map(|lead| {
                lead.assigned_to = self.assign(lead);
                lead.assigned_to.is_some()
            })
            .filter(|assigned| *assigned)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{UserRole, UserStatus};
    use pretty_assertions::assert_eq;

    fn employee(id: i64, language: &str, location: &str) -> User {
        User {
            id,
            name: format!("emp{}", id),
            role: UserRole::Employee,
            language: Some(language.into()),
            location: Some(location.into()),
            ..User::default()
        }
    }

    fn lead(language: Option<&str>, location: Option<&str>) -> Lead {
        Lead {
            language: language.map(Into::into),
            location: location.map(Into::into),
            ..Lead::default()
        }
    }

    #[test]
    fn prefers_language_and_location_match() {
        let staff = vec![
            employee(1, "Hindi", "Pune"),
            employee(2, "Hindi", "Delhi"),
            employee(3, "Tamil", "Delhi"),
        ];
        let mut assigner = LeadAssigner::new(&staff, &HashMap::new());
        assert_eq!(assigner.assign(&lead(Some("hindi"), Some("delhi"))), Some(2));
    }

    #[test]
    fn falls_back_to_language_then_anyone() {
        let staff = vec![employee(1, "Hindi", "Pune"), employee(2, "Tamil", "Chennai")];
        let mut assigner = LeadAssigner::new(&staff, &HashMap::new());
        assert_eq!(assigner.assign(&lead(Some("Tamil"), Some("Mumbai"))), Some(2));
        // No language match: least loaded overall; 1 has load 0, 2 has load 1.
        assert_eq!(assigner.assign(&lead(Some("Bengali"), None)), Some(1));
    }

    #[test]
    fn spreads_batch_by_load() {
        let staff = vec![employee(1, "English", "X"), employee(2, "English", "X")];
        let loads = HashMap::from([(1, 2), (2, 0)]);
        let mut assigner = LeadAssigner::new(&staff, &loads);
        let mut batch: Vec<Lead> = (0..4).map(|_| lead(Some("English"), Some("X"))).collect();

        assert_eq!(assigner.assign_all(&mut batch), 4);
        let picks: Vec<_> = batch.iter().map(|l| l.assigned_to.unwrap()).collect();
        assert_eq!(picks, vec![2, 2, 1, 2]);
    }

    #[test]
    fn recorded_owners_count_toward_load() {
        let staff = vec![employee(1, "English", "X"), employee(2, "English", "X")];
        let mut assigner = LeadAssigner::new(&staff, &HashMap::new());
        assigner.record(1);
        assigner.record(99);
        assert_eq!(assigner.assign(&lead(None, None)), Some(2));
        assert_eq!(assigner.assign(&lead(None, None)), Some(1));
    }

    #[test]
    fn ignores_inactive_and_admins() {
        let mut inactive = employee(1, "English", "X");
        inactive.status = UserStatus::Inactive;
        let mut admin = employee(2, "English", "X");
        admin.role = UserRole::Admin;

        let mut assigner = LeadAssigner::new(&[inactive, admin], &HashMap::new());
        assert!(assigner.is_empty());
        assert_eq!(assigner.assign(&lead(Some("English"), None)), None);
    }
}
