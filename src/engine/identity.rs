//! Patient identity resolution.
//!
//! No external patient id is collected at intake, so the same person is
//! recognized across submissions only by (name, age, gender). Deliberately
//! lossy: two real patients sharing all three collide into one record.

use crate::models::Patient;

/// Find an existing patient matching the intake attributes.
///
/// `existing` must already be scoped to the owner and ordered
/// most-recent-first; the first exact-key match wins (name and gender
/// case-insensitive, age exact). `None` signals the caller to create a new
/// record.
pub fn resolve<'a>(
    existing: &'a [Patient],
    name: &str,
    age: i64,
    gender: &str,
) -> Option<&'a Patient> {
    existing.iter().find(|p| {
        p.age == age
            && p.name.eq_ignore_ascii_case(name)
            && p.gender.eq_ignore_ascii_case(gender)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(id: i64, name: &str, age: i64, gender: &str) -> Patient {
        Patient {
            id,
            user_id: 1,
            name: name.to_string(),
            age,
            gender: gender.to_string(),
            phone: None,
            created_at: 0,
        }
    }

    #[test]
    fn match_is_case_insensitive_on_name_and_gender() {
        let existing = vec![patient(1, "Ravi", 40, "Male")];
        let found = resolve(&existing, "ravi", 40, "male");
        assert_eq!(found.map(|p| p.id), Some(1));
    }

    #[test]
    fn age_must_match_exactly() {
        let existing = vec![patient(1, "Ravi", 40, "Male")];
        assert!(resolve(&existing, "Ravi", 41, "Male").is_none());
    }

    #[test]
    fn first_match_wins_in_store_order() {
        // Most-recent-first input; duplicates resolve to the newest record.
        let existing = vec![
            patient(7, "Ravi", 40, "Male"),
            patient(3, "Ravi", 40, "Male"),
        ];
        let found = resolve(&existing, "Ravi", 40, "Male");
        assert_eq!(found.map(|p| p.id), Some(7));
    }

    #[test]
    fn no_match_signals_creation() {
        let existing = vec![patient(1, "Ravi", 40, "Male")];
        assert!(resolve(&existing, "Anita", 29, "Female").is_none());
    }
}
