//! Dietary conflict rules.
//!
//! Religious restrictions are checked against the item's dietary flags. Allergies
//! are only matched by name (case-insensitive substring), so an allergy to
//! "shellfish" will not flag "Prawn Curry". That heuristic is kept on purpose
//! until menu items carry real ingredient tags.

use crate::data_types::{DietaryProfile, Menu, MenuItem, Religion, ReligiousRestrictions, User};

pub fn avoided_items(religion: Religion) -> Vec<String> {
    let items: &[&str] = match religion {
        Religion::Muslim => &["pork", "alcohol"],
        Religion::Hindu => &["beef"],
        Religion::Jewish => &["pork", "shellfish"],
        Religion::Buddhist | Religion::None | Religion::Other => &[],
    };
    items.iter().map(|s| s.to_string()).collect()
}

impl ReligiousRestrictions {
    pub fn for_religion(religion: Religion) -> ReligiousRestrictions {
        ReligiousRestrictions {
            religion,
            avoid_items: avoided_items(religion),
            requires_halal: religion == Religion::Muslim,
            requires_kosher: religion == Religion::Jewish,
        }
    }
}

impl DietaryProfile {
    /// Replaces the whole religious block, never merges with the previous one.
    pub fn set_religion(&mut self, religion: Religion) {
        self.religious_restrictions = ReligiousRestrictions::for_religion(religion);
    }

    /// Re-derives the religious block from its religion tag, discarding any drift.
    pub fn normalized(mut self) -> DietaryProfile {
        let religion = self.religious_restrictions.religion;
        self.set_religion(religion);
        self
    }

    fn avoids(&self, token: &str) -> bool {
        self.religious_restrictions
            .avoid_items
            .iter()
            .any(|item| item == token)
    }
}

pub fn item_conflicts(user: &User, item: &MenuItem) -> bool {
    let profile = &user.dietary_profile;
    (profile.avoids("pork") && item.dietary_flags.contains_pork)
        || (profile.avoids("beef") && item.dietary_flags.contains_beef)
}

pub fn allergy_matches(user: &User, item: &MenuItem) -> bool {
    let name = item.name.to_lowercase();
    user.dietary_profile
        .food_allergies
        .iter()
        .filter(|allergy| !allergy.trim().is_empty())
        .any(|allergy| name.contains(&allergy.to_lowercase()))
}

pub fn evaluate_menu<'m>(user: &User, menu: &'m Menu) -> Vec<&'m MenuItem> {
    menu.items
        .iter()
        .filter(|item| item_conflicts(user, item))
        .collect()
}

/// Broader check used on the galley roster: religious flags plus allergy names.
pub fn galley_conflicts<'m>(user: &User, menu: &'m Menu) -> Vec<&'m MenuItem> {
    menu.items
        .iter()
        .filter(|item| item_conflicts(user, item) || allergy_matches(user, item))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DietaryAlert {
    pub menu: Menu,
    pub conflicting_items: Vec<MenuItem>,
}

impl DietaryAlert {
    pub fn alternatives(&self) -> &[MenuItem] {
        &self.menu.alternatives
    }
}

/// First menu in `menus` order that conflicts with the user's profile.
pub fn first_conflict(user: &User, menus: &[Menu]) -> Option<DietaryAlert> {
    menus.iter().find_map(|menu| {
        let conflicting = evaluate_menu(user, menu);
        if conflicting.is_empty() {
            None
        } else {
            Some(DietaryAlert {
                conflicting_items: conflicting.into_iter().cloned().collect(),
                menu: menu.clone(),
            })
        }
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data_types::{Category, DietaryFlags, MealType};
    use chrono::NaiveDate;

    pub(crate) fn item(id: &str, name: &str, pork: bool, beef: bool) -> MenuItem {
        MenuItem {
            item_id: id.to_string(),
            name: name.to_string(),
            category: Category::Main,
            estimated_calories: 300,
            dietary_flags: DietaryFlags {
                contains_pork: pork,
                contains_beef: beef,
                ..Default::default()
            },
            image_url: None,
        }
    }

    pub(crate) fn menu(id: &str, items: Vec<MenuItem>) -> Menu {
        Menu {
            menu_id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
            meal_type: MealType::Lunch,
            items,
            alternatives: vec![],
        }
    }

    fn crew_with(religion: Religion) -> User {
        let mut user = User::new_crew("A12345678", "Ahmed Hassan", "AB");
        user.dietary_profile.set_religion(religion);
        user
    }

    #[test]
    fn avoided_items_table() {
        assert_eq!(avoided_items(Religion::Muslim), vec!["pork", "alcohol"]);
        assert_eq!(avoided_items(Religion::Hindu), vec!["beef"]);
        assert_eq!(avoided_items(Religion::Jewish), vec!["pork", "shellfish"]);
        assert!(avoided_items(Religion::Buddhist).is_empty());
        assert!(avoided_items(Religion::None).is_empty());
        assert!(avoided_items(Religion::Other).is_empty());

        let muslim = ReligiousRestrictions::for_religion(Religion::Muslim);
        assert!(muslim.requires_halal && !muslim.requires_kosher);
        let jewish = ReligiousRestrictions::for_religion(Religion::Jewish);
        assert!(jewish.requires_kosher && !jewish.requires_halal);
    }

    #[test]
    fn changing_religion_replaces_avoided_items() {
        let mut profile = DietaryProfile::default();
        profile.set_religion(Religion::Jewish);
        profile.set_religion(Religion::Hindu);
        assert_eq!(profile.religious_restrictions.avoid_items, vec!["beef"]);
        assert!(!profile.religious_restrictions.requires_kosher);
    }

    #[test]
    fn normalized_discards_drift() {
        let mut profile = DietaryProfile::default();
        profile.religious_restrictions.religion = Religion::Hindu;
        profile.religious_restrictions.avoid_items = vec!["pork".into(), "chocolate".into()];
        profile.religious_restrictions.requires_halal = true;

        let profile = profile.normalized();
        assert_eq!(profile.religious_restrictions, ReligiousRestrictions::for_religion(Religion::Hindu));
    }

    #[test]
    fn pork_conflicts_for_muslim_crew() {
        let user = crew_with(Religion::Muslim);
        let lunch = menu(
            "m2",
            vec![item("i3", "Pork Afritada Stew", true, false), item("i4", "Steamed Rice", false, false)],
        );

        let conflicts = evaluate_menu(&user, &lunch);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].item_id, "i3");
    }

    #[test]
    fn beef_conflicts_only_when_avoided() {
        let steak = menu("m3", vec![item("i6", "Grilled Beef Steak", false, true)]);
        assert_eq!(evaluate_menu(&crew_with(Religion::Hindu), &steak).len(), 1);
        assert!(evaluate_menu(&crew_with(Religion::Muslim), &steak).is_empty());
    }

    #[test]
    fn no_avoided_items_means_no_conflicts() {
        let mut user = crew_with(Religion::None);
        user.dietary_profile.food_allergies = vec!["Rice".into()];
        let lunch = menu(
            "m2",
            vec![item("i3", "Pork Afritada Stew", true, true), item("i4", "Steamed Rice", false, false)],
        );
        assert!(evaluate_menu(&user, &lunch).is_empty());
        // the galley view still picks up the allergy name match
        assert_eq!(galley_conflicts(&user, &lunch).len(), 1);
    }

    #[test]
    fn allergy_match_is_substring_on_name() {
        let mut user = crew_with(Religion::None);
        user.dietary_profile.food_allergies = vec!["shellfish".into(), "EGG".into()];

        assert!(allergy_matches(&user, &item("i1", "Scrambled Eggs (2)", false, false)));
        // known limitation: prawns are shellfish but the name does not say so
        assert!(!allergy_matches(&user, &item("x", "Prawn Curry", false, false)));
    }

    #[test]
    fn first_conflict_picks_only_the_first_menu() {
        let user = crew_with(Religion::Jewish);
        let menus = vec![
            menu("m1", vec![item("i1", "Scrambled Eggs (2)", false, false)]),
            menu("m2", vec![item("i3", "Pork Afritada Stew", true, false)]),
            menu("m_future_1", vec![item("i3", "Pork Afritada Stew", true, false)]),
        ];

        let alert = first_conflict(&user, &menus).unwrap();
        assert_eq!(alert.menu.menu_id, "m2");
        assert_eq!(alert.conflicting_items.len(), 1);

        assert!(first_conflict(&crew_with(Religion::Buddhist), &menus).is_none());
    }
}
