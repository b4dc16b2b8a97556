//! Client-side filtering and pagination of fetched lists.

use crate::models::{Contribution, ContributionStatus, Gender, MemberStatus, Person};
use crate::utils::contains_ignore_case;

/// Default number of rows per page in list screens.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Criteria for the member list. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberFilter {
    /// Free text matched against names, phone, district and tribute
    pub search: String,
    pub gender: Option<Gender>,
    /// District name, compared exactly
    pub district: Option<String>,
    /// Tribute name, compared exactly
    pub tribute: Option<String>,
    pub status: Option<MemberStatus>,
}

fn member_search_fields(person: &Person) -> Vec<&str> {
    let mut fields = vec![person.first_name.as_str(), person.last_name.as_str()];
    fields.extend(
        [&person.phone_number, &person.district_name, &person.tribute_name]
            .into_iter()
            .filter_map(|f| f.as_deref()),
    );
    fields
}

impl MemberFilter {
    pub fn with_search(query: impl Into<String>) -> Self {
        Self {
            search: query.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn matches(&self, person: &Person) -> bool {
        let query = self.search.trim();
        if !query.is_empty()
            && !member_search_fields(person)
                .iter()
                .any(|field| contains_ignore_case(field, query))
        {
            return false;
        }
        if self.gender.is_some() && person.gender != self.gender {
            return false;
        }
        if self.district.is_some() && person.district_name != self.district {
            return false;
        }
        if self.tribute.is_some() && person.tribute_name != self.tribute {
            return false;
        }
        if self.status.is_some() && person.status != self.status {
            return false;
        }
        true
    }

    pub fn apply<'a>(&self, members: &'a [Person]) -> Vec<&'a Person> {
        members.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Criteria for the contribution list. A person matches either as the
/// member or as the child the contribution was raised for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContributionFilter {
    pub person_id: Option<String>,
    pub year: Option<i32>,
    pub status: Option<ContributionStatus>,
}

impl ContributionFilter {
    pub fn for_year(year: i32) -> Self {
        Self {
            year: Some(year),
            ..Default::default()
        }
    }

    pub fn matches(&self, contribution: &Contribution) -> bool {
        if let Some(ref person_id) = self.person_id {
            if !contribution.belongs_to(person_id) {
                return false;
            }
        }
        if let Some(year) = self.year {
            if contribution.year != year {
                return false;
            }
        }
        if self.status.is_some() && contribution.status != self.status {
            return false;
        }
        true
    }

    pub fn apply<'a>(&self, contributions: &'a [Contribution]) -> Vec<&'a Contribution> {
        contributions.iter().filter(|c| self.matches(c)).collect()
    }
}

/// Case-insensitive substring search over the fields `keys` extracts.
/// A blank query returns every item.
pub fn search_in<'a, T, F>(items: &'a [T], query: &str, keys: F) -> Vec<&'a T>
where
    F: for<'b> Fn(&'b T) -> Vec<&'b str>,
{
    let query = query.trim();
    if query.is_empty() {
        return items.iter().collect();
    }
    items
        .iter()
        .filter(|item| keys(item).iter().any(|field| contains_ignore_case(field, query)))
        .collect()
}

/// One page of `items`. Pages are 1-indexed; page 0 is treated as page 1
/// and pages past the end are empty.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page.max(1).saturating_sub(1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(first: &str, last: &str, district: &str, gender: Gender) -> Person {
        serde_json::from_value(serde_json::json!({
            "id": format!("{}-{}", first, last),
            "firstName": first,
            "lastName": last,
            "gender": gender,
            "phoneNumber": "0341234567",
            "status": "WORKER",
            "districtName": district,
            "tributeName": "Betsileo"
        }))
        .unwrap()
    }

    fn members() -> Vec<Person> {
        vec![
            person("Hery", "Rakoto", "Antsirabe", Gender::Male),
            person("Lova", "Rasoa", "Fianarantsoa", Gender::Female),
            person("Tiana", "Rabe", "Antsirabe", Gender::Female),
        ]
    }

    #[test]
    fn test_empty_filter_returns_everything() {
        let members = members();
        let filter = MemberFilter::default();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&members).len(), 3);
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let members = members();
        assert_eq!(MemberFilter::with_search("RAKO").apply(&members).len(), 1);
        assert_eq!(MemberFilter::with_search("fianar").apply(&members).len(), 1);
        assert_eq!(MemberFilter::with_search("betsileo").apply(&members).len(), 3);
        assert_eq!(MemberFilter::with_search("1234").apply(&members).len(), 3);
        assert!(MemberFilter::with_search("zzz").apply(&members).is_empty());
    }

    #[test]
    fn test_criteria_combine() {
        let members = members();
        let mut filter = MemberFilter {
            gender: Some(Gender::Female),
            district: Some("Antsirabe".into()),
            ..Default::default()
        };
        let found = filter.apply(&members);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].first_name, "Tiana");

        filter.status = Some(MemberStatus::Student);
        assert!(filter.apply(&members).is_empty());

        filter.reset();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_contribution_filter() {
        let contributions: Vec<Contribution> = serde_json::from_value(serde_json::json!([
            {"id": "C1", "year": 2024, "memberId": "P1", "status": "PAID"},
            {"id": "C2", "year": 2024, "memberId": "P1", "childId": "K1", "status": "PENDING"},
            {"id": "C3", "year": 2023, "memberId": "P2", "status": "PENDING"}
        ]))
        .unwrap();

        assert_eq!(ContributionFilter::for_year(2024).apply(&contributions).len(), 2);

        let by_child = ContributionFilter {
            person_id: Some("K1".into()),
            ..Default::default()
        };
        assert_eq!(by_child.apply(&contributions)[0].id, "C2");

        let pending = ContributionFilter {
            status: Some(ContributionStatus::Pending),
            ..Default::default()
        };
        assert_eq!(pending.apply(&contributions).len(), 2);
    }

    #[test]
    fn test_search_in() {
        let names = vec!["Antsirabe".to_string(), "Toamasina".to_string()];
        let found = search_in(&names, "TOA", |n| vec![n.as_str()]);
        assert_eq!(found, vec![&names[1]]);
        assert_eq!(search_in(&names, "  ", |n| vec![n.as_str()]).len(), 2);
    }

    #[test]
    fn test_paginate() {
        let items: Vec<u32> = (1..=25).collect();
        assert_eq!(paginate(&items, 1, 10), &items[0..10]);
        assert_eq!(paginate(&items, 0, 10), &items[0..10]);
        assert_eq!(paginate(&items, 3, 10), &[21, 22, 23, 24, 25]);
        assert!(paginate(&items, 4, 10).is_empty());
        assert_eq!(page_count(25, DEFAULT_PAGE_SIZE), 3);
        assert_eq!(page_count(0, 10), 0);
    }
}
