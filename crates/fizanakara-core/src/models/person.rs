use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::{Gender, MemberStatus};
use crate::validation::{parse_date, validate_past_birth_date, validate_phone};

/// Age of majority required for promotion to full membership.
pub const MAJORITY_AGE: u32 = 18;

/// Payload for creating or updating a member (and for attaching a child).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct PersonRequest {
    #[validate(length(min = 2, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 2, message = "Last name is required"))]
    pub last_name: String,
    #[validate(custom(function = "validate_past_birth_date"))]
    pub birth_date: String,
    pub gender: Gender,
    #[serde(default)]
    #[validate(length(max = 255, message = "Image file name is too long"))]
    pub image_url: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone_number: String,
    pub status: MemberStatus,
    #[validate(range(min = 1, message = "Select a district"))]
    pub district_id: i64,
    #[validate(range(min = 1, message = "Select a tribute"))]
    pub tribute_id: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_id: Option<String>,
}

/// A registry entry. Members with a `parent_id` are dependents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Person {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub status: Option<MemberStatus>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub sequence_number: Option<i64>,
    #[serde(default)]
    pub is_active_member: bool,
    #[serde(default)]
    pub district_id: Option<i64>,
    #[serde(default)]
    pub district_name: Option<String>,
    #[serde(default)]
    pub tribute_id: Option<i64>,
    #[serde(default)]
    pub tribute_name: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub parent_name: Option<String>,
    #[serde(default)]
    pub children_count: u32,
    #[serde(default)]
    pub children: Vec<Person>,
}

impl Person {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// "Rakoto, Jean" style used for sorted listings
    pub fn sort_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }

    pub fn initials(&self) -> String {
        self.first_name
            .chars()
            .take(1)
            .chain(self.last_name.chars().take(1))
            .collect::<String>()
            .to_uppercase()
    }

    pub fn is_dependent(&self) -> bool {
        self.parent_id.as_deref().map(|p| !p.is_empty()).unwrap_or(false)
    }

    pub fn birth_date(&self) -> Option<NaiveDate> {
        self.birth_date.as_deref().and_then(parse_date)
    }

    /// Age in whole years at `today`, or None if the birth date is missing or malformed
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        self.birth_date().map(|birth| age_between(birth, today))
    }

    /// Adults who are not yet active members may be promoted. The server has
    /// the final word; this only drives what the console offers.
    pub fn is_eligible_for_promotion(&self, today: NaiveDate) -> bool {
        !self.is_active_member
            && self.age_on(today).map(|age| age >= MAJORITY_AGE).unwrap_or(false)
    }

    pub fn to_request(&self) -> Option<PersonRequest> {
        Some(PersonRequest {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            birth_date: self.birth_date.clone()?,
            gender: self.gender?,
            image_url: self.image_url.clone().unwrap_or_default(),
            phone_number: self.phone_number.clone().unwrap_or_default(),
            status: self.status?,
            district_id: self.district_id?,
            tribute_id: self.tribute_id?,
            parent_id: self.parent_id.clone(),
        })
    }
}

/// Whole years elapsed between `birth` and `today`; zero for future dates.
pub fn age_between(birth: NaiveDate, today: NaiveDate) -> u32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_json() -> &'static str {
        r#"{
            "id": "MBR2024-001",
            "firstName": "Hery",
            "lastName": "Randria",
            "birthDate": "2006-05-10",
            "gender": "MALE",
            "phoneNumber": "0341234567",
            "status": "STUDENT",
            "createdAt": "2024-01-05",
            "sequenceNumber": 1,
            "isActiveMember": false,
            "districtId": 3,
            "districtName": "Antsirabe",
            "tributeId": 2,
            "tributeName": "Zafimaniry",
            "parentId": "MBR2020-014",
            "parentName": "Lala Randria",
            "childrenCount": 0
        }"#
    }

    #[test]
    fn test_parse_person() {
        let person: Person = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(person.full_name(), "Hery Randria");
        assert_eq!(person.sort_name(), "Randria, Hery");
        assert_eq!(person.initials(), "HR");
        assert!(person.is_dependent());
        assert!(person.children.is_empty());
        assert_eq!(person.district_name.as_deref(), Some("Antsirabe"));
    }

    #[test]
    fn test_age_between() {
        assert_eq!(age_between(date(2000, 6, 15), date(2018, 6, 14)), 17);
        assert_eq!(age_between(date(2000, 6, 15), date(2018, 6, 15)), 18);
        assert_eq!(age_between(date(2000, 2, 29), date(2018, 3, 1)), 18);
        assert_eq!(age_between(date(2030, 1, 1), date(2020, 1, 1)), 0);
    }

    #[test]
    fn test_promotion_eligibility() {
        let mut person: Person = serde_json::from_str(sample_json()).unwrap();
        assert!(!person.is_eligible_for_promotion(date(2024, 5, 9)));
        assert!(person.is_eligible_for_promotion(date(2024, 5, 10)));

        person.is_active_member = true;
        assert!(!person.is_eligible_for_promotion(date(2030, 1, 1)));

        person.is_active_member = false;
        person.birth_date = None;
        assert!(!person.is_eligible_for_promotion(date(2030, 1, 1)));
    }

    #[test]
    fn test_empty_parent_is_not_dependent() {
        let mut person: Person = serde_json::from_str(sample_json()).unwrap();
        person.parent_id = Some(String::new());
        assert!(!person.is_dependent());
    }

    #[test]
    fn test_to_request_round_trips_editable_fields() {
        let person: Person = serde_json::from_str(sample_json()).unwrap();
        let request = person.to_request().unwrap();
        assert_eq!(request.district_id, 3);
        assert_eq!(request.parent_id.as_deref(), Some("MBR2020-014"));
        assert_eq!(request.image_url, "");
    }
}
