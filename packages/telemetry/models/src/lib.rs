#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Wire records returned by the location tracking service.
//!
//! The vendor encodes every field as a string, including flags and numeric
//! ids, and omits fields freely. All fields therefore default to an empty
//! string and the typed views ([`LocationRecord::card_type`],
//! [`LocationRecord::is_inwell`]) interpret the raw codes.
//!
//! Key casing differs between service versions. The fields the pipeline
//! reads accept the camelCase, lowercase and PascalCase spellings seen in
//! the wild.

use serde::{Deserialize, Serialize};

/// Card type code for a person-carried tag.
pub const CARD_TYPE_PERSON: &str = "1";

/// Flag value meaning the tag is currently underground.
pub const IN_WELL: &str = "1";

/// Discriminator between person-carried and vehicle-carried tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardType {
    /// A tag carried by a person.
    Person,
    /// Any other tag. The service only distinguishes persons, so every
    /// non-person code is counted as a vehicle.
    Vehicle,
}

impl CardType {
    /// Interprets a raw `cardType` code.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        if code == CARD_TYPE_PERSON {
            Self::Person
        } else {
            Self::Vehicle
        }
    }
}

/// One location observation for a tracked tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationRecord {
    /// Tag (card) number; the subject id.
    #[serde(rename = "cardnum", alias = "cardNum", alias = "CardNum")]
    pub card_number: String,
    /// Code of the monitoring site that last saw the tag.
    #[serde(rename = "devNum", alias = "devnum", alias = "DevNum")]
    pub site_code: String,
    /// `"1"` when the subject is underground.
    #[serde(rename = "isinwell", alias = "isInWell", alias = "IsInWell")]
    pub inwell: String,
    /// Time the subject went underground.
    #[serde(rename = "intime", alias = "inTime", alias = "InTime")]
    pub in_time: String,
    /// Time the subject came back up.
    #[serde(rename = "outtime", alias = "outTime", alias = "OutTime")]
    pub out_time: String,
    /// Raw card type code, see [`CardType::from_code`].
    #[serde(rename = "cardType", alias = "cardtype", alias = "CardType")]
    pub card_type: String,
    /// X coordinate.
    pub x: String,
    /// Y coordinate.
    pub y: String,
    /// Observation timestamp, `Y/M/D H:M:S` with unpadded month and day.
    #[serde(rename = "devTime", alias = "devtime", alias = "DevTime")]
    pub dev_time: String,
    /// Distance from the site.
    pub distance: String,
    /// Free-form position description.
    pub description: String,
    /// Direction of travel.
    pub direction: String,
}

impl LocationRecord {
    /// Typed view of [`Self::card_type`].
    #[must_use]
    pub fn card_type(&self) -> CardType {
        CardType::from_code(&self.card_type)
    }

    /// Whether the tag is carried by a person.
    #[must_use]
    pub fn is_person(&self) -> bool {
        self.card_type() == CardType::Person
    }

    /// Whether the tag is reported underground.
    #[must_use]
    pub fn is_inwell(&self) -> bool {
        self.inwell == IN_WELL
    }
}

/// A named work area. Sites belong to areas by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkArea {
    /// Area id; numeric for well-formed areas.
    #[serde(alias = "Id")]
    pub id: String,
    /// Area name, unique, used as the cache key.
    #[serde(alias = "Name")]
    pub name: String,
    /// Parent area id.
    #[serde(rename = "parentId", alias = "ParentId")]
    pub parent_id: String,
    /// Area type code, `"1"`..`"4"`.
    #[serde(rename = "typeId", alias = "TypeId")]
    pub type_id: String,
    /// Human-readable area type.
    #[serde(rename = "workAreaTypeName")]
    pub type_name: String,
    /// Person capacity.
    #[serde(rename = "personSize")]
    pub person_size: String,
    /// Vehicle capacity.
    #[serde(rename = "vehicleSize")]
    pub vehicle_size: String,
}

/// A monitoring site (reader station).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkSite {
    /// Site code, matches [`LocationRecord::site_code`].
    #[serde(alias = "Number")]
    pub number: String,
    /// Site name.
    pub name: String,
    /// Site type code.
    #[serde(rename = "workSiteType")]
    pub site_type: String,
    /// Installation address.
    pub address: String,
    /// X coordinate.
    pub x: String,
    /// Y coordinate.
    pub y: String,
    /// Facing direction.
    pub direction: String,
    /// Name of the owning [`WorkArea`].
    #[serde(rename = "workAreaName", alias = "WorkAreaName")]
    pub work_area_name: String,
    /// Device type.
    #[serde(rename = "DevType", alias = "devType")]
    pub dev_type: String,
}

/// An employee record from the personnel directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Employee {
    /// Full name.
    pub name: String,
    /// Tag number assigned to the employee.
    #[serde(rename = "cardNumber", alias = "CardNumber")]
    pub card_number: String,
    /// Employee number.
    #[serde(rename = "empNo")]
    pub emp_no: String,
    /// Sex.
    pub sex: String,
    /// Department name.
    #[serde(alias = "Department")]
    pub department: String,
    /// Trade.
    #[serde(rename = "typeOfWork")]
    pub type_of_work: String,
    /// Position.
    #[serde(rename = "officePosition")]
    pub office_position: String,
    /// Directory id.
    #[serde(rename = "Id", alias = "id")]
    pub id: String,
    /// Whether the employee is a cadre.
    #[serde(rename = "isCadres")]
    pub is_cadres: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_location_with_missing_fields() {
        let record: LocationRecord = serde_json::from_str(
            r#"{"cardnum":"C1","devNum":"S1","isinwell":"1","cardType":"1","devTime":"2024/3/5 08:01:02"}"#,
        )
        .unwrap();
        assert_eq!(record.card_number, "C1");
        assert_eq!(record.site_code, "S1");
        assert!(record.is_person());
        assert!(record.is_inwell());
        assert_eq!(record.x, "");
    }

    #[test]
    fn decodes_alternate_key_casing() {
        let record: LocationRecord = serde_json::from_str(
            r#"{"CardNum":"C2","DevNum":"S4","IsInWell":"1","CardType":"2","DevTime":"2024/3/5 08:01:02"}"#,
        )
        .unwrap();
        assert_eq!(record.card_number, "C2");
        assert_eq!(record.site_code, "S4");
        assert!(record.is_inwell());
        assert_eq!(record.card_type(), CardType::Vehicle);
        assert_eq!(record.dev_time, "2024/3/5 08:01:02");

        let area: WorkArea =
            serde_json::from_str(r#"{"Id":"4","Name":"North","TypeId":"2"}"#).unwrap();
        assert_eq!((area.id.as_str(), area.name.as_str()), ("4", "North"));
        assert_eq!(area.type_id, "2");

        let site: WorkSite =
            serde_json::from_str(r#"{"Number":"S4","WorkAreaName":"North"}"#).unwrap();
        assert_eq!(site.number, "S4");
        assert_eq!(site.work_area_name, "North");

        let employee: Employee =
            serde_json::from_str(r#"{"CardNumber":"C2","Department":"Haulage"}"#).unwrap();
        assert_eq!(employee.card_number, "C2");
        assert_eq!(employee.department, "Haulage");
    }

    #[test]
    fn serializes_canonical_names() {
        let record = LocationRecord {
            card_number: "C1".to_string(),
            ..LocationRecord::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["cardnum"], "C1");
        assert!(json.get("CardNum").is_none());
    }

    #[test]
    fn non_person_codes_are_vehicles() {
        assert_eq!(CardType::from_code("1"), CardType::Person);
        assert_eq!(CardType::from_code("2"), CardType::Vehicle);
        assert_eq!(CardType::from_code(""), CardType::Vehicle);
    }

    #[test]
    fn decodes_site_owner_and_employee_department() {
        let site: WorkSite =
            serde_json::from_str(r#"{"number":"S9","workAreaName":"North","DevType":"2"}"#)
                .unwrap();
        assert_eq!(site.work_area_name, "North");
        assert_eq!(site.dev_type, "2");

        let employee: Employee =
            serde_json::from_str(r#"{"cardNumber":"C7","department":"Ventilation","Id":"3"}"#)
                .unwrap();
        assert_eq!(employee.card_number, "C7");
        assert_eq!(employee.department, "Ventilation");
        assert_eq!(employee.id, "3");
    }
}
