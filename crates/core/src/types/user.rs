//! Registry user records.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::id::UserId;
use super::role::{BloodGroup, Gender, UserRole};

/// A user record as held by the remote registry.
///
/// The dashboard keeps a read-mostly copy of the full collection and never
/// patches it in place; edits go through the registry and are followed by a
/// full re-fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Registry identifier (`_id` on the wire).
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    /// Some legacy records carry no role at all. An unrecognized role is
    /// read as no role, which never passes the auth gate.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<BloodGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permanent_address: Option<String>,
}

/// Decode an optional enum field, reading blank, unknown or non-string
/// values as `None`. Edit forms submit `""` for unset choices.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|s| s.trim().parse().ok()))
}

impl User {
    /// Role label for display, `none` when the record carries no role.
    #[must_use]
    pub fn role_label(&self) -> &'static str {
        self.role.as_ref().map_or("none", UserRole::as_str)
    }

    /// Whether this user holds the privileged dashboard role.
    #[must_use]
    pub fn is_privileged(&self) -> bool {
        self.role.is_some_and(|role| role.is_privileged())
    }

    /// Avatar initials: first and last word initials, or the first two
    /// letters of a single-word name. `??` for a blank name.
    #[must_use]
    pub fn initials(&self) -> String {
        let words: Vec<&str> = self.name.split_whitespace().collect();
        let initials: String = match words.as_slice() {
            [] => return "??".to_string(),
            [only] => only.chars().take(2).collect(),
            [first, .., last] => first.chars().take(1).chain(last.chars().take(1)).collect(),
        };
        initials.to_uppercase()
    }
}

/// The editable subset of a [`User`], sent as a partial update.
///
/// Every field is optional; only fields holding a non-empty value are
/// transmitted, so an update can never blank out a field on the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub blood_group: Option<BloodGroup>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub permanent_address: Option<String>,
}

impl UserUpdate {
    /// The `(wire name, value)` pairs to transmit, skipping empty values.
    ///
    /// Order is stable: name, gender, bloodGroup, role, bio, about, website,
    /// location, permanentAddress.
    #[must_use]
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let text = |value: &Option<String>| value.as_deref().map(str::trim).map(str::to_owned);

        [
            ("name", text(&self.name)),
            ("gender", self.gender.map(|g| g.as_str().to_owned())),
            ("bloodGroup", self.blood_group.map(|b| b.as_str().to_owned())),
            ("role", self.role.map(|r| r.as_str().to_owned())),
            ("bio", text(&self.bio)),
            ("about", text(&self.about)),
            ("website", text(&self.website)),
            ("location", text(&self.location)),
            ("permanentAddress", text(&self.permanent_address)),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.filter(|v| !v.is_empty()).map(|v| (key, v)))
        .collect()
    }

    /// Whether the update would transmit no fields at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.form_fields().is_empty()
    }
}
