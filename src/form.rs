//! Add-visitor form payload
//!
//! The portal's WebForms page posts ~75 fields, almost all of which must be
//! replayed exactly as captured. The capture lives in
//! `assets/add_visitor.form`; this module patches only the fields listed in
//! [`OVERRIDE_FIELDS`] and re-serializes the rest untouched, in order.

use crate::clock;
use crate::error::VisitError;
use crate::models::VisitorDetails;
use serde::Serialize;
use url::form_urlencoded;

/// Bump when `assets/add_visitor.form` is re-captured
pub const TEMPLATE_VERSION: &str = "2025-07-01";

const ADD_VISITOR_TEMPLATE: &str = include_str!("../assets/add_visitor.form");

pub const START_DATE: &str = "ctl00$PC$txtVisitorStartDate";
pub const END_DATE: &str = "ctl00$PC$txtVisitorEndDate";
pub const EARLIEST_TIME: &str = "ctl00$PC$txtVisitorEarliestTime";
pub const LATEST_TIME: &str = "ctl00$PC$txtVisitorLatestTime";
pub const FLOOR_SELECTED_TEXT: &str = "ctl00$PC$hdnFloorSelectedText";
pub const NOTIFY_EMAIL: &str = "ctl00$PC$txtVisitorEmailAddress";
pub const MULTIPLE_VISITOR_DETAILS: &str = "ctl00$PC$hdnMultipleVisitorDetails";
// The portal's row labelled "first name" holds the last name and vice versa.
pub const ROW_FIRST_NAME: &str = "first_name_0";
pub const ROW_LAST_NAME: &str = "last_name_0";
pub const ROW_EMAIL: &str = "email_0";

/// Every field `build` may change. Anything else is replayed verbatim.
pub const OVERRIDE_FIELDS: &[&str] = &[
    START_DATE,
    END_DATE,
    EARLIEST_TIME,
    LATEST_TIME,
    FLOOR_SELECTED_TEXT,
    NOTIFY_EMAIL,
    MULTIPLE_VISITOR_DETAILS,
    ROW_FIRST_NAME,
    ROW_LAST_NAME,
    ROW_EMAIL,
];

pub const DAILY_EARLIEST_TIME: &str = "08:00 AM";
pub const DAILY_LATEST_TIME: &str = "06:00 PM";
pub const NO_FLOOR_CONTROL: &str = "no floor control";

/// Ordered field/value pairs of a captured form body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionTemplate {
    fields: Vec<(String, String)>,
}

impl SubmissionTemplate {
    /// Parse an `application/x-www-form-urlencoded` capture
    pub fn parse(raw: &str) -> Self {
        let fields = form_urlencoded::parse(raw.trim().as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { fields }
    }

    /// The bundled add-visitor capture
    pub fn add_visitor() -> Self {
        Self::parse(ADD_VISITOR_TEMPLATE)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Replace the first occurrence of `name` and drop any duplicates,
    /// appending if the field is absent
    fn set(&mut self, name: &str, value: impl Into<String>) {
        debug_assert!(OVERRIDE_FIELDS.contains(&name), "{} is not overridable", name);
        let value = value.into();

        match self.fields.iter().position(|(k, _)| k == name) {
            Some(idx) => {
                self.fields[idx].1 = value;
                let mut seen = 0;
                self.fields.retain(|(k, _)| {
                    if k != name {
                        return true;
                    }
                    seen += 1;
                    seen == 1
                });
            }
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter())
            .finish()
    }
}

#[derive(Serialize)]
struct VisitorEntry<'a> {
    #[serde(rename = "lName")]
    last_name: &'a str,
    #[serde(rename = "fName")]
    first_name: &'a str,
    email: &'a str,
}

/// Overlay the visitor onto the template and encode it as a form body
pub fn build(template: &SubmissionTemplate, visitor: &VisitorDetails) -> Result<String, VisitError> {
    let mut form = template.clone();
    let name = visitor.name_parts();
    let date = clock::format_visit_date(visitor.scheduled_for);

    // Single-day visits only
    form.set(START_DATE, date.as_str());
    form.set(END_DATE, date);
    form.set(EARLIEST_TIME, DAILY_EARLIEST_TIME);
    form.set(LATEST_TIME, DAILY_LATEST_TIME);
    form.set(FLOOR_SELECTED_TEXT, NO_FLOOR_CONTROL);

    form.set(ROW_FIRST_NAME, name.last.as_str());
    form.set(ROW_LAST_NAME, name.first.as_str());
    form.set(ROW_EMAIL, visitor.email.as_str());
    form.set(NOTIFY_EMAIL, visitor.email.as_str());

    let details = serde_json::to_string(&[VisitorEntry {
        last_name: &name.last,
        first_name: &name.first,
        email: &visitor.email,
    }])?;
    form.set(MULTIPLE_VISITOR_DETAILS, details);

    Ok(form.encode())
}
