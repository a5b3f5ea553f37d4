use time::Date;

/// A contact as delivered by the address book, reduced to the fields that
/// end up in front matter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactRecord {
    /// Server-assigned identifier, the only key used to match local files.
    pub uid: String,
    pub fullname: String,
    pub birthday: Option<Date>,
    pub telephones: Vec<String>,
    pub emails: Vec<String>,
    pub addresses: Vec<PostalAddress>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostalAddress {
    pub street: Option<String>,
    pub locality: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl PostalAddress {
    /// Render as a single line: street and locality, then region with
    /// postal code, then country. Empty parts are dropped.
    pub fn one_line(&self) -> String {
        let street = self
            .street
            .as_deref()
            .map(|s| {
                s.lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        let base = join_present([street.as_str(), text(&self.locality)]);

        let region_and_zip = format!("{} {}", text(&self.region), text(&self.postal_code));

        join_present([base.as_str(), region_and_zip.trim(), text(&self.country)])
    }
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or("")
}

fn join_present<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
