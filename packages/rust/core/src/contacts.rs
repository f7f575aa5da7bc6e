//! Contact lists exported from a CRM or spreadsheet.

use std::io::Read;

use tracing::info;

use fluxsales_shared::{Contact, FluxSalesError, Result};

/// Which CSV header holds each contact attribute. Only `name` is required.
#[derive(Debug, Clone, Default)]
pub struct ContactColumns {
    pub name: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub industry: Option<String>,
}

/// Read contacts from CSV, mapping the named columns.
///
/// A column named in `columns` but absent from the header row is a
/// validation error. Rows whose mapped cells are all blank are skipped.
pub fn import_contacts_csv<R: Read>(reader: R, columns: &ContactColumns) -> Result<Vec<Contact>> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv
        .headers()
        .map_err(|e| FluxSalesError::parse(format!("invalid contacts CSV: {e}")))?
        .clone();
    let index_of = |column: &str| -> Result<usize> {
        headers.iter().position(|h| h == column).ok_or_else(|| {
            FluxSalesError::validation(format!("column '{column}' not found in contacts CSV"))
        })
    };
    let optional_index = |column: &Option<String>| -> Result<Option<usize>> {
        column.as_deref().filter(|c| !c.is_empty()).map(index_of).transpose()
    };

    let name = index_of(&columns.name)?;
    let title = optional_index(&columns.title)?;
    let company = optional_index(&columns.company)?;
    let email = optional_index(&columns.email)?;
    let phone = optional_index(&columns.phone)?;
    let industry = optional_index(&columns.industry)?;

    let mut contacts = Vec::new();
    for (row, record) in csv.records().enumerate() {
        let record = record
            .map_err(|e| FluxSalesError::parse(format!("contacts CSV row {}: {e}", row + 2)))?;
        let cell = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| record.get(i))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let contact = Contact {
            name: cell(Some(name)),
            title: cell(title),
            organization_name: cell(company),
            email: cell(email),
            phone: cell(phone),
            industry: cell(industry),
            ..Contact::default()
        };
        if contact == Contact::default() {
            continue;
        }
        contacts.push(contact);
    }

    info!(contacts = contacts.len(), "contacts imported");
    Ok(contacts)
}
